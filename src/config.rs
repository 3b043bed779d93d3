//! Configuration for eclkw
//!
//! Centralized configuration with defaults matching the ECLIPSE conventions.

use crate::error::{EclError, Result};
use crate::keyword::{BlockLayout, ElementType, HEADER_SIZE, NAME_LENGTH};
use crate::record::Endian;

/// Default per-record payload guard (16 MB)
pub const DEFAULT_MAX_RECORD_SIZE: u32 = 16 * 1024 * 1024;

/// Default marker used to split restart files into report steps
pub const DEFAULT_BLOCK_MARKER: &str = "SEQNUM";

/// Main configuration for reading and writing keyword files
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Record Layer
    // -------------------------------------------------------------------------
    /// Byte order of the record framing and numeric payloads
    pub endian: EndianMode,

    /// Largest payload a single record may declare. Anything larger is
    /// treated as a framing error rather than an allocation request.
    pub max_record_size: u32,

    /// Elements per physical record, per element type
    pub layout: BlockLayout,

    // -------------------------------------------------------------------------
    // Indexing
    // -------------------------------------------------------------------------
    /// What an index build does when it meets a damaged record
    pub index_mode: IndexMode,

    /// Marker keyword views use to partition into blocks
    pub block_marker: Option<String>,

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------
    /// Strict or lenient handling of missing data while assembling
    /// higher-level structures (summary steps, step files)
    pub load_policy: LoadPolicy,

    /// Keyword that, when seen in a step, closes a time series store
    pub end_marker: Option<String>,
}

/// Byte order selection for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndianMode {
    /// Always big-endian (`endian_flip = true` on a little-endian reader)
    Big,

    /// Always little-endian (`endian_flip = false`)
    Little,

    /// Inspect the first record and pick the plausible order
    Detect,
}

impl EndianMode {
    /// Map the `endian_flip` flag of the open API onto a mode.
    /// `None` requests auto-detection.
    pub fn from_flip(endian_flip: Option<bool>) -> Self {
        match endian_flip {
            Some(true) => EndianMode::Big,
            Some(false) => EndianMode::Little,
            None => EndianMode::Detect,
        }
    }

    /// The fixed order, if the mode is not `Detect`
    pub fn fixed(self) -> Option<Endian> {
        match self {
            EndianMode::Big => Some(Endian::Big),
            EndianMode::Little => Some(Endian::Little),
            EndianMode::Detect => None,
        }
    }
}

/// Index build behavior on damaged input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Any framing or truncation error fails the build
    Strict,

    /// Stop at the first damaged record and keep everything before it
    Partial,

    /// Skip damaged regions, resynchronize on the next plausible header
    /// and log every skipped byte range
    Salvage,
}

/// Strict (error) or lenient (warn and skip) handling of missing data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    Strict,
    Lenient,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endian: EndianMode::Big,
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
            layout: BlockLayout::default(),
            index_mode: IndexMode::Strict,
            block_marker: Some(DEFAULT_BLOCK_MARKER.to_string()),
            load_policy: LoadPolicy::Strict,
            end_marker: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings no file could satisfy
    pub fn validate(&self) -> Result<()> {
        if (self.max_record_size as usize) < HEADER_SIZE {
            return Err(EclError::Config(format!(
                "max_record_size {} is smaller than a keyword header ({} bytes)",
                self.max_record_size, HEADER_SIZE
            )));
        }
        for marker in [&self.block_marker, &self.end_marker].into_iter().flatten() {
            if marker.is_empty() || marker.len() > NAME_LENGTH {
                return Err(EclError::Config(format!(
                    "marker keyword {:?} must be 1-{} characters",
                    marker, NAME_LENGTH
                )));
            }
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the byte order mode
    pub fn endian(mut self, mode: EndianMode) -> Self {
        self.config.endian = mode;
        self
    }

    /// Set the byte order from an `endian_flip` flag (`None` = detect)
    pub fn endian_flip(mut self, flip: Option<bool>) -> Self {
        self.config.endian = EndianMode::from_flip(flip);
        self
    }

    /// Set the per-record payload guard (in bytes)
    pub fn max_record_size(mut self, size: u32) -> Self {
        self.config.max_record_size = size;
        self
    }

    /// Replace the whole block layout
    pub fn layout(mut self, layout: BlockLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Override the elements-per-record cap of one element type
    pub fn block_cap(mut self, element_type: ElementType, cap: usize) -> Self {
        self.config.layout = self.config.layout.with_cap(element_type, cap);
        self
    }

    /// Set the index build mode
    pub fn index_mode(mut self, mode: IndexMode) -> Self {
        self.config.index_mode = mode;
        self
    }

    /// Set the marker keyword used for block partitioning
    pub fn block_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.block_marker = Some(marker.into());
        self
    }

    /// Disable block partitioning by default
    pub fn no_block_marker(mut self) -> Self {
        self.config.block_marker = None;
        self
    }

    /// Set the strict/lenient load policy
    pub fn load_policy(mut self, policy: LoadPolicy) -> Self {
        self.config.load_policy = policy;
        self
    }

    /// Set the end-of-data keyword for time series stores
    pub fn end_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.end_marker = Some(marker.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
