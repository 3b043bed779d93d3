//! Error types for eclkw
//!
//! One error enum for every layer. Variants carry the byte offset, keyword
//! name or step involved, because the files are routinely gigabytes large
//! and "parse failed" is not actionable.

use thiserror::Error;

use crate::keyword::ElementType;

/// Result type alias using EclError
pub type Result<T> = std::result::Result<T, EclError>;

/// Unified error type for eclkw operations
#[derive(Debug, Error)]
pub enum EclError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record Framing Errors
    // -------------------------------------------------------------------------
    #[error("Framing error at offset {offset}: head length {head} != tail length {tail}")]
    Framing { offset: u64, head: u32, tail: u32 },

    #[error("Framing error at offset {offset}: implausible record length {length} (limit {limit})")]
    ImplausibleLength { offset: u64, length: u64, limit: u64 },

    #[error("Truncated record at offset {offset}: expected {expected} bytes, {available} available")]
    Truncated {
        offset: u64,
        expected: u64,
        available: u64,
    },

    // -------------------------------------------------------------------------
    // Keyword Errors
    // -------------------------------------------------------------------------
    #[error("Invalid type tag {tag:?} at offset {offset}")]
    InvalidTypeTag { tag: String, offset: u64 },

    #[error("Invalid keyword header at offset {offset}: {reason}")]
    InvalidHeader { offset: u64, reason: String },

    #[error("Keyword {name} has no data (element type {element_type})")]
    EmptyType {
        name: String,
        element_type: ElementType,
    },

    #[error("Keyword {name}: stored as {stored}, requested {requested}")]
    TypeMismatch {
        name: String,
        stored: ElementType,
        requested: String,
    },

    #[error("Keyword {name}: element {index} out of range ({count} elements)")]
    ElementOutOfRange {
        name: String,
        index: usize,
        count: usize,
    },

    #[error("Formatted parse error at offset {offset}: {message}")]
    Format { offset: u64, message: String },

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Unknown keyword: {name}")]
    UnknownKeyword { name: String },

    #[error("Keyword {name}: occurrence {occurrence} not found ({count} present)")]
    NotFound {
        name: String,
        occurrence: usize,
        count: usize,
    },

    #[error("Block {block} out of range ({count} blocks)")]
    BlockOutOfRange { block: usize, count: usize },

    #[error("Report step {step} not found")]
    StepNotFound { step: i64 },

    // -------------------------------------------------------------------------
    // Time Series Errors
    // -------------------------------------------------------------------------
    #[error("Step {step}: time {time} does not follow previous time {previous}")]
    NonMonotonicTime { step: usize, previous: f64, time: f64 },

    #[error("Length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Time series store is finalized")]
    StoreFinalized,

    #[error("Time {time} outside stored range [{first}, {last}]")]
    TimeOutOfRange { time: f64, first: f64, last: f64 },

    // -------------------------------------------------------------------------
    // File Errors
    // -------------------------------------------------------------------------
    #[error("File opened read-only: {0}")]
    ReadOnly(String),

    #[error("Index file error: {0}")]
    IndexFile(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EclError {
    /// True for head/tail mismatches and implausible declared lengths
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            EclError::Framing { .. } | EclError::ImplausibleLength { .. }
        )
    }

    /// True when the file ended before a declared length was satisfied
    pub fn is_truncated(&self) -> bool {
        matches!(self, EclError::Truncated { .. })
    }

    /// Errors that mean the on-disk structure is damaged (as opposed to a
    /// lookup or usage error). Partial and salvage index builds stop or
    /// resync on these.
    pub fn is_corruption(&self) -> bool {
        self.is_framing()
            || self.is_truncated()
            || matches!(
                self,
                EclError::InvalidTypeTag { .. }
                    | EclError::InvalidHeader { .. }
                    | EclError::Format { .. }
            )
    }
}
