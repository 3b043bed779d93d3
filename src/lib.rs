//! # eclkw
//!
//! Reader and writer for ECLIPSE-style keyword files, the record-framed
//! binary (and formatted text) containers used for reservoir simulation
//! grids, restart steps, init files and summary time series:
//! - Fortran unformatted record framing with integrity checks
//! - Typed, named arrays ("keywords") with binary and formatted codecs
//! - Single-pass indexes over multi-gigabyte files, with partial and
//!   salvage modes for damaged input
//! - Lazy, cached views with occurrence and block lookups
//! - Columnar time series assembled from summary steps
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              EclFile / ResultSet (file handles)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌───────────────┐
//!   │  FileView   │◀─────────│ TimeSeries    │
//!   │  (lazy)     │          │ Store         │
//!   └──────┬──────┘          └───────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │ KeywordIndex│  (one scan per file)
//!   └──────┬──────┘
//!          │
//!          ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Keyword   │─────────▶│   Record    │
//!   │  (codecs)   │          │  (framing)  │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Logging
//! The library emits `tracing` events and installs no subscriber; without
//! one every event is a no-op.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod keyword;
pub mod index;
pub mod view;
pub mod series;
pub mod file;
pub mod fileset;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EclError, Result};
pub use config::{Config, EndianMode, IndexMode, LoadPolicy};
pub use record::Endian;
pub use keyword::{ArrayData, ElementType, FileFormat, Keyword, Tolerance};
pub use index::{Block, IndexEntry, IndexReport, KeywordIndex};
pub use view::{FileView, ReportLookup, SharedFileView};
pub use series::{TimeSeriesStore, VariableKey};
pub use file::{EclFile, OpenMode};
pub use fileset::{ResultKind, ResultSet};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of eclkw
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
