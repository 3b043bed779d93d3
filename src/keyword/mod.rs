//! Keyword Module
//!
//! Named, typed arrays and the codecs that move them to and from disk.
//!
//! ## Responsibilities
//! - Closed set of element types with their tags, widths and block caps
//! - Decoded array storage with typed, widening and lossy accessors
//! - Binary codec on top of the record layer
//! - Formatted (text) codec sharing the same model
//! - Tolerance-based comparison for float arrays
//!
//! ## Binary Keyword Layout
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Header record (16 bytes)                    │
//! │   Name (8) │ Type tag (4) │ Count (4)       │
//! ├─────────────────────────────────────────────┤
//! │ Data record 1  (≤ cap elements)             │
//! │ Data record 2                               │
//! │ ...                                         │
//! └─────────────────────────────────────────────┘
//! ```

mod array;
mod compare;
mod data;
mod element;
mod formatted;
mod header;
mod layout;
mod source;

pub use array::Keyword;
pub use compare::Tolerance;
pub use data::{ArrayData, CHAR_WIDTH, LOGI_TRUE};
pub use element::{ElementType, TYPE_TAG_LENGTH};
pub use formatted::{FormattedKeywordReader, FormattedKeywordWriter};
pub use header::{KeywordHeader, HEADER_SIZE, NAME_LENGTH};
pub use layout::BlockLayout;
pub use source::{BinaryKeywordReader, BinaryKeywordWriter, KeywordSink, KeywordSource};

/// On-disk codec of a keyword file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FileFormat {
    /// Record-framed binary ("unformatted")
    Binary,
    /// Human-readable text
    Formatted,
}
