//! Element types
//!
//! The closed set of array element types and their on-disk properties.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Length of a type tag on disk
pub const TYPE_TAG_LENGTH: usize = 4;

/// Element type of a keyword array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// `INTE`: 32-bit signed integer
    Int32,
    /// `REAL`: 32-bit float
    Float32,
    /// `DOUB`: 64-bit float
    Float64,
    /// `CHAR`: 8-byte space padded string
    Char,
    /// `LOGI`: 4-byte logical (-1 true, 0 false)
    Bool,
    /// `MESS`: message keyword, no data
    Message,
}

impl ElementType {
    /// All element types, in tag order
    pub const ALL: [ElementType; 6] = [
        ElementType::Int32,
        ElementType::Float32,
        ElementType::Float64,
        ElementType::Char,
        ElementType::Bool,
        ElementType::Message,
    ];

    /// Four-character type tag
    pub fn tag(self) -> &'static str {
        match self {
            ElementType::Int32 => "INTE",
            ElementType::Float32 => "REAL",
            ElementType::Float64 => "DOUB",
            ElementType::Char => "CHAR",
            ElementType::Bool => "LOGI",
            ElementType::Message => "MESS",
        }
    }

    /// Parse a type tag (exact, case sensitive)
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"INTE" => Some(ElementType::Int32),
            b"REAL" => Some(ElementType::Float32),
            b"DOUB" => Some(ElementType::Float64),
            b"CHAR" => Some(ElementType::Char),
            b"LOGI" => Some(ElementType::Bool),
            b"MESS" => Some(ElementType::Message),
            _ => None,
        }
    }

    /// Bytes per element on disk
    pub fn width(self) -> usize {
        match self {
            ElementType::Int32 | ElementType::Float32 | ElementType::Bool => 4,
            ElementType::Float64 | ElementType::Char => 8,
            ElementType::Message => 0,
        }
    }

    /// Default elements per physical record (binary and formatted)
    pub fn default_block_cap(self) -> usize {
        match self {
            ElementType::Char => 105,
            _ => 1000,
        }
    }

    /// Values per line in the formatted codec
    pub fn formatted_columns(self) -> usize {
        match self {
            ElementType::Int32 => 6,
            ElementType::Float32 => 4,
            ElementType::Float64 => 3,
            ElementType::Char => 7,
            ElementType::Bool => 25,
            ElementType::Message => 1,
        }
    }

    /// True for the two floating point types
    pub fn is_float(self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }

    /// True for types readable as numbers
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ElementType::Int32 | ElementType::Float32 | ElementType::Float64
        )
    }

    /// Position in `ALL`
    pub(crate) fn ordinal(self) -> usize {
        match self {
            ElementType::Int32 => 0,
            ElementType::Float32 => 1,
            ElementType::Float64 => 2,
            ElementType::Char => 3,
            ElementType::Bool => 4,
            ElementType::Message => 5,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
