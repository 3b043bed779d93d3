//! Index Module
//!
//! Single-pass discovery of every keyword in a file without loading any
//! payload.
//!
//! ## Responsibilities
//! - Record `(name, type, count, offsets)` for each keyword in file order
//! - Number occurrences of names that appear more than once
//! - Partition the flat list into blocks delimited by marker keywords
//! - Stop, or resynchronize, on damaged input when asked to
//! - Persist an index next to its data file and validate it on load
//!
//! ## Layout
//! ```text
//!   entries:  [0] SEQNUM  [1] PRESSURE  [2] SEQNUM  [3] PRESSURE
//!   by_name:  SEQNUM   -> [0, 2]
//!             PRESSURE -> [1, 3]
//!   blocks("SEQNUM"):  #0 = 0..2   #1 = 2..4
//! ```

mod builder;
mod parallel;
mod persist;

pub use builder::{IndexBuilder, IndexProgress, IndexReport, IndexStatus, ScanOutcome, SkippedRegion};
pub use persist::INDEX_EXTENSION;

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::keyword::{ElementType, FileFormat, KeywordHeader, KeywordSource};

// =============================================================================
// Entries
// =============================================================================

/// One keyword as seen by the index scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub element_type: ElementType,
    pub count: usize,
    /// Offset of the header record (binary) or header line (formatted)
    pub header_offset: u64,
    /// Offset of the first data record, or where it would start for
    /// keywords without data
    pub data_offset: u64,
    /// 0-based number of earlier entries with the same name in the file
    pub occurrence: usize,
}

impl IndexEntry {
    pub fn header(&self) -> KeywordHeader {
        KeywordHeader::new(self.name.clone(), self.element_type, self.count)
    }
}

/// A contiguous run of entries between marker occurrences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Position of the block in its partition
    pub id: usize,
    /// Global position of the marker entry opening the block, `None` for
    /// the leading block of entries before the first marker
    pub marker: Option<usize>,
    /// Global entry positions covered
    pub range: Range<usize>,
}

impl Block {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn contains(&self, position: usize) -> bool {
        self.range.contains(&position)
    }
}

// =============================================================================
// Keyword Index
// =============================================================================

/// Ordered keyword table of one file plus a name → positions multimap
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordIndex {
    format: FileFormat,
    entries: Vec<IndexEntry>,
    by_name: HashMap<String, Vec<usize>>,
    /// Offset just past the last indexed keyword
    end_offset: u64,
}

impl KeywordIndex {
    /// Empty index for a stream of the given codec
    pub fn new(format: FileFormat) -> Self {
        Self {
            format,
            entries: Vec::new(),
            by_name: HashMap::new(),
            end_offset: 0,
        }
    }

    /// Strict build: any framing or truncation error fails
    pub fn build(source: &mut dyn KeywordSource) -> Result<Self> {
        IndexBuilder::new().build(source).map(|report| report.index)
    }

    /// Continue a strict scan from the end of the indexed range, after the
    /// underlying file grew. Returns the number of new entries.
    pub fn extend(&mut self, source: &mut dyn KeywordSource) -> Result<usize> {
        IndexBuilder::new()
            .extend(self, source)
            .map(|outcome| outcome.added)
    }

    pub(crate) fn from_parts(format: FileFormat, entries: Vec<IndexEntry>, end_offset: u64) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, entry) in entries.iter().enumerate() {
            by_name.entry(entry.name.clone()).or_default().push(position);
        }
        Self {
            format,
            entries,
            by_name,
            end_offset,
        }
    }

    pub(crate) fn push(&mut self, header: KeywordHeader, header_offset: u64, data_offset: u64, end: u64) {
        let position = self.entries.len();
        let positions = self.by_name.entry(header.name.clone()).or_default();
        let occurrence = positions.len();
        positions.push(position);

        self.entries.push(IndexEntry {
            name: header.name,
            element_type: header.element_type,
            count: header.count,
            header_offset,
            data_offset,
            occurrence,
        });
        self.end_offset = end;
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn end_offset(&self) -> u64 {
        self.end_offset
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Entry at a global position
    pub fn entry(&self, position: usize) -> Option<&IndexEntry> {
        self.entries.get(position)
    }

    /// Global positions of every occurrence of `name`, in file order
    pub fn positions(&self, name: &str) -> &[usize] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn count(&self, name: &str) -> usize {
        self.positions(name).len()
    }

    /// Each name once, in order of first appearance
    pub fn distinct_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.occurrence == 0)
            .map(|entry| entry.name.as_str())
            .collect()
    }

    // -------------------------------------------------------------------------
    // Partitioning
    // -------------------------------------------------------------------------

    /// Cut the whole file into blocks at every occurrence of `marker`.
    ///
    /// Entries before the first marker form a leading block with no
    /// marker. A marker present `k` times yields `k` blocks, or `k + 1`
    /// when data precedes the first marker; a file without the marker is
    /// one block. Concatenating the block ranges reproduces `0..len()`.
    pub fn partition_by_marker(&self, marker: &str) -> Vec<Block> {
        self.partition_range(0..self.entries.len(), marker)
    }

    /// Same as [`partition_by_marker`](Self::partition_by_marker),
    /// restricted to a range of global positions
    pub fn partition_range(&self, scope: Range<usize>, marker: &str) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut start = scope.start;
        let mut opened_by = None;

        for position in scope.clone() {
            if self.entries[position].name != marker {
                continue;
            }
            if position > start {
                blocks.push(Block {
                    id: blocks.len(),
                    marker: opened_by,
                    range: start..position,
                });
            }
            start = position;
            opened_by = Some(position);
        }

        if scope.end > start {
            blocks.push(Block {
                id: blocks.len(),
                marker: opened_by,
                range: start..scope.end,
            });
        }
        blocks
    }

    /// Blocks that open at each `start` marker and close before the next
    /// `end` or `start` marker, whichever comes first. Entries outside
    /// any such run belong to no block.
    pub fn partition_between(&self, start: &str, end: &str) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut open: Option<usize> = None;

        for (position, entry) in self.entries.iter().enumerate() {
            let is_start = entry.name == start;
            let is_end = entry.name == end;
            if let Some(begin) = open {
                if is_start || is_end {
                    blocks.push(Block {
                        id: blocks.len(),
                        marker: Some(begin),
                        range: begin..position,
                    });
                    open = None;
                }
            }
            if is_start {
                open = Some(position);
            }
        }

        if let Some(begin) = open {
            blocks.push(Block {
                id: blocks.len(),
                marker: Some(begin),
                range: begin..self.entries.len(),
            });
        }
        blocks
    }
}
