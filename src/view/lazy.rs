//! Lazy arrays
//!
//! A keyword occurrence that has been located but not read. Holds only
//! the index entry and a handle on the source.

use std::sync::Arc;

use crate::error::Result;
use crate::index::IndexEntry;
use crate::keyword::{ArrayData, Keyword, KeywordHeader};

use super::{read_entry, SharedSource};

/// Handle on one keyword occurrence, read on demand
#[derive(Clone)]
pub struct LazyArray {
    source: SharedSource,
    entry: IndexEntry,
}

impl LazyArray {
    pub(crate) fn new(source: SharedSource, entry: IndexEntry) -> Self {
        Self { source, entry }
    }

    pub fn entry(&self) -> &IndexEntry {
        &self.entry
    }

    pub fn header(&self) -> KeywordHeader {
        self.entry.header()
    }

    pub fn len(&self) -> usize {
        self.entry.count
    }

    pub fn is_empty(&self) -> bool {
        self.entry.count == 0
    }

    /// Read the whole keyword. Nothing is kept; every call reads again.
    pub fn load(&self) -> Result<Keyword> {
        read_entry(&self.source, &self.entry)
    }

    /// Read selected elements only
    pub fn read_elements(&self, indices: &[usize]) -> Result<ArrayData> {
        let mut source = self.source.lock();
        source.read_elements(&self.header(), self.entry.data_offset, indices)
    }

    /// One numeric element widened to f64
    pub fn read_f64(&self, index: usize) -> Result<f64> {
        let data = self.read_elements(&[index])?;
        Keyword::new(self.entry.name.clone(), data)?.get_f64(0)
    }

    /// True when both handles read the same bytes of the same source
    pub fn same_as(&self, other: &LazyArray) -> bool {
        Arc::ptr_eq(&self.source, &other.source) && self.entry == other.entry
    }
}

impl std::fmt::Debug for LazyArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyArray")
            .field("entry", &self.entry)
            .finish()
    }
}
