//! Thread-safe view
//!
//! `FileView` caches through `&mut self`. This wrapper puts the whole view
//! behind a `parking_lot::Mutex` so several threads can look up keywords
//! through one cache.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::keyword::{ArrayData, Keyword};

use super::{FileView, ReportLookup};

/// A `FileView` usable from several threads at once
pub struct SharedFileView {
    inner: Mutex<FileView>,
}

impl SharedFileView {
    pub fn new(view: FileView) -> Self {
        Self {
            inner: Mutex::new(view),
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<Keyword>> {
        self.inner.lock().get(name)
    }

    pub fn get_occurrence(&self, name: &str, occurrence: usize) -> Result<Arc<Keyword>> {
        self.inner.lock().get_occurrence(name, occurrence)
    }

    pub fn read_elements(&self, name: &str, occurrence: usize, indices: &[usize]) -> Result<ArrayData> {
        self.inner.lock().read_elements(name, occurrence, indices)
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.lock().has(name)
    }

    pub fn count(&self, name: &str) -> usize {
        self.inner.lock().count(name)
    }

    pub fn restrict_to_block(&self, block_id: usize) -> Result<SharedFileView> {
        self.inner.lock().restrict_to_block(block_id).map(Self::new)
    }

    pub fn report_view(&self, step: i64, lookup: ReportLookup) -> Result<SharedFileView> {
        self.inner.lock().report_view(step, lookup).map(Self::new)
    }

    pub fn drop_cache(&self) {
        self.inner.lock().drop_cache();
    }

    pub fn cached_count(&self) -> usize {
        self.inner.lock().cached_count()
    }

    pub fn into_inner(self) -> FileView {
        self.inner.into_inner()
    }
}

impl From<FileView> for SharedFileView {
    fn from(view: FileView) -> Self {
        Self::new(view)
    }
}
