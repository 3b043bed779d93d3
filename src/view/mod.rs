//! View Module
//!
//! Random access over an index, or a block of it, with lazy
//! materialization of keyword data.
//!
//! ## Scope and Occurrences
//! A view covers a contiguous range of global index positions. Occurrence
//! numbers are counted within that range, so occurrence 0 of `PRESSURE`
//! in the view of block 3 is the first `PRESSURE` of block 3. A restricted
//! view builds its own name table once, so `has` and `count` are hash
//! lookups in every view.
//!
//! ## Caching
//! The first `get` of an occurrence seeks and reads; later calls return the
//! same `Arc<Keyword>`. The cache belongs to the view and can be dropped
//! at any time. Views are not meant to be shared between threads; use
//! [`SharedFileView`] for that.

mod lazy;
mod shared;

pub use lazy::LazyArray;
pub use shared::SharedFileView;

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{EclError, Result};
use crate::index::{Block, IndexEntry, KeywordIndex};
use crate::keyword::{ArrayData, Keyword, KeywordSource};

/// Keyword source shared between a file handle and its views
pub type SharedSource = Arc<Mutex<Box<dyn KeywordSource>>>;

/// How a report step number maps onto a block when the exact step is
/// absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLookup {
    /// Only a block whose marker holds exactly the requested step
    Exact,
    /// The block with the greatest step not after the requested one.
    /// Used when a consumer asks for a step the file skipped and the
    /// previous table is the documented substitute.
    PreviousAvailable,
}

/// A report step found in a view: the block it opens and its number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportStep {
    pub block: usize,
    pub step: i64,
}

/// Window over a range of index entries
pub struct FileView {
    source: SharedSource,
    index: Arc<KeywordIndex>,
    scope: Range<usize>,
    marker: Option<String>,
    /// Positions per name inside a restricted scope; `None` when the view
    /// covers the whole index and the index's own table applies
    scoped: Option<Arc<HashMap<String, Vec<usize>>>>,
    cache: HashMap<usize, Arc<Keyword>>,
}

impl FileView {
    /// View over the whole index
    pub fn new(source: SharedSource, index: Arc<KeywordIndex>, marker: Option<String>) -> Self {
        let scope = 0..index.len();
        Self::with_scope(source, index, scope, marker)
    }

    fn with_scope(
        source: SharedSource,
        index: Arc<KeywordIndex>,
        scope: Range<usize>,
        marker: Option<String>,
    ) -> Self {
        let scoped = if scope == (0..index.len()) {
            None
        } else {
            let mut table: HashMap<String, Vec<usize>> = HashMap::new();
            for (offset, entry) in index.entries()[scope.clone()].iter().enumerate() {
                table.entry(entry.name.clone()).or_default().push(scope.start + offset);
            }
            Some(Arc::new(table))
        };
        Self {
            source,
            index,
            scope,
            marker,
            scoped,
            cache: HashMap::new(),
        }
    }

    pub fn index(&self) -> &Arc<KeywordIndex> {
        &self.index
    }

    /// Global index positions covered by this view
    pub fn scope(&self) -> Range<usize> {
        self.scope.clone()
    }

    /// Marker used by `restrict_to_block` and the report step lookups
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// Same view partitioned by a different marker
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn len(&self) -> usize {
        self.scope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scope.is_empty()
    }

    /// Entries in scope, in file order
    pub fn entries(&self) -> &[IndexEntry] {
        &self.index.entries()[self.scope.clone()]
    }

    /// Each name in scope once, in order of first appearance
    pub fn names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entries()
            .iter()
            .map(|entry| entry.name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Occurrence Lookup
    // -------------------------------------------------------------------------

    /// Global positions of `name` inside the scope
    fn positions(&self, name: &str) -> &[usize] {
        match &self.scoped {
            Some(table) => table.get(name).map(Vec::as_slice).unwrap_or(&[]),
            None => self.index.positions(name),
        }
    }

    /// Constant time for any scope
    pub fn has(&self, name: &str) -> bool {
        !self.positions(name).is_empty()
    }

    pub fn count(&self, name: &str) -> usize {
        self.positions(name).len()
    }

    fn position(&self, name: &str, occurrence: usize) -> Result<usize> {
        let positions = self.positions(name);
        if positions.is_empty() {
            return Err(EclError::UnknownKeyword {
                name: name.to_string(),
            });
        }
        positions
            .get(occurrence)
            .copied()
            .ok_or_else(|| EclError::NotFound {
                name: name.to_string(),
                occurrence,
                count: positions.len(),
            })
    }

    /// Index entry of the `occurrence`-th `name` in scope, without reading
    /// any data
    pub fn entry(&self, name: &str, occurrence: usize) -> Result<&IndexEntry> {
        let position = self.position(name, occurrence)?;
        self.index
            .entry(position)
            .ok_or_else(|| EclError::UnknownKeyword {
                name: name.to_string(),
            })
    }

    // -------------------------------------------------------------------------
    // Materialization
    // -------------------------------------------------------------------------

    /// The last occurrence of `name` in scope
    pub fn get(&mut self, name: &str) -> Result<Arc<Keyword>> {
        let count = self.count(name);
        if count == 0 {
            return Err(EclError::UnknownKeyword {
                name: name.to_string(),
            });
        }
        self.get_occurrence(name, count - 1)
    }

    /// The `occurrence`-th (0-based) `name` in scope
    pub fn get_occurrence(&mut self, name: &str, occurrence: usize) -> Result<Arc<Keyword>> {
        let position = self.position(name, occurrence)?;
        self.materialize(position)
    }

    fn materialize(&mut self, position: usize) -> Result<Arc<Keyword>> {
        if let Some(keyword) = self.cache.get(&position) {
            return Ok(Arc::clone(keyword));
        }

        let entry = &self.index.entries()[position];
        let keyword = Arc::new(read_entry(&self.source, entry)?);
        self.cache.insert(position, Arc::clone(&keyword));
        Ok(keyword)
    }

    /// Selected elements of one occurrence, read without loading the
    /// whole array and without touching the cache
    pub fn read_elements(&self, name: &str, occurrence: usize, indices: &[usize]) -> Result<ArrayData> {
        let entry = self.entry(name, occurrence)?;
        let mut source = self.source.lock();
        source.read_elements(&entry.header(), entry.data_offset, indices)
    }

    /// Detached handle that reads the occurrence when asked
    pub fn lazy(&self, name: &str, occurrence: usize) -> Result<LazyArray> {
        let entry = self.entry(name, occurrence)?.clone();
        Ok(LazyArray::new(Arc::clone(&self.source), entry))
    }

    /// Forget every materialized keyword
    pub fn drop_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    // -------------------------------------------------------------------------
    // Blocks
    // -------------------------------------------------------------------------

    fn require_marker(&self) -> Result<&str> {
        self.marker
            .as_deref()
            .ok_or_else(|| EclError::Config("view has no block marker".to_string()))
    }

    /// The scope partitioned by the view's marker
    pub fn blocks(&self) -> Result<Vec<Block>> {
        let marker = self.require_marker()?;
        Ok(self.index.partition_range(self.scope.clone(), marker))
    }

    pub fn block_count(&self) -> Result<usize> {
        self.blocks().map(|blocks| blocks.len())
    }

    /// Narrower view over one block of this view's scope. Lookups in the
    /// new view only see that block; nothing is rescanned.
    pub fn restrict_to_block(&self, block_id: usize) -> Result<FileView> {
        let blocks = self.blocks()?;
        let count = blocks.len();
        let block = blocks
            .into_iter()
            .nth(block_id)
            .ok_or(EclError::BlockOutOfRange { block: block_id, count })?;
        Ok(self.restrict_to(&block))
    }

    /// Narrower view over an arbitrary block, e.g. one produced by
    /// [`KeywordIndex::partition_between`]. The block is clipped to this
    /// view's scope.
    pub fn restrict_to(&self, block: &Block) -> FileView {
        let start = block.range.start.clamp(self.scope.start, self.scope.end);
        let end = block.range.end.clamp(start, self.scope.end);
        Self::with_scope(
            Arc::clone(&self.source),
            Arc::clone(&self.index),
            start..end,
            self.marker.clone(),
        )
    }

    // -------------------------------------------------------------------------
    // Report Steps
    // -------------------------------------------------------------------------

    /// Report step number held by each marker in scope (first element of
    /// the marker keyword, e.g. the `SEQNUM` value)
    pub fn report_steps(&mut self) -> Result<Vec<ReportStep>> {
        let mut steps = Vec::new();
        for block in self.blocks()? {
            if let Some(position) = block.marker {
                let keyword = self.materialize(position)?;
                let step = keyword
                    .to_i64_vec()?
                    .first()
                    .copied()
                    .ok_or_else(|| EclError::ElementOutOfRange {
                        name: keyword.name().to_string(),
                        index: 0,
                        count: 0,
                    })?;
                steps.push(ReportStep {
                    block: block.id,
                    step,
                });
            }
        }
        Ok(steps)
    }

    /// Block of report step `step`
    pub fn find_report_block(&mut self, step: i64, lookup: ReportLookup) -> Result<usize> {
        let steps = self.report_steps()?;
        let found = match lookup {
            ReportLookup::Exact => steps.iter().find(|s| s.step == step),
            ReportLookup::PreviousAvailable => steps
                .iter()
                .filter(|s| s.step <= step)
                .max_by_key(|s| s.step),
        };
        match found {
            Some(found) => {
                if found.step != step {
                    tracing::debug!(
                        "Report step {} absent, using previous step {}",
                        step,
                        found.step
                    );
                }
                Ok(found.block)
            }
            None => Err(EclError::StepNotFound { step }),
        }
    }

    /// View of report step `step`
    pub fn report_view(&mut self, step: i64, lookup: ReportLookup) -> Result<FileView> {
        let block = self.find_report_block(step, lookup)?;
        self.restrict_to_block(block)
    }
}

/// Read the keyword described by `entry` from a shared source
pub(crate) fn read_entry(source: &SharedSource, entry: &IndexEntry) -> Result<Keyword> {
    let header = entry.header();
    let data = {
        let mut source = source.lock();
        source.seek(entry.data_offset)?;
        source.read_data(&header)?
    };
    Keyword::new(header.name, data)
}
