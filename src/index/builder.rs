//! Index builder
//!
//! Walks a keyword source header by header, skipping every payload, and
//! records what it saw. Damaged input is handled per `IndexMode`:
//! strict builds fail, partial builds keep what came before the damage,
//! salvage builds resynchronize on the next plausible header.

use crate::config::IndexMode;
use crate::error::{EclError, Result};
use crate::keyword::KeywordSource;

use super::KeywordIndex;

/// Keywords between two progress reports
const PROGRESS_INTERVAL: usize = 1024;

/// Whether a scan reached the end of its stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatus {
    /// Every byte up to the end of the stream was indexed
    Complete,
    /// The scan stopped at damaged input; everything before `offset` is
    /// indexed
    Truncated { offset: u64, reason: String },
}

/// Byte range a salvage scan stepped over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRegion {
    pub start: u64,
    pub end: u64,
    pub reason: String,
}

impl SkippedRegion {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// What one scan (build or extension) did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Entries added by this scan
    pub added: usize,
    pub status: IndexStatus,
    pub skipped: Vec<SkippedRegion>,
}

impl ScanOutcome {
    /// Reached the end without stopping or skipping anything
    pub fn is_complete(&self) -> bool {
        self.status == IndexStatus::Complete && self.skipped.is_empty()
    }
}

/// A built index together with how the build went.
///
/// Callers that need integrity must check [`is_complete`](Self::is_complete):
/// a partial or salvaged index is usable for inspection only.
#[derive(Debug, Clone)]
pub struct IndexReport {
    pub index: KeywordIndex,
    pub status: IndexStatus,
    pub skipped: Vec<SkippedRegion>,
}

impl IndexReport {
    pub fn is_complete(&self) -> bool {
        self.status == IndexStatus::Complete && self.skipped.is_empty()
    }

    /// The index, or the reason it is incomplete
    pub fn into_complete(self) -> Result<KeywordIndex> {
        if let IndexStatus::Truncated { offset, reason } = self.status {
            return Err(EclError::IndexFile(format!(
                "index truncated at offset {}: {}",
                offset, reason
            )));
        }
        if let Some(region) = self.skipped.first() {
            return Err(EclError::IndexFile(format!(
                "{} damaged region(s), first at {}..{}",
                self.skipped.len(),
                region.start,
                region.end
            )));
        }
        Ok(self.index)
    }
}

/// Advisory progress of a running scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexProgress {
    pub keywords: usize,
    pub offset: u64,
    pub total: u64,
}

/// Configurable index scan
pub struct IndexBuilder<'a> {
    mode: IndexMode,
    progress: Option<Box<dyn FnMut(IndexProgress) + Send + 'a>>,
}

impl Default for IndexBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IndexBuilder<'a> {
    /// Strict builder without progress reporting
    pub fn new() -> Self {
        Self {
            mode: IndexMode::Strict,
            progress: None,
        }
    }

    pub fn mode(mut self, mode: IndexMode) -> Self {
        self.mode = mode;
        self
    }

    /// Report progress every `PROGRESS_INTERVAL` keywords and once at the end.
    /// The callback cannot stop the scan.
    pub fn with_progress(mut self, callback: impl FnMut(IndexProgress) + Send + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Index a whole stream from offset 0
    pub fn build(&mut self, source: &mut dyn KeywordSource) -> Result<IndexReport> {
        let mut index = KeywordIndex::new(source.format());
        let outcome = self.extend(&mut index, source)?;

        tracing::debug!(
            "Indexed {} keywords over {} bytes ({:?})",
            index.len(),
            index.end_offset(),
            outcome.status
        );
        Ok(IndexReport {
            index,
            status: outcome.status,
            skipped: outcome.skipped,
        })
    }

    /// Index from `index.end_offset()` to the current end of the stream
    pub fn extend(&mut self, index: &mut KeywordIndex, source: &mut dyn KeywordSource) -> Result<ScanOutcome> {
        let total = source.refresh_len()?;
        let before = index.len();
        let mut skipped = Vec::new();
        let mut status = IndexStatus::Complete;

        source.seek(index.end_offset())?;
        loop {
            let header_offset = source.position();
            match Self::scan_one(index, source) {
                Ok(true) => {
                    let indexed = index.len() - before;
                    if indexed % PROGRESS_INTERVAL == 0 {
                        self.report(indexed, source.position(), total);
                    }
                }
                Ok(false) => break,
                Err(e) if e.is_corruption() => match self.mode {
                    IndexMode::Strict => return Err(e),
                    IndexMode::Partial => {
                        tracing::warn!(
                            "Partial index: stopping at offset {} after {} keywords: {}",
                            header_offset,
                            index.len(),
                            e
                        );
                        status = IndexStatus::Truncated {
                            offset: header_offset,
                            reason: e.to_string(),
                        };
                        break;
                    }
                    IndexMode::Salvage => {
                        let resume = source.resync(header_offset + 1)?;
                        let end = resume.unwrap_or(total);
                        tracing::warn!(
                            "Salvage: skipped bytes {}..{} ({} bytes): {}",
                            header_offset,
                            end,
                            end - header_offset,
                            e
                        );
                        skipped.push(SkippedRegion {
                            start: header_offset,
                            end,
                            reason: e.to_string(),
                        });
                        if resume.is_none() {
                            break;
                        }
                    }
                },
                Err(e) => return Err(e),
            }
        }

        let added = index.len() - before;
        self.report(added, index.end_offset(), total);
        Ok(ScanOutcome {
            added,
            status,
            skipped,
        })
    }

    /// Index one keyword; `false` at a clean end of stream
    fn scan_one(index: &mut KeywordIndex, source: &mut dyn KeywordSource) -> Result<bool> {
        let header_offset = source.position();
        let header = match source.next_header()? {
            Some(header) => header,
            None => return Ok(false),
        };
        let data_offset = source.position();
        source.skip_data(&header)?;
        index.push(header, header_offset, data_offset, source.position());
        Ok(true)
    }

    fn report(&mut self, keywords: usize, offset: u64, total: u64) {
        if let Some(callback) = self.progress.as_mut() {
            callback(IndexProgress {
                keywords,
                offset,
                total,
            });
        }
    }
}
