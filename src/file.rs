//! File handles
//!
//! `EclFile` ties one keyword file on disk to its source, its index and,
//! when opened for writing, a sink appending to it.
//!
//! ## Lifecycle
//! ```text
//!   open ─▶ index (scan, or load a valid persisted index)
//!     │
//!     ├── view(block) ─▶ FileView ─▶ get / get_occurrence
//!     │
//!     └── write(keyword) ─▶ refresh ─▶ index extended in place
//! ```
//!
//! Views share the source and a snapshot of the index. A refresh after
//! growth replaces the handle's index; existing views keep their snapshot.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{EclError, Result};
use crate::fileset::detect_format;
use crate::index::{IndexBuilder, IndexStatus, KeywordIndex, ScanOutcome};
use crate::keyword::{
    BinaryKeywordReader, BinaryKeywordWriter, FileFormat, FormattedKeywordReader,
    FormattedKeywordWriter, Keyword, KeywordSink, KeywordSource,
};
use crate::record::Endian;
use crate::view::{FileView, SharedSource};

/// How a file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file, read only
    Read,
    /// New or truncated file, written from the start
    Write,
    /// Existing file, new keywords go after the last one
    Append,
}

/// Open a keyword source over `path` in the given codec. Returns the
/// source and, for binary files, the byte order in use.
pub fn open_source(path: &Path, format: FileFormat, config: &Config) -> Result<(Box<dyn KeywordSource>, Option<Endian>)> {
    let reader = BufReader::new(File::open(path)?);
    Ok(match format {
        FileFormat::Binary => {
            let source = BinaryKeywordReader::open(reader, config)?;
            let endian = source.endian();
            (Box::new(source), Some(endian))
        }
        FileFormat::Formatted => (Box::new(FormattedKeywordReader::new(reader)?), None),
    })
}

/// One keyword file with its index
pub struct EclFile {
    path: PathBuf,
    mode: OpenMode,
    format: FileFormat,
    endian: Option<Endian>,
    config: Config,
    source: SharedSource,
    index: Arc<KeywordIndex>,
    outcome: ScanOutcome,
    sink: Option<Box<dyn KeywordSink>>,
}

impl EclFile {
    /// Open with the default configuration. `endian_flip` selects the byte
    /// order: `Some(true)` big-endian, `Some(false)` little-endian, `None`
    /// detect from the first record.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, endian_flip: Option<bool>) -> Result<Self> {
        let config = Config::builder().endian_flip(endian_flip).build();
        Self::open_with(path, mode, config)
    }

    pub fn open_with(path: impl AsRef<Path>, mode: OpenMode, config: Config) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();

        if mode == OpenMode::Write {
            File::create(&path)?;
        }
        let format = detect_format(&path)?;
        let (source, detected) = open_source(&path, format, &config)?;
        let source: SharedSource = Arc::new(Mutex::new(source));

        let (index, outcome) = Self::load_index(&path, mode, &config, &source)?;

        let endian = match format {
            FileFormat::Binary => Some(detected.unwrap_or(Endian::Big)),
            FileFormat::Formatted => None,
        };
        let sink = match mode {
            OpenMode::Read => None,
            OpenMode::Write | OpenMode::Append => {
                if !outcome.is_complete() {
                    tracing::warn!(
                        "Appending to {} after an incomplete index ({:?})",
                        path.display(),
                        outcome.status
                    );
                }
                Some(Self::open_sink(&path, format, endian, &config)?)
            }
        };

        tracing::debug!(
            "Opened {} ({:?}, {:?}) with {} keywords",
            path.display(),
            format,
            mode,
            index.len()
        );
        Ok(Self {
            path,
            mode,
            format,
            endian,
            config,
            source,
            index: Arc::new(index),
            outcome,
            sink,
        })
    }

    /// Use a valid persisted index when reading, scan otherwise
    fn load_index(
        path: &Path,
        mode: OpenMode,
        config: &Config,
        source: &SharedSource,
    ) -> Result<(KeywordIndex, ScanOutcome)> {
        let sidecar = KeywordIndex::sidecar_path(path);
        if mode == OpenMode::Read && sidecar.is_file() {
            match KeywordIndex::load_validated(&sidecar, path) {
                Ok(index) => {
                    tracing::debug!("Using persisted index {}", sidecar.display());
                    let outcome = ScanOutcome {
                        added: index.len(),
                        status: IndexStatus::Complete,
                        skipped: Vec::new(),
                    };
                    return Ok((index, outcome));
                }
                Err(e) => tracing::warn!("Ignoring persisted index {}: {}", sidecar.display(), e),
            }
        }

        let mut source = source.lock();
        let report = IndexBuilder::new()
            .mode(config.index_mode)
            .build(&mut **source)?;
        let outcome = ScanOutcome {
            added: report.index.len(),
            status: report.status,
            skipped: report.skipped,
        };
        Ok((report.index, outcome))
    }

    fn open_sink(
        path: &Path,
        format: FileFormat,
        endian: Option<Endian>,
        config: &Config,
    ) -> Result<Box<dyn KeywordSink>> {
        let file = OpenOptions::new().append(true).open(path)?;
        let offset = file.metadata()?.len();
        let writer = BufWriter::new(file);
        Ok(match format {
            FileFormat::Binary => {
                let endian = endian.unwrap_or(Endian::Big);
                Box::new(BinaryKeywordWriter::with_config(writer, config, endian, offset))
            }
            FileFormat::Formatted => Box::new(FormattedKeywordWriter::with_offset(writer, config.layout, offset)),
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Byte order of a binary file
    pub fn endian(&self) -> Option<Endian> {
        self.endian
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &Arc<KeywordIndex> {
        &self.index
    }

    /// How the last scan went: complete, truncated, or salvaged
    pub fn index_report(&self) -> &ScanOutcome {
        &self.outcome
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    /// View of the whole file, or of one block of it (partitioned by the
    /// configured block marker)
    pub fn view(&self, block: Option<usize>) -> Result<FileView> {
        let view = FileView::new(
            Arc::clone(&self.source),
            Arc::clone(&self.index),
            self.config.block_marker.clone(),
        );
        match block {
            Some(block) => view.restrict_to_block(block),
            None => Ok(view),
        }
    }

    // -------------------------------------------------------------------------
    // Writing
    // -------------------------------------------------------------------------

    /// Append one keyword. It becomes visible to views after `refresh`.
    pub fn write(&mut self, keyword: &Keyword) -> Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.write_keyword(keyword),
            None => Err(EclError::ReadOnly(self.path.display().to_string())),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }

    /// Pick up keywords appended since the last scan, by this handle or
    /// by another writer. The index is extended from its end when the file
    /// grew and rebuilt when it shrank. Returns the number of new entries.
    pub fn refresh(&mut self) -> Result<usize> {
        self.flush()?;

        let mut source = self.source.lock();
        let len = source.refresh_len()?;
        let end = self.index.end_offset();
        if len == end && self.outcome.status == IndexStatus::Complete {
            return Ok(0);
        }

        let mut builder = IndexBuilder::new().mode(self.config.index_mode);
        if len < end {
            tracing::info!(
                "{} shrank from {} to {} bytes, rebuilding index",
                self.path.display(),
                end,
                len
            );
            let report = builder.build(&mut **source)?;
            let added = report.index.len();
            self.outcome = ScanOutcome {
                added,
                status: report.status,
                skipped: report.skipped,
            };
            self.index = Arc::new(report.index);
            return Ok(added);
        }

        let index = Arc::make_mut(&mut self.index);
        let outcome = builder.extend(index, &mut **source)?;
        if outcome.added > 0 {
            tracing::debug!(
                "{} grew to {} bytes, indexed {} more keywords",
                self.path.display(),
                len,
                outcome.added
            );
        }
        let added = outcome.added;
        self.outcome = outcome;
        Ok(added)
    }

    /// Persist the index next to the file. Only complete indexes are
    /// saved.
    pub fn save_index(&mut self) -> Result<PathBuf> {
        self.flush()?;
        if !self.outcome.is_complete() {
            return Err(EclError::IndexFile(format!(
                "index of {} is incomplete ({:?})",
                self.path.display(),
                self.outcome.status
            )));
        }
        let sidecar = KeywordIndex::sidecar_path(&self.path);
        self.index.save(&sidecar, &self.path)?;
        Ok(sidecar)
    }
}

impl Drop for EclFile {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("Failed to flush {}: {}", self.path.display(), e);
        }
    }
}
