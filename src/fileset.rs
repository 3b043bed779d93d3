//! Result sets
//!
//! A simulation case writes its restart and summary data either into one
//! unified file per kind or into one file per report step:
//!
//! ```text
//!   unified       CASE.UNRST     CASE.UNSMRY     (formatted: FUNRST, FUNSMRY)
//!   non-unified   CASE.X0001     CASE.S0001      (formatted: F0001,  A0001)
//! ```
//!
//! `ResultSet` hides which convention a case uses and hands out a view for
//! report step N.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::config::{Config, LoadPolicy};
use crate::error::{EclError, Result};
use crate::file::{EclFile, OpenMode};
use crate::keyword::FileFormat;
use crate::series::SEQHDR_KEYWORD;
use crate::view::{FileView, ReportLookup};

/// Kind of per-step result data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Restart,
    Summary,
}

impl ResultKind {
    /// Extension of the unified file
    pub fn unified_extension(self, format: FileFormat) -> &'static str {
        match (self, format) {
            (ResultKind::Restart, FileFormat::Binary) => "UNRST",
            (ResultKind::Restart, FileFormat::Formatted) => "FUNRST",
            (ResultKind::Summary, FileFormat::Binary) => "UNSMRY",
            (ResultKind::Summary, FileFormat::Formatted) => "FUNSMRY",
        }
    }

    /// Leading letter of a per-step file extension
    pub fn step_prefix(self, format: FileFormat) -> char {
        match (self, format) {
            (ResultKind::Restart, FileFormat::Binary) => 'X',
            (ResultKind::Restart, FileFormat::Formatted) => 'F',
            (ResultKind::Summary, FileFormat::Binary) => 'S',
            (ResultKind::Summary, FileFormat::Formatted) => 'A',
        }
    }
}

/// `BASE.UNRST` and friends
pub fn unified_file_name(base: &str, kind: ResultKind, format: FileFormat) -> String {
    format!("{}.{}", base, kind.unified_extension(format))
}

/// `BASE.X0012` and friends
pub fn step_file_name(base: &str, kind: ResultKind, format: FileFormat, step: u32) -> String {
    format!("{}.{}{:04}", base, kind.step_prefix(format), step)
}

/// Format implied by a file extension, when the extension is one of the
/// ECLIPSE conventions
pub fn format_from_extension(path: &Path) -> Option<FileFormat> {
    let extension = path.extension()?.to_str()?.to_ascii_uppercase();
    let bytes = extension.as_bytes();
    let digits = |rest: &[u8]| rest.len() == 4 && rest.iter().all(u8::is_ascii_digit);

    match bytes {
        [b'X' | b'S', rest @ ..] if digits(rest) => Some(FileFormat::Binary),
        [b'F' | b'A', rest @ ..] if digits(rest) => Some(FileFormat::Formatted),
        _ => match extension.as_str() {
            "EGRID" | "GRID" | "INIT" | "UNRST" | "UNSMRY" | "SMSPEC" | "RFT" | "RSSPEC" => {
                Some(FileFormat::Binary)
            }
            "FEGRID" | "FGRID" | "FINIT" | "FUNRST" | "FUNSMRY" | "FSMSPEC" | "FRFT" | "FRSSPEC" => {
                Some(FileFormat::Formatted)
            }
            _ => None,
        },
    }
}

/// Format from the extension, else from the content: formatted files
/// start with a quoted keyword name
pub fn detect_format(path: &Path) -> Result<FileFormat> {
    if let Some(format) = format_from_extension(path) {
        return Ok(format);
    }

    let mut head = [0u8; 64];
    let n = fs::File::open(path)?.read(&mut head)?;
    let first = head[..n].iter().find(|b| !b.is_ascii_whitespace());
    Ok(match first {
        Some(b'\'') => FileFormat::Formatted,
        _ => FileFormat::Binary,
    })
}

/// Where the steps of a result set live
#[derive(Debug, Clone)]
enum StepLayout {
    Unified(PathBuf),
    NonUnified(BTreeMap<u32, PathBuf>),
}

/// The restart or summary files of one case
pub struct ResultSet {
    kind: ResultKind,
    layout: StepLayout,
    config: Config,
    unified: Option<EclFile>,
}

impl ResultSet {
    /// Find the files of `base` in `dir`. A unified file wins over
    /// per-step files; binary wins over formatted.
    pub fn resolve(dir: &Path, base: &str, kind: ResultKind, config: Config) -> Result<Self> {
        for format in [FileFormat::Binary, FileFormat::Formatted] {
            let path = dir.join(unified_file_name(base, kind, format));
            if path.is_file() {
                tracing::debug!("Using unified {:?} file {}", kind, path.display());
                return Ok(Self::new(kind, StepLayout::Unified(path), config));
            }
        }

        let mut steps = BTreeMap::new();
        let prefix = format!("{}.", base);
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            let extension = match name.strip_prefix(&prefix) {
                Some(extension) if extension.chars().count() == 5 => extension,
                _ => continue,
            };
            let mut chars = extension.chars();
            let letter = chars.next().map(|c| c.to_ascii_uppercase());
            let digits = chars.as_str();
            let format = [FileFormat::Binary, FileFormat::Formatted]
                .into_iter()
                .find(|&format| letter == Some(kind.step_prefix(format)));
            let step = match (format, digits.parse::<u32>()) {
                (Some(_), Ok(step)) => step,
                _ => continue,
            };
            // read_dir order is arbitrary; a binary step file always replaces a formatted one
            if format == Some(FileFormat::Binary) {
                steps.insert(step, path);
            } else {
                steps.entry(step).or_insert(path);
            }
        }

        if steps.is_empty() {
            return Err(EclError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no {:?} files for case {} in {}", kind, base, dir.display()),
            )));
        }
        tracing::debug!("Found {} {:?} step files for {}", steps.len(), kind, base);
        Ok(Self::new(kind, StepLayout::NonUnified(steps), config))
    }

    fn new(kind: ResultKind, layout: StepLayout, config: Config) -> Self {
        Self {
            kind,
            layout,
            config,
            unified: None,
        }
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn is_unified(&self) -> bool {
        matches!(self.layout, StepLayout::Unified(_))
    }

    /// Every file of the set
    pub fn paths(&self) -> Vec<PathBuf> {
        match &self.layout {
            StepLayout::Unified(path) => vec![path.clone()],
            StepLayout::NonUnified(steps) => steps.values().cloned().collect(),
        }
    }

    fn lookup(&self) -> ReportLookup {
        match self.config.load_policy {
            LoadPolicy::Strict => ReportLookup::Exact,
            LoadPolicy::Lenient => ReportLookup::PreviousAvailable,
        }
    }

    fn unified_file(&mut self, path: &Path) -> Result<&EclFile> {
        if self.unified.is_none() {
            self.unified = Some(EclFile::open_with(path, OpenMode::Read, self.config.clone())?);
        }
        match &self.unified {
            Some(file) => Ok(file),
            None => Err(EclError::Config("unified file not open".to_string())),
        }
    }

    /// Report steps available in the set, ascending
    pub fn steps(&mut self) -> Result<Vec<i64>> {
        match self.layout.clone() {
            StepLayout::NonUnified(steps) => Ok(steps.keys().map(|&s| s as i64).collect()),
            StepLayout::Unified(path) => {
                let kind = self.kind;
                let mut view = self.unified_file(&path)?.view(None)?;
                match kind {
                    ResultKind::Restart => {
                        let mut steps: Vec<i64> = view.report_steps()?.into_iter().map(|s| s.step).collect();
                        steps.sort_unstable();
                        Ok(steps)
                    }
                    ResultKind::Summary => {
                        let count = view.count(SEQHDR_KEYWORD) as i64;
                        Ok((0..count).collect())
                    }
                }
            }
        }
    }

    /// View of report step `step`.
    ///
    /// Under `LoadPolicy::Strict` a missing step is `StepNotFound`. Under
    /// `LoadPolicy::Lenient` the closest earlier step is used instead and
    /// a warning is logged.
    pub fn open_step(&mut self, step: i64) -> Result<FileView> {
        let lookup = self.lookup();
        match self.layout.clone() {
            StepLayout::Unified(path) => {
                let kind = self.kind;
                let mut view = self.unified_file(&path)?.view(None)?;
                match kind {
                    ResultKind::Restart => view.report_view(step, lookup),
                    ResultKind::Summary => {
                        let view = view.with_marker(SEQHDR_KEYWORD);
                        let reports: Vec<_> = view
                            .blocks()?
                            .into_iter()
                            .filter(|block| block.marker.is_some())
                            .collect();
                        let last = reports.len() as i64 - 1;
                        let chosen = match lookup {
                            ReportLookup::Exact => step,
                            ReportLookup::PreviousAvailable => step.min(last),
                        };
                        match usize::try_from(chosen).ok().and_then(|i| reports.get(i)) {
                            Some(block) => Ok(view.restrict_to(block)),
                            None => Err(EclError::StepNotFound { step }),
                        }
                    }
                }
            }
            StepLayout::NonUnified(steps) => {
                let key = u32::try_from(step).map_err(|_| EclError::StepNotFound { step })?;
                let path = match (steps.get(&key), lookup) {
                    (Some(path), _) => path,
                    (None, ReportLookup::PreviousAvailable) => match steps.range(..key).next_back() {
                        Some((previous, path)) => {
                            tracing::warn!("Step file {} missing, using step {}", step, previous);
                            path
                        }
                        None => return Err(EclError::StepNotFound { step }),
                    },
                    (None, ReportLookup::Exact) => return Err(EclError::StepNotFound { step }),
                };
                EclFile::open_with(path, OpenMode::Read, self.config.clone())?.view(None)
            }
        }
    }
}
