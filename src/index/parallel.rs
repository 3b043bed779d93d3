//! Bulk indexing
//!
//! Each file gets its own source and its own thread; nothing is shared
//! between builds.

use std::path::Path;

use crate::config::Config;
use crate::error::{EclError, Result};
use crate::file::open_source;
use crate::fileset::detect_format;

use super::{IndexBuilder, IndexReport, KeywordIndex};

impl KeywordIndex {
    /// Index many files in parallel, one scoped thread per file. Results
    /// come back in the order of `paths`; a failure affects only its own
    /// entry.
    pub fn build_many<P: AsRef<Path> + Sync>(paths: &[P], config: &Config) -> Vec<Result<IndexReport>> {
        let outcome = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = paths
                .iter()
                .map(|path| scope.spawn(move |_| build_one(path.as_ref(), config)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(EclError::IndexFile("index thread panicked".to_string()))
                    })
                })
                .collect::<Vec<_>>()
        });

        match outcome {
            Ok(results) => results,
            Err(_) => paths
                .iter()
                .map(|_| Err(EclError::IndexFile("index thread panicked".to_string())))
                .collect(),
        }
    }
}

fn build_one(path: &Path, config: &Config) -> Result<IndexReport> {
    let format = detect_format(path)?;
    let (mut source, _) = open_source(path, format, config)?;
    let report = IndexBuilder::new()
        .mode(config.index_mode)
        .build(&mut *source)?;
    tracing::debug!("Indexed {} ({} keywords)", path.display(), report.index.len());
    Ok(report)
}
