//! Unified summary files
//!
//! A unified summary file is a flat run of ministeps:
//!
//! ```text
//!   SEQHDR   [i32]          report step header
//!   MINISTEP [i32]          ministep number
//!   PARAMS   [f32; n]       one value per variable, PARAMS[0] = time (days)
//!   MINISTEP ...
//! ```

use crate::config::{Config, LoadPolicy};
use crate::error::{EclError, Result};
use crate::keyword::{ArrayData, Keyword, KeywordSink};
use crate::view::FileView;

use super::{TimeSeriesStore, VariableKey};

pub const SEQHDR_KEYWORD: &str = "SEQHDR";
pub const MINISTEP_KEYWORD: &str = "MINISTEP";
pub const PARAMS_KEYWORD: &str = "PARAMS";

impl TimeSeriesStore {
    /// Build a store from a unified summary view, one column per
    /// `MINISTEP`/`PARAMS` pair, then finalize it.
    ///
    /// A ministep without a usable `PARAMS` vector is an error under
    /// `LoadPolicy::Strict` and is skipped with a warning under
    /// `LoadPolicy::Lenient`.
    pub fn load_unified(view: &FileView, variables: Vec<VariableKey>, policy: LoadPolicy) -> Result<Self> {
        TimeSeriesStore::new(variables).load_from(view, policy)
    }

    /// Load a unified summary with the load policy and end marker of
    /// `config`
    pub fn load_with_config(view: &FileView, variables: Vec<VariableKey>, config: &Config) -> Result<Self> {
        let mut store = TimeSeriesStore::new(variables);
        if let Some(marker) = &config.end_marker {
            store = store.with_end_marker(marker.clone());
        }
        store.load_from(view, config.load_policy)
    }

    /// Same as [`load_unified`](Self::load_unified) for a store already
    /// configured, e.g. with an end marker
    pub fn load_from(self, view: &FileView, policy: LoadPolicy) -> Result<Self> {
        let mut store = self;
        let blocks = view.index().partition_range(view.scope(), MINISTEP_KEYWORD);

        for block in blocks.iter().filter(|block| block.marker.is_some()) {
            let mut ministep_view = view.restrict_to(block);
            let ministep = ministep_view.get(MINISTEP_KEYWORD)?.get_f64(0)? as usize;

            match Self::load_ministep(&mut store, ministep, &ministep_view) {
                Ok(()) => {}
                Err(e) if policy == LoadPolicy::Lenient && is_missing_data(&e) => {
                    tracing::warn!("Skipping ministep {}: {}", ministep, e);
                }
                Err(e) => return Err(e),
            }
            ministep_view.drop_cache();
            if store.state() == super::StoreState::Finalized {
                break;
            }
        }

        store.finalize();
        tracing::debug!(
            "Loaded {} ministeps of {} variables",
            store.step_count(),
            store.variable_count()
        );
        Ok(store)
    }

    fn load_ministep(store: &mut TimeSeriesStore, ministep: usize, view: &FileView) -> Result<()> {
        if !view.has(PARAMS_KEYWORD) {
            if store.at_end_marker(view) {
                store.finalize();
                return Ok(());
            }
            return Err(EclError::UnknownKeyword {
                name: PARAMS_KEYWORD.to_string(),
            });
        }
        let params = view.lazy(PARAMS_KEYWORD, view.count(PARAMS_KEYWORD) - 1)?;
        if params.is_empty() {
            return Err(EclError::LengthMismatch {
                expected: store.variable_count(),
                actual: 0,
            });
        }
        let sim_time = params.read_f64(0)?;
        store.add_step(ministep, sim_time, view)
    }

    /// Emit the store as a unified summary: one `SEQHDR`, then a
    /// `MINISTEP`/`PARAMS` pair per step. `PARAMS` is single precision,
    /// so values narrow to f32.
    pub fn write_unified(&self, sink: &mut dyn KeywordSink) -> Result<()> {
        sink.write_keyword(&Keyword::new(SEQHDR_KEYWORD, ArrayData::Int32(vec![0]))?)?;

        for (position, column) in self.columns.iter().enumerate() {
            let step = i32::try_from(column.step).map_err(|_| EclError::InvalidHeader {
                offset: sink.position(),
                reason: format!("ministep {} exceeds i32", column.step),
            })?;
            sink.write_keyword(&Keyword::new(MINISTEP_KEYWORD, ArrayData::Int32(vec![step]))?)?;

            let values = (0..self.variables.len())
                .map(|variable| column.values.value(variable).map(|v| v as f32))
                .collect::<Result<Vec<f32>>>()?;
            sink.write_keyword(&Keyword::new(PARAMS_KEYWORD, ArrayData::Float32(values))?)?;

            tracing::trace!("Wrote ministep {} ({} of {})", step, position + 1, self.columns.len());
        }
        sink.flush()
    }
}

/// Errors a lenient load may skip over
fn is_missing_data(error: &EclError) -> bool {
    matches!(
        error,
        EclError::UnknownKeyword { .. } | EclError::LengthMismatch { .. }
    )
}
