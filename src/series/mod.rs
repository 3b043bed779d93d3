//! Series Module
//!
//! Columnar time series assembled from per-step summary vectors.
//!
//! ## Model
//! ```text
//!              step 0   step 1   step 2   ...
//!   TIME        0.0      1.0      2.5
//!   FOPR       10.0     11.2     11.9
//!   WOPR:OP_1   4.1      4.3      4.4
//! ```
//! Each step is one column. Columns built from a file stay lazy: only
//! the location of the step's `PARAMS` vector is kept, and values are
//! read when asked for.
//!
//! ## State Machine
//! ```text
//!   Empty ──add──▶ Collecting ──finalize / end marker──▶ Finalized
//! ```
//! A finalized store rejects further steps.

mod key;
mod smspec;
mod unified;

pub use key::{VariableKey, VariableMapping};
pub use smspec::{load_smspec, KEYWORDS_KEYWORD, NAMES_KEYWORD, NUMS_KEYWORD, WGNAMES_KEYWORD};
pub use unified::{MINISTEP_KEYWORD, PARAMS_KEYWORD, SEQHDR_KEYWORD};

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EclError, Result};
use crate::view::{FileView, LazyArray};

/// Lifecycle of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Empty,
    Collecting,
    Finalized,
}

/// Where the values of one step come from
#[derive(Debug, Clone)]
enum ColumnValues {
    Loaded(Arc<[f64]>),
    Lazy(LazyArray),
    Remapped {
        inner: Arc<ColumnValues>,
        positions: Arc<[Option<usize>]>,
        default: f64,
    },
}

impl ColumnValues {
    fn value(&self, variable: usize) -> Result<f64> {
        match self {
            ColumnValues::Loaded(values) => {
                values
                    .get(variable)
                    .copied()
                    .ok_or(EclError::LengthMismatch {
                        expected: variable + 1,
                        actual: values.len(),
                    })
            }
            ColumnValues::Lazy(lazy) => lazy.read_f64(variable),
            ColumnValues::Remapped {
                inner,
                positions,
                default,
            } => match positions.get(variable).copied().flatten() {
                Some(source) => inner.value(source),
                None => Ok(*default),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct StepColumn {
    step: usize,
    time: f64,
    values: ColumnValues,
}

/// Variables × steps table with a strictly increasing time axis
#[derive(Debug, Clone)]
pub struct TimeSeriesStore {
    variables: Vec<VariableKey>,
    lookup: HashMap<VariableKey, usize>,
    synthetic: Vec<bool>,
    columns: Vec<StepColumn>,
    state: StoreState,
    end_marker: Option<String>,
}

impl TimeSeriesStore {
    /// Empty store for a fixed variable ordering
    pub fn new(variables: Vec<VariableKey>) -> Self {
        let mut lookup = HashMap::new();
        for (position, key) in variables.iter().enumerate() {
            lookup.entry(key.clone()).or_insert(position);
        }
        let synthetic = vec![false; variables.len()];
        Self {
            variables,
            lookup,
            synthetic,
            columns: Vec::new(),
            state: StoreState::Empty,
            end_marker: None,
        }
    }

    /// Finalize automatically when a step view contains `marker`
    pub fn with_end_marker(mut self, marker: impl Into<String>) -> Self {
        self.end_marker = Some(marker.into());
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn variables(&self) -> &[VariableKey] {
        &self.variables
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn step_count(&self) -> usize {
        self.columns.len()
    }

    pub fn has_variable(&self, key: &VariableKey) -> bool {
        self.lookup.contains_key(key)
    }

    /// True for variables filled with a default by a remap
    pub fn is_synthetic(&self, key: &VariableKey) -> Result<bool> {
        self.variable_position(key).map(|p| self.synthetic[p])
    }

    /// Simulation time of every step
    pub fn times(&self) -> Vec<f64> {
        self.columns.iter().map(|c| c.time).collect()
    }

    /// Step number of every step
    pub fn steps(&self) -> Vec<usize> {
        self.columns.iter().map(|c| c.step).collect()
    }

    fn variable_position(&self, key: &VariableKey) -> Result<usize> {
        self.lookup
            .get(key)
            .copied()
            .ok_or_else(|| EclError::UnknownKeyword {
                name: key.to_string(),
            })
    }

    // -------------------------------------------------------------------------
    // Appending
    // -------------------------------------------------------------------------

    /// Append the step held by `view`: the last `PARAMS` vector in the
    /// view becomes the column, read lazily. When the view holds the end
    /// marker the store finalizes after the step.
    pub fn add_step(&mut self, step_index: usize, sim_time: f64, view: &FileView) -> Result<()> {
        self.ensure_open()?;

        let has_params = view.has(PARAMS_KEYWORD);
        if has_params {
            let lazy = view.lazy(PARAMS_KEYWORD, view.count(PARAMS_KEYWORD) - 1)?;
            if lazy.len() != self.variables.len() {
                return Err(EclError::LengthMismatch {
                    expected: self.variables.len(),
                    actual: lazy.len(),
                });
            }
            self.push_column(step_index, sim_time, ColumnValues::Lazy(lazy))?;
        }

        if self.at_end_marker(view) {
            tracing::debug!("End marker seen at step {}, finalizing store", step_index);
            self.finalize();
        } else if !has_params {
            return Err(EclError::UnknownKeyword {
                name: PARAMS_KEYWORD.to_string(),
            });
        }
        Ok(())
    }

    fn at_end_marker(&self, view: &FileView) -> bool {
        self.end_marker
            .as_deref()
            .map_or(false, |marker| view.has(marker))
    }

    /// Append one step of in-memory values
    pub fn add_values(&mut self, step_index: usize, sim_time: f64, values: Vec<f64>) -> Result<()> {
        self.ensure_open()?;
        if values.len() != self.variables.len() {
            return Err(EclError::LengthMismatch {
                expected: self.variables.len(),
                actual: values.len(),
            });
        }
        self.push_column(step_index, sim_time, ColumnValues::Loaded(values.into()))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == StoreState::Finalized {
            return Err(EclError::StoreFinalized);
        }
        Ok(())
    }

    fn push_column(&mut self, step: usize, time: f64, values: ColumnValues) -> Result<()> {
        if !time.is_finite() {
            return Err(EclError::NonMonotonicTime {
                step,
                previous: self.columns.last().map_or(f64::NEG_INFINITY, |c| c.time),
                time,
            });
        }
        let column = StepColumn { step, time, values };
        if let Some(last) = self.columns.last_mut() {
            if time == last.time {
                tracing::debug!(
                    "Step {} repeats time {} of step {}, replacing it",
                    step,
                    time,
                    last.step
                );
                *last = column;
                return Ok(());
            }
            if !(time > last.time) {
                return Err(EclError::NonMonotonicTime {
                    step,
                    previous: last.time,
                    time,
                });
            }
        }
        self.columns.push(column);
        self.state = StoreState::Collecting;
        Ok(())
    }

    /// Close the store; later appends fail
    pub fn finalize(&mut self) {
        self.state = StoreState::Finalized;
    }

    // -------------------------------------------------------------------------
    // Reading
    // -------------------------------------------------------------------------

    /// `(step, value)` pairs of one variable, in time order. The iterator
    /// reads lazily and can be cloned to restart.
    pub fn variable(&self, key: &VariableKey) -> Result<VariableSeries<'_>> {
        let variable = self.variable_position(key)?;
        Ok(VariableSeries {
            columns: &self.columns,
            variable,
            next: 0,
        })
    }

    /// Value of `key` at the `position`-th stored step
    pub fn value(&self, key: &VariableKey, position: usize) -> Result<f64> {
        let variable = self.variable_position(key)?;
        let column = self.columns.get(position).ok_or(EclError::StepNotFound {
            step: position as i64,
        })?;
        column.values.value(variable)
    }

    fn bracket(&self, time: f64) -> Result<usize> {
        let (first, last) = match (self.columns.first(), self.columns.last()) {
            (Some(first), Some(last)) => (first.time, last.time),
            _ => {
                return Err(EclError::TimeOutOfRange {
                    time,
                    first: f64::NAN,
                    last: f64::NAN,
                })
            }
        };
        if !(time >= first && time <= last) {
            return Err(EclError::TimeOutOfRange { time, first, last });
        }
        Ok(self.columns.partition_point(|c| c.time < time))
    }

    /// Value of `key` at `time`, linearly interpolated between the two
    /// steps bracketing it. The first step is returned as is.
    pub fn value_at_time(&self, key: &VariableKey, time: f64) -> Result<f64> {
        let variable = self.variable_position(key)?;
        let index = self.bracket(time)?;
        let after = &self.columns[index];
        if index == 0 || after.time == time {
            return after.values.value(variable);
        }

        let before = &self.columns[index - 1];
        let span = after.time - before.time;
        let weight_before = (after.time - time) / span;
        let weight_after = (time - before.time) / span;
        Ok(weight_before * before.values.value(variable)? + weight_after * after.values.value(variable)?)
    }

    /// Value of a rate variable at `time`: rates hold over the interval
    /// ending at a step, so the step at or after `time` is returned.
    pub fn rate_at_time(&self, key: &VariableKey, time: f64) -> Result<f64> {
        let variable = self.variable_position(key)?;
        let index = self.bracket(time)?;
        self.columns[index].values.value(variable)
    }

    // -------------------------------------------------------------------------
    // Remapping
    // -------------------------------------------------------------------------

    /// This store seen through another variable ordering. Target
    /// variables without a source are filled with `default` and flagged
    /// synthetic. Nothing is read.
    pub fn remap(&self, mapping: &VariableMapping, default: f64) -> Result<TimeSeriesStore> {
        let positions: Arc<[Option<usize>]> = mapping.source_positions().into();
        if let Some(&bad) = positions.iter().flatten().find(|&&p| p >= self.variables.len()) {
            return Err(EclError::LengthMismatch {
                expected: self.variables.len(),
                actual: bad + 1,
            });
        }

        let mut remapped = TimeSeriesStore::new(mapping.target().to_vec());
        remapped.end_marker = self.end_marker.clone();
        remapped.synthetic = positions
            .iter()
            .map(|position| match position {
                Some(p) => self.synthetic[*p],
                None => true,
            })
            .collect();
        remapped.columns = self
            .columns
            .iter()
            .map(|column| StepColumn {
                step: column.step,
                time: column.time,
                values: ColumnValues::Remapped {
                    inner: Arc::new(column.values.clone()),
                    positions: Arc::clone(&positions),
                    default,
                },
            })
            .collect();
        remapped.state = self.state;
        Ok(remapped)
    }

    /// Attach a restart continuation. Own steps at or after the
    /// continuation's first time are dropped; the continuation's steps
    /// are remapped onto this store's variable ordering, with `default`
    /// for variables the continuation lacks.
    pub fn splice_restart(&mut self, continuation: &TimeSeriesStore, default: f64) -> Result<()> {
        self.ensure_open()?;
        let first_time = match continuation.columns.first() {
            Some(column) => column.time,
            None => return Ok(()),
        };

        let mapping = VariableMapping::between(&continuation.variables, &self.variables);
        let remapped = continuation.remap(&mapping, default)?;

        let keep = self.columns.partition_point(|c| c.time < first_time);
        let dropped = self.columns.len() - keep;
        self.columns.truncate(keep);
        if dropped > 0 {
            tracing::debug!(
                "Restart continuation at time {} supersedes {} step(s)",
                first_time,
                dropped
            );
        }

        for (flag, remapped_flag) in self.synthetic.iter_mut().zip(&remapped.synthetic) {
            *flag |= *remapped_flag;
        }
        for column in remapped.columns {
            self.push_column(column.step, column.time, column.values)?;
        }
        Ok(())
    }
}

/// Lazy `(step, value)` sequence of one variable
#[derive(Debug, Clone)]
pub struct VariableSeries<'a> {
    columns: &'a [StepColumn],
    variable: usize,
    next: usize,
}

impl Iterator for VariableSeries<'_> {
    type Item = Result<(usize, f64)>;

    fn next(&mut self) -> Option<Self::Item> {
        let column = self.columns.get(self.next)?;
        self.next += 1;
        Some(column.values.value(self.variable).map(|v| (column.step, v)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.columns.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for VariableSeries<'_> {}
