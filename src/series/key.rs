//! Variable identity
//!
//! A summary variable is a keyword (`WOPR`), optionally qualified by a
//! well or group name (`OP_1`) and/or a number (cell, region, block).
//! The textual form joins the present parts with `:`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{EclError, Result};

/// Identity of one column of a time series store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableKey {
    pub keyword: String,
    pub name: Option<String>,
    pub number: Option<i32>,
}

impl VariableKey {
    /// Field or time variable without qualifier (`FOPT`, `TIME`)
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            name: None,
            number: None,
        }
    }

    /// Well or group variable (`WOPR:OP_1`)
    pub fn named(keyword: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            name: Some(name.into()),
            number: None,
        }
    }

    /// Cell, region or block variable (`BPR:1234`)
    pub fn numbered(keyword: impl Into<String>, number: i32) -> Self {
        Self {
            keyword: keyword.into(),
            name: None,
            number: Some(number),
        }
    }

    /// Completion-style variable carrying both (`CWIR:OP_1:12`)
    pub fn with_number(mut self, number: i32) -> Self {
        self.number = Some(number);
        self
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword)?;
        if let Some(name) = &self.name {
            write!(f, ":{}", name)?;
        }
        if let Some(number) = self.number {
            write!(f, ":{}", number)?;
        }
        Ok(())
    }
}

impl FromStr for VariableKey {
    type Err = EclError;

    /// Parses `KW`, `KW:NAME`, `KW:NUM` and `KW:NAME:NUM`. A single
    /// qualifier that parses as an integer is taken as the number.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let invalid = || EclError::Config(format!("invalid variable key {:?}", s));

        let keyword = parts.first().copied().filter(|k| !k.is_empty()).ok_or_else(invalid)?;
        let key = match parts.as_slice() {
            [_] => VariableKey::new(keyword),
            [_, qualifier] => match qualifier.parse::<i32>() {
                Ok(number) => VariableKey::numbered(keyword, number),
                Err(_) if !qualifier.is_empty() => VariableKey::named(keyword, *qualifier),
                Err(_) => return Err(invalid()),
            },
            [_, name, number] => {
                let number = number.parse::<i32>().map_err(|_| invalid())?;
                VariableKey::named(keyword, *name).with_number(number)
            }
            _ => return Err(invalid()),
        };
        Ok(key)
    }
}

/// Positions of target variables within a source ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableMapping {
    target: Vec<VariableKey>,
    source_positions: Vec<Option<usize>>,
}

impl VariableMapping {
    /// Match variables by key; target variables absent from `source` map
    /// to `None`
    pub fn between(source: &[VariableKey], target: &[VariableKey]) -> Self {
        let mut by_key: HashMap<&VariableKey, usize> = HashMap::new();
        for (position, key) in source.iter().enumerate() {
            by_key.entry(key).or_insert(position);
        }
        let source_positions = target.iter().map(|key| by_key.get(key).copied()).collect();
        Self {
            target: target.to_vec(),
            source_positions,
        }
    }

    /// Explicit mapping: `source_positions[i]` is where target variable `i`
    /// lives in the source ordering
    pub fn explicit(target: Vec<VariableKey>, source_positions: Vec<Option<usize>>) -> Result<Self> {
        if target.len() != source_positions.len() {
            return Err(EclError::LengthMismatch {
                expected: target.len(),
                actual: source_positions.len(),
            });
        }
        Ok(Self {
            target,
            source_positions,
        })
    }

    pub fn target(&self) -> &[VariableKey] {
        &self.target
    }

    pub fn source_positions(&self) -> &[Option<usize>] {
        &self.source_positions
    }

    /// Target variables with no source counterpart
    pub fn unmapped(&self) -> impl Iterator<Item = &VariableKey> {
        self.target
            .iter()
            .zip(&self.source_positions)
            .filter(|(_, position)| position.is_none())
            .map(|(key, _)| key)
    }
}
