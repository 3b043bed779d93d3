//! Summary specification files
//!
//! A `.SMSPEC` file names the variables behind each `PARAMS` position:
//!
//! ```text
//!   KEYWORDS [char; n]   variable keyword, e.g. WOPR
//!   WGNAMES  [char; n]   well/group qualifier (older files: NAMES)
//!   NUMS     [i32; n]    cell, region or completion number
//! ```

use crate::error::{EclError, Result};
use crate::view::FileView;

use super::VariableKey;

pub const KEYWORDS_KEYWORD: &str = "KEYWORDS";
pub const WGNAMES_KEYWORD: &str = "WGNAMES";
pub const NAMES_KEYWORD: &str = "NAMES";
pub const NUMS_KEYWORD: &str = "NUMS";

/// Placeholder well name for unused slots
const DUMMY_NAME: &str = ":+:+:+:+";

/// Build one key per `PARAMS` position from a summary specification view
///
/// Well, group and completion variables take their qualifier from
/// `WGNAMES` (or `NAMES`). Block, region, aquifer and completion
/// variables take their number from `NUMS`. A dummy or blank name
/// leaves the key unqualified.
pub fn load_smspec(view: &mut FileView) -> Result<Vec<VariableKey>> {
    let keywords = view.get(KEYWORDS_KEYWORD)?;
    let keywords = keywords.as_strings()?;

    let names = if view.has(WGNAMES_KEYWORD) {
        Some(view.get(WGNAMES_KEYWORD)?)
    } else if view.has(NAMES_KEYWORD) {
        Some(view.get(NAMES_KEYWORD)?)
    } else {
        None
    };
    let names = names.as_deref().map(|k| k.as_strings()).transpose()?;

    let nums = if view.has(NUMS_KEYWORD) {
        Some(view.get(NUMS_KEYWORD)?)
    } else {
        None
    };
    let nums = nums.as_deref().map(|k| k.as_i32()).transpose()?;

    for actual in [names.map(<[String]>::len), nums.map(<[i32]>::len)].into_iter().flatten() {
        if actual != keywords.len() {
            return Err(EclError::LengthMismatch {
                expected: keywords.len(),
                actual,
            });
        }
    }

    let keys = keywords
        .iter()
        .enumerate()
        .map(|(position, keyword)| {
            let mut key = VariableKey::new(keyword.as_str());
            let family = Family::of(keyword);
            if family.takes_name() {
                key.name = names
                    .map(|n| n[position].trim())
                    .filter(|n| !n.is_empty() && *n != DUMMY_NAME)
                    .map(str::to_string);
            }
            if family.takes_number() {
                key.number = nums.map(|n| n[position]);
            }
            key
        })
        .collect::<Vec<_>>();

    tracing::debug!("Summary specification names {} variables", keys.len());
    Ok(keys)
}

/// Variable family, decided by the first letter of the keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Well,
    Group,
    Completion,
    Block,
    Region,
    Aquifer,
    Other,
}

impl Family {
    fn of(keyword: &str) -> Self {
        match keyword.chars().next() {
            Some('W') => Family::Well,
            Some('G') => Family::Group,
            Some('C') => Family::Completion,
            Some('B') => Family::Block,
            Some('R') => Family::Region,
            Some('A') => Family::Aquifer,
            _ => Family::Other,
        }
    }

    fn takes_name(self) -> bool {
        matches!(self, Family::Well | Family::Group | Family::Completion)
    }

    fn takes_number(self) -> bool {
        matches!(
            self,
            Family::Completion | Family::Block | Family::Region | Family::Aquifer
        )
    }
}
