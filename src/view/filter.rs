//! Row filter specifications (spec §4.I).

use crate::chunk::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    IsBlank,
    IsNotBlank,
    Equals,
    Contains,
    StartsWith,
    EndsWith,
}

/// A single-column condition, matched against a cell's canonical string
/// form case-insensitively for the text operators.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub col: i64,
    pub op: FilterOp,
    /// Unused for `IsBlank`/`IsNotBlank`.
    pub value: Option<String>,
}

impl FilterCondition {
    pub fn matches(&self, cell: &CellValue) -> bool {
        match self.op {
            FilterOp::IsBlank => cell.is_empty(),
            FilterOp::IsNotBlank => !cell.is_empty(),
            FilterOp::Equals => match &self.value {
                Some(needle) => cell.to_canonical_string().eq_ignore_ascii_case(needle),
                None => false,
            },
            FilterOp::Contains => self.text_match(cell, |hay, needle| hay.contains(needle)),
            FilterOp::StartsWith => self.text_match(cell, |hay, needle| hay.starts_with(needle)),
            FilterOp::EndsWith => self.text_match(cell, |hay, needle| hay.ends_with(needle)),
        }
    }

    fn text_match(&self, cell: &CellValue, f: impl Fn(&str, &str) -> bool) -> bool {
        let Some(needle) = &self.value else {
            return false;
        };
        let haystack = cell.to_canonical_string().to_lowercase();
        f(&haystack, &needle.to_lowercase())
    }
}

/// A filter over a single column: either membership in an explicit set of
/// values, or a condition (spec §4.I).
///
/// `allowed` is semantically a set, but `CellValue` holds `f64` and so is
/// not `Hash`/`Eq`; membership is checked by linear scan with `PartialEq`
/// (row counts per column are expected to stay in the low thousands, not
/// millions, so this does not need a hash set).
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    DiscreteSet { col: i64, allowed: Vec<CellValue> },
    Condition(FilterCondition),
}

impl FilterSpec {
    pub fn column(&self) -> i64 {
        match self {
            FilterSpec::DiscreteSet { col, .. } => *col,
            FilterSpec::Condition(cond) => cond.col,
        }
    }

    pub fn matches(&self, cell: &CellValue) -> bool {
        match self {
            FilterSpec::DiscreteSet { allowed, .. } => allowed.iter().any(|v| v == cell),
            FilterSpec::Condition(cond) => cond.matches(cell),
        }
    }
}
