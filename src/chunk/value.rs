//! Cell values (spec §3 Data Model).

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// The contents of a single grid cell.
///
/// Writing [`CellValue::Empty`] or the empty string is semantically a
/// deletion. Numeric `0` is distinct from empty, and `Boolean` is distinct
/// from the numbers 0/1.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl CellValue {
    /// True for `Empty` and for `Text("")`; both are deletions on write.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Canonical decimal/text form shared by the clipboard transcoder
    /// (spec §4.H) and the view comparator (spec §4.K).
    pub fn to_canonical_string(&self) -> Cow<'_, str> {
        match self {
            CellValue::Empty => Cow::Borrowed(""),
            CellValue::Number(n) => Cow::Owned(format_canonical_number(*n)),
            CellValue::Boolean(b) => Cow::Borrowed(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Text(s) => Cow::Borrowed(s),
        }
    }

    /// Parses `s` as a finite number if and only if its canonical decimal
    /// form round-trips to exactly `s` (spec §4.H: "lexically canonical").
    pub fn parse_canonical_number(s: &str) -> Option<f64> {
        let n = s.parse::<f64>().ok()?;
        if n.is_finite() && format_canonical_number(n) == s {
            Some(n)
        } else {
            None
        }
    }
}

/// Rust's `Display` for `f64` already produces the shortest string that
/// round-trips back to the same value, which is the canonical form this
/// crate treats as authoritative (spec §9 leaves the exact canonicalization
/// rule open since the source's behavior was JS-specific; see DESIGN.md).
pub fn format_canonical_number(n: f64) -> String {
    n.to_string()
}
