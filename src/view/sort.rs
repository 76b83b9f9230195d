//! Row ordering: the shared comparator and the single-column sort spec
//! (spec §4.I, §4.K).

use std::cmp::Ordering;

use crate::chunk::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortSpec {
    pub col: i64,
    pub direction: SortDirection,
}

/// Orders two cell values: empty is always greatest (sorts to the bottom
/// regardless of direction's later reversal), numbers compare numerically,
/// and anything else falls back to a numeric-aware, case-insensitive
/// string comparison (so `"2"` sorts before `"10"`, spec §4.K).
pub fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    if let (CellValue::Number(x), CellValue::Number(y)) = (a, b) {
        return x.partial_cmp(y).unwrap_or(Ordering::Equal);
    }
    if let (CellValue::Boolean(x), CellValue::Boolean(y)) = (a, b) {
        return x.cmp(y);
    }
    let (sa, sb) = (a.to_canonical_string(), b.to_canonical_string());
    match (CellValue::parse_canonical_number(&sa), CellValue::parse_canonical_number(&sb)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => sa.to_lowercase().cmp(&sb.to_lowercase()),
    }
}

/// Applies `direction` to a comparator result that already places empty
/// values last; reversing for `Descending` would otherwise float empties to
/// the top, so only the non-empty ordering is reversed.
pub fn apply_direction(a: &CellValue, b: &CellValue, direction: SortDirection) -> Ordering {
    let ord = compare_values(a, b);
    match direction {
        SortDirection::Ascending => ord,
        SortDirection::Descending => {
            if a.is_empty() || b.is_empty() {
                ord
            } else {
                ord.reverse()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_always_sorts_last() {
        assert_eq!(compare_values(&CellValue::Empty, &CellValue::Number(-1.0)), Ordering::Greater);
        assert_eq!(
            apply_direction(&CellValue::Empty, &CellValue::Number(-1.0), SortDirection::Descending),
            Ordering::Greater
        );
    }

    #[test]
    fn numeric_strings_compare_numerically_not_lexically() {
        let a = CellValue::Text("2".into());
        let b = CellValue::Text("10".into());
        assert_eq!(compare_values(&a, &b), Ordering::Less);
    }

    #[test]
    fn text_comparison_is_case_insensitive() {
        let a = CellValue::Text("Banana".into());
        let b = CellValue::Text("apple".into());
        assert_eq!(compare_values(&a, &b), Ordering::Greater);
    }

    #[test]
    fn descending_reverses_non_empty_order() {
        let a = CellValue::Number(1.0);
        let b = CellValue::Number(2.0);
        assert_eq!(apply_direction(&a, &b, SortDirection::Descending), Ordering::Greater);
    }
}
