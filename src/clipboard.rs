//! Tab-separated clipboard transcoding, with type inference on paste
//! (spec §4.H). The row/column-addressed entry points a caller actually uses
//! live on [`crate::sheet::Sheet`]; this module owns the grid↔text
//! transcoding and field classification they forward to.

use csv::{ReaderBuilder, WriterBuilder};

use crate::chunk::CellValue;
use crate::error::{Result, SheetCoreError};

/// The result of pasting TSV text into a sheet: the block's dimensions and
/// how many cells actually received a non-empty value (spec §4.F, §8
/// scenario 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TsvWriteResult {
    pub rows: usize,
    pub cols: usize,
    pub written_count: usize,
}

/// Serializes a rectangular block of values to TSV text, via the `csv`
/// crate configured with a tab delimiter so field quoting/escaping follows
/// its standard rules rather than a hand-rolled one.
pub(crate) fn rows_to_tsv(values: &[Vec<CellValue>]) -> Result<String> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(Vec::new());
    for row in values {
        let fields: Vec<String> = row.iter().map(|v| v.to_canonical_string().into_owned()).collect();
        writer.write_record(&fields)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| SheetCoreError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| SheetCoreError::Serialization(e.to_string()))
}

/// Parses TSV text into a rectangular block of values, classifying each
/// field as [`CellValue::Empty`], [`CellValue::Boolean`],
/// [`CellValue::Number`], or [`CellValue::Text`] (spec §4.H).
pub(crate) fn tsv_to_rows(text: &str) -> Result<Vec<Vec<CellValue>>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(classify_field).collect());
    }
    Ok(rows)
}

/// Infers a value's type from its raw text (spec §4.H):
/// - empty or whitespace-only -> `Empty`.
/// - exactly `TRUE` / `FALSE` (case-sensitive) -> `Boolean`.
/// - otherwise, if the field *trims* to a lexically canonical finite number
///   (so `" 42"` parses as `Number(42.0)` but `"007"` or `"1e3"` do not,
///   since reformatting those numbers would not reproduce the original
///   text) -> `Number`.
/// - otherwise the original, untrimmed text.
pub fn classify_field(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if field == "TRUE" {
        return CellValue::Boolean(true);
    }
    if field == "FALSE" {
        return CellValue::Boolean(false);
    }
    if let Some(n) = CellValue::parse_canonical_number(trimmed) {
        return CellValue::Number(n);
    }
    CellValue::Text(field.to_string())
}
