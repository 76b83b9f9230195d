//! Sparse chunk representation: a map from local index to value, holding
//! only non-empty cells (spec §4.C).

use std::collections::BTreeMap;

use crate::chunk::coord::CHUNK_AREA;
use crate::chunk::value::CellValue;
use crate::interner::StringInterner;

/// `BTreeMap` keeps entries ordered by local index, which both the dense
/// promotion path and the byte codec (spec §4.D: "sorted by local-index
/// ascending") need.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SparseChunk {
    pub values: BTreeMap<u16, CellValue>,
    pub dirty: bool,
}

impl SparseChunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn non_empty_count(&self) -> u32 {
        self.values.len() as u32
    }

    pub fn fill_ratio(&self) -> f64 {
        self.non_empty_count() as f64 / CHUNK_AREA as f64
    }

    pub fn get(&self, local: u16) -> CellValue {
        self.values.get(&local).cloned().unwrap_or(CellValue::Empty)
    }

    /// Writes `value` (assumed non-empty; callers route empty writes to
    /// [`SparseChunk::delete`]) and returns the previous value.
    pub fn set(&mut self, local: u16, value: CellValue, interner: &mut StringInterner) -> CellValue {
        if let CellValue::Text(text) = &value {
            // Interning happens on write regardless of representation, so
            // the dirty flag and id allocation are independent of whether a
            // cell currently lives in a sparse or dense chunk (spec §4.F).
            interner.id_for(text);
        }
        self.values.insert(local, value).unwrap_or(CellValue::Empty)
    }

    pub fn delete(&mut self, local: u16) -> CellValue {
        self.values.remove(&local).unwrap_or(CellValue::Empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, CellValue)> + '_ {
        self.values.iter().map(|(&i, v)| (i, v.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete_round_trip() {
        let mut chunk = SparseChunk::new();
        let mut interner = StringInterner::new();
        assert_eq!(chunk.set(5, CellValue::Number(3.0), &mut interner), CellValue::Empty);
        assert_eq!(chunk.non_empty_count(), 1);
        assert_eq!(chunk.get(5), CellValue::Number(3.0));
        assert_eq!(chunk.delete(5), CellValue::Number(3.0));
        assert_eq!(chunk.non_empty_count(), 0);
        assert_eq!(chunk.get(5), CellValue::Empty);
    }

    #[test]
    fn overwrite_does_not_change_count() {
        let mut chunk = SparseChunk::new();
        let mut interner = StringInterner::new();
        chunk.set(0, CellValue::Number(1.0), &mut interner);
        chunk.set(0, CellValue::Number(2.0), &mut interner);
        assert_eq!(chunk.non_empty_count(), 1);
        assert_eq!(chunk.get(0), CellValue::Number(2.0));
    }
}
