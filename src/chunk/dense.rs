//! Dense chunk representation: struct-of-arrays over a fixed 4096-cell tile
//! (spec §4.C).

use crate::chunk::coord::CHUNK_AREA;
use crate::chunk::tags::{TAG_BOOLEAN, TAG_EMPTY, TAG_NUMBER, TAG_STRING};
use crate::chunk::value::CellValue;
use crate::interner::StringInterner;

#[derive(Debug, Clone, PartialEq)]
pub struct DenseChunk {
    pub tag: Vec<u8>,
    pub number: Vec<f64>,
    pub string_id: Vec<u32>,
    pub non_empty_count: u32,
    pub dirty: bool,
}

impl DenseChunk {
    pub fn new() -> Self {
        Self {
            tag: vec![TAG_EMPTY; CHUNK_AREA],
            number: vec![0.0; CHUNK_AREA],
            string_id: vec![0; CHUNK_AREA],
            non_empty_count: 0,
            dirty: false,
        }
    }

    pub fn non_empty_count(&self) -> u32 {
        self.non_empty_count
    }

    pub fn fill_ratio(&self) -> f64 {
        self.non_empty_count as f64 / CHUNK_AREA as f64
    }

    pub fn get(&self, local: u16, interner: &StringInterner) -> CellValue {
        let i = local as usize;
        match self.tag[i] {
            TAG_NUMBER => CellValue::Number(self.number[i]),
            TAG_BOOLEAN => CellValue::Boolean(self.number[i] != 0.0),
            TAG_STRING => CellValue::Text(
                interner
                    .text_for(self.string_id[i])
                    .unwrap_or_default()
                    .to_string(),
            ),
            _ => CellValue::Empty,
        }
    }

    /// Writes `value` (assumed non-empty) and returns the previous value.
    pub fn set(&mut self, local: u16, value: CellValue, interner: &mut StringInterner) -> CellValue {
        let i = local as usize;
        let prev = self.get(local, interner);
        match &value {
            CellValue::Number(n) => {
                self.tag[i] = TAG_NUMBER;
                self.number[i] = *n;
                self.string_id[i] = 0;
            }
            CellValue::Boolean(b) => {
                self.tag[i] = TAG_BOOLEAN;
                self.number[i] = if *b { 1.0 } else { 0.0 };
                self.string_id[i] = 0;
            }
            CellValue::Text(text) => {
                self.tag[i] = TAG_STRING;
                self.string_id[i] = interner.id_for(text);
                self.number[i] = 0.0;
            }
            CellValue::Empty => unreachable!("empty writes are routed to delete"),
        }
        if prev.is_empty() {
            self.non_empty_count += 1;
        }
        prev
    }

    pub fn delete(&mut self, local: u16, interner: &StringInterner) -> CellValue {
        let i = local as usize;
        let prev = self.get(local, interner);
        if prev.is_empty() {
            return CellValue::Empty;
        }
        self.tag[i] = TAG_EMPTY;
        self.number[i] = 0.0;
        self.string_id[i] = 0;
        self.non_empty_count -= 1;
        prev
    }

    pub fn iter<'a>(&'a self, interner: &'a StringInterner) -> impl Iterator<Item = (u16, CellValue)> + 'a {
        (0..CHUNK_AREA as u16).filter_map(move |local| {
            let v = self.get(local, interner);
            if v.is_empty() {
                None
            } else {
                Some((local, v))
            }
        })
    }
}

impl Default for DenseChunk {
    fn default() -> Self {
        Self::new()
    }
}
