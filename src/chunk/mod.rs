//! Chunk representations and the sparse/dense promotion state machine
//! (spec §4.C).

pub mod coord;
pub mod dense;
pub mod sparse;
pub mod tags;
pub mod value;

pub use coord::{local_index, ChunkCoord, CHUNK_AREA, CHUNK_SIZE};
pub use value::{format_canonical_number, CellValue};

use dense::DenseChunk;
use sparse::SparseChunk;
use tags::TAG_EMPTY;

use crate::interner::StringInterner;

/// Fill ratio at or above which a sparse chunk is promoted to dense.
const PROMOTE_RATIO: f64 = 0.5;
/// Fill ratio at or below which a non-empty dense chunk is demoted to
/// sparse.
const DEMOTE_RATIO: f64 = 0.3;

/// A single 64x64 tile of the grid, in whichever representation currently
/// best fits its fill ratio (spec §4.C).
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Sparse(SparseChunk),
    Dense(DenseChunk),
}

impl Chunk {
    pub fn new_sparse() -> Self {
        Chunk::Sparse(SparseChunk::new())
    }

    pub fn non_empty_count(&self) -> u32 {
        match self {
            Chunk::Sparse(c) => c.non_empty_count(),
            Chunk::Dense(c) => c.non_empty_count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.non_empty_count() == 0
    }

    pub fn is_dirty(&self) -> bool {
        match self {
            Chunk::Sparse(c) => c.dirty,
            Chunk::Dense(c) => c.dirty,
        }
    }

    pub fn mark_dirty(&mut self) {
        match self {
            Chunk::Sparse(c) => c.dirty = true,
            Chunk::Dense(c) => c.dirty = true,
        }
    }

    pub fn mark_clean(&mut self) {
        match self {
            Chunk::Sparse(c) => c.dirty = false,
            Chunk::Dense(c) => c.dirty = false,
        }
    }

    pub fn get(&self, local: u16, interner: &StringInterner) -> CellValue {
        match self {
            Chunk::Sparse(c) => c.get(local),
            Chunk::Dense(c) => c.get(local, interner),
        }
    }

    /// Writes `value` (non-empty) and returns the previous value. Does not
    /// check promotion/demotion; call [`Chunk::rebalance`] afterward.
    pub fn set(&mut self, local: u16, value: CellValue, interner: &mut StringInterner) -> CellValue {
        match self {
            Chunk::Sparse(c) => c.set(local, value, interner),
            Chunk::Dense(c) => c.set(local, value, interner),
        }
    }

    pub fn delete(&mut self, local: u16, interner: &StringInterner) -> CellValue {
        match self {
            Chunk::Sparse(c) => c.delete(local),
            Chunk::Dense(c) => c.delete(local, interner),
        }
    }

    pub fn fill_ratio(&self) -> f64 {
        match self {
            Chunk::Sparse(c) => c.fill_ratio(),
            Chunk::Dense(c) => c.fill_ratio(),
        }
    }

    /// Converts between representations in place when the fill ratio
    /// crosses the promotion/demotion thresholds (spec §4.C).
    pub fn rebalance(&mut self, interner: &mut StringInterner) {
        match self {
            Chunk::Sparse(sparse) if sparse.fill_ratio() >= PROMOTE_RATIO => {
                let mut dense = DenseChunk::new();
                for (local, value) in sparse.iter() {
                    dense.set(local, value, interner);
                }
                dense.dirty = true;
                *self = Chunk::Dense(dense);
            }
            Chunk::Dense(dense) if dense.non_empty_count() > 0 && dense.fill_ratio() <= DEMOTE_RATIO => {
                let mut sparse = SparseChunk::new();
                for (local, value) in dense.iter(interner) {
                    sparse.values.insert(local, value);
                }
                sparse.dirty = true;
                *self = Chunk::Sparse(sparse);
            }
            _ => {}
        }
    }

    pub fn iter<'a>(&'a self, interner: &'a StringInterner) -> Box<dyn Iterator<Item = (u16, CellValue)> + 'a> {
        match self {
            Chunk::Sparse(c) => Box::new(c.iter()),
            Chunk::Dense(c) => Box::new(c.iter(interner)),
        }
    }

    /// A coarse estimate of this chunk's resident memory, for
    /// `Sheet::estimated_bytes_in_hot_cache` (SPEC_FULL §B).
    pub fn estimated_bytes(&self) -> usize {
        match self {
            Chunk::Sparse(c) => {
                c.non_empty_count() as usize * (std::mem::size_of::<CellValue>() + std::mem::size_of::<u16>())
            }
            Chunk::Dense(_) => CHUNK_AREA * (1 + 8 + 4),
        }
    }

    /// Builds an owned, `Send`-able snapshot of this chunk for handing to
    /// the persistence pipeline, which runs off the main flow (spec §5).
    pub fn to_snapshot(&self, interner: &StringInterner) -> ChunkSnapshot {
        match self {
            Chunk::Dense(c) => ChunkSnapshot::Dense {
                tag: c.tag.clone(),
                number: c.number.clone(),
                string_id: c.string_id.clone(),
            },
            Chunk::Sparse(c) => ChunkSnapshot::Sparse {
                entries: c
                    .iter()
                    .map(|(local, value)| {
                        let snapshot_value = match value {
                            CellValue::Number(n) => SnapshotValue::Number(n),
                            CellValue::Boolean(b) => SnapshotValue::Boolean(b),
                            CellValue::Text(text) => {
                                SnapshotValue::StringId(interner.id_of(&text).unwrap_or(0))
                            }
                            CellValue::Empty => unreachable!("sparse chunks never store Empty"),
                        };
                        (local, snapshot_value)
                    })
                    .collect(),
            },
        }
    }
}

/// A value already reduced to its wire-ready form: strings are resolved to
/// interner ids ahead of time so the background worker never needs to touch
/// the live interner (spec §5: "no shared mutation across the main and
/// background contexts").
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotValue {
    Number(f64),
    Boolean(bool),
    StringId(u32),
}

/// An owned, by-value copy of a chunk's contents, sendable across the
/// main/worker boundary without touching the live interner (spec §5).
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkSnapshot {
    Dense {
        tag: Vec<u8>,
        number: Vec<f64>,
        string_id: Vec<u32>,
    },
    Sparse {
        entries: Vec<(u16, SnapshotValue)>,
    },
}

impl ChunkSnapshot {
    /// Rebuilds a live chunk from a loaded snapshot. String ids resolve
    /// against `interner`, which must already hold the persisted string
    /// table (loaded separately at sheet-open time, spec §5).
    pub fn into_chunk(self, interner: &StringInterner) -> Chunk {
        match self {
            ChunkSnapshot::Dense { tag, number, string_id } => {
                let non_empty_count = tag.iter().filter(|&&t| t != TAG_EMPTY).count() as u32;
                Chunk::Dense(DenseChunk {
                    tag,
                    number,
                    string_id,
                    non_empty_count,
                    dirty: false,
                })
            }
            ChunkSnapshot::Sparse { entries } => {
                let mut sparse = SparseChunk::new();
                for (local, value) in entries {
                    let cell = match value {
                        SnapshotValue::Number(n) => CellValue::Number(n),
                        SnapshotValue::Boolean(b) => CellValue::Boolean(b),
                        SnapshotValue::StringId(id) => {
                            CellValue::Text(interner.text_for(id).unwrap_or_default().to_string())
                        }
                    };
                    sparse.values.insert(local, cell);
                }
                Chunk::Sparse(sparse)
            }
        }
    }
}
