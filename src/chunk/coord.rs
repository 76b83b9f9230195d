//! Chunk coordinate math: packed chunk keys and local-index math (spec §4.A).

/// Cells per chunk edge.
pub const CHUNK_SIZE: i64 = 64;
/// Bits to shift to divide by [`CHUNK_SIZE`].
const CHUNK_SHIFT: i64 = 6;
/// Total cells per chunk (64 * 64).
pub const CHUNK_AREA: usize = 4096;

/// Bounds the column-chunk count a packed key can address to 2^20.
const CHUNK_COL_MULTIPLIER: u64 = 1 << 20;

/// Which 64x64 chunk a cell belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    pub chunk_row: i64,
    pub chunk_col: i64,
}

impl ChunkCoord {
    #[inline]
    pub fn containing(row: i64, col: i64) -> Self {
        Self {
            chunk_row: row >> CHUNK_SHIFT,
            chunk_col: col >> CHUNK_SHIFT,
        }
    }

    /// Packs this coordinate into the opaque 64-bit key used for hashing and
    /// repository addressing (spec §4.A, §6): `chunk_row * 2^20 + chunk_col`.
    #[inline]
    pub fn key(self) -> u64 {
        (self.chunk_row as u64).wrapping_mul(CHUNK_COL_MULTIPLIER).wrapping_add(self.chunk_col as u64)
    }
}

/// `(local_row << 6) | local_col`, in `0..4096`.
#[inline]
pub fn local_index(row: i64, col: i64) -> u16 {
    (((row & 0x3f) << CHUNK_SHIFT) | (col & 0x3f)) as u16
}

/// Inverse of [`local_index`] combined with [`ChunkCoord`]: recovers the
/// global `(row, col)` a local index names within a given chunk.
#[inline]
pub fn global_coords(chunk: ChunkCoord, local: u16) -> (i64, i64) {
    let local_row = (local >> CHUNK_SHIFT) as i64;
    let local_col = (local as i64) & 0x3f;
    (
        (chunk.chunk_row << CHUNK_SHIFT) + local_row,
        (chunk.chunk_col << CHUNK_SHIFT) + local_col,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_matches_shift_by_64() {
        assert_eq!(ChunkCoord::containing(0, 0), ChunkCoord { chunk_row: 0, chunk_col: 0 });
        assert_eq!(ChunkCoord::containing(63, 63), ChunkCoord { chunk_row: 0, chunk_col: 0 });
        assert_eq!(ChunkCoord::containing(64, 128), ChunkCoord { chunk_row: 1, chunk_col: 2 });
    }

    #[test]
    fn local_index_wraps_within_chunk() {
        assert_eq!(local_index(0, 0), 0);
        assert_eq!(local_index(63, 63), 4095);
        assert_eq!(local_index(64, 64), 0);
        assert_eq!(local_index(65, 66), (1 << 6) | 2);
    }

    #[test]
    fn global_coords_inverts_local_index() {
        let chunk = ChunkCoord::containing(130, 200);
        let local = local_index(130, 200);
        assert_eq!(global_coords(chunk, local), (130, 200));
    }

    #[test]
    fn distinct_coords_usually_produce_distinct_keys() {
        let a = ChunkCoord { chunk_row: 1, chunk_col: 2 }.key();
        let b = ChunkCoord { chunk_row: 2, chunk_col: 1 }.key();
        assert_ne!(a, b);
    }
}
