//! The spreadsheet grid engine: chunk storage, the hot cache, transaction
//! log, and the public read/write API (spec §4).

pub mod labels;

use crate::cache::LruCache;
use crate::chunk::coord::{global_coords, local_index, ChunkCoord};
use crate::chunk::{CellValue, Chunk};
use crate::clipboard::{self, TsvWriteResult};
use crate::error::Result;
use crate::interner::StringInterner;
use crate::persistence::PersistenceHandle;
use crate::transaction::TransactionLog;

/// Tunables for a [`Sheet`] instance. Plain constructor parameters rather
/// than environment-driven configuration: this crate is a library, not a
/// standalone service (SPEC_FULL §A.3).
#[derive(Debug, Clone, Copy)]
pub struct SheetConfig {
    /// Maximum number of chunks held in the hot cache at once.
    pub hot_cache_capacity: usize,
    /// Row count a freshly constructed sheet starts with (spec §6).
    pub initial_row_count: i64,
    /// Column count a freshly constructed sheet starts with (spec §6).
    pub initial_column_count: i64,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            hot_cache_capacity: 1024,
            initial_row_count: 1000,
            initial_column_count: 26,
        }
    }
}

/// A snapshot of hot-cache occupancy, for callers that want introspection
/// without reaching into internals (SPEC_FULL §B).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct HotCacheStats {
    pub chunk_count: usize,
    pub estimated_bytes: usize,
}

pub struct Sheet {
    chunks: LruCache<u64, Chunk>,
    interner: StringInterner,
    log: TransactionLog,
    config: SheetConfig,
    persistence: Option<PersistenceHandle>,
    row_count: i64,
    column_count: i64,
}

impl Sheet {
    pub fn new(config: SheetConfig) -> Self {
        Self {
            chunks: LruCache::new(config.hot_cache_capacity),
            interner: StringInterner::new(),
            log: TransactionLog::new(),
            row_count: config.initial_row_count,
            column_count: config.initial_column_count,
            config,
            persistence: None,
        }
    }

    /// Builds a sheet backed by a persistence pipeline, loading the string
    /// table eagerly so later chunk loads can resolve string ids without
    /// touching the repository again (spec §5).
    pub fn with_persistence(config: SheetConfig, persistence: PersistenceHandle) -> Result<Self> {
        let mut sheet = Self {
            chunks: LruCache::new(config.hot_cache_capacity),
            interner: StringInterner::new(),
            log: TransactionLog::new(),
            row_count: config.initial_row_count,
            column_count: config.initial_column_count,
            config,
            persistence: Some(persistence),
        };
        let table = sheet
            .persistence
            .as_ref()
            .expect("just set")
            .load_string_table_blocking()?;
        sheet.interner.load_from(table);
        Ok(sheet)
    }

    pub fn config(&self) -> SheetConfig {
        self.config
    }

    pub fn row_count(&self) -> i64 {
        self.row_count
    }

    pub fn column_count(&self) -> i64 {
        self.column_count
    }

    /// Spreadsheet-style labels (`A`, `B`, ..., `Z`, `AA`, ...) for every
    /// column currently in bounds.
    pub fn column_labels(&self) -> Vec<String> {
        (0..self.column_count).map(labels::column_label).collect()
    }

    /// Grows the sheet by `n` rows. A no-op if `n` is not positive.
    pub fn add_rows(&mut self, n: i64) {
        if n > 0 {
            self.row_count += n;
        }
    }

    /// Grows the sheet by `n` columns. A no-op if `n` is not positive.
    pub fn add_columns(&mut self, n: i64) {
        if n > 0 {
            self.column_count += n;
        }
    }

    /// Whether `(row, col)` currently holds a non-empty value.
    pub fn has(&mut self, row: i64, col: i64) -> bool {
        !self.get(row, col).is_empty()
    }

    /// Reads a rectangular block of values, row-major, including empty
    /// cells (unlike [`Sheet::entries`], which only reports non-empty
    /// ones).
    pub fn get_block(
        &mut self,
        top_row: i64,
        top_col: i64,
        bottom_row: i64,
        bottom_col: i64,
    ) -> Vec<Vec<CellValue>> {
        (top_row..=bottom_row)
            .map(|row| (top_col..=bottom_col).map(|col| self.get(row, col)).collect())
            .collect()
    }

    fn chunk_key(row: i64, col: i64) -> u64 {
        ChunkCoord::containing(row, col).key()
    }

    fn load_or_create(&self, key: u64) -> Chunk {
        if let Some(persistence) = &self.persistence {
            match persistence.load_chunk_blocking(key) {
                Ok(Some(snapshot)) => return snapshot.into_chunk(&self.interner),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(chunk_key = key, error = %err, "chunk load failed; treating as absent");
                }
            }
        }
        Chunk::new_sparse()
    }

    fn insert_chunk(&mut self, key: u64, chunk: Chunk) {
        if let Some((evicted_key, evicted_chunk)) = self.chunks.set(key, chunk) {
            if evicted_chunk.is_dirty() {
                tracing::debug!(chunk_key = evicted_key, "evicting dirty chunk; enqueuing for persistence");
                if let Some(persistence) = &mut self.persistence {
                    let snapshot = evicted_chunk.to_snapshot(&self.interner);
                    persistence.enqueue_save(evicted_key, snapshot);
                } else {
                    tracing::debug!(chunk_key = evicted_key, "dropping dirty chunk with no persistence configured");
                }
            }
        }
    }

    fn ensure_chunk_present(&mut self, key: u64) {
        if self.chunks.has(&key) {
            return;
        }
        let chunk = self.load_or_create(key);
        self.insert_chunk(key, chunk);
    }

    /// Reads a cell's value. Untouched cells with no chunk loaded and
    /// nothing persisted return `Empty` without allocating a chunk.
    pub fn get(&mut self, row: i64, col: i64) -> CellValue {
        let key = Self::chunk_key(row, col);
        let local = local_index(row, col);
        if !self.chunks.has(&key) {
            let chunk = self.load_or_create(key);
            if chunk.is_empty() {
                return CellValue::Empty;
            }
            self.insert_chunk(key, chunk);
        }
        let chunk = self.chunks.get(&key).expect("just ensured present");
        chunk.get(local, &self.interner)
    }

    fn write_cell(&mut self, row: i64, col: i64, value: CellValue) -> CellValue {
        let key = Self::chunk_key(row, col);
        let local = local_index(row, col);
        self.ensure_chunk_present(key);
        let chunk = self.chunks.get_mut(&key).expect("just ensured present");
        let prev = if value.is_empty() {
            chunk.delete(local, &self.interner)
        } else {
            let prev = chunk.set(local, value, &mut self.interner);
            chunk.rebalance(&mut self.interner);
            prev
        };
        chunk.mark_dirty();
        prev
    }

    /// Writes `value`. Writing [`CellValue::Empty`] or `Text("")` deletes
    /// the cell (spec §4.C).
    pub fn set(&mut self, row: i64, col: i64, value: CellValue) -> Result<()> {
        self.log.begin();
        let prev = self.write_cell(row, col, value.clone());
        self.log.record(row, col, prev, value);
        self.log.commit();
        Ok(())
    }

    pub fn delete(&mut self, row: i64, col: i64) -> Result<()> {
        self.log.begin();
        let prev = self.write_cell(row, col, CellValue::Empty);
        self.log.record(row, col, prev, CellValue::Empty);
        self.log.commit();
        Ok(())
    }

    /// Writes a rectangular block of values as a single undo step. Returns
    /// the number of cells the block assigned a non-empty value (spec §4.F,
    /// §8 scenario 4), regardless of what was there before.
    pub fn set_block(&mut self, top_row: i64, top_col: i64, values: &[Vec<CellValue>]) -> Result<usize> {
        self.transact(|sheet| {
            let mut written_count = 0;
            for (dr, row_values) in values.iter().enumerate() {
                for (dc, value) in row_values.iter().enumerate() {
                    if !value.is_empty() {
                        written_count += 1;
                    }
                    sheet.set(top_row + dr as i64, top_col + dc as i64, value.clone())?;
                }
            }
            Ok(written_count)
        })
    }

    /// Deletes a rectangular block of cells as a single undo step. Returns
    /// the number of cells that held a non-empty value before the delete
    /// (spec §4.F).
    pub fn delete_block(&mut self, top_row: i64, top_col: i64, rows: i64, cols: i64) -> Result<usize> {
        self.transact(|sheet| {
            let mut deleted_count = 0;
            for dr in 0..rows {
                for dc in 0..cols {
                    let row = top_row + dr;
                    let col = top_col + dc;
                    if !sheet.get(row, col).is_empty() {
                        deleted_count += 1;
                    }
                    sheet.delete(row, col)?;
                }
            }
            Ok(deleted_count)
        })
    }

    /// Serializes `[top, bottom] x [left, right]` to TSV text (spec §4.F).
    pub fn serialize_range_to_tsv(&mut self, top: i64, left: i64, bottom: i64, right: i64) -> Result<String> {
        let block = self.get_block(top, left, bottom, right);
        clipboard::rows_to_tsv(&block)
    }

    /// Parses `text` as TSV and writes it at `(top, left)` as a single undo
    /// step, returning the pasted block's dimensions and how many cells
    /// received a non-empty value (spec §4.F, §8 scenario 4).
    pub fn deserialize_tsv(&mut self, top: i64, left: i64, text: &str) -> Result<TsvWriteResult> {
        let grid = clipboard::tsv_to_rows(text)?;
        let rows = grid.len();
        let cols = grid.iter().map(|row| row.len()).max().unwrap_or(0);
        let written_count = self.set_block(top, left, &grid)?;
        Ok(TsvWriteResult { rows, cols, written_count })
    }

    /// Runs `f` as a single undo/redo step: nested `set`/`delete` calls
    /// inside `f` collapse into this transaction rather than each creating
    /// their own history entry.
    pub fn transact<T>(&mut self, f: impl FnOnce(&mut Sheet) -> Result<T>) -> Result<T> {
        self.log.begin();
        let result = f(self);
        match &result {
            Ok(_) => self.log.commit(),
            Err(_) => self.log.discard(),
        }
        result
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    /// Reverts the most recent transaction. Replayed writes re-enter
    /// `write_cell` directly so they never touch the hot-cache eviction
    /// path differently from a normal write, but the log is told to ignore
    /// them (spec §4.G).
    pub fn undo(&mut self) -> bool {
        let Some(txn) = self.log.pop_undo() else {
            return false;
        };
        self.log.begin_history_replay();
        for op in txn.ops.iter().rev() {
            self.write_cell(op.row, op.col, op.prev.clone());
        }
        self.log.end_history_replay();
        self.log.push_redo(txn);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(txn) = self.log.pop_redo() else {
            return false;
        };
        self.log.begin_history_replay();
        for op in txn.ops.iter() {
            self.write_cell(op.row, op.col, op.next.clone());
        }
        self.log.end_history_replay();
        self.log.push_undo(txn);
        true
    }

    /// Eagerly loads every chunk overlapping `[start, end]` into the hot
    /// cache, so a subsequent scan of the range does not pay per-chunk load
    /// latency one chunk at a time. Missing chunks are requested from the
    /// backend in parallel rather than one at a time (spec §4.I), and the
    /// string table is flushed afterward if the interner picked up any
    /// unpersisted entries while resolving them.
    pub fn load_range(&mut self, start_row: i64, start_col: i64, end_row: i64, end_col: i64) -> Result<()> {
        let start_chunk = ChunkCoord::containing(start_row, start_col);
        let end_chunk = ChunkCoord::containing(end_row, end_col);
        let mut missing = Vec::new();
        for chunk_row in start_chunk.chunk_row..=end_chunk.chunk_row {
            for chunk_col in start_chunk.chunk_col..=end_chunk.chunk_col {
                let key = ChunkCoord { chunk_row, chunk_col }.key();
                if !self.chunks.has(&key) {
                    missing.push(key);
                }
            }
        }

        if let Some(persistence) = &self.persistence {
            for (key, result) in persistence.load_chunks_blocking(&missing) {
                let chunk = match result {
                    Ok(Some(snapshot)) => snapshot.into_chunk(&self.interner),
                    Ok(None) => Chunk::new_sparse(),
                    Err(err) => {
                        tracing::warn!(chunk_key = key, error = %err, "chunk load failed; treating as absent");
                        Chunk::new_sparse()
                    }
                };
                self.insert_chunk(key, chunk);
            }
        } else {
            for key in missing {
                self.insert_chunk(key, Chunk::new_sparse());
            }
        }

        if self.interner.has_unpersisted_changes() {
            if let Some(persistence) = &mut self.persistence {
                persistence.save_string_table_blocking(self.interner.snapshot())?;
                self.interner.clear_unpersisted_changes();
            }
        }
        Ok(())
    }

    /// Returns all non-empty cells in `[start, end]`, row-major.
    pub fn entries(
        &mut self,
        start_row: i64,
        start_col: i64,
        end_row: i64,
        end_col: i64,
    ) -> Vec<(i64, i64, CellValue)> {
        let mut out = Vec::new();
        let start_chunk = ChunkCoord::containing(start_row, start_col);
        let end_chunk = ChunkCoord::containing(end_row, end_col);
        for chunk_row in start_chunk.chunk_row..=end_chunk.chunk_row {
            for chunk_col in start_chunk.chunk_col..=end_chunk.chunk_col {
                let coord = ChunkCoord { chunk_row, chunk_col };
                let key = coord.key();
                if !self.chunks.has(&key) {
                    let chunk = self.load_or_create(key);
                    if chunk.is_empty() {
                        continue;
                    }
                    self.insert_chunk(key, chunk);
                }
                let chunk = self.chunks.get(&key).expect("present");
                for (local, value) in chunk.iter(&self.interner) {
                    let (row, col) = global_coords(coord, local);
                    if row >= start_row && row <= end_row && col >= start_col && col <= end_col {
                        out.push((row, col, value));
                    }
                }
            }
        }
        out.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        out
    }

    /// Flushes every dirty chunk still resident in the hot cache plus the
    /// string table to the configured backend, blocking until all saves
    /// finish.
    pub fn flush(&mut self) -> Result<()> {
        let Some(persistence) = &mut self.persistence else {
            return Ok(());
        };
        let dirty: Vec<(u64, Chunk)> = self
            .chunks
            .iter_by_recency()
            .filter(|(_, chunk)| chunk.is_dirty())
            .map(|(&key, chunk)| (key, chunk.clone()))
            .collect();
        for (key, chunk) in &dirty {
            let snapshot = chunk.to_snapshot(&self.interner);
            persistence.enqueue_save(*key, snapshot);
        }
        let results = persistence.flush();
        for (key, result) in &results {
            if let Err(err) = result {
                tracing::error!(chunk_key = key, error = %err, "chunk save failed");
            }
        }
        for key in dirty.iter().map(|(k, _)| *k) {
            if let Some(chunk) = self.chunks.get_mut(&key) {
                chunk.mark_clean();
            }
        }
        if self.interner.has_unpersisted_changes() {
            persistence.save_string_table_blocking(self.interner.snapshot())?;
            self.interner.clear_unpersisted_changes();
        }
        Ok(())
    }

    pub fn hot_cache_stats(&self) -> HotCacheStats {
        HotCacheStats {
            chunk_count: self.chunks.len(),
            estimated_bytes: self
                .chunks
                .iter_by_recency()
                .map(|(_, chunk)| chunk.estimated_bytes())
                .sum(),
        }
    }

    /// JSON-serialized hot cache stats, for a host application's
    /// diagnostics endpoint rather than in-process introspection.
    pub fn hot_cache_stats_json(&self) -> Result<String> {
        serde_json::to_string(&self.hot_cache_stats()).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete_round_trip() {
        let mut sheet = Sheet::new(SheetConfig::default());
        sheet.set(0, 0, CellValue::Number(42.0)).unwrap();
        assert_eq!(sheet.get(0, 0), CellValue::Number(42.0));
        sheet.delete(0, 0).unwrap();
        assert_eq!(sheet.get(0, 0), CellValue::Empty);
    }

    #[test]
    fn hot_cache_stats_json_reports_chunk_count() {
        let mut sheet = Sheet::new(SheetConfig::default());
        sheet.set(0, 0, CellValue::Number(1.0)).unwrap();
        let json = sheet.hot_cache_stats_json().unwrap();
        assert!(json.contains("\"chunk_count\":1"));
    }

    #[test]
    fn untouched_cells_read_as_empty_without_allocating_chunks() {
        let mut sheet = Sheet::new(SheetConfig::default());
        assert_eq!(sheet.get(1_000_000, 1_000_000), CellValue::Empty);
        assert_eq!(sheet.hot_cache_stats().chunk_count, 0);
    }

    #[test]
    fn set_block_and_entries_round_trip() {
        let mut sheet = Sheet::new(SheetConfig::default());
        let block = vec![
            vec![CellValue::Number(1.0), CellValue::Number(2.0)],
            vec![CellValue::Text("a".into()), CellValue::Empty],
        ];
        let written = sheet.set_block(0, 0, &block).unwrap();
        assert_eq!(written, 3);
        let entries = sheet.entries(0, 0, 1, 1);
        assert_eq!(
            entries,
            vec![
                (0, 0, CellValue::Number(1.0)),
                (0, 1, CellValue::Number(2.0)),
                (1, 0, CellValue::Text("a".into())),
            ]
        );
    }

    #[test]
    fn delete_block_clears_a_range() {
        let mut sheet = Sheet::new(SheetConfig::default());
        sheet.set(0, 0, CellValue::Number(1.0)).unwrap();
        sheet.set(0, 1, CellValue::Number(2.0)).unwrap();
        let deleted = sheet.delete_block(0, 0, 1, 2).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(sheet.entries(0, 0, 0, 1), vec![]);
    }

    #[test]
    fn undo_redo_reverts_and_reapplies_a_single_write() {
        let mut sheet = Sheet::new(SheetConfig::default());
        sheet.set(0, 0, CellValue::Number(1.0)).unwrap();
        sheet.set(0, 0, CellValue::Number(2.0)).unwrap();
        assert!(sheet.undo());
        assert_eq!(sheet.get(0, 0), CellValue::Number(1.0));
        assert!(sheet.redo());
        assert_eq!(sheet.get(0, 0), CellValue::Number(2.0));
    }

    #[test]
    fn undo_redo_reverts_a_whole_block_paste_as_one_step() {
        let mut sheet = Sheet::new(SheetConfig::default());
        sheet.set(0, 0, CellValue::Text("before".into())).unwrap();
        let block = vec![vec![CellValue::Number(1.0), CellValue::Number(2.0)]];
        sheet.set_block(0, 0, &block).unwrap();
        assert_eq!(sheet.get(0, 1), CellValue::Number(2.0));
        assert!(sheet.undo());
        assert_eq!(sheet.get(0, 0), CellValue::Text("before".into()));
        assert_eq!(sheet.get(0, 1), CellValue::Empty);
        assert!(!sheet.undo());
    }

    #[test]
    fn promotion_and_demotion_round_trip_through_the_public_api() {
        let mut sheet = Sheet::new(SheetConfig::default());
        for i in 0..2100i64 {
            sheet.set(i / 64, i % 64, CellValue::Number(i as f64)).unwrap();
        }
        assert_eq!(sheet.get(0, 0), CellValue::Number(0.0));
        for i in 0..1600i64 {
            sheet.delete(i / 64, i % 64).unwrap();
        }
        assert_eq!(sheet.get(1600 / 64, 1600 % 64), CellValue::Number(1600.0));
        assert_eq!(sheet.get(0, 0), CellValue::Empty);
    }

    #[test]
    fn default_dimensions_match_spec() {
        let sheet = Sheet::new(SheetConfig::default());
        assert_eq!(sheet.row_count(), 1000);
        assert_eq!(sheet.column_count(), 26);
        assert_eq!(sheet.column_labels().last(), Some(&"Z".to_string()));
    }

    #[test]
    fn add_rows_and_columns_grow_monotonically() {
        let mut sheet = Sheet::new(SheetConfig::default());
        sheet.add_rows(5);
        sheet.add_columns(2);
        assert_eq!(sheet.row_count(), 1005);
        assert_eq!(sheet.column_count(), 28);
        sheet.add_rows(-10);
        assert_eq!(sheet.row_count(), 1005);
    }

    #[test]
    fn has_reflects_non_empty_cells() {
        let mut sheet = Sheet::new(SheetConfig::default());
        assert!(!sheet.has(0, 0));
        sheet.set(0, 0, CellValue::Number(1.0)).unwrap();
        assert!(sheet.has(0, 0));
    }

    #[test]
    fn get_block_includes_empty_cells() {
        let mut sheet = Sheet::new(SheetConfig::default());
        sheet.set(0, 0, CellValue::Number(1.0)).unwrap();
        let block = sheet.get_block(0, 0, 1, 1);
        assert_eq!(
            block,
            vec![
                vec![CellValue::Number(1.0), CellValue::Empty],
                vec![CellValue::Empty, CellValue::Empty],
            ]
        );
    }

    #[test]
    fn tsv_round_trips_through_the_sheet() {
        let mut sheet = Sheet::new(SheetConfig::default());
        let result = sheet.deserialize_tsv(5, 5, "a\tb\t\nTRUE\t3.14\tc\n").unwrap();
        assert_eq!(result.rows, 2);
        assert_eq!(result.cols, 3);
        assert_eq!(result.written_count, 5);
        let text = sheet.serialize_range_to_tsv(5, 5, 6, 7).unwrap();
        assert_eq!(text, "a\tb\t\nTRUE\t3.14\tc\n");
    }

    #[test]
    fn load_range_pulls_missing_chunks_from_persistence_in_parallel() {
        use crate::persistence::repository::test_double::InMemoryRepository;
        use crate::persistence::{ChunkRepository, PersistConfig, PersistenceHandle};
        use std::sync::Arc;

        let repository: Arc<dyn ChunkRepository> = Arc::new(InMemoryRepository::new());
        {
            let handle = PersistenceHandle::new(repository.clone(), PersistConfig::default());
            let mut sheet = Sheet::with_persistence(SheetConfig::default(), handle).unwrap();
            sheet.set(0, 0, CellValue::Number(1.0)).unwrap();
            sheet.set(5000, 5000, CellValue::Number(2.0)).unwrap();
            sheet.flush().unwrap();
        }

        let handle = PersistenceHandle::new(repository, PersistConfig::default());
        let mut sheet = Sheet::with_persistence(SheetConfig::default(), handle).unwrap();
        sheet.load_range(0, 0, 5000, 5000).unwrap();
        assert_eq!(sheet.get(0, 0), CellValue::Number(1.0));
        assert_eq!(sheet.get(5000, 5000), CellValue::Number(2.0));
    }

    #[test]
    fn tsv_paste_is_a_single_undo_step() {
        let mut sheet = Sheet::new(SheetConfig::default());
        sheet.set(0, 0, CellValue::Text("before".into())).unwrap();
        sheet.deserialize_tsv(0, 0, "1\t2\n").unwrap();
        assert_eq!(sheet.get(0, 1), CellValue::Number(2.0));
        assert!(sheet.undo());
        assert_eq!(sheet.get(0, 0), CellValue::Text("before".into()));
        assert_eq!(sheet.get(0, 1), CellValue::Empty);
    }
}
