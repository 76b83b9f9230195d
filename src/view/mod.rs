//! Live, read/write views over a sheet: filtering, sorting, and
//! visual-to-physical row mapping (spec §4.K).

pub mod filter;
pub mod sort;

pub use filter::{FilterCondition, FilterOp, FilterSpec};
pub use sort::{compare_values, SortDirection, SortSpec};

use crate::chunk::CellValue;
use crate::error::Result;
use crate::fenwick::FenwickTree;
use crate::sheet::Sheet;

/// Backing storage for a view's row order. `Identity` is the no-filter,
/// no-sort fast path (visual index equals physical row, no Fenwick tree to
/// build); `Presence` tracks which physical rows currently pass the active
/// filters via a bitmap (visual index maps to physical row through
/// `FenwickTree::find_kth`). A sort never needs its own representation here:
/// [`SheetView::set_sort`] rewrites the underlying cells in place rather
/// than keeping a separate permutation, so row order after a sort is still
/// physical order.
enum ViewRows {
    Identity,
    Presence(FenwickTree),
}

/// A live view over a sheet's rows: filters and a sort can be changed after
/// construction, and reads/writes through the view go through the current
/// row mapping (spec §4.K). Borrows the sheet mutably for its whole
/// lifetime, mirroring how a cursor or iterator over a mutable collection
/// works in this crate's style.
pub struct SheetView<'a> {
    sheet: &'a mut Sheet,
    filters: Vec<FilterSpec>,
    sort: Option<SortSpec>,
    rows: ViewRows,
    version: u64,
    zero_match: bool,
}

impl<'a> SheetView<'a> {
    /// Builds a view with no filters and no sort: `row_at(v) == v` and
    /// `visible_count() == sheet.row_count()` (spec §4.K invariant).
    pub fn new(sheet: &'a mut Sheet) -> Self {
        let mut view = Self {
            sheet,
            filters: Vec::new(),
            sort: None,
            rows: ViewRows::Identity,
            version: 0,
            zero_match: false,
        };
        view.rebuild_mask();
        view
    }

    /// Replaces the active filters and recomputes which rows are visible.
    pub fn set_filters(&mut self, filters: Vec<FilterSpec>) {
        self.filters = filters;
        self.rebuild_mask();
    }

    /// Replaces the active sort. A sort physically rewrites the sheet's
    /// rows (spec §4.K: browsing a view never hides a mutation behind a
    /// read-only permutation), so this re-evaluates filters afterward since
    /// row contents may have moved.
    pub fn set_sort(&mut self, sort: Option<SortSpec>) -> Result<()> {
        self.sort = sort;
        if let Some(spec) = sort {
            let row_count = self.sheet.row_count();
            let column_count = self.sheet.column_count();
            if row_count > 0 && column_count > 0 {
                apply_sort_in_place(self.sheet, 0, row_count - 1, 0, column_count - 1, spec)?;
            }
        }
        self.rebuild_mask();
        Ok(())
    }

    fn rebuild_mask(&mut self) {
        self.version += 1;
        if self.filters.is_empty() {
            self.rows = ViewRows::Identity;
            self.zero_match = self.sheet.row_count() <= 0;
            return;
        }

        let row_count = self.sheet.row_count();
        let mut bits = Vec::with_capacity(row_count.max(0) as usize);
        for row in 0..row_count {
            let mut row_matches = true;
            for filter in &self.filters {
                let ok = match filter {
                    FilterSpec::Condition(cond) if is_blank_sensitive(cond.op) => {
                        let blank = active_last_row(&mut *self.sheet, cond.col, row) != Some(row);
                        blank == (cond.op == FilterOp::IsBlank)
                    }
                    other => {
                        let value = self.sheet.get(row, other.column());
                        other.matches(&value)
                    }
                };
                if !ok {
                    row_matches = false;
                    break;
                }
            }
            bits.push(row_matches as i64);
        }
        self.zero_match = bits.iter().all(|&b| b == 0);
        self.rows = ViewRows::Presence(FenwickTree::from_values(&bits));
    }

    /// Total rows currently visible.
    pub fn visible_count(&self) -> i64 {
        match &self.rows {
            ViewRows::Identity => self.sheet.row_count(),
            ViewRows::Presence(tree) => {
                if tree.is_empty() {
                    0
                } else {
                    tree.sum(tree.len() - 1).max(0)
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.visible_count() == 0
    }

    /// Maps a 0-based visual row index to its physical row, or `None` if
    /// `visual_index` is past the end of the view.
    pub fn row_at(&self, visual_index: i64) -> Option<i64> {
        if visual_index < 0 {
            return None;
        }
        match &self.rows {
            ViewRows::Identity => {
                if visual_index < self.sheet.row_count() {
                    Some(visual_index)
                } else {
                    None
                }
            }
            ViewRows::Presence(tree) => tree.find_kth(visual_index + 1).map(|local| local as i64),
        }
    }

    /// Like [`SheetView::row_at`], but always returns a physical row to
    /// write to, even when the view currently has no matches (`zero_match`)
    /// or `visual_index` is past the view's end: the write passes straight
    /// through, treating `visual_index` as a physical row, rather than
    /// having nowhere to put a new value (spec §4.K).
    pub fn row_at_for_write(&self, visual_index: i64) -> i64 {
        if self.zero_match {
            return visual_index.max(0);
        }
        self.row_at(visual_index).unwrap_or_else(|| visual_index.max(0))
    }

    /// Reads a cell through the view's current row mapping.
    pub fn get(&mut self, visual_row: i64, col: i64) -> CellValue {
        match self.row_at(visual_row) {
            Some(physical) => self.sheet.get(physical, col),
            None => CellValue::Empty,
        }
    }

    /// Writes a cell through the view's current row mapping, then
    /// re-evaluates filters since the write may change which rows match.
    pub fn set(&mut self, visual_row: i64, col: i64, value: CellValue) -> Result<()> {
        let physical = self.row_at_for_write(visual_row);
        self.sheet.set(physical, col, value)?;
        if !self.filters.is_empty() {
            self.rebuild_mask();
        }
        Ok(())
    }

    /// Bumps whenever filters or sort are changed, so a caller holding a
    /// stale row index can tell its mapping may no longer be valid.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether the active filters currently match no rows at all.
    pub fn is_zero_match(&self) -> bool {
        self.zero_match
    }
}

fn is_blank_sensitive(op: FilterOp) -> bool {
    matches!(op, FilterOp::IsBlank | FilterOp::IsNotBlank)
}

/// Trusts `candidate` as the last row with data in `col`; if it turns out
/// empty, checks exactly one neighboring row before giving up, rather than
/// rescanning the whole column (spec §4.K).
pub fn active_last_row(sheet: &mut Sheet, col: i64, candidate: i64) -> Option<i64> {
    if candidate < 0 {
        return None;
    }
    if !sheet.get(candidate, col).is_empty() {
        return Some(candidate);
    }
    if candidate > 0 {
        let neighbor = candidate - 1;
        if !sheet.get(neighbor, col).is_empty() {
            return Some(neighbor);
        }
    }
    None
}

/// Physically reorders the rows of `[start_row, end_row] x [start_col,
/// end_col]` into sort order, as a single undo step (spec §4.K: sorting a
/// range rewrites the underlying cells rather than just the view).
pub fn apply_sort_in_place(
    sheet: &mut Sheet,
    start_row: i64,
    end_row: i64,
    start_col: i64,
    end_col: i64,
    sort: SortSpec,
) -> Result<()> {
    let sort_idx = (sort.col - start_col) as usize;
    let mut rows: Vec<Vec<_>> = (start_row..=end_row)
        .map(|r| (start_col..=end_col).map(|c| sheet.get(r, c)).collect())
        .collect();
    rows.sort_by(|a, b| sort::apply_direction(&a[sort_idx], &b[sort_idx], sort.direction));
    sheet.transact(|sheet| sheet.set_block(start_row, start_col, &rows).map(|_| ()))
}
