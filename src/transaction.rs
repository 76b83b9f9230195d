//! Transaction log: nestable (as a no-op at nested depths) transactions with
//! per-cell coalescing and undo/redo stacks (spec §4.G).

use crate::chunk::CellValue;

/// Identifies a transaction in the undo/redo history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionMeta {
    pub id: u64,
}

/// A single cell's before/after pair within a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CellOp {
    pub row: i64,
    pub col: i64,
    pub prev: CellValue,
    pub next: CellValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub meta: TransactionMeta,
    pub ops: Vec<CellOp>,
}

impl Transaction {
    fn new(id: u64) -> Self {
        Self {
            meta: TransactionMeta { id },
            ops: Vec::new(),
        }
    }

    /// Folds a write into the transaction: if `(row, col)` was already
    /// touched this transaction, its `next` is updated and its original
    /// `prev` is kept, collapsing to a no-op (and removing the entry) if the
    /// net effect is now identity.
    fn coalesce(&mut self, row: i64, col: i64, prev: CellValue, next: CellValue) {
        if let Some(idx) = self.ops.iter().position(|op| op.row == row && op.col == col) {
            if self.ops[idx].prev == next {
                self.ops.remove(idx);
            } else {
                self.ops[idx].next = next;
            }
        } else if prev != next {
            self.ops.push(CellOp { row, col, prev, next });
        }
    }
}

/// Records writes into coalesced transactions and maintains undo/redo
/// stacks. Nested `begin`/`commit` pairs (via `Sheet::transact`) collapse
/// into a single history entry; only the outermost pair does bookkeeping.
#[derive(Debug)]
pub struct TransactionLog {
    depth: u32,
    current: Transaction,
    /// Raised while replaying an undo/redo so that the replayed writes
    /// (which re-enter `Sheet::set`/`Sheet::delete`) do not themselves
    /// record new history or touch the redo stack.
    applying_history: bool,
    undo_stack: Vec<Transaction>,
    redo_stack: Vec<Transaction>,
    next_id: u64,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self {
            depth: 0,
            current: Transaction::new(0),
            applying_history: false,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            next_id: 0,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_applying_history(&self) -> bool {
        self.applying_history
    }

    pub fn begin(&mut self) {
        if self.depth == 0 {
            self.current = Transaction::new(self.next_id);
            self.next_id += 1;
        }
        self.depth += 1;
    }

    pub fn record(&mut self, row: i64, col: i64, prev: CellValue, next: CellValue) {
        if self.applying_history || self.depth == 0 {
            return;
        }
        self.current.coalesce(row, col, prev, next);
    }

    /// Commits the outermost transaction, pushing it onto the undo stack
    /// and clearing the redo stack, unless it coalesced away to nothing.
    pub fn commit(&mut self) {
        if self.depth == 0 {
            return;
        }
        self.depth -= 1;
        if self.depth == 0 && !self.applying_history && !self.current.ops.is_empty() {
            let txn = std::mem::replace(&mut self.current, Transaction::new(self.next_id));
            self.next_id += 1;
            self.undo_stack.push(txn);
            self.redo_stack.clear();
        }
    }

    /// Discards the outermost transaction instead of committing it: its ops
    /// are dropped and nothing is pushed to the undo stack.
    pub fn discard(&mut self) {
        if self.depth == 0 {
            return;
        }
        self.depth -= 1;
        if self.depth == 0 {
            self.current = Transaction::new(self.next_id);
            self.next_id += 1;
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn begin_history_replay(&mut self) {
        self.applying_history = true;
    }

    pub fn end_history_replay(&mut self) {
        self.applying_history = false;
    }

    pub fn pop_undo(&mut self) -> Option<Transaction> {
        self.undo_stack.pop()
    }

    pub fn pop_redo(&mut self) -> Option<Transaction> {
        self.redo_stack.pop()
    }

    pub fn push_redo(&mut self, txn: Transaction) {
        self.redo_stack.push(txn);
    }

    pub fn push_undo(&mut self, txn: Transaction) {
        self.undo_stack.push(txn);
    }
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_writes_to_same_cell_coalesce() {
        let mut log = TransactionLog::new();
        log.begin();
        log.record(0, 0, CellValue::Empty, CellValue::Number(1.0));
        log.record(0, 0, CellValue::Number(1.0), CellValue::Number(2.0));
        log.record(0, 0, CellValue::Number(2.0), CellValue::Number(3.0));
        log.commit();
        let txn = log.pop_undo().unwrap();
        assert_eq!(txn.ops.len(), 1);
        assert_eq!(txn.ops[0].prev, CellValue::Empty);
        assert_eq!(txn.ops[0].next, CellValue::Number(3.0));
    }

    #[test]
    fn round_trip_write_coalesces_to_nothing() {
        let mut log = TransactionLog::new();
        log.begin();
        log.record(1, 1, CellValue::Number(5.0), CellValue::Number(6.0));
        log.record(1, 1, CellValue::Number(6.0), CellValue::Number(5.0));
        log.commit();
        assert!(!log.can_undo());
    }

    #[test]
    fn nested_transact_collapses_into_one_history_entry() {
        let mut log = TransactionLog::new();
        log.begin();
        log.record(0, 0, CellValue::Empty, CellValue::Number(1.0));
        log.begin();
        log.record(1, 0, CellValue::Empty, CellValue::Number(2.0));
        log.commit();
        assert_eq!(log.depth(), 1);
        assert!(!log.can_undo());
        log.commit();
        assert_eq!(log.depth(), 0);
        let txn = log.pop_undo().unwrap();
        assert_eq!(txn.ops.len(), 2);
    }

    #[test]
    fn discard_drops_ops_without_pushing_undo() {
        let mut log = TransactionLog::new();
        log.begin();
        log.record(0, 0, CellValue::Empty, CellValue::Number(1.0));
        log.discard();
        assert!(!log.can_undo());
    }

    #[test]
    fn history_replay_suppresses_recording() {
        let mut log = TransactionLog::new();
        log.begin();
        log.record(0, 0, CellValue::Empty, CellValue::Number(1.0));
        log.commit();
        let txn = log.pop_undo().unwrap();

        log.begin_history_replay();
        log.begin();
        log.record(0, 0, CellValue::Number(1.0), CellValue::Empty);
        log.commit();
        log.end_history_replay();
        log.push_redo(txn);

        assert!(!log.can_undo());
        assert!(log.can_redo());
    }
}
