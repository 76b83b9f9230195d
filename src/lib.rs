//! Chunked, adaptive storage engine for an ultra-scale spreadsheet grid.
//!
//! Cells live in 64x64 chunks that switch between a sparse (`BTreeMap`) and
//! dense (struct-of-arrays) representation as their fill ratio crosses a
//! promotion/demotion threshold. A bounded LRU hot cache holds the
//! recently-touched chunks; eviction of a dirty chunk hands it to an
//! optional background persistence pipeline. Writes go through a
//! coalescing transaction log with undo/redo. `SheetView` layers filtering
//! and sorting on top without requiring the caller to materialize full row
//! data up front.

pub mod cache;
pub mod chunk;
pub mod clipboard;
pub mod codec;
pub mod error;
pub mod fenwick;
pub mod interner;
pub mod persistence;
pub mod sheet;
pub mod transaction;
pub mod view;

pub use chunk::CellValue;
pub use clipboard::TsvWriteResult;
pub use error::{DecodeError, Result, SheetCoreError};
pub use sheet::{HotCacheStats, Sheet, SheetConfig};
pub use view::{FilterCondition, FilterOp, FilterSpec, SheetView, SortDirection, SortSpec};
