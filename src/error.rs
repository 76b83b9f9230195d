//! Crate-wide error handling.
//!
//! A single error enum covers the taxonomy from the spec: decode failures,
//! repository failures, transaction discards, and worker-link failures.
//! `OutOfBounds` is deliberately not a variant here — by policy the core
//! clamps or ignores negative/non-finite coordinates at the call site rather
//! than surfacing an error.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SheetCoreError>;

#[derive(Error, Debug)]
pub enum SheetCoreError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("transaction discarded: {0}")]
    TransactionDiscarded(String),

    #[error("worker communication error: {0}")]
    WorkerCommunication(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Reasons a chunk's byte encoding failed to decode (spec §4.D, §7).
///
/// On `DecodeError` the affected chunk is treated as absent; the cache
/// remains consistent (no partially-populated chunk is ever installed).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("bad magic byte: {0:#04x}")]
    BadMagic(u8),
    #[error("unknown format version: {0}")]
    UnknownVersion(u8),
    #[error("unknown value tag: {0}")]
    UnknownTag(u8),
    #[error("truncated input")]
    Truncated,
}

impl From<csv::Error> for SheetCoreError {
    fn from(err: csv::Error) -> Self {
        SheetCoreError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SheetCoreError {
    fn from(err: serde_json::Error) -> Self {
        SheetCoreError::Serialization(err.to_string())
    }
}
