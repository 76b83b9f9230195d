//! Background persistence: the repository seam, the save queue, and the
//! threaded worker that speaks to it (spec §5, §6).

pub mod queue;
pub mod repository;
pub mod worker;

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

pub use queue::PersistQueue;
pub use repository::ChunkRepository;
pub use worker::{ThreadedCodecWorker, WorkerRequest, WorkerResponse};

use crate::chunk::ChunkSnapshot;
use crate::codec;
use crate::error::{Result, SheetCoreError};

/// Tunables for the background persistence pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PersistConfig {
    /// Maximum number of chunk saves in flight at once.
    pub save_concurrency: usize,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self { save_concurrency: 4 }
    }
}

/// What `Sheet` holds to talk to a configured backend: blocking loads (a
/// cache miss on the main flow needs the chunk before it can answer `get`)
/// and a queue of pending saves that drains independently (spec §5: chunk
/// eviction must not stall the caller).
pub struct PersistenceHandle {
    repository: Arc<dyn ChunkRepository>,
    queue: PersistQueue,
}

impl PersistenceHandle {
    pub fn new(repository: Arc<dyn ChunkRepository>, config: PersistConfig) -> Self {
        let queue = PersistQueue::new(repository.clone(), config.save_concurrency);
        Self { repository, queue }
    }

    pub fn load_chunk_blocking(&self, key: u64) -> Result<Option<ChunkSnapshot>> {
        pollster::block_on(self.repository.load_chunk(key))?
            .map(|bytes| codec::decode_snapshot(&bytes).map_err(Into::into))
            .transpose()
    }

    /// Loads several chunks concurrently rather than one at a time
    /// (spec §4.I), returning a `(key, result)` pair per key in whatever
    /// order the loads complete.
    pub fn load_chunks_blocking(&self, keys: &[u64]) -> Vec<(u64, Result<Option<ChunkSnapshot>>)> {
        pollster::block_on(async {
            let mut in_flight = FuturesUnordered::new();
            for &key in keys {
                let repository = self.repository.clone();
                in_flight.push(async move {
                    let result: Result<Option<ChunkSnapshot>> = async {
                        let bytes = repository.load_chunk(key).await?;
                        bytes
                            .map(|b| codec::decode_snapshot(&b).map_err(SheetCoreError::from))
                            .transpose()
                    }
                    .await;
                    (key, result)
                });
            }
            let mut out = Vec::with_capacity(keys.len());
            while let Some(item) = in_flight.next().await {
                out.push(item);
            }
            out
        })
    }

    pub fn load_string_table_blocking(&self) -> Result<Vec<String>> {
        pollster::block_on(self.repository.load_string_table())
    }

    pub fn save_string_table_blocking(&self, table: Vec<String>) -> Result<()> {
        pollster::block_on(self.repository.save_string_table(table))
    }

    pub fn enqueue_save(&mut self, key: u64, snapshot: ChunkSnapshot) {
        self.queue.enqueue(key, snapshot);
    }

    /// Drains the save queue to empty, returning per-chunk results so the
    /// caller can decide how to react to a failed save.
    pub fn flush(&mut self) -> Vec<(u64, Result<()>)> {
        self.queue.drain_blocking()
    }

    pub fn pending_saves(&self) -> usize {
        self.queue.pending_len()
    }
}
