//! Concurrency-bounded save queue for dirty chunks evicted from the hot
//! cache (spec §5, §6).

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::chunk::ChunkSnapshot;
use crate::codec;
use crate::error::Result;
use crate::persistence::repository::ChunkRepository;

/// Holds pending chunk saves and drives at most `concurrency` of them at
/// once, redispatching the next pending save as each in-flight one
/// completes (rather than waiting for a whole batch to finish).
pub struct PersistQueue {
    repository: Arc<dyn ChunkRepository>,
    concurrency: usize,
    pending: VecDeque<(u64, ChunkSnapshot)>,
}

impl PersistQueue {
    pub fn new(repository: Arc<dyn ChunkRepository>, concurrency: usize) -> Self {
        Self {
            repository,
            concurrency: concurrency.max(1),
            pending: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, key: u64, snapshot: ChunkSnapshot) {
        self.pending.push_back((key, snapshot));
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Runs the queue to empty, returning a `(key, result)` pair for every
    /// save attempted.
    pub async fn drain(&mut self) -> Vec<(u64, Result<()>)> {
        let mut results = Vec::new();
        let mut in_flight: FuturesUnordered<BoxFuture<'_, (u64, Result<()>)>> = FuturesUnordered::new();

        for _ in 0..self.concurrency {
            if let Some((key, snapshot)) = self.pending.pop_front() {
                in_flight.push(self.dispatch(key, snapshot));
            } else {
                break;
            }
        }

        while let Some((key, result)) = in_flight.next().await {
            results.push((key, result));
            if let Some((next_key, snapshot)) = self.pending.pop_front() {
                in_flight.push(self.dispatch(next_key, snapshot));
            }
        }
        results
    }

    /// Blocking wrapper around [`PersistQueue::drain`] for the sync `Sheet`
    /// API, since this crate carries no async runtime of its own.
    pub fn drain_blocking(&mut self) -> Vec<(u64, Result<()>)> {
        pollster::block_on(self.drain())
    }

    fn dispatch(&self, key: u64, snapshot: ChunkSnapshot) -> BoxFuture<'static, (u64, Result<()>)> {
        let repository = self.repository.clone();
        Box::pin(async move {
            let bytes = codec::encode_snapshot(&snapshot);
            let result = repository.save_chunk(key, bytes).await;
            (key, result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::repository::test_double::InMemoryRepository;

    #[test]
    fn drains_all_pending_saves() {
        let repository = Arc::new(InMemoryRepository::new());
        let mut queue = PersistQueue::new(repository.clone(), 2);
        for key in 0..5u64 {
            queue.enqueue(
                key,
                ChunkSnapshot::Sparse { entries: vec![(0, crate::chunk::SnapshotValue::Number(key as f64))] },
            );
        }
        let results = queue.drain_blocking();
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        let mut saved = repository.saved_keys();
        saved.sort_unstable();
        assert_eq!(saved, vec![0, 1, 2, 3, 4]);
        assert_eq!(queue.pending_len(), 0);
    }
}
