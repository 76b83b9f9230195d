//! A dedicated OS thread that speaks a small request/response protocol to a
//! [`ChunkRepository`], so codec and I/O work never blocks the caller
//! (spec §6).

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::chunk::ChunkSnapshot;
use crate::codec;
use crate::error::{Result, SheetCoreError};
use crate::persistence::repository::ChunkRepository;

pub enum WorkerRequest {
    Save { key: u64, snapshot: ChunkSnapshot },
    Load { key: u64 },
    SaveStringTable { table: Vec<String> },
    Shutdown,
}

pub enum WorkerResponse {
    Saved { key: u64, result: Result<()> },
    Loaded { key: u64, result: Result<Option<ChunkSnapshot>> },
    StringTableSaved { result: Result<()> },
}

/// Runs the worker loop on its own thread. Each request blocks that thread
/// only, via [`pollster::block_on`] bridging the async repository call into
/// the synchronous thread loop; the caller communicates over channels and
/// never blocks on the repository itself.
pub struct ThreadedCodecWorker {
    request_tx: Sender<WorkerRequest>,
    response_rx: Receiver<WorkerResponse>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadedCodecWorker {
    pub fn spawn(repository: Arc<dyn ChunkRepository>) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<WorkerRequest>();
        let (response_tx, response_rx) = mpsc::channel::<WorkerResponse>();

        let handle = thread::spawn(move || {
            for request in request_rx {
                match request {
                    WorkerRequest::Save { key, snapshot } => {
                        let bytes = codec::encode_snapshot(&snapshot);
                        let result = pollster::block_on(repository.save_chunk(key, bytes));
                        if response_tx.send(WorkerResponse::Saved { key, result }).is_err() {
                            break;
                        }
                    }
                    WorkerRequest::Load { key } => {
                        let result = pollster::block_on(repository.load_chunk(key)).and_then(|bytes| {
                            bytes
                                .map(|b| codec::decode_snapshot(&b).map_err(SheetCoreError::from))
                                .transpose()
                        });
                        if response_tx.send(WorkerResponse::Loaded { key, result }).is_err() {
                            break;
                        }
                    }
                    WorkerRequest::SaveStringTable { table } => {
                        let result = pollster::block_on(repository.save_string_table(table));
                        if response_tx.send(WorkerResponse::StringTableSaved { result }).is_err() {
                            break;
                        }
                    }
                    WorkerRequest::Shutdown => break,
                }
            }
        });

        Self {
            request_tx,
            response_rx,
            handle: Some(handle),
        }
    }

    pub fn send(&self, request: WorkerRequest) -> Result<()> {
        self.request_tx
            .send(request)
            .map_err(|e| SheetCoreError::WorkerCommunication(e.to_string()))
    }

    pub fn try_recv(&self) -> Option<WorkerResponse> {
        self.response_rx.try_recv().ok()
    }

    pub fn recv_blocking(&self) -> Option<WorkerResponse> {
        self.response_rx.recv().ok()
    }
}

impl Drop for ThreadedCodecWorker {
    fn drop(&mut self) {
        let _ = self.request_tx.send(WorkerRequest::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::repository::test_double::InMemoryRepository;

    #[test]
    fn save_then_load_round_trips_through_the_worker() {
        let repository = Arc::new(InMemoryRepository::new());
        let worker = ThreadedCodecWorker::spawn(repository);

        let snapshot = ChunkSnapshot::Sparse {
            entries: vec![(0, crate::chunk::SnapshotValue::Number(7.0))],
        };
        worker
            .send(WorkerRequest::Save { key: 42, snapshot: snapshot.clone() })
            .unwrap();
        match worker.recv_blocking() {
            Some(WorkerResponse::Saved { key, result }) => {
                assert_eq!(key, 42);
                assert!(result.is_ok());
            }
            _ => panic!("expected Saved response"),
        }

        worker.send(WorkerRequest::Load { key: 42 }).unwrap();
        match worker.recv_blocking() {
            Some(WorkerResponse::Loaded { key, result }) => {
                assert_eq!(key, 42);
                assert_eq!(result.unwrap(), Some(snapshot));
            }
            _ => panic!("expected Loaded response"),
        }
    }
}
