//! The storage-backend seam: anything that can load and save chunk
//! snapshots and the interner's string table (spec §5, §6).

use async_trait::async_trait;

use crate::error::Result;

/// Object-safe persistence backend. Implementations decide where bytes
/// actually live (disk, object storage, a remote service); this crate only
/// depends on the trait and never hands it a typed chunk — callers encode
/// via [`crate::codec`] before `save_chunk` and decode what `load_chunk`
/// returns (spec §6: "the core only requires a byte blob repository").
#[async_trait]
pub trait ChunkRepository: Send + Sync {
    async fn load_chunk(&self, key: u64) -> Result<Option<Vec<u8>>>;
    async fn save_chunk(&self, key: u64, bytes: Vec<u8>) -> Result<()>;
    async fn delete_chunk(&self, key: u64) -> Result<()>;
    async fn load_string_table(&self) -> Result<Vec<String>>;
    async fn save_string_table(&self, table: Vec<String>) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod test_double {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory stand-in for a real backend, used by persistence tests.
    #[derive(Default)]
    pub struct InMemoryRepository {
        chunks: Mutex<HashMap<u64, Vec<u8>>>,
        strings: Mutex<Vec<String>>,
    }

    impl InMemoryRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn saved_keys(&self) -> Vec<u64> {
            self.chunks.lock().unwrap().keys().copied().collect()
        }
    }

    #[async_trait]
    impl ChunkRepository for InMemoryRepository {
        async fn load_chunk(&self, key: u64) -> Result<Option<Vec<u8>>> {
            Ok(self.chunks.lock().unwrap().get(&key).cloned())
        }

        async fn save_chunk(&self, key: u64, bytes: Vec<u8>) -> Result<()> {
            self.chunks.lock().unwrap().insert(key, bytes);
            Ok(())
        }

        async fn delete_chunk(&self, key: u64) -> Result<()> {
            self.chunks.lock().unwrap().remove(&key);
            Ok(())
        }

        async fn load_string_table(&self) -> Result<Vec<String>> {
            Ok(self.strings.lock().unwrap().clone())
        }

        async fn save_string_table(&self, table: Vec<String>) -> Result<()> {
            *self.strings.lock().unwrap() = table;
            Ok(())
        }
    }
}
