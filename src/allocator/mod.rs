//! Short id allocation.
//!
//! A candidate id is inserted directly and the storage's uniqueness constraint
//! decides whether it is free. There is no existence check before the insert,
//! so two concurrent allocations can never both claim the same id.

pub mod generator;

pub use generator::{IdGenerator, RandomIdGenerator, ALPHABET, SHORT_ID_LENGTH};

use std::sync::Arc;
use thiserror::Error;

use crate::models::UrlRecord;
use crate::storage::{Storage, StorageError};

/// Default ceiling on insert attempts per allocation
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum AllocateError {
    #[error("no free short id after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error(transparent)]
    Storage(anyhow::Error),
}

pub struct Allocator {
    generator: Arc<dyn IdGenerator>,
    /// 0 means retry until an id is accepted
    max_attempts: u32,
}

impl Allocator {
    pub fn new(generator: Arc<dyn IdGenerator>, max_attempts: u32) -> Self {
        Self {
            generator,
            max_attempts,
        }
    }

    /// Insert `target_url` under a fresh short id and return the stored record.
    ///
    /// Conflicts are retried with a new candidate; any other storage failure
    /// is returned immediately.
    pub async fn allocate(
        &self,
        storage: &dyn Storage,
        target_url: &str,
    ) -> Result<UrlRecord, AllocateError> {
        let mut attempts = 0u32;

        loop {
            if self.max_attempts != 0 && attempts >= self.max_attempts {
                tracing::warn!(attempts, "short id allocation exhausted");
                return Err(AllocateError::Exhausted { attempts });
            }
            attempts += 1;

            let candidate = self.generator.generate();
            match storage.create(&candidate, target_url).await {
                Ok(record) => {
                    tracing::debug!(short_id = %record.short_id, attempts, "allocated short id");
                    return Ok(record);
                }
                Err(StorageError::Conflict) => {
                    tracing::debug!(short_id = %candidate, attempts, "short id collision, retrying");
                }
                Err(StorageError::Other(err)) => return Err(AllocateError::Storage(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HostnameCount;
    use crate::storage::{MemoryStorage, StorageResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Hands out a fixed list of ids, then falls back to random ones
    struct ScriptedGenerator {
        script: Mutex<VecDeque<String>>,
        fallback: RandomIdGenerator,
    }

    impl ScriptedGenerator {
        fn new(ids: &[&str]) -> Self {
            Self {
                script: Mutex::new(ids.iter().map(|s| s.to_string()).collect()),
                fallback: RandomIdGenerator::from_seed(99),
            }
        }
    }

    impl IdGenerator for ScriptedGenerator {
        fn generate(&self) -> String {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.generate())
        }
    }

    /// Storage whose every insert fails with a backend error
    struct BrokenStorage {
        creates: AtomicUsize,
    }

    #[async_trait]
    impl Storage for BrokenStorage {
        async fn init(&self) -> StorageResult<()> {
            Ok(())
        }
        async fn create(&self, _: &str, _: &str) -> StorageResult<UrlRecord> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Other(anyhow::anyhow!("database is down")))
        }
        async fn get(&self, _: &str) -> StorageResult<Option<UrlRecord>> {
            Ok(None)
        }
        async fn list(&self) -> StorageResult<Vec<UrlRecord>> {
            Ok(vec![])
        }
        async fn update(&self, _: &str, _: &str) -> StorageResult<u64> {
            Ok(0)
        }
        async fn delete(&self, _: &str) -> StorageResult<bool> {
            Ok(false)
        }
        async fn increment_access_count(&self, _: &str) -> StorageResult<()> {
            Ok(())
        }
        async fn stats_by_hostname(&self, _: Option<&str>) -> StorageResult<Vec<HostnameCount>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_allocate_returns_well_formed_id() {
        let storage = MemoryStorage::new();
        let allocator = Allocator::new(Arc::new(RandomIdGenerator::from_clock()), 5);

        let record = allocator
            .allocate(&storage, "https://example.com")
            .await
            .unwrap();
        assert_eq!(record.short_id.len(), SHORT_ID_LENGTH);
        assert!(record.short_id.bytes().all(|b| ALPHABET.contains(&b)));

        let stored = storage.get(&record.short_id).await.unwrap().unwrap();
        assert_eq!(stored.target_url, "https://example.com");
    }

    #[tokio::test]
    async fn test_collision_retries_with_new_candidate() {
        let storage = MemoryStorage::new();
        storage.create("takenTaken1", "https://first.example").await.unwrap();

        let generator = ScriptedGenerator::new(&["takenTaken1", "freshFresh1"]);
        let allocator = Allocator::new(Arc::new(generator), 5);

        let record = allocator
            .allocate(&storage, "https://second.example")
            .await
            .unwrap();
        assert_eq!(record.short_id, "freshFresh1");

        // The colliding record keeps its target
        let taken = storage.get("takenTaken1").await.unwrap().unwrap();
        assert_eq!(taken.target_url, "https://first.example");
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let storage = MemoryStorage::new();
        storage.create("sameSameSam", "https://example.com").await.unwrap();

        let generator = ScriptedGenerator::new(&["sameSameSam"; 3]);
        let allocator = Allocator::new(Arc::new(generator), 3);

        let err = allocator
            .allocate(&storage, "https://example.org")
            .await
            .unwrap_err();
        assert!(matches!(err, AllocateError::Exhausted { attempts: 3 }));
        assert_eq!(storage.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unbounded_keeps_retrying() {
        let storage = MemoryStorage::new();
        storage.create("sameSameSam", "https://example.com").await.unwrap();

        // Well past the default ceiling before a free id shows up
        let mut script = vec!["sameSameSam"; 20];
        script.push("finallyFree");
        let allocator = Allocator::new(Arc::new(ScriptedGenerator::new(&script)), 0);

        let record = allocator
            .allocate(&storage, "https://example.org")
            .await
            .unwrap();
        assert_eq!(record.short_id, "finallyFree");
    }

    #[tokio::test]
    async fn test_storage_error_is_not_retried() {
        let storage = BrokenStorage {
            creates: AtomicUsize::new(0),
        };
        let allocator = Allocator::new(Arc::new(RandomIdGenerator::from_seed(5)), 5);

        let err = allocator
            .allocate(&storage, "https://example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AllocateError::Storage(_)));
        assert_eq!(storage.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_allocations_get_distinct_ids() {
        let storage = Arc::new(MemoryStorage::new());
        let allocator = Arc::new(Allocator::new(
            Arc::new(RandomIdGenerator::from_clock()),
            DEFAULT_MAX_ATTEMPTS,
        ));

        let mut handles = vec![];
        for i in 0..32 {
            let storage = Arc::clone(&storage);
            let allocator = Arc::clone(&allocator);
            handles.push(tokio::spawn(async move {
                allocator
                    .allocate(storage.as_ref(), &format!("https://example.com/{i}"))
                    .await
                    .unwrap()
                    .short_id
            }));
        }

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }
        assert_eq!(storage.list().await.unwrap().len(), 32);
    }
}
