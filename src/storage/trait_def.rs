use crate::models::{HostnameCount, UrlRecord};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short id already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence collaborator for URL records.
///
/// Implementations enforce uniqueness of `short_id` themselves and report a
/// duplicate insert as [`StorageError::Conflict`]; callers never hold a lock
/// over the backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, indexes)
    async fn init(&self) -> StorageResult<()>;

    /// Insert a new record, failing with `Conflict` if the id is taken
    async fn create(&self, short_id: &str, target_url: &str) -> StorageResult<UrlRecord>;

    /// Get a record by short id
    async fn get(&self, short_id: &str) -> StorageResult<Option<UrlRecord>>;

    /// List every record in insertion order
    async fn list(&self) -> StorageResult<Vec<UrlRecord>>;

    /// Replace the target URL, returning the number of rows changed
    async fn update(&self, short_id: &str, target_url: &str) -> StorageResult<u64>;

    /// Delete a record, returning whether one existed
    async fn delete(&self, short_id: &str) -> StorageResult<bool>;

    /// Atomically add one to the access counter
    async fn increment_access_count(&self, short_id: &str) -> StorageResult<()>;

    /// Count records per target hostname, optionally restricted to one hostname.
    /// Results are ordered by hostname.
    async fn stats_by_hostname(&self, hostname: Option<&str>)
        -> StorageResult<Vec<HostnameCount>>;
}
