//! URL record lifecycle on top of a [`Storage`] backend.

use std::sync::Arc;

use crate::allocator::Allocator;
use crate::error::{AppError, AppResult};
use crate::models::{HostnameCount, UrlRecord};
use crate::storage::Storage;

pub struct UrlService {
    storage: Arc<dyn Storage>,
    allocator: Allocator,
}

impl UrlService {
    pub fn new(storage: Arc<dyn Storage>, allocator: Allocator) -> Self {
        Self { storage, allocator }
    }

    /// Store `target_url` under a freshly allocated short id
    pub async fn create(&self, target_url: &str) -> AppResult<UrlRecord> {
        let record = self
            .allocator
            .allocate(self.storage.as_ref(), target_url)
            .await?;
        tracing::info!(short_id = %record.short_id, "created short url");
        Ok(record)
    }

    /// Store `target_url` under a caller-chosen id
    pub async fn create_with_id(&self, short_id: &str, target_url: &str) -> AppResult<UrlRecord> {
        Ok(self.storage.create(short_id, target_url).await?)
    }

    pub async fn find_by_id(&self, short_id: &str) -> AppResult<UrlRecord> {
        self.storage.get(short_id).await?.ok_or(AppError::NotFound)
    }

    pub async fn find_all(&self) -> AppResult<Vec<UrlRecord>> {
        Ok(self.storage.list().await?)
    }

    /// Returns how many records changed; zero means the id was unknown
    pub async fn update(&self, short_id: &str, target_url: &str) -> AppResult<u64> {
        Ok(self.storage.update(short_id, target_url).await?)
    }

    pub async fn delete(&self, short_id: &str) -> AppResult<()> {
        if self.storage.delete(short_id).await? {
            tracing::info!(short_id = %short_id, "deleted short url");
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    pub async fn increment_access_count(&self, short_id: &str) -> AppResult<()> {
        Ok(self.storage.increment_access_count(short_id).await?)
    }

    /// Bump the access counter in the background.
    ///
    /// The caller never waits on the update and a failure is only logged.
    pub fn record_access(&self, short_id: &str) -> tokio::task::JoinHandle<()> {
        let storage = Arc::clone(&self.storage);
        let short_id = short_id.to_string();
        tokio::spawn(async move {
            if let Err(err) = storage.increment_access_count(&short_id).await {
                tracing::error!(short_id = %short_id, error = %err, "failed to increment access count");
            }
        })
    }

    pub async fn stats_by_hostname(&self, hostname: Option<&str>) -> AppResult<Vec<HostnameCount>> {
        Ok(self.storage.stats_by_hostname(hostname).await?)
    }
}
