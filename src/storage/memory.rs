use crate::models::{hostname_of, HostnameCount, UrlRecord};
use crate::storage::{unix_now, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

struct Slot {
    seq: u64,
    record: UrlRecord,
}

/// In-process backend keyed by short id.
///
/// Conditional insert goes through the `DashMap` entry API, so a duplicate id
/// is detected under the shard lock exactly like a unique index would.
pub struct MemoryStorage {
    urls: DashMap<String, Slot>,
    next_seq: AtomicU64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            urls: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn init(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn create(&self, short_id: &str, target_url: &str) -> StorageResult<UrlRecord> {
        let now = unix_now()?;

        match self.urls.entry(short_id.to_string()) {
            Entry::Occupied(_) => Err(StorageError::Conflict),
            Entry::Vacant(entry) => {
                let record = UrlRecord {
                    short_id: short_id.to_string(),
                    target_url: target_url.to_string(),
                    created_at: now,
                    updated_at: now,
                    access_count: 0,
                };
                entry.insert(Slot {
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                    record: record.clone(),
                });
                Ok(record)
            }
        }
    }

    async fn get(&self, short_id: &str) -> StorageResult<Option<UrlRecord>> {
        Ok(self.urls.get(short_id).map(|slot| slot.record.clone()))
    }

    async fn list(&self) -> StorageResult<Vec<UrlRecord>> {
        let mut slots = self
            .urls
            .iter()
            .map(|slot| (slot.seq, slot.record.clone()))
            .collect::<Vec<_>>();
        slots.sort_by_key(|(seq, _)| *seq);

        Ok(slots.into_iter().map(|(_, record)| record).collect())
    }

    async fn update(&self, short_id: &str, target_url: &str) -> StorageResult<u64> {
        let now = unix_now()?;

        match self.urls.get_mut(short_id) {
            Some(mut slot) => {
                slot.record.target_url = target_url.to_string();
                slot.record.updated_at = now;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, short_id: &str) -> StorageResult<bool> {
        Ok(self.urls.remove(short_id).is_some())
    }

    async fn increment_access_count(&self, short_id: &str) -> StorageResult<()> {
        if let Some(mut slot) = self.urls.get_mut(short_id) {
            slot.record.access_count += 1;
        }
        Ok(())
    }

    async fn stats_by_hostname(
        &self,
        hostname: Option<&str>,
    ) -> StorageResult<Vec<HostnameCount>> {
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for slot in self.urls.iter() {
            let host = hostname_of(&slot.record.target_url);
            if hostname.is_some_and(|wanted| wanted != host) {
                continue;
            }
            *counts.entry(host.to_string()).or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(hostname, count)| HostnameCount { hostname, count })
            .collect())
    }
}
