//! In-memory [`Store`] implementation for tests.
//!
//! Rows live in a `Vec` behind `std::sync::RwLock`, in load order. The
//! uniqueness check on `(resource_type, surrogate_key)` runs before the swap,
//! so a rejected load leaves the previous rows untouched.

use std::collections::HashSet;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::{NormalizedRecord, Page, ResourceType, StoredResource};

use super::Store;

/// In-memory store.
pub struct InMemoryStore {
    rows: RwLock<Vec<NormalizedRecord>>,
    reject_writes: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            reject_writes: false,
        }
    }

    /// A store whose every write fails, for exercising the failure path.
    pub fn rejecting_writes() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            reject_writes: true,
        }
    }

    /// Snapshot of the stored rows.
    pub fn rows(&self) -> Result<Vec<NormalizedRecord>> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<NormalizedRecord>>> {
        self.rows.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn to_stored(record: &NormalizedRecord) -> StoredResource {
    StoredResource {
        surrogate_key: record.surrogate_key,
        resource_type: record.resource_type,
        display_name: record.display_name.clone(),
        payload: record.payload.clone(),
    }
}

fn paginate<'a>(
    matches: impl Iterator<Item = &'a NormalizedRecord>,
    limit: i64,
    offset: i64,
) -> Page<StoredResource> {
    let matches: Vec<&NormalizedRecord> = matches.collect();
    let results = matches
        .iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .map(|r| to_stored(r))
        .collect();
    Page {
        total: matches.len() as i64,
        limit,
        offset,
        results,
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn replace_all(&self, records: &[NormalizedRecord]) -> Result<u64> {
        if self.reject_writes {
            bail!("in-memory store is rejecting writes");
        }

        let mut seen = HashSet::new();
        for r in records {
            if !seen.insert((r.resource_type, r.surrogate_key)) {
                bail!(
                    "UNIQUE constraint failed: resources.resource_type, resources.surrogate_key ({}/{})",
                    r.resource_type,
                    r.surrogate_key
                );
            }
        }

        let mut rows = self
            .rows
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        *rows = records.to_vec();
        Ok(rows.len() as u64)
    }

    async fn search(
        &self,
        query: &str,
        resource_type: Option<ResourceType>,
        limit: i64,
        offset: i64,
    ) -> Result<Page<StoredResource>> {
        let needle = query.trim().to_lowercase();
        let rows = self.read()?;
        if needle.is_empty() {
            return Ok(paginate(std::iter::empty(), limit, offset));
        }
        Ok(paginate(
            rows.iter().filter(|r| {
                resource_type.map_or(true, |rt| r.resource_type == rt)
                    && r.search_blob.contains(&needle)
            }),
            limit,
            offset,
        ))
    }

    async fn list(
        &self,
        resource_type: ResourceType,
        limit: i64,
        offset: i64,
    ) -> Result<Page<StoredResource>> {
        let rows = self.read()?;
        let mut matches: Vec<&NormalizedRecord> =
            rows.iter().filter(|r| r.resource_type == resource_type).collect();
        matches.sort_by_key(|r| r.surrogate_key);
        Ok(paginate(matches.into_iter(), limit, offset))
    }

    async fn get(
        &self,
        resource_type: ResourceType,
        surrogate_key: i64,
    ) -> Result<Option<StoredResource>> {
        let rows = self.read()?;
        Ok(rows
            .iter()
            .find(|r| r.resource_type == resource_type && r.surrogate_key == surrogate_key)
            .map(to_stored))
    }

    async fn counts(&self) -> Result<Vec<(ResourceType, i64)>> {
        let rows = self.read()?;
        Ok(ResourceType::ALL
            .iter()
            .map(|rt| {
                let n = rows.iter().filter(|r| r.resource_type == *rt).count() as i64;
                (*rt, n)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(rt: ResourceType, key: i64, name: &str) -> NormalizedRecord {
        NormalizedRecord {
            surrogate_key: key,
            resource_type: rt,
            display_name: name.to_string(),
            payload: json!({ "name": name }),
            search_blob: name.to_lowercase(),
        }
    }

    #[tokio::test]
    async fn test_replace_is_not_cumulative() {
        let store = InMemoryStore::new();
        let records = vec![
            rec(ResourceType::People, 1, "Luke Skywalker"),
            rec(ResourceType::Planets, 1, "Tatooine"),
        ];
        store.replace_all(&records).await.unwrap();
        store.replace_all(&records).await.unwrap();
        assert_eq!(store.rows().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_key_keeps_previous_rows() {
        let store = InMemoryStore::new();
        store
            .replace_all(&[rec(ResourceType::People, 1, "Luke Skywalker")])
            .await
            .unwrap();

        let dup = vec![
            rec(ResourceType::People, 2, "C-3PO"),
            rec(ResourceType::People, 2, "R2-D2"),
        ];
        assert!(store.replace_all(&dup).await.is_err());

        let rows = store.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].display_name, "Luke Skywalker");
    }

    #[tokio::test]
    async fn test_search_filters_and_paginates() {
        let store = InMemoryStore::new();
        store
            .replace_all(&[
                rec(ResourceType::People, 1, "Luke Skywalker"),
                rec(ResourceType::People, 11, "Anakin Skywalker"),
                rec(ResourceType::Starships, 12, "X-wing"),
            ])
            .await
            .unwrap();

        let page = store.search("SKY", None, 1, 1).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].display_name, "Anakin Skywalker");

        let page = store
            .search("wing", Some(ResourceType::People), 10, 0)
            .await
            .unwrap();
        assert_eq!(page.total, 0);

        let page = store.search("   ", None, 10, 0).await.unwrap();
        assert!(page.results.is_empty());
    }

    #[tokio::test]
    async fn test_list_get_counts() {
        let store = InMemoryStore::new();
        store
            .replace_all(&[
                rec(ResourceType::People, 5, "Leia Organa"),
                rec(ResourceType::People, 1, "Luke Skywalker"),
            ])
            .await
            .unwrap();

        let page = store.list(ResourceType::People, 10, 0).await.unwrap();
        let keys: Vec<i64> = page.results.iter().map(|r| r.surrogate_key).collect();
        assert_eq!(keys, vec![1, 5]);

        assert!(store.get(ResourceType::People, 5).await.unwrap().is_some());
        assert!(store.get(ResourceType::Films, 5).await.unwrap().is_none());

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.len(), 6);
        assert!(counts.contains(&(ResourceType::People, 2)));
        assert!(counts.contains(&(ResourceType::Films, 0)));
    }

    #[tokio::test]
    async fn test_rejecting_store_fails_writes() {
        let store = InMemoryStore::rejecting_writes();
        assert!(store
            .replace_all(&[rec(ResourceType::People, 1, "Luke Skywalker")])
            .await
            .is_err());
    }
}
