//! Loader: atomic bulk replace of the stored record set.

use anyhow::{Context, Result};
use tracing::{info, warn};

use swapi_search_core::store::Store;
use swapi_search_core::NormalizedRecord;

/// Replace the store's contents with `records`.
///
/// An empty batch is a no-op that leaves the store alone and returns 0.
/// Otherwise the store swaps everything in one transaction; on failure the
/// previous contents survive and the error is returned.
pub async fn load(store: &dyn Store, records: &[NormalizedRecord]) -> Result<u64> {
    if records.is_empty() {
        warn!("no records to load, leaving store unchanged");
        return Ok(0);
    }

    let written = store
        .replace_all(records)
        .await
        .with_context(|| format!("Failed to load {} records", records.len()))?;

    info!(rows = written, "load complete");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use swapi_search_core::store::memory::InMemoryStore;
    use swapi_search_core::ResourceType;

    fn rec(key: i64, name: &str) -> NormalizedRecord {
        NormalizedRecord {
            surrogate_key: key,
            resource_type: ResourceType::People,
            display_name: name.to_string(),
            payload: json!({ "name": name }),
            search_blob: name.to_lowercase(),
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let store = InMemoryStore::new();
        load(&store, &[rec(1, "Luke Skywalker")]).await.unwrap();

        assert_eq!(load(&store, &[]).await.unwrap(), 0);
        assert_eq!(store.rows().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let store = InMemoryStore::rejecting_writes();
        let err = load(&store, &[rec(1, "Luke Skywalker")]).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load 1 records"));
    }
}
