//! Browsing stored resources by type and by key.

use anyhow::{bail, Result};

use swapi_search_core::models::{Page, StoredResource};
use swapi_search_core::store::Store;
use swapi_search_core::ResourceType;

use crate::config::{Config, RetrievalConfig};
use crate::search::print_page;
use crate::sqlite_store::SqliteStore;

/// One page of a resource type, ordered by surrogate key.
pub async fn list_resources(
    store: &dyn Store,
    retrieval: &RetrievalConfig,
    resource_type: ResourceType,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<Page<StoredResource>> {
    let limit = retrieval.clamp_limit(limit);
    let offset = offset.unwrap_or(0).max(0);
    store.list(resource_type, limit, offset).await
}

pub async fn run_list(
    config: &Config,
    resource_type: ResourceType,
    limit: Option<i64>,
    offset: Option<i64>,
    json: bool,
) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let page = list_resources(&store, &config.retrieval, resource_type, limit, offset).await?;
    store.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else if page.results.is_empty() {
        println!("No {} stored.", resource_type);
    } else {
        print_page(&page);
    }
    Ok(())
}

/// `swapi get <type> <key>`: print one record's payload as JSON.
pub async fn run_get(config: &Config, resource_type: ResourceType, surrogate_key: i64) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let resource = store.get(resource_type, surrogate_key).await?;
    store.close().await;

    match resource {
        Some(resource) => {
            println!("{}", serde_json::to_string_pretty(&resource)?);
            Ok(())
        }
        None => bail!("{} not found: {}", resource_type, surrogate_key),
    }
}
