//! Keyword search over the stored resources.
//!
//! Matching is a case-insensitive substring test against each record's
//! search blob (its searchable text fields plus the names of everything it
//! links to), so `swapi search tatooine` also finds the people whose
//! homeworld is Tatooine. Results come back in load order.

use anyhow::Result;

use swapi_search_core::models::{Page, StoredResource};
use swapi_search_core::store::Store;
use swapi_search_core::ResourceType;

use crate::config::{Config, RetrievalConfig};
use crate::sqlite_store::SqliteStore;

/// Run a search with the configured paging bounds applied.
pub async fn search_resources(
    store: &dyn Store,
    retrieval: &RetrievalConfig,
    query: &str,
    resource_type: Option<ResourceType>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<Page<StoredResource>> {
    let limit = retrieval.clamp_limit(limit);
    let offset = offset.unwrap_or(0).max(0);
    store.search(query, resource_type, limit, offset).await
}

pub async fn run_search(
    config: &Config,
    query: &str,
    resource_type: Option<ResourceType>,
    limit: Option<i64>,
    offset: Option<i64>,
    json: bool,
) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let page = search_resources(
        &store,
        &config.retrieval,
        query,
        resource_type,
        limit,
        offset,
    )
    .await?;
    store.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    print_page(&page);
    Ok(())
}

/// Human-readable listing shared by `search` and `list`.
pub fn print_page(page: &Page<StoredResource>) {
    for resource in &page.results {
        println!(
            "  {}/{:<4} {}",
            resource.resource_type, resource.surrogate_key, resource.display_name
        );
    }
    let shown_to = page.offset + page.results.len() as i64;
    println!();
    println!(
        "{}-{} of {}",
        if page.results.is_empty() { page.offset } else { page.offset + 1 },
        shown_to,
        page.total
    );
}
