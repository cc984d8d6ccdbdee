//! Storage abstraction for SWAPI Search.
//!
//! The [`Store`] trait covers the single write the pipeline performs (an
//! atomic replace of the whole resource set) and the thin read queries used
//! by the browse and search commands. Backends: SQLite in the application
//! crate, [`memory::InMemoryStore`] for tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{NormalizedRecord, Page, ResourceType, StoredResource};

/// Abstract storage backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`replace_all`](Store::replace_all) | Atomically swap the stored set for a new one |
/// | [`search`](Store::search) | Case-insensitive substring search over search blobs |
/// | [`list`](Store::list) | Paginated browse of one type, by surrogate key |
/// | [`get`](Store::get) | Fetch one record by natural key |
/// | [`counts`](Store::counts) | Row counts per type |
#[async_trait]
pub trait Store: Send + Sync {
    /// Replace the entire stored set with `records` in one unit of work.
    ///
    /// Either every record is visible afterward or the previous contents
    /// are. Two records sharing `(resource_type, surrogate_key)` fail the
    /// whole call. Returns the number of rows written.
    async fn replace_all(&self, records: &[NormalizedRecord]) -> Result<u64>;

    /// Substring search over search blobs, in load order.
    async fn search(
        &self,
        query: &str,
        resource_type: Option<ResourceType>,
        limit: i64,
        offset: i64,
    ) -> Result<Page<StoredResource>>;

    async fn list(
        &self,
        resource_type: ResourceType,
        limit: i64,
        offset: i64,
    ) -> Result<Page<StoredResource>>;

    async fn get(
        &self,
        resource_type: ResourceType,
        surrogate_key: i64,
    ) -> Result<Option<StoredResource>>;

    /// Row counts for every resource type, in extraction order.
    async fn counts(&self) -> Result<Vec<(ResourceType, i64)>>;
}
