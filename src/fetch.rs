//! Fetcher for the upstream SWAPI source.
//!
//! Retrieval is two-stage per resource type:
//!
//! 1. `GET {base_url}/{type}` returns a JSON array of summary objects, each
//!    carrying the record's `url`.
//! 2. One `GET` per summary `url` returns the full record, which is then
//!    validated against the type's strict schema.
//!
//! Detail requests run concurrently, at most `source.max_concurrency` in
//! flight. Every request is retried with capped exponential backoff:
//!
//! - transport errors (connect, timeout, reset) → retry
//! - HTTP 429 and 5xx → retry
//! - any other non-success status → fail immediately
//!
//! [`RecordSource::fetch_all`] never fails. A broken listing yields an empty
//! batch; a broken detail loses only that record. Both are logged.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use swapi_search_core::schema::{self, ADDRESS_FIELD};
use swapi_search_core::{RawRecord, ResourceType};

use crate::config::SourceConfig;

/// Anything that can produce the validated records of one resource type.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// All records of `resource_type` that could be fetched and validated,
    /// in no particular order.
    async fn fetch_all(&self, resource_type: ResourceType) -> Vec<RawRecord>;
}

/// HTTP client for the upstream source.
pub struct SwapiClient {
    client: reqwest::Client,
    base_url: String,
    max_concurrency: usize,
    max_attempts: u32,
    retry_base_ms: u64,
    retry_cap_ms: u64,
}

impl SwapiClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_concurrency: config.max_concurrency.max(1),
            max_attempts: config.max_attempts.max(1),
            retry_base_ms: config.retry_base_ms,
            retry_cap_ms: config.retry_cap_ms,
        })
    }

    /// The listing address of a resource type.
    pub fn listing_url(&self, resource_type: ResourceType) -> String {
        format!("{}/{}", self.base_url, resource_type)
    }

    /// GET a JSON document, retrying transient failures.
    async fn get_json(&self, url: &str) -> Result<Value> {
        let mut last_err = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = backoff_delay(self.retry_base_ms, self.retry_cap_ms, attempt);
                debug!(url, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                tokio::time::sleep(delay).await;
            }

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json::<Value>()
                            .await
                            .with_context(|| format!("Invalid JSON body from {}", url));
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow!("HTTP {} from {}", status, url));
                        continue;
                    }

                    bail!("HTTP {} from {}", status, url);
                }
                Err(e) => {
                    last_err = Some(anyhow::Error::new(e).context(format!("GET {} failed", url)));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| anyhow!("GET {} failed", url))
            .context(format!("giving up after {} attempts", self.max_attempts)))
    }

    /// Fetch the listing of a resource type and return the detail addresses.
    pub async fn fetch_listing(&self, resource_type: ResourceType) -> Result<Vec<String>> {
        let url = self.listing_url(resource_type);
        let body = self.get_json(&url).await?;
        listing_addresses(&body).with_context(|| format!("Unexpected listing shape at {}", url))
    }

    /// Fetch and validate one record.
    pub async fn fetch_detail(
        &self,
        resource_type: ResourceType,
        address: &str,
    ) -> Result<RawRecord> {
        let body = self.get_json(address).await?;
        schema::validate(resource_type, &body)
            .with_context(|| format!("{} record failed validation", resource_type))
    }
}

#[async_trait]
impl RecordSource for SwapiClient {
    async fn fetch_all(&self, resource_type: ResourceType) -> Vec<RawRecord> {
        let addresses = match self.fetch_listing(resource_type).await {
            Ok(addresses) => addresses,
            Err(e) => {
                error!(%resource_type, error = %format!("{:#}", e), "listing failed");
                return Vec::new();
            }
        };
        debug!(%resource_type, count = addresses.len(), "listing fetched");

        let results: Vec<(String, Result<RawRecord>)> = stream::iter(addresses)
            .map(|address| async move {
                let result = self.fetch_detail(resource_type, &address).await;
                (address, result)
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut records = Vec::with_capacity(results.len());
        let mut failed = 0usize;
        for (address, result) in results {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    failed += 1;
                    warn!(%resource_type, %address, error = %format!("{:#}", e), "skipping record");
                }
            }
        }

        info!(%resource_type, fetched = records.len(), failed, "extracted");
        records
    }
}

/// Pull the detail addresses out of a listing body.
///
/// Errors only when the body is not an array; entries without a string
/// `url` are dropped.
pub fn listing_addresses(body: &Value) -> Result<Vec<String>> {
    let items = match body.as_array() {
        Some(items) => items,
        None => bail!("expected a JSON array"),
    };

    Ok(items
        .iter()
        .filter_map(|item| item.get(ADDRESS_FIELD).and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}

/// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`,
/// capped at `cap`.
pub fn backoff_delay(base_ms: u64, cap_ms: u64, retry: u32) -> Duration {
    let factor = 1u64 << (retry.saturating_sub(1)).min(20);
    Duration::from_millis(base_ms.saturating_mul(factor).min(cap_ms))
}
