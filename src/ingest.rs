//! Pipeline orchestration.
//!
//! A sync run walks a fixed sequence of phases:
//!
//! ```text
//! Init → Extract → Transform → Load → Done
//!            \          \         \
//!             └──────────┴─────────┴──→ Failed
//! ```
//!
//! - **Extract** asks the [`RecordSource`] for every resource type in
//!   [`ResourceType::ALL`] order, one type at a time. A type that yields
//!   nothing is kept as an empty batch.
//! - **Transform** builds one [`ReferenceIndex`] over everything fetched,
//!   then normalizes every record against it. Records that cannot be
//!   normalized are logged and dropped.
//! - **Load** hands the normalized set to the loader in a single call.
//!
//! Record-level failures never leave their phase. An error that escapes a
//! phase moves the run to `Failed` and the store keeps its prior contents.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::{error, info, warn};

use swapi_search_core::models::AllRecords;
use swapi_search_core::normalize::normalize_all;
use swapi_search_core::store::Store;
use swapi_search_core::{NormalizedRecord, ReferenceIndex, ResourceType};

use crate::config::Config;
use crate::fetch::{RecordSource, SwapiClient};
use crate::load::load;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Init,
    Extract,
    Transform,
    Load,
    Done,
    Failed,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub phase: Phase,
    /// Validated records fetched per type.
    pub fetched: BTreeMap<ResourceType, usize>,
    pub normalized: usize,
    /// Records dropped during normalization.
    pub skipped: usize,
    pub loaded: u64,
    pub error: Option<String>,
}

impl SyncReport {
    fn new() -> Self {
        Self {
            phase: Phase::Init,
            fetched: BTreeMap::new(),
            normalized: 0,
            skipped: 0,
            loaded: 0,
            error: None,
        }
    }

    pub fn total_fetched(&self) -> usize {
        self.fetched.values().sum()
    }
}

pub struct Pipeline<'a> {
    source: &'a dyn RecordSource,
    store: &'a dyn Store,
    public_base_url: String,
    report: SyncReport,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source: &'a dyn RecordSource,
        store: &'a dyn Store,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            public_base_url: public_base_url.into(),
            report: SyncReport::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.report.phase
    }

    /// Run every phase and return the report. Never returns early with an
    /// error; a failed run is reported with [`Phase::Failed`].
    pub async fn run(mut self) -> SyncReport {
        if let Err(e) = self.run_phases().await {
            error!(phase = ?self.report.phase, error = %format!("{:#}", e), "sync failed");
            self.report.error = Some(format!("{:#}", e));
            self.report.phase = Phase::Failed;
        }
        self.report
    }

    async fn run_phases(&mut self) -> Result<()> {
        self.enter(Phase::Extract);
        let all_records = self.extract().await?;

        self.enter(Phase::Transform);
        let records = self.transform(&all_records)?;

        self.enter(Phase::Load);
        self.report.loaded = load(self.store, &records).await?;

        self.enter(Phase::Done);
        Ok(())
    }

    fn enter(&mut self, phase: Phase) {
        info!(?phase, "entering phase");
        self.report.phase = phase;
    }

    async fn extract(&mut self) -> Result<AllRecords> {
        let mut all_records = AllRecords::new();
        for resource_type in ResourceType::ALL {
            let records = self.source.fetch_all(resource_type).await;
            if records.is_empty() {
                warn!(%resource_type, "no records extracted");
            }
            self.report.fetched.insert(resource_type, records.len());
            all_records.insert(resource_type, records);
        }
        Ok(all_records)
    }

    fn transform(&mut self, all_records: &AllRecords) -> Result<Vec<NormalizedRecord>> {
        let index = ReferenceIndex::build(all_records);
        info!(entries = index.len(), "reference index built");

        let outcome = normalize_all(all_records, &index, &self.public_base_url);
        for skipped in &outcome.skipped {
            warn!(
                resource_type = %skipped.resource_type,
                address = %skipped.address,
                error = %skipped.error,
                "skipping record"
            );
        }

        self.report.normalized = outcome.records.len();
        self.report.skipped = outcome.skipped.len();
        info!(
            normalized = outcome.records.len(),
            skipped = outcome.skipped.len(),
            "transform complete"
        );
        Ok(outcome.records)
    }
}

/// `swapi sync`: fetch from the configured source and replace the store.
pub async fn run_sync(config: &Config) -> Result<SyncReport> {
    let store = SqliteStore::open(config).await?;
    let client = SwapiClient::new(&config.source)?;

    let report = Pipeline::new(&client, &store, config.public.base_url.as_str())
        .run()
        .await;

    // The catalog is already committed; a history write failure only loses
    // the stats entry.
    if report.phase == Phase::Done && report.loaded > 0 {
        if let Err(e) = store
            .record_sync_run(
                report.total_fetched() as u64,
                report.skipped as u64,
                report.loaded,
            )
            .await
        {
            warn!(error = %format!("{:#}", e), "failed to record sync run");
        }
    }

    println!("sync {}", config.source.base_url);
    for (resource_type, count) in &report.fetched {
        println!("  {:<10} {}", resource_type.as_str(), count);
    }
    println!("  normalized: {}", report.normalized);
    println!("  skipped:    {}", report.skipped);
    println!("  loaded:     {}", report.loaded);

    store.close().await;

    if let Some(ref e) = report.error {
        bail!("sync failed: {}", e);
    }
    println!("ok");
    Ok(report)
}
