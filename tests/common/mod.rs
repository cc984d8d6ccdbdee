#![allow(dead_code)]

//! Shared fixtures: a fake upstream HTTP server, detail-body builders, and
//! an in-process record source.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tempfile::TempDir;

use swapi_search::config::{Config, SourceConfig};
use swapi_search::fetch::RecordSource;
use swapi_search_core::models::AllRecords;
use swapi_search_core::schema::{self, schema_for, FieldKind};
use swapi_search_core::{RawRecord, ResourceType};

/// A complete, schema-valid detail body for `resource_type`.
///
/// Every declared field gets a placeholder; `overrides` replaces or adds
/// fields on top.
pub fn body(resource_type: ResourceType, url: &str, overrides: Value) -> Value {
    let mut fields = Map::new();
    for spec in schema_for(resource_type).fields {
        let value = match spec.kind {
            FieldKind::Address => json!(url),
            FieldKind::Text => json!("unknown"),
            FieldKind::Integer => json!(1),
            FieldKind::Reference if spec.nullable => Value::Null,
            FieldKind::Reference => json!("https://elsewhere.invalid/api/planets/0"),
            FieldKind::ReferenceList => json!([]),
        };
        fields.insert(spec.name.to_string(), value);
    }
    if let Some(extra) = overrides.as_object() {
        for (k, v) in extra {
            fields.insert(k.clone(), v.clone());
        }
    }
    Value::Object(fields)
}

pub fn raw(resource_type: ResourceType, url: &str, overrides: Value) -> RawRecord {
    schema::validate(resource_type, &body(resource_type, url, overrides)).unwrap()
}

/// One film, one person, one planet, all linked to each other.
pub fn linked_trio(base: &str) -> AllRecords {
    let film = format!("{}/films/1", base);
    let person = format!("{}/people/1", base);
    let planet = format!("{}/planets/1", base);

    let mut all = AllRecords::new();
    all.insert(
        ResourceType::Films,
        vec![raw(
            ResourceType::Films,
            &film,
            json!({ "title": "A New Hope", "director": "George Lucas", "characters": [person] }),
        )],
    );
    all.insert(
        ResourceType::People,
        vec![raw(
            ResourceType::People,
            &person,
            json!({ "name": "Luke Skywalker", "homeworld": planet, "films": [film] }),
        )],
    );
    all.insert(
        ResourceType::Planets,
        vec![raw(
            ResourceType::Planets,
            &planet,
            json!({ "name": "Tatooine", "climate": "arid", "terrain": "desert", "residents": [person] }),
        )],
    );
    all
}

/// Record source backed by a fixed set of records.
pub struct FixedSource {
    records: AllRecords,
}

impl FixedSource {
    pub fn new(records: AllRecords) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for FixedSource {
    async fn fetch_all(&self, resource_type: ResourceType) -> Vec<RawRecord> {
        self.records.get(&resource_type).cloned().unwrap_or_default()
    }
}

/// A config pointing at a temporary database.
pub fn temp_config(tmp: &TempDir) -> Config {
    let mut config = Config::minimal();
    config.db.path = tmp.path().join("data").join("swapi.sqlite");
    config
}

/// Source settings for talking to a local fixture server without real
/// backoff delays.
pub fn fast_source(base_url: &str) -> SourceConfig {
    SourceConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        max_concurrency: 4,
        max_attempts: 3,
        retry_base_ms: 1,
        retry_cap_ms: 5,
        ..SourceConfig::default()
    }
}

#[derive(Default)]
struct UpstreamState {
    listings: Mutex<HashMap<String, Vec<Value>>>,
    listing_overrides: Mutex<HashMap<String, (u16, Value)>>,
    details: Mutex<HashMap<String, (u16, Value)>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl UpstreamState {
    fn hit(&self, key: &str) {
        *self.hits.lock().unwrap().entry(key.to_string()).or_insert(0) += 1;
    }
}

/// In-process stand-in for the upstream API, serving
/// `/api/{type}` listings and `/api/{type}/{id}` details.
pub struct Upstream {
    pub base_url: String,
    state: Arc<UpstreamState>,
}

impl Upstream {
    pub async fn start() -> Self {
        let state = Arc::new(UpstreamState::default());
        let app = Router::new()
            .route("/api/{resource_type}", get(listing))
            .route("/api/{resource_type}/{id}", get(detail))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api", addr),
            state,
        }
    }

    pub fn url(&self, resource_type: ResourceType, id: i64) -> String {
        format!("{}/{}/{}", self.base_url, resource_type, id)
    }

    /// Serve a detail body and list it in its type's listing.
    pub fn add(&self, resource_type: ResourceType, id: i64, overrides: Value) {
        let url = self.url(resource_type, id);
        self.add_raw(resource_type, id, 200, body(resource_type, &url, overrides));
    }

    /// Serve an arbitrary status and body for a detail address, and list it.
    pub fn add_raw(&self, resource_type: ResourceType, id: i64, status: u16, body: Value) {
        let url = self.url(resource_type, id);
        self.state
            .listings
            .lock()
            .unwrap()
            .entry(resource_type.to_string())
            .or_default()
            .push(json!({ "url": url }));
        self.state
            .details
            .lock()
            .unwrap()
            .insert(format!("{}/{}", resource_type, id), (status, body));
    }

    /// Replace a type's listing response outright.
    pub fn set_listing(&self, resource_type: ResourceType, status: u16, body: Value) {
        self.state
            .listing_overrides
            .lock()
            .unwrap()
            .insert(resource_type.to_string(), (status, body));
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

async fn listing(
    State(state): State<Arc<UpstreamState>>,
    Path(resource_type): Path<String>,
) -> (StatusCode, Json<Value>) {
    state.hit(&resource_type);

    let overridden = state
        .listing_overrides
        .lock()
        .unwrap()
        .get(&resource_type)
        .cloned();
    if let Some((status, body)) = overridden {
        return (status_code(status), Json(body));
    }

    let items = state
        .listings
        .lock()
        .unwrap()
        .get(&resource_type)
        .cloned()
        .unwrap_or_default();
    (StatusCode::OK, Json(Value::Array(items)))
}

async fn detail(
    State(state): State<Arc<UpstreamState>>,
    Path((resource_type, id)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    let key = format!("{}/{}", resource_type, id);
    state.hit(&key);

    let entry = state.details.lock().unwrap().get(&key).cloned();
    match entry {
        Some((status, body)) => (status_code(status), Json(body)),
        None => (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found" }))),
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap()
}
