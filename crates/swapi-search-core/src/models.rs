//! Core data models used throughout SWAPI Search.
//!
//! These types represent the records that flow through the ETL pipeline:
//! [`RawRecord`]s produced by the fetcher, [`Relation`]s produced by the
//! resolver, and [`NormalizedRecord`]s handed to the store.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The closed set of resource types served by the upstream source.
///
/// Declaration order is the fixed extraction order used by the pipeline,
/// and `Ord` follows it, so a `BTreeMap<ResourceType, _>` iterates in
/// pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Films,
    People,
    Planets,
    Species,
    Starships,
    Vehicles,
}

impl ResourceType {
    /// Every resource type, in extraction order.
    pub const ALL: [ResourceType; 6] = [
        ResourceType::Films,
        ResourceType::People,
        ResourceType::Planets,
        ResourceType::Species,
        ResourceType::Starships,
        ResourceType::Vehicles,
    ];

    /// The lowercase plural name used in upstream and local URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Films => "films",
            ResourceType::People => "people",
            ResourceType::Planets => "planets",
            ResourceType::Species => "species",
            ResourceType::Starships => "starships",
            ResourceType::Vehicles => "vehicles",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .iter()
            .copied()
            .find(|rt| rt.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| {
                format!(
                    "unknown resource type '{}'. Expected one of: films, people, planets, species, starships, vehicles",
                    s
                )
            })
    }
}

/// Derive the canonical identifier of an upstream address.
///
/// Upstream addresses appear both with and without a trailing slash; the
/// canonical form drops it so both spellings resolve to the same record.
pub fn canonical_id(address: &str) -> String {
    address.trim().trim_end_matches('/').to_string()
}

/// One validated entity fetched from the upstream source.
///
/// `fields` holds only the schema-declared fields, still in their raw
/// upstream form (references are plain address strings).
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub resource_type: ResourceType,
    /// The record's own upstream address, as served.
    pub address: String,
    /// [`canonical_id`] of `address`.
    pub canonical_id: String,
    /// The record's `name`, or `title` for films.
    pub display_name: String,
    pub fields: Map<String, Value>,
}

/// All fetched records of a run, keyed by resource type.
pub type AllRecords = BTreeMap<ResourceType, Vec<RawRecord>>;

/// The resolved form of a single cross-reference.
///
/// `display_name` serializes as `null` when the identifier is unknown to the
/// reference index; the link itself is never dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub identifier: String,
    pub display_name: Option<String>,
}

/// A storage-ready record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub surrogate_key: i64,
    pub resource_type: ResourceType,
    pub display_name: String,
    pub payload: Value,
    pub search_blob: String,
}

/// A record as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredResource {
    pub surrogate_key: i64,
    pub resource_type: ResourceType,
    pub display_name: String,
    pub payload: Value,
}

/// One page of read-side results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub results: Vec<T>,
}
