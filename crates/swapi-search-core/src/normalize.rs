//! Record normalization.
//!
//! Turns a validated [`RawRecord`] into a storage-ready [`NormalizedRecord`]:
//!
//! 1. resolve every reference field through the [`ReferenceIndex`],
//! 2. derive the surrogate key from the trailing numeric segment of the
//!    record's canonical identifier,
//! 3. rewrite the record's own `url` to this system's public address
//!    (`{base}/api/v1/{type}/{key}`),
//! 4. mirror `title` into `name` when a record only has a title,
//! 5. build the lowercase search blob from the type's search fields plus the
//!    display names of every resolved relation.
//!
//! Only step 2 can fail, and only for the record at hand. [`normalize_all`]
//! additionally drops a record whose key is taken by a later one.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::NormalizeError;
use crate::models::{AllRecords, NormalizedRecord, RawRecord, ResourceType};
use crate::resolve::ReferenceIndex;
use crate::schema::{schema_for, ADDRESS_FIELD};

/// Path prefix of this system's public resource addresses.
pub const API_PREFIX: &str = "api/v1";

/// Parse the trailing numeric path segment of a canonical identifier.
pub fn surrogate_key(canonical_id: &str) -> Result<i64, NormalizeError> {
    canonical_id
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<i64>().ok())
        .ok_or_else(|| NormalizeError::UnparseableIdentifier(canonical_id.to_string()))
}

/// The public address of a stored record.
pub fn local_address(public_base_url: &str, resource_type: ResourceType, key: i64) -> String {
    format!(
        "{}/{}/{}/{}",
        public_base_url.trim_end_matches('/'),
        API_PREFIX,
        resource_type,
        key
    )
}

/// Normalize one record.
pub fn normalize(
    record: &RawRecord,
    index: &ReferenceIndex,
    public_base_url: &str,
) -> Result<NormalizedRecord, NormalizeError> {
    let resolved = index.resolve_record(record);
    let key = surrogate_key(&record.canonical_id)?;
    let schema = schema_for(record.resource_type);

    let mut blob_parts: Vec<&str> = schema
        .search_fields
        .iter()
        .filter_map(|name| record.fields.get(*name).and_then(Value::as_str))
        .collect();
    let relation_names: Vec<&str> = resolved.iter().flat_map(|(_, v)| v.relation_names()).collect();
    blob_parts.extend(relation_names);
    let search_blob = blob_parts
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut payload = Map::new();
    for (name, value) in resolved {
        payload.insert(name.to_string(), value.into_json());
    }
    payload.insert(
        ADDRESS_FIELD.to_string(),
        Value::String(local_address(public_base_url, record.resource_type, key)),
    );
    if !payload.contains_key("name") {
        if let Some(title) = payload.get("title").cloned() {
            payload.insert("name".to_string(), title);
        }
    }

    let display_name = if record.display_name.is_empty() {
        "Unknown".to_string()
    } else {
        record.display_name.clone()
    };

    Ok(NormalizedRecord {
        surrogate_key: key,
        resource_type: record.resource_type,
        display_name,
        payload: Value::Object(payload),
        search_blob,
    })
}

/// A record dropped during normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub resource_type: ResourceType,
    pub address: String,
    pub error: NormalizeError,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
    /// Normalized records, grouped by type in extraction order and sorted by
    /// surrogate key within a type.
    pub records: Vec<NormalizedRecord>,
    pub skipped: Vec<SkippedRecord>,
}

/// Normalize every fetched record against one shared index.
///
/// At most one record per `(resource_type, surrogate_key)` survives. When
/// two records map to the same key, the later one wins and the earlier one
/// is reported as skipped.
pub fn normalize_all(
    all_records: &AllRecords,
    index: &ReferenceIndex,
    public_base_url: &str,
) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();

    for (resource_type, records) in all_records {
        let mut by_key: BTreeMap<i64, (&str, NormalizedRecord)> = BTreeMap::new();
        for record in records {
            match normalize(record, index, public_base_url) {
                Ok(n) => {
                    let key = n.surrogate_key;
                    if let Some((address, _)) = by_key.insert(key, (record.address.as_str(), n)) {
                        outcome.skipped.push(SkippedRecord {
                            resource_type: *resource_type,
                            address: address.to_string(),
                            error: NormalizeError::DuplicateKey(key),
                        });
                    }
                }
                Err(error) => outcome.skipped.push(SkippedRecord {
                    resource_type: *resource_type,
                    address: record.address.clone(),
                    error,
                }),
            }
        }
        outcome.records.extend(by_key.into_values().map(|(_, n)| n));
    }

    outcome
}
