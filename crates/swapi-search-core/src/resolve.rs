//! Cross-reference resolution.
//!
//! A [`ReferenceIndex`] maps every fetched record's canonical identifier to
//! its display name. It is built once per run from the records of *all*
//! resource types (a person's `homeworld` points at a planet, a film's
//! `characters` at people) and is read-only afterward.
//!
//! Resolution is total and order-preserving: every reference becomes a
//! [`Relation`], and a reference list keeps its exact length and order even
//! when every lookup misses.

use std::collections::HashMap;

use serde_json::Value;

use crate::models::{canonical_id, AllRecords, RawRecord, Relation};
use crate::schema::{schema_for, FieldKind, FieldSpec};

/// Canonical identifier → display name, for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    names: HashMap<String, String>,
}

/// A record field after resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Scalar(Value),
    Relation(Relation),
    Relations(Vec<Relation>),
}

impl ResolvedValue {
    /// Display names of the relations carried by this value, skipping misses.
    pub fn relation_names(&self) -> Vec<&str> {
        match self {
            ResolvedValue::Scalar(_) => Vec::new(),
            ResolvedValue::Relation(rel) => rel.display_name.as_deref().into_iter().collect(),
            ResolvedValue::Relations(rels) => rels
                .iter()
                .filter_map(|r| r.display_name.as_deref())
                .collect(),
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            ResolvedValue::Scalar(v) => v,
            ResolvedValue::Relation(rel) => relation_json(rel),
            ResolvedValue::Relations(rels) => {
                Value::Array(rels.into_iter().map(relation_json).collect())
            }
        }
    }
}

fn relation_json(rel: Relation) -> Value {
    serde_json::json!({
        "identifier": rel.identifier,
        "display_name": rel.display_name,
    })
}

impl ReferenceIndex {
    /// Build the index over every record of every resource type.
    ///
    /// Records with an empty display name are not indexed. A repeated
    /// identifier keeps the last name seen.
    pub fn build(all_records: &AllRecords) -> Self {
        let names = all_records
            .values()
            .flatten()
            .filter(|r| !r.display_name.is_empty())
            .map(|r| (r.canonical_id.clone(), r.display_name.clone()))
            .collect();
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Look up the display name of an upstream address.
    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.names.get(&canonical_id(identifier)).map(String::as_str)
    }

    /// Resolve one address. The identifier is kept exactly as given.
    pub fn resolve_reference(&self, identifier: &str) -> Relation {
        Relation {
            identifier: identifier.to_string(),
            display_name: self.get(identifier).map(str::to_string),
        }
    }

    /// Resolve one field value according to its declared kind.
    pub fn resolve_field(&self, spec: &FieldSpec, value: &Value) -> ResolvedValue {
        match (spec.kind, value) {
            (FieldKind::Reference, Value::String(addr)) => {
                ResolvedValue::Relation(self.resolve_reference(addr))
            }
            (FieldKind::ReferenceList, Value::Array(items)) => ResolvedValue::Relations(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(addr) => self.resolve_reference(addr),
                        other => Relation {
                            identifier: other.to_string(),
                            display_name: None,
                        },
                    })
                    .collect(),
            ),
            _ => ResolvedValue::Scalar(value.clone()),
        }
    }

    /// Resolve every field of a record, in schema order.
    ///
    /// The record's own address field passes through untouched.
    pub fn resolve_record(&self, record: &RawRecord) -> Vec<(&'static str, ResolvedValue)> {
        schema_for(record.resource_type)
            .fields
            .iter()
            .filter_map(|spec| {
                record
                    .fields
                    .get(spec.name)
                    .map(|value| (spec.name, self.resolve_field(spec, value)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceType;
    use serde_json::{json, Map};

    fn record(rt: ResourceType, address: &str, name: &str, fields: Value) -> RawRecord {
        let mut fields: Map<String, Value> = fields.as_object().cloned().unwrap_or_default();
        fields.insert("url".to_string(), json!(address));
        RawRecord {
            resource_type: rt,
            address: address.to_string(),
            canonical_id: canonical_id(address),
            display_name: name.to_string(),
            fields,
        }
    }

    fn index() -> ReferenceIndex {
        let mut all = AllRecords::new();
        all.insert(
            ResourceType::Films,
            vec![record(
                ResourceType::Films,
                "https://swapi.info/api/films/1",
                "A New Hope",
                json!({}),
            )],
        );
        all.insert(
            ResourceType::Planets,
            vec![
                record(
                    ResourceType::Planets,
                    "https://swapi.info/api/planets/1",
                    "Tatooine",
                    json!({}),
                ),
                record(ResourceType::Planets, "https://swapi.info/api/planets/2", "", json!({})),
            ],
        );
        ReferenceIndex::build(&all)
    }

    #[test]
    fn test_build_spans_all_types_and_skips_unnamed() {
        let idx = index();
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.get("https://swapi.info/api/films/1"), Some("A New Hope"));
        assert_eq!(idx.get("https://swapi.info/api/planets/1/"), Some("Tatooine"));
        assert_eq!(idx.get("https://swapi.info/api/planets/2"), None);
    }

    #[test]
    fn test_duplicate_identifier_last_write_wins() {
        let mut all = AllRecords::new();
        all.insert(
            ResourceType::People,
            vec![
                record(ResourceType::People, "https://x/api/people/1", "First", json!({})),
                record(ResourceType::People, "https://x/api/people/1/", "Second", json!({})),
            ],
        );
        let idx = ReferenceIndex::build(&all);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.get("https://x/api/people/1"), Some("Second"));
    }

    #[test]
    fn test_single_reference_hit_and_miss() {
        let idx = index();
        let spec = FieldSpec {
            name: "homeworld",
            kind: FieldKind::Reference,
            nullable: false,
        };

        let hit = idx.resolve_field(&spec, &json!("https://swapi.info/api/planets/1/"));
        assert_eq!(
            hit,
            ResolvedValue::Relation(Relation {
                identifier: "https://swapi.info/api/planets/1/".to_string(),
                display_name: Some("Tatooine".to_string()),
            })
        );

        let miss = idx.resolve_field(&spec, &json!("https://swapi.info/api/planets/404"));
        assert_eq!(
            miss,
            ResolvedValue::Relation(Relation {
                identifier: "https://swapi.info/api/planets/404".to_string(),
                display_name: None,
            })
        );
    }

    #[test]
    fn test_reference_list_preserves_length_and_order_on_misses() {
        let idx = ReferenceIndex::default();
        let spec = FieldSpec {
            name: "films",
            kind: FieldKind::ReferenceList,
            nullable: false,
        };
        let input = json!(["https://a/films/3", "https://a/films/1", "https://a/films/3"]);

        let ResolvedValue::Relations(rels) = idx.resolve_field(&spec, &input) else {
            panic!("expected a relation list");
        };
        assert_eq!(rels.len(), 3);
        let ids: Vec<&str> = rels.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["https://a/films/3", "https://a/films/1", "https://a/films/3"]);
        assert!(rels.iter().all(|r| r.display_name.is_none()));
    }

    #[test]
    fn test_null_reference_stays_null() {
        let idx = index();
        let spec = FieldSpec {
            name: "homeworld",
            kind: FieldKind::Reference,
            nullable: true,
        };
        assert_eq!(
            idx.resolve_field(&spec, &Value::Null),
            ResolvedValue::Scalar(Value::Null)
        );
    }

    #[test]
    fn test_scalar_fields_pass_through() {
        let idx = index();
        let spec = FieldSpec {
            name: "climate",
            kind: FieldKind::Text,
            nullable: false,
        };
        // Address-shaped text in a scalar field is not a reference.
        let value = json!("https://swapi.info/api/planets/1");
        assert_eq!(
            idx.resolve_field(&spec, &value),
            ResolvedValue::Scalar(value.clone())
        );
    }

    #[test]
    fn test_relations_json_keeps_null_names() {
        let value = ResolvedValue::Relations(vec![Relation {
            identifier: "https://a/people/9".to_string(),
            display_name: None,
        }])
        .into_json();
        assert_eq!(
            value,
            json!([{ "identifier": "https://a/people/9", "display_name": null }])
        );
    }
}
