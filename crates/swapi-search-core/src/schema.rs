//! Strict per-resource-type schemas.
//!
//! Each [`ResourceType`] maps to one static [`ResourceSchema`] declaring,
//! per field, whether it is scalar text, an integer, the record's own
//! address, a single reference, or a list of references. Resolution and
//! search-blob construction are driven by these declarations rather than by
//! inspecting string contents.
//!
//! [`validate`] checks a fetched detail body against its schema and turns it
//! into a [`RawRecord`]. Undeclared upstream fields are dropped; missing or
//! mistyped declared fields reject the record.

use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::models::{canonical_id, RawRecord, ResourceType};

/// Name of the field holding a record's own upstream address.
pub const ADDRESS_FIELD: &str = "url";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// The record's own address. Never resolved; rewritten by the normalizer.
    Address,
    Text,
    Integer,
    /// A single address pointing at another record.
    Reference,
    /// An ordered list of addresses pointing at other records.
    ReferenceList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Whether `null` (or absence) is accepted.
    pub nullable: bool,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        nullable: false,
    }
}

const fn nullable(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        nullable: true,
    }
}

/// The declared shape of one resource type.
#[derive(Debug)]
pub struct ResourceSchema {
    pub resource_type: ResourceType,
    pub fields: &'static [FieldSpec],
    /// Scalar text fields folded into the search blob, in blob order.
    pub search_fields: &'static [&'static str],
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

use FieldKind::{Address, Integer, Reference, ReferenceList, Text};

static FILMS: ResourceSchema = ResourceSchema {
    resource_type: ResourceType::Films,
    fields: &[
        field("url", Address),
        field("created", Text),
        field("edited", Text),
        field("title", Text),
        field("episode_id", Integer),
        field("opening_crawl", Text),
        field("director", Text),
        field("producer", Text),
        field("release_date", Text),
        field("characters", ReferenceList),
        field("planets", ReferenceList),
        field("starships", ReferenceList),
        field("vehicles", ReferenceList),
        field("species", ReferenceList),
    ],
    search_fields: &["title", "director", "producer", "opening_crawl"],
};

static PEOPLE: ResourceSchema = ResourceSchema {
    resource_type: ResourceType::People,
    fields: &[
        field("url", Address),
        field("created", Text),
        field("edited", Text),
        field("name", Text),
        field("height", Text),
        field("mass", Text),
        field("hair_color", Text),
        field("skin_color", Text),
        field("eye_color", Text),
        field("birth_year", Text),
        field("gender", Text),
        field("homeworld", Reference),
        field("films", ReferenceList),
        field("species", ReferenceList),
        field("vehicles", ReferenceList),
        field("starships", ReferenceList),
    ],
    search_fields: &["name", "gender", "hair_color", "skin_color"],
};

static PLANETS: ResourceSchema = ResourceSchema {
    resource_type: ResourceType::Planets,
    fields: &[
        field("url", Address),
        field("created", Text),
        field("edited", Text),
        field("name", Text),
        field("rotation_period", Text),
        field("orbital_period", Text),
        field("diameter", Text),
        field("climate", Text),
        field("gravity", Text),
        field("terrain", Text),
        field("surface_water", Text),
        field("population", Text),
        field("residents", ReferenceList),
        field("films", ReferenceList),
    ],
    search_fields: &["name", "climate", "terrain"],
};

static SPECIES: ResourceSchema = ResourceSchema {
    resource_type: ResourceType::Species,
    fields: &[
        field("url", Address),
        field("created", Text),
        field("edited", Text),
        field("name", Text),
        field("classification", Text),
        field("designation", Text),
        field("average_height", Text),
        field("skin_colors", Text),
        field("hair_colors", Text),
        field("eye_colors", Text),
        field("average_lifespan", Text),
        nullable("homeworld", Reference),
        field("language", Text),
        field("people", ReferenceList),
        field("films", ReferenceList),
    ],
    search_fields: &["name", "classification", "designation", "language"],
};

static STARSHIPS: ResourceSchema = ResourceSchema {
    resource_type: ResourceType::Starships,
    fields: &[
        field("url", Address),
        field("created", Text),
        field("edited", Text),
        field("name", Text),
        field("model", Text),
        field("manufacturer", Text),
        field("cost_in_credits", Text),
        field("length", Text),
        field("max_atmosphering_speed", Text),
        field("crew", Text),
        field("passengers", Text),
        field("cargo_capacity", Text),
        field("consumables", Text),
        field("hyperdrive_rating", Text),
        field("MGLT", Text),
        field("starship_class", Text),
        field("pilots", ReferenceList),
        field("films", ReferenceList),
    ],
    search_fields: &["name", "model", "manufacturer", "starship_class"],
};

static VEHICLES: ResourceSchema = ResourceSchema {
    resource_type: ResourceType::Vehicles,
    fields: &[
        field("url", Address),
        field("created", Text),
        field("edited", Text),
        field("name", Text),
        field("model", Text),
        field("manufacturer", Text),
        field("cost_in_credits", Text),
        field("length", Text),
        field("max_atmosphering_speed", Text),
        field("crew", Text),
        field("passengers", Text),
        field("cargo_capacity", Text),
        field("consumables", Text),
        field("vehicle_class", Text),
        field("pilots", ReferenceList),
        field("films", ReferenceList),
    ],
    search_fields: &["name", "model", "manufacturer", "vehicle_class"],
};

/// Look up the schema of a resource type.
pub fn schema_for(resource_type: ResourceType) -> &'static ResourceSchema {
    match resource_type {
        ResourceType::Films => &FILMS,
        ResourceType::People => &PEOPLE,
        ResourceType::Planets => &PLANETS,
        ResourceType::Species => &SPECIES,
        ResourceType::Starships => &STARSHIPS,
        ResourceType::Vehicles => &VEHICLES,
    }
}

static NULL: Value = Value::Null;

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn check_field(spec: &FieldSpec, value: &Value) -> Result<(), SchemaError> {
    let wrong = |expected: &'static str| SchemaError::WrongType {
        field: spec.name,
        expected,
        found: json_kind(value),
    };

    if value.is_null() {
        return if spec.nullable {
            Ok(())
        } else {
            Err(wrong("non-null"))
        };
    }

    match spec.kind {
        Address | Text | Reference => {
            if !value.is_string() {
                return Err(wrong("a string"));
            }
        }
        Integer => {
            if !(value.is_i64() || value.is_u64()) {
                return Err(wrong("an integer"));
            }
        }
        ReferenceList => {
            let items = value.as_array().ok_or_else(|| wrong("an array"))?;
            if let Some((index, item)) = items.iter().enumerate().find(|(_, v)| !v.is_string()) {
                return Err(SchemaError::WrongElementType {
                    field: spec.name,
                    index,
                    found: json_kind(item),
                });
            }
        }
    }
    Ok(())
}

/// Validate a detail body against the schema of `resource_type`.
pub fn validate(resource_type: ResourceType, body: &Value) -> Result<RawRecord, SchemaError> {
    let object = body
        .as_object()
        .ok_or_else(|| SchemaError::NotAnObject(json_kind(body)))?;
    let schema = schema_for(resource_type);

    let mut fields = Map::new();
    for spec in schema.fields {
        let value = match object.get(spec.name) {
            Some(v) => v,
            None if spec.nullable => &NULL,
            None => return Err(SchemaError::MissingField(spec.name)),
        };
        check_field(spec, value)?;
        fields.insert(spec.name.to_string(), value.clone());
    }

    let address = fields
        .get(ADDRESS_FIELD)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let display_name = fields
        .get("name")
        .or_else(|| fields.get("title"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(RawRecord {
        resource_type,
        canonical_id: canonical_id(&address),
        address,
        display_name,
        fields,
    })
}
