//! # SWAPI Search Core
//!
//! Pure logic for the SWAPI Search ETL: resource schemas, strict record
//! validation, reference resolution, normalization into storage-ready rows,
//! and the store abstraction.
//!
//! This crate contains no tokio, sqlx, reqwest, or filesystem I/O. The
//! application crate supplies the HTTP fetcher and the SQLite store.

pub mod error;
pub mod models;
pub mod normalize;
pub mod resolve;
pub mod schema;
pub mod store;

pub use models::{NormalizedRecord, RawRecord, Relation, ResourceType};
pub use resolve::ReferenceIndex;
