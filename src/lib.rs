//! # SWAPI Search
//!
//! An ETL pipeline over the Star Wars API catalog. It fetches every film,
//! person, planet, species, starship, and vehicle from the upstream source,
//! rewrites the URL cross-references between them into named relations,
//! and loads the result into SQLite with a substring search index.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌────────────┐
//! │   Fetcher   │──▶│ Resolve+Normalize │──▶│   Loader   │
//! │ listing+GET │   │  ReferenceIndex   │   │  (SQLite)  │
//! └─────────────┘   └──────────────────┘   └─────┬──────┘
//!                                                │
//!                                                ▼
//!                                  ┌──────────────────────────┐
//!                                  │ CLI: search / list / get │
//!                                  └──────────────────────────┘
//! ```
//!
//! Pure transformation logic (schemas, resolution, normalization, the
//! `Store` trait) lives in `swapi-search-core`; this crate adds the HTTP
//! fetcher, the SQLite store, orchestration, and the CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overlay |
//! | [`logging`] | Tracing subscriber setup |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema setup |
//! | [`fetch`] | Upstream HTTP fetcher |
//! | [`load`] | Atomic bulk loader |
//! | [`sqlite_store`] | SQLite `Store` implementation |
//! | [`ingest`] | Pipeline orchestration |
//! | [`search`] | Keyword search |
//! | [`browse`] | List and get |
//! | [`stats`] | Database statistics |

pub mod browse;
pub mod config;
pub mod db;
pub mod fetch;
pub mod ingest;
pub mod load;
pub mod logging;
pub mod migrate;
pub mod search;
pub mod sqlite_store;
pub mod stats;
