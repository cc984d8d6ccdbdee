//! SQLite-backed [`Store`] implementation.
//!
//! Records live in `resources`; their search blobs are mirrored into the
//! `resources_fts` FTS5 table (trigram tokenizer), which gives
//! case-insensitive substring matching for queries of three or more
//! characters. Shorter queries fall back to `LIKE` on `resources.search_blob`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use swapi_search_core::models::{NormalizedRecord, Page, ResourceType, StoredResource};
use swapi_search_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::migrate;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

/// One successful pipeline run, as recorded in `sync_runs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncRun {
    pub finished_at: i64,
    pub fetched: i64,
    pub skipped: i64,
    pub loaded: i64,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database, creating the schema if needed.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn record_sync_run(&self, fetched: u64, skipped: u64, loaded: u64) -> Result<()> {
        sqlx::query(
            "INSERT INTO sync_runs (finished_at, fetched, skipped, loaded) VALUES (?, ?, ?, ?)",
        )
        .bind(chrono::Utc::now().timestamp())
        .bind(fetched as i64)
        .bind(skipped as i64)
        .bind(loaded as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn last_sync_run(&self) -> Result<Option<SyncRun>> {
        let row = sqlx::query(
            "SELECT finished_at, fetched, skipped, loaded FROM sync_runs ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| SyncRun {
            finished_at: row.get("finished_at"),
            fetched: row.get("fetched"),
            skipped: row.get("skipped"),
            loaded: row.get("loaded"),
        }))
    }
}

fn row_to_resource(row: &SqliteRow) -> Result<StoredResource> {
    let resource_type: String = row.get("resource_type");
    let payload: String = row.get("payload");

    Ok(StoredResource {
        surrogate_key: row.get("surrogate_key"),
        resource_type: resource_type.parse().map_err(|e: String| anyhow!(e))?,
        display_name: row.get("display_name"),
        payload: serde_json::from_str(&payload)
            .with_context(|| format!("Corrupt payload for {}", resource_type))?,
    })
}

/// FTS5 phrase for a substring query.
fn fts_phrase(needle: &str) -> String {
    format!("\"{}\"", needle.replace('"', "\"\""))
}

/// `LIKE` pattern for a substring query, with wildcards escaped by `\`.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// The match clause and its bound argument for a normalized query.
fn match_clause(needle: &str) -> (&'static str, String) {
    if needle.chars().count() >= 3 {
        (
            "r.id IN (SELECT resource_id FROM resources_fts WHERE resources_fts MATCH ?)",
            fts_phrase(needle),
        )
    } else {
        ("r.search_blob LIKE ? ESCAPE '\\'", like_pattern(needle))
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn replace_all(&self, records: &[NormalizedRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM resources_fts")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM resources")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'resources'")
            .execute(&mut *tx)
            .await?;

        for record in records {
            let payload = serde_json::to_string(&record.payload)?;
            let id = sqlx::query(
                r#"
                INSERT INTO resources (surrogate_key, resource_type, display_name, payload, search_blob)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.surrogate_key)
            .bind(record.resource_type.as_str())
            .bind(&record.display_name)
            .bind(&payload)
            .bind(&record.search_blob)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!(
                    "Failed to insert {}/{}",
                    record.resource_type, record.surrogate_key
                )
            })?
            .last_insert_rowid();

            sqlx::query("INSERT INTO resources_fts (resource_id, search_blob) VALUES (?, ?)")
                .bind(id)
                .bind(&record.search_blob)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(records.len() as u64)
    }

    async fn search(
        &self,
        query: &str,
        resource_type: Option<ResourceType>,
        limit: i64,
        offset: i64,
    ) -> Result<Page<StoredResource>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Page {
                total: 0,
                limit,
                offset,
                results: Vec::new(),
            });
        }

        let (clause, arg) = match_clause(&needle);
        let type_filter = resource_type.map(|rt| rt.as_str());

        let count_sql = format!(
            "SELECT COUNT(*) FROM resources r WHERE {} AND (? IS NULL OR r.resource_type = ?)",
            clause
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&arg)
            .bind(type_filter)
            .bind(type_filter)
            .fetch_one(&self.pool)
            .await?;

        let select_sql = format!(
            r#"
            SELECT r.surrogate_key, r.resource_type, r.display_name, r.payload
            FROM resources r
            WHERE {} AND (? IS NULL OR r.resource_type = ?)
            ORDER BY r.id
            LIMIT ? OFFSET ?
            "#,
            clause
        );
        let rows = sqlx::query(&select_sql)
            .bind(&arg)
            .bind(type_filter)
            .bind(type_filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            total,
            limit,
            offset,
            results: rows.iter().map(row_to_resource).collect::<Result<_>>()?,
        })
    }

    async fn list(
        &self,
        resource_type: ResourceType,
        limit: i64,
        offset: i64,
    ) -> Result<Page<StoredResource>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resources WHERE resource_type = ?")
            .bind(resource_type.as_str())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT surrogate_key, resource_type, display_name, payload
            FROM resources
            WHERE resource_type = ?
            ORDER BY surrogate_key
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(resource_type.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            total,
            limit,
            offset,
            results: rows.iter().map(row_to_resource).collect::<Result<_>>()?,
        })
    }

    async fn get(
        &self,
        resource_type: ResourceType,
        surrogate_key: i64,
    ) -> Result<Option<StoredResource>> {
        let row = sqlx::query(
            r#"
            SELECT surrogate_key, resource_type, display_name, payload
            FROM resources
            WHERE resource_type = ? AND surrogate_key = ?
            "#,
        )
        .bind(resource_type.as_str())
        .bind(surrogate_key)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_resource).transpose()
    }

    async fn counts(&self) -> Result<Vec<(ResourceType, i64)>> {
        let rows = sqlx::query(
            "SELECT resource_type, COUNT(*) AS n FROM resources GROUP BY resource_type",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts: Vec<(ResourceType, i64)> =
            ResourceType::ALL.iter().map(|rt| (*rt, 0)).collect();
        for row in rows {
            let name: String = row.get("resource_type");
            let n: i64 = row.get("n");
            if let Some(entry) = counts.iter_mut().find(|(rt, _)| rt.as_str() == name) {
                entry.1 = n;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fts_phrase_quotes() {
        assert_eq!(fts_phrase("x-wing"), "\"x-wing\"");
        assert_eq!(fts_phrase("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("r2"), "%r2%");
        assert_eq!(like_pattern("5%"), "%5\\%%");
        assert_eq!(like_pattern("a_"), "%a\\_%");
    }

    #[test]
    fn test_short_queries_use_like() {
        assert!(match_clause("r2").0.contains("LIKE"));
        assert!(match_clause("sky").0.contains("MATCH"));
    }
}
