use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value as JsonValue;
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};

const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ai_cache (
    cache_key TEXT PRIMARY KEY,
    operation TEXT NOT NULL CHECK(operation IN ('analyze','plan','coach')),
    fingerprint TEXT NOT NULL,
    response_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    hit_count INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_ai_cache_operation
    ON ai_cache(operation);
CREATE INDEX IF NOT EXISTS idx_ai_cache_expires_at
    ON ai_cache(expires_at);
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOperation {
    Analyze,
    Plan,
    Coach,
}

impl CacheOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheOperation::Analyze => "analyze",
            CacheOperation::Plan => "plan",
            CacheOperation::Coach => "coach",
        }
    }
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn cache_key(operation: CacheOperation, fingerprint: &str) -> String {
    format!("{}:{}", operation.as_str(), fingerprint)
}

/// SQLite-backed response cache for AI calls. Entries expire by TTL and are
/// purged lazily; hits bump a counter for inspection.
#[derive(Debug, Clone)]
pub struct CacheService {
    db: Arc<DbPool>,
    ttl: Duration,
}

impl CacheService {
    pub fn new(db: DbPool, ttl: Duration) -> AppResult<Self> {
        let service = Self {
            db: Arc::new(db),
            ttl,
        };
        service.bootstrap()?;
        Ok(service)
    }

    pub async fn get(
        &self,
        operation: CacheOperation,
        fingerprint: &str,
    ) -> AppResult<Option<JsonValue>> {
        let key = cache_key(operation, fingerprint);
        let db = Arc::clone(&self.db);

        spawn_blocking(move || {
            let conn = db.get_connection()?;
            ensure_schema(&conn)?;

            let now = Utc::now().to_rfc3339();
            let mut stmt = conn.prepare(
                "SELECT response_json FROM ai_cache WHERE cache_key = ?1 AND expires_at > ?2",
            )?;

            let result = stmt
                .query_row([&key, &now], |row| row.get::<_, String>(0))
                .optional()?;

            if let Some(payload) = result {
                let response: JsonValue = serde_json::from_str(&payload)?;

                conn.execute(
                    "UPDATE ai_cache SET hit_count = hit_count + 1 WHERE cache_key = ?1",
                    [&key],
                )?;

                debug!(
                    target: "app::ai::cache",
                    cache_key = %key,
                    operation = operation.as_str(),
                    "cache hit"
                );

                Ok(Some(response))
            } else {
                Ok(None)
            }
        })
        .await
        .map_err(|err| AppError::other(format!("缓存查询失败: {err}")))?
    }

    pub async fn put(
        &self,
        operation: CacheOperation,
        fingerprint: &str,
        response: &JsonValue,
    ) -> AppResult<()> {
        let key = cache_key(operation, fingerprint);
        let fingerprint = fingerprint.to_string();
        let response_json = serde_json::to_string(response)?;
        let db = Arc::clone(&self.db);
        let ttl = self.ttl;

        spawn_blocking(move || {
            let conn = db.get_connection()?;
            ensure_schema(&conn)?;

            let now = Utc::now();
            let expires_at = now + ttl;

            conn.execute(
                r#"
                INSERT INTO ai_cache (
                    cache_key,
                    operation,
                    fingerprint,
                    response_json,
                    created_at,
                    expires_at,
                    hit_count
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)
                ON CONFLICT(cache_key) DO UPDATE SET
                    operation = excluded.operation,
                    fingerprint = excluded.fingerprint,
                    response_json = excluded.response_json,
                    created_at = excluded.created_at,
                    expires_at = excluded.expires_at
                "#,
                (
                    &key,
                    operation.as_str(),
                    &fingerprint,
                    &response_json,
                    now.to_rfc3339(),
                    expires_at.to_rfc3339(),
                ),
            )?;

            debug!(
                target: "app::ai::cache",
                cache_key = %key,
                operation = operation.as_str(),
                "cached ai response"
            );

            Ok(())
        })
        .await
        .map_err(|err| AppError::other(format!("缓存写入失败: {err}")))?
    }

    pub async fn purge_expired(&self) -> AppResult<()> {
        let db = Arc::clone(&self.db);
        spawn_blocking(move || {
            let conn = db.get_connection()?;
            ensure_schema(&conn)?;
            let now = Utc::now().to_rfc3339();
            let deleted = conn.execute("DELETE FROM ai_cache WHERE expires_at <= ?1", [&now])?;
            if deleted > 0 {
                debug!(target: "app::ai::cache", deleted, "purged expired cache entries");
            }
            Ok(())
        })
        .await
        .map_err(|err| AppError::other(format!("缓存清理失败: {err}")))?
    }

    fn bootstrap(&self) -> AppResult<()> {
        self.db.with_connection(|conn| {
            ensure_schema(conn)?;
            Ok(())
        })
    }
}

fn ensure_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(CACHE_SCHEMA)?;
    Ok(())
}
