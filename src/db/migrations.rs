use rusqlite::Connection;
use tracing::info;

use crate::error::AppResult;

const USER_VERSION: i32 = 2;

pub fn run(conn: &Connection) -> AppResult<()> {
    // Ensure migration history table exists
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS migration_history (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL,
            rollback_sql TEXT
        );
        "#,
    )?;

    let mut current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version < 1 {
        info!(target: "app::db", version = current_version, "running migration v1");
        migrate_to_v1(conn)?;
        current_version = 1;
        conn.execute(&format!("PRAGMA user_version = {}", current_version), [])?;
        record_migration(
            conn,
            1,
            "Add AI response cache",
            Some("DROP TABLE IF EXISTS ai_cache;"),
        )?;
    }

    if current_version < 2 {
        info!(target: "app::db", version = current_version, "running migration v2");
        migrate_to_v2(conn)?;
        current_version = 2;
        conn.execute(&format!("PRAGMA user_version = {}", current_version), [])?;
        record_migration(conn, 2, "Add note moods and workout status column", None)?;
    }

    debug_assert_eq!(current_version, USER_VERSION);

    Ok(())
}

fn record_migration(
    conn: &Connection,
    version: i32,
    description: &str,
    rollback_sql: Option<&str>,
) -> AppResult<()> {
    conn.execute(
        r#"
        INSERT OR IGNORE INTO migration_history (version, description, applied_at, rollback_sql)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        (
            version,
            description,
            chrono::Utc::now().to_rfc3339(),
            rollback_sql,
        ),
    )?;
    Ok(())
}

fn migrate_to_v1(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
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
        "#,
    )?;
    Ok(())
}

fn migrate_to_v2(conn: &Connection) -> AppResult<()> {
    // Fresh databases already get these columns from schema.sql; only older
    // databases created before the heatmap feature need the ALTERs.
    if !column_exists(conn, "daily_notes", "mood")? {
        conn.execute_batch(
            "ALTER TABLE daily_notes ADD COLUMN mood TEXT CHECK(mood IN ('great','good','okay','tired','sore'));",
        )?;
    }

    if !column_exists(conn, "workout_log", "status")? {
        conn.execute_batch(
            "ALTER TABLE workout_log ADD COLUMN status TEXT CHECK(status IN ('done','rest','missed'));",
        )?;
    }

    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> AppResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;

    while let Some(row) = rows.next()? {
        let name: String = row.get("name")?;
        if name == column {
            return Ok(true);
        }
    }

    Ok(false)
}
