use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;

/// Encrypted key-value rows. Values are vault ciphertext, never plaintext.
#[derive(Debug, Clone)]
pub struct SecretSettingRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

impl TryFrom<&Row<'_>> for SecretSettingRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            key: row.get("key")?,
            value: row.get("value")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct SecretRepository;

impl SecretRepository {
    pub fn get(conn: &Connection, key: &str) -> AppResult<Option<SecretSettingRow>> {
        let mut stmt =
            conn.prepare("SELECT key, value, updated_at FROM secret_settings WHERE key = ?1")?;

        let row = stmt
            .query_row([key], |row| SecretSettingRow::try_from(row))
            .optional()?;

        Ok(row)
    }

    pub fn upsert(conn: &Connection, key: &str, ciphertext: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO secret_settings (key, value)
                VALUES (:key, :value)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = CURRENT_TIMESTAMP
            "#,
            named_params! {":key": key, ":value": ciphertext},
        )?;

        Ok(())
    }

    pub fn delete(conn: &Connection, key: &str) -> AppResult<()> {
        conn.execute("DELETE FROM secret_settings WHERE key = ?1", [key])?;
        Ok(())
    }
}
