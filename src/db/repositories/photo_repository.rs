use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::tracker::ProgressPhotoRecord;

#[derive(Debug, Clone)]
pub struct ProgressPhotoRow {
    pub id: String,
    pub entry_date: String,
    pub data_url: String,
    pub note: Option<String>,
    pub created_at: String,
}

impl ProgressPhotoRow {
    pub fn into_record(self) -> ProgressPhotoRecord {
        ProgressPhotoRecord {
            id: self.id,
            entry_date: self.entry_date,
            data_url: self.data_url,
            note: self.note,
            created_at: self.created_at,
        }
    }
}

impl TryFrom<&Row<'_>> for ProgressPhotoRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            entry_date: row.get("entry_date")?,
            data_url: row.get("data_url")?,
            note: row.get("note")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct PhotoRepository;

impl PhotoRepository {
    pub fn insert(conn: &Connection, record: &ProgressPhotoRecord) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO progress_photos (id, entry_date, data_url, note, created_at)
                VALUES (:id, :entry_date, :data_url, :note, :created_at)
            "#,
            named_params! {
                ":id": &record.id,
                ":entry_date": &record.entry_date,
                ":data_url": &record.data_url,
                ":note": &record.note,
                ":created_at": &record.created_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<ProgressPhotoRecord> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, entry_date, data_url, note, created_at
                FROM progress_photos
                WHERE id = :id
            "#,
        )?;

        let row = stmt
            .query_row(named_params! {":id": id}, |row| {
                ProgressPhotoRow::try_from(row)
            })
            .optional()?;

        match row {
            Some(row) => Ok(row.into_record()),
            None => Err(AppError::not_found()),
        }
    }

    /// Newest first, matching the gallery ordering.
    pub fn list_all(conn: &Connection) -> AppResult<Vec<ProgressPhotoRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, entry_date, data_url, note, created_at
                FROM progress_photos
                ORDER BY created_at DESC
            "#,
        )?;

        let records = stmt
            .query_map([], |row| ProgressPhotoRow::try_from(row))?
            .map(|row| row.map_err(AppError::from).map(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute("DELETE FROM progress_photos WHERE id = ?1", [id])?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }
}
