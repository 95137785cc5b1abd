use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::tracker::{DailyNoteRecord, Mood};

#[derive(Debug, Clone)]
pub struct DailyNoteRow {
    pub entry_date: String,
    pub note: String,
    pub mood: Option<String>,
    pub updated_at: String,
}

impl DailyNoteRow {
    pub fn into_record(self) -> AppResult<DailyNoteRecord> {
        let mood = match self.mood {
            Some(value) => Some(Mood::try_from(value.as_str()).map_err(AppError::validation)?),
            None => None,
        };

        Ok(DailyNoteRecord {
            entry_date: self.entry_date,
            note: self.note,
            mood,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for DailyNoteRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            entry_date: row.get("entry_date")?,
            note: row.get("note")?,
            mood: row.get("mood")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct NoteRepository;

impl NoteRepository {
    pub fn upsert(
        conn: &Connection,
        entry_date: &str,
        note: &str,
        mood: Option<Mood>,
        updated_at: &str,
    ) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO daily_notes (entry_date, note, mood, updated_at)
                VALUES (:entry_date, :note, :mood, :updated_at)
                ON CONFLICT(entry_date) DO UPDATE SET
                    note = excluded.note,
                    mood = excluded.mood,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":entry_date": entry_date,
                ":note": note,
                ":mood": mood.map(|value| value.as_str()),
                ":updated_at": updated_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_date(conn: &Connection, entry_date: &str) -> AppResult<Option<DailyNoteRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT entry_date, note, mood, updated_at
                FROM daily_notes
                WHERE entry_date = :entry_date
            "#,
        )?;

        let row = stmt
            .query_row(named_params! {":entry_date": entry_date}, |row| {
                DailyNoteRow::try_from(row)
            })
            .optional()?;

        match row {
            Some(row) => Ok(Some(row.into_record()?)),
            None => Ok(None),
        }
    }

    pub fn list_range(conn: &Connection, from: &str, to: &str) -> AppResult<Vec<DailyNoteRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT entry_date, note, mood, updated_at
                FROM daily_notes
                WHERE entry_date >= :from AND entry_date <= :to
                ORDER BY entry_date ASC
            "#,
        )?;

        let records = stmt
            .query_map(named_params! {":from": from, ":to": to}, |row| {
                DailyNoteRow::try_from(row)
            })?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<DailyNoteRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT entry_date, note, mood, updated_at
                FROM daily_notes
                ORDER BY entry_date ASC
            "#,
        )?;

        let records = stmt
            .query_map([], |row| DailyNoteRow::try_from(row))?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn delete(conn: &Connection, entry_date: &str) -> AppResult<()> {
        let affected = conn.execute("DELETE FROM daily_notes WHERE entry_date = ?1", [entry_date])?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }
}
