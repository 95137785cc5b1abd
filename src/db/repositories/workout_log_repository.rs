use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::tracker::{WorkoutLogRecord, WorkoutStatus};

#[derive(Debug, Clone)]
pub struct WorkoutLogRow {
    pub entry_date: String,
    pub status: Option<String>,
    pub completed: bool,
    pub updated_at: String,
}

impl WorkoutLogRow {
    pub fn into_record(self) -> AppResult<WorkoutLogRecord> {
        let status = match self.status {
            Some(value) => {
                Some(WorkoutStatus::try_from(value.as_str()).map_err(AppError::validation)?)
            }
            None => None,
        };

        Ok(WorkoutLogRecord {
            entry_date: self.entry_date,
            status,
            completed: self.completed,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for WorkoutLogRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            entry_date: row.get("entry_date")?,
            status: row.get("status")?,
            completed: row.get::<_, i64>("completed")? != 0,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct WorkoutLogRepository;

impl WorkoutLogRepository {
    pub fn upsert(
        conn: &Connection,
        entry_date: &str,
        status: Option<WorkoutStatus>,
        completed: bool,
        updated_at: &str,
    ) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO workout_log (entry_date, status, completed, updated_at)
                VALUES (:entry_date, :status, :completed, :updated_at)
                ON CONFLICT(entry_date) DO UPDATE SET
                    status = excluded.status,
                    completed = excluded.completed,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":entry_date": entry_date,
                ":status": status.map(|value| value.as_str()),
                ":completed": completed as i64,
                ":updated_at": updated_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_date(conn: &Connection, entry_date: &str) -> AppResult<Option<WorkoutLogRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT entry_date, status, completed, updated_at
                FROM workout_log
                WHERE entry_date = :entry_date
            "#,
        )?;

        let row = stmt
            .query_row(named_params! {":entry_date": entry_date}, |row| {
                WorkoutLogRow::try_from(row)
            })
            .optional()?;

        match row {
            Some(row) => Ok(Some(row.into_record()?)),
            None => Ok(None),
        }
    }

    pub fn list_range(conn: &Connection, from: &str, to: &str) -> AppResult<Vec<WorkoutLogRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT entry_date, status, completed, updated_at
                FROM workout_log
                WHERE entry_date >= :from AND entry_date <= :to
                ORDER BY entry_date ASC
            "#,
        )?;

        let records = stmt
            .query_map(named_params! {":from": from, ":to": to}, |row| {
                WorkoutLogRow::try_from(row)
            })?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<WorkoutLogRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT entry_date, status, completed, updated_at
                FROM workout_log
                ORDER BY entry_date ASC
            "#,
        )?;

        let records = stmt
            .query_map([], |row| WorkoutLogRow::try_from(row))?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn delete(conn: &Connection, entry_date: &str) -> AppResult<()> {
        conn.execute("DELETE FROM workout_log WHERE entry_date = ?1", [entry_date])?;
        Ok(())
    }
}
