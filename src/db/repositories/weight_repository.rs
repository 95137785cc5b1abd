use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::tracker::{WeightEntryRecord, WeightUnit};

#[derive(Debug, Clone)]
pub struct WeightEntryRow {
    pub entry_date: String,
    pub weight: f64,
    pub unit: String,
    pub updated_at: String,
}

impl WeightEntryRow {
    pub fn into_record(self) -> AppResult<WeightEntryRecord> {
        let unit = WeightUnit::try_from(self.unit.as_str()).map_err(AppError::validation)?;
        Ok(WeightEntryRecord {
            entry_date: self.entry_date,
            weight: self.weight,
            unit,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for WeightEntryRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            entry_date: row.get("entry_date")?,
            weight: row.get("weight")?,
            unit: row.get("unit")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct WeightRepository;

impl WeightRepository {
    pub fn upsert(
        conn: &Connection,
        entry_date: &str,
        weight: f64,
        unit: WeightUnit,
        updated_at: &str,
    ) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO weight_entries (entry_date, weight, unit, updated_at)
                VALUES (:entry_date, :weight, :unit, :updated_at)
                ON CONFLICT(entry_date) DO UPDATE SET
                    weight = excluded.weight,
                    unit = excluded.unit,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":entry_date": entry_date,
                ":weight": weight,
                ":unit": unit.as_str(),
                ":updated_at": updated_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_date(conn: &Connection, entry_date: &str) -> AppResult<Option<WeightEntryRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT entry_date, weight, unit, updated_at
                FROM weight_entries
                WHERE entry_date = :entry_date
            "#,
        )?;

        let row = stmt
            .query_row(named_params! {":entry_date": entry_date}, |row| {
                WeightEntryRow::try_from(row)
            })
            .optional()?;

        match row {
            Some(row) => Ok(Some(row.into_record()?)),
            None => Ok(None),
        }
    }

    pub fn list_range(
        conn: &Connection,
        from: &str,
        to: &str,
    ) -> AppResult<Vec<WeightEntryRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT entry_date, weight, unit, updated_at
                FROM weight_entries
                WHERE entry_date >= :from AND entry_date <= :to
                ORDER BY entry_date ASC
            "#,
        )?;

        let records = stmt
            .query_map(named_params! {":from": from, ":to": to}, |row| {
                WeightEntryRow::try_from(row)
            })?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<WeightEntryRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT entry_date, weight, unit, updated_at
                FROM weight_entries
                ORDER BY entry_date ASC
            "#,
        )?;

        let records = stmt
            .query_map([], |row| WeightEntryRow::try_from(row))?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn list_recent(conn: &Connection, limit: usize) -> AppResult<Vec<WeightEntryRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT entry_date, weight, unit, updated_at
                FROM weight_entries
                ORDER BY entry_date DESC
                LIMIT :limit
            "#,
        )?;

        let records = stmt
            .query_map(named_params! {":limit": limit as i64}, |row| {
                WeightEntryRow::try_from(row)
            })?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn delete(conn: &Connection, entry_date: &str) -> AppResult<()> {
        let affected = conn.execute(
            "DELETE FROM weight_entries WHERE entry_date = ?1",
            [entry_date],
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }
}
