use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::db::repositories::note_repository::NoteRepository;
use crate::db::repositories::photo_repository::PhotoRepository;
use crate::db::repositories::weight_repository::WeightRepository;
use crate::db::repositories::workout_log_repository::WorkoutLogRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::tracker::{
    DailyNoteRecord, DailyNoteUpsert, ProgressPhotoInsert, ProgressPhotoRecord, WeightEntryRecord,
    WeightEntryUpsert, WeightUnit, WorkoutLogRecord, WorkoutStatus,
};
use crate::services::schedule_service::{format_date, parse_date};

const LBS_PER_KG: f64 = 2.204_622_621_8;
const STREAK_LOOKBACK_DAYS: i64 = 365;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub week_start: String,
    pub week_end: String,
    pub workouts_completed: u32,
    pub streak_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_weight: Option<WeightEntryRecord>,
    /// Change against the previous entry, in the latest entry's unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_delta: Option<f64>,
}

pub struct TrackerService {
    db: DbPool,
}

impl TrackerService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    // -- weight ------------------------------------------------------------

    pub fn set_weight(&self, date: &str, input: WeightEntryUpsert) -> AppResult<WeightEntryRecord> {
        let date = parse_date(date)?;
        if !input.weight.is_finite() || input.weight <= 0.0 {
            return Err(AppError::validation_with_details(
                "体重必须为正数",
                json!({"weight": input.weight}),
            ));
        }

        let date_key = format_date(date);
        let now = Utc::now().to_rfc3339();

        self.db.with_connection(|conn| {
            WeightRepository::upsert(conn, &date_key, input.weight, input.unit, &now)
        })?;

        Ok(WeightEntryRecord {
            entry_date: date_key,
            weight: input.weight,
            unit: input.unit,
            updated_at: now,
        })
    }

    pub fn get_weight(&self, date: &str) -> AppResult<Option<WeightEntryRecord>> {
        let date_key = format_date(parse_date(date)?);
        self.db
            .with_connection(|conn| WeightRepository::find_by_date(conn, &date_key))
    }

    pub fn list_weights(&self, from: &str, to: &str) -> AppResult<Vec<WeightEntryRecord>> {
        let (from, to) = validated_range(from, to)?;
        self.db
            .with_connection(|conn| WeightRepository::list_range(conn, &from, &to))
    }

    pub fn delete_weight(&self, date: &str) -> AppResult<()> {
        let date_key = format_date(parse_date(date)?);
        self.db
            .with_connection(|conn| WeightRepository::delete(conn, &date_key))
    }

    // -- notes -------------------------------------------------------------

    pub fn set_note(&self, date: &str, input: DailyNoteUpsert) -> AppResult<DailyNoteRecord> {
        let date_key = format_date(parse_date(date)?);
        let note = input.note.trim();
        if note.is_empty() {
            return Err(AppError::validation("笔记内容不能为空"));
        }

        let now = Utc::now().to_rfc3339();
        self.db
            .with_connection(|conn| NoteRepository::upsert(conn, &date_key, note, input.mood, &now))?;

        Ok(DailyNoteRecord {
            entry_date: date_key,
            note: note.to_string(),
            mood: input.mood,
            updated_at: now,
        })
    }

    pub fn get_note(&self, date: &str) -> AppResult<Option<DailyNoteRecord>> {
        let date_key = format_date(parse_date(date)?);
        self.db
            .with_connection(|conn| NoteRepository::find_by_date(conn, &date_key))
    }

    pub fn list_notes(&self, from: &str, to: &str) -> AppResult<Vec<DailyNoteRecord>> {
        let (from, to) = validated_range(from, to)?;
        self.db
            .with_connection(|conn| NoteRepository::list_range(conn, &from, &to))
    }

    pub fn delete_note(&self, date: &str) -> AppResult<()> {
        let date_key = format_date(parse_date(date)?);
        self.db
            .with_connection(|conn| NoteRepository::delete(conn, &date_key))
    }

    // -- photos ------------------------------------------------------------

    pub fn add_photo(&self, input: ProgressPhotoInsert) -> AppResult<ProgressPhotoRecord> {
        let date_key = format_date(parse_date(&input.entry_date)?);

        if !input.data_url.starts_with("data:image/") {
            return Err(AppError::validation("照片必须为 data:image/ 格式的 Data URL"));
        }

        let note = input
            .note
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let record = ProgressPhotoRecord {
            id: Uuid::new_v4().to_string(),
            entry_date: date_key,
            data_url: input.data_url,
            note,
            created_at: Utc::now().to_rfc3339(),
        };

        self.db
            .with_connection(|conn| PhotoRepository::insert(conn, &record))?;

        debug!(target: "app::tracker", photo_id = %record.id, "progress photo stored");

        Ok(record)
    }

    pub fn list_photos(&self) -> AppResult<Vec<ProgressPhotoRecord>> {
        self.db.with_connection(PhotoRepository::list_all)
    }

    pub fn delete_photo(&self, id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| PhotoRepository::delete(conn, id))
    }

    // -- workout log -------------------------------------------------------

    pub fn get_log(&self, date: &str) -> AppResult<Option<WorkoutLogRecord>> {
        let date_key = format_date(parse_date(date)?);
        self.db
            .with_connection(|conn| WorkoutLogRepository::find_by_date(conn, &date_key))
    }

    pub fn list_log_range(&self, from: &str, to: &str) -> AppResult<Vec<WorkoutLogRecord>> {
        let (from, to) = validated_range(from, to)?;
        self.db
            .with_connection(|conn| WorkoutLogRepository::list_range(conn, &from, &to))
    }

    /// Flip the completion flag for a date. Clearing completion on a row with
    /// no explicit status removes the row entirely.
    pub fn toggle_completion(&self, date: &str) -> AppResult<WorkoutLogRecord> {
        let date_key = format_date(parse_date(date)?);
        let now = Utc::now().to_rfc3339();

        self.db.with_connection(|conn| {
            let existing = WorkoutLogRepository::find_by_date(conn, &date_key)?;
            let (status, completed) = match existing {
                Some(record) => (record.status, !record.completed),
                None => (None, true),
            };

            if !completed && status.is_none() {
                WorkoutLogRepository::delete(conn, &date_key)?;
                return Ok(WorkoutLogRecord {
                    entry_date: date_key.clone(),
                    status: None,
                    completed: false,
                    updated_at: now.clone(),
                });
            }

            WorkoutLogRepository::upsert(conn, &date_key, status, completed, &now)?;
            Ok(WorkoutLogRecord {
                entry_date: date_key.clone(),
                status,
                completed,
                updated_at: now.clone(),
            })
        })
    }

    /// Set or clear the heatmap status. `done` keeps the completion flag in
    /// sync; every other value (including clearing) drops it.
    pub fn set_status(
        &self,
        date: &str,
        status: Option<WorkoutStatus>,
    ) -> AppResult<WorkoutLogRecord> {
        let date_key = format_date(parse_date(date)?);
        let now = Utc::now().to_rfc3339();
        let completed = matches!(status, Some(WorkoutStatus::Done));

        self.db.with_connection(|conn| {
            if status.is_none() {
                WorkoutLogRepository::delete(conn, &date_key)?;
                return Ok(WorkoutLogRecord {
                    entry_date: date_key.clone(),
                    status: None,
                    completed: false,
                    updated_at: now.clone(),
                });
            }

            WorkoutLogRepository::upsert(conn, &date_key, status, completed, &now)?;
            Ok(WorkoutLogRecord {
                entry_date: date_key.clone(),
                status,
                completed,
                updated_at: now.clone(),
            })
        })
    }

    // -- summaries ---------------------------------------------------------

    pub fn weekly_summary(&self, today: NaiveDate) -> AppResult<WeeklySummary> {
        let week_start = today - Duration::days(6);
        let lookback_start = today - Duration::days(STREAK_LOOKBACK_DAYS);

        let logs = self.db.with_connection(|conn| {
            WorkoutLogRepository::list_range(
                conn,
                &format_date(lookback_start),
                &format_date(today),
            )
        })?;

        let workouts_completed = logs
            .iter()
            .filter(|record| record.completed && record.entry_date >= format_date(week_start))
            .count() as u32;

        let completed_dates: std::collections::HashSet<&str> = logs
            .iter()
            .filter(|record| record.completed)
            .map(|record| record.entry_date.as_str())
            .collect();

        let mut streak_days = 0u32;
        let mut cursor = today;
        loop {
            let key = format_date(cursor);
            if !completed_dates.contains(key.as_str()) {
                break;
            }
            streak_days += 1;
            cursor -= Duration::days(1);
            if streak_days as i64 > STREAK_LOOKBACK_DAYS {
                break;
            }
        }

        let recent_weights = self
            .db
            .with_connection(|conn| WeightRepository::list_recent(conn, 2))?;

        let latest_weight = recent_weights.first().cloned();
        let weight_delta = match (recent_weights.first(), recent_weights.get(1)) {
            (Some(latest), Some(previous)) => {
                let previous_in_latest_unit =
                    convert_weight(previous.weight, previous.unit, latest.unit);
                Some(latest.weight - previous_in_latest_unit)
            }
            _ => None,
        };

        Ok(WeeklySummary {
            week_start: format_date(week_start),
            week_end: format_date(today),
            workouts_completed,
            streak_days,
            latest_weight,
            weight_delta,
        })
    }
}

fn convert_weight(value: f64, from: WeightUnit, to: WeightUnit) -> f64 {
    match (from, to) {
        (WeightUnit::Kg, WeightUnit::Lbs) => value * LBS_PER_KG,
        (WeightUnit::Lbs, WeightUnit::Kg) => value / LBS_PER_KG,
        _ => value,
    }
}

fn validated_range(from: &str, to: &str) -> AppResult<(String, String)> {
    let from_date = parse_date(from)?;
    let to_date = parse_date(to)?;
    if to_date < from_date {
        return Err(AppError::validation_with_details(
            "结束日期必须不早于开始日期",
            json!({"from": from, "to": to}),
        ));
    }
    Ok((format_date(from_date), format_date(to_date)))
}
