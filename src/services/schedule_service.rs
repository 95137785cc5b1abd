use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde_json::json;
use tracing::debug;

use crate::db::repositories::workout_log_repository::WorkoutLogRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::schedule::{
    GridDay, MonthGrid, ScheduledDay, WorkoutTemplate, MONTH_NAMES, TEMPLATE_COUNT, WEEKDAY_NAMES,
    WEEKDAY_NAMES_SHORT, WORKOUT_TEMPLATES,
};
use crate::models::tracker::WorkoutLogRecord;
use crate::services::settings_service::SettingsService;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
const GRID_CELLS: usize = 42;

pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "无效的日期格式，应为 YYYY-MM-DD",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Calendar-day difference between two dates: positive when `target` is in
/// the future relative to `today`.
pub fn days_between(today: NaiveDate, target: NaiveDate) -> i64 {
    target.signed_duration_since(today).num_days()
}

/// Rotation slot for a date. `offset` is the template index assigned to
/// `today`; other dates shift by whole calendar days, wrapping mod 7 in both
/// directions.
pub fn template_index_for_date(target: NaiveDate, today: NaiveDate, offset: u8) -> usize {
    let len = TEMPLATE_COUNT as i64;
    let diff = days_between(today, target);
    let index = ((offset as i64 + diff) % len + len) % len;
    index as usize
}

pub fn template_for_date(target: NaiveDate, today: NaiveDate, offset: u8) -> WorkoutTemplate {
    WORKOUT_TEMPLATES[template_index_for_date(target, today, offset)]
}

fn weekday_name(date: NaiveDate) -> &'static str {
    WEEKDAY_NAMES[date.weekday().num_days_from_sunday() as usize]
}

pub struct ScheduleService {
    db: DbPool,
    settings: Arc<SettingsService>,
}

impl ScheduleService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    /// Today in the user's configured timezone unless the client pinned its
    /// own local date with an explicit anchor.
    pub fn resolve_today(&self, anchor: Option<NaiveDate>) -> AppResult<NaiveDate> {
        if let Some(date) = anchor {
            return Ok(date);
        }

        let settings = self.settings.get()?;
        let tz: chrono_tz::Tz = settings
            .timezone
            .parse()
            .map_err(|_| AppError::validation(format!("无效的时区名称: {}", settings.timezone)))?;

        Ok(Utc::now().with_timezone(&tz).date_naive())
    }

    pub fn templates(&self) -> &'static [WorkoutTemplate] {
        &WORKOUT_TEMPLATES
    }

    pub fn day(&self, date: NaiveDate, anchor: Option<NaiveDate>) -> AppResult<ScheduledDay> {
        let today = self.resolve_today(anchor)?;
        let offset = self.settings.get()?.rotation_offset;
        let index = template_index_for_date(date, today, offset);

        let date_key = format_date(date);
        let log = self
            .db
            .with_connection(|conn| WorkoutLogRepository::find_by_date(conn, &date_key))?;

        Ok(ScheduledDay {
            date: date_key,
            weekday: weekday_name(date),
            template_index: index,
            template: WORKOUT_TEMPLATES[index],
            completed: log.as_ref().map(|record| record.completed).unwrap_or(false),
            status: log.and_then(|record| record.status),
        })
    }

    pub fn today(&self, anchor: Option<NaiveDate>) -> AppResult<ScheduledDay> {
        let today = self.resolve_today(anchor)?;
        self.day(today, Some(today))
    }

    /// 6x7 grid for the month view, padded with the surrounding months so the
    /// calendar always renders complete weeks.
    pub fn month_grid(
        &self,
        year: i32,
        month: u32,
        anchor: Option<NaiveDate>,
    ) -> AppResult<MonthGrid> {
        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            AppError::validation_with_details(
                "无效的年月",
                json!({"year": year, "month": month}),
            )
        })?;

        let today = self.resolve_today(anchor)?;
        let offset = self.settings.get()?.rotation_offset;

        let start_padding = first_day.weekday().num_days_from_sunday() as i64;
        let grid_start = first_day - Duration::days(start_padding);
        let grid_end = grid_start + Duration::days(GRID_CELLS as i64 - 1);

        let logs = self.db.with_connection(|conn| {
            WorkoutLogRepository::list_range(
                conn,
                &format_date(grid_start),
                &format_date(grid_end),
            )
        })?;
        let logs_by_date: HashMap<String, WorkoutLogRecord> = logs
            .into_iter()
            .map(|record| (record.entry_date.clone(), record))
            .collect();

        let mut days = Vec::with_capacity(GRID_CELLS);
        for cell in 0..GRID_CELLS {
            let date = grid_start + Duration::days(cell as i64);
            let date_key = format_date(date);
            let index = template_index_for_date(date, today, offset);
            let log = logs_by_date.get(&date_key);

            days.push(GridDay {
                date: date_key,
                day_of_month: date.day(),
                in_month: date.month() == month && date.year() == year,
                is_today: date == today,
                template_index: index,
                template: WORKOUT_TEMPLATES[index],
                completed: log.map(|record| record.completed).unwrap_or(false),
                status: log.and_then(|record| record.status),
            });
        }

        debug!(
            target: "app::schedule",
            year,
            month,
            anchor = %format_date(today),
            "month grid resolved"
        );

        Ok(MonthGrid {
            year,
            month,
            month_name: MONTH_NAMES[(month - 1) as usize],
            weekdays: WEEKDAY_NAMES_SHORT,
            days,
        })
    }
}
