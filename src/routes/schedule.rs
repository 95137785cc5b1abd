use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::schedule::{MonthGrid, ScheduledDay, WorkoutTemplate};
use crate::services::schedule_service::parse_date;

use super::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct AnchorQuery {
    /// Client-local "today" (YYYY-MM-DD). Defaults to today in the
    /// configured timezone when omitted.
    #[serde(default)]
    anchor: Option<String>,
}

impl AnchorQuery {
    fn anchor_date(&self) -> Result<Option<NaiveDate>, AppError> {
        match self.anchor.as_deref() {
            Some(value) => Ok(Some(parse_date(value)?)),
            None => Ok(None),
        }
    }
}

pub async fn templates(State(state): State<AppState>) -> Json<&'static [WorkoutTemplate]> {
    Json(state.schedule().templates())
}

pub async fn today(
    State(state): State<AppState>,
    Query(query): Query<AnchorQuery>,
) -> ApiResult<Json<ScheduledDay>> {
    let anchor = query.anchor_date()?;
    let app_state = state.clone();

    run_blocking(move || app_state.schedule().today(anchor))
        .await
        .map(Json)
}

pub async fn day(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Query(query): Query<AnchorQuery>,
) -> ApiResult<Json<ScheduledDay>> {
    let anchor = query.anchor_date()?;
    let app_state = state.clone();

    run_blocking(move || {
        let date = parse_date(&date)?;
        app_state.schedule().day(date, anchor)
    })
    .await
    .map(Json)
}

pub async fn month(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
    Query(query): Query<AnchorQuery>,
) -> ApiResult<Json<MonthGrid>> {
    let anchor = query.anchor_date()?;
    let app_state = state.clone();

    run_blocking(move || app_state.schedule().month_grid(year, month, anchor))
        .await
        .map(Json)
}

async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> ApiResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::internal(format!("排程查询执行失败: {err}")))?
        .map_err(ApiError::from)
}
