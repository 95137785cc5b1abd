use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::tracker::{
    DailyNoteRecord, DailyNoteUpsert, ProgressPhotoInsert, ProgressPhotoRecord, WeightEntryRecord,
    WeightEntryUpsert, WorkoutLogRecord, WorkoutStatus,
};
use crate::services::schedule_service::parse_date;
use crate::services::tracker_service::WeeklySummary;

use super::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
pub struct AnchorQuery {
    #[serde(default)]
    anchor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    /// `null` clears both the status and the completion flag.
    #[serde(default)]
    status: Option<WorkoutStatus>,
}

// -- weight -----------------------------------------------------------------

pub async fn weights_list(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<Vec<WeightEntryRecord>>> {
    let app_state = state.clone();
    run_blocking(move || app_state.tracker().list_weights(&range.from, &range.to))
        .await
        .map(Json)
}

pub async fn weight_get(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<Option<WeightEntryRecord>>> {
    let app_state = state.clone();
    run_blocking(move || app_state.tracker().get_weight(&date))
        .await
        .map(Json)
}

pub async fn weight_put(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(input): Json<WeightEntryUpsert>,
) -> ApiResult<Json<WeightEntryRecord>> {
    let app_state = state.clone();
    run_blocking(move || app_state.tracker().set_weight(&date, input))
        .await
        .map(Json)
}

pub async fn weight_delete(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.tracker().delete_weight(&date)?;
        Ok(serde_json::json!({ "deleted": true }))
    })
    .await
    .map(Json)
}

// -- notes ------------------------------------------------------------------

pub async fn notes_list(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<Vec<DailyNoteRecord>>> {
    let app_state = state.clone();
    run_blocking(move || app_state.tracker().list_notes(&range.from, &range.to))
        .await
        .map(Json)
}

pub async fn note_get(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<Option<DailyNoteRecord>>> {
    let app_state = state.clone();
    run_blocking(move || app_state.tracker().get_note(&date))
        .await
        .map(Json)
}

pub async fn note_put(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(input): Json<DailyNoteUpsert>,
) -> ApiResult<Json<DailyNoteRecord>> {
    let app_state = state.clone();
    run_blocking(move || app_state.tracker().set_note(&date, input))
        .await
        .map(Json)
}

pub async fn note_delete(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.tracker().delete_note(&date)?;
        Ok(serde_json::json!({ "deleted": true }))
    })
    .await
    .map(Json)
}

// -- photos -----------------------------------------------------------------

pub async fn photos_list(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ProgressPhotoRecord>>> {
    let app_state = state.clone();
    run_blocking(move || app_state.tracker().list_photos())
        .await
        .map(Json)
}

pub async fn photo_add(
    State(state): State<AppState>,
    Json(input): Json<ProgressPhotoInsert>,
) -> ApiResult<Json<ProgressPhotoRecord>> {
    let app_state = state.clone();
    run_blocking(move || app_state.tracker().add_photo(input))
        .await
        .map(Json)
}

pub async fn photo_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state.tracker().delete_photo(&id)?;
        Ok(serde_json::json!({ "deleted": true }))
    })
    .await
    .map(Json)
}

// -- workout log ------------------------------------------------------------

pub async fn log_range(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<Vec<WorkoutLogRecord>>> {
    let app_state = state.clone();
    run_blocking(move || app_state.tracker().list_log_range(&range.from, &range.to))
        .await
        .map(Json)
}

pub async fn log_get(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<Option<WorkoutLogRecord>>> {
    let app_state = state.clone();
    run_blocking(move || app_state.tracker().get_log(&date))
        .await
        .map(Json)
}

pub async fn log_toggle(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<WorkoutLogRecord>> {
    let app_state = state.clone();
    run_blocking(move || app_state.tracker().toggle_completion(&date))
        .await
        .map(Json)
}

pub async fn log_status(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(payload): Json<StatusPayload>,
) -> ApiResult<Json<WorkoutLogRecord>> {
    let app_state = state.clone();
    run_blocking(move || app_state.tracker().set_status(&date, payload.status))
        .await
        .map(Json)
}

// -- summary & export -------------------------------------------------------

pub async fn weekly_summary(
    State(state): State<AppState>,
    Query(query): Query<AnchorQuery>,
) -> ApiResult<Json<WeeklySummary>> {
    let app_state = state.clone();
    run_blocking(move || {
        let anchor = match query.anchor.as_deref() {
            Some(value) => Some(parse_date(value)?),
            None => None,
        };
        let today = app_state.schedule().resolve_today(anchor)?;
        app_state.tracker().weekly_summary(today)
    })
    .await
    .map(Json)
}

pub async fn export(State(state): State<AppState>) -> ApiResult<Response> {
    let app_state = state.clone();
    let bundle = run_blocking(move || app_state.export().build_bundle()).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/gzip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", bundle.filename),
            ),
        ],
        bundle.bytes,
    )
        .into_response())
}

async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> ApiResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::internal(format!("进度记录任务执行失败: {err}")))?
        .map_err(ApiError::from)
}
