use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::exercise::{BodyPartExercise, ExerciseListResponse, StretchListResponse};
use crate::models::schedule::{MuscleTarget, MUSCLE_GROUPS};

use super::{ApiResult, AppState};

/// Selectable muscle groups for the workout browser.
pub async fn muscle_groups() -> Json<&'static [MuscleTarget]> {
    Json(MUSCLE_GROUPS)
}

pub async fn musclewiki_exercises(
    State(state): State<AppState>,
    Path(muscle_id): Path<u32>,
) -> ApiResult<Json<ExerciseListResponse>> {
    let response = state.library().exercises_by_muscle(muscle_id).await?;
    Ok(Json(response))
}

pub async fn stretches(
    State(state): State<AppState>,
    Path(muscle_id): Path<u32>,
) -> ApiResult<Json<StretchListResponse>> {
    let response = state.library().stretches_by_muscle(muscle_id).await?;
    Ok(Json(response))
}

pub async fn exercises_by_body_part(
    State(state): State<AppState>,
    Path(body_part): Path<String>,
) -> ApiResult<Json<Vec<BodyPartExercise>>> {
    let response = state.library().exercises_by_body_part(&body_part).await?;
    Ok(Json(response))
}

/// Stream the animation bytes through so the client never sees the RapidAPI
/// credentials; long-lived cache headers match the upstream asset lifetime.
pub async fn exercise_gif(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let (bytes, content_type) = state.library().exercise_gif(&id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                "public, max-age=86400, immutable".to_string(),
            ),
        ],
        bytes,
    )
        .into_response())
}
