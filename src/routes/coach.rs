use axum::extract::State;
use axum::Json;

use crate::models::exercise::{CoachFilters, CoachSearchResponse};

use super::{ApiResult, AppState};

pub async fn search(
    State(state): State<AppState>,
    Json(filters): Json<CoachFilters>,
) -> ApiResult<Json<CoachSearchResponse>> {
    let response = state.coach().search(filters).await?;
    Ok(Json(response))
}
