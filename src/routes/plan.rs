use axum::extract::State;
use axum::Json;

use crate::models::plan::{PlanRequest, PlanResponse};

use super::{ApiResult, AppState};

pub async fn generate_plan(
    State(state): State<AppState>,
    Json(request): Json<PlanRequest>,
) -> ApiResult<Json<PlanResponse>> {
    let response = state.ai().generate_plan(request).await?;
    Ok(Json(response))
}
