use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::models::food::{AnalyzeRequest, AnalyzeResponse};
use crate::services::ai_service::AiStatus;

use super::{ApiError, ApiResult, AppState};

pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let response = state.ai().analyze_meal(request).await?;
    Ok(Json(response))
}

pub async fn ai_status(State(state): State<AppState>) -> ApiResult<Json<AiStatus>> {
    let app_state = state.clone();
    run_blocking(move || app_state.ai().status()).await.map(Json)
}

async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> ApiResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::internal(format!("分析任务执行失败: {err}")))?
        .map_err(ApiError::from)
}
