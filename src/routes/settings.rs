use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::settings::AppSettings;
use crate::models::tracker::WeightUnit;
use crate::services::settings_service::SettingsUpdateInput;

use super::{ApiError, ApiResult, AppState};

pub async fn settings_get(State(state): State<AppState>) -> ApiResult<Json<AppSettings>> {
    let app_state = state.clone();
    run_blocking(move || app_state.settings().get())
        .await
        .map(Json)
}

pub async fn settings_update(
    State(state): State<AppState>,
    Json(payload): Json<SettingsUpdatePayload>,
) -> ApiResult<Json<AppSettings>> {
    let app_state = state.clone();
    let input = payload.into_input();
    run_blocking(move || app_state.settings().update(input))
        .await
        .map(Json)
}

pub async fn settings_clear_keys(State(state): State<AppState>) -> ApiResult<Json<AppSettings>> {
    let app_state = state.clone();
    run_blocking(move || {
        let service = app_state.settings();
        service.clear_sensitive()?;
        service.get()
    })
    .await
    .map(Json)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdatePayload {
    #[serde(default)]
    openai_api_key: Option<String>,
    #[serde(default)]
    remove_openai_key: Option<bool>,
    #[serde(default)]
    rapidapi_key: Option<String>,
    #[serde(default)]
    remove_rapidapi_key: Option<bool>,
    #[serde(default)]
    rotation_offset: Option<u8>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    weight_unit: Option<WeightUnit>,
    #[serde(default)]
    theme: Option<String>,
}

impl SettingsUpdatePayload {
    fn into_input(self) -> SettingsUpdateInput {
        let openai_api_key = if self.remove_openai_key == Some(true) {
            Some(None)
        } else {
            self.openai_api_key.map(Some)
        };

        let rapidapi_key = if self.remove_rapidapi_key == Some(true) {
            Some(None)
        } else {
            self.rapidapi_key.map(Some)
        };

        SettingsUpdateInput {
            openai_api_key,
            rapidapi_key,
            rotation_offset: self.rotation_offset,
            timezone: self.timezone,
            weight_unit: self.weight_unit,
            theme: self.theme,
        }
    }
}

async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> ApiResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::internal(format!("设置操作执行失败: {err}")))?
        .map_err(ApiError::from)
}
