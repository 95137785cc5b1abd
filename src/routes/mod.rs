pub mod analyze;
pub mod coach;
pub mod library;
pub mod plan;
pub mod schedule;
pub mod settings;
pub mod tracker;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::db::DbPool;
use crate::error::{AiErrorCode, AppError, AppResult};
use crate::services::ai_service::AiService;
use crate::services::coach_service::CoachService;
use crate::services::export_service::ExportService;
use crate::services::library_service::LibraryService;
use crate::services::schedule_service::ScheduleService;
use crate::services::settings_service::SettingsService;
use crate::services::tracker_service::TrackerService;

/// Uploaded meal photos arrive as base64 data URLs; leave generous headroom.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    ai_service: Arc<AiService>,
    library_service: Arc<LibraryService>,
    coach_service: Arc<CoachService>,
    schedule_service: Arc<ScheduleService>,
    tracker_service: Arc<TrackerService>,
    settings_service: Arc<SettingsService>,
    export_service: Arc<ExportService>,
}

impl AppState {
    pub fn new(db_pool: DbPool) -> AppResult<Self> {
        let settings_service = Arc::new(SettingsService::new(db_pool.clone())?);
        let ai_service = Arc::new(AiService::new(db_pool.clone())?);
        let library_service = Arc::new(LibraryService::new(db_pool.clone())?);
        let coach_service = Arc::new(CoachService::new(
            db_pool.clone(),
            Arc::clone(&library_service),
            Arc::clone(&ai_service),
        )?);
        let schedule_service = Arc::new(ScheduleService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        ));
        let tracker_service = Arc::new(TrackerService::new(db_pool.clone()));
        let export_service = Arc::new(ExportService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        ));

        Ok(Self {
            db_pool,
            ai_service,
            library_service,
            coach_service,
            schedule_service,
            tracker_service,
            settings_service,
            export_service,
        })
    }

    pub fn ai(&self) -> Arc<AiService> {
        Arc::clone(&self.ai_service)
    }

    pub fn library(&self) -> Arc<LibraryService> {
        Arc::clone(&self.library_service)
    }

    pub fn coach(&self) -> Arc<CoachService> {
        Arc::clone(&self.coach_service)
    }

    pub fn schedule(&self) -> Arc<ScheduleService> {
        Arc::clone(&self.schedule_service)
    }

    pub fn tracker(&self) -> Arc<TrackerService> {
        Arc::clone(&self.tracker_service)
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn export(&self) -> Arc<ExportService> {
        Arc::clone(&self.export_service)
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<JsonValue>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                code: code.into(),
                message: message.into(),
                details,
            },
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "UNKNOWN",
            message,
            None,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message, details),
            AppError::NotFound => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "请求的资源不存在",
                None,
            ),
            AppError::Conflict { message } => {
                ApiError::new(StatusCode::CONFLICT, "CONFLICT", message, None)
            }
            AppError::Ai {
                code,
                message,
                correlation_id,
                details,
            } => {
                let mut merged = JsonMap::new();
                if let Some(existing) = details {
                    match existing {
                        JsonValue::Object(map) => {
                            for (key, value) in map {
                                merged.insert(key, value);
                            }
                        }
                        value => {
                            merged.insert("info".to_string(), value);
                        }
                    }
                }
                if let Some(id) = correlation_id {
                    merged.insert("correlationId".to_string(), JsonValue::String(id));
                }
                let detail_value = if merged.is_empty() {
                    None
                } else {
                    Some(JsonValue::Object(merged))
                };
                ApiError::new(ai_status_code(code), code.as_str(), message, detail_value)
            }
            AppError::Upstream {
                service,
                status,
                message,
            } => {
                let status_code = status
                    .and_then(|value| StatusCode::from_u16(value).ok())
                    .filter(|code| code.is_client_error() || code.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                ApiError::new(
                    status_code,
                    "UPSTREAM_ERROR",
                    message,
                    Some(serde_json::json!({ "service": service })),
                )
            }
            AppError::Database { message } => {
                error!(target: "app::http", %message, "database error in handler");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "UNKNOWN", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::http", error = %error, "serialization error in handler");
                ApiError::internal("序列化失败")
            }
            AppError::Io(error) => {
                error!(target: "app::http", error = %error, "io error in handler");
                ApiError::internal("文件系统读写失败")
            }
            AppError::Other(message) => {
                warn!(target: "app::http", %message, "unexpected error in handler");
                ApiError::internal(message)
            }
        }
    }
}

fn ai_status_code(code: AiErrorCode) -> StatusCode {
    match code {
        AiErrorCode::MissingApiKey | AiErrorCode::OpenAiUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        AiErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        AiErrorCode::HttpTimeout => StatusCode::GATEWAY_TIMEOUT,
        AiErrorCode::Forbidden
        | AiErrorCode::InvalidResponse
        | AiErrorCode::InvalidRequest
        | AiErrorCode::Unknown => StatusCode::BAD_GATEWAY,
    }
}

async fn health() -> Json<JsonValue> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/analyze", post(analyze::analyze))
        .route("/api/ai/status", get(analyze::ai_status))
        .route("/api/generate-plan", post(plan::generate_plan))
        .route("/api/coach/search", post(coach::search))
        .route("/api/muscles", get(library::muscle_groups))
        .route("/api/musclewiki/:muscle_id", get(library::musclewiki_exercises))
        .route("/api/stretches/:muscle_id", get(library::stretches))
        .route("/api/exercises/:body_part", get(library::exercises_by_body_part))
        .route("/api/exercises/gif/:id", get(library::exercise_gif))
        .route("/api/schedule/templates", get(schedule::templates))
        .route("/api/schedule/today", get(schedule::today))
        .route("/api/schedule/day/:date", get(schedule::day))
        .route("/api/schedule/month/:year/:month", get(schedule::month))
        .route(
            "/api/tracker/weights",
            get(tracker::weights_list),
        )
        .route(
            "/api/tracker/weights/:date",
            get(tracker::weight_get)
                .put(tracker::weight_put)
                .delete(tracker::weight_delete),
        )
        .route("/api/tracker/notes", get(tracker::notes_list))
        .route(
            "/api/tracker/notes/:date",
            get(tracker::note_get)
                .put(tracker::note_put)
                .delete(tracker::note_delete),
        )
        .route(
            "/api/tracker/photos",
            get(tracker::photos_list).post(tracker::photo_add),
        )
        .route("/api/tracker/photos/:id", delete(tracker::photo_delete))
        .route("/api/tracker/log", get(tracker::log_range))
        .route("/api/tracker/log/:date", get(tracker::log_get))
        .route("/api/tracker/log/:date/toggle", post(tracker::log_toggle))
        .route("/api/tracker/log/:date/status", put(tracker::log_status))
        .route("/api/tracker/summary/weekly", get(tracker::weekly_summary))
        .route("/api/progress/export", get(tracker::export))
        .route(
            "/api/settings",
            get(settings::settings_get).put(settings::settings_update),
        )
        .route("/api/settings/clear-keys", post(settings::settings_clear_keys))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
