use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::repositories::secret_repository::SecretRepository;
use crate::db::DbPool;
use crate::error::{AiErrorCode, AppError, AppResult};
use crate::models::exercise::CoachFilters;
use crate::models::food::{AnalyzeRequest, AnalyzeResponse, AnalyzedFood, PortionSize};
use crate::models::plan::{MealPlan, PlanRequest, PlanResponse, WorkoutPlan};
use crate::services::cache_service::{CacheOperation, CacheService};
use crate::services::prompt_templates::{
    analysis_system_prompt, analysis_user_prompt, build_coach_prompt, build_meal_plan_prompt,
    build_workout_plan_prompt, coach_system_prompt, plan_system_prompt,
};
use crate::services::settings_service::KEY_OPENAI_API;
use crate::utils::crypto::CryptoVault;
use crate::utils::fingerprint::{image_fingerprint, payload_fingerprint};
use crate::utils::redact::redact_sensitive_data;

#[derive(Clone)]
pub struct AiService {
    db_pool: DbPool,
    provider: Arc<RwLock<Option<Arc<OpenAiProvider>>>>,
    cache: CacheService,
    config: Arc<RwLock<AiServiceConfig>>,
}

#[derive(Debug, Clone)]
struct AiServiceConfig {
    api_key: Option<String>,
    api_base_url: String,
    model: String,
    http_timeout: StdDuration,
    cache_ttl: Duration,
    mock_mode: bool,
    mock_latency: StdDuration,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiStatus {
    pub has_api_key: bool,
    pub mock_mode: bool,
    pub model: String,
    pub last_checked_at: String,
}

impl AiService {
    pub fn new(db_pool: DbPool) -> AppResult<Self> {
        let config = AiServiceConfig::load(&db_pool)?;
        let cache = CacheService::new(db_pool.clone(), config.cache_ttl)?;
        let provider = config.build_provider()?;

        Ok(Self {
            db_pool,
            provider: Arc::new(RwLock::new(provider)),
            cache,
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// Identify foods on a meal photo. Falls back to canned results when mock
    /// mode is on or no API key is configured, matching the original app.
    pub async fn analyze_meal(&self, request: AnalyzeRequest) -> AppResult<AnalyzeResponse> {
        let image = request.image.trim();
        if image.is_empty() {
            return Err(AppError::validation("缺少图片数据"));
        }

        self.refresh_configuration()?;

        let (mock_mode, mock_latency) = {
            let guard = self.config.read().expect("config lock poisoned");
            (guard.mock_mode, guard.mock_latency)
        };

        let provider = {
            let guard = self.provider.read().expect("provider lock poisoned");
            guard.as_ref().cloned()
        };

        let provider = match (mock_mode, provider) {
            (true, _) | (false, None) => {
                debug!(target: "app::ai", "serving mock meal analysis");
                sleep(mock_latency).await;
                return Ok(mock_analysis());
            }
            (false, Some(provider)) => provider,
        };

        let fingerprint = image_fingerprint(image);
        if let Some(cached) = self.cache.get(CacheOperation::Analyze, &fingerprint).await? {
            let response: AnalyzeResponse = serde_json::from_value(cached)?;
            return Ok(response);
        }

        let response = provider.analyze_meal(image).await?;

        self.cache
            .put(
                CacheOperation::Analyze,
                &fingerprint,
                &serde_json::to_value(&response)?,
            )
            .await?;

        Ok(response)
    }

    /// Generate the two-part weekly plan (workout + meals). Requires a
    /// configured API key; there is no mock path for plans.
    pub async fn generate_plan(&self, request: PlanRequest) -> AppResult<PlanResponse> {
        if let Err(field) = request.validate() {
            return Err(AppError::validation_with_details(
                "缺少必填的个人信息字段",
                json!({"field": field}),
            ));
        }

        self.refresh_configuration()?;
        let provider = self.current_provider()?;

        let payload = serde_json::to_value(&request)?;
        let fingerprint = payload_fingerprint("plan", &payload);

        if let Some(cached) = self.cache.get(CacheOperation::Plan, &fingerprint).await? {
            let response: PlanResponse = serde_json::from_value(cached)?;
            return Ok(response);
        }

        let response = provider.generate_plan(&request).await?;

        self.cache
            .put(
                CacheOperation::Plan,
                &fingerprint,
                &serde_json::to_value(&response)?,
            )
            .await?;

        Ok(response)
    }

    /// Raw exercise list for coach search fallback. The coach service owns
    /// normalization and caching of the merged result.
    pub async fn coach_exercises(&self, filters: &CoachFilters) -> AppResult<JsonValue> {
        self.refresh_configuration()?;
        let provider = self.current_provider()?;
        provider.coach_search(filters).await
    }

    pub fn status(&self) -> AppResult<AiStatus> {
        self.refresh_configuration()?;
        let guard = self.config.read().expect("config lock poisoned");

        Ok(AiStatus {
            has_api_key: guard.api_key.is_some(),
            mock_mode: guard.mock_mode,
            model: guard.model.clone(),
            last_checked_at: Utc::now().to_rfc3339(),
        })
    }

    fn refresh_configuration(&self) -> AppResult<()> {
        let config = AiServiceConfig::load(&self.db_pool)?;

        let mut provider_update: Option<Option<Arc<OpenAiProvider>>> = None;

        {
            let mut current = self.config.write().expect("config lock poisoned");
            if current.differs_from(&config) {
                provider_update = Some(config.build_provider()?);
            }
            *current = config;
        }

        if let Some(update) = provider_update {
            let mut guard = self.provider.write().expect("provider lock poisoned");
            *guard = update;
        }

        Ok(())
    }

    fn current_provider(&self) -> AppResult<Arc<OpenAiProvider>> {
        let guard = self.provider.read().expect("provider lock poisoned");
        guard
            .as_ref()
            .cloned()
            .ok_or_else(|| AppError::ai(AiErrorCode::MissingApiKey, "OpenAI API Key 未配置"))
    }
}

impl AiServiceConfig {
    fn from_env() -> Self {
        let api_key = std::env::var("GETFIT_OPENAI_API_KEY")
            .ok()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        let api_base_url = std::env::var("GETFIT_OPENAI_BASE_URL")
            .ok()
            .unwrap_or_else(|| "https://api.openai.com".to_string());
        let model = std::env::var("GETFIT_OPENAI_MODEL")
            .ok()
            .unwrap_or_else(|| "gpt-4o".to_string());
        let mock_mode = std::env::var("GETFIT_MOCK_AI")
            .or_else(|_| std::env::var("MOCK_MODE"))
            .map(|value| {
                let value = value.trim().to_lowercase();
                value == "true" || value == "1"
            })
            .unwrap_or(false);
        let mock_latency = std::env::var("GETFIT_MOCK_LATENCY_MS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(StdDuration::from_millis)
            .unwrap_or_else(|| StdDuration::from_millis(1500));

        Self {
            api_key,
            api_base_url,
            model,
            http_timeout: StdDuration::from_secs(60),
            cache_ttl: Duration::hours(24),
            mock_mode,
            mock_latency,
        }
    }

    fn load(db_pool: &DbPool) -> AppResult<Self> {
        let mut config = Self::from_env();

        if config.api_key.is_none() {
            let vault = CryptoVault::from_database_path(db_pool.path())?;
            let stored =
                db_pool.with_connection(|conn| SecretRepository::get(conn, KEY_OPENAI_API))?;

            if let Some(row) = stored {
                match vault.decrypt(&row.value) {
                    Ok(bytes) => match String::from_utf8(bytes) {
                        Ok(value) => {
                            if !value.trim().is_empty() {
                                config.api_key = Some(value);
                            }
                        }
                        Err(err) => {
                            warn!(
                                target: "app::ai",
                                error = %err,
                                "failed to decode stored OpenAI API key"
                            );
                        }
                    },
                    Err(err) => {
                        warn!(
                            target: "app::ai",
                            error = %err,
                            "failed to decrypt stored OpenAI API key"
                        );
                    }
                }
            }
        }

        if let Some(value) = config.api_key.take() {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                config.api_key = None;
            } else {
                config.api_key = Some(trimmed.to_string());
            }
        }

        Ok(config)
    }

    fn differs_from(&self, other: &Self) -> bool {
        self.api_key != other.api_key
            || self.api_base_url != other.api_base_url
            || self.model != other.model
            || self.http_timeout != other.http_timeout
            || self.cache_ttl != other.cache_ttl
            || self.mock_mode != other.mock_mode
    }

    fn build_provider(&self) -> AppResult<Option<Arc<OpenAiProvider>>> {
        match &self.api_key {
            Some(api_key) => {
                let provider = OpenAiProvider::try_new(self, api_key.clone())?;
                Ok(Some(Arc::new(provider)))
            }
            None => Ok(None),
        }
    }
}

struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Clone, Copy)]
enum OpenAiOperation {
    AnalyzeMeal,
    WorkoutPlan,
    MealPlan,
    CoachSearch,
}

impl OpenAiOperation {
    fn as_str(self) -> &'static str {
        match self {
            OpenAiOperation::AnalyzeMeal => "analyzeMeal",
            OpenAiOperation::WorkoutPlan => "workoutPlan",
            OpenAiOperation::MealPlan => "mealPlan",
            OpenAiOperation::CoachSearch => "coachSearch",
        }
    }

    fn temperature(self) -> Option<f32> {
        match self {
            OpenAiOperation::AnalyzeMeal => None,
            OpenAiOperation::WorkoutPlan
            | OpenAiOperation::MealPlan
            | OpenAiOperation::CoachSearch => Some(0.7),
        }
    }
}

struct ChatInvocationResult {
    content: JsonValue,
    tokens_used: HashMap<String, u64>,
    latency_ms: u128,
    correlation_id: String,
}

impl OpenAiProvider {
    fn try_new(config: &AiServiceConfig, api_key: String) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(StdDuration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("初始化 OpenAI HTTP 客户端失败: {err}")))?;

        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        let endpoint = format!("{}/v1/chat/completions", base_url);

        Ok(Self {
            client,
            api_key,
            endpoint,
            model: config.model.clone(),
        })
    }

    async fn analyze_meal(&self, image: &str) -> AppResult<AnalyzeResponse> {
        let request_body = json!({
            "model": self.model,
            "max_tokens": 1000,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": analysis_system_prompt() },
                { "role": "user", "content": [
                    {
                        "type": "image_url",
                        "image_url": { "url": image, "detail": "high" }
                    },
                    {
                        "type": "text",
                        "text": analysis_user_prompt()
                    }
                ]}
            ]
        });

        let result = self
            .invoke_chat(OpenAiOperation::AnalyzeMeal, request_body)
            .await?;
        log_usage(OpenAiOperation::AnalyzeMeal, &result);

        let correlation_id = result.correlation_id.clone();
        serde_json::from_value(result.content).map_err(|err| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                "OpenAI 响应缺少有效的 foods 列表",
                Some(correlation_id.as_str()),
                Some(json!({ "reason": err.to_string() })),
            )
        })
    }

    async fn generate_plan(&self, user: &PlanRequest) -> AppResult<PlanResponse> {
        let workout = self
            .invoke_chat(
                OpenAiOperation::WorkoutPlan,
                self.plan_request_body(OpenAiOperation::WorkoutPlan, build_workout_plan_prompt(user)),
            )
            .await?;

        let meal = self
            .invoke_chat(
                OpenAiOperation::MealPlan,
                self.plan_request_body(OpenAiOperation::MealPlan, build_meal_plan_prompt(user)),
            )
            .await?;
        log_usage(OpenAiOperation::WorkoutPlan, &workout);
        log_usage(OpenAiOperation::MealPlan, &meal);

        let workout_plan: WorkoutPlan =
            parse_plan_section(workout.content, "workoutPlan", &workout.correlation_id)?;
        let meal_plan: MealPlan =
            parse_plan_section(meal.content, "mealPlan", &meal.correlation_id)?;

        Ok(PlanResponse {
            workout_plan,
            meal_plan,
        })
    }

    async fn coach_search(&self, filters: &CoachFilters) -> AppResult<JsonValue> {
        let request_body = json!({
            "model": self.model,
            "temperature": OpenAiOperation::CoachSearch.temperature(),
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": coach_system_prompt(filters.kind) },
                { "role": "user", "content": build_coach_prompt(filters) }
            ]
        });

        let result = self
            .invoke_chat(OpenAiOperation::CoachSearch, request_body)
            .await?;
        log_usage(OpenAiOperation::CoachSearch, &result);

        Ok(result.content)
    }

    fn plan_request_body(&self, operation: OpenAiOperation, prompt: String) -> JsonValue {
        json!({
            "model": self.model,
            "temperature": operation.temperature(),
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": plan_system_prompt() },
                { "role": "user", "content": prompt }
            ]
        })
    }

    async fn invoke_chat(
        &self,
        operation: OpenAiOperation,
        request_body: JsonValue,
    ) -> AppResult<ChatInvocationResult> {
        let correlation_id = Uuid::new_v4().to_string();
        let sanitized_payload = redact_sensitive_data(&request_body)
            .unwrap_or_else(|_| JsonValue::String("<redacted>".to_string()));
        let sanitized_payload_str = serde_json::to_string(&sanitized_payload)
            .unwrap_or_else(|_| "\"<redacted>\"".to_string());

        let backoff_schedule = [
            StdDuration::from_secs(0),
            StdDuration::from_secs(1),
            StdDuration::from_secs(2),
            StdDuration::from_secs(4),
        ];

        let mut last_error: Option<AppError> = None;

        for (attempt, delay) in backoff_schedule.iter().enumerate() {
            if *delay > StdDuration::from_secs(0) {
                sleep(*delay).await;
            }

            debug!(
                target: "app::ai::openai",
                operation = operation.as_str(),
                attempt = attempt + 1,
                correlation_id = %correlation_id,
                payload = %sanitized_payload_str,
                "invoking OpenAI"
            );

            let start = Instant::now();
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let latency_ms = start.elapsed().as_millis();

                        debug!(
                            target: "app::ai::openai",
                            correlation_id = %correlation_id,
                            latency_ms,
                            "OpenAI responded"
                        );

                        let body: JsonValue = resp.json().await.map_err(|err| {
                            AppError::ai_with_details(
                                AiErrorCode::InvalidResponse,
                                "解析 OpenAI 响应失败",
                                Some(correlation_id.as_str()),
                                Some(json!({ "reason": err.to_string() })),
                            )
                        })?;

                        let content = body
                            .pointer("/choices/0/message/content")
                            .and_then(|value| value.as_str())
                            .ok_or_else(|| {
                                AppError::ai_with_details(
                                    AiErrorCode::InvalidResponse,
                                    "OpenAI 响应缺少 message.content 字段",
                                    Some(correlation_id.as_str()),
                                    Some(json!({ "reason": "missing_message_content" })),
                                )
                            })?;
                        let content_value = Self::parse_content(content, &correlation_id)?;
                        let tokens_used = Self::extract_tokens(&body);

                        return Ok(ChatInvocationResult {
                            content: content_value,
                            tokens_used,
                            latency_ms,
                            correlation_id,
                        });
                    }

                    let (error, retryable) = Self::map_http_error(status, correlation_id.as_str());
                    warn!(
                        target: "app::ai::openai",
                        correlation_id = %correlation_id,
                        status = status.as_u16(),
                        retryable,
                        "OpenAI returned non-success status"
                    );

                    if !retryable || attempt == backoff_schedule.len() - 1 {
                        return Err(error);
                    }

                    last_error = Some(error);
                    continue;
                }
                Err(err) => {
                    let (error, retryable) = Self::error_from_reqwest(err, correlation_id.as_str());
                    warn!(
                        target: "app::ai::openai",
                        correlation_id = %correlation_id,
                        retryable,
                        "OpenAI request error"
                    );

                    if !retryable || attempt == backoff_schedule.len() - 1 {
                        return Err(error);
                    }

                    last_error = Some(error);
                    continue;
                }
            }
        }

        if let Some(error) = last_error {
            Err(error)
        } else {
            Err(AppError::ai_with_details(
                AiErrorCode::OpenAiUnavailable,
                "OpenAI 请求失败",
                Some(correlation_id.as_str()),
                None,
            ))
        }
    }

    fn parse_content(content: &str, correlation_id: &str) -> AppResult<JsonValue> {
        let trimmed = content.trim();
        let cleaned = if trimmed.starts_with("```") {
            let without_prefix = trimmed
                .trim_start_matches("```json")
                .trim_start_matches("```JSON")
                .trim_start_matches("```");
            let without_suffix = without_prefix.trim_end_matches("```").trim();
            without_suffix.to_string()
        } else {
            trimmed.to_string()
        };

        serde_json::from_str(&cleaned).map_err(|err| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                format!("OpenAI 响应内容非 JSON: {err}"),
                Some(correlation_id),
                Some(json!({ "reason": "invalid_json" })),
            )
        })
    }

    fn extract_tokens(body: &JsonValue) -> HashMap<String, u64> {
        let mut tokens = HashMap::new();

        if let Some(usage) = body.get("usage") {
            if let Some(value) = usage.get("prompt_tokens").and_then(|v| v.as_u64()) {
                tokens.insert("prompt".to_string(), value);
            }
            if let Some(value) = usage.get("completion_tokens").and_then(|v| v.as_u64()) {
                tokens.insert("completion".to_string(), value);
            }
            if let Some(value) = usage.get("total_tokens").and_then(|v| v.as_u64()) {
                tokens.insert("total".to_string(), value);
            }
        }

        tokens
    }

    fn map_http_error(status: StatusCode, correlation_id: &str) -> (AppError, bool) {
        match status {
            StatusCode::UNAUTHORIZED => (
                AppError::ai_with_details(
                    AiErrorCode::MissingApiKey,
                    "OpenAI API Key 无效或未授权",
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
            StatusCode::FORBIDDEN => (
                AppError::ai_with_details(
                    AiErrorCode::Forbidden,
                    "OpenAI API 权限不足",
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
            StatusCode::TOO_MANY_REQUESTS => (
                AppError::ai_with_details(
                    AiErrorCode::RateLimited,
                    "OpenAI 请求过于频繁，请稍后重试",
                    Some(correlation_id),
                    None,
                ),
                true,
            ),
            status if status.is_server_error() => (
                AppError::ai_with_details(
                    AiErrorCode::OpenAiUnavailable,
                    format!("OpenAI 服务暂时不可用 (状态码 {})", status.as_u16()),
                    Some(correlation_id),
                    None,
                ),
                true,
            ),
            StatusCode::BAD_REQUEST => (
                AppError::ai_with_details(
                    AiErrorCode::InvalidRequest,
                    "OpenAI 请求格式无效",
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
            StatusCode::NOT_FOUND => (
                AppError::ai_with_details(
                    AiErrorCode::InvalidRequest,
                    "OpenAI 接口地址无效",
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
            status => (
                AppError::ai_with_details(
                    AiErrorCode::Unknown,
                    format!("OpenAI 返回未知状态码 {}", status.as_u16()),
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
        }
    }

    fn error_from_reqwest(err: reqwest::Error, correlation_id: &str) -> (AppError, bool) {
        if err.is_timeout() {
            return (
                AppError::ai_with_details(
                    AiErrorCode::HttpTimeout,
                    "OpenAI 请求超时",
                    Some(correlation_id),
                    None,
                ),
                true,
            );
        }

        if err.is_connect() {
            return (
                AppError::ai_with_details(
                    AiErrorCode::OpenAiUnavailable,
                    format!("无法连接 OpenAI 服务: {err}"),
                    Some(correlation_id),
                    None,
                ),
                true,
            );
        }

        (
            AppError::ai_with_details(
                AiErrorCode::Unknown,
                format!("OpenAI 请求错误: {err}"),
                Some(correlation_id),
                None,
            ),
            false,
        )
    }
}

fn log_usage(operation: OpenAiOperation, result: &ChatInvocationResult) {
    debug!(
        target: "app::ai",
        operation = operation.as_str(),
        correlation_id = %result.correlation_id,
        latency_ms = result.latency_ms,
        tokens = ?result.tokens_used,
        "model invocation complete"
    );
}

/// Tolerate both bare plans and `{"workoutPlan": {...}}`-style envelopes.
fn parse_plan_section<T: serde::de::DeserializeOwned>(
    content: JsonValue,
    envelope_key: &str,
    correlation_id: &str,
) -> AppResult<T> {
    let inner = match content {
        JsonValue::Object(ref map) if map.contains_key(envelope_key) => {
            map.get(envelope_key).cloned().unwrap_or(content.clone())
        }
        other => other,
    };

    serde_json::from_value(inner).map_err(|err| {
        AppError::ai_with_details(
            AiErrorCode::InvalidResponse,
            format!("解析 {envelope_key} 失败"),
            Some(correlation_id),
            Some(json!({ "reason": err.to_string() })),
        )
    })
}

// ---------------------------------------------------------------------------
// Mock analysis (no API key / explicit mock mode)
// ---------------------------------------------------------------------------

const MOCK_FOODS: &[(&str, f64, PortionSize, f64)] = &[
    ("grilled chicken breast", 0.92, PortionSize::Medium, 165.0),
    ("steamed white rice", 0.88, PortionSize::Large, 130.0),
    ("steamed broccoli", 0.85, PortionSize::Small, 34.0),
    ("grilled salmon", 0.90, PortionSize::Medium, 208.0),
    ("mixed green salad", 0.87, PortionSize::Medium, 20.0),
    ("scrambled eggs", 0.91, PortionSize::Medium, 147.0),
    ("whole wheat toast", 0.89, PortionSize::Small, 247.0),
    ("avocado", 0.86, PortionSize::Small, 160.0),
    ("banana", 0.93, PortionSize::Medium, 89.0),
    ("greek yogurt", 0.88, PortionSize::Medium, 59.0),
    ("pasta with tomato sauce", 0.84, PortionSize::Large, 131.0),
    ("beef steak", 0.89, PortionSize::Large, 271.0),
    ("french fries", 0.91, PortionSize::Medium, 312.0),
    ("caesar salad", 0.85, PortionSize::Medium, 127.0),
    ("orange juice", 0.90, PortionSize::Medium, 45.0),
];

fn mock_analysis() -> AnalyzeResponse {
    let mut rng = rand::thread_rng();
    let count = rng.gen_range(2..=4);

    let mut indices: Vec<usize> = (0..MOCK_FOODS.len()).collect();
    indices.shuffle(&mut rng);

    let foods = indices
        .into_iter()
        .take(count)
        .map(|index| {
            let (label, confidence, portion_guess, calories_per_100g) = MOCK_FOODS[index];
            let jitter = rng.gen_range(-0.05..0.05);
            AnalyzedFood {
                label: label.to_string(),
                confidence: (confidence + jitter).min(0.99),
                portion_guess,
                calories_per_100g,
            }
        })
        .collect();

    AnalyzeResponse { foods }
}

/// Test-only seams: drive the provider against a mock HTTP server without a
/// database or configuration plumbing.
pub mod testing {
    use super::*;

    pub fn map_http_error(status: StatusCode) -> (AppError, bool) {
        OpenAiProvider::map_http_error(status, "test-correlation-id")
    }

    fn provider_for(base_url: &str, timeout: StdDuration) -> AppResult<OpenAiProvider> {
        let config = AiServiceConfig {
            api_key: Some("sk-test".to_string()),
            api_base_url: base_url.to_string(),
            model: "gpt-4o".to_string(),
            http_timeout: timeout,
            cache_ttl: Duration::hours(1),
            mock_mode: false,
            mock_latency: StdDuration::from_millis(0),
        };
        OpenAiProvider::try_new(&config, "sk-test".to_string())
    }

    pub async fn analyze_via_http(
        base_url: &str,
        timeout: StdDuration,
        image: &str,
    ) -> AppResult<AnalyzeResponse> {
        provider_for(base_url, timeout)?.analyze_meal(image).await
    }

    pub async fn plan_via_http(
        base_url: &str,
        timeout: StdDuration,
        request: &PlanRequest,
    ) -> AppResult<PlanResponse> {
        provider_for(base_url, timeout)?.generate_plan(request).await
    }

    pub async fn coach_via_http(
        base_url: &str,
        timeout: StdDuration,
        filters: &CoachFilters,
    ) -> AppResult<JsonValue> {
        provider_for(base_url, timeout)?.coach_search(filters).await
    }

    pub fn mock_analysis() -> AnalyzeResponse {
        super::mock_analysis()
    }
}
