use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration as StdDuration, Instant};

use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::db::repositories::secret_repository::SecretRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::exercise::{
    BodyPartExercise, Exercise, ExerciseListResponse, MuscleWikiExercise, MuscleWikiResponse,
    Stretch, StretchListResponse, StretchPhase, BODY_PARTS,
};
use crate::services::settings_service::KEY_RAPIDAPI;
use crate::utils::crypto::CryptoVault;

pub const STRETCHES_CATEGORY_ID: u32 = 8;
const EXERCISE_LIMIT: u32 = 20;
const STRETCH_LIMIT: u32 = 30;
const BODY_PART_LIMIT: u32 = 50;

const MEMO_CAPACITY: usize = 64;
/// Matches the upstream cache hints the original proxy sent (1 hour).
const MEMO_TTL: StdDuration = StdDuration::from_secs(3600);

#[derive(Debug, Clone)]
struct LibraryConfig {
    musclewiki_base_url: String,
    exercisedb_base_url: String,
    rapidapi_host: String,
    rapidapi_key: Option<String>,
}

impl LibraryConfig {
    fn from_env() -> Self {
        let musclewiki_base_url = std::env::var("GETFIT_MUSCLEWIKI_BASE_URL")
            .ok()
            .unwrap_or_else(|| "https://musclewiki.com".to_string());
        let exercisedb_base_url = std::env::var("GETFIT_EXERCISEDB_BASE_URL")
            .ok()
            .unwrap_or_else(|| "https://exercisedb.p.rapidapi.com".to_string());
        let rapidapi_host = std::env::var("GETFIT_RAPIDAPI_HOST")
            .ok()
            .unwrap_or_else(|| "exercisedb.p.rapidapi.com".to_string());
        let rapidapi_key = std::env::var("GETFIT_RAPIDAPI_KEY")
            .ok()
            .or_else(|| std::env::var("RAPIDAPI_KEY").ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Self {
            musclewiki_base_url,
            exercisedb_base_url,
            rapidapi_host,
            rapidapi_key,
        }
    }

    fn load(db: &DbPool) -> AppResult<Self> {
        let mut config = Self::from_env();

        if config.rapidapi_key.is_none() {
            let vault = CryptoVault::from_database_path(db.path())?;
            let stored = db.with_connection(|conn| SecretRepository::get(conn, KEY_RAPIDAPI))?;

            if let Some(row) = stored {
                match vault.decrypt(&row.value) {
                    Ok(bytes) => match String::from_utf8(bytes) {
                        Ok(value) => {
                            let trimmed = value.trim();
                            if !trimmed.is_empty() {
                                config.rapidapi_key = Some(trimmed.to_string());
                            }
                        }
                        Err(err) => {
                            warn!(
                                target: "app::library",
                                error = %err,
                                "failed to decode stored RapidAPI key"
                            );
                        }
                    },
                    Err(err) => {
                        warn!(
                            target: "app::library",
                            error = %err,
                            "failed to decrypt stored RapidAPI key"
                        );
                    }
                }
            }
        }

        Ok(config)
    }
}

struct MemoEntry {
    stored_at: Instant,
    payload: JsonValue,
}

/// Proxy client for the exercise libraries (MuscleWiki, ExerciseDB) with an
/// in-memory TTL cache over the list endpoints.
pub struct LibraryService {
    db: DbPool,
    client: reqwest::Client,
    memo: Mutex<LruCache<String, MemoEntry>>,
    config_override: Option<LibraryConfig>,
}

impl LibraryService {
    pub fn new(db: DbPool) -> AppResult<Self> {
        Self::build(db, None)
    }

    /// Pin the upstream endpoints instead of resolving them from env/storage.
    /// Used by tests to point the client at a mock server.
    pub fn with_endpoints(
        db: DbPool,
        musclewiki_base_url: impl Into<String>,
        exercisedb_base_url: impl Into<String>,
        rapidapi_key: Option<String>,
    ) -> AppResult<Self> {
        let config = LibraryConfig {
            musclewiki_base_url: musclewiki_base_url.into(),
            exercisedb_base_url: exercisedb_base_url.into(),
            rapidapi_host: "exercisedb.p.rapidapi.com".to_string(),
            rapidapi_key,
        };
        Self::build(db, Some(config))
    }

    fn build(db: DbPool, config_override: Option<LibraryConfig>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(30))
            .build()
            .map_err(|err| AppError::other(format!("初始化 HTTP 客户端失败: {err}")))?;

        let capacity = NonZeroUsize::new(MEMO_CAPACITY).expect("capacity is non-zero");

        Ok(Self {
            db,
            client,
            memo: Mutex::new(LruCache::new(capacity)),
            config_override,
        })
    }

    fn load_config(&self) -> AppResult<LibraryConfig> {
        match &self.config_override {
            Some(config) => Ok(config.clone()),
            None => LibraryConfig::load(&self.db),
        }
    }

    // -- MuscleWiki --------------------------------------------------------

    pub async fn exercises_by_muscle(&self, muscle_id: u32) -> AppResult<ExerciseListResponse> {
        let memo_key = format!("mw:{muscle_id}");
        if let Some(cached) = self.memo_get::<ExerciseListResponse>(&memo_key) {
            return Ok(cached);
        }

        let data = self
            .fetch_musclewiki(muscle_id, None, EXERCISE_LIMIT)
            .await?;

        let exercises = data
            .results
            .iter()
            .map(|ex| map_exercise(ex, false))
            .collect();

        let response = ExerciseListResponse {
            count: data.count,
            exercises,
        };
        self.memo_put(&memo_key, &response);
        Ok(response)
    }

    pub async fn stretches_by_muscle(&self, muscle_id: u32) -> AppResult<StretchListResponse> {
        let memo_key = format!("stretch:{muscle_id}");
        if let Some(cached) = self.memo_get::<StretchListResponse>(&memo_key) {
            return Ok(cached);
        }

        let data = self
            .fetch_musclewiki(muscle_id, Some(STRETCHES_CATEGORY_ID), STRETCH_LIMIT)
            .await?;

        let stretches: Vec<Stretch> = data
            .results
            .iter()
            .map(|ex| {
                let exercise = map_exercise(ex, false);
                let phase = classify_stretch(&exercise.name);
                Stretch {
                    exercise,
                    duration: phase.duration_hint().to_string(),
                    phase,
                }
            })
            .collect();

        let (mut pre_workout, post_workout): (Vec<Stretch>, Vec<Stretch>) = stretches
            .into_iter()
            .partition(|stretch| stretch.phase == StretchPhase::Pre);

        // Most library stretches are static holds; promote half of them to
        // the warm-up column when nothing dynamic came back.
        let post_workout = if pre_workout.is_empty() && !post_workout.is_empty() {
            let half = post_workout.len().div_ceil(2);
            let mut remaining = post_workout;
            let rest = remaining.split_off(half);
            pre_workout = remaining
                .into_iter()
                .map(|mut stretch| {
                    stretch.phase = StretchPhase::Pre;
                    stretch.duration = StretchPhase::Pre.duration_hint().to_string();
                    stretch
                })
                .collect();
            rest
        } else {
            post_workout
        };

        let response = StretchListResponse {
            count: data.count,
            pre_workout,
            post_workout,
        };
        self.memo_put(&memo_key, &response);
        Ok(response)
    }

    /// Raw page for callers that need gender-aware media selection.
    pub async fn musclewiki_raw(
        &self,
        muscle_id: u32,
        limit: u32,
    ) -> AppResult<MuscleWikiResponse> {
        self.fetch_musclewiki(muscle_id, None, limit).await
    }

    async fn fetch_musclewiki(
        &self,
        muscle_id: u32,
        category: Option<u32>,
        limit: u32,
    ) -> AppResult<MuscleWikiResponse> {
        let config = self.load_config()?;
        let base = config.musclewiki_base_url.trim_end_matches('/');

        let url = match category {
            Some(category) => format!(
                "{base}/newapi/exercise/exercises/?category={category}&muscles_primary={muscle_id}&limit={limit}"
            ),
            None => format!(
                "{base}/newapi/exercise/exercises/?muscles_primary={muscle_id}&limit={limit}"
            ),
        };

        debug!(target: "app::library", muscle_id, category = ?category, "fetching MuscleWiki exercises");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|err| AppError::upstream("musclewiki", None, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(
                "musclewiki",
                Some(status.as_u16()),
                format!("非成功状态码 {}", status.as_u16()),
            ));
        }

        response
            .json::<MuscleWikiResponse>()
            .await
            .map_err(|err| AppError::upstream("musclewiki", None, format!("响应解析失败: {err}")))
    }

    // -- ExerciseDB --------------------------------------------------------

    pub async fn exercises_by_body_part(
        &self,
        body_part: &str,
    ) -> AppResult<Vec<BodyPartExercise>> {
        let normalized = body_part.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(AppError::validation("身体部位不能为空"));
        }

        if !BODY_PARTS.contains(&normalized.as_str()) {
            debug!(
                target: "app::library",
                body_part = %normalized,
                "body part not in the known list, forwarding anyway"
            );
        }

        let memo_key = format!("edb:{normalized}");
        if let Some(cached) = self.memo_get::<Vec<BodyPartExercise>>(&memo_key) {
            return Ok(cached);
        }

        let config = self.load_config()?;
        let api_key = config
            .rapidapi_key
            .as_deref()
            .ok_or_else(|| AppError::upstream("exercisedb", None, "RapidAPI Key 未配置"))?;

        let base = config.exercisedb_base_url.trim_end_matches('/');
        let encoded: String = normalized.replace(' ', "%20");
        let url = format!("{base}/exercises/bodyPart/{encoded}?limit={BODY_PART_LIMIT}");

        debug!(target: "app::library", body_part = %normalized, "fetching ExerciseDB exercises");

        let response = self
            .client
            .get(&url)
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", &config.rapidapi_host)
            .send()
            .await
            .map_err(|err| AppError::upstream("exercisedb", None, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(
                "exercisedb",
                Some(status.as_u16()),
                format!("非成功状态码 {}", status.as_u16()),
            ));
        }

        let mut exercises: Vec<BodyPartExercise> = response
            .json()
            .await
            .map_err(|err| AppError::upstream("exercisedb", None, format!("响应解析失败: {err}")))?;

        // Serve animations through the local proxy so the client never needs
        // the RapidAPI credentials.
        for exercise in &mut exercises {
            exercise.gif_url = Some(format!("/api/exercises/gif/{}", exercise.id));
        }

        self.memo_put(&memo_key, &exercises);
        Ok(exercises)
    }

    pub async fn exercise_gif(&self, id: &str) -> AppResult<(Vec<u8>, String)> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("动作编号不能为空"));
        }

        let config = self.load_config()?;
        let api_key = config
            .rapidapi_key
            .as_deref()
            .ok_or_else(|| AppError::upstream("exercisedb", None, "RapidAPI Key 未配置"))?;

        let base = config.exercisedb_base_url.trim_end_matches('/');
        let url = format!("{base}/image/{trimmed}");

        let response = self
            .client
            .get(&url)
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", &config.rapidapi_host)
            .send()
            .await
            .map_err(|err| AppError::upstream("exercisedb", None, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(
                "exercisedb",
                Some(status.as_u16()),
                format!("非成功状态码 {}", status.as_u16()),
            ));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("image/gif")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|err| AppError::upstream("exercisedb", None, format!("读取图像失败: {err}")))?;

        Ok((bytes.to_vec(), content_type))
    }

    // -- memo cache --------------------------------------------------------

    fn memo_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut memo = self.memo.lock().ok()?;
        let entry = memo.get(key)?;
        if entry.stored_at.elapsed() > MEMO_TTL {
            memo.pop(key);
            return None;
        }

        debug!(target: "app::library", %key, "library memo hit");
        serde_json::from_value(entry.payload.clone()).ok()
    }

    fn memo_put<T: Serialize>(&self, key: &str, value: &T) {
        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(_) => return,
        };

        if let Ok(mut memo) = self.memo.lock() {
            memo.put(
                key.to_string(),
                MemoEntry {
                    stored_at: Instant::now(),
                    payload,
                },
            );
        }
    }
}

/// Flatten a MuscleWiki exercise into the card shape the client renders.
pub fn map_exercise(ex: &MuscleWikiExercise, female_first: bool) -> Exercise {
    let (video_url, thumbnail_url) = pick_media(ex, female_first);

    let mut steps: Vec<_> = ex.correct_steps.clone().unwrap_or_default();
    steps.sort_by_key(|step| step.order);

    Exercise {
        id: ex.id,
        name: ex
            .name
            .clone()
            .unwrap_or_else(|| "Exercise".to_string()),
        target: ex
            .muscles_primary
            .first()
            .map(|muscle| muscle.name.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        primary_muscles: ex
            .muscles_primary
            .iter()
            .map(|muscle| muscle.name.clone())
            .collect(),
        secondary_muscles: ex
            .muscles_secondary
            .iter()
            .map(|muscle| muscle.name.clone())
            .collect(),
        equipment: ex
            .category
            .as_ref()
            .map(|category| category.name.clone())
            .unwrap_or_else(|| "Bodyweight".to_string()),
        difficulty: ex
            .difficulty
            .as_ref()
            .map(|difficulty| difficulty.name.clone())
            .unwrap_or_else(|| "Intermediate".to_string()),
        video_url,
        thumbnail_url,
        instructions: steps.into_iter().map(|step| step.text).collect(),
    }
}

fn pick_media(ex: &MuscleWikiExercise, female_first: bool) -> (Option<String>, Option<String>) {
    let ordered = if female_first {
        [&ex.female_images, &ex.male_images]
    } else {
        [&ex.male_images, &ex.female_images]
    };

    let video = ordered
        .iter()
        .filter_map(|sets| sets.first())
        .find_map(|set| set.unbranded_video.clone());
    let thumbnail = ordered
        .iter()
        .filter_map(|sets| sets.first())
        .find_map(|set| set.og_image.clone());

    (video, thumbnail)
}

/// Dynamic, movement-based stretches warm up; static holds cool down.
pub fn classify_stretch(name: &str) -> StretchPhase {
    let lower = name.to_lowercase();
    let dynamic = lower.contains("dynamic")
        || lower.contains("swing")
        || lower.contains("circle")
        || lower.contains("rotation")
        || lower.contains("arm circles")
        || lower.contains("leg swing");

    if dynamic {
        StretchPhase::Pre
    } else {
        StretchPhase::Post
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exercise::{MediaSet, NamedRef};

    fn sample_exercise() -> MuscleWikiExercise {
        MuscleWikiExercise {
            id: 42,
            name: Some("Barbell Bench Press".into()),
            muscles_primary: vec![NamedRef {
                id: 2,
                name: "Chest".into(),
            }],
            muscles_secondary: vec![NamedRef {
                id: 5,
                name: "Triceps".into(),
            }],
            category: Some(NamedRef {
                id: 1,
                name: "Barbell".into(),
            }),
            difficulty: None,
            male_images: vec![MediaSet {
                og_image: Some("https://cdn/m.jpg".into()),
                unbranded_video: Some("https://cdn/m.mp4".into()),
                branded_video: None,
            }],
            female_images: vec![MediaSet {
                og_image: Some("https://cdn/f.jpg".into()),
                unbranded_video: Some("https://cdn/f.mp4".into()),
                branded_video: None,
            }],
            correct_steps: Some(vec![
                crate::models::exercise::CorrectStep {
                    order: 2,
                    text: "Press up".into(),
                },
                crate::models::exercise::CorrectStep {
                    order: 1,
                    text: "Lower the bar".into(),
                },
            ]),
        }
    }

    #[test]
    fn map_exercise_fills_defaults_and_sorts_steps() {
        let mapped = map_exercise(&sample_exercise(), false);
        assert_eq!(mapped.target, "Chest");
        assert_eq!(mapped.equipment, "Barbell");
        assert_eq!(mapped.difficulty, "Intermediate");
        assert_eq!(mapped.video_url.as_deref(), Some("https://cdn/m.mp4"));
        assert_eq!(
            mapped.instructions,
            vec!["Lower the bar".to_string(), "Press up".to_string()]
        );
    }

    #[test]
    fn female_first_media_selection_falls_back_to_male() {
        let mut ex = sample_exercise();
        let mapped = map_exercise(&ex, true);
        assert_eq!(mapped.video_url.as_deref(), Some("https://cdn/f.mp4"));

        ex.female_images.clear();
        let mapped = map_exercise(&ex, true);
        assert_eq!(mapped.video_url.as_deref(), Some("https://cdn/m.mp4"));
    }

    #[test]
    fn stretch_classification_spots_dynamic_movements() {
        assert_eq!(classify_stretch("Arm Circles"), StretchPhase::Pre);
        assert_eq!(classify_stretch("Standing Leg Swing"), StretchPhase::Pre);
        assert_eq!(classify_stretch("Torso Rotation"), StretchPhase::Pre);
        assert_eq!(classify_stretch("Seated Hamstring Stretch"), StretchPhase::Post);
    }

    #[test]
    fn duration_hints_follow_phase() {
        assert_eq!(StretchPhase::Pre.duration_hint(), "30-60 seconds");
        assert_eq!(StretchPhase::Post.duration_hint(), "20-30 seconds");
    }
}
