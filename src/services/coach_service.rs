use std::sync::Arc;

use chrono::Duration;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::exercise::{
    CoachExercise, CoachFilters, CoachKind, CoachSearchResponse, ExerciseSource,
    MuscleWikiExercise,
};
use crate::models::schedule::muscle_wiki_id;
use crate::services::ai_service::AiService;
use crate::services::cache_service::{CacheOperation, CacheService};
use crate::services::library_service::{map_exercise, LibraryService};
use crate::utils::fingerprint::payload_fingerprint;

const LIBRARY_FETCH_LIMIT: u32 = 20;
const MAX_RESULTS: usize = 8;
/// Library hits below this threshold trigger the AI fallback.
const MIN_LIBRARY_RESULTS: usize = 5;

pub struct CoachService {
    library: Arc<LibraryService>,
    ai: Arc<AiService>,
    cache: CacheService,
}

impl CoachService {
    pub fn new(db: DbPool, library: Arc<LibraryService>, ai: Arc<AiService>) -> AppResult<Self> {
        let cache = CacheService::new(db, Duration::hours(24))?;
        Ok(Self { library, ai, cache })
    }

    /// Filtered exercise search: the library first, the model as fallback
    /// when the library comes up short for the requested slice.
    pub async fn search(&self, filters: CoachFilters) -> AppResult<CoachSearchResponse> {
        if filters.age_group.trim().is_empty() {
            return Err(AppError::validation("年龄段不能为空"));
        }
        if filters.gender.trim().is_empty() {
            return Err(AppError::validation("性别不能为空"));
        }

        let fingerprint = payload_fingerprint("coach", &serde_json::to_value(&filters)?);
        if let Some(cached) = self.cache.get(CacheOperation::Coach, &fingerprint).await? {
            let response: CoachSearchResponse = serde_json::from_value(cached)?;
            return Ok(response);
        }

        let mut library_results = self.library_candidates(&filters).await;
        library_results.truncate(MAX_RESULTS);

        if library_results.len() >= MIN_LIBRARY_RESULTS {
            let response = CoachSearchResponse {
                count: library_results.len(),
                exercises: library_results,
                source: "musclewiki".to_string(),
            };
            self.cache
                .put(
                    CacheOperation::Coach,
                    &fingerprint,
                    &serde_json::to_value(&response)?,
                )
                .await?;
            return Ok(response);
        }

        let ai_content = self.ai.coach_exercises(&filters).await?;
        let ai_results = normalize_ai_exercises(&ai_content, &filters);

        let source = if library_results.is_empty() {
            "ai"
        } else {
            "mixed"
        };

        let mut merged = library_results;
        merged.extend(ai_results);
        merged.truncate(MAX_RESULTS);

        let response = CoachSearchResponse {
            count: merged.len(),
            exercises: merged,
            source: source.to_string(),
        };

        self.cache
            .put(
                CacheOperation::Coach,
                &fingerprint,
                &serde_json::to_value(&response)?,
            )
            .await?;

        Ok(response)
    }

    /// Library matches for workout searches with a recognized muscle group.
    /// Upstream failures degrade to an empty list so the AI fallback still
    /// serves the request.
    async fn library_candidates(&self, filters: &CoachFilters) -> Vec<CoachExercise> {
        if filters.kind != CoachKind::Workout {
            return Vec::new();
        }

        let muscle_id = match filters
            .muscle_group
            .as_deref()
            .and_then(muscle_wiki_id)
            .filter(|id| *id > 0)
        {
            Some(id) => id,
            None => return Vec::new(),
        };

        let data = match self
            .library
            .musclewiki_raw(muscle_id, LIBRARY_FETCH_LIMIT)
            .await
        {
            Ok(data) => data,
            Err(err) => {
                warn!(target: "app::coach", error = %err, "library fetch failed, falling back to AI");
                return Vec::new();
            }
        };

        let female_first = filters.gender.eq_ignore_ascii_case("female");

        let results: Vec<CoachExercise> = data
            .results
            .iter()
            .filter(|ex| ex.name.is_some())
            .map(|ex| library_coach_exercise(ex, female_first, filters))
            .collect();

        debug!(
            target: "app::coach",
            muscle_id,
            count = results.len(),
            "library candidates resolved"
        );

        results
    }
}

fn library_coach_exercise(
    ex: &MuscleWikiExercise,
    female_first: bool,
    filters: &CoachFilters,
) -> CoachExercise {
    let tags = library_tags(ex, filters);
    let mapped = map_exercise(ex, female_first);

    CoachExercise {
        id: format!("mw-{}", ex.id),
        name: mapped.name,
        target: mapped.target,
        primary_muscles: mapped.primary_muscles,
        secondary_muscles: mapped.secondary_muscles,
        equipment: mapped.equipment,
        difficulty: mapped.difficulty,
        video_url: mapped.video_url,
        thumbnail_url: mapped.thumbnail_url,
        instructions: mapped.instructions,
        tags,
        duration: None,
        source: ExerciseSource::Musclewiki,
    }
}

fn library_tags(ex: &MuscleWikiExercise, filters: &CoachFilters) -> Vec<String> {
    let mut tags = Vec::new();

    if is_senior(&filters.age_group) {
        tags.push("Low Impact".to_string());
        tags.push("Joint Friendly".to_string());
    }

    if ex
        .difficulty
        .as_ref()
        .map(|difficulty| difficulty.name == "Beginner")
        .unwrap_or(false)
    {
        tags.push("Beginner Friendly".to_string());
    }

    let bodyweight = match ex.category.as_ref() {
        Some(category) => category.name == "Bodyweight",
        None => true,
    };
    if bodyweight {
        tags.push("No Equipment".to_string());
    }

    tags
}

fn ai_tags(filters: &CoachFilters) -> Vec<String> {
    let mut tags = Vec::new();

    if is_senior(&filters.age_group) {
        tags.push("Low Impact".to_string());
        tags.push("Joint Friendly".to_string());
    }

    if filters
        .goal
        .as_ref()
        .map(|goal| goal.to_lowercase().contains("beginner"))
        .unwrap_or(false)
    {
        tags.push("Beginner Friendly".to_string());
    }

    let bodyweight = match filters.equipment.as_ref() {
        Some(equipment) => equipment.to_lowercase().contains("bodyweight"),
        None => true,
    };
    if bodyweight {
        tags.push("No Equipment".to_string());
    }

    tags
}

fn is_senior(age_group: &str) -> bool {
    age_group.contains("Senior") || age_group.contains("60+")
}

/// Normalize the model's `{"exercises": [...]}` payload into coach cards,
/// skipping anything without a usable name.
fn normalize_ai_exercises(content: &JsonValue, filters: &CoachFilters) -> Vec<CoachExercise> {
    let items = content
        .get("exercises")
        .and_then(|value| value.as_array())
        .cloned()
        .unwrap_or_default();

    let base_tags = ai_tags(filters);

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let name = item.get("name").and_then(|value| value.as_str())?;

            let mut tags = base_tags.clone();
            for tag in string_list(item.get("tags")) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }

            Some(CoachExercise {
                id: format!("ai-{index}"),
                name: name.to_string(),
                target: item
                    .get("target")
                    .and_then(|value| value.as_str())
                    .unwrap_or("Unknown")
                    .to_string(),
                primary_muscles: string_list(item.get("primaryMuscles")),
                secondary_muscles: string_list(item.get("secondaryMuscles")),
                equipment: item
                    .get("equipment")
                    .and_then(|value| value.as_str())
                    .unwrap_or("Bodyweight")
                    .to_string(),
                difficulty: item
                    .get("difficulty")
                    .and_then(|value| value.as_str())
                    .unwrap_or("Intermediate")
                    .to_string(),
                video_url: item
                    .get("videoUrl")
                    .and_then(|value| value.as_str())
                    .map(str::to_string),
                thumbnail_url: None,
                instructions: string_list(item.get("instructions")),
                tags,
                duration: item
                    .get("duration")
                    .and_then(|value| value.as_str())
                    .map(str::to_string),
                source: ExerciseSource::Ai,
            })
        })
        .collect()
}

fn string_list(value: Option<&JsonValue>) -> Vec<String> {
    value
        .and_then(|value| value.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
