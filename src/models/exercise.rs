use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// MuscleWiki upstream payloads (deserialized as the API sends them)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MuscleWikiResponse {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<MuscleWikiExercise>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MuscleWikiExercise {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub muscles_primary: Vec<NamedRef>,
    #[serde(default)]
    pub muscles_secondary: Vec<NamedRef>,
    #[serde(default)]
    pub category: Option<NamedRef>,
    #[serde(default)]
    pub difficulty: Option<NamedRef>,
    #[serde(default)]
    pub male_images: Vec<MediaSet>,
    #[serde(default)]
    pub female_images: Vec<MediaSet>,
    #[serde(default)]
    pub correct_steps: Option<Vec<CorrectStep>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSet {
    #[serde(default)]
    pub og_image: Option<String>,
    #[serde(default)]
    pub unbranded_video: Option<String>,
    #[serde(default)]
    pub branded_video: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorrectStep {
    pub order: i64,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Client-facing library shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: u64,
    pub name: String,
    pub target: String,
    pub primary_muscles: Vec<String>,
    pub secondary_muscles: Vec<String>,
    pub equipment: String,
    pub difficulty: String,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseListResponse {
    pub count: u64,
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StretchPhase {
    Pre,
    Post,
}

impl StretchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            StretchPhase::Pre => "pre",
            StretchPhase::Post => "post",
        }
    }

    /// Suggested hold/duration hint shown on stretch cards.
    pub fn duration_hint(&self) -> &'static str {
        match self {
            StretchPhase::Pre => "30-60 seconds",
            StretchPhase::Post => "20-30 seconds",
        }
    }
}

impl fmt::Display for StretchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stretch {
    #[serde(flatten)]
    pub exercise: Exercise,
    pub duration: String,
    #[serde(rename = "type")]
    pub phase: StretchPhase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StretchListResponse {
    pub count: u64,
    pub pre_workout: Vec<Stretch>,
    pub post_workout: Vec<Stretch>,
}

// ---------------------------------------------------------------------------
// ExerciseDB (RapidAPI) payloads — upstream already speaks camelCase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BodyPartExercise {
    pub id: String,
    pub name: String,
    pub body_part: String,
    pub target: String,
    pub equipment: String,
    #[serde(default)]
    pub secondary_muscles: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub gif_url: Option<String>,
}

pub const BODY_PARTS: &[&str] = &[
    "chest",
    "back",
    "shoulders",
    "upper arms",
    "lower arms",
    "upper legs",
    "lower legs",
    "waist",
    "cardio",
    "neck",
];

// ---------------------------------------------------------------------------
// Coach search (age/goal filters over library + AI)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoachKind {
    Workout,
    Stretch,
}

impl CoachKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoachKind::Workout => "workout",
            CoachKind::Stretch => "stretch",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachFilters {
    pub age_group: String,
    pub gender: String,
    #[serde(default)]
    pub muscle_group: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(rename = "type")]
    pub kind: CoachKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseSource {
    Musclewiki,
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachExercise {
    pub id: String,
    pub name: String,
    pub target: String,
    #[serde(default)]
    pub primary_muscles: Vec<String>,
    #[serde(default)]
    pub secondary_muscles: Vec<String>,
    pub equipment: String,
    pub difficulty: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub duration: Option<String>,
    pub source: ExerciseSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachSearchResponse {
    pub exercises: Vec<CoachExercise>,
    pub source: String,
    pub count: usize,
}
