use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Profile fields the personalized-plan form collects. Everything arrives as
/// free text; the prompt builder interpolates the values verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub gender: String,
    pub age: String,
    pub height: String,
    pub weight: String,
    pub activity_level: String,
    pub diet_preference: String,
    pub goal: String,
    pub workout_access: String,
    pub time_per_day: String,
}

impl PlanRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        let fields = [
            (&self.gender, "gender"),
            (&self.age, "age"),
            (&self.height, "height"),
            (&self.weight, "weight"),
            (&self.activity_level, "activityLevel"),
            (&self.diet_preference, "dietPreference"),
            (&self.goal, "goal"),
            (&self.workout_access, "workoutAccess"),
            (&self.time_per_day, "timePerDay"),
        ];
        for (value, name) in fields {
            if value.trim().is_empty() {
                return Err(name);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanExercise {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutPlanDay {
    pub focus: String,
    pub exercises: Vec<PlanExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Ingredient {
    pub item: String,
    pub qty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Meal {
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MealPlanDay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakfast: Option<Meal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lunch: Option<Meal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dinner: Option<Meal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snack: Option<Meal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_calories: Option<f64>,
}

/// Seven-day plans keyed by weekday name, exactly as the model emits them.
pub type WorkoutPlan = HashMap<String, WorkoutPlanDay>;
pub type MealPlan = HashMap<String, MealPlanDay>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub workout_plan: WorkoutPlan,
    pub meal_plan: MealPlan,
}
