use serde::{Deserialize, Serialize};
use std::fmt;

/// Portion estimate produced by the vision model. The wire format matches the
/// analysis prompt schema, so field casing here stays snake_case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PortionSize {
    Small,
    Medium,
    Large,
    #[default]
    Unknown,
}

impl PortionSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortionSize::Small => "small",
            PortionSize::Medium => "medium",
            PortionSize::Large => "large",
            PortionSize::Unknown => "unknown",
        }
    }

    /// Default gram weight assumed for a portion before the user adjusts it.
    pub fn default_grams(&self) -> f64 {
        match self {
            PortionSize::Small => 100.0,
            PortionSize::Medium => 150.0,
            PortionSize::Large => 250.0,
            PortionSize::Unknown => 150.0,
        }
    }
}

impl fmt::Display for PortionSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PortionSize {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "small" => Ok(PortionSize::Small),
            "medium" => Ok(PortionSize::Medium),
            "large" => Ok(PortionSize::Large),
            "unknown" => Ok(PortionSize::Unknown),
            other => Err(format!("unsupported portion size: {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedFood {
    pub label: String,
    pub confidence: f64,
    #[serde(default)]
    pub portion_guess: PortionSize,
    pub calories_per_100g: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub foods: Vec<AnalyzedFood>,
}

/// Editable food row as the client tracks it after analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: String,
    pub label: String,
    pub confidence: f64,
    #[serde(default)]
    pub portion_guess: PortionSize,
    pub calories_per_100g: f64,
    pub grams: f64,
}

impl FoodItem {
    pub fn from_analyzed(id: String, food: AnalyzedFood) -> Self {
        let grams = food.portion_guess.default_grams();
        Self {
            id,
            label: food.label,
            confidence: food.confidence,
            portion_guess: food.portion_guess,
            calories_per_100g: food.calories_per_100g,
            grams,
        }
    }

    /// Calories for the current gram amount, rounded to a whole number.
    pub fn calories(&self) -> i64 {
        ((self.grams / 100.0) * self.calories_per_100g).round() as i64
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.grams < 0.0 || !self.grams.is_finite() {
            return Err("grams must be a non-negative number".to_string());
        }
        if self.calories_per_100g < 0.0 || !self.calories_per_100g.is_finite() {
            return Err("calories_per_100g must be a non-negative number".to_string());
        }
        Ok(())
    }
}
