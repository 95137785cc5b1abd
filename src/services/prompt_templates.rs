use crate::models::exercise::{CoachFilters, CoachKind};
use crate::models::plan::PlanRequest;

/// System prompt guiding the vision model when analyzing a meal photo.
pub fn analysis_system_prompt() -> &'static str {
    r#"You are a nutrition analysis AI. Analyze the food image and identify all visible food items.

For each food item, provide:
1. label: A clear, specific name for the food (e.g., "grilled chicken breast" not just "chicken")
2. confidence: Your confidence level from 0 to 1
3. portion_guess: Estimate the portion size as "small", "medium", "large", or "unknown"
4. calories_per_100g: The approximate calories per 100 grams for this food item based on your nutritional knowledge

IMPORTANT: You must respond with ONLY valid JSON in this exact format, no other text:
{
  "foods": [
    {
      "label": "food name",
      "confidence": 0.95,
      "portion_guess": "medium",
      "calories_per_100g": 150
    }
  ]
}

Be accurate with calorie estimates - use your training data on nutrition. If you cannot identify a food clearly, still include it with lower confidence."#
}

pub fn analysis_user_prompt() -> &'static str {
    "Analyze this meal image and identify all food items with their nutritional information."
}

/// System prompt for both halves of the personalized plan.
pub fn plan_system_prompt() -> &'static str {
    "You are a certified fitness and nutrition expert who provides personalized weekly workout and meal plans. Always respond with valid JSON only, no markdown formatting, no code blocks."
}

pub fn coach_system_prompt(kind: CoachKind) -> String {
    format!(
        "You are a certified fitness expert who provides personalized {} recommendations. Always respond with valid JSON only, no markdown formatting.",
        kind.as_str()
    )
}

/// Weekly workout plan prompt, interpolating the profile form verbatim.
pub fn build_workout_plan_prompt(user: &PlanRequest) -> String {
    format!(
        r#"Generate a 7-day personalized workout plan for a {age}-year-old {gender}, {height} height, {weight} weight, goal is {goal}, prefers {diet} food, has {access} access, and can work out for {time} minutes daily.

Output format as JSON object with this exact structure:
{{
  "Monday": {{
    "focus": "Chest + Triceps",
    "exercises": [
      {{
        "name": "Incline Bench Press",
        "sets": "4 x 12",
        "reps": "12",
        "video": "https://youtube.com/watch?v=xyz"
      }}
    ]
  }},
  "Tuesday": {{ ... }},
  "Wednesday": {{ ... }},
  "Thursday": {{ ... }},
  "Friday": {{ ... }},
  "Saturday": {{ ... }},
  "Sunday": {{ ... }}
}}

Requirements:
- Each day should target different muscle groups
- Include 4-6 exercises per day
- Provide sets x reps format
- Include YouTube video links for exercises when possible
- Do not repeat the same workout within 2 days
- Focus on variety and progression
- Adapt exercises based on workout access ({access})
- Respect time constraint ({time} minutes)
- Return ONLY valid JSON, no markdown formatting"#,
        age = user.age,
        gender = user.gender,
        height = user.height,
        weight = user.weight,
        goal = user.goal,
        diet = user.diet_preference,
        access = user.workout_access,
        time = user.time_per_day,
    )
}

/// Weekly meal plan prompt (3 meals + 1 snack per day).
pub fn build_meal_plan_prompt(user: &PlanRequest) -> String {
    format!(
        r#"Generate a 7-day personalized meal plan (3 meals + 1 snack per day) for a {age}-year-old {gender}, {height} height, {weight} weight, goal is {goal}, prefers {diet} food, activity level is {activity}.

Output format as JSON object with this exact structure:
{{
  "Monday": {{
    "breakfast": {{
      "name": "Oats + Eggs",
      "ingredients": [
        {{ "item": "Rolled Oats", "qty": "1/2 cup" }},
        {{ "item": "Eggs", "qty": "3 boiled" }}
      ],
      "calories": 420,
      "prep": "Boil oats in milk, boil eggs separately"
    }},
    "lunch": {{ ... }},
    "dinner": {{ ... }},
    "snack": {{ ... }},
    "totalCalories": 2000
  }},
  "Tuesday": {{ ... }},
  "Wednesday": {{ ... }},
  "Thursday": {{ ... }},
  "Friday": {{ ... }},
  "Saturday": {{ ... }},
  "Sunday": {{ ... }}
}}

Requirements:
- Include meal name, ingredients with quantities, calories per meal, and cooking/prep method
- Calculate total daily calories based on goal ({goal})
- Respect diet preference: {diet}
- Ensure nutritional balance
- Provide variety across the week
- Return ONLY valid JSON, no markdown formatting"#,
        age = user.age,
        gender = user.gender,
        height = user.height,
        weight = user.weight,
        goal = user.goal,
        diet = user.diet_preference,
        activity = user.activity_level,
    )
}

/// Age-aware exercise/stretch generation prompt for coach search fallback.
pub fn build_coach_prompt(filters: &CoachFilters) -> String {
    let age_context = age_context(&filters.age_group);
    let goal_context = filters
        .goal
        .as_ref()
        .map(|goal| format!("Goal: {goal}. "))
        .unwrap_or_default();
    let equipment_context = filters
        .equipment
        .as_ref()
        .map(|equipment| format!("Equipment available: {equipment}. "))
        .unwrap_or_default();
    let muscle_context = filters
        .muscle_group
        .as_ref()
        .map(|muscle| format!("Focus on: {muscle}. "))
        .unwrap_or_default();

    match filters.kind {
        CoachKind::Workout => format!(
            r#"Generate exactly 5-8 personalized workout exercises for a {age_group} {gender}. {age_context}{goal_context}{equipment_context}{muscle_context}

Output format as JSON:
{{
  "exercises": [
    {{
      "name": "Exercise Name",
      "target": "Primary muscle group",
      "primaryMuscles": ["muscle1", "muscle2"],
      "secondaryMuscles": ["muscle3"],
      "equipment": "Equipment needed",
      "difficulty": "Beginner/Intermediate/Advanced",
      "videoUrl": "YouTube URL if available",
      "instructions": ["Step 1", "Step 2", "Step 3"],
      "tags": ["Low Impact", "Joint Friendly"]
    }}
  ]
}}

Requirements:
- Exercises should be age-appropriate and safe
- Include clear, numbered instructions
- ONLY provide YouTube video URLs that are publicly available and accessible
- Do NOT include placeholder URLs or unavailable video links
- If you cannot find a valid YouTube video URL for an exercise, omit the videoUrl field (set to null)
- Add relevant tags (Low Impact, Joint Friendly, Beginner Friendly, etc.)
- Respect equipment constraints
- Focus on the specified muscle group if provided
- Return ONLY valid JSON, no markdown formatting"#,
            age_group = filters.age_group,
            gender = filters.gender,
        ),
        CoachKind::Stretch => format!(
            r#"Generate exactly 5-8 personalized stretching exercises for a {age_group} {gender}. {age_context}{goal_context}{equipment_context}{muscle_context}

Output format as JSON:
{{
  "exercises": [
    {{
      "name": "Stretch Name",
      "target": "Primary muscle group",
      "primaryMuscles": ["muscle1", "muscle2"],
      "secondaryMuscles": ["muscle3"],
      "equipment": "None or minimal",
      "difficulty": "Beginner/Intermediate/Advanced",
      "videoUrl": "YouTube URL if available",
      "instructions": ["Step 1", "Step 2", "Step 3"],
      "tags": ["Low Impact", "Joint Friendly"],
      "duration": "30 seconds"
    }}
  ]
}}

Requirements:
- Stretches should be age-appropriate and safe
- Include clear, numbered instructions
- ONLY provide YouTube video URLs that are publicly available and accessible
- Do NOT include placeholder URLs or unavailable video links
- If you cannot find a valid YouTube video URL for a stretch, omit the videoUrl field (set to null)
- Add relevant tags
- Specify duration for each stretch
- Return ONLY valid JSON, no markdown formatting"#,
            age_group = filters.age_group,
            gender = filters.gender,
        ),
    }
}

pub fn age_context(age_group: &str) -> &'static str {
    if age_group.contains("Teen") || age_group.contains("13-17") {
        return "Focus on safe, form-focused exercises suitable for growing bodies. ";
    }
    if age_group.contains("Young Adult") || age_group.contains("18-30") {
        return "Can include moderate to high intensity exercises. ";
    }
    if age_group.contains("Adult") || age_group.contains("31-50") {
        return "Focus on sustainable, joint-friendly movements. ";
    }
    if age_group.contains("Senior") || age_group.contains("50+") || age_group.contains("60+") {
        return "Prioritize low-impact, joint-friendly exercises. Avoid high-impact movements. Focus on balance and mobility. ";
    }
    ""
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> PlanRequest {
        PlanRequest {
            gender: "female".into(),
            age: "34".into(),
            height: "168cm".into(),
            weight: "64kg".into(),
            activity_level: "moderate".into(),
            diet_preference: "vegetarian".into(),
            goal: "fat loss".into(),
            workout_access: "home".into(),
            time_per_day: "45".into(),
        }
    }

    #[test]
    fn workout_prompt_interpolates_profile() {
        let prompt = build_workout_plan_prompt(&sample_request());
        assert!(prompt.contains("34-year-old female"));
        assert!(prompt.contains("has home access"));
        assert!(prompt.contains("45 minutes"));
    }

    #[test]
    fn meal_prompt_uses_activity_level() {
        let prompt = build_meal_plan_prompt(&sample_request());
        assert!(prompt.contains("activity level is moderate"));
        assert!(prompt.contains("Respect diet preference: vegetarian"));
    }

    #[test]
    fn coach_prompt_includes_age_guidance_for_seniors() {
        let filters = CoachFilters {
            age_group: "Senior (60+)".into(),
            gender: "male".into(),
            muscle_group: Some("back".into()),
            goal: None,
            equipment: None,
            kind: CoachKind::Workout,
        };
        let prompt = build_coach_prompt(&filters);
        assert!(prompt.contains("Prioritize low-impact"));
        assert!(prompt.contains("Focus on: back."));
    }

    #[test]
    fn stretch_prompt_requests_durations() {
        let filters = CoachFilters {
            age_group: "Adult (31-50)".into(),
            gender: "female".into(),
            muscle_group: None,
            goal: None,
            equipment: None,
            kind: CoachKind::Stretch,
        };
        let prompt = build_coach_prompt(&filters);
        assert!(prompt.contains("stretching exercises"));
        assert!(prompt.contains("Specify duration for each stretch"));
    }
}
