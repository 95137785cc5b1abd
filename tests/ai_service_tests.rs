use std::time::Duration as StdDuration;

use httpmock::prelude::*;
use reqwest::StatusCode;
use serde_json::json;

use getfit::error::AiErrorCode;
use getfit::models::exercise::{CoachFilters, CoachKind};
use getfit::models::food::PortionSize;
use getfit::models::plan::PlanRequest;
use getfit::services::ai_service::testing::{
    analyze_via_http, coach_via_http, map_http_error, mock_analysis, plan_via_http,
};

fn sample_plan_request() -> PlanRequest {
    PlanRequest {
        gender: "male".into(),
        age: "28".into(),
        height: "182cm".into(),
        weight: "80kg".into(),
        activity_level: "moderate".into(),
        diet_preference: "omnivore".into(),
        goal: "muscle gain".into(),
        workout_access: "gym".into(),
        time_per_day: "60".into(),
    }
}

#[test]
fn openai_http_error_mapping_exposes_retry_semantics() {
    let (error, retryable) = map_http_error(StatusCode::UNAUTHORIZED);
    assert!(!retryable);
    assert_eq!(error.to_string(), "OpenAI API Key 无效或未授权");
    assert_eq!(error.ai_code(), Some(AiErrorCode::MissingApiKey));
    assert_eq!(error.ai_correlation_id(), Some("test-correlation-id"));

    let (error, retryable) = map_http_error(StatusCode::FORBIDDEN);
    assert!(!retryable);
    assert_eq!(error.ai_code(), Some(AiErrorCode::Forbidden));

    let (error, retryable) = map_http_error(StatusCode::TOO_MANY_REQUESTS);
    assert!(retryable);
    assert_eq!(error.ai_code(), Some(AiErrorCode::RateLimited));

    let (error, retryable) = map_http_error(StatusCode::from_u16(503).unwrap());
    assert!(retryable);
    assert!(error.to_string().contains("OpenAI 服务暂时不可用 (状态码 503)"));
    assert_eq!(error.ai_code(), Some(AiErrorCode::OpenAiUnavailable));

    let (error, retryable) = map_http_error(StatusCode::BAD_REQUEST);
    assert!(!retryable);
    assert_eq!(error.ai_code(), Some(AiErrorCode::InvalidRequest));

    let (error, retryable) = map_http_error(StatusCode::NOT_FOUND);
    assert!(!retryable);
    assert_eq!(error.to_string(), "OpenAI 接口地址无效");
    assert_eq!(error.ai_code(), Some(AiErrorCode::InvalidRequest));
}

#[tokio::test]
async fn analyze_parses_food_list_from_vision_response() {
    let server = MockServer::start_async().await;

    let foods_payload = json!({
        "foods": [
            {
                "label": "grilled chicken breast",
                "confidence": 0.92,
                "portion_guess": "medium",
                "calories_per_100g": 165
            },
            {
                "label": "steamed broccoli",
                "confidence": 0.85,
                "portion_guess": "small",
                "calories_per_100g": 34
            }
        ]
    });
    let content_string = serde_json::to_string(&foods_payload).expect("valid JSON string");

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("image_url");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "choices": [{
                        "message": {"content": content_string}
                    }],
                    "usage": {
                        "prompt_tokens": 820,
                        "completion_tokens": 96,
                        "total_tokens": 916
                    }
                }));
        })
        .await;

    let response = analyze_via_http(
        &server.base_url(),
        StdDuration::from_secs(2),
        "data:image/jpeg;base64,/9j/4AAQ",
    )
    .await
    .expect("analysis succeeds");

    mock.assert_async().await;
    assert_eq!(response.foods.len(), 2);
    assert_eq!(response.foods[0].label, "grilled chicken breast");
    assert_eq!(response.foods[0].portion_guess, PortionSize::Medium);
    assert_eq!(response.foods[1].calories_per_100g, 34.0);
}

#[tokio::test]
async fn analyze_tolerates_fenced_json_content() {
    let server = MockServer::start_async().await;

    let fenced = "```json\n{\"foods\": [{\"label\": \"banana\", \"confidence\": 0.93, \"portion_guess\": \"medium\", \"calories_per_100g\": 89}]}\n```";

    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "choices": [{"message": {"content": fenced}}],
                    "usage": {}
                }));
        })
        .await;

    let response = analyze_via_http(
        &server.base_url(),
        StdDuration::from_secs(2),
        "data:image/png;base64,AAAA",
    )
    .await
    .expect("fenced content parses");

    assert_eq!(response.foods[0].label, "banana");
}

#[tokio::test]
async fn analyze_reports_invalid_json_content() {
    let server = MockServer::start_async().await;

    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "choices": [{"message": {"content": "not-json"}}],
                    "usage": {}
                }));
        })
        .await;

    let error = analyze_via_http(
        &server.base_url(),
        StdDuration::from_secs(2),
        "data:image/png;base64,AAAA",
    )
    .await
    .expect_err("should fail on invalid JSON");

    assert_eq!(error.ai_code(), Some(AiErrorCode::InvalidResponse));
    assert!(error.ai_correlation_id().is_some());
}

#[tokio::test]
async fn analyze_rejects_missing_message_content() {
    let server = MockServer::start_async().await;

    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"choices": [], "usage": {}}));
        })
        .await;

    let error = analyze_via_http(
        &server.base_url(),
        StdDuration::from_secs(2),
        "data:image/png;base64,AAAA",
    )
    .await
    .expect_err("should fail without message content");

    assert_eq!(error.ai_code(), Some(AiErrorCode::InvalidResponse));
}

#[tokio::test]
async fn non_retryable_status_fails_after_one_attempt() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(400)
                .header("content-type", "application/json")
                .json_body(json!({"error": {"message": "bad request"}}));
        })
        .await;

    let error = analyze_via_http(
        &server.base_url(),
        StdDuration::from_secs(2),
        "data:image/png;base64,AAAA",
    )
    .await
    .expect_err("bad request is terminal");

    assert_eq!(error.ai_code(), Some(AiErrorCode::InvalidRequest));
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn plan_generation_unwraps_envelopes_from_both_calls() {
    let server = MockServer::start_async().await;

    let workout_content = serde_json::to_string(&json!({
        "workoutPlan": {
            "Monday": {
                "focus": "Chest + Triceps",
                "exercises": [
                    {"name": "Incline Bench Press", "sets": "4 x 12", "reps": "12"}
                ]
            }
        }
    }))
    .unwrap();

    let meal_content = serde_json::to_string(&json!({
        "Monday": {
            "breakfast": {
                "name": "Oats + Eggs",
                "ingredients": [{"item": "Rolled Oats", "qty": "1/2 cup"}],
                "calories": 420,
                "prep": "Boil oats in milk"
            },
            "totalCalories": 2100
        }
    }))
    .unwrap();

    let workout_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("can work out for");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "choices": [{"message": {"content": workout_content}}],
                    "usage": {}
                }));
        })
        .await;

    let meal_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("3 meals + 1 snack");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "choices": [{"message": {"content": meal_content}}],
                    "usage": {}
                }));
        })
        .await;

    let response = plan_via_http(
        &server.base_url(),
        StdDuration::from_secs(2),
        &sample_plan_request(),
    )
    .await
    .expect("plan generation succeeds");

    workout_mock.assert_async().await;
    meal_mock.assert_async().await;

    let monday = response.workout_plan.get("Monday").expect("Monday exists");
    assert_eq!(monday.focus, "Chest + Triceps");
    assert_eq!(monday.exercises[0].name, "Incline Bench Press");

    let meals = response.meal_plan.get("Monday").expect("Monday meals exist");
    assert_eq!(meals.breakfast.as_ref().unwrap().name, "Oats + Eggs");
    assert_eq!(meals.total_calories, Some(2100.0));
}

#[tokio::test]
async fn coach_search_returns_model_payload() {
    let server = MockServer::start_async().await;

    let content = serde_json::to_string(&json!({
        "exercises": [
            {"name": "Chair Squat", "target": "Legs", "tags": ["Low Impact"]}
        ]
    }))
    .unwrap();

    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "choices": [{"message": {"content": content}}],
                    "usage": {}
                }));
        })
        .await;

    let filters = CoachFilters {
        age_group: "Senior (60+)".into(),
        gender: "female".into(),
        muscle_group: None,
        goal: None,
        equipment: None,
        kind: CoachKind::Workout,
    };

    let payload = coach_via_http(&server.base_url(), StdDuration::from_secs(2), &filters)
        .await
        .expect("coach search succeeds");

    let exercises = payload
        .get("exercises")
        .and_then(|value| value.as_array())
        .expect("exercises array");
    assert_eq!(exercises.len(), 1);
    assert_eq!(exercises[0]["name"], "Chair Squat");
}

#[test]
fn mock_analysis_matches_the_wire_contract() {
    let response = mock_analysis();
    let value = serde_json::to_value(&response).unwrap();
    let foods = value["foods"].as_array().unwrap();
    assert!((2..=4).contains(&foods.len()));
    for food in foods {
        assert!(food["label"].is_string());
        assert!(food["confidence"].as_f64().unwrap() <= 0.99);
        assert!(food["portion_guess"].is_string());
        assert!(food["calories_per_100g"].is_number());
    }
}
