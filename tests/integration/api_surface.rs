use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;
use tower::util::ServiceExt;

use getfit::db::DbPool;
use getfit::routes::{router, AppState};

fn app() -> (Router, TempDir) {
    // Mock AI without artificial latency so the analyze route can be driven
    // end-to-end without credentials. Ambient keys would defeat the
    // missing-key assertions, so drop them for this process.
    std::env::set_var("GETFIT_MOCK_AI", "1");
    std::env::set_var("GETFIT_MOCK_LATENCY_MS", "0");
    std::env::remove_var("GETFIT_OPENAI_API_KEY");
    std::env::remove_var("OPENAI_API_KEY");

    let dir = TempDir::new().unwrap();
    let pool = DbPool::new(dir.path().join("getfit.sqlite")).unwrap();
    let state = AppState::new(pool).unwrap();
    (router(state), dir)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, payload: JsonValue) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_status() {
    let (app, _guard) = app();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn analyze_serves_mock_foods_without_credentials() {
    let (app, _guard) = app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/analyze",
            json!({"image": "data:image/jpeg;base64,/9j/4AAQ"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let foods = body["foods"].as_array().unwrap();
    assert!((2..=4).contains(&foods.len()));
    assert!(foods[0]["label"].is_string());
}

#[tokio::test]
async fn analyze_rejects_empty_image() {
    let (app, _guard) = app();

    let response = app
        .oneshot(json_request("POST", "/api/analyze", json!({"image": "  "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn generate_plan_without_api_key_is_unavailable() {
    let (app, _guard) = app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/generate-plan",
            json!({
                "gender": "male",
                "age": "28",
                "height": "182cm",
                "weight": "80kg",
                "activityLevel": "moderate",
                "dietPreference": "omnivore",
                "goal": "muscle gain",
                "workoutAccess": "gym",
                "timePerDay": "60"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["code"], "MISSING_API_KEY");
}

#[tokio::test]
async fn settings_roundtrip_through_the_api() {
    let (app, _guard) = app();

    let response = app
        .clone()
        .oneshot(get("/api/settings"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let defaults = body_json(response).await;
    assert_eq!(defaults["rotationOffset"], 0);
    assert_eq!(defaults["timezone"], "UTC");
    assert_eq!(defaults["weightUnit"], "kg");

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/settings",
            json!({
                "rotationOffset": 4,
                "timezone": "America/Toronto",
                "weightUnit": "lbs",
                "theme": "dark"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/settings")).await.unwrap();
    let updated = body_json(response).await;
    assert_eq!(updated["rotationOffset"], 4);
    assert_eq!(updated["timezone"], "America/Toronto");
    assert_eq!(updated["weightUnit"], "lbs");
    assert_eq!(updated["theme"], "dark");
}

#[tokio::test]
async fn invalid_rotation_offset_is_a_validation_error() {
    let (app, _guard) = app();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/settings",
            json!({"rotationOffset": 9}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn weight_entries_roundtrip_with_validation() {
    let (app, _guard) = app();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/tracker/weights/2025-06-01",
            json!({"weight": 82.5, "unit": "kg"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/api/tracker/weights/2025-06-01"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["weight"], 82.5);
    assert_eq!(body["unit"], "kg");

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/tracker/weights/2025-06-02",
            json!({"weight": -3.0, "unit": "kg"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get("/api/tracker/weights?from=2025-06-01&to=2025-06-30"))
        .await
        .unwrap();
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn workout_log_status_and_toggle_flow() {
    let (app, _guard) = app();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/tracker/log/2025-06-03/status",
            json!({"status": "done"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["completed"], true);
    assert_eq!(body["status"], "done");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/tracker/log/2025-06-03/toggle",
            json!({}),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["completed"], false);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/tracker/log/2025-06-03/status",
            json!({"status": null}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/api/tracker/log/2025-06-03"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body.is_null());
}

#[tokio::test]
async fn schedule_today_honors_anchor_and_offset() {
    let (app, _guard) = app();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/settings",
            json!({"rotationOffset": 5}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/api/schedule/today?anchor=2025-06-15"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["date"], "2025-06-15");
    assert_eq!(body["templateIndex"], 5);
    assert_eq!(body["template"]["name"], "Cardio");

    let response = app
        .oneshot(get("/api/schedule/day/2025-06-16?anchor=2025-06-15"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["templateIndex"], 6);
}

#[tokio::test]
async fn month_grid_returns_forty_two_cells() {
    let (app, _guard) = app();

    let response = app
        .oneshot(get("/api/schedule/month/2025/6?anchor=2025-06-15"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["days"].as_array().unwrap().len(), 42);
    assert_eq!(body["monthName"], "June");
}

#[tokio::test]
async fn photos_roundtrip_through_the_api() {
    let (app, _guard) = app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/tracker/photos",
            json!({
                "entryDate": "2025-06-05",
                "dataUrl": "data:image/png;base64,iVBORw0KGgo",
                "note": "week 1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get("/api/tracker/photos"))
        .await
        .unwrap();
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/tracker/photos/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/api/tracker/photos"))
        .await
        .unwrap();
    let listed = body_json(response).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_resources_return_not_found_shape() {
    let (app, _guard) = app();

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/tracker/photos/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn export_streams_a_gzip_attachment() {
    let (app, _guard) = app();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/tracker/weights/2025-06-01",
            json!({"weight": 82.5, "unit": "kg"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/progress/export")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/gzip"
    );
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("getfit-export-"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // Gzip magic bytes.
    assert_eq!(&bytes[0..2], &[0x1f, 0x8b]);
}

#[tokio::test]
async fn weekly_summary_is_served_over_http() {
    let (app, _guard) = app();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/tracker/log/2025-06-14/status",
            json!({"status": "done"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/api/tracker/summary/weekly?anchor=2025-06-15"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["workoutsCompleted"], 1);
    assert_eq!(body["weekEnd"], "2025-06-15");
}

#[tokio::test]
async fn muscle_groups_list_matches_the_browser_selector() {
    let (app, _guard) = app();

    let response = app.oneshot(get("/api/muscles")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let groups = body.as_array().unwrap();
    assert_eq!(groups.len(), 8);
    assert_eq!(groups[0]["id"], "chest");
    assert_eq!(groups[0]["muscleId"], 2);
}

#[tokio::test]
async fn ai_status_reports_mock_mode() {
    let (app, _guard) = app();

    let response = app.oneshot(get("/api/ai/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["mockMode"], true);
    assert_eq!(body["hasApiKey"], false);
    assert!(body["model"].is_string());
}

#[tokio::test]
async fn templates_endpoint_lists_the_seven_day_cycle() {
    let (app, _guard) = app();

    let response = app.oneshot(get("/api/schedule/templates")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let templates = body.as_array().unwrap();
    assert_eq!(templates.len(), 7);
    assert_eq!(templates[0]["name"], "Chest + Shoulders");
    assert_eq!(templates[3]["isRest"], true);
}
