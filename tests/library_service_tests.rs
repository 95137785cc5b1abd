use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use getfit::db::DbPool;
use getfit::services::library_service::LibraryService;

fn service_for(server: &MockServer) -> (LibraryService, TempDir) {
    let dir = TempDir::new().unwrap();
    let pool = DbPool::new(dir.path().join("library.db")).unwrap();
    let service = LibraryService::with_endpoints(
        pool,
        server.base_url(),
        server.base_url(),
        Some("test-rapidapi-key".to_string()),
    )
    .unwrap();
    (service, dir)
}

fn musclewiki_exercise(id: u64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "muscles_primary": [{"id": 2, "name": "Chest"}],
        "muscles_secondary": [{"id": 5, "name": "Triceps"}],
        "category": {"id": 1, "name": "Barbell"},
        "difficulty": {"id": 2, "name": "Beginner"},
        "male_images": [{
            "og_image": "https://cdn/m.jpg",
            "unbranded_video": "https://cdn/m.mp4",
            "branded_video": "https://cdn/m-branded.mp4"
        }],
        "female_images": [],
        "correct_steps": [
            {"order": 1, "text": "Set up"},
            {"order": 2, "text": "Press"}
        ]
    })
}

#[tokio::test]
async fn exercises_by_muscle_map_upstream_payload() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/newapi/exercise/exercises/")
                .query_param("muscles_primary", "2")
                .query_param("limit", "20");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "count": 2,
                    "next": null,
                    "previous": null,
                    "results": [
                        musclewiki_exercise(10, "Barbell Bench Press"),
                        musclewiki_exercise(11, "Incline Press")
                    ]
                }));
        })
        .await;

    let (service, _guard) = service_for(&server);
    let response = service.exercises_by_muscle(2).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.count, 2);
    assert_eq!(response.exercises.len(), 2);

    let first = &response.exercises[0];
    assert_eq!(first.name, "Barbell Bench Press");
    assert_eq!(first.target, "Chest");
    assert_eq!(first.equipment, "Barbell");
    assert_eq!(first.difficulty, "Beginner");
    assert_eq!(first.video_url.as_deref(), Some("https://cdn/m.mp4"));
    assert_eq!(first.instructions, vec!["Set up", "Press"]);
}

#[tokio::test]
async fn exercises_are_memoized_for_repeat_lookups() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/newapi/exercise/exercises/");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "count": 1,
                    "results": [musclewiki_exercise(20, "Cable Fly")]
                }));
        })
        .await;

    let (service, _guard) = service_for(&server);

    let first = service.exercises_by_muscle(2).await.unwrap();
    let second = service.exercises_by_muscle(2).await.unwrap();

    assert_eq!(first.exercises[0].name, second.exercises[0].name);
    // One upstream hit serves both calls inside the TTL window.
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn concurrent_lookups_share_one_upstream_fetch_after_warmup() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/newapi/exercise/exercises/");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "count": 1,
                    "results": [musclewiki_exercise(25, "Push Up")]
                }));
        })
        .await;

    let (service, _guard) = service_for(&server);

    // Warm the memo, then fan out concurrent reads against it.
    service.exercises_by_muscle(6).await.unwrap();
    let lookups = (0..8).map(|_| service.exercises_by_muscle(6));
    let results = futures::future::join_all(lookups).await;

    for result in results {
        assert_eq!(result.unwrap().exercises[0].name, "Push Up");
    }
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn upstream_errors_carry_the_status_through() {
    let server = MockServer::start_async().await;

    let _mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/newapi/exercise/exercises/");
            then.status(502).body("bad gateway");
        })
        .await;

    let (service, _guard) = service_for(&server);
    let error = service.exercises_by_muscle(7).await.unwrap_err();

    assert_eq!(error.upstream_status(), Some(502));
}

#[tokio::test]
async fn stretches_split_into_pre_and_post_by_name() {
    let server = MockServer::start_async().await;

    let _mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/newapi/exercise/exercises/")
                .query_param("category", "8")
                .query_param("muscles_primary", "8")
                .query_param("limit", "30");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "count": 3,
                    "results": [
                        musclewiki_exercise(30, "Standing Leg Swing"),
                        musclewiki_exercise(31, "Seated Hamstring Stretch"),
                        musclewiki_exercise(32, "Lying Hamstring Hold")
                    ]
                }));
        })
        .await;

    let (service, _guard) = service_for(&server);
    let response = service.stretches_by_muscle(8).await.unwrap();

    assert_eq!(response.count, 3);
    assert_eq!(response.pre_workout.len(), 1);
    assert_eq!(response.pre_workout[0].exercise.name, "Standing Leg Swing");
    assert_eq!(response.pre_workout[0].duration, "30-60 seconds");
    assert_eq!(response.post_workout.len(), 2);
    assert_eq!(response.post_workout[0].duration, "20-30 seconds");
}

#[tokio::test]
async fn all_static_stretches_are_rebalanced() {
    let server = MockServer::start_async().await;

    let _mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/newapi/exercise/exercises/");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "count": 3,
                    "results": [
                        musclewiki_exercise(40, "Seated Stretch A"),
                        musclewiki_exercise(41, "Seated Stretch B"),
                        musclewiki_exercise(42, "Seated Stretch C")
                    ]
                }));
        })
        .await;

    let (service, _guard) = service_for(&server);
    let response = service.stretches_by_muscle(12).await.unwrap();

    // Ceil(3 / 2) = 2 promoted to warm-up, 1 left for cool-down.
    assert_eq!(response.pre_workout.len(), 2);
    assert_eq!(response.post_workout.len(), 1);
    assert!(response
        .pre_workout
        .iter()
        .all(|stretch| stretch.duration == "30-60 seconds"));
}

#[tokio::test]
async fn body_part_exercises_rewrite_gif_urls_to_local_proxy() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/exercises/bodyPart/chest")
                .query_param("limit", "50")
                .header("X-RapidAPI-Key", "test-rapidapi-key");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([
                    {
                        "id": "0001",
                        "name": "band bench press",
                        "bodyPart": "chest",
                        "target": "pectorals",
                        "equipment": "band",
                        "secondaryMuscles": ["triceps"],
                        "instructions": ["Lie on the bench"]
                    }
                ]));
        })
        .await;

    let (service, _guard) = service_for(&server);
    let exercises = service.exercises_by_body_part("chest").await.unwrap();

    mock.assert_async().await;
    assert_eq!(exercises.len(), 1);
    assert_eq!(
        exercises[0].gif_url.as_deref(),
        Some("/api/exercises/gif/0001")
    );
    assert_eq!(exercises[0].body_part, "chest");
}

#[tokio::test]
async fn missing_rapidapi_key_is_reported() {
    let server = MockServer::start_async().await;
    let dir = TempDir::new().unwrap();
    let pool = DbPool::new(dir.path().join("library.db")).unwrap();
    let service =
        LibraryService::with_endpoints(pool, server.base_url(), server.base_url(), None).unwrap();

    let error = service.exercises_by_body_part("back").await.unwrap_err();
    assert!(error.to_string().contains("RapidAPI Key"));
}

#[tokio::test]
async fn exercise_gif_streams_bytes_and_content_type() {
    let server = MockServer::start_async().await;

    let _mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/image/0001")
                .header("X-RapidAPI-Key", "test-rapidapi-key");
            then.status(200)
                .header("content-type", "image/gif")
                .body("GIF89a-fake-bytes");
        })
        .await;

    let (service, _guard) = service_for(&server);
    let (bytes, content_type) = service.exercise_gif("0001").await.unwrap();

    assert_eq!(content_type, "image/gif");
    assert_eq!(bytes, b"GIF89a-fake-bytes");
}
