use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use getfit::db::DbPool;
use getfit::error::AppError;
use getfit::models::tracker::{
    DailyNoteUpsert, Mood, ProgressPhotoInsert, WeightEntryUpsert, WeightUnit, WorkoutStatus,
};
use getfit::services::export_service::ExportService;
use getfit::services::schedule_service::ScheduleService;
use getfit::services::settings_service::{SettingsService, SettingsUpdateInput};
use getfit::services::tracker_service::TrackerService;

struct Harness {
    tracker: TrackerService,
    schedule: ScheduleService,
    settings: Arc<SettingsService>,
    export: ExportService,
    _guard: TempDir,
}

fn setup() -> Harness {
    let dir = TempDir::new().unwrap();
    let pool = DbPool::new(dir.path().join("getfit.sqlite")).unwrap();
    let settings = Arc::new(SettingsService::new(pool.clone()).unwrap());
    Harness {
        tracker: TrackerService::new(pool.clone()),
        schedule: ScheduleService::new(pool.clone(), Arc::clone(&settings)),
        export: ExportService::new(pool, Arc::clone(&settings)),
        settings,
        _guard: dir,
    }
}

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

#[test]
fn a_week_of_tracking_flows_through_every_store() {
    let harness = setup();
    let anchor = date("2025-05-11");

    // Rotate the schedule so "today" is the rest day.
    harness
        .settings
        .update(SettingsUpdateInput {
            rotation_offset: Some(3),
            ..Default::default()
        })
        .unwrap();

    // Log a week: workouts done Monday through Saturday, rest Sunday.
    for day in [
        "2025-05-05",
        "2025-05-06",
        "2025-05-07",
        "2025-05-08",
        "2025-05-09",
        "2025-05-10",
    ] {
        harness
            .tracker
            .set_status(day, Some(WorkoutStatus::Done))
            .unwrap();
    }
    harness
        .tracker
        .set_status("2025-05-11", Some(WorkoutStatus::Rest))
        .unwrap();

    // Weight on Monday and Sunday, note and photo along the way.
    harness
        .tracker
        .set_weight(
            "2025-05-05",
            WeightEntryUpsert {
                weight: 84.2,
                unit: WeightUnit::Kg,
            },
        )
        .unwrap();
    harness
        .tracker
        .set_weight(
            "2025-05-11",
            WeightEntryUpsert {
                weight: 83.6,
                unit: WeightUnit::Kg,
            },
        )
        .unwrap();
    harness
        .tracker
        .set_note(
            "2025-05-09",
            DailyNoteUpsert {
                note: "PR on deadlift".into(),
                mood: Some(Mood::Great),
            },
        )
        .unwrap();
    harness
        .tracker
        .add_photo(ProgressPhotoInsert {
            entry_date: "2025-05-11".into(),
            data_url: "data:image/jpeg;base64,AAAA".into(),
            note: Some("week 4".into()),
        })
        .unwrap();

    // Calendar sees the completions and the rest status.
    let grid = harness.schedule.month_grid(2025, 5, Some(anchor)).unwrap();
    let completed: Vec<_> = grid
        .days
        .iter()
        .filter(|day| day.completed)
        .map(|day| day.date.clone())
        .collect();
    assert_eq!(completed.len(), 6);
    assert!(completed.contains(&"2025-05-05".to_string()));

    let sunday = grid
        .days
        .iter()
        .find(|day| day.date == "2025-05-11")
        .unwrap();
    assert_eq!(sunday.status, Some(WorkoutStatus::Rest));
    assert!(!sunday.completed);
    assert!(sunday.template.is_rest);

    // Weekly summary: six workouts, streak broken by today's rest day at
    // zero... the streak counts backwards from today, which is a rest day.
    let summary = harness.tracker.weekly_summary(anchor).unwrap();
    assert_eq!(summary.workouts_completed, 6);
    assert_eq!(summary.streak_days, 0);
    assert_eq!(summary.latest_weight.as_ref().unwrap().weight, 83.6);
    let delta = summary.weight_delta.unwrap();
    assert!((delta + 0.6).abs() < 1e-9);

    // Export carries everything.
    let bundle = harness.export.build_bundle().unwrap();
    assert!(!bundle.bytes.is_empty());
}

#[test]
fn note_and_weight_lookups_are_per_date() {
    let harness = setup();

    harness
        .tracker
        .set_note(
            "2025-05-05",
            DailyNoteUpsert {
                note: "first".into(),
                mood: None,
            },
        )
        .unwrap();
    harness
        .tracker
        .set_note(
            "2025-05-05",
            DailyNoteUpsert {
                note: "revised".into(),
                mood: Some(Mood::Tired),
            },
        )
        .unwrap();

    let note = harness.tracker.get_note("2025-05-05").unwrap().unwrap();
    assert_eq!(note.note, "revised");
    assert_eq!(note.mood, Some(Mood::Tired));
    assert!(harness.tracker.get_note("2025-05-06").unwrap().is_none());

    let listed = harness
        .tracker
        .list_notes("2025-05-01", "2025-05-31")
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[test]
fn deleting_missing_records_reports_not_found() {
    let harness = setup();

    assert!(matches!(
        harness.tracker.delete_weight("2025-05-05"),
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        harness.tracker.delete_note("2025-05-05"),
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        harness.tracker.delete_photo("missing-id"),
        Err(AppError::NotFound)
    ));
}

#[test]
fn malformed_dates_are_rejected_across_stores() {
    let harness = setup();

    assert!(harness
        .tracker
        .set_weight(
            "05/05/2025",
            WeightEntryUpsert {
                weight: 80.0,
                unit: WeightUnit::Kg,
            },
        )
        .is_err());
    assert!(harness.tracker.get_note("yesterday").is_err());
    assert!(harness
        .tracker
        .set_status("2025-5-5", Some(WorkoutStatus::Done))
        .is_err());
}

#[test]
fn completion_streak_counts_consecutive_days_up_to_today() {
    let harness = setup();
    let anchor = date("2025-05-11");

    for day in ["2025-05-09", "2025-05-10", "2025-05-11"] {
        harness.tracker.toggle_completion(day).unwrap();
    }
    // A gap two days earlier does not extend the streak.
    harness.tracker.toggle_completion("2025-05-07").unwrap();

    let summary = harness.tracker.weekly_summary(anchor).unwrap();
    assert_eq!(summary.streak_days, 3);
    assert_eq!(summary.workouts_completed, 4);
}
