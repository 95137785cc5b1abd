use serde::Serialize;

use crate::models::tracker::WorkoutStatus;

/// A muscle group as MuscleWiki identifies it. `muscle_id` 0 is the cardio
/// placeholder, which has no primary-muscle filter upstream.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MuscleTarget {
    pub id: &'static str,
    pub label: &'static str,
    pub muscle_id: u32,
}

pub const CHEST: MuscleTarget = MuscleTarget { id: "chest", label: "Chest", muscle_id: 2 };
pub const BACK: MuscleTarget = MuscleTarget { id: "back", label: "Back", muscle_id: 7 };
pub const SHOULDERS: MuscleTarget = MuscleTarget { id: "shoulders", label: "Shoulders", muscle_id: 6 };
pub const BICEPS: MuscleTarget = MuscleTarget { id: "biceps", label: "Biceps", muscle_id: 1 };
pub const TRICEPS: MuscleTarget = MuscleTarget { id: "triceps", label: "Triceps", muscle_id: 5 };
pub const LEGS: MuscleTarget = MuscleTarget { id: "legs", label: "Legs", muscle_id: 3 };
pub const GLUTES: MuscleTarget = MuscleTarget { id: "glutes", label: "Glutes", muscle_id: 9 };
pub const CORE: MuscleTarget = MuscleTarget { id: "abs", label: "Core", muscle_id: 12 };
pub const CARDIO: MuscleTarget = MuscleTarget { id: "cardio", label: "Cardio", muscle_id: 0 };

/// Muscle groups offered by the workout browser UI.
pub const MUSCLE_GROUPS: &[MuscleTarget] = &[
    CHEST, BACK, SHOULDERS, BICEPS, TRICEPS, LEGS, GLUTES, CORE,
];

/// Full MuscleWiki primary-muscle id mapping, including groups that are only
/// reachable through coach search filters.
pub fn muscle_wiki_id(name: &str) -> Option<u32> {
    let id = match name.to_lowercase().as_str() {
        "chest" => 2,
        "back" => 7,
        "shoulders" => 6,
        "biceps" => 1,
        "triceps" => 5,
        "legs" => 3,
        "glutes" => 9,
        "hamstrings" => 8,
        "calves" => 11,
        "abs" | "core" => 12,
        "traps" => 4,
        "forearms" => 10,
        "lower back" => 13,
        _ => return None,
    };
    Some(id)
}

/// One slot of the repeating 7-day cycle.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutTemplate {
    pub name: &'static str,
    /// Color tag the calendar UI maps onto its palette.
    pub color: &'static str,
    pub is_rest: bool,
    pub muscles: &'static [MuscleTarget],
}

pub const WORKOUT_TEMPLATES: [WorkoutTemplate; 7] = [
    WorkoutTemplate {
        name: "Chest + Shoulders",
        color: "red",
        is_rest: false,
        muscles: &[CHEST, SHOULDERS],
    },
    WorkoutTemplate {
        name: "Back + Biceps",
        color: "blue",
        is_rest: false,
        muscles: &[BACK, BICEPS],
    },
    WorkoutTemplate {
        name: "Legs",
        color: "purple",
        is_rest: false,
        muscles: &[LEGS, GLUTES],
    },
    WorkoutTemplate {
        name: "Rest + Stretching",
        color: "cyan",
        is_rest: true,
        muscles: &[],
    },
    WorkoutTemplate {
        name: "Back + Core",
        color: "emerald",
        is_rest: false,
        muscles: &[BACK, CORE],
    },
    WorkoutTemplate {
        name: "Cardio",
        color: "rose",
        is_rest: false,
        muscles: &[CARDIO],
    },
    WorkoutTemplate {
        name: "Cardio + Core",
        color: "orange",
        is_rest: false,
        muscles: &[CARDIO, CORE],
    },
];

pub const TEMPLATE_COUNT: usize = WORKOUT_TEMPLATES.len();

/// A single resolved calendar day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledDay {
    pub date: String,
    pub weekday: &'static str,
    pub template_index: usize,
    pub template: WorkoutTemplate,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkoutStatus>,
}

/// 6x7 calendar grid with padding days from the surrounding months.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub month_name: &'static str,
    /// Sunday-first header labels for the grid columns.
    pub weekdays: [&'static str; 7],
    pub days: Vec<GridDay>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDay {
    pub date: String,
    pub day_of_month: u32,
    pub in_month: bool,
    pub is_today: bool,
    pub template_index: usize,
    pub template: WorkoutTemplate,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkoutStatus>,
}

pub const WEEKDAY_NAMES_SHORT: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];
