use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::exercise::{Exercise, ExerciseId};

pub const KG_TO_LBS: f64 = 2.20462;

/// Opaque per-user scope. Every session and set read or write is keyed by it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub i64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SetId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    Lbs,
    Kg,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lbs => "lbs",
            Self::Kg => "kg",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().trim_end_matches('.') {
            "lb" | "lbs" | "pound" | "pounds" => Some(Self::Lbs),
            "kg" | "kgs" | "kilo" | "kilos" | "kilogram" | "kilograms" => Some(Self::Kg),
            _ => None,
        }
    }
}

impl std::fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External load on a set. Carrying the unit with the amount keeps a weight
/// from ever being stored without one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub amount: f64,
    pub unit: WeightUnit,
}

impl Load {
    pub fn new(amount: f64, unit: WeightUnit) -> Self {
        Self { amount, unit }
    }

    pub fn lbs(amount: f64) -> Self {
        Self::new(amount, WeightUnit::Lbs)
    }

    pub fn in_lbs(&self) -> f64 {
        match self.unit {
            WeightUnit::Lbs => self.amount,
            WeightUnit::Kg => self.amount * KG_TO_LBS,
        }
    }
}

impl std::fmt::Display for Load {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", format_quantity(self.amount), self.unit)
    }
}

/// Renders whole numbers without a trailing `.0`.
pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let rendered = format!("{value:.2}");
        rendered.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub performed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// A set ready to be written; ids are assigned by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewSet {
    pub exercise_id: ExerciseId,
    pub set_number: u32,
    pub reps: Option<u32>,
    pub load: Option<Load>,
    pub duration_minutes: Option<f64>,
    pub distance: Option<f64>,
    pub raw_exercise_name: String,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSet {
    pub id: SetId,
    pub session_id: SessionId,
    pub exercise_id: ExerciseId,
    pub set_number: u32,
    pub reps: Option<u32>,
    pub load: Option<Load>,
    pub duration_minutes: Option<f64>,
    pub distance: Option<f64>,
    pub raw_exercise_name: String,
    pub notes: Option<String>,
}

impl WorkoutSet {
    pub fn is_cardio(&self) -> bool {
        self.duration_minutes.is_some()
    }

    pub fn volume_lbs(&self) -> f64 {
        match (self.load, self.reps) {
            (Some(load), Some(reps)) => load.in_lbs() * f64::from(reps),
            _ => 0.0,
        }
    }

    /// Short human rendering: `10 reps @ 135 lbs`, `30 min, 3 mi`.
    pub fn describe(&self) -> String {
        if let Some(minutes) = self.duration_minutes {
            let mut parts = vec![format!("{} min", format_quantity(minutes))];
            if let Some(distance) = self.distance {
                parts.push(format!("{} mi", format_quantity(distance)));
            }
            return parts.join(", ");
        }

        let reps = self.reps.map(|reps| format!("{reps} reps")).unwrap_or_else(|| "? reps".into());
        match (self.load, self.distance) {
            (Some(load), _) => format!("{reps} @ {load}"),
            (None, Some(distance)) => format!("{reps}, {} mi", format_quantity(distance)),
            (None, None) => format!("{reps} @ bodyweight"),
        }
    }
}

/// A stored set joined with its catalog entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggedSet {
    pub set: WorkoutSet,
    pub exercise_name: String,
    pub muscle_group: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    pub session: WorkoutSession,
    pub sets: Vec<LoggedSet>,
}

impl SessionDetail {
    /// Distinct exercise names in set order.
    pub fn exercise_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for logged in &self.sets {
            if !names.contains(&logged.exercise_name) {
                names.push(logged.exercise_name.clone());
            }
        }
        names
    }

    pub fn volume_lbs(&self) -> f64 {
        self.sets.iter().map(|logged| logged.set.volume_lbs()).sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum RecordMetric {
    Weight(Load),
    Distance(f64),
}

impl std::fmt::Display for RecordMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weight(load) => write!(f, "{load}"),
            Self::Distance(distance) => write!(f, "{} mi", format_quantity(*distance)),
        }
    }
}

/// Best set for an exercise across the user's full history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecord {
    pub set_id: SetId,
    pub session_id: SessionId,
    pub performed_at: DateTime<Utc>,
    pub metric: RecordMetric,
    pub reps: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistorySession {
    pub session_id: SessionId,
    pub performed_at: DateTime<Utc>,
    pub sets: Vec<WorkoutSet>,
}

impl HistorySession {
    pub fn top_load_lbs(&self) -> Option<f64> {
        self.sets.iter().filter_map(|set| set.load.map(|load| load.in_lbs())).reduce(f64::max)
    }
}

/// Recent sets for one exercise grouped by session, newest session first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExerciseHistory {
    pub exercise: Exercise,
    pub sessions: Vec<HistorySession>,
    pub personal_record: Option<PersonalRecord>,
}

impl ExerciseHistory {
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn is_record_set(&self, set_id: SetId) -> bool {
        self.personal_record.as_ref().is_some_and(|record| record.set_id == set_id)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTotals {
    pub sessions: u64,
    pub sets: u64,
    pub volume_lbs: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteTarget {
    Last,
    Session(SessionId),
}

/// Largest repeat count a single request may ask for.
pub const MAX_REPEAT_TIMES: u32 = 10;

/// Adjustments applied while cloning the latest session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CloneOverrides {
    pub load: Option<Load>,
    pub times: u32,
    pub note: Option<String>,
}

impl Default for CloneOverrides {
    fn default() -> Self {
        Self { load: None, times: 1, note: None }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClonedSession {
    pub source_session_id: SessionId,
    pub session: SessionDetail,
}
