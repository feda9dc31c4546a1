use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    LogWorkout,
    ViewStats,
    Coaching,
    DeleteWorkout,
    RepeatLast,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LogWorkout => "log_workout",
            Self::ViewStats => "view_stats",
            Self::Coaching => "coaching",
            Self::DeleteWorkout => "delete_workout",
            Self::RepeatLast => "repeat_last",
        }
    }

    /// Unknown labels are coaching, the catch-all intent.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "log_workout" => Self::LogWorkout,
            "view_stats" => Self::ViewStats,
            "delete_workout" => Self::DeleteWorkout,
            "repeat_last" => Self::RepeatLast,
            _ => Self::Coaching,
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Service,
    KeywordFallback,
}

impl std::fmt::Display for ClassificationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Service => "service",
            Self::KeywordFallback => "keyword_fallback",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: IntentKind,
    pub confidence: f64,
    pub exercises: Vec<String>,
    pub muscle_groups: Vec<String>,
    pub source: ClassificationSource,
}

impl Classification {
    pub fn new(kind: IntentKind, confidence: f64, source: ClassificationSource) -> Self {
        Self {
            kind,
            confidence: clamp_confidence(confidence),
            exercises: Vec::new(),
            muscle_groups: Vec::new(),
            source,
        }
    }
}

pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        return 0.0;
    }
    confidence.clamp(0.0, 1.0)
}

fn default_set_number() -> u32 {
    1
}

/// One set as reported by the extraction service, before any resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSet {
    pub exercise_name: String,
    #[serde(default = "default_set_number", deserialize_with = "lenient_set_number")]
    pub set_number: u32,
    #[serde(default, deserialize_with = "lenient_reps")]
    pub reps: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub weight_unit: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ExtractedSet {
    pub fn is_cardio(&self) -> bool {
        self.duration_minutes.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedWorkout {
    #[serde(default)]
    pub sets: Vec<ExtractedSet>,
    /// Calendar day the workout happened on, when the message names one.
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
}

// A malformed date is dropped rather than failing the whole extraction.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|value| NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()))
}

// Models send counts as `10`, `10.0`, `"10"` or `null`; anything that is not a
// whole non-negative number reads as absent.
fn count_value(raw: Option<&serde_json::Value>) -> Option<u32> {
    let value = raw?;
    if let Some(count) = value.as_u64() {
        return u32::try_from(count).ok();
    }
    let number = value.as_f64().or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))?;
    (number.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&number)).then(|| number as u32)
}

fn lenient_set_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(count_value(raw.as_ref()).filter(|number| *number >= 1).unwrap_or_else(default_set_number))
}

fn lenient_reps<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(count_value(raw.as_ref()))
}

/// Entities from classification passed back to extraction as context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractionHints {
    pub exercises: Vec<String>,
    pub muscle_groups: Vec<String>,
}
