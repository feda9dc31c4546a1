use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CARDIO_MUSCLE_GROUP: &str = "cardio";
pub const GENERAL_MUSCLE_GROUP: &str = "general";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExerciseId(pub i64);

impl std::fmt::Display for ExerciseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog entry. Names are unique without regard to case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: ExerciseId,
    pub name: String,
    pub muscle_group: String,
    pub guidance: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Exercise {
    pub fn is_cardio(&self) -> bool {
        is_cardio_group(&self.muscle_group)
    }
}

pub fn is_cardio_group(muscle_group: &str) -> bool {
    muscle_group.trim().eq_ignore_ascii_case(CARDIO_MUSCLE_GROUP)
}
