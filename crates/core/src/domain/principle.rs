use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrincipleId(pub i64);

/// Static coaching reference data. Lower `priority` sorts first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPrinciple {
    pub id: PrincipleId,
    pub category: String,
    pub title: String,
    pub content: String,
    pub priority: i64,
}
