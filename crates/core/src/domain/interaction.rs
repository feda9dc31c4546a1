use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::intent::IntentKind;
use crate::domain::workout::UserId;

pub const RESPONSE_SUMMARY_MAX_CHARS: usize = 500;

/// One append-only row per processed message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionLogEntry {
    pub user_id: UserId,
    pub raw_message: String,
    pub classified_intent: IntentKind,
    pub confidence: f64,
    pub extracted_data: serde_json::Value,
    pub response_summary: String,
    pub created_at: DateTime<Utc>,
}

impl InteractionLogEntry {
    pub fn summarize_response(response: &str) -> String {
        response.chars().take(RESPONSE_SUMMARY_MAX_CHARS).collect()
    }
}
