use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use nunzio_core::domain::intent::IntentKind;
use nunzio_core::domain::interaction::InteractionLogEntry;
use nunzio_core::domain::workout::UserId;

use super::{decode, encode_timestamp, parse_rfc3339, InteractionLogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlInteractionLogRepository {
    pool: DbPool,
}

impl SqlInteractionLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: &SqliteRow) -> Result<InteractionLogEntry, RepositoryError> {
    let intent: String = decode(row, "classified_intent")?;
    let extracted: String = decode(row, "extracted_data")?;
    let created_at: String = decode(row, "created_at")?;

    Ok(InteractionLogEntry {
        user_id: UserId(decode(row, "user_id")?),
        raw_message: decode(row, "raw_message")?,
        classified_intent: IntentKind::from_label(&intent),
        confidence: decode(row, "confidence")?,
        extracted_data: serde_json::from_str(&extracted)
            .map_err(|e| RepositoryError::Decode(format!("invalid extracted_data: {e}")))?,
        response_summary: decode(row, "response_summary")?,
        created_at: parse_rfc3339("interaction created_at", &created_at)
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[async_trait::async_trait]
impl InteractionLogRepository for SqlInteractionLogRepository {
    async fn append(&self, entry: &InteractionLogEntry) -> Result<i64, RepositoryError> {
        let extracted = serde_json::to_string(&entry.extracted_data)
            .map_err(|e| RepositoryError::Invalid(format!("unserializable extracted_data: {e}")))?;

        let id = sqlx::query(
            "INSERT INTO interaction_log
                (user_id, raw_message, classified_intent, confidence, extracted_data,
                 response_summary, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.user_id.0)
        .bind(&entry.raw_message)
        .bind(entry.classified_intent.as_str())
        .bind(entry.confidence)
        .bind(extracted)
        .bind(InteractionLogEntry::summarize_response(&entry.response_summary))
        .bind(encode_timestamp(entry.created_at))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    async fn recent_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<InteractionLogEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT user_id, raw_message, classified_intent, confidence, extracted_data,
                    response_summary, created_at
             FROM interaction_log
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )
        .bind(&user_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_entry).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use nunzio_core::domain::intent::IntentKind;
    use nunzio_core::domain::interaction::{InteractionLogEntry, RESPONSE_SUMMARY_MAX_CHARS};
    use nunzio_core::domain::workout::UserId;

    use super::SqlInteractionLogRepository;
    use crate::repositories::InteractionLogRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlInteractionLogRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlInteractionLogRepository::new(pool)
    }

    fn entry(user: &str, response: String) -> InteractionLogEntry {
        InteractionLogEntry {
            user_id: UserId::new(user),
            raw_message: "show my stats".to_string(),
            classified_intent: IntentKind::ViewStats,
            confidence: 0.9,
            extracted_data: json!({"classification": {"kind": "view_stats"}}),
            response_summary: response,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn appended_rows_are_scoped_and_truncated() {
        let repo = setup().await;
        repo.append(&entry("alice", "x".repeat(RESPONSE_SUMMARY_MAX_CHARS + 50)))
            .await
            .expect("append alice");
        repo.append(&entry("bob", "Workout Stats".to_string())).await.expect("append bob");

        let rows = repo.recent_for_user(&UserId::new("alice"), 10).await.expect("recent");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].classified_intent, IntentKind::ViewStats);
        assert_eq!(rows[0].response_summary.chars().count(), RESPONSE_SUMMARY_MAX_CHARS);
        assert_eq!(rows[0].extracted_data["classification"]["kind"], "view_stats");
    }
}
