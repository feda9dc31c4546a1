use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use nunzio_core::domain::exercise::{Exercise, ExerciseId};
use nunzio_core::domain::interaction::InteractionLogEntry;
use nunzio_core::domain::principle::TrainingPrinciple;
use nunzio_core::domain::workout::{
    CloneOverrides, ClonedSession, DeleteTarget, ExerciseHistory, NewSet, SessionDetail,
    SessionId, UserId, WorkoutTotals,
};

pub mod exercise;
pub mod interaction;
pub mod principle;
pub mod workout;

pub use exercise::SqlExerciseRepository;
pub use interaction::SqlInteractionLogRepository;
pub use principle::SqlPrincipleRepository;
pub use workout::SqlWorkoutRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    /// Absent, or owned by another user. The two are never distinguished.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid write: {0}")]
    Invalid(String),
}

#[async_trait]
pub trait ExerciseRepository: Send + Sync {
    /// Whole catalog in id order.
    async fn list(&self) -> Result<Vec<Exercise>, RepositoryError>;
    async fn find_by_id(&self, id: ExerciseId) -> Result<Option<Exercise>, RepositoryError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Exercise>, RepositoryError>;
    /// Inserts unless a case-insensitive name match exists; returns the stored row either way.
    async fn upsert(
        &self,
        name: &str,
        muscle_group: &str,
        guidance: Option<&str>,
    ) -> Result<Exercise, RepositoryError>;
}

#[async_trait]
pub trait PrincipleRepository: Send + Sync {
    async fn top_by_priority(&self, limit: u32) -> Result<Vec<TrainingPrinciple>, RepositoryError>;
    async fn by_category(&self, category: &str)
        -> Result<Vec<TrainingPrinciple>, RepositoryError>;
    async fn insert(
        &self,
        category: &str,
        title: &str,
        content: &str,
        priority: i64,
    ) -> Result<TrainingPrinciple, RepositoryError>;
}

#[async_trait]
pub trait WorkoutRepository: Send + Sync {
    /// Writes the session and all of its sets in one transaction. The returned
    /// detail lists the sets in the order they were given.
    async fn create_session_with_sets(
        &self,
        user_id: &UserId,
        performed_at: DateTime<Utc>,
        notes: Option<&str>,
        sets: &[NewSet],
    ) -> Result<SessionDetail, RepositoryError>;

    async fn session_detail(
        &self,
        user_id: &UserId,
        session_id: SessionId,
    ) -> Result<Option<SessionDetail>, RepositoryError>;

    async fn recent_sessions(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<SessionDetail>, RepositoryError>;

    async fn history_for_exercise(
        &self,
        user_id: &UserId,
        exercise: &Exercise,
        limit: u32,
    ) -> Result<ExerciseHistory, RepositoryError>;

    async fn delete_session(
        &self,
        user_id: &UserId,
        target: DeleteTarget,
    ) -> Result<SessionDetail, RepositoryError>;

    async fn clone_latest_session(
        &self,
        user_id: &UserId,
        overrides: &CloneOverrides,
        performed_at: DateTime<Utc>,
    ) -> Result<ClonedSession, RepositoryError>;

    async fn totals(&self, user_id: &UserId) -> Result<WorkoutTotals, RepositoryError>;

    async fn session_times_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, RepositoryError>;
}

#[async_trait]
pub trait InteractionLogRepository: Send + Sync {
    async fn append(&self, entry: &InteractionLogEntry) -> Result<i64, RepositoryError>;
    async fn recent_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<InteractionLogEntry>, RepositoryError>;
}

/// Fixed-width UTC text so that lexical order matches chronological order.
pub(crate) fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc)).map_err(|err| {
        RepositoryError::Decode(format!("invalid {} timestamp '{}': {}", field, value, err))
    })
}

pub(crate) fn decode<T>(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    use sqlx::Row;
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}
