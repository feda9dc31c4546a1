use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use nunzio_core::domain::exercise::{Exercise, ExerciseId};

use super::{decode, encode_timestamp, parse_rfc3339, ExerciseRepository, RepositoryError};
use crate::DbPool;

const EXERCISE_COLUMNS: &str = "id, name, muscle_group, guidance, created_at";

pub struct SqlExerciseRepository {
    pool: DbPool,
}

impl SqlExerciseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_exercise(row: &SqliteRow) -> Result<Exercise, RepositoryError> {
    let created_at: String = decode(row, "created_at")?;
    Ok(Exercise {
        id: ExerciseId(decode(row, "id")?),
        name: decode(row, "name")?,
        muscle_group: decode(row, "muscle_group")?,
        guidance: decode(row, "guidance")?,
        created_at: parse_rfc3339("exercise created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl ExerciseRepository for SqlExerciseRepository {
    async fn list(&self) -> Result<Vec<Exercise>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {EXERCISE_COLUMNS} FROM exercises ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_exercise).collect()
    }

    async fn find_by_id(&self, id: ExerciseId) -> Result<Option<Exercise>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_exercise).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Exercise>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE name = ? COLLATE NOCASE"
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_exercise).transpose()
    }

    async fn upsert(
        &self,
        name: &str,
        muscle_group: &str,
        guidance: Option<&str>,
    ) -> Result<Exercise, RepositoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepositoryError::Invalid("exercise name must not be empty".to_string()));
        }

        // Concurrent identical requests race on the unique name; the loser's
        // insert is a no-op and both read back the same row.
        sqlx::query(
            "INSERT INTO exercises (name, muscle_group, guidance, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT DO NOTHING",
        )
        .bind(name)
        .bind(muscle_group)
        .bind(guidance)
        .bind(encode_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        self.find_by_name(name)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("exercise `{name}` after upsert")))
    }
}

#[cfg(test)]
mod tests {
    use super::SqlExerciseRepository;
    use crate::repositories::ExerciseRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlExerciseRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlExerciseRepository::new(pool)
    }

    #[tokio::test]
    async fn lookup_by_name_ignores_case() {
        let repo = setup().await;
        let created = repo.upsert("Bench Press", "chest", Some("Retract shoulder blades")).await.expect("upsert");

        let found = repo.find_by_name("BENCH PRESS").await.expect("find").expect("present");
        assert_eq!(found.id, created.id);
        assert_eq!(found.guidance.as_deref(), Some("Retract shoulder blades"));
        assert!(repo.find_by_name("bench").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn upsert_never_duplicates_names() {
        let repo = setup().await;
        let first = repo.upsert("Purple Band Chest Pull", "general", None).await.expect("first");
        let second = repo.upsert("purple band chest pull", "back", None).await.expect("second");

        assert_eq!(first.id, second.id);
        assert_eq!(second.muscle_group, "general");
        assert_eq!(repo.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn list_is_ordered_by_id() {
        let repo = setup().await;
        repo.upsert("Squat", "legs", None).await.expect("squat");
        repo.upsert("Deadlift", "back", None).await.expect("deadlift");

        let names: Vec<String> =
            repo.list().await.expect("list").into_iter().map(|exercise| exercise.name).collect();
        assert_eq!(names, vec!["Squat".to_string(), "Deadlift".to_string()]);
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let repo = setup().await;
        assert!(repo.upsert("   ", "general", None).await.is_err());
    }
}
