use sqlx::sqlite::SqliteRow;

use nunzio_core::domain::principle::{PrincipleId, TrainingPrinciple};

use super::{decode, PrincipleRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPrincipleRepository {
    pool: DbPool,
}

impl SqlPrincipleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_principle(row: &SqliteRow) -> Result<TrainingPrinciple, RepositoryError> {
    Ok(TrainingPrinciple {
        id: PrincipleId(decode(row, "id")?),
        category: decode(row, "category")?,
        title: decode(row, "title")?,
        content: decode(row, "content")?,
        priority: decode(row, "priority")?,
    })
}

#[async_trait::async_trait]
impl PrincipleRepository for SqlPrincipleRepository {
    async fn top_by_priority(&self, limit: u32) -> Result<Vec<TrainingPrinciple>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, category, title, content, priority
             FROM training_principles
             ORDER BY priority ASC, id ASC
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_principle).collect()
    }

    async fn by_category(
        &self,
        category: &str,
    ) -> Result<Vec<TrainingPrinciple>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, category, title, content, priority
             FROM training_principles
             WHERE category = ? COLLATE NOCASE
             ORDER BY priority ASC, id ASC",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_principle).collect()
    }

    async fn insert(
        &self,
        category: &str,
        title: &str,
        content: &str,
        priority: i64,
    ) -> Result<TrainingPrinciple, RepositoryError> {
        let id = sqlx::query(
            "INSERT INTO training_principles (category, title, content, priority) VALUES (?, ?, ?, ?)",
        )
        .bind(category)
        .bind(title)
        .bind(content)
        .bind(priority)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(TrainingPrinciple {
            id: PrincipleId(id),
            category: category.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            priority,
        })
    }
}
