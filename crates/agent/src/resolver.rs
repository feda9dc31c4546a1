use std::sync::Arc;

use tracing::info;

use nunzio_core::catalog::{best_match, exact_match};
use nunzio_core::domain::exercise::{Exercise, GENERAL_MUSCLE_GROUP};
use nunzio_db::repositories::{ExerciseRepository, RepositoryError};

#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub exercise: Exercise,
    /// False when the exercise was created on the spot.
    pub matched: bool,
    /// `Catalog Name (from "raw name")`, only for similarity matches.
    pub mapping: Option<String>,
}

impl Resolution {
    pub fn display_name(&self) -> &str {
        self.mapping.as_deref().unwrap_or(&self.exercise.name)
    }
}

/// Maps free-text exercise names onto the catalog.
#[derive(Clone)]
pub struct ExerciseResolver {
    exercises: Arc<dyn ExerciseRepository>,
}

impl ExerciseResolver {
    pub fn new(exercises: Arc<dyn ExerciseRepository>) -> Self {
        Self { exercises }
    }

    /// Exact name, then closest similar name, then a new catalog entry.
    pub async fn resolve(
        &self,
        raw_name: &str,
        muscle_group_hint: Option<&str>,
    ) -> Result<Resolution, RepositoryError> {
        let raw_name = raw_name.trim();
        let catalog = self.exercises.list().await?;

        if let Some(exercise) = exact_match(&catalog, raw_name) {
            return Ok(Resolution { exercise: exercise.clone(), matched: true, mapping: None });
        }

        if let Some(candidate) = best_match(&catalog, raw_name) {
            return Ok(Resolution {
                exercise: candidate.exercise.clone(),
                matched: true,
                mapping: Some(format!("{} (from \"{}\")", candidate.exercise.name, raw_name)),
            });
        }

        let muscle_group = muscle_group_hint
            .map(str::trim)
            .filter(|group| !group.is_empty())
            .unwrap_or(GENERAL_MUSCLE_GROUP)
            .to_lowercase();
        let exercise = self.exercises.upsert(raw_name, &muscle_group, None).await?;
        info!(
            event_name = "agent.exercise.created",
            exercise_id = %exercise.id,
            name = %exercise.name,
            muscle_group = %exercise.muscle_group,
            "added exercise to catalog"
        );
        Ok(Resolution { exercise, matched: false, mapping: None })
    }

    /// Same matching as [`resolve`](Self::resolve) but never writes.
    pub async fn lookup(&self, raw_name: &str) -> Result<Option<Exercise>, RepositoryError> {
        let catalog = self.exercises.list().await?;
        let raw_name = raw_name.trim();
        Ok(exact_match(&catalog, raw_name)
            .or_else(|| best_match(&catalog, raw_name).map(|candidate| candidate.exercise))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nunzio_db::repositories::{ExerciseRepository, SqlExerciseRepository};
    use nunzio_db::{connect_with_settings, migrations};

    use super::ExerciseResolver;

    async fn setup() -> (Arc<SqlExerciseRepository>, ExerciseResolver) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = Arc::new(SqlExerciseRepository::new(pool));
        repo.upsert("Bench Press", "chest", None).await.expect("bench");
        repo.upsert("Dumbbell Flyes", "chest", None).await.expect("flyes");
        repo.upsert("Running", "cardio", None).await.expect("running");
        (repo.clone(), ExerciseResolver::new(repo))
    }

    #[tokio::test]
    async fn exact_names_resolve_without_mapping() {
        let (_, resolver) = setup().await;
        let resolution = resolver.resolve("BENCH PRESS", None).await.expect("resolve");

        assert!(resolution.matched);
        assert_eq!(resolution.exercise.name, "Bench Press");
        assert_eq!(resolution.mapping, None);
        assert_eq!(resolution.display_name(), "Bench Press");
    }

    #[tokio::test]
    async fn similar_names_resolve_with_mapping() {
        let (repo, resolver) = setup().await;
        let resolution = resolver.resolve("dumbbell fly", None).await.expect("resolve");

        assert!(resolution.matched);
        assert_eq!(resolution.exercise.name, "Dumbbell Flyes");
        assert_eq!(resolution.display_name(), "Dumbbell Flyes (from \"dumbbell fly\")");
        assert_eq!(repo.list().await.expect("list").len(), 3);
    }

    #[tokio::test]
    async fn unknown_names_create_one_general_entry() {
        let (repo, resolver) = setup().await;
        let first = resolver.resolve("purple band chest pull", None).await.expect("first");
        let second = resolver.resolve("Purple Band Chest Pull", None).await.expect("second");

        assert!(!first.matched);
        assert_eq!(first.exercise.muscle_group, "general");
        assert_eq!(first.exercise.name, "purple band chest pull");
        assert_eq!(second.exercise.id, first.exercise.id);
        assert_eq!(repo.list().await.expect("list").len(), 4);
    }

    #[tokio::test]
    async fn muscle_group_hint_is_used_for_new_entries() {
        let (_, resolver) = setup().await;
        let resolution = resolver.resolve("Elliptical", Some("Cardio")).await.expect("resolve");
        assert_eq!(resolution.exercise.muscle_group, "cardio");
        assert!(resolution.exercise.is_cardio());
    }

    #[tokio::test]
    async fn lookup_never_creates_entries() {
        let (repo, resolver) = setup().await;
        assert!(resolver.lookup("purple band chest pull").await.expect("lookup").is_none());
        assert_eq!(
            resolver.lookup("dumbbell fly").await.expect("lookup").map(|exercise| exercise.name),
            Some("Dumbbell Flyes".to_string())
        );
        assert_eq!(repo.list().await.expect("list").len(), 3);
    }
}
