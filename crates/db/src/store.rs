use std::sync::Arc;

use crate::repositories::{
    ExerciseRepository, InteractionLogRepository, PrincipleRepository, SqlExerciseRepository,
    SqlInteractionLogRepository, SqlPrincipleRepository, SqlWorkoutRepository, WorkoutRepository,
};
use crate::DbPool;

/// The repositories a message handler needs, shareable across tasks.
#[derive(Clone)]
pub struct RecordStore {
    pub exercises: Arc<dyn ExerciseRepository>,
    pub principles: Arc<dyn PrincipleRepository>,
    pub workouts: Arc<dyn WorkoutRepository>,
    pub interactions: Arc<dyn InteractionLogRepository>,
}

impl RecordStore {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            exercises: Arc::new(SqlExerciseRepository::new(pool.clone())),
            principles: Arc::new(SqlPrincipleRepository::new(pool.clone())),
            workouts: Arc::new(SqlWorkoutRepository::new(pool.clone())),
            interactions: Arc::new(SqlInteractionLogRepository::new(pool)),
        }
    }
}
