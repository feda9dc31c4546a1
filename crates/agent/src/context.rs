//! Grounding text for coaching replies.
//!
//! Output depends only on stored data and the names passed in, so two builds
//! over the same state are byte-identical.

use nunzio_core::domain::exercise::{is_cardio_group, Exercise, CARDIO_MUSCLE_GROUP};
use nunzio_core::domain::principle::TrainingPrinciple;
use nunzio_core::domain::workout::{ExerciseHistory, UserId};
use nunzio_db::repositories::{
    ExerciseRepository, PrincipleRepository, RepositoryError, WorkoutRepository,
};
use nunzio_db::RecordStore;

use crate::resolver::ExerciseResolver;

pub const PRINCIPLE_LIMIT: u32 = 6;
pub const HISTORY_SET_LIMIT: u32 = 10;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct CoachingContextBuilder {
    store: RecordStore,
    resolver: ExerciseResolver,
}

impl CoachingContextBuilder {
    pub fn new(store: RecordStore) -> Self {
        let resolver = ExerciseResolver::new(store.exercises.clone());
        Self { store, resolver }
    }

    pub async fn build(
        &self,
        user_id: &UserId,
        exercises: &[String],
        muscle_groups: &[String],
    ) -> Result<String, RepositoryError> {
        let matched = self.matched_exercises(exercises, muscle_groups).await?;
        let has_cardio = matched.iter().any(Exercise::is_cardio)
            || muscle_groups.iter().any(|group| is_cardio_group(group));

        let mut principles = self.store.principles.top_by_priority(PRINCIPLE_LIMIT).await?;
        if has_cardio {
            for principle in self.store.principles.by_category(CARDIO_MUSCLE_GROUP).await? {
                if !principles.iter().any(|existing| existing.id == principle.id) {
                    principles.push(principle);
                }
            }
        }

        let mut histories = Vec::with_capacity(matched.len());
        for exercise in &matched {
            histories.push(
                self.store.workouts.history_for_exercise(user_id, exercise, HISTORY_SET_LIMIT).await?,
            );
        }

        let sections = [
            principles_section(&principles),
            exercises_section(&matched),
            guidance_section(&matched),
            history_section(&histories),
        ];
        Ok(sections.into_iter().flatten().collect::<Vec<_>>().join("\n\n"))
    }

    /// Named exercises first, in the order given, then the rest of any
    /// mentioned muscle group by catalog id. Lookups are read-only.
    async fn matched_exercises(
        &self,
        exercises: &[String],
        muscle_groups: &[String],
    ) -> Result<Vec<Exercise>, RepositoryError> {
        let mut matched: Vec<Exercise> = Vec::new();
        for name in exercises {
            if let Some(exercise) = self.resolver.lookup(name).await? {
                if !matched.iter().any(|existing| existing.id == exercise.id) {
                    matched.push(exercise);
                }
            }
        }

        if !muscle_groups.is_empty() {
            let catalog = self.store.exercises.list().await?;
            for exercise in catalog {
                let in_group = muscle_groups
                    .iter()
                    .any(|group| group.trim().eq_ignore_ascii_case(&exercise.muscle_group));
                if in_group && !matched.iter().any(|existing| existing.id == exercise.id) {
                    matched.push(exercise);
                }
            }
        }

        Ok(matched)
    }
}

fn principles_section(principles: &[TrainingPrinciple]) -> Option<String> {
    if principles.is_empty() {
        return None;
    }
    let mut lines = vec!["TRAINING PRINCIPLES:".to_string()];
    lines.extend(principles.iter().map(|principle| {
        format!("[{}] {}: {}", principle.category, principle.title, principle.content)
    }));
    Some(lines.join("\n"))
}

fn exercises_section(exercises: &[Exercise]) -> Option<String> {
    if exercises.is_empty() {
        return None;
    }
    let mut lines = vec!["EXERCISES:".to_string()];
    lines.extend(
        exercises.iter().map(|exercise| format!("- {} ({})", exercise.name, exercise.muscle_group)),
    );
    Some(lines.join("\n"))
}

fn guidance_section(exercises: &[Exercise]) -> Option<String> {
    let lines: Vec<String> = exercises
        .iter()
        .filter_map(|exercise| {
            exercise
                .guidance
                .as_deref()
                .filter(|guidance| !guidance.trim().is_empty())
                .map(|guidance| format!("- {}: {}", exercise.name, guidance.trim()))
        })
        .collect();
    if lines.is_empty() {
        return None;
    }
    Some(format!("GUIDANCE:\n{}", lines.join("\n")))
}

fn history_section(histories: &[ExerciseHistory]) -> Option<String> {
    if histories.is_empty() {
        return None;
    }
    let mut lines = vec!["RECENT HISTORY:".to_string()];
    for history in histories {
        lines.push(format!("{}:", history.exercise.name));
        if history.is_empty() {
            lines.push("  no sets logged yet".to_string());
            continue;
        }
        for session in &history.sessions {
            lines.push(format!(
                "  {} (session #{}):",
                session.performed_at.format(DATE_FORMAT),
                session.session_id
            ));
            for set in &session.sets {
                let mut line = format!("    set {}: {}", set.set_number, set.describe());
                if let Some(notes) = set.notes.as_deref().filter(|notes| !notes.trim().is_empty()) {
                    line.push_str(&format!(" ({})", notes.trim()));
                }
                if history.is_record_set(set.id) {
                    line.push_str(" [PR]");
                }
                lines.push(line);
            }
        }
        if let Some(record) = &history.personal_record {
            let reps = record.reps.map(|reps| format!(" x {reps} reps")).unwrap_or_default();
            lines.push(format!(
                "  PR: {}{} ({})",
                record.metric,
                reps,
                record.performed_at.format(DATE_FORMAT)
            ));
        }
    }
    Some(lines.join("\n"))
}
