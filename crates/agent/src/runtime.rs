use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::json;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use nunzio_core::commentary::{log_comment, LoggedExercise, PriorPerformance};
use nunzio_core::config::AppConfig;
use nunzio_core::domain::exercise::{Exercise, ExerciseId};
use nunzio_core::domain::intent::{Classification, ExtractedSet, ExtractionHints, IntentKind};
use nunzio_core::domain::interaction::InteractionLogEntry;
use nunzio_core::domain::workout::{
    format_quantity, DeleteTarget, Load, LoggedSet, NewSet, RecordMetric, SessionDetail, UserId,
    WeightUnit,
};
use nunzio_core::errors::{ApplicationError, DomainError};
use nunzio_core::sets::{apply_rep_defaults, expand_sets, PreparedSet};
use nunzio_core::stats::{ConsistencyReport, CONSISTENCY_WINDOW_DAYS};
use nunzio_db::repositories::{InteractionLogRepository, RepositoryError, WorkoutRepository};
use nunzio_db::RecordStore;

use crate::context::{CoachingContextBuilder, HISTORY_SET_LIMIT};
use crate::conversation::{parse_delete_target, parse_repeat_modifiers};
use crate::llm::{LlmError, OpenAiCompatibleClient};
use crate::resolver::{ExerciseResolver, Resolution};
use crate::understanding::{LlmTextUnderstanding, RetryPolicy, TextUnderstanding};

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;
const RECENT_SESSIONS_SHOWN: u32 = 5;
const BODYWEIGHT_UNIT: &str = "bodyweight";

/// Reply plus whatever the interaction log should remember about it.
struct Reply {
    text: String,
    details: serde_json::Value,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), details: serde_json::Value::Null }
    }
}

/// Single entry point shared by every front end.
#[derive(Clone)]
pub struct MessageHandler {
    understanding: Arc<dyn TextUnderstanding>,
    store: RecordStore,
    resolver: ExerciseResolver,
    context: CoachingContextBuilder,
    min_confidence: f64,
    pending_logs: Arc<Mutex<JoinSet<()>>>,
}

impl MessageHandler {
    pub fn new(understanding: Arc<dyn TextUnderstanding>, store: RecordStore) -> Self {
        Self {
            understanding,
            resolver: ExerciseResolver::new(store.exercises.clone()),
            context: CoachingContextBuilder::new(store.clone()),
            store,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            pending_logs: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Wires the configured language model behind the handler.
    pub fn from_config(config: &AppConfig, store: RecordStore) -> Result<Self, LlmError> {
        let client = OpenAiCompatibleClient::from_config(&config.llm)?;
        let understanding =
            LlmTextUnderstanding::new(Arc::new(client), RetryPolicy::from_config(&config.llm));
        Ok(Self::new(Arc::new(understanding), store)
            .with_min_confidence(config.routing.min_confidence))
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Handles one message. `verbose` only appends a diagnostics line.
    pub async fn process(&self, text: &str, user_id: &UserId, verbose: bool) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        let classification = self.understanding.classify(text).await;
        let routed = self.route(&classification);
        info!(
            event_name = "agent.message.routed",
            correlation_id = %correlation_id,
            user_id = %user_id,
            classified = %classification.kind,
            routed = %routed,
            confidence = classification.confidence,
            "message routed"
        );

        let outcome = match routed {
            IntentKind::LogWorkout => self.log_workout(text, user_id, &classification).await,
            IntentKind::ViewStats => self.view_stats(user_id).await,
            IntentKind::DeleteWorkout => self.delete_workout(text, user_id).await,
            IntentKind::RepeatLast => self.repeat_last(text, user_id).await,
            IntentKind::Coaching => self.coaching(text, user_id, &classification).await,
        };

        let reply = match outcome {
            Ok(reply) => reply,
            Err(failure) => {
                error!(
                    event_name = "agent.message.failed",
                    correlation_id = %correlation_id,
                    intent = %routed,
                    error = %failure,
                    "message handling failed"
                );
                Reply::text(failure.user_message())
            }
        };

        let entry = InteractionLogEntry {
            user_id: user_id.clone(),
            raw_message: text.to_string(),
            classified_intent: classification.kind,
            confidence: classification.confidence,
            extracted_data: json!({
                "classification": classification,
                "routed_to": routed,
                "details": reply.details,
            }),
            response_summary: InteractionLogEntry::summarize_response(&reply.text),
            created_at: Utc::now(),
        };
        self.spawn_interaction_log(entry, correlation_id.clone());

        if !verbose {
            return reply.text;
        }
        let mut diagnostics = format!(
            "intent: {} | confidence: {:.2} | source: {}",
            routed, classification.confidence, classification.source
        );
        if let Some(session_id) = reply.details.get("session_id").and_then(|id| id.as_i64()) {
            diagnostics.push_str(&format!(" | session #{session_id}"));
        }
        format!("{}\n\n[{} | correlation: {}]", reply.text, diagnostics, correlation_id)
    }

    fn route(&self, classification: &Classification) -> IntentKind {
        if classification.confidence < self.min_confidence {
            IntentKind::Coaching
        } else {
            classification.kind
        }
    }

    /// Waits for interaction-log writes still in flight. Front ends call this
    /// before their runtime shuts down.
    pub async fn flush_interaction_logs(&self) {
        let mut pending = std::mem::take(&mut *self.lock_pending_logs());
        while pending.join_next().await.is_some() {}
    }

    fn lock_pending_logs(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.pending_logs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_interaction_log(&self, entry: InteractionLogEntry, correlation_id: String) {
        let interactions = self.store.interactions.clone();
        let mut pending = self.lock_pending_logs();
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            if let Err(failure) = interactions.append(&entry).await {
                warn!(
                    event_name = "agent.interaction_log.failed",
                    correlation_id = %correlation_id,
                    error = %failure,
                    "interaction log append failed"
                );
            }
        });
    }

    async fn log_workout(
        &self,
        text: &str,
        user_id: &UserId,
        classification: &Classification,
    ) -> Result<Reply, ApplicationError> {
        let hints = ExtractionHints {
            exercises: classification.exercises.clone(),
            muscle_groups: classification.muscle_groups.clone(),
        };
        let extracted = self
            .understanding
            .extract(text, &hints)
            .await
            .map_err(|failure| ApplicationError::Extraction(failure.to_string()))?;

        let sets: Vec<ExtractedSet> = extracted
            .sets
            .iter()
            .filter(|set| !set.exercise_name.trim().is_empty())
            .cloned()
            .collect();
        if sets.is_empty() {
            return Err(ApplicationError::Extraction("no sets in extraction".to_string()));
        }
        let prepared = apply_rep_defaults(expand_sets(sets));

        let mut resolutions: HashMap<String, Resolution> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for item in &prepared {
            let key = item.set.exercise_name.trim().to_lowercase();
            if resolutions.contains_key(&key) {
                continue;
            }
            let hint = item.set.is_cardio().then_some("cardio");
            let resolution =
                self.resolver.resolve(&item.set.exercise_name, hint).await.map_err(persistence)?;
            resolutions.insert(key.clone(), resolution);
            order.push(key);
        }

        let mut priors = HashMap::new();
        for key in &order {
            if let Some(resolution) = resolutions.get(key) {
                let prior = self.prior_performance(user_id, &resolution.exercise).await?;
                priors.insert(resolution.exercise.id, prior);
            }
        }

        let mut new_sets = Vec::with_capacity(prepared.len());
        for item in &prepared {
            let key = item.set.exercise_name.trim().to_lowercase();
            let Some(resolution) = resolutions.get(&key) else {
                return Err(ApplicationError::Domain(DomainError::InvariantViolation(format!(
                    "unresolved exercise `{}`",
                    item.set.exercise_name
                ))));
            };
            new_sets.push(new_set(item, resolution));
        }

        let now = Utc::now();
        let (performed_at, logged_for) = session_timestamp(extracted.date, now);
        let detail = self
            .store
            .workouts
            .create_session_with_sets(user_id, performed_at, None, &new_sets)
            .await
            .map_err(persistence)?;
        info!(
            event_name = "agent.workout.logged",
            user_id = %user_id,
            session_id = %detail.session.id,
            sets = detail.sets.len(),
            "workout logged"
        );

        let header = match logged_for {
            Some(date) => format!("Logged workout for {}:", date.format("%b %-d")),
            None => "Logged workout:".to_string(),
        };
        // Stored sets come back in the order they were written.
        if detail.sets.len() != prepared.len() {
            return Err(ApplicationError::Domain(DomainError::InvariantViolation(format!(
                "stored {} sets for {} prepared",
                detail.sets.len(),
                prepared.len()
            ))));
        }
        let mut lines = vec![header];
        for (logged, item) in detail.sets.iter().zip(&prepared) {
            let key = logged.set.raw_exercise_name.trim().to_lowercase();
            let name = resolutions
                .get(&key)
                .map(|resolution| resolution.display_name().to_string())
                .unwrap_or_else(|| logged.exercise_name.clone());
            lines.push(format_set_line(&name, logged, item.reps_assumed));
        }
        let volume = detail.volume_lbs();
        if volume > 0.0 {
            lines.push(format!("Total volume: {} lbs", volume.round() as i64));
        }

        let logged_exercises = summarize_for_commentary(&order, &resolutions, &detail, &priors);
        if let Some(comment) = log_comment(&logged_exercises, now) {
            lines.push(comment);
        }

        Ok(Reply {
            text: lines.join("\n"),
            details: json!({
                "extracted": extracted,
                "session_id": detail.session.id,
                "assumed_reps": prepared.iter().filter(|item| item.reps_assumed).count(),
            }),
        })
    }

    async fn prior_performance(
        &self,
        user_id: &UserId,
        exercise: &Exercise,
    ) -> Result<Option<PriorPerformance>, ApplicationError> {
        let history = self
            .store
            .workouts
            .history_for_exercise(user_id, exercise, HISTORY_SET_LIMIT)
            .await
            .map_err(persistence)?;
        let Some(last) = history.sessions.first() else {
            return Ok(None);
        };
        let best_load_lbs = history.personal_record.as_ref().and_then(|record| match record.metric {
            RecordMetric::Weight(load) => Some(load.in_lbs()),
            RecordMetric::Distance(_) => None,
        });
        Ok(Some(PriorPerformance {
            best_load_lbs,
            last_top_load_lbs: last.top_load_lbs(),
            last_performed_at: last.performed_at,
        }))
    }

    async fn view_stats(&self, user_id: &UserId) -> Result<Reply, ApplicationError> {
        let workouts = &self.store.workouts;
        let totals = workouts.totals(user_id).await.map_err(persistence)?;
        if totals.sessions == 0 {
            return Ok(Reply::text(
                "No workouts logged yet. Tell me about a workout to get started!",
            ));
        }

        let now = Utc::now();
        let recent = workouts.recent_sessions(user_id, RECENT_SESSIONS_SHOWN).await.map_err(persistence)?;
        let since = now - Duration::days(CONSISTENCY_WINDOW_DAYS);
        let dates: Vec<NaiveDate> = workouts
            .session_times_since(user_id, since)
            .await
            .map_err(persistence)?
            .into_iter()
            .map(|performed_at| performed_at.date_naive())
            .collect();
        let consistency = ConsistencyReport::compute(&dates, now.date_naive());

        let mut lines = vec![
            "Workout Stats:".to_string(),
            format!("  Sessions: {}", totals.sessions),
            format!("  Total sets: {}", totals.sets),
            format!("  Total volume: {} lbs", totals.volume_lbs.round() as i64),
            String::new(),
            "Consistency:".to_string(),
            format!("  Last 30 days: {} workout days", consistency.workouts_30d),
            format!("  Last 90 days: {} workout days", consistency.workouts_90d),
        ];
        if let Some(gap) = consistency.average_gap_days {
            lines.push(format!("  Average gap: {} days", format_quantity((gap * 10.0).round() / 10.0)));
        }
        if consistency.streak_days > 0 {
            lines.push(format!("  Current streak: {} days", consistency.streak_days));
        }
        if let Some(days) = consistency.days_since_last {
            lines.push(format!("  Last workout: {}", days_ago(days)));
        }

        lines.push(String::new());
        lines.push("Recent:".to_string());
        for detail in &recent {
            lines.push(format!("  {}", session_summary(detail)));
        }

        Ok(Reply {
            text: lines.join("\n"),
            details: json!({ "totals": totals, "consistency": consistency }),
        })
    }

    async fn delete_workout(&self, text: &str, user_id: &UserId) -> Result<Reply, ApplicationError> {
        let target = parse_delete_target(text)?;
        match self.store.workouts.delete_session(user_id, target).await {
            Ok(deleted) => {
                info!(
                    event_name = "agent.workout.deleted",
                    user_id = %user_id,
                    session_id = %deleted.session.id,
                    "workout deleted"
                );
                Ok(Reply {
                    text: format!("Deleted session {}", session_summary(&deleted)),
                    details: json!({ "deleted_session_id": deleted.session.id }),
                })
            }
            Err(RepositoryError::NotFound(_)) => Ok(Reply::text(match target {
                DeleteTarget::Last => "Nothing to delete yet.".to_string(),
                DeleteTarget::Session(id) => format!("Session #{id} not found."),
            })),
            Err(failure) => Err(persistence(failure)),
        }
    }

    async fn repeat_last(&self, text: &str, user_id: &UserId) -> Result<Reply, ApplicationError> {
        let overrides = parse_repeat_modifiers(text)?;
        let cloned =
            match self.store.workouts.clone_latest_session(user_id, &overrides, Utc::now()).await {
                Ok(cloned) => cloned,
                Err(RepositoryError::NotFound(_)) => {
                    return Ok(Reply::text("Nothing to repeat yet. Log a workout first."));
                }
                Err(failure) => return Err(persistence(failure)),
            };
        info!(
            event_name = "agent.workout.repeated",
            user_id = %user_id,
            source_session_id = %cloned.source_session_id,
            session_id = %cloned.session.session.id,
            "workout repeated"
        );

        let mut lines =
            vec![format!("Repeated last workout (session #{}):", cloned.source_session_id)];
        for logged in &cloned.session.sets {
            lines.push(format_set_line(&logged.exercise_name, logged, false));
        }
        let volume = cloned.session.volume_lbs();
        if volume > 0.0 {
            lines.push(format!("Total volume: {} lbs", volume.round() as i64));
        }
        if let Some(note) = &overrides.note {
            lines.push(format!("Note: {note}"));
        }

        Ok(Reply {
            text: lines.join("\n"),
            details: json!({
                "source_session_id": cloned.source_session_id,
                "session_id": cloned.session.session.id,
                "overrides": overrides,
            }),
        })
    }

    async fn coaching(
        &self,
        text: &str,
        user_id: &UserId,
        classification: &Classification,
    ) -> Result<Reply, ApplicationError> {
        let context = match self
            .context
            .build(user_id, &classification.exercises, &classification.muscle_groups)
            .await
        {
            Ok(context) => context,
            Err(failure) => {
                warn!(
                    event_name = "agent.coaching.context_failed",
                    user_id = %user_id,
                    error = %failure,
                    "coaching context unavailable, answering without it"
                );
                String::new()
            }
        };

        let prompt = if context.is_empty() {
            text.to_string()
        } else {
            format!("{context}\n\n---\nUSER QUESTION: {text}")
        };
        let advice = self
            .understanding
            .generate(&prompt)
            .await
            .map_err(|failure| ApplicationError::Integration(failure.to_string()))?;

        Ok(Reply {
            text: advice.trim().to_string(),
            details: json!({ "context_chars": context.chars().count() }),
        })
    }
}

fn persistence(failure: RepositoryError) -> ApplicationError {
    match failure {
        RepositoryError::NotFound(message) => ApplicationError::NotFound(message),
        RepositoryError::Invalid(message) => {
            ApplicationError::Domain(DomainError::InvariantViolation(message))
        }
        other => ApplicationError::Persistence(other.to_string()),
    }
}

/// `bodyweight` clears the load; a weight without a recognisable unit is pounds.
fn load_for(set: &ExtractedSet) -> Option<Load> {
    let amount = set.weight.filter(|amount| *amount > 0.0)?;
    let unit = set.weight_unit.as_deref().map(str::trim).unwrap_or_default();
    if unit.eq_ignore_ascii_case(BODYWEIGHT_UNIT) {
        return None;
    }
    Some(Load::new(amount, WeightUnit::parse(unit).unwrap_or(WeightUnit::Lbs)))
}

fn new_set(item: &PreparedSet, resolution: &Resolution) -> NewSet {
    let set = &item.set;
    NewSet {
        exercise_id: resolution.exercise.id,
        set_number: set.set_number.max(1),
        reps: set.reps,
        load: load_for(set),
        duration_minutes: set.duration_minutes,
        distance: set.distance,
        raw_exercise_name: set.exercise_name.clone(),
        notes: set.notes.as_deref().map(str::trim).filter(|notes| !notes.is_empty()).map(str::to_string),
    }
}

/// A past calendar day keeps the current time of day; future days are ignored.
fn session_timestamp(
    date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, Option<NaiveDate>) {
    match date {
        Some(date) if date <= now.date_naive() => (date.and_time(now.time()).and_utc(), Some(date)),
        _ => (now, None),
    }
}

fn format_set_line(name: &str, logged: &LoggedSet, assumed: bool) -> String {
    let set = &logged.set;
    let mut line = if set.is_cardio() {
        format!("  {}: {}", name, set.describe())
    } else {
        format!("  {}: set {} - {}", name, set.set_number, set.describe())
    };
    if assumed {
        line.push_str(" (reps assumed)");
    }
    if let Some(notes) = &set.notes {
        line.push_str(&format!(" [{notes}]"));
    }
    line
}

fn session_summary(detail: &SessionDetail) -> String {
    let names = detail.exercise_names();
    let exercises = if names.is_empty() { "no exercises".to_string() } else { names.join(", ") };
    format!(
        "#{} ({}): {} - {} sets",
        detail.session.id,
        detail.session.performed_at.format("%b %-d"),
        exercises,
        detail.sets.len()
    )
}

fn days_ago(days: i64) -> String {
    match days {
        0 => "today".to_string(),
        1 => "yesterday".to_string(),
        days => format!("{days} days ago"),
    }
}

fn summarize_for_commentary(
    order: &[String],
    resolutions: &HashMap<String, Resolution>,
    detail: &SessionDetail,
    priors: &HashMap<ExerciseId, Option<PriorPerformance>>,
) -> Vec<LoggedExercise> {
    let mut seen = Vec::new();
    let mut exercises = Vec::new();
    for key in order {
        let Some(resolution) = resolutions.get(key) else {
            continue;
        };
        let exercise = &resolution.exercise;
        if seen.contains(&exercise.id) {
            continue;
        }
        seen.push(exercise.id);

        let sets: Vec<_> =
            detail.sets.iter().filter(|logged| logged.set.exercise_id == exercise.id).collect();
        exercises.push(LoggedExercise {
            name: exercise.name.clone(),
            is_cardio: exercise.is_cardio() || sets.iter().any(|logged| logged.set.is_cardio()),
            top_load_lbs: sets
                .iter()
                .filter_map(|logged| logged.set.load.map(|load| load.in_lbs()))
                .reduce(f64::max),
            notes: sets.iter().filter_map(|logged| logged.set.notes.clone()).collect(),
            prior: priors.get(&exercise.id).copied().flatten(),
        });
    }
    exercises
}
