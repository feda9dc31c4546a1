use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use nunzio_core::config::LlmConfig;
use nunzio_core::domain::intent::{
    Classification, ClassificationSource, ExtractedWorkout, ExtractionHints, IntentKind,
};

use crate::conversation::keyword_classify;
use crate::llm::{CompletionRequest, LlmClient, LlmError};

const CLASSIFY_TEMPERATURE: f32 = 0.1;
const EXTRACT_TEMPERATURE: f32 = 0.1;
const COACHING_TEMPERATURE: f32 = 0.7;

pub const COACH_SYSTEM_PROMPT: &str = "You are Nunzio, a direct workout coach. Give specific, \
actionable advice with exact sets, reps, and weights.

RULES:
- When the user's history is provided, base your advice on their actual numbers
- Prescribe specific weights: \"3x10 @ 35/40/40 lbs\" not \"moderate weight\"
- Progressive overload: if all target reps were hit last time, suggest +5 lbs for barbell \
compounds, +5 lbs per hand for dumbbells, +2.5 lbs for isolation
- If they missed reps or stalled, suggest the same weight or a deload
- For cardio: progress by adding duration or intervals, not weight, and reference their recent \
times and distances
- Keep responses concise: a prescription and a brief rationale
- If there is not enough history, say so and give a conservative starting point
- Reference the exercise guidance and training principles provided in context";

#[derive(Debug, Error)]
pub enum UnderstandingError {
    #[error("workout extraction failed after {attempts} attempt(s): {source}")]
    Extraction {
        attempts: u32,
        #[source]
        source: LlmError,
    },
    #[error("advice generation failed after {attempts} attempt(s): {source}")]
    Generation {
        attempts: u32,
        #[source]
        source: LlmError,
    },
}

/// What the message handler needs from a language model. Implementations
/// own their retry discipline.
#[async_trait]
pub trait TextUnderstanding: Send + Sync {
    /// Never fails; degrades to keyword matching.
    async fn classify(&self, text: &str) -> Classification;
    async fn extract(
        &self,
        text: &str,
        hints: &ExtractionHints,
    ) -> Result<ExtractedWorkout, UnderstandingError>;
    async fn generate(&self, prompt: &str) -> Result<String, UnderstandingError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 1_000, max_delay_ms: 10_000 }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        }
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    intent: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default, alias = "mentioned_exercises")]
    exercises: Vec<String>,
    #[serde(default, alias = "mentioned_muscle_groups")]
    muscle_groups: Vec<String>,
}

pub struct LlmTextUnderstanding {
    client: Arc<dyn LlmClient>,
    retry: RetryPolicy,
}

impl LlmTextUnderstanding {
    pub fn new(client: Arc<dyn LlmClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, (u32, LlmError)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < max_attempts && error.is_retryable() => {
                    let delay = self.retry.backoff(attempt - 1);
                    warn!(
                        event_name = "agent.llm.retry",
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "text understanding call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err((attempt, error)),
            }
        }
    }

    async fn complete_json<T: DeserializeOwned>(
        &self,
        request: &CompletionRequest,
    ) -> Result<T, LlmError> {
        let raw = self.client.complete(request).await?;
        serde_json::from_str(json_payload(&raw))
            .map_err(|error| LlmError::Malformed(format!("{error}: {}", preview(&raw))))
    }
}

#[async_trait]
impl TextUnderstanding for LlmTextUnderstanding {
    async fn classify(&self, text: &str) -> Classification {
        let request = CompletionRequest::new(classification_prompt(text))
            .with_temperature(CLASSIFY_TEMPERATURE)
            .json_mode();
        let request = &request;

        match self.with_retry("classify", move || self.complete_json::<RawClassification>(request)).await {
            Ok(raw) => {
                let mut classification = Classification::new(
                    IntentKind::from_label(&raw.intent),
                    raw.confidence,
                    ClassificationSource::Service,
                );
                classification.exercises = clean_names(raw.exercises);
                classification.muscle_groups = clean_names(raw.muscle_groups)
                    .into_iter()
                    .map(|group| group.to_lowercase())
                    .collect();
                classification
            }
            Err((attempts, error)) => {
                warn!(
                    event_name = "agent.llm.classify_fallback",
                    attempts,
                    error = %error,
                    "classification unavailable, using keyword matcher"
                );
                keyword_classify(text)
            }
        }
    }

    async fn extract(
        &self,
        text: &str,
        hints: &ExtractionHints,
    ) -> Result<ExtractedWorkout, UnderstandingError> {
        let request = CompletionRequest::new(extraction_prompt(text, hints, Utc::now().date_naive()))
            .with_temperature(EXTRACT_TEMPERATURE)
            .json_mode();
        let request = &request;

        self.with_retry("extract", move || self.complete_json::<ExtractedWorkout>(request))
            .await
            .map_err(|(attempts, source)| UnderstandingError::Extraction { attempts, source })
    }

    async fn generate(&self, prompt: &str) -> Result<String, UnderstandingError> {
        let request = CompletionRequest::new(prompt)
            .with_system(COACH_SYSTEM_PROMPT)
            .with_temperature(COACHING_TEMPERATURE);
        let request = &request;

        self.with_retry("generate", move || self.client.complete(request))
            .await
            .map_err(|(attempts, source)| UnderstandingError::Generation { attempts, source })
    }
}

fn clean_names(names: Vec<String>) -> Vec<String> {
    names.into_iter().map(|name| name.trim().to_string()).filter(|name| !name.is_empty()).collect()
}

/// Models wrap JSON in prose or code fences often enough that the outermost
/// object is cut out before parsing.
pub fn json_payload(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw.trim(),
    }
}

fn preview(raw: &str) -> String {
    raw.chars().take(120).collect()
}

pub fn classification_prompt(text: &str) -> String {
    format!(
        r#"Analyze this user message and classify their primary intent.

MESSAGE: "{text}"

POSSIBLE INTENTS:
- log_workout: the user is reporting a workout they already did ("I did", "I benched", "ran 3 miles")
- view_stats: the user wants to see their workout history or statistics
- delete_workout: the user wants to undo, delete, or remove a logged workout ("undo", "delete last", "remove session #42", "that's wrong")
- repeat_last: the user wants to log the same workout again ("again", "repeat last", "same as last time")
- coaching: advice, recommendations, questions about training, or anything else

Also list any exercise names (common names like "Bench Press", "Squat") and muscle groups
(chest, back, shoulders, legs, biceps, triceps, core, cardio, flexibility) mentioned.

Respond with JSON only:
{{"intent": "<one of the intents>", "confidence": <0.0-1.0>, "exercises": ["..."], "muscle_groups": ["..."]}}"#
    )
}

pub fn extraction_prompt(text: &str, hints: &ExtractionHints, today: NaiveDate) -> String {
    let mut prompt = format!(
        r#"Extract workout details from this message. Be precise with numbers.

MESSAGE: "{text}"
TODAY: {today}

RULES:
- Exercise names should match common exercises; keep the name to the base movement
- Strength sets: set_number, reps, weight, weight_unit ("lbs", "kg" or "bodyweight")
- When the user says "N sets", return N separate entries numbered 1 through N
- Cardio (running, cycling, rowing, swimming, elliptical): duration_minutes and distance in miles, reps null
- Weight is in pounds unless stated otherwise
- Subjective remarks (pain, effort, mood) and equipment modifiers (band color, grip, tempo) go in notes
- If the message names a day ("yesterday", "on Feb 15"), set date as YYYY-MM-DD; otherwise null
"#,
        today = today.format("%Y-%m-%d")
    );

    if !hints.exercises.is_empty() {
        prompt.push_str(&format!("- Exercises already spotted: {}\n", hints.exercises.join(", ")));
    }
    if !hints.muscle_groups.is_empty() {
        prompt.push_str(&format!("- Muscle groups already spotted: {}\n", hints.muscle_groups.join(", ")));
    }

    prompt.push_str(
        r#"
Respond with JSON only:
{"sets": [{"exercise_name": "...", "set_number": 1, "reps": 10, "weight": 135, "weight_unit": "lbs", "duration_minutes": null, "distance": null, "notes": null}], "date": null}"#,
    );
    prompt
}
