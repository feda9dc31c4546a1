//! One-line remark appended to a log confirmation.

use chrono::{DateTime, Utc};

pub const GAP_THRESHOLD_DAYS: i64 = 4;

const PAIN_MARKERS: [&str; 5] = ["pain", "hurt", "sore", "tweak", "injur"];

/// What the user had done on an exercise before the session being logged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriorPerformance {
    pub best_load_lbs: Option<f64>,
    pub last_top_load_lbs: Option<f64>,
    pub last_performed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggedExercise {
    pub name: String,
    pub is_cardio: bool,
    pub top_load_lbs: Option<f64>,
    pub notes: Vec<String>,
    pub prior: Option<PriorPerformance>,
}

/// First rule that fires wins: pain, personal record, first time, weight
/// increase, long gap.
pub fn log_comment(exercises: &[LoggedExercise], now: DateTime<Utc>) -> Option<String> {
    let mentions_pain = exercises.iter().flat_map(|exercise| exercise.notes.iter()).any(|note| {
        let note = note.to_lowercase();
        PAIN_MARKERS.iter().any(|marker| note.contains(marker))
    });
    if mentions_pain {
        return Some("Take it easy if the pain persists.".to_string());
    }

    for exercise in exercises.iter().filter(|exercise| !exercise.is_cardio) {
        let (Some(current), Some(prior)) = (exercise.top_load_lbs, exercise.prior) else {
            continue;
        };
        if prior.best_load_lbs.is_some_and(|best| best > 0.0 && current > best) {
            return Some(format!("New PR on {}!", exercise.name));
        }
    }

    if let Some(first) = exercises.iter().find(|exercise| exercise.prior.is_none()) {
        return Some(format!("First time logging {}.", first.name));
    }

    for exercise in exercises.iter().filter(|exercise| !exercise.is_cardio) {
        let (Some(current), Some(prior)) = (exercise.top_load_lbs, exercise.prior) else {
            continue;
        };
        if prior.last_top_load_lbs.is_some_and(|last| current > last) {
            return Some(format!("Moving up in weight on {}.", exercise.name));
        }
    }

    let gap = exercises
        .iter()
        .filter_map(|exercise| exercise.prior)
        .map(|prior| (now - prior.last_performed_at).num_days())
        .min()?;
    (gap >= GAP_THRESHOLD_DAYS).then(|| format!("Back at it after {gap} days."))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{log_comment, LoggedExercise, PriorPerformance};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 14, 12, 0, 0).single().expect("valid timestamp")
    }

    fn lift(name: &str, load: f64, prior: Option<PriorPerformance>) -> LoggedExercise {
        LoggedExercise {
            name: name.to_string(),
            is_cardio: false,
            top_load_lbs: Some(load),
            notes: Vec::new(),
            prior,
        }
    }

    fn prior(best: f64, last: f64, days_ago: i64) -> Option<PriorPerformance> {
        Some(PriorPerformance {
            best_load_lbs: Some(best),
            last_top_load_lbs: Some(last),
            last_performed_at: now() - Duration::days(days_ago),
        })
    }

    #[test]
    fn beating_the_best_is_a_record() {
        let logged = [lift("Bench Press", 200.0, prior(185.0, 185.0, 1))];
        assert_eq!(log_comment(&logged, now()).as_deref(), Some("New PR on Bench Press!"));
    }

    #[test]
    fn no_history_means_first_time() {
        let logged = [lift("Dumbbell Flyes", 30.0, None)];
        assert_eq!(
            log_comment(&logged, now()).as_deref(),
            Some("First time logging Dumbbell Flyes.")
        );

        let run = LoggedExercise {
            name: "Running".to_string(),
            is_cardio: true,
            top_load_lbs: None,
            notes: Vec::new(),
            prior: None,
        };
        assert_eq!(log_comment(&[run], now()).as_deref(), Some("First time logging Running."));
    }

    #[test]
    fn heavier_than_last_time_but_below_best() {
        let logged = [lift("Squat", 230.0, prior(250.0, 225.0, 1))];
        assert_eq!(log_comment(&logged, now()).as_deref(), Some("Moving up in weight on Squat."));
    }

    #[test]
    fn long_gap_is_noted() {
        let logged = [lift("Squat", 225.0, prior(225.0, 225.0, 5))];
        assert_eq!(log_comment(&logged, now()).as_deref(), Some("Back at it after 5 days."));
    }

    #[test]
    fn pain_outranks_everything() {
        let mut logged = lift("Bench Press", 300.0, prior(135.0, 135.0, 1));
        logged.notes.push("Shoulder PAIN on the way down".to_string());
        assert_eq!(
            log_comment(&[logged], now()).as_deref(),
            Some("Take it easy if the pain persists.")
        );
    }

    #[test]
    fn steady_session_gets_no_comment() {
        let logged = [lift("Bench Press", 135.0, prior(135.0, 135.0, 1))];
        assert_eq!(log_comment(&logged, now()), None);
        assert_eq!(log_comment(&[], now()), None);
    }
}
