use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const RECENT_WINDOW_DAYS: i64 = 30;
pub const CONSISTENCY_WINDOW_DAYS: i64 = 90;

/// Training consistency over distinct workout days.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub workouts_30d: usize,
    pub workouts_90d: usize,
    pub average_gap_days: Option<f64>,
    pub streak_days: u32,
    pub days_since_last: Option<i64>,
}

impl ConsistencyReport {
    /// Several sessions on one day count once. Dates after `today` and
    /// older than the 90-day window are ignored.
    pub fn compute(workout_dates: &[NaiveDate], today: NaiveDate) -> Self {
        let days: BTreeSet<NaiveDate> = workout_dates
            .iter()
            .copied()
            .filter(|date| {
                let age = (today - *date).num_days();
                (0..=CONSISTENCY_WINDOW_DAYS).contains(&age)
            })
            .collect();

        let workouts_30d =
            days.iter().filter(|date| (today - **date).num_days() <= RECENT_WINDOW_DAYS).count();

        let ordered: Vec<NaiveDate> = days.iter().copied().collect();
        let average_gap_days = if ordered.len() >= 2 {
            let total: i64 = ordered.windows(2).map(|pair| (pair[1] - pair[0]).num_days()).sum();
            Some(total as f64 / (ordered.len() - 1) as f64)
        } else {
            None
        };

        let mut streak_days = 0;
        let mut cursor = today;
        while days.contains(&cursor) {
            streak_days += 1;
            match cursor.pred_opt() {
                Some(previous) => cursor = previous,
                None => break,
            }
        }

        Self {
            workouts_30d,
            workouts_90d: days.len(),
            average_gap_days,
            streak_days,
            days_since_last: ordered.last().map(|last| (today - *last).num_days()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::ConsistencyReport;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date")
    }

    fn days_ago(offsets: &[i64]) -> Vec<NaiveDate> {
        offsets.iter().map(|offset| today() - Duration::days(*offset)).collect()
    }

    #[test]
    fn empty_history_reports_nothing() {
        let report = ConsistencyReport::compute(&[], today());
        assert_eq!(report, ConsistencyReport::default());
    }

    #[test]
    fn single_workout_today_starts_a_streak() {
        let report = ConsistencyReport::compute(&days_ago(&[0]), today());
        assert_eq!(report.workouts_30d, 1);
        assert_eq!(report.workouts_90d, 1);
        assert_eq!(report.average_gap_days, None);
        assert_eq!(report.streak_days, 1);
        assert_eq!(report.days_since_last, Some(0));
    }

    #[test]
    fn streak_stops_at_first_missing_day() {
        assert_eq!(ConsistencyReport::compute(&days_ago(&[0, 1, 2]), today()).streak_days, 3);
        assert_eq!(ConsistencyReport::compute(&days_ago(&[0, 1, 5]), today()).streak_days, 2);

        let stale = ConsistencyReport::compute(&days_ago(&[3]), today());
        assert_eq!(stale.streak_days, 0);
        assert_eq!(stale.days_since_last, Some(3));
    }

    #[test]
    fn average_gap_uses_distinct_days() {
        let report = ConsistencyReport::compute(&days_ago(&[0, 0, 3, 6, 9, 12]), today());
        assert_eq!(report.average_gap_days, Some(3.0));
        assert_eq!(report.workouts_90d, 5);
    }

    #[test]
    fn windows_split_recent_and_quarterly_counts() {
        let offsets: Vec<i64> = (0..12).map(|index| index * 10).collect();
        let report = ConsistencyReport::compute(&days_ago(&offsets), today());
        assert_eq!(report.workouts_30d, 4);
        assert_eq!(report.workouts_90d, 10);
    }
}
