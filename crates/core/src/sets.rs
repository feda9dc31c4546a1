//! Post-processing applied to extracted sets before they are resolved and stored.

use std::collections::HashMap;

use crate::domain::intent::ExtractedSet;

pub const DEFAULT_REPS: u32 = 10;
/// Largest "N sets" count that is unfolded into separate sets.
pub const MAX_EXPANDED_SETS: u32 = 20;

/// Unfolds "N sets of X" that the extractor reported as a single entry with
/// `set_number = N` into N unit sets numbered `1..=N`.
///
/// Only an entry that is the sole one for its exercise is unfolded; when the
/// extractor already returned several entries they are kept as they are. A
/// count above [`MAX_EXPANDED_SETS`] is not a believable set count, so that
/// entry stays a single set numbered 1.
pub fn expand_sets(sets: Vec<ExtractedSet>) -> Vec<ExtractedSet> {
    let mut per_exercise: HashMap<String, usize> = HashMap::new();
    for set in &sets {
        *per_exercise.entry(exercise_key(&set.exercise_name)).or_default() += 1;
    }

    let mut expanded = Vec::with_capacity(sets.len());
    for set in sets {
        let sole_entry = per_exercise.get(&exercise_key(&set.exercise_name)) == Some(&1);
        if sole_entry && set.set_number > MAX_EXPANDED_SETS {
            expanded.push(ExtractedSet { set_number: 1, ..set });
        } else if sole_entry && set.set_number > 1 {
            for number in 1..=set.set_number {
                expanded.push(ExtractedSet { set_number: number, ..set.clone() });
            }
        } else {
            expanded.push(set);
        }
    }
    expanded
}

fn exercise_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreparedSet {
    pub set: ExtractedSet,
    pub reps_assumed: bool,
}

/// Fills missing reps on strength sets with [`DEFAULT_REPS`]. Cardio sets are
/// left alone.
pub fn apply_rep_defaults(sets: Vec<ExtractedSet>) -> Vec<PreparedSet> {
    sets.into_iter()
        .map(|mut set| {
            let missing = matches!(set.reps, None | Some(0));
            let reps_assumed = missing && !set.is_cardio();
            if reps_assumed {
                set.reps = Some(DEFAULT_REPS);
            }
            PreparedSet { set, reps_assumed }
        })
        .collect()
}
