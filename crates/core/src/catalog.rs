//! Fuzzy name matching against the exercise catalog.
//!
//! Names are compared as token sets: split on anything that is not
//! alphanumeric, lowercased, and lightly singularized so that "Flyes" and
//! "fly" land on the same token. The score is plain Jaccard similarity.
//!
//! Singularizing is required, not cosmetic: on raw tokens "dumbbell fly"
//! scores 1/3 against "Dumbbell Flyes" and misses [`MATCH_THRESHOLD`], yet it
//! must resolve to that catalog entry.

use std::collections::BTreeSet;

use crate::domain::exercise::Exercise;

/// Minimum similarity for a fuzzy match to be accepted.
pub const MATCH_THRESHOLD: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CatalogMatch<'a> {
    pub exercise: &'a Exercise,
    pub score: f64,
}

pub fn tokenize(name: &str) -> BTreeSet<String> {
    name.split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| singularize(&token.to_lowercase()))
        .collect()
}

fn singularize(token: &str) -> String {
    if token.len() <= 3 || token.chars().any(|ch| ch.is_ascii_digit()) {
        return token.to_string();
    }
    if let Some(stem) = token.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if let Some(stem) = token.strip_suffix("yes") {
        return format!("{stem}y");
    }
    for suffix in ["sses", "shes", "ches", "xes"] {
        if token.ends_with(suffix) {
            return token[..token.len() - 2].to_string();
        }
    }
    if token.ends_with('s') && !token.ends_with("ss") && !token.ends_with("us") {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}

/// Jaccard similarity of the two names' token sets, in `[0, 1]`.
pub fn jaccard(left: &str, right: &str) -> f64 {
    let left = tokenize(left);
    let right = tokenize(right);
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    intersection as f64 / union as f64
}

/// Case-insensitive exact name match. Lowest id wins if the catalog somehow
/// holds duplicates.
pub fn exact_match<'a>(catalog: &'a [Exercise], raw_name: &str) -> Option<&'a Exercise> {
    let wanted = raw_name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    catalog
        .iter()
        .filter(|exercise| exercise.name.trim().to_lowercase() == wanted)
        .min_by_key(|exercise| exercise.id)
}

/// Highest-scoring entry at or above [`MATCH_THRESHOLD`]; equal scores go to
/// the lowest catalog id.
pub fn best_match<'a>(catalog: &'a [Exercise], raw_name: &str) -> Option<CatalogMatch<'a>> {
    let mut best: Option<CatalogMatch<'a>> = None;
    for exercise in catalog {
        let score = jaccard(raw_name, &exercise.name);
        let better = match &best {
            None => true,
            Some(current) => {
                score > current.score
                    || (score == current.score && exercise.id < current.exercise.id)
            }
        };
        if better {
            best = Some(CatalogMatch { exercise, score });
        }
    }
    best.filter(|candidate| candidate.score >= MATCH_THRESHOLD)
}
