//! Deterministic reading of raw message text. Used where the text-understanding
//! service is either unavailable or not trusted to get the details right.

use nunzio_core::domain::intent::{Classification, ClassificationSource, IntentKind};
use nunzio_core::domain::workout::{
    CloneOverrides, DeleteTarget, Load, SessionId, WeightUnit, MAX_REPEAT_TIMES,
};
use nunzio_core::errors::DomainError;

pub const KEYWORD_CONFIDENCE: f64 = 0.6;

const DELETE_KEYWORDS: &[&str] = &["undo", "delete", "remove"];
const REPEAT_KEYWORDS: &[&str] = &["again", "repeat", "same as last"];
const LOG_KEYWORDS: &[&str] = &["log", "did", "worked out", "sets", "reps"];
const STATS_KEYWORDS: &[&str] = &["stats", "progress", "history", "show"];

const LAST_SESSION_WORDS: &[&str] =
    &["undo", "last", "latest", "previous", "recent", "that", "that's", "it", "wrong"];
const SESSION_NOUNS: &[&str] = &["session", "workout", "id"];

const REPEAT_TRIGGER_WORDS: &[&str] =
    &["again", "repeat", "same", "as", "last", "time", "thing", "workout", "session", "the"];
const WEIGHT_PREPOSITIONS: &[&str] = &["at", "for", "@"];

/// Fallback classifier; the first keyword group that matches wins.
pub fn keyword_classify(text: &str) -> Classification {
    let lowered = text.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|keyword| lowered.contains(keyword));

    let kind = if contains_any(DELETE_KEYWORDS) {
        IntentKind::DeleteWorkout
    } else if contains_any(REPEAT_KEYWORDS) {
        IntentKind::RepeatLast
    } else if contains_any(LOG_KEYWORDS) {
        IntentKind::LogWorkout
    } else if contains_any(STATS_KEYWORDS) {
        IntentKind::ViewStats
    } else {
        IntentKind::Coaching
    };

    Classification::new(kind, KEYWORD_CONFIDENCE, ClassificationSource::KeywordFallback)
}

fn normalize(word: &str) -> String {
    word.trim_matches(|c: char| {
        matches!(c, ',' | '.' | '!' | '?' | ';' | ':' | '"' | '(' | ')' | '\'')
    })
    .to_lowercase()
}

fn parse_session_number(word: &str) -> Option<i64> {
    word.strip_prefix('#').unwrap_or(word).parse::<i64>().ok().filter(|id| *id > 0)
}

/// Reads which session a delete request points at: `#42`, `session 42`, or
/// the most recent one for words like "undo" and "last".
pub fn parse_delete_target(text: &str) -> Result<DeleteTarget, DomainError> {
    let words: Vec<String> = text.split_whitespace().map(normalize).collect();

    for (index, word) in words.iter().enumerate() {
        if word.starts_with('#') {
            if let Some(id) = parse_session_number(word) {
                return Ok(DeleteTarget::Session(SessionId(id)));
            }
        }
        if SESSION_NOUNS.contains(&word.as_str()) {
            if let Some(id) = words.get(index + 1).and_then(|next| parse_session_number(next)) {
                return Ok(DeleteTarget::Session(SessionId(id)));
            }
        }
    }

    if words.iter().any(|word| LAST_SESSION_WORDS.contains(&word.as_str())) {
        return Ok(DeleteTarget::Last);
    }

    Err(DomainError::UnparseableDeleteTarget(text.trim().to_string()))
}

fn split_number_and_unit(word: &str) -> Option<(f64, Option<WeightUnit>)> {
    let split_at = word
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(index, _)| index)
        .unwrap_or(word.len());
    let (number, suffix) = word.split_at(split_at);
    let amount = number.parse::<f64>().ok().filter(|amount| *amount > 0.0)?;
    if suffix.is_empty() {
        return Some((amount, None));
    }
    WeightUnit::parse(suffix).map(|unit| (amount, Some(unit)))
}

fn parse_times(word: &str) -> Option<u64> {
    match word {
        "twice" => return Some(2),
        "thrice" => return Some(3),
        _ => {}
    }
    word.strip_prefix('x')
        .or_else(|| word.strip_suffix('x'))
        .filter(|count| !count.is_empty() && count.bytes().all(|b| b.is_ascii_digit()))
        .map(|count| count.parse::<u64>().unwrap_or(u64::MAX))
        .filter(|count| *count >= 1)
}

fn bounded_times(requested: u64) -> Result<u32, DomainError> {
    u32::try_from(requested)
        .ok()
        .filter(|times| *times <= MAX_REPEAT_TIMES)
        .ok_or(DomainError::RepeatCountTooLarge { requested, max: MAX_REPEAT_TIMES })
}

/// Pulls a weight override, a repeat count and a free-text note out of a
/// "do it again" message. Counts above [`MAX_REPEAT_TIMES`] are rejected.
pub fn parse_repeat_modifiers(text: &str) -> Result<CloneOverrides, DomainError> {
    let raw: Vec<&str> = text.split_whitespace().collect();
    let words: Vec<String> = raw.iter().map(|word| normalize(word)).collect();
    let mut consumed = vec![false; words.len()];
    let mut overrides = CloneOverrides::default();

    let mut index = 0;
    while index < words.len() {
        let word = words[index].as_str();
        let next = words.get(index + 1).map(String::as_str);

        if let Some(times) = parse_times(word) {
            overrides.times = bounded_times(times)?;
            consumed[index] = true;
            index += 1;
            continue;
        }

        let (word, at_prefixed) = match word.strip_prefix('@') {
            Some(rest) if !rest.is_empty() => (rest, true),
            _ => (word, false),
        };
        let Some((amount, inline_unit)) = split_number_and_unit(word) else {
            index += 1;
            continue;
        };

        if inline_unit.is_none() && next == Some("times") {
            if amount.fract() == 0.0 && amount >= 1.0 {
                let requested = if amount >= u64::MAX as f64 { u64::MAX } else { amount as u64 };
                overrides.times = bounded_times(requested)?;
                consumed[index] = true;
                consumed[index + 1] = true;
            }
            index += 2;
            continue;
        }

        if overrides.load.is_none() {
            let next_unit = next.and_then(WeightUnit::parse);
            let after_preposition = index > 0
                && WEIGHT_PREPOSITIONS.contains(&words[index - 1].as_str())
                && !consumed[index - 1];
            let unit = inline_unit.or(next_unit);

            if unit.is_some() || after_preposition || at_prefixed {
                overrides.load = Some(Load::new(amount, unit.unwrap_or(WeightUnit::Lbs)));
                consumed[index] = true;
                if after_preposition {
                    consumed[index - 1] = true;
                }
                if inline_unit.is_none() && next_unit.is_some() {
                    consumed[index + 1] = true;
                    index += 1;
                }
            }
        }
        index += 1;
    }

    let remaining: Vec<usize> = (0..words.len()).filter(|index| !consumed[*index]).collect();
    let first_note_word = remaining
        .iter()
        .position(|index| !REPEAT_TRIGGER_WORDS.contains(&words[*index].as_str()))
        .unwrap_or(remaining.len());
    let note = remaining[first_note_word..].iter().map(|index| raw[*index]).collect::<Vec<_>>().join(" ");
    let note = note.trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
    if !note.is_empty() {
        overrides.note = Some(note.to_string());
    }

    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use nunzio_core::domain::intent::{ClassificationSource, IntentKind};
    use nunzio_core::domain::workout::{
        CloneOverrides, DeleteTarget, Load, SessionId, WeightUnit, MAX_REPEAT_TIMES,
    };
    use nunzio_core::errors::DomainError;

    use super::{keyword_classify, parse_delete_target, parse_repeat_modifiers, KEYWORD_CONFIDENCE};

    fn modifiers(text: &str) -> CloneOverrides {
        parse_repeat_modifiers(text).expect("modifiers")
    }

    #[test]
    fn keyword_groups_are_checked_in_order() {
        assert_eq!(keyword_classify("undo that").kind, IntentKind::DeleteWorkout);
        assert_eq!(keyword_classify("delete the repeat").kind, IntentKind::DeleteWorkout);
        assert_eq!(keyword_classify("same as last time").kind, IntentKind::RepeatLast);
        assert_eq!(keyword_classify("I did 3 sets of squats").kind, IntentKind::LogWorkout);
        assert_eq!(keyword_classify("show my progress").kind, IntentKind::ViewStats);
        assert_eq!(keyword_classify("how heavy should I go?").kind, IntentKind::Coaching);
    }

    #[test]
    fn keyword_results_carry_fixed_confidence() {
        let classification = keyword_classify("stats please");
        assert_eq!(classification.confidence, KEYWORD_CONFIDENCE);
        assert_eq!(classification.source, ClassificationSource::KeywordFallback);
        assert!(classification.exercises.is_empty());
    }

    #[test]
    fn explicit_session_ids_are_found() {
        let session = |id| Ok(DeleteTarget::Session(SessionId(id)));
        assert_eq!(parse_delete_target("delete session #42"), session(42));
        assert_eq!(parse_delete_target("delete session 42"), session(42));
        assert_eq!(parse_delete_target("remove #7 please"), session(7));
        assert_eq!(parse_delete_target("delete workout #13."), session(13));
    }

    #[test]
    fn recency_words_target_the_latest_session() {
        assert_eq!(parse_delete_target("undo"), Ok(DeleteTarget::Last));
        assert_eq!(parse_delete_target("delete last"), Ok(DeleteTarget::Last));
        assert_eq!(parse_delete_target("remove that, it was wrong"), Ok(DeleteTarget::Last));
    }

    #[test]
    fn vague_delete_requests_are_rejected() {
        assert!(matches!(
            parse_delete_target("delete my bench press"),
            Err(DomainError::UnparseableDeleteTarget(_))
        ));
        assert!(matches!(
            parse_delete_target("remove #abc"),
            Err(DomainError::UnparseableDeleteTarget(_))
        ));
    }

    #[test]
    fn plain_repeat_has_no_modifiers() {
        for text in ["again", "repeat last", "same as last time"] {
            let overrides = modifiers(text);
            assert_eq!(overrides.load, None, "{text}");
            assert_eq!(overrides.times, 1, "{text}");
            assert_eq!(overrides.note, None, "{text}");
        }
    }

    #[test]
    fn weight_overrides_follow_prepositions_or_units() {
        assert_eq!(modifiers("again at 35 lbs").load, Some(Load::lbs(35.0)));
        assert_eq!(modifiers("again for 35 lb").load, Some(Load::lbs(35.0)));
        assert_eq!(modifiers("again @ 40").load, Some(Load::lbs(40.0)));
        assert_eq!(modifiers("again @40").load, Some(Load::lbs(40.0)));
        assert_eq!(
            modifiers("again at 20 kg").load,
            Some(Load::new(20.0, WeightUnit::Kg))
        );
        assert_eq!(modifiers("again 35 lbs").load, Some(Load::lbs(35.0)));
        assert_eq!(modifiers("again 60kg").load, Some(Load::new(60.0, WeightUnit::Kg)));
    }

    #[test]
    fn repeat_counts_are_parsed() {
        assert_eq!(modifiers("again twice").times, 2);
        assert_eq!(modifiers("again x2").times, 2);
        assert_eq!(modifiers("again 3 times").times, 3);
        assert_eq!(modifiers("again 3 times").load, None);
    }

    #[test]
    fn repeat_counts_above_the_limit_are_rejected() {
        assert_eq!(modifiers("again x10").times, MAX_REPEAT_TIMES);
        for (text, requested) in [
            ("again x11", 11),
            ("again x4294967295", 4_294_967_295),
            ("again 50 times", 50),
            ("again x99999999999999999999999", u64::MAX),
        ] {
            assert_eq!(
                parse_repeat_modifiers(text),
                Err(DomainError::RepeatCountTooLarge { requested, max: MAX_REPEAT_TIMES }),
                "{text}"
            );
        }
    }

    #[test]
    fn weight_and_count_combine_without_leaving_a_note() {
        let overrides = modifiers("again at 35 lbs twice");
        assert_eq!(overrides.load, Some(Load::lbs(35.0)));
        assert_eq!(overrides.times, 2);
        assert_eq!(overrides.note, None);
    }

    #[test]
    fn leftover_text_becomes_the_note() {
        assert_eq!(
            modifiers("again, elbow feels better").note.as_deref(),
            Some("elbow feels better")
        );
        assert_eq!(
            modifiers("Again didn't struggle this time").note.as_deref(),
            Some("didn't struggle this time")
        );
        assert_eq!(
            modifiers("same thing but felt easier").note.as_deref(),
            Some("but felt easier")
        );
        let overrides = modifiers("again at 35 lbs, elbow fine");
        assert_eq!(overrides.load, Some(Load::lbs(35.0)));
        assert_eq!(overrides.note.as_deref(), Some("elbow fine"));
    }
}
