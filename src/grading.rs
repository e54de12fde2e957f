//! Answer grading and review-quality mapping.

use serde::Serialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::curriculum::LevelPolicy;
use crate::models::{Rating, Tense, VerbForm};

// Response time assumed when the level sets no limit
const DEFAULT_TIME_BUDGET_MS: i64 = 20_000;

const COMBINING_TILDE: char = '\u{303}';

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeResult {
    pub correct: bool,
    pub accent_error: bool,
    pub missing_clitic: bool,
    pub expected: String,
    /// Accepted variant category that matched, e.g. `voseo`.
    pub variant: Option<String>,
}

/// NFC-compose, lowercase, trim, and collapse inner whitespace.
pub fn normalize(s: &str) -> String {
    s.nfc()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Drop diacritics except the tilde of `ñ`, which marks a different letter.
pub fn strip_accents(s: &str) -> String {
    let mut folded = String::with_capacity(s.len());
    let mut base = None;
    for c in s.nfd() {
        if is_combining_mark(c) {
            if c == COMBINING_TILDE && matches!(base, Some('n' | 'N')) {
                folded.push(c);
            }
            continue;
        }
        base = Some(c);
        folded.push(c);
    }
    folded.nfc().collect()
}

struct Candidate<'a> {
    text: &'a str,
    variant: Option<&'a str>,
}

pub fn grade(form: &VerbForm, response: &str, policy: &LevelPolicy) -> GradeResult {
    let answer = normalize(response);
    let clitic = form
        .accepts
        .get("clitic")
        .filter(|_| policy.require_clitics && form.tense == Tense::ImpAff);

    let mut candidates: Vec<Candidate> = Vec::new();
    match clitic {
        // Only the clitic form counts once clitics are required
        Some(required) => candidates.push(Candidate {
            text: required,
            variant: Some("clitic"),
        }),
        None => {
            candidates.push(Candidate {
                text: &form.value,
                variant: None,
            });
            candidates.extend(form.alt.iter().map(|a| Candidate {
                text: a,
                variant: Some("alt"),
            }));
            candidates.extend(form.accepts.iter().map(|(k, v)| Candidate {
                text: v,
                variant: Some(k.as_str()),
            }));
        }
    }
    let expected = candidates
        .first()
        .map(|c| c.text.to_string())
        .unwrap_or_else(|| form.value.clone());

    if let Some(hit) = candidates.iter().find(|c| normalize(c.text) == answer) {
        return GradeResult {
            correct: true,
            accent_error: false,
            missing_clitic: false,
            expected,
            variant: hit.variant.map(str::to_string),
        };
    }

    let bare = strip_accents(&answer);
    if let Some(hit) = candidates
        .iter()
        .find(|c| strip_accents(&normalize(c.text)) == bare)
    {
        return GradeResult {
            correct: !policy.strict_accents,
            accent_error: true,
            missing_clitic: false,
            expected,
            variant: hit.variant.map(str::to_string),
        };
    }

    let missing_clitic = clitic.is_some()
        && strip_accents(&normalize(&form.value)) == bare;
    GradeResult {
        correct: false,
        accent_error: false,
        missing_clitic,
        expected,
        variant: None,
    }
}

/// Map a graded answer and its latency to a review rating.
///
/// Wrong answers are `Again`. Accent slips and answers slower than the time
/// limit are `Hard`; answers inside 40% of the limit are `Easy`.
pub fn review_rating(result: &GradeResult, latency_ms: Option<i64>, policy: &LevelPolicy) -> Rating {
    if !result.correct {
        return Rating::Again;
    }
    if result.accent_error {
        return Rating::Hard;
    }

    let budget = policy
        .time_limit_secs
        .map(|s| s as i64 * 1000)
        .unwrap_or(DEFAULT_TIME_BUDGET_MS);
    match latency_ms {
        Some(ms) if ms > budget => Rating::Hard,
        Some(ms) if ms * 10 <= budget * 4 => Rating::Easy,
        _ => Rating::Good,
    }
}
