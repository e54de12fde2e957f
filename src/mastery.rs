//! Time-decayed mastery scores.
//!
//! Scores are recomputed from the full attempt list on every query rather
//! than updated incrementally, so changing the decay constant re-scores all
//! past work.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::{Attempt, MasteryRecord, Mood, Tense};

/// Decay time constant in days: an attempt this old counts `1/e` as much.
pub const DECAY_TAU_DAYS: f64 = 10.0;

const SCORE_CORRECT: f64 = 100.0;
const SCORE_ACCENT_SLIP: f64 = 70.0;

pub fn attempt_score(attempt: &Attempt) -> f64 {
    match (attempt.correct, attempt.accent_error) {
        (true, false) => SCORE_CORRECT,
        (true, true) => SCORE_ACCENT_SLIP,
        (false, _) => 0.0,
    }
}

pub fn decay_weight(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    // Attempts stamped in the future count as fresh
    let age_days = (now - created_at).num_seconds().max(0) as f64 / 86_400.0;
    (-age_days / DECAY_TAU_DAYS).exp()
}

/// Weighted mean of per-attempt scores in `[0, 100]`; 0 with no attempts.
pub fn decayed_score<'a, I>(attempts: I, now: DateTime<Utc>) -> f64
where
    I: IntoIterator<Item = &'a Attempt>,
{
    let (weighted, total) = attempts.into_iter().fold((0.0, 0.0), |(sum, w), a| {
        let weight = decay_weight(a.created_at, now);
        (sum + weight * attempt_score(a), w + weight)
    });
    if total <= 0.0 {
        0.0
    } else {
        (weighted / total).clamp(0.0, 100.0)
    }
}

/// One record per (mood, tense) that has at least one attempt.
pub fn mastery_records(user_id: &str, attempts: &[Attempt], now: DateTime<Utc>) -> Vec<MasteryRecord> {
    let mut grouped: BTreeMap<(Mood, Tense), Vec<&Attempt>> = BTreeMap::new();
    for attempt in attempts.iter().filter(|a| a.user_id == user_id) {
        grouped
            .entry((attempt.mood, attempt.tense))
            .or_default()
            .push(attempt);
    }

    grouped
        .into_iter()
        .map(|((mood, tense), group)| {
            let updated_at = group
                .iter()
                .map(|a| a.created_at)
                .max()
                .unwrap_or(now);
            MasteryRecord {
                user_id: user_id.to_string(),
                mood,
                tense,
                score: decayed_score(group.iter().copied(), now),
                count: group.len() as u32,
                updated_at,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Person;
    use chrono::Duration;

    fn attempt(correct: bool, accent_error: bool, days_ago: i64, now: DateTime<Utc>) -> Attempt {
        Attempt {
            id: 0,
            user_id: "u1".to_string(),
            lemma: "hablar".to_string(),
            mood: Mood::Indicative,
            tense: Tense::Pres,
            person: Person::FirstSingular,
            correct,
            accent_error,
            latency_ms: None,
            created_at: now - Duration::days(days_ago),
        }
    }

    #[test]
    fn per_attempt_scores() {
        let now = Utc::now();
        assert_eq!(attempt_score(&attempt(true, false, 0, now)), 100.0);
        assert_eq!(attempt_score(&attempt(true, true, 0, now)), 70.0);
        assert_eq!(attempt_score(&attempt(false, true, 0, now)), 0.0);
    }

    #[test]
    fn weight_decays_with_age() {
        let now = Utc::now();
        assert!((decay_weight(now, now) - 1.0).abs() < 1e-9);
        let ten_days = decay_weight(now - Duration::days(10), now);
        assert!((ten_days - (-1.0f64).exp()).abs() < 1e-6);
        assert!((decay_weight(now + Duration::days(3), now) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn recent_attempts_dominate() {
        let now = Utc::now();
        let improving = vec![attempt(false, false, 30, now), attempt(true, false, 0, now)];
        let declining = vec![attempt(true, false, 30, now), attempt(false, false, 0, now)];
        assert!(decayed_score(&improving, now) > 50.0);
        assert!(decayed_score(&declining, now) < 50.0);
    }

    #[test]
    fn empty_history_scores_zero() {
        assert_eq!(decayed_score(&Vec::<Attempt>::new(), Utc::now()), 0.0);
        assert!(mastery_records("u1", &[], Utc::now()).is_empty());
    }

    #[test]
    fn records_group_by_mood_and_tense() {
        let now = Utc::now();
        let mut attempts = vec![attempt(true, false, 0, now), attempt(true, false, 1, now)];
        attempts.push(Attempt {
            tense: Tense::Impf,
            ..attempt(false, false, 0, now)
        });
        attempts.push(Attempt {
            user_id: "other".to_string(),
            ..attempt(false, false, 0, now)
        });

        let records = mastery_records("u1", &attempts, now);
        assert_eq!(records.len(), 2);
        let pres = records.iter().find(|r| r.tense == Tense::Pres).unwrap();
        assert_eq!(pres.count, 2);
        assert!((pres.score - 100.0).abs() < 1e-9);
        let impf = records.iter().find(|r| r.tense == Tense::Impf).unwrap();
        assert_eq!(impf.score, 0.0);
    }
}
