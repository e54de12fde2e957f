//! Daily challenges evaluated against a per-day metrics snapshot.
//!
//! A day's record is created lazily the first time it is evaluated. Once a
//! challenge is completed it stays completed for that day, and the transition
//! is reported exactly once as a [`ChallengeCompleted`] event.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Attempt;

// Gaps longer than this between attempts count as a break, not focus time
const FOCUS_GAP_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    Attempts,
    Accuracy,
    Streak,
    Focus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChallengeTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub kind: ChallengeKind,
    pub target: f64,
    /// Attempts needed before the metric counts at all.
    pub min_attempts: u32,
}

pub const TEMPLATES: [ChallengeTemplate; 4] = [
    ChallengeTemplate {
        id: "attempts-20",
        title: "Answer 20 drills",
        kind: ChallengeKind::Attempts,
        target: 20.0,
        min_attempts: 0,
    },
    ChallengeTemplate {
        id: "accuracy-85",
        title: "Reach 85% accuracy over at least 10 drills",
        kind: ChallengeKind::Accuracy,
        target: 85.0,
        min_attempts: 10,
    },
    ChallengeTemplate {
        id: "streak-5",
        title: "Get 5 in a row",
        kind: ChallengeKind::Streak,
        target: 5.0,
        min_attempts: 0,
    },
    ChallengeTemplate {
        id: "focus-10",
        title: "Practice for 10 focused minutes",
        kind: ChallengeKind::Focus,
        target: 10.0,
        min_attempts: 0,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub attempts: u32,
    pub correct: u32,
    /// Percent correct, 0 with no attempts.
    pub accuracy: f64,
    /// Consecutive correct answers ending at the day's last attempt.
    pub streak: u32,
    pub focus_minutes: f64,
}

impl DailyMetrics {
    /// Snapshot of one UTC day. Attempts from other days are ignored.
    pub fn from_attempts(attempts: &[Attempt], date: NaiveDate) -> Self {
        let mut today: Vec<&Attempt> = attempts
            .iter()
            .filter(|a| a.created_at.date_naive() == date)
            .collect();
        today.sort_by_key(|a| a.created_at);

        let total = today.len() as u32;
        let correct = today.iter().filter(|a| a.correct).count() as u32;
        let accuracy = if total == 0 {
            0.0
        } else {
            correct as f64 * 100.0 / total as f64
        };
        let streak = today.iter().rev().take_while(|a| a.correct).count() as u32;

        Self {
            date,
            attempts: total,
            correct,
            accuracy,
            streak,
            focus_minutes: focus_minutes(&today),
        }
    }

    fn value(&self, kind: ChallengeKind) -> f64 {
        match kind {
            ChallengeKind::Attempts => self.attempts as f64,
            ChallengeKind::Accuracy => self.accuracy,
            ChallengeKind::Streak => self.streak as f64,
            ChallengeKind::Focus => self.focus_minutes,
        }
    }
}

// Sum of short gaps between consecutive attempts, plus the first answer's
// own latency when it was measured
fn focus_minutes(sorted: &[&Attempt]) -> f64 {
    let lead = sorted
        .first()
        .and_then(|a| a.latency_ms)
        .map(|ms| ms.max(0) / 1000)
        .unwrap_or(0);
    let gaps: i64 = sorted
        .windows(2)
        .map(|w| (w[1].created_at - w[0].created_at).num_seconds())
        .filter(|secs| (0..=FOCUS_GAP_SECS).contains(secs))
        .sum();
    (lead + gaps) as f64 / 60.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeStatus {
    pub id: String,
    pub title: String,
    pub kind: ChallengeKind,
    pub target: f64,
    pub progress: f64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ChallengeStatus {
    fn from_template(t: &ChallengeTemplate) -> Self {
        Self {
            id: t.id.to_string(),
            title: t.title.to_string(),
            kind: t.kind,
            target: t.target,
            progress: 0.0,
            completed: false,
            completed_at: None,
        }
    }
}

/// Emitted once when a challenge first reaches its target on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeCompleted {
    pub user_id: String,
    pub date: NaiveDate,
    pub challenge_id: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyChallengeRecord {
    pub user_id: String,
    pub date: NaiveDate,
    pub challenges: Vec<ChallengeStatus>,
}

impl DailyChallengeRecord {
    pub fn new(user_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            challenges: TEMPLATES.iter().map(ChallengeStatus::from_template).collect(),
        }
    }

    pub fn completed_count(&self) -> usize {
        self.challenges.iter().filter(|c| c.completed).count()
    }

    /// Update progress from `metrics` and return newly completed challenges.
    pub fn evaluate(&mut self, metrics: &DailyMetrics, now: DateTime<Utc>) -> Vec<ChallengeCompleted> {
        if metrics.date != self.date {
            log::warn!(
                "metrics for {} applied to challenge record for {}; ignoring",
                metrics.date,
                self.date
            );
            return Vec::new();
        }

        let mut events = Vec::new();
        for status in &mut self.challenges {
            let Some(template) = TEMPLATES.iter().find(|t| t.id == status.id) else {
                continue;
            };
            let counted = metrics.attempts >= template.min_attempts;
            let value = if counted { metrics.value(template.kind) } else { 0.0 };
            status.progress = status.progress.max(value.min(template.target));

            if status.completed || !counted || value < template.target {
                continue;
            }
            status.completed = true;
            status.completed_at = Some(now);
            log::info!("challenge {} completed for {} on {}", status.id, self.user_id, self.date);
            events.push(ChallengeCompleted {
                user_id: self.user_id.clone(),
                date: self.date,
                challenge_id: status.id.clone(),
                completed_at: now,
            });
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mood, Person, Tense};
    use chrono::{Duration, TimeZone};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()
    }

    fn attempt(correct: bool, at: DateTime<Utc>) -> Attempt {
        Attempt {
            id: 0,
            user_id: "u1".to_string(),
            lemma: "hablar".to_string(),
            mood: Mood::Indicative,
            tense: Tense::Pres,
            person: Person::FirstSingular,
            correct,
            accent_error: false,
            latency_ms: None,
            created_at: at,
        }
    }

    // One attempt per minute starting at `start()`
    fn session(results: &[bool]) -> Vec<Attempt> {
        results
            .iter()
            .enumerate()
            .map(|(i, c)| attempt(*c, start() + Duration::minutes(i as i64)))
            .collect()
    }

    mod metrics_tests {
        use super::*;

        #[test]
        fn counts_and_accuracy() {
            let m = DailyMetrics::from_attempts(&session(&[true, false, true, true]), day());
            assert_eq!(m.attempts, 4);
            assert_eq!(m.correct, 3);
            assert!((m.accuracy - 75.0).abs() < 1e-9);
        }

        #[test]
        fn streak_ends_at_last_attempt() {
            let m = DailyMetrics::from_attempts(&session(&[true, true, true, false, true, true]), day());
            assert_eq!(m.streak, 2);
            let broken = DailyMetrics::from_attempts(&session(&[true, true, false]), day());
            assert_eq!(broken.streak, 0);
        }

        #[test]
        fn other_days_are_ignored() {
            let mut attempts = session(&[true]);
            attempts.push(attempt(true, start() - Duration::days(1)));
            assert_eq!(DailyMetrics::from_attempts(&attempts, day()).attempts, 1);
        }

        #[test]
        fn focus_skips_long_breaks() {
            let mut attempts = session(&[true, true, true]);
            attempts.push(attempt(true, start() + Duration::hours(2)));
            let m = DailyMetrics::from_attempts(&attempts, day());
            assert!((m.focus_minutes - 2.0).abs() < 1e-9);
        }

        #[test]
        fn empty_day() {
            let m = DailyMetrics::from_attempts(&[], day());
            assert_eq!(m.attempts, 0);
            assert_eq!(m.accuracy, 0.0);
            assert_eq!(m.focus_minutes, 0.0);
        }
    }

    mod record_tests {
        use super::*;

        #[test]
        fn new_record_has_all_templates() {
            let record = DailyChallengeRecord::new("u1", day());
            assert_eq!(record.challenges.len(), 4);
            assert_eq!(record.completed_count(), 0);
        }

        #[test]
        fn streak_completion_emits_one_event() {
            let mut record = DailyChallengeRecord::new("u1", day());
            let metrics = DailyMetrics::from_attempts(&session(&[true; 5]), day());
            let events = record.evaluate(&metrics, start());
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].challenge_id, "streak-5");

            // Re-evaluating the same metrics does not re-emit
            assert!(record.evaluate(&metrics, start()).is_empty());
        }

        #[test]
        fn completion_is_monotonic() {
            let mut record = DailyChallengeRecord::new("u1", day());
            let hot = DailyMetrics::from_attempts(&session(&[true; 5]), day());
            record.evaluate(&hot, start());
            let cold = DailyMetrics::from_attempts(&session(&[true, true, true, true, true, false]), day());
            record.evaluate(&cold, start());
            let streak = record.challenges.iter().find(|c| c.id == "streak-5").unwrap();
            assert!(streak.completed);
            assert_eq!(streak.progress, 5.0);
        }

        #[test]
        fn accuracy_needs_minimum_attempts() {
            let mut record = DailyChallengeRecord::new("u1", day());
            let few = DailyMetrics::from_attempts(&session(&[true; 9]), day());
            let events = record.evaluate(&few, start());
            assert!(events.iter().all(|e| e.challenge_id != "accuracy-85"));

            let enough = DailyMetrics::from_attempts(&session(&[true; 10]), day());
            let events = record.evaluate(&enough, start());
            assert!(events.iter().any(|e| e.challenge_id == "accuracy-85"));
        }

        #[test]
        fn full_session_completes_everything() {
            let mut record = DailyChallengeRecord::new("u1", day());
            let metrics = DailyMetrics::from_attempts(&session(&[true; 20]), day());
            let events = record.evaluate(&metrics, start());
            assert_eq!(events.len(), 4);
            assert_eq!(record.completed_count(), 4);
        }

        #[test]
        fn mismatched_day_is_ignored() {
            let mut record = DailyChallengeRecord::new("u1", day());
            let other = DailyMetrics::from_attempts(&[], day().succ_opt().unwrap());
            assert!(record.evaluate(&other, start()).is_empty());
        }
    }
}
