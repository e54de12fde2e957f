//! Spaced repetition scheduling for (mood, tense, person) cells.
//!
//! The default path walks a fixed interval ladder scaled by an SM-2 style
//! ease factor. Setting a target retention in Expert Mode switches scheduling
//! to FSRS.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rs_fsrs::{Card, Parameters, State, FSRS};
use serde::{Deserialize, Serialize};

use crate::models::{Mood, Person, Rating, Tense};

pub const DEFAULT_INTERVALS: [u32; 7] = [1, 3, 7, 14, 30, 60, 120];
pub const DEFAULT_EASE: f64 = 2.5;
pub const MIN_EASE: f64 = 1.3;
pub const DEFAULT_FUZZ_RATIO: f64 = 0.05;

const MAX_FUZZ_RATIO: f64 = 0.5;
const LAPSE_EASE_PENALTY: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrsConfig {
    pub ease_start: f64,
    pub min_ease: f64,
    pub fuzz_ratio: f64,
    pub intervals: Vec<u32>,
    /// When set, reviews are scheduled with FSRS at this retention.
    pub target_retention: Option<f64>,
}

impl Default for SrsConfig {
    fn default() -> Self {
        Self {
            ease_start: DEFAULT_EASE,
            min_ease: MIN_EASE,
            fuzz_ratio: DEFAULT_FUZZ_RATIO,
            intervals: DEFAULT_INTERVALS.to_vec(),
            target_retention: None,
        }
    }
}

/// Per-user Expert Mode settings. Each field left `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpertModeOverrides {
    pub ease_start: Option<f64>,
    pub min_ease: Option<f64>,
    pub fuzz_ratio: Option<f64>,
    pub intervals: Option<Vec<u32>>,
    pub target_retention: Option<f64>,
}

impl ExpertModeOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl SrsConfig {
    /// Merge overrides field by field. Out-of-range values are ignored with a
    /// warning.
    pub fn with_overrides(&self, overrides: &ExpertModeOverrides) -> Self {
        let mut merged = self.clone();

        if let Some(min_ease) = overrides.min_ease {
            if min_ease > 0.0 && min_ease.is_finite() {
                merged.min_ease = min_ease;
            } else {
                log::warn!("ignoring min_ease override {}", min_ease);
            }
        }
        if let Some(ease) = overrides.ease_start {
            if ease.is_finite() && ease >= merged.min_ease {
                merged.ease_start = ease;
            } else {
                log::warn!("ignoring ease_start override {} (min {})", ease, merged.min_ease);
            }
        }
        if let Some(fuzz) = overrides.fuzz_ratio {
            if (0.0..=MAX_FUZZ_RATIO).contains(&fuzz) {
                merged.fuzz_ratio = fuzz;
            } else {
                log::warn!("ignoring fuzz_ratio override {}", fuzz);
            }
        }
        if let Some(intervals) = &overrides.intervals {
            if !intervals.is_empty() && intervals.iter().all(|d| *d > 0) {
                merged.intervals = intervals.clone();
            } else {
                log::warn!("ignoring interval ladder override {:?}", intervals);
            }
        }
        if let Some(retention) = overrides.target_retention {
            if retention > 0.0 && retention < 1.0 {
                merged.target_retention = Some(retention);
            } else {
                log::warn!("ignoring target_retention override {}", retention);
            }
        }

        merged
    }

    fn interval_at(&self, step: u32) -> f64 {
        let last = self.intervals.len().saturating_sub(1);
        self.intervals
            .get((step as usize).min(last))
            .copied()
            .unwrap_or(1) as f64
    }

    fn last_step(&self) -> u32 {
        self.intervals.len().saturating_sub(1) as u32
    }
}

/// Review state of one conjugation cell for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub user_id: String,
    pub mood: Mood,
    pub tense: Tense,
    pub person: Person,
    pub due_at: DateTime<Utc>,
    pub ease: f64,
    pub interval_days: f64,
    /// Position on the interval ladder.
    pub step: u32,
    pub reps: u32,
    pub lapses: u32,
    #[serde(default)]
    pub stability: Option<f64>,
    #[serde(default)]
    pub difficulty: Option<f64>,
    #[serde(default)]
    pub last_review: Option<DateTime<Utc>>,
}

impl ScheduleItem {
    /// A fresh cell, due immediately.
    pub fn new(
        user_id: impl Into<String>,
        mood: Mood,
        tense: Tense,
        person: Person,
        config: &SrsConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            mood,
            tense,
            person,
            due_at: now,
            ease: config.ease_start,
            interval_days: 0.0,
            step: 0,
            reps: 0,
            lapses: 0,
            stability: None,
            difficulty: None,
            last_review: None,
        }
    }

    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.mood, self.tense, self.person)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }
}

/// Schedule the next review of `item` after answering with `rating`.
pub fn review<R: Rng + ?Sized>(
    item: &ScheduleItem,
    rating: Rating,
    config: &SrsConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> ScheduleItem {
    match config.target_retention {
        Some(retention) => review_fsrs(item, rating, retention, now),
        None => review_ladder(item, rating, config, now, rng),
    }
}

// SM-2 ease update for response quality q in 0..=5
fn adjusted_ease(ease: f64, rating: Rating, min_ease: f64) -> f64 {
    if !rating.is_pass() {
        return (ease - LAPSE_EASE_PENALTY).max(min_ease);
    }
    let q = rating.quality() as f64;
    let delta = 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
    (ease + delta).max(min_ease)
}

fn review_ladder<R: Rng + ?Sized>(
    item: &ScheduleItem,
    rating: Rating,
    config: &SrsConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> ScheduleItem {
    let ease = adjusted_ease(item.ease, rating, config.min_ease);
    let mut next = item.clone();
    next.ease = ease;
    next.reps = item.reps + 1;
    next.last_review = Some(now);

    let interval_days = match rating {
        Rating::Again => {
            next.lapses = item.lapses + 1;
            next.step = 0;
            config.interval_at(0)
        }
        _ => {
            // A new cell enters the ladder at its first rung
            let advance = match (item.reps, rating) {
                (0, Rating::Easy) => 1,
                (0, _) => 0,
                (_, Rating::Hard) => 0,
                (_, Rating::Good) => 1,
                (_, _) => 2,
            };
            next.step = (item.step + advance).min(config.last_step());
            let scaled = config.interval_at(next.step) * ease / config.ease_start;
            fuzz(scaled, config.fuzz_ratio, rng).max(1.0)
        }
    };

    next.interval_days = interval_days;
    next.due_at = now + days(interval_days);
    log::debug!(
        "rescheduled {} after {}: step={} ease={:.2} interval={:.1}d",
        item.key(),
        rating.as_str(),
        next.step,
        ease,
        interval_days
    );
    next
}

fn fuzz<R: Rng + ?Sized>(interval: f64, ratio: f64, rng: &mut R) -> f64 {
    if ratio <= 0.0 {
        return interval;
    }
    interval * rng.gen_range((1.0 - ratio)..=(1.0 + ratio))
}

fn days(d: f64) -> Duration {
    Duration::seconds((d * 86_400.0).round() as i64)
}

fn fsrs_rating(rating: Rating) -> rs_fsrs::Rating {
    match rating {
        Rating::Again => rs_fsrs::Rating::Again,
        Rating::Hard => rs_fsrs::Rating::Hard,
        Rating::Good => rs_fsrs::Rating::Good,
        Rating::Easy => rs_fsrs::Rating::Easy,
    }
}

fn review_fsrs(item: &ScheduleItem, rating: Rating, retention: f64, now: DateTime<Utc>) -> ScheduleItem {
    let fsrs = FSRS::new(Parameters {
        request_retention: retention,
        ..Default::default()
    });

    let mut card = Card::new();
    if let (Some(stability), Some(difficulty), Some(last_review)) =
        (item.stability, item.difficulty, item.last_review)
    {
        card.state = State::Review;
        card.stability = stability;
        card.difficulty = difficulty;
        card.last_review = last_review;
        card.due = item.due_at;
    }

    let record_log = fsrs.repeat(card, now);
    let scheduled = &record_log[&fsrs_rating(rating)];

    let mut next = item.clone();
    next.reps = item.reps + 1;
    if !rating.is_pass() {
        next.lapses = item.lapses + 1;
    }
    next.due_at = scheduled.card.due;
    next.stability = Some(scheduled.card.stability);
    next.difficulty = Some(scheduled.card.difficulty);
    next.last_review = Some(now);
    next.interval_days = (scheduled.card.due - now).num_seconds().max(0) as f64 / 86_400.0;
    log::debug!(
        "fsrs rescheduled {} after {}: stability={:.2} due={}",
        item.key(),
        rating.as_str(),
        scheduled.card.stability,
        scheduled.card.due
    );
    next
}

/// Items due at `now`, most overdue first.
pub fn due_items(items: &[ScheduleItem], now: DateTime<Utc>) -> Vec<&ScheduleItem> {
    let mut due: Vec<&ScheduleItem> = items.iter().filter(|i| i.is_due(now)).collect();
    due.sort_by_key(|i| i.due_at);
    due
}
