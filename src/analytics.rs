//! Dashboard aggregations and their loaders.
//!
//! The aggregations are plain grouping over mastery records. Loading them is
//! non-critical: [`LoadCoordinator`] gives every load a millisecond budget and
//! a cancellation token, a newer load for the same key cancels the older one,
//! and callers that want a value regardless use [`LoadCoordinator::load_or_default`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::curriculum;
use crate::error::{ConjugaError, FailOpen, Result};
use crate::models::{Level, MasteryRecord, Mood, Tense};

pub const DEFAULT_BUDGET_MS: u64 = 250;

const BUCKET_WIDTH: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatCell {
    pub mood: Mood,
    pub tense: Tense,
    /// `None` when the combination has never been attempted.
    pub score: Option<f64>,
    pub count: u32,
    /// Lower bound of the 20-point percentage bucket, e.g. 60 for 60..80.
    pub bucket: Option<u8>,
    /// Level whose curriculum first teaches this combination.
    pub introduced: Option<Level>,
}

pub fn bucket_for(score: f64) -> u8 {
    let clamped = score.clamp(0.0, 100.0);
    // 100 belongs to the top bucket rather than a bucket of its own
    ((clamped / BUCKET_WIDTH).floor().min(4.0) * BUCKET_WIDTH) as u8
}

/// One cell per attempted (mood, tense), or per combination taught at `level`
/// when given, in curriculum order.
pub fn heat_map(records: &[MasteryRecord], level: Option<Level>) -> Vec<HeatCell> {
    let by_combo: HashMap<(Mood, Tense), &MasteryRecord> =
        records.iter().map(|r| ((r.mood, r.tense), r)).collect();

    let cell = |mood: Mood, tense: Tense| {
        let record = by_combo.get(&(mood, tense));
        HeatCell {
            mood,
            tense,
            score: record.map(|r| r.score),
            count: record.map(|r| r.count).unwrap_or(0),
            bucket: record.map(|r| bucket_for(r.score)),
            introduced: curriculum::level_introducing(mood, tense),
        }
    };

    match level {
        Some(level) => curriculum::allowed_combos(level)
            .into_iter()
            .map(|(mood, tense)| cell(mood, tense))
            .collect(),
        None => {
            let mut combos: Vec<(Mood, Tense)> = by_combo.keys().copied().collect();
            combos.sort();
            combos.into_iter().map(|(m, t)| cell(m, t)).collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarAxis {
    pub mood: Mood,
    /// Mean mastery over the mood's attempted tenses; 0 when none.
    pub score: f64,
    pub tenses: usize,
}

pub fn competency_radar(records: &[MasteryRecord]) -> Vec<RadarAxis> {
    let mut grouped: BTreeMap<Mood, Vec<f64>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.mood).or_default().push(record.score);
    }

    Mood::ALL
        .iter()
        .map(|mood| {
            let scores = grouped.get(mood).map(Vec::as_slice).unwrap_or(&[]);
            let score = if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            };
            RadarAxis {
                mood: *mood,
                score,
                tenses: scores.len(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub budget_ms: u64,
    /// Per-operation budgets keyed by load key, e.g. `heatmap`.
    pub budgets: BTreeMap<String, u64>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            budget_ms: DEFAULT_BUDGET_MS,
            budgets: BTreeMap::new(),
        }
    }
}

impl AnalyticsConfig {
    pub fn budget_for(&self, key: &str) -> u64 {
        self.budgets.get(key).copied().unwrap_or(self.budget_ms)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn same(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A running load. Long loads call [`LoadHandle::checkpoint`] between steps.
#[derive(Debug)]
pub struct LoadHandle {
    key: String,
    token: CancelToken,
    started: Instant,
    budget_ms: u64,
}

impl LoadHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn checkpoint(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(ConjugaError::Cancelled {
                key: self.key.clone(),
            });
        }
        if self.started.elapsed().as_millis() > self.budget_ms as u128 {
            return Err(ConjugaError::Timeout {
                key: self.key.clone(),
                budget_ms: self.budget_ms,
            });
        }
        Ok(())
    }
}

/// At most one live load per key.
#[derive(Debug, Default)]
pub struct LoadCoordinator {
    config: AnalyticsConfig,
    inflight: HashMap<String, CancelToken>,
}

impl LoadCoordinator {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self {
            config,
            inflight: HashMap::new(),
        }
    }

    /// Start a load for `key`, cancelling any earlier load of the same key.
    pub fn begin(&mut self, key: &str) -> LoadHandle {
        let token = CancelToken::default();
        if let Some(previous) = self.inflight.insert(key.to_string(), token.clone()) {
            log::debug!("cancelling superseded load '{}'", key);
            previous.cancel();
        }
        LoadHandle {
            key: key.to_string(),
            token,
            started: Instant::now(),
            budget_ms: self.config.budget_for(key),
        }
    }

    pub fn finish(&mut self, handle: &LoadHandle) {
        let current = self
            .inflight
            .get(&handle.key)
            .is_some_and(|t| t.same(&handle.token));
        if current {
            self.inflight.remove(&handle.key);
        }
    }

    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    /// Run `load` under a fresh handle. The result is discarded if the load
    /// was superseded or ran past its budget.
    pub fn run<T, F>(&mut self, key: &str, load: F) -> Result<T>
    where
        F: FnOnce(&LoadHandle) -> Result<T>,
    {
        let handle = self.begin(key);
        let result = load(&handle).and_then(|value| handle.checkpoint().map(|_| value));
        self.finish(&handle);
        result
    }

    pub fn load_or_default<T, F>(&mut self, key: &str, load: F) -> T
    where
        T: Default,
        F: FnOnce(&LoadHandle) -> Result<T>,
    {
        let context = format!("analytics load '{}'", key);
        self.run(key, load).fail_open_default(&context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(mood: Mood, tense: Tense, score: f64) -> MasteryRecord {
        MasteryRecord {
            user_id: "u1".to_string(),
            mood,
            tense,
            score,
            count: 3,
            updated_at: Utc::now(),
        }
    }

    mod heat_map_tests {
        use super::*;

        #[test]
        fn buckets() {
            assert_eq!(bucket_for(0.0), 0);
            assert_eq!(bucket_for(19.9), 0);
            assert_eq!(bucket_for(20.0), 20);
            assert_eq!(bucket_for(79.0), 60);
            assert_eq!(bucket_for(100.0), 80);
            assert_eq!(bucket_for(140.0), 80);
        }

        #[test]
        fn attempted_cells_only_without_level() {
            let records = vec![
                record(Mood::Subjunctive, Tense::SubjPres, 40.0),
                record(Mood::Indicative, Tense::Pres, 90.0),
            ];
            let cells = heat_map(&records, None);
            assert_eq!(cells.len(), 2);
            assert_eq!(cells[0].mood, Mood::Indicative);
            assert_eq!(cells[0].bucket, Some(80));
            assert_eq!(cells[1].bucket, Some(40));
        }

        #[test]
        fn level_adds_untouched_cells() {
            let records = vec![record(Mood::Indicative, Tense::Pres, 55.0)];
            let cells = heat_map(&records, Some(Level::A1));
            assert_eq!(cells.len(), curriculum::allowed_combos(Level::A1).len());
            let pres = cells.iter().find(|c| c.tense == Tense::Pres).unwrap();
            assert_eq!(pres.score, Some(55.0));
            assert_eq!(pres.introduced, Some(Level::A1));
            assert!(cells
                .iter()
                .filter(|c| c.tense != Tense::Pres)
                .all(|c| c.score.is_none() && c.count == 0));
        }
    }

    mod radar_tests {
        use super::*;

        #[test]
        fn averages_per_mood() {
            let records = vec![
                record(Mood::Indicative, Tense::Pres, 80.0),
                record(Mood::Indicative, Tense::Impf, 40.0),
                record(Mood::Subjunctive, Tense::SubjPres, 30.0),
            ];
            let radar = competency_radar(&records);
            assert_eq!(radar.len(), Mood::ALL.len());
            let ind = radar.iter().find(|a| a.mood == Mood::Indicative).unwrap();
            assert!((ind.score - 60.0).abs() < 1e-9);
            assert_eq!(ind.tenses, 2);
            let imp = radar.iter().find(|a| a.mood == Mood::Imperative).unwrap();
            assert_eq!(imp.score, 0.0);
        }
    }

    mod loader_tests {
        use super::*;
        use std::time::Duration;

        #[test]
        fn newer_load_cancels_older() {
            let mut coord = LoadCoordinator::new(AnalyticsConfig::default());
            let first = coord.begin("heatmap");
            let second = coord.begin("heatmap");
            assert!(matches!(first.checkpoint(), Err(ConjugaError::Cancelled { .. })));
            assert!(second.checkpoint().is_ok());
            assert_eq!(coord.in_flight(), 1);

            // Finishing the stale handle leaves the live one registered
            coord.finish(&first);
            assert_eq!(coord.in_flight(), 1);
            coord.finish(&second);
            assert_eq!(coord.in_flight(), 0);
        }

        #[test]
        fn different_keys_are_independent() {
            let mut coord = LoadCoordinator::new(AnalyticsConfig::default());
            let heat = coord.begin("heatmap");
            let _radar = coord.begin("radar");
            assert!(heat.checkpoint().is_ok());
        }

        #[test]
        fn over_budget_times_out() {
            let config = AnalyticsConfig {
                budgets: BTreeMap::from([("slow".to_string(), 0)]),
                ..AnalyticsConfig::default()
            };
            let mut coord = LoadCoordinator::new(config);
            let result: Result<u32> = coord.run("slow", |_| {
                std::thread::sleep(Duration::from_millis(5));
                Ok(1)
            });
            assert!(matches!(result, Err(ConjugaError::Timeout { budget_ms: 0, .. })));
            assert_eq!(coord.in_flight(), 0);
        }

        #[test]
        fn failures_degrade_to_default() {
            let mut coord = LoadCoordinator::new(AnalyticsConfig::default());
            let cells: Vec<HeatCell> =
                coord.load_or_default("heatmap", |_| Err(ConjugaError::not_found("mastery")));
            assert!(cells.is_empty());
        }

        #[test]
        fn successful_load_passes_through() {
            let mut coord = LoadCoordinator::new(AnalyticsConfig::default());
            let records = vec![record(Mood::Indicative, Tense::Pres, 90.0)];
            let radar = coord.load_or_default("radar", |h| {
                h.checkpoint()?;
                Ok(competency_radar(&records))
            });
            assert_eq!(radar.len(), Mood::ALL.len());
        }
    }
}
