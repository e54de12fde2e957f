//! Per-form answer history used to weight selection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::models::{Attempt, Mood, Person, Region, Tense, VerbForm};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStats {
    pub seen: u32,
    pub correct: u32,
}

impl ItemStats {
    /// Laplace-smoothed accuracy, `(correct + 1) / (seen + 2)`.
    ///
    /// Unseen items score 0.5, so a single miss already ranks below them.
    pub fn accuracy(&self) -> f64 {
        (self.correct as f64 + 1.0) / (self.seen as f64 + 2.0)
    }
}

/// Counters keyed by `mood:tense:person:value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: HashMap<String, ItemStats>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, form: &VerbForm, correct: bool) {
        self.record_key(form.history_key(), correct);
    }

    pub fn record_key(&mut self, key: String, correct: bool) {
        let stats = self.entries.entry(key).or_default();
        stats.seen += 1;
        if correct {
            stats.correct += 1;
        }
    }

    pub fn stats(&self, form: &VerbForm) -> ItemStats {
        self.entries
            .get(&form.history_key())
            .copied()
            .unwrap_or_default()
    }

    pub fn accuracy(&self, form: &VerbForm) -> f64 {
        self.stats(form).accuracy()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild counters from stored attempts.
    ///
    /// Attempts name a cell, not a surface value, so each one is resolved
    /// against the forms `region` drills; attempts on unknown cells are
    /// skipped.
    pub fn from_attempts(attempts: &[Attempt], corpus: &Corpus, region: Region) -> Self {
        let cells: HashMap<(&str, Mood, Tense, Person), &VerbForm> = corpus
            .forms_for_region(region)
            .into_iter()
            .map(|f| ((f.lemma.as_str(), f.mood, f.tense, f.person), f))
            .collect();

        let mut history = Self::new();
        let mut skipped = 0;
        for attempt in attempts {
            let key = (attempt.lemma.as_str(), attempt.mood, attempt.tense, attempt.person);
            match cells.get(&key) {
                Some(form) => history.record(form, attempt.correct),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            log::debug!("history: skipped {} attempts with no matching form", skipped);
        }
        history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn form(value: &str) -> VerbForm {
        VerbForm::new("hablar", Mood::Indicative, Tense::Pres, Person::FirstSingular, value)
    }

    #[test]
    fn unseen_item_has_half_accuracy() {
        let history = History::new();
        assert!((history.accuracy(&form("hablo")) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn laplace_smoothing() {
        let stats = ItemStats { seen: 10, correct: 1 };
        assert!((stats.accuracy() - 2.0 / 12.0).abs() < 1e-9);
        let stats = ItemStats { seen: 10, correct: 9 };
        assert!((stats.accuracy() - 10.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn record_counts_seen_and_correct() {
        let mut history = History::new();
        let f = form("hablo");
        history.record(&f, true);
        history.record(&f, false);
        history.record(&f, true);
        assert_eq!(history.stats(&f), ItemStats { seen: 3, correct: 2 });
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn from_attempts_resolves_values() {
        let corpus = Corpus::builtin();
        let attempt = Attempt {
            id: 0,
            user_id: "u".to_string(),
            lemma: "hablar".to_string(),
            mood: Mood::Indicative,
            tense: Tense::Pres,
            person: Person::FirstSingular,
            correct: false,
            accent_error: false,
            latency_ms: None,
            created_at: Utc::now(),
        };
        let unknown = Attempt {
            lemma: "zzz".to_string(),
            ..attempt.clone()
        };
        let history = History::from_attempts(&[attempt, unknown], &corpus, Region::LaGeneral);
        assert_eq!(history.stats(&form("hablo")), ItemStats { seen: 1, correct: 0 });
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn from_attempts_credits_the_regional_value() {
        let corpus = Corpus::from_json(
            r#"[{"lemma":"hablar","type":"regular","paradigms":[
                {"regions":["peninsular"],"forms":[
                    {"lemma":"hablar","mood":"imperative","tense":"impAff","person":"2s_vos","value":"habla"}
                ]},
                {"regions":["rioplatense"],"forms":[
                    {"lemma":"hablar","mood":"imperative","tense":"impAff","person":"2s_vos","value":"hablá"}
                ]}
            ]}]"#,
        )
        .unwrap();
        let attempt = Attempt {
            id: 0,
            user_id: "u".to_string(),
            lemma: "hablar".to_string(),
            mood: Mood::Imperative,
            tense: Tense::ImpAff,
            person: Person::SecondSingularVos,
            correct: true,
            accent_error: false,
            latency_ms: None,
            created_at: Utc::now(),
        };
        let history = History::from_attempts(&[attempt], &corpus, Region::Rioplatense);
        let vos = |value: &str| {
            VerbForm::new("hablar", Mood::Imperative, Tense::ImpAff, Person::SecondSingularVos, value)
        };
        assert_eq!(history.stats(&vos("hablá")), ItemStats { seen: 1, correct: 1 });
        assert_eq!(history.stats(&vos("habla")), ItemStats::default());
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut history = History::new();
        history.record(&form("hablo"), true);
        let json = serde_json::to_string(&history).unwrap();
        assert_eq!(json, r#"{"indicative:pres:1s:hablo":{"seen":1,"correct":1}}"#);
    }
}
