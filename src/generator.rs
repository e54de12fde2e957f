//! Next-item selection.
//!
//! `choose_next` filters the corpus (relaxing through the fallback chain as
//! needed), rebalances regular and irregular verbs, and then prefers the
//! forms the learner gets wrong most often.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::corpus::Corpus;
use crate::error::Result;
use crate::fallback::{self, Strategy, StrategyAttempt};
use crate::filters::{self, Constraints};
use crate::history::History;
use crate::models::{DrillItem, DrillMode, Person, Settings, VerbForm, VerbKind, VerbType};
use crate::validation::{self, IntegrityReport};

/// Target share of irregular verbs when no verb type is chosen.
pub const IRREGULAR_SHARE: f64 = 0.7;

// Candidates rejected by the integrity guard before giving up
pub const MAX_GUARD_RETRIES: usize = 5;

pub const MAX_DOUBLE_ATTEMPTS: usize = 4;

/// How a selection was reached, for tests and `--json` diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectionTrace {
    pub attempts: Vec<StrategyAttempt>,
    pub strategy: Option<Strategy>,
    pub weighted: bool,
    pub tied: usize,
    pub person_group: Option<Person>,
    pub rejected: Vec<IntegrityReport>,
}

#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub form: &'a VerbForm,
    pub constraints: Constraints,
    pub trace: SelectionTrace,
}

/// Resample `candidates` so that roughly 70% of draws are irregular.
///
/// Draws are with replacement, one per candidate. When either group is
/// empty the other group takes its whole share, so the input comes back
/// unchanged.
pub fn apply_weighted_selection<'a, R: Rng + ?Sized>(
    candidates: &[&'a VerbForm],
    corpus: &Corpus,
    rng: &mut R,
) -> Vec<&'a VerbForm> {
    let irregular = candidates
        .iter()
        .filter(|f| corpus.kind_of(&f.lemma) == Some(VerbKind::Irregular))
        .count();
    let regular = candidates.len() - irregular;
    if irregular == 0 || regular == 0 {
        return candidates.to_vec();
    }

    let weights: Vec<f64> = candidates
        .iter()
        .map(|f| {
            if corpus.kind_of(&f.lemma) == Some(VerbKind::Irregular) {
                IRREGULAR_SHARE / irregular as f64
            } else {
                (1.0 - IRREGULAR_SHARE) / regular as f64
            }
        })
        .collect();
    let total_weight: f64 = weights.iter().sum();

    (0..candidates.len())
        .map(|_| {
            let mut random_point = rng.gen::<f64>() * total_weight;
            for (i, weight) in weights.iter().enumerate() {
                random_point -= weight;
                if random_point <= 0.0 {
                    return candidates[i];
                }
            }
            candidates[candidates.len() - 1]
        })
        .collect()
}

/// Pick among the lowest-accuracy candidates.
///
/// Ties are broken by first choosing a person at random and then a form
/// within that person, so a cluster of weak forms in one person does not
/// crowd out the others.
pub fn select_by_accuracy<'a, R: Rng + ?Sized>(
    candidates: &[&'a VerbForm],
    history: &History,
    rng: &mut R,
    trace: &mut SelectionTrace,
) -> Option<&'a VerbForm> {
    let scored: Vec<(f64, &VerbForm)> = candidates
        .iter()
        .map(|f| (history.accuracy(f), *f))
        .collect();
    let min = scored
        .iter()
        .map(|(acc, _)| *acc)
        .fold(f64::INFINITY, f64::min);

    let mut groups: BTreeMap<Person, Vec<&VerbForm>> = BTreeMap::new();
    for (acc, form) in &scored {
        if (acc - min).abs() < 1e-9 {
            groups.entry(form.person).or_default().push(*form);
        }
    }
    trace.tied = groups.values().map(Vec::len).sum();

    let persons: Vec<Person> = groups.keys().copied().collect();
    let person = *persons.choose(rng)?;
    trace.person_group = Some(person);
    groups.get(&person)?.choose(rng).copied()
}

/// Choose the next form to drill, or `None` when nothing at all is available.
pub fn choose_next<'a, R: Rng + ?Sized>(
    corpus: &'a Corpus,
    forms: &[&'a VerbForm],
    history: &History,
    settings: &Settings,
    rng: &mut R,
) -> Option<Selection<'a>> {
    let mut trace = SelectionTrace::default();
    let mut pool = forms.to_vec();

    for _ in 0..=MAX_GUARD_RETRIES {
        let outcome = fallback::run(&pool, corpus, settings, &mut trace.attempts)?;

        let candidates = if settings.verb_type == VerbType::All {
            trace.weighted = true;
            apply_weighted_selection(&outcome.candidates, corpus, rng)
        } else {
            outcome.candidates.clone()
        };
        let form = select_by_accuracy(&candidates, history, rng, &mut trace)?;

        let report = validation::integrity_guard(form, settings, &outcome.constraints);
        if report.success {
            trace.strategy = Some(outcome.strategy);
            log::debug!(
                "selected {} {} {} {} via {}",
                form.lemma,
                form.mood,
                form.tense,
                form.person,
                outcome.strategy.as_str()
            );
            return Some(Selection {
                form,
                constraints: outcome.constraints,
                trace,
            });
        }

        trace.rejected.push(report);
        pool.retain(|f| !std::ptr::eq(*f, form));
    }

    log::error!(
        "gave up after {} integrity guard rejections",
        trace.rejected.len()
    );
    None
}

pub fn drill_item(form: &VerbForm, settings: &Settings) -> DrillItem {
    DrillItem {
        id: format!("{}:{}", form.history_key(), Utc::now().timestamp_millis()),
        lemma: form.lemma.clone(),
        mood: form.mood,
        tense: form.tense,
        person: form.person,
        form: form.clone(),
        settings: settings.clone(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Drill {
    Single { item: DrillItem },
    Double { first: DrillItem, second: DrillItem },
}

impl Drill {
    pub fn items(&self) -> Vec<&DrillItem> {
        match self {
            Drill::Single { item } => vec![item],
            Drill::Double { first, second } => vec![first, second],
        }
    }
}

// A second cell of the same lemma that satisfies the same constraints
fn find_partner<'a, R: Rng + ?Sized>(
    first: &Selection<'a>,
    forms: &[&'a VerbForm],
    corpus: &Corpus,
    rng: &mut R,
) -> Option<&'a VerbForm> {
    let same_lemma: Vec<&VerbForm> = forms
        .iter()
        .copied()
        .filter(|f| f.lemma == first.form.lemma && !std::ptr::eq(*f, first.form))
        .collect();
    filters::apply(&same_lemma, corpus, &first.constraints, &mut Vec::new())
        .choose(rng)
        .copied()
}

/// Two forms of one lemma, retrying with other lemmas a bounded number of
/// times before settling for a single item.
pub fn choose_double<'a, R: Rng + ?Sized>(
    corpus: &'a Corpus,
    forms: &[&'a VerbForm],
    history: &History,
    settings: &Settings,
    rng: &mut R,
) -> Option<(Selection<'a>, Option<&'a VerbForm>)> {
    let mut tried: HashSet<&str> = HashSet::new();
    let mut fallback_single: Option<Selection<'a>> = None;

    for attempt in 0..MAX_DOUBLE_ATTEMPTS {
        let pool: Vec<&VerbForm> = forms
            .iter()
            .copied()
            .filter(|f| !tried.contains(f.lemma.as_str()))
            .collect();
        let Some(first) = choose_next(corpus, &pool, history, settings, rng) else {
            break;
        };

        if let Some(partner) = find_partner(&first, forms, corpus, rng) {
            return Some((first, Some(partner)));
        }

        log::debug!(
            "double mode: no partner for '{}' (attempt {})",
            first.form.lemma,
            attempt + 1
        );
        tried.insert(first.form.lemma.as_str());
        if fallback_single.is_none() {
            fallback_single = Some(first);
        }
    }

    log::info!("double mode degraded to a single item");
    fallback_single.map(|s| (s, None))
}

/// Produce the next drill for `settings`.
///
/// Returns an error only for a specific mood/tense pair with no corpus
/// coverage; `Ok(None)` means the corpus is empty.
pub fn next_drill<R: Rng + ?Sized>(
    corpus: &Corpus,
    history: &History,
    settings: &Settings,
    rng: &mut R,
) -> Result<Option<Drill>> {
    let forms = corpus.forms_for_region(settings.region);
    let eligible = filters::eligible(corpus, settings);
    validation::validate_eligible_forms(&eligible, corpus, settings)?;

    let drill = match settings.drill_mode {
        DrillMode::Single => choose_next(corpus, &forms, history, settings, rng).map(|s| Drill::Single {
            item: drill_item(s.form, settings),
        }),
        DrillMode::Double => {
            choose_double(corpus, &forms, history, settings, rng).map(|(first, second)| match second {
                Some(second) => Drill::Double {
                    first: drill_item(first.form, settings),
                    second: drill_item(second, settings),
                },
                None => Drill::Single {
                    item: drill_item(first.form, settings),
                },
            })
        }
    };
    Ok(drill)
}
