//! Progressive constraint relaxation for when strict filtering finds nothing.
//!
//! Strategies run in a fixed order and the chain stops at the first one that
//! yields candidates. Each strategy loosens the constraints of the one before
//! it, except the emergency step which starts over from the level alone.

use serde::Serialize;

use crate::corpus::Corpus;
use crate::filters::{self, Constraints, StageCount};
use crate::models::{Level, Settings, Tense, TenseSelection, VerbForm, VerbType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Direct,
    RelaxedPerson,
    SimilarTense,
    RelaxedVerbType,
    MixedPractice,
    Emergency,
}

impl Strategy {
    pub const ORDER: [Strategy; 6] = [
        Strategy::Direct,
        Strategy::RelaxedPerson,
        Strategy::SimilarTense,
        Strategy::RelaxedVerbType,
        Strategy::MixedPractice,
        Strategy::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::RelaxedPerson => "relaxed_person",
            Strategy::SimilarTense => "similar_tense",
            Strategy::RelaxedVerbType => "relaxed_verb_type",
            Strategy::MixedPractice => "mixed_practice",
            Strategy::Emergency => "emergency",
        }
    }
}

/// Pedagogically adjacent tense for the similar-tense strategy.
///
/// The table is symmetric and covers exactly four pairs.
pub fn similar_tense(tense: Tense) -> Option<Tense> {
    match tense {
        Tense::PretIndef => Some(Tense::Impf),
        Tense::Impf => Some(Tense::PretIndef),
        Tense::SubjPres => Some(Tense::SubjImpf),
        Tense::SubjImpf => Some(Tense::SubjPres),
        Tense::PretPerf => Some(Tense::Plusc),
        Tense::Plusc => Some(Tense::PretPerf),
        Tense::Fut => Some(Tense::Cond),
        Tense::Cond => Some(Tense::Fut),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyAttempt {
    pub strategy: Strategy,
    pub candidates: usize,
    pub stages: Vec<StageCount>,
}

#[derive(Debug, Clone)]
pub struct FallbackOutcome<'a> {
    pub strategy: Strategy,
    /// Constraints the candidates were filtered under.
    pub constraints: Constraints,
    pub candidates: Vec<&'a VerbForm>,
}

fn attempt<'a>(
    strategy: Strategy,
    forms: &[&'a VerbForm],
    corpus: &Corpus,
    constraints: Constraints,
    trace: &mut Vec<StrategyAttempt>,
) -> Option<FallbackOutcome<'a>> {
    let mut stages = Vec::new();
    let candidates = filters::apply(forms, corpus, &constraints, &mut stages);
    trace.push(StrategyAttempt {
        strategy,
        candidates: candidates.len(),
        stages,
    });

    if candidates.is_empty() {
        log::debug!("fallback {}: no candidates", strategy.as_str());
        return None;
    }
    Some(FallbackOutcome {
        strategy,
        constraints,
        candidates,
    })
}

fn succeeded(outcome: FallbackOutcome<'_>) -> Option<FallbackOutcome<'_>> {
    match outcome.strategy {
        Strategy::Direct => log::debug!("direct filtering: {} candidates", outcome.candidates.len()),
        Strategy::Emergency => log::error!(
            "emergency fallback used ({} candidates); check corpus coverage",
            outcome.candidates.len()
        ),
        s => log::info!(
            "fallback strategy '{}' succeeded with {} candidates",
            s.as_str(),
            outcome.candidates.len()
        ),
    }
    Some(outcome)
}

/// Run the strategy chain over `forms`.
///
/// Returns `None` only when `forms` and the whole corpus are empty.
pub fn run<'a>(
    forms: &[&'a VerbForm],
    corpus: &'a Corpus,
    settings: &Settings,
    trace: &mut Vec<StrategyAttempt>,
) -> Option<FallbackOutcome<'a>> {
    let base = Constraints::from_settings(settings);
    if let Some(out) = attempt(Strategy::Direct, forms, corpus, base.clone(), trace) {
        return succeeded(out);
    }

    let relaxed_person = Constraints {
        pronoun: None,
        ..base.clone()
    };
    if let Some(out) = attempt(Strategy::RelaxedPerson, forms, corpus, relaxed_person.clone(), trace) {
        return succeeded(out);
    }

    if let Some((_, TenseSelection::Single(tense))) = relaxed_person.specific {
        if let Some(alt) = similar_tense(tense) {
            let swapped = Constraints {
                specific: Some((alt.mood(), TenseSelection::Single(alt))),
                ..relaxed_person.clone()
            };
            if let Some(out) = attempt(Strategy::SimilarTense, forms, corpus, swapped, trace) {
                return succeeded(out);
            }
        }
    }

    let relaxed_type = Constraints {
        verb_type: VerbType::All,
        ..relaxed_person
    };
    if let Some(out) = attempt(Strategy::RelaxedVerbType, forms, corpus, relaxed_type.clone(), trace) {
        return succeeded(out);
    }

    let level = Some(settings.effective_level());
    let mixed = Constraints {
        specific: None,
        family: None,
        level,
        ..relaxed_type
    };
    if let Some(out) = attempt(Strategy::MixedPractice, forms, corpus, mixed, trace) {
        return succeeded(out);
    }

    emergency(forms, corpus, &base, level, trace).and_then(succeeded)
}

// Level and dialect, then level only, then anything at all
fn emergency<'a>(
    forms: &[&'a VerbForm],
    corpus: &'a Corpus,
    base: &Constraints,
    level: Option<Level>,
    trace: &mut Vec<StrategyAttempt>,
) -> Option<FallbackOutcome<'a>> {
    let with_dialect = Constraints {
        persons: base.persons.clone(),
        level,
        ..Constraints::unrestricted()
    };
    if let Some(out) = attempt(Strategy::Emergency, forms, corpus, with_dialect, trace) {
        return Some(out);
    }

    let level_only = Constraints {
        level,
        ..Constraints::unrestricted()
    };
    if let Some(out) = attempt(Strategy::Emergency, forms, corpus, level_only, trace) {
        return Some(out);
    }

    let pool: Vec<&VerbForm> = if forms.is_empty() {
        corpus.forms()
    } else {
        forms.to_vec()
    };
    // Last resort skips the filters entirely, so even forms whose lemma
    // does not resolve in the index can be drilled
    trace.push(StrategyAttempt {
        strategy: Strategy::Emergency,
        candidates: pool.len(),
        stages: Vec::new(),
    });
    if pool.is_empty() {
        log::debug!("fallback emergency: corpus is empty");
        return None;
    }
    Some(FallbackOutcome {
        strategy: Strategy::Emergency,
        constraints: Constraints::unrestricted(),
        candidates: pool,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FamilyGroup, Mood, Person, PracticeMode, Region};

    fn run_for(corpus: &Corpus, settings: &Settings) -> (Option<Strategy>, Vec<StrategyAttempt>) {
        let forms = corpus.forms_for_region(settings.region);
        let mut trace = Vec::new();
        let outcome = run(&forms, corpus, settings, &mut trace);
        (outcome.map(|o| o.strategy), trace)
    }

    fn specific(mood: Mood, tense: Tense) -> Settings {
        Settings {
            practice_mode: PracticeMode::Specific,
            specific_mood: Some(mood),
            specific_tense: Some(tense.into()),
            ..Settings::default()
        }
    }

    // Present and imperfect only
    fn small_corpus() -> Corpus {
        Corpus::from_json(
            r#"[
            {"lemma":"hablar","type":"regular","paradigms":[{"regions":[],"forms":[
                {"lemma":"hablar","mood":"indicative","tense":"pres","person":"1s","value":"hablo"},
                {"lemma":"hablar","mood":"indicative","tense":"impf","person":"1s","value":"hablaba"}
            ]}]},
            {"lemma":"ser","type":"irregular","irregular_families":["SUPPLETIVE"],"paradigms":[{"regions":[],"forms":[
                {"lemma":"ser","mood":"indicative","tense":"pres","person":"2s_tu","value":"eres"}
            ]}]}
        ]"#,
        )
        .unwrap()
    }

    mod table_tests {
        use super::*;

        #[test]
        fn similar_tense_is_symmetric() {
            for tense in Tense::ALL {
                if let Some(alt) = similar_tense(tense) {
                    assert_eq!(similar_tense(alt), Some(tense));
                }
            }
        }

        #[test]
        fn conditional_pairs_with_future_across_moods() {
            assert_eq!(similar_tense(Tense::Fut), Some(Tense::Cond));
            assert_eq!(Tense::Cond.mood(), Mood::Conditional);
            assert_eq!(similar_tense(Tense::Pres), None);
        }
    }

    mod chain_tests {
        use super::*;

        #[test]
        fn direct_succeeds_when_filters_match() {
            let corpus = Corpus::builtin();
            let (strategy, trace) = run_for(&corpus, &Settings::default());
            assert_eq!(strategy, Some(Strategy::Direct));
            assert_eq!(trace.len(), 1);
        }

        #[test]
        fn relaxes_pronoun_before_anything_else() {
            let corpus = small_corpus();
            let settings = Settings {
                practice_pronoun: Some(Person::FirstPlural),
                ..specific(Mood::Indicative, Tense::Pres)
            };
            let (strategy, _) = run_for(&corpus, &settings);
            assert_eq!(strategy, Some(Strategy::RelaxedPerson));
        }

        #[test]
        fn swaps_in_similar_tense() {
            let corpus = small_corpus();
            let settings = specific(Mood::Indicative, Tense::PretIndef);
            let forms = corpus.forms_for_region(settings.region);
            let mut trace = Vec::new();
            let outcome = run(&forms, &corpus, &settings, &mut trace).unwrap();
            assert_eq!(outcome.strategy, Strategy::SimilarTense);
            assert!(outcome.candidates.iter().all(|f| f.tense == Tense::Impf));
        }

        #[test]
        fn relaxes_verb_type() {
            let corpus = small_corpus();
            let settings = Settings {
                verb_type: VerbType::Irregular,
                ..specific(Mood::Indicative, Tense::Impf)
            };
            let (strategy, _) = run_for(&corpus, &settings);
            assert_eq!(strategy, Some(Strategy::RelaxedVerbType));
        }

        #[test]
        fn falls_back_to_mixed_practice() {
            let corpus = small_corpus();
            let settings = specific(Mood::Subjunctive, Tense::SubjPlusc);
            let (strategy, trace) = run_for(&corpus, &settings);
            assert_eq!(strategy, Some(Strategy::MixedPractice));
            // subjPlusc has no similar tense, so that step is skipped
            assert!(trace.iter().all(|a| a.strategy != Strategy::SimilarTense));
        }

        #[test]
        fn family_with_coverage_succeeds_directly() {
            let corpus = Corpus::builtin();
            let settings = Settings {
                selected_family: Some(FamilyGroup::Orthographic),
                level: Some(Level::A1),
                ..specific(Mood::Subjunctive, Tense::SubjPlusc)
            };
            // Orthographic verbs do have subjPlusc forms, so direct wins
            assert_eq!(run_for(&corpus, &settings).0, Some(Strategy::Direct));
        }

        #[test]
        fn mixed_practice_keeps_dialect() {
            let corpus = small_corpus();
            let settings = Settings {
                region: Region::Rioplatense,
                level: Some(Level::A1),
                ..specific(Mood::Imperative, Tense::ImpAff)
            };
            let forms = corpus.forms_for_region(settings.region);
            let mut trace = Vec::new();
            let outcome = run(&forms, &corpus, &settings, &mut trace).unwrap();
            // Mixed practice already finds hablo at A1
            assert_eq!(outcome.strategy, Strategy::MixedPractice);
            assert!(outcome
                .candidates
                .iter()
                .all(|f| f.person != Person::SecondSingularTu));
        }

        #[test]
        fn emergency_returns_any_form_as_last_resort() {
            let corpus = Corpus::from_json(
                r#"[{"lemma":"ser","type":"irregular","paradigms":[{"regions":[],"forms":[
                    {"lemma":"ser","mood":"subjunctive","tense":"subjImpf","person":"2s_tu","value":"fueras"}
                ]}]}]"#,
            )
            .unwrap();
            let settings = Settings {
                region: Region::Rioplatense,
                level: Some(Level::A1),
                ..Settings::default()
            };
            let (strategy, trace) = run_for(&corpus, &settings);
            assert_eq!(strategy, Some(Strategy::Emergency));
            assert_eq!(trace.iter().filter(|a| a.strategy == Strategy::Emergency).count(), 3);
        }

        #[test]
        fn emergency_keeps_forms_with_unindexed_lemma() {
            let corpus = Corpus::from_json(
                r#"[{"lemma":"hablar","type":"regular","paradigms":[{"regions":[],"forms":[
                    {"lemma":"Hablar","mood":"indicative","tense":"pres","person":"1s","value":"hablo"}
                ]}]}]"#,
            )
            .unwrap();
            let settings = Settings::default();
            let forms = corpus.forms_for_region(settings.region);
            let mut trace = Vec::new();
            let outcome = run(&forms, &corpus, &settings, &mut trace).unwrap();
            assert_eq!(outcome.strategy, Strategy::Emergency);
            assert_eq!(outcome.candidates.len(), 1);
            assert_eq!(outcome.candidates[0].value, "hablo");
            assert!(trace.last().is_some_and(|a| a.stages.is_empty()));
        }

        #[test]
        fn empty_corpus_yields_none() {
            let corpus = Corpus::new(Vec::new());
            let (strategy, _) = run_for(&corpus, &Settings::default());
            assert_eq!(strategy, None);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::{any, Just};
        use proptest::strategy::Strategy as PropStrategy;
        use proptest::{prop_assert, prop_oneof, proptest};

        fn arb_settings() -> impl PropStrategy<Value = Settings> {
            let regions = prop_oneof![
                Just(Region::Rioplatense),
                Just(Region::LaGeneral),
                Just(Region::Peninsular),
                Just(Region::Both),
            ];
            let tenses = proptest::sample::select(Tense::ALL.to_vec());
            let moods = proptest::sample::select(Mood::ALL.to_vec());
            let types = prop_oneof![
                Just(VerbType::All),
                Just(VerbType::Regular),
                Just(VerbType::Irregular),
            ];
            let persons = proptest::option::of(proptest::sample::select(Person::ALL.to_vec()));
            (regions, tenses, moods, types, persons, any::<bool>()).prop_map(
                |(region, tense, mood, verb_type, pronoun, specific)| Settings {
                    region,
                    practice_mode: if specific {
                        PracticeMode::Specific
                    } else {
                        PracticeMode::Mixed
                    },
                    specific_mood: Some(mood),
                    specific_tense: Some(tense.into()),
                    verb_type,
                    practice_pronoun: pronoun,
                    ..Settings::default()
                },
            )
        }

        proptest! {
            // Property: a non-empty corpus always produces candidates, and
            // every strategy short of emergency keeps the dialect
            #[test]
            fn prop_chain_is_complete(settings in arb_settings()) {
                let corpus = Corpus::builtin();
                let forms = corpus.forms_for_region(settings.region);
                let mut trace = Vec::new();
                let outcome = run(&forms, &corpus, &settings, &mut trace);
                prop_assert!(outcome.is_some());
                let outcome = outcome.unwrap();
                prop_assert!(!outcome.candidates.is_empty());

                if outcome.strategy != Strategy::Emergency {
                    let legal = filters::region_persons(settings.region);
                    prop_assert!(outcome.candidates.iter().all(|f| legal.contains(&f.person)));
                }
            }
        }
    }
}
