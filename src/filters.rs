//! Form filters.
//!
//! Each stage is a pure narrowing of a candidate list. Stages never fail: an
//! empty result is the generator's cue to start relaxing [`Constraints`].

use std::collections::BTreeSet;

use serde::Serialize;

use crate::corpus::Corpus;
use crate::curriculum;
use crate::models::{
    FamilyGroup, IrregularFamily, Level, Mood, Person, PracticeMode, Region, Settings, Tense,
    TenseSelection, VerbForm, VerbType,
};

// Families that belong in a third-person preterite drill
const THIRD_PERSON_FAMILIES: [IrregularFamily; 3] = [
    IrregularFamily::EIIr,
    IrregularFamily::OUGerIr,
    IrregularFamily::HiatusY,
];

/// Second-person forms legal in `region`, before any override flags.
pub fn region_persons(region: Region) -> BTreeSet<Person> {
    let excluded: &[Person] = match region {
        Region::Rioplatense => &[Person::SecondSingularTu, Person::SecondPluralVosotros],
        Region::LaGeneral => &[Person::SecondSingularVos, Person::SecondPluralVosotros],
        Region::Peninsular => &[Person::SecondSingularVos],
        Region::Both => &[],
    };
    Person::ALL
        .iter()
        .copied()
        .filter(|p| !excluded.contains(p))
        .collect()
}

/// Dialect-legal persons with the explicit `use_*` flags applied.
///
/// The flags only ever add persons.
pub fn allowed_persons(settings: &Settings) -> BTreeSet<Person> {
    let mut persons = region_persons(settings.region);
    if settings.use_voseo {
        persons.insert(Person::SecondSingularVos);
    }
    if settings.use_tuteo {
        persons.insert(Person::SecondSingularTu);
    }
    if settings.use_vosotros {
        persons.insert(Person::SecondPluralVosotros);
    }
    persons
}

/// The set of restrictions a candidate form must satisfy.
///
/// Built from [`Settings`] and then selectively loosened by the fallback
/// chain. `None` in a field means "no restriction".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constraints {
    pub specific: Option<(Mood, TenseSelection)>,
    pub verb_type: VerbType,
    pub persons: Option<BTreeSet<Person>>,
    pub pronoun: Option<Person>,
    pub level: Option<Level>,
    pub family: Option<FamilyGroup>,
    pub third_person_drill: bool,
}

impl Constraints {
    pub fn from_settings(settings: &Settings) -> Self {
        let specific = settings.specific_pair();
        // An exact tense choice bypasses the level gate
        let level = match settings.practice_mode {
            PracticeMode::Specific | PracticeMode::Theme => None,
            PracticeMode::Mixed => Some(settings.effective_level()),
        };

        Self {
            specific,
            verb_type: settings.verb_type,
            persons: Some(allowed_persons(settings)),
            pronoun: settings.practice_pronoun,
            level,
            family: settings.selected_family,
            third_person_drill: third_person_drill_active(settings),
        }
    }

    // No restriction at all
    pub fn unrestricted() -> Self {
        Self {
            specific: None,
            verb_type: VerbType::All,
            persons: None,
            pronoun: None,
            level: None,
            family: None,
            third_person_drill: false,
        }
    }

    pub fn admits(&self, form: &VerbForm, corpus: &Corpus) -> bool {
        matches_specific(form, self)
            && matches_verb_type(form, corpus, self.verb_type)
            && matches_person(form, self)
            && matches_level(form, self.level)
            && matches_family(form, corpus, self.family)
            && matches_third_person_drill(form, corpus, self.third_person_drill)
    }
}

/// Whether the third-person preterite restriction applies to these settings.
pub fn third_person_drill_active(settings: &Settings) -> bool {
    let preterite_target = settings
        .specific_tense
        .map_or(true, |t| t.contains(Tense::PretIndef));
    let third_person_focus = settings.selected_family == Some(FamilyGroup::PreteriteThirdPerson)
        || settings.practice_pronoun.is_some_and(|p| p.is_third());

    settings.verb_type == VerbType::Irregular && preterite_target && third_person_focus
}

pub fn matches_specific(form: &VerbForm, c: &Constraints) -> bool {
    match c.specific {
        Some((mood, tense)) => form.mood == mood && tense.contains(form.tense),
        None => true,
    }
}

pub fn matches_verb_type(form: &VerbForm, corpus: &Corpus, verb_type: VerbType) -> bool {
    // Unresolvable lemmas are bad data and never pass, even under `All`
    match corpus.kind_of(&form.lemma) {
        Some(kind) => verb_type.admits(kind),
        None => false,
    }
}

pub fn matches_person(form: &VerbForm, c: &Constraints) -> bool {
    if let Some(persons) = &c.persons {
        if !persons.contains(&form.person) {
            return false;
        }
    }
    match c.pronoun {
        Some(p) if form.mood != Mood::Nonfinite => form.person == p,
        _ => true,
    }
}

pub fn matches_level(form: &VerbForm, level: Option<Level>) -> bool {
    match level {
        Some(level) => curriculum::is_allowed(level, form.mood, form.tense),
        None => true,
    }
}

pub fn matches_family(form: &VerbForm, corpus: &Corpus, family: Option<FamilyGroup>) -> bool {
    match family {
        Some(group) => corpus
            .verb(&form.lemma)
            .is_some_and(|v| v.has_any_family(group.tags())),
        None => true,
    }
}

pub fn matches_third_person_drill(form: &VerbForm, corpus: &Corpus, active: bool) -> bool {
    if !active || form.tense != Tense::PretIndef || !form.person.is_third() {
        return true;
    }
    corpus
        .verb(&form.lemma)
        .is_some_and(|v| v.has_any_family(&THIRD_PERSON_FAMILIES) && !v.has_strong_preterite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Specific,
    VerbType,
    Dialect,
    Level,
    Family,
    ThirdPerson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage: Stage,
    pub before: usize,
    pub after: usize,
}

fn narrow<'a, F>(
    forms: Vec<&'a VerbForm>,
    stage: Stage,
    trace: &mut Vec<StageCount>,
    keep: F,
) -> Vec<&'a VerbForm>
where
    F: Fn(&VerbForm) -> bool,
{
    let before = forms.len();
    let out: Vec<&VerbForm> = forms.into_iter().filter(|f| keep(*f)).collect();
    log::debug!("filter {:?}: {} -> {}", stage, before, out.len());
    trace.push(StageCount {
        stage,
        before,
        after: out.len(),
    });
    out
}

/// Run every stage in order, recording candidate counts into `trace`.
pub fn apply<'a>(
    forms: &[&'a VerbForm],
    corpus: &Corpus,
    c: &Constraints,
    trace: &mut Vec<StageCount>,
) -> Vec<&'a VerbForm> {
    let out = narrow(forms.to_vec(), Stage::Specific, trace, |f| matches_specific(f, c));
    let out = narrow(out, Stage::VerbType, trace, |f| {
        matches_verb_type(f, corpus, c.verb_type)
    });
    let out = narrow(out, Stage::Dialect, trace, |f| matches_person(f, c));
    let out = narrow(out, Stage::Level, trace, |f| matches_level(f, c.level));
    let out = narrow(out, Stage::Family, trace, |f| {
        matches_family(f, corpus, c.family)
    });
    narrow(out, Stage::ThirdPerson, trace, |f| {
        matches_third_person_drill(f, corpus, c.third_person_drill)
    })
}

/// Eligible forms for `settings` without fallback.
pub fn eligible<'a>(corpus: &'a Corpus, settings: &Settings) -> Vec<&'a VerbForm> {
    let forms = corpus.forms_for_region(settings.region);
    apply(&forms, corpus, &Constraints::from_settings(settings), &mut Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn specific(mood: Mood, tense: Tense) -> Settings {
        Settings {
            practice_mode: PracticeMode::Specific,
            specific_mood: Some(mood),
            specific_tense: Some(tense.into()),
            ..Settings::default()
        }
    }

    fn lemmas(forms: &[&VerbForm]) -> HashSet<String> {
        forms.iter().map(|f| f.lemma.clone()).collect()
    }

    mod dialect_tests {
        use super::*;

        #[test]
        fn rioplatense_excludes_tu_and_vosotros() {
            let persons = region_persons(Region::Rioplatense);
            assert!(!persons.contains(&Person::SecondSingularTu));
            assert!(!persons.contains(&Person::SecondPluralVosotros));
            assert!(persons.contains(&Person::SecondSingularVos));
        }

        #[test]
        fn la_general_excludes_vos_and_vosotros() {
            let persons = region_persons(Region::LaGeneral);
            assert!(!persons.contains(&Person::SecondSingularVos));
            assert!(!persons.contains(&Person::SecondPluralVosotros));
        }

        #[test]
        fn peninsular_excludes_vos_only() {
            let persons = region_persons(Region::Peninsular);
            assert!(!persons.contains(&Person::SecondSingularVos));
            assert!(persons.contains(&Person::SecondPluralVosotros));
        }

        #[test]
        fn explicit_voseo_widens_la_general() {
            let settings = Settings {
                region: Region::LaGeneral,
                use_voseo: true,
                ..Settings::default()
            };
            assert!(allowed_persons(&settings).contains(&Person::SecondSingularVos));
            let corpus = Corpus::builtin();
            let forms = eligible(&corpus, &settings);
            assert!(forms.iter().any(|f| f.person == Person::SecondSingularVos));
        }

        #[test]
        fn pronoun_practice_narrows_but_keeps_nonfinite() {
            let corpus = Corpus::builtin();
            let settings = Settings {
                practice_pronoun: Some(Person::FirstPlural),
                ..Settings::default()
            };
            let forms = eligible(&corpus, &settings);
            assert!(!forms.is_empty());
            assert!(forms
                .iter()
                .all(|f| f.person == Person::FirstPlural || f.mood == Mood::Nonfinite));
        }

        #[test]
        fn pronoun_practice_never_widens() {
            let corpus = Corpus::builtin();
            let settings = Settings {
                region: Region::Rioplatense,
                practice_pronoun: Some(Person::SecondSingularTu),
                ..Settings::default()
            };
            let forms = eligible(&corpus, &settings);
            assert!(forms.iter().all(|f| f.person != Person::SecondSingularTu));
        }

        fn arb_region() -> impl Strategy<Value = Region> {
            prop_oneof![
                Just(Region::Rioplatense),
                Just(Region::LaGeneral),
                Just(Region::Peninsular),
            ]
        }

        fn arb_level() -> impl Strategy<Value = Level> {
            prop_oneof![
                Just(Level::A1),
                Just(Level::A2),
                Just(Level::B1),
                Just(Level::B2),
                Just(Level::C1),
                Just(Level::C2),
                Just(Level::All),
            ]
        }

        fn arb_verb_type() -> impl Strategy<Value = VerbType> {
            prop_oneof![
                Just(VerbType::All),
                Just(VerbType::Regular),
                Just(VerbType::Irregular),
            ]
        }

        proptest! {
            // Property: without override flags, dialect exclusions always hold
            #[test]
            fn prop_dialect_invariant(
                region in arb_region(),
                level in arb_level(),
                verb_type in arb_verb_type(),
            ) {
                let corpus = Corpus::builtin();
                let settings = Settings {
                    region,
                    level: Some(level),
                    verb_type,
                    ..Settings::default()
                };
                let excluded: Vec<Person> = Person::ALL
                    .iter()
                    .copied()
                    .filter(|p| !region_persons(region).contains(p))
                    .collect();
                for form in eligible(&corpus, &settings) {
                    prop_assert!(!excluded.contains(&form.person));
                }
            }
        }
    }

    mod pipeline_tests {
        use super::*;

        #[test]
        fn rioplatense_a1_regular_present_is_not_empty() {
            let corpus = Corpus::builtin();
            let settings = Settings {
                region: Region::Rioplatense,
                level: Some(Level::A1),
                verb_type: VerbType::Regular,
                ..specific(Mood::Indicative, Tense::Pres)
            };
            let forms = eligible(&corpus, &settings);
            assert!(!forms.is_empty());
            assert!(forms.iter().all(|f| f.tense == Tense::Pres));
        }

        #[test]
        fn strong_stem_family_scenario() {
            let corpus = Corpus::builtin();
            let settings = Settings {
                selected_family: Some(FamilyGroup::PreteriteStrongStem),
                level: Some(Level::All),
                ..specific(Mood::Indicative, Tense::PretIndef)
            };
            let found = lemmas(&eligible(&corpus, &settings));
            for lemma in ["estar", "tener", "hacer", "decir"] {
                assert!(found.contains(lemma), "{} missing", lemma);
            }
            for lemma in ["dormir", "pedir", "empezar"] {
                assert!(!found.contains(lemma), "{} should be excluded", lemma);
            }
        }

        #[test]
        fn verb_type_never_grows_the_set() {
            let corpus = Corpus::builtin();
            for base in [
                Settings::default(),
                specific(Mood::Indicative, Tense::PretIndef),
                Settings {
                    region: Region::Peninsular,
                    level: Some(Level::B2),
                    ..Settings::default()
                },
            ] {
                let all = eligible(&corpus, &Settings { verb_type: VerbType::All, ..base.clone() });
                let regular = eligible(&corpus, &Settings { verb_type: VerbType::Regular, ..base.clone() });
                let irregular = eligible(&corpus, &Settings { verb_type: VerbType::Irregular, ..base.clone() });
                assert!(regular.len() <= all.len());
                assert!(irregular.len() <= all.len());
                assert_eq!(regular.len() + irregular.len(), all.len());
            }
        }

        #[test]
        fn level_filter_skipped_in_specific_mode() {
            let corpus = Corpus::builtin();
            let settings = Settings {
                level: Some(Level::A1),
                ..specific(Mood::Subjunctive, Tense::SubjPlusc)
            };
            assert!(!eligible(&corpus, &settings).is_empty());
        }

        #[test]
        fn level_filter_applies_in_mixed_mode() {
            let corpus = Corpus::builtin();
            let settings = Settings {
                level: Some(Level::A1),
                ..Settings::default()
            };
            let forms = eligible(&corpus, &settings);
            assert!(forms
                .iter()
                .all(|f| curriculum::is_allowed(Level::A1, f.mood, f.tense)));
        }

        #[test]
        fn mixed_imperative_alias_expands() {
            let corpus = Corpus::builtin();
            let settings = Settings {
                practice_mode: PracticeMode::Theme,
                specific_mood: Some(Mood::Imperative),
                specific_tense: Some(TenseSelection::ImperativeMixed),
                ..Settings::default()
            };
            let tenses: HashSet<Tense> = eligible(&corpus, &settings).iter().map(|f| f.tense).collect();
            assert_eq!(tenses, HashSet::from([Tense::ImpAff, Tense::ImpNeg]));
        }

        #[test]
        fn unknown_lemmas_are_dropped() {
            let corpus = Corpus::builtin();
            let stray = VerbForm::new("inventar_x", Mood::Indicative, Tense::Pres, Person::FirstSingular, "x");
            assert!(!matches_verb_type(&stray, &corpus, VerbType::All));
        }

        #[test]
        fn trace_records_every_stage() {
            let corpus = Corpus::builtin();
            let forms = corpus.forms_for_region(Region::LaGeneral);
            let mut trace = Vec::new();
            apply(&forms, &corpus, &Constraints::from_settings(&Settings::default()), &mut trace);
            assert_eq!(trace.len(), 6);
            assert_eq!(trace[0].before, forms.len());
            assert!(trace.windows(2).all(|w| w[0].after == w[1].before));
        }
    }

    mod third_person_tests {
        use super::*;

        fn third_person_settings() -> Settings {
            Settings {
                verb_type: VerbType::Irregular,
                practice_pronoun: Some(Person::ThirdPlural),
                ..specific(Mood::Indicative, Tense::PretIndef)
            }
        }

        #[test]
        fn activation_requires_irregular_and_third_focus() {
            assert!(third_person_drill_active(&third_person_settings()));
            let regular = Settings {
                verb_type: VerbType::All,
                ..third_person_settings()
            };
            assert!(!third_person_drill_active(&regular));
            let first = Settings {
                practice_pronoun: Some(Person::FirstSingular),
                ..third_person_settings()
            };
            assert!(!third_person_drill_active(&first));
            let other_tense = Settings {
                specific_tense: Some(Tense::Impf.into()),
                ..third_person_settings()
            };
            assert!(!third_person_drill_active(&other_tense));
        }

        #[test]
        fn keeps_pedagogical_families_and_drops_strong_stems() {
            let corpus = Corpus::builtin();
            let found = lemmas(&eligible(&corpus, &third_person_settings()));
            for lemma in ["dormir", "pedir", "sentir", "leer"] {
                assert!(found.contains(lemma), "{} missing", lemma);
            }
            for lemma in ["decir", "tener", "estar", "ser", "empezar"] {
                assert!(!found.contains(lemma), "{} should be excluded", lemma);
            }
        }

        #[test]
        fn family_group_triggers_filter() {
            let corpus = Corpus::builtin();
            let settings = Settings {
                verb_type: VerbType::Irregular,
                selected_family: Some(FamilyGroup::PreteriteThirdPerson),
                ..specific(Mood::Indicative, Tense::PretIndef)
            };
            let forms = eligible(&corpus, &settings);
            assert!(!forms
                .iter()
                .any(|f| f.lemma == "decir" && f.person.is_third()));
            // decir has E_I_IR, so its non-third forms survive the family stage
            assert!(forms.iter().any(|f| f.lemma == "decir"));
        }
    }
}
