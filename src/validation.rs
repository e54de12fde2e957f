//! Post-selection integrity checks.
//!
//! The filters decide what is eligible; this module re-checks the chosen form
//! against the constraints it was selected under. A failure here means a bug
//! upstream, not a user error.

use serde::Serialize;

use crate::corpus::{self, Corpus};
use crate::curriculum;
use crate::error::{ConjugaError, Result};
use crate::filters::Constraints;
use crate::models::{Mood, Settings, VerbForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityFailure {
    SpecificMismatch,
    IllegalPerson,
    LevelViolation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrityReport {
    pub success: bool,
    pub reason: Option<IntegrityFailure>,
    pub details: String,
}

impl IntegrityReport {
    fn ok() -> Self {
        Self {
            success: true,
            reason: None,
            details: String::new(),
        }
    }

    fn fail(reason: IntegrityFailure, details: String) -> Self {
        Self {
            success: false,
            reason: Some(reason),
            details,
        }
    }
}

pub fn integrity_guard(
    form: &VerbForm,
    settings: &Settings,
    constraints: &Constraints,
) -> IntegrityReport {
    let report = check(form, constraints);
    if !report.success {
        log::error!(
            "integrity guard tripped: {:?} ({}); form={:?} constraints={:?} settings={:?}",
            report.reason,
            report.details,
            form,
            constraints,
            settings
        );
    }
    report
}

fn check(form: &VerbForm, c: &Constraints) -> IntegrityReport {
    if let Some((mood, tense)) = c.specific {
        if form.mood != mood || !tense.contains(form.tense) {
            return IntegrityReport::fail(
                IntegrityFailure::SpecificMismatch,
                format!(
                    "expected {} {}, got {} {}",
                    mood, tense, form.mood, form.tense
                ),
            );
        }
    }

    if let Some(persons) = &c.persons {
        if !persons.contains(&form.person) {
            return IntegrityReport::fail(
                IntegrityFailure::IllegalPerson,
                format!("person {} is not legal here", form.person),
            );
        }
    }
    if let Some(p) = c.pronoun {
        if form.mood != Mood::Nonfinite && form.person != p {
            return IntegrityReport::fail(
                IntegrityFailure::IllegalPerson,
                format!("expected pronoun {}, got {}", p, form.person),
            );
        }
    }

    if let Some(level) = c.level {
        if !curriculum::is_allowed(level, form.mood, form.tense) {
            return IntegrityReport::fail(
                IntegrityFailure::LevelViolation,
                format!("{} {} is not taught at {}", form.mood, form.tense, level.as_str()),
            );
        }
    }

    IntegrityReport::ok()
}

/// Reject a specific-practice configuration that the corpus cannot cover.
///
/// Only the specific mood/tense pair is checked: relaxing the other
/// constraints is the fallback chain's job, but no relaxation can invent
/// forms for a pair the corpus lacks entirely.
pub fn validate_eligible_forms(
    eligible: &[&VerbForm],
    corpus: &Corpus,
    settings: &Settings,
) -> Result<()> {
    let Some((mood, tense)) = settings.specific_pair() else {
        return Ok(());
    };
    if !eligible.is_empty() {
        return Ok(());
    }

    let covered = corpus::coverage(corpus)
        .iter()
        .any(|((m, t), count)| *m == mood && tense.contains(*t) && *count > 0);
    if covered {
        return Ok(());
    }

    log::warn!("no corpus coverage for {} {}", mood, tense);
    Err(ConjugaError::NoEligibleForms { mood, tense })
}
