//! CEFR curriculum gate and per-level drill policy.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{Level, Mood, Settings, Tense};

// Combinations introduced at each level, in level order
const A1_COMBOS: &[(Mood, Tense)] = &[
    (Mood::Indicative, Tense::Pres),
    (Mood::Nonfinite, Tense::Inf),
];

const A2_COMBOS: &[(Mood, Tense)] = &[
    (Mood::Indicative, Tense::PretIndef),
    (Mood::Indicative, Tense::Impf),
    (Mood::Indicative, Tense::Fut),
    (Mood::Imperative, Tense::ImpAff),
    (Mood::Nonfinite, Tense::Ger),
    (Mood::Nonfinite, Tense::Part),
];

const B1_COMBOS: &[(Mood, Tense)] = &[
    (Mood::Indicative, Tense::PretPerf),
    (Mood::Indicative, Tense::Plusc),
    (Mood::Conditional, Tense::Cond),
    (Mood::Subjunctive, Tense::SubjPres),
    (Mood::Imperative, Tense::ImpNeg),
];

const B2_COMBOS: &[(Mood, Tense)] = &[
    (Mood::Subjunctive, Tense::SubjImpf),
    (Mood::Subjunctive, Tense::SubjPerf),
    (Mood::Indicative, Tense::FutPerf),
    (Mood::Conditional, Tense::CondPerf),
];

const C1_COMBOS: &[(Mood, Tense)] = &[(Mood::Subjunctive, Tense::SubjPlusc)];

const C2_COMBOS: &[(Mood, Tense)] = &[];

fn introduced_at(level: Level) -> &'static [(Mood, Tense)] {
    match level {
        Level::A1 => A1_COMBOS,
        Level::A2 => A2_COMBOS,
        Level::B1 => B1_COMBOS,
        Level::B2 => B2_COMBOS,
        Level::C1 => C1_COMBOS,
        Level::C2 => C2_COMBOS,
        Level::All => &[],
    }
}

/// Every (mood, tense) pair a learner at `level` may be drilled on.
///
/// Each level's inventory contains all earlier levels. `Level::All` is the
/// union of every concrete level.
pub fn allowed_combos(level: Level) -> BTreeSet<(Mood, Tense)> {
    let ceiling = match level {
        Level::All => Level::C2,
        other => other,
    };
    Level::CONCRETE
        .iter()
        .filter(|l| **l <= ceiling)
        .flat_map(|l| introduced_at(*l).iter().copied())
        .collect()
}

// String form used by persisted settings; unknown levels allow nothing
pub fn allowed_combo_keys(level: &str) -> BTreeSet<String> {
    match Level::from_str(level) {
        Some(l) => allowed_combos(l)
            .into_iter()
            .map(|(m, t)| crate::models::combo_key(m, t))
            .collect(),
        None => BTreeSet::new(),
    }
}

pub fn is_allowed(level: Level, mood: Mood, tense: Tense) -> bool {
    allowed_combos(level).contains(&(mood, tense))
}

// First level at which a combination is taught
pub fn level_introducing(mood: Mood, tense: Tense) -> Option<Level> {
    Level::CONCRETE
        .iter()
        .copied()
        .find(|l| introduced_at(*l).contains(&(mood, tense)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPolicy {
    pub time_limit_secs: Option<u32>,
    pub strict_accents: bool,
    pub require_clitics: bool,
}

impl LevelPolicy {
    pub fn for_level(level: Level) -> Self {
        match level {
            Level::A1 | Level::A2 => LevelPolicy {
                time_limit_secs: None,
                strict_accents: false,
                require_clitics: false,
            },
            Level::B1 | Level::All => LevelPolicy {
                time_limit_secs: Some(20),
                strict_accents: false,
                require_clitics: false,
            },
            Level::B2 => LevelPolicy {
                time_limit_secs: Some(15),
                strict_accents: true,
                require_clitics: false,
            },
            Level::C1 => LevelPolicy {
                time_limit_secs: Some(12),
                strict_accents: true,
                require_clitics: true,
            },
            Level::C2 => LevelPolicy {
                time_limit_secs: Some(10),
                strict_accents: true,
                require_clitics: true,
            },
        }
    }

    // Level defaults with any per-session overrides applied
    pub fn resolve(settings: &Settings) -> Self {
        let base = Self::for_level(settings.effective_level());
        LevelPolicy {
            time_limit_secs: settings.time_limit_secs.or(base.time_limit_secs),
            strict_accents: settings.strict_accents.unwrap_or(base.strict_accents),
            require_clitics: settings.require_clitics.unwrap_or(base.require_clitics),
        }
    }
}
