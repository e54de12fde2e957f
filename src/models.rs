use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Grammatical mood of a conjugated form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Indicative,
    Subjunctive,
    Imperative,
    Conditional,
    Nonfinite,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Indicative,
        Mood::Subjunctive,
        Mood::Imperative,
        Mood::Conditional,
        Mood::Nonfinite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Indicative => "indicative",
            Mood::Subjunctive => "subjunctive",
            Mood::Imperative => "imperative",
            Mood::Conditional => "conditional",
            Mood::Nonfinite => "nonfinite",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "indicative" | "ind" => Some(Mood::Indicative),
            "subjunctive" | "subj" => Some(Mood::Subjunctive),
            "imperative" | "imp" => Some(Mood::Imperative),
            "conditional" | "cond" => Some(Mood::Conditional),
            "nonfinite" | "nonfin" => Some(Mood::Nonfinite),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mood::Indicative => "Indicativo",
            Mood::Subjunctive => "Subjuntivo",
            Mood::Imperative => "Imperativo",
            Mood::Conditional => "Condicional",
            Mood::Nonfinite => "Formas no personales",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tense {
    Pres,
    PretIndef,
    Impf,
    Fut,
    PretPerf,
    Plusc,
    FutPerf,
    Cond,
    CondPerf,
    SubjPres,
    SubjImpf,
    SubjPerf,
    SubjPlusc,
    ImpAff,
    ImpNeg,
    Inf,
    Ger,
    Part,
}

impl Tense {
    pub const ALL: [Tense; 18] = [
        Tense::Pres,
        Tense::PretIndef,
        Tense::Impf,
        Tense::Fut,
        Tense::PretPerf,
        Tense::Plusc,
        Tense::FutPerf,
        Tense::Cond,
        Tense::CondPerf,
        Tense::SubjPres,
        Tense::SubjImpf,
        Tense::SubjPerf,
        Tense::SubjPlusc,
        Tense::ImpAff,
        Tense::ImpNeg,
        Tense::Inf,
        Tense::Ger,
        Tense::Part,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tense::Pres => "pres",
            Tense::PretIndef => "pretIndef",
            Tense::Impf => "impf",
            Tense::Fut => "fut",
            Tense::PretPerf => "pretPerf",
            Tense::Plusc => "plusc",
            Tense::FutPerf => "futPerf",
            Tense::Cond => "cond",
            Tense::CondPerf => "condPerf",
            Tense::SubjPres => "subjPres",
            Tense::SubjImpf => "subjImpf",
            Tense::SubjPerf => "subjPerf",
            Tense::SubjPlusc => "subjPlusc",
            Tense::ImpAff => "impAff",
            Tense::ImpNeg => "impNeg",
            Tense::Inf => "inf",
            Tense::Ger => "ger",
            Tense::Part => "part",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Tense::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    // Mood a tense belongs to in the corpus
    pub fn mood(&self) -> Mood {
        match self {
            Tense::Pres
            | Tense::PretIndef
            | Tense::Impf
            | Tense::Fut
            | Tense::PretPerf
            | Tense::Plusc
            | Tense::FutPerf => Mood::Indicative,
            Tense::Cond | Tense::CondPerf => Mood::Conditional,
            Tense::SubjPres | Tense::SubjImpf | Tense::SubjPerf | Tense::SubjPlusc => {
                Mood::Subjunctive
            }
            Tense::ImpAff | Tense::ImpNeg => Mood::Imperative,
            Tense::Inf | Tense::Ger | Tense::Part => Mood::Nonfinite,
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            Tense::PretPerf
                | Tense::Plusc
                | Tense::FutPerf
                | Tense::CondPerf
                | Tense::SubjPerf
                | Tense::SubjPlusc
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tense::Pres => "Presente",
            Tense::PretIndef => "Pretérito indefinido",
            Tense::Impf => "Pretérito imperfecto",
            Tense::Fut => "Futuro",
            Tense::PretPerf => "Pretérito perfecto",
            Tense::Plusc => "Pluscuamperfecto",
            Tense::FutPerf => "Futuro perfecto",
            Tense::Cond => "Condicional",
            Tense::CondPerf => "Condicional perfecto",
            Tense::SubjPres => "Presente de subjuntivo",
            Tense::SubjImpf => "Imperfecto de subjuntivo",
            Tense::SubjPerf => "Perfecto de subjuntivo",
            Tense::SubjPlusc => "Pluscuamperfecto de subjuntivo",
            Tense::ImpAff => "Imperativo afirmativo",
            Tense::ImpNeg => "Imperativo negativo",
            Tense::Inf => "Infinitivo",
            Tense::Ger => "Gerundio",
            Tense::Part => "Participio",
        }
    }
}

impl fmt::Display for Tense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tense chosen for specific practice.
///
/// The two mixed selections drill a fixed pair of tenses at once and are
/// resolved through [`TenseSelection::expand`] everywhere a tense is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TenseSelection {
    Single(Tense),
    ImperativeMixed,
    NonfiniteMixed,
}

impl TenseSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenseSelection::Single(t) => t.as_str(),
            TenseSelection::ImperativeMixed => "impMixed",
            TenseSelection::NonfiniteMixed => "nonfiniteMixed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "impMixed" => Some(TenseSelection::ImperativeMixed),
            "nonfiniteMixed" => Some(TenseSelection::NonfiniteMixed),
            other => Tense::from_str(other).map(TenseSelection::Single),
        }
    }

    pub fn expand(&self) -> Vec<Tense> {
        match self {
            TenseSelection::Single(t) => vec![*t],
            TenseSelection::ImperativeMixed => vec![Tense::ImpAff, Tense::ImpNeg],
            TenseSelection::NonfiniteMixed => vec![Tense::Ger, Tense::Part],
        }
    }

    pub fn contains(&self, tense: Tense) -> bool {
        self.expand().contains(&tense)
    }

    // The single tense, if this selection is not a mixed alias
    pub fn single(&self) -> Option<Tense> {
        match self {
            TenseSelection::Single(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<Tense> for TenseSelection {
    fn from(tense: Tense) -> Self {
        TenseSelection::Single(tense)
    }
}

impl TryFrom<String> for TenseSelection {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TenseSelection::from_str(&value).ok_or_else(|| format!("unknown tense '{}'", value))
    }
}

impl From<TenseSelection> for String {
    fn from(value: TenseSelection) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TenseSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Person {
    #[serde(rename = "1s")]
    FirstSingular,
    #[serde(rename = "2s_tu")]
    SecondSingularTu,
    #[serde(rename = "2s_vos")]
    SecondSingularVos,
    #[serde(rename = "3s")]
    ThirdSingular,
    #[serde(rename = "1p")]
    FirstPlural,
    #[serde(rename = "2p_vosotros")]
    SecondPluralVosotros,
    #[serde(rename = "3p")]
    ThirdPlural,
}

impl Person {
    pub const ALL: [Person; 7] = [
        Person::FirstSingular,
        Person::SecondSingularTu,
        Person::SecondSingularVos,
        Person::ThirdSingular,
        Person::FirstPlural,
        Person::SecondPluralVosotros,
        Person::ThirdPlural,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Person::FirstSingular => "1s",
            Person::SecondSingularTu => "2s_tu",
            Person::SecondSingularVos => "2s_vos",
            Person::ThirdSingular => "3s",
            Person::FirstPlural => "1p",
            Person::SecondPluralVosotros => "2p_vosotros",
            Person::ThirdPlural => "3p",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Person::ALL.iter().copied().find(|p| p.as_str() == s)
    }

    pub fn pronoun(&self) -> &'static str {
        match self {
            Person::FirstSingular => "yo",
            Person::SecondSingularTu => "tú",
            Person::SecondSingularVos => "vos",
            Person::ThirdSingular => "él/ella/usted",
            Person::FirstPlural => "nosotros",
            Person::SecondPluralVosotros => "vosotros",
            Person::ThirdPlural => "ellos/ustedes",
        }
    }

    pub fn is_third(&self) -> bool {
        matches!(self, Person::ThirdSingular | Person::ThirdPlural)
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Dialect region, decides which second-person forms are legal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Rioplatense,
    #[default]
    LaGeneral,
    Peninsular,
    Both,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Rioplatense => "rioplatense",
            Region::LaGeneral => "la_general",
            Region::Peninsular => "peninsular",
            Region::Both => "both",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rioplatense" | "rp" => Some(Region::Rioplatense),
            "la_general" | "la" | "latam" => Some(Region::LaGeneral),
            "peninsular" | "es" | "spain" => Some(Region::Peninsular),
            "both" | "all" => Some(Region::Both),
            _ => None,
        }
    }
}

// CEFR proficiency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Level {
    #[default]
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
    #[serde(rename = "ALL")]
    All,
}

impl Level {
    pub const CONCRETE: [Level; 6] = [
        Level::A1,
        Level::A2,
        Level::B1,
        Level::B2,
        Level::C1,
        Level::C2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::A1 => "A1",
            Level::A2 => "A2",
            Level::B1 => "B1",
            Level::B2 => "B2",
            Level::C1 => "C1",
            Level::C2 => "C2",
            Level::All => "ALL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "A1" => Some(Level::A1),
            "A2" => Some(Level::A2),
            "B1" => Some(Level::B1),
            "B2" => Some(Level::B2),
            "C1" => Some(Level::C1),
            "C2" => Some(Level::C2),
            "ALL" => Some(Level::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticeMode {
    #[default]
    Mixed,
    Specific,
    Theme,
}

impl PracticeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PracticeMode::Mixed => "mixed",
            PracticeMode::Specific => "specific",
            PracticeMode::Theme => "theme",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mixed" => Some(PracticeMode::Mixed),
            "specific" => Some(PracticeMode::Specific),
            "theme" => Some(PracticeMode::Theme),
            _ => None,
        }
    }
}

// Verb-type restriction chosen by the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbType {
    #[default]
    All,
    Regular,
    Irregular,
}

impl VerbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerbType::All => "all",
            VerbType::Regular => "regular",
            VerbType::Irregular => "irregular",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(VerbType::All),
            "regular" | "reg" => Some(VerbType::Regular),
            "irregular" | "irreg" => Some(VerbType::Irregular),
            _ => None,
        }
    }

    pub fn admits(&self, kind: VerbKind) -> bool {
        match self {
            VerbType::All => true,
            VerbType::Regular => kind == VerbKind::Regular,
            VerbType::Irregular => kind == VerbKind::Irregular,
        }
    }
}

// Classification of a dictionary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbKind {
    Regular,
    Irregular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IrregularFamily {
    PretUv,
    PretU,
    PretI,
    PretJ,
    PretSuppl,
    EIIr,
    OUGerIr,
    HiatusY,
    DiphtEIe,
    DiphtOUe,
    GVerbs,
    IrregFut,
    OrthCar,
    OrthGar,
    OrthZar,
    Suppletive,
}

impl IrregularFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            IrregularFamily::PretUv => "PRET_UV",
            IrregularFamily::PretU => "PRET_U",
            IrregularFamily::PretI => "PRET_I",
            IrregularFamily::PretJ => "PRET_J",
            IrregularFamily::PretSuppl => "PRET_SUPPL",
            IrregularFamily::EIIr => "E_I_IR",
            IrregularFamily::OUGerIr => "O_U_GER_IR",
            IrregularFamily::HiatusY => "HIATUS_Y",
            IrregularFamily::DiphtEIe => "DIPHT_E_IE",
            IrregularFamily::DiphtOUe => "DIPHT_O_UE",
            IrregularFamily::GVerbs => "G_VERBS",
            IrregularFamily::IrregFut => "IRREG_FUT",
            IrregularFamily::OrthCar => "ORTH_CAR",
            IrregularFamily::OrthGar => "ORTH_GAR",
            IrregularFamily::OrthZar => "ORTH_ZAR",
            IrregularFamily::Suppletive => "SUPPLETIVE",
        }
    }

    // Full-paradigm preterite irregularity
    pub fn is_strong_preterite(&self) -> bool {
        matches!(
            self,
            IrregularFamily::PretUv
                | IrregularFamily::PretU
                | IrregularFamily::PretI
                | IrregularFamily::PretJ
                | IrregularFamily::PretSuppl
        )
    }
}

// Named groups of irregular families offered for themed practice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FamilyGroup {
    PreteriteStrongStem,
    PreteriteThirdPerson,
    StemChange,
    FirstPersonG,
    Orthographic,
}

impl FamilyGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            FamilyGroup::PreteriteStrongStem => "PRETERITE_STRONG_STEM",
            FamilyGroup::PreteriteThirdPerson => "PRETERITE_THIRD_PERSON",
            FamilyGroup::StemChange => "STEM_CHANGE",
            FamilyGroup::FirstPersonG => "FIRST_PERSON_G",
            FamilyGroup::Orthographic => "ORTHOGRAPHIC",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "PRETERITE_STRONG_STEM" => Some(FamilyGroup::PreteriteStrongStem),
            "PRETERITE_THIRD_PERSON" => Some(FamilyGroup::PreteriteThirdPerson),
            "STEM_CHANGE" => Some(FamilyGroup::StemChange),
            "FIRST_PERSON_G" => Some(FamilyGroup::FirstPersonG),
            "ORTHOGRAPHIC" => Some(FamilyGroup::Orthographic),
            _ => None,
        }
    }

    pub fn tags(&self) -> &'static [IrregularFamily] {
        match self {
            FamilyGroup::PreteriteStrongStem => &[
                IrregularFamily::PretUv,
                IrregularFamily::PretU,
                IrregularFamily::PretI,
                IrregularFamily::PretJ,
                IrregularFamily::PretSuppl,
            ],
            FamilyGroup::PreteriteThirdPerson => &[
                IrregularFamily::EIIr,
                IrregularFamily::OUGerIr,
                IrregularFamily::HiatusY,
            ],
            FamilyGroup::StemChange => &[
                IrregularFamily::DiphtEIe,
                IrregularFamily::DiphtOUe,
                IrregularFamily::EIIr,
            ],
            FamilyGroup::FirstPersonG => &[IrregularFamily::GVerbs],
            FamilyGroup::Orthographic => &[
                IrregularFamily::OrthCar,
                IrregularFamily::OrthGar,
                IrregularFamily::OrthZar,
            ],
        }
    }
}

// One conjugated surface form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbForm {
    pub lemma: String,
    pub mood: Mood,
    pub tense: Tense,
    pub person: Person,
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alt: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub accepts: BTreeMap<String, String>,
}

impl VerbForm {
    pub fn new(
        lemma: impl Into<String>,
        mood: Mood,
        tense: Tense,
        person: Person,
        value: impl Into<String>,
    ) -> Self {
        Self {
            lemma: lemma.into(),
            mood,
            tense,
            person,
            value: value.into(),
            alt: Vec::new(),
            accepts: BTreeMap::new(),
        }
    }

    // Key used by the attempt history
    pub fn history_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.mood.as_str(),
            self.tense.as_str(),
            self.person.as_str(),
            self.value
        )
    }

    // Key used by the curriculum gate
    pub fn combo_key(&self) -> String {
        combo_key(self.mood, self.tense)
    }
}

pub fn combo_key(mood: Mood, tense: Tense) -> String {
    format!("{}|{}", mood.as_str(), tense.as_str())
}

// A group of forms valid for a set of regions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paradigm {
    pub regions: Vec<Region>,
    pub forms: Vec<VerbForm>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verb {
    pub lemma: String,
    #[serde(rename = "type")]
    pub verb_type: VerbKind,
    #[serde(default)]
    pub irregular_families: BTreeSet<IrregularFamily>,
    pub paradigms: Vec<Paradigm>,
}

impl Verb {
    pub fn has_any_family(&self, tags: &[IrregularFamily]) -> bool {
        tags.iter().any(|t| self.irregular_families.contains(t))
    }

    pub fn has_strong_preterite(&self) -> bool {
        self.irregular_families
            .iter()
            .any(IrregularFamily::is_strong_preterite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrillMode {
    #[default]
    Single,
    Double,
}

/// Session settings read by every filtering and generation stage.
///
/// Passed explicitly into the pipeline; nothing reads a global copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub region: Region,
    pub level: Option<Level>,
    pub practice_mode: PracticeMode,
    pub specific_mood: Option<Mood>,
    pub specific_tense: Option<TenseSelection>,
    pub verb_type: VerbType,
    pub selected_family: Option<FamilyGroup>,
    pub practice_pronoun: Option<Person>,
    pub use_voseo: bool,
    pub use_tuteo: bool,
    pub use_vosotros: bool,
    pub drill_mode: DrillMode,
    // Per-level policy overrides; `None` uses the level default
    pub time_limit_secs: Option<u32>,
    pub strict_accents: Option<bool>,
    pub require_clitics: Option<bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: Region::LaGeneral,
            level: Some(Level::A1),
            practice_mode: PracticeMode::Mixed,
            specific_mood: None,
            specific_tense: None,
            verb_type: VerbType::All,
            selected_family: None,
            practice_pronoun: None,
            use_voseo: false,
            use_tuteo: false,
            use_vosotros: false,
            drill_mode: DrillMode::Single,
            time_limit_secs: None,
            strict_accents: None,
            require_clitics: None,
        }
    }
}

impl Settings {
    // Specific and theme practice pin an exact mood/tense pair
    pub fn is_specific(&self) -> bool {
        matches!(
            self.practice_mode,
            PracticeMode::Specific | PracticeMode::Theme
        ) && self.specific_mood.is_some()
            && self.specific_tense.is_some()
    }

    pub fn effective_level(&self) -> Level {
        self.level.unwrap_or(Level::A1)
    }

    pub fn specific_pair(&self) -> Option<(Mood, TenseSelection)> {
        if !self.is_specific() {
            return None;
        }
        match (self.specific_mood, self.specific_tense) {
            (Some(m), Some(t)) => Some((m, t)),
            _ => None,
        }
    }
}

// A form wrapped for presentation to the learner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillItem {
    pub id: String,
    pub lemma: String,
    pub mood: Mood,
    pub tense: Tense,
    pub person: Person,
    pub form: VerbForm,
    pub settings: Settings,
}

// One graded answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    #[serde(default)]
    pub id: i64,
    pub user_id: String,
    pub lemma: String,
    pub mood: Mood,
    pub tense: Tense,
    pub person: Person,
    pub correct: bool,
    #[serde(default)]
    pub accent_error: bool,
    #[serde(default)]
    pub latency_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// Aggregate proficiency for one (mood, tense)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryRecord {
    pub user_id: String,
    pub mood: Mood,
    pub tense: Tense,
    pub score: f64,
    pub count: u32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "again" | "fail" | "f" | "0" | "1" => Some(Rating::Again),
            "hard" | "h" | "2" => Some(Rating::Hard),
            "good" | "g" | "3" | "4" => Some(Rating::Good),
            "easy" | "e" | "5" => Some(Rating::Easy),
            _ => None,
        }
    }

    // SM-2 response quality on the 0..=5 scale
    pub fn quality(&self) -> u8 {
        match self {
            Rating::Again => 1,
            Rating::Hard => 3,
            Rating::Good => 4,
            Rating::Easy => 5,
        }
    }

    pub fn is_pass(&self) -> bool {
        !matches!(self, Rating::Again)
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
