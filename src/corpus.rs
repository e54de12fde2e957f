//! The verb corpus: read-only dictionary entries and their conjugated forms.
//!
//! A corpus is either loaded from a JSON file (an array of [`Verb`]) or built
//! from the seed table at the bottom of this module, which conjugates regular
//! verbs from ending tables and applies per-verb irregular overrides.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::models::{IrregularFamily, Mood, Paradigm, Person, Region, Tense, Verb, VerbForm, VerbKind};

pub struct Corpus {
    verbs: Vec<Verb>,
    index: HashMap<String, usize>,
}

impl Corpus {
    pub fn new(verbs: Vec<Verb>) -> Self {
        let mut verbs = verbs;
        for verb in &mut verbs {
            dedupe_paradigms(verb);
        }

        let mut index = HashMap::new();
        for (i, verb) in verbs.iter().enumerate() {
            if index.insert(verb.lemma.clone(), i).is_some() {
                log::warn!("duplicate lemma '{}' in corpus, keeping the last entry", verb.lemma);
            }
        }

        Self { verbs, index }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let verbs: Vec<Verb> = serde_json::from_str(json)?;
        Ok(Self::new(verbs))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn builtin() -> Self {
        Self::new(SEED_VERBS.iter().map(build_verb).collect())
    }

    pub fn verb(&self, lemma: &str) -> Option<&Verb> {
        self.index.get(lemma).map(|i| &self.verbs[*i])
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    pub fn kind_of(&self, lemma: &str) -> Option<VerbKind> {
        self.verb(lemma).map(|v| v.verb_type)
    }

    // Every form in every paradigm
    pub fn forms(&self) -> Vec<&VerbForm> {
        self.verbs
            .iter()
            .flat_map(|v| v.paradigms.iter())
            .flat_map(|p| p.forms.iter())
            .collect()
    }

    /// Forms from paradigms tagged for `region`; `Region::Both` takes all.
    ///
    /// When several matching paradigms carry the same cell, the first wins.
    pub fn forms_for_region(&self, region: Region) -> Vec<&VerbForm> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for verb in &self.verbs {
            for paradigm in &verb.paradigms {
                let matches = region == Region::Both
                    || paradigm.regions.is_empty()
                    || paradigm.regions.contains(&region)
                    || paradigm.regions.contains(&Region::Both);
                if !matches {
                    continue;
                }
                for form in &paradigm.forms {
                    if seen.insert((form.lemma.as_str(), form.mood, form.tense, form.person)) {
                        out.push(form);
                    }
                }
            }
        }
        out
    }
}

fn dedupe_paradigms(verb: &mut Verb) {
    for paradigm in &mut verb.paradigms {
        let mut seen = HashSet::new();
        let before = paradigm.forms.len();
        paradigm
            .forms
            .retain(|f| seen.insert((f.mood, f.tense, f.person)));
        if paradigm.forms.len() != before {
            log::warn!(
                "dropped {} duplicate cells from paradigm of '{}'",
                before - paradigm.forms.len(),
                verb.lemma
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Seed corpus
// ---------------------------------------------------------------------------

// Row order for six-person tables
const SIX: [Person; 6] = [
    Person::FirstSingular,
    Person::SecondSingularTu,
    Person::ThirdSingular,
    Person::FirstPlural,
    Person::SecondPluralVosotros,
    Person::ThirdPlural,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conjugation {
    Ar,
    Er,
    Ir,
}

struct SeedVerb {
    lemma: &'static str,
    kind: VerbKind,
    families: &'static [IrregularFamily],
    fut_stem: Option<&'static str>,
    rows: &'static [(Tense, [&'static str; 6])],
    cells: &'static [(Tense, Person, &'static str)],
}

const fn regular(lemma: &'static str) -> SeedVerb {
    SeedVerb {
        lemma,
        kind: VerbKind::Regular,
        families: &[],
        fut_stem: None,
        rows: &[],
        cells: &[],
    }
}

const HABER: [(Tense, [&str; 6]); 6] = [
    (Tense::PretPerf, ["he", "has", "ha", "hemos", "habéis", "han"]),
    (Tense::Plusc, ["había", "habías", "había", "habíamos", "habíais", "habían"]),
    (Tense::FutPerf, ["habré", "habrás", "habrá", "habremos", "habréis", "habrán"]),
    (Tense::CondPerf, ["habría", "habrías", "habría", "habríamos", "habríais", "habrían"]),
    (Tense::SubjPerf, ["haya", "hayas", "haya", "hayamos", "hayáis", "hayan"]),
    (Tense::SubjPlusc, ["hubiera", "hubieras", "hubiera", "hubiéramos", "hubierais", "hubieran"]),
];

const PRET_SER_IR: [&str; 6] = ["fui", "fuiste", "fue", "fuimos", "fuisteis", "fueron"];

static SEED_VERBS: &[SeedVerb] = &[
    regular("hablar"),
    regular("trabajar"),
    regular("estudiar"),
    regular("caminar"),
    regular("cantar"),
    regular("tomar"),
    regular("comer"),
    regular("beber"),
    regular("aprender"),
    regular("vender"),
    regular("vivir"),
    regular("recibir"),
    SeedVerb {
        lemma: "ser",
        kind: VerbKind::Irregular,
        families: &[IrregularFamily::Suppletive, IrregularFamily::PretSuppl],
        fut_stem: None,
        rows: &[
            (Tense::Pres, ["soy", "eres", "es", "somos", "sois", "son"]),
            (Tense::PretIndef, PRET_SER_IR),
            (Tense::Impf, ["era", "eras", "era", "éramos", "erais", "eran"]),
            (Tense::SubjPres, ["sea", "seas", "sea", "seamos", "seáis", "sean"]),
        ],
        cells: &[
            (Tense::Pres, Person::SecondSingularVos, "sos"),
            (Tense::ImpAff, Person::SecondSingularTu, "sé"),
            (Tense::Ger, Person::ThirdSingular, "siendo"),
        ],
    },
    SeedVerb {
        lemma: "ir",
        kind: VerbKind::Irregular,
        families: &[IrregularFamily::Suppletive, IrregularFamily::PretSuppl],
        fut_stem: None,
        rows: &[
            (Tense::Pres, ["voy", "vas", "va", "vamos", "vais", "van"]),
            (Tense::PretIndef, PRET_SER_IR),
            (Tense::Impf, ["iba", "ibas", "iba", "íbamos", "ibais", "iban"]),
            (Tense::SubjPres, ["vaya", "vayas", "vaya", "vayamos", "vayáis", "vayan"]),
        ],
        cells: &[
            (Tense::Pres, Person::SecondSingularVos, "vas"),
            (Tense::ImpAff, Person::SecondSingularTu, "ve"),
            (Tense::ImpAff, Person::SecondSingularVos, "andá"),
            (Tense::ImpAff, Person::FirstPlural, "vamos"),
            (Tense::Ger, Person::ThirdSingular, "yendo"),
        ],
    },
    SeedVerb {
        lemma: "estar",
        kind: VerbKind::Irregular,
        families: &[IrregularFamily::PretUv],
        fut_stem: None,
        rows: &[
            (Tense::Pres, ["estoy", "estás", "está", "estamos", "estáis", "están"]),
            (
                Tense::PretIndef,
                ["estuve", "estuviste", "estuvo", "estuvimos", "estuvisteis", "estuvieron"],
            ),
            (Tense::SubjPres, ["esté", "estés", "esté", "estemos", "estéis", "estén"]),
        ],
        cells: &[],
    },
    SeedVerb {
        lemma: "tener",
        kind: VerbKind::Irregular,
        families: &[
            IrregularFamily::PretUv,
            IrregularFamily::GVerbs,
            IrregularFamily::DiphtEIe,
            IrregularFamily::IrregFut,
        ],
        fut_stem: Some("tendr"),
        rows: &[
            (Tense::Pres, ["tengo", "tienes", "tiene", "tenemos", "tenéis", "tienen"]),
            (
                Tense::PretIndef,
                ["tuve", "tuviste", "tuvo", "tuvimos", "tuvisteis", "tuvieron"],
            ),
        ],
        cells: &[(Tense::ImpAff, Person::SecondSingularTu, "ten")],
    },
    SeedVerb {
        lemma: "hacer",
        kind: VerbKind::Irregular,
        families: &[
            IrregularFamily::PretI,
            IrregularFamily::GVerbs,
            IrregularFamily::IrregFut,
        ],
        fut_stem: Some("har"),
        rows: &[
            (Tense::Pres, ["hago", "haces", "hace", "hacemos", "hacéis", "hacen"]),
            (
                Tense::PretIndef,
                ["hice", "hiciste", "hizo", "hicimos", "hicisteis", "hicieron"],
            ),
        ],
        cells: &[
            (Tense::ImpAff, Person::SecondSingularTu, "haz"),
            (Tense::Part, Person::ThirdSingular, "hecho"),
        ],
    },
    SeedVerb {
        lemma: "decir",
        kind: VerbKind::Irregular,
        families: &[
            IrregularFamily::PretJ,
            IrregularFamily::GVerbs,
            IrregularFamily::EIIr,
            IrregularFamily::IrregFut,
        ],
        fut_stem: Some("dir"),
        rows: &[
            (Tense::Pres, ["digo", "dices", "dice", "decimos", "decís", "dicen"]),
            (
                Tense::PretIndef,
                ["dije", "dijiste", "dijo", "dijimos", "dijisteis", "dijeron"],
            ),
        ],
        cells: &[
            (Tense::ImpAff, Person::SecondSingularTu, "di"),
            (Tense::Ger, Person::ThirdSingular, "diciendo"),
            (Tense::Part, Person::ThirdSingular, "dicho"),
        ],
    },
    SeedVerb {
        lemma: "poder",
        kind: VerbKind::Irregular,
        families: &[
            IrregularFamily::PretU,
            IrregularFamily::DiphtOUe,
            IrregularFamily::IrregFut,
        ],
        fut_stem: Some("podr"),
        rows: &[
            (Tense::Pres, ["puedo", "puedes", "puede", "podemos", "podéis", "pueden"]),
            (
                Tense::PretIndef,
                ["pude", "pudiste", "pudo", "pudimos", "pudisteis", "pudieron"],
            ),
            (Tense::SubjPres, ["pueda", "puedas", "pueda", "podamos", "podáis", "puedan"]),
        ],
        cells: &[(Tense::Ger, Person::ThirdSingular, "pudiendo")],
    },
    SeedVerb {
        lemma: "poner",
        kind: VerbKind::Irregular,
        families: &[
            IrregularFamily::PretU,
            IrregularFamily::GVerbs,
            IrregularFamily::IrregFut,
        ],
        fut_stem: Some("pondr"),
        rows: &[
            (Tense::Pres, ["pongo", "pones", "pone", "ponemos", "ponéis", "ponen"]),
            (
                Tense::PretIndef,
                ["puse", "pusiste", "puso", "pusimos", "pusisteis", "pusieron"],
            ),
        ],
        cells: &[
            (Tense::ImpAff, Person::SecondSingularTu, "pon"),
            (Tense::Part, Person::ThirdSingular, "puesto"),
        ],
    },
    SeedVerb {
        lemma: "querer",
        kind: VerbKind::Irregular,
        families: &[
            IrregularFamily::PretI,
            IrregularFamily::DiphtEIe,
            IrregularFamily::IrregFut,
        ],
        fut_stem: Some("querr"),
        rows: &[
            (Tense::Pres, ["quiero", "quieres", "quiere", "queremos", "queréis", "quieren"]),
            (
                Tense::PretIndef,
                ["quise", "quisiste", "quiso", "quisimos", "quisisteis", "quisieron"],
            ),
            (
                Tense::SubjPres,
                ["quiera", "quieras", "quiera", "queramos", "queráis", "quieran"],
            ),
        ],
        cells: &[],
    },
    SeedVerb {
        lemma: "dormir",
        kind: VerbKind::Irregular,
        families: &[IrregularFamily::DiphtOUe, IrregularFamily::OUGerIr],
        fut_stem: None,
        rows: &[
            (Tense::Pres, ["duermo", "duermes", "duerme", "dormimos", "dormís", "duermen"]),
            (
                Tense::PretIndef,
                ["dormí", "dormiste", "durmió", "dormimos", "dormisteis", "durmieron"],
            ),
            (
                Tense::SubjPres,
                ["duerma", "duermas", "duerma", "durmamos", "durmáis", "duerman"],
            ),
        ],
        cells: &[(Tense::Ger, Person::ThirdSingular, "durmiendo")],
    },
    SeedVerb {
        lemma: "pedir",
        kind: VerbKind::Irregular,
        families: &[IrregularFamily::EIIr],
        fut_stem: None,
        rows: &[
            (Tense::Pres, ["pido", "pides", "pide", "pedimos", "pedís", "piden"]),
            (
                Tense::PretIndef,
                ["pedí", "pediste", "pidió", "pedimos", "pedisteis", "pidieron"],
            ),
        ],
        cells: &[(Tense::Ger, Person::ThirdSingular, "pidiendo")],
    },
    SeedVerb {
        lemma: "sentir",
        kind: VerbKind::Irregular,
        families: &[IrregularFamily::DiphtEIe, IrregularFamily::EIIr],
        fut_stem: None,
        rows: &[
            (Tense::Pres, ["siento", "sientes", "siente", "sentimos", "sentís", "sienten"]),
            (
                Tense::PretIndef,
                ["sentí", "sentiste", "sintió", "sentimos", "sentisteis", "sintieron"],
            ),
            (
                Tense::SubjPres,
                ["sienta", "sientas", "sienta", "sintamos", "sintáis", "sientan"],
            ),
        ],
        cells: &[(Tense::Ger, Person::ThirdSingular, "sintiendo")],
    },
    SeedVerb {
        lemma: "empezar",
        kind: VerbKind::Irregular,
        families: &[IrregularFamily::DiphtEIe, IrregularFamily::OrthZar],
        fut_stem: None,
        rows: &[
            (
                Tense::Pres,
                ["empiezo", "empiezas", "empieza", "empezamos", "empezáis", "empiezan"],
            ),
            (
                Tense::SubjPres,
                ["empiece", "empieces", "empiece", "empecemos", "empecéis", "empiecen"],
            ),
        ],
        cells: &[],
    },
    SeedVerb {
        lemma: "leer",
        kind: VerbKind::Irregular,
        families: &[IrregularFamily::HiatusY],
        fut_stem: None,
        rows: &[(
            Tense::PretIndef,
            ["leí", "leíste", "leyó", "leímos", "leísteis", "leyeron"],
        )],
        cells: &[],
    },
    SeedVerb {
        lemma: "buscar",
        kind: VerbKind::Irregular,
        families: &[IrregularFamily::OrthCar],
        fut_stem: None,
        rows: &[],
        cells: &[],
    },
    SeedVerb {
        lemma: "llegar",
        kind: VerbKind::Irregular,
        families: &[IrregularFamily::OrthGar],
        fut_stem: None,
        rows: &[],
        cells: &[],
    },
];

fn conjugation_of(lemma: &str) -> (Conjugation, &str) {
    if let Some(stem) = lemma.strip_suffix("ar") {
        (Conjugation::Ar, stem)
    } else if let Some(stem) = lemma.strip_suffix("er") {
        (Conjugation::Er, stem)
    } else if let Some(stem) = lemma.strip_suffix("ir") {
        (Conjugation::Ir, stem)
    } else {
        (Conjugation::Er, lemma)
    }
}

fn endings(conj: Conjugation, tense: Tense) -> [&'static str; 6] {
    use Conjugation::*;
    match (tense, conj) {
        (Tense::Pres, Ar) => ["o", "as", "a", "amos", "áis", "an"],
        (Tense::Pres, Er) => ["o", "es", "e", "emos", "éis", "en"],
        (Tense::Pres, Ir) => ["o", "es", "e", "imos", "ís", "en"],
        (Tense::PretIndef, Ar) => ["é", "aste", "ó", "amos", "asteis", "aron"],
        (Tense::PretIndef, _) => ["í", "iste", "ió", "imos", "isteis", "ieron"],
        (Tense::Impf, Ar) => ["aba", "abas", "aba", "ábamos", "abais", "aban"],
        (Tense::Impf, _) => ["ía", "ías", "ía", "íamos", "íais", "ían"],
        (Tense::Fut, _) => ["é", "ás", "á", "emos", "éis", "án"],
        (Tense::Cond, _) => ["ía", "ías", "ía", "íamos", "íais", "ían"],
        (Tense::SubjPres, Ar) => ["e", "es", "e", "emos", "éis", "en"],
        (Tense::SubjPres, _) => ["a", "as", "a", "amos", "áis", "an"],
        _ => ["", "", "", "", "", ""],
    }
}

// Spelling changes of -car/-gar/-zar stems before e
fn join(stem: &str, ending: &str, conj: Conjugation) -> String {
    if conj == Conjugation::Ar && (ending.starts_with('e') || ending.starts_with('é')) {
        if let Some(s) = stem.strip_suffix('c') {
            return format!("{}qu{}", s, ending);
        }
        if let Some(s) = stem.strip_suffix('g') {
            return format!("{}gu{}", s, ending);
        }
        if let Some(s) = stem.strip_suffix('z') {
            return format!("{}c{}", s, ending);
        }
    }
    format!("{}{}", stem, ending)
}

fn accent_last_vowel(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let Some(pos) = chars.iter().rposition(|c| "aeiou".contains(*c)) else {
        return s.to_string();
    };
    let accented = match chars[pos] {
        'a' => 'á',
        'e' => 'é',
        'i' => 'í',
        'o' => 'ó',
        _ => 'ú',
    };
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| if i == pos { accented } else { *c })
        .collect()
}

// Pronoun attached to tú imperatives in clitic drills
const CLITIC: &str = "lo";

fn is_vowel(c: char) -> bool {
    "aeiouáéíóúü".contains(c)
}

fn is_strong(c: char) -> bool {
    "aeoáéó".contains(c)
}

/// Attach an enclitic pronoun to an unaccented imperative, adding the written
/// accent the longer word needs (`habla` + `lo` = `háblalo`).
///
/// Returns `None` for forms that already carry an accent, since their stress
/// shifts in ways a suffix rule cannot express.
pub fn with_enclitic(imperative: &str, clitic: &str) -> Option<String> {
    let chars: Vec<char> = imperative.chars().collect();
    if chars.iter().any(|c| "áéíóú".contains(*c)) {
        return None;
    }

    // Syllable nuclei as [start, end) ranges; two strong vowels split
    let mut nuclei: Vec<(usize, usize)> = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if !is_vowel(chars[i]) {
            i += 1;
            continue;
        }
        let start = i;
        i += 1;
        while i < chars.len()
            && is_vowel(chars[i])
            && !(is_strong(chars[i]) && is_strong(chars[i - 1]))
        {
            i += 1;
        }
        nuclei.push((start, i));
    }

    if nuclei.len() < 2 {
        return Some(format!("{}{}", imperative, clitic));
    }

    let (start, end) = nuclei[nuclei.len() - 2];
    let target = (start..end)
        .rev()
        .find(|&k| is_strong(chars[k]))
        .unwrap_or(end - 1);
    let accented: String = chars
        .iter()
        .enumerate()
        .map(|(k, c)| {
            if k == target {
                accent_last_vowel(&c.to_string()).chars().next().unwrap_or(*c)
            } else {
                *c
            }
        })
        .collect();
    Some(format!("{}{}", accented, clitic))
}

fn ends_with_vowel(s: &str) -> bool {
    s.chars().last().is_some_and(|c| "aeiou".contains(c))
}

struct Conjugator<'a> {
    seed: &'a SeedVerb,
    conj: Conjugation,
    stem: &'a str,
}

impl<'a> Conjugator<'a> {
    fn new(seed: &'a SeedVerb) -> Self {
        let (conj, stem) = conjugation_of(seed.lemma);
        Self { seed, conj, stem }
    }

    fn cell(&self, tense: Tense, person: Person) -> Option<&'static str> {
        self.seed
            .cells
            .iter()
            .find(|(t, p, _)| *t == tense && *p == person)
            .map(|(_, _, v)| *v)
    }

    fn row(&self, tense: Tense) -> [String; 6] {
        if let Some((_, row)) = self.seed.rows.iter().find(|(t, _)| *t == tense) {
            return (*row).map(str::to_string);
        }

        match tense {
            Tense::Pres | Tense::PretIndef | Tense::Impf => {
                endings(self.conj, tense).map(|e| join(self.stem, e, self.conj))
            }
            Tense::Fut | Tense::Cond => {
                let stem = self.seed.fut_stem.unwrap_or(self.seed.lemma);
                endings(self.conj, tense).map(|e| format!("{}{}", stem, e))
            }
            Tense::SubjPres => {
                let yo = &self.row(Tense::Pres)[0];
                let stem = yo.strip_suffix('o').unwrap_or(self.stem).to_string();
                endings(self.conj, tense).map(|e| join(&stem, e, self.conj))
            }
            Tense::SubjImpf => {
                let ellos = &self.row(Tense::PretIndef)[5];
                let base = ellos.strip_suffix("ron").unwrap_or(ellos).to_string();
                [
                    format!("{}ra", base),
                    format!("{}ras", base),
                    format!("{}ra", base),
                    format!("{}ramos", accent_last_vowel(&base)),
                    format!("{}rais", base),
                    format!("{}ran", base),
                ]
            }
            t if t.is_compound() => {
                let part = self.participle();
                let aux = HABER
                    .iter()
                    .find(|(ht, _)| *ht == t)
                    .map(|(_, r)| *r)
                    .unwrap_or(HABER[0].1);
                aux.map(|a| format!("{} {}", a, part))
            }
            _ => Default::default(),
        }
    }

    // Alternative -se spellings of the imperfect subjunctive
    fn subj_impf_alt(&self) -> [String; 6] {
        let ellos = &self.row(Tense::PretIndef)[5];
        let base = ellos.strip_suffix("ron").unwrap_or(ellos).to_string();
        [
            format!("{}se", base),
            format!("{}ses", base),
            format!("{}se", base),
            format!("{}semos", accent_last_vowel(&base)),
            format!("{}seis", base),
            format!("{}sen", base),
        ]
    }

    fn participle(&self) -> String {
        if let Some(p) = self.cell(Tense::Part, Person::ThirdSingular) {
            return p.to_string();
        }
        match self.conj {
            Conjugation::Ar => format!("{}ado", self.stem),
            _ if ends_with_vowel(self.stem) => format!("{}ído", self.stem),
            _ => format!("{}ido", self.stem),
        }
    }

    fn gerund(&self) -> String {
        if let Some(g) = self.cell(Tense::Ger, Person::ThirdSingular) {
            return g.to_string();
        }
        match self.conj {
            Conjugation::Ar => format!("{}ando", self.stem),
            _ if ends_with_vowel(self.stem) => format!("{}yendo", self.stem),
            _ => format!("{}iendo", self.stem),
        }
    }

    fn vos_present(&self) -> String {
        if let Some(v) = self.cell(Tense::Pres, Person::SecondSingularVos) {
            return v.to_string();
        }
        let ending = match self.conj {
            Conjugation::Ar => "ás",
            Conjugation::Er => "és",
            Conjugation::Ir => "ís",
        };
        format!("{}{}", self.stem, ending)
    }

    fn imperative_affirmative(&self, person: Person) -> String {
        if let Some(v) = self.cell(Tense::ImpAff, person) {
            return v.to_string();
        }
        let subj = self.row(Tense::SubjPres);
        let inf = self.seed.lemma;
        let bare = inf.strip_suffix('r').unwrap_or(inf);
        match person {
            Person::SecondSingularTu => self.row(Tense::Pres)[2].clone(),
            Person::SecondSingularVos => accent_last_vowel(bare),
            Person::ThirdSingular => subj[2].clone(),
            Person::FirstPlural => subj[3].clone(),
            Person::SecondPluralVosotros => format!("{}d", bare),
            _ => subj[5].clone(),
        }
    }

    fn imperative_negative(&self, person: Person) -> String {
        let subj = self.row(Tense::SubjPres);
        let form = match person {
            Person::SecondSingularTu | Person::SecondSingularVos => &subj[1],
            Person::ThirdSingular => &subj[2],
            Person::FirstPlural => &subj[3],
            Person::SecondPluralVosotros => &subj[4],
            _ => &subj[5],
        };
        format!("no {}", form)
    }

    fn forms(&self) -> Vec<VerbForm> {
        let lemma = self.seed.lemma;
        let mut out = Vec::new();

        for tense in Tense::ALL {
            let mood = tense.mood();
            match tense {
                Tense::Inf => out.push(VerbForm::new(lemma, mood, tense, Person::ThirdSingular, lemma)),
                Tense::Ger => out.push(VerbForm::new(
                    lemma,
                    mood,
                    tense,
                    Person::ThirdSingular,
                    self.gerund(),
                )),
                Tense::Part => out.push(VerbForm::new(
                    lemma,
                    mood,
                    tense,
                    Person::ThirdSingular,
                    self.participle(),
                )),
                Tense::ImpAff | Tense::ImpNeg => {
                    for person in Person::ALL {
                        if person == Person::FirstSingular {
                            continue;
                        }
                        let value = if tense == Tense::ImpAff {
                            self.imperative_affirmative(person)
                        } else {
                            self.imperative_negative(person)
                        };
                        let mut form = VerbForm::new(lemma, mood, tense, person, value);
                        if tense == Tense::ImpAff && person == Person::FirstPlural && lemma == "ir" {
                            form.alt.push("vayamos".to_string());
                        }
                        if tense == Tense::ImpAff && person == Person::SecondSingularTu {
                            if let Some(with_clitic) = with_enclitic(&form.value, CLITIC) {
                                form.accepts.insert("clitic".to_string(), with_clitic);
                            }
                        }
                        out.push(form);
                    }
                }
                _ => {
                    let row = self.row(tense);
                    let alt = (tense == Tense::SubjImpf).then(|| self.subj_impf_alt());
                    for (i, person) in SIX.iter().enumerate() {
                        let mut form = VerbForm::new(lemma, mood, tense, *person, row[i].clone());
                        if let Some(alt) = &alt {
                            form.alt.push(alt[i].clone());
                        }
                        out.push(form);
                    }

                    // Voseo differs from tuteo only in the present indicative
                    let vos_value = if tense == Tense::Pres {
                        self.vos_present()
                    } else {
                        row[1].clone()
                    };
                    let mut vos = VerbForm::new(lemma, mood, tense, Person::SecondSingularVos, vos_value);
                    if let Some(alt) = &alt {
                        vos.alt.push(alt[1].clone());
                    }
                    if tense == Tense::SubjPres {
                        let voseante = row[4].replace("éis", "és").replace("áis", "ás");
                        vos.accepts.insert("voseo".to_string(), voseante);
                    }
                    out.push(vos);
                }
            }
        }

        out
    }
}

fn build_verb(seed: &SeedVerb) -> Verb {
    let forms = Conjugator::new(seed).forms();
    Verb {
        lemma: seed.lemma.to_string(),
        verb_type: seed.kind,
        irregular_families: seed.families.iter().copied().collect(),
        paradigms: vec![Paradigm {
            regions: vec![Region::Rioplatense, Region::LaGeneral, Region::Peninsular],
            forms,
        }],
    }
}

// Form counts per (mood, tense)
pub fn coverage(corpus: &Corpus) -> HashMap<(Mood, Tense), usize> {
    let mut counts = HashMap::new();
    for form in corpus.forms() {
        *counts.entry((form.mood, form.tense)).or_insert(0) += 1;
    }
    counts
}
