use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use conjuga::analytics::{self, LoadCoordinator};
use conjuga::challenges::ChallengeCompleted;
use conjuga::config::Config;
use conjuga::corpus::Corpus;
use conjuga::curriculum::{self, LevelPolicy};
use conjuga::db::{AnswerOutcome, Database, ProgressExport};
use conjuga::error::{ConjugaError, Result};
use conjuga::generator::{self, Drill};
use conjuga::grading::{self, GradeResult};
use conjuga::history::History;
use conjuga::mastery;
use conjuga::models::{
    Attempt, DrillItem, DrillMode, FamilyGroup, JsonOutput, Level, Mood, Person, PracticeMode,
    Region, Settings, Tense, TenseSelection, VerbForm, VerbType,
};

#[derive(Parser)]
#[command(name = "conjuga")]
#[command(about = "Adaptive Spanish verb conjugation drills with spaced repetition")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Drill settings; anything left unset comes from the config file.
#[derive(Args, Debug, Default, Clone)]
struct SettingsArgs {
    /// Dialect region: rioplatense, la_general, peninsular, both
    #[arg(long)]
    region: Option<String>,

    /// CEFR level (A1..C2 or ALL)
    #[arg(long)]
    level: Option<String>,

    /// Practice mode: mixed, specific, theme
    #[arg(long)]
    mode: Option<String>,

    /// Mood for specific practice
    #[arg(long)]
    mood: Option<String>,

    /// Tense for specific practice, or a mixed alias
    #[arg(long)]
    tense: Option<String>,

    /// Verb type: all, regular, irregular
    #[arg(long = "verb-type")]
    verb_type: Option<String>,

    /// Irregular family group, e.g. PRETERITE_THIRD_PERSON
    #[arg(long)]
    family: Option<String>,

    /// Drill a single person, e.g. 3s
    #[arg(long)]
    pronoun: Option<String>,

    #[arg(long)]
    voseo: bool,

    #[arg(long)]
    tuteo: bool,

    #[arg(long)]
    vosotros: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Choose the next drill item
    Next {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Two forms of the same verb
        #[arg(long)]
        double: bool,
    },

    /// Grade an answer and record it
    Answer {
        #[arg(long)]
        lemma: String,

        #[arg(long)]
        mood: String,

        #[arg(long)]
        tense: String,

        #[arg(long)]
        person: String,

        #[arg(long, short)]
        response: String,

        /// Time taken to answer, in milliseconds
        #[arg(long)]
        latency_ms: Option<i64>,

        /// Level whose grading policy applies
        #[arg(long)]
        level: Option<String>,
    },

    /// Interactive drill session on stdin
    Drill {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Number of drills
        #[arg(long, short = 'n', default_value_t = 10)]
        count: u32,

        #[arg(long)]
        double: bool,
    },

    /// List cells due for review
    Due {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Mastery heat map
    Stats {
        /// Show every combination taught at this level
        #[arg(long)]
        level: Option<String>,
    },

    /// Per-mood competency radar
    Radar,

    /// Today's daily challenges
    Challenges,

    /// Mood/tense combinations taught at a level
    Combos {
        #[arg(long)]
        level: String,
    },

    /// Dump all progress as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Load progress from an export file
    Import { path: PathBuf },
}

fn parse_arg<T>(name: &str, value: &str, parse: fn(&str) -> Option<T>) -> Result<T> {
    parse(value).ok_or_else(|| ConjugaError::invalid_input(format!("invalid {} '{}'", name, value)))
}

impl SettingsArgs {
    fn apply(&self, mut settings: Settings) -> Result<Settings> {
        if let Some(v) = &self.region {
            settings.region = parse_arg("region", v, Region::from_str)?;
        }
        if let Some(v) = &self.level {
            settings.level = Some(parse_arg("level", v, Level::from_str)?);
        }
        if let Some(v) = &self.mood {
            settings.specific_mood = Some(parse_arg("mood", v, Mood::from_str)?);
        }
        if let Some(v) = &self.tense {
            settings.specific_tense = Some(parse_arg("tense", v, TenseSelection::from_str)?);
        }
        match &self.mode {
            Some(v) => settings.practice_mode = parse_arg("mode", v, PracticeMode::from_str)?,
            // Naming a mood and tense implies specific practice
            None if self.mood.is_some() && self.tense.is_some() => {
                settings.practice_mode = PracticeMode::Specific
            }
            None => {}
        }
        if let Some(v) = &self.verb_type {
            settings.verb_type = parse_arg("verb type", v, VerbType::from_str)?;
        }
        if let Some(v) = &self.family {
            settings.selected_family = Some(parse_arg("family", v, FamilyGroup::from_str)?);
        }
        if let Some(v) = &self.pronoun {
            settings.practice_pronoun = Some(parse_arg("pronoun", v, Person::from_str)?);
        }
        settings.use_voseo |= self.voseo;
        settings.use_tuteo |= self.tuteo;
        settings.use_vosotros |= self.vosotros;
        Ok(settings)
    }
}

fn print_json<T: Serialize>(data: T) -> Result<()> {
    println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
    Ok(())
}

fn prompt(item: &DrillItem) -> String {
    if item.mood == Mood::Nonfinite {
        format!("{}: {}", item.lemma, item.tense.label())
    } else {
        format!(
            "{}: {} ({}), {}",
            item.lemma,
            item.tense.label(),
            item.mood.label(),
            item.person.pronoun()
        )
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            println!(
                "{}",
                serde_json::to_string(&JsonOutput::<()>::err(e.user_message()))
                    .unwrap_or_else(|_| e.to_string())
            );
        } else {
            eprintln!("Error: {}", e.user_message());
        }
        std::process::exit(1);
    }
}

struct App {
    config: Config,
    db: Database,
}

#[derive(Serialize)]
struct AnswerReport {
    grade: GradeResult,
    outcome: AnswerOutcome,
    completed_challenges: Vec<ChallengeCompleted>,
}

impl App {
    fn history(&self, corpus: &Corpus, region: Region) -> Result<History> {
        let attempts = self.db.attempts(&self.config.user_id)?;
        Ok(History::from_attempts(&attempts, corpus, region))
    }

    fn answer(
        &self,
        form: &VerbForm,
        settings: &Settings,
        response: &str,
        latency_ms: Option<i64>,
    ) -> Result<AnswerReport> {
        let policy = LevelPolicy::resolve(settings);
        let grade = grading::grade(form, response, &policy);
        let rating = grading::review_rating(&grade, latency_ms, &policy);
        let now = Utc::now();
        let attempt = Attempt {
            id: 0,
            user_id: self.config.user_id.clone(),
            lemma: form.lemma.clone(),
            mood: form.mood,
            tense: form.tense,
            person: form.person,
            correct: grade.correct,
            accent_error: grade.accent_error,
            latency_ms,
            created_at: now,
        };
        let outcome = self
            .db
            .record_answer(&attempt, rating, &self.config.srs_config(), &mut rand::thread_rng())?;
        let (_, completed_challenges) = self.db.update_daily_challenges(&self.config.user_id, now)?;
        Ok(AnswerReport {
            grade,
            outcome,
            completed_challenges,
        })
    }
}

fn print_feedback(report: &AnswerReport) {
    let grade = &report.grade;
    if grade.correct && grade.accent_error {
        println!("Correct, but watch the accent: {}", grade.expected);
    } else if grade.correct {
        println!("Correct!");
    } else if grade.missing_clitic {
        println!("Missing the clitic: {}", grade.expected);
    } else {
        println!("Not quite. Expected: {}", grade.expected);
    }
    println!(
        "Next review in {:.1} days ({})",
        report.outcome.schedule.interval_days,
        report.outcome.rating.as_str()
    );
    for event in &report.completed_challenges {
        println!("Challenge completed: {}", event.challenge_id);
    }
}

fn read_answer(stdin: &mut impl BufRead) -> Result<Option<String>> {
    print!("> ");
    io::stdout().flush()?;
    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load();
    let db_path = config.db_path();
    let db = Database::open(&db_path)?;
    let app = App { config, db };
    let user_id = app.config.user_id.clone();

    match cli.command {
        Commands::Init => {
            app.db.init()?;
            if cli.json {
                print_json(())?;
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Next { settings, double } => {
            let mut settings = settings.apply(app.config.settings.clone())?;
            if double {
                settings.drill_mode = DrillMode::Double;
            }
            let corpus = app.config.corpus()?;
            let history = app.history(&corpus, settings.region)?;
            let drill = generator::next_drill(&corpus, &history, &settings, &mut rand::thread_rng())?;

            if cli.json {
                print_json(&drill)?;
            } else if let Some(drill) = drill {
                for item in drill.items() {
                    println!("{}", prompt(item));
                    println!(
                        "  conjuga answer --lemma {} --mood {} --tense {} --person {} --response <answer>",
                        item.lemma, item.mood, item.tense, item.person
                    );
                }
            } else {
                println!("No verbs available. Check the corpus.");
            }
        }

        Commands::Answer {
            lemma,
            mood,
            tense,
            person,
            response,
            latency_ms,
            level,
        } => {
            let mood = parse_arg("mood", &mood, Mood::from_str)?;
            let tense = parse_arg("tense", &tense, Tense::from_str)?;
            let person = parse_arg("person", &person, Person::from_str)?;
            let mut settings = app.config.settings.clone();
            if let Some(level) = level {
                settings.level = Some(parse_arg("level", &level, Level::from_str)?);
            }

            let corpus = app.config.corpus()?;
            let form = corpus
                .forms_for_region(Region::Both)
                .into_iter()
                .find(|f| f.lemma == lemma && f.mood == mood && f.tense == tense && f.person == person)
                .cloned()
                .ok_or_else(|| {
                    ConjugaError::not_found(format!("{} {} {} {}", lemma, mood, tense, person))
                })?;

            let report = app.answer(&form, &settings, &response, latency_ms)?;
            if cli.json {
                print_json(&report)?;
            } else {
                print_feedback(&report);
            }
        }

        Commands::Drill {
            settings,
            count,
            double,
        } => {
            let mut settings = settings.apply(app.config.settings.clone())?;
            if double {
                settings.drill_mode = DrillMode::Double;
            }
            let corpus = app.config.corpus()?;
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut correct = 0;
            let mut answered = 0;

            'session: for round in 1..=count {
                let history = app.history(&corpus, settings.region)?;
                let Some(drill) =
                    generator::next_drill(&corpus, &history, &settings, &mut rand::thread_rng())?
                else {
                    println!("No verbs available. Check the corpus.");
                    break;
                };
                if matches!(drill, Drill::Double { .. }) {
                    println!("[{}/{}] Two forms of the same verb:", round, count);
                } else {
                    println!("[{}/{}]", round, count);
                }

                for item in drill.items() {
                    println!("{}", prompt(item));
                    let started = Instant::now();
                    let Some(response) = read_answer(&mut input)? else {
                        break 'session;
                    };
                    let latency = started.elapsed().as_millis() as i64;
                    let report = app.answer(&item.form, &settings, &response, Some(latency))?;
                    print_feedback(&report);
                    answered += 1;
                    if report.grade.correct {
                        correct += 1;
                    }
                }
                println!();
            }
            println!("Session: {}/{} correct", correct, answered);
        }

        Commands::Due { limit } => {
            let due = app.db.due_schedules(&user_id, Utc::now())?;
            let shown: Vec<_> = due.into_iter().take(limit).collect();
            if cli.json {
                print_json(&shown)?;
            } else if shown.is_empty() {
                println!("Nothing due. Come back later!");
            } else {
                println!("{:<14} {:<12} {:<12} {:>8}", "MOOD", "TENSE", "PERSON", "LAPSES");
                println!("{}", "-".repeat(50));
                for item in shown {
                    println!(
                        "{:<14} {:<12} {:<12} {:>8}",
                        item.mood.as_str(),
                        item.tense.as_str(),
                        item.person.as_str(),
                        item.lapses
                    );
                }
            }
        }

        Commands::Stats { level } => {
            let level = level
                .map(|l| parse_arg("level", &l, Level::from_str))
                .transpose()?;
            let mut loads = LoadCoordinator::new(app.config.analytics.clone());
            let cells = loads.load_or_default("heatmap", |handle| {
                let attempts = app.db.attempts(&user_id)?;
                handle.checkpoint()?;
                let records = mastery::mastery_records(&user_id, &attempts, Utc::now());
                Ok(analytics::heat_map(&records, level))
            });
            let stats = app.db.get_stats(&user_id, Utc::now())?;

            if cli.json {
                print_json(serde_json::json!({ "stats": stats, "heat_map": cells }))?;
            } else {
                println!("=== Progress ===");
                println!("Attempts: {} ({} correct)", stats.total_attempts, stats.correct_attempts);
                println!("Tracked cells: {}, due now: {}", stats.tracked_cells, stats.due_now);
                println!("Average mastery: {:.0}%", stats.avg_mastery);
                println!();
                for cell in cells {
                    let score = cell
                        .score
                        .map(|s| format!("{:>5.0}%", s))
                        .unwrap_or_else(|| "    -".to_string());
                    println!(
                        "{:<14} {:<28} {} {}",
                        cell.mood.as_str(),
                        cell.tense.label(),
                        score,
                        "#".repeat(cell.bucket.map(|b| b as usize / 20 + 1).unwrap_or(0))
                    );
                }
            }
        }

        Commands::Radar => {
            let mut loads = LoadCoordinator::new(app.config.analytics.clone());
            let radar = loads.load_or_default("radar", |handle| {
                let attempts = app.db.attempts(&user_id)?;
                handle.checkpoint()?;
                let records = mastery::mastery_records(&user_id, &attempts, Utc::now());
                Ok(analytics::competency_radar(&records))
            });
            if cli.json {
                print_json(&radar)?;
            } else {
                for axis in radar {
                    println!("{:<22} {:>5.0}%  ({} tenses)", axis.mood.label(), axis.score, axis.tenses);
                }
            }
        }

        Commands::Challenges => {
            let (record, events) = app.db.update_daily_challenges(&user_id, Utc::now())?;
            if cli.json {
                print_json(serde_json::json!({ "record": record, "completed": events }))?;
            } else {
                println!("=== Daily challenges ({}) ===", record.date);
                for c in &record.challenges {
                    let mark = if c.completed { "x" } else { " " };
                    println!("[{}] {:<45} {:.0}/{:.0}", mark, c.title, c.progress, c.target);
                }
            }
        }

        Commands::Combos { level } => {
            // Unknown levels list nothing rather than failing
            let combos: Vec<String> = curriculum::allowed_combo_keys(&level).into_iter().collect();
            if cli.json {
                print_json(&combos)?;
            } else {
                for combo in combos {
                    println!("{}", combo);
                }
            }
        }

        Commands::Export { output } => {
            let dump = app.db.export(&user_id)?;
            let body = serde_json::to_string_pretty(&dump)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, body)?;
                    if cli.json {
                        print_json(serde_json::json!({ "path": path }))?;
                    } else {
                        println!("Exported {} attempts to {}", dump.attempts.len(), path.display());
                    }
                }
                None if cli.json => print_json(&dump)?,
                None => println!("{}", body),
            }
        }

        Commands::Import { path } => {
            let dump: ProgressExport = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
            let attempts = app.db.import_attempts_bulk(&dump.attempts)?;
            let mastery = app.db.import_mastery_bulk(&dump.mastery)?;
            let schedules = app.db.import_schedules_bulk(&dump.schedules)?;
            if cli.json {
                print_json(serde_json::json!({
                    "attempts": attempts,
                    "mastery": mastery,
                    "schedules": schedules
                }))?;
            } else {
                println!(
                    "Imported {} attempts, {} mastery records, {} schedules",
                    attempts, mastery, schedules
                );
            }
        }
    }

    Ok(())
}
