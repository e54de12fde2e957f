use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::challenges::{ChallengeCompleted, DailyChallengeRecord, DailyMetrics};
use crate::error::Result;
use crate::mastery;
use crate::models::{Attempt, MasteryRecord, Mood, Person, Rating, Tense};
use crate::srs::{self, ScheduleItem, SrsConfig};

pub struct Database {
    conn: Connection,
}

/// Everything stored for one user, in the shape accepted by the bulk imports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressExport {
    pub user_id: String,
    pub exported_at: DateTime<Utc>,
    pub attempts: Vec<Attempt>,
    pub mastery: Vec<MasteryRecord>,
    pub schedules: Vec<ScheduleItem>,
    pub challenges: Vec<DailyChallengeRecord>,
}

/// Result of recording one graded answer.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub attempt_id: i64,
    pub rating: Rating,
    pub schedule: ScheduleItem,
    pub mastery: Option<MasteryRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_attempts: i64,
    pub correct_attempts: i64,
    pub tracked_cells: i64,
    pub due_now: i64,
    pub avg_mastery: f64,
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn enum_col<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, format!("unknown value '{}'", raw)))
}

fn time_col(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e.to_string()))
}

fn opt_time_col(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e.to_string()))
    })
    .transpose()
}

fn attempt_from_row(row: &Row) -> rusqlite::Result<Attempt> {
    Ok(Attempt {
        id: row.get(0)?,
        user_id: row.get(1)?,
        lemma: row.get(2)?,
        mood: enum_col(row, 3, Mood::from_str)?,
        tense: enum_col(row, 4, Tense::from_str)?,
        person: enum_col(row, 5, Person::from_str)?,
        correct: row.get(6)?,
        accent_error: row.get(7)?,
        latency_ms: row.get(8)?,
        created_at: time_col(row, 9)?,
    })
}

fn mastery_from_row(row: &Row) -> rusqlite::Result<MasteryRecord> {
    Ok(MasteryRecord {
        user_id: row.get(0)?,
        mood: enum_col(row, 1, Mood::from_str)?,
        tense: enum_col(row, 2, Tense::from_str)?,
        score: row.get(3)?,
        count: row.get(4)?,
        updated_at: time_col(row, 5)?,
    })
}

fn schedule_from_row(row: &Row) -> rusqlite::Result<ScheduleItem> {
    Ok(ScheduleItem {
        user_id: row.get(0)?,
        mood: enum_col(row, 1, Mood::from_str)?,
        tense: enum_col(row, 2, Tense::from_str)?,
        person: enum_col(row, 3, Person::from_str)?,
        due_at: time_col(row, 4)?,
        ease: row.get(5)?,
        interval_days: row.get(6)?,
        step: row.get(7)?,
        reps: row.get(8)?,
        lapses: row.get(9)?,
        stability: row.get(10)?,
        difficulty: row.get(11)?,
        last_review: opt_time_col(row, 12)?,
    })
}

const ATTEMPT_COLUMNS: &str =
    "id, user_id, lemma, mood, tense, person, correct, accent_error, latency_ms, created_at";
const SCHEDULE_COLUMNS: &str = "user_id, mood, tense, person, due_at, ease, interval_days, step, \
     reps, lapses, stability, difficulty, last_review";

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                lemma TEXT NOT NULL,
                mood TEXT NOT NULL,
                tense TEXT NOT NULL,
                person TEXT NOT NULL,
                correct INTEGER NOT NULL,
                accent_error INTEGER NOT NULL DEFAULT 0,
                latency_ms INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS mastery (
                user_id TEXT NOT NULL,
                mood TEXT NOT NULL,
                tense TEXT NOT NULL,
                score REAL NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, mood, tense)
            );

            CREATE TABLE IF NOT EXISTS schedules (
                user_id TEXT NOT NULL,
                mood TEXT NOT NULL,
                tense TEXT NOT NULL,
                person TEXT NOT NULL,
                due_at TEXT NOT NULL,
                ease REAL NOT NULL,
                interval_days REAL NOT NULL DEFAULT 0,
                step INTEGER NOT NULL DEFAULT 0,
                reps INTEGER NOT NULL DEFAULT 0,
                lapses INTEGER NOT NULL DEFAULT 0,
                last_review TEXT,
                PRIMARY KEY (user_id, mood, tense, person)
            );

            -- One row per user and day; challenge statuses stored as JSON
            CREATE TABLE IF NOT EXISTS daily_challenges (
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (user_id, date)
            );

            CREATE INDEX IF NOT EXISTS idx_attempts_user_time ON attempts(user_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_attempts_cell ON attempts(user_id, mood, tense);
            CREATE INDEX IF NOT EXISTS idx_schedules_due ON schedules(user_id, due_at);
            "#,
        )?;

        self.migrate()?;
        Ok(())
    }

    // FSRS memory-state columns arrived after the first schedules table
    fn migrate(&self) -> Result<()> {
        let has_stability = self
            .conn
            .prepare("SELECT stability FROM schedules LIMIT 1")
            .is_ok();

        if !has_stability {
            self.conn.execute_batch(
                r#"
                ALTER TABLE schedules ADD COLUMN stability REAL;
                ALTER TABLE schedules ADD COLUMN difficulty REAL;
                "#,
            )?;
        }

        Ok(())
    }

    // Attempt operations
    pub fn insert_attempt(&self, attempt: &Attempt) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO attempts
                (user_id, lemma, mood, tense, person, correct, accent_error, latency_ms, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                attempt.user_id,
                attempt.lemma,
                attempt.mood.as_str(),
                attempt.tense.as_str(),
                attempt.person.as_str(),
                attempt.correct,
                attempt.accent_error,
                attempt.latency_ms,
                attempt.created_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All attempts for `user_id`, oldest first.
    pub fn attempts(&self, user_id: &str) -> Result<Vec<Attempt>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM attempts WHERE user_id = ?1 ORDER BY created_at, id",
            ATTEMPT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id], attempt_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn cell_attempts(&self, user_id: &str, mood: Mood, tense: Tense) -> Result<Vec<Attempt>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM attempts WHERE user_id = ?1 AND mood = ?2 AND tense = ?3 ORDER BY created_at, id",
            ATTEMPT_COLUMNS
        ))?;
        let rows = stmt.query_map(
            params![user_id, mood.as_str(), tense.as_str()],
            attempt_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // Mastery operations
    pub fn upsert_mastery(&self, record: &MasteryRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO mastery (user_id, mood, tense, score, count, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, mood, tense) DO UPDATE SET
                score = excluded.score,
                count = excluded.count,
                updated_at = excluded.updated_at
            "#,
            params![
                record.user_id,
                record.mood.as_str(),
                record.tense.as_str(),
                record.score,
                record.count,
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn mastery(&self, user_id: &str) -> Result<Vec<MasteryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, mood, tense, score, count, updated_at FROM mastery WHERE user_id = ?1 ORDER BY mood, tense",
        )?;
        let rows = stmt.query_map(params![user_id], mastery_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Recompute the decayed score of one (mood, tense) from its attempts.
    pub fn refresh_mastery(
        &self,
        user_id: &str,
        mood: Mood,
        tense: Tense,
        now: DateTime<Utc>,
    ) -> Result<Option<MasteryRecord>> {
        let attempts = self.cell_attempts(user_id, mood, tense)?;
        let record = mastery::mastery_records(user_id, &attempts, now)
            .into_iter()
            .find(|r| r.mood == mood && r.tense == tense);
        if let Some(record) = &record {
            self.upsert_mastery(record)?;
        }
        Ok(record)
    }

    // Schedule operations
    pub fn get_schedule(
        &self,
        user_id: &str,
        mood: Mood,
        tense: Tense,
        person: Person,
    ) -> Result<Option<ScheduleItem>> {
        let item = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM schedules WHERE user_id = ?1 AND mood = ?2 AND tense = ?3 AND person = ?4",
                    SCHEDULE_COLUMNS
                ),
                params![user_id, mood.as_str(), tense.as_str(), person.as_str()],
                schedule_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn upsert_schedule(&self, item: &ScheduleItem) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO schedules
                (user_id, mood, tense, person, due_at, ease, interval_days, step,
                 reps, lapses, stability, difficulty, last_review)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(user_id, mood, tense, person) DO UPDATE SET
                due_at = excluded.due_at,
                ease = excluded.ease,
                interval_days = excluded.interval_days,
                step = excluded.step,
                reps = excluded.reps,
                lapses = excluded.lapses,
                stability = excluded.stability,
                difficulty = excluded.difficulty,
                last_review = excluded.last_review
            "#,
            params![
                item.user_id,
                item.mood.as_str(),
                item.tense.as_str(),
                item.person.as_str(),
                item.due_at.to_rfc3339(),
                item.ease,
                item.interval_days,
                item.step,
                item.reps,
                item.lapses,
                item.stability,
                item.difficulty,
                item.last_review.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn schedules(&self, user_id: &str) -> Result<Vec<ScheduleItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM schedules WHERE user_id = ?1 ORDER BY due_at",
            SCHEDULE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id], schedule_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn due_schedules(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<ScheduleItem>> {
        let all = self.schedules(user_id)?;
        Ok(srs::due_items(&all, now).into_iter().cloned().collect())
    }

    /// Store a graded attempt, reschedule its cell and refresh the cell's
    /// mastery, all in one transaction.
    pub fn record_answer<R: Rng + ?Sized>(
        &self,
        attempt: &Attempt,
        rating: Rating,
        config: &SrsConfig,
        rng: &mut R,
    ) -> Result<AnswerOutcome> {
        let now = attempt.created_at;
        let tx = self.conn.unchecked_transaction()?;

        let attempt_id = self.insert_attempt(attempt)?;
        let current = match self.get_schedule(&attempt.user_id, attempt.mood, attempt.tense, attempt.person)? {
            Some(item) => item,
            None => ScheduleItem::new(
                attempt.user_id.clone(),
                attempt.mood,
                attempt.tense,
                attempt.person,
                config,
                now,
            ),
        };
        let schedule = srs::review(&current, rating, config, now, rng);
        self.upsert_schedule(&schedule)?;
        let mastery = self.refresh_mastery(&attempt.user_id, attempt.mood, attempt.tense, now)?;

        tx.commit()?;
        Ok(AnswerOutcome {
            attempt_id,
            rating,
            schedule,
            mastery,
        })
    }

    // Daily challenge operations
    pub fn challenge_record(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyChallengeRecord>> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM daily_challenges WHERE user_id = ?1 AND date = ?2",
                params![user_id, date.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save_challenge_record(&self, record: &DailyChallengeRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO daily_challenges (user_id, date, data) VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, date) DO UPDATE SET data = excluded.data
            "#,
            params![record.user_id, record.date.to_string(), serde_json::to_string(record)?],
        )?;
        Ok(())
    }

    /// Evaluate today's challenges, creating the record on first use.
    pub fn update_daily_challenges(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(DailyChallengeRecord, Vec<ChallengeCompleted>)> {
        let date = now.date_naive();
        let mut record = self
            .challenge_record(user_id, date)?
            .unwrap_or_else(|| DailyChallengeRecord::new(user_id, date));
        let metrics = DailyMetrics::from_attempts(&self.attempts(user_id)?, date);
        let events = record.evaluate(&metrics, now);
        self.save_challenge_record(&record)?;
        Ok((record, events))
    }

    fn challenge_records(&self, user_id: &str) -> Result<Vec<DailyChallengeRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM daily_challenges WHERE user_id = ?1 ORDER BY date")?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;
        let mut records = Vec::new();
        for json in rows {
            records.push(serde_json::from_str(&json?)?);
        }
        Ok(records)
    }

    // Bulk import and export
    /// Import attempts, skipping any already stored for the same user, cell
    /// and timestamp. Returns the number of rows actually inserted.
    pub fn import_attempts_bulk(&self, attempts: &[Attempt]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO attempts
                    (user_id, lemma, mood, tense, person, correct, accent_error, latency_ms, created_at)
                SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
                WHERE NOT EXISTS (
                    SELECT 1 FROM attempts
                    WHERE user_id = ?1 AND lemma = ?2 AND mood = ?3 AND tense = ?4
                      AND person = ?5 AND created_at = ?9
                )
                "#,
            )?;
            for attempt in attempts {
                inserted += stmt.execute(params![
                    attempt.user_id,
                    attempt.lemma,
                    attempt.mood.as_str(),
                    attempt.tense.as_str(),
                    attempt.person.as_str(),
                    attempt.correct,
                    attempt.accent_error,
                    attempt.latency_ms,
                    attempt.created_at.to_rfc3339(),
                ])?;
            }
        }
        if inserted < attempts.len() {
            log::info!("skipped {} already imported attempts", attempts.len() - inserted);
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn import_mastery_bulk(&self, records: &[MasteryRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for record in records {
            self.upsert_mastery(record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn import_schedules_bulk(&self, items: &[ScheduleItem]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for item in items {
            self.upsert_schedule(item)?;
        }
        tx.commit()?;
        Ok(items.len())
    }

    pub fn export(&self, user_id: &str) -> Result<ProgressExport> {
        Ok(ProgressExport {
            user_id: user_id.to_string(),
            exported_at: Utc::now(),
            attempts: self.attempts(user_id)?,
            mastery: self.mastery(user_id)?,
            schedules: self.schedules(user_id)?,
            challenges: self.challenge_records(user_id)?,
        })
    }

    pub fn get_stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<Stats> {
        let total_attempts: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM attempts WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        let correct_attempts: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM attempts WHERE user_id = ?1 AND correct = 1",
            params![user_id],
            |row| row.get(0),
        )?;

        let tracked_cells: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM schedules WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        let avg_mastery: f64 = self.conn.query_row(
            "SELECT COALESCE(AVG(score), 0) FROM mastery WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        Ok(Stats {
            total_attempts,
            correct_attempts,
            tracked_cells,
            due_now: self.due_schedules(user_id, now)?.len() as i64,
            avg_mastery,
        })
    }
}
