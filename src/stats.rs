use crate::error::StoreError;
use crate::scoring::Score;
use crate::util::{mean, round2, std_dev};
use chrono::{DateTime, Local, SecondsFormat};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        joined_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS typing_tests (
        test_id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(user_id),
        wpm REAL NOT NULL CHECK (wpm >= 0),
        accuracy REAL NOT NULL CHECK (accuracy >= 0 AND accuracy <= 100),
        test_date TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_typing_tests_user ON typing_tests(user_id);
    CREATE INDEX IF NOT EXISTS idx_typing_tests_wpm ON typing_tests(wpm);
"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub joined_at: DateTime<Local>,
}

/// A persisted typing test. Rows are written once and never updated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub id: i64,
    pub user_id: i64,
    pub wpm: f64,
    pub accuracy: f64,
    pub taken_at: DateTime<Local>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserAverages {
    pub avg_wpm: f64,
    pub avg_accuracy: f64,
    pub total_tests: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalStats {
    pub total_tests: usize,
    pub avg_wpm: f64,
    pub highest_wpm: f64,
    pub avg_accuracy: f64,
    pub wpm_std_dev: f64,
}

fn format_timestamp(t: &DateTime<Local>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Local))
        .map_err(|source| StoreError::InvalidTimestamp { column, source })
}

type RawUser = (i64, String, String, String);
type RawResult = (i64, i64, f64, f64, String);

fn raw_user(row: &Row) -> rusqlite::Result<RawUser> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn raw_result(row: &Row) -> rusqlite::Result<RawResult> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

impl TryFrom<RawUser> for User {
    type Error = StoreError;

    fn try_from((id, name, email, joined_at): RawUser) -> Result<Self> {
        Ok(User {
            id,
            name,
            email,
            joined_at: parse_timestamp("joined_at", &joined_at)?,
        })
    }
}

impl TryFrom<RawResult> for TestResult {
    type Error = StoreError;

    fn try_from((id, user_id, wpm, accuracy, taken_at): RawResult) -> Result<Self> {
        Ok(TestResult {
            id,
            user_id,
            wpm,
            accuracy,
            taken_at: parse_timestamp("test_date", &taken_at)?,
        })
    }
}

/// SQLite store for users and their typing test results
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Open (or create) the database file at `path`, creating parent directories
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!(path = %path.display(), "opening stats database");
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(StatsDb { conn })
    }

    pub fn create_user(&self, name: &str, email: &str) -> Result<User> {
        let joined_at = Local::now();
        let inserted = self.conn.execute(
            "INSERT INTO users (name, email, joined_at) VALUES (?1, ?2, ?3)",
            params![name, email, format_timestamp(&joined_at)],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::DuplicateEmail(email.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let id = self.conn.last_insert_rowid();
        info!(user_id = id, "registered user");
        self.user_by_id(id)?.ok_or(StoreError::UnknownUser(id))
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT user_id, name, email, joined_at FROM users WHERE email = ?1",
                [email],
                raw_user,
            )
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    pub fn user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT user_id, name, email, joined_at FROM users WHERE user_id = ?1",
                [id],
                raw_user,
            )
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    pub fn all_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id, name, email, joined_at FROM users ORDER BY user_id")?;
        let rows = stmt.query_map([], raw_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(User::try_from(row?)?);
        }
        Ok(users)
    }

    /// The display name is the only mutable part of a user
    pub fn rename_user(&self, id: i64, name: &str) -> Result<User> {
        let changed = self.conn.execute(
            "UPDATE users SET name = ?1 WHERE user_id = ?2",
            params![name, id],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownUser(id));
        }
        self.user_by_id(id)?.ok_or(StoreError::UnknownUser(id))
    }

    /// Persist a scored attempt. Values are stored rounded to two decimals.
    pub fn save_result(&self, user_id: i64, score: &Score) -> Result<TestResult> {
        if self.user_by_id(user_id)?.is_none() {
            return Err(StoreError::UnknownUser(user_id));
        }

        let taken_at = Local::now();
        self.conn.execute(
            "INSERT INTO typing_tests (user_id, wpm, accuracy, test_date) VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id,
                round2(score.wpm()),
                round2(score.accuracy()),
                format_timestamp(&taken_at),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!(user_id, test_id = id, wpm = score.wpm(), "saved typing test");
        self.result_by_id(id)?.ok_or(StoreError::UnknownUser(user_id))
    }

    fn result_by_id(&self, id: i64) -> Result<Option<TestResult>> {
        self.conn
            .query_row(
                "SELECT test_id, user_id, wpm, accuracy, test_date FROM typing_tests WHERE test_id = ?1",
                [id],
                raw_result,
            )
            .optional()?
            .map(TestResult::try_from)
            .transpose()
    }

    fn collect_results(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<TestResult>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, raw_result)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(TestResult::try_from(row?)?);
        }
        Ok(results)
    }

    /// Most recent tests of a user, newest first
    pub fn user_results(&self, user_id: i64, limit: usize) -> Result<Vec<TestResult>> {
        self.collect_results(
            r#"
            SELECT test_id, user_id, wpm, accuracy, test_date
            FROM typing_tests
            WHERE user_id = ?1
            ORDER BY test_id DESC
            LIMIT ?2
            "#,
            params![user_id, limit as i64],
        )
    }

    /// Every test of a user, oldest first
    pub fn user_history(&self, user_id: i64) -> Result<Vec<TestResult>> {
        self.collect_results(
            r#"
            SELECT test_id, user_id, wpm, accuracy, test_date
            FROM typing_tests
            WHERE user_id = ?1
            ORDER BY test_id ASC
            "#,
            [user_id],
        )
    }

    pub fn best_result(&self, user_id: i64) -> Result<Option<TestResult>> {
        Ok(self
            .collect_results(
                r#"
                SELECT test_id, user_id, wpm, accuracy, test_date
                FROM typing_tests
                WHERE user_id = ?1
                ORDER BY wpm DESC, test_id ASC
                LIMIT 1
                "#,
                [user_id],
            )?
            .into_iter()
            .next())
    }

    pub fn user_averages(&self, user_id: i64) -> Result<UserAverages> {
        let (count, avg_wpm, avg_accuracy): (i64, Option<f64>, Option<f64>) = self.conn.query_row(
            "SELECT COUNT(*), AVG(wpm), AVG(accuracy) FROM typing_tests WHERE user_id = ?1",
            [user_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(UserAverages {
            avg_wpm: round2(avg_wpm.unwrap_or(0.0)),
            avg_accuracy: round2(avg_accuracy.unwrap_or(0.0)),
            total_tests: count as usize,
        })
    }

    /// Every stored test, in insertion order
    pub fn all_results(&self) -> Result<Vec<TestResult>> {
        self.collect_results(
            "SELECT test_id, user_id, wpm, accuracy, test_date FROM typing_tests ORDER BY test_id",
            [],
        )
    }

    pub fn global_stats(&self) -> Result<GlobalStats> {
        let results = self.all_results()?;
        if results.is_empty() {
            return Ok(GlobalStats::default());
        }

        let wpms: Vec<f64> = results.iter().map(|r| r.wpm).collect();
        let accuracies: Vec<f64> = results.iter().map(|r| r.accuracy).collect();

        Ok(GlobalStats {
            total_tests: results.len(),
            avg_wpm: round2(mean(&wpms).unwrap_or(0.0)),
            highest_wpm: round2(wpms.iter().copied().fold(0.0, f64::max)),
            avg_accuracy: round2(mean(&accuracies).unwrap_or(0.0)),
            wpm_std_dev: round2(std_dev(&wpms).unwrap_or(0.0)),
        })
    }
}
