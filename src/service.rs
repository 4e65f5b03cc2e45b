//! Front-end facing operations: the layer a UI or API handler talks to.
//!
//! Every stored result goes through [`crate::scoring::score`] and
//! [`crate::feedback::validate`] first.

use crate::config::Config;
use crate::error::{Error, Result, StoreError};
use crate::feedback::{self, Progress, Rating};
use crate::leaderboard::{self, LeaderboardEntry};
use crate::scoring::{self, Score};
use crate::session::TypingSession;
use crate::stats::{GlobalStats, StatsDb, TestResult, User, UserAverages};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use tracing::{debug, info, warn};

const UNKNOWN_USER_NAME: &str = "Unknown";

/// Outcome of submitting one attempt
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub result: TestResult,
    pub score: Score,
    pub rating: Rating,
    pub tips: Vec<&'static str>,
    pub progress: Progress,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub user: User,
    pub averages: UserAverages,
    pub best: Option<TestResult>,
    pub rank: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub rank: usize,
    pub user_id: i64,
    pub name: String,
    pub max_wpm: f64,
    pub max_accuracy: f64,
    pub tests: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopTest {
    pub rank: usize,
    pub user_id: i64,
    pub name: String,
    pub wpm: f64,
    pub accuracy: f64,
    pub taken_at: DateTime<Local>,
}

#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    test_id: i64,
    date: String,
    wpm: f64,
    accuracy: f64,
    rating: &'a str,
}

pub struct TypingService {
    db: StatsDb,
    config: Config,
}

/// Blank attempts are refused before scoring so they never reach history
fn check_attempt(typed: &str) -> Result<()> {
    if typed.trim().is_empty() {
        return Err(Error::InvalidAttempt(
            "Please type something before finishing!".to_string(),
        ));
    }
    Ok(())
}

fn check_user_details(name: &str, email: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidUser("name must not be empty".to_string()));
    }
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(Error::InvalidUser(format!("{email:?} is not an email address"))),
    }
}

impl TypingService {
    pub fn new(db: StatsDb, config: Config) -> Self {
        Self { db, config }
    }

    /// Open the database named by `config`
    pub fn open(config: Config) -> Result<Self> {
        let db = StatsDb::open(&config.resolved_db_path())?;
        Ok(Self::new(db, config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the user and whether it was newly created
    pub fn login_or_register(&self, name: &str, email: &str) -> Result<(User, bool)> {
        check_user_details(name, email)?;
        let email = email.trim();

        if let Some(user) = self.db.user_by_email(email)? {
            debug!(user_id = user.id, "existing user logged in");
            return Ok((user, false));
        }
        let user = self.db.create_user(name.trim(), email)?;
        Ok((user, true))
    }

    pub fn user_by_email(&self, email: &str) -> Result<User> {
        let email = email.trim();
        self.db
            .user_by_email(email)?
            .ok_or_else(|| StoreError::UnknownEmail(email.to_string()).into())
    }

    pub fn users(&self) -> Result<Vec<User>> {
        Ok(self.db.all_users()?)
    }

    pub fn rename(&self, user_id: i64, name: &str) -> Result<User> {
        if name.trim().is_empty() {
            return Err(Error::InvalidUser("name must not be empty".to_string()));
        }
        Ok(self.db.rename_user(user_id, name.trim())?)
    }

    /// Score, validate and persist one attempt
    pub fn submit_attempt(
        &self,
        user_id: i64,
        reference: &str,
        typed: &str,
        elapsed_secs: f64,
    ) -> Result<Submission> {
        check_attempt(typed)?;
        let score = scoring::score(reference, typed, elapsed_secs)?;
        self.submit_score(user_id, score)
    }

    pub fn submit_session(
        &self,
        user_id: i64,
        session: &TypingSession,
        typed: &str,
    ) -> Result<Submission> {
        check_attempt(typed)?;
        let score = session.finish(typed)?;
        self.submit_score(user_id, score)
    }

    fn submit_score(&self, user_id: i64, score: Score) -> Result<Submission> {
        if let Err(e) = feedback::validate(score.wpm(), score.accuracy()) {
            warn!(user_id, wpm = score.wpm(), "rejecting implausible result");
            return Err(e);
        }

        let previous = self.db.user_results(user_id, 1)?.first().map(|r| r.wpm);
        let result = self.db.save_result(user_id, &score)?;
        info!(
            user_id,
            test_id = result.id,
            wpm = result.wpm,
            accuracy = result.accuracy,
            "typing test recorded"
        );

        Ok(Submission {
            rating: feedback::rate(result.wpm, result.accuracy),
            tips: feedback::tips(result.wpm, result.accuracy),
            progress: feedback::progress(result.wpm, previous),
            result,
            score,
        })
    }

    pub fn history(&self, user_id: i64, limit: Option<usize>) -> Result<Vec<TestResult>> {
        let limit = limit.unwrap_or(self.config.history_limit);
        Ok(self.db.user_results(user_id, limit)?)
    }

    pub fn summary(&self, user_id: i64) -> Result<UserSummary> {
        let user = self
            .db
            .user_by_id(user_id)?
            .ok_or(StoreError::UnknownUser(user_id))?;
        Ok(UserSummary {
            averages: self.db.user_averages(user_id)?,
            best: self.db.best_result(user_id)?,
            rank: self.rank(user_id)?,
            user,
        })
    }

    /// 1-based position on the per-user leaderboard, `None` without any tests
    pub fn rank(&self, user_id: i64) -> Result<Option<usize>> {
        let entries = leaderboard::aggregate(&self.db.all_results()?);
        Ok(leaderboard::rank_of(&entries, user_id))
    }

    fn names(&self) -> Result<HashMap<i64, String>> {
        Ok(self
            .db
            .all_users()?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect())
    }

    /// Best wpm and best accuracy per user
    pub fn leaderboard(&self, limit: Option<usize>) -> Result<Vec<RankedEntry>> {
        let limit = limit.unwrap_or(self.config.leaderboard_limit);
        let names = self.names()?;
        let entries: Vec<LeaderboardEntry> = leaderboard::aggregate(&self.db.all_results()?);

        Ok(entries
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(idx, e)| RankedEntry {
                rank: idx + 1,
                name: names
                    .get(&e.user_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string()),
                user_id: e.user_id,
                max_wpm: e.max_wpm,
                max_accuracy: e.max_accuracy,
                tests: e.tests,
            })
            .collect())
    }

    /// Fastest individual tests; a user may appear several times
    pub fn top_tests(&self, limit: Option<usize>) -> Result<Vec<TopTest>> {
        let limit = limit.unwrap_or(self.config.leaderboard_limit);
        let names = self.names()?;

        Ok(leaderboard::top_results(&self.db.all_results()?, limit)
            .into_iter()
            .enumerate()
            .map(|(idx, r)| TopTest {
                rank: idx + 1,
                name: names
                    .get(&r.user_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string()),
                user_id: r.user_id,
                wpm: r.wpm,
                accuracy: r.accuracy,
                taken_at: r.taken_at,
            })
            .collect())
    }

    pub fn global_stats(&self) -> Result<GlobalStats> {
        Ok(self.db.global_stats()?)
    }

    /// Write a user's full history, oldest first, as CSV
    pub fn export_history<W: io::Write>(&self, user_id: i64, out: W) -> Result<usize> {
        let rows = self.db.user_history(user_id)?;

        let mut writer = csv::Writer::from_writer(out);
        for r in &rows {
            let rating = feedback::rate(r.wpm, r.accuracy).to_string();
            writer.serialize(HistoryRow {
                test_id: r.id,
                date: r.taken_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                wpm: r.wpm,
                accuracy: r.accuracy,
                rating: &rating,
            })?;
        }
        writer.flush()?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoringError;
    use assert_matches::assert_matches;

    fn service() -> TypingService {
        TypingService::new(StatsDb::open_in_memory().unwrap(), Config::default())
    }

    #[test]
    fn test_login_or_register() {
        let svc = service();

        let (user, created) = svc.login_or_register("Ada", "ada@example.com").unwrap();
        assert!(created);

        let (again, created) = svc
            .login_or_register("Someone Else", " ada@example.com ")
            .unwrap();
        assert!(!created);
        assert_eq!(again, user);
        assert_eq!(again.name, "Ada");
    }

    #[test]
    fn test_login_rejects_bad_details() {
        let svc = service();
        assert_matches!(
            svc.login_or_register("", "ada@example.com"),
            Err(Error::InvalidUser(_))
        );
        assert_matches!(
            svc.login_or_register("Ada", "not-an-email"),
            Err(Error::InvalidUser(_))
        );
        assert_matches!(svc.login_or_register("Ada", "@x"), Err(Error::InvalidUser(_)));
    }

    #[test]
    fn test_unknown_email() {
        let svc = service();
        assert_matches!(
            svc.user_by_email("ghost@example.com"),
            Err(Error::Store(StoreError::UnknownEmail(_)))
        );
    }

    #[test]
    fn test_submit_attempt_persists_engine_output() {
        let svc = service();
        let (user, _) = svc.login_or_register("Ada", "ada@example.com").unwrap();

        let sub = svc
            .submit_attempt(user.id, "the cat sat", "the cat sat", 6.0)
            .unwrap();
        assert_eq!(sub.result.wpm, 30.0);
        assert_eq!(sub.result.accuracy, 100.0);
        assert_eq!(sub.rating, Rating::Intermediate);
        assert_eq!(sub.progress.message, "First test - baseline established!");

        let second = svc
            .submit_attempt(user.id, "the cat sat", "the cat sat", 3.0)
            .unwrap();
        assert_eq!(second.progress.improvement, 30.0);
        assert_eq!(second.progress.percentage, 100.0);
    }

    #[test]
    fn test_submit_attempt_surfaces_engine_errors() {
        let svc = service();
        let (user, _) = svc.login_or_register("Ada", "ada@example.com").unwrap();

        assert_matches!(
            svc.submit_attempt(user.id, "abc", "abc", 0.0),
            Err(Error::Scoring(ScoringError::InvalidDuration(_)))
        );
        assert_matches!(
            svc.submit_attempt(user.id, "", "abc", 2.0),
            Err(Error::Scoring(ScoringError::InvalidInput))
        );
        assert!(svc.history(user.id, None).unwrap().is_empty());
    }

    #[test]
    fn test_blank_attempt_not_stored() {
        let svc = service();
        let (user, _) = svc.login_or_register("Ada", "ada@example.com").unwrap();

        for typed in ["", "   ", "\n\t"] {
            assert_matches!(
                svc.submit_attempt(user.id, "the cat sat", typed, 5.0),
                Err(Error::InvalidAttempt(_))
            );
        }

        let mut session = TypingSession::new("the cat sat");
        session.start();
        assert_matches!(
            svc.submit_session(user.id, &session, ""),
            Err(Error::InvalidAttempt(_))
        );

        assert!(svc.history(user.id, None).unwrap().is_empty());
        assert_eq!(svc.global_stats().unwrap().total_tests, 0);
    }

    #[test]
    fn test_implausible_result_not_stored() {
        let svc = service();
        let (user, _) = svc.login_or_register("Ada", "ada@example.com").unwrap();

        // six words in one second is 360 wpm
        let text = "a b c d e f";
        assert_matches!(
            svc.submit_attempt(user.id, text, text, 1.0),
            Err(Error::Implausible(_))
        );
        assert!(svc.history(user.id, None).unwrap().is_empty());
    }

    #[test]
    fn test_leaderboard_and_rank() {
        let svc = service();
        let (a, _) = svc.login_or_register("Ada", "ada@example.com").unwrap();
        let (b, _) = svc.login_or_register("Bob", "bob@example.com").unwrap();
        let (c, _) = svc.login_or_register("Cy", "cy@example.com").unwrap();

        svc.submit_attempt(a.id, "one two", "one two", 6.0).unwrap(); // 20
        svc.submit_attempt(a.id, "one two", "one two", 3.0).unwrap(); // 40
        svc.submit_attempt(b.id, "one two three", "one two three", 6.0)
            .unwrap(); // 30

        let board = svc.leaderboard(None).unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].name, "Ada");
        assert_eq!(board[0].max_wpm, 40.0);
        assert_eq!(board[0].tests, 2);
        assert_eq!(board[1].rank, 2);
        assert_eq!(board[1].name, "Bob");

        assert_eq!(svc.rank(a.id).unwrap(), Some(1));
        assert_eq!(svc.rank(b.id).unwrap(), Some(2));
        assert_eq!(svc.rank(c.id).unwrap(), None);

        let top = svc.top_tests(Some(2)).unwrap();
        assert_eq!(
            top.iter().map(|t| t.wpm).collect::<Vec<_>>(),
            vec![40.0, 30.0]
        );
        assert_eq!(svc.leaderboard(Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_summary() {
        let svc = service();
        let (user, _) = svc.login_or_register("Ada", "ada@example.com").unwrap();
        svc.submit_attempt(user.id, "one two", "one two", 6.0).unwrap();
        svc.submit_attempt(user.id, "one two", "one", 6.0).unwrap();

        let summary = svc.summary(user.id).unwrap();
        assert_eq!(summary.user.id, user.id);
        assert_eq!(summary.averages.total_tests, 2);
        assert_eq!(summary.averages.avg_wpm, 15.0);
        assert_eq!(summary.best.unwrap().wpm, 20.0);
        assert_eq!(summary.rank, Some(1));

        assert_matches!(
            svc.summary(999),
            Err(Error::Store(StoreError::UnknownUser(999)))
        );
    }

    #[test]
    fn test_rename() {
        let svc = service();
        let (user, _) = svc.login_or_register("Ada", "ada@example.com").unwrap();

        let renamed = svc.rename(user.id, "  Ada Lovelace ").unwrap();
        assert_eq!(renamed.name, "Ada Lovelace");
        assert_matches!(svc.rename(user.id, " "), Err(Error::InvalidUser(_)));
    }

    #[test]
    fn test_export_history_csv() {
        let svc = service();
        let (user, _) = svc.login_or_register("Ada", "ada@example.com").unwrap();
        svc.submit_attempt(user.id, "one two", "one two", 6.0).unwrap();
        svc.submit_attempt(user.id, "one two", "one two", 3.0).unwrap();

        let mut buf = Vec::new();
        let written = svc.export_history(user.id, &mut buf).unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "test_id,date,wpm,accuracy,rating");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains(",20.0,100.0,"));
        assert!(lines[2].contains(",40.0,100.0,"));
    }
}
