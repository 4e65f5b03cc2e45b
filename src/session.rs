use crate::error::ScoringError;
use crate::scoring::{compare_chars, score, CharComparison, Outcome, Score};
use std::time::SystemTime;

/// A single timed attempt at typing a prompt
#[derive(Debug, Clone)]
pub struct TypingSession {
    pub prompt: String,
    pub started_at: Option<SystemTime>,
}

impl TypingSession {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            started_at: None,
        }
    }

    pub fn start(&mut self) {
        self.start_at(SystemTime::now());
    }

    pub fn start_at(&mut self, at: SystemTime) {
        self.started_at = Some(at);
    }

    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Zero until started, or when the clock went backwards
    pub fn elapsed_secs(&self, now: SystemTime) -> f64 {
        self.started_at
            .map(|start| time_diff_secs(start, now))
            .unwrap_or(0.0)
    }

    pub fn finish(&self, typed: &str) -> Result<Score, ScoringError> {
        self.finish_at(typed, SystemTime::now())
    }

    pub fn finish_at(&self, typed: &str, now: SystemTime) -> Result<Score, ScoringError> {
        score(&self.prompt, typed, self.elapsed_secs(now))
    }

    /// Marks each prompt character against what has been typed so far
    pub fn render_marked(&self, typed: &str) -> String {
        compare_chars(&self.prompt, typed)
            .iter()
            .map(mark)
            .collect()
    }
}

fn mark(c: &CharComparison) -> String {
    match (c.outcome, c.expected, c.typed) {
        (Outcome::Correct, Some(e), _) => e.to_string(),
        (Outcome::Incorrect, Some(e), Some(t)) => format!("[{e}/{t}]"),
        (Outcome::Missing, Some(e), _) => format!("({e})"),
        (Outcome::Extra, _, Some(t)) => format!("{{+{t}}}"),
        _ => String::new(),
    }
}

pub fn time_diff_secs(start: SystemTime, end: SystemTime) -> f64 {
    end.duration_since(start).unwrap_or_default().as_secs_f64()
}
