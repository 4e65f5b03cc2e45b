//! Scoring of a single typing attempt.
//!
//! Characters are Unicode scalar values and are compared position by position.
//! A word is a whitespace-delimited token; only typed words that equal the
//! reference word at the same token position count towards words per minute.

use crate::error::ScoringError;
use itertools::{EitherOrBoth, Itertools};
use serde::Serialize;

const SECONDS_PER_MINUTE: f64 = 60.0;

#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Incorrect,
    /// reference character with nothing typed at that position
    Missing,
    /// typed character past the end of the reference
    Extra,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CharComparison {
    pub index: usize,
    pub expected: Option<char>,
    pub typed: Option<char>,
    pub outcome: Outcome,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WordComparison {
    pub index: usize,
    pub expected: Option<String>,
    pub typed: Option<String>,
    pub correct: bool,
}

/// Metrics of one completed attempt.
///
/// Only [`score`] builds a `Score`, so anything holding one went through the
/// engine.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Score {
    wpm: f64,
    accuracy: f64,
    correct_chars: usize,
    total_chars: usize,
    correct_words: usize,
    typed_words: usize,
    elapsed_secs: f64,
}

impl Score {
    pub fn wpm(&self) -> f64 {
        self.wpm
    }

    /// Percentage in `[0, 100]`
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn correct_chars(&self) -> usize {
        self.correct_chars
    }

    /// `max(len(reference), len(typed))` in characters
    pub fn total_chars(&self) -> usize {
        self.total_chars
    }

    pub fn correct_words(&self) -> usize {
        self.correct_words
    }

    pub fn typed_words(&self) -> usize {
        self.typed_words
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }
}

fn validate(reference: &str, elapsed_secs: f64) -> Result<(), ScoringError> {
    // NaN fails the comparison and lands here too
    if !(elapsed_secs > 0.0) || !elapsed_secs.is_finite() {
        return Err(ScoringError::InvalidDuration(elapsed_secs));
    }
    if reference.is_empty() {
        return Err(ScoringError::InvalidInput);
    }
    Ok(())
}

/// Score an attempt at typing `reference` that produced `typed` in `elapsed_secs`.
pub fn score(reference: &str, typed: &str, elapsed_secs: f64) -> Result<Score, ScoringError> {
    validate(reference, elapsed_secs)?;

    let chars = compare_chars(reference, typed);
    let correct_chars = chars
        .iter()
        .filter(|c| c.outcome == Outcome::Correct)
        .count();
    let total_chars = chars.len();

    let correct_words = compare_words(reference, typed)
        .iter()
        .filter(|w| w.correct)
        .count();
    let typed_words = typed.split_whitespace().count();

    Ok(Score {
        wpm: per_minute(correct_words, elapsed_secs),
        accuracy: percentage(correct_chars, total_chars),
        correct_chars,
        total_chars,
        correct_words,
        typed_words,
        elapsed_secs,
    })
}

pub fn words_per_minute(
    reference: &str,
    typed: &str,
    elapsed_secs: f64,
) -> Result<f64, ScoringError> {
    score(reference, typed, elapsed_secs).map(|s| s.wpm)
}

pub fn accuracy(reference: &str, typed: &str) -> Result<f64, ScoringError> {
    if reference.is_empty() {
        return Err(ScoringError::InvalidInput);
    }
    let chars = compare_chars(reference, typed);
    let correct = chars
        .iter()
        .filter(|c| c.outcome == Outcome::Correct)
        .count();
    Ok(percentage(correct, chars.len()))
}

fn per_minute(count: usize, elapsed_secs: f64) -> f64 {
    (count as f64 / elapsed_secs) * SECONDS_PER_MINUTE
}

fn percentage(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((correct as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}

/// Character-by-character breakdown covering `max(len(reference), len(typed))` positions.
pub fn compare_chars(reference: &str, typed: &str) -> Vec<CharComparison> {
    reference
        .chars()
        .zip_longest(typed.chars())
        .enumerate()
        .map(|(index, pair)| match pair {
            EitherOrBoth::Both(expected, got) => CharComparison {
                index,
                expected: Some(expected),
                typed: Some(got),
                outcome: if expected == got {
                    Outcome::Correct
                } else {
                    Outcome::Incorrect
                },
            },
            EitherOrBoth::Left(expected) => CharComparison {
                index,
                expected: Some(expected),
                typed: None,
                outcome: Outcome::Missing,
            },
            EitherOrBoth::Right(got) => CharComparison {
                index,
                expected: None,
                typed: Some(got),
                outcome: Outcome::Extra,
            },
        })
        .collect()
}

/// Word-by-word breakdown, aligning the n-th typed token with the n-th reference token.
pub fn compare_words(reference: &str, typed: &str) -> Vec<WordComparison> {
    reference
        .split_whitespace()
        .zip_longest(typed.split_whitespace())
        .enumerate()
        .map(|(index, pair)| {
            let (expected, got) = match pair {
                EitherOrBoth::Both(e, t) => (Some(e), Some(t)),
                EitherOrBoth::Left(e) => (Some(e), None),
                EitherOrBoth::Right(t) => (None, Some(t)),
            };
            WordComparison {
                index,
                correct: matches!((expected, got), (Some(e), Some(t)) if e == t),
                expected: expected.map(str::to_string),
                typed: got.map(str::to_string),
            }
        })
        .collect()
}
