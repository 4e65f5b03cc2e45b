use crate::error::{Error, Result};
use crate::util::round2;
use serde::Serialize;

/// Anything faster than this is treated as a bogus submission
pub const MAX_PLAUSIBLE_WPM: f64 = 300.0;

/// Used for time estimates when a user has no history yet
pub const DEFAULT_AVG_WPM: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
pub enum Rating {
    #[strum(to_string = "Poor - Focus on accuracy first")]
    Poor,
    #[strum(to_string = "Fair - Good progress, keep practicing")]
    Fair,
    #[strum(to_string = "Beginner - Great start!")]
    Beginner,
    #[strum(to_string = "Intermediate - Nice progress!")]
    Intermediate,
    #[strum(to_string = "Advanced - Excellent typing!")]
    Advanced,
    #[strum(to_string = "Expert - Outstanding speed!")]
    Expert,
    #[strum(to_string = "Master - Incredible performance!")]
    Master,
}

/// Accuracy gates the rating before speed is considered.
pub fn rate(wpm: f64, accuracy: f64) -> Rating {
    match (wpm, accuracy) {
        (_, a) if a < 80.0 => Rating::Poor,
        (_, a) if a < 90.0 => Rating::Fair,
        (w, _) if w < 20.0 => Rating::Beginner,
        (w, _) if w < 40.0 => Rating::Intermediate,
        (w, _) if w < 60.0 => Rating::Advanced,
        (w, _) if w < 80.0 => Rating::Expert,
        _ => Rating::Master,
    }
}

pub fn tips(wpm: f64, accuracy: f64) -> Vec<&'static str> {
    let mut tips = Vec::new();

    if accuracy < 85.0 {
        tips.push("Focus on accuracy before speed - slow down and type correctly");
        tips.push("Look at the keyboard less and keep your eyes on the screen");
    }
    if wpm < 30.0 {
        tips.push("Practice proper finger placement on home row keys (ASDF JKL;)");
        tips.push("Start with simple texts and gradually increase difficulty");
    }
    if (30.0..50.0).contains(&wpm) {
        tips.push("Try to maintain a steady rhythm while typing");
        tips.push("Practice common word patterns and combinations");
    }
    if wpm >= 50.0 {
        tips.push("Challenge yourself with harder texts to improve further");
        tips.push("Work on your weakest keys and combinations");
    }
    if accuracy >= 95.0 && wpm >= 60.0 {
        tips.push("You're doing great! Try typing without looking at the keyboard");
        tips.push("Experiment with different typing techniques to increase speed");
    }

    if tips.is_empty() {
        tips.push("Keep practicing regularly to improve!");
    }
    tips
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub improvement: f64,
    pub percentage: f64,
    pub message: String,
}

/// Change in wpm relative to the previous test, if there was one
pub fn progress(current_wpm: f64, previous_wpm: Option<f64>) -> Progress {
    let previous = match previous_wpm {
        Some(p) if p > 0.0 => p,
        _ => {
            return Progress {
                improvement: 0.0,
                percentage: 0.0,
                message: "First test - baseline established!".to_string(),
            }
        }
    };

    let improvement = current_wpm - previous;
    let message = if improvement > 0.0 {
        format!("Improved by {:.2} WPM! Keep it up!", improvement.abs())
    } else if improvement < 0.0 {
        format!(
            "Decreased by {:.2} WPM. Don't worry, practice makes perfect!",
            improvement.abs()
        )
    } else {
        "Same speed. Keep practicing!".to_string()
    };

    Progress {
        improvement: round2(improvement),
        percentage: round2(improvement / previous * 100.0),
        message,
    }
}

/// Reject results no human could have produced before they reach storage.
pub fn validate(wpm: f64, accuracy: f64) -> Result<()> {
    if wpm < 0.0 {
        return Err(Error::Implausible("WPM cannot be negative".to_string()));
    }
    if wpm > MAX_PLAUSIBLE_WPM {
        return Err(Error::Implausible(format!(
            "WPM seems unrealistically high (>{MAX_PLAUSIBLE_WPM})"
        )));
    }
    if !(0.0..=100.0).contains(&accuracy) {
        return Err(Error::Implausible(
            "Accuracy must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

/// Characters in a standard word for time estimates
pub const CHARS_PER_WORD: f64 = 5.0;

/// Seconds needed to type `text` at `avg_wpm`, rounded to a tenth.
/// Counts standard 5-character words, spaces included.
pub fn estimated_secs(text: &str, avg_wpm: f64) -> f64 {
    let wpm = if avg_wpm > 0.0 { avg_wpm } else { DEFAULT_AVG_WPM };
    let words = text.chars().count() as f64 / CHARS_PER_WORD;
    (words / wpm * 60.0 * 10.0).round() / 10.0
}
