use crate::error::{Error, Result};
use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::io;

static TEXTS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/texts");

#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    ValueEnum,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Bundled prompt texts for one difficulty level
#[derive(Deserialize, Clone, Debug)]
pub struct PassageSet {
    pub difficulty: Difficulty,
    pub size: u32,
    pub passages: Vec<String>,
}

impl PassageSet {
    pub fn load(difficulty: Difficulty) -> Result<Self> {
        let file_name = format!("{difficulty}.json");
        let file = TEXTS_DIR.get_file(&file_name).ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("passage file {file_name} not bundled"),
            ))
        })?;
        let contents = file.contents_utf8().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("passage file {file_name} is not UTF-8"),
            ))
        })?;
        Ok(serde_json::from_str(contents)?)
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.passages.choose(rng).map(String::as_str)
    }
}

pub fn random_passage(difficulty: Difficulty) -> Result<String> {
    let set = PassageSet::load(difficulty)?;
    set.choose(&mut rand::thread_rng())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("no {difficulty} passages bundled"),
            ))
        })
}

/// Custom text wins when it has any non-whitespace content; otherwise a
/// random bundled passage of the given difficulty.
pub fn resolve_prompt(difficulty: Difficulty, custom: Option<&str>) -> Result<String> {
    match custom.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => random_passage(difficulty),
    }
}
