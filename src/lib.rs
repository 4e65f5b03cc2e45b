// Library surface shared by the binary and the integration tests.
// Scoring and leaderboard are pure; stats and service own the database.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod feedback;
pub mod leaderboard;
pub mod passages;
pub mod scoring;
pub mod service;
pub mod session;
pub mod stats;
pub mod util;

pub use error::{Error, Result, ScoringError, StoreError};
pub use scoring::{score, Score};
