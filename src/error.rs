/// Validation failures raised by the scoring engine
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("elapsed time must be positive, got {0}s")]
    InvalidDuration(f64),

    #[error("reference text must not be empty")]
    InvalidInput,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("cannot create database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("a user with email {0} already exists")]
    DuplicateEmail(String),

    #[error("no user with id {0}")]
    UnknownUser(i64),

    #[error("no user registered with email {0}")]
    UnknownEmail(String),

    #[error("invalid timestamp in column {column}: {source}")]
    InvalidTimestamp {
        column: &'static str,
        #[source]
        source: chrono::ParseError,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("result rejected: {0}")]
    Implausible(String),

    #[error("invalid user details: {0}")]
    InvalidUser(String),

    #[error("attempt rejected: {0}")]
    InvalidAttempt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
