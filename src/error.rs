use thiserror::Error;

#[derive(Error, Debug)]
pub enum FintrackError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The statement stream itself is unreadable; nothing from it is persisted.
    #[error("Could not read statement: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transaction with ID {0} not found")]
    TransactionNotFound(String),

    #[error("No user configured. Pass --user <id> or run `fintrack init --user <id>`.")]
    MissingUser,

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, FintrackError>;
