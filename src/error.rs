use thiserror::Error;

/// Errors surfaced by the persistence and logging edges of the app.
#[derive(Debug, Error)]
pub enum DrillError {
    #[error("high score storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history log error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DrillError>;
