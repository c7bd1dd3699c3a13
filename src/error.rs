//! Error types for the ECL engine
//!
//! Validation failures name the offending field. Persistence failures carry the
//! underlying cause for logging; the service layer converts them to `Internal`
//! before they reach a caller.

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("portfolio with name \"{0}\" already exists")]
    DuplicatePortfolio(String),

    #[error("internal server error")]
    Internal,
}

impl EngineError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Database(e.to_string())
    }
}

impl From<csv::Error> for EngineError {
    fn from(e: csv::Error) -> Self {
        EngineError::Csv(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

impl From<redis::RedisError> for EngineError {
    fn from(e: redis::RedisError) -> Self {
        EngineError::Queue(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
