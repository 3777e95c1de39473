//! Error types for fixbench

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A required field is missing or a value is malformed. Raised before any write.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Ticket not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchema { found: i64, supported: i64 },

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid ticket number: {0}")]
    InvalidTicketNumber(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::Pdf(err.to_string())
    }
}
