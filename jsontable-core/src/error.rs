use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    /// A response element could not be turned into a typed value.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns a stable error code for this error variant.
    /// These codes are stable and can be used by clients for error classification.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::InvalidKey(_) => "INVALID_KEY",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::InvalidTable(_) => "INVALID_TABLE",
            Error::Decode(_) => "DECODE_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Returns true if this error is potentially retryable.
    ///
    /// Only IO failures are transient; everything else describes bad input
    /// or a bad response and fails the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
