//! Error types for untable library.

use std::io;
use thiserror::Error;

/// Result type alias for untable operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting and summarizing tables.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not a PDF, cannot be read, or is corrupted.
    ///
    /// Fatal to the whole invocation.
    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    /// A candidate table could not be turned into a cell grid.
    ///
    /// Local to one table; detectors skip the table and continue.
    #[error("Table parse failure: {0}")]
    TableParse(String),

    /// The summarization endpoint failed (network, auth, quota, timeout).
    ///
    /// Local to one table's summary.
    #[error("Summarization unavailable: {0}")]
    SummarizationUnavailable(String),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// Invalid configuration value or file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error while rendering a table (CSV, JSON, ...).
    #[error("Rendering error: {0}")]
    Render(String),
}

impl Error {
    /// Whether this error aborts the whole invocation.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::TableParse(_) | Error::SummarizationUnavailable(_)
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::UnreadableDocument(e.to_string()),
            lopdf::Error::Decryption(_) => {
                Error::UnreadableDocument("document is encrypted".to_string())
            }
            _ => Error::UnreadableDocument(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::SummarizationUnavailable(format!("request timed out: {}", err))
        } else {
            Error::SummarizationUnavailable(err.to_string())
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnreadableDocument("not a PDF".to_string());
        assert_eq!(err.to_string(), "Unreadable document: not a PDF");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_local_errors_are_not_fatal() {
        assert!(!Error::TableParse("bad html".into()).is_fatal());
        assert!(!Error::SummarizationUnavailable("quota".into()).is_fatal());
        assert!(Error::UnreadableDocument("truncated".into()).is_fatal());
    }
}
