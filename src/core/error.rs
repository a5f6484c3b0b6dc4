//! Error types for the szz library.

use thiserror::Error;

/// Result type alias using szz's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while linking and labeling.
///
/// Only [`Error::Linkage`] is meant to abort a run. The remaining variants
/// are raised by collaborators and handled by the caller, which logs them
/// and skips the affected ticket, commit or file.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Git operation error (bad hash, failed walk, diff failure).
    #[error("Git error: {0}")]
    Git(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A release, ticket or commit lookup did not resolve.
    #[error("Data unavailable: {what}")]
    DataUnavailable { what: String },

    /// The injected version of a ticket could not be estimated.
    #[error("Cannot estimate injected version for ticket {ticket}")]
    Estimation { ticket: String },

    /// Ticket/commit linking failed; indicates a systemic repository problem.
    #[error("Linkage error: {message}: {source}")]
    Linkage {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a new git error.
    pub fn git(message: impl Into<String>) -> Self {
        Self::Git(message.into())
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a data-unavailable error.
    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::DataUnavailable { what: what.into() }
    }

    /// Wrap a collaborator error raised while linking commits to tickets.
    pub fn linkage(message: impl Into<String>, source: Error) -> Self {
        Self::Linkage {
            message: message.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::git("bad object");
        assert_eq!(err.to_string(), "Git error: bad object");

        let err = Error::unavailable("release 9.9.9");
        assert_eq!(err.to_string(), "Data unavailable: release 9.9.9");

        let err = Error::Estimation {
            ticket: "AVRO-1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot estimate injected version for ticket AVRO-1"
        );
    }

    #[test]
    fn test_linkage_wraps_source() {
        let err = Error::linkage("linking tickets", Error::git("walk failed"));
        assert_eq!(
            err.to_string(),
            "Linkage error: linking tickets: Git error: walk failed"
        );
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Git error: walk failed"));
    }
}
