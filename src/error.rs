//! Error taxonomy shared by every input variant.
//!
//! All failures propagate to the caller immediately. A single malformed record
//! aborts the read of the whole source; nothing is retried or skipped.
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving or reading an input source.
#[derive(Error, Debug)]
pub enum InputError {
    /// A file or directory is missing or cannot be opened.
    #[error("Can't open source {}: {source}", path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content that cannot be parsed into a record under the declared format.
    #[error("Malformed record in {location}: {reason}")]
    MalformedRecord { location: String, reason: String },

    /// The database cannot be reached or refused the credentials.
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// The database rejected a filter or projection.
    #[error("Query on collection '{collection}' failed: {reason}")]
    Query { collection: String, reason: String },

    /// The factory was handed a data type it does not know.
    #[error("Unsupported data type: '{0}'. Expected one of: fasta, json, mongodb")]
    UnsupportedDataType(String),

    /// Factory parameters that cannot describe a source.
    #[error("Invalid input configuration: {0}")]
    Config(String),
}

impl InputError {
    pub(crate) fn not_found(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InputError::SourceNotFound { path: path.into(), source }
    }

    pub(crate) fn malformed(location: impl Into<String>, reason: impl ToString) -> Self {
        InputError::MalformedRecord { location: location.into(), reason: reason.to_string() }
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, InputError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_source() {
        let e = InputError::not_found(
            "/no/such/file.fasta",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(e.to_string().contains("/no/such/file.fasta"));

        let e = InputError::malformed("reads.json:3", "expected value");
        assert_eq!(e.to_string(), "Malformed record in reads.json:3: expected value");

        let e = InputError::UnsupportedDataType("fastq".into());
        assert!(e.to_string().contains("'fastq'"));
    }
}
