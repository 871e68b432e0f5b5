//! Error types for the intermediate-edge pipeline
//!
//! Every failure on the build path is fatal for the whole run. The read path
//! (row queries) never produces `UnknownEdge`, it treats unknown edges as
//! "no data" instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::edge::EdgeId;

/// Main error type for intermediate-edge operations
#[derive(Debug, Error)]
pub enum Error {
    /// Corpus, mapping, index or matrix file does not exist
    #[error("Input file not found: {}", .path.display())]
    MissingInput { path: PathBuf },

    /// A line or entry of an input file could not be parsed
    #[error(
        "Malformed record in {}{}: {reason}",
        .path.display(),
        .line.map(|l| format!(" (line {l})")).unwrap_or_default()
    )]
    MalformedRecord {
        path: PathBuf,
        line: Option<usize>,
        reason: String,
    },

    /// An edge produced during aggregation is absent from the edge index
    #[error("Edge '{edge}' is not in the edge index (index/corpus mismatch)")]
    UnknownEdge { edge: EdgeId },

    /// The same edge was assigned two indices
    #[error("Edge '{edge}' appears twice in the edge index")]
    DuplicateEdge { edge: EdgeId },

    /// A counting worker failed; the batch is aborted
    #[error("Worker failed on vehicle '{vehicle}' trip #{trip}: {message}")]
    WorkerFailure {
        vehicle: String,
        trip: usize,
        message: String,
    },

    /// A persisted artifact failed its integrity checks
    #[error("Corrupt file {}: {reason}", .path.display())]
    CorruptFile { path: PathBuf, reason: String },

    /// Sparse matrix construction received inconsistent triplets
    #[error("Invalid matrix: {0}")]
    InvalidMatrix(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error outside of line-oriented parsing
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(
        path: impl Into<PathBuf>,
        line: Option<usize>,
        reason: impl Into<String>,
    ) -> Self {
        Error::MalformedRecord {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptFile {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Opens a file, mapping `NotFound` onto [`Error::MissingInput`].
pub(crate) fn open_input(path: &std::path::Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => Error::MissingInput {
            path: path.to_path_buf(),
        },
        _ => Error::Io(err),
    })
}

/// Convenience result type for intermediate-edge operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_input_missing_file() {
        let err = open_input(std::path::Path::new("/definitely/not/here.json")).unwrap_err();
        match err {
            Error::MissingInput { path } => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.json"));
            }
            other => panic!("Expected MissingInput, got {other:?}"),
        }
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = Error::WorkerFailure {
            vehicle: "51B-123.45".to_string(),
            trip: 3,
            message: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Worker failed on vehicle '51B-123.45' trip #3: boom"
        );

        let err = Error::UnknownEdge {
            edge: EdgeId::from("42"),
        };
        assert!(err.to_string().contains("'42'"));
    }

    #[test]
    fn test_malformed_record_line_is_optional() {
        let with_line = Error::malformed("trips.json", Some(7), "expected value");
        assert_eq!(
            with_line.to_string(),
            "Malformed record in trips.json (line 7): expected value"
        );

        let without_line = Error::malformed("sub_edges", None, "bad key");
        assert_eq!(
            without_line.to_string(),
            "Malformed record in sub_edges: bad key"
        );
    }
}
