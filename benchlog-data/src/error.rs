//! Error types for log parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading a benchmark log.
///
/// Every variant is terminal: the read produces no table.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not find file: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed header on line {line}: expected a line starting with {expected:?}")]
    MalformedHeader { line: usize, expected: &'static str },

    #[error("camera {0:?} is listed more than once in the header")]
    DuplicateCamera(String),

    #[error("log contains no iteration blocks")]
    EmptyLog,

    #[error(
        "metric columns ({columns}) match neither the camera count ({cameras}) \
         nor the test camera count ({test_cameras})"
    )]
    ColumnCountMismatch {
        columns: usize,
        cameras: usize,
        test_cameras: usize,
    },

    #[error("line {line}: expected {expected} values, found {found}")]
    FieldCountMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: iteration index {found} does not match block iteration {expected}")]
    InconsistentIteration { line: usize, expected: i64, found: i64 },

    #[error("line {line}, column {column}: invalid value {value:?}")]
    InvalidValue {
        line: usize,
        column: usize,
        value: String,
    },

    #[error("truncated iteration block starting on line {line}: {found} of {expected} lines present")]
    TruncatedBlock {
        line: usize,
        expected: usize,
        found: usize,
    },
}

pub type Result<T> = std::result::Result<T, ParseError>;
