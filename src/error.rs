use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("change {start}..{end} is outside the note (length {len})")]
    InvalidRange { start: usize, end: usize, len: usize },
    #[error("change {first_start}..{first_end} overlaps change {next_start}..{next_end}")]
    OverlappingChanges {
        first_start: usize,
        first_end: usize,
        next_start: usize,
        next_end: usize,
    },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("localStorage is not available")]
    Unavailable,
    #[error("browser storage rejected the request: {0}")]
    Browser(String),
    #[error("settings could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TypesetError {
    #[error("no browser window")]
    NoWindow,
    #[error("MathJax.typesetPromise did not return a promise")]
    NotAPromise,
    #[error("MathJax typesetting failed: {0}")]
    Rejected(String),
}
