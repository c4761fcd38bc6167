use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid name rule (no tokens): {0}")]
    InvalidNameRule(String),
    #[error("phone replacement `{from}` -> `{to}` grows the number on every pass")]
    GrowingReplacement { from: String, to: String },
    #[error("attribute csv header mismatch: expected `{expected}`, found `{found}`")]
    CsvHeaderMismatch { expected: String, found: String },
    #[error("attribute csv line {line}: expected {expected} columns, found {found}")]
    CsvColumnCount {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("attribute csv line {line}: invalid {column} `{value}`")]
    CsvField {
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("attribute csv: {0}")]
    Csv(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
