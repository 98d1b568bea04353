//! Error types in pecluster
//!

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter {0}")]
    Parameters(String),
    #[error("explanation table has {found} columns, the {target} layout with {n_reasons} reasons needs {required}")]
    MissingColumns {
        target: String,
        n_reasons: usize,
        required: usize,
        found: usize,
    },
    #[error("expected column `{expected}` at position {position}, found `{found}`")]
    SchemaMismatch {
        position: usize,
        expected: String,
        found: String,
    },
    #[error("unsupported target type `{0}`, only Regression and Binary are supported")]
    UnsupportedTarget(String),
    #[error("column `{0}` not found")]
    UnknownColumn(String),
    #[error("non-numeric value `{value}` in column `{column}` at row {row}")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },
    #[error("row count mismatch: {left} has {left_rows} rows but {right} has {right_rows}")]
    RowMismatch {
        left: &'static str,
        left_rows: usize,
        right: &'static str,
        right_rows: usize,
    },
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
