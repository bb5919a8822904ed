//! # I/O boundary
//!
//! Universe/selection JSON parsing is in scope as a format definition
//! (spec §1); the file-upload/session/zipping glue around it is not. CSV
//! reading/writing uses the `csv` crate rather than a hand-rolled line
//! parser, since quoting and embedded commas/newlines are real input
//! shapes for a shipped tool.

pub mod csv_io;
pub mod selection_json;
pub mod universe_json;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("writing {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: input CSV has no header row")]
    MissingHeader { path: String },
    #[error("{path}: required input column '{column}' is absent from the CSV header")]
    MissingInputColumn { path: String, column: String },
    #[error(transparent)]
    Universe(#[from] crate::universe::UniverseError),
    #[error(transparent)]
    Selection(#[from] crate::selection::SelectionError),
    #[error(transparent)]
    Expr(#[from] crate::expr::ParseError),
}
