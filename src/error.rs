use std::num::ParseFloatError;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a plotting run.
#[derive(Debug, Error)]
pub enum BerPlotError {
    #[error("CSV not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("could not open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("line {line}: missing value for column '{column}'")]
    MissingField { line: u64, column: &'static str },

    #[error("line {line}: could not parse '{value}' in column '{column}' as a number")]
    InvalidNumber {
        line: u64,
        column: &'static str,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("failed to render chart to {}: {message}", .path.display())]
    Render { path: PathBuf, message: String },
}
