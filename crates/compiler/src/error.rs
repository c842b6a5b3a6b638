// Compiler errors
// Fatal conditions that abort a compile. Recoverable problems are reported as warnings.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("A wad must be loaded to compile the final level.")]
    NoWadLoaded,

    #[error("value {value} does not fit {ty} field '{field}'")]
    NumericOverflow {
        field: &'static str,
        ty: &'static str,
        value: i64,
    },

    #[error("internal error: {0}")]
    Invariant(String),

    #[error("invalid level: {0}")]
    InvalidLevel(String),

    #[error("compilation was cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// Build an invariant violation for an index that should always have been resolved
pub(crate) fn unresolved(what: &str, detail: impl std::fmt::Display) -> CompileError {
    CompileError::Invariant(format!("unresolved {what}: {detail}"))
}
