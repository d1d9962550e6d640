//! Error types for registry operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced synchronously by registry operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("{path} was not being watched")]
    NotFound { path: PathBuf },

    #[error("{path} is already being watched")]
    DuplicateWatch { path: PathBuf },

    #[error(
        "watch_many arguments must be the same length \
         (paths: {paths}, expressions: {exprs}, trigger sets: {triggers})"
    )]
    LengthMismatch {
        paths: usize,
        exprs: usize,
        triggers: usize,
    },

    #[error("cannot watch {path}: {source}")]
    Backend {
        path: PathBuf,
        source: notify::Error,
    },
}
