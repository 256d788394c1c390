//! Error taxonomy for the mutation engine and plan runner.
//!
//! Engine operations return [`EngineError`] as a value. Callers that need a
//! stable, serializable classification use [`EngineError::kind`].

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Failure returned by workspace operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The path resolves outside the workspace root and escapes are not allowed.
    #[error("{} is outside workspace {}", path.display(), root.display())]
    OutOfWorkspace { path: PathBuf, root: PathBuf },

    #[error("{} not found", path.display())]
    NotFound { path: PathBuf },

    #[error("{} already exists (use overwrite to replace it)", path.display())]
    AlreadyExists { path: PathBuf },

    /// The find-replace search text does not occur in the file.
    #[error("pattern {pattern:?} not found in {}", path.display())]
    PatternNotFound { path: PathBuf, pattern: String },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    /// An interpreter produced an action (or edit mode) outside the known set.
    #[error("unknown action {action:?}")]
    UnknownAction { action: String },

    #[error("interpreter failed: {0}")]
    InterpreterFailure(String),

    /// Underlying filesystem error.
    #[error("{} failed for {}: {source}", op, path.display())]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::OutOfWorkspace { .. } => ErrorKind::OutOfWorkspace,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            EngineError::PatternNotFound { .. } => ErrorKind::PatternNotFound,
            EngineError::NothingToUndo => ErrorKind::NothingToUndo,
            EngineError::NothingToRedo => ErrorKind::NothingToRedo,
            EngineError::UnknownAction { .. } => ErrorKind::UnknownAction,
            EngineError::InterpreterFailure(_) => ErrorKind::InterpreterFailure,
            EngineError::Filesystem { .. } => ErrorKind::FilesystemFailure,
        }
    }

    pub(crate) fn filesystem(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        EngineError::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Stable classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    OutOfWorkspace,
    NotFound,
    AlreadyExists,
    PatternNotFound,
    NothingToUndo,
    NothingToRedo,
    UnknownAction,
    InterpreterFailure,
    FilesystemFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::OutOfWorkspace => "out_of_workspace",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::PatternNotFound => "pattern_not_found",
            ErrorKind::NothingToUndo => "nothing_to_undo",
            ErrorKind::NothingToRedo => "nothing_to_redo",
            ErrorKind::UnknownAction => "unknown_action",
            ErrorKind::InterpreterFailure => "interpreter_failure",
            ErrorKind::FilesystemFailure => "filesystem_failure",
        }
    }
}
