//! Shared deterministic types for the mutation engine.
//!
//! These types define stable contracts between the engine, the plan runner and
//! the interpreter boundary. They carry no I/O state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::diff::DiffLine;
use crate::error::{EngineError, ErrorKind};

/// Kind of operation recorded in history and the operation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Read,
    Edit,
    Delete,
    Undo,
    Redo,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Read => "read",
            OperationKind::Edit => "edit",
            OperationKind::Delete => "delete",
            OperationKind::Undo => "undo",
            OperationKind::Redo => "redo",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an edit rewrites the current file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum EditMode {
    /// Discard the prior content entirely.
    Replace,
    /// Insert a new line at `line_index` (0-based), clamped to end-of-file.
    Insert { line_index: Option<usize> },
    /// Replace every literal occurrence of `search` with the edit content.
    FindReplace { search: String },
    /// Add the content as a new trailing line.
    Append,
}

impl EditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditMode::Replace => "replace",
            EditMode::Insert { .. } => "insert",
            EditMode::FindReplace { .. } => "find-replace",
            EditMode::Append => "append",
        }
    }
}

/// An edit: a mode plus the content it writes (the replacement for find-replace).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    #[serde(flatten)]
    pub mode: EditMode,
    pub content: String,
}

impl Edit {
    pub fn replace(content: impl Into<String>) -> Self {
        Self {
            mode: EditMode::Replace,
            content: content.into(),
        }
    }

    pub fn append(content: impl Into<String>) -> Self {
        Self {
            mode: EditMode::Append,
            content: content.into(),
        }
    }

    pub fn insert(line_index: Option<usize>, content: impl Into<String>) -> Self {
        Self {
            mode: EditMode::Insert { line_index },
            content: content.into(),
        }
    }

    pub fn find_replace(search: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            mode: EditMode::FindReplace {
                search: search.into(),
            },
            content: replacement.into(),
        }
    }
}

/// A single intended file operation, as produced by an interpreter or the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum MutationRequest {
    Create {
        path: String,
        content: String,
        #[serde(default)]
        overwrite: bool,
    },
    Read {
        path: String,
    },
    Edit {
        path: String,
        #[serde(flatten)]
        edit: Edit,
    },
    Delete {
        path: String,
    },
}

impl MutationRequest {
    pub fn path(&self) -> &str {
        match self {
            MutationRequest::Create { path, .. }
            | MutationRequest::Read { path }
            | MutationRequest::Edit { path, .. }
            | MutationRequest::Delete { path } => path,
        }
    }

    pub fn operation(&self) -> OperationKind {
        match self {
            MutationRequest::Create { .. } => OperationKind::Create,
            MutationRequest::Read { .. } => OperationKind::Read,
            MutationRequest::Edit { .. } => OperationKind::Edit,
            MutationRequest::Delete { .. } => OperationKind::Delete,
        }
    }
}

/// Unique, monotonically assigned plan identifier (rendered `plan-<n>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlanId(pub u64);

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plan-{}", self.0)
    }
}

impl FromStr for PlanId {
    type Err = String;

    /// Accepts `plan-<n>` or a bare `<n>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix("plan-").unwrap_or(s.trim());
        digits
            .parse::<u64>()
            .map(PlanId)
            .map_err(|_| format!("invalid plan id {s:?} (expected plan-<n>)"))
    }
}

/// Context handed to a step interpreter alongside the step text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepContext {
    pub plan_id: PlanId,
    /// 0-based index of the step being interpreted.
    pub step_index: usize,
    pub total_steps: usize,
    /// Task the plan was created for.
    pub task: String,
    /// Workspace context captured when the plan was created.
    pub context: String,
}

/// Classified failure attached to a [`MutationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&EngineError> for ResultError {
    fn from(err: &EngineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of applying one [`MutationRequest`]. Failures are values, not panics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResult {
    pub success: bool,
    pub operation: OperationKind,
    /// Resolved path when resolution succeeded, otherwise the requested path.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResultError>,
    #[serde(default)]
    pub overwritten: bool,
    /// File content, populated for reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<DiffLine>,
}

impl MutationResult {
    pub fn failed(operation: OperationKind, path: impl Into<String>, err: &EngineError) -> Self {
        Self {
            success: false,
            operation,
            path: path.into(),
            error: Some(ResultError::from(err)),
            overwritten: false,
            content: None,
            diff: Vec::new(),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|err| err.kind)
    }
}
