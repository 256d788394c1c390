//! Undo/redo stacks and the append-only operation log.

use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::OperationKind;

/// Before/after content of one mutation.
///
/// `old_content == None`: the path did not exist before (undo removes it).
/// `new_content == None`: the mutation deleted the path (redo removes it again).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub operation: OperationKind,
    pub path: PathBuf,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Bounded undo stack plus redo stack.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    max_undo: usize,
}

impl History {
    pub fn new(max_undo: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_undo: max_undo.max(1),
        }
    }

    /// Record a forward mutation. Clears redo; evicts the oldest entry when full.
    ///
    /// Returns the evicted entry, if any.
    pub fn record(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        self.redo.clear();
        self.push_undo(entry)
    }

    pub fn pop_undo(&mut self) -> Option<HistoryEntry> {
        self.undo.pop_back()
    }

    pub fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo.pop()
    }

    /// Push onto undo without touching redo (used by redo and failed undo restores).
    pub fn push_undo(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        self.undo.push_back(entry);
        if self.undo.len() > self.max_undo {
            return self.undo.pop_front();
        }
        None
    }

    pub fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo.push(entry);
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn max_undo(&self) -> usize {
        self.max_undo
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub operation: OperationKind,
    pub path: PathBuf,
    pub timestamp: DateTime<Utc>,
}

/// Append-only audit record of completed mutations.
#[derive(Debug, Clone, Default)]
pub struct OperationLog {
    entries: Vec<LogEntry>,
}

impl OperationLog {
    pub fn append(&mut self, operation: OperationKind, path: PathBuf, timestamp: DateTime<Utc>) {
        self.entries.push(LogEntry {
            operation,
            path,
            timestamp,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
