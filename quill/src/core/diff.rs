//! Position-aligned line diff used for write previews.
//!
//! Lines are compared index by index, not by edit distance: inserting one line
//! shifts every following line into "changed". Previews and their tests depend
//! on this exact output.
//!
//! Texts are split on `\n` only, so a trailing newline shows up as an empty
//! last line and a `\r` stays part of its line. Edits that only touch line
//! endings still produce a diff.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Removed,
    Added,
}

/// One changed line. `line` is the 1-based position in the compared texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: DiffKind,
    pub line: usize,
    pub text: String,
}

/// Compare `old` and `new` line by line at equal indices.
///
/// For every index where the lines differ, emits the removal of the old line
/// (if any) followed by the addition of the new line (if any).
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffLine> {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    let len = old_lines.len().max(new_lines.len());

    let mut changes = Vec::new();
    for idx in 0..len {
        let before = old_lines.get(idx);
        let after = new_lines.get(idx);
        if before == after {
            continue;
        }
        if let Some(text) = before {
            changes.push(DiffLine {
                kind: DiffKind::Removed,
                line: idx + 1,
                text: (*text).to_string(),
            });
        }
        if let Some(text) = after {
            changes.push(DiffLine {
                kind: DiffKind::Added,
                line: idx + 1,
                text: (*text).to_string(),
            });
        }
    }
    changes
}

/// Render changes as `-`/`+` prefixed lines with line numbers.
pub fn render(changes: &[DiffLine]) -> String {
    let mut buf = String::new();
    for change in changes {
        let sign = match change.kind {
            DiffKind::Removed => '-',
            DiffKind::Added => '+',
        };
        let _ = writeln!(buf, "{sign}{:>4} | {}", change.line, change.text);
    }
    buf
}
