//! Pure text transforms behind `edit`.

use crate::core::types::{Edit, EditMode};

/// Apply `edit` to `current` and return the new content.
///
/// Returns `None` when a find-replace search text is empty or does not occur
/// in `current`.
pub fn apply_edit(current: &str, edit: &Edit) -> Option<String> {
    match &edit.mode {
        EditMode::Replace => Some(edit.content.clone()),
        EditMode::Append => Some(append_line(current, &edit.content)),
        EditMode::Insert { line_index } => Some(insert_line(current, *line_index, &edit.content)),
        EditMode::FindReplace { search } => {
            if search.is_empty() || !current.contains(search.as_str()) {
                return None;
            }
            Some(current.replace(search.as_str(), &edit.content))
        }
    }
}

/// Add `line` after the last line, reusing an existing trailing newline.
pub fn append_line(current: &str, line: &str) -> String {
    if current.is_empty() {
        return line.to_string();
    }
    let mut out = String::with_capacity(current.len() + line.len() + 1);
    out.push_str(current);
    if !current.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(line);
    out
}

/// Insert `line` before line `index` (0-based); `None` or out-of-range appends
/// at end-of-file. A trailing newline on `current` is preserved.
pub fn insert_line(current: &str, index: Option<usize>, line: &str) -> String {
    let (body, trailing_newline) = match current.strip_suffix('\n') {
        Some(body) => (body, true),
        None => (current, false),
    };
    let mut lines: Vec<&str> = if current.is_empty() {
        Vec::new()
    } else {
        body.split('\n').collect()
    };
    let at = index.unwrap_or(lines.len()).min(lines.len());
    lines.insert(at, line);

    let mut out = lines.join("\n");
    if trailing_newline {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_replace_replaces_all_occurrences() {
        let out = apply_edit("a-a-a", &Edit::find_replace("a", "b"));
        assert_eq!(out.as_deref(), Some("b-b-b"));
    }

    #[test]
    fn find_replace_missing_or_empty_pattern_is_none() {
        assert!(apply_edit("abc", &Edit::find_replace("z", "y")).is_none());
        assert!(apply_edit("abc", &Edit::find_replace("", "y")).is_none());
    }

    #[test]
    fn replace_discards_prior_content() {
        let out = apply_edit("old\ncontent\n", &Edit::replace("new"));
        assert_eq!(out.as_deref(), Some("new"));
    }

    #[test]
    fn insert_shifts_following_lines_down() {
        assert_eq!(insert_line("a\nb", Some(1), "x"), "a\nx\nb");
        assert_eq!(insert_line("a\nb", Some(0), "x"), "x\na\nb");
    }

    #[test]
    fn insert_clamps_out_of_range_to_end() {
        assert_eq!(insert_line("a\nb", Some(99), "x"), "a\nb\nx");
        assert_eq!(insert_line("a\nb\n", None, "c"), "a\nb\nc\n");
    }

    #[test]
    fn insert_into_empty_file() {
        assert_eq!(insert_line("", Some(3), "only"), "only");
        assert_eq!(insert_line("\n", None, "x"), "\nx\n");
    }

    #[test]
    fn append_adds_a_trailing_line() {
        assert_eq!(append_line("a", "b"), "a\nb");
        assert_eq!(append_line("a\n", "b"), "a\nb");
        assert_eq!(append_line("", "b"), "b");
    }
}
