//! Sandboxed file mutations with undo/redo.
//!
//! [`MutationEngine`] is the only owner of the undo/redo stacks and the
//! operation log. Every operation resolves its path through the sandbox
//! before touching the filesystem, and every failure is returned as a value.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::core::diff::{DiffLine, diff_lines};
use crate::core::edit::apply_edit;
use crate::core::history::{History, HistoryEntry, LogEntry, OperationLog};
use crate::core::sandbox::PathSandbox;
use crate::core::types::{Edit, EditMode, MutationRequest, MutationResult, OperationKind};
use crate::error::EngineError;
use crate::io::config::WorkspaceConfig;
use crate::io::fs_ops::{read_required, remove_if_exists, write_atomic};
use crate::io::ignore::IgnoreRules;

/// Symlink hops followed before a path is reported as a loop.
const MAX_SYMLINK_HOPS: usize = 40;

/// Engine settings, usually taken from `[workspace]` in the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub allow_outside_workspace: bool,
    pub max_undo_entries: usize,
    /// Diff previews for edits and for requests that do not choose explicitly.
    pub diff_preview: bool,
    pub ignore_file: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&WorkspaceConfig::default())
    }
}

impl From<&WorkspaceConfig> for EngineOptions {
    fn from(cfg: &WorkspaceConfig) -> Self {
        Self {
            allow_outside_workspace: cfg.allow_outside_workspace,
            max_undo_entries: cfg.max_undo_entries,
            diff_preview: cfg.diff_preview,
            ignore_file: cfg.ignore_file.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateOptions {
    /// Replace an existing file instead of failing with `AlreadyExists`.
    pub overwrite: bool,
    /// Compute a diff against the replaced content.
    pub show_diff_preview: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            show_diff_preview: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub include_directories: bool,
    pub include_ignored: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            include_directories: true,
            include_ignored: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListEntry {
    pub name: String,
    /// Path relative to the workspace root.
    pub path: String,
    pub is_dir: bool,
}

/// Successful mutation summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub operation: OperationKind,
    pub path: PathBuf,
    pub overwritten: bool,
    pub diff: Vec<DiffLine>,
}

pub struct MutationEngine {
    sandbox: PathSandbox,
    options: EngineOptions,
    ignore: IgnoreRules,
    ignore_path: PathBuf,
    history: History,
    log: OperationLog,
}

impl MutationEngine {
    /// Create an engine rooted at `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>, options: EngineOptions) -> Result<Self> {
        let sandbox = open_sandbox(root.as_ref(), options.allow_outside_workspace)?;
        let (ignore_path, ignore) = load_ignore(&sandbox, &options.ignore_file)?;
        info!(root = %sandbox.root().display(), "workspace opened");
        Ok(Self {
            history: History::new(options.max_undo_entries),
            log: OperationLog::default(),
            sandbox,
            options,
            ignore,
            ignore_path,
        })
    }

    pub fn root(&self) -> &Path {
        self.sandbox.root()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Point the engine at a new workspace root and reload its ignore file.
    ///
    /// History is kept; entries whose paths fall outside the new root are
    /// rejected by the sandbox when undone or redone.
    pub fn set_workspace_root(&mut self, root: impl AsRef<Path>) -> Result<()> {
        let sandbox = open_sandbox(root.as_ref(), self.options.allow_outside_workspace)?;
        let (ignore_path, ignore) = load_ignore(&sandbox, &self.options.ignore_file)?;
        info!(
            from = %self.sandbox.root().display(),
            to = %sandbox.root().display(),
            "workspace root changed"
        );
        self.sandbox = sandbox;
        self.ignore = ignore;
        self.ignore_path = ignore_path;
        Ok(())
    }

    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, EngineError> {
        self.sandbox.resolve(path).inspect_err(|err| {
            warn!(err = %err, "sandbox rejected path");
        })
    }

    /// Resolve `path` and follow symlinks in its final component.
    ///
    /// Every hop goes back through the sandbox, so a link that leads outside
    /// the root is rejected like any other escaping path. Writes land on the
    /// link target and the link itself stays in place.
    fn resolve_file(&self, path: impl AsRef<Path>) -> Result<PathBuf, EngineError> {
        let mut resolved = self.resolve(path)?;
        for _ in 0..MAX_SYMLINK_HOPS {
            let is_link = fs::symlink_metadata(&resolved)
                .map(|meta| meta.file_type().is_symlink())
                .unwrap_or(false);
            if !is_link {
                return Ok(resolved);
            }
            let target = fs::read_link(&resolved)
                .map_err(|err| EngineError::filesystem("read link", &resolved, err))?;
            let base = resolved.parent().unwrap_or(self.sandbox.root()).to_path_buf();
            debug!(link = %resolved.display(), target = %target.display(), "following symlink");
            resolved = self.resolve(base.join(target))?;
        }
        Err(EngineError::filesystem(
            "follow link",
            &resolved,
            io::Error::other("too many levels of symbolic links"),
        ))
    }

    /// Path relative to the root for display.
    pub fn display_path(&self, path: &Path) -> String {
        let relative = self.sandbox.relative(path);
        if relative.as_os_str().is_empty() {
            return ".".to_string();
        }
        relative.display().to_string()
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display(), overwrite = options.overwrite))]
    pub fn create(
        &mut self,
        path: impl AsRef<Path>,
        content: &str,
        options: CreateOptions,
    ) -> Result<MutationOutcome, EngineError> {
        let resolved = self.resolve_file(path)?;
        let previous = if resolved.exists() {
            if !options.overwrite {
                return Err(EngineError::AlreadyExists { path: resolved });
            }
            Some(read_required(&resolved)?)
        } else {
            None
        };

        let diff = match &previous {
            Some(old) if options.show_diff_preview => preview(old, content),
            _ => Vec::new(),
        };
        write_atomic(&resolved, content)?;

        let overwritten = previous.is_some();
        self.record(
            OperationKind::Create,
            resolved.clone(),
            previous,
            Some(content.to_string()),
        );
        self.refresh_ignore(&resolved);
        info!(overwritten, "created file");
        Ok(MutationOutcome {
            operation: OperationKind::Create,
            path: resolved,
            overwritten,
            diff,
        })
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn read(&self, path: impl AsRef<Path>) -> Result<String, EngineError> {
        let resolved = self.resolve_file(path)?;
        read_required(&resolved)
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display(), mode = edit.mode.as_str()))]
    pub fn edit(&mut self, path: impl AsRef<Path>, edit: &Edit) -> Result<MutationOutcome, EngineError> {
        let resolved = self.resolve_file(path)?;
        let current = read_required(&resolved)?;
        let Some(updated) = apply_edit(&current, edit) else {
            let pattern = match &edit.mode {
                EditMode::FindReplace { search } => search.clone(),
                _ => String::new(),
            };
            return Err(EngineError::PatternNotFound {
                path: resolved,
                pattern,
            });
        };

        let diff = if self.options.diff_preview {
            preview(&current, &updated)
        } else {
            Vec::new()
        };
        write_atomic(&resolved, &updated)?;

        self.record(
            OperationKind::Edit,
            resolved.clone(),
            Some(current),
            Some(updated),
        );
        self.refresh_ignore(&resolved);
        info!("edited file");
        Ok(MutationOutcome {
            operation: OperationKind::Edit,
            path: resolved,
            overwritten: false,
            diff,
        })
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn delete(&mut self, path: impl AsRef<Path>) -> Result<MutationOutcome, EngineError> {
        let resolved = self.resolve(path)?;
        let current = read_required(&resolved)?;
        fs::remove_file(&resolved).map_err(|err| EngineError::filesystem("remove", &resolved, err))?;

        self.record(OperationKind::Delete, resolved.clone(), Some(current), None);
        self.refresh_ignore(&resolved);
        info!("deleted file");
        Ok(MutationOutcome {
            operation: OperationKind::Delete,
            path: resolved,
            overwritten: false,
            diff: Vec::new(),
        })
    }

    /// List a directory (non-recursive), sorted by name.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn list(
        &self,
        dir: impl AsRef<Path>,
        options: ListOptions,
    ) -> Result<Vec<ListEntry>, EngineError> {
        let resolved = self.resolve(dir)?;
        if !resolved.exists() {
            return Err(EngineError::NotFound { path: resolved });
        }
        if !resolved.is_dir() {
            return Err(EngineError::filesystem(
                "list",
                &resolved,
                io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }

        let read_dir =
            fs::read_dir(&resolved).map_err(|err| EngineError::filesystem("list", &resolved, err))?;
        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for entry in read_dir {
            let entry = entry.map_err(|err| EngineError::filesystem("list", &resolved, err))?;
            let is_dir = entry
                .file_type()
                .map_err(|err| EngineError::filesystem("stat", entry.path(), err))?
                .is_dir();
            if is_dir && !options.include_directories {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = self.display_path(&entry.path());
            if !options.include_ignored && self.ignore.is_ignored(&name, &path) {
                skipped += 1;
                continue;
            }
            entries.push(ListEntry { name, path, is_dir });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = entries.len(), skipped, "listed directory");
        Ok(entries)
    }

    /// Revert the most recent mutation and move it to the redo stack.
    #[instrument(skip_all)]
    pub fn undo(&mut self) -> Result<HistoryEntry, EngineError> {
        let entry = self.history.pop_undo().ok_or(EngineError::NothingToUndo)?;
        let restored = match self.restore(&entry.path, entry.old_content.as_deref()) {
            Ok(restored) => restored,
            Err(err) => {
                self.history.push_undo(entry);
                return Err(err);
            }
        };
        self.refresh_ignore(&restored);
        self.log
            .append(OperationKind::Undo, entry.path.clone(), Utc::now());
        info!(path = %entry.path.display(), operation = %entry.operation, "undid mutation");
        self.history.push_redo(entry.clone());
        Ok(entry)
    }

    /// Re-apply the most recently undone mutation.
    #[instrument(skip_all)]
    pub fn redo(&mut self) -> Result<HistoryEntry, EngineError> {
        let entry = self.history.pop_redo().ok_or(EngineError::NothingToRedo)?;
        let restored = match self.restore(&entry.path, entry.new_content.as_deref()) {
            Ok(restored) => restored,
            Err(err) => {
                self.history.push_redo(entry);
                return Err(err);
            }
        };
        self.refresh_ignore(&restored);
        self.log
            .append(OperationKind::Redo, entry.path.clone(), Utc::now());
        info!(path = %entry.path.display(), operation = %entry.operation, "redid mutation");
        self.history.push_undo(entry.clone());
        Ok(entry)
    }

    /// Apply a request and report the outcome as a value.
    pub fn apply(&mut self, request: &MutationRequest) -> MutationResult {
        let operation = request.operation();
        let requested = request.path();
        let outcome = match request {
            MutationRequest::Create {
                path,
                content,
                overwrite,
            } => self.create(
                path,
                content,
                CreateOptions {
                    overwrite: *overwrite,
                    show_diff_preview: self.options.diff_preview,
                },
            ),
            MutationRequest::Edit { path, edit } => self.edit(path, edit),
            MutationRequest::Delete { path } => self.delete(path),
            MutationRequest::Read { path } => {
                return match self.read(path) {
                    Ok(content) => MutationResult {
                        success: true,
                        operation,
                        path: self.result_path(requested),
                        error: None,
                        overwritten: false,
                        content: Some(content),
                        diff: Vec::new(),
                    },
                    Err(err) => MutationResult::failed(operation, self.result_path(requested), &err),
                };
            }
        };
        match outcome {
            Ok(outcome) => MutationResult {
                success: true,
                operation,
                path: outcome.path.display().to_string(),
                error: None,
                overwritten: outcome.overwritten,
                content: None,
                diff: outcome.diff,
            },
            Err(err) => MutationResult::failed(operation, self.result_path(requested), &err),
        }
    }

    pub fn log(&self) -> &[LogEntry] {
        self.log.entries()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_len()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_len()
    }

    fn record(
        &mut self,
        operation: OperationKind,
        path: PathBuf,
        old_content: Option<String>,
        new_content: Option<String>,
    ) {
        let timestamp = Utc::now();
        self.log.append(operation, path.clone(), timestamp);
        let evicted = self.history.record(HistoryEntry {
            operation,
            path,
            old_content,
            new_content,
            timestamp,
        });
        if let Some(evicted) = evicted {
            warn!(
                path = %evicted.path.display(),
                max_undo = self.history.max_undo(),
                "undo history full, dropped oldest entry"
            );
        }
    }

    /// Write `content` to `path`, or remove it when `None`. Returns the path
    /// that was touched.
    fn restore(&self, path: &Path, content: Option<&str>) -> Result<PathBuf, EngineError> {
        let resolved = self.resolve_file(path)?;
        match content {
            Some(content) => write_atomic(&resolved, content)?,
            None => remove_if_exists(&resolved)?,
        }
        Ok(resolved)
    }

    /// Reload the ignore rules when `touched` is the ignore file. A reload
    /// failure keeps the previous rules.
    fn refresh_ignore(&mut self, touched: &Path) {
        let watched = self
            .resolve_file(&self.ignore_path)
            .unwrap_or_else(|_| self.ignore_path.clone());
        if touched != self.ignore_path && touched != watched {
            return;
        }
        match IgnoreRules::load(&watched) {
            Ok(rules) => {
                debug!(path = %watched.display(), "reloaded ignore rules");
                self.ignore = rules;
            }
            Err(err) => warn!(err = %format!("{err:#}"), "ignore file unreadable, keeping previous rules"),
        }
    }

    fn result_path(&self, requested: &str) -> String {
        self.resolve(requested)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| requested.to_string())
    }
}

fn preview(old: &str, new: &str) -> Vec<DiffLine> {
    let diff = diff_lines(old, new);
    debug!(changed_lines = diff.len(), "computed diff preview");
    diff
}

fn open_sandbox(root: &Path, allow_outside: bool) -> Result<PathSandbox> {
    let root = fs::canonicalize(root)
        .with_context(|| format!("resolve workspace root {}", root.display()))?;
    if !root.is_dir() {
        return Err(anyhow!("workspace root {} is not a directory", root.display()));
    }
    Ok(PathSandbox::new(root, allow_outside))
}

fn load_ignore(sandbox: &PathSandbox, ignore_file: &str) -> Result<(PathBuf, IgnoreRules)> {
    let path = sandbox
        .resolve(ignore_file)
        .with_context(|| format!("resolve ignore file {ignore_file}"))?;
    let rules = IgnoreRules::load(&path)?;
    Ok((path, rules))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn engine() -> (TempDir, MutationEngine) {
        let temp = tempfile::tempdir().expect("tempdir");
        let engine = MutationEngine::new(temp.path(), EngineOptions::default()).expect("engine");
        (temp, engine)
    }

    #[test]
    fn create_then_read_round_trips() {
        let (_temp, mut engine) = engine();
        let outcome = engine
            .create("notes/todo.md", "one\ntwo\n", CreateOptions::default())
            .expect("create");
        assert!(!outcome.overwritten);
        assert!(outcome.path.starts_with(engine.root()));
        assert_eq!(engine.read("notes/todo.md").expect("read"), "one\ntwo\n");
        assert_eq!(engine.undo_depth(), 1);
    }

    #[test]
    fn create_refuses_existing_without_overwrite() {
        let (_temp, mut engine) = engine();
        engine
            .create("a.txt", "first", CreateOptions::default())
            .expect("create");
        let err = engine
            .create("a.txt", "second", CreateOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(engine.read("a.txt").expect("read"), "first");
        assert_eq!(engine.undo_depth(), 1);
    }

    #[test]
    fn overwrite_reports_diff_and_captures_old_content() {
        let (_temp, mut engine) = engine();
        engine
            .create("a.txt", "x\ny", CreateOptions::default())
            .expect("create");
        let outcome = engine
            .create(
                "a.txt",
                "z\ny",
                CreateOptions {
                    overwrite: true,
                    show_diff_preview: true,
                },
            )
            .expect("overwrite");
        assert!(outcome.overwritten);
        assert_eq!(outcome.diff.len(), 2);

        let entry = engine.undo().expect("undo");
        assert_eq!(entry.old_content.as_deref(), Some("x\ny"));
        assert_eq!(engine.read("a.txt").expect("read"), "x\ny");
    }

    #[test]
    fn reads_have_no_history_or_log_side_effects() {
        let (temp, engine) = engine();
        fs::write(temp.path().join("plain.txt"), "data").expect("write");
        assert_eq!(engine.read("plain.txt").expect("read"), "data");
        assert_eq!(engine.undo_depth(), 0);
        assert!(engine.log().is_empty());
    }

    #[test]
    fn edit_modes_rewrite_content() {
        let (_temp, mut engine) = engine();
        engine
            .create("f.txt", "a-a-a", CreateOptions::default())
            .expect("create");
        engine
            .edit("f.txt", &Edit::find_replace("a", "b"))
            .expect("find-replace");
        assert_eq!(engine.read("f.txt").expect("read"), "b-b-b");

        engine.edit("f.txt", &Edit::append("tail")).expect("append");
        engine
            .edit("f.txt", &Edit::insert(Some(0), "head"))
            .expect("insert");
        assert_eq!(engine.read("f.txt").expect("read"), "head\nb-b-b\ntail");

        engine.edit("f.txt", &Edit::replace("fresh")).expect("replace");
        assert_eq!(engine.read("f.txt").expect("read"), "fresh");
        assert_eq!(engine.undo_depth(), 5);
    }

    #[test]
    fn edit_failures_leave_file_and_history_untouched() {
        let (_temp, mut engine) = engine();
        let missing = engine.edit("nope.txt", &Edit::append("x")).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        engine
            .create("f.txt", "abc", CreateOptions::default())
            .expect("create");
        let err = engine
            .edit("f.txt", &Edit::find_replace("zzz", "y"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PatternNotFound);
        assert_eq!(engine.read("f.txt").expect("read"), "abc");
        assert_eq!(engine.undo_depth(), 1);
    }

    #[test]
    fn delete_requires_existing_file() {
        let (_temp, mut engine) = engine();
        let err = engine.delete("ghost.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(engine.log().is_empty());
    }

    #[test]
    fn sandbox_rejection_happens_before_filesystem_access() {
        let (temp, mut engine) = engine();
        let outside = temp.path().join("..").join("escaped.txt");
        let err = engine
            .create("../escaped.txt", "x", CreateOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfWorkspace);
        assert!(!outside.exists());
    }

    #[test]
    fn list_filters_ignored_entries_and_sorts() {
        let (temp, mut engine) = engine();
        fs::create_dir_all(temp.path().join(".git")).expect("git dir");
        fs::create_dir_all(temp.path().join("src")).expect("src dir");
        fs::write(temp.path().join("debug.log"), "").expect("log");
        engine
            .create("b.txt", "", CreateOptions::default())
            .expect("b");
        engine
            .create("a.txt", "", CreateOptions::default())
            .expect("a");
        engine
            .create(".quillignore", "*.log\n", CreateOptions::default())
            .expect("ignore file");

        let names: Vec<String> = engine
            .list("", ListOptions::default())
            .expect("list")
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec![".quillignore", "a.txt", "b.txt", "src"]);

        let files_only: Vec<String> = engine
            .list(
                ".",
                ListOptions {
                    include_directories: false,
                    include_ignored: true,
                },
            )
            .expect("list")
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(files_only, vec![".quillignore", "a.txt", "b.txt", "debug.log"]);
    }

    fn listed_names(engine: &MutationEngine) -> Vec<String> {
        engine
            .list("", ListOptions::default())
            .expect("list")
            .into_iter()
            .map(|e| e.name)
            .collect()
    }

    #[test]
    fn ignore_file_mutations_take_effect_immediately() {
        let (temp, mut engine) = engine();
        fs::write(temp.path().join("debug.log"), "").expect("log");
        assert_eq!(listed_names(&engine), vec!["debug.log"]);

        engine
            .create(".quillignore", "*.log\n", CreateOptions::default())
            .expect("ignore file");
        assert_eq!(listed_names(&engine), vec![".quillignore"]);

        engine
            .edit(".quillignore", &Edit::replace("*.txt\n"))
            .expect("edit ignore file");
        assert_eq!(listed_names(&engine), vec![".quillignore", "debug.log"]);

        engine.undo().expect("undo edit");
        assert_eq!(listed_names(&engine), vec![".quillignore"]);

        engine.undo().expect("undo create");
        assert_eq!(listed_names(&engine), vec!["debug.log"]);

        engine.redo().expect("redo create");
        assert_eq!(listed_names(&engine), vec![".quillignore"]);

        engine.delete(".quillignore").expect("delete ignore file");
        assert_eq!(listed_names(&engine), vec!["debug.log"]);
    }

    #[cfg(unix)]
    #[test]
    fn writes_through_a_symlink_keep_the_link() {
        use std::os::unix::fs::symlink;

        let (temp, mut engine) = engine();
        let real = temp.path().join("real.txt");
        let link = temp.path().join("link.txt");
        fs::write(&real, "old").expect("seed");
        symlink("real.txt", &link).expect("symlink");
        let is_link = |path: &Path| {
            fs::symlink_metadata(path)
                .expect("lstat")
                .file_type()
                .is_symlink()
        };

        engine
            .edit("link.txt", &Edit::replace("new"))
            .expect("edit through link");
        assert!(is_link(&link));
        assert_eq!(fs::read_to_string(&real).expect("read"), "new");
        assert_eq!(engine.read("link.txt").expect("read link"), "new");

        engine
            .create(
                "link.txt",
                "newer",
                CreateOptions {
                    overwrite: true,
                    show_diff_preview: false,
                },
            )
            .expect("overwrite through link");
        assert!(is_link(&link));
        assert_eq!(fs::read_to_string(&real).expect("read"), "newer");

        engine.undo().expect("undo overwrite");
        engine.undo().expect("undo edit");
        assert!(is_link(&link));
        assert_eq!(fs::read_to_string(&real).expect("read"), "old");
    }

    #[cfg(unix)]
    #[test]
    fn symlink_leading_outside_is_rejected() {
        use std::os::unix::fs::symlink;

        let (temp, mut engine) = engine();
        let outside = tempfile::tempdir().expect("outside");
        let secret = outside.path().join("secret.txt");
        fs::write(&secret, "secret").expect("seed");
        symlink(&secret, temp.path().join("escape.txt")).expect("symlink");

        let err = engine.read("escape.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfWorkspace);
        let err = engine
            .edit("escape.txt", &Edit::replace("owned"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfWorkspace);
        assert_eq!(fs::read_to_string(&secret).expect("read"), "secret");
        assert_eq!(engine.undo_depth(), 0);
    }

    #[test]
    fn list_missing_directory_is_not_found() {
        let (_temp, engine) = engine();
        let err = engine.list("missing", ListOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn apply_reports_failures_as_values() {
        let (_temp, mut engine) = engine();
        let result = engine.apply(&MutationRequest::Delete {
            path: "missing.txt".to_string(),
        });
        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));

        let result = engine.apply(&MutationRequest::Create {
            path: "x.txt".to_string(),
            content: "hi".to_string(),
            overwrite: false,
        });
        assert!(result.success);
        let read = engine.apply(&MutationRequest::Read {
            path: "x.txt".to_string(),
        });
        assert_eq!(read.content.as_deref(), Some("hi"));
    }

    #[test]
    fn undo_and_redo_are_logged() {
        let (_temp, mut engine) = engine();
        engine
            .create("a.txt", "1", CreateOptions::default())
            .expect("create");
        engine.undo().expect("undo");
        engine.redo().expect("redo");
        let ops: Vec<OperationKind> = engine.log().iter().map(|e| e.operation).collect();
        assert_eq!(
            ops,
            vec![OperationKind::Create, OperationKind::Undo, OperationKind::Redo]
        );
        engine.clear_log();
        assert!(engine.log().is_empty());
        assert_eq!(engine.undo_depth(), 1);
    }

    #[test]
    fn undo_outside_new_root_is_rejected_and_kept() {
        let (_temp, mut engine) = engine();
        let other = tempfile::tempdir().expect("other");
        engine
            .create("a.txt", "1", CreateOptions::default())
            .expect("create");
        engine.set_workspace_root(other.path()).expect("switch root");

        let err = engine.undo().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfWorkspace);
        assert_eq!(engine.undo_depth(), 1);
    }
}
