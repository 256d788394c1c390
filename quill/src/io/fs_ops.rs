//! Single-file filesystem primitives used by the engine.
//!
//! Writes go to a sibling temp file that is renamed over the target, so a
//! reader never observes a half-written file. The replaced file's permissions
//! carry over to the new one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::EngineError;

/// Read a UTF-8 file. Returns `Ok(None)` when nothing exists at `path`.
pub fn read_existing(path: &Path) -> Result<Option<String>, EngineError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(EngineError::filesystem("read", path, err)),
    }
}

/// Read a UTF-8 file, failing with `NotFound` when it is absent.
pub fn read_required(path: &Path) -> Result<String, EngineError> {
    read_existing(path)?.ok_or_else(|| EngineError::NotFound {
        path: path.to_path_buf(),
    })
}

/// Write `contents` atomically, creating parent directories as needed.
///
/// `path` is replaced, not written through: callers resolve symlinks first.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| EngineError::filesystem("create directory", parent, err))?;
    }
    let tmp_path = temp_sibling(path);
    debug!(path = %path.display(), bytes = contents.len(), "writing file");
    let result = fs::write(&tmp_path, contents)
        .map_err(|err| EngineError::filesystem("write", path, err))
        .and_then(|()| copy_permissions(path, &tmp_path))
        .and_then(|()| {
            fs::rename(&tmp_path, path).map_err(|err| EngineError::filesystem("replace", path, err))
        });
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Give `tmp_path` the permissions of the file it is about to replace.
fn copy_permissions(path: &Path, tmp_path: &Path) -> Result<(), EngineError> {
    match fs::metadata(path) {
        Ok(meta) => fs::set_permissions(tmp_path, meta.permissions())
            .map_err(|err| EngineError::filesystem("set permissions", path, err)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(EngineError::filesystem("stat", path, err)),
    }
}

/// Remove a file; a path that is already gone is not an error.
pub fn remove_if_exists(path: &Path) -> Result<(), EngineError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(EngineError::filesystem("remove", path, err)),
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.quill.tmp"))
}
