//! Lexical path sandboxing against the workspace root.
//!
//! Resolution is pure path algebra: `.` and `..` are folded without touching
//! the filesystem. Symlinks are not looked at here; the engine follows a link
//! and feeds its target back through [`PathSandbox::resolve`].

use std::path::{Component, Path, PathBuf};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSandbox {
    root: PathBuf,
    allow_outside: bool,
}

impl PathSandbox {
    /// `root` must be absolute; it is normalized lexically.
    pub fn new(root: impl AsRef<Path>, allow_outside: bool) -> Self {
        Self {
            root: normalize(root.as_ref()),
            allow_outside,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `input` to an absolute, normalized path inside the root.
    ///
    /// Relative inputs are joined onto the root; absolute inputs are taken
    /// as-is. Fails with [`EngineError::OutOfWorkspace`] when the result is not
    /// the root or nested under it, unless escapes are allowed.
    pub fn resolve(&self, input: impl AsRef<Path>) -> Result<PathBuf, EngineError> {
        let input = input.as_ref();
        let joined = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.root.join(input)
        };
        let resolved = normalize(&joined);
        if self.allow_outside || self.contains(&resolved) {
            return Ok(resolved);
        }
        Err(EngineError::OutOfWorkspace {
            path: resolved,
            root: self.root.clone(),
        })
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Path relative to the root, or the path itself when it lies outside.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// Fold `.` and `..` components. `..` at the filesystem root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sandbox(allow_outside: bool) -> PathSandbox {
        PathSandbox::new("/work/space", allow_outside)
    }

    #[test]
    fn relative_paths_resolve_under_root() {
        let resolved = sandbox(false).resolve("src/./lib.rs").expect("resolve");
        assert_eq!(resolved, PathBuf::from("/work/space/src/lib.rs"));
    }

    #[test]
    fn parent_segments_inside_root_are_folded() {
        let resolved = sandbox(false)
            .resolve("src/../docs/readme.md")
            .expect("resolve");
        assert_eq!(resolved, PathBuf::from("/work/space/docs/readme.md"));
    }

    #[test]
    fn empty_and_dot_resolve_to_root() {
        let sb = sandbox(false);
        assert_eq!(sb.resolve("").expect("empty"), PathBuf::from("/work/space"));
        assert_eq!(sb.resolve(".").expect("dot"), PathBuf::from("/work/space"));
    }

    #[test]
    fn escapes_fail_unless_allowed() {
        for escape in ["../secret", "src/../../etc/passwd", "/etc/passwd", "/work/spaceship"] {
            let err = sandbox(false).resolve(escape).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::OutOfWorkspace, "{escape}");
            assert!(sandbox(true).resolve(escape).is_ok(), "{escape}");
        }
    }

    #[test]
    fn absolute_paths_inside_root_are_accepted() {
        let resolved = sandbox(false)
            .resolve("/work/space/a/../b.txt")
            .expect("resolve");
        assert_eq!(resolved, PathBuf::from("/work/space/b.txt"));
    }

    #[test]
    fn parent_of_filesystem_root_stays_at_root() {
        assert_eq!(normalize(Path::new("/../../x")), PathBuf::from("/x"));
    }

    #[test]
    fn relative_strips_the_root() {
        let sb = sandbox(false);
        let path = PathBuf::from("/work/space/a/b.txt");
        assert_eq!(sb.relative(&path), Path::new("a/b.txt"));
    }
}
