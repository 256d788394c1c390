//! Ignore rules for directory listings.
//!
//! A fixed default set (version control, build output, dependency caches) is
//! extended by patterns from a workspace ignore file: one glob or literal per
//! line, blank lines and `#` comments skipped, a trailing `/` ignored.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use glob::Pattern;
use tracing::{debug, warn};

pub const DEFAULT_IGNORES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    ".venv",
    "venv",
    ".idea",
    ".vscode",
    ".DS_Store",
    ".quill",
];

#[derive(Debug, Clone)]
enum Rule {
    Literal(String),
    Glob(Pattern),
}

impl Rule {
    fn parse(raw: &str) -> Self {
        let has_meta = raw.contains(['*', '?', '[']);
        if has_meta {
            match Pattern::new(raw) {
                Ok(pattern) => return Rule::Glob(pattern),
                Err(err) => warn!(pattern = raw, err = %err, "invalid ignore glob, matching literally"),
            }
        }
        Rule::Literal(raw.to_string())
    }

    fn matches(&self, name: &str, relative: &str) -> bool {
        match self {
            Rule::Literal(lit) => lit == name || lit == relative,
            Rule::Glob(pattern) => pattern.matches(name) || pattern.matches(relative),
        }
    }
}

/// Compiled ignore rules.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    rules: Vec<Rule>,
    extra: usize,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            rules: DEFAULT_IGNORES.iter().map(|p| Rule::parse(p)).collect(),
            extra: 0,
        }
    }
}

impl IgnoreRules {
    /// Default rules extended with the patterns in `contents`.
    pub fn with_patterns(contents: &str) -> Self {
        let mut rules = Self::default();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let pattern = line.trim_end_matches('/');
            if pattern.is_empty() {
                continue;
            }
            rules.rules.push(Rule::parse(pattern));
            rules.extra += 1;
        }
        rules
    }

    /// Default rules plus the ignore file at `path`; a missing file adds nothing.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let rules = Self::with_patterns(&contents);
                debug!(path = %path.display(), extra = rules.extra, "loaded ignore file");
                Ok(rules)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err).with_context(|| format!("read ignore file {}", path.display())),
        }
    }

    /// `name` is the entry's file name; `relative` its path from the workspace root.
    pub fn is_ignored(&self, name: &str, relative: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(name, relative))
    }
}
