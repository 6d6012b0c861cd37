//! Gitignore-style path patterns.
//!
//! Used for `[functions].exclude` (files never pulled into a closure) and for
//! matching per-function overrides against source paths.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Files that must never appear in any function's file set.
#[derive(Debug)]
pub struct ExcludeList {
    root: PathBuf,
    matcher: Gitignore,
    pattern_count: usize,
}

impl ExcludeList {
    /// Create an empty list (excludes nothing).
    pub fn empty() -> Self {
        Self {
            root: PathBuf::new(),
            matcher: Gitignore::empty(),
            pattern_count: 0,
        }
    }

    /// Compile `patterns`, relative to the project root.
    pub fn new(root: &Path, patterns: &[String]) -> Result<Self, PatternError> {
        Ok(Self {
            root: root.to_path_buf(),
            matcher: build_matcher(root, patterns)?,
            pattern_count: patterns.len(),
        })
    }

    /// Whether a project-relative path (or any of its parent directories) is excluded.
    pub fn is_excluded(&self, relative: &str) -> bool {
        if self.pattern_count == 0 {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(self.root.join(relative), false)
            .is_ignore()
    }

    pub fn len(&self) -> usize {
        self.pattern_count
    }

    pub fn is_empty(&self) -> bool {
        self.pattern_count == 0
    }
}

impl Default for ExcludeList {
    fn default() -> Self {
        Self::empty()
    }
}

/// Compile gitignore-style `patterns` rooted at `root`.
pub(crate) fn build_matcher(root: &Path, patterns: &[String]) -> Result<Gitignore, PatternError> {
    let mut builder = GitignoreBuilder::new(root);
    for pattern in patterns {
        builder
            .add_line(None, pattern)
            .map_err(|e| PatternError::Invalid {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
    }
    builder.build().map_err(|e| PatternError::Build {
        message: e.to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("invalid pattern {pattern:?}: {message}")]
    Invalid { pattern: String, message: String },
    #[error("failed to compile patterns: {message}")]
    Build { message: String },
}
