//! Locate function entrypoints in the built functions directory.
//!
//! A function is either a file directly in the functions directory, or a
//! file one directory down named after that directory (`auth/auth.js`) or
//! `index` (`auth/index.js`). Other files in such a directory are helpers and
//! only ship if something imports them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use slipway_core::{FunctionEntry, LayoutConfig, paths};
use walkdir::WalkDir;

use crate::cache::{CacheError, PathCache};

/// Built file extensions that can define a function.
pub const FUNCTION_EXTENSIONS: &[&str] = &["js", "mjs", "cjs"];

/// Entries in discovery order, plus anything worth telling the user.
#[derive(Debug, Default)]
pub struct Discovery {
    pub entries: Vec<FunctionEntry>,
    pub warnings: Vec<String>,
}

/// Walk `layout.functions_dir` under `project_dir`.
///
/// A missing functions directory is not an error; the project simply has no
/// functions. Entries come back sorted by path.
pub fn discover(
    project_dir: &Path,
    layout: &LayoutConfig,
    cache: &PathCache,
) -> Result<Discovery, DiscoverError> {
    let functions_root = project_dir.join(&layout.functions_dir);
    let mut discovery = Discovery::default();

    if !functions_root.is_dir() {
        tracing::debug!(dir = %functions_root.display(), "no functions directory");
        return Ok(discovery);
    }

    let mut too_deep = BTreeSet::new();
    let walker = WalkDir::new(&functions_root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for dirent in walker {
        let dirent = dirent.map_err(|e| DiscoverError::Walk {
            path: e
                .path()
                .map_or_else(|| functions_root.clone(), Path::to_path_buf),
            source: e,
        })?;
        if dirent.file_type().is_dir() {
            continue;
        }

        let Some(within) = dirent
            .path()
            .strip_prefix(&functions_root)
            .ok()
            .and_then(paths::to_slash)
        else {
            continue;
        };
        if !paths::extension(&within).is_some_and(|ext| FUNCTION_EXTENSIONS.contains(&ext)) {
            continue;
        }

        match dirent.depth() {
            1 => {}
            2 if is_directory_function(&within) => {}
            2 => {
                tracing::trace!(file = %within, "skipping function helper");
                continue;
            }
            _ => {
                too_deep.insert(paths::parent(&within).to_owned());
                continue;
            }
        }

        let entry = function_entry(project_dir, layout, cache, dirent.path(), &within)?;
        tracing::debug!(
            output_name = %entry.output_name,
            entrypoint = %entry.relative_entrypoint,
            source_path = ?entry.source_path,
            "discovered function"
        );
        discovery.entries.push(entry);
    }

    for dir in too_deep {
        discovery.warnings.push(format!(
            "{}/{dir} is nested more than one level below the functions directory; \
             its files are not deployed as functions",
            layout.functions_dir
        ));
    }
    Ok(discovery)
}

/// `auth/auth.js` and `auth/index.js` define a function; `auth/helper.js` does not.
fn is_directory_function(within: &str) -> bool {
    let stem = paths::strip_extension(paths::file_name(within));
    stem == "index" || stem == paths::file_name(paths::parent(within))
}

fn function_entry(
    project_dir: &Path,
    layout: &LayoutConfig,
    cache: &PathCache,
    path: &Path,
    within: &str,
) -> Result<FunctionEntry, DiscoverError> {
    let relative_entrypoint = path
        .strip_prefix(project_dir)
        .ok()
        .and_then(paths::to_slash)
        .ok_or_else(|| DiscoverError::OutsideProject {
            path: path.to_path_buf(),
        })?;

    let source_path = match layout.source_path_for(&relative_entrypoint) {
        Some(derived) => Some(existing_source(cache, derived)?),
        None => None,
    };

    Ok(FunctionEntry {
        output_name: format!("{}/{}", layout.api_prefix, paths::strip_extension(within)),
        entrypoint: path.to_path_buf(),
        relative_entrypoint,
        source_path,
    })
}

/// Prefer a same-stem source file that exists; fall back to the derived path.
fn existing_source(cache: &PathCache, derived: String) -> Result<String, CacheError> {
    for candidate in LayoutConfig::source_candidates(&derived) {
        if cache.exists(&candidate)? {
            return Ok(candidate);
        }
    }
    Ok(derived)
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoverError {
    #[error("failed to walk {path}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("function {path} is outside the project root")]
    OutsideProject { path: PathBuf },

    #[error("failed to probe function source")]
    Cache(#[from] CacheError),
}
