use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use slipway_core::paths;
use slipway_core::{FileKind, ProjectFile};

/// Read access to project files by project-relative path.
///
/// This is the only way a [`ModuleResolver`](crate::resolve::ModuleResolver)
/// touches the file system, so every file it reads lands in the run's cache.
pub trait FileAccess: Send + Sync {
    /// `Ok(None)` when nothing readable exists at `relative` (missing, or a directory).
    fn read(&self, relative: &str) -> Result<Option<Arc<ProjectFile>>, CacheError>;
}

/// Memoized file reads for one pipeline run.
///
/// The first read of a path hits the file system and stores the result,
/// including "not found". Later reads, from any entrypoint or thread, get the
/// stored value back. Entries are insert-if-absent: once a path is resolved
/// it never changes for the rest of the run.
pub struct PathCache {
    root: PathBuf,
    entries: RwLock<HashMap<String, Option<Arc<ProjectFile>>>>,
    lookups: AtomicUsize,
    fs_reads: AtomicUsize,
}

/// Counters describing how much work the cache saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls to [`PathCache::read`]
    pub lookups: usize,
    /// Lookups that had to touch the file system
    pub fs_reads: usize,
    /// Distinct paths stored (hits and misses)
    pub entries: usize,
}

impl PathCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: RwLock::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
            fs_reads: AtomicUsize::new(0),
        }
    }

    /// Project root every cached path is relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a project-relative path, hitting the file system at most once per path.
    ///
    /// # Errors
    ///
    /// - [`CacheError::OutsideRoot`] if `relative` climbs above the project root
    /// - [`CacheError::Read`] for any I/O failure other than a missing file or
    ///   a directory; these mean the build output itself is unreadable
    pub fn read(&self, relative: &str) -> Result<Option<Arc<ProjectFile>>, CacheError> {
        let key = paths::normalize(relative).ok_or_else(|| CacheError::OutsideRoot {
            path: relative.to_owned(),
        })?;
        self.lookups.fetch_add(1, Ordering::Relaxed);

        if let Some(slot) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(slot.clone());
        }

        let loaded = self.load(&key)?;

        // Another reader may have stored this path while we were loading it;
        // whichever insert landed first is what everyone sees.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.entry(key).or_insert(loaded).clone())
    }

    pub fn exists(&self, relative: &str) -> Result<bool, CacheError> {
        Ok(self.read(relative)?.is_some())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            fs_reads: self.fs_reads.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load(&self, key: &str) -> Result<Option<Arc<ProjectFile>>, CacheError> {
        self.fs_reads.fetch_add(1, Ordering::Relaxed);
        let path = self.root.join(key);

        let meta = match std::fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if is_absent(&e) => return Ok(None),
            Err(e) => return Err(CacheError::Read { path, source: e }),
        };
        if meta.is_dir() {
            return Ok(None);
        }

        let kind = if meta.file_type().is_symlink() {
            let target = std::fs::read_link(&path).map_err(|e| CacheError::Read {
                path: path.clone(),
                source: e,
            })?;
            FileKind::Symlink { target }
        } else {
            FileKind::Regular
        };

        let content = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            // Link to a directory
            Err(e) if e.kind() == io::ErrorKind::IsADirectory => return Ok(None),
            // Dangling link: keep the reference, there is nothing to analyze
            Err(e) if is_absent(&e) && matches!(kind, FileKind::Symlink { .. }) => Vec::new(),
            Err(e) if is_absent(&e) => return Ok(None),
            Err(e) => return Err(CacheError::Read { path, source: e }),
        };

        tracing::trace!(path = key, bytes = content.len(), "cached file");

        Ok(Some(Arc::new(ProjectFile {
            path: key.to_owned(),
            kind,
            mode: file_mode(&meta),
            content,
        })))
    }
}

impl FileAccess for PathCache {
    fn read(&self, relative: &str) -> Result<Option<Arc<ProjectFile>>, CacheError> {
        PathCache::read(self, relative)
    }
}

impl std::fmt::Debug for PathCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathCache")
            .field("root", &self.root)
            .field("stats", &self.stats())
            .finish()
    }
}

fn is_absent(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory | io::ErrorKind::IsADirectory
    )
}

#[cfg(unix)]
fn file_mode(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn file_mode(meta: &std::fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o100444
    } else {
        0o100644
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("path {path:?} escapes the project root")]
    OutsideRoot { path: String },
}
