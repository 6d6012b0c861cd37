use std::collections::BTreeSet;

use crate::cache::{CacheError, FileAccess};
use crate::exclude::ExcludeList;

/// Static analysis of module references, queried once per entrypoint.
///
/// Implementations must read files only through [`ResolveOptions::files`] so
/// the run's cache sees (and deduplicates) every access. Production code
/// uses [`ImportScanner`](crate::scanner::ImportScanner); tests substitute
/// fixed resolutions.
pub trait ModuleResolver: Send + Sync {
    /// Return every file transitively reachable from `entrypoint`
    /// (project-relative), split into CommonJS-style and ESM-style files.
    fn resolve(
        &self,
        entrypoint: &str,
        options: &ResolveOptions<'_>,
    ) -> Result<Resolution, ResolveError>;
}

/// Inputs handed to a [`ModuleResolver`] for one entrypoint.
pub struct ResolveOptions<'a> {
    /// File-access backend; every read goes through here
    pub files: &'a dyn FileAccess,
    /// Files that must never be pulled into the closure
    pub exclude: &'a ExcludeList,
    /// Understand typed sources (`.ts`, `.tsx`)
    pub typescript: bool,
    /// Accept CommonJS and ESM files in the same graph
    pub mixed_modules: bool,
}

/// What a [`ModuleResolver`] found for one entrypoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub source_files: BTreeSet<String>,
    pub module_files: BTreeSet<String>,
    /// Advisory only; never fails a trace
    pub warnings: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("file access failed")]
    Cache(#[from] CacheError),

    #[error("entrypoint {path} does not exist")]
    EntrypointMissing { path: String },

    #[error("module analysis failed for {path}: {detail}")]
    Analysis { path: String, detail: String },
}
