use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use slipway_core::paths;

use crate::cache::PathCache;
use crate::exclude::ExcludeList;
use crate::resolve::{ModuleResolver, ResolveError, ResolveOptions};

/// The transitive closure of one entrypoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceResult {
    /// CommonJS-style files, project-relative
    pub source_files: BTreeSet<String>,
    /// ESM-style files, project-relative
    pub module_files: BTreeSet<String>,
    pub warnings: Vec<String>,
}

impl TraceResult {
    /// Every traced path, each once.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.source_files
            .union(&self.module_files)
            .map(String::as_str)
    }
}

/// Asks a [`ModuleResolver`] for an entrypoint's closure, reading through the run's cache.
pub struct Tracer<'a> {
    resolver: &'a dyn ModuleResolver,
    cache: &'a PathCache,
    exclude: &'a ExcludeList,
}

impl<'a> Tracer<'a> {
    pub fn new(
        resolver: &'a dyn ModuleResolver,
        cache: &'a PathCache,
        exclude: &'a ExcludeList,
    ) -> Self {
        Self {
            resolver,
            cache,
            exclude,
        }
    }

    /// Trace an absolute entrypoint below the cache root.
    ///
    /// Resolver warnings are carried in the result. Resolver errors are not
    /// recoverable.
    pub fn trace(&self, entrypoint: &Path) -> Result<TraceResult, TraceError> {
        let relative = entrypoint
            .strip_prefix(self.cache.root())
            .ok()
            .and_then(paths::to_slash)
            .ok_or_else(|| TraceError::OutsideProject {
                path: entrypoint.to_path_buf(),
            })?;

        let options = ResolveOptions {
            files: self.cache,
            exclude: self.exclude,
            typescript: true,
            mixed_modules: true,
        };
        let resolution = self
            .resolver
            .resolve(&relative, &options)
            .map_err(|e| TraceError::Resolve {
                entrypoint: relative.clone(),
                source: e,
            })?;

        let keep = |path: &String| !self.exclude.is_excluded(path);
        let result = TraceResult {
            source_files: resolution.source_files.into_iter().filter(keep).collect(),
            module_files: resolution.module_files.into_iter().filter(keep).collect(),
            warnings: resolution.warnings,
        };

        tracing::debug!(
            entrypoint = %relative,
            source_files = result.source_files.len(),
            module_files = result.module_files.len(),
            "traced entrypoint"
        );
        Ok(result)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("dependency resolution failed for {entrypoint}")]
    Resolve {
        entrypoint: String,
        source: ResolveError,
    },

    #[error("entrypoint {path} is outside the project root")]
    OutsideProject { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Resolution;
    use tempfile::TempDir;

    /// Reports a fixed closure regardless of the entrypoint.
    struct Fixed(Resolution);

    impl ModuleResolver for Fixed {
        fn resolve(
            &self,
            entrypoint: &str,
            options: &ResolveOptions<'_>,
        ) -> Result<Resolution, ResolveError> {
            options
                .files
                .read(entrypoint)?
                .ok_or_else(|| ResolveError::EntrypointMissing {
                    path: entrypoint.to_owned(),
                })?;
            assert!(options.typescript && options.mixed_modules);
            Ok(self.0.clone())
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn excluded_files_are_dropped_from_the_result() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("fn.js"), "").unwrap();
        let cache = PathCache::new(tmp.path());
        let exclude = ExcludeList::new(tmp.path(), &["*.map".to_owned()]).unwrap();
        let resolver = Fixed(Resolution {
            source_files: set(&["fn.js", "fn.js.map"]),
            module_files: set(&["lib.mjs"]),
            warnings: vec!["dynamic require in fn.js".to_owned()],
        });

        let result = Tracer::new(&resolver, &cache, &exclude)
            .trace(&tmp.path().join("fn.js"))
            .unwrap();

        assert_eq!(result.source_files, set(&["fn.js"]));
        assert_eq!(result.module_files, set(&["lib.mjs"]));
        assert_eq!(result.warnings, vec!["dynamic require in fn.js"]);
        assert_eq!(result.files().collect::<Vec<_>>(), vec!["fn.js", "lib.mjs"]);
    }

    #[test]
    fn resolver_error_is_reported_with_entrypoint() {
        let tmp = TempDir::new().unwrap();
        let cache = PathCache::new(tmp.path());
        let exclude = ExcludeList::empty();
        let resolver = Fixed(Resolution::default());

        let err = Tracer::new(&resolver, &cache, &exclude)
            .trace(&tmp.path().join("missing.js"))
            .unwrap_err();

        assert!(matches!(
            err,
            TraceError::Resolve { ref entrypoint, .. } if entrypoint == "missing.js"
        ));
    }

    #[test]
    fn entrypoint_outside_root_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let cache = PathCache::new(tmp.path().join("project"));
        let exclude = ExcludeList::empty();
        let resolver = Fixed(Resolution::default());

        let err = Tracer::new(&resolver, &cache, &exclude)
            .trace(&tmp.path().join("elsewhere/fn.js"))
            .unwrap_err();

        assert!(matches!(err, TraceError::OutsideProject { .. }));
    }
}
