use std::collections::BTreeMap;
use std::path::PathBuf;

use slipway_core::{DeployableUnit, FunctionEntry, LayoutConfig, paths};

use crate::cache::{CacheError, PathCache};
use crate::limits::LimitTable;
use crate::trace::TraceResult;

/// Turns a traced entrypoint into a [`DeployableUnit`].
///
/// Packaging is a pure function of the entry, its trace and the run's cache;
/// the caller decides whether a failure skips the function or ends the run
/// (see [`PackageError::is_fatal`]).
pub struct Packager<'a> {
    cache: &'a PathCache,
    layout: &'a LayoutConfig,
    handler_export: &'a str,
    limits: &'a LimitTable,
}

impl<'a> Packager<'a> {
    pub fn new(
        cache: &'a PathCache,
        layout: &'a LayoutConfig,
        handler_export: &'a str,
        limits: &'a LimitTable,
    ) -> Self {
        Self {
            cache,
            layout,
            handler_export,
            limits,
        }
    }

    pub fn package(
        &self,
        entry: &FunctionEntry,
        trace: &TraceResult,
    ) -> Result<DeployableUnit, PackageError> {
        let source_path = entry
            .source_path
            .as_deref()
            .ok_or_else(|| PackageError::SourcePathUnderivable {
                entrypoint: entry.entrypoint.clone(),
            })?;
        let handler = self.handler(&entry.relative_entrypoint)?;

        let mut files = BTreeMap::new();
        let entrypoint = self
            .cache
            .read(&entry.relative_entrypoint)?
            .ok_or_else(|| PackageError::EntrypointMissing {
                entrypoint: entry.entrypoint.clone(),
            })?;
        files.insert(entry.relative_entrypoint.clone(), entrypoint);

        for path in trace.files() {
            if files.contains_key(path) {
                continue;
            }
            let file = self
                .cache
                .read(path)?
                .ok_or_else(|| PackageError::TracedFileMissing {
                    path: path.to_owned(),
                })?;
            files.insert(path.to_owned(), file);
        }

        let limits = self.limits.resolve(Some(source_path));
        tracing::debug!(
            output_name = %entry.output_name,
            handler = %handler,
            files = files.len(),
            memory = limits.memory,
            max_duration = limits.max_duration,
            "packaged function"
        );

        Ok(DeployableUnit {
            files,
            handler,
            runtime: limits.runtime,
            memory: limits.memory,
            max_duration: limits.max_duration,
            should_add_helpers: false,
            should_add_source_map_support: false,
        })
    }

    /// `api/dist/functions/auth/auth.js` → `auth/auth.handler`
    fn handler(&self, relative_entrypoint: &str) -> Result<String, PackageError> {
        let underivable = || PackageError::HandlerUnderivable {
            entrypoint: relative_entrypoint.to_owned(),
        };
        let functions_dir = paths::normalize(&self.layout.functions_dir).ok_or_else(underivable)?;
        let entrypoint = paths::normalize(relative_entrypoint).ok_or_else(underivable)?;
        let within = entrypoint
            .strip_prefix(&functions_dir)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
            .ok_or_else(underivable)?;

        Ok(format!(
            "{}.{}",
            paths::strip_extension(within),
            self.handler_export
        ))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("cannot derive the source path of {entrypoint}")]
    SourcePathUnderivable { entrypoint: PathBuf },

    #[error("cannot derive a handler for {entrypoint}: not inside the functions directory")]
    HandlerUnderivable { entrypoint: String },

    #[error("entrypoint {entrypoint} does not exist")]
    EntrypointMissing { entrypoint: PathBuf },

    #[error("traced file {path} does not exist")]
    TracedFileMissing { path: String },

    #[error("file access failed")]
    Cache(#[from] CacheError),
}

impl PackageError {
    /// Whether the whole run must stop, rather than just this function.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Cache(_))
    }
}
