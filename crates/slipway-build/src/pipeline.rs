use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use slipway_core::{DeployableUnit, FunctionEntry, Omission, Output, OutputManifest, SlipwayConfig};

use crate::assets::{self, AssetError};
use crate::cache::PathCache;
use crate::discover::{self, DiscoverError};
use crate::exclude::{ExcludeList, PatternError};
use crate::limits::LimitTable;
use crate::package::{PackageError, Packager};
use crate::resolve::ModuleResolver;
use crate::routes::{self, RouteError};
use crate::trace::{TraceError, Tracer};

/// One packaging run over a built project.
///
/// Every [`run`](Self::run) starts from an empty [`PathCache`]; nothing is
/// shared between runs.
pub struct Pipeline<'a> {
    project_dir: PathBuf,
    config: SlipwayConfig,
    resolver: &'a dyn ModuleResolver,
}

/// What happened to one discovered function.
enum Outcome {
    Packaged(DeployableUnit),
    Omitted(Omission),
}

impl<'a> Pipeline<'a> {
    pub fn new(
        project_dir: impl Into<PathBuf>,
        config: SlipwayConfig,
        resolver: &'a dyn ModuleResolver,
    ) -> Self {
        Self {
            project_dir: project_dir.into(),
            config,
            resolver,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn config(&self) -> &SlipwayConfig {
        &self.config
    }

    /// Discover, trace and package every function, classify static assets,
    /// and synthesize the route table.
    ///
    /// A function whose packaging fails on its own terms is recorded in
    /// [`OutputManifest::omitted`] and the run continues. Anything else
    /// (unreadable files, resolver failures, bad patterns, name collisions)
    /// ends the run without a manifest.
    pub fn run(&self) -> Result<OutputManifest, PipelineError> {
        let _span = tracing::info_span!("pipeline", dir = %self.project_dir.display()).entered();

        let cache = PathCache::new(&self.project_dir);
        let functions = &self.config.functions;
        let exclude = ExcludeList::new(&self.project_dir, &functions.exclude)
            .map_err(PipelineError::Exclude)?;
        let limits = LimitTable::new(&self.project_dir, functions).map_err(PipelineError::Limits)?;

        let discovery = discover::discover(&self.project_dir, &self.config.layout, &cache)?;
        let mut warnings = discovery.warnings;
        tracing::debug!(functions = discovery.entries.len(), "discovery complete");

        let tracer = Tracer::new(self.resolver, &cache, &exclude);
        let packager = Packager::new(
            &cache,
            &self.config.layout,
            &functions.handler_export,
            &limits,
        );
        let process = |entry: &FunctionEntry| process_entry(&tracer, &packager, entry);

        let results: Vec<_> = if self.config.pipeline.parallel {
            discovery.entries.par_iter().map(process).collect()
        } else {
            discovery.entries.iter().map(process).collect()
        };

        let mut outputs = BTreeMap::new();
        let mut omitted = Vec::new();
        let mut folded_names: HashMap<String, String> = HashMap::new();

        for (entry, result) in discovery.entries.iter().zip(results) {
            let (outcome, trace_warnings) = result?;
            warnings.extend(trace_warnings);
            match outcome {
                Outcome::Packaged(unit) => {
                    let folded = entry.output_name.to_ascii_lowercase();
                    if let Some(existing) = folded_names.get(&folded) {
                        return Err(PipelineError::Collision {
                            name: entry.output_name.clone(),
                            existing: existing.clone(),
                        });
                    }
                    folded_names.insert(folded, entry.output_name.clone());
                    outputs.insert(entry.output_name.clone(), Output::Function(unit));
                }
                Outcome::Omitted(omission) => {
                    tracing::warn!(
                        output_name = %omission.output_name,
                        reason = %omission.reason,
                        "omitted function"
                    );
                    omitted.push(omission);
                }
            }
        }

        let static_root = self.project_dir.join(&self.config.layout.static_dir);
        let static_assets = assets::classify(&static_root)?;
        let static_count = static_assets.len();
        for (name, asset) in static_assets {
            if outputs.contains_key(&name) {
                return Err(PipelineError::Collision {
                    existing: name.clone(),
                    name,
                });
            }
            outputs.insert(name, Output::Static(asset));
        }

        let routes = routes::synthesize(&static_root, &self.config.routes)?;

        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        let stats = cache.stats();
        tracing::info!(
            functions = outputs.len() - static_count,
            static_assets = static_count,
            omitted = omitted.len(),
            warnings = warnings.len(),
            cache_lookups = stats.lookups,
            cache_fs_reads = stats.fs_reads,
            "packaging complete"
        );

        Ok(OutputManifest {
            outputs,
            routes,
            warnings,
            omitted,
        })
    }
}

/// Trace and package one entry. Per-function failures become an omission.
fn process_entry(
    tracer: &Tracer<'_>,
    packager: &Packager<'_>,
    entry: &FunctionEntry,
) -> Result<(Outcome, Vec<String>), PipelineError> {
    let trace = tracer.trace(&entry.entrypoint)?;
    let outcome = match packager.package(entry, &trace) {
        Ok(unit) => Outcome::Packaged(unit),
        Err(e) if e.is_fatal() => {
            return Err(PipelineError::Package {
                output_name: entry.output_name.clone(),
                source: e,
            });
        }
        Err(e) => Outcome::Omitted(Omission {
            output_name: entry.output_name.clone(),
            entrypoint: entry.entrypoint.clone(),
            reason: e.to_string(),
        }),
    };
    Ok((outcome, trace.warnings))
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid [functions].exclude pattern")]
    Exclude(#[source] PatternError),

    #[error("invalid [[functions.overrides]] pattern")]
    Limits(#[source] PatternError),

    #[error("function discovery failed")]
    Discover(#[from] DiscoverError),

    #[error("tracing failed")]
    Trace(#[from] TraceError),

    #[error("packaging {output_name} failed")]
    Package {
        output_name: String,
        source: PackageError,
    },

    #[error("static asset classification failed")]
    Assets(#[from] AssetError),

    #[error("route synthesis failed")]
    Routes(#[from] RouteError),

    #[error("output name {name} collides with {existing}")]
    Collision { name: String, existing: String },
}
