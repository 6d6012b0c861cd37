//! The in-memory contract between the packaging pipeline and a deployment host.
//!
//! A host materializes each [`DeployableUnit`] as a runnable function, serves
//! each [`StaticAsset`] as a file, and installs the [`RouteRule`] list as its
//! router configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use regex::Regex;
use serde::{Serialize, Serializer};

/// How a [`ProjectFile`] exists on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileKind {
    Regular,
    /// Kept as a link when materialized; the target is never dereferenced.
    Symlink { target: PathBuf },
}

/// A file at a project-relative path, read once per pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectFile {
    /// `/`-separated path relative to the project root
    pub path: String,
    pub kind: FileKind,
    /// Unix permission bits
    pub mode: u32,
    /// Raw bytes. For symlinks, the bytes of the followed target.
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl ProjectFile {
    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, FileKind::Symlink { .. })
    }

    /// Content as UTF-8, if it is.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// A function discovered in the build output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    /// Manifest key, e.g. `api/graphql`
    pub output_name: String,
    /// Absolute path to the built entrypoint
    pub entrypoint: PathBuf,
    /// Entrypoint relative to the project root, `/`-separated
    pub relative_entrypoint: String,
    /// Original pre-build source file, used only for configuration lookup.
    /// `None` when the build output naming is ambiguous.
    pub source_path: Option<String>,
}

/// A packaged function: handler, limits, and its minimal runtime file set.
#[derive(Debug, Clone, Serialize)]
pub struct DeployableUnit {
    /// Every file the entrypoint can reach, keyed by project-relative path
    #[serde(serialize_with = "file_paths")]
    pub files: BTreeMap<String, Arc<ProjectFile>>,
    /// `<path relative to the functions dir, no extension>.<export>`
    pub handler: String,
    pub runtime: String,
    /// Memory limit in MB
    pub memory: u32,
    /// Max duration in seconds
    pub max_duration: u32,
    pub should_add_helpers: bool,
    pub should_add_source_map_support: bool,
}

impl DeployableUnit {
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }
}

fn file_paths<S: Serializer>(
    files: &BTreeMap<String, Arc<ProjectFile>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(files.keys())
}

/// A built static file served at a request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticAsset {
    /// Request-facing path with a leading `/`; documents have no `.html`
    pub request_path: String,
    /// Absolute path of the underlying file
    pub file: PathBuf,
    /// Forced for documents; `None` lets the host infer it from the file
    pub content_type: Option<String>,
}

/// One entry of the ordered routing table.
#[derive(Debug, Clone, Serialize)]
pub struct RouteRule {
    /// Path pattern as written, e.g. `/(.*)`
    pub source: String,
    pub destination: String,
    /// Serve documents without their extension
    pub clean_urls: bool,
    /// Whether request paths keep a trailing slash
    pub trailing_slash: bool,
    /// Anchored regex compiled from `source`
    #[serde(rename = "src", serialize_with = "regex_source")]
    matcher: Regex,
}

impl RouteRule {
    /// Assemble a rule from an already-compiled matcher.
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        clean_urls: bool,
        trailing_slash: bool,
        matcher: Regex,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            clean_urls,
            trailing_slash,
            matcher,
        }
    }

    /// The compiled regex source.
    pub fn src(&self) -> &str {
        self.matcher.as_str()
    }

    pub fn matches(&self, request_path: &str) -> bool {
        self.matcher.is_match(request_path)
    }
}

impl PartialEq for RouteRule {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.destination == other.destination
            && self.clean_urls == other.clean_urls
            && self.trailing_slash == other.trailing_slash
            && self.src() == other.src()
    }
}

impl Eq for RouteRule {}

fn regex_source<S: Serializer>(matcher: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(matcher.as_str())
}

/// A manifest entry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    Function(DeployableUnit),
    Static(StaticAsset),
}

impl Output {
    pub fn as_function(&self) -> Option<&DeployableUnit> {
        match self {
            Self::Function(unit) => Some(unit),
            Self::Static(_) => None,
        }
    }

    pub fn as_static(&self) -> Option<&StaticAsset> {
        match self {
            Self::Static(asset) => Some(asset),
            Self::Function(_) => None,
        }
    }
}

/// A function left out of the manifest because packaging it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Omission {
    pub output_name: String,
    pub entrypoint: PathBuf,
    pub reason: String,
}

/// The pipeline's final product.
#[derive(Debug, Clone, Serialize)]
pub struct OutputManifest {
    /// Functions and static assets keyed by output name (no leading `/`)
    pub outputs: BTreeMap<String, Output>,
    /// Ordered; the last rule is always the catch-all fallback
    pub routes: Vec<RouteRule>,
    /// Advisory messages forwarded from tracing and discovery
    pub warnings: Vec<String>,
    pub omitted: Vec<Omission>,
}

impl OutputManifest {
    pub fn function(&self, name: &str) -> Option<&DeployableUnit> {
        self.outputs.get(name).and_then(Output::as_function)
    }

    pub fn static_asset(&self, name: &str) -> Option<&StaticAsset> {
        self.outputs.get(name).and_then(Output::as_static)
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, &DeployableUnit)> {
        self.outputs
            .iter()
            .filter_map(|(name, o)| o.as_function().map(|u| (name.as_str(), u)))
    }

    pub fn static_assets(&self) -> impl Iterator<Item = (&str, &StaticAsset)> {
        self.outputs
            .iter()
            .filter_map(|(name, o)| o.as_static().map(|a| (name.as_str(), a)))
    }

    /// The catch-all rule unmatched requests are rewritten by.
    pub fn fallback(&self) -> Option<&RouteRule> {
        self.routes.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(paths: &[&str]) -> DeployableUnit {
        let files = paths
            .iter()
            .map(|p| {
                let file = ProjectFile {
                    path: (*p).to_owned(),
                    kind: FileKind::Regular,
                    mode: 0o644,
                    content: b"module.exports = {}".to_vec(),
                };
                ((*p).to_owned(), Arc::new(file))
            })
            .collect();
        DeployableUnit {
            files,
            handler: "graphql.handler".to_owned(),
            runtime: "nodejs20.x".to_owned(),
            memory: 1024,
            max_duration: 10,
            should_add_helpers: false,
            should_add_source_map_support: false,
        }
    }

    #[test]
    fn unit_serializes_file_paths_only() {
        let json = serde_json::to_value(Output::Function(unit(&[
            "api/dist/functions/graphql.js",
            "api/dist/lib/db.js",
        ])))
        .unwrap();

        assert_eq!(json["type"], "function");
        assert_eq!(json["handler"], "graphql.handler");
        assert_eq!(
            json["files"],
            serde_json::json!(["api/dist/functions/graphql.js", "api/dist/lib/db.js"])
        );
    }

    #[test]
    fn route_rule_equality_ignores_matcher_identity() {
        let a = RouteRule::new("/(.*)", "/index", true, false, Regex::new("^/(.*)$").unwrap());
        let b = RouteRule::new("/(.*)", "/index", true, false, Regex::new("^/(.*)$").unwrap());
        assert_eq!(a, b);
        assert!(a.matches("/deep/client/route"));
    }

    #[test]
    fn route_rule_serializes_src() {
        let rule = RouteRule::new("/(.*)", "/200", true, false, Regex::new("^/(.*)$").unwrap());
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["src"], "^/(.*)$");
        assert_eq!(json["destination"], "/200");
        assert_eq!(json["clean_urls"], true);
        assert_eq!(json["trailing_slash"], false);
    }
}
