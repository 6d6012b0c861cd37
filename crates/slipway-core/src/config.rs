use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::paths;

/// slipway.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlipwayConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub functions: FunctionsConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Where the build step leaves its output, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Directory holding one built file per function (nested at most one level)
    #[serde(default = "default_functions_dir")]
    pub functions_dir: String,
    /// Directory holding the built static site
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Path segment that marks build output (`api/dist/...`)
    #[serde(default = "default_build_segment")]
    pub build_segment: String,
    /// Segment that replaces `build_segment` to find the original source
    #[serde(default = "default_source_segment")]
    pub source_segment: String,
    /// Mount prefix every function output name is joined under
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionsConfig {
    /// Runtime identifier handed to the deployment host
    #[serde(default = "default_runtime")]
    pub runtime: String,
    /// Memory limit in MB
    #[serde(default = "default_memory")]
    pub memory: u32,
    /// Max duration in seconds
    #[serde(default = "default_max_duration")]
    pub max_duration: u32,
    /// Exported symbol every handler reference points at
    #[serde(default = "default_handler_export")]
    pub handler_export: String,
    /// Gitignore-style patterns never pulled into any function's file set
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Per-function overrides, matched against the original source path.
    /// The first matching entry wins.
    #[serde(default)]
    pub overrides: Vec<FunctionOverride>,
}

/// Resource limits for the functions whose source path matches `source`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionOverride {
    /// Glob over project-relative source paths, e.g. `api/src/functions/graphql.*`
    pub source: String,
    pub runtime: Option<String>,
    pub memory: Option<u32>,
    pub max_duration: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// Well-known catch-all document; used as the fallback when present
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,
    /// Root index document; the fallback when no catch-all document exists
    #[serde(default = "default_index_document")]
    pub index_document: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Package functions on a thread pool instead of one at a time.
    /// Outputs are still merged in discovery order.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            functions_dir: default_functions_dir(),
            static_dir: default_static_dir(),
            build_segment: default_build_segment(),
            source_segment: default_source_segment(),
            api_prefix: default_api_prefix(),
        }
    }
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            memory: default_memory(),
            max_duration: default_max_duration(),
            handler_export: default_handler_export(),
            exclude: Vec::new(),
            overrides: Vec::new(),
        }
    }
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            fallback_document: default_fallback_document(),
            index_document: default_index_document(),
        }
    }
}

impl SlipwayConfig {
    /// Load from slipway.toml at the given path, or return defaults if not found.
    ///
    /// The loaded configuration is validated before it is returned.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join("slipway.toml");
        let config: Self = if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })?
        } else {
            tracing::debug!(dir = %project_dir.display(), "no slipway.toml; using defaults");
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject layouts that point outside the project and limits of zero.
    pub fn validate(&self) -> crate::Result<()> {
        self.layout.validate()?;

        let functions = &self.functions;
        check_limit("memory", functions.memory, "[functions]")?;
        check_limit("max_duration", functions.max_duration, "[functions]")?;
        for o in &functions.overrides {
            let scope = format!("override {:?}", o.source);
            if let Some(memory) = o.memory {
                check_limit("memory", memory, &scope)?;
            }
            if let Some(max_duration) = o.max_duration {
                check_limit("max_duration", max_duration, &scope)?;
            }
        }
        Ok(())
    }
}

impl LayoutConfig {
    fn validate(&self) -> crate::Result<()> {
        check_layout_path("functions_dir", &self.functions_dir)?;
        check_layout_path("static_dir", &self.static_dir)?;
        check_segment("build_segment", &self.build_segment)?;
        check_segment("source_segment", &self.source_segment)?;
        check_segment("api_prefix", &self.api_prefix)?;
        Ok(())
    }

    /// Derive the original (pre-build) source path from a built entrypoint.
    ///
    /// The build segment must appear exactly once among the path's components;
    /// anything else is ambiguous and yields `None`. The built extension is
    /// kept; see [`source_candidates`](Self::source_candidates) for the files a
    /// caller should probe before settling on it.
    pub fn source_path_for(&self, relative_entrypoint: &str) -> Option<String> {
        let normalized = paths::normalize(relative_entrypoint)?;
        let segments: Vec<&str> = normalized.split('/').collect();
        let mut hits = segments
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == self.build_segment);
        let (index, _) = hits.next()?;
        if hits.next().is_some() {
            return None;
        }

        let mut replaced = segments.clone();
        replaced[index] = self.source_segment.as_str();
        Some(replaced.join("/"))
    }

    /// Same-stem siblings of a derived source path, in preference order
    /// (`.ts`, `.tsx`, `.js`, `.jsx`).
    pub fn source_candidates(derived: &str) -> Vec<String> {
        let stem = paths::strip_extension(derived);
        SOURCE_EXTENSIONS
            .iter()
            .map(|ext| format!("{stem}.{ext}"))
            .collect()
    }
}

/// Extensions probed when looking for a function's original source file.
const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

fn check_layout_path(field: &'static str, path: &str) -> crate::Result<()> {
    let invalid = |reason| crate::Error::InvalidLayoutPath {
        field,
        path: path.to_owned(),
        reason,
    };
    if path.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if Path::new(path).is_absolute() || path.starts_with('/') {
        return Err(invalid("must be relative to the project root"));
    }
    match paths::normalize(path) {
        Some(p) if !p.is_empty() => Ok(()),
        Some(_) => Err(invalid("must name a directory below the project root")),
        None => Err(invalid("must not escape the project root")),
    }
}

fn check_segment(field: &'static str, value: &str) -> crate::Result<()> {
    if value.is_empty() || value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(crate::Error::InvalidSegment {
            field,
            value: value.to_owned(),
        });
    }
    Ok(())
}

fn check_limit(field: &'static str, value: u32, scope: &str) -> crate::Result<()> {
    if value == 0 {
        return Err(crate::Error::InvalidLimit {
            field,
            scope: scope.to_owned(),
        });
    }
    Ok(())
}

fn default_functions_dir() -> String {
    "api/dist/functions".to_owned()
}

fn default_static_dir() -> String {
    "web/dist".to_owned()
}

fn default_build_segment() -> String {
    "dist".to_owned()
}

fn default_source_segment() -> String {
    "src".to_owned()
}

fn default_api_prefix() -> String {
    "api".to_owned()
}

fn default_runtime() -> String {
    "nodejs20.x".to_owned()
}

fn default_memory() -> u32 {
    1024
}

fn default_max_duration() -> u32 {
    10
}

fn default_handler_export() -> String {
    "handler".to_owned()
}

fn default_fallback_document() -> String {
    "200.html".to_owned()
}

fn default_index_document() -> String {
    "index.html".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> LayoutConfig {
        LayoutConfig::default()
    }

    #[test]
    fn source_path_replaces_build_segment() {
        let source = layout().source_path_for("api/dist/functions/graphql.js");
        assert_eq!(source.as_deref(), Some("api/src/functions/graphql.js"));
    }

    #[test]
    fn source_candidates_prefer_typescript() {
        assert_eq!(
            LayoutConfig::source_candidates("api/src/functions/graphql.js"),
            vec![
                "api/src/functions/graphql.ts",
                "api/src/functions/graphql.tsx",
                "api/src/functions/graphql.js",
                "api/src/functions/graphql.jsx",
            ]
        );
    }

    #[test]
    fn source_path_missing_segment_is_ambiguous() {
        assert!(
            layout()
                .source_path_for("api/build/functions/graphql.js")
                .is_none()
        );
    }

    #[test]
    fn source_path_repeated_segment_is_ambiguous() {
        assert!(
            layout()
                .source_path_for("api/dist/functions/dist/graphql.js")
                .is_none()
        );
    }

    #[test]
    fn source_path_normalizes_backslashes() {
        let source = layout().source_path_for("api\\dist\\functions\\auth\\auth.js");
        assert_eq!(source.as_deref(), Some("api/src/functions/auth/auth.js"));
    }

    #[test]
    fn validate_rejects_escaping_layout() {
        let mut config = SlipwayConfig::default();
        config.layout.static_dir = "../outside".to_owned();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("static_dir"), "got: {err}");
    }

    #[test]
    fn validate_rejects_zero_override_memory() {
        let mut config = SlipwayConfig::default();
        config.functions.overrides.push(FunctionOverride {
            source: "api/src/functions/*.js".to_owned(),
            memory: Some(0),
            ..Default::default()
        });
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("memory"), "got: {err}");
    }

    #[test]
    fn validate_rejects_multi_segment_prefix() {
        let mut config = SlipwayConfig::default();
        config.layout.api_prefix = "api/v1".to_owned();
        assert!(config.validate().is_err());
    }
}
