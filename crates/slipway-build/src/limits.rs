use std::path::{Path, PathBuf};

use ignore::gitignore::Gitignore;
use slipway_core::{FunctionOverride, FunctionsConfig};

use crate::exclude::{PatternError, build_matcher};

/// Runtime settings for one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub runtime: String,
    /// MB
    pub memory: u32,
    /// Seconds
    pub max_duration: u32,
}

/// Global defaults plus `[[functions.overrides]]`, compiled once per run.
#[derive(Debug)]
pub struct LimitTable {
    root: PathBuf,
    defaults: Limits,
    overrides: Vec<(Gitignore, FunctionOverride)>,
}

impl LimitTable {
    pub fn new(root: &Path, functions: &FunctionsConfig) -> Result<Self, PatternError> {
        let overrides = functions
            .overrides
            .iter()
            .map(|o| -> Result<_, PatternError> {
                let matcher = build_matcher(root, std::slice::from_ref(&o.source))?;
                Ok((matcher, o.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root: root.to_path_buf(),
            defaults: Limits {
                runtime: functions.runtime.clone(),
                memory: functions.memory,
                max_duration: functions.max_duration,
            },
            overrides,
        })
    }

    /// Limits for a function whose original source lives at `source_path`.
    ///
    /// The first override whose pattern matches wins; fields it leaves unset
    /// come from the global defaults. No source path means defaults only.
    pub fn resolve(&self, source_path: Option<&str>) -> Limits {
        let Some(source_path) = source_path else {
            return self.defaults.clone();
        };
        let path = self.root.join(source_path);
        let Some((_, o)) = self.overrides.iter().find(|(matcher, _)| {
            matcher
                .matched_path_or_any_parents(&path, false)
                .is_ignore()
        }) else {
            return self.defaults.clone();
        };

        tracing::trace!(source_path, pattern = %o.source, "applied function override");
        Limits {
            runtime: o.runtime.clone().unwrap_or_else(|| self.defaults.runtime.clone()),
            memory: o.memory.unwrap_or(self.defaults.memory),
            max_duration: o.max_duration.unwrap_or(self.defaults.max_duration),
        }
    }

    pub fn defaults(&self) -> &Limits {
        &self.defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(overrides: Vec<FunctionOverride>) -> LimitTable {
        let functions = FunctionsConfig {
            overrides,
            ..FunctionsConfig::default()
        };
        LimitTable::new(Path::new("/project"), &functions).unwrap()
    }

    fn defaults() -> Limits {
        Limits {
            runtime: "nodejs20.x".to_owned(),
            memory: 1024,
            max_duration: 10,
        }
    }

    #[test]
    fn no_overrides_gives_defaults() {
        let table = table(vec![]);
        assert_eq!(table.resolve(Some("api/src/functions/graphql.ts")), defaults());
        assert_eq!(table.resolve(None), defaults());
    }

    #[test]
    fn first_matching_override_wins_and_fills_gaps() {
        let table = table(vec![
            FunctionOverride {
                source: "api/src/functions/graphql.*".to_owned(),
                memory: Some(3008),
                ..Default::default()
            },
            FunctionOverride {
                source: "api/src/functions/*".to_owned(),
                memory: Some(128),
                max_duration: Some(60),
                runtime: Some("nodejs22.x".to_owned()),
            },
        ]);

        assert_eq!(
            table.resolve(Some("api/src/functions/graphql.ts")),
            Limits {
                memory: 3008,
                ..defaults()
            }
        );
        assert_eq!(
            table.resolve(Some("api/src/functions/health.ts")),
            Limits {
                runtime: "nodejs22.x".to_owned(),
                memory: 128,
                max_duration: 60,
            }
        );
    }

    #[test]
    fn directory_override_covers_nested_functions() {
        let table = table(vec![FunctionOverride {
            source: "api/src/functions/cron/".to_owned(),
            max_duration: Some(300),
            ..Default::default()
        }]);

        assert_eq!(
            table.resolve(Some("api/src/functions/cron/cron.ts")).max_duration,
            300
        );
        assert_eq!(table.resolve(Some("api/src/functions/graphql.ts")), defaults());
    }
}
