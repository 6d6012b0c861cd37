use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Validation ──
    #[error("invalid layout path [layout].{field} = {path:?}: {reason}")]
    InvalidLayoutPath {
        field: &'static str,
        path: String,
        reason: &'static str,
    },

    #[error("invalid {field} for {scope}: must be greater than zero")]
    InvalidLimit { field: &'static str, scope: String },

    #[error("invalid [layout].{field} = {value:?}: must be a single path segment")]
    InvalidSegment { field: &'static str, value: String },
}
