//! Core types and configuration for slipway.
//!
//! This crate defines the `slipway.toml` schema ([`SlipwayConfig`]), the
//! output data model handed to deployment hosts ([`OutputManifest`]),
//! path normalization helpers, and shared error types.

pub mod config;
pub mod error;
pub mod manifest;
pub mod paths;

pub use config::{
    FunctionOverride, FunctionsConfig, LayoutConfig, PipelineConfig, RoutesConfig, SlipwayConfig,
};
pub use error::{Error, Result};
pub use manifest::{
    DeployableUnit, FileKind, FunctionEntry, Omission, Output, OutputManifest, ProjectFile,
    RouteRule, StaticAsset,
};
