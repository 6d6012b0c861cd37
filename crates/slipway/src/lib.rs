//! Package a compiled web application for serverless deployment.
//!
//! Each server-side function becomes a unit holding only the files it can
//! reach at runtime; the static site becomes a set of clean-URL assets plus a
//! fallback route table. This is the facade crate that re-exports the
//! Slipway sub-crates.
//!
//! # Feature flags
//!
//! | Feature | Default | Crate | Description |
//! |---------|---------|-------|-------------|
//! | `core` | yes | [`slipway-core`] | Configuration and the output manifest types |
//! | `build` | yes | [`slipway-build`] | Tracing, packaging, and route synthesis |
//!
//! [`slipway-core`]: https://crates.io/crates/slipway-core
//! [`slipway-build`]: https://crates.io/crates/slipway-build
//!
//! # Quick start
//!
//! ```toml
//! [dependencies]
//! slipway = "0.4"
//! ```
//!
//! ```rust,no_run
//! use std::path::Path;
//! use slipway::SlipwayConfig;
//! use slipway::build::{ImportScanner, Pipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SlipwayConfig::load(Path::new("."))?;
//! let scanner = ImportScanner::new();
//! let manifest = Pipeline::new(".", config, &scanner).run()?;
//! for (name, unit) in manifest.functions() {
//!     println!("{name}: {} ({} files)", unit.handler, unit.files.len());
//! }
//! # Ok(())
//! # }
//! ```

// Core types flattened into root namespace for convenience.
#[cfg(feature = "core")]
pub use slipway_core::*;

/// Dependency tracing, function packaging, static assets, and routes.
///
/// See [`slipway-build`](https://crates.io/crates/slipway-build) for details.
#[cfg(feature = "build")]
pub mod build {
    pub use slipway_build::*;
}
