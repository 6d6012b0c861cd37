//! Function packaging and route synthesis for slipway.
//!
//! # Pipeline
//!
//! ```text
//! slipway package
//!   1. Discover ── functions dir → FunctionEntry per built function
//!   2. Trace    ── ModuleResolver::resolve() through the run's PathCache
//!   3. Package  ── closure + handler + limits → DeployableUnit
//!   4. Classify ── static dir → StaticAsset per request path
//!   5. Routes   ── fallback document → ordered RouteRule list
//! ```
//!
//! # Caching
//!
//! One [`PathCache`] lives for exactly one [`Pipeline::run`]. Functions that
//! share dependencies read each file from disk once and hold the same
//! `Arc<ProjectFile>` in their units.
//!
//! # Failure policy
//!
//! A function whose own packaging fails (for example, its source path cannot
//! be derived) is left out and recorded as an omission. Unreadable files,
//! resolver failures, invalid patterns and output-name collisions stop the
//! run; no partial manifest is produced.

pub mod assets;
pub mod cache;
pub mod discover;
pub mod exclude;
pub mod limits;
pub mod package;
pub mod pipeline;
pub mod resolve;
pub mod routes;
pub mod scanner;
pub mod trace;

pub use cache::{CacheStats, FileAccess, PathCache};
pub use exclude::ExcludeList;
pub use limits::{LimitTable, Limits};
pub use package::Packager;
pub use pipeline::{Pipeline, PipelineError};
pub use resolve::{ModuleResolver, Resolution, ResolveError, ResolveOptions};
pub use scanner::ImportScanner;
pub use trace::{TraceResult, Tracer};
