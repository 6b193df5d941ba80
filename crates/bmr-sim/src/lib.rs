#![deny(missing_docs)]
#![doc = include_str!("../docs/restore-api.md")]

//! Brownian motion Restore sampler with regeneration tours and a Poisson
//! output clock.

/// Moment and tour summaries of recorded traces.
pub mod analysis;
/// YAML configuration schema and defaults.
pub mod config;
/// The Restore simulation engine.
pub mod engine;
/// Run manifest and export helpers.
pub mod manifest;
/// Regeneration rate evaluation.
pub mod rate;
/// Output trace storage and text I/O.
pub mod trace;

pub use analysis::{load_exported_trace, TourStatistics, TraceMoments};
pub use config::{OutputConfig, RestoreConfig, RunLimits, SeedPolicy};
pub use engine::{RestoreEngine, RunStats, RunSummary, StepEvent, Termination};
pub use manifest::{export_run, RunExport, RunManifest};
pub use rate::{kappa, kappa_partial, EVALS_PER_RATE};
pub use trace::{ExportedFiles, Trace, TraceRecord};
