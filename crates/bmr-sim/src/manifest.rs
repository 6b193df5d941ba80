use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bmr_core::errors::ErrorInfo;
use bmr_core::{RegenDistribution, RestoreError, RunProvenance, SchemaVersion, TargetModel};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RestoreConfig;
use crate::engine::{RestoreEngine, RunStats};
use crate::trace::{create_destination, ensure_absent, remove_files, run_directory, ExportedFiles};

/// Structured manifest written next to an exported trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema of this document.
    pub schema_version: SchemaVersion,
    /// Seed and tool provenance.
    pub provenance: RunProvenance,
    /// Configuration in effect when the manifest was taken.
    pub config: RestoreConfig,
    /// State-space dimension.
    pub dimension: usize,
    /// Total target evaluations.
    pub nevals: u64,
    /// Accepted regenerations.
    pub tours_completed: usize,
    /// Recorded outputs.
    pub outputs: usize,
    /// Simulated time reached.
    pub final_time: f64,
    /// Cumulative event counters.
    pub stats: RunStats,
    /// Times file (relative to the run directory).
    pub times_file: PathBuf,
    /// States file (relative to the run directory).
    pub states_file: PathBuf,
    /// Tours file (relative to the run directory).
    pub tours_file: PathBuf,
}

impl RunManifest {
    /// Captures the engine's current configuration and counters.
    pub fn from_engine<T, R>(engine: &RestoreEngine<T, R>) -> Self
    where
        T: TargetModel,
        R: RegenDistribution,
    {
        let config = engine.config().clone();
        let policy = &config.seed_policy;
        let derived = engine.seed() == policy.effective_seed() && policy.stream.is_some();
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        let provenance = RunProvenance {
            seed: engine.seed(),
            master_seed: derived.then_some(policy.master_seed),
            substream: if derived { policy.stream } else { None },
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            tool_versions,
        };
        Self {
            schema_version: SchemaVersion::CURRENT,
            provenance,
            dimension: engine.dimension(),
            nevals: engine.nevals(),
            tours_completed: engine.current_tour(),
            outputs: engine.trace().len(),
            final_time: engine.current_time(),
            stats: engine.stats(),
            times_file: config.output.times_file.clone(),
            states_file: config.output.states_file.clone(),
            tours_file: config.output.tours_file.clone(),
            config,
        }
    }

    /// Writes the manifest as pretty JSON, refusing to replace an existing
    /// file unless `overwrite` is set.
    pub fn write(&self, path: &Path, overwrite: bool) -> Result<(), RestoreError> {
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            RestoreError::Serde(
                ErrorInfo::new("manifest-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let mut file = create_destination(path, overwrite)?;
        file.write_all(json.as_bytes()).map_err(|err| {
            RestoreError::Output(
                ErrorInfo::new("manifest-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Loads a manifest from disk, refusing other major schema versions.
    pub fn load(path: &Path) -> Result<Self, RestoreError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            RestoreError::Serde(
                ErrorInfo::new("manifest-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let manifest: Self = serde_json::from_str(&contents).map_err(|err| {
            RestoreError::Serde(
                ErrorInfo::new("manifest-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        if !manifest.schema_version.is_compatible_with(&SchemaVersion::CURRENT) {
            return Err(RestoreError::Serde(
                ErrorInfo::new("manifest-schema", "manifest schema is not readable by this release")
                    .with_context("path", path.display().to_string())
                    .with_context("found", manifest.schema_version.to_string())
                    .with_context("supported", SchemaVersion::CURRENT.to_string()),
            ));
        }
        Ok(manifest)
    }
}

/// Everything [`export_run`] wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct RunExport {
    /// Trace text files.
    pub files: ExportedFiles,
    /// Manifest path.
    pub manifest_path: PathBuf,
    /// Manifest contents.
    pub manifest: RunManifest,
}

/// Writes the engine's trace and a manifest into the configured run
/// directory.
///
/// Unless `overwrite` is set, every destination is checked before anything
/// is written. If the manifest cannot be written the trace files are
/// removed again.
pub fn export_run<T, R>(engine: &RestoreEngine<T, R>) -> Result<RunExport, RestoreError>
where
    T: TargetModel,
    R: RegenDistribution,
{
    let layout = &engine.config().output;
    let run_dir = run_directory(layout)?;
    let manifest_path = run_dir.join(&layout.manifest_file);
    if !layout.overwrite {
        ensure_absent(&[manifest_path.as_path()])?;
    }

    let files = engine.trace().export(layout)?;
    let manifest = RunManifest::from_engine(engine);
    if let Err(err) = manifest.write(&manifest_path, layout.overwrite) {
        remove_files(&files.paths());
        return Err(err);
    }
    tracing::info!(
        run_directory = %run_dir.display(),
        outputs = manifest.outputs,
        tours = manifest.tours_completed,
        "Exported restore trace"
    );
    Ok(RunExport {
        files,
        manifest_path,
        manifest,
    })
}
