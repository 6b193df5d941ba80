use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bmr_core::errors::ErrorInfo;
use bmr_core::{derive_substream_seed, RestoreError};
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters governing a Restore run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// Log of the tilting constant `C` in the regeneration rate.
    pub log_c: f64,
    /// Constant upper bound on the regeneration rate (dominating clock).
    pub kappa_bar: f64,
    /// Number of accepted regenerations after which the run stops.
    #[serde(default = "default_ntours")]
    pub ntours: usize,
    /// Rate of the independent output clock.
    #[serde(default = "default_output_rate")]
    pub output_rate: f64,
    /// Seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Cooperative run limits checked at every step boundary.
    #[serde(default)]
    pub limits: RunLimits,
    /// Trace export layout.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_ntours() -> usize {
    10_000
}

fn default_output_rate() -> f64 {
    1.0
}

impl RestoreConfig {
    /// Configuration with the given constants and defaults elsewhere.
    pub fn new(log_c: f64, kappa_bar: f64) -> Self {
        Self {
            log_c,
            kappa_bar,
            ntours: default_ntours(),
            output_rate: default_output_rate(),
            seed_policy: SeedPolicy::default(),
            limits: RunLimits::default(),
            output: OutputConfig::default(),
        }
    }

    /// Sets the tour count.
    pub fn with_ntours(mut self, ntours: usize) -> Self {
        self.ntours = ntours;
        self
    }

    /// Sets the output clock rate.
    pub fn with_output_rate(mut self, output_rate: f64) -> Self {
        self.output_rate = output_rate;
        self
    }

    /// Sets the master seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_policy.master_seed = seed;
        self
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RestoreError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|err| {
            RestoreError::Config(ErrorInfo::new("config-parse", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a YAML file.
    pub fn load(path: &Path) -> Result<Self, RestoreError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            RestoreError::Config(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&contents).map_err(|err| match err {
            RestoreError::Config(info) => {
                RestoreError::Config(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }

    /// Renders the configuration as YAML.
    pub fn to_yaml_string(&self) -> Result<String, RestoreError> {
        serde_yaml::to_string(self)
            .map_err(|err| RestoreError::Serde(ErrorInfo::new("config-serialize", err.to_string())))
    }

    /// Checks the numeric preconditions of the algorithm.
    pub fn validate(&self) -> Result<(), RestoreError> {
        validate_log_c(self.log_c)?;
        validate_kappa_bar(self.kappa_bar)?;
        validate_output_rate(self.output_rate)?;
        self.limits.validate()
    }
}

pub(crate) fn validate_log_c(log_c: f64) -> Result<(), RestoreError> {
    if !log_c.is_finite() {
        return Err(RestoreError::Config(
            ErrorInfo::new("invalid-log-c", "log C must be finite")
                .with_context("log_c", log_c.to_string()),
        ));
    }
    Ok(())
}

pub(crate) fn validate_kappa_bar(kappa_bar: f64) -> Result<(), RestoreError> {
    if !(kappa_bar.is_finite() && kappa_bar > 0.0) {
        return Err(RestoreError::Config(
            ErrorInfo::new(
                "invalid-kappa-bar",
                "regeneration rate bound must be finite and strictly positive",
            )
            .with_context("kappa_bar", kappa_bar.to_string()),
        ));
    }
    Ok(())
}

pub(crate) fn validate_output_rate(output_rate: f64) -> Result<(), RestoreError> {
    if !(output_rate.is_finite() && output_rate > 0.0) {
        return Err(RestoreError::Config(
            ErrorInfo::new(
                "invalid-output-rate",
                "output rate must be finite and strictly positive",
            )
            .with_context("output_rate", output_rate.to_string()),
        ));
    }
    Ok(())
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Substream index; when set, the engine seed is derived from
    /// `(master_seed, stream)` so independent chains never share a stream.
    #[serde(default)]
    pub stream: Option<u64>,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            stream: None,
            label: None,
        }
    }
}

impl SeedPolicy {
    /// Seed the engine's RNG starts from.
    pub fn effective_seed(&self) -> u64 {
        match self.stream {
            Some(stream) => derive_substream_seed(self.master_seed, stream),
            None => self.master_seed,
        }
    }
}

/// Optional limits that end a run early.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLimits {
    /// Maximum number of steps per call to `run_fixed_tours`.
    #[serde(default)]
    pub max_steps: Option<u64>,
    /// Wall-clock budget in seconds per call to `run_fixed_tours`.
    #[serde(default)]
    pub wall_clock_secs: Option<f64>,
}

impl RunLimits {
    /// Wall-clock budget as a [`Duration`], rejecting negative, non-finite
    /// or unrepresentable values.
    pub fn time_budget(&self) -> Result<Option<Duration>, RestoreError> {
        self.wall_clock_secs
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|err| {
                    RestoreError::Config(
                        ErrorInfo::new("invalid-time-budget", err.to_string())
                            .with_context("wall_clock_secs", secs.to_string()),
                    )
                })
            })
            .transpose()
    }

    fn validate(&self) -> Result<(), RestoreError> {
        self.time_budget().map(|_| ())
    }
}

/// Export layout for the trace files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts. Created if it does not exist.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Output times filename relative to `run_directory`.
    #[serde(default = "default_times_filename")]
    pub times_file: PathBuf,
    /// Output states filename relative to `run_directory`.
    #[serde(default = "default_states_filename")]
    pub states_file: PathBuf,
    /// Tour index filename relative to `run_directory`.
    #[serde(default = "default_tours_filename")]
    pub tours_file: PathBuf,
    /// Manifest filename relative to `run_directory`.
    #[serde(default = "default_manifest_filename")]
    pub manifest_file: PathBuf,
    /// Replace existing files instead of refusing to write.
    #[serde(default)]
    pub overwrite: bool,
}

fn default_times_filename() -> PathBuf {
    PathBuf::from("times.txt")
}

fn default_states_filename() -> PathBuf {
    PathBuf::from("states.txt")
}

fn default_tours_filename() -> PathBuf {
    PathBuf::from("tours.txt")
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from("manifest.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            times_file: default_times_filename(),
            states_file: default_states_filename(),
            tours_file: default_tours_filename(),
            manifest_file: default_manifest_filename(),
            overwrite: false,
        }
    }
}
