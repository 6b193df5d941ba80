#![deny(missing_docs)]
#![doc = "Collaborator contracts for the Brownian motion Restore sampler: the target model, the regeneration distribution, errors and the seeded RNG."]

pub mod errors;
pub mod gaussian;
pub mod provenance;
pub mod regen;
pub mod rng;
pub mod target;
mod types;

pub use nalgebra;

pub use errors::{ErrorInfo, RestoreError};
pub use gaussian::{isotropic_gaussian_log_density, sample_isotropic_gaussian, IsotropicGaussian};
pub use provenance::{RunProvenance, SchemaVersion};
pub use regen::{check_dimensions, FnRegen, RegenDistribution, RegenLogDensityFn, RegenSampleFn};
pub use rng::{derive_substream_seed, RngHandle};
pub use target::{
    validate_target, Capabilities, FnTarget, GradientFn, LaplacianFn, LogDensityFn, TargetModel,
};
pub use types::{AuxData, State};
