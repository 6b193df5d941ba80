use std::collections::BTreeMap;

use bmr_core::errors::ErrorInfo;
use bmr_core::RestoreError;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::config::OutputConfig;
use crate::trace::{run_directory, Trace};

/// Sample mean and covariance of the recorded output states.
///
/// Output events arrive at a constant rate in time, so equally weighting the
/// recorded states estimates expectations under the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceMoments {
    /// Number of states averaged.
    pub count: usize,
    /// Componentwise mean.
    pub mean: DVector<f64>,
    /// Covariance normalised by `count`.
    pub covariance: DMatrix<f64>,
}

impl TraceMoments {
    /// Computes moments over every recorded state.
    pub fn from_trace(trace: &Trace) -> Result<Self, RestoreError> {
        let states = trace.states();
        let Some(first) = states.first() else {
            return Err(RestoreError::Numeric(ErrorInfo::new(
                "empty-trace",
                "moments need at least one recorded output",
            )));
        };
        let dimension = first.len();
        let count = states.len();

        let mut mean = DVector::zeros(dimension);
        for state in states {
            mean += state;
        }
        mean /= count as f64;

        let mut covariance = DMatrix::zeros(dimension, dimension);
        for state in states {
            let centred = state - &mean;
            covariance += &centred * centred.transpose();
        }
        covariance /= count as f64;

        Ok(Self {
            count,
            mean,
            covariance,
        })
    }

    /// Per-coordinate variances.
    pub fn variances(&self) -> DVector<f64> {
        self.covariance.diagonal()
    }
}

/// How the recorded outputs are spread across tours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourStatistics {
    /// Outputs recorded during each tour that produced any.
    pub outputs_per_tour: BTreeMap<usize, usize>,
    /// Highest tour index seen, if any.
    pub last_tour: Option<usize>,
}

impl TourStatistics {
    /// Tallies the tour indices of a trace.
    pub fn from_trace(trace: &Trace) -> Self {
        let mut outputs_per_tour = BTreeMap::new();
        for &tour in trace.tours() {
            *outputs_per_tour.entry(tour).or_insert(0) += 1;
        }
        let last_tour = trace.tours().last().copied();
        Self {
            outputs_per_tour,
            last_tour,
        }
    }

    /// Number of distinct tours with at least one output.
    pub fn tours_observed(&self) -> usize {
        self.outputs_per_tour.len()
    }

    /// Average outputs over the tours that produced any.
    pub fn mean_outputs_per_tour(&self) -> f64 {
        if self.outputs_per_tour.is_empty() {
            return 0.0;
        }
        let total: usize = self.outputs_per_tour.values().sum();
        total as f64 / self.outputs_per_tour.len() as f64
    }
}

/// Reads back a trace exported with `layout`.
pub fn load_exported_trace(layout: &OutputConfig) -> Result<Trace, RestoreError> {
    let run_dir = run_directory(layout)?;
    Trace::read_from_files(
        &run_dir.join(&layout.times_file),
        &run_dir.join(&layout.states_file),
        &run_dir.join(&layout.tours_file),
    )
}
