use nalgebra::{DMatrix, DVector};

/// Position of the simulated process.
pub type State = DVector<f64>;

/// Auxiliary data blob handed to plugin evaluators (data set, precision
/// matrix, ...).
pub type AuxData = DMatrix<f64>;
