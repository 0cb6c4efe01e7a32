use thiserror::Error;

use crate::mesh::Axis;

/// Every way a call into this crate can fail.
///
/// Misconfiguration variants are returned eagerly from [`crate::solve`]'s
/// entry validation. Non-convergence is reported through
/// [`crate::telemetry::ExitCode`] on a successful [`crate::SolveOutcome`],
/// not through this enum; [`SolverError::NonFinite`] is the one numerical
/// failure that aborts the solve.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("`cycle` must be one of {{V, W, F, none}}, got {name:?}")]
    InvalidCycleName { name: String },

    #[error("at least one of `cycle` or `sslsolver` must be set")]
    IncompatibleSolverFlags,

    #[error("frequency/Laplace parameter `s` must be nonzero")]
    ZeroFrequency,

    #[error("cell widths along {axis:?} must be strictly positive (index {index})")]
    NonPositiveCellWidth { axis: Axis, index: usize },

    #[error("grid dimension along {axis:?} has only {count} cell(s); at least 2 required")]
    GridDimensionTooSmall { axis: Axis, count: usize },

    #[error("edge field has {found} entries, expected {expected} for this mesh")]
    EdgeFieldShapeMismatch { expected: usize, found: usize },

    #[error("sslsolver {name:?} is not implemented by this solver")]
    UnsupportedKrylovMethod { name: &'static str },

    #[error("non-finite value encountered in {where_}")]
    NonFinite { where_: &'static str },

    #[error("{method} failed to converge (info code {code})")]
    KrylovFailure { method: &'static str, code: i32 },
}

pub type Result<T> = std::result::Result<T, SolverError>;
