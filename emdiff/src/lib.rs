//! A multigrid solver for the 3-D diffusive (controlled-source)
//! electromagnetic equation on a staggered Yee tensor mesh, for
//! tri-axially anisotropic conductive media, in either the frequency or
//! Laplace domain.
//!
//! The governing equation (spec.md §1) is
//!
//! ```text
//! curl(mu_r^-1 curl E) + s * mu_0 * sigma_tilde * E = -s * mu_0 * J_s
//! ```
//!
//! solved by a semicoarsening, line-relaxing multigrid cycle
//! ([`cycle`], [`smoother`], [`transfer`]), optionally accelerated by an
//! outer Krylov method ([`krylov`]) using the cycle as a right
//! preconditioner. [`solve`] is the single public entry point; everything
//! else is exposed for callers who want to assemble a mesh/model once and
//! reuse it across several solves.

pub mod config;
pub mod cycle;
pub mod error;
pub mod field;
pub mod krylov;
pub mod mesh;
pub mod model;
pub mod operator;
pub mod scalar;
pub mod smoother;
pub mod solver;
pub mod telemetry;
pub mod transfer;

pub use config::{CycleShapeConfig, LineRelaxation, Semicoarsening, SolverConfig, SslSolver};
pub use error::{Result, SolverError};
pub use field::EdgeField;
pub use mesh::{Axis, TensorMesh};
pub use model::{Anisotropy, Mapping, Model, Parameter};
pub use scalar::Scalar;
pub use solver::{solve, SolveOutcome};
pub use telemetry::{ExitCode, SolveInfo};
