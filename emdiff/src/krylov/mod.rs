//! Outer Krylov acceleration, using the multigrid cycle as a right
//! preconditioner and the curl-curl operator apply as the matvec.
//!
//! Grounded in `original_source/emg3d/solver.py`'s `solve()` dispatch onto
//! `scipy.sparse.linalg.{bicgstab,cgs,gmres,lgmres,gcrotmk}` with
//! `M=multigrid preconditioner`. `Lgmres`/`Gcrotmk` are recognized but
//! rejected at config-validation time (`crate::config::SslSolver`); the
//! three implemented here are hand-written because `nalgebra` does not
//! ship general sparse/matrix-free Krylov solvers, only the dense solves
//! used internally by GMRES's least-squares step.

mod bicgstab;
mod cgs;
mod gmres;

pub use bicgstab::bicgstab;
pub use cgs::cgs;
pub use gmres::gmres;

use crate::config::SslSolver;
use crate::error::Result;
use crate::field::EdgeField;
use crate::mesh::TensorMesh;
use crate::model::Model;
use crate::scalar::Scalar;
use crate::telemetry::ConvergenceTracker;

/// Anything that can turn a residual into an approximate correction:
/// either the identity (unpreconditioned Krylov) or one multigrid cycle.
pub trait Preconditioner<T: Scalar> {
    fn apply(&mut self, mesh: &TensorMesh<T>, model: &Model<T>, residual: &EdgeField<T>) -> EdgeField<T>;
}

/// No preconditioning: return the residual unchanged.
pub struct Identity;

impl<T: Scalar> Preconditioner<T> for Identity {
    fn apply(&mut self, _mesh: &TensorMesh<T>, _model: &Model<T>, residual: &EdgeField<T>) -> EdgeField<T> {
        residual.clone()
    }
}

/// Dispatch to the requested Krylov method. `method` must already have
/// passed [`crate::config::SslSolver::is_supported`] (enforced by
/// `SolverConfig::validate` before this is ever called).
#[allow(clippy::too_many_arguments)]
pub fn run<T: Scalar, P: Preconditioner<T>>(
    method: SslSolver,
    mesh: &TensorMesh<T>,
    model: &Model<T>,
    b: &EdgeField<T>,
    e: &mut EdgeField<T>,
    preconditioner: &mut P,
    tol: f64,
    max_iter: usize,
    tracker: &mut ConvergenceTracker,
) -> Result<()> {
    match method {
        SslSolver::Bicgstab => bicgstab(mesh, model, b, e, preconditioner, tol, max_iter, tracker),
        SslSolver::Cgs => cgs(mesh, model, b, e, preconditioner, tol, max_iter, tracker),
        SslSolver::Gmres { restart } => gmres(mesh, model, b, e, preconditioner, tol, max_iter, restart, tracker),
        SslSolver::Lgmres | SslSolver::Gcrotmk => {
            unreachable!("unsupported methods are rejected by SolverConfig::validate")
        }
    }
}
