//! Top-level entry point: [`solve`] dispatches between pure multigrid,
//! unpreconditioned Krylov, and Krylov-with-multigrid-preconditioner,
//! matching the three branches of `original_source/emg3d/solver.py::solve`.

use crate::config::SolverConfig;
use crate::cycle::{run_cycle, CycleShape};
use crate::error::{Result, SolverError};
use crate::field::EdgeField;
use crate::krylov::{self, Identity, Preconditioner};
use crate::mesh::TensorMesh;
use crate::model::{Model, Parameter};
use crate::operator::residual;
use crate::scalar::Scalar;
use crate::telemetry::{ConvergenceTracker, ExitCode, SolveInfo};

/// The field plus convergence bookkeeping returned by [`solve`].
#[derive(Debug, Clone)]
pub struct SolveOutcome<T: Scalar> {
    pub field: EdgeField<T>,
    pub info: SolveInfo,
}

/// Solve `A e = b` for the edge field `e`, where `A` is built from `mesh`
/// and `model` and carries the sign of `s`.
///
/// `s` is required here (in addition to being folded into `model`'s `eta`
/// values already) purely to validate it is nonzero and to know whether a
/// frequency-domain sign-convention conjugation applies on entry/exit, the
/// way `original_source/emg3d/fields.py`'s `Field` tracks its own
/// frequency sign. If `initial` is supplied and already satisfies the
/// tolerance, the solve returns immediately having run zero inner
/// iterations (spec.md §8, initial-field shortcut).
pub fn solve<T: Scalar>(
    mesh: &TensorMesh<T>,
    model: &Model<T>,
    s: Parameter<T>,
    source: &EdgeField<T>,
    initial: Option<EdgeField<T>>,
    config: &SolverConfig<T>,
) -> Result<SolveOutcome<T>> {
    config.validate()?;
    if s.s().norm() <= T::EPSILON {
        return Err(SolverError::ZeroFrequency);
    }

    let conjugate = matches!(s, Parameter::FrequencyDomain { .. });

    let mut source = source.clone();
    if conjugate {
        source.conjugate_mut();
    }

    let mut field = initial.unwrap_or_else(|| EdgeField::zeros(mesh));
    field.ensure_pec();

    let mut tracker = ConvergenceTracker::new(config.tol);
    let initial_residual = residual(mesh, model, &source, &field).norm();
    tracker.record(initial_residual);

    if tracker.has_converged() {
        let mut out = field;
        if conjugate {
            out.conjugate_mut();
        }
        return Ok(SolveOutcome { field: out, info: tracker.finish(ExitCode::Converged, 0) });
    }

    let exit_code = if let Some(method) = config.sslsolver {
        let result = if let Some(cycle_cfg) = config.cycle {
            let mut preconditioner = MultigridPreconditioner { config, shape: cycle_cfg.into() };
            krylov::run(
                method,
                mesh,
                model,
                &source,
                &mut field,
                &mut preconditioner,
                config.tol,
                config.max_cycles,
                &mut tracker,
            )
        } else {
            let mut preconditioner = Identity;
            krylov::run(
                method,
                mesh,
                model,
                &source,
                &mut field,
                &mut preconditioner,
                config.tol,
                config.max_cycles,
                &mut tracker,
            )
        };
        match result {
            Ok(()) if tracker.has_converged() => ExitCode::Converged,
            Ok(()) => ExitCode::MaxIterations,
            Err(SolverError::KrylovFailure { .. }) if tracker.has_converged() => ExitCode::Converged,
            Err(err) => return Err(err),
        }
    } else {
        let shape: CycleShape = config.cycle.expect("validated: cycle set when sslsolver is None").into();
        let mut cycles = 0;
        loop {
            run_cycle(mesh, model, &source, &mut field, config, shape, &mut tracker);
            cycles += 1;
            if tracker.has_converged() {
                break ExitCode::Converged;
            }
            if tracker.has_diverged() {
                break ExitCode::Diverged;
            }
            if cycles >= config.max_cycles {
                break ExitCode::MaxIterations;
            }
            if tracker.has_stagnated() {
                break ExitCode::Stagnated;
            }
            if !field.all_finite() {
                return Err(SolverError::NonFinite { where_: "multigrid cycle" });
            }
        }
    };

    let iterations = tracker.history().len().saturating_sub(1);
    if conjugate {
        field.conjugate_mut();
    }
    Ok(SolveOutcome { field, info: tracker.finish(exit_code, iterations) })
}

/// Adapts one multigrid [`CycleShape`] into a [`Preconditioner`] for the
/// Krylov methods in [`crate::krylov`]: applying it runs a single cycle
/// starting from a zero guess against the given residual as the right-hand
/// side (spec.md §6, multigrid as right preconditioner).
struct MultigridPreconditioner<'a, T: Scalar> {
    config: &'a SolverConfig<T>,
    shape: CycleShape,
}

impl<'a, T: Scalar> Preconditioner<T> for MultigridPreconditioner<'a, T> {
    fn apply(&mut self, mesh: &TensorMesh<T>, model: &Model<T>, residual: &EdgeField<T>) -> EdgeField<T> {
        let mut e = EdgeField::zeros(mesh);
        let mut scratch = ConvergenceTracker::new(self.config.tol);
        run_cycle(mesh, model, residual, &mut e, self.config, self.shape, &mut scratch);
        e
    }
}
