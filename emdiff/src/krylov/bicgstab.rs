//! Preconditioned BiCGSTAB, the default Krylov accelerator, grounded in the
//! `scipy.sparse.linalg.bicgstab(..., M=...)` call in
//! `original_source/emg3d/solver.py::solve`.

use num_complex::Complex;

use super::Preconditioner;
use crate::error::{Result, SolverError};
use crate::field::EdgeField;
use crate::mesh::TensorMesh;
use crate::model::Model;
use crate::operator::apply;
use crate::scalar::Scalar;
use crate::telemetry::ConvergenceTracker;

#[allow(clippy::too_many_arguments)]
pub fn bicgstab<T: Scalar, P: Preconditioner<T>>(
    mesh: &TensorMesh<T>,
    model: &Model<T>,
    b: &EdgeField<T>,
    x: &mut EdgeField<T>,
    preconditioner: &mut P,
    tol: f64,
    max_iter: usize,
    tracker: &mut ConvergenceTracker,
) -> Result<()> {
    let mut ax = EdgeField::zeros(mesh);
    apply(mesh, model, x, &mut ax);
    let mut r = b.sub(&ax);
    let r_hat = r.clone();

    let mut rho_prev = Complex::new(T::one(), T::zero());
    let mut alpha = Complex::new(T::one(), T::zero());
    let mut omega = Complex::new(T::one(), T::zero());
    let mut v = EdgeField::zeros(mesh);
    let mut p = EdgeField::zeros(mesh);

    let b_norm = b.norm().max(f64::EPSILON);
    tracker.record(r.norm());

    for iteration in 0..max_iter {
        let rho = r_hat.dot(&r);
        if rho.norm() < T::EPSILON.to_f64().unwrap_or(1e-300) {
            return Err(SolverError::KrylovFailure { method: "bicgstab", code: -1 });
        }
        let beta = (rho / rho_prev) * (alpha / omega);

        // p <- r + beta * (p - omega * v)
        p.add_scaled(&v, -omega);
        p.scale(beta);
        p.add_scaled(&r, Complex::new(T::one(), T::zero()));

        let p_hat = preconditioner.apply(mesh, model, &p);
        apply(mesh, model, &p_hat, &mut v);
        alpha = rho / r_hat.dot(&v);

        let mut s = r.clone();
        s.add_scaled(&v, -alpha);

        if s.norm() <= tol * b_norm {
            x.add_scaled(&p_hat, alpha);
            tracker.record(s.norm());
            return Ok(());
        }

        let s_hat = preconditioner.apply(mesh, model, &s);
        let mut t = EdgeField::zeros(mesh);
        apply(mesh, model, &s_hat, &mut t);
        let t_dot_t = t.dot(&t).re.to_f64().unwrap_or(0.0);
        omega = if t_dot_t > 0.0 { t.dot(&s) / t.dot(&t) } else { Complex::new(T::zero(), T::zero()) };

        x.add_scaled(&p_hat, alpha);
        x.add_scaled(&s_hat, omega);

        r = s;
        r.add_scaled(&t, -omega);
        let r_norm = r.norm();
        tracker.record(r_norm);

        if r_norm <= tol * b_norm {
            return Ok(());
        }
        if omega.norm() < T::EPSILON.to_f64().unwrap_or(1e-300) {
            return Err(SolverError::KrylovFailure { method: "bicgstab", code: -2 });
        }
        rho_prev = rho;

        if iteration + 1 == max_iter {
            return Err(SolverError::KrylovFailure { method: "bicgstab", code: 1 });
        }
    }
    Ok(())
}
