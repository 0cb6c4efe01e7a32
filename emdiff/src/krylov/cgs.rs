//! Preconditioned CGS (conjugate gradient squared), grounded in the
//! `scipy.sparse.linalg.cgs(..., M=...)` branch of
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
pub fn cgs<T: Scalar, P: Preconditioner<T>>(
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
    let b_norm = b.norm().max(f64::EPSILON);
    tracker.record(r.norm());

    let mut rho_prev = Complex::new(T::one(), T::zero());
    let mut p = EdgeField::zeros(mesh);
    let mut u = EdgeField::zeros(mesh);
    let mut q = EdgeField::zeros(mesh);

    for iteration in 0..max_iter {
        let rho = r_hat.dot(&r);
        if rho.norm() < T::EPSILON.to_f64().unwrap_or(1e-300) {
            return Err(SolverError::KrylovFailure { method: "cgs", code: -1 });
        }

        if iteration == 0 {
            u = r.clone();
            p = r.clone();
        } else {
            let beta = rho / rho_prev;
            // u <- r + beta * q
            u = r.clone();
            u.add_scaled(&q, beta);
            // p <- u + beta * (q + beta * p)
            p.scale(beta);
            p.add_scaled(&q, Complex::new(T::one(), T::zero()));
            p.scale(beta);
            p.add_scaled(&u, Complex::new(T::one(), T::zero()));
        }

        let p_hat = preconditioner.apply(mesh, model, &p);
        let mut v_hat = EdgeField::zeros(mesh);
        apply(mesh, model, &p_hat, &mut v_hat);

        let sigma = r_hat.dot(&v_hat);
        let alpha = rho / sigma;

        // q <- u - alpha * v_hat
        q = u.clone();
        q.add_scaled(&v_hat, -alpha);

        // uq_hat <- preconditioner(u + q)
        let mut sum = u.clone();
        sum.add_scaled(&q, Complex::new(T::one(), T::zero()));
        let uq_hat = preconditioner.apply(mesh, model, &sum);

        x.add_scaled(&uq_hat, alpha);

        let mut applied = EdgeField::zeros(mesh);
        apply(mesh, model, &uq_hat, &mut applied);
        r.add_scaled(&applied, -alpha);

        let r_norm = r.norm();
        tracker.record(r_norm);
        if r_norm <= tol * b_norm {
            return Ok(());
        }

        rho_prev = rho;
        if iteration + 1 == max_iter {
            return Err(SolverError::KrylovFailure { method: "cgs", code: 1 });
        }
    }
    Ok(())
}
