//! Preconditioned restarted GMRES(m), grounded in the
//! `scipy.sparse.linalg.gmres(..., M=..., restart=...)` branch of
//! `original_source/emg3d/solver.py::solve`. The Arnoldi/Hessenberg least
//! squares step uses `nalgebra`'s dense complex matrices, the same crate
//! the teacher uses for its own small dense linear algebra.

use nalgebra::{DMatrix, DVector};
use num_complex::{Complex, Complex64};

use super::Preconditioner;
use crate::error::{Result, SolverError};
use crate::field::EdgeField;
use crate::mesh::TensorMesh;
use crate::model::Model;
use crate::operator::apply;
use crate::scalar::Scalar;
use crate::telemetry::ConvergenceTracker;

#[allow(clippy::too_many_arguments)]
pub fn gmres<T: Scalar, P: Preconditioner<T>>(
    mesh: &TensorMesh<T>,
    model: &Model<T>,
    b: &EdgeField<T>,
    x: &mut EdgeField<T>,
    preconditioner: &mut P,
    tol: f64,
    max_iter: usize,
    restart: usize,
    tracker: &mut ConvergenceTracker,
) -> Result<()> {
    let restart = restart.max(1);
    let b_norm = b.norm().max(f64::EPSILON);
    let mut total_iterations = 0;

    loop {
        let mut ax = EdgeField::zeros(mesh);
        apply(mesh, model, x, &mut ax);
        let r0 = b.sub(&ax);
        let beta = r0.norm();
        tracker.record(beta);
        if beta <= tol * b_norm {
            return Ok(());
        }

        let m = restart.min(max_iter - total_iterations).max(1);
        let mut basis: Vec<EdgeField<T>> = Vec::with_capacity(m + 1);
        let mut v0 = r0.clone();
        v0.scale(num_complex::Complex::new(T::one() / T::from_f64(beta).unwrap(), T::zero()));
        basis.push(v0);

        let mut h = DMatrix::<Complex64>::zeros(m + 1, m);
        let mut g = DVector::<Complex64>::zeros(m + 1);
        g[0] = Complex64::new(beta, 0.0);
        let mut cs = vec![Complex64::new(1.0, 0.0); m];
        let mut sn = vec![Complex64::new(0.0, 0.0); m];
        let mut preconditioned: Vec<EdgeField<T>> = Vec::with_capacity(m);

        let mut actual_k = 0;
        for k in 0..m {
            actual_k = k + 1;
            let z = preconditioner.apply(mesh, model, &basis[k]);
            preconditioned.push(z.clone());
            let mut w = EdgeField::zeros(mesh);
            apply(mesh, model, &z, &mut w);

            for i in 0..=k {
                let h_ik = basis[i].dot(&w);
                let h_ik64 = to_c64(h_ik);
                h[(i, k)] = h_ik64;
                w.add_scaled(&basis[i], -h_ik);
            }
            let w_norm = w.norm();
            h[(k + 1, k)] = Complex64::new(w_norm, 0.0);

            // Apply previous Givens rotations to the new column.
            for i in 0..k {
                let (c, s) = (cs[i], sn[i]);
                let h_ik = h[(i, k)];
                let h_i1k = h[(i + 1, k)];
                h[(i, k)] = c.conj() * h_ik + s.conj() * h_i1k;
                h[(i + 1, k)] = -s * h_ik + c * h_i1k;
            }

            let (c, s) = givens(h[(k, k)], h[(k + 1, k)]);
            cs[k] = c;
            sn[k] = s;
            h[(k, k)] = c.conj() * h[(k, k)] + s.conj() * h[(k + 1, k)];
            h[(k + 1, k)] = Complex64::new(0.0, 0.0);

            let g_k = g[k];
            g[k] = c.conj() * g_k;
            g[k + 1] = -s * g_k;

            if w_norm > T::EPSILON.to_f64().unwrap_or(1e-300) {
                let mut v_next = w;
                v_next.scale(num_complex::Complex::new(T::one() / T::from_f64(w_norm).unwrap(), T::zero()));
                basis.push(v_next);
            }

            if g[k + 1].norm() <= tol * b_norm as f64 || k + 1 >= m {
                break;
            }
        }

        // Solve the small upper-triangular system H(0..k, 0..k) y = g(0..k).
        let k = actual_k;
        let h_tri = h.view((0, 0), (k, k)).clone_owned();
        let g_vec = g.rows(0, k).clone_owned();
        let y = back_substitute(&h_tri, &g_vec);

        for i in 0..k {
            let coeff = Complex::<T>::new(
                T::from_f64(y[i].re).unwrap(),
                T::from_f64(y[i].im).unwrap(),
            );
            x.add_scaled(&preconditioned[i], coeff);
        }

        total_iterations += k;
        if total_iterations >= max_iter {
            let mut ax_final = EdgeField::zeros(mesh);
            apply(mesh, model, x, &mut ax_final);
            let final_norm = b.sub(&ax_final).norm();
            tracker.record(final_norm);
            if final_norm <= tol * b_norm {
                return Ok(());
            }
            return Err(SolverError::KrylovFailure { method: "gmres", code: 1 });
        }
    }
}

fn to_c64<T: Scalar>(value: num_complex::Complex<T>) -> Complex64 {
    Complex64::new(value.re.to_f64().unwrap_or(0.0), value.im.to_f64().unwrap_or(0.0))
}

fn givens(a: Complex64, b: Complex64) -> (Complex64, Complex64) {
    if b.norm() < 1e-300 {
        (Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0))
    } else {
        let denom = (a.norm_sqr() + b.norm_sqr()).sqrt();
        (a / denom, b / denom)
    }
}

/// Back-substitution for the small (size `k`) upper-triangular Hessenberg
/// least-squares system produced by Givens-rotated Arnoldi.
fn back_substitute(h: &DMatrix<Complex64>, g: &DVector<Complex64>) -> DVector<Complex64> {
    let k = h.nrows();
    let mut y = DVector::<Complex64>::zeros(k);
    for i in (0..k).rev() {
        let mut sum = g[i];
        for j in (i + 1)..k {
            sum -= h[(i, j)] * y[j];
        }
        y[i] = sum / h[(i, i)];
    }
    y
}
