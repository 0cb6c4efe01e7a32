//! The discrete operator `A` of the governing curl-curl equation,
//! `A e = curl(v_mu_r curl e) + eta e`, and the residual `r = b - A e`.
//!
//! `A` is linear and complex-symmetric (not Hermitian) in the frequency
//! domain, as noted in spec.md §4.4; the smoothers and Krylov methods here
//! never assume more than that (matvec only).
//!
//! The `amat_x` routine in the Python original is a numba-jitted kernel not
//! present in `original_source` (only its call sites are). The stencil
//! below implements the standard second-order finite-volume curl-curl
//! discretization on a Yee grid consistent with the governing equation in
//! spec.md §1 and the edge layout of spec.md §3; it is a faithful-in-spirit
//! translation rather than a line-for-line port. See `DESIGN.md`.

use num_complex::Complex;

use crate::field::EdgeField;
use crate::mesh::{Axis, TensorMesh};
use crate::model::Model;
use crate::scalar::Scalar;

/// Distance between the centers of cells `i-1` and `i`: the dual-grid edge
/// length used as the denominator of a finite-volume derivative across the
/// face shared by those two cells.
#[inline]
pub(crate) fn center_dist<T: Scalar>(h: &[T], i: usize) -> T {
    let two = T::from_f64(2.0).unwrap();
    (h[i - 1] + h[i]) / two
}

/// `v_mu_r` of the cell at `(ix, iy, iz)`, clamped to the valid cell range
/// so callers do not need to special-case the mesh boundary (the
/// contribution is discarded there anyway because PEC zeroes the
/// tangential edge).
#[inline]
pub(crate) fn cell_v_mu_r<T: Scalar>(model: &Model<T>, ix: usize, iy: usize, iz: usize) -> T {
    let [nx, ny, nz] = model.shape();
    let cx = ix.min(nx - 1);
    let cy = iy.min(ny - 1);
    let cz = iz.min(nz - 1);
    model.v_mu_r[model.index(cx, cy, cz)]
}

/// Apply `A` to `e`, writing the result into `out`. `out` and `e` must both
/// be shaped for `mesh`. Tangential components on the outer faces are set
/// to zero afterwards (PEC, spec.md §3/§4.4).
pub fn apply<T: Scalar>(mesh: &TensorMesh<T>, model: &Model<T>, e: &EdgeField<T>, out: &mut EdgeField<T>) {
    apply_component(mesh, model, e, out, Axis::X);
    apply_component(mesh, model, e, out, Axis::Y);
    apply_component(mesh, model, e, out, Axis::Z);
    out.ensure_pec();
}

/// `r = b - A e`.
pub fn residual<T: Scalar>(
    mesh: &TensorMesh<T>,
    model: &Model<T>,
    source: &EdgeField<T>,
    e: &EdgeField<T>,
) -> EdgeField<T> {
    let mut ae = EdgeField::zeros(mesh);
    apply(mesh, model, e, &mut ae);
    source.sub(&ae)
}

/// The two axes transverse to `axis`, in a fixed (u, v) order used to keep
/// the two curl contributions symmetric between components.
pub(crate) fn transverse_axes(axis: Axis) -> (Axis, Axis) {
    match axis {
        Axis::X => (Axis::Y, Axis::Z),
        Axis::Y => (Axis::Z, Axis::X),
        Axis::Z => (Axis::X, Axis::Y),
    }
}

fn eta_for<'a, T: Scalar>(model: &'a Model<T>, axis: Axis) -> &'a [Complex<T>] {
    match axis {
        Axis::X => &model.eta_x,
        Axis::Y => &model.eta_y,
        Axis::Z => &model.eta_z,
    }
}

/// Place three local values onto their real `(x, y, z)` axes. Every field
/// component is stored by real axis regardless of its own orientation, so
/// this is the one function that turns a local `(along, u, v)` triple —
/// expressed relative to whichever axis is currently "self" — into the
/// `(ix, iy, iz)` a field's [`crate::field::EdgeView`] expects.
#[inline]
pub(crate) fn place(axis_a: Axis, a: usize, axis_b: Axis, b: usize, axis_c: Axis, c: usize) -> (usize, usize, usize) {
    let mut out = [0usize; 3];
    out[axis_a.index()] = a;
    out[axis_b.index()] = b;
    out[axis_c.index()] = c;
    (out[0], out[1], out[2])
}

/// Apply the `axis` component of `A` (curl-curl + mass term), writing into
/// `out`'s `axis` view.
///
/// Expanding `curl(v_mu_r curl E)_axis` gives four terms: two "self" terms
/// `-d/du(v_mu_r dE_axis/du) - d/dv(v_mu_r dE_axis/dv)` coupling an edge to
/// its four axial neighbours along the transverse axes, and two "cross"
/// terms `+d/du(v_mu_r dE_u/d_axis) + d/dv(v_mu_r dE_v/d_axis)` coupling it
/// to the eight neighbouring edges of the other two orientations (spec.md
/// §4.4). Both pairs share the same `v_mu_r` values at the same two
/// transverse faces, since they come from the same curl component.
fn apply_component<T: Scalar>(
    mesh: &TensorMesh<T>,
    model: &Model<T>,
    e: &EdgeField<T>,
    out: &mut EdgeField<T>,
    axis: Axis,
) {
    let shape = mesh.edge_shape(axis);
    let (u_axis, v_axis) = transverse_axes(axis);
    let h_along = mesh.h(axis);
    let hu = mesh.h(u_axis);
    let hv = mesh.h(v_axis);
    let eta = eta_for(model, axis);
    let e_self = e.view(axis);
    let e_u = e.view(u_axis);
    let e_v = e.view(v_axis);
    let zero = Complex::new(T::zero(), T::zero());

    let mut data = vec![zero; shape.iter().product()];

    let n_along = shape[axis.index()];
    let n_u = shape[u_axis.index()];
    let n_v = shape[v_axis.index()];

    for along in 0..n_along {
        for iu in 1..n_u.saturating_sub(1).max(1) {
            if n_u <= 2 {
                break;
            }
            for iv in 1..n_v.saturating_sub(1).max(1) {
                if n_v <= 2 {
                    break;
                }
                let (ix, iy, iz) = place(axis, along, u_axis, iu, v_axis, iv);
                let self_idx = (iz * shape[1] + iy) * shape[0] + ix;

                // v_mu_r at the two u-faces (shared by the self and cross
                // u-terms) and the two v-faces (shared by the self and
                // cross v-terms).
                let (cx_p, cy_p, cz_p) = place(axis, along, u_axis, iu, v_axis, iv);
                let (cx_m, cy_m, cz_m) = place(axis, along, u_axis, iu - 1, v_axis, iv);
                let mu_plus = cell_v_mu_r(model, cx_p, cy_p, cz_p);
                let mu_minus = cell_v_mu_r(model, cx_m, cy_m, cz_m);
                let hu_c_plus = center_dist(hu, iu + 1);
                let hu_c_minus = center_dist(hu, iu);
                let hu_n = hu[iu];

                let (cx_p2, cy_p2, cz_p2) = place(axis, along, v_axis, iv, u_axis, iu);
                let (cx_m2, cy_m2, cz_m2) = place(axis, along, v_axis, iv - 1, u_axis, iu);
                let mu_plus_v = cell_v_mu_r(model, cx_p2, cy_p2, cz_p2);
                let mu_minus_v = cell_v_mu_r(model, cx_m2, cy_m2, cz_m2);
                let hv_c_plus = center_dist(hv, iv + 1);
                let hv_c_minus = center_dist(hv, iv);
                let hv_n = hv[iv];

                // -- self term: -d/du( v_mu_r * dE_self/du )
                let (ix_up, iy_up, iz_up) = place(axis, along, u_axis, iu + 1, v_axis, iv);
                let (ix_dn, iy_dn, iz_dn) = place(axis, along, u_axis, iu - 1, v_axis, iv);
                let e_up = e_self.get(ix_up, iy_up, iz_up);
                let e_dn = e_self.get(ix_dn, iy_dn, iz_dn);
                let e_here = e_self.get(ix, iy, iz);

                let d_curl_u = (mu_plus * (e_up - e_here) / hu_c_plus.to_complex()
                    - mu_minus * (e_here - e_dn) / hu_c_minus.to_complex())
                    / hu_n.to_complex();

                // -- self term: -d/dv( v_mu_r * dE_self/dv )
                let (ix_up2, iy_up2, iz_up2) = place(axis, along, v_axis, iv + 1, u_axis, iu);
                let (ix_dn2, iy_dn2, iz_dn2) = place(axis, along, v_axis, iv - 1, u_axis, iu);
                let e_up2 = e_self.get(ix_up2, iy_up2, iz_up2);
                let e_dn2 = e_self.get(ix_dn2, iy_dn2, iz_dn2);

                let d_curl_v = (mu_plus_v * (e_up2 - e_here) / hv_c_plus.to_complex()
                    - mu_minus_v * (e_here - e_dn2) / hv_c_minus.to_complex())
                    / hv_n.to_complex();

                // -- cross term: +d/du( v_mu_r * dE_u/d_axis )
                let d_eu_dx_at = |u_cell: usize| -> Complex<T> {
                    let lo = place(axis, along, u_axis, u_cell, v_axis, iv);
                    let hi = place(axis, along + 1, u_axis, u_cell, v_axis, iv);
                    (e_u.get(hi.0, hi.1, hi.2) - e_u.get(lo.0, lo.1, lo.2)) / h_along[along].to_complex()
                };
                let cross_u = (mu_plus * d_eu_dx_at(iu) - mu_minus * d_eu_dx_at(iu - 1)) / hu_n.to_complex();

                // -- cross term: +d/dv( v_mu_r * dE_v/d_axis )
                let d_ev_dx_at = |v_cell: usize| -> Complex<T> {
                    let lo = place(axis, along, v_axis, v_cell, u_axis, iu);
                    let hi = place(axis, along + 1, v_axis, v_cell, u_axis, iu);
                    (e_v.get(hi.0, hi.1, hi.2) - e_v.get(lo.0, lo.1, lo.2)) / h_along[along].to_complex()
                };
                let cross_v = (mu_plus_v * d_ev_dx_at(iv) - mu_minus_v * d_ev_dx_at(iv - 1)) / hv_n.to_complex();

                let eta_idx = model.index(
                    ix.min(model.shape()[0] - 1),
                    iy.min(model.shape()[1] - 1),
                    iz.min(model.shape()[2] - 1),
                );
                let mass = eta[eta_idx] * e_here;

                data[self_idx] = mass - d_curl_u - d_curl_v + cross_u + cross_v;
            }
        }
    }

    let mut view = out.view_mut(axis);
    for iz in 0..shape[2] {
        for iy in 0..shape[1] {
            for ix in 0..shape[0] {
                let idx = (iz * shape[1] + iy) * shape[0] + ix;
                view.set(ix, iy, iz, data[idx]);
            }
        }
    }
}

trait ToComplex<T: Scalar> {
    fn to_complex(self) -> Complex<T>;
}

impl<T: Scalar> ToComplex<T> for T {
    fn to_complex(self) -> Complex<T> {
        Complex::new(self, T::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mapping, Parameter};

    fn homogeneous_mesh(n: usize) -> TensorMesh<f64> {
        TensorMesh::new(vec![1.0; n], vec![1.0; n], vec![1.0; n], [0.0; 3]).unwrap()
    }

    #[test]
    fn apply_preserves_pec() {
        let mesh = homogeneous_mesh(6);
        let model = Model::from_properties(
            &mesh,
            Mapping::Conductivity,
            &vec![1.0; 216],
            None,
            None,
            None,
            Parameter::LaplaceDomain { s: -1.0 },
        );
        let mut e = EdgeField::zeros(&mesh);
        for v in e.as_mut_slice().iter_mut() {
            *v = Complex::new(1.0, 0.0);
        }
        let mut out = EdgeField::zeros(&mesh);
        apply(&mesh, &model, &e, &mut out);

        let ex = out.view(Axis::X);
        assert_eq!(ex.get(0, 0, 0), Complex::new(0.0, 0.0));
    }

    #[test]
    fn zero_field_yields_zero_residual_for_zero_source() {
        let mesh = homogeneous_mesh(4);
        let model = Model::from_properties(
            &mesh,
            Mapping::Conductivity,
            &vec![1.0; 64],
            None,
            None,
            None,
            Parameter::LaplaceDomain { s: -1.0 },
        );
        let e = EdgeField::zeros(&mesh);
        let b = EdgeField::zeros(&mesh);
        let r = residual(&mesh, &model, &b, &e);
        assert_eq!(r.norm(), 0.0);
    }
}
