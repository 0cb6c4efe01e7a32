//! Edge-centred vector field storage: one flat backing buffer plus three
//! shape-checked views recovering the `Ex`, `Ey`, `Ez` sub-blocks.
//!
//! This is the Rust expression of Design Note 2 in `spec.md` §9: the
//! Python original (`emg3d.utils.Field`) slices a single flat array by
//! shape at runtime; here the three shapes are fixed at construction time
//! from the mesh and the views are plain index-math, no dynamic reshaping.

use num_complex::Complex;

use crate::error::{Result, SolverError};
use crate::mesh::{Axis, TensorMesh};
use crate::scalar::Scalar;

/// Edge-centred field: `Ex`, `Ey`, `Ez` packed into one contiguous buffer.
#[derive(Debug, Clone)]
pub struct EdgeField<T: Scalar> {
    data: Vec<Complex<T>>,
    shapes: [[usize; 3]; 3],
    offsets: [usize; 3],
}

impl<T: Scalar> EdgeField<T> {
    pub fn zeros(mesh: &TensorMesh<T>) -> Self {
        let shapes = [mesh.edge_shape(Axis::X), mesh.edge_shape(Axis::Y), mesh.edge_shape(Axis::Z)];
        let mut offsets = [0usize; 3];
        let mut running = 0;
        for (axis_offset, shape) in offsets.iter_mut().zip(shapes.iter()) {
            *axis_offset = running;
            running += shape.iter().product::<usize>();
        }
        Self { data: vec![Complex::new(T::zero(), T::zero()); running], shapes, offsets }
    }

    pub fn from_vec(mesh: &TensorMesh<T>, data: Vec<Complex<T>>) -> Result<Self> {
        let expected = mesh.n_edges_total();
        if data.len() != expected {
            return Err(SolverError::EdgeFieldShapeMismatch { expected, found: data.len() });
        }
        let shapes = [mesh.edge_shape(Axis::X), mesh.edge_shape(Axis::Y), mesh.edge_shape(Axis::Z)];
        let mut offsets = [0usize; 3];
        let mut running = 0;
        for (axis_offset, shape) in offsets.iter_mut().zip(shapes.iter()) {
            *axis_offset = running;
            running += shape.iter().product::<usize>();
        }
        Ok(Self { data, shapes, offsets })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self, axis: Axis) -> [usize; 3] {
        self.shapes[axis.index()]
    }

    pub fn view(&self, axis: Axis) -> EdgeView<'_, T> {
        let shape = self.shapes[axis.index()];
        let start = self.offsets[axis.index()];
        let len = shape.iter().product::<usize>();
        EdgeView { shape, data: &self.data[start..start + len] }
    }

    pub fn view_mut(&mut self, axis: Axis) -> EdgeViewMut<'_, T> {
        let shape = self.shapes[axis.index()];
        let start = self.offsets[axis.index()];
        let len = shape.iter().product::<usize>();
        EdgeViewMut { shape, data: &mut self.data[start..start + len] }
    }

    pub fn as_slice(&self) -> &[Complex<T>] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex<T>] {
        &mut self.data
    }

    /// Euclidean (l2) norm over all edges, computed in double precision
    /// regardless of `T`, per spec.md §4.9.
    pub fn norm(&self) -> f64 {
        let sum_sq: f64 = self
            .data
            .iter()
            .map(|c| {
                let re = c.re.to_f64().unwrap();
                let im = c.im.to_f64().unwrap();
                re * re + im * im
            })
            .sum();
        sum_sq.sqrt()
    }

    pub fn add_scaled(&mut self, other: &Self, scale: Complex<T>) {
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += *b * scale;
        }
    }

    pub fn axpy(&mut self, alpha: Complex<T>, x: &Self) {
        for (y, x) in self.data.iter_mut().zip(x.data.iter()) {
            *y = *y + alpha * *x;
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        let data = self.data.iter().zip(other.data.iter()).map(|(a, b)| *a - *b).collect();
        Self { data, shapes: self.shapes, offsets: self.offsets }
    }

    pub fn scale(&mut self, factor: Complex<T>) {
        for v in self.data.iter_mut() {
            *v *= factor;
        }
    }

    /// Bilinear dot product `sum(a_i * b_i)`, without conjugation: the
    /// natural inner product for the complex-symmetric (not Hermitian)
    /// operator this field is used with (spec.md §4.4).
    pub fn dot(&self, other: &Self) -> Complex<T> {
        self.data.iter().zip(other.data.iter()).fold(Complex::new(T::zero(), T::zero()), |acc, (&a, &b)| acc + a * b)
    }

    pub fn conjugate_mut(&mut self) {
        for v in self.data.iter_mut() {
            *v = v.conj();
        }
    }

    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|c| c.re.is_finite() && c.im.is_finite())
    }

    /// Zero the tangential components on all six outer faces (PEC
    /// boundary), as required after every smoothing, restriction, and
    /// prolongation step (spec.md §8, Invariants).
    pub fn ensure_pec(&mut self) {
        for axis in Axis::ALL {
            let mut view = self.view_mut(axis);
            for other in Axis::ALL {
                if other == axis {
                    continue;
                }
                let last = view.shape[other.index()] - 1;
                view.zero_face(other, 0);
                view.zero_face(other, last);
            }
        }
    }
}

/// Read-only strided view of one edge-oriented component.
pub struct EdgeView<'a, T: Scalar> {
    shape: [usize; 3],
    data: &'a [Complex<T>],
}

impl<'a, T: Scalar> EdgeView<'a, T> {
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    #[inline]
    pub fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        (iz * self.shape[1] + iy) * self.shape[0] + ix
    }

    #[inline]
    pub fn get(&self, ix: usize, iy: usize, iz: usize) -> Complex<T> {
        self.data[self.index(ix, iy, iz)]
    }
}

/// Mutable strided view of one edge-oriented component.
pub struct EdgeViewMut<'a, T: Scalar> {
    shape: [usize; 3],
    data: &'a mut [Complex<T>],
}

impl<'a, T: Scalar> EdgeViewMut<'a, T> {
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    #[inline]
    pub fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        (iz * self.shape[1] + iy) * self.shape[0] + ix
    }

    #[inline]
    pub fn get(&self, ix: usize, iy: usize, iz: usize) -> Complex<T> {
        self.data[self.index(ix, iy, iz)]
    }

    #[inline]
    pub fn set(&mut self, ix: usize, iy: usize, iz: usize, value: Complex<T>) {
        let idx = self.index(ix, iy, iz);
        self.data[idx] = value;
    }

    /// Zero every entry on the face `axis = plane_index` (0 or
    /// `shape[axis]-1`), used by [`EdgeField::ensure_pec`].
    fn zero_face(&mut self, axis: Axis, plane_index: usize) {
        let shape = self.shape;
        match axis {
            Axis::X => {
                for iz in 0..shape[2] {
                    for iy in 0..shape[1] {
                        self.set(plane_index, iy, iz, Complex::new(T::zero(), T::zero()));
                    }
                }
            }
            Axis::Y => {
                for iz in 0..shape[2] {
                    for ix in 0..shape[0] {
                        self.set(ix, plane_index, iz, Complex::new(T::zero(), T::zero()));
                    }
                }
            }
            Axis::Z => {
                for iy in 0..shape[1] {
                    for ix in 0..shape[0] {
                        self.set(ix, iy, plane_index, Complex::new(T::zero(), T::zero()));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_mesh() -> TensorMesh<f64> {
        TensorMesh::new(vec![1.0; 4], vec![1.0; 4], vec![1.0; 4], [0.0; 3]).unwrap()
    }

    #[test]
    fn zeros_has_expected_total_length() {
        let mesh = small_mesh();
        let field = EdgeField::zeros(&mesh);
        assert_eq!(field.len(), mesh.n_edges_total());
    }

    #[test]
    fn ensure_pec_zeroes_only_outer_tangential_edges() {
        let mesh = small_mesh();
        let mut field = EdgeField::zeros(&mesh);
        for v in field.as_mut_slice().iter_mut() {
            *v = Complex::new(1.0, 0.0);
        }
        field.ensure_pec();

        let ex = field.view(Axis::X);
        // Ex is tangential on the y- and z-outer faces, but not on x-faces.
        assert_eq!(ex.get(0, 0, 0), Complex::new(0.0, 0.0));
        assert_eq!(ex.get(0, ex.shape()[1] - 1, 0), Complex::new(0.0, 0.0));
        assert_eq!(ex.get(0, 1, 1), Complex::new(1.0, 0.0));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mesh = small_mesh();
        let err = EdgeField::from_vec(&mesh, vec![Complex::new(0.0, 0.0); 3]).unwrap_err();
        assert!(matches!(err, SolverError::EdgeFieldShapeMismatch { .. }));
    }
}
