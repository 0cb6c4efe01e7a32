//! Tensor mesh: strictly positive cell widths per axis plus an origin.
//!
//! Mirrors `emg3d.utils.TensorMesh` (see `original_source/emg3d/meshes.py`
//! as referenced from `solver.py`): three 1-D width arrays and an origin are
//! the only stored state, everything else (node coordinates, cell centers,
//! cell volumes, edge shapes) is derived.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::scalar::Scalar;

/// One of the three mesh axes. Used throughout the crate to label
/// axis-indexed state (widths, semicoarsening direction, line relaxation)
/// without resorting to bare `0..3` indices everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// A rectilinear tensor mesh: positive cell widths per axis and an origin.
///
/// Invariant: every width is strictly positive, and every axis that will
/// ever be coarsened has at least 2 cells (checked at construction and
/// again after every [`TensorMesh::coarsen`]).
#[derive(Debug, Clone)]
pub struct TensorMesh<T: Scalar> {
    h: [Vec<T>; 3],
    origin: [T; 3],
}

impl<T: Scalar> TensorMesh<T> {
    /// Construct a tensor mesh from per-axis cell widths and an origin.
    ///
    /// Returns [`SolverError::NonPositiveCellWidth`] if any width is not
    /// strictly positive, or [`SolverError::GridDimensionTooSmall`] if an
    /// axis has fewer than 2 cells.
    pub fn new(h_x: Vec<T>, h_y: Vec<T>, h_z: Vec<T>, origin: [T; 3]) -> Result<Self> {
        let h = [h_x, h_y, h_z];
        for axis in Axis::ALL {
            let widths = &h[axis.index()];
            if widths.len() < 2 {
                return Err(SolverError::GridDimensionTooSmall {
                    axis,
                    count: widths.len(),
                });
            }
            for (index, &w) in widths.iter().enumerate() {
                if !(w > T::zero()) {
                    return Err(SolverError::NonPositiveCellWidth { axis, index });
                }
            }
        }
        Ok(Self { h, origin })
    }

    pub fn h(&self, axis: Axis) -> &[T] {
        &self.h[axis.index()]
    }

    pub fn n_cells(&self, axis: Axis) -> usize {
        self.h[axis.index()].len()
    }

    pub fn shape_cells(&self) -> [usize; 3] {
        [self.n_cells(Axis::X), self.n_cells(Axis::Y), self.n_cells(Axis::Z)]
    }

    pub fn origin(&self) -> [T; 3] {
        self.origin
    }

    /// Node coordinates along `axis`: `n_cells(axis) + 1` strictly
    /// increasing values starting at the origin.
    pub fn nodes(&self, axis: Axis) -> Vec<T> {
        let mut nodes = Vec::with_capacity(self.n_cells(axis) + 1);
        let mut x = self.origin[axis.index()];
        nodes.push(x);
        for &w in self.h(axis) {
            x += w;
            nodes.push(x);
        }
        nodes
    }

    /// Cell-center coordinates along `axis`.
    pub fn cell_centers(&self, axis: Axis) -> Vec<T> {
        let nodes = self.nodes(axis);
        let two = T::from_f64(2.0).unwrap();
        nodes.windows(2).map(|w| (w[0] + w[1]) / two).collect()
    }

    /// Per-cell volumes, `V[ix,iy,iz] = hx[ix] * hy[iy] * hz[iz]`, stored in
    /// the same `(x, y, z)` column-varies-fastest order used by
    /// [`crate::field::EdgeField`].
    pub fn cell_volumes(&self) -> Vec<T> {
        let [nx, ny, nz] = self.shape_cells();
        let mut vol = Vec::with_capacity(nx * ny * nz);
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    vol.push(self.h[0][ix] * self.h[1][iy] * self.h[2][iz]);
                }
            }
        }
        vol
    }

    /// Edge-array shape for the field parallel to `axis`: the axis itself
    /// keeps the cell count, the other two get a `+1` (node count).
    pub fn edge_shape(&self, axis: Axis) -> [usize; 3] {
        let mut shape = self.shape_cells();
        for other in Axis::ALL {
            if other != axis {
                shape[other.index()] += 1;
            }
        }
        shape
    }

    pub fn n_edges_total(&self) -> usize {
        Axis::ALL
            .iter()
            .map(|&a| self.edge_shape(a).iter().product::<usize>())
            .sum()
    }

    /// Coarsen this mesh by summing consecutive width pairs along the axes
    /// in `axes`; other axes are left unchanged. Corresponds to
    /// `original_source/emg3d/solver.py::restriction`'s
    /// `np.diff(grid.vectorNx[::rx])`-style mesh restriction.
    pub fn coarsen(&self, axes: [bool; 3]) -> Self {
        let mut h = self.h.clone();
        for axis in Axis::ALL {
            if axes[axis.index()] {
                h[axis.index()] = pairwise_sum(&h[axis.index()]);
            }
        }
        Self { h, origin: self.origin }
    }

    /// Largest `n` such that this axis's cell count is divisible by `2^n`
    /// with the final quotient still `>= 2`. Mirrors
    /// `MGParameters.max_level` in `original_source`.
    pub fn max_coarsening_level(&self, axis: Axis) -> u32 {
        let mut n = self.n_cells(axis);
        let mut level = 0;
        while n % 2 == 0 && n > 2 {
            level += 1;
            n /= 2;
        }
        level
    }
}

fn pairwise_sum<T: Scalar>(widths: &[T]) -> Vec<T> {
    widths.chunks(2).map(|pair| pair.iter().copied().fold(T::zero(), |a, b| a + b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_mesh(n: usize) -> TensorMesh<f64> {
        TensorMesh::new(vec![1.0; n], vec![1.0; n], vec![1.0; n], [0.0, 0.0, 0.0]).unwrap()
    }

    #[test]
    fn rejects_non_positive_widths() {
        let err = TensorMesh::new(vec![1.0, -1.0, 1.0, 1.0], vec![1.0; 4], vec![1.0; 4], [0.0; 3])
            .unwrap_err();
        assert!(matches!(err, SolverError::NonPositiveCellWidth { axis: Axis::X, index: 1 }));
    }

    #[test]
    fn rejects_too_few_cells() {
        let err = TensorMesh::new(vec![1.0], vec![1.0; 4], vec![1.0; 4], [0.0; 3]).unwrap_err();
        assert!(matches!(err, SolverError::GridDimensionTooSmall { axis: Axis::X, count: 1 }));
    }

    #[test]
    fn edge_shapes_match_yee_staggering() {
        let mesh = uniform_mesh(4);
        assert_eq!(mesh.edge_shape(Axis::X), [4, 5, 5]);
        assert_eq!(mesh.edge_shape(Axis::Y), [5, 4, 5]);
        assert_eq!(mesh.edge_shape(Axis::Z), [5, 5, 4]);
        assert_eq!(mesh.n_edges_total(), 3 * 4 * 5 * 5);
    }

    #[test]
    fn coarsening_sums_pairs_and_preserves_positivity() {
        let mesh = TensorMesh::new(
            vec![1.0, 2.0, 3.0, 4.0],
            vec![1.0; 4],
            vec![1.0; 4],
            [0.0; 3],
        )
        .unwrap();
        let coarse = mesh.coarsen([true, false, false]);
        assert_eq!(coarse.h(Axis::X), &[3.0, 7.0]);
        assert_eq!(coarse.h(Axis::Y), mesh.h(Axis::Y));
        assert!(coarse.h(Axis::X).iter().all(|&w| w > 0.0));
    }

    #[test]
    fn max_coarsening_level_counts_halvings() {
        let mesh = uniform_mesh(48);
        assert_eq!(mesh.max_coarsening_level(Axis::X), 4); // 48 -> 24 -> 12 -> 6 -> 3
        let mesh2 = uniform_mesh(32);
        assert_eq!(mesh2.max_coarsening_level(Axis::X), 4); // 32 -> 16 -> 8 -> 4 -> 2
    }
}
