//! Model coefficients on the mesh: per-cell `eta_x, eta_y, eta_z` and
//! `1/mu_r`, plus the frequency/Laplace parameter they are built from.
//!
//! Grounded in `emg3d.utils.Model` (`original_source/emg3d/maps.py` and the
//! `restr()`/`model.case` handling in `original_source/emg3d/solver.py`).

use num_complex::Complex;

use crate::mesh::{Axis, TensorMesh};
use crate::scalar::Scalar;

/// The mapping used to go from a caller-supplied physical property to the
/// conductivity this model is built from. A closed variant per the
/// registry-avoidance design note in spec.md §9 — the solver itself never
/// inspects this enum, only `Model::from_properties` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapping {
    Conductivity,
    Log10Conductivity,
    LnConductivity,
    Resistivity,
    Log10Resistivity,
    LnResistivity,
}

impl Mapping {
    /// Convert one stored property value to conductivity (S/m).
    fn to_conductivity<T: Scalar>(self, value: T) -> T {
        match self {
            Mapping::Conductivity => value,
            Mapping::Log10Conductivity => T::from_f64(10.0).unwrap().powf(value),
            Mapping::LnConductivity => value.exp(),
            Mapping::Resistivity => T::one() / value,
            Mapping::Log10Resistivity => T::one() / T::from_f64(10.0).unwrap().powf(value),
            Mapping::LnResistivity => T::one() / value.exp(),
        }
    }
}

/// Which axes carry independently-specified anisotropy. Recovered from
/// `model.case` in `original_source/emg3d/maps.py` (0 = isotropic, 1 = HTI,
/// 2 = VTI, 3 = tri-axial); kept as a closed enum rather than an integer
/// code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anisotropy {
    Isotropic,
    /// Vertical transverse isotropy: `sigma_x == sigma_y != sigma_z`.
    Vti,
    /// Horizontal transverse isotropy: `sigma_y != sigma_x == sigma_z`.
    Hti,
    Triaxial,
}

/// The frequency or Laplace-domain parameter `s` the model was built for.
///
/// `s = -i*omega` in the frequency domain, `s` real in the Laplace domain
/// (spec.md §3). Ported from the sign-of-frequency dtype switch in
/// `original_source/emg3d/fields.py::Field.__init__`.
#[derive(Debug, Clone, Copy)]
pub enum Parameter<T: Scalar> {
    FrequencyDomain { hz: T },
    LaplaceDomain { s: T },
}

impl<T: Scalar> Parameter<T> {
    pub fn s(&self) -> Complex<T> {
        match *self {
            Parameter::FrequencyDomain { hz } => {
                let omega = T::from_f64(2.0).unwrap() * T::PI() * hz;
                Complex::new(T::zero(), -omega)
            }
            Parameter::LaplaceDomain { s } => Complex::new(s, T::zero()),
        }
    }
}

/// Per-cell model coefficients on a given mesh.
///
/// `eta_{x,y,z} = s * mu_0 * sigma_tilde * V` (cell volume folded in so that
/// restriction is a plain sum, see spec.md §3 rationale). `v_mu_r` defaults
/// to all-ones (`mu_r = 1`) when not supplied.
#[derive(Debug, Clone)]
pub struct Model<T: Scalar> {
    shape: [usize; 3],
    pub eta_x: Vec<Complex<T>>,
    pub eta_y: Vec<Complex<T>>,
    pub eta_z: Vec<Complex<T>>,
    pub v_mu_r: Vec<T>,
    pub anisotropy: Anisotropy,
}

const MU_0: f64 = 1.256_637_062_12e-6;

impl<T: Scalar> Model<T> {
    /// Build a model from per-cell physical properties. `sigma_y`/`sigma_z`
    /// of `None` default to `sigma_x` (isotropic in that axis).
    #[allow(clippy::too_many_arguments)]
    pub fn from_properties(
        mesh: &TensorMesh<T>,
        mapping: Mapping,
        sigma_x: &[T],
        sigma_y: Option<&[T]>,
        sigma_z: Option<&[T]>,
        mu_r: Option<&[T]>,
        s: Parameter<T>,
    ) -> Self {
        let shape = mesh.shape_cells();
        let n = shape.iter().product::<usize>();
        assert_eq!(sigma_x.len(), n, "sigma_x must have one entry per cell");

        let anisotropy = match (sigma_y.is_some(), sigma_z.is_some()) {
            (false, false) => Anisotropy::Isotropic,
            (false, true) => Anisotropy::Vti,
            (true, false) => Anisotropy::Hti,
            (true, true) => Anisotropy::Triaxial,
        };

        let vol = mesh.cell_volumes();
        let s_mu0 = s.s() * T::from_f64(MU_0).unwrap();

        let eta_from = |sigma: &[T]| -> Vec<Complex<T>> {
            sigma
                .iter()
                .zip(vol.iter())
                .map(|(&raw, &v)| s_mu0 * Complex::new(mapping.to_conductivity(raw) * v, T::zero()))
                .collect()
        };

        let eta_x = eta_from(sigma_x);
        let eta_y = sigma_y.map(eta_from).unwrap_or_else(|| eta_x.clone());
        let eta_z = sigma_z.map(eta_from).unwrap_or_else(|| eta_x.clone());

        let v_mu_r = match mu_r {
            Some(values) => values.iter().map(|&m| T::one() / m).collect(),
            None => vec![T::one(); n],
        };

        Self { shape, eta_x, eta_y, eta_z, v_mu_r, anisotropy }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    #[inline]
    pub fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        (iz * self.shape[1] + iy) * self.shape[0] + ix
    }

    /// Restrict this model to a coarser mesh by summing the 2, 4, or 8 fine
    /// cells that make up each coarse cell, per the axes in `axes`.
    /// `eta` is additive over sub-cells because it already carries the
    /// cell volume (spec.md §4.6); ported from the `restr()` closure in
    /// `original_source/emg3d/solver.py`.
    pub fn restrict(&self, axes: [bool; 3]) -> Self {
        let coarse_shape = {
            let mut s = self.shape;
            for axis in Axis::ALL {
                if axes[axis.index()] {
                    s[axis.index()] = s[axis.index()].div_ceil(2);
                }
            }
            s
        };

        let restrict_one = |fine: &[Complex<T>]| -> Vec<Complex<T>> {
            restrict_sum(fine, self.shape, coarse_shape, axes)
        };
        let restrict_real = |fine: &[T]| -> Vec<T> { restrict_sum(fine, self.shape, coarse_shape, axes) };

        Self {
            shape: coarse_shape,
            eta_x: restrict_one(&self.eta_x),
            eta_y: restrict_one(&self.eta_y),
            eta_z: restrict_one(&self.eta_z),
            v_mu_r: restrict_real(&self.v_mu_r),
            anisotropy: self.anisotropy,
        }
    }
}

/// Sum each fine cell into its coarse parent along the axes flagged in
/// `axes`, for any scalar-like `V: Copy + Add + Zero`.
fn restrict_sum<V>(fine: &[V], fine_shape: [usize; 3], coarse_shape: [usize; 3], axes: [bool; 3]) -> Vec<V>
where
    V: Copy + std::ops::Add<Output = V> + num_traits::Zero,
{
    let mut out = vec![V::zero(); coarse_shape.iter().product()];
    for iz in 0..fine_shape[2] {
        let cz = if axes[2] { iz / 2 } else { iz };
        for iy in 0..fine_shape[1] {
            let cy = if axes[1] { iy / 2 } else { iy };
            for ix in 0..fine_shape[0] {
                let cx = if axes[0] { ix / 2 } else { ix };
                let fine_idx = (iz * fine_shape[1] + iy) * fine_shape[0] + ix;
                let coarse_idx = (cz * coarse_shape[1] + cy) * coarse_shape[0] + cx;
                out[coarse_idx] = out[coarse_idx] + fine[fine_idx];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isotropic_defaults_fill_y_and_z() {
        let mesh = TensorMesh::new(vec![1.0; 4], vec![1.0; 4], vec![1.0; 4], [0.0; 3]).unwrap();
        let sigma = vec![2.0; 64];
        let model = Model::from_properties(
            &mesh,
            Mapping::Conductivity,
            &sigma,
            None,
            None,
            None,
            Parameter::LaplaceDomain { s: -1.0 },
        );
        assert_eq!(model.anisotropy, Anisotropy::Isotropic);
        assert_eq!(model.eta_x, model.eta_y);
        assert_eq!(model.eta_y, model.eta_z);
    }

    #[test]
    fn restriction_is_exactly_additive() {
        let mesh = TensorMesh::new(vec![1.0; 4], vec![1.0; 4], vec![1.0; 4], [0.0; 3]).unwrap();
        let sigma = vec![1.5; 64];
        let model = Model::from_properties(
            &mesh,
            Mapping::Conductivity,
            &sigma,
            None,
            None,
            None,
            Parameter::LaplaceDomain { s: -1.0 },
        );
        let coarse = model.restrict([true, true, true]);
        let fine_sum: Complex<f64> = model.eta_x.iter().copied().sum();
        let coarse_sum: Complex<f64> = coarse.eta_x.iter().copied().sum();
        assert!((fine_sum - coarse_sum).norm() < 1e-9 * fine_sum.norm().max(1.0));
    }

    #[test]
    fn resistivity_mapping_inverts_conductivity() {
        assert!((Mapping::Resistivity.to_conductivity(2.0_f64) - 0.5).abs() < 1e-12);
        assert!((Mapping::LnConductivity.to_conductivity(0.0_f64) - 1.0).abs() < 1e-12);
    }
}
