//! Solver configuration: cycle shape, semicoarsening/line-relaxation
//! schedules, smoothing counts, convergence thresholds, and the optional
//! Krylov accelerator.
//!
//! Grounded in `original_source/emg3d/solver.py::MGParameters.__post_init__`,
//! which accepts `semicoarsening`/`linerelaxation` as `bool | int | str` and
//! normalizes them into a cycling schedule; serialized with `serde` the way
//! the teacher crate derives `Serialize`/`Deserialize` on its parameter
//! structs for reproducible runs.

use serde::{Deserialize, Serialize};

use crate::cycle::CycleShape;
use crate::error::{Result, SolverError};
use crate::mesh::Axis;
use crate::scalar::Scalar;

/// Semicoarsening schedule: either coarsen every halvable axis each level
/// (`Off`, the default and fastest-converging choice for an isotropic
/// grid), or cycle through a fixed sequence of axis subsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Semicoarsening {
    Off,
    Cycle(Vec<Axis>),
}

impl Semicoarsening {
    /// Parse the `False | True | 1..3 | "123"`-style option from
    /// `original_source`. A single digit selects one axis; multiple digits
    /// cycle through that many single-axis steps in the given order.
    pub fn parse(digits: &str) -> Result<Self> {
        if digits.is_empty() {
            return Ok(Semicoarsening::Off);
        }
        let mut axes = Vec::with_capacity(digits.len());
        for ch in digits.chars() {
            let axis = match ch {
                '1' => Axis::X,
                '2' => Axis::Y,
                '3' => Axis::Z,
                _ => {
                    return Err(SolverError::InvalidCycleName { name: digits.to_string() });
                }
            };
            axes.push(axis);
        }
        Ok(Semicoarsening::Cycle(axes))
    }

    pub fn options(&self) -> Vec<Semicoarsening> {
        match self {
            Semicoarsening::Off => vec![Semicoarsening::Off],
            Semicoarsening::Cycle(axes) => {
                axes.iter().map(|&a| Semicoarsening::Cycle(vec![a])).collect()
            }
        }
    }
}

/// Line-relaxation schedule, mirroring [`Semicoarsening`]'s shape but
/// independently configurable (spec.md §3, `MGParameters`). The full `ldir`
/// enumeration is `0` (point), `1..=3` (single axis), `4..=6` (a pair of
/// axes relaxed in sequence: yz, xz, xy), and `7` (all three).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineRelaxation {
    Off,
    Axis(Axis),
    Pair(Axis, Axis),
    All,
}

impl LineRelaxation {
    pub fn parse(digits: &str) -> Result<Self> {
        match digits {
            "" => Ok(LineRelaxation::Off),
            "123" | "1+2+3" => Ok(LineRelaxation::All),
            "1" => Ok(LineRelaxation::Axis(Axis::X)),
            "2" => Ok(LineRelaxation::Axis(Axis::Y)),
            "3" => Ok(LineRelaxation::Axis(Axis::Z)),
            "4" | "23" => Ok(LineRelaxation::Pair(Axis::Y, Axis::Z)),
            "5" | "13" => Ok(LineRelaxation::Pair(Axis::X, Axis::Z)),
            "6" | "12" => Ok(LineRelaxation::Pair(Axis::X, Axis::Y)),
            other => Err(SolverError::InvalidCycleName { name: other.to_string() }),
        }
    }

    pub fn options(&self) -> Vec<LineRelaxation> {
        vec![self.clone()]
    }
}

/// Outer Krylov accelerator using the multigrid cycle as a right
/// preconditioner. `Lgmres` and `Gcrotmk` are recognized names but return
/// [`SolverError::UnsupportedKrylovMethod`] at validation time (see
/// `DESIGN.md`): no complex matrix-free implementation of either is
/// available in this crate's dependency stack, and hand-rolling both is
/// out of proportion with the rest of the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SslSolver {
    Bicgstab,
    Cgs,
    Gmres { restart: usize },
    Lgmres,
    Gcrotmk,
}

impl SslSolver {
    pub fn name(&self) -> &'static str {
        match self {
            SslSolver::Bicgstab => "bicgstab",
            SslSolver::Cgs => "cgs",
            SslSolver::Gmres { .. } => "gmres",
            SslSolver::Lgmres => "lgmres",
            SslSolver::Gcrotmk => "gcrotmk",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, SslSolver::Lgmres | SslSolver::Gcrotmk)
    }
}

/// Full solver configuration for one call to [`crate::solve`].
///
/// `cycle` and `sslsolver` are independent: a `cycle` alone runs pure
/// multigrid, an `sslsolver` alone runs unpreconditioned Krylov, and both
/// together run Krylov with multigrid as a right preconditioner (spec.md
/// §6). At least one must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Scalar")]
pub struct SolverConfig<T: Scalar> {
    pub cycle: Option<CycleShapeConfig>,
    pub sslsolver: Option<SslSolver>,
    pub semicoarsening: Semicoarsening,
    pub linerelaxation: LineRelaxation,
    pub nu_pre: usize,
    pub nu_post: usize,
    pub nu_coarse: usize,
    pub max_cycles: usize,
    pub tol: f64,
    #[serde(skip)]
    pub _marker: std::marker::PhantomData<T>,
}

/// Serializable mirror of [`CycleShape`] (kept separate so `cycle.rs` stays
/// free of `serde` derives, matching how the teacher keeps wire/config
/// types apart from its solver internals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleShapeConfig {
    V,
    W,
    F,
}

impl From<CycleShapeConfig> for CycleShape {
    fn from(value: CycleShapeConfig) -> Self {
        match value {
            CycleShapeConfig::V => CycleShape::V,
            CycleShapeConfig::W => CycleShape::W,
            CycleShapeConfig::F => CycleShape::F,
        }
    }
}

impl<T: Scalar> Default for SolverConfig<T> {
    fn default() -> Self {
        Self {
            cycle: Some(CycleShapeConfig::F),
            sslsolver: None,
            semicoarsening: Semicoarsening::Off,
            linerelaxation: LineRelaxation::Off,
            nu_pre: 2,
            nu_post: 2,
            nu_coarse: 4,
            max_cycles: 50,
            tol: 1e-6,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: Scalar> SolverConfig<T> {
    /// Validate flag compatibility, matching `MGParameters.__post_init__`'s
    /// eager checks: at least one of `cycle`/`sslsolver` must be set, and
    /// any Krylov method chosen must be one this crate implements.
    pub fn validate(&self) -> Result<()> {
        if self.cycle.is_none() && self.sslsolver.is_none() {
            return Err(SolverError::IncompatibleSolverFlags);
        }
        if let Some(method) = self.sslsolver {
            if !method.is_supported() {
                return Err(SolverError::UnsupportedKrylovMethod { name: method.name() });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicoarsening_parses_multi_digit_cycle() {
        let sc = Semicoarsening::parse("132").unwrap();
        assert_eq!(sc, Semicoarsening::Cycle(vec![Axis::X, Axis::Z, Axis::Y]));
    }

    #[test]
    fn semicoarsening_rejects_invalid_digit() {
        assert!(Semicoarsening::parse("9").is_err());
    }

    #[test]
    fn default_config_is_valid() {
        let config = SolverConfig::<f64>::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn neither_cycle_nor_sslsolver_is_rejected() {
        let mut config = SolverConfig::<f64>::default();
        config.cycle = None;
        config.sslsolver = None;
        assert!(matches!(config.validate(), Err(SolverError::IncompatibleSolverFlags)));
    }

    #[test]
    fn lgmres_is_rejected_as_unsupported() {
        let mut config = SolverConfig::<f64>::default();
        config.sslsolver = Some(SslSolver::Lgmres);
        assert!(matches!(config.validate(), Err(SolverError::UnsupportedKrylovMethod { .. })));
    }
}
