//! Multigrid cycle shape (V/W/F) and the semicoarsening/line-relaxation
//! direction schedule, plus the recursive cycle controller itself.
//!
//! Grounded in `original_source/emg3d/solver.py::multigrid` (the
//! `level`/`cycmax`/`new_cycmax` recursion) and the `xrdir`/`yrdir`/`zrdir`
//! to `rdir` derivation table used by `smoothing()` and `restriction()`.

use crate::config::{LineRelaxation, Semicoarsening, SolverConfig};
use crate::field::EdgeField;
use crate::mesh::{Axis, TensorMesh};
use crate::model::Model;
use crate::operator::{apply, residual};
use crate::scalar::Scalar;
use crate::smoother::{smooth, LineDirection};
use crate::telemetry::ConvergenceTracker;
use crate::transfer::{prolong_and_correct, restrict};

/// The overall shape of one multigrid iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleShape {
    V,
    W,
    F,
}

/// A ring of semicoarsening (or line-relaxation) directions cycled through
/// one per multigrid level, restarting at the top of the ring once
/// exhausted. Mirrors the multi-digit `semicoarsening`/`linerelaxation`
/// option parsed in `original_source`'s `MGParameters.__post_init__`.
#[derive(Debug, Clone)]
pub struct DirectionCycle<D> {
    options: Vec<D>,
    position: usize,
}

impl<D: Clone> DirectionCycle<D> {
    pub fn new(options: Vec<D>) -> Self {
        assert!(!options.is_empty(), "a direction cycle needs at least one option");
        Self { options, position: 0 }
    }

    pub fn current(&self) -> D {
        self.options[self.position].clone()
    }

    pub fn advance(&mut self) {
        self.position = (self.position + 1) % self.options.len();
    }
}

/// Which coarsening axes are active at the current level, as derived from
/// [`Semicoarsening`]. Falls back to coarsening every halvable axis when
/// the requested direction has nothing left to coarsen.
fn coarsening_axes(mesh: &TensorMesh<impl Scalar>, semicoarsening: Semicoarsening) -> [bool; 3] {
    let halvable = |axis: Axis| mesh.n_cells(axis) > 2 && mesh.n_cells(axis) % 2 == 0;

    let requested = match semicoarsening {
        Semicoarsening::Off => [true; 3],
        Semicoarsening::Cycle(axes) => {
            let mut active = [false; 3];
            for axis in axes {
                active[axis.index()] = true;
            }
            active
        }
    };

    let mut axes = [false; 3];
    for axis in Axis::ALL {
        axes[axis.index()] = requested[axis.index()] && halvable(axis);
    }
    if axes == [false; 3] {
        for axis in Axis::ALL {
            axes[axis.index()] = halvable(axis);
        }
    }
    axes
}

fn line_direction(relaxation: LineRelaxation) -> LineDirection {
    match relaxation {
        LineRelaxation::Off => LineDirection::Point,
        LineRelaxation::Axis(axis) => LineDirection::Line(axis),
        LineRelaxation::Pair(a, b) => LineDirection::Lines(a, b),
        LineRelaxation::All => LineDirection::AllLines,
    }
}

/// One full multigrid cycle (V, W, or F) applied to `e` in place against
/// `A e = b`, on the finest mesh/model. Returns the residual norm after the
/// cycle.
#[allow(clippy::too_many_arguments)]
pub fn run_cycle<T: Scalar>(
    mesh: &TensorMesh<T>,
    model: &Model<T>,
    b: &EdgeField<T>,
    e: &mut EdgeField<T>,
    config: &SolverConfig<T>,
    shape: CycleShape,
    tracker: &mut ConvergenceTracker,
) {
    let max_level = Axis::ALL.iter().map(|&a| mesh.max_coarsening_level(a)).max().unwrap_or(0);
    let mut semicoarsening = DirectionCycle::new(config.semicoarsening.options());
    let mut linerelaxation = DirectionCycle::new(config.linerelaxation.options());

    level(
        mesh,
        model,
        b,
        e,
        config,
        shape,
        0,
        max_level,
        &mut semicoarsening,
        &mut linerelaxation,
        tracker,
    );
}

/// Recursive cycle body. `depth` is the current coarsening depth (0 = the
/// finest grid supplied by the caller); `max_level` bounds how deep the
/// recursion may still go. `cycmax`/bookkeeping for W/F cycles is folded
/// into the shape of the recursion itself: an F-cycle's first descent runs
/// like a W-cycle-widened V, then every subsequent pass at this depth is a
/// plain V, matching the `new_cycmax` reset in `original_source`.
#[allow(clippy::too_many_arguments)]
fn level<T: Scalar>(
    mesh: &TensorMesh<T>,
    model: &Model<T>,
    b: &EdgeField<T>,
    e: &mut EdgeField<T>,
    config: &SolverConfig<T>,
    shape: CycleShape,
    depth: u32,
    max_level: u32,
    semicoarsening: &mut DirectionCycle<Semicoarsening>,
    linerelaxation: &mut DirectionCycle<LineRelaxation>,
    tracker: &mut ConvergenceTracker,
) {
    let direction = line_direction(linerelaxation.current());
    linerelaxation.advance();

    smooth(mesh, model, b, e, direction, config.nu_pre);

    if depth >= max_level {
        // Coarsest grid: relax a few extra times in place of an exact
        // solve, matching the `original_source` default of doing nothing
        // special on the coarsest grid beyond additional smoothing.
        smooth(mesh, model, b, e, direction, config.nu_coarse);
        tracker.record(residual(mesh, model, b, e).norm());
        return;
    }

    let sc = semicoarsening.current();
    semicoarsening.advance();
    let axes = coarsening_axes(mesh, sc);
    if axes == [false; 3] {
        smooth(mesh, model, b, e, direction, config.nu_coarse);
        tracker.record(residual(mesh, model, b, e).norm());
        return;
    }

    let coarse_mesh = mesh.coarsen(axes);
    let coarse_model = model.restrict(axes);
    let fine_residual = residual(mesh, model, b, e);
    let coarse_b = restrict(mesh, &coarse_mesh, &fine_residual, axes);
    let mut coarse_e = EdgeField::zeros(&coarse_mesh);

    let descents = match shape {
        CycleShape::V => 1,
        CycleShape::W => 2,
        CycleShape::F => {
            if depth == 0 {
                2
            } else {
                1
            }
        }
    };

    for visit in 0..descents {
        let descent_shape = if shape == CycleShape::F && visit == 0 {
            CycleShape::F
        } else {
            CycleShape::V
        };
        level(
            &coarse_mesh,
            &coarse_model,
            &coarse_b,
            &mut coarse_e,
            config,
            descent_shape,
            depth + 1,
            max_level,
            semicoarsening,
            linerelaxation,
            tracker,
        );
    }

    prolong_and_correct(mesh, &coarse_mesh, &coarse_e, e, axes);
    smooth(mesh, model, b, e, direction, config.nu_post);
    let mut applied = EdgeField::zeros(mesh);
    apply(mesh, model, e, &mut applied);
    tracker.record(b.sub(&applied).norm());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_cycle_wraps_around() {
        let mut cycle = DirectionCycle::new(vec![Semicoarsening::Off]);
        assert_eq!(cycle.current(), Semicoarsening::Off);
        cycle.advance();
        assert_eq!(cycle.current(), Semicoarsening::Off);
    }
}
