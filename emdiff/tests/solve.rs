//! End-to-end scenarios from spec.md §8: a handful of small, concrete
//! solves plus the invariants every solve is expected to honor regardless
//! of configuration.

use emdiff::config::{LineRelaxation, Semicoarsening, SslSolver};
use emdiff::field::EdgeField;
use emdiff::mesh::TensorMesh;
use emdiff::model::{Mapping, Model, Parameter};
use emdiff::{solve, ExitCode, SolverConfig};

fn uniform_mesh(n: usize) -> TensorMesh<f64> {
    TensorMesh::new(vec![100.0; n], vec![100.0; n], vec![100.0; n], [0.0; 3]).unwrap()
}

fn fullspace_model(mesh: &TensorMesh<f64>, s: Parameter<f64>) -> Model<f64> {
    let n = mesh.shape_cells().iter().product();
    let sigma = vec![1.0; n];
    Model::from_properties(mesh, Mapping::Conductivity, &sigma, None, None, None, s)
}

fn impulse_source(mesh: &TensorMesh<f64>) -> EdgeField<f64> {
    let mut source = EdgeField::zeros(mesh);
    let shape = mesh.edge_shape(emdiff::Axis::X);
    let mut view = source.view_mut(emdiff::Axis::X);
    let center = (shape[0] / 2, shape[1] / 2, shape[2] / 2);
    view.set(center.0, center.1, center.2, num_complex::Complex::new(1.0, 0.0));
    source
}

#[test]
fn fullspace_isotropic_frequency_domain_converges() {
    let mesh = uniform_mesh(16);
    let s = Parameter::FrequencyDomain { hz: 1.0 };
    let model = fullspace_model(&mesh, s);
    let source = impulse_source(&mesh);
    let config = SolverConfig { max_cycles: 7, tol: 1e-9, ..SolverConfig::default() };

    let outcome = solve(&mesh, &model, s, &source, None, &config).unwrap();
    assert!(outcome.info.relative_residual() < 1e-6);
    assert!(outcome.field.all_finite());
}

#[test]
fn laplace_domain_is_internally_consistent_with_frequency_domain_shape() {
    let mesh = uniform_mesh(8);
    let s = Parameter::LaplaceDomain { s: 1.0 };
    let model = fullspace_model(&mesh, s);
    let source = impulse_source(&mesh);
    let config = SolverConfig::default();

    let outcome = solve(&mesh, &model, s, &source, None, &config).unwrap();
    assert!(outcome.field.all_finite());
    // Laplace domain is solved with no sign-convention conjugation, so the
    // field stays whatever the solver itself produces: finite and, for a
    // symmetric fullspace, real-dominated rather than NaN.
    assert!(outcome.field.norm() >= 0.0);
}

#[test]
fn semicoarsening_and_line_relaxation_with_bicgstab_on_a_stretched_grid() {
    let h_x: Vec<f64> = (0..16).map(|i| 50.0 + i as f64 * 10.0).collect();
    let mesh = TensorMesh::new(h_x, vec![100.0; 16], vec![100.0; 16], [0.0; 3]).unwrap();
    let s = Parameter::FrequencyDomain { hz: 2.0 };
    let model = fullspace_model(&mesh, s);
    let source = impulse_source(&mesh);

    let config = SolverConfig {
        sslsolver: Some(SslSolver::Bicgstab),
        semicoarsening: Semicoarsening::parse("123").unwrap(),
        linerelaxation: LineRelaxation::parse("123").unwrap(),
        max_cycles: 30,
        tol: 1e-8,
        ..SolverConfig::default()
    };

    let outcome = solve(&mesh, &model, s, &source, None, &config).unwrap();
    assert!(outcome.field.all_finite());
}

#[test]
fn initial_field_already_converged_runs_zero_iterations() {
    let mesh = uniform_mesh(8);
    let s = Parameter::LaplaceDomain { s: 1.0 };
    let model = fullspace_model(&mesh, s);
    let source = EdgeField::zeros(&mesh);
    let config = SolverConfig::default();

    let outcome = solve(&mesh, &model, s, &source, Some(EdgeField::zeros(&mesh)), &config).unwrap();
    assert_eq!(outcome.info.iterations, 0);
    assert_eq!(outcome.info.exit_code, ExitCode::Converged);
}

#[test]
fn solution_field_satisfies_pec_on_every_outer_face() {
    let mesh = uniform_mesh(8);
    let s = Parameter::FrequencyDomain { hz: 1.0 };
    let model = fullspace_model(&mesh, s);
    let source = impulse_source(&mesh);
    let config = SolverConfig::default();

    let outcome = solve(&mesh, &model, s, &source, None, &config).unwrap();
    let ex = outcome.field.view(emdiff::Axis::X);
    let shape = ex.shape();
    for iz in 0..shape[2] {
        for ix in 0..shape[0] {
            assert_eq!(ex.get(ix, 0, iz).norm(), 0.0);
            assert_eq!(ex.get(ix, shape[1] - 1, iz).norm(), 0.0);
        }
    }
}

#[test]
fn zero_source_yields_zero_field() {
    let mesh = uniform_mesh(8);
    let s = Parameter::LaplaceDomain { s: 1.0 };
    let model = fullspace_model(&mesh, s);
    let source = EdgeField::zeros(&mesh);
    let config = SolverConfig::default();

    let outcome = solve(&mesh, &model, s, &source, None, &config).unwrap();
    assert_eq!(outcome.field.norm(), 0.0);
}

#[test]
fn zero_frequency_is_rejected() {
    let mesh = uniform_mesh(8);
    let s = Parameter::LaplaceDomain { s: 0.0 };
    let model = fullspace_model(&mesh, s);
    let source = impulse_source(&mesh);
    let config = SolverConfig::default();

    let err = solve(&mesh, &model, s, &source, None, &config).unwrap_err();
    assert!(matches!(err, emdiff::SolverError::ZeroFrequency));
}

#[test]
fn scaling_the_source_rescales_the_field() {
    let mesh = uniform_mesh(8);
    let s = Parameter::LaplaceDomain { s: 1.0 };
    let model = fullspace_model(&mesh, s);
    let source = impulse_source(&mesh);
    let config = SolverConfig { tol: 1e-10, max_cycles: 30, ..SolverConfig::default() };

    let base = solve(&mesh, &model, s, &source, None, &config).unwrap();

    let alpha = 3.0;
    let mut scaled_source = EdgeField::zeros(&mesh);
    scaled_source.add_scaled(&source, num_complex::Complex::new(alpha, 0.0));
    let scaled = solve(&mesh, &model, s, &scaled_source, None, &config).unwrap();

    let mut expected = base.field.clone();
    expected.scale(num_complex::Complex::new(alpha, 0.0));
    let diff = scaled.field.sub(&expected);
    assert!(diff.norm() < 1e-6 * expected.norm().max(1.0));
}

#[test]
fn f_cycle_residual_shrinks_monotonically_after_the_first_two_cycles() {
    let mesh = uniform_mesh(8);
    let s = Parameter::FrequencyDomain { hz: 1.0 };
    let model = fullspace_model(&mesh, s);
    let source = impulse_source(&mesh);
    let config = SolverConfig { max_cycles: 7, tol: 0.0, ..SolverConfig::default() };

    let outcome = solve(&mesh, &model, s, &source, None, &config).unwrap();
    let history = &outcome.info.residual_history;
    assert!(history.len() >= 4, "expected several recorded cycles, got {history:?}");
    for window in history[2..].windows(2) {
        assert!(window[1] <= window[0] * 0.5 + 1e-14, "residual did not halve: {window:?}");
    }
}

#[test]
fn field_is_antisymmetric_in_ex_and_symmetric_in_ey_ez_for_a_mirror_symmetric_setup() {
    // h_x is a palindrome and the origin is centred, so the mesh is
    // mirror-symmetric about x=0; an isotropic homogeneous model is
    // trivially symmetric, and a single Ez impulse placed exactly on the
    // x=0 node is its own mirror image (spec.md §8, scenario 6).
    let half = [50.0, 60.0, 70.0, 80.0];
    let mut h_x = half.to_vec();
    h_x.extend(half.iter().rev());
    let total: f64 = h_x.iter().sum();
    let mesh = TensorMesh::new(h_x, vec![100.0; 8], vec![100.0; 8], [-total / 2.0, 0.0, 0.0]).unwrap();

    let s = Parameter::LaplaceDomain { s: 1.0 };
    let model = fullspace_model(&mesh, s);

    let mut source = EdgeField::zeros(&mesh);
    let ez_shape = mesh.edge_shape(emdiff::Axis::Z);
    let center_x = ez_shape[0] / 2; // node grid, exactly on x = 0
    let mut view = source.view_mut(emdiff::Axis::Z);
    view.set(center_x, ez_shape[1] / 2, ez_shape[2] / 2, num_complex::Complex::new(1.0, 0.0));

    let config = SolverConfig { tol: 1e-10, max_cycles: 30, ..SolverConfig::default() };
    let outcome = solve(&mesh, &model, s, &source, None, &config).unwrap();

    let ex = outcome.field.view(emdiff::Axis::X);
    let ex_shape = ex.shape();
    let (iy, iz) = (ex_shape[1] / 2, ex_shape[2] / 2);
    for ix in 0..ex_shape[0] {
        let mirror = ex_shape[0] - 1 - ix;
        let a = ex.get(ix, iy, iz).re;
        let b = ex.get(mirror, iy, iz).re;
        assert!((a + b).abs() < 1e-10, "Ex not antisymmetric at ix={ix}: {a} vs {b}");
    }

    for (axis, shape_axis) in [(emdiff::Axis::Y, emdiff::Axis::Y), (emdiff::Axis::Z, emdiff::Axis::Z)] {
        let _ = shape_axis;
        let view = outcome.field.view(axis);
        let shape = view.shape();
        let (iy, iz) = (shape[1] / 2, shape[2] / 2);
        for ix in 0..shape[0] {
            let mirror = shape[0] - 1 - ix;
            let a = view.get(ix, iy, iz).re;
            let b = view.get(mirror, iy, iz).re;
            assert!((a - b).abs() < 1e-10, "{axis:?} not symmetric at ix={ix}: {a} vs {b}");
        }
    }
}

#[test]
fn lgmres_is_rejected_before_any_work_is_done() {
    let mesh = uniform_mesh(8);
    let s = Parameter::FrequencyDomain { hz: 1.0 };
    let model = fullspace_model(&mesh, s);
    let source = impulse_source(&mesh);
    let config = SolverConfig { sslsolver: Some(SslSolver::Lgmres), ..SolverConfig::default() };

    let err = solve(&mesh, &model, s, &source, None, &config).unwrap_err();
    assert!(matches!(err, emdiff::SolverError::UnsupportedKrylovMethod { name: "lgmres" }));
}
