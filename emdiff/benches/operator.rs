use criterion::{black_box, criterion_group, criterion_main, Criterion};

use emdiff::field::EdgeField;
use emdiff::mesh::TensorMesh;
use emdiff::model::{Mapping, Model, Parameter};
use emdiff::operator::apply;

fn homogeneous_mesh(n: usize) -> TensorMesh<f64> {
    TensorMesh::new(vec![1.0; n], vec![1.0; n], vec![1.0; n], [0.0; 3]).unwrap()
}

fn bench_apply(c: &mut Criterion) {
    let mesh = homogeneous_mesh(32);
    let n_cells = 32 * 32 * 32;
    let model = Model::from_properties(
        &mesh,
        Mapping::Conductivity,
        &vec![1.0; n_cells],
        None,
        None,
        None,
        Parameter::LaplaceDomain { s: -1.0 },
    );
    let e = EdgeField::zeros(&mesh);
    let mut out = EdgeField::zeros(&mesh);

    c.bench_function("operator_apply_32cubed", |b| {
        b.iter(|| apply(&mesh, &model, black_box(&e), &mut out));
    });
}

criterion_group!(benches, bench_apply);
criterion_main!(benches);
