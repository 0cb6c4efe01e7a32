//! The real-valued scalar type backing every field, mesh width and model
//! coefficient in this crate.

use num_traits::{Float, FloatConst, FromPrimitive, NumAssign};
use std::fmt::{Debug, Display};

/// Bound satisfied by `f32` and `f64`; mirrors the role `diffsol::Scalar`
/// plays for its `Matrix`/`Vector` backends, but fixed to real floats since
/// this solver does not swap dense/sparse backends.
pub trait Scalar:
    Float + FloatConst + FromPrimitive + NumAssign + Debug + Display + Send + Sync + 'static
{
    /// Relative machine epsilon used by convergence and tolerance checks
    /// that must hold in double precision regardless of `Self`.
    const EPSILON: Self;
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
}
