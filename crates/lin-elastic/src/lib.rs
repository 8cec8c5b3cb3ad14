//! Quadrature-point kernels for linear-elasticity weak-form terms.
//!
//! This crate computes per-element contributions only: residual vectors,
//! tangent stiffness matrices and element-level evaluations. Meshes, basis
//! functions, global sparse assembly and the solver loop live elsewhere; the
//! kernels consume precomputed [`VolumeGeometry`] and caller-owned
//! [`TensorBuffer`]s.
//!
//! ## Data flow
//!
//! ```text
//! geometry + field → strain (Voigt) → material operator → stress
//!                  → Σ_q w det Bᵀ(·) → element residual / tangent
//! ```
//!
//! ## Operations
//!
//! | Operation | Output |
//! |---|---|
//! | `dw_lin_elastic_iso` | isotropic residual or tangent |
//! | `dw_lin_elastic` | general-D residual or tangent |
//! | `d_lin_elastic` | scalar pairing `ε_vᵀ D ε_u` per element |
//! | `dw_lin_prestress` | residual of a prescribed stress |
//! | `dw_lin_strain_fib` | residual of a fiber strain |
//! | `de_cauchy_strain` / `de_cauchy_stress` | integrated, averaged or pointwise fields |
//! | `dq_cauchy_strain` | strain at points from a global state vector |
//!
//! All of them are available as free functions in [`terms`], [`evaluate`]
//! and [`strain`], and as methods of [`TermEvaluator`].

pub mod config;
pub mod connectivity;
pub mod error;
pub mod evaluate;
pub mod evaluator;
pub mod geometry;
pub mod index;
pub mod material;
pub mod strain;
pub mod tensor;
pub mod terms;

pub use config::KernelConfig;
pub use connectivity::Connectivity;
pub use error::{KernelError, Result, status_of};
pub use evaluate::{ReductionMode, d_lin_elastic, de_cauchy_strain, de_cauchy_stress};
pub use evaluator::TermEvaluator;
pub use geometry::VolumeGeometry;
pub use index::{Axis, ElementId, QuadraturePointId};
pub use material::{
    GeneralOperator, IsotropicOperator, LameParameters, MaterialOperator, fiber_strain,
    fiber_strain_field, isotropic_stiffness, isotropic_stress,
};
pub use strain::{
    cauchy_strain_from_gradient, check_dimension, dq_cauchy_strain, strain_displacement, voigt_size,
};
pub use tensor::{ElementBlockMut, Shape, TensorBuffer};
pub use terms::{
    DiffMode, Evaluation, dw_lin_elastic, dw_lin_elastic_iso, dw_lin_prestress,
    dw_lin_strain_fib, residual_shape, tangent_shape,
};
