//! Linear-elastic material operators (strain → stress).
//!
//! Two descriptions are supported:
//! - isotropic: Lamé parameters (λ, μ), `σ = λ tr(ε) I + 2μ ε`
//! - general: a full symmetric stiffness matrix D in Voigt form, `σ = c · D {ε}`
//!
//! Both may vary per element; a field with one point per element is
//! broadcast over the element's quadrature points.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::geometry::VolumeGeometry;
use crate::index::{ElementId, QuadraturePointId};
use crate::strain::{check_dimension, pairs, voigt_size};
use crate::tensor::{Shape, TensorBuffer};

/// Strain-to-stress map evaluated at one quadrature point.
pub trait MaterialOperator: Sync {
    /// Check coefficient fields against the geometry they are used with.
    fn validate(&self, vg: &VolumeGeometry) -> Result<()>;

    /// Stress in Voigt form for a Voigt strain at `(el, qp)`.
    fn stress(&self, el: ElementId, qp: QuadraturePointId, strain: &DVector<f64>) -> DVector<f64>;

    /// Tangent stiffness `∂σ/∂ε` at `(el, qp)` for spatial dimension `dim`.
    fn stiffness(&self, el: ElementId, qp: QuadraturePointId, dim: usize) -> DMatrix<f64>;
}

/// `σ = λ tr(ε) I + 2μ ε` on an engineering-shear Voigt strain.
///
/// The strain must have 3 (2D) or 6 (3D) components.
pub fn isotropic_stress(strain: &DVector<f64>, lam: f64, mu: f64) -> Result<DVector<f64>> {
    match strain.len() {
        3 | 6 => Ok(lame_stress(strain, lam, mu)),
        len => Err(KernelError::UnsupportedConfiguration(format!(
            "Voigt strain of length {len} (expected 3 or 6)"
        ))),
    }
}

/// [`isotropic_stress`] on a strain whose length is known to be 3 or 6.
fn lame_stress(strain: &DVector<f64>, lam: f64, mu: f64) -> DVector<f64> {
    let dim = if strain.len() == 3 { 2 } else { 3 };
    let trace: f64 = strain.rows(0, dim).sum();
    DVector::from_fn(strain.len(), |k, _| {
        if k < dim {
            lam * trace + 2.0 * mu * strain[k]
        } else {
            // σij = 2μ εij = μ γij
            mu * strain[k]
        }
    })
}

/// Isotropic stiffness matrix in Voigt form.
///
/// ```text
/// [λ+2μ  λ     λ     0  0  0]
/// [λ     λ+2μ  λ     0  0  0]
/// [λ     λ     λ+2μ  0  0  0]
/// [0     0     0     μ  0  0]
/// [0     0     0     0  μ  0]
/// [0     0     0     0  0  μ]
/// ```
///
/// The 2D matrix is the plane-strain restriction.
pub fn isotropic_stiffness(dim: usize, lam: f64, mu: f64) -> DMatrix<f64> {
    let sym = voigt_size(dim);
    let mut d = DMatrix::zeros(sym, sym);
    for i in 0..dim {
        for j in 0..dim {
            d[(i, j)] = lam;
        }
        d[(i, i)] += 2.0 * mu;
    }
    for k in dim..sym {
        d[(k, k)] = mu;
    }
    d
}

/// Isotropic material given by per-element (or per-point) λ and μ fields.
#[derive(Debug, Clone, Copy)]
pub struct IsotropicOperator<'a> {
    lam: &'a TensorBuffer,
    mu: &'a TensorBuffer,
}

impl<'a> IsotropicOperator<'a> {
    /// `lam` and `mu` are `(n_el, 1 | n_qp, 1, 1)`.
    pub fn new(lam: &'a TensorBuffer, mu: &'a TensorBuffer) -> Self {
        Self { lam, mu }
    }

    fn parameters(&self, el: ElementId, qp: QuadraturePointId) -> (f64, f64) {
        (self.lam.scalar_at(el, qp), self.mu.scalar_at(el, qp))
    }
}

impl MaterialOperator for IsotropicOperator<'_> {
    fn validate(&self, vg: &VolumeGeometry) -> Result<()> {
        self.lam.check_field("lam", vg.n_el(), vg.n_qp(), 1, 1)?;
        self.mu.check_field("mu", vg.n_el(), vg.n_qp(), 1, 1)
    }

    fn stress(&self, el: ElementId, qp: QuadraturePointId, strain: &DVector<f64>) -> DVector<f64> {
        let (lam, mu) = self.parameters(el, qp);
        lame_stress(strain, lam, mu)
    }

    fn stiffness(&self, el: ElementId, qp: QuadraturePointId, dim: usize) -> DMatrix<f64> {
        let (lam, mu) = self.parameters(el, qp);
        isotropic_stiffness(dim, lam, mu)
    }
}

/// General anisotropic material `c · D`.
///
/// Only the extent of D is checked; symmetry and definiteness are modelling
/// assumptions of the caller.
#[derive(Debug, Clone, Copy)]
pub struct GeneralOperator<'a> {
    coef: f64,
    mtx_d: &'a TensorBuffer,
}

impl<'a> GeneralOperator<'a> {
    /// `mtx_d` is `(n_el, 1 | n_qp, sym, sym)`.
    pub fn new(coef: f64, mtx_d: &'a TensorBuffer) -> Self {
        Self { coef, mtx_d }
    }
}

impl MaterialOperator for GeneralOperator<'_> {
    fn validate(&self, vg: &VolumeGeometry) -> Result<()> {
        let sym = vg.sym();
        self.mtx_d
            .check_field("mtx_d", vg.n_el(), vg.n_qp(), sym, sym)
    }

    fn stress(&self, el: ElementId, qp: QuadraturePointId, strain: &DVector<f64>) -> DVector<f64> {
        self.mtx_d.block_at(el, qp) * strain * self.coef
    }

    fn stiffness(&self, el: ElementId, qp: QuadraturePointId, _dim: usize) -> DMatrix<f64> {
        self.mtx_d.block_at(el, qp) * self.coef
    }
}

/// Lamé parameters of an isotropic material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LameParameters {
    pub lam: f64,
    pub mu: f64,
}

impl LameParameters {
    pub fn new(lam: f64, mu: f64) -> Self {
        Self { lam, mu }
    }

    /// From Young's modulus E and Poisson's ratio ν, with -1 < ν < 1/2.
    pub fn from_young_poisson(young: f64, poisson: f64) -> Result<Self> {
        if !(poisson > -1.0 && poisson < 0.5) || !(young > 0.0) {
            return Err(KernelError::UnsupportedConfiguration(format!(
                "E = {young}, nu = {poisson} is not a valid isotropic material"
            )));
        }
        let mu = young / (2.0 * (1.0 + poisson));
        let lam = young * poisson / ((1.0 + poisson) * (1.0 - 2.0 * poisson));
        Ok(Self { lam, mu })
    }

    pub fn young_modulus(&self) -> f64 {
        self.mu * (3.0 * self.lam + 2.0 * self.mu) / (self.lam + self.mu)
    }

    pub fn poisson_ratio(&self) -> f64 {
        self.lam / (2.0 * (self.lam + self.mu))
    }

    /// Bulk modulus K = λ + 2μ/3.
    pub fn bulk_modulus(&self) -> f64 {
        self.lam + 2.0 * self.mu / 3.0
    }

    pub fn stiffness(&self, dim: usize) -> DMatrix<f64> {
        isotropic_stiffness(dim, self.lam, self.mu)
    }

    /// Uniform `(lam, mu)` fields for `n_el` elements.
    pub fn fields(&self, n_el: usize) -> (TensorBuffer, TensorBuffer) {
        (
            TensorBuffer::from_scalars(&vec![self.lam; n_el]),
            TensorBuffer::from_scalars(&vec![self.mu; n_el]),
        )
    }
}

/// Voigt strain descriptor of the unit fiber dyad `d ⊗ d`.
///
/// Shear slots carry the engineering factor, `2 di dj`, like any other strain.
pub fn fiber_strain(direction: &DVector<f64>) -> Result<DVector<f64>> {
    check_dimension(direction.len())?;
    let norm = direction.norm();
    if !(norm > 0.0) || !norm.is_finite() {
        return Err(KernelError::UnsupportedConfiguration(format!(
            "fiber direction of norm {norm}"
        )));
    }
    let d = direction / norm;
    let pairs = pairs(d.len());
    Ok(DVector::from_iterator(
        pairs.len(),
        pairs
            .iter()
            .map(|&(i, j)| if i == j { d[i] * d[i] } else { 2.0 * d[i] * d[j] }),
    ))
}

/// Fiber strain field `scale · (d ⊗ d)` for [`crate::terms::dw_lin_strain_fib`].
///
/// `directions` is `(n_el, n_qp, dim, 1)` and `scale` is
/// `(n_el, 1 | n_qp, 1, 1)`; the result is `(n_el, n_qp, sym, 1)`.
pub fn fiber_strain_field(directions: &TensorBuffer, scale: &TensorBuffer) -> Result<TensorBuffer> {
    let shape = directions.shape();
    let dim = shape.rows;
    check_dimension(dim)?;
    directions.check_shape("directions", shape.n_el, shape.n_qp, dim, 1)?;
    scale.check_field("scale", shape.n_el, shape.n_qp, 1, 1)?;

    let sym = voigt_size(dim);
    let mut data = Vec::with_capacity(shape.n_el * shape.n_qp * sym);
    for el in ElementId::range(shape.n_el) {
        for qp in QuadraturePointId::range(shape.n_qp) {
            let m = fiber_strain(&directions.vector(el, qp))? * scale.scalar_at(el, qp);
            data.extend_from_slice(m.as_slice());
        }
    }
    TensorBuffer::from_vec(Shape::new(shape.n_el, shape.n_qp, sym, 1), data)
}
