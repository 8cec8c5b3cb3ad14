//! Weak-form terms of linear elasticity.
//!
//! Each term produces one element-local block per element:
//!
//! - residual `(n_el, 1, dim * n_ep, 1)`:
//!   `r_e = Σ_q w_q det_eq Bᵀ σ_eq`
//! - tangent `(n_el, 1, dim * n_ep, dim * n_ep)`:
//!   `K_e = Σ_q w_q det_eq Bᵀ D_eq B`
//!
//! with B from [`crate::strain::strain_displacement`]. Residual and tangent of the same
//! material share the operator, so `K_e u_e` equals the residual evaluated
//! on the strain of `u_e`.
//!
//! Every operation validates all shapes and the geometry of every element
//! before writing, and overwrites the whole output on success.

use nalgebra::{DMatrix, DVector};

use crate::config::KernelConfig;
use crate::error::{KernelError, Result};
use crate::geometry::VolumeGeometry;
use crate::index::{ElementId, QuadraturePointId};
use crate::material::{GeneralOperator, IsotropicOperator, MaterialOperator};
use crate::strain::b_matrix;
use crate::tensor::{Shape, TensorBuffer};

/// Raw residual/tangent selector as passed by flag-based callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMode {
    Residual,
    Tangent,
}

impl DiffMode {
    /// `0` selects the residual, `1` the tangent.
    pub fn from_flag(flag: i32) -> Result<Self> {
        match flag {
            0 => Ok(DiffMode::Residual),
            1 => Ok(DiffMode::Tangent),
            other => Err(KernelError::UnsupportedConfiguration(format!(
                "diff flag {other} (expected 0 or 1)"
            ))),
        }
    }
}

/// What an assembly term should produce.
#[derive(Debug, Clone, Copy)]
pub enum Evaluation<'a> {
    /// Element residual from the given strain field `(n_el, n_qp, sym, 1)`.
    Residual { strain: &'a TensorBuffer },
    /// Element tangent stiffness.
    Tangent,
}

impl<'a> Evaluation<'a> {
    pub fn from_mode(mode: DiffMode, strain: &'a TensorBuffer) -> Self {
        match mode {
            DiffMode::Residual => Evaluation::Residual { strain },
            DiffMode::Tangent => Evaluation::Tangent,
        }
    }

    pub fn from_flag(flag: i32, strain: &'a TensorBuffer) -> Result<Self> {
        Ok(Self::from_mode(DiffMode::from_flag(flag)?, strain))
    }

    /// Output shape this evaluation expects for `vg`.
    pub fn output_shape(&self, vg: &VolumeGeometry) -> Shape {
        match self {
            Evaluation::Residual { .. } => residual_shape(vg),
            Evaluation::Tangent => tangent_shape(vg),
        }
    }
}

pub fn residual_shape(vg: &VolumeGeometry) -> Shape {
    Shape::new(vg.n_el(), 1, vg.n_dof(), 1)
}

pub fn tangent_shape(vg: &VolumeGeometry) -> Shape {
    Shape::new(vg.n_el(), 1, vg.n_dof(), vg.n_dof())
}

/// `Σ_q w det Bᵀ s(el, q)` for a stress-like field `s`.
fn integrate_stress<F>(
    out: &mut TensorBuffer,
    vg: &VolumeGeometry,
    config: &KernelConfig,
    stress_at: F,
) -> Result<()>
where
    F: Fn(ElementId, QuadraturePointId) -> DVector<f64> + Sync,
{
    out.check_shape("out", vg.n_el(), 1, vg.n_dof(), 1)?;
    vg.check_elements(config.jacobian_threshold()?)?;

    let (n_qp, n_dof) = (vg.n_qp(), vg.n_dof());
    out.fill_elements(config.parallel, |el, block| {
        let mut acc = DVector::zeros(n_dof);
        for qp in QuadraturePointId::range(n_qp) {
            let b = b_matrix(&vg.gradients(el, qp));
            acc += b.tr_mul(&stress_at(el, qp)) * vg.integration_factor(el, qp);
        }
        block.set_vector(QuadraturePointId(0), &acc);
    });
    Ok(())
}

/// Element residuals `Σ w det Bᵀ σ(ε)` for a strain field.
pub fn evaluate_residual<M: MaterialOperator>(
    out: &mut TensorBuffer,
    strain: &TensorBuffer,
    material: &M,
    vg: &VolumeGeometry,
    config: &KernelConfig,
) -> Result<()> {
    strain.check_shape("strain", vg.n_el(), vg.n_qp(), vg.sym(), 1)?;
    material.validate(vg)?;
    integrate_stress(out, vg, config, |el, qp| {
        material.stress(el, qp, &strain.vector(el, qp))
    })
}

/// Element tangents `Σ w det Bᵀ D B`.
pub fn evaluate_tangent<M: MaterialOperator>(
    out: &mut TensorBuffer,
    material: &M,
    vg: &VolumeGeometry,
    config: &KernelConfig,
) -> Result<()> {
    let (n_el, n_qp, n_dof, dim) = (vg.n_el(), vg.n_qp(), vg.n_dof(), vg.dim());
    material.validate(vg)?;
    out.check_shape("out", n_el, 1, n_dof, n_dof)?;
    vg.check_elements(config.jacobian_threshold()?)?;

    out.fill_elements(config.parallel, |el, block| {
        let mut acc = DMatrix::zeros(n_dof, n_dof);
        for qp in QuadraturePointId::range(n_qp) {
            let b = b_matrix(&vg.gradients(el, qp));
            let db = material.stiffness(el, qp, dim) * &b;
            acc += b.tr_mul(&db) * vg.integration_factor(el, qp);
        }
        block.set(QuadraturePointId(0), &acc);
    });
    Ok(())
}

fn evaluate<M: MaterialOperator>(
    out: &mut TensorBuffer,
    evaluation: Evaluation<'_>,
    material: &M,
    vg: &VolumeGeometry,
    config: &KernelConfig,
) -> Result<()> {
    match evaluation {
        Evaluation::Residual { strain } => evaluate_residual(out, strain, material, vg, config),
        Evaluation::Tangent => evaluate_tangent(out, material, vg, config),
    }
}

/// Isotropic linear elasticity with per-element `lam`, `mu` fields.
pub fn dw_lin_elastic_iso(
    out: &mut TensorBuffer,
    evaluation: Evaluation<'_>,
    lam: &TensorBuffer,
    mu: &TensorBuffer,
    vg: &VolumeGeometry,
    config: &KernelConfig,
) -> Result<()> {
    evaluate(out, evaluation, &IsotropicOperator::new(lam, mu), vg, config)
}

/// General linear elasticity `coef · D`.
pub fn dw_lin_elastic(
    out: &mut TensorBuffer,
    coef: f64,
    evaluation: Evaluation<'_>,
    mtx_d: &TensorBuffer,
    vg: &VolumeGeometry,
    config: &KernelConfig,
) -> Result<()> {
    evaluate(out, evaluation, &GeneralOperator::new(coef, mtx_d), vg, config)
}

/// Residual of a prescribed stress field, `Σ w det Bᵀ σ₀`.
///
/// `stress` is `(n_el, 1 | n_qp, sym, 1)`. There is no tangent: the term
/// does not depend on the displacement.
pub fn dw_lin_prestress(
    out: &mut TensorBuffer,
    stress: &TensorBuffer,
    vg: &VolumeGeometry,
    config: &KernelConfig,
) -> Result<()> {
    stress.check_field("stress", vg.n_el(), vg.n_qp(), vg.sym(), 1)?;
    integrate_stress(out, vg, config, |el, qp| stress.vector_at(el, qp))
}

/// Residual of a fiber strain `Σ w det Bᵀ D m`.
///
/// `mat` is the fiber strain descriptor `(n_el, 1 | n_qp, sym, 1)`, usually
/// built with [`crate::material::fiber_strain_field`]; `mtx_d` is
/// `(n_el, 1 | n_qp, sym, sym)`.
pub fn dw_lin_strain_fib(
    out: &mut TensorBuffer,
    mtx_d: &TensorBuffer,
    mat: &TensorBuffer,
    vg: &VolumeGeometry,
    config: &KernelConfig,
) -> Result<()> {
    let sym = vg.sym();
    mtx_d.check_field("mtx_d", vg.n_el(), vg.n_qp(), sym, sym)?;
    mat.check_field("mat", vg.n_el(), vg.n_qp(), sym, 1)?;
    integrate_stress(out, vg, config, |el, qp| {
        mtx_d.block_at(el, qp) * mat.vector_at(el, qp)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::isotropic_stiffness;

    /// Single unit right triangle (P1), one point.
    fn triangle(det: f64) -> VolumeGeometry {
        let bf = TensorBuffer::uniform(
            1,
            1,
            &DMatrix::from_row_slice(1, 3, &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]),
        );
        let grads = DMatrix::from_row_slice(2, 3, &[-1.0, 1.0, 0.0, -1.0, 0.0, 1.0]);
        let bf_gm = TensorBuffer::uniform(1, 1, &grads);
        let det = TensorBuffer::from_scalars(&[det]);
        VolumeGeometry::new(bf, bf_gm, det, vec![0.5]).unwrap()
    }

    #[test]
    fn diff_flags() {
        assert_eq!(DiffMode::from_flag(0).unwrap(), DiffMode::Residual);
        assert_eq!(DiffMode::from_flag(1).unwrap(), DiffMode::Tangent);
        assert_eq!(DiffMode::from_flag(2).unwrap_err().status(), 4);
    }

    #[test]
    fn triangle_stiffness_matches_closed_form() {
        // K = A Bᵀ D B for a constant-strain triangle, A = 1/2
        let vg = triangle(1.0);
        let (lam, mu) = (TensorBuffer::from_scalars(&[1.0]), TensorBuffer::from_scalars(&[0.5]));
        let mut out = TensorBuffer::zeros(tangent_shape(&vg));
        dw_lin_elastic_iso(
            &mut out,
            Evaluation::Tangent,
            &lam,
            &mu,
            &vg,
            &KernelConfig::sequential(),
        )
        .unwrap();

        let b = crate::strain::strain_displacement(&vg.gradients(ElementId(0), QuadraturePointId(0))).unwrap();
        let expected = b.transpose() * isotropic_stiffness(2, 1.0, 0.5) * &b * 0.5;
        let k = out.block(ElementId(0), QuadraturePointId(0));
        assert!((k - expected).norm() < 1e-14);
    }

    #[test]
    fn tangent_rows_sum_to_zero() {
        // Rigid translations produce no force
        let vg = triangle(1.0);
        let mtx_d = TensorBuffer::uniform(1, 1, &isotropic_stiffness(2, 3.0, 2.0));
        let mut out = TensorBuffer::zeros(tangent_shape(&vg));
        dw_lin_elastic(&mut out, 1.0, Evaluation::Tangent, &mtx_d, &vg, &KernelConfig::default())
            .unwrap();
        let k = out.block(ElementId(0), QuadraturePointId(0));
        let translation_x = DVector::from_vec(vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        assert!((k * translation_x).norm() < 1e-13);
    }

    #[test]
    fn prestress_of_uniform_stress_balances() {
        // Σ of nodal forces from a constant stress over a closed element is zero
        let vg = triangle(1.0);
        let stress = TensorBuffer::from_vec(Shape::new(1, 1, 3, 1), vec![2.0, -1.0, 0.5]).unwrap();
        let mut out = TensorBuffer::zeros(residual_shape(&vg));
        dw_lin_prestress(&mut out, &stress, &vg, &KernelConfig::sequential()).unwrap();
        let r = out.vector(ElementId(0), QuadraturePointId(0));
        let fx: f64 = (0..3).map(|n| r[2 * n]).sum();
        let fy: f64 = (0..3).map(|n| r[2 * n + 1]).sum();
        assert!(fx.abs() < 1e-14 && fy.abs() < 1e-14);
        // node 1 (x = 1) carries A * σxx * ∂N1/∂x = 0.5 * 2.0
        assert!((r[2] - 1.0).abs() < 1e-14);
    }

    #[test]
    fn fiber_term_is_residual_of_fiber_strain() {
        let vg = triangle(1.0);
        let mtx_d = TensorBuffer::uniform(1, 1, &isotropic_stiffness(2, 1.0, 1.0));
        let mat = TensorBuffer::from_vec(Shape::new(1, 1, 3, 1), vec![1.0, 0.0, 0.0]).unwrap();

        let mut fib = TensorBuffer::zeros(residual_shape(&vg));
        dw_lin_strain_fib(&mut fib, &mtx_d, &mat, &vg, &KernelConfig::sequential()).unwrap();

        let mut elastic = TensorBuffer::zeros(residual_shape(&vg));
        dw_lin_elastic(
            &mut elastic,
            1.0,
            Evaluation::Residual { strain: &mat },
            &mtx_d,
            &vg,
            &KernelConfig::sequential(),
        )
        .unwrap();
        assert_eq!(fib, elastic);
    }

    #[test]
    fn wrong_output_shape_is_rejected_before_writing() {
        let vg = triangle(1.0);
        let lam = TensorBuffer::from_scalars(&[1.0]);
        let mut out = TensorBuffer::zeros(residual_shape(&vg));
        let err = dw_lin_elastic_iso(
            &mut out,
            Evaluation::Tangent,
            &lam,
            &lam,
            &vg,
            &KernelConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.status(), 1);
        assert!(out.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn zero_jacobian_fails_every_assembly_term() {
        let vg = triangle(0.0);
        let config = KernelConfig::default();
        let scalars = TensorBuffer::from_scalars(&[1.0]);
        let mtx_d = TensorBuffer::uniform(1, 1, &isotropic_stiffness(2, 1.0, 1.0));
        let strain = TensorBuffer::zeros(Shape::new(1, 1, 3, 1));
        let mut res = TensorBuffer::zeros(residual_shape(&vg));
        let mut tan = TensorBuffer::zeros(tangent_shape(&vg));

        let results = [
            dw_lin_elastic_iso(&mut tan, Evaluation::Tangent, &scalars, &scalars, &vg, &config),
            dw_lin_elastic_iso(
                &mut res,
                Evaluation::Residual { strain: &strain },
                &scalars,
                &scalars,
                &vg,
                &config,
            ),
            dw_lin_elastic(&mut tan, 1.0, Evaluation::Tangent, &mtx_d, &vg, &config),
            dw_lin_prestress(&mut res, &strain, &vg, &config),
            dw_lin_strain_fib(&mut res, &mtx_d, &strain, &vg, &config),
        ];
        for result in results {
            assert!(matches!(result, Err(KernelError::DegenerateGeometry { .. })));
        }
    }
}
