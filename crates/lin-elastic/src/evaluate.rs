//! Element-level evaluations for post-processing and energy functionals.

use nalgebra::DVector;

use crate::config::KernelConfig;
use crate::error::{KernelError, Result};
use crate::geometry::VolumeGeometry;
use crate::index::{ElementId, QuadraturePointId};
use crate::material::{GeneralOperator, MaterialOperator};
use crate::tensor::{Shape, TensorBuffer};

/// How a quadrature-point field is reduced per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionMode {
    /// `Σ_q w det f`, one block per element
    Integrated,
    /// Integrated value divided by the element volume
    Averaged,
    /// One block per quadrature point, values unchanged
    Pointwise,
}

impl ReductionMode {
    /// `0` integrated, `1` averaged, `2` pointwise.
    pub fn from_flag(flag: i32) -> Result<Self> {
        match flag {
            0 => Ok(ReductionMode::Integrated),
            1 => Ok(ReductionMode::Averaged),
            2 => Ok(ReductionMode::Pointwise),
            other => Err(KernelError::UnsupportedConfiguration(format!(
                "reduction mode {other} (expected 0, 1 or 2)"
            ))),
        }
    }

    /// Output shape for a `rows × 1` field reduced over `vg`.
    pub fn output_shape(&self, vg: &VolumeGeometry, rows: usize) -> Shape {
        let n_qp = match self {
            ReductionMode::Pointwise => vg.n_qp(),
            _ => 1,
        };
        Shape::new(vg.n_el(), n_qp, rows, 1)
    }
}

fn reduce_field<F>(
    out: &mut TensorBuffer,
    vg: &VolumeGeometry,
    mode: ReductionMode,
    rows: usize,
    config: &KernelConfig,
    value_at: F,
) -> Result<()>
where
    F: Fn(ElementId, QuadraturePointId) -> DVector<f64> + Sync,
{
    let expected = mode.output_shape(vg, rows);
    out.check_shape("out", expected.n_el, expected.n_qp, rows, 1)?;
    vg.check_elements(config.jacobian_threshold()?)?;
    if mode == ReductionMode::Averaged {
        for el in ElementId::range(vg.n_el()) {
            let volume = vg.volume(el);
            if !(volume > 0.0) {
                return Err(KernelError::ZeroVolume {
                    element: el,
                    volume,
                });
            }
        }
    }

    let n_qp = vg.n_qp();
    out.fill_elements(config.parallel, |el, block| match mode {
        ReductionMode::Pointwise => {
            for qp in QuadraturePointId::range(n_qp) {
                block.set_vector(qp, &value_at(el, qp));
            }
        }
        ReductionMode::Integrated | ReductionMode::Averaged => {
            let mut acc = DVector::zeros(rows);
            for qp in QuadraturePointId::range(n_qp) {
                acc += value_at(el, qp) * vg.integration_factor(el, qp);
            }
            if mode == ReductionMode::Averaged {
                acc /= vg.volume(el);
            }
            block.set_vector(QuadraturePointId(0), &acc);
        }
    });
    Ok(())
}

/// Integrated bilinear pairing `coef Σ w det ε_vᵀ D ε_u`, one scalar per element.
///
/// `out` is `(n_el, 1, 1, 1)`.
pub fn d_lin_elastic(
    out: &mut TensorBuffer,
    coef: f64,
    strain_v: &TensorBuffer,
    strain_u: &TensorBuffer,
    mtx_d: &TensorBuffer,
    vg: &VolumeGeometry,
    config: &KernelConfig,
) -> Result<()> {
    let (n_el, n_qp, sym) = (vg.n_el(), vg.n_qp(), vg.sym());
    strain_v.check_shape("strain_v", n_el, n_qp, sym, 1)?;
    strain_u.check_shape("strain_u", n_el, n_qp, sym, 1)?;
    let material = GeneralOperator::new(coef, mtx_d);
    material.validate(vg)?;

    reduce_field(out, vg, ReductionMode::Integrated, 1, config, |el, qp| {
        let stress = material.stress(el, qp, &strain_u.vector(el, qp));
        DVector::from_element(1, strain_v.vector(el, qp).dot(&stress))
    })
}

/// Strain field reduced per `mode`.
pub fn de_cauchy_strain(
    out: &mut TensorBuffer,
    strain: &TensorBuffer,
    vg: &VolumeGeometry,
    mode: ReductionMode,
    config: &KernelConfig,
) -> Result<()> {
    let sym = vg.sym();
    strain.check_shape("strain", vg.n_el(), vg.n_qp(), sym, 1)?;
    reduce_field(out, vg, mode, sym, config, |el, qp| strain.vector(el, qp))
}

/// Stress `σ(ε)` of any material operator, reduced per `mode`.
pub fn evaluate_stress<M: MaterialOperator>(
    out: &mut TensorBuffer,
    strain: &TensorBuffer,
    material: &M,
    vg: &VolumeGeometry,
    mode: ReductionMode,
    config: &KernelConfig,
) -> Result<()> {
    let sym = vg.sym();
    strain.check_shape("strain", vg.n_el(), vg.n_qp(), sym, 1)?;
    material.validate(vg)?;
    reduce_field(out, vg, mode, sym, config, |el, qp| {
        material.stress(el, qp, &strain.vector(el, qp))
    })
}

/// Stress `D ε` reduced per `mode`.
pub fn de_cauchy_stress(
    out: &mut TensorBuffer,
    strain: &TensorBuffer,
    mtx_d: &TensorBuffer,
    vg: &VolumeGeometry,
    mode: ReductionMode,
    config: &KernelConfig,
) -> Result<()> {
    evaluate_stress(out, strain, &GeneralOperator::new(1.0, mtx_d), vg, mode, config)
}
