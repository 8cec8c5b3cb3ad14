//! Configured entry point bundling every kernel operation.

use crate::config::KernelConfig;
use crate::connectivity::Connectivity;
use crate::error::Result;
use crate::evaluate::{self, ReductionMode};
use crate::geometry::VolumeGeometry;
use crate::strain;
use crate::tensor::TensorBuffer;
use crate::terms::{self, Evaluation};

/// Runs the kernels with one [`KernelConfig`].
///
/// Every method validates its inputs completely before touching `out`, and
/// on success overwrites `out` without resizing it.
#[derive(Debug, Clone, Default)]
pub struct TermEvaluator {
    config: KernelConfig,
}

impl TermEvaluator {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    pub fn sequential() -> Self {
        Self::new(KernelConfig::sequential())
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn dw_lin_elastic_iso(
        &self,
        out: &mut TensorBuffer,
        evaluation: Evaluation<'_>,
        lam: &TensorBuffer,
        mu: &TensorBuffer,
        vg: &VolumeGeometry,
    ) -> Result<()> {
        terms::dw_lin_elastic_iso(out, evaluation, lam, mu, vg, &self.config)
    }

    pub fn dw_lin_elastic(
        &self,
        out: &mut TensorBuffer,
        coef: f64,
        evaluation: Evaluation<'_>,
        mtx_d: &TensorBuffer,
        vg: &VolumeGeometry,
    ) -> Result<()> {
        terms::dw_lin_elastic(out, coef, evaluation, mtx_d, vg, &self.config)
    }

    pub fn d_lin_elastic(
        &self,
        out: &mut TensorBuffer,
        coef: f64,
        strain_v: &TensorBuffer,
        strain_u: &TensorBuffer,
        mtx_d: &TensorBuffer,
        vg: &VolumeGeometry,
    ) -> Result<()> {
        evaluate::d_lin_elastic(out, coef, strain_v, strain_u, mtx_d, vg, &self.config)
    }

    pub fn dw_lin_prestress(
        &self,
        out: &mut TensorBuffer,
        stress: &TensorBuffer,
        vg: &VolumeGeometry,
    ) -> Result<()> {
        terms::dw_lin_prestress(out, stress, vg, &self.config)
    }

    pub fn dw_lin_strain_fib(
        &self,
        out: &mut TensorBuffer,
        mtx_d: &TensorBuffer,
        mat: &TensorBuffer,
        vg: &VolumeGeometry,
    ) -> Result<()> {
        terms::dw_lin_strain_fib(out, mtx_d, mat, vg, &self.config)
    }

    pub fn de_cauchy_strain(
        &self,
        out: &mut TensorBuffer,
        strain: &TensorBuffer,
        vg: &VolumeGeometry,
        mode: ReductionMode,
    ) -> Result<()> {
        evaluate::de_cauchy_strain(out, strain, vg, mode, &self.config)
    }

    pub fn de_cauchy_stress(
        &self,
        out: &mut TensorBuffer,
        strain: &TensorBuffer,
        mtx_d: &TensorBuffer,
        vg: &VolumeGeometry,
        mode: ReductionMode,
    ) -> Result<()> {
        evaluate::de_cauchy_stress(out, strain, mtx_d, vg, mode, &self.config)
    }

    pub fn dq_cauchy_strain(
        &self,
        out: &mut TensorBuffer,
        state: &[f64],
        offset: usize,
        vg: &VolumeGeometry,
        conn: &Connectivity,
    ) -> Result<()> {
        strain::dq_cauchy_strain(out, state, offset, vg, conn, &self.config)
    }

    /// Strain from a displacement-gradient field `(n_el, n_qp, dim, dim)`.
    pub fn cauchy_strain_from_gradient_field(
        &self,
        out: &mut TensorBuffer,
        grad: &TensorBuffer,
        vg: &VolumeGeometry,
    ) -> Result<()> {
        strain::cauchy_strain_from_gradient_field(out, grad, vg, &self.config)
    }
}
