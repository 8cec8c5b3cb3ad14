//! Volume geometry consumed by the kernels.
//!
//! The FE-basis layer supplies, for every element and quadrature point, the
//! basis values, the basis gradients already mapped to physical coordinates
//! and the determinant of the reference-to-physical Jacobian. Quadrature
//! weights belong to the reference rule and are shared by all elements.
//!
//! Integrals over an element are evaluated as
//!
//! ```text
//! ∫_Ω_e f dΩ ≈ Σ_q  w_q · det(J_eq) · f(x_eq)
//! ```

use nalgebra::DMatrix;

use crate::error::{KernelError, Result};
use crate::index::{Axis, ElementId, QuadraturePointId};
use crate::strain::{check_dimension, voigt_size};
use crate::tensor::TensorBuffer;

/// Read-only integration data for a block of elements.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGeometry {
    /// Basis values, `(n_el, n_qp, 1, n_ep)`
    bf: TensorBuffer,
    /// Physical basis gradients, `(n_el, n_qp, dim, n_ep)`
    bf_gm: TensorBuffer,
    /// Jacobian determinants, `(n_el, n_qp, 1, 1)`
    det: TensorBuffer,
    /// Reference quadrature weights, `n_qp`
    weights: Vec<f64>,
}

impl VolumeGeometry {
    /// Bundle precomputed geometry, checking that all extents agree.
    ///
    /// The spatial dimension is the row count of `bf_gm` and must be 2 or 3.
    pub fn new(
        bf: TensorBuffer,
        bf_gm: TensorBuffer,
        det: TensorBuffer,
        weights: Vec<f64>,
    ) -> Result<Self> {
        let shape = bf_gm.shape();
        check_dimension(shape.rows)?;
        if shape.n_qp != weights.len() {
            return Err(KernelError::ShapeMismatch {
                buffer: "weights",
                axis: Axis::Points,
                expected: shape.n_qp,
                found: weights.len(),
            });
        }
        if let Some((qp, w)) = weights.iter().enumerate().find(|(_, w)| !w.is_finite()) {
            return Err(KernelError::UnsupportedConfiguration(format!(
                "quadrature weight {w} at point {qp}"
            )));
        }
        bf.check_shape("bf", shape.n_el, shape.n_qp, 1, shape.cols)?;
        det.check_shape("det", shape.n_el, shape.n_qp, 1, 1)?;

        Ok(Self {
            bf,
            bf_gm,
            det,
            weights,
        })
    }

    pub fn dim(&self) -> usize {
        self.bf_gm.shape().rows
    }

    /// Length of a Voigt strain/stress vector in this dimension.
    pub fn sym(&self) -> usize {
        voigt_size(self.dim())
    }

    pub fn n_el(&self) -> usize {
        self.bf_gm.shape().n_el
    }

    pub fn n_qp(&self) -> usize {
        self.bf_gm.shape().n_qp
    }

    /// Nodes (basis functions) per element.
    pub fn n_ep(&self) -> usize {
        self.bf_gm.shape().cols
    }

    /// Element-local degrees of freedom of a vector field.
    pub fn n_dof(&self) -> usize {
        self.dim() * self.n_ep()
    }

    pub fn bf(&self) -> &TensorBuffer {
        &self.bf
    }

    pub fn bf_gm(&self) -> &TensorBuffer {
        &self.bf_gm
    }

    pub fn det(&self) -> &TensorBuffer {
        &self.det
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Basis values at `(el, qp)` as a `1 × n_ep` row.
    pub fn basis(&self, el: ElementId, qp: QuadraturePointId) -> DMatrix<f64> {
        self.bf.block(el, qp)
    }

    /// Basis gradients at `(el, qp)`, `dim × n_ep`.
    pub fn gradients(&self, el: ElementId, qp: QuadraturePointId) -> DMatrix<f64> {
        self.bf_gm.block(el, qp)
    }

    pub fn jacobian(&self, el: ElementId, qp: QuadraturePointId) -> f64 {
        self.det.scalar(el, qp)
    }

    /// Quadrature weight times Jacobian determinant.
    pub fn integration_factor(&self, el: ElementId, qp: QuadraturePointId) -> f64 {
        self.weights[qp.index()] * self.jacobian(el, qp)
    }

    pub fn volume(&self, el: ElementId) -> f64 {
        QuadraturePointId::range(self.n_qp())
            .map(|qp| self.integration_factor(el, qp))
            .sum()
    }

    /// Fail on the first point of `el` whose determinant is not above `min_jacobian`.
    ///
    /// Thresholds below zero are raised to zero: an inverted element is
    /// always degenerate.
    pub fn check_element(&self, el: ElementId, min_jacobian: f64) -> Result<()> {
        let min_jacobian = min_jacobian.max(0.0);
        for qp in QuadraturePointId::range(self.n_qp()) {
            let det = self.jacobian(el, qp);
            // NaN fails the comparison as well
            if !(det > min_jacobian) {
                return Err(KernelError::DegenerateGeometry {
                    element: el,
                    point: qp,
                    det,
                });
            }
        }
        Ok(())
    }

    /// Check every element, reporting the lowest offending element index.
    pub fn check_elements(&self, min_jacobian: f64) -> Result<()> {
        ElementId::range(self.n_el()).try_for_each(|el| self.check_element(el, min_jacobian))
    }
}
