//! Small-strain (Cauchy) strain evaluation.
//!
//! Voigt convention used by every kernel in this crate:
//!
//! ```text
//! 2D: {ε} = [εxx, εyy, γxy]ᵀ
//! 3D: {ε} = [εxx, εyy, εzz, γxy, γyz, γzx]ᵀ
//! ```
//!
//! Shear entries are engineering shears `γij = ∂ui/∂xj + ∂uj/∂xi`, stress
//! shear entries are the tensor components `σij`, and stiffness matrices map
//! the former to the latter.

use nalgebra::{DMatrix, DVector};

use crate::config::KernelConfig;
use crate::connectivity::Connectivity;
use crate::error::{KernelError, Result};
use crate::geometry::VolumeGeometry;
use crate::index::{Axis, QuadraturePointId};
use crate::tensor::TensorBuffer;

const VOIGT_PAIRS_2D: [(usize, usize); 3] = [(0, 0), (1, 1), (0, 1)];
const VOIGT_PAIRS_3D: [(usize, usize); 6] = [(0, 0), (1, 1), (2, 2), (0, 1), (1, 2), (2, 0)];

/// Number of independent components of a symmetric `dim × dim` tensor.
pub fn voigt_size(dim: usize) -> usize {
    dim * (dim + 1) / 2
}

/// Reject spatial dimensions other than 2 and 3.
pub fn check_dimension(dim: usize) -> Result<()> {
    if dim != 2 && dim != 3 {
        return Err(KernelError::UnsupportedConfiguration(format!(
            "spatial dimension {dim} (expected 2 or 3)"
        )));
    }
    Ok(())
}

/// Tensor index pair `(i, j)` of each Voigt slot.
pub fn voigt_pairs(dim: usize) -> Result<&'static [(usize, usize)]> {
    check_dimension(dim)?;
    Ok(pairs(dim))
}

/// Voigt pairs of an already checked dimension.
pub(crate) fn pairs(dim: usize) -> &'static [(usize, usize)] {
    if dim == 2 {
        &VOIGT_PAIRS_2D
    } else {
        &VOIGT_PAIRS_3D
    }
}

/// Symmetrized displacement gradient in Voigt form.
///
/// `grad[(i, j)] = ∂ui/∂xj`, square of size 2 or 3.
pub fn cauchy_strain_from_gradient(grad: &DMatrix<f64>) -> Result<DVector<f64>> {
    check_dimension(grad.nrows())?;
    if !grad.is_square() {
        return Err(KernelError::ShapeMismatch {
            buffer: "grad",
            axis: Axis::Cols,
            expected: grad.nrows(),
            found: grad.ncols(),
        });
    }
    Ok(symmetric_gradient(grad))
}

fn symmetric_gradient(grad: &DMatrix<f64>) -> DVector<f64> {
    let pairs = pairs(grad.nrows());
    DVector::from_iterator(
        pairs.len(),
        pairs.iter().map(|&(i, j)| {
            if i == j {
                grad[(i, i)]
            } else {
                grad[(i, j)] + grad[(j, i)]
            }
        }),
    )
}

/// Strain-displacement matrix B with `{ε} = [B]{u}`.
///
/// `gradients` is `dim × n_ep` (physical basis gradients); the result is
/// `sym × dim * n_ep` with node-interleaved columns. For one node in 3D:
///
/// ```text
/// [dN/dx  0      0    ]
/// [0      dN/dy  0    ]
/// [0      0      dN/dz]
/// [dN/dy  dN/dx  0    ]
/// [0      dN/dz  dN/dy]
/// [dN/dz  0      dN/dx]
/// ```
pub fn strain_displacement(gradients: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    check_dimension(gradients.nrows())?;
    Ok(b_matrix(gradients))
}

/// [`strain_displacement`] for gradients of a validated [`VolumeGeometry`].
pub(crate) fn b_matrix(gradients: &DMatrix<f64>) -> DMatrix<f64> {
    let dim = gradients.nrows();
    let n_ep = gradients.ncols();
    let pairs = pairs(dim);
    let mut b = DMatrix::zeros(pairs.len(), dim * n_ep);

    for node in 0..n_ep {
        let col = node * dim;
        for (k, &(i, j)) in pairs.iter().enumerate() {
            if i == j {
                b[(k, col + i)] = gradients[(i, node)];
            } else {
                b[(k, col + i)] = gradients[(j, node)];
                b[(k, col + j)] = gradients[(i, node)];
            }
        }
    }

    b
}

/// Strain from a precomputed displacement-gradient field.
///
/// `grad` is `(n_el, n_qp, dim, dim)`, `out` is `(n_el, n_qp, sym, 1)`.
pub fn cauchy_strain_from_gradient_field(
    out: &mut TensorBuffer,
    grad: &TensorBuffer,
    vg: &VolumeGeometry,
    config: &KernelConfig,
) -> Result<()> {
    let (n_el, n_qp, dim) = (vg.n_el(), vg.n_qp(), vg.dim());
    grad.check_shape("grad", n_el, n_qp, dim, dim)?;
    out.check_shape("out", n_el, n_qp, vg.sym(), 1)?;
    vg.check_elements(config.jacobian_threshold()?)?;

    out.fill_elements(config.parallel, |el, block| {
        for qp in QuadraturePointId::range(n_qp) {
            block.set_vector(qp, &symmetric_gradient(&grad.block(el, qp)));
        }
    });
    Ok(())
}

/// Strain at every quadrature point from a global state vector.
///
/// Nodal values are gathered through `conn` starting at `offset` (see
/// [`crate::connectivity`]) and contracted with the basis gradients. `out`
/// is `(n_el, n_qp, sym, 1)`. The output is left untouched on any error.
pub fn dq_cauchy_strain(
    out: &mut TensorBuffer,
    state: &[f64],
    offset: usize,
    vg: &VolumeGeometry,
    conn: &Connectivity,
    config: &KernelConfig,
) -> Result<()> {
    let (n_el, n_qp, dim) = (vg.n_el(), vg.n_qp(), vg.dim());
    if conn.n_el() != n_el {
        return Err(KernelError::ShapeMismatch {
            buffer: "conn",
            axis: Axis::Elements,
            expected: n_el,
            found: conn.n_el(),
        });
    }
    // An empty table carries no node count to compare
    if n_el > 0 && conn.n_ep() != vg.n_ep() {
        return Err(KernelError::ShapeMismatch {
            buffer: "conn",
            axis: Axis::Cols,
            expected: vg.n_ep(),
            found: conn.n_ep(),
        });
    }
    out.check_shape("out", n_el, n_qp, vg.sym(), 1)?;
    vg.check_elements(config.jacobian_threshold()?)?;
    conn.check_state(dim, offset, state.len())?;

    out.fill_elements(config.parallel, |el, block| {
        let u = conn.gather(el, state, dim, offset);
        for qp in QuadraturePointId::range(n_qp) {
            let b = b_matrix(&vg.gradients(el, qp));
            block.set_vector(qp, &(b * &u));
        }
    });
    Ok(())
}
