//! Error types for the elasticity kernels

use thiserror::Error;

use crate::index::{Axis, ElementId, QuadraturePointId};

pub type Result<T> = std::result::Result<T, KernelError>;

/// Status returned by a successful call.
pub const STATUS_OK: i32 = 0;
pub const STATUS_SHAPE_MISMATCH: i32 = 1;
pub const STATUS_DEGENERATE_GEOMETRY: i32 = 2;
pub const STATUS_INDEX_OUT_OF_RANGE: i32 = 3;
pub const STATUS_UNSUPPORTED: i32 = 4;

/// Failure of a kernel call.
///
/// Every variant carries enough context (buffer, element, point) for the
/// caller to attach a mesh-specific diagnostic. No kernel recovers from these
/// locally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("shape mismatch in `{buffer}` along {axis}: expected {expected}, found {found}")]
    ShapeMismatch {
        buffer: &'static str,
        axis: Axis,
        expected: usize,
        found: usize,
    },

    #[error(
        "degenerate geometry in element {element}, quadrature point {point}: jacobian determinant {det}"
    )]
    DegenerateGeometry {
        element: ElementId,
        point: QuadraturePointId,
        det: f64,
    },

    #[error("element {element} has non-positive volume {volume}")]
    ZeroVolume { element: ElementId, volume: f64 },

    #[error(
        "connectivity out of range in element {element}, local node {node}: dof {dof} >= state length {len}"
    )]
    IndexOutOfRange {
        element: ElementId,
        node: usize,
        dof: usize,
        len: usize,
    },

    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
}

impl KernelError {
    /// Non-zero status code of the error category.
    pub fn status(&self) -> i32 {
        match self {
            KernelError::ShapeMismatch { .. } => STATUS_SHAPE_MISMATCH,
            KernelError::DegenerateGeometry { .. } | KernelError::ZeroVolume { .. } => {
                STATUS_DEGENERATE_GEOMETRY
            }
            KernelError::IndexOutOfRange { .. } => STATUS_INDEX_OUT_OF_RANGE,
            KernelError::UnsupportedConfiguration(_) => STATUS_UNSUPPORTED,
        }
    }

    /// Element the failure is attributed to, when there is one.
    pub fn element(&self) -> Option<ElementId> {
        match self {
            KernelError::DegenerateGeometry { element, .. }
            | KernelError::ZeroVolume { element, .. }
            | KernelError::IndexOutOfRange { element, .. } => Some(*element),
            _ => None,
        }
    }
}

/// Integer status of a kernel result: `0` on success, the category code otherwise.
pub fn status_of<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => STATUS_OK,
        Err(err) => err.status(),
    }
}
