//! Index types for the element and quadrature-point axes.
//!
//! Kernels address buffers through these newtypes instead of bare `usize`
//! so that the element and point axes cannot be swapped by accident.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Zero-based element index into every per-element buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub usize);

/// Zero-based quadrature-point index within an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuadraturePointId(pub usize);

impl ElementId {
    pub fn index(self) -> usize {
        self.0
    }

    /// All element ids `0..count`.
    pub fn range(count: usize) -> impl Iterator<Item = ElementId> {
        (0..count).map(ElementId)
    }
}

impl QuadraturePointId {
    pub fn index(self) -> usize {
        self.0
    }

    /// All point ids `0..count`.
    pub fn range(count: usize) -> impl Iterator<Item = QuadraturePointId> {
        (0..count).map(QuadraturePointId)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for QuadraturePointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the four axes of a [`crate::tensor::Shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Elements,
    Points,
    Rows,
    Cols,
    /// Flat storage length
    Length,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Elements => "elements",
            Axis::Points => "quadrature points",
            Axis::Rows => "rows",
            Axis::Cols => "cols",
            Axis::Length => "flat length",
        };
        f.write_str(name)
    }
}
