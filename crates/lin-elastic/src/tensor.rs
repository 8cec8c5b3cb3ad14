//! Dense per-(element, quadrature point) tensor buffers.
//!
//! Every field the kernels consume or produce (strain, stress, stiffness,
//! coefficients, element residuals and tangents) is a [`TensorBuffer`]: a
//! flat `Vec<f64>` holding one `rows × cols` block per element and point.
//!
//! ## Layout
//!
//! Storage is row-major over the logical shape `(n_el, n_qp, rows, cols)`:
//!
//! ```text
//! offset(e, q, r, c) = ((e * n_qp + q) * rows + r) * cols + c
//! ```
//!
//! so one element occupies a contiguous `n_qp * rows * cols` chunk and one
//! point a contiguous `rows * cols` block. Element-level outputs (residual,
//! tangent, per-element reductions) use `n_qp == 1`.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::index::{Axis, ElementId, QuadraturePointId};

/// Logical extent of a [`TensorBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub n_el: usize,
    pub n_qp: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub fn new(n_el: usize, n_qp: usize, rows: usize, cols: usize) -> Self {
        Self {
            n_el,
            n_qp,
            rows,
            cols,
        }
    }

    /// Total number of stored values.
    pub fn len(&self) -> usize {
        self.n_el * self.element_stride()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn block_len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn element_stride(&self) -> usize {
        self.n_qp * self.block_len()
    }

    pub fn extent(&self, axis: Axis) -> usize {
        match axis {
            Axis::Elements => self.n_el,
            Axis::Points => self.n_qp,
            Axis::Rows => self.rows,
            Axis::Cols => self.cols,
            Axis::Length => self.len(),
        }
    }

    /// Flat offset of the first entry of block `(el, qp)`.
    pub fn offset(&self, el: ElementId, qp: QuadraturePointId) -> usize {
        (el.index() * self.n_qp + qp.index()) * self.block_len()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} x {} x {} x {})",
            self.n_el, self.n_qp, self.rows, self.cols
        )
    }
}

fn check_axis(buffer: &'static str, axis: Axis, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(KernelError::ShapeMismatch {
            buffer,
            axis,
            expected,
            found,
        });
    }
    Ok(())
}

/// Flat row-major block storage with an explicit [`Shape`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorBuffer {
    shape: Shape,
    data: Vec<f64>,
}

impl TensorBuffer {
    pub fn zeros(shape: Shape) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.len()],
        }
    }

    /// Wrap existing storage; `data` must hold exactly `shape.len()` values.
    pub fn from_vec(shape: Shape, data: Vec<f64>) -> Result<Self> {
        check_axis("data", Axis::Length, shape.len(), data.len())?;
        Ok(Self { shape, data })
    }

    /// Build a buffer entry by entry from `f(el, qp, row, col)`.
    pub fn from_fn<F>(shape: Shape, mut f: F) -> Self
    where
        F: FnMut(ElementId, QuadraturePointId, usize, usize) -> f64,
    {
        let mut data = Vec::with_capacity(shape.len());
        for el in ElementId::range(shape.n_el) {
            for qp in QuadraturePointId::range(shape.n_qp) {
                for row in 0..shape.rows {
                    for col in 0..shape.cols {
                        data.push(f(el, qp, row, col));
                    }
                }
            }
        }
        Self { shape, data }
    }

    /// Repeat one block at every element and point.
    pub fn uniform(n_el: usize, n_qp: usize, block: &DMatrix<f64>) -> Self {
        let shape = Shape::new(n_el, n_qp, block.nrows(), block.ncols());
        Self::from_fn(shape, |_, _, row, col| block[(row, col)])
    }

    /// Per-element scalar field `(n_el, 1, 1, 1)`.
    pub fn from_scalars(values: &[f64]) -> Self {
        Self {
            shape: Shape::new(values.len(), 1, 1, 1),
            data: values.to_vec(),
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    fn block_slice(&self, el: ElementId, qp: QuadraturePointId) -> &[f64] {
        let start = self.shape.offset(el, qp);
        &self.data[start..start + self.shape.block_len()]
    }

    /// Copy of block `(el, qp)`.
    pub fn block(&self, el: ElementId, qp: QuadraturePointId) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.shape.rows, self.shape.cols, self.block_slice(el, qp))
    }

    /// Block `(el, qp)` flattened into a column vector.
    pub fn vector(&self, el: ElementId, qp: QuadraturePointId) -> DVector<f64> {
        DVector::from_column_slice(self.block_slice(el, qp))
    }

    /// First entry of block `(el, qp)`.
    pub fn scalar(&self, el: ElementId, qp: QuadraturePointId) -> f64 {
        self.data[self.shape.offset(el, qp)]
    }

    /// Point index to read for `qp`, broadcasting per-element fields.
    pub fn broadcast_point(&self, qp: QuadraturePointId) -> QuadraturePointId {
        if self.shape.n_qp == 1 {
            QuadraturePointId(0)
        } else {
            qp
        }
    }

    pub fn block_at(&self, el: ElementId, qp: QuadraturePointId) -> DMatrix<f64> {
        self.block(el, self.broadcast_point(qp))
    }

    pub fn vector_at(&self, el: ElementId, qp: QuadraturePointId) -> DVector<f64> {
        self.vector(el, self.broadcast_point(qp))
    }

    pub fn scalar_at(&self, el: ElementId, qp: QuadraturePointId) -> f64 {
        self.scalar(el, self.broadcast_point(qp))
    }

    /// Require the exact shape `(n_el, n_qp, rows, cols)`.
    pub fn check_shape(
        &self,
        buffer: &'static str,
        n_el: usize,
        n_qp: usize,
        rows: usize,
        cols: usize,
    ) -> Result<()> {
        check_axis(buffer, Axis::Elements, n_el, self.shape.n_el)?;
        check_axis(buffer, Axis::Points, n_qp, self.shape.n_qp)?;
        check_axis(buffer, Axis::Rows, rows, self.shape.rows)?;
        check_axis(buffer, Axis::Cols, cols, self.shape.cols)
    }

    /// Like [`check_shape`](Self::check_shape), but a single point per element is
    /// accepted and broadcast over all `n_qp` points.
    pub fn check_field(
        &self,
        buffer: &'static str,
        n_el: usize,
        n_qp: usize,
        rows: usize,
        cols: usize,
    ) -> Result<()> {
        let points = if self.shape.n_qp == 1 { 1 } else { n_qp };
        self.check_shape(buffer, n_el, points, rows, cols)
    }

    /// Overwrite every element chunk with `fill`, optionally on the rayon pool.
    ///
    /// Chunks are disjoint, so `fill` only ever sees its own element.
    pub fn fill_elements<F>(&mut self, parallel: bool, fill: F)
    where
        F: Fn(ElementId, &mut ElementBlockMut<'_>) + Sync + Send,
    {
        let shape = self.shape;
        let stride = shape.element_stride();
        if stride == 0 {
            return;
        }
        if parallel {
            self.data
                .par_chunks_mut(stride)
                .enumerate()
                .for_each(|(index, chunk)| {
                    fill(ElementId(index), &mut ElementBlockMut { shape, data: chunk })
                });
        } else {
            self.data
                .chunks_mut(stride)
                .enumerate()
                .for_each(|(index, chunk)| {
                    fill(ElementId(index), &mut ElementBlockMut { shape, data: chunk })
                });
        }
    }
}

/// Mutable view of one element's chunk of a [`TensorBuffer`].
pub struct ElementBlockMut<'a> {
    shape: Shape,
    data: &'a mut [f64],
}

impl ElementBlockMut<'_> {
    pub fn shape(&self) -> Shape {
        self.shape
    }

    fn block_mut(&mut self, qp: QuadraturePointId) -> &mut [f64] {
        let len = self.shape.block_len();
        let start = qp.index() * len;
        &mut self.data[start..start + len]
    }

    pub fn set(&mut self, qp: QuadraturePointId, block: &DMatrix<f64>) {
        let (rows, cols) = (self.shape.rows, self.shape.cols);
        debug_assert_eq!((block.nrows(), block.ncols()), (rows, cols));
        let dst = self.block_mut(qp);
        for row in 0..rows {
            for col in 0..cols {
                dst[row * cols + col] = block[(row, col)];
            }
        }
    }

    pub fn set_vector(&mut self, qp: QuadraturePointId, vector: &DVector<f64>) {
        debug_assert_eq!(vector.len(), self.shape.block_len());
        self.block_mut(qp).copy_from_slice(vector.as_slice());
    }

    pub fn set_scalar(&mut self, qp: QuadraturePointId, value: f64) {
        self.block_mut(qp)[0] = value;
    }
}
