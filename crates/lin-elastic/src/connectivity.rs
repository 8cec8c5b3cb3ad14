//! Element-to-node connectivity and DOF gathering.
//!
//! A global state vector stores vector fields node by node, components
//! interleaved, starting at a field `offset` (other fields may occupy the
//! rest of the vector):
//!
//! ```text
//! dof(node, c) = offset + dim * node + c
//! ```
//!
//! Gathered element vectors use the same interleaving with local node
//! indices, which is the column order of the strain-displacement operator.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::index::ElementId;

/// Row-per-element table of global node indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connectivity {
    n_ep: usize,
    nodes: Vec<usize>,
}

impl Connectivity {
    /// Wrap a flat `n_el * n_ep` table.
    ///
    /// `n_ep` may only be zero for an empty table.
    pub fn new(n_ep: usize, nodes: Vec<usize>) -> Result<Self> {
        let fits = match n_ep {
            0 => nodes.is_empty(),
            _ => nodes.len() % n_ep == 0,
        };
        if !fits {
            return Err(KernelError::UnsupportedConfiguration(format!(
                "connectivity of length {} cannot be split into rows of {n_ep} nodes",
                nodes.len()
            )));
        }
        Ok(Self { n_ep, nodes })
    }

    /// Flatten equal-length rows; no rows gives an empty table.
    pub fn from_rows<R: AsRef<[usize]>>(rows: &[R]) -> Result<Self> {
        let n_ep = rows.first().map(|row| row.as_ref().len()).unwrap_or(0);
        if n_ep == 0 && !rows.is_empty() {
            return Err(KernelError::UnsupportedConfiguration(
                "connectivity rows without nodes".to_string(),
            ));
        }
        let mut nodes = Vec::with_capacity(rows.len() * n_ep);
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n_ep {
                return Err(KernelError::UnsupportedConfiguration(format!(
                    "connectivity row {index} has {} nodes, expected {n_ep}",
                    row.len()
                )));
            }
            nodes.extend_from_slice(row);
        }
        Self::new(n_ep, nodes)
    }

    pub fn n_el(&self) -> usize {
        self.nodes.len().checked_div(self.n_ep).unwrap_or(0)
    }

    pub fn n_ep(&self) -> usize {
        self.n_ep
    }

    /// Global node indices of `el`.
    pub fn element(&self, el: ElementId) -> &[usize] {
        let start = el.index() * self.n_ep;
        &self.nodes[start..start + self.n_ep]
    }

    /// Verify that every DOF referenced by the table lies inside `state_len`.
    pub fn check_state(&self, dim: usize, offset: usize, state_len: usize) -> Result<()> {
        for el in ElementId::range(self.n_el()) {
            for (local, &node) in self.element(el).iter().enumerate() {
                let last = node
                    .saturating_mul(dim)
                    .saturating_add(offset)
                    .saturating_add(dim - 1);
                if last >= state_len {
                    return Err(KernelError::IndexOutOfRange {
                        element: el,
                        node: local,
                        dof: last,
                        len: state_len,
                    });
                }
            }
        }
        Ok(())
    }

    /// Element DOF vector of `el`, node-interleaved (`n * dim + c`).
    ///
    /// Callers must have run [`check_state`](Self::check_state).
    pub fn gather(&self, el: ElementId, state: &[f64], dim: usize, offset: usize) -> DVector<f64> {
        let nodes = self.element(el);
        DVector::from_fn(nodes.len() * dim, |i, _| {
            state[offset + dim * nodes[i / dim] + i % dim]
        })
    }
}
