//! Test-only meshes and geometry builders.
//!
//! The library consumes precomputed geometry; these helpers play the role of
//! the FE-basis layer for structured (optionally distorted) meshes.

#![allow(dead_code)]

use lin_elastic::{Connectivity, ElementId, QuadraturePointId, Shape, TensorBuffer, VolumeGeometry};
use nalgebra::{DMatrix, DVector};

pub struct TestMesh {
    pub coords: Vec<Vec<f64>>,
    pub conn: Connectivity,
    pub vg: VolumeGeometry,
}

impl TestMesh {
    pub fn dim(&self) -> usize {
        self.vg.dim()
    }

    pub fn n_nodes(&self) -> usize {
        self.coords.len()
    }

    /// Global state `offset` padding followed by `u(x)` at every node.
    pub fn state_from<F>(&self, offset: usize, u: F) -> Vec<f64>
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let mut state = vec![0.0; offset];
        for x in &self.coords {
            state.extend(u(x));
        }
        state
    }
}

struct Reference {
    points: Vec<Vec<f64>>,
    weights: Vec<f64>,
    values: fn(&[f64]) -> Vec<f64>,
    derivatives: fn(&[f64]) -> DMatrix<f64>,
}

fn p1_values(p: &[f64]) -> Vec<f64> {
    vec![1.0 - p[0] - p[1], p[0], p[1]]
}

fn p1_derivatives(_p: &[f64]) -> DMatrix<f64> {
    DMatrix::from_row_slice(2, 3, &[-1.0, 1.0, 0.0, -1.0, 0.0, 1.0])
}

const Q4_NODES: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

fn q4_values(p: &[f64]) -> Vec<f64> {
    Q4_NODES
        .iter()
        .map(|n| (1.0 + p[0] * n[0]) * (1.0 + p[1] * n[1]) / 4.0)
        .collect()
}

fn q4_derivatives(p: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(2, 4, |d, i| {
        let n = Q4_NODES[i];
        if d == 0 {
            n[0] * (1.0 + p[1] * n[1]) / 4.0
        } else {
            (1.0 + p[0] * n[0]) * n[1] / 4.0
        }
    })
}

const H8_NODES: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

fn h8_values(p: &[f64]) -> Vec<f64> {
    H8_NODES
        .iter()
        .map(|n| (1.0 + p[0] * n[0]) * (1.0 + p[1] * n[1]) * (1.0 + p[2] * n[2]) / 8.0)
        .collect()
}

fn h8_derivatives(p: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(3, 8, |d, i| {
        let n = H8_NODES[i];
        let f = |k: usize| {
            if k == d {
                n[k]
            } else {
                1.0 + p[k] * n[k]
            }
        };
        f(0) * f(1) * f(2) / 8.0
    })
}

fn gauss_points(dim: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let g = 1.0 / 3f64.sqrt();
    let line = [-g, g];
    let mut points = Vec::new();
    if dim == 2 {
        for &y in &line {
            for &x in &line {
                points.push(vec![x, y]);
            }
        }
    } else {
        for &z in &line {
            for &y in &line {
                for &x in &line {
                    points.push(vec![x, y, z]);
                }
            }
        }
    }
    let weights = vec![1.0; points.len()];
    (points, weights)
}

fn build_geometry(coords: &[Vec<f64>], conn: &Connectivity, reference: &Reference) -> VolumeGeometry {
    let dim = coords[0].len();
    let n_el = conn.n_el();
    let n_ep = conn.n_ep();
    let n_qp = reference.points.len();

    let mut bf = Vec::new();
    let mut bf_gm = Vec::new();
    let mut det = Vec::new();
    for el in ElementId::range(n_el) {
        let nodes = conn.element(el);
        let x = DMatrix::from_fn(n_ep, dim, |i, c| coords[nodes[i]][c]);
        for point in &reference.points {
            let dn = (reference.derivatives)(point);
            let jac = &dn * &x;
            let inv = jac.clone().try_inverse().expect("singular test element");
            let grads = inv * &dn;
            bf.extend((reference.values)(point));
            for r in 0..dim {
                for c in 0..n_ep {
                    bf_gm.push(grads[(r, c)]);
                }
            }
            det.push(jac.determinant());
        }
    }

    VolumeGeometry::new(
        TensorBuffer::from_vec(Shape::new(n_el, n_qp, 1, n_ep), bf).unwrap(),
        TensorBuffer::from_vec(Shape::new(n_el, n_qp, dim, n_ep), bf_gm).unwrap(),
        TensorBuffer::from_vec(Shape::new(n_el, n_qp, 1, 1), det).unwrap(),
        reference.weights.clone(),
    )
    .unwrap()
}

/// Deterministic pseudo-random shift of interior nodes by up to `amount`.
fn distort(coords: &mut [Vec<f64>], is_interior: impl Fn(usize) -> bool, amount: f64) {
    for (index, x) in coords.iter_mut().enumerate() {
        if !is_interior(index) {
            continue;
        }
        for (c, value) in x.iter_mut().enumerate() {
            *value += amount * ((index * 7 + c * 13) as f64 * 0.731).sin();
        }
    }
}

fn grid_2d(nx: usize, ny: usize, lx: f64, ly: f64, distortion: f64) -> Vec<Vec<f64>> {
    let mut coords = Vec::new();
    for j in 0..=ny {
        for i in 0..=nx {
            coords.push(vec![lx * i as f64 / nx as f64, ly * j as f64 / ny as f64]);
        }
    }
    let h = (lx / nx as f64).min(ly / ny as f64);
    distort(
        &mut coords,
        |index| {
            let (i, j) = (index % (nx + 1), index / (nx + 1));
            i > 0 && i < nx && j > 0 && j < ny
        },
        0.2 * h * distortion,
    );
    coords
}

/// `nx × ny` squares on `[0, lx] × [0, ly]`, each split into two P1 triangles.
pub fn triangle_mesh(nx: usize, ny: usize, lx: f64, ly: f64, distortion: f64) -> TestMesh {
    let coords = grid_2d(nx, ny, lx, ly, distortion);
    let node = |i: usize, j: usize| j * (nx + 1) + i;
    let mut rows = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            rows.push([node(i, j), node(i + 1, j), node(i + 1, j + 1)]);
            rows.push([node(i, j), node(i + 1, j + 1), node(i, j + 1)]);
        }
    }
    let conn = Connectivity::from_rows(&rows).unwrap();
    let reference = Reference {
        points: vec![vec![1.0 / 3.0, 1.0 / 3.0]],
        weights: vec![0.5],
        values: p1_values,
        derivatives: p1_derivatives,
    };
    let vg = build_geometry(&coords, &conn, &reference);
    TestMesh { coords, conn, vg }
}

/// `nx × ny` bilinear quadrilaterals with a 2 × 2 Gauss rule.
pub fn quad_mesh(nx: usize, ny: usize, lx: f64, ly: f64, distortion: f64) -> TestMesh {
    let coords = grid_2d(nx, ny, lx, ly, distortion);
    let node = |i: usize, j: usize| j * (nx + 1) + i;
    let mut rows = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            rows.push([node(i, j), node(i + 1, j), node(i + 1, j + 1), node(i, j + 1)]);
        }
    }
    let conn = Connectivity::from_rows(&rows).unwrap();
    let (points, weights) = gauss_points(2);
    let reference = Reference {
        points,
        weights,
        values: q4_values,
        derivatives: q4_derivatives,
    };
    let vg = build_geometry(&coords, &conn, &reference);
    TestMesh { coords, conn, vg }
}

/// `n³` trilinear hexahedra on `[0, l]³` with a 2 × 2 × 2 Gauss rule.
pub fn hex_mesh(n: usize, l: f64, distortion: f64) -> TestMesh {
    let node = |i: usize, j: usize, k: usize| (k * (n + 1) + j) * (n + 1) + i;
    let mut coords = Vec::new();
    for k in 0..=n {
        for j in 0..=n {
            for i in 0..=n {
                let s = l / n as f64;
                coords.push(vec![s * i as f64, s * j as f64, s * k as f64]);
            }
        }
    }
    distort(
        &mut coords,
        |index| {
            let i = index % (n + 1);
            let j = (index / (n + 1)) % (n + 1);
            let k = index / ((n + 1) * (n + 1));
            [i, j, k].iter().all(|&v| v > 0 && v < n)
        },
        0.2 * l / n as f64 * distortion,
    );

    let mut rows = Vec::new();
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                rows.push([
                    node(i, j, k),
                    node(i + 1, j, k),
                    node(i + 1, j + 1, k),
                    node(i, j + 1, k),
                    node(i, j, k + 1),
                    node(i + 1, j, k + 1),
                    node(i + 1, j + 1, k + 1),
                    node(i, j + 1, k + 1),
                ]);
            }
        }
    }
    let conn = Connectivity::from_rows(&rows).unwrap();
    let (points, weights) = gauss_points(3);
    let reference = Reference {
        points,
        weights,
        values: h8_values,
        derivatives: h8_derivatives,
    };
    let vg = build_geometry(&coords, &conn, &reference);
    TestMesh { coords, conn, vg }
}

/// Copy of `vg` with one Jacobian determinant replaced.
pub fn with_det(vg: &VolumeGeometry, el: usize, qp: usize, value: f64) -> VolumeGeometry {
    let mut det = vg.det().clone();
    let offset = det.shape().offset(ElementId(el), QuadraturePointId(qp));
    det.as_mut_slice()[offset] = value;
    VolumeGeometry::new(vg.bf().clone(), vg.bf_gm().clone(), det, vg.weights().to_vec()).unwrap()
}

/// Per-element scalar field varying smoothly with the element index.
pub fn varying_scalars(n_el: usize, base: f64, spread: f64) -> TensorBuffer {
    let values: Vec<f64> = (0..n_el)
        .map(|e| base * (1.0 + spread * (e as f64 * 1.3).sin()))
        .collect();
    TensorBuffer::from_scalars(&values)
}

/// Symmetric positive-definite orthotropic-like stiffness in Voigt form.
pub fn anisotropic_stiffness(dim: usize) -> DMatrix<f64> {
    let sym = dim * (dim + 1) / 2;
    let a = DMatrix::from_fn(sym, sym, |i, j| ((i * 5 + j * 3) as f64 * 0.9).cos());
    a.transpose() * &a + DMatrix::identity(sym, sym) * (sym as f64)
}

pub fn max_asymmetry(m: &DMatrix<f64>) -> f64 {
    let scale = m.amax().max(1.0);
    (m - m.transpose()).amax() / scale
}

pub fn relative_difference(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    (a - b).norm() / a.norm().max(b.norm()).max(1e-300)
}
