// crates/zisa_physics/src/reconstruction/lsq.rs

//! 最小二乘多项式拟合
//!
//! 对中心单元 `i` 与模板单元 `j`，约束为
//!
//! ```text
//! Σ_k a_k (avg_j(X^kx Y^ky) - c_{i,k}) = q̄_j - q̄_i,   j = 1..size
//! ```
//!
//! `X = (x - x_i) / l_i`，`c_i` 为单元 `i` 的归一化矩。常数项 `a_0 = q̄_i`，
//! 因此单元平均自动守恒。矩阵只依赖几何，构造时做一次 QR 分解。

use glam::DVec2;
use nalgebra::DMatrix;
use zisa_foundation::float::ipow;
use zisa_foundation::{ensure, ZisaError, ZisaResult};
use zisa_grid::Grid;
use zisa_math::poly2d::monomials;
use zisa_math::{poly_dof, Poly2D, TriangularRule, MAX_DEGREE, MAX_DOF};

use super::stencil::Stencil;

/// 计算模板单元上单项式平均的求积次数
const LSQ_QUADRATURE_DEGREE: usize = MAX_DEGREE;

/// 组装最小二乘矩阵
///
/// `cells[0]` 为中心单元，行对应 `cells[1..]`，列对应次数
/// `1..=order-1` 的单项式。
pub fn assemble_lsq_matrix(grid: &Grid, cells: &[usize], order: usize) -> ZisaResult<DMatrix<f64>> {
    ensure!(!cells.is_empty(), ZisaError::internal("空模板"));
    let deg = order.saturating_sub(1).min(MAX_DEGREE);
    let n_cols = poly_dof(deg) - 1;
    let n_rows = cells.len() - 1;

    let i = cells[0];
    let center = grid.cell_centers[i];
    let length = grid.characteristic_length(i);
    let moments = &grid.normalized_moments[i];
    let rule = TriangularRule::new(LSQ_QUADRATURE_DEGREE)?;

    let mut a = DMatrix::zeros(n_rows, n_cols);
    for (row, &j) in cells[1..].iter().enumerate() {
        let qr = rule.denormalize(&grid.triangle(j));
        for (kx, ky) in monomials(deg).skip(1) {
            let col = zisa_math::poly_index(kx, ky);
            let avg = qr.average(|x: DVec2| {
                let xr = (x - center) / length;
                ipow(xr.x, kx) * ipow(xr.y, ky)
            });
            a[(row, col - 1)] = avg - moments[col];
        }
    }
    Ok(a)
}

/// 数值秩，阈值与 Jacobi SVD 的默认值相同：`σ > σ_max · max(m, n) · ε`
pub fn numerical_rank(a: &DMatrix<f64>) -> usize {
    if a.is_empty() {
        return 0;
    }
    let sv = a.clone().singular_values();
    let sigma_max = sv.iter().cloned().fold(0.0, f64::max);
    let threshold = sigma_max * a.nrows().max(a.ncols()) as f64 * f64::EPSILON;
    sv.iter().filter(|&&s| s > threshold).count()
}

/// 预分解的最小二乘求解器
#[derive(Debug, Clone)]
pub struct LsqSolver {
    order: usize,
    moments: [f64; MAX_DOF],
    x_center: DVec2,
    length: f64,
    /// `Qᵀ`，`n × m`
    qt: DMatrix<f64>,
    /// 上三角 `R`，`n × n`
    r: DMatrix<f64>,
}

impl LsqSolver {
    /// 为模板组装并分解矩阵
    pub fn new(grid: &Grid, stencil: &Stencil) -> ZisaResult<Self> {
        let i = stencil.global()[0];
        let order = stencil.order();
        let mut solver = Self {
            order,
            moments: grid.normalized_moments[i],
            x_center: grid.cell_centers[i],
            length: grid.characteristic_length(i),
            qt: DMatrix::zeros(0, 0),
            r: DMatrix::zeros(0, 0),
        };
        if order == 1 {
            return Ok(solver);
        }

        let a = assemble_lsq_matrix(grid, stencil.global(), order)?;
        ensure!(
            a.nrows() >= a.ncols(),
            ZisaError::stencil(i, format!("模板过小: {} 行 {} 列", a.nrows(), a.ncols()))
        );

        let qr = a.qr();
        solver.qt = qr.q().transpose();
        solver.r = qr.r();
        ensure!(
            (0..solver.r.nrows()).all(|k| solver.r[(k, k)].abs() > 0.0),
            ZisaError::stencil(i, "最小二乘矩阵奇异")
        );
        Ok(solver)
    }

    /// 多项式阶数（次数加一）
    pub fn order(&self) -> usize {
        self.order
    }

    /// 求解非常数项系数，`rhs[j-1] = q̄_j - q̄_i`
    ///
    /// 返回的多项式常数项为零，调用方自行设置单元平均。
    pub fn solve<const N: usize>(&self, rhs: &[[f64; N]]) -> Poly2D<N> {
        if self.order == 1 {
            return Poly2D::zeros(0, self.moments, self.x_center, self.length);
        }

        let deg = self.order - 1;
        let mut poly = Poly2D::zeros(deg, self.moments, self.x_center, self.length);
        let n = self.r.nrows();
        let m = self.qt.ncols();

        for k in 0..N {
            // y = Qᵀ b
            let mut y = vec![0.0; n];
            for (row, yr) in y.iter_mut().enumerate() {
                *yr = (0..m).map(|j| self.qt[(row, j)] * rhs[j][k]).sum();
            }
            // R c = y
            for row in (0..n).rev() {
                let s: f64 = (row + 1..n).map(|col| self.r[(row, col)] * y[col]).sum();
                y[row] = (y[row] - s) / self.r[(row, row)];
            }
            for (col, c) in y.iter().enumerate() {
                poly.a_mut(col + 1)[k] = *c;
            }
        }
        poly
    }
}
