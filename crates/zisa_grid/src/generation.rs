// crates/zisa_grid/src/generation.rs

//! 网格生成模块
//!
//! 提供简单的结构化三角形网格生成工具，用于数值实验和测试：
//!
//! - [`RectGridGenerator`]: 矩形域，每个矩形按交替对角线分为两个三角形
//! - [`DiscGridGenerator`]: 圆盘域，第 `k` 环有 `n0 * k` 个顶点
//!
//! # 使用示例
//!
//! ```rust
//! use zisa_grid::generation::RectGridGenerator;
//! use zisa_grid::QuadratureDegrees;
//!
//! let generator = RectGridGenerator::new(10, 10, 1.0, 1.0);
//! let grid = generator.build(QuadratureDegrees::default()).unwrap();
//!
//! assert_eq!(grid.n_cells(), 200);
//! ```

use glam::DVec2;
use std::f64::consts::PI;

use zisa_foundation::{ensure, ZisaError, ZisaResult};

use crate::grid::{Grid, QuadratureDegrees};

/// 顶点与三角形
pub type RawTriangulation = (Vec<DVec2>, Vec<[usize; 3]>);

/// 矩形结构化网格生成器
///
/// 顶点按行主序排列
#[derive(Debug, Clone)]
pub struct RectGridGenerator {
    nx: usize,
    ny: usize,
    lx: f64,
    ly: f64,
    origin: DVec2,
}

impl RectGridGenerator {
    /// 创建矩形网格生成器
    ///
    /// # 参数
    ///
    /// - `nx`, `ny`: 两个方向的矩形数
    /// - `lx`, `ly`: 域长度
    pub fn new(nx: usize, ny: usize, lx: f64, ly: f64) -> Self {
        Self {
            nx,
            ny,
            lx,
            ly,
            origin: DVec2::ZERO,
        }
    }

    /// 设置左下角坐标
    pub fn with_origin(mut self, x0: f64, y0: f64) -> Self {
        self.origin = DVec2::new(x0, y0);
        self
    }

    /// x 方向间距
    pub fn dx(&self) -> f64 {
        self.lx / self.nx as f64
    }

    /// y 方向间距
    pub fn dy(&self) -> f64 {
        self.ly / self.ny as f64
    }

    /// 单元总数（每个矩形 2 个三角形）
    pub fn n_cells(&self) -> usize {
        2 * self.nx * self.ny
    }

    /// 生成顶点与三角形
    pub fn triangulate(&self) -> ZisaResult<RawTriangulation> {
        ensure!(
            self.nx > 0 && self.ny > 0,
            ZisaError::invalid_input("矩形网格每个方向至少一个单元")
        );
        ensure!(
            self.lx > 0.0 && self.ly > 0.0,
            ZisaError::invalid_input("矩形网格的长度必须为正")
        );

        let (dx, dy) = (self.dx(), self.dy());
        let mut vertices = Vec::with_capacity((self.nx + 1) * (self.ny + 1));
        for j in 0..=self.ny {
            for i in 0..=self.nx {
                vertices.push(self.origin + DVec2::new(i as f64 * dx, j as f64 * dy));
            }
        }

        let idx = |i: usize, j: usize| j * (self.nx + 1) + i;
        let mut triangles = Vec::with_capacity(self.n_cells());
        for j in 0..self.ny {
            for i in 0..self.nx {
                let (v00, v10, v01, v11) = (idx(i, j), idx(i + 1, j), idx(i, j + 1), idx(i + 1, j + 1));
                // 交替对角线方向，避免各向异性
                if (i + j) % 2 == 0 {
                    triangles.push([v00, v10, v11]);
                    triangles.push([v00, v11, v01]);
                } else {
                    triangles.push([v00, v10, v01]);
                    triangles.push([v10, v11, v01]);
                }
            }
        }

        Ok((vertices, triangles))
    }

    /// 构建网格
    pub fn build(&self, quad_degrees: QuadratureDegrees) -> ZisaResult<Grid> {
        let (vertices, triangles) = self.triangulate()?;
        Grid::new(vertices, triangles, quad_degrees)
    }
}

/// 圆盘网格生成器
///
/// 中心一个顶点，第 `k` 环（半径 `k R / n_radial`）有 `n0 * k` 个等距顶点，
/// 相邻两环之间按角度拉链式连接，单元总数为 `n0 * n_radial²`。
#[derive(Debug, Clone)]
pub struct DiscGridGenerator {
    radius: f64,
    n_radial: usize,
    n0: usize,
    center: DVec2,
}

impl DiscGridGenerator {
    /// 创建圆盘网格生成器
    ///
    /// # 参数
    ///
    /// - `radius`: 圆半径
    /// - `n_radial`: 径向环数
    /// - `n0`: 第一环的顶点数（至少 3）
    pub fn new(radius: f64, n_radial: usize, n0: usize) -> Self {
        Self {
            radius,
            n_radial,
            n0,
            center: DVec2::ZERO,
        }
    }

    /// 设置圆心
    pub fn with_center(mut self, cx: f64, cy: f64) -> Self {
        self.center = DVec2::new(cx, cy);
        self
    }

    /// 单元总数
    pub fn n_cells(&self) -> usize {
        self.n0 * self.n_radial * self.n_radial
    }

    /// 生成顶点与三角形
    pub fn triangulate(&self) -> ZisaResult<RawTriangulation> {
        ensure!(self.n0 >= 3, ZisaError::invalid_input("圆盘网格第一环至少 3 个顶点"));
        ensure!(self.n_radial >= 1, ZisaError::invalid_input("圆盘网格至少一环"));
        ensure!(self.radius > 0.0, ZisaError::invalid_input("圆盘半径必须为正"));

        let dr = self.radius / self.n_radial as f64;
        let mut vertices = vec![self.center];
        let mut rings: Vec<Vec<usize>> = Vec::with_capacity(self.n_radial);

        for k in 1..=self.n_radial {
            let n = self.n0 * k;
            let r = k as f64 * dr;
            let ring = (0..n)
                .map(|a| {
                    let theta = 2.0 * PI * a as f64 / n as f64;
                    vertices.push(self.center + r * DVec2::new(theta.cos(), theta.sin()));
                    vertices.len() - 1
                })
                .collect();
            rings.push(ring);
        }

        let mut triangles = Vec::with_capacity(self.n_cells());

        // 中心扇形
        let first = &rings[0];
        for a in 0..first.len() {
            triangles.push([0, first[a], first[(a + 1) % first.len()]]);
        }

        // 相邻两环之间
        for k in 1..self.n_radial {
            let inner = &rings[k - 1];
            let outer = &rings[k];
            let (ni, no) = (inner.len(), outer.len());
            let (mut a, mut b) = (0, 0);
            while a < ni || b < no {
                let ta = (a + 1) as f64 / ni as f64;
                let tb = (b + 1) as f64 / no as f64;
                if b < no && (a == ni || tb <= ta) {
                    triangles.push([inner[a % ni], outer[b], outer[(b + 1) % no]]);
                    b += 1;
                } else {
                    triangles.push([inner[a], outer[b % no], inner[(a + 1) % ni]]);
                    a += 1;
                }
            }
        }

        Ok((vertices, triangles))
    }

    /// 构建网格
    pub fn build(&self, quad_degrees: QuadratureDegrees) -> ZisaResult<Grid> {
        let (vertices, triangles) = self.triangulate()?;
        Grid::new(vertices, triangles, quad_degrees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_grid_basic() {
        let gen = RectGridGenerator::new(2, 3, 10.0, 6.0);
        let grid = gen.build(QuadratureDegrees::default()).unwrap();

        assert_eq!(grid.n_cells(), 12);
        assert_eq!(grid.n_vertices(), 12);
        assert!((grid.total_volume() - 60.0).abs() < 1e-10);
        // 外边界由 2 * (2 + 3) 条边组成
        assert_eq!(grid.n_exterior_edges(), 10);
    }

    #[test]
    fn test_rect_grid_with_origin() {
        let gen = RectGridGenerator::new(4, 4, 2.0, 2.0).with_origin(-1.0, -1.0);
        let grid = gen.build(QuadratureDegrees::default()).unwrap();
        let (lo, hi) = grid.bounding_box();
        assert_eq!(lo, DVec2::new(-1.0, -1.0));
        assert_eq!(hi, DVec2::new(1.0, 1.0));
    }

    #[test]
    fn test_rect_grid_rejects_empty() {
        assert!(RectGridGenerator::new(0, 3, 1.0, 1.0).triangulate().is_err());
    }

    #[test]
    fn test_disc_grid_basic() {
        let gen = DiscGridGenerator::new(1.0, 4, 6);
        let grid = gen.build(QuadratureDegrees::default()).unwrap();

        assert_eq!(grid.n_cells(), gen.n_cells());
        assert_eq!(grid.n_cells(), 6 * 16);
        // 最外环每个顶点贡献一条外部边
        assert_eq!(grid.n_exterior_edges(), 6 * 4);
        // 内接多边形面积略小于 π
        let area = grid.total_volume();
        assert!(area < PI && area > 0.95 * PI);
    }

    #[test]
    fn test_disc_grid_with_center() {
        let gen = DiscGridGenerator::new(0.5, 2, 5).with_center(1.0, 2.0);
        let grid = gen.build(QuadratureDegrees::default()).unwrap();
        assert_eq!(grid.vertices[0], DVec2::new(1.0, 2.0));
        assert!(grid.locate_brute_force(DVec2::new(1.01, 2.01)).is_some());
    }
}
