// crates/zisa_grid/src/locator.rs

//! 网格空间索引与点定位
//!
//! 基于 R-Tree 的空间索引，用于快速查找点所在单元。先用单元包围盒
//! 筛选候选，再用重心坐标精确判断；都不命中时从最近单元出发沿邻居行走。

use glam::DVec2;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::grid::Grid;

/// 单元包围盒
#[derive(Debug, Clone)]
pub struct CellEnvelope {
    /// 单元索引
    pub cell_index: usize,
    /// 最小角点
    pub min: [f64; 2],
    /// 最大角点
    pub max: [f64; 2],
}

impl CellEnvelope {
    /// 由单元三个顶点创建
    pub fn new(cell_index: usize, vertices: [DVec2; 3]) -> Self {
        let lo = vertices[0].min(vertices[1]).min(vertices[2]);
        let hi = vertices[0].max(vertices[1]).max(vertices[2]);
        Self {
            cell_index,
            min: lo.to_array(),
            max: hi.to_array(),
        }
    }
}

impl RTreeObject for CellEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

impl PointDistance for CellEnvelope {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = (self.min[0] - point[0]).max(point[0] - self.max[0]).max(0.0);
        let dy = (self.min[1] - point[1]).max(point[1] - self.max[1]).max(0.0);
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        point[0] >= self.min[0] && point[0] <= self.max[0] && point[1] >= self.min[1] && point[1] <= self.max[1]
    }
}

/// 点定位器
pub struct PointLocator<'a> {
    grid: &'a Grid,
    tree: RTree<CellEnvelope>,
    tolerance: f64,
}

impl<'a> PointLocator<'a> {
    /// 为网格构建空间索引
    pub fn new(grid: &'a Grid) -> Self {
        let envelopes = (0..grid.n_cells())
            .map(|i| CellEnvelope::new(i, [grid.vertex(i, 0), grid.vertex(i, 1), grid.vertex(i, 2)]))
            .collect();
        Self {
            grid,
            tree: RTree::bulk_load(envelopes),
            tolerance: 1e-12,
        }
    }

    /// 设置重心坐标容差
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// 单元数
    pub fn n_cells(&self) -> usize {
        self.tree.size()
    }

    /// 查找包含 `x` 的单元
    ///
    /// 点落在公共边或顶点上时返回编号最小的单元。
    pub fn locate(&self, x: DVec2) -> Option<usize> {
        let p = x.to_array();
        let hit = self
            .tree
            .locate_all_at_point(&p)
            .map(|env| env.cell_index)
            .filter(|&i| self.grid.triangle(i).contains(x, self.tolerance))
            .min();
        if hit.is_some() {
            return hit;
        }

        // 包围盒容差内的点
        let guess = self.nearest_cell(x)?;
        self.grid.locate_from(x, guess)
    }

    /// 包围盒距离最近的单元
    pub fn nearest_cell(&self, x: DVec2) -> Option<usize> {
        self.tree.nearest_neighbor(&x.to_array()).map(|env| env.cell_index)
    }

    /// 与矩形相交的单元
    pub fn locate_in_rect(&self, lo: DVec2, hi: DVec2) -> Vec<usize> {
        let envelope = AABB::from_corners(lo.to_array(), hi.to_array());
        let mut cells: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|env| env.cell_index)
            .collect();
        cells.sort_unstable();
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::RectGridGenerator;
    use crate::grid::QuadratureDegrees;

    fn grid() -> Grid {
        RectGridGenerator::new(8, 8, 1.0, 1.0)
            .build(QuadratureDegrees::default())
            .unwrap()
    }

    #[test]
    fn test_locate_matches_brute_force() {
        let grid = grid();
        let locator = PointLocator::new(&grid);
        assert_eq!(locator.n_cells(), grid.n_cells());

        for &(x, y) in &[(0.03, 0.07), (0.51, 0.49), (0.99, 0.01), (0.3, 0.8)] {
            let p = DVec2::new(x, y);
            let cell = locator.locate(p).unwrap();
            assert!(grid.triangle(cell).contains(p, 1e-12));
            assert_eq!(Some(cell), grid.locate_brute_force(p));
        }
    }

    #[test]
    fn test_locate_on_shared_vertex_picks_lowest_index() {
        let grid = grid();
        let locator = PointLocator::new(&grid);
        let p = DVec2::new(0.5, 0.5);
        let containing: Vec<usize> = (0..grid.n_cells())
            .filter(|&i| grid.triangle(i).contains(p, 1e-12))
            .collect();
        assert!(containing.len() > 1);
        assert_eq!(locator.locate(p), containing.first().copied());
    }

    #[test]
    fn test_locate_outside() {
        let grid = grid();
        let locator = PointLocator::new(&grid);
        assert_eq!(locator.locate(DVec2::new(2.0, 0.5)), None);
        assert!(locator.nearest_cell(DVec2::new(2.0, 0.5)).is_some());
    }

    #[test]
    fn test_locate_in_rect() {
        let grid = grid();
        let locator = PointLocator::new(&grid);
        let cells = locator.locate_in_rect(DVec2::new(0.01, 0.01), DVec2::new(0.1, 0.1));
        // 左下角的矩形内两个三角形
        assert_eq!(cells, vec![0, 1]);
    }
}
