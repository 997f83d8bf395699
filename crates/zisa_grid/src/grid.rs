// crates/zisa_grid/src/grid.rs

//! 非结构三角形网格
//!
//! 由顶点坐标和三角形顶点索引构造，预先计算有限体积格式所需的全部
//! 几何量：邻接关系、边编号、法向、体积、内切圆半径、求积规则和
//! 归一化矩。
//!
//! # 约定
//!
//! - 三角形在构造时统一调整为逆时针方向
//! - `neighbours[i][k]` 是与单元 `i` 共享边 `v_k -> v_{k+1}` 的单元
//! - 内部边与外部边分别编号；内部边 `e` 的法向从 `left_right[e].0`
//!   指向 `left_right[e].1`，外部边的法向指向区域外侧

use glam::DVec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use zisa_foundation::float::MIN_AREA;
use zisa_foundation::{ZisaError, ZisaResult};
use zisa_math::poly2d::{normalized_moments, MAX_DEGREE, MAX_DOF};
use zisa_math::quadrature::{DenormalizedRule, EdgeRule, TriangularRule};
use zisa_math::{Edge, Triangle};

/// 每个单元的最大邻居数
pub const MAX_NEIGHBOURS: usize = 3;

// ============================================================================
// 辅助类型
// ============================================================================

/// 求积规则次数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadratureDegrees {
    /// 边上积分精确次数
    pub edge: usize,
    /// 单元积分精确次数
    pub volume: usize,
    /// 归一化矩使用的积分次数
    pub moments: usize,
}

impl Default for QuadratureDegrees {
    fn default() -> Self {
        Self {
            edge: 1,
            volume: 1,
            moments: 4,
        }
    }
}

impl QuadratureDegrees {
    /// 与 `order` 阶格式匹配的求积次数
    pub fn for_order(order: usize) -> Self {
        let deg = order.clamp(1, 5);
        Self {
            edge: deg,
            volume: deg,
            moments: 4,
        }
    }
}

/// 单元标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellFlags {
    /// 是否为计算域内部单元
    pub interior: bool,
    /// 是否为幽灵单元（值由边界条件或光环交换给出）
    pub ghost_cell: bool,
}

impl CellFlags {
    /// 普通内部单元
    pub const INTERIOR: Self = Self {
        interior: true,
        ghost_cell: false,
    };

    /// 幽灵单元
    pub const GHOST: Self = Self {
        interior: false,
        ghost_cell: true,
    };
}

/// 外部边：所属单元及其局部边号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExteriorEdge {
    /// 内侧单元
    pub cell: usize,
    /// 局部边号
    pub k: usize,
}

/// 单元第 `k` 条边的编号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeIndex {
    /// 内部边
    Interior(usize),
    /// 外部边
    Exterior(usize),
}

// ============================================================================
// Grid
// ============================================================================

/// 二维非结构三角形网格
#[derive(Debug, Clone)]
pub struct Grid {
    /// 顶点坐标
    pub vertices: Vec<DVec2>,
    /// 三角形顶点索引（逆时针）
    pub vertex_indices: Vec<[usize; 3]>,
    /// 邻居单元
    pub neighbours: Vec<[Option<usize>; 3]>,
    /// 单元各边的编号
    pub edge_indices: Vec<[EdgeIndex; 3]>,

    /// 内部边两侧单元，`left < right`
    pub left_right: Vec<(usize, usize)>,
    /// 内部边法向
    pub normals: Vec<DVec2>,
    /// 内部边切向
    pub tangentials: Vec<DVec2>,
    /// 内部边求积规则
    pub faces: Vec<DenormalizedRule>,

    /// 外部边
    pub exterior_edges: Vec<ExteriorEdge>,
    /// 外部边外法向
    pub exterior_normals: Vec<DVec2>,
    /// 外部边求积规则
    pub exterior_faces: Vec<DenormalizedRule>,

    /// 单元面积
    pub volumes: Vec<f64>,
    /// 单元中心（顶点平均）
    pub cell_centers: Vec<DVec2>,
    /// 内切圆半径
    pub inradius: Vec<f64>,
    /// 重心到顶点的最大距离
    pub circum_radius: Vec<f64>,
    /// 单元求积规则
    pub cells: Vec<DenormalizedRule>,
    /// 归一化矩
    pub normalized_moments: Vec<[f64; MAX_DOF]>,
    /// 单元标志
    pub cell_flags: Vec<CellFlags>,

    /// 求积次数
    pub quad_degrees: QuadratureDegrees,
}

impl Grid {
    /// 从顶点与三角形构造网格
    pub fn new(
        vertices: Vec<DVec2>,
        vertex_indices: Vec<[usize; 3]>,
        quad_degrees: QuadratureDegrees,
    ) -> ZisaResult<Self> {
        if vertex_indices.is_empty() {
            return Err(ZisaError::invalid_mesh("网格不含任何单元"));
        }

        let n_vertices = vertices.len();
        let mut vertex_indices = vertex_indices;
        for (i, v) in vertex_indices.iter_mut().enumerate() {
            for &vk in v.iter() {
                ZisaError::check_index("Vertex", vk, n_vertices)?;
            }
            let tri = Triangle::new(vertices[v[0]], vertices[v[1]], vertices[v[2]]);
            let area = tri.signed_area();
            if area.abs() < MIN_AREA {
                return Err(ZisaError::invalid_mesh(format!(
                    "单元 {i} 退化，面积 = {area:e}"
                )));
            }
            if area < 0.0 {
                v.swap(1, 2);
            }
        }

        let neighbours = compute_neighbours(&vertex_indices)?;
        let (edge_indices, left_right, exterior_edges) = compute_edge_indices(&neighbours);

        let triangles: Vec<Triangle> = vertex_indices
            .iter()
            .map(|v| Triangle::new(vertices[v[0]], vertices[v[1]], vertices[v[2]]))
            .collect();

        let edge_of = |i: usize, k: usize| triangles[i].edge(k);

        let normals: Vec<DVec2> = left_right
            .iter()
            .enumerate()
            .map(|(e, &(i, _))| edge_of(i, local_edge(&edge_indices[i], EdgeIndex::Interior(e))).normal())
            .collect();
        let tangentials = normals.iter().map(|&n| zisa_math::rotate_left(n)).collect();

        let edge_rule = EdgeRule::new(quad_degrees.edge);
        let faces = left_right
            .iter()
            .enumerate()
            .map(|(e, &(i, _))| {
                edge_rule.denormalize(&edge_of(i, local_edge(&edge_indices[i], EdgeIndex::Interior(e))))
            })
            .collect();

        let exterior_normals = exterior_edges
            .iter()
            .map(|ee| edge_of(ee.cell, ee.k).normal())
            .collect();
        let exterior_faces = exterior_edges
            .iter()
            .map(|ee| edge_rule.denormalize(&edge_of(ee.cell, ee.k)))
            .collect();

        let volume_rule = TriangularRule::new(quad_degrees.volume)?;
        let moments_deg = quad_degrees.moments.min(zisa_math::quadrature::MAX_TRIANGULAR_RULE_DEGREE);

        let cells = triangles.par_iter().map(|t| volume_rule.denormalize(t)).collect();
        let normalized_moments = triangles
            .par_iter()
            .map(|t| normalized_moments(t, MAX_DEGREE, moments_deg))
            .collect::<ZisaResult<Vec<_>>>()?;

        let volumes = triangles.iter().map(Triangle::area).collect();
        let cell_centers = triangles.iter().map(Triangle::barycenter).collect();
        let inradius = triangles.iter().map(Triangle::inradius).collect();
        let circum_radius = triangles.iter().map(Triangle::circum_radius).collect();
        let n_cells = triangles.len();

        Ok(Self {
            vertices,
            vertex_indices,
            neighbours,
            edge_indices,
            left_right,
            normals,
            tangentials,
            faces,
            exterior_edges,
            exterior_normals,
            exterior_faces,
            volumes,
            cell_centers,
            inradius,
            circum_radius,
            cells,
            normalized_moments,
            cell_flags: vec![CellFlags::INTERIOR; n_cells],
            quad_degrees,
        })
    }

    // ------------------------------------------------------------------------
    // 尺寸
    // ------------------------------------------------------------------------

    /// 单元数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.vertex_indices.len()
    }

    /// 顶点数
    #[inline]
    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// 内部边数
    #[inline]
    pub fn n_interior_edges(&self) -> usize {
        self.left_right.len()
    }

    /// 外部边数
    #[inline]
    pub fn n_exterior_edges(&self) -> usize {
        self.exterior_edges.len()
    }

    /// 总边数
    #[inline]
    pub fn n_edges(&self) -> usize {
        self.n_interior_edges() + self.n_exterior_edges()
    }

    // ------------------------------------------------------------------------
    // 几何
    // ------------------------------------------------------------------------

    /// 第 `i` 个单元的三角形
    pub fn triangle(&self, i: usize) -> Triangle {
        let v = self.vertex_indices[i];
        Triangle::new(self.vertices[v[0]], self.vertices[v[1]], self.vertices[v[2]])
    }

    /// 第 `k` 个顶点
    #[inline]
    pub fn vertex(&self, i: usize, k: usize) -> DVec2 {
        self.vertices[self.vertex_indices[i][k % MAX_NEIGHBOURS]]
    }

    /// 单元特征长度
    #[inline]
    pub fn characteristic_length(&self, i: usize) -> f64 {
        self.circum_radius[i]
    }

    /// 单元 `i` 的第 `k` 条边是否有邻居
    #[inline]
    pub fn is_valid(&self, i: usize, k: usize) -> bool {
        self.neighbours[i][k].is_some()
    }

    /// 内部边的几何
    pub fn edge(&self, e: usize) -> Edge {
        let (i, _) = self.left_right[e];
        let k = local_edge(&self.edge_indices[i], EdgeIndex::Interior(e));
        self.triangle(i).edge(k)
    }

    /// 单元 `i` 第 `k` 条边的求积规则
    pub fn face(&self, i: usize, k: usize) -> &DenormalizedRule {
        match self.edge_indices[i][k] {
            EdgeIndex::Interior(e) => &self.faces[e],
            EdgeIndex::Exterior(e) => &self.exterior_faces[e],
        }
    }

    /// 单元 `i` 第 `k` 条边的单位外法向
    pub fn outward_normal(&self, i: usize, k: usize) -> DVec2 {
        match self.edge_indices[i][k] {
            EdgeIndex::Interior(e) => {
                if self.left_right[e].0 == i {
                    self.normals[e]
                } else {
                    -self.normals[e]
                }
            }
            EdgeIndex::Exterior(e) => self.exterior_normals[e],
        }
    }

    /// 网格总面积
    pub fn total_volume(&self) -> f64 {
        self.volumes.iter().sum()
    }

    /// 最大外接半径
    pub fn largest_circum_radius(&self) -> f64 {
        self.circum_radius.iter().copied().fold(0.0, f64::max)
    }

    /// 最小内切圆半径
    pub fn smallest_inradius(&self) -> f64 {
        self.inradius.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// 包围盒 `(min, max)`
    pub fn bounding_box(&self) -> (DVec2, DVec2) {
        self.vertices.iter().fold(
            (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
            |(lo, hi), &v| (lo.min(v), hi.max(v)),
        )
    }

    /// 点到区域边界（外部边）的距离
    pub fn distance_to_boundary(&self, x: DVec2) -> f64 {
        self.exterior_edges
            .iter()
            .map(|ee| self.triangle(ee.cell).edge(ee.k).distance(x))
            .fold(f64::INFINITY, f64::min)
    }

    // ------------------------------------------------------------------------
    // 单元标志
    // ------------------------------------------------------------------------

    /// 按掩码标记幽灵单元
    pub fn mask_ghost_cells<F>(&mut self, mask: F)
    where
        F: Fn(&Grid, usize) -> bool,
    {
        let flags: Vec<CellFlags> = (0..self.n_cells())
            .map(|i| if mask(self, i) { CellFlags::GHOST } else { CellFlags::INTERIOR })
            .collect();
        self.cell_flags = flags;
    }

    /// 幽灵单元数
    pub fn n_ghost_cells(&self) -> usize {
        self.cell_flags.iter().filter(|f| f.ghost_cell).count()
    }

    // ------------------------------------------------------------------------
    // 定位
    // ------------------------------------------------------------------------

    /// 沿邻居行走定位包含 `x` 的单元
    ///
    /// 从 `guess` 出发，每步穿过 `x` 所在一侧的边；走出网格时返回 `None`。
    pub fn locate_from(&self, x: DVec2, guess: usize) -> Option<usize> {
        let mut i = guess.min(self.n_cells().saturating_sub(1));
        for _ in 0..self.n_cells() {
            let tri = self.triangle(i);
            let lambda = tri.barycentric(x);
            // λ 与对边对应：λ_A 对应边 1 (B -> C)，λ_B 对应边 2，λ_C 对应边 0
            let (k_min, l_min) = [(1usize, lambda[0]), (2, lambda[1]), (0, lambda[2])]
                .into_iter()
                .fold((0, f64::INFINITY), |acc, (k, l)| if l < acc.1 { (k, l) } else { acc });
            if l_min >= -1e-12 {
                return Some(i);
            }
            i = self.neighbours[i][k_min]?;
        }
        None
    }

    /// 逐个检查所有单元
    pub fn locate_brute_force(&self, x: DVec2) -> Option<usize> {
        (0..self.n_cells()).find(|&i| self.triangle(i).contains(x, 1e-12))
    }

    // ------------------------------------------------------------------------
    // 子网格
    // ------------------------------------------------------------------------

    /// 取出一组单元构成新网格，返回网格及新旧单元编号映射
    ///
    /// 单元顺序与 `cells` 一致，未使用的顶点被移除。
    pub fn subgrid(&self, cells: &[usize]) -> ZisaResult<Grid> {
        let mut vertex_map: HashMap<usize, usize> = HashMap::new();
        let mut vertices = Vec::new();
        let mut vertex_indices = Vec::with_capacity(cells.len());

        for &i in cells {
            ZisaError::check_index("Cell", i, self.n_cells())?;
            let mut local = [0; 3];
            for (k, &v) in self.vertex_indices[i].iter().enumerate() {
                local[k] = *vertex_map.entry(v).or_insert_with(|| {
                    vertices.push(self.vertices[v]);
                    vertices.len() - 1
                });
            }
            vertex_indices.push(local);
        }

        let mut grid = Grid::new(vertices, vertex_indices, self.quad_degrees)?;
        grid.cell_flags = cells.iter().map(|&i| self.cell_flags[i]).collect();
        Ok(grid)
    }

    /// 网格概要
    pub fn summary(&self) -> String {
        let (lo, hi) = self.bounding_box();
        format!(
            "Grid {{ n_cells: {}, n_vertices: {}, n_interior_edges: {}, n_exterior_edges: {}, \
             n_ghost_cells: {}, volume: {:.6e}, bbox: [{:.3}, {:.3}] x [{:.3}, {:.3}], \
             r_max: {:.3e}, r_in_min: {:.3e} }}",
            self.n_cells(),
            self.n_vertices(),
            self.n_interior_edges(),
            self.n_exterior_edges(),
            self.n_ghost_cells(),
            self.total_volume(),
            lo.x,
            hi.x,
            lo.y,
            hi.y,
            self.largest_circum_radius(),
            self.smallest_inradius(),
        )
    }
}

// ============================================================================
// 拓扑
// ============================================================================

/// 通过有向边表查找邻居：邻居拥有反向的边
fn compute_neighbours(vertex_indices: &[[usize; 3]]) -> ZisaResult<Vec<[Option<usize>; 3]>> {
    let mut directed: HashMap<(usize, usize), usize> = HashMap::with_capacity(3 * vertex_indices.len());
    for (i, v) in vertex_indices.iter().enumerate() {
        for k in 0..MAX_NEIGHBOURS {
            let key = (v[k], v[(k + 1) % MAX_NEIGHBOURS]);
            if directed.insert(key, i).is_some() {
                return Err(ZisaError::invalid_mesh(format!(
                    "边 {} -> {} 被多个单元以相同方向使用",
                    key.0, key.1
                )));
            }
        }
    }

    Ok(vertex_indices
        .iter()
        .map(|v| {
            let mut nb = [None; 3];
            for (k, slot) in nb.iter_mut().enumerate() {
                let (v0, v1) = (v[k], v[(k + 1) % MAX_NEIGHBOURS]);
                *slot = directed.get(&(v1, v0)).copied();
            }
            nb
        })
        .collect())
}

type EdgeTopology = (Vec<[EdgeIndex; 3]>, Vec<(usize, usize)>, Vec<ExteriorEdge>);

/// 内部边按 `(i, k)`、`i < j` 的访问顺序编号，外部边单独编号
fn compute_edge_indices(neighbours: &[[Option<usize>; 3]]) -> EdgeTopology {
    let n_cells = neighbours.len();
    let mut edge_indices = vec![[EdgeIndex::Exterior(0); 3]; n_cells];
    let mut left_right = Vec::new();
    let mut exterior = Vec::new();

    for i in 0..n_cells {
        for k in 0..MAX_NEIGHBOURS {
            match neighbours[i][k] {
                None => {
                    edge_indices[i][k] = EdgeIndex::Exterior(exterior.len());
                    exterior.push(ExteriorEdge { cell: i, k });
                }
                Some(j) if i < j => {
                    edge_indices[i][k] = EdgeIndex::Interior(left_right.len());
                    left_right.push((i, j));
                }
                Some(_) => {}
            }
        }
    }

    // 右侧单元复用左侧的编号
    for (e, &(i, j)) in left_right.iter().enumerate() {
        for kj in 0..MAX_NEIGHBOURS {
            if neighbours[j][kj] == Some(i) {
                edge_indices[j][kj] = EdgeIndex::Interior(e);
            }
        }
    }

    (edge_indices, left_right, exterior)
}

/// 单元内编号为 `e` 的边的局部边号
fn local_edge(indices: &[EdgeIndex; 3], e: EdgeIndex) -> usize {
    indices.iter().position(|&x| x == e).unwrap_or(0)
}
