// crates/zisa_physics/src/reconstruction/stencil.rs

//! 重构模板
//!
//! 中心模板取离单元中心最近的若干单元；单侧模板只在穿过某条边的锥形
//! 区域内搜索。找不到满秩模板时退化为只含单元自身的一阶模板。

use std::collections::VecDeque;
use std::str::FromStr;

use glam::DVec2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use zisa_foundation::{ensure, ZisaError, ZisaResult};
use zisa_grid::Grid;
use zisa_math::{poly_dof, Cone, FullSphere, HalfPlane, Region, TriangularRule, MAX_DEGREE};

use super::lsq::{assemble_lsq_matrix, numerical_rank};

/// 随机重排尝试次数
const TRYHARD_MAX_ITER: usize = 100;

/// 判断候选单元是否落在区域内所用的求积次数
const SELECTION_QUADRATURE_DEGREE: usize = 5;

// ============================================================================
// 参数
// ============================================================================

/// 模板偏向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StencilBias {
    /// 中心模板
    Central,
    /// 单侧模板
    OneSided,
}

impl FromStr for StencilBias {
    type Err = ZisaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c" => Ok(Self::Central),
            "b" => Ok(Self::OneSided),
            _ => Err(ZisaError::invalid_input(format!("未知模板偏向 '{s}'，应为 \"c\" 或 \"b\""))),
        }
    }
}

/// 单个模板的参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilParams {
    /// 目标阶数
    pub order: usize,
    /// 偏向
    pub bias: StencilBias,
    /// 超定系数
    pub overfit_factor: f64,
}

impl StencilParams {
    /// 创建
    pub fn new(order: usize, bias: StencilBias, overfit_factor: f64) -> Self {
        Self {
            order,
            bias,
            overfit_factor,
        }
    }
}

/// 模板族参数
#[derive(Debug, Clone, PartialEq)]
pub struct StencilFamilyParams {
    /// 各模板目标阶数
    pub orders: Vec<usize>,
    /// 各模板偏向
    pub biases: Vec<StencilBias>,
    /// 各模板超定系数
    pub overfit_factors: Vec<f64>,
}

impl StencilFamilyParams {
    /// 创建，三个列表必须等长
    pub fn new(orders: Vec<usize>, biases: Vec<StencilBias>, overfit_factors: Vec<f64>) -> ZisaResult<Self> {
        ensure!(!orders.is_empty(), ZisaError::invalid_input("模板族不能为空"));
        ZisaError::check_size("stencil_family.biases", orders.len(), biases.len())?;
        ZisaError::check_size("stencil_family.overfit_factors", orders.len(), overfit_factors.len())?;
        Ok(Self {
            orders,
            biases,
            overfit_factors,
        })
    }

    /// 由字符串偏向创建
    pub fn parse(orders: &[usize], biases: &[String], overfit_factors: &[f64]) -> ZisaResult<Self> {
        let biases = biases.iter().map(|b| b.parse()).collect::<ZisaResult<Vec<_>>>()?;
        Self::new(orders.to_vec(), biases, overfit_factors.to_vec())
    }

    /// 模板个数
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// 第 `k` 个模板的参数
    pub fn params(&self, k: usize) -> StencilParams {
        StencilParams::new(self.orders[k], self.biases[k], self.overfit_factors[k])
    }

    /// 最高目标阶数
    pub fn max_order(&self) -> usize {
        self.orders.iter().copied().max().unwrap_or(1)
    }
}

// ============================================================================
// 尺寸
// ============================================================================

/// 拟合 `deg` 次多项式所需的模板大小
///
/// 多项式的单元平均已固定，只需拟合 `poly_dof(deg) - 1` 个系数。
pub fn required_stencil_size(deg: usize, factor: f64) -> usize {
    if deg == 0 {
        return 1;
    }
    ((poly_dof(deg) - 1) as f64 * factor + 1.0) as usize
}

/// 大小为 `size` 的模板能支持的最高阶数
pub fn deduce_max_order(size: usize, factor: f64) -> usize {
    let mut deg = 0;
    while deg < MAX_DEGREE && required_stencil_size(deg + 1, factor) <= size {
        deg += 1;
    }
    deg + 1
}

// ============================================================================
// 候选单元搜索
// ============================================================================

/// 从 `i` 出发沿邻居广度优先搜索区域内的单元
///
/// 最多展开 `5 n` 个候选；`i` 总是第一个。候选单元的任一求积点或中心
/// 在区域内即视为在区域内。
pub fn region_based_candidates(grid: &Grid, i: usize, n: usize, region: &dyn Region) -> ZisaResult<Vec<usize>> {
    let rule = TriangularRule::new(SELECTION_QUADRATURE_DEGREE)?;
    let is_inside = |j: usize| {
        let tri = grid.triangle(j);
        rule.points.iter().any(|&l| region.is_inside(tri.coord(l))) || region.is_inside(grid.cell_centers[j])
    };

    let max_points = 5 * n;
    let mut candidates = vec![i];
    let mut queue = VecDeque::from([i]);
    let mut expanded = 0;

    while let Some(j) = queue.pop_front() {
        if expanded >= max_points {
            break;
        }
        expanded += 1;

        for cand in grid.neighbours[j].iter().flatten().copied() {
            if !candidates.contains(&cand) && is_inside(cand) {
                candidates.push(cand);
                queue.push_back(cand);
            }
        }
    }

    Ok(candidates)
}

/// 区域内离单元 `i` 最近的至多 `n` 个单元
pub fn region_based_stencil(grid: &Grid, i: usize, n: usize, region: &dyn Region) -> ZisaResult<Vec<usize>> {
    let mut candidates = region_based_candidates(grid, i, n, region)?;
    let x_center = grid.cell_centers[i];
    candidates.sort_by(|&a, &b| {
        let da = grid.cell_centers[a].distance_squared(x_center);
        let db = grid.cell_centers[b].distance_squared(x_center);
        da.total_cmp(&db)
    });
    candidates.truncate(n);
    Ok(candidates)
}

/// 中心模板
pub fn central_stencil(grid: &Grid, i: usize, n: usize) -> ZisaResult<Vec<usize>> {
    region_based_stencil(grid, i, n, &FullSphere)
}

/// 边 `k` 的两个端点与对顶点
fn face_vertices(grid: &Grid, i: usize, k: usize) -> (DVec2, DVec2, DVec2) {
    (grid.vertex(i, k), grid.vertex(i, (k + 1) % 3), grid.vertex(i, (k + 2) % 3))
}

/// 以对顶点为锥顶、穿过边 `k` 的锥形
fn conservative_stencil(grid: &Grid, i: usize, k: usize, n: usize) -> ZisaResult<Vec<usize>> {
    let (v0, v1, off_vertex) = face_vertices(grid, i, k);
    region_based_stencil(grid, i, n, &Cone::from_points(v0, off_vertex, v1))
}

/// 以单元中心为锥顶、穿过边 `k` 的锥形
fn less_conservative_stencil(grid: &Grid, i: usize, k: usize, n: usize) -> ZisaResult<Vec<usize>> {
    let (v0, v1, _) = face_vertices(grid, i, k);
    region_based_stencil(grid, i, n, &Cone::from_points(v0, grid.cell_centers[i], v1))
}

/// 边 `k` 之后的半平面内随机挑选，直到矩阵满秩
fn tryhard_stencil<F>(grid: &Grid, is_good: F, i: usize, k: usize, n: usize) -> ZisaResult<Vec<usize>>
where
    F: Fn(&[usize]) -> ZisaResult<bool>,
{
    let face = grid.triangle(i).edge(k);
    let region = HalfPlane::new(face.midpoint(), grid.outward_normal(i, k));
    let mut candidates = region_based_candidates(grid, i, n, &region)?;
    if candidates.len() < n {
        return Ok(vec![i]);
    }

    let mut rng = StdRng::seed_from_u64(i as u64);
    for iter in 0..TRYHARD_MAX_ITER {
        candidates[1..].shuffle(&mut rng);
        if is_good(&candidates[..n])? {
            if iter >= 1 {
                tracing::warn!("单元 {i} 边 {k}: 随机搜索 {} 次后找到模板", iter + 1);
            }
            candidates.truncate(n);
            return Ok(candidates);
        }
    }

    tracing::warn!("单元 {i} 边 {k}: 找不到满秩的单侧模板，退化为一阶");
    Ok(vec![i])
}

/// 穿过边 `k` 的单侧模板
///
/// 依次尝试保守锥形、较宽锥形和随机搜索；前两者要求恰好 `n` 个单元且
/// `order` 阶最小二乘矩阵列满秩。
pub fn biased_stencil(grid: &Grid, i: usize, k: usize, n: usize, order: usize) -> ZisaResult<Vec<usize>> {
    let is_good = |s: &[usize]| -> ZisaResult<bool> {
        let a = assemble_lsq_matrix(grid, s, order)?;
        let rank = numerical_rank(&a);
        if rank != a.ncols() {
            tracing::debug!("单元 {i} 边 {k}: 模板 {s:?} 秩不足 ({rank} < {})", a.ncols());
        }
        Ok(rank == a.ncols())
    };

    let s = conservative_stencil(grid, i, k, n)?;
    if s.len() == n && is_good(&s)? {
        return Ok(s);
    }

    let s = less_conservative_stencil(grid, i, k, n)?;
    if s.len() == n && is_good(&s)? {
        return Ok(s);
    }

    tryhard_stencil(grid, is_good, i, k, n)
}

// ============================================================================
// 模板
// ============================================================================

/// 重构模板
///
/// `global` 为全局单元编号，`local` 为在模板族 `local2global` 中的位置；
/// 两者第一个元素都对应中心单元。
#[derive(Debug, Clone, PartialEq)]
pub struct Stencil {
    local: Vec<usize>,
    global: Vec<usize>,
    order: usize,
    max_order: usize,
    bias: StencilBias,
    overfit_factor: f64,
}

impl Stencil {
    /// 只含单元 `i` 的一阶模板
    pub fn single(i: usize) -> Self {
        Self {
            local: vec![0],
            global: vec![i],
            order: 1,
            max_order: 1,
            bias: StencilBias::Central,
            overfit_factor: 1.0,
        }
    }

    /// 由已知的全局单元构造，阶数由大小推断
    pub fn from_global(global: Vec<usize>, params: StencilParams) -> Self {
        let order = deduce_max_order(global.len(), params.overfit_factor).min(params.order.max(1));
        let size = required_stencil_size(order - 1, params.overfit_factor).min(global.len());
        let mut global = global;
        global.truncate(size);
        Self {
            local: Vec::new(),
            global,
            order,
            max_order: params.order,
            bias: params.bias,
            overfit_factor: params.overfit_factor,
        }
    }

    /// 中心模板
    pub fn central(grid: &Grid, i: usize, params: StencilParams) -> ZisaResult<Self> {
        let max_size = required_stencil_size(params.order.saturating_sub(1), params.overfit_factor);
        let global = central_stencil(grid, i, max_size)?;
        Ok(Self::from_global(global, params))
    }

    /// 穿过边 `k` 的单侧模板
    pub fn biased(grid: &Grid, i: usize, k: usize, params: StencilParams) -> ZisaResult<Self> {
        let max_size = required_stencil_size(params.order.saturating_sub(1), params.overfit_factor);
        let global = biased_stencil(grid, i, k, max_size, params.order)?;
        Ok(Self::from_global(global, params))
    }

    /// 在 `l2g` 中登记全局编号并设置局部编号
    pub fn assign_local_indices(&mut self, l2g: &mut Vec<usize>) {
        self.local = self
            .global
            .iter()
            .map(|&g| match l2g.iter().position(|&x| x == g) {
                Some(pos) => pos,
                None => {
                    l2g.push(g);
                    l2g.len() - 1
                }
            })
            .collect();
    }

    /// 把全局编号换成另一套编号（分区后的局部网格）
    pub fn remap<F>(&self, map: F) -> Option<Self>
    where
        F: Fn(usize) -> Option<usize>,
    {
        let global = self.global.iter().map(|&g| map(g)).collect::<Option<Vec<_>>>()?;
        Some(Self { global, ..self.clone() })
    }

    /// 局部编号
    pub fn local(&self) -> &[usize] {
        &self.local
    }

    /// 全局编号
    pub fn global(&self) -> &[usize] {
        &self.global
    }

    /// 实际阶数
    pub fn order(&self) -> usize {
        self.order
    }

    /// 目标阶数
    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// 单元个数
    pub fn size(&self) -> usize {
        self.global.len()
    }

    /// 偏向
    pub fn bias(&self) -> StencilBias {
        self.bias
    }

    /// 超定系数
    pub fn overfit_factor(&self) -> f64 {
        self.overfit_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zisa_grid::{DiscGridGenerator, QuadratureDegrees, RectGridGenerator};

    #[test]
    fn test_required_stencil_size() {
        assert_eq!(required_stencil_size(0, 2.0), 1);
        assert_eq!(required_stencil_size(1, 1.5), 4);
        assert_eq!(required_stencil_size(2, 2.0), 11);
        assert_eq!(required_stencil_size(3, 2.0), 19);
    }

    #[test]
    fn test_deduce_max_order() {
        assert_eq!(deduce_max_order(1, 2.0), 1);
        assert_eq!(deduce_max_order(4, 1.5), 2);
        assert_eq!(deduce_max_order(10, 2.0), 2);
        assert_eq!(deduce_max_order(11, 2.0), 3);
        for order in 1..=4 {
            let size = required_stencil_size(order - 1, 2.0);
            assert_eq!(deduce_max_order(size, 2.0), order);
        }
    }

    #[test]
    fn test_bias_from_str() {
        assert_eq!("c".parse::<StencilBias>().unwrap(), StencilBias::Central);
        assert_eq!("b".parse::<StencilBias>().unwrap(), StencilBias::OneSided);
        assert!("x".parse::<StencilBias>().is_err());
    }

    #[test]
    fn test_central_stencil_is_sorted_by_distance() {
        let grid = DiscGridGenerator::new(1.0, 6, 6).build(QuadratureDegrees::default()).unwrap();
        let i = grid.locate_brute_force(DVec2::new(0.1, 0.05)).unwrap();
        let s = central_stencil(&grid, i, 11).unwrap();
        assert_eq!(s.len(), 11);
        assert_eq!(s[0], i);
        let d: Vec<f64> = s.iter().map(|&j| grid.cell_centers[j].distance(grid.cell_centers[i])).collect();
        assert!(d.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_biased_stencil_lies_behind_face() {
        let grid = RectGridGenerator::new(12, 12, 1.0, 1.0).build(QuadratureDegrees::default()).unwrap();
        let i = grid.locate_brute_force(DVec2::new(0.52, 0.47)).unwrap();
        for k in 0..3 {
            let s = biased_stencil(&grid, i, k, 4, 2).unwrap();
            assert_eq!(s.len(), 4);
            assert_eq!(s[0], i);
            // 除中心外都在边的外侧
            let face = grid.triangle(i).edge(k);
            let n = grid.outward_normal(i, k);
            for &j in &s[1..] {
                assert!((grid.cell_centers[j] - face.midpoint()).dot(n) > -grid.circum_radius[i]);
            }
        }
    }

    #[test]
    fn test_corner_biased_stencil_degenerates() {
        // 矩形角上的单元，朝外的边没有单元
        let grid = RectGridGenerator::new(6, 6, 1.0, 1.0).build(QuadratureDegrees::default()).unwrap();
        let i = 0;
        let k = (0..3).find(|&k| grid.neighbours[i][k].is_none()).unwrap();
        let s = Stencil::biased(&grid, i, k, StencilParams::new(2, StencilBias::OneSided, 1.5)).unwrap();
        assert_eq!(s.order(), 1);
        assert_eq!(s.global(), &[i]);
    }

    #[test]
    fn test_stencil_order_near_boundary() {
        let grid = RectGridGenerator::new(3, 3, 1.0, 1.0).build(QuadratureDegrees::default()).unwrap();
        let s = Stencil::central(&grid, 0, StencilParams::new(4, StencilBias::Central, 2.0)).unwrap();
        // 只有 18 个单元，不足以支持三次多项式
        assert_eq!(s.order(), 3);
        assert_eq!(s.size(), 11);
        assert_eq!(s.max_order(), 4);
    }

    #[test]
    fn test_assign_local_indices() {
        let mut l2g = vec![5];
        let mut a = Stencil::from_global(vec![5, 7, 2, 9], StencilParams::new(2, StencilBias::OneSided, 1.5));
        let mut b = Stencil::from_global(vec![5, 9, 3, 1], StencilParams::new(2, StencilBias::OneSided, 1.5));
        a.assign_local_indices(&mut l2g);
        b.assign_local_indices(&mut l2g);
        assert_eq!(l2g, vec![5, 7, 2, 9, 3, 1]);
        assert_eq!(a.local(), &[0, 1, 2, 3]);
        assert_eq!(b.local(), &[0, 3, 4, 5]);
    }
}
