// crates/zisa_math/src/quadrature.rs

//! 数值积分规则
//!
//! # 模块概览
//!
//! - [`GaussLegendre`]: `[-1, 1]` 上的 Gauss-Legendre 点与权重（Newton 迭代求根）
//! - [`EdgeRule`]: 边上的求积规则，权重归一化到和为 1
//! - [`TriangularRule`]: 三角形上的对称求积规则（重心坐标，1-5 阶）
//! - [`DenormalizedRule`]: 映射到具体几何体上的规则，权重包含体积
//!
//! 参考：Dunavant, "High degree efficient symmetrical Gaussian quadrature rules
//! for the triangle", IJNME 1985.

use glam::DVec2;
use std::ops::{Add, Mul};

use zisa_foundation::{ZisaError, ZisaResult};

use crate::geometry::{Edge, Triangle};

/// 三角形求积规则支持的最高阶
pub const MAX_TRIANGULAR_RULE_DEGREE: usize = 5;

// ============================================================================
// Gauss-Legendre
// ============================================================================

/// `[-1, 1]` 上的 n 点 Gauss-Legendre 规则
#[derive(Debug, Clone, PartialEq)]
pub struct GaussLegendre {
    /// 积分点（升序）
    pub points: Vec<f64>,
    /// 权重，和为 2
    pub weights: Vec<f64>,
}

impl GaussLegendre {
    /// 计算 n 点规则
    ///
    /// 以 Chebyshev 型初值 `cos(π (k + 3/4) / (n + 1/2))` 对 Legendre
    /// 多项式做 Newton 迭代。
    pub fn new(n: usize) -> Self {
        let n = n.max(1);
        let mut points = vec![0.0; n];
        let mut weights = vec![0.0; n];

        for k in 0..n.div_ceil(2) {
            let mut x = (std::f64::consts::PI * (k as f64 + 0.75) / (n as f64 + 0.5)).cos();
            for _ in 0..100 {
                let (p, dp) = legendre(n, x);
                let dx = p / dp;
                x -= dx;
                if dx.abs() < 1e-15 {
                    break;
                }
            }
            let (_, dp) = legendre(n, x);
            let w = 2.0 / ((1.0 - x * x) * dp * dp);
            points[k] = -x;
            points[n - 1 - k] = x;
            weights[k] = w;
            weights[n - 1 - k] = w;
        }

        if n % 2 == 1 {
            points[n / 2] = 0.0;
        }

        Self { points, weights }
    }

    /// 点数
    pub fn n_points(&self) -> usize {
        self.points.len()
    }
}

/// Legendre 多项式 `P_n(x)` 及其导数（三项递推）
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let kf = k as f64;
        let p2 = ((2.0 * kf - 1.0) * x * p1 - (kf - 1.0) * p0) / kf;
        p0 = p1;
        p1 = p2;
    }
    let nf = n as f64;
    let dp = nf * (x * p1 - p0) / (x * x - 1.0);
    (p1, dp)
}

// ============================================================================
// 边上规则
// ============================================================================

/// 边上的归一化求积规则（参考坐标 `[-1, 1]`，权重和为 1）
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRule {
    /// 参考坐标
    pub points: Vec<f64>,
    /// 归一化权重
    pub weights: Vec<f64>,
}

impl EdgeRule {
    /// 对 `deg` 次多项式精确的规则，使用 `(deg + 1) / 2` 个点
    pub fn new(deg: usize) -> Self {
        let n = ((deg + 1) / 2).max(1);
        let gl = GaussLegendre::new(n);
        Self {
            points: gl.points,
            weights: gl.weights.iter().map(|w| 0.5 * w).collect(),
        }
    }

    /// 映射到具体的边
    pub fn denormalize(&self, edge: &Edge) -> DenormalizedRule {
        let length = edge.length();
        DenormalizedRule {
            points: self.points.iter().map(|&xi| edge.coord(xi)).collect(),
            weights: self.weights.iter().map(|w| w * length).collect(),
            volume: length,
        }
    }
}

// ============================================================================
// 三角形规则
// ============================================================================

/// 三角形上的对称求积规则（重心坐标，权重和为 1）
#[derive(Debug, Clone, PartialEq)]
pub struct TriangularRule {
    /// 重心坐标
    pub points: Vec<[f64; 3]>,
    /// 归一化权重
    pub weights: Vec<f64>,
}

impl TriangularRule {
    /// 对 `deg` 次多项式精确的规则
    pub fn new(deg: usize) -> ZisaResult<Self> {
        let mut rule = Self {
            points: Vec::new(),
            weights: Vec::new(),
        };

        match deg {
            0 | 1 => rule.push_center(1.0),
            2 => rule.push_orbit(1.0 / 3.0, 2.0 / 3.0, 1.0 / 6.0),
            3 => {
                rule.push_center(-0.5625);
                rule.push_orbit(1.5625 / 3.0, 0.6, 0.2);
            }
            4 => {
                rule.push_orbit(0.109951743655322, 0.816847572980459, 0.091576213509771);
                rule.push_orbit(0.223381589678011, 0.108103018168070, 0.445948490915965);
            }
            5 => {
                rule.push_center(0.225);
                rule.push_orbit(0.132394152788506, 0.059715871789770, 0.470142064105115);
                rule.push_orbit(0.125939180544827, 0.797426985353087, 0.101286507323456);
            }
            _ => {
                return Err(ZisaError::out_of_range(
                    "triangular_rule.degree",
                    deg as f64,
                    0.0,
                    MAX_TRIANGULAR_RULE_DEGREE as f64,
                ))
            }
        }

        Ok(rule)
    }

    fn push_center(&mut self, w: f64) {
        self.points.push([1.0 / 3.0; 3]);
        self.weights.push(w);
    }

    /// 三个置换点 (a, b, b), (b, a, b), (b, b, a)
    fn push_orbit(&mut self, w: f64, a: f64, b: f64) {
        self.points.push([a, b, b]);
        self.points.push([b, a, b]);
        self.points.push([b, b, a]);
        self.weights.extend([w, w, w]);
    }

    /// 点数
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    /// 映射到具体的三角形
    pub fn denormalize(&self, tri: &Triangle) -> DenormalizedRule {
        let area = tri.area();
        DenormalizedRule {
            points: self.points.iter().map(|&l| tri.coord(l)).collect(),
            weights: self.weights.iter().map(|w| w * area).collect(),
            volume: area,
        }
    }
}

// ============================================================================
// 去归一化规则
// ============================================================================

/// 映射到具体几何体的求积规则
///
/// 权重已乘以体积，`Σ w_i f(x_i)` 即积分值。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DenormalizedRule {
    /// 物理坐标
    pub points: Vec<DVec2>,
    /// 含体积的权重
    pub weights: Vec<f64>,
    /// 几何体体积（面积或长度）
    pub volume: f64,
}

impl DenormalizedRule {
    /// 积分 `∫ f`
    ///
    /// 返回类型只需支持加法和标量乘法，标量、二维向量和守恒量向量都可直接使用。
    pub fn integrate<T, F>(&self, f: F) -> T
    where
        F: Fn(DVec2) -> T,
        T: Add<Output = T> + Mul<f64, Output = T>,
    {
        let mut acc = f(self.points[0]) * self.weights[0];
        for (x, &w) in self.points.iter().zip(&self.weights).skip(1) {
            acc = acc + f(*x) * w;
        }
        acc
    }

    /// 平均值 `∫ f / |Ω|`
    pub fn average<T, F>(&self, f: F) -> T
    where
        F: Fn(DVec2) -> T,
        T: Add<Output = T> + Mul<f64, Output = T>,
    {
        self.integrate(f) * (1.0 / self.volume)
    }

    /// 点数
    pub fn n_points(&self) -> usize {
        self.points.len()
    }
}

/// 直接在三角形上积分
pub fn integrate_triangle<T, F>(tri: &Triangle, deg: usize, f: F) -> ZisaResult<T>
where
    F: Fn(DVec2) -> T,
    T: Add<Output = T> + Mul<f64, Output = T>,
{
    Ok(TriangularRule::new(deg)?.denormalize(tri).integrate(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauss_legendre_known_values() {
        let gl = GaussLegendre::new(2);
        let x = 1.0 / 3.0_f64.sqrt();
        assert!((gl.points[0] + x).abs() < 1e-14);
        assert!((gl.points[1] - x).abs() < 1e-14);
        assert!((gl.weights[0] - 1.0).abs() < 1e-14);

        let gl = GaussLegendre::new(3);
        assert!((gl.points[2] - 0.6_f64.sqrt()).abs() < 1e-14);
        assert!((gl.weights[1] - 8.0 / 9.0).abs() < 1e-14);
        assert!(gl.points[1].abs() < 1e-15);
    }

    #[test]
    fn test_gauss_legendre_exactness() {
        for n in 1..=6 {
            let gl = GaussLegendre::new(n);
            for p in 0..(2 * n) {
                let approx: f64 = gl
                    .points
                    .iter()
                    .zip(&gl.weights)
                    .map(|(x, w)| w * x.powi(p as i32))
                    .sum();
                let exact = if p % 2 == 0 { 2.0 / (p as f64 + 1.0) } else { 0.0 };
                assert!((approx - exact).abs() < 1e-13, "n = {n}, p = {p}");
            }
        }
    }

    #[test]
    fn test_edge_rule_weights_sum_to_one() {
        for deg in 0..8 {
            let rule = EdgeRule::new(deg);
            let s: f64 = rule.weights.iter().sum();
            assert!((s - 1.0).abs() < 1e-14);
        }
    }

    #[test]
    fn test_edge_integration() {
        let edge = Edge::new(DVec2::new(0.0, 0.0), DVec2::new(2.0, 0.0));
        let qr = EdgeRule::new(3).denormalize(&edge);
        let integral = qr.integrate(|x| x.x * x.x * x.x);
        assert!((integral - 4.0).abs() < 1e-13);
        assert!((qr.volume - 2.0).abs() < 1e-15);
    }

    #[test]
    fn test_triangular_rule_exactness() {
        // ∫_T x^p y^q = p! q! / (p + q + 2)! 在参考三角形上
        fn factorial(n: usize) -> f64 {
            (1..=n).map(|k| k as f64).product()
        }

        let tri = Triangle::reference();
        for deg in 1..=MAX_TRIANGULAR_RULE_DEGREE {
            let qr = TriangularRule::new(deg).unwrap().denormalize(&tri);
            for p in 0..=deg {
                for q in 0..=(deg - p) {
                    let approx = qr.integrate(|x| x.x.powi(p as i32) * x.y.powi(q as i32));
                    let exact = factorial(p) * factorial(q) / factorial(p + q + 2);
                    assert!(
                        (approx - exact).abs() < 1e-12,
                        "deg = {deg}, p = {p}, q = {q}: {approx} vs {exact}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_triangular_rule_rejects_high_degree() {
        assert!(TriangularRule::new(6).is_err());
    }

    #[test]
    fn test_average_of_vector_valued_function() {
        let tri = Triangle::new(DVec2::ZERO, DVec2::new(2.0, 0.0), DVec2::new(0.0, 2.0));
        let qr = TriangularRule::new(2).unwrap().denormalize(&tri);
        let avg: DVec2 = qr.average(|x| x);
        assert!(avg.distance(tri.barycenter()) < 1e-14);
    }
}
