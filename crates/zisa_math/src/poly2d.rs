// crates/zisa_math/src/poly2d.rs

//! 二维多项式，用于 WENO 重构
//!
//! 多项式以单元中心 `x0` 和特征长度 `l0` 归一化：
//!
//! ```text
//! p(x) = Σ_i a_i (X^kx Y^ky - c_i),   X = (x - x0) / l0
//! ```
//!
//! 其中 `c_i` 是单元的归一化矩 `avg(X^kx Y^ky)`。由于 `c_0 = 0`，
//! 多项式的单元平均值恰为 `a_0`。系数按总次数分组排列：
//! `(0,0), (1,0), (0,1), (2,0), (1,1), (0,2), ...`

use glam::DVec2;
use std::ops::{AddAssign, MulAssign, SubAssign};

use zisa_foundation::float::ipow;
use zisa_foundation::ZisaResult;

use crate::geometry::Triangle;
use crate::quadrature::TriangularRule;

/// 支持的最高多项式次数
pub const MAX_DEGREE: usize = 4;

/// 最高次数对应的系数个数
pub const MAX_DOF: usize = poly_dof(MAX_DEGREE);

/// `deg` 次二维多项式的自由度
#[inline]
pub const fn poly_dof(deg: usize) -> usize {
    (deg + 1) * (deg + 2) / 2
}

/// 单项式 `x^kx y^ky` 的线性索引
#[inline]
pub const fn poly_index(kx: usize, ky: usize) -> usize {
    let d = kx + ky;
    d * (d + 1) / 2 + ky
}

/// 系数个数不超过 `n_coeffs` 的最高次数
pub fn poly_degree(n_coeffs: usize) -> usize {
    let mut deg = 0;
    while poly_dof(deg + 1) <= n_coeffs {
        deg += 1;
    }
    deg
}

/// 按线性索引顺序枚举 `(kx, ky)`，总次数不超过 `deg`
pub fn monomials(deg: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..=deg).flat_map(|d| (0..=d).map(move |ky| (d - ky, ky)))
}

/// 三角形的归一化矩 `avg(X^kx Y^ky)`，`X = (x - barycenter) / characteristic_length`
pub fn normalized_moments(tri: &Triangle, deg: usize, quad_deg: usize) -> ZisaResult<[f64; MAX_DOF]> {
    let qr = TriangularRule::new(quad_deg)?.denormalize(tri);
    let center = tri.barycenter();
    let length = tri.characteristic_length();

    let mut m = [0.0; MAX_DOF];
    for (kx, ky) in monomials(deg.min(MAX_DEGREE)) {
        m[poly_index(kx, ky)] = qr.average(|x| {
            let xr = (x - center) / length;
            ipow(xr.x, kx) * ipow(xr.y, ky)
        });
    }
    // 数值上强制为零
    m[0] = 0.0;
    m[poly_index(1, 0)] = 0.0;
    m[poly_index(0, 1)] = 0.0;

    Ok(m)
}

// ============================================================================
// Poly2D
// ============================================================================

/// `N` 个变量共享同一组单项式的二维多项式
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Poly2D<const N: usize> {
    degree: usize,
    coeffs: [[f64; N]; MAX_DOF],
    moments: [f64; MAX_DOF],
    x_center: DVec2,
    reference_length: f64,
}

impl<const N: usize> Poly2D<N> {
    /// 零多项式
    pub fn zeros(degree: usize, moments: [f64; MAX_DOF], x_center: DVec2, reference_length: f64) -> Self {
        Self {
            degree: degree.min(MAX_DEGREE),
            coeffs: [[0.0; N]; MAX_DOF],
            moments,
            x_center,
            reference_length,
        }
    }

    /// 常数多项式
    pub fn constant(value: [f64; N], x_center: DVec2, reference_length: f64) -> Self {
        let mut p = Self::zeros(0, [0.0; MAX_DOF], x_center, reference_length);
        p.coeffs[0] = value;
        p
    }

    /// 次数
    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// 当前次数的系数个数
    #[inline]
    pub fn dof(&self) -> usize {
        poly_dof(self.degree)
    }

    /// 中心
    #[inline]
    pub fn x_center(&self) -> DVec2 {
        self.x_center
    }

    /// 归一化长度
    #[inline]
    pub fn reference_length(&self) -> f64 {
        self.reference_length
    }

    /// 第 `i` 个单项式的系数
    #[inline]
    pub fn a(&self, i: usize) -> &[f64; N] {
        &self.coeffs[i]
    }

    /// 第 `i` 个单项式的系数（可变）
    #[inline]
    pub fn a_mut(&mut self, i: usize) -> &mut [f64; N] {
        &mut self.coeffs[i]
    }

    /// 第 `i` 个归一化矩
    #[inline]
    pub fn c(&self, i: usize) -> f64 {
        self.moments[i]
    }

    /// 单元平均值（常数项）
    #[inline]
    pub fn average(&self) -> [f64; N] {
        self.coeffs[0]
    }

    /// 在点 `x` 处求值
    pub fn eval(&self, x: DVec2) -> [f64; N] {
        let xr = (x - self.x_center) / self.reference_length;
        let d = self.degree;

        let mut px = [0.0; N];
        let mut pow_x = 1.0;
        for kx in 0..=d {
            let mut pow_y = 1.0;
            for ky in 0..=(d - kx) {
                let i = poly_index(kx, ky);
                let basis = pow_x * pow_y - self.moments[i];
                for (p, a) in px.iter_mut().zip(&self.coeffs[i]) {
                    *p += a * basis;
                }
                pow_y *= xr.y;
            }
            pow_x *= xr.x;
        }
        px
    }

    /// 光滑度指示子：每个变量非常数项系数的平方和
    pub fn smoothness_indicator(&self) -> [f64; N] {
        let mut beta = [0.0; N];
        for i in 1..self.dof() {
            for (b, a) in beta.iter_mut().zip(&self.coeffs[i]) {
                *b += a * a;
            }
        }
        beta
    }
}

impl<const N: usize> AddAssign<&Poly2D<N>> for Poly2D<N> {
    fn add_assign(&mut self, rhs: &Poly2D<N>) {
        if rhs.degree > self.degree {
            self.moments = rhs.moments;
            self.degree = rhs.degree;
        }
        for i in 0..poly_dof(rhs.degree) {
            for k in 0..N {
                self.coeffs[i][k] += rhs.coeffs[i][k];
            }
        }
    }
}

impl<const N: usize> SubAssign<&Poly2D<N>> for Poly2D<N> {
    fn sub_assign(&mut self, rhs: &Poly2D<N>) {
        if rhs.degree > self.degree {
            self.moments = rhs.moments;
            self.degree = rhs.degree;
        }
        for i in 0..poly_dof(rhs.degree) {
            for k in 0..N {
                self.coeffs[i][k] -= rhs.coeffs[i][k];
            }
        }
    }
}

impl<const N: usize> MulAssign<f64> for Poly2D<N> {
    fn mul_assign(&mut self, alpha: f64) {
        for c in self.coeffs.iter_mut().take(poly_dof(self.degree)) {
            for v in c.iter_mut() {
                *v *= alpha;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Triangle {
        Triangle::new(DVec2::new(0.1, 0.2), DVec2::new(0.6, 0.25), DVec2::new(0.3, 0.7))
    }

    #[test]
    fn test_poly_index_ordering() {
        assert_eq!(poly_index(0, 0), 0);
        assert_eq!(poly_index(1, 0), 1);
        assert_eq!(poly_index(0, 1), 2);
        assert_eq!(poly_index(2, 0), 3);
        assert_eq!(poly_index(1, 1), 4);
        assert_eq!(poly_index(0, 2), 5);
        assert_eq!(poly_index(3, 0), 6);
        let collected: Vec<_> = monomials(3).map(|(kx, ky)| poly_index(kx, ky)).collect();
        assert_eq!(collected, (0..poly_dof(3)).collect::<Vec<_>>());
    }

    #[test]
    fn test_poly_degree() {
        assert_eq!(poly_degree(1), 0);
        assert_eq!(poly_degree(3), 1);
        assert_eq!(poly_degree(5), 1);
        assert_eq!(poly_degree(6), 2);
        assert_eq!(poly_degree(MAX_DOF), MAX_DEGREE);
    }

    #[test]
    fn test_average_is_constant_coefficient() {
        let tri = triangle();
        let moments = normalized_moments(&tri, MAX_DEGREE, 5).unwrap();
        let mut p = Poly2D::<2>::zeros(3, moments, tri.barycenter(), tri.characteristic_length());
        for i in 0..p.dof() {
            *p.a_mut(i) = [0.3 * i as f64 - 0.5, 1.0 / (i as f64 + 1.0)];
        }

        let qr = TriangularRule::new(5).unwrap().denormalize(&tri);
        let avg0 = qr.average(|x| p.eval(x)[0]);
        let avg1 = qr.average(|x| p.eval(x)[1]);
        assert!((avg0 - p.average()[0]).abs() < 1e-13);
        assert!((avg1 - p.average()[1]).abs() < 1e-13);
    }

    #[test]
    fn test_linear_poly_evaluation() {
        let x0 = DVec2::new(1.0, 2.0);
        let mut p = Poly2D::<1>::zeros(1, [0.0; MAX_DOF], x0, 2.0);
        *p.a_mut(0) = [1.0];
        *p.a_mut(1) = [4.0];
        *p.a_mut(2) = [-2.0];
        // 1 + 4 (x - 1)/2 - 2 (y - 2)/2
        let v = p.eval(DVec2::new(3.0, 3.0))[0];
        assert!((v - (1.0 + 4.0 - 1.0)).abs() < 1e-14);
    }

    #[test]
    fn test_smoothness_indicator_ignores_constant() {
        let mut p = Poly2D::<2>::constant([5.0, -3.0], DVec2::ZERO, 1.0);
        assert_eq!(p.smoothness_indicator(), [0.0, 0.0]);

        let mut q = Poly2D::<2>::zeros(1, [0.0; MAX_DOF], DVec2::ZERO, 1.0);
        *q.a_mut(1) = [1.0, 2.0];
        *q.a_mut(2) = [2.0, 0.0];
        p += &q;
        assert_eq!(p.degree(), 1);
        assert_eq!(p.smoothness_indicator(), [5.0, 4.0]);

        p *= 2.0;
        assert_eq!(p.average(), [10.0, -6.0]);
        p -= &q;
        assert_eq!(*p.a(1), [1.0, 2.0]);
    }
}
