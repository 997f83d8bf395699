// crates/zisa_physics/src/model/variables.rs

//! Euler 方程的变量表示
//!
//! 守恒量 `u = (ρ, m1, m2, m3, E)` 以 `nalgebra::SVector<f64, 5>` 存储，
//! 第三个动量分量在二维问题中恒为零，仅为保持与三维格式一致。
//! 其余热力学变量组合（`RhoE`、`RhoP` 等）是轻量的 `Copy` 结构体。

use std::ops::{Add, Mul, Sub};

use glam::DVec2;
use nalgebra::SVector;
use zisa_math::rotate_left;

/// 守恒变量个数
pub const N_CVARS: usize = 5;

/// 守恒变量 `(ρ, m1, m2, m3, E)`
pub type EulerVars = SVector<f64, N_CVARS>;

/// 转为数组
#[inline]
pub fn to_array(u: &EulerVars) -> [f64; N_CVARS] {
    [u[0], u[1], u[2], u[3], u[4]]
}

/// 由数组构造
#[inline]
pub fn from_array(a: [f64; N_CVARS]) -> EulerVars {
    EulerVars::new(a[0], a[1], a[2], a[3], a[4])
}

/// 将动量旋转到以 `n` 为法向的局部坐标系 `(n, t)`，`t = rotate_left(n)`
#[inline]
pub fn coord_transform(u: &EulerVars, n: DVec2) -> EulerVars {
    let t = rotate_left(n);
    let m = DVec2::new(u[1], u[2]);
    EulerVars::new(u[0], m.dot(n), m.dot(t), u[3], u[4])
}

/// [`coord_transform`] 的逆变换
#[inline]
pub fn inv_coord_transform(u: &EulerVars, n: DVec2) -> EulerVars {
    let t = rotate_left(n);
    let m = u[1] * n + u[2] * t;
    EulerVars::new(u[0], m.x, m.y, u[3], u[4])
}

// ============================================================================
// 热力学变量组合
// ============================================================================

/// 密度与内能密度
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RhoE {
    /// 密度
    pub rho: f64,
    /// 内能密度（静止时等于总能量）
    pub e: f64,
}

impl RhoE {
    /// 创建
    pub fn new(rho: f64, e: f64) -> Self {
        Self { rho, e }
    }

    /// 作为二维向量（供二维求根使用）
    pub fn to_vec(self) -> DVec2 {
        DVec2::new(self.rho, self.e)
    }

    /// 从二维向量恢复
    pub fn from_vec(v: DVec2) -> Self {
        Self { rho: v.x, e: v.y }
    }
}

impl Add for RhoE {
    type Output = RhoE;

    fn add(self, rhs: RhoE) -> RhoE {
        RhoE::new(self.rho + rhs.rho, self.e + rhs.e)
    }
}

impl Sub for RhoE {
    type Output = RhoE;

    fn sub(self, rhs: RhoE) -> RhoE {
        RhoE::new(self.rho - rhs.rho, self.e - rhs.e)
    }
}

impl Mul<f64> for RhoE {
    type Output = RhoE;

    fn mul(self, alpha: f64) -> RhoE {
        RhoE::new(alpha * self.rho, alpha * self.e)
    }
}

/// 密度与压强
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RhoP {
    /// 密度
    pub rho: f64,
    /// 压强
    pub p: f64,
}

impl RhoP {
    /// 创建
    pub fn new(rho: f64, p: f64) -> Self {
        Self { rho, p }
    }
}

/// 密度与温度
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RhoT {
    /// 密度
    pub rho: f64,
    /// 温度
    pub t: f64,
}

/// 比焓与熵常数 `K = p / ρ^γ`，参数化等熵平衡态
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnthalpyEntropy {
    /// 比焓
    pub h: f64,
    /// 熵常数
    pub k: f64,
}

impl EnthalpyEntropy {
    /// 创建
    pub fn new(h: f64, k: f64) -> Self {
        Self { h, k }
    }

    /// 作为二维向量
    pub fn to_vec(self) -> DVec2 {
        DVec2::new(self.h, self.k)
    }

    /// 从二维向量恢复
    pub fn from_vec(v: DVec2) -> Self {
        Self { h: v.x, k: v.y }
    }
}

/// 密度与熵常数
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RhoEntropy {
    /// 密度
    pub rho: f64,
    /// 熵常数
    pub k: f64,
}

/// 由守恒量导出的扩展变量
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExtendedVariables {
    /// 压强
    pub p: f64,
    /// 声速
    pub a: f64,
    /// 比焓
    pub h: f64,
    /// 熵常数
    pub k: f64,
}
