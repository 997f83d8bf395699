// crates/zisa_physics/src/model/euler.rs

//! 带重力的二维 Euler 方程
//!
//! 物理通量以法向旋转后的守恒量计算，只需要 x 方向的通量函数。

use glam::DVec2;
use zisa_config::EulerConfig;
use zisa_foundation::ZisaResult;

use super::eos::IdealGasEos;
use super::gravity::Gravity;
use super::variables::{EulerVars, RhoP};

/// Euler 方程：状态方程加重力
#[derive(Debug, Clone, PartialEq)]
pub struct Euler {
    /// 状态方程
    pub eos: IdealGasEos,
    /// 重力
    pub gravity: Gravity,
}

impl Euler {
    /// 创建
    pub fn new(eos: IdealGasEos, gravity: Gravity) -> Self {
        Self { eos, gravity }
    }

    /// 从配置创建
    pub fn from_config(config: &EulerConfig) -> ZisaResult<Self> {
        Ok(Self::new(
            IdealGasEos::from_config(&config.eos),
            Gravity::from_config(&config.gravity)?,
        ))
    }

    /// 旋转坐标系中的物理通量 `(m1, v m1 + p, v m2, v m3, v (E + p))`
    #[inline]
    pub fn flux(&self, u: &EulerVars, p: f64) -> EulerVars {
        let v = u[1] / u[0];
        EulerVars::new(u[1], v * u[1] + p, v * u[2], v * u[3], v * (u[4] + p))
    }

    /// 物理通量，压强由状态方程计算
    #[inline]
    pub fn flux_of(&self, u: &EulerVars) -> EulerVars {
        self.flux(u, self.eos.pressure(u))
    }

    /// 最大特征速度 `|v| + a`（旋转坐标系中）
    #[inline]
    pub fn max_eigen_value(&self, u: &EulerVars) -> f64 {
        let v = u[1] / u[0];
        let p = self.eos.pressure(u);
        v.abs() + self.eos.sound_speed(u[0], p)
    }

    /// 全局坐标系中的最大特征速度 `|v| + a`
    #[inline]
    pub fn max_wave_speed(&self, u: &EulerVars) -> f64 {
        let v = DVec2::new(u[1], u[2]).length() / u[0];
        let p = self.eos.pressure(u);
        v + self.eos.sound_speed(u[0], p)
    }

    /// 动能密度
    #[inline]
    pub fn kinetic_energy(&self, u: &EulerVars) -> f64 {
        self.eos.kinetic_energy(u)
    }

    /// 总能量 `p/(γ-1) + ½ρ|v|²`
    #[inline]
    pub fn energy(&self, rho: f64, vx: f64, vy: f64, p: f64) -> f64 {
        self.eos.internal_energy_from_pressure(p) + 0.5 * rho * (vx * vx + vy * vy)
    }

    /// 由原始变量构造守恒量
    pub fn cvars(&self, rho: f64, vx: f64, vy: f64, p: f64) -> EulerVars {
        EulerVars::new(rho, rho * vx, rho * vy, 0.0, self.energy(rho, vx, vy, p))
    }

    /// 原始变量 `(ρ, vx, vy, p)`
    #[inline]
    pub fn natural_variables(&self, u: &EulerVars) -> [f64; 4] {
        [u[0], u[1] / u[0], u[2] / u[0], self.eos.pressure(u)]
    }

    /// 静止气体
    pub fn at_rest(&self, rho_p: RhoP) -> EulerVars {
        self.eos.cvars_from_rho_p(rho_p)
    }

    /// 重力源项 `(0, -ρ ∂xφ, -ρ ∂yφ, 0, -m·∇φ)`
    #[inline]
    pub fn source(&self, u: &EulerVars, x: DVec2) -> EulerVars {
        let grad = self.gravity.grad_phi(x);
        EulerVars::new(
            0.0,
            -u[0] * grad.x,
            -u[0] * grad.y,
            0.0,
            -(u[1] * grad.x + u[2] * grad.y),
        )
    }

    /// 描述
    pub fn describe(&self) -> String {
        format!(
            "Euler(gamma = {}, R = {}, gravity = {})",
            self.eos.gamma(),
            self.eos.specific_gas_constant(),
            self.gravity.describe()
        )
    }
}

/// 物理上可接受的状态：`ρ > 0`、`E > 0` 且全部有限
#[inline]
pub fn is_plausible(u: &EulerVars) -> bool {
    u.iter().all(|v| v.is_finite()) && u[0] > 0.0 && u[4] > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::variables::{coord_transform, inv_coord_transform};

    fn euler() -> Euler {
        Euler::new(IdealGasEos::new(1.4, 1.0), Gravity::none())
    }

    #[test]
    fn test_flux_at_rest_is_pressure() {
        let euler = euler();
        let u = euler.at_rest(RhoP::new(1.0, 2.0));
        let f = euler.flux_of(&u);
        assert_eq!(f, EulerVars::new(0.0, 2.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_flux_rotation_invariance() {
        // F(u)·n 等于旋转后计算 x 通量再转回
        let euler = euler();
        let u = euler.cvars(1.3, 0.4, -0.2, 1.1);
        let n = DVec2::new(1.0, 1.0).normalize();
        let f = inv_coord_transform(&euler.flux_of(&coord_transform(&u, n)), n);

        let (rho, vx, vy, p) = (1.3, 0.4, -0.2, 1.1);
        let e = u[4];
        let fx = EulerVars::new(rho * vx, rho * vx * vx + p, rho * vx * vy, 0.0, vx * (e + p));
        let fy = EulerVars::new(rho * vy, rho * vx * vy, rho * vy * vy + p, 0.0, vy * (e + p));
        let expected = fx * n.x + fy * n.y;
        assert!((f - expected).norm() < 1e-14);
    }

    #[test]
    fn test_natural_variables() {
        let euler = euler();
        let u = euler.cvars(2.0, 1.0, -1.0, 3.0);
        let [rho, vx, vy, p] = euler.natural_variables(&u);
        assert!((rho - 2.0).abs() < 1e-15);
        assert!((vx - 1.0).abs() < 1e-15);
        assert!((vy + 1.0).abs() < 1e-15);
        assert!((p - 3.0).abs() < 1e-14);
    }

    #[test]
    fn test_is_plausible() {
        assert!(is_plausible(&EulerVars::new(1.0, 0.0, 0.0, 0.0, 1.0)));
        assert!(!is_plausible(&EulerVars::new(-1.0, 0.0, 0.0, 0.0, 1.0)));
        assert!(!is_plausible(&EulerVars::new(1.0, f64::NAN, 0.0, 0.0, 1.0)));
    }
}
