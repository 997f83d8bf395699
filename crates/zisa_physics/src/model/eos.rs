// crates/zisa_physics/src/model/eos.rs

//! 理想气体状态方程
//!
//! `p = (γ - 1) ρ e`，其中 `ρ e = E - ½|m|²/ρ` 为内能密度。
//! 提供守恒量与各组热力学变量之间的换算，等熵平衡态由
//! `(h, K)` 参数化，`K = p / ρ^γ`。

use zisa_config::EosConfig;

use super::variables::{
    EnthalpyEntropy, EulerVars, ExtendedVariables, RhoE, RhoEntropy, RhoP, RhoT,
};

/// 理想气体状态方程
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdealGasEos {
    gamma: f64,
    specific_gas_constant: f64,
}

impl IdealGasEos {
    /// 创建
    pub fn new(gamma: f64, specific_gas_constant: f64) -> Self {
        Self {
            gamma,
            specific_gas_constant,
        }
    }

    /// 从配置创建
    pub fn from_config(config: &EosConfig) -> Self {
        Self::new(config.gamma, config.specific_gas_constant)
    }

    /// 绝热指数 γ
    #[inline]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// 比气体常数 R
    #[inline]
    pub fn specific_gas_constant(&self) -> f64 {
        self.specific_gas_constant
    }

    /// 定容比热 `cV = R / (γ - 1)`
    #[inline]
    pub fn cv(&self) -> f64 {
        self.specific_gas_constant / (self.gamma - 1.0)
    }

    // ------------------------------------------------------------------------
    // 由守恒量
    // ------------------------------------------------------------------------

    /// 动能密度 `½|m|²/ρ`
    #[inline]
    pub fn kinetic_energy(&self, u: &EulerVars) -> f64 {
        0.5 * (u[1] * u[1] + u[2] * u[2] + u[3] * u[3]) / u[0]
    }

    /// 内能密度
    #[inline]
    pub fn internal_energy(&self, u: &EulerVars) -> f64 {
        u[4] - self.kinetic_energy(u)
    }

    /// 压强
    #[inline]
    pub fn pressure(&self, u: &EulerVars) -> f64 {
        (self.gamma - 1.0) * self.internal_energy(u)
    }

    /// `(ρ, ρe)`
    #[inline]
    pub fn rho_e(&self, u: &EulerVars) -> RhoE {
        RhoE::new(u[0], self.internal_energy(u))
    }

    /// `(ρ, p)`
    #[inline]
    pub fn rho_p(&self, u: &EulerVars) -> RhoP {
        RhoP::new(u[0], self.pressure(u))
    }

    /// 扩展变量 `(p, a, h, K)`
    pub fn xvars(&self, u: &EulerVars) -> ExtendedVariables {
        let rho = u[0];
        let p = self.pressure(u);
        ExtendedVariables {
            p,
            a: self.sound_speed(rho, p),
            h: self.enthalpy(rho, p),
            k: self.entropy(rho, p),
        }
    }

    // ------------------------------------------------------------------------
    // 由 (ρ, p)
    // ------------------------------------------------------------------------

    /// 声速平方 `γ p / ρ`
    #[inline]
    pub fn sound_speed_sq(&self, rho: f64, p: f64) -> f64 {
        self.gamma * p / rho
    }

    /// 声速
    #[inline]
    pub fn sound_speed(&self, rho: f64, p: f64) -> f64 {
        self.sound_speed_sq(rho, p).sqrt()
    }

    /// 比焓 `γ/(γ-1) p/ρ`
    #[inline]
    pub fn enthalpy(&self, rho: f64, p: f64) -> f64 {
        self.gamma / (self.gamma - 1.0) * p / rho
    }

    /// 熵常数 `K = p / ρ^γ`
    #[inline]
    pub fn entropy(&self, rho: f64, p: f64) -> f64 {
        p / rho.powf(self.gamma)
    }

    /// 物理熵 `cV ln(p / ρ^γ)`
    #[inline]
    pub fn physical_entropy(&self, rho: f64, p: f64) -> f64 {
        self.cv() * self.entropy(rho, p).ln()
    }

    /// 温度 `p / (ρ R)`
    #[inline]
    pub fn temperature(&self, rho: f64, p: f64) -> f64 {
        p / (rho * self.specific_gas_constant)
    }

    /// 内能密度 `p / (γ - 1)`
    #[inline]
    pub fn internal_energy_from_pressure(&self, p: f64) -> f64 {
        p / (self.gamma - 1.0)
    }

    // ------------------------------------------------------------------------
    // 变量组之间的换算
    // ------------------------------------------------------------------------

    /// `(ρ, ρe) → (ρ, p)`
    #[inline]
    pub fn rho_p_from_rho_e(&self, rho_e: RhoE) -> RhoP {
        RhoP::new(rho_e.rho, (self.gamma - 1.0) * rho_e.e)
    }

    /// `(ρ, p) → (ρ, ρe)`
    #[inline]
    pub fn rho_e_from_rho_p(&self, rho_p: RhoP) -> RhoE {
        RhoE::new(rho_p.rho, self.internal_energy_from_pressure(rho_p.p))
    }

    /// `(ρ, T) → (ρ, p)`
    #[inline]
    pub fn rho_p_from_rho_t(&self, rho_t: RhoT) -> RhoP {
        RhoP::new(rho_t.rho, rho_t.rho * self.specific_gas_constant * rho_t.t)
    }

    /// `(ρ, p) → (ρ, T)`
    #[inline]
    pub fn rho_t_from_rho_p(&self, rho_p: RhoP) -> RhoT {
        RhoT {
            rho: rho_p.rho,
            t: self.temperature(rho_p.rho, rho_p.p),
        }
    }

    /// `(ρ, K) → (ρ, p)`
    #[inline]
    pub fn rho_p_from_rho_entropy(&self, rho_k: RhoEntropy) -> RhoP {
        RhoP::new(rho_k.rho, rho_k.k * rho_k.rho.powf(self.gamma))
    }

    /// `(ρ, ρe) → (h, K)`
    pub fn enthalpy_entropy(&self, rho_e: RhoE) -> EnthalpyEntropy {
        let RhoP { rho, p } = self.rho_p_from_rho_e(rho_e);
        EnthalpyEntropy::new(self.enthalpy(rho, p), self.entropy(rho, p))
    }

    /// `ρ = ((γ-1)/γ · h/K)^{1/(γ-1)}`
    #[inline]
    pub fn rho_from_enthalpy_entropy(&self, theta: EnthalpyEntropy) -> f64 {
        ((self.gamma - 1.0) / self.gamma * theta.h / theta.k).powf(1.0 / (self.gamma - 1.0))
    }

    /// `(h, K) → (ρ, ρe)`
    pub fn rho_e_from_enthalpy_entropy(&self, theta: EnthalpyEntropy) -> RhoE {
        let rho = self.rho_from_enthalpy_entropy(theta);
        let p = theta.k * rho.powf(self.gamma);
        RhoE::new(rho, self.internal_energy_from_pressure(p))
    }

    /// 静止守恒量 `(ρ, 0, 0, 0, ρe)`
    #[inline]
    pub fn cvars_from_rho_e(&self, rho_e: RhoE) -> EulerVars {
        EulerVars::new(rho_e.rho, 0.0, 0.0, 0.0, rho_e.e)
    }

    /// 静止守恒量
    #[inline]
    pub fn cvars_from_rho_p(&self, rho_p: RhoP) -> EulerVars {
        self.cvars_from_rho_e(self.rho_e_from_rho_p(rho_p))
    }
}

impl Default for IdealGasEos {
    fn default() -> Self {
        Self::new(2.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eos() -> IdealGasEos {
        IdealGasEos::new(1.4, 0.287)
    }

    #[test]
    fn test_pressure_of_moving_gas() {
        let eos = eos();
        let u = EulerVars::new(2.0, 1.0, -2.0, 0.0, 10.0);
        let ekin = 0.5 * (1.0 + 4.0) / 2.0;
        assert!((eos.pressure(&u) - 0.4 * (10.0 - ekin)).abs() < 1e-14);
    }

    #[test]
    fn test_enthalpy_entropy_inverse() {
        let eos = eos();
        let rho_e = RhoE::new(0.8, 2.3);
        let theta = eos.enthalpy_entropy(rho_e);
        let back = eos.rho_e_from_enthalpy_entropy(theta);
        assert!((back.rho - rho_e.rho).abs() < 1e-13);
        assert!((back.e - rho_e.e).abs() < 1e-13);
    }

    #[test]
    fn test_temperature_roundtrip() {
        let eos = eos();
        let rho_p = RhoP::new(1.2, 3.4);
        let back = eos.rho_p_from_rho_t(eos.rho_t_from_rho_p(rho_p));
        assert!((back.p - rho_p.p).abs() < 1e-13);
    }

    #[test]
    fn test_xvars() {
        let eos = IdealGasEos::new(2.0, 1.0);
        let u = eos.cvars_from_rho_p(RhoP::new(2.0, 8.0));
        let x = eos.xvars(&u);
        assert!((x.p - 8.0).abs() < 1e-14);
        assert!((x.a - 2.0_f64.sqrt() * 2.0).abs() < 1e-14);
        assert!((x.h - 8.0).abs() < 1e-14);
        assert!((x.k - 2.0).abs() < 1e-14);
    }
}
