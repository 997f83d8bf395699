// crates/zisa_physics/src/model/equilibrium.rs

//! 流体静力平衡
//!
//! 等熵平衡满足 `h + φ = const` 且 `K` 为常数。局部平衡在每个单元上
//! 求出参数 `θ = (h_ref, K)`，使平衡态在该单元上的平均值等于给定的
//! `(ρ̄, Ē)`，之后可外推到模板中的任意点。

use std::sync::Arc;

use glam::DVec2;
use zisa_config::EquilibriumMode;
use zisa_math::roots::{finite_difference_inverse, quasi_newton};
use zisa_math::DenormalizedRule;

use super::euler::Euler;
use super::variables::{EnthalpyEntropy, RhoE};

/// 局部平衡求解的最大迭代次数
pub const EQUILIBRIUM_MAX_ITER: usize = 20;

/// 局部平衡求解的相对容差
pub const EQUILIBRIUM_RTOL: f64 = 1e-10;

/// 等熵平衡
#[derive(Debug, Clone)]
pub struct IsentropicEquilibrium {
    euler: Arc<Euler>,
}

impl IsentropicEquilibrium {
    /// 创建
    pub fn new(euler: Arc<Euler>) -> Self {
        Self { euler }
    }

    /// 由 `x_ref` 处的 `θ` 外推到 `x`
    ///
    /// `h(x) = h_ref + φ(x_ref) - φ(x)`，`K` 不变。比焓为负（超出星体
    /// 表面）时取真空。
    pub fn extrapolate(&self, theta: EnthalpyEntropy, x_ref: DVec2, x: DVec2) -> RhoE {
        let gravity = &self.euler.gravity;
        let h = theta.h + gravity.phi(x_ref) - gravity.phi(x);
        if h <= 0.0 {
            return RhoE::default();
        }
        self.euler
            .eos
            .rho_e_from_enthalpy_entropy(EnthalpyEntropy::new(h, theta.k))
    }

    /// 由点值 `(ρ, ρe)` 确定参数
    pub fn theta(&self, rho_e: RhoE) -> EnthalpyEntropy {
        self.euler.eos.enthalpy_entropy(rho_e)
    }
}

/// 平衡类型
#[derive(Debug, Clone, Default)]
pub enum Equilibrium {
    /// 无平衡（平衡部分恒为零）
    #[default]
    None,
    /// 等熵平衡
    Isentropic(IsentropicEquilibrium),
}

impl Equilibrium {
    /// 从配置创建
    pub fn from_mode(mode: EquilibriumMode, euler: Arc<Euler>) -> Self {
        match mode {
            EquilibriumMode::Constant => Self::None,
            EquilibriumMode::Isentropic => Self::Isentropic(IsentropicEquilibrium::new(euler)),
        }
    }

    /// 是否为无平衡
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// 名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Isentropic(_) => "isentropic",
        }
    }
}

/// 单元上的局部平衡
#[derive(Debug, Clone)]
pub struct LocalEquilibrium {
    equilibrium: Equilibrium,
    theta: EnthalpyEntropy,
    x_ref: DVec2,
    found: bool,
}

impl LocalEquilibrium {
    /// 未求解的局部平衡
    pub fn new(equilibrium: Equilibrium) -> Self {
        Self {
            equilibrium,
            theta: EnthalpyEntropy::default(),
            x_ref: DVec2::ZERO,
            found: false,
        }
    }

    /// 直接给定参数
    pub fn with_theta(equilibrium: Equilibrium, theta: EnthalpyEntropy, x_ref: DVec2) -> Self {
        let found = !equilibrium.is_none();
        Self {
            equilibrium,
            theta,
            x_ref,
            found,
        }
    }

    /// 求解使单元平均等于 `rho_e_bar` 的平衡
    ///
    /// `rho_e_bar` 的能量分量为内能密度。参考点取单元第一个求积点。
    /// 不收敛时标记为未找到，此后外推结果为零。
    pub fn solve(&mut self, rho_e_bar: RhoE, cell: &DenormalizedRule) {
        self.found = false;
        let Equilibrium::Isentropic(eq) = &self.equilibrium else {
            return;
        };

        let x_ref = cell.points[0];
        let guess = eq.theta(rho_e_bar);
        if !guess.to_vec().is_finite() || guess.h <= 0.0 || guess.k <= 0.0 {
            tracing::debug!("局部平衡初值无效: {rho_e_bar:?}");
            return;
        }

        let f = |v: DVec2| {
            let theta = EnthalpyEntropy::from_vec(v);
            (rho_e_bar - cell.average(|x| eq.extrapolate(theta, x_ref, x))).to_vec()
        };
        let inv_df = |v: DVec2, fv: DVec2| finite_difference_inverse(&f, v, fv);
        let atol = EQUILIBRIUM_RTOL * guess.to_vec().abs();

        let (theta, converged) = quasi_newton(&f, inv_df, guess.to_vec(), atol, EQUILIBRIUM_MAX_ITER);
        if converged {
            self.theta = EnthalpyEntropy::from_vec(theta);
            self.x_ref = x_ref;
            self.found = true;
        } else {
            tracing::debug!("局部平衡未收敛: rhoE = {rho_e_bar:?}, x_ref = {x_ref:?}");
        }
    }

    /// 外推到 `x`
    #[inline]
    pub fn extrapolate(&self, x: DVec2) -> RhoE {
        match (&self.equilibrium, self.found) {
            (Equilibrium::Isentropic(eq), true) => eq.extrapolate(self.theta, self.x_ref, x),
            _ => RhoE::default(),
        }
    }

    /// 在给定单元上的平均
    pub fn average(&self, cell: &DenormalizedRule) -> RhoE {
        if !self.found {
            return RhoE::default();
        }
        cell.average(|x| self.extrapolate(x))
    }

    /// 是否求解成功
    pub fn is_found(&self) -> bool {
        self.found
    }

    /// 参数 `θ`
    pub fn theta(&self) -> EnthalpyEntropy {
        self.theta
    }

    /// 参考点
    pub fn x_ref(&self) -> DVec2 {
        self.x_ref
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::eos::IdealGasEos;
    use crate::model::gravity::{Gravity, GravityAlignment, GravityBase};
    use zisa_math::{Triangle, TriangularRule};

    fn polytrope() -> Arc<Euler> {
        Arc::new(Euler::new(
            IdealGasEos::new(2.0, 1.0),
            Gravity::new(GravityBase::polytrope(1.0, 1.0, 1.0), GravityAlignment::radial()),
        ))
    }

    fn exact(x: DVec2) -> RhoE {
        // ρ = sin(αr)/(αr)，p = ρ²，e = p
        let alpha = (2.0 * std::f64::consts::PI).sqrt();
        let c = alpha * x.length();
        let rho = if c > 0.0 { c.sin() / c } else { 1.0 };
        RhoE::new(rho, rho * rho)
    }

    #[test]
    fn test_extrapolate_polytrope_profile() {
        let euler = polytrope();
        let eq = IsentropicEquilibrium::new(euler);
        let x_ref = DVec2::new(0.1, 0.2);
        let theta = eq.theta(exact(x_ref));

        for x in [DVec2::new(0.3, -0.1), DVec2::new(-0.2, 0.25), DVec2::ZERO] {
            let rho_e = eq.extrapolate(theta, x_ref, x);
            assert!((rho_e.rho - exact(x).rho).abs() < 1e-12, "{x:?}");
            assert!((rho_e.e - exact(x).e).abs() < 1e-12, "{x:?}");
        }
    }

    #[test]
    fn test_local_equilibrium_matches_cell_average() {
        let euler = polytrope();
        let tri = Triangle::new(DVec2::new(0.2, 0.1), DVec2::new(0.3, 0.12), DVec2::new(0.24, 0.2));
        let cell = TriangularRule::new(4).unwrap().denormalize(&tri);
        let rho_e_bar = cell.average(exact);

        let mut local = LocalEquilibrium::new(Equilibrium::Isentropic(IsentropicEquilibrium::new(euler)));
        local.solve(rho_e_bar, &cell);
        assert!(local.is_found());

        let avg = local.average(&cell);
        assert!((avg.rho - rho_e_bar.rho).abs() < 1e-9);
        assert!((avg.e - rho_e_bar.e).abs() < 1e-9);

        let x = DVec2::new(0.35, 0.3);
        assert!((local.extrapolate(x).rho - exact(x).rho).abs() < 1e-8);
    }

    #[test]
    fn test_none_equilibrium_is_zero() {
        let tri = Triangle::reference();
        let cell = TriangularRule::new(2).unwrap().denormalize(&tri);
        let mut local = LocalEquilibrium::new(Equilibrium::None);
        local.solve(RhoE::new(1.0, 1.0), &cell);
        assert!(!local.is_found());
        assert_eq!(local.extrapolate(DVec2::new(0.2, 0.2)), RhoE::default());
    }

    #[test]
    fn test_invalid_guess_is_not_found() {
        let euler = polytrope();
        let tri = Triangle::reference();
        let cell = TriangularRule::new(2).unwrap().denormalize(&tri);
        let mut local = LocalEquilibrium::new(Equilibrium::Isentropic(IsentropicEquilibrium::new(euler)));
        local.solve(RhoE::new(-1.0, 1.0), &cell);
        assert!(!local.is_found());
    }
}
