// crates/zisa_experiments/src/ic.rs

//! 初始条件的公共部件

use std::sync::Arc;

use glam::DVec2;
use rayon::prelude::*;
use zisa_grid::Grid;
use zisa_physics::model::{EnthalpyEntropy, EulerVars, IsentropicEquilibrium, RhoP};
use zisa_physics::{AllVariables, Euler};

/// 以 `x_ref` 处的 `(ρ, p)` 为参考的等熵静力平衡
#[derive(Debug, Clone)]
pub struct IsentropicProfile {
    euler: Arc<Euler>,
    equilibrium: IsentropicEquilibrium,
    theta: EnthalpyEntropy,
    x_ref: DVec2,
}

impl IsentropicProfile {
    /// 创建
    pub fn new(euler: Arc<Euler>, rho_p_ref: RhoP, x_ref: DVec2) -> Self {
        let rho_e = euler.eos.rho_e_from_rho_p(rho_p_ref);
        let equilibrium = IsentropicEquilibrium::new(Arc::clone(&euler));
        let theta = equilibrium.theta(rho_e);
        Self {
            euler,
            equilibrium,
            theta,
            x_ref,
        }
    }

    /// `x` 处的 `(ρ, p)`
    pub fn rho_p(&self, x: DVec2) -> RhoP {
        let rho_e = self.equilibrium.extrapolate(self.theta, self.x_ref, x);
        self.euler.eos.rho_p_from_rho_e(rho_e)
    }
}

/// 以 `r_crit` 为界、内外两个等熵平衡拼成的状态
///
/// 外侧平衡在界面上与内侧压强相同、密度多 `drho`。
#[derive(Debug, Clone)]
pub struct ProfileWithJump {
    inner: IsentropicProfile,
    outer: IsentropicProfile,
    r_crit: f64,
}

impl ProfileWithJump {
    /// 由中心处的 `(ρ, p)` 构造
    pub fn new(euler: Arc<Euler>, rho_p_center: RhoP, r_crit: f64, drho: f64) -> Self {
        let inner = IsentropicProfile::new(Arc::clone(&euler), rho_p_center, DVec2::ZERO);
        let x_ref = DVec2::new(r_crit, 0.0);
        let at_interface = inner.rho_p(x_ref);
        let outer = IsentropicProfile::new(
            euler,
            RhoP::new(at_interface.rho + drho, at_interface.p),
            x_ref,
        );
        Self { inner, outer, r_crit }
    }

    /// `x` 处的 `(ρ, p)`
    pub fn rho_p(&self, x: DVec2) -> RhoP {
        if x.length() < self.r_crit {
            self.inner.rho_p(x)
        } else {
            self.outer.rho_p(x)
        }
    }
}

/// `exp(-(r/w)^2)`
#[inline]
pub fn gaussian(r: f64, width: f64) -> f64 {
    (-(r / width).powi(2)).exp()
}

/// 用单元体积求积规则计算所有单元的平均值
pub fn cell_averages<F>(grid: &Grid, n_avars: usize, f: F) -> AllVariables
where
    F: Fn(DVec2) -> EulerVars + Sync,
{
    let mut u = AllVariables::zeros(grid.n_cells(), n_avars);
    u.cvars
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, ui)| *ui = grid.cells[i].average(&f));
    u
}
