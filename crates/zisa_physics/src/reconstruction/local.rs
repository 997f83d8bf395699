// crates/zisa_physics/src/reconstruction/local.rs

//! 保平衡的单元重构
//!
//! 先求出单元上的局部平衡态，再对模板中各单元平均与平衡平均之差做
//! 缩放和 WENO 重构：
//!
//! ```text
//! u(x) = u_eq(x) + scale ⊙ p(x),   u_eq = (ρ_eq, 0, 0, 0, E_eq)
//! ```
//!
//! 平衡态静止时偏差恒为零，重构精确保持静力平衡。

use std::sync::Arc;

use glam::DVec2;
use zisa_grid::Grid;
use zisa_math::Poly2D;

use super::hybrid_weno::HybridWeno;
use crate::model::{
    variables::to_array, AllVariables, EulerVars, IdealGasEos, LocalEquilibrium, RhoE, Scaling, N_CVARS,
};

/// 局部平衡的更新策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecomputePolicy {
    /// 每隔多少次重构强制更新
    pub steps_per_recompute: usize,
    /// 单元平均的缩放变化超过此值时更新
    pub recompute_threshold: f64,
}

impl Default for RecomputePolicy {
    fn default() -> Self {
        Self {
            steps_per_recompute: 1,
            recompute_threshold: 1e-3,
        }
    }
}

/// 单元 `i` 上的重构
#[derive(Debug, Clone)]
pub struct LocalReconstruction {
    grid: Arc<Grid>,
    eos: IdealGasEos,
    weno: HybridWeno,
    equilibrium: LocalEquilibrium,
    scaling: Scaling,
    policy: RecomputePolicy,

    /// 平衡态在 `l2g` 各单元上的平均
    rho_e_cache: Vec<RhoE>,
    /// 求解平衡态时的单元平均
    rho_e_center: RhoE,
    scale: EulerVars,
    steps_since_recompute: usize,

    poly: Poly2D<N_CVARS>,
    tracer_polys: Vec<Poly2D<1>>,
}

impl LocalReconstruction {
    /// 创建
    pub fn new(
        grid: Arc<Grid>,
        eos: IdealGasEos,
        weno: HybridWeno,
        equilibrium: LocalEquilibrium,
        scaling: Scaling,
        policy: RecomputePolicy,
    ) -> Self {
        let i = weno.local2global()[0];
        let x_center = grid.cell_centers[i];
        let length = grid.characteristic_length(i);
        let n_local = weno.local2global().len();
        Self {
            eos,
            equilibrium,
            scaling,
            policy,
            rho_e_cache: vec![RhoE::default(); n_local],
            rho_e_center: RhoE::default(),
            scale: EulerVars::repeat(1.0),
            steps_since_recompute: 0,
            poly: Poly2D::constant([0.0; N_CVARS], x_center, length),
            tracer_polys: Vec::new(),
            weno,
            grid,
        }
    }

    /// 单元编号
    pub fn cell(&self) -> usize {
        self.weno.local2global()[0]
    }

    /// 局部到全局编号
    pub fn local2global(&self) -> &[usize] {
        self.weno.local2global()
    }

    /// 混合 WENO
    pub fn weno(&self) -> &HybridWeno {
        &self.weno
    }

    /// 局部平衡
    pub fn local_equilibrium(&self) -> &LocalEquilibrium {
        &self.equilibrium
    }

    fn needs_recompute(&self, rho_e: RhoE) -> bool {
        if self.steps_since_recompute % self.policy.steps_per_recompute.max(1) == 0 {
            return true;
        }
        let d_rho = (rho_e.rho - self.rho_e_center.rho) / self.scale[0];
        let d_e = (rho_e.e - self.rho_e_center.e) / self.scale[4];
        !(DVec2::new(d_rho, d_e).length() < self.policy.recompute_threshold)
    }

    /// 更新局部平衡及其在模板单元上的平均
    pub fn compute_equilibrium(&mut self, rho_e: RhoE) {
        let i = self.cell();
        self.equilibrium.solve(rho_e, &self.grid.cells[i]);
        for (cache, &j) in self.rho_e_cache.iter_mut().zip(self.weno.local2global()) {
            *cache = self.equilibrium.average(&self.grid.cells[j]);
        }
        self.rho_e_center = rho_e;
        self.steps_since_recompute = 0;
    }

    /// 用状态 `u`（与网格同编号）重构
    pub fn compute(&mut self, u: &AllVariables) {
        let i = self.cell();
        let rho_e = self.eos.rho_e(&u.cvars[i]);
        self.scale = self.scaling.scale(rho_e);

        if self.needs_recompute(rho_e) {
            self.compute_equilibrium(rho_e);
        }
        self.steps_since_recompute += 1;

        let qbar: Vec<[f64; N_CVARS]> = self
            .weno
            .local2global()
            .iter()
            .zip(&self.rho_e_cache)
            .map(|(&j, eq)| {
                let mut du = u.cvars[j];
                du[0] -= eq.rho;
                du[4] -= eq.e;
                to_array(&du.component_div(&self.scale))
            })
            .collect();
        self.poly = self.weno.reconstruct(&qbar);

        let n_avars = u.n_avars();
        self.tracer_polys.clear();
        for k in 0..n_avars {
            let qbar: Vec<[f64; 1]> = self
                .weno
                .local2global()
                .iter()
                .map(|&j| [u.avars_of(j)[k]])
                .collect();
            self.tracer_polys.push(self.weno.reconstruct(&qbar));
        }
    }

    /// 平衡部分 `(ρ_eq, 0, 0, 0, E_eq)`
    #[inline]
    pub fn background(&self, x: DVec2) -> EulerVars {
        let rho_e = self.equilibrium.extrapolate(x);
        EulerVars::new(rho_e.rho, 0.0, 0.0, 0.0, rho_e.e)
    }

    /// 偏差部分 `scale ⊙ p(x)`
    #[inline]
    pub fn delta(&self, x: DVec2) -> EulerVars {
        EulerVars::from(self.poly.eval(x)).component_mul(&self.scale)
    }

    /// 重构值
    #[inline]
    pub fn eval(&self, x: DVec2) -> EulerVars {
        self.background(x) + self.delta(x)
    }

    /// 第 `k` 个被动标量的重构值
    #[inline]
    pub fn tracer(&self, x: DVec2, k: usize) -> f64 {
        self.tracer_polys[k].eval(x)[0]
    }

    /// 全部被动标量的重构值
    pub fn tracers(&self, x: DVec2, out: &mut [f64]) {
        for (o, p) in out.iter_mut().zip(&self.tracer_polys) {
            *o = p.eval(x)[0];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Equilibrium, Euler, Gravity, GravityAlignment, GravityBase, IsentropicEquilibrium, RhoP};
    use crate::reconstruction::hybrid_weno::make_hybrid_weno_params;
    use crate::reconstruction::stencil_family::StencilFamily;
    use zisa_config::ReconstructionMode;
    use zisa_grid::{DiscGridGenerator, QuadratureDegrees};

    fn polytrope_rho_p(x: DVec2) -> RhoP {
        let alpha = (2.0 * std::f64::consts::PI).sqrt();
        let c = alpha * x.length();
        let rho = if c > 0.0 { c.sin() / c } else { 1.0 };
        RhoP::new(rho, rho * rho)
    }

    fn setup(equilibrium: Equilibrium, euler: &Euler) -> (Arc<Grid>, LocalReconstruction, AllVariables) {
        let grid = Arc::new(
            DiscGridGenerator::new(0.5, 8, 6)
                .build(QuadratureDegrees::for_order(3))
                .unwrap(),
        );
        let i = grid.locate_brute_force(DVec2::new(0.2, 0.1)).unwrap();
        let params = make_hybrid_weno_params(3).unwrap();
        let family = StencilFamily::new(&grid, i, &params.stencil_family_params).unwrap();
        let weno = HybridWeno::new(&grid, family, &params, ReconstructionMode::CwenoAo).unwrap();

        let mut u = AllVariables::zeros(grid.n_cells(), 1);
        for j in 0..grid.n_cells() {
            u.cvars[j] = grid.cells[j].average(|x| euler.at_rest(polytrope_rho_p(x)));
            u.avars[j] = 0.5 * u.cvars[j][0];
        }

        let local = LocalReconstruction::new(
            Arc::clone(&grid),
            euler.eos,
            weno,
            LocalEquilibrium::new(equilibrium),
            Scaling::Euler(euler.eos),
            RecomputePolicy::default(),
        );
        (grid, local, u)
    }

    fn polytrope() -> Arc<Euler> {
        Arc::new(Euler::new(
            IdealGasEos::new(2.0, 1.0),
            Gravity::new(GravityBase::polytrope(1.0, 1.0, 1.0), GravityAlignment::radial()),
        ))
    }

    #[test]
    fn test_equilibrium_is_reconstructed_exactly() {
        let euler = polytrope();
        let eq = Equilibrium::Isentropic(IsentropicEquilibrium::new(Arc::clone(&euler)));
        let (grid, mut local, u) = setup(eq, &euler);
        local.compute(&u);
        assert!(local.local_equilibrium().is_found());

        let i = local.cell();
        for k in 0..3 {
            for &x in &grid.face(i, k).points {
                let exact = euler.at_rest(polytrope_rho_p(x));
                assert!((local.eval(x) - exact).norm() < 1e-8, "{}", (local.eval(x) - exact).norm());
                assert!(local.delta(x).norm() < 1e-8);
            }
        }
    }

    #[test]
    fn test_without_equilibrium_preserves_average() {
        let euler = polytrope();
        let (grid, mut local, u) = setup(Equilibrium::None, &euler);
        local.compute(&u);
        let i = local.cell();
        let avg = grid.cells[i].average(|x| local.eval(x));
        assert!((avg - u.cvars[i]).norm() < 1e-12);
        assert_eq!(local.background(grid.cell_centers[i]), EulerVars::zeros());

        let tracer_avg = grid.cells[i].average(|x| local.tracer(x, 0));
        assert!((tracer_avg - u.avars[i]).abs() < 1e-12);
    }

    #[test]
    fn test_recompute_policy() {
        let euler = polytrope();
        let eq = Equilibrium::Isentropic(IsentropicEquilibrium::new(Arc::clone(&euler)));
        let (_, mut local, u) = setup(eq, &euler);
        local.policy = RecomputePolicy {
            steps_per_recompute: 10,
            recompute_threshold: 1e-3,
        };
        local.compute(&u);
        let theta = local.local_equilibrium().theta();

        // 小扰动不触发更新
        let mut v = u.clone();
        let i = local.cell();
        v.cvars[i][0] *= 1.0 + 1e-6;
        local.compute(&v);
        assert_eq!(local.local_equilibrium().theta(), theta);

        // 大扰动触发更新
        v.cvars[i][0] *= 1.1;
        local.compute(&v);
        assert_ne!(local.local_equilibrium().theta(), theta);
    }
}
