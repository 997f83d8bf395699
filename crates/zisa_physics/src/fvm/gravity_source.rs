// crates/zisa_physics/src/fvm/gravity_source.rs

//! 保平衡重力源项
//!
//! 把密度拆成平衡部分和偏差 `ρ = ρ_eq + δρ`。平衡部分满足
//! `∇p_eq = -ρ_eq ∇φ`，其体积分改写为边界积分：
//!
//! ```text
//! S_i = (1/|i|) [ Σ_k ∮_k p_eq n_k dx  +  ∫_i (0, -δρ ∇φ, 0, -m·∇φ) dx ]
//! ```
//!
//! 边界积分与通量循环使用同一组边求积点，静力平衡下两者精确抵消。
//! 平衡部分取自通量循环刚算出的重构。

use std::sync::Arc;

use rayon::prelude::*;
use zisa_foundation::{ZisaError, ZisaResult};
use zisa_grid::{Grid, MAX_NEIGHBOURS};

use super::RateOfChange;
use crate::model::{AllVariables, Euler, EulerVars};
use crate::reconstruction::GlobalReconstruction;

/// 重力源项循环
pub struct GravitySourceLoop {
    grid: Arc<Grid>,
    euler: Arc<Euler>,
    reconstruction: Arc<GlobalReconstruction>,
}

impl GravitySourceLoop {
    /// 创建，`reconstruction` 须与通量循环共享
    pub fn new(grid: Arc<Grid>, euler: Arc<Euler>, reconstruction: Arc<GlobalReconstruction>) -> Self {
        Self {
            grid,
            euler,
            reconstruction,
        }
    }
}

impl RateOfChange for GravitySourceLoop {
    fn name(&self) -> &str {
        "gravity_source"
    }

    fn compute(&self, tendency: &mut AllVariables, u: &AllVariables, _t: f64) -> ZisaResult<()> {
        ZisaError::check_size("gravity_source.tendency", u.n_cells(), tendency.n_cells())?;
        let locals = self.reconstruction.read();
        let gamma = self.euler.eos.gamma();

        tendency
            .cvars
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, dudt)| {
                let rc = &locals[i];

                let mut s = EulerVars::zeros();
                for k in 0..MAX_NEIGHBOURS {
                    let n = self.grid.outward_normal(i, k);
                    let face = self.grid.face(i, k);
                    let p = face.integrate(|x| (gamma - 1.0) * rc.background(x)[4]);
                    s[1] += p * n.x;
                    s[2] += p * n.y;
                }

                s += self.grid.cells[i].integrate(|x| self.euler.source(&rc.delta(x), x));
                *dudt += s / self.grid.volumes[i];
            });
        Ok(())
    }

    fn describe(&self) -> String {
        format!("gravity_source[{}]", self.euler.gravity.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Equilibrium, Gravity, GravityAlignment, GravityBase, IdealGasEos};
    use crate::reconstruction::{compute_stencil_families, make_hybrid_weno_params, RecomputePolicy};
    use zisa_config::ReconstructionMode;
    use zisa_grid::{QuadratureDegrees, RectGridGenerator};

    fn run(gravity: Gravity, u_of: impl Fn(&Euler, glam::DVec2) -> EulerVars) -> (Arc<Grid>, AllVariables) {
        let grid = Arc::new(
            RectGridGenerator::new(4, 4, 1.0, 1.0)
                .build(QuadratureDegrees::for_order(2))
                .unwrap(),
        );
        let euler = Arc::new(Euler::new(IdealGasEos::new(1.4, 1.0), gravity));
        let params = make_hybrid_weno_params(2).unwrap();
        let families = compute_stencil_families(&grid, &params.stencil_family_params).unwrap();
        let rc = Arc::new(
            GlobalReconstruction::new(
                Arc::clone(&grid),
                &euler,
                families,
                &params,
                ReconstructionMode::WenoAo,
                &Equilibrium::None,
                RecomputePolicy::default(),
            )
            .unwrap(),
        );

        let mut u = AllVariables::zeros(grid.n_cells(), 0);
        for i in 0..grid.n_cells() {
            u.cvars[i] = u_of(&euler, grid.cell_centers[i]);
        }
        rc.compute(&u).unwrap();

        let source = GravitySourceLoop::new(Arc::clone(&grid), euler, rc);
        let mut tendency = u.zeros_like();
        source.compute(&mut tendency, &u, 0.0).unwrap();
        (grid, tendency)
    }

    #[test]
    fn test_no_gravity_no_source() {
        let (_, tendency) = run(Gravity::none(), |e, _| e.cvars(1.0, 0.3, 0.0, 1.0));
        assert!(tendency.cvars.iter().all(|c| c.norm() < 1e-14));
    }

    #[test]
    fn test_constant_gravity() {
        let gravity = Gravity::new(GravityBase::Constant { g: 2.0 }, GravityAlignment::Axial { axis: 1 });
        let (_, tendency) = run(gravity, |e, _| e.cvars(1.5, 0.0, 0.4, 1.0));
        for c in &tendency.cvars {
            assert!(c[1].abs() < 1e-12);
            assert!((c[2] + 1.5 * 2.0).abs() < 1e-12);
            assert!((c[4] + 1.5 * 0.4 * 2.0).abs() < 1e-12);
            assert_eq!(c[0], 0.0);
        }
    }
}
