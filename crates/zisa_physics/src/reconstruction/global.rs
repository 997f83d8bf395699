// crates/zisa_physics/src/reconstruction/global.rs

//! 全部单元的重构
//!
//! 通量循环每次计算速率前调用 [`GlobalReconstruction::compute`]，
//! 之后重力源项循环直接读取同一份结果。

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use rayon::prelude::*;
use zisa_config::{ReconstructionMode, SimulationConfig};
use zisa_foundation::{ZisaError, ZisaResult};
use zisa_grid::Grid;

use super::hybrid_weno::{HybridWeno, HybridWenoParams};
use super::local::{LocalReconstruction, RecomputePolicy};
use super::stencil_family::StencilFamily;
use crate::model::{AllVariables, Equilibrium, Euler, LocalEquilibrium, Scaling};

/// 全局重构
#[derive(Debug)]
pub struct GlobalReconstruction {
    grid: Arc<Grid>,
    locals: RwLock<Vec<LocalReconstruction>>,
    mode: ReconstructionMode,
    equilibrium_name: &'static str,
    order: usize,
}

impl GlobalReconstruction {
    /// 由各单元的模板族创建，`families[i]` 必须属于单元 `i`
    pub fn new(
        grid: Arc<Grid>,
        euler: &Arc<Euler>,
        families: Vec<StencilFamily>,
        params: &HybridWenoParams,
        mode: ReconstructionMode,
        equilibrium: &Equilibrium,
        policy: RecomputePolicy,
    ) -> ZisaResult<Self> {
        ZisaError::check_size("reconstruction.families", grid.n_cells(), families.len())?;

        let scaling = if equilibrium.is_none() {
            Scaling::Unity
        } else {
            Scaling::Euler(euler.eos)
        };

        let order = families.iter().map(StencilFamily::order).max().unwrap_or(1);
        let locals = families
            .into_par_iter()
            .enumerate()
            .map(|(i, family)| {
                if family.local2global()[0] != i {
                    return Err(ZisaError::internal(format!(
                        "单元 {i} 的模板族属于单元 {}",
                        family.local2global()[0]
                    )));
                }
                let weno = HybridWeno::new(&grid, family, params, mode)?;
                Ok(LocalReconstruction::new(
                    Arc::clone(&grid),
                    euler.eos,
                    weno,
                    LocalEquilibrium::new(equilibrium.clone()),
                    scaling,
                    policy,
                ))
            })
            .collect::<ZisaResult<Vec<_>>>()?;

        tracing::info!(
            "重构: {:?}, {} 阶, 平衡 = {}, 缩放 = {}",
            mode,
            order,
            equilibrium.name(),
            scaling.name()
        );

        Ok(Self {
            grid,
            locals: RwLock::new(locals),
            mode,
            equilibrium_name: equilibrium.name(),
            order,
        })
    }

    /// 按配置创建
    pub fn from_config(
        grid: Arc<Grid>,
        euler: &Arc<Euler>,
        families: Vec<StencilFamily>,
        config: &SimulationConfig,
    ) -> ZisaResult<Self> {
        let params = HybridWenoParams::from_config(&config.reconstruction)?;
        let equilibrium = Equilibrium::from_mode(config.well_balancing.mode, Arc::clone(euler));
        let policy = RecomputePolicy {
            steps_per_recompute: config.reconstruction.steps_per_recompute,
            recompute_threshold: config.reconstruction.recompute_threshold,
        };
        Self::new(
            grid,
            euler,
            families,
            &params,
            config.reconstruction.mode,
            &equilibrium,
            policy,
        )
    }

    /// 网格
    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    /// 重构所有单元
    pub fn compute(&self, u: &AllVariables) -> ZisaResult<()> {
        ZisaError::check_size("reconstruction.u", self.grid.n_cells(), u.n_cells())?;
        let mut locals = self.locals.write();
        locals.par_iter_mut().for_each(|rc| rc.compute(u));
        Ok(())
    }

    /// 读取重构结果
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<LocalReconstruction>> {
        self.locals.read()
    }

    /// 最高阶数
    pub fn order(&self) -> usize {
        self.order
    }

    /// 描述
    pub fn describe(&self) -> String {
        format!(
            "{:?} (order {}, equilibrium: {})",
            self.mode, self.order, self.equilibrium_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gravity, IdealGasEos};
    use crate::reconstruction::hybrid_weno::make_hybrid_weno_params;
    use crate::reconstruction::stencil_family::compute_stencil_families;
    use glam::DVec2;
    use zisa_grid::{QuadratureDegrees, RectGridGenerator};

    #[test]
    fn test_constant_state_is_reproduced() {
        let grid = Arc::new(
            RectGridGenerator::new(6, 6, 1.0, 1.0)
                .build(QuadratureDegrees::for_order(3))
                .unwrap(),
        );
        let euler = Arc::new(Euler::new(IdealGasEos::new(1.4, 1.0), Gravity::none()));
        let params = make_hybrid_weno_params(3).unwrap();
        let families = compute_stencil_families(&grid, &params.stencil_family_params).unwrap();
        let rc = GlobalReconstruction::new(
            Arc::clone(&grid),
            &euler,
            families,
            &params,
            ReconstructionMode::CwenoAo,
            &Equilibrium::None,
            RecomputePolicy::default(),
        )
        .unwrap();
        assert_eq!(rc.order(), 3);

        let state = euler.cvars(1.2, 0.3, -0.1, 2.0);
        let mut u = AllVariables::zeros(grid.n_cells(), 0);
        u.cvars.iter_mut().for_each(|c| *c = state);
        rc.compute(&u).unwrap();

        let locals = rc.read();
        for (i, local) in locals.iter().enumerate() {
            let x = grid.vertex(i, 0) * 0.9 + grid.cell_centers[i] * 0.1;
            assert!((local.eval(x) - state).norm() < 1e-12);
            assert!(local.eval(DVec2::new(0.5, 0.5)).iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_size_mismatch() {
        let grid = Arc::new(
            RectGridGenerator::new(2, 2, 1.0, 1.0)
                .build(QuadratureDegrees::default())
                .unwrap(),
        );
        let euler = Arc::new(Euler::new(IdealGasEos::default(), Gravity::none()));
        let params = make_hybrid_weno_params(1).unwrap();
        let families = vec![StencilFamily::single(0)];
        let result = GlobalReconstruction::new(
            grid,
            &euler,
            families,
            &params,
            ReconstructionMode::WenoAo,
            &Equilibrium::None,
            RecomputePolicy::default(),
        );
        assert!(result.is_err());
    }
}
