// crates/zisa_physics/src/boundary/mod.rs

//! 幽灵单元边界条件
//!
//! 边界条件作用于整个状态向量，在每个 Runge-Kutta 阶段和每步结束时调用。
//! 分布式运行时由 [`HaloExchangeBc`] 先调用局部边界条件再刷新光环，
//! 邻居收到的幽灵单元值因此已经复位。

use std::sync::Arc;

use zisa_foundation::{ZisaError, ZisaResult};
use zisa_grid::Grid;

use crate::model::{AllVariables, EulerVars};
use crate::parallel::HaloExchange;

/// 边界条件
pub trait BoundaryCondition: Send + Sync {
    /// 就地修改状态
    fn apply(&self, u: &mut AllVariables, t: f64) -> ZisaResult<()>;

    /// 描述
    fn describe(&self) -> String;
}

/// 不做处理
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBoundaryCondition;

impl BoundaryCondition for NoBoundaryCondition {
    fn apply(&self, _u: &mut AllVariables, _t: f64) -> ZisaResult<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "none".into()
    }
}

/// 把幽灵单元冻结为给定值
#[derive(Debug, Clone)]
pub struct FrozenBc {
    cells: Vec<usize>,
    cvars: Vec<EulerVars>,
    avars: Vec<f64>,
}

impl FrozenBc {
    /// 冻结网格中的全部幽灵单元
    pub fn new(grid: &Grid, u0: &AllVariables) -> ZisaResult<Self> {
        let cells: Vec<usize> = (0..grid.n_cells()).filter(|&i| grid.cell_flags[i].ghost_cell).collect();
        Self::with_cells(cells, u0)
    }

    /// 冻结指定单元
    pub fn with_cells(cells: Vec<usize>, u0: &AllVariables) -> ZisaResult<Self> {
        let mut cvars = Vec::with_capacity(cells.len());
        let mut avars = Vec::with_capacity(cells.len() * u0.n_avars());
        for &i in &cells {
            ZisaError::check_index("Cell", i, u0.n_cells())?;
            cvars.push(u0.cvars[i]);
            avars.extend_from_slice(u0.avars_of(i));
        }
        Ok(Self { cells, cvars, avars })
    }

    /// 冻结的单元
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }
}

impl BoundaryCondition for FrozenBc {
    fn apply(&self, u: &mut AllVariables, _t: f64) -> ZisaResult<()> {
        let n_avars = u.n_avars();
        ZisaError::check_size("frozen_bc.avars", self.cells.len() * n_avars, self.avars.len())?;
        for (k, &i) in self.cells.iter().enumerate() {
            u.cvars[i] = self.cvars[k];
            u.avars_of_mut(i)
                .copy_from_slice(&self.avars[k * n_avars..(k + 1) * n_avars]);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("frozen[{} cells]", self.cells.len())
    }
}

/// 先调用局部边界条件，再交换光环
pub struct HaloExchangeBc {
    local_bc: Arc<dyn BoundaryCondition>,
    halo_exchange: Arc<dyn HaloExchange>,
}

impl HaloExchangeBc {
    /// 创建
    pub fn new(local_bc: Arc<dyn BoundaryCondition>, halo_exchange: Arc<dyn HaloExchange>) -> Self {
        Self {
            local_bc,
            halo_exchange,
        }
    }
}

impl BoundaryCondition for HaloExchangeBc {
    fn apply(&self, u: &mut AllVariables, t: f64) -> ZisaResult<()> {
        self.local_bc.apply(u, t)?;
        self.halo_exchange.exchange(u)
    }

    fn describe(&self) -> String {
        format!(
            "halo_exchange[{}, {}]",
            self.halo_exchange.describe(),
            self.local_bc.describe()
        )
    }
}
