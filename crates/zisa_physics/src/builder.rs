// crates/zisa_physics/src/builder.rs

//! 求解器构建器
//!
//! 把 [`SimulationConfig`] 翻译成变化率算子、边界条件、时间积分器和时间循环。
//! 串行运行直接用全局网格；分布式运行在各分区线程里用局部网格，
//! 并通过 `with_*` 方法接入光环交换与跨分区归约。
//!
//! ```ignore
//! let families = build_stencil_families(&grid, &config)?;
//! let mut time_loop = SolverBuilder::new(&config)?
//!     .with_visualization(Box::new(writer))
//!     .build_time_loop(grid, families, &u0)?;
//! let (u1, summary) = time_loop.run(u0)?;
//! ```

use std::sync::Arc;

use zisa_config::{BoundaryConditionMode, EquilibriumMode, FluxBcMode, GridGeneratorConfig, SimulationConfig};
use zisa_foundation::{ZisaError, ZisaResult};
use zisa_grid::{load_grid, DiscGridGenerator, Grid, QuadratureDegrees, RectGridGenerator};

use crate::boundary::{BoundaryCondition, FrozenBc, HaloExchangeBc, NoBoundaryCondition};
use crate::flux::HllcBatten;
use crate::fvm::{
    EquilibriumFluxBc, FluxBc, FluxLoop, GravitySourceLoop, RateOfChange, SumRatesOfChange,
};
use crate::model::{AllVariables, Equilibrium, Euler, LocalCfl};
use crate::ode::{make_step_rejection, ButcherTableau, PlottingSteps, RungeKutta, SimulationClock, TimeKeeper};
use crate::parallel::{AllReduce, HaloExchange, NoAllReduce};
use crate::reconstruction::{compute_stencil_families, GlobalReconstruction, StencilFamily, StencilFamilyParams};
use crate::time_loop::{Progress, TimeLoop, Visualization};

/// 按配置读入或生成网格，并按 `experiment.ghost_cell_radius`
/// 与 `experiment.ghost_cell_inner_radius` 标记幽灵单元
pub fn build_grid(config: &SimulationConfig) -> ZisaResult<Grid> {
    let q = &config.quadrature;
    let degrees = QuadratureDegrees {
        edge: q.edge,
        volume: q.volume,
        moments: q.moments,
    };

    let mut grid = match (&config.grid.file, &config.grid.generator) {
        (Some(path), _) => load_grid(path, degrees)?,
        (None, Some(GridGeneratorConfig::Rect { nx, ny, origin, lx, ly })) => RectGridGenerator::new(*nx, *ny, *lx, *ly)
            .with_origin(origin[0], origin[1])
            .build(degrees)?,
        (None, Some(GridGeneratorConfig::Disc {
            radius,
            n_radial,
            n0,
            center,
        })) => DiscGridGenerator::new(*radius, *n_radial, *n0)
            .with_center(center[0], center[1])
            .build(degrees)?,
        (None, None) => return Err(ZisaError::config("缺少 grid.file 或 grid.generator")),
    };

    let (inner, outer) = (
        config.experiment.ghost_cell_inner_radius,
        config.experiment.ghost_cell_radius,
    );
    if inner.is_some() || outer.is_some() {
        grid.mask_ghost_cells(|g, i| {
            let r = g.cell_centers[i].length();
            inner.is_some_and(|r_in| r < r_in) || outer.is_some_and(|r_out| r > r_out)
        });
    }
    tracing::info!("网格: {}", grid.summary());
    Ok(grid)
}

/// 按配置为所有单元构建模板族
pub fn build_stencil_families(grid: &Grid, config: &SimulationConfig) -> ZisaResult<Vec<StencilFamily>> {
    let rc = &config.reconstruction;
    let params = StencilFamilyParams::parse(&rc.orders, &rc.biases, &rc.overfit_factors)?;
    compute_stencil_families(grid, &params)
}

/// 求解器构建器
pub struct SolverBuilder<'a> {
    config: &'a SimulationConfig,
    euler: Arc<Euler>,
    frozen_cells: Option<Vec<usize>>,
    halo_exchange: Option<Arc<dyn HaloExchange>>,
    all_reduce: Arc<dyn AllReduce>,
    rank: usize,
    visualization: Option<Box<dyn Visualization>>,
    progress: Option<Box<dyn Progress>>,
    restart: Option<(f64, usize)>,
}

impl<'a> SolverBuilder<'a> {
    /// 创建
    pub fn new(config: &'a SimulationConfig) -> ZisaResult<Self> {
        Ok(Self {
            config,
            euler: Arc::new(Euler::from_config(&config.euler)?),
            frozen_cells: None,
            halo_exchange: None,
            all_reduce: Arc::new(NoAllReduce),
            rank: 0,
            visualization: None,
            progress: None,
            restart: None,
        })
    }

    /// Euler 方程
    pub fn euler(&self) -> &Arc<Euler> {
        &self.euler
    }

    /// 冻结指定单元，替代网格上的全部幽灵单元
    pub fn with_frozen_cells(mut self, cells: Vec<usize>) -> Self {
        self.frozen_cells = Some(cells);
        self
    }

    /// 每次施加边界条件前交换光环
    pub fn with_halo_exchange(mut self, halo_exchange: Arc<dyn HaloExchange>) -> Self {
        self.halo_exchange = Some(halo_exchange);
        self
    }

    /// 跨分区归约与本分区编号
    pub fn with_all_reduce(mut self, all_reduce: Arc<dyn AllReduce>, rank: usize) -> Self {
        self.all_reduce = all_reduce;
        self.rank = rank;
        self
    }

    /// 输出
    pub fn with_visualization(mut self, visualization: Box<dyn Visualization>) -> Self {
        self.visualization = Some(visualization);
        self
    }

    /// 进度报告
    pub fn with_progress(mut self, progress: Box<dyn Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// 从时刻 `t`、第 `k` 步继续
    pub fn with_restart(mut self, t: f64, k: usize) -> Self {
        self.restart = Some((t, k));
        self
    }

    /// 变化率：内部边通量 + 重力源项 + 外部边通量
    pub fn build_rate_of_change(
        &self,
        grid: &Arc<Grid>,
        families: Vec<StencilFamily>,
    ) -> ZisaResult<Arc<dyn RateOfChange>> {
        let reconstruction = Arc::new(GlobalReconstruction::from_config(
            Arc::clone(grid),
            &self.euler,
            families,
            self.config,
        )?);

        let mut rate = SumRatesOfChange::default();
        rate.push(Arc::new(FluxLoop::new(
            Arc::clone(grid),
            Arc::clone(&self.euler),
            Box::new(HllcBatten),
            Arc::clone(&reconstruction),
        )));
        rate.push(Arc::new(GravitySourceLoop::new(
            Arc::clone(grid),
            Arc::clone(&self.euler),
            reconstruction,
        )));

        match self.config.flux_bc.mode {
            FluxBcMode::Constant => rate.push(Arc::new(FluxBc::new(Arc::clone(grid), Arc::clone(&self.euler)))),
            FluxBcMode::Isentropic => rate.push(Arc::new(EquilibriumFluxBc::new(
                Arc::clone(grid),
                Arc::clone(&self.euler),
                Equilibrium::from_mode(EquilibriumMode::Isentropic, Arc::clone(&self.euler)),
            ))),
            FluxBcMode::None => {}
        }

        Ok(Arc::new(rate))
    }

    /// 边界条件，分布式运行时包一层光环交换
    pub fn build_boundary_condition(
        &self,
        grid: &Grid,
        u0: &AllVariables,
    ) -> ZisaResult<Arc<dyn BoundaryCondition>> {
        let local: Arc<dyn BoundaryCondition> = match self.config.boundary_condition.mode {
            BoundaryConditionMode::None => Arc::new(NoBoundaryCondition),
            BoundaryConditionMode::Frozen => match &self.frozen_cells {
                Some(cells) => Arc::new(FrozenBc::with_cells(cells.clone(), u0)?),
                None => Arc::new(FrozenBc::new(grid, u0)?),
            },
        };

        Ok(match &self.halo_exchange {
            Some(halo) => Arc::new(HaloExchangeBc::new(local, Arc::clone(halo))),
            None => local,
        })
    }

    /// 模拟时钟
    pub fn build_clock(&self) -> ZisaResult<SimulationClock> {
        let (t0, k0) = self.restart.unwrap_or((0.0, 0));
        let time_keeper = TimeKeeper::from_config(&self.config.time)?;
        let plotting_steps = PlottingSteps::from_config(&self.config.io, &self.config.time)?;
        let mut clock = SimulationClock::new(time_keeper, plotting_steps);
        clock.advance_to(t0, k0);
        Ok(clock)
    }

    /// 组装时间循环，`u0` 用来冻结边界值
    pub fn build_time_loop(
        self,
        grid: Arc<Grid>,
        families: Vec<StencilFamily>,
        u0: &AllVariables,
    ) -> ZisaResult<TimeLoop> {
        let rate = self.build_rate_of_change(&grid, families)?;
        let bc = self.build_boundary_condition(&grid, u0)?;
        let clock = self.build_clock()?;

        let ode = &self.config.ode;
        let rk = RungeKutta::new(ButcherTableau::from_kind(ode.solver), rate, bc);
        let cfl = LocalCfl::with_all_reduce(
            grid,
            Arc::clone(&self.euler),
            ode.cfl_number,
            Arc::clone(&self.all_reduce),
        );
        let step_rejection = make_step_rejection(&ode.step_rejection, Arc::clone(&self.all_reduce));

        let mut time_loop = TimeLoop::new(Box::new(rk), cfl, clock)
            .with_step_rejection(step_rejection)
            .with_all_reduce(self.all_reduce, self.rank);
        if let Some(visualization) = self.visualization {
            time_loop = time_loop.with_visualization(visualization);
        }
        if let Some(progress) = self.progress {
            time_loop = time_loop.with_progress(progress);
        }
        Ok(time_loop)
    }
}
