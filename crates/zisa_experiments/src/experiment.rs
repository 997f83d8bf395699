// crates/zisa_experiments/src/experiment.rs

//! 数值实验的公共流程
//!
//! [`EulerExperiment`] 负责网格、模板族、初值（或重启快照）、输出和时间循环的
//! 组装；具体实验只需实现 [`Scenario`]，给出初始条件与可选的稳态参考解。

use std::sync::Arc;

use zisa_config::{IoMode, SimulationConfig};
use zisa_foundation::{ZisaError, ZisaResult};
use zisa_grid::Grid;
use zisa_io::{make_visualization, FileNameGenerator, ProgressReporter, Snapshot, SnapshotWriter};
use zisa_physics::parallel::{run_distributed, scatter_all_variables};
use zisa_physics::reconstruction::StencilFamily;
use zisa_physics::{build_grid, build_stencil_families, AllVariables, Euler, SolverBuilder, TimeLoopSummary};

// ============================================================================
// 接口
// ============================================================================

/// 一个可运行的数值实验
pub trait NumericalExperiment: Send {
    /// 实验名称
    fn name(&self) -> &str;

    /// 运行时间循环
    fn run(&mut self) -> ZisaResult<TimeLoopSummary>;

    /// 运行结束后的诊断
    fn post_process(&mut self) -> ZisaResult<ExperimentReport>;
}

/// 初始条件与稳态参考解
#[derive(Debug, Clone)]
pub struct InitialConditions {
    /// 初值
    pub u0: AllVariables,
    /// 振幅为零时的平衡态
    pub steady_state: Option<AllVariables>,
}

/// 具体实验的初始条件
pub trait Scenario: Send + Sync {
    /// 名称，与 `experiment.name` 对应
    fn name(&self) -> &'static str;

    /// 检查配置是否适用于本实验
    fn check(&self, _config: &SimulationConfig) -> ZisaResult<()> {
        Ok(())
    }

    /// 计算初始条件
    fn initial_conditions(
        &self,
        grid: &Grid,
        euler: &Arc<Euler>,
        config: &SimulationConfig,
    ) -> ZisaResult<InitialConditions>;
}

/// 运行后的诊断结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExperimentReport {
    /// 时间循环统计
    pub summary: TimeLoopSummary,
    /// 初始总质量
    pub initial_mass: f64,
    /// 最终总质量
    pub final_mass: f64,
    /// 终态与稳态的最大偏差
    pub steady_state_deviation: Option<f64>,
}

impl ExperimentReport {
    /// 相对质量变化
    pub fn relative_mass_change(&self) -> f64 {
        (self.final_mass - self.initial_mass).abs() / self.initial_mass.abs().max(f64::MIN_POSITIVE)
    }
}

// ============================================================================
// EulerExperiment
// ============================================================================

struct Outcome {
    grid: Arc<Grid>,
    u0: AllVariables,
    u1: AllVariables,
    steady_state: Option<AllVariables>,
    summary: TimeLoopSummary,
}

/// 带重力 Euler 方程的数值实验
pub struct EulerExperiment {
    config: SimulationConfig,
    scenario: Box<dyn Scenario>,
    outcome: Option<Outcome>,
}

impl EulerExperiment {
    /// 创建，先用 [`Scenario::check`] 检查配置
    pub fn new(config: SimulationConfig, scenario: Box<dyn Scenario>) -> ZisaResult<Self> {
        scenario.check(&config)?;
        Ok(Self {
            config,
            scenario,
            outcome: None,
        })
    }

    /// 配置
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// 最终状态，运行前为 `None`
    pub fn final_state(&self) -> Option<&AllVariables> {
        self.outcome.as_ref().map(|o| &o.u1)
    }

    /// 稳态参考解，运行前或实验没有稳态时为 `None`
    pub fn steady_state(&self) -> Option<&AllVariables> {
        self.outcome.as_ref().and_then(|o| o.steady_state.as_ref())
    }

    fn init_thread_pool(&self) {
        if let Some(n) = self.config.parallelization.n_threads {
            if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
                tracing::debug!("rayon 线程池已初始化: {e}");
            }
        }
    }

    /// 载入重启快照，并让文件名编号接在快照之后
    fn load_restart(
        &self,
        grid: &Grid,
        fng: &mut FileNameGenerator,
    ) -> ZisaResult<Option<(Snapshot, Option<AllVariables>)>> {
        let Some(restart) = &self.config.restart else {
            return Ok(None);
        };
        let snapshot = Snapshot::load(&restart.file)?;
        snapshot.check_compatible(grid.n_cells(), snapshot.u.n_avars())?;
        match fng.generation(&restart.file) {
            Some(k) => fng.advance_to(k + 1),
            None => tracing::warn!(
                "重启文件 {} 不符合输出文件名模式，输出从 0 编号",
                restart.file.display()
            ),
        }

        let steady_path = fng.steady_state_filename();
        let steady_state = if self.config.io.mode == IoMode::Snapshot && steady_path.exists() {
            Some(Snapshot::load(&steady_path)?.u)
        } else {
            None
        };

        tracing::info!(
            "从 {} 重启: t = {:.6e}, k = {}",
            restart.file.display(),
            snapshot.time,
            snapshot.step
        );
        Ok(Some((snapshot, steady_state)))
    }

    fn run_serial(
        &self,
        grid: Arc<Grid>,
        families: Vec<StencilFamily>,
        u0: &AllVariables,
        restart: Option<(f64, usize)>,
        fng: FileNameGenerator,
        euler: Arc<Euler>,
    ) -> ZisaResult<(AllVariables, TimeLoopSummary)> {
        let io = &self.config.io;
        let mut builder = SolverBuilder::new(&self.config)?
            .with_visualization(make_visualization(io.mode, fng, Arc::clone(&grid), euler))
            .with_progress(Box::new(ProgressReporter::new(io.progress_every)));
        if let Some((t, k)) = restart {
            builder = builder.with_restart(t, k);
        }
        let mut time_loop = builder.build_time_loop(grid, families, u0)?;
        tracing::info!("{}", time_loop.describe());
        time_loop.run(u0.clone())
    }

    fn run_parallel(
        &self,
        grid: Arc<Grid>,
        families: Vec<StencilFamily>,
        u0: &AllVariables,
        restart: Option<(f64, usize)>,
        fng: FileNameGenerator,
        euler: Arc<Euler>,
    ) -> ZisaResult<(AllVariables, TimeLoopSummary)> {
        let io = &self.config.io;
        let n_parts = self.config.parallelization.n_parts;
        let visualization = make_visualization(io.mode, fng, Arc::clone(&grid), euler);
        let config = &self.config;

        run_distributed(&grid, &families, n_parts, u0, visualization, |ctx| {
            let lg = ctx.local_grid;
            let mut builder = SolverBuilder::new(config)?
                .with_frozen_cells(lg.physical_ghost_cells.clone())
                .with_halo_exchange(ctx.halo_exchange)
                .with_all_reduce(ctx.all_reduce, ctx.part)
                .with_visualization(ctx.visualization);
            if ctx.part == 0 {
                builder = builder.with_progress(Box::new(ProgressReporter::new(io.progress_every)));
            }
            if let Some((t, k)) = restart {
                builder = builder.with_restart(t, k);
            }
            builder.build_time_loop(
                Arc::clone(&lg.grid),
                lg.stencil_families.clone(),
                &scatter_all_variables(u0, lg),
            )
        })
    }
}

impl NumericalExperiment for EulerExperiment {
    fn name(&self) -> &str {
        self.scenario.name()
    }

    fn run(&mut self) -> ZisaResult<TimeLoopSummary> {
        self.init_thread_pool();
        tracing::info!("实验: {}", self.scenario.name());

        let grid = Arc::new(build_grid(&self.config)?);
        let families = build_stencil_families(&grid, &self.config)?;
        let euler = Arc::new(Euler::from_config(&self.config.euler)?);
        tracing::info!("{}", euler.describe());

        let mut fng = FileNameGenerator::from_config(&self.config.io)?;
        let (u0, steady_state, restart) = match self.load_restart(&grid, &mut fng)? {
            Some((snapshot, steady_state)) => {
                let restart = (snapshot.time, snapshot.step);
                (snapshot.u, steady_state, Some(restart))
            }
            None => {
                let ic = self.scenario.initial_conditions(&grid, &euler, &self.config)?;
                if let (IoMode::Snapshot, Some(steady)) = (self.config.io.mode, &ic.steady_state) {
                    SnapshotWriter::new(fng.clone()).save_steady_state(steady)?;
                }
                (ic.u0, ic.steady_state, None)
            }
        };

        let (u1, summary) = if self.config.parallelization.n_parts > 1 {
            self.run_parallel(Arc::clone(&grid), families, &u0, restart, fng, euler)?
        } else {
            self.run_serial(Arc::clone(&grid), families, &u0, restart, fng, euler)?
        };

        tracing::info!(
            "完成: {} 步 (拒绝 {}), t = {:.6e}, 用时 {:.2?}",
            summary.n_steps,
            summary.n_rejected,
            summary.final_time,
            summary.elapsed
        );
        self.outcome = Some(Outcome {
            grid,
            u0,
            u1,
            steady_state,
            summary,
        });
        Ok(summary)
    }

    fn post_process(&mut self) -> ZisaResult<ExperimentReport> {
        let outcome = self
            .outcome
            .as_ref()
            .ok_or_else(|| ZisaError::runtime("实验尚未运行"))?;

        let initial_mass = total_mass(&outcome.grid, &outcome.u0);
        let final_mass = total_mass(&outcome.grid, &outcome.u1);
        let steady_state_deviation = outcome
            .steady_state
            .as_ref()
            .map(|steady| outcome.u1.max_abs_difference(steady))
            .transpose()?;

        let report = ExperimentReport {
            summary: outcome.summary,
            initial_mass,
            final_mass,
            steady_state_deviation,
        };
        tracing::info!("相对质量变化: {:.3e}", report.relative_mass_change());
        if let Some(dev) = steady_state_deviation {
            tracing::info!("与稳态的最大偏差: {dev:.3e}");
        }
        Ok(report)
    }
}

/// 总质量 `Σ |K| ρ̄`，不含幽灵单元
pub fn total_mass(grid: &Grid, u: &AllVariables) -> f64 {
    u.cvars
        .iter()
        .enumerate()
        .filter(|(i, _)| !grid.cell_flags[*i].ghost_cell)
        .map(|(i, ui)| grid.volumes[i] * ui[0])
        .sum()
}
