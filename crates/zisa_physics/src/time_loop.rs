// crates/zisa_physics/src/time_loop.rs

//! 时间循环
//!
//! ```text
//! 输出初值 → 合理性检查 → 选时间步
//! 循环: 推进一步 → 步拒绝检查 (拒绝则以更小时间步从 u0 重算)
//!       → 时钟前进 → 输出 → 合理性检查 → 选下一个时间步 → 进度
//! ```
//!
//! 分布式运行时每个分区各有一个时间循环。时间步、步拒绝、合理性检查
//! 和中断标志都经过 [`AllReduce`]，所以各分区走完全相同的控制流。

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use zisa_foundation::{ZisaError, ZisaResult};

use crate::model::{AllVariables, EulerSanityCheck, LocalCfl, SanityCheck};
use crate::ode::{RejectNothing, SimulationClock, StepRejection, TimeIntegration};
use crate::parallel::{AllReduce, NoAllReduce};

// ============================================================================
// 输出与进度
// ============================================================================

/// 状态输出
pub trait Visualization: Send {
    /// 输出第 `k` 步、时刻 `t` 的状态
    fn plot(&mut self, u: &AllVariables, t: f64, k: usize) -> ZisaResult<()>;

    /// 运行结束
    fn finalize(&mut self) -> ZisaResult<()> {
        Ok(())
    }

    /// 描述
    fn describe(&self) -> String;
}

/// 不输出
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVisualization;

impl Visualization for NoVisualization {
    fn plot(&mut self, _u: &AllVariables, _t: f64, _k: usize) -> ZisaResult<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "none".into()
    }
}

/// 进度报告
pub trait Progress: Send {
    /// 每步之后调用
    fn tick(&mut self, clock: &SimulationClock);

    /// 运行结束
    fn finish(&mut self, _clock: &SimulationClock) {}
}

/// 不报告
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn tick(&mut self, _clock: &SimulationClock) {}
}

// ============================================================================
// 时间循环
// ============================================================================

/// 一次运行的统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeLoopSummary {
    /// 本次运行完成的步数
    pub n_steps: usize,
    /// 被拒绝的步数
    pub n_rejected: usize,
    /// 结束时刻
    pub final_time: f64,
    /// 结束时的步数（续算时包含之前的步数）
    pub final_step: usize,
    /// 墙钟时间
    pub elapsed: Duration,
    /// 是否被中断
    pub interrupted: bool,
}

/// 同一步最多连续拒绝的次数，超过后运行失败
pub const MAX_CONSECUTIVE_REJECTIONS: usize = 64;

/// 时间循环
pub struct TimeLoop {
    time_integration: Box<dyn TimeIntegration>,
    cfl: LocalCfl,
    step_rejection: Box<dyn StepRejection>,
    clock: SimulationClock,
    visualization: Box<dyn Visualization>,
    sanity_check: Box<dyn SanityCheck>,
    progress: Box<dyn Progress>,
    all_reduce: Arc<dyn AllReduce>,
    rank: usize,
}

impl TimeLoop {
    /// 创建，其余组件取默认值（不拒绝、不输出、检查合理性、串行）
    pub fn new(time_integration: Box<dyn TimeIntegration>, cfl: LocalCfl, clock: SimulationClock) -> Self {
        Self {
            time_integration,
            cfl,
            step_rejection: Box::new(RejectNothing),
            clock,
            visualization: Box::new(NoVisualization),
            sanity_check: Box::new(EulerSanityCheck),
            progress: Box::new(NoProgress),
            all_reduce: Arc::new(NoAllReduce),
            rank: 0,
        }
    }

    /// 设置时间步拒绝
    pub fn with_step_rejection(mut self, step_rejection: Box<dyn StepRejection>) -> Self {
        self.step_rejection = step_rejection;
        self
    }

    /// 设置输出
    pub fn with_visualization(mut self, visualization: Box<dyn Visualization>) -> Self {
        self.visualization = visualization;
        self
    }

    /// 设置合理性检查
    pub fn with_sanity_check(mut self, sanity_check: Box<dyn SanityCheck>) -> Self {
        self.sanity_check = sanity_check;
        self
    }

    /// 设置进度报告
    pub fn with_progress(mut self, progress: Box<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    /// 分布式运行：跨分区归约与本分区编号
    pub fn with_all_reduce(mut self, all_reduce: Arc<dyn AllReduce>, rank: usize) -> Self {
        self.all_reduce = all_reduce;
        self.rank = rank;
        self
    }

    /// 时钟
    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// 可修改的时钟（续算时调用 `advance_to`）
    pub fn clock_mut(&mut self) -> &mut SimulationClock {
        &mut self.clock
    }

    /// 中断标志
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.clock.interrupt_handle()
    }

    /// 求解器描述
    pub fn describe(&self) -> String {
        format!(
            "{}; cfl = {}; step_rejection = {}; output = {}; sanity = {}",
            self.time_integration.describe(),
            self.cfl.cfl_number(),
            self.step_rejection.describe(),
            self.visualization.describe(),
            self.sanity_check.describe()
        )
    }

    fn is_root(&self) -> bool {
        self.rank == 0
    }

    fn pick_time_step(&self, u: &AllVariables) -> ZisaResult<f64> {
        let dt = self.cfl.time_step(u)?;
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(ZisaError::runtime(format!(
                "CFL 时间步无效: dt = {dt:e} (k = {}, t = {:e})",
                self.clock.current_step(),
                self.clock.current_time()
            )));
        }
        Ok(self.step_rejection.pick_time_step(dt))
    }

    fn check_sanity(&self, u: &AllVariables) -> ZisaResult<()> {
        let bad = self.sanity_check.first_implausible(u);
        if self.all_reduce.all(bad.is_none())? {
            return Ok(());
        }

        let (k, t) = (self.clock.current_step(), self.clock.current_time());
        match bad {
            Some(i) => Err(ZisaError::implausible_state(
                i,
                k,
                t,
                format!("分区 {}: {:?}", self.rank, u.cvars[i].as_slice()),
            )),
            None => Err(ZisaError::runtime(format!("第 {k} 步其他分区状态不合理"))),
        }
    }

    fn is_finished(&self) -> ZisaResult<bool> {
        // 只用归约后的中断标志，避免各分区在同一步看到不同的值
        let interrupted = !self.all_reduce.all(!self.clock.is_interrupted())?;
        if interrupted {
            self.clock.interrupt();
        }
        let (t, k) = (self.clock.current_time(), self.clock.current_step());
        Ok(interrupted || self.clock.time_keeper().is_finished(t, k))
    }

    fn welcome(&self) {
        if !self.is_root() {
            return;
        }
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        if self.clock.current_step() == 0 {
            tracing::info!("开始新的运行 ({now})");
        } else {
            tracing::info!(
                "继续运行: k = {}, t = {:e} ({now})",
                self.clock.current_step(),
                self.clock.current_time()
            );
        }
        tracing::info!("求解器: {}", self.describe());
    }

    fn goodbye(&self, summary: &TimeLoopSummary) {
        if !self.is_root() {
            return;
        }
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        if summary.interrupted {
            tracing::warn!("运行被中断 ({now})");
        }
        tracing::info!(
            "完成 {} 步 (拒绝 {} 步), t = {:e}, 用时 {:.3} s ({now})",
            summary.n_steps,
            summary.n_rejected,
            summary.final_time,
            summary.elapsed.as_secs_f64()
        );
    }

    /// 从 `u0` 运行到结束，返回最终状态与统计
    pub fn run(&mut self, mut u0: AllVariables) -> ZisaResult<(AllVariables, TimeLoopSummary)> {
        let start = Instant::now();
        let k_start = self.clock.current_step();
        self.welcome();

        if self.clock.is_plotting_step() {
            self.visualization
                .plot(&u0, self.clock.current_time(), self.clock.current_step())?;
        }
        self.check_sanity(&u0)?;

        let mut u1 = u0.zeros_like();
        let mut dt = self.pick_time_step(&u0)?;
        let mut n_rejected = 0;
        let mut n_retries = 0;

        while !self.is_finished()? {
            self.clock.set_time_step(dt);
            let (t, dt_step) = (self.clock.current_time(), self.clock.time_step());
            self.time_integration.compute_step(&mut u1, &u0, t, dt_step)?;

            if !self.step_rejection.check(&u0, &u1)? {
                n_rejected += 1;
                n_retries += 1;
                if n_retries > MAX_CONSECUTIVE_REJECTIONS {
                    return Err(ZisaError::runtime(format!(
                        "连续 {n_retries} 次拒绝时间步 (k = {}, t = {:e}, dt = {:e})",
                        self.clock.current_step(),
                        t,
                        dt_step
                    )));
                }
                dt = self.pick_time_step(&u0)?;
                continue;
            }
            n_retries = 0;

            std::mem::swap(&mut u0, &mut u1);
            self.clock.advance();

            if self.clock.is_plotting_step() {
                self.visualization
                    .plot(&u0, self.clock.current_time(), self.clock.current_step())?;
            }
            // 不合理的状态没有有效的 CFL 时间步，先检查
            self.check_sanity(&u0)?;
            dt = self.pick_time_step(&u0)?;
            self.progress.tick(&self.clock);
        }

        self.visualization.finalize()?;
        self.progress.finish(&self.clock);

        let summary = TimeLoopSummary {
            n_steps: self.clock.current_step() - k_start,
            n_rejected,
            final_time: self.clock.current_time(),
            final_step: self.clock.current_step(),
            elapsed: start.elapsed(),
            interrupted: self.clock.is_interrupted(),
        };
        self.goodbye(&summary);
        Ok((u0, summary))
    }
}
