// crates/zisa_physics/src/ode/clock.rs

//! 模拟时钟
//!
//! [`TimeKeeper`] 决定何时结束，[`PlottingSteps`] 决定何时输出。
//! 选取时间步时两者都会截断时间步，使结束时刻和输出时刻被精确命中。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use zisa_config::{IoConfig, IoMode, TimeConfig};
use zisa_foundation::{ZisaError, ZisaResult};

/// 时间比较的相对容差
const TIME_TOLERANCE: f64 = 1e-12;

#[inline]
fn time_tolerance(t: f64) -> f64 {
    TIME_TOLERANCE * t.abs().max(1.0)
}

// ============================================================================
// 终止条件
// ============================================================================

/// 终止条件
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeKeeper {
    /// 运行到 `t_end`
    FixedDuration {
        /// 结束时刻
        t_end: f64,
    },
    /// 运行固定步数
    FixedTimeSteps {
        /// 步数
        n_steps: usize,
    },
}

impl TimeKeeper {
    /// 按配置创建，同时给出时优先使用结束时刻
    pub fn from_config(config: &TimeConfig) -> ZisaResult<Self> {
        match (config.final_time, config.n_steps) {
            (Some(t_end), _) => Ok(Self::FixedDuration { t_end }),
            (None, Some(n_steps)) => Ok(Self::FixedTimeSteps { n_steps }),
            (None, None) => Err(ZisaError::invalid_config(
                "time",
                "{}",
                "需要 final_time 或 n_steps",
            )),
        }
    }

    /// 是否结束
    pub fn is_finished(&self, t: f64, k: usize) -> bool {
        match *self {
            Self::FixedDuration { t_end } => t >= t_end - time_tolerance(t_end),
            Self::FixedTimeSteps { n_steps } => k >= n_steps,
        }
    }

    /// 截断到结束时刻
    pub fn pick_time_step(&self, t: f64, dt: f64) -> f64 {
        match *self {
            Self::FixedDuration { t_end } => dt.min(t_end - t),
            Self::FixedTimeSteps { .. } => dt,
        }
    }

    /// 结束时刻（若有）
    pub fn final_time(&self) -> Option<f64> {
        match *self {
            Self::FixedDuration { t_end } => Some(t_end),
            Self::FixedTimeSteps { .. } => None,
        }
    }

    /// 完成比例
    pub fn progress(&self, t: f64, k: usize) -> f64 {
        match *self {
            Self::FixedDuration { t_end } if t_end > 0.0 => t / t_end,
            Self::FixedTimeSteps { n_steps } if n_steps > 0 => k as f64 / n_steps as f64,
            _ => 1.0,
        }
    }
}

// ============================================================================
// 输出时刻
// ============================================================================

/// 输出时刻
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlottingSteps {
    /// `t0 + k dt`，不超过 `t_end`
    FixedInterval {
        /// 第一次输出
        t0: f64,
        /// 间隔
        dt: f64,
        /// 最后时刻
        t_end: f64,
    },
    /// 每 `k` 步
    EveryKthStep {
        /// 步数间隔
        k: usize,
    },
    /// 从不输出
    Never,
}

impl PlottingSteps {
    /// 按配置创建
    ///
    /// 输出时刻总是从 `t = 0` 起算，续算沿用同一组输出时刻。
    pub fn from_config(io: &IoConfig, time: &TimeConfig) -> ZisaResult<Self> {
        if io.mode == IoMode::None {
            return Ok(Self::Never);
        }
        let t_end = || {
            time.final_time
                .ok_or_else(|| ZisaError::invalid_config("io", "fps/n_snapshots", "按时间输出需要 time.final_time"))
        };
        if let Some(fps) = io.fps {
            return Ok(Self::FixedInterval {
                t0: 0.0,
                dt: 1.0 / fps,
                t_end: t_end()?,
            });
        }
        if let Some(n) = io.n_snapshots {
            let t_end = t_end()?;
            return Ok(Self::FixedInterval {
                t0: 0.0,
                dt: t_end / n.max(1) as f64,
                t_end,
            });
        }
        if let Some(k) = io.steps_per_frame {
            return Ok(Self::EveryKthStep { k: k.max(1) });
        }
        Ok(Self::Never)
    }

    fn next_time(t0: f64, dt: f64, t: f64) -> f64 {
        if t < t0 - time_tolerance(t0) {
            return t0;
        }
        let k = ((t - t0) / dt + TIME_TOLERANCE).floor() + 1.0;
        let mut next = t0 + k * dt;
        if next <= t + time_tolerance(t) {
            next += dt;
        }
        next
    }

    /// 是否为输出步
    pub fn is_plotting_step(&self, t: f64, k: usize) -> bool {
        match *self {
            Self::FixedInterval { t0, dt, t_end } => {
                if t < t0 - time_tolerance(t0) || t > t_end + time_tolerance(t_end) {
                    return false;
                }
                let j = ((t - t0) / dt).round();
                (t - (t0 + j * dt)).abs() <= time_tolerance(t)
            }
            Self::EveryKthStep { k: every } => k % every == 0,
            Self::Never => false,
        }
    }

    /// 截断到下一个输出时刻，同时返回被截断时的目标时刻
    pub fn pick_time_step(&self, t: f64, dt: f64) -> (f64, Option<f64>) {
        match *self {
            Self::FixedInterval { t0, dt: interval, t_end } => {
                let next = Self::next_time(t0, interval, t);
                if next <= t_end + time_tolerance(t_end) && t + dt >= next {
                    (next - t, Some(next))
                } else {
                    (dt, None)
                }
            }
            _ => (dt, None),
        }
    }
}

// ============================================================================
// 时钟
// ============================================================================

/// 模拟时钟
#[derive(Debug, Clone)]
pub struct SimulationClock {
    t: f64,
    k: usize,
    dt: f64,
    target: Option<f64>,
    time_keeper: TimeKeeper,
    plotting_steps: PlottingSteps,
    interrupted: Arc<AtomicBool>,
}

impl SimulationClock {
    /// 从 `t = 0`、第 0 步开始
    pub fn new(time_keeper: TimeKeeper, plotting_steps: PlottingSteps) -> Self {
        Self {
            t: 0.0,
            k: 0,
            dt: 0.0,
            target: None,
            time_keeper,
            plotting_steps,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 当前时刻
    pub fn current_time(&self) -> f64 {
        self.t
    }

    /// 当前步数
    pub fn current_step(&self) -> usize {
        self.k
    }

    /// 当前时间步
    pub fn time_step(&self) -> f64 {
        self.dt
    }

    /// 终止条件
    pub fn time_keeper(&self) -> &TimeKeeper {
        &self.time_keeper
    }

    /// 设置时间步，按结束时刻和输出时刻截断
    pub fn set_time_step(&mut self, dt: f64) {
        let dt_end = self.time_keeper.pick_time_step(self.t, dt);
        let (dt_plot, plot_target) = self.plotting_steps.pick_time_step(self.t, dt);

        self.target = None;
        if let (Some(t_end), true) = (self.time_keeper.final_time(), dt_end < dt) {
            self.target = Some(t_end);
        }
        if dt_plot < dt_end {
            self.target = plot_target;
        }
        self.dt = dt_end.min(dt_plot);
    }

    /// 前进一步，被截断的步精确落在目标时刻上
    pub fn advance(&mut self) {
        self.t = self.target.take().unwrap_or(self.t + self.dt);
        self.k += 1;
    }

    /// 跳到给定时刻和步数（续算）
    pub fn advance_to(&mut self, t: f64, k: usize) {
        self.t = t;
        self.k = k;
        self.target = None;
    }

    /// 是否结束（或被中断）
    pub fn is_finished(&self) -> bool {
        self.is_interrupted() || self.time_keeper.is_finished(self.t, self.k)
    }

    /// 当前是否为输出步
    pub fn is_plotting_step(&self) -> bool {
        self.plotting_steps.is_plotting_step(self.t, self.k)
    }

    /// 请求中断
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Relaxed);
    }

    /// 共享的中断标志，可交给其他线程
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    /// 是否被中断
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed)
    }

    /// 一行进度
    pub fn compact_progress_string(&self) -> String {
        let percent = 100.0 * self.time_keeper.progress(self.t, self.k);
        format!(
            "[{:5.1}%] k = {:6}, t = {:.6e}, dt = {:.3e}",
            percent.clamp(0.0, 100.0),
            self.k,
            self.t,
            self.dt
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_keeper() {
        let tk = TimeKeeper::FixedDuration { t_end: 1.0 };
        assert!(!tk.is_finished(0.5, 100));
        assert!(tk.is_finished(1.0, 0));
        assert_eq!(tk.pick_time_step(0.9, 0.3), 1.0 - 0.9);

        let tk = TimeKeeper::FixedTimeSteps { n_steps: 3 };
        assert!(!tk.is_finished(100.0, 2));
        assert!(tk.is_finished(0.0, 3));
        assert_eq!(tk.pick_time_step(0.9, 0.3), 0.3);
    }

    #[test]
    fn test_fixed_interval_hits_snapshots() {
        let ps = PlottingSteps::FixedInterval {
            t0: 0.0,
            dt: 0.25,
            t_end: 1.0,
        };
        assert!(ps.is_plotting_step(0.0, 0));
        assert!(ps.is_plotting_step(0.75, 7));
        assert!(!ps.is_plotting_step(0.7, 7));
        assert!(!ps.is_plotting_step(1.25, 9));

        assert_eq!(ps.pick_time_step(0.2, 0.1), (0.25 - 0.2, Some(0.25)));
        assert_eq!(ps.pick_time_step(0.0, 0.1), (0.1, None));
        assert_eq!(ps.pick_time_step(0.25, 0.3).1, Some(0.5));
    }

    #[test]
    fn test_clock_reaches_every_snapshot() {
        let mut clock = SimulationClock::new(
            TimeKeeper::FixedDuration { t_end: 1.0 },
            PlottingSteps::FixedInterval {
                t0: 0.0,
                dt: 0.1,
                t_end: 1.0,
            },
        );
        let mut n_plots = usize::from(clock.is_plotting_step());
        while !clock.is_finished() {
            clock.set_time_step(0.03);
            clock.advance();
            if clock.is_plotting_step() {
                n_plots += 1;
            }
        }
        assert_eq!(n_plots, 11);
        assert_eq!(clock.current_time(), 1.0);
    }

    #[test]
    fn test_every_kth_step_and_restart() {
        let mut clock = SimulationClock::new(
            TimeKeeper::FixedTimeSteps { n_steps: 10 },
            PlottingSteps::EveryKthStep { k: 4 },
        );
        clock.advance_to(2.0, 7);
        clock.set_time_step(0.5);
        clock.advance();
        assert_eq!(clock.current_step(), 8);
        assert_eq!(clock.current_time(), 2.5);
        assert!(clock.is_plotting_step());
        assert!(clock.compact_progress_string().contains("80.0%"));
    }

    #[test]
    fn test_restart_keeps_snapshot_times() {
        let io = IoConfig {
            n_snapshots: Some(10),
            ..IoConfig::default()
        };
        let time = TimeConfig {
            final_time: Some(1.0),
            n_steps: None,
        };
        let ps = PlottingSteps::from_config(&io, &time).unwrap();
        assert_eq!(
            ps,
            PlottingSteps::FixedInterval {
                t0: 0.0,
                dt: 0.1,
                t_end: 1.0,
            }
        );

        // 从两个输出时刻之间续算，下一次输出仍在 0.4
        let mut clock = SimulationClock::new(TimeKeeper::FixedDuration { t_end: 1.0 }, ps);
        clock.advance_to(0.35, 7);
        assert!(!clock.is_plotting_step());
        clock.set_time_step(0.1);
        clock.advance();
        assert_eq!(clock.current_time(), 0.4);
        assert!(clock.is_plotting_step());
    }

    #[test]
    fn test_interrupt() {
        let clock = SimulationClock::new(TimeKeeper::FixedTimeSteps { n_steps: 10 }, PlottingSteps::Never);
        assert!(!clock.is_finished());
        clock.interrupt_handle().store(true, Ordering::Relaxed);
        assert!(clock.is_interrupted());
        assert!(clock.is_finished());
    }
}
