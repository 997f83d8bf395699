// crates/zisa_io/src/progress.rs

//! 进度报告

use zisa_physics::ode::SimulationClock;
use zisa_physics::Progress;

/// 每隔若干步通过 `tracing` 记录一行进度
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    every: usize,
    n_reports: usize,
}

impl ProgressReporter {
    /// 每 `every` 步报告一次，`0` 视为 `1`
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            n_reports: 0,
        }
    }

    /// 已报告次数
    pub fn n_reports(&self) -> usize {
        self.n_reports
    }

    fn is_due(&self, k: usize) -> bool {
        k % self.every == 0
    }
}

impl Progress for ProgressReporter {
    fn tick(&mut self, clock: &SimulationClock) {
        if self.is_due(clock.current_step()) {
            self.n_reports += 1;
            tracing::info!("{}", clock.compact_progress_string());
        }
    }

    fn finish(&mut self, clock: &SimulationClock) {
        tracing::info!("{} 结束", clock.compact_progress_string());
    }
}
