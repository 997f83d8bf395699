// crates/zisa_physics/src/ode/step_rejection.rs

//! 时间步拒绝
//!
//! 每步结束后检查 `(u0, u1)`；被拒绝的步从 `u0` 以更小的时间步重算。

use std::sync::Arc;

use rayon::prelude::*;
use zisa_config::StepRejectionConfig;
use zisa_foundation::ZisaResult;

use crate::model::AllVariables;
use crate::parallel::{AllReduce, NoAllReduce};

/// 时间步拒绝策略
pub trait StepRejection: Send {
    /// 检查一步，返回是否接受
    fn check(&mut self, u0: &AllVariables, u1: &AllVariables) -> ZisaResult<bool>;

    /// 缩放 CFL 时间步
    fn pick_time_step(&self, dt: f64) -> f64;

    /// 描述
    fn describe(&self) -> String;
}

/// 从不拒绝
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectNothing;

impl StepRejection for RejectNothing {
    fn check(&mut self, _u0: &AllVariables, _u1: &AllVariables) -> ZisaResult<bool> {
        Ok(true)
    }

    fn pick_time_step(&self, dt: f64) -> f64 {
        dt
    }

    fn describe(&self) -> String {
        "none".into()
    }
}

/// 密度相对变化超过 `drho_crit_rel` 时拒绝
///
/// 被拒绝的步使时间步因子减半，紧跟在好步之后的好步使其加倍，因子限制在
/// `[2^-max_exponent, 1]`。因子到下限后坏步仍被拒绝。
pub struct RejectLargeDensityChange {
    drho_crit_rel: f64,
    min_factor: f64,
    factor: f64,
    last_good: bool,
    all_reduce: Arc<dyn AllReduce>,
}

impl RejectLargeDensityChange {
    /// 串行运行
    pub fn new(drho_crit_rel: f64, max_exponent: u32) -> Self {
        Self::with_all_reduce(drho_crit_rel, max_exponent, Arc::new(NoAllReduce))
    }

    /// 各分区共同决定是否拒绝
    pub fn with_all_reduce(drho_crit_rel: f64, max_exponent: u32, all_reduce: Arc<dyn AllReduce>) -> Self {
        Self {
            drho_crit_rel,
            min_factor: 0.5f64.powi(max_exponent as i32),
            factor: 1.0,
            last_good: true,
            all_reduce,
        }
    }

    /// 当前因子
    pub fn factor(&self) -> f64 {
        self.factor
    }

    fn is_good(&self, u0: &AllVariables, u1: &AllVariables) -> bool {
        u0.cvars.par_iter().zip(&u1.cvars).all(|(a, b)| {
            let drho = (b[0] - a[0]).abs();
            drho <= self.drho_crit_rel * a[0]
        })
    }
}

impl StepRejection for RejectLargeDensityChange {
    fn check(&mut self, u0: &AllVariables, u1: &AllVariables) -> ZisaResult<bool> {
        let good = self.all_reduce.all(self.is_good(u0, u1))?;
        if good {
            if self.last_good {
                self.factor = (2.0 * self.factor).min(1.0);
            }
            self.last_good = true;
            return Ok(true);
        }

        self.last_good = false;
        self.factor = (0.5 * self.factor).max(self.min_factor);
        tracing::warn!("拒绝时间步: 密度变化过大, 时间步因子降为 {:e}", self.factor);
        Ok(false)
    }

    fn pick_time_step(&self, dt: f64) -> f64 {
        self.factor * dt
    }

    fn describe(&self) -> String {
        format!("large_density_change[{}]", self.drho_crit_rel)
    }
}

/// 按配置创建
pub fn make_step_rejection(config: &StepRejectionConfig, all_reduce: Arc<dyn AllReduce>) -> Box<dyn StepRejection> {
    match *config {
        StepRejectionConfig::Nothing => Box::new(RejectNothing),
        StepRejectionConfig::LargeDensityChange {
            drho_crit_rel,
            max_exponent,
        } => Box::new(RejectLargeDensityChange::with_all_reduce(
            drho_crit_rel,
            max_exponent,
            all_reduce,
        )),
    }
}
