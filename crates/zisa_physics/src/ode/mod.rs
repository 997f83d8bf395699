// crates/zisa_physics/src/ode/mod.rs

//! 时间积分
//!
//! - [`runge_kutta`]: Butcher 表与显式 Runge-Kutta
//! - [`step_rejection`]: 时间步拒绝
//! - [`clock`]: 终止条件、输出时刻与模拟时钟

pub mod clock;
pub mod runge_kutta;
pub mod step_rejection;

pub use clock::{PlottingSteps, SimulationClock, TimeKeeper};
pub use runge_kutta::{make_tableau, ButcherTableau, RungeKutta, TimeIntegration};
pub use step_rejection::{make_step_rejection, RejectLargeDensityChange, RejectNothing, StepRejection};
