// crates/zisa_physics/src/lib.rs

//! ZisaFVM 物理与数值核心
//!
//! 带重力的二维可压缩 Euler 方程在非结构三角形网格上的高阶有限体积求解器。
//! 重构以局部等熵平衡为背景，使静力平衡态在离散层面被精确保持。
//!
//! # 模块概览
//!
//! - [`model`]: 守恒量、状态方程、重力、平衡态、CFL、合理性检查
//! - [`flux`]: HLLC 与 Rusanov 数值通量
//! - [`reconstruction`]: 模板、最小二乘、WENO-AO / CWENO-AO
//! - [`fvm`]: 通量循环、保平衡源项、外部边通量
//! - [`boundary`]: 幽灵单元边界条件
//! - [`ode`]: Runge-Kutta、时间步拒绝、模拟时钟
//! - [`parallel`]: 分区、光环交换、跨分区归约、多线程运行
//! - [`time_loop`]: 时间循环
//! - [`builder`]: 由配置组装求解器
//!
//! # 数据流
//!
//! ```text
//! TimeLoop ─> RungeKutta ─> BoundaryCondition (HaloExchangeBc)
//!                       └─> SumRatesOfChange
//!                             ├─ FluxLoop ─> GlobalReconstruction ─> LocalEquilibrium
//!                             ├─ GravitySourceLoop (复用重构结果)
//!                             └─ FluxBc / EquilibriumFluxBc
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod boundary;
pub mod builder;
pub mod flux;
pub mod fvm;
pub mod model;
pub mod ode;
pub mod parallel;
pub mod reconstruction;
pub mod time_loop;

pub use builder::{build_grid, build_stencil_families, SolverBuilder};
pub use model::{AllVariables, Euler, EulerVars};
pub use time_loop::{NoProgress, NoVisualization, Progress, TimeLoop, TimeLoopSummary, Visualization};
