// crates/zisa_config/src/lib.rs

//! ZisaFVM Config Layer
//!
//! 仿真配置层，负责 JSON 配置文件的解析、默认值与校验。本层只描述
//! "要算什么"，不构造任何数值对象；把配置翻译成物理对象的工作由
//! `zisa_physics::builder` 与 `zisa_experiments` 完成。
//!
//! # 模块概览
//!
//! - [`simulation_config`]: SimulationConfig 及各配置段
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! zisa_cli          ─> SimulationConfig::from_file
//! zisa_experiments  ─> 读取 experiment / io / parallelization
//! zisa_physics      ─> 读取 euler / reconstruction / ode / ...
//! zisa_config       ─> 本层
//! zisa_foundation
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod simulation_config;

pub use error::ConfigError;
pub use simulation_config::{
    AlignmentConfig, BoundaryConditionConfig, BoundaryConditionMode, EosConfig, EquilibriumMode, EulerConfig,
    ExperimentConfig, FileNameConfig, FluxBcConfig, FluxBcMode, GravityConfig, GravityKind, GridConfig,
    GridGeneratorConfig, InitialConditionsConfig, IoConfig, IoMode, OdeConfig, OdeSolverKind, ParallelizationConfig,
    QuadratureConfig, ReconstructionConfig, ReconstructionMode, RestartConfig, SimulationConfig,
    SmoothnessIndicatorConfig, StepRejectionConfig, TimeConfig, WellBalancingConfig,
};
