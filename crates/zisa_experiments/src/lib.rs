// crates/zisa_experiments/src/lib.rs

//! ZisaFVM 数值实验
//!
//! 把配置、网格、初始条件、输出和时间循环组装成可运行的实验。
//!
//! # 模块概览
//!
//! - [`experiment`]: 实验接口与公共运行流程（串行、分区、重启）
//! - [`factory`]: 按 `experiment.name` 创建实验
//! - [`ic`]: 等熵平衡剖面与单元平均
//! - [`scenarios`]: 多方球、Rayleigh-Taylor、气泡、高斯峰、恒星对流
//!
//! ```ignore
//! let config = SimulationConfig::from_file("polytrope.json")?;
//! let mut experiment = make_experiment(config)?;
//! experiment.run()?;
//! let report = experiment.post_process()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod experiment;
pub mod factory;
pub mod ic;
pub mod scenarios;

pub use experiment::{
    total_mass, EulerExperiment, ExperimentReport, InitialConditions, NumericalExperiment, Scenario,
};
pub use factory::{make_experiment, make_scenario, EXPERIMENT_NAMES};
