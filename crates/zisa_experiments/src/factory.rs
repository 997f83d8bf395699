// crates/zisa_experiments/src/factory.rs

//! 按名称创建实验

use zisa_config::SimulationConfig;
use zisa_foundation::{ZisaError, ZisaResult};

use crate::experiment::{EulerExperiment, NumericalExperiment, Scenario};
use crate::scenarios::{GaussianBump, Polytrope, RayleighTaylor, ShockBubble, SmoothBubble, StellarConvection};

/// 已注册的实验名称
pub const EXPERIMENT_NAMES: [&str; 6] = [
    "polytrope",
    "rayleigh_taylor",
    "shock_bubble",
    "smooth_bubble",
    "gaussian_bump",
    "stellar_convection",
];

/// 按名称查找场景
pub fn make_scenario(name: &str) -> ZisaResult<Box<dyn Scenario>> {
    let scenario: Box<dyn Scenario> = match name {
        "polytrope" => Box::new(Polytrope),
        "rayleigh_taylor" => Box::new(RayleighTaylor),
        "shock_bubble" => Box::new(ShockBubble),
        "smooth_bubble" => Box::new(SmoothBubble),
        "gaussian_bump" => Box::new(GaussianBump),
        "stellar_convection" => Box::new(StellarConvection),
        _ => return Err(ZisaError::invalid_experiment(name)),
    };
    Ok(scenario)
}

/// 按 `experiment.name` 创建实验
pub fn make_experiment(config: SimulationConfig) -> ZisaResult<Box<dyn NumericalExperiment>> {
    let scenario = make_scenario(&config.experiment.name)?;
    Ok(Box::new(EulerExperiment::new(config, scenario)?))
}
