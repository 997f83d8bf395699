// crates/zisa_experiments/src/scenarios/mod.rs

//! 具体实验

mod bubbles;
mod gaussian_bump;
mod polytrope;
mod rayleigh_taylor;
mod stellar_convection;

pub use bubbles::{ShockBubble, SmoothBubble};
pub use gaussian_bump::GaussianBump;
pub use polytrope::Polytrope;
pub use rayleigh_taylor::RayleighTaylor;
pub use stellar_convection::{RadialProfile, StellarConvection};

use zisa_config::{GravityKind, SimulationConfig};
use zisa_foundation::{ZisaError, ZisaResult};

/// 多方球重力的中心密度与多方常数
pub(crate) fn polytrope_parameters(config: &SimulationConfig, experiment: &str) -> ZisaResult<(f64, f64)> {
    match config.euler.gravity.kind {
        GravityKind::Polytrope { rho_center, k, .. } => Ok((rho_center, k)),
        _ => Err(ZisaError::invalid_config(
            "euler.gravity.mode",
            format!("{:?}", config.euler.gravity.kind),
            format!("{experiment} 需要 polytrope 重力"),
        )),
    }
}

/// 要求常数重力
pub(crate) fn require_constant_gravity(config: &SimulationConfig, experiment: &str) -> ZisaResult<()> {
    match config.euler.gravity.kind {
        GravityKind::Constant { .. } => Ok(()),
        _ => Err(ZisaError::invalid_config(
            "euler.gravity.mode",
            format!("{:?}", config.euler.gravity.kind),
            format!("{experiment} 需要 constant 重力"),
        )),
    }
}
