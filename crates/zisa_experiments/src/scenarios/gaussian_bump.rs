// crates/zisa_experiments/src/scenarios/gaussian_bump.rs

//! 常数重力下等熵大气中的密度高斯峰

use std::sync::Arc;

use zisa_config::SimulationConfig;
use zisa_foundation::ZisaResult;
use zisa_grid::Grid;
use zisa_physics::model::RhoP;
use zisa_physics::{AllVariables, Euler};

use super::require_constant_gravity;
use crate::experiment::{InitialConditions, Scenario};
use crate::ic::{cell_averages, gaussian, IsentropicProfile};

/// 密度峰随压强平衡不变，扰动只在密度上
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianBump;

impl Scenario for GaussianBump {
    fn name(&self) -> &'static str {
        "gaussian_bump"
    }

    fn check(&self, config: &SimulationConfig) -> ZisaResult<()> {
        require_constant_gravity(config, self.name())
    }

    fn initial_conditions(
        &self,
        grid: &Grid,
        euler: &Arc<Euler>,
        config: &SimulationConfig,
    ) -> ZisaResult<InitialConditions> {
        let ic = &config.experiment.initial_conditions;
        let (lo, hi) = grid.bounding_box();
        let center = 0.5 * (lo + hi);
        let profile = IsentropicProfile::new(Arc::clone(euler), RhoP::new(1.0, 1.0), center);

        let state = |amplitude: f64| -> AllVariables {
            cell_averages(grid, 0, |x| {
                let RhoP { rho, p } = profile.rho_p(x);
                let rho = rho * (1.0 + amplitude * gaussian((x - center).length(), ic.width));
                euler.cvars(rho, 0.0, 0.0, p)
            })
        };

        Ok(InitialConditions {
            u0: state(ic.amplitude),
            steady_state: Some(state(0.0)),
        })
    }
}
