// crates/zisa_experiments/src/scenarios/polytrope.rs

//! 多方球：平衡态上叠加中心的高斯压强扰动

use std::sync::Arc;

use glam::DVec2;
use zisa_config::SimulationConfig;
use zisa_foundation::ZisaResult;
use zisa_grid::Grid;
use zisa_physics::model::{RhoEntropy, RhoP};
use zisa_physics::Euler;

use super::polytrope_parameters;
use crate::experiment::{InitialConditions, Scenario};
use crate::ic::{cell_averages, gaussian, IsentropicProfile};

/// 多方球
#[derive(Debug, Clone, Copy, Default)]
pub struct Polytrope;

impl Polytrope {
    fn state(
        euler: &Arc<Euler>,
        grid: &Grid,
        profile: &IsentropicProfile,
        amplitude: f64,
        width: f64,
    ) -> zisa_physics::AllVariables {
        cell_averages(grid, 0, |x| {
            let RhoP { rho, p } = profile.rho_p(x);
            let bump = 1.0 + amplitude * gaussian(x.length(), width);
            euler.cvars(rho, 0.0, 0.0, p * bump)
        })
    }
}

impl Scenario for Polytrope {
    fn name(&self) -> &'static str {
        "polytrope"
    }

    fn check(&self, config: &SimulationConfig) -> ZisaResult<()> {
        polytrope_parameters(config, self.name()).map(|_| ())
    }

    fn initial_conditions(
        &self,
        grid: &Grid,
        euler: &Arc<Euler>,
        config: &SimulationConfig,
    ) -> ZisaResult<InitialConditions> {
        let (rho_center, k) = polytrope_parameters(config, self.name())?;
        let center = euler.eos.rho_p_from_rho_entropy(RhoEntropy { rho: rho_center, k });
        let profile = IsentropicProfile::new(Arc::clone(euler), center, DVec2::ZERO);

        let ic = &config.experiment.initial_conditions;
        Ok(InitialConditions {
            u0: Self::state(euler, grid, &profile, ic.amplitude, ic.width),
            steady_state: Some(Self::state(euler, grid, &profile, 0.0, ic.width)),
        })
    }
}
