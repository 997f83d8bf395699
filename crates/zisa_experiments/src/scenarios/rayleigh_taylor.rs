// crates/zisa_experiments/src/scenarios/rayleigh_taylor.rs

//! Rayleigh-Taylor：`r_crit` 处密度向外跳升的多方球，加角向调制的径向速度扰动

use std::sync::Arc;

use zisa_config::SimulationConfig;
use zisa_foundation::ZisaResult;
use zisa_grid::Grid;
use zisa_physics::model::{RhoEntropy, RhoP};
use zisa_physics::{AllVariables, Euler};

use super::polytrope_parameters;
use crate::experiment::{InitialConditions, Scenario};
use crate::ic::{cell_averages, gaussian, ProfileWithJump};

/// Rayleigh-Taylor 不稳定性
#[derive(Debug, Clone, Copy, Default)]
pub struct RayleighTaylor;

fn state(
    euler: &Arc<Euler>,
    grid: &Grid,
    profile: &ProfileWithJump,
    amplitude: f64,
    width: f64,
    n_bumps: u32,
) -> AllVariables {
    let n_bumps = f64::from(n_bumps);
    cell_averages(grid, 0, |x| {
        let RhoP { rho, p } = profile.rho_p(x);
        let alpha = x.y.atan2(x.x);
        let v = amplitude * gaussian(x.length(), width) * (n_bumps * alpha).sin();
        euler.cvars(rho, v * alpha.cos(), v * alpha.sin(), p)
    })
}

impl Scenario for RayleighTaylor {
    fn name(&self) -> &'static str {
        "rayleigh_taylor"
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
        let ic = &config.experiment.initial_conditions;
        let center = euler.eos.rho_p_from_rho_entropy(RhoEntropy { rho: rho_center, k });
        let profile = ProfileWithJump::new(Arc::clone(euler), center, ic.r_crit, ic.drho);

        Ok(InitialConditions {
            u0: state(euler, grid, &profile, ic.amplitude, ic.width, ic.n_bumps),
            steady_state: Some(state(euler, grid, &profile, 0.0, ic.width, ic.n_bumps)),
        })
    }
}
