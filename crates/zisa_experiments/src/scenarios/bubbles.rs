// crates/zisa_experiments/src/scenarios/bubbles.rs

//! 气泡类实验

use std::sync::Arc;

use glam::DVec2;
use zisa_config::SimulationConfig;
use zisa_foundation::ZisaResult;
use zisa_grid::Grid;
use zisa_physics::model::RhoP;
use zisa_physics::Euler;

use super::require_constant_gravity;
use crate::experiment::{InitialConditions, Scenario};
use crate::ic::{cell_averages, gaussian, IsentropicProfile};

// ============================================================================
// 激波气泡
// ============================================================================

/// 常数重力下的等熵大气，原点处有高压气泡
#[derive(Debug, Clone, Copy, Default)]
pub struct ShockBubble;

impl Scenario for ShockBubble {
    fn name(&self) -> &'static str {
        "shock_bubble"
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
        let profile = IsentropicProfile::new(Arc::clone(euler), RhoP::new(1.0, 1.0), DVec2::ZERO);
        let state = |amplitude: f64| {
            cell_averages(grid, 0, |x| {
                let RhoP { rho, p } = profile.rho_p(x);
                euler.cvars(rho, 0.0, 0.0, p * (1.0 + amplitude * gaussian(x.length(), ic.width)))
            })
        };

        Ok(InitialConditions {
            u0: state(ic.amplitude),
            steady_state: Some(state(0.0)),
        })
    }
}

// ============================================================================
// 光滑气泡
// ============================================================================

/// 均匀密度、静止，总能量带高斯峰
///
/// 不是平衡态，没有稳态参考解。
#[derive(Debug, Clone, Copy, Default)]
pub struct SmoothBubble;

/// 背景密度
const SMOOTH_BUBBLE_RHO: f64 = 0.1;

impl Scenario for SmoothBubble {
    fn name(&self) -> &'static str {
        "smooth_bubble"
    }

    fn initial_conditions(
        &self,
        grid: &Grid,
        _euler: &Arc<Euler>,
        config: &SimulationConfig,
    ) -> ZisaResult<InitialConditions> {
        let ic = &config.experiment.initial_conditions;
        let u0 = cell_averages(grid, 0, |x| {
            let e = 1.0 + ic.amplitude * gaussian(x.length(), ic.width);
            zisa_physics::EulerVars::new(SMOOTH_BUBBLE_RHO, 0.0, 0.0, 0.0, e)
        });
        Ok(InitialConditions {
            u0,
            steady_state: None,
        })
    }
}
