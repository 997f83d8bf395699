// crates/zisa_physics/tests/well_balanced.rs

//! 多方球静力平衡的保持性测试
//!
//! γ = 2、K = 1 的多方球满足 `h + φ = 0`，等熵平衡重构应使变化率在舍入
//! 误差量级为零；关闭保平衡后同一状态会产生截断误差量级的残差。

use std::sync::Arc;

use zisa_config::{EquilibriumMode, FluxBcMode, IoMode, SimulationConfig, TimeConfig};
use zisa_grid::{DiscGridGenerator, Grid, QuadratureDegrees};
use zisa_physics::model::RhoP;
use zisa_physics::{build_stencil_families, AllVariables, Euler, SolverBuilder};

const RHO_CENTER: f64 = 1.0;
const K: f64 = 1.0;
const G: f64 = 1.0;

fn polytrope_rho(r: f64) -> f64 {
    let alpha = (2.0 * std::f64::consts::PI * G / K).sqrt();
    let c = alpha * r;
    if c < 1e-12 {
        RHO_CENTER
    } else {
        RHO_CENTER * c.sin() / c
    }
}

fn polytrope_state(grid: &Grid, euler: &Euler) -> AllVariables {
    let mut u = AllVariables::zeros(grid.n_cells(), 0);
    for (i, ui) in u.cvars.iter_mut().enumerate() {
        *ui = grid.cells[i].average(|x| {
            let rho = polytrope_rho(x.length());
            euler.at_rest(RhoP::new(rho, K * rho * rho))
        });
    }
    u
}

fn config(well_balancing: EquilibriumMode, flux_bc: FluxBcMode) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.io.mode = IoMode::None;
    config.well_balancing.mode = well_balancing;
    config.flux_bc.mode = flux_bc;
    config
}

fn grid() -> Arc<Grid> {
    Arc::new(
        DiscGridGenerator::new(0.5, 8, 6)
            .build(QuadratureDegrees::for_order(3))
            .unwrap(),
    )
}

fn max_rate(config: &SimulationConfig) -> f64 {
    let grid = grid();
    let families = build_stencil_families(&grid, config).unwrap();
    let builder = SolverBuilder::new(config).unwrap();
    let u = polytrope_state(&grid, builder.euler());

    let rate = builder.build_rate_of_change(&grid, families).unwrap();
    let mut tendency = u.zeros_like();
    rate.compute(&mut tendency, &u, 0.0).unwrap();
    assert!(tendency.is_finite());

    tendency
        .cvars
        .iter()
        .map(|du| du.amax())
        .fold(0.0, f64::max)
}

#[test]
fn test_polytrope_rate_vanishes_with_isentropic_reconstruction() {
    let config = config(EquilibriumMode::Isentropic, FluxBcMode::Isentropic);
    let err = max_rate(&config);
    assert!(err < 1e-7, "well-balanced residual too large: {err:e}");
}

#[test]
fn test_polytrope_rate_without_well_balancing_is_truncation_error() {
    let config = config(EquilibriumMode::Constant, FluxBcMode::Constant);
    let err = max_rate(&config);
    assert!(err > 1e-6, "residual suspiciously small: {err:e}");
}

#[test]
fn test_polytrope_stays_at_rest_over_several_steps() {
    let mut config = config(EquilibriumMode::Isentropic, FluxBcMode::Isentropic);
    config.time = TimeConfig {
        final_time: None,
        n_steps: Some(5),
    };
    let grid = grid();
    let families = build_stencil_families(&grid, &config).unwrap();
    let builder = SolverBuilder::new(&config).unwrap();
    let u0 = polytrope_state(&grid, builder.euler());

    let mut time_loop = builder.build_time_loop(Arc::clone(&grid), families, &u0).unwrap();
    let (u1, summary) = time_loop.run(u0.clone()).unwrap();

    assert_eq!(summary.final_step, 5);
    let diff = u1.max_abs_difference(&u0).unwrap();
    assert!(diff < 1e-8, "steady state drifted by {diff:e}");
}
