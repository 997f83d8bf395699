// crates/zisa_experiments/tests/run_experiments.rs

//! 端到端运行实验

use zisa_config::{
    BoundaryConditionMode, GravityConfig, GravityKind, GridGeneratorConfig, IoMode, RestartConfig, SimulationConfig,
    TimeConfig,
};
use zisa_experiments::{make_experiment, NumericalExperiment};
use zisa_io::{FileNameGenerator, Snapshot};

fn config(name: &str, amplitude: f64, n_steps: usize) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.experiment.name = name.into();
    config.experiment.initial_conditions.amplitude = amplitude;
    config.grid.generator = Some(GridGeneratorConfig::Disc {
        radius: 0.5,
        n_radial: 6,
        n0: 6,
        center: [0.0, 0.0],
    });
    config.experiment.ghost_cell_radius = Some(0.42);
    config.boundary_condition.mode = BoundaryConditionMode::Frozen;
    config.time = TimeConfig {
        final_time: None,
        n_steps: Some(n_steps),
    };
    config.io.mode = IoMode::None;
    config
}

fn run(config: SimulationConfig) -> Box<dyn NumericalExperiment> {
    let mut experiment = make_experiment(config).unwrap();
    experiment.run().unwrap();
    experiment
}

#[test]
fn test_polytrope_at_rest_stays_at_rest() {
    let mut experiment = run(config("polytrope", 0.0, 3));
    let report = experiment.post_process().unwrap();
    assert_eq!(report.summary.final_step, 3);
    assert!(report.steady_state_deviation.unwrap() < 1e-7);
    assert!(report.relative_mass_change() < 1e-8);
}

#[test]
fn test_post_process_before_run_fails() {
    let mut experiment = make_experiment(config("polytrope", 0.0, 3)).unwrap();
    assert!(experiment.post_process().is_err());
}

#[test]
fn test_perturbed_polytrope_leaves_steady_state() {
    let mut experiment = run(config("polytrope", 0.1, 3));
    let report = experiment.post_process().unwrap();
    assert!(report.steady_state_deviation.unwrap() > 1e-6);
    assert!(report.final_mass.is_finite());
}

#[test]
fn test_partitioned_runs_match_serial_run() {
    let serial = config("rayleigh_taylor", 0.05, 3);
    let mut a = make_experiment(serial.clone()).unwrap();
    a.run().unwrap();
    let ra = a.post_process().unwrap();

    for n_parts in [2, 3] {
        let mut parallel = serial.clone();
        parallel.parallelization.n_parts = n_parts;
        let mut b = make_experiment(parallel).unwrap();
        b.run().unwrap();
        let rb = b.post_process().unwrap();

        assert_eq!(ra.summary.final_step, rb.summary.final_step, "{n_parts} parts");
        assert!((ra.summary.final_time - rb.summary.final_time).abs() < 1e-14, "{n_parts} parts");
        assert!((ra.final_mass - rb.final_mass).abs() < 1e-10, "{n_parts} parts");
        let (da, db) = (ra.steady_state_deviation.unwrap(), rb.steady_state_deviation.unwrap());
        assert!((da - db).abs() < 1e-10, "{n_parts} parts");
    }
}

#[test]
fn test_constant_gravity_scenarios_run() {
    for name in ["shock_bubble", "gaussian_bump", "smooth_bubble"] {
        let mut config = config(name, 0.1, 2);
        config.euler.gravity = GravityConfig {
            kind: GravityKind::Constant { g: 1.0 },
            ..GravityConfig::default()
        };
        let mut experiment = run(config);
        let report = experiment.post_process().unwrap();
        assert_eq!(report.summary.final_step, 2, "{name}");
        assert!(report.final_mass.is_finite(), "{name}");
    }
}

#[test]
fn test_stellar_convection_from_sampled_polytrope() {
    let dir = tempfile::tempdir().unwrap();
    let alpha = (2.0 * std::f64::consts::PI).sqrt();
    let radius: Vec<f64> = (0..=400).map(|i| 0.6 * i as f64 / 400.0).collect();
    let density: Vec<f64> = radius
        .iter()
        .map(|&r| if r == 0.0 { 1.0 } else { (alpha * r).sin() / (alpha * r) })
        .collect();
    // γ = 2, K = 1: E = p / (γ - 1) = ρ²
    let energy: Vec<f64> = density.iter().map(|rho| rho * rho).collect();
    let he4 = vec![1.0; radius.len()];
    let profile = serde_json::json!({
        "radius": radius,
        "density": density,
        "energy": energy,
        "advected": { "he4": he4 }
    });
    let path = dir.path().join("profile.json");
    std::fs::write(&path, profile.to_string()).unwrap();

    let mut config = config("stellar_convection", 0.0, 2);
    config.experiment.initial_conditions.profile = Some(path);
    config.experiment.ghost_cell_inner_radius = Some(0.05);
    let mut experiment = run(config);
    let report = experiment.post_process().unwrap();
    assert_eq!(report.summary.final_step, 2);
    assert!(report.steady_state_deviation.unwrap() < 1e-2);
    assert!(report.relative_mass_change() < 1e-3);
}

#[test]
fn test_stellar_convection_requires_profile() {
    assert!(make_experiment(config("stellar_convection", 0.0, 2)).is_err());
}

#[test]
fn test_restart_continues_from_last_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = config("polytrope", 0.1, 4);
    first.io.mode = IoMode::Snapshot;
    first.io.directory = dir.path().to_path_buf();
    first.io.n_snapshots = None;
    first.io.steps_per_frame = Some(2);
    run(first.clone());

    let fng = FileNameGenerator::from_config(&first.io).unwrap();
    assert!(fng.steady_state_filename().exists());
    let last = fng.find_last_data_file().unwrap().unwrap();
    assert_eq!(Snapshot::load(&last).unwrap().step, 4);

    let mut second = first;
    second.time.n_steps = Some(6);
    second.restart = Some(RestartConfig { file: last });
    let mut experiment = run(second);
    let report = experiment.post_process().unwrap();
    assert_eq!(report.summary.final_step, 6);
    assert!(report.steady_state_deviation.is_some());

    let last = fng.find_last_data_file().unwrap().unwrap();
    assert_eq!(fng.generation(&last), Some(4));
    assert_eq!(Snapshot::load(&last).unwrap().step, 6);
}

#[test]
fn test_experiment_from_json() {
    let json = serde_json::json!({
        "experiment": { "name": "shock_bubble", "initial_conditions": { "amplitude": 0.5, "width": 0.1 } },
        "euler": { "gravity": { "mode": "constant", "g": 1.0 } },
        "grid": { "generator": { "kind": "rect", "nx": 6, "ny": 6, "origin": [-0.5, -0.5], "lx": 1.0, "ly": 1.0 } },
        "time": { "n_steps": 2 },
        "io": { "mode": "none" }
    });
    let config = SimulationConfig::from_json_str(&json.to_string()).unwrap();
    let mut experiment = run(config);
    assert_eq!(experiment.name(), "shock_bubble");
    assert_eq!(experiment.post_process().unwrap().summary.final_step, 2);
}
