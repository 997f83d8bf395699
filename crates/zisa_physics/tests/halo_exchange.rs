// crates/zisa_physics/tests/halo_exchange.rs

//! 分区计算与串行计算的一致性

use std::sync::Arc;

use parking_lot::Mutex;
use zisa_config::{BoundaryConditionMode, GridGeneratorConfig, IoMode, SimulationConfig, TimeConfig};
use zisa_foundation::ZisaResult;
use zisa_grid::Grid;
use zisa_physics::model::RhoP;
use zisa_physics::parallel::{partition_cells, run_distributed, scatter_all_variables, LocalGrid};
use zisa_physics::{build_grid, build_stencil_families, AllVariables, Euler, SolverBuilder, Visualization};

type Frames = Arc<Mutex<Vec<(usize, AllVariables)>>>;

struct Recorder {
    frames: Frames,
}

impl Visualization for Recorder {
    fn plot(&mut self, u: &AllVariables, _t: f64, k: usize) -> ZisaResult<()> {
        self.frames.lock().push((k, u.clone()));
        Ok(())
    }

    fn describe(&self) -> String {
        "recorder".into()
    }
}

fn config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
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
        n_steps: Some(4),
    };
    config.io.mode = IoMode::Snapshot;
    config.io.fps = None;
    config.io.n_snapshots = None;
    config.io.steps_per_frame = Some(2);
    config
}

/// 多方球叠加一个偏心的压强扰动
fn initial_state(grid: &Grid, euler: &Euler) -> AllVariables {
    let alpha = (2.0 * std::f64::consts::PI).sqrt();
    let mut u = AllVariables::zeros(grid.n_cells(), 0);
    for (i, ui) in u.cvars.iter_mut().enumerate() {
        *ui = grid.cells[i].average(|x| {
            let c = alpha * x.length() + f64::MIN_POSITIVE;
            let rho = c.sin() / c;
            let dx = x - glam::DVec2::new(0.1, 0.05);
            let p = rho * rho * (1.0 + 0.1 * (-dx.length_squared() / 0.01).exp());
            euler.at_rest(RhoP::new(rho, p))
        });
    }
    u
}

#[test]
fn test_local_rates_match_global_rate_on_owned_cells() {
    let config = config();
    let grid = Arc::new(build_grid(&config).unwrap());
    let families = build_stencil_families(&grid, &config).unwrap();
    let builder = SolverBuilder::new(&config).unwrap();
    let u = initial_state(&grid, builder.euler());

    let rate = builder.build_rate_of_change(&grid, families.clone()).unwrap();
    let mut expected = u.zeros_like();
    rate.compute(&mut expected, &u, 0.0).unwrap();

    let partition = partition_cells(&grid, &families, 3).unwrap();
    let local_grids = LocalGrid::extract_all(&grid, &partition, &families).unwrap();
    for lg in &local_grids {
        let u_local = scatter_all_variables(&u, lg);
        let rate = builder
            .build_rate_of_change(&lg.grid, lg.stencil_families.clone())
            .unwrap();
        let mut du = u_local.zeros_like();
        rate.compute(&mut du, &u_local, 0.0).unwrap();

        for l in 0..lg.n_owned {
            let diff = (du.cvars[l] - expected.cvars[lg.local2global[l]]).amax();
            assert!(diff < 1e-11, "part {} cell {}: {diff:e}", lg.part, lg.local2global[l]);
        }
    }
}

#[test]
fn test_distributed_run_matches_serial_run() {
    let config = config();
    let grid = Arc::new(build_grid(&config).unwrap());
    let families = build_stencil_families(&grid, &config).unwrap();
    let euler = Arc::clone(SolverBuilder::new(&config).unwrap().euler());
    let u0 = initial_state(&grid, &euler);

    let serial_frames: Frames = Arc::default();
    let mut serial = SolverBuilder::new(&config)
        .unwrap()
        .with_visualization(Box::new(Recorder {
            frames: Arc::clone(&serial_frames),
        }))
        .build_time_loop(Arc::clone(&grid), families.clone(), &u0)
        .unwrap();
    let (u_serial, serial_summary) = serial.run(u0.clone()).unwrap();

    let distributed_frames: Frames = Arc::default();
    let (u_distributed, summary) = run_distributed(
        &grid,
        &families,
        3,
        &u0,
        Box::new(Recorder {
            frames: Arc::clone(&distributed_frames),
        }),
        |ctx| {
            let lg = ctx.local_grid;
            SolverBuilder::new(&config)?
                .with_frozen_cells(lg.physical_ghost_cells.clone())
                .with_halo_exchange(ctx.halo_exchange)
                .with_all_reduce(ctx.all_reduce, ctx.part)
                .with_visualization(ctx.visualization)
                .build_time_loop(Arc::clone(&lg.grid), lg.stencil_families.clone(), &scatter_all_variables(&u0, lg))
        },
    )
    .unwrap();

    assert_eq!(summary.final_step, serial_summary.final_step);
    assert!((summary.final_time - serial_summary.final_time).abs() < 1e-14);
    let diff = u_distributed.max_abs_difference(&u_serial).unwrap();
    assert!(diff < 1e-10, "distributed run differs by {diff:e}");

    let serial_frames = serial_frames.lock();
    let distributed_frames = distributed_frames.lock();
    let steps: Vec<usize> = distributed_frames.iter().map(|(k, _)| *k).collect();
    assert_eq!(steps, vec![0, 2, 4]);
    assert_eq!(serial_frames.len(), distributed_frames.len());
    for ((_, a), (_, b)) in serial_frames.iter().zip(distributed_frames.iter()) {
        assert!(a.max_abs_difference(b).unwrap() < 1e-10);
    }
}
