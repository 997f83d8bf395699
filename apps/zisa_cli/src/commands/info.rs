// apps/zisa_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 显示快照头、配置摘要或默认配置。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use zisa_config::SimulationConfig;
use zisa_experiments::EXPERIMENT_NAMES;
use zisa_io::Snapshot;

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 快照文件路径
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,

    /// 以 JSON 显示默认配置
    #[arg(long)]
    pub defaults: bool,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    if let Some(path) = &args.snapshot {
        print_snapshot(path)?;
    }
    if let Some(path) = &args.config {
        print_config(path)?;
    }
    if args.defaults {
        print_defaults()?;
    }

    if args.snapshot.is_none() && args.config.is_none() && !args.defaults {
        println!("=== ZisaFVM ===");
        println!("版本: {}", env!("CARGO_PKG_VERSION"));
        println!("可用实验:");
        for name in EXPERIMENT_NAMES {
            println!("  - {name}");
        }
    }
    Ok(())
}

fn print_snapshot(path: &Path) -> Result<()> {
    let header = Snapshot::read_header(path).with_context(|| format!("无法读取快照 {}", path.display()))?;
    println!("=== 快照 {} ===", path.display());
    println!("格式版本: {}", header.version);
    println!("t = {:.6e}, k = {}", header.time, header.step);
    println!(
        "单元: {}, 守恒量: {}, 附加量: {}",
        header.n_cells, header.n_cvars, header.n_avars
    );
    Ok(())
}

fn print_config(path: &Path) -> Result<()> {
    let config =
        SimulationConfig::from_file(path).with_context(|| format!("无法加载配置 {}", path.display()))?;
    println!("=== 配置 {} ===", path.display());
    println!("实验: {}", config.experiment.name);
    println!(
        "状态方程: gamma = {}, R = {}",
        config.euler.eos.gamma, config.euler.eos.specific_gas_constant
    );
    println!("重力: {:?} ({:?})", config.euler.gravity.kind, config.euler.gravity.alignment);
    println!("网格: {:?}", config.grid);
    println!(
        "重构: {:?}, 阶数 {:?}",
        config.reconstruction.mode, config.reconstruction.orders
    );
    println!(
        "保平衡: {:?}, 外边通量: {:?}, 边界条件: {:?}",
        config.well_balancing.mode, config.flux_bc.mode, config.boundary_condition.mode
    );
    println!("时间积分: {:?}, CFL = {}", config.ode.solver, config.ode.cfl_number);
    println!("终止: {:?}", config.time);
    println!("输出: {:?} -> {}", config.io.mode, config.io.directory.display());
    println!(
        "并行: {} 个分区, 线程 {:?}",
        config.parallelization.n_parts, config.parallelization.n_threads
    );
    if let Some(restart) = &config.restart {
        println!("重启: {}", restart.file.display());
    }
    Ok(())
}

fn print_defaults() -> Result<()> {
    let json = serde_json::to_string_pretty(&SimulationConfig::default())?;
    println!("{json}");
    Ok(())
}
