// apps/zisa_cli/src/commands/run.rs

//! 运行实验命令

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;
use zisa_config::{RestartConfig, SimulationConfig};
use zisa_experiments::make_experiment;

/// 运行参数
#[derive(Args)]
pub struct RunArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: PathBuf,

    /// 覆盖输出目录
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 覆盖分区个数
    #[arg(long)]
    pub n_parts: Option<usize>,

    /// 覆盖 rayon 线程数
    #[arg(long)]
    pub threads: Option<usize>,

    /// 从快照重启
    #[arg(long)]
    pub restart: Option<PathBuf>,
}

/// 命令行参数覆盖配置文件
fn apply_overrides(config: &mut SimulationConfig, args: &RunArgs) {
    if let Some(dir) = &args.output {
        config.io.directory = dir.clone();
    }
    if let Some(n) = args.n_parts {
        config.parallelization.n_parts = n;
    }
    if let Some(n) = args.threads {
        config.parallelization.n_threads = Some(n);
    }
    if let Some(file) = &args.restart {
        config.restart = Some(RestartConfig { file: file.clone() });
    }
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== ZisaFVM 运行 ===");

    let mut config = SimulationConfig::from_file(&args.config)
        .with_context(|| format!("无法加载配置 {}", args.config.display()))?;
    apply_overrides(&mut config, &args);
    config.validate().context("命令行覆盖后的配置无效")?;

    let mut experiment = make_experiment(config).context("创建实验失败")?;
    experiment.run().with_context(|| format!("实验 {} 运行失败", experiment.name()))?;
    let report = experiment.post_process().context("后处理失败")?;

    println!("\n=== 结果 ===");
    println!("实验: {}", experiment.name());
    println!(
        "步数: {} (拒绝 {}), 终止时刻: {:.6e}",
        report.summary.final_step, report.summary.n_rejected, report.summary.final_time
    );
    println!("用时: {:.2?}", report.summary.elapsed);
    println!("相对质量变化: {:.3e}", report.relative_mass_change());
    if let Some(dev) = report.steady_state_deviation {
        println!("与稳态的最大偏差: {dev:.3e}");
    }
    if report.summary.interrupted {
        println!("运行被中断");
    }
    Ok(())
}
