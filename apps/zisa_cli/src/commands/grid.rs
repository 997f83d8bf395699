// apps/zisa_cli/src/commands/grid.rs

//! 网格生成命令

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;
use zisa_config::SimulationConfig;
use zisa_grid::GmshWriter;
use zisa_physics::build_grid;

/// 网格生成参数
#[derive(Args)]
pub struct GridArgs {
    /// 配置文件路径，网格取自 `grid` 段
    #[arg(short, long)]
    pub config: PathBuf,

    /// 输出的 `.msh` 文件
    #[arg(short, long, default_value = "grid.msh")]
    pub output: PathBuf,
}

/// 执行网格命令
pub fn execute(args: GridArgs) -> Result<()> {
    let config = SimulationConfig::from_file(&args.config)
        .with_context(|| format!("无法加载配置 {}", args.config.display()))?;
    let grid = build_grid(&config).context("生成网格失败")?;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    GmshWriter::write(&args.output, &grid)
        .with_context(|| format!("写入 {} 失败", args.output.display()))?;

    info!("网格写入 {}", args.output.display());
    println!("{}", grid.summary());
    Ok(())
}
