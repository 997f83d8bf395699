// apps/zisa_cli/src/main.rs

//! ZisaFVM 命令行界面
//!
//! 带重力 Euler 方程有限体积求解器的命令行工具：运行实验、检查配置、
//! 生成网格、查看快照。

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// ZisaFVM 命令行工具
#[derive(Parser)]
#[command(name = "zisa")]
#[command(author = "ZisaFVM Developers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Well-balanced finite volume solver for the Euler equations with gravity", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行实验
    Run(commands::run::RunArgs),
    /// 显示信息
    Info(commands::info::InfoArgs),
    /// 验证配置
    Validate(commands::validate::ValidateArgs),
    /// 生成网格并写成 Gmsh 文件
    Grid(commands::grid::GridArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Info(args) => commands::info::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Grid(args) => commands::grid::execute(args),
    }
}
