// apps/zisa_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 除了配置层自身的校验，还检查实验与重力是否匹配、网格能否构造。

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Args;
use tracing::info;
use zisa_config::{IoMode, SimulationConfig};
use zisa_experiments::make_scenario;
use zisa_physics::{build_grid, build_stencil_families};

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: PathBuf,

    /// 同时构造网格和模板族
    #[arg(long)]
    pub grid: bool,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

#[derive(Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn is_ok(&self, strict: bool) -> bool {
        self.errors.is_empty() && (!strict || self.warnings.is_empty())
    }
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== ZisaFVM 配置验证 ===");

    let mut result = ValidationResult::default();
    if let Some(config) = load(&args.config, &mut result) {
        check_experiment(&config, &mut result);
        check_numerics(&config, &mut result);
        if args.grid {
            check_grid(&config, &mut result);
        }
    }

    print_validation_result(&result, args.strict)
}

fn load(path: &Path, result: &mut ValidationResult) -> Option<SimulationConfig> {
    println!("\n检查配置文件: {}", path.display());
    match SimulationConfig::from_file(path) {
        Ok(config) => {
            println!("  ✓ 配置文件格式有效");
            Some(config)
        }
        Err(e) => {
            result.add_error(e.to_string());
            None
        }
    }
}

fn check_experiment(config: &SimulationConfig, result: &mut ValidationResult) {
    match make_scenario(&config.experiment.name) {
        Ok(scenario) => {
            if let Err(e) = scenario.check(config) {
                result.add_error(e.to_string());
            }
        }
        Err(e) => result.add_error(e.to_string()),
    }

    if let Some(restart) = &config.restart {
        if !restart.file.exists() {
            result.add_error(format!("重启文件不存在: {}", restart.file.display()));
        }
    }
    if let Some(file) = &config.grid.file {
        if !file.exists() {
            result.add_error(format!("网格文件不存在: {}", file.display()));
        }
    }
    if let Some(file) = &config.experiment.initial_conditions.profile {
        if !file.exists() {
            result.add_error(format!("剖面文件不存在: {}", file.display()));
        }
    }
}

fn check_numerics(config: &SimulationConfig, result: &mut ValidationResult) {
    let cfl = config.ode.cfl_number;
    if cfl > 0.5 {
        result.add_warning(format!("CFL 数 {cfl} 大于 0.5 可能导致不稳定"));
    }
    if config.io.mode == IoMode::None {
        result.add_warning("io.mode = none，不会写出任何结果");
    }
    if let Some(n) = config.parallelization.n_threads {
        if n < config.parallelization.n_parts {
            result.add_warning(format!(
                "线程数 {n} 少于分区数 {}",
                config.parallelization.n_parts
            ));
        }
    }
}

fn check_grid(config: &SimulationConfig, result: &mut ValidationResult) {
    let grid = match build_grid(config) {
        Ok(grid) => grid,
        Err(e) => {
            result.add_error(format!("构造网格失败: {e}"));
            return;
        }
    };
    println!("  ✓ {}", grid.summary());

    if grid.n_ghost_cells() == grid.n_cells() {
        result.add_error("所有单元都是幽灵单元");
    }
    if let Err(e) = build_stencil_families(&grid, config) {
        result.add_error(format!("构造模板失败: {e}"));
    }
    if config.parallelization.n_parts > grid.n_cells() {
        result.add_error(format!(
            "分区数 {} 多于单元数 {}",
            config.parallelization.n_parts,
            grid.n_cells()
        ));
    }
}

fn print_validation_result(result: &ValidationResult, strict: bool) -> Result<()> {
    for w in &result.warnings {
        println!("  ⚠ {w}");
    }
    for e in &result.errors {
        println!("  ✗ {e}");
    }

    if result.is_ok(strict) {
        println!("\n验证通过 ({} 个警告)", result.warnings.len());
        Ok(())
    } else {
        bail!(
            "验证失败: {} 个错误, {} 个警告",
            result.errors.len(),
            result.warnings.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_mode_rejects_warnings() {
        let mut result = ValidationResult::default();
        assert!(result.is_ok(true));
        result.add_warning("w");
        assert!(result.is_ok(false));
        assert!(!result.is_ok(true));
        result.add_error("e");
        assert!(!result.is_ok(false));
    }

    #[test]
    fn test_polytrope_with_constant_gravity_is_an_error() {
        let mut config = SimulationConfig::default();
        config.euler.gravity.kind = zisa_config::GravityKind::Constant { g: 1.0 };
        let mut result = ValidationResult::default();
        check_experiment(&config, &mut result);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_missing_profile_file_is_an_error() {
        let mut config = SimulationConfig::default();
        config.experiment.name = "stellar_convection".into();
        config.experiment.initial_conditions.profile = Some("does/not/exist.json".into());
        let mut result = ValidationResult::default();
        check_experiment(&config, &mut result);
        assert_eq!(result.errors.len(), 1);
    }
}
