// crates/zisa_physics/src/model/cfl.rs

//! CFL 时间步
//!
//! `dt = cfl · min_i r_i / (|v_i| + a_i)`，`r_i` 为单元内切圆半径。
//! 分布式运行时由 [`AllReduce`] 取全局最小值。

use std::sync::Arc;

use rayon::prelude::*;
use zisa_foundation::ZisaResult;
use zisa_grid::Grid;

use super::all_variables::AllVariables;
use super::euler::Euler;
use crate::parallel::{AllReduce, NoAllReduce};

/// 基于局部波速的 CFL 条件
pub struct LocalCfl {
    grid: Arc<Grid>,
    euler: Arc<Euler>,
    cfl_number: f64,
    all_reduce: Arc<dyn AllReduce>,
}

impl LocalCfl {
    /// 串行运行的 CFL 条件
    pub fn new(grid: Arc<Grid>, euler: Arc<Euler>, cfl_number: f64) -> Self {
        Self::with_all_reduce(grid, euler, cfl_number, Arc::new(NoAllReduce))
    }

    /// 指定跨分区归约
    pub fn with_all_reduce(
        grid: Arc<Grid>,
        euler: Arc<Euler>,
        cfl_number: f64,
        all_reduce: Arc<dyn AllReduce>,
    ) -> Self {
        Self {
            grid,
            euler,
            cfl_number,
            all_reduce,
        }
    }

    /// CFL 数
    pub fn cfl_number(&self) -> f64 {
        self.cfl_number
    }

    /// 当前状态允许的最大时间步
    pub fn time_step(&self, u: &AllVariables) -> ZisaResult<f64> {
        let local = u
            .cvars
            .par_iter()
            .zip(self.grid.inradius.par_iter())
            .map(|(ui, &r)| r / self.euler.max_wave_speed(ui))
            .reduce(|| f64::INFINITY, f64::min);
        Ok(self.cfl_number * self.all_reduce.min(local)?)
    }
}
