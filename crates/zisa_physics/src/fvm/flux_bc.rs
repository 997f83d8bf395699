// crates/zisa_physics/src/fvm/flux_bc.rs

//! 外部边通量
//!
//! 计算区域外边界上没有邻居单元，通量由单元自身状态给出：
//!
//! - [`FluxBc`]: 单元平均的物理通量，沿边为常数
//! - [`EquilibriumFluxBc`]: 由单元平均求出局部平衡，把平衡态外推到边求积点上积分，
//!   与保平衡源项的边界积分相互抵消
//! - [`NoFluxBc`]: 不加任何外部边通量

use std::sync::Arc;

use rayon::prelude::*;
use zisa_foundation::{ZisaError, ZisaResult};
use zisa_grid::Grid;

use super::RateOfChange;
use crate::model::{coord_transform, inv_coord_transform, AllVariables, Equilibrium, Euler, EulerVars, LocalEquilibrium};

/// 不加外部边通量
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFluxBc;

impl RateOfChange for NoFluxBc {
    fn name(&self) -> &str {
        "no_flux_bc"
    }

    fn compute(&self, _tendency: &mut AllVariables, _u: &AllVariables, _t: f64) -> ZisaResult<()> {
        Ok(())
    }
}

/// 外部边上单元 `i` 的贡献，`(单元, 守恒量, 被动标量)`
type BoundaryContribution = (usize, EulerVars, Vec<f64>);

fn scatter(grid: &Grid, tendency: &mut AllVariables, contributions: Vec<BoundaryContribution>) {
    for (i, f, fa) in contributions {
        let inv_v = 1.0 / grid.volumes[i];
        tendency.cvars[i] -= f * inv_v;
        for (a, fa) in tendency.avars_of_mut(i).iter_mut().zip(&fa) {
            *a -= fa * inv_v;
        }
    }
}

/// 单元平均的物理通量
pub struct FluxBc {
    grid: Arc<Grid>,
    euler: Arc<Euler>,
}

impl FluxBc {
    /// 创建
    pub fn new(grid: Arc<Grid>, euler: Arc<Euler>) -> Self {
        Self { grid, euler }
    }
}

impl RateOfChange for FluxBc {
    fn name(&self) -> &str {
        "flux_bc"
    }

    fn compute(&self, tendency: &mut AllVariables, u: &AllVariables, _t: f64) -> ZisaResult<()> {
        ZisaError::check_size("flux_bc.tendency", u.n_cells(), tendency.n_cells())?;
        let contributions: Vec<BoundaryContribution> = self
            .grid
            .exterior_edges
            .par_iter()
            .enumerate()
            .map(|(e, ee)| {
                let i = ee.cell;
                let n = self.grid.exterior_normals[e];
                let length = self.grid.exterior_faces[e].volume;

                let u_n = coord_transform(&u.cvars[i], n);
                let f = inv_coord_transform(&self.euler.flux_of(&u_n), n) * length;

                let v_n = u_n[1] / u_n[0];
                let fa = u.avars_of(i).iter().map(|q| q * v_n * length).collect();
                (i, f, fa)
            })
            .collect();

        scatter(&self.grid, tendency, contributions);
        Ok(())
    }
}

/// 外推局部平衡态的通量
pub struct EquilibriumFluxBc {
    grid: Arc<Grid>,
    euler: Arc<Euler>,
    equilibrium: Equilibrium,
}

impl EquilibriumFluxBc {
    /// 创建
    pub fn new(grid: Arc<Grid>, euler: Arc<Euler>, equilibrium: Equilibrium) -> Self {
        Self {
            grid,
            euler,
            equilibrium,
        }
    }
}

impl RateOfChange for EquilibriumFluxBc {
    fn name(&self) -> &str {
        "equilibrium_flux_bc"
    }

    fn compute(&self, tendency: &mut AllVariables, u: &AllVariables, _t: f64) -> ZisaResult<()> {
        ZisaError::check_size("equilibrium_flux_bc.tendency", u.n_cells(), tendency.n_cells())?;
        let eos = &self.euler.eos;
        let n_avars = u.n_avars();

        let contributions: Vec<BoundaryContribution> = self
            .grid
            .exterior_edges
            .par_iter()
            .enumerate()
            .map(|(e, ee)| {
                let i = ee.cell;
                let n = self.grid.exterior_normals[e];
                let face = &self.grid.exterior_faces[e];

                let mut local = LocalEquilibrium::new(self.equilibrium.clone());
                local.solve(eos.rho_e(&u.cvars[i]), &self.grid.cells[i]);

                // 静止的平衡态只有压力通量，被动标量不穿过边界
                let f = if local.is_found() {
                    face.integrate(|x| {
                        let u_eq = coord_transform(&eos.cvars_from_rho_e(local.extrapolate(x)), n);
                        inv_coord_transform(&self.euler.flux_of(&u_eq), n)
                    })
                } else {
                    let u_n = coord_transform(&u.cvars[i], n);
                    inv_coord_transform(&self.euler.flux_of(&u_n), n) * face.volume
                };
                (i, f, vec![0.0; n_avars])
            })
            .collect();

        scatter(&self.grid, tendency, contributions);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("equilibrium_flux_bc[{}]", self.equilibrium.name())
    }
}
