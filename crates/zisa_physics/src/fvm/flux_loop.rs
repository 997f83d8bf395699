// crates/zisa_physics/src/fvm/flux_loop.rs

//! 内部边通量循环
//!
//! 对每条内部边 `e = (L, R)`，在边求积点上取两侧重构值，旋转到法向坐标系
//! 求数值通量，再转回并积分：
//!
//! ```text
//! F_e = ∫_e T⁻¹ F̂(T u_L(x), T u_R(x)) dx
//! tendency[L] -= F_e / |L|,   tendency[R] += F_e / |R|
//! ```
//!
//! 各边通量并行计算，累加按边顺序串行完成，结果与线程数无关。

use std::sync::Arc;

use rayon::prelude::*;
use zisa_foundation::{ZisaError, ZisaResult};
use zisa_grid::Grid;

use super::RateOfChange;
use crate::flux::NumericalFlux;
use crate::model::{coord_transform, inv_coord_transform, AllVariables, Euler, EulerVars};
use crate::reconstruction::{GlobalReconstruction, LocalReconstruction};

/// 一条边的积分通量
struct EdgeFlux {
    cvars: EulerVars,
    avars: Vec<f64>,
}

/// 内部边通量循环
pub struct FluxLoop {
    grid: Arc<Grid>,
    euler: Arc<Euler>,
    flux: Box<dyn NumericalFlux>,
    reconstruction: Arc<GlobalReconstruction>,
}

impl FluxLoop {
    /// 创建
    pub fn new(
        grid: Arc<Grid>,
        euler: Arc<Euler>,
        flux: Box<dyn NumericalFlux>,
        reconstruction: Arc<GlobalReconstruction>,
    ) -> Self {
        Self {
            grid,
            euler,
            flux,
            reconstruction,
        }
    }

    /// 共享的重构
    pub fn reconstruction(&self) -> &Arc<GlobalReconstruction> {
        &self.reconstruction
    }

    fn edge_flux(&self, e: usize, locals: &[LocalReconstruction], n_avars: usize) -> Option<EdgeFlux> {
        let (il, ir) = self.grid.left_right[e];
        if self.grid.cell_flags[il].ghost_cell && self.grid.cell_flags[ir].ghost_cell {
            return None;
        }

        let n = self.grid.normals[e];
        let face = &self.grid.faces[e];
        let (rc_l, rc_r) = (&locals[il], &locals[ir]);

        let mut cvars = EulerVars::zeros();
        let mut avars = vec![0.0; n_avars];
        for (&x, &w) in face.points.iter().zip(&face.weights) {
            let u_l = coord_transform(&rc_l.eval(x), n);
            let u_r = coord_transform(&rc_r.eval(x), n);
            let (nf, speeds) = self.flux.flux(&self.euler, &u_l, &u_r);
            cvars += inv_coord_transform(&nf, n) * w;

            for (k, a) in avars.iter_mut().enumerate() {
                let q_l = rc_l.tracer(x, k);
                let q_r = rc_r.tracer(x, k);
                *a += w * self.flux.tracer_flux(&u_l, &u_r, q_l, q_r, &speeds);
            }
        }
        Some(EdgeFlux { cvars, avars })
    }
}

impl RateOfChange for FluxLoop {
    fn name(&self) -> &str {
        "flux_loop"
    }

    fn compute(&self, tendency: &mut AllVariables, u: &AllVariables, _t: f64) -> ZisaResult<()> {
        ZisaError::check_size("flux_loop.tendency", u.n_cells(), tendency.n_cells())?;
        self.reconstruction.compute(u)?;
        let locals = self.reconstruction.read();
        let n_avars = u.n_avars();

        let fluxes: Vec<Option<EdgeFlux>> = (0..self.grid.n_interior_edges())
            .into_par_iter()
            .map(|e| self.edge_flux(e, &locals, n_avars))
            .collect();

        for (e, ef) in fluxes.into_iter().enumerate() {
            let Some(ef) = ef else { continue };
            let (il, ir) = self.grid.left_right[e];
            let (inv_vl, inv_vr) = (1.0 / self.grid.volumes[il], 1.0 / self.grid.volumes[ir]);

            tendency.cvars[il] -= ef.cvars * inv_vl;
            tendency.cvars[ir] += ef.cvars * inv_vr;
            for (k, f) in ef.avars.iter().enumerate() {
                tendency.avars_of_mut(il)[k] -= f * inv_vl;
                tendency.avars_of_mut(ir)[k] += f * inv_vr;
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("flux_loop[{}, {}]", self.flux.name(), self.reconstruction.describe())
    }
}
