// crates/zisa_experiments/src/scenarios/stellar_convection.rs

//! 恒星对流：由一维径向剖面插值得到初始状态
//!
//! 剖面文件 (`experiment.initial_conditions.profile`) 为 JSON：
//!
//! ```text
//! {
//!   "radius":     [r0, r1, ...],
//!   "density":    [...],
//!   "momentum_r": [...],          // 可选，径向动量
//!   "momentum_phi": [...],        // 可选，周向动量
//!   "momentum_z": [...],          // 可选，平面外动量
//!   "energy":     [...],          // 总能量密度
//!   "advected":   { "he4": [...], ... }   // 可选，质量分数
//! }
//! ```
//!
//! 守恒量取插值的单元平均；被动标量按质量加权，即平均 `ρ X`，
//! 顺序为 `advected` 的键序。初始状态同时作为稳态参考。

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use glam::DVec2;
use rayon::prelude::*;
use serde::Deserialize;
use zisa_config::SimulationConfig;
use zisa_foundation::{ZisaError, ZisaResult};
use zisa_grid::Grid;
use zisa_math::LinearInterpolation;
use zisa_physics::model::EulerVars;
use zisa_physics::{AllVariables, Euler};

use crate::experiment::{InitialConditions, Scenario};
use crate::ic::cell_averages;

/// 一维径向剖面
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RadialProfile {
    /// 严格递增的半径
    pub radius: Vec<f64>,
    /// 密度
    pub density: Vec<f64>,
    /// 径向动量
    #[serde(default)]
    pub momentum_r: Option<Vec<f64>>,
    /// 周向动量
    #[serde(default)]
    pub momentum_phi: Option<Vec<f64>>,
    /// 平面外动量
    #[serde(default)]
    pub momentum_z: Option<Vec<f64>>,
    /// 总能量密度
    pub energy: Vec<f64>,
    /// 被动标量的质量分数
    #[serde(default)]
    pub advected: BTreeMap<String, Vec<f64>>,
}

impl RadialProfile {
    /// 读取 JSON 剖面
    pub fn load(path: &Path) -> ZisaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| ZisaError::serialization(format!("剖面 {}: {e}", path.display())))
    }

    /// 被动标量个数
    pub fn n_avars(&self) -> usize {
        self.advected.len()
    }
}

/// 剖面各分量的插值
struct ProfileInterpolation {
    rho: LinearInterpolation,
    m_r: Option<LinearInterpolation>,
    m_phi: Option<LinearInterpolation>,
    m_z: Option<LinearInterpolation>,
    energy: LinearInterpolation,
    advected: Vec<LinearInterpolation>,
}

impl ProfileInterpolation {
    fn new(profile: &RadialProfile) -> ZisaResult<Self> {
        let interp = |values: &Vec<f64>| LinearInterpolation::new(profile.radius.clone(), values.clone());
        let optional = |values: &Option<Vec<f64>>| values.as_ref().map(interp).transpose();
        Ok(Self {
            rho: interp(&profile.density)?,
            m_r: optional(&profile.momentum_r)?,
            m_phi: optional(&profile.momentum_phi)?,
            m_z: optional(&profile.momentum_z)?,
            energy: interp(&profile.energy)?,
            advected: profile.advected.values().map(interp).collect::<ZisaResult<_>>()?,
        })
    }

    fn cvars(&self, x: DVec2) -> EulerVars {
        let r = x.length();
        let e_r = if r > 0.0 { x / r } else { DVec2::ZERO };
        let e_phi = e_r.perp();
        let eval = |f: &Option<LinearInterpolation>| f.as_ref().map_or(0.0, |f| f.eval(r));
        let m = eval(&self.m_r) * e_r + eval(&self.m_phi) * e_phi;
        EulerVars::new(self.rho.eval(r), m.x, m.y, eval(&self.m_z), self.energy.eval(r))
    }
}

/// 恒星对流
#[derive(Debug, Clone, Copy, Default)]
pub struct StellarConvection;

impl StellarConvection {
    fn profile_path(config: &SimulationConfig) -> ZisaResult<&Path> {
        config.experiment.initial_conditions.profile.as_deref().ok_or_else(|| {
            ZisaError::invalid_config(
                "experiment.initial_conditions.profile",
                "null",
                "stellar_convection 需要径向剖面文件",
            )
        })
    }

    /// 按剖面计算单元平均
    pub fn state(grid: &Grid, profile: &RadialProfile) -> ZisaResult<AllVariables> {
        let interpolation = ProfileInterpolation::new(profile)?;
        let n_avars = profile.n_avars();
        let mut u = cell_averages(grid, n_avars, |x| interpolation.cvars(x));

        if n_avars > 0 {
            u.avars.par_chunks_mut(n_avars).enumerate().for_each(|(i, ai)| {
                for (a, xk) in ai.iter_mut().zip(&interpolation.advected) {
                    *a = grid.cells[i].average(|x| {
                        let r = x.length();
                        interpolation.rho.eval(r) * xk.eval(r)
                    });
                }
            });
        }
        Ok(u)
    }
}

impl Scenario for StellarConvection {
    fn name(&self) -> &'static str {
        "stellar_convection"
    }

    fn check(&self, config: &SimulationConfig) -> ZisaResult<()> {
        Self::profile_path(config).map(|_| ())
    }

    fn initial_conditions(
        &self,
        grid: &Grid,
        _euler: &Arc<Euler>,
        config: &SimulationConfig,
    ) -> ZisaResult<InitialConditions> {
        let profile = RadialProfile::load(Self::profile_path(config)?)?;
        tracing::info!(
            "径向剖面: {} 个节点, r ∈ [{:e}, {:e}], {} 个被动标量",
            profile.radius.len(),
            profile.radius.first().copied().unwrap_or(0.0),
            profile.radius.last().copied().unwrap_or(0.0),
            profile.n_avars()
        );

        let u0 = Self::state(grid, &profile)?;
        Ok(InitialConditions {
            steady_state: Some(u0.clone()),
            u0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zisa_grid::{DiscGridGenerator, QuadratureDegrees};

    fn uniform_profile() -> RadialProfile {
        let radius = vec![0.0, 0.5, 1.0];
        RadialProfile {
            density: vec![2.0; 3],
            momentum_r: Some(vec![1.0; 3]),
            momentum_phi: None,
            momentum_z: None,
            energy: vec![5.0; 3],
            advected: BTreeMap::from([("c12".to_string(), vec![0.25; 3]), ("he4".to_string(), vec![0.75; 3])]),
            radius,
        }
    }

    fn grid() -> Grid {
        DiscGridGenerator::new(1.0, 4, 6)
            .build(QuadratureDegrees::for_order(3))
            .unwrap()
    }

    #[test]
    fn test_uniform_profile_averages() {
        let grid = grid();
        let u = StellarConvection::state(&grid, &uniform_profile()).unwrap();
        assert_eq!(u.n_avars(), 2);

        for i in 0..grid.n_cells() {
            assert!((u.cvars[i][0] - 2.0).abs() < 1e-12);
            assert!((u.cvars[i][4] - 5.0).abs() < 1e-12);
            // 径向动量指向外侧
            let m = DVec2::new(u.cvars[i][1], u.cvars[i][2]);
            assert!(m.length() <= 1.0 + 1e-12);
            assert!(m.dot(grid.cell_centers[i]) > 0.0);
            assert_eq!(u.cvars[i][3], 0.0);
            // 质量加权：ρ X
            assert!((u.avars_of(i)[0] - 0.5).abs() < 1e-12);
            assert!((u.avars_of(i)[1] - 1.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_linear_density_profile() {
        let grid = grid();
        let mut profile = uniform_profile();
        profile.density = vec![3.0, 2.0, 1.0];
        profile.advected.clear();
        let u = StellarConvection::state(&grid, &profile).unwrap();
        assert_eq!(u.n_avars(), 0);
        for i in 0..grid.n_cells() {
            let rho = u.cvars[i][0];
            assert!((1.0..=3.0).contains(&rho));
        }
        // 中心附近密度更高
        let (inner, outer) = (0..grid.n_cells()).fold((0, 0), |(a, b), i| {
            if grid.cell_centers[i].length() < grid.cell_centers[a].length() {
                (i, b)
            } else if grid.cell_centers[i].length() > grid.cell_centers[b].length() {
                (a, i)
            } else {
                (a, b)
            }
        });
        assert!(u.cvars[inner][0] > u.cvars[outer][0]);
    }

    #[test]
    fn test_load_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(
            &path,
            r#"{"radius": [0.0, 1.0], "density": [1.0, 0.5], "energy": [2.0, 1.0],
                "advected": {"h1": [1.0, 1.0]}}"#,
        )
        .unwrap();
        let profile = RadialProfile::load(&path).unwrap();
        assert_eq!(profile.n_avars(), 1);
        assert!(profile.momentum_r.is_none());

        std::fs::write(&path, r#"{"radius": [0.0, 1.0]}"#).unwrap();
        assert!(RadialProfile::load(&path).is_err());
        assert!(RadialProfile::load(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_requires_profile() {
        let config = SimulationConfig::default();
        assert!(StellarConvection.check(&config).is_err());
    }

    #[test]
    fn test_non_monotone_radius_is_rejected() {
        let mut profile = uniform_profile();
        profile.radius = vec![0.0, 0.5, 0.5];
        assert!(StellarConvection::state(&grid(), &profile).is_err());
    }
}
