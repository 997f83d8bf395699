// crates/zisa_physics/src/flux/mod.rs

//! 数值通量
//!
//! 所有通量都在边的法向坐标系中计算：调用方先用
//! [`coord_transform`](crate::model::coord_transform) 旋转左右状态，
//! 再把结果转回全局坐标系。
//!
//! - [`hllc`]: Batten 波速估计的 HLLC
//! - [`rusanov`]: Rusanov（局部 Lax-Friedrichs）

pub mod hllc;
pub mod rusanov;

pub use hllc::HllcBatten;
pub use rusanov::Rusanov;

use crate::model::{Euler, EulerVars};

/// 波速估计
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaveSpeeds {
    /// 左行波速
    pub s_left: f64,
    /// 接触波速
    pub s_star: f64,
    /// 右行波速
    pub s_right: f64,
}

/// 法向坐标系中的数值通量
pub trait NumericalFlux: Send + Sync {
    /// 名称
    fn name(&self) -> &'static str;

    /// 守恒量通量及波速
    fn flux(&self, euler: &Euler, u_left: &EulerVars, u_right: &EulerVars) -> (EulerVars, WaveSpeeds);

    /// 被动标量通量，`q_left`、`q_right` 为标量的质量密度
    fn tracer_flux(
        &self,
        u_left: &EulerVars,
        u_right: &EulerVars,
        q_left: f64,
        q_right: f64,
        speeds: &WaveSpeeds,
    ) -> f64;
}

/// 由配置名创建数值通量
pub fn numerical_flux_by_name(name: &str) -> Option<Box<dyn NumericalFlux>> {
    match name.to_ascii_lowercase().as_str() {
        "hllc" | "hllc_batten" => Some(Box::new(HllcBatten)),
        "rusanov" => Some(Box::new(Rusanov)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flux_by_name() {
        assert_eq!(numerical_flux_by_name("HLLC").unwrap().name(), "HLLC (Batten)");
        assert_eq!(numerical_flux_by_name("rusanov").unwrap().name(), "Rusanov");
        assert!(numerical_flux_by_name("roe").is_none());
    }
}
