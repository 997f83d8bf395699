// crates/zisa_physics/src/model/scaling.rs

//! 重构前的变量缩放
//!
//! 平衡偏差按单元特征量缩放后再重构，使光滑度指示子在各变量间可比。

use super::eos::IdealGasEos;
use super::variables::{EulerVars, RhoE};

/// 变量缩放
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scaling {
    /// 不缩放
    Unity,
    /// `(ρ, a, a, a, E)`
    Euler(IdealGasEos),
}

impl Scaling {
    /// 单元 `(ρ, ρe)` 对应的缩放因子，非正或非有限的分量取 1
    pub fn scale(&self, rho_e: RhoE) -> EulerVars {
        match self {
            Self::Unity => EulerVars::repeat(1.0),
            Self::Euler(eos) => {
                let p = eos.rho_p_from_rho_e(rho_e).p;
                let a = eos.sound_speed(rho_e.rho, p);
                EulerVars::new(rho_e.rho, a, a, a, rho_e.e).map(|s| if s.is_finite() && s > 0.0 { s } else { 1.0 })
            }
        }
    }

    /// 名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unity => "unity",
            Self::Euler(_) => "euler",
        }
    }
}
