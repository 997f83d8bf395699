// crates/zisa_physics/src/model/mod.rs

//! 物理模型
//!
//! - [`variables`]: 守恒量与热力学变量组合、坐标旋转
//! - [`eos`]: 理想气体状态方程
//! - [`gravity`]: 重力势
//! - [`euler`]: Euler 方程
//! - [`all_variables`]: 全部单元的变量
//! - [`equilibrium`]: 等熵平衡与局部平衡
//! - [`scaling`]: 重构缩放
//! - [`cfl`]: CFL 时间步
//! - [`sanity`]: 状态合理性检查

pub mod all_variables;
pub mod cfl;
pub mod eos;
pub mod equilibrium;
pub mod euler;
pub mod gravity;
pub mod sanity;
pub mod scaling;
pub mod variables;

pub use all_variables::AllVariables;
pub use cfl::LocalCfl;
pub use eos::IdealGasEos;
pub use equilibrium::{Equilibrium, IsentropicEquilibrium, LocalEquilibrium};
pub use euler::{is_plausible, Euler};
pub use gravity::{Gravity, GravityAlignment, GravityBase};
pub use sanity::{EulerSanityCheck, NoSanityCheck, SanityCheck};
pub use scaling::Scaling;
pub use variables::{
    coord_transform, from_array, inv_coord_transform, to_array, EnthalpyEntropy, EulerVars, ExtendedVariables, RhoE,
    RhoEntropy, RhoP, RhoT, N_CVARS,
};
