// crates/zisa_physics/src/reconstruction/mod.rs

//! 高阶重构
//!
//! - [`stencil`]: 模板选取（中心与单侧）
//! - [`stencil_family`]: 单元的模板族
//! - [`lsq`]: 最小二乘多项式拟合
//! - [`hybrid_weno`]: WENO-AO / CWENO-AO 非线性加权
//! - [`local`]: 单元上的保平衡重构
//! - [`global`]: 全部单元的重构

pub mod global;
pub mod hybrid_weno;
pub mod local;
pub mod lsq;
pub mod stencil;
pub mod stencil_family;

pub use global::GlobalReconstruction;
pub use hybrid_weno::{make_hybrid_weno_params, HybridWeno, HybridWenoParams};
pub use local::{LocalReconstruction, RecomputePolicy};
pub use lsq::LsqSolver;
pub use stencil::{Stencil, StencilBias, StencilFamilyParams, StencilParams};
pub use stencil_family::{compute_stencil_families, StencilFamily};
