// crates/zisa_math/src/lib.rs

//! ZisaFVM 数学层
//!
//! 有限体积离散所需的几何与数值工具。
//!
//! # 模块概览
//!
//! - [`geometry`]: 三角形、边、旋转，以及模板搜索用的区域（锥形、半平面）
//! - [`quadrature`]: Gauss-Legendre、边和三角形上的求积规则
//! - [`poly2d`]: 以单元矩归一化的二维多项式
//! - [`roots`]: Newton、Brent 与二维拟 Newton 求根
//! - [`interpolation`]: 分段线性插值

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod geometry;
pub mod interpolation;
pub mod poly2d;
pub mod quadrature;
pub mod roots;

pub use geometry::{rotate_left, rotate_right, Ball, Cone, Edge, FullSphere, HalfPlane, Region, Triangle};
pub use interpolation::LinearInterpolation;
pub use poly2d::{poly_dof, poly_index, Poly2D, MAX_DEGREE, MAX_DOF};
pub use quadrature::{DenormalizedRule, EdgeRule, GaussLegendre, TriangularRule};
pub use roots::{brent, newton, quasi_newton, RollingConvergenceRate};

/// 数学层常用导出
pub mod prelude {
    pub use crate::geometry::{Edge, Triangle};
    pub use crate::poly2d::{Poly2D, MAX_DOF};
    pub use crate::quadrature::DenormalizedRule;
    pub use glam::DVec2;
}
