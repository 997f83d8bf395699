// crates/zisa_foundation/src/lib.rs

//! ZisaFVM Foundation Layer
//!
//! 基础层，提供整个求解器共享的错误类型与数值常量。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `ZisaError` 与 `ensure!` 宏
//! - [`float`]: 数值常量和浮点比较
//!
//! # 示例
//!
//! ```
//! use zisa_foundation::prelude::*;
//!
//! fn area(a: f64) -> ZisaResult<f64> {
//!     ensure!(a > MIN_AREA, ZisaError::invalid_mesh("退化三角形"));
//!     Ok(a)
//! }
//! assert!(area(0.0).is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod float;

// 重导出常用类型
pub use error::{ZisaError, ZisaResult};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::ensure;
    pub use crate::error::{ZisaError, ZisaResult};
    pub use crate::float::{all_finite, almost_equal, DEFAULT_EPSILON, MIN_AREA};
}
