// crates/zisa_grid/src/lib.rs

//! ZisaFVM 网格模块
//!
//! 非结构三角形网格及其预计算几何量。
//!
//! # 模块结构
//!
//! - [`grid`]: 网格、边编号、单元标志
//! - [`generation`]: 矩形与圆盘结构化剖分
//! - [`io`]: 网格 IO (GMSH)
//! - [`locator`]: R-Tree 点定位
//!
//! # 示例
//!
//! ```rust
//! use zisa_grid::{generation::DiscGridGenerator, QuadratureDegrees};
//!
//! let grid = DiscGridGenerator::new(1.0, 3, 6)
//!     .build(QuadratureDegrees::for_order(3))
//!     .unwrap();
//! assert_eq!(grid.n_cells(), 54);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod generation;
pub mod grid;
pub mod io;
pub mod locator;

pub use generation::{DiscGridGenerator, RectGridGenerator};
pub use grid::{CellFlags, EdgeIndex, ExteriorEdge, Grid, QuadratureDegrees, MAX_NEIGHBOURS};
pub use io::{load_grid, GmshLoader, GmshWriter};
pub use locator::PointLocator;
