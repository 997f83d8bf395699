// crates/zisa_grid/src/io/mod.rs

//! 网格 IO 模块
//!
//! - GMSH (.msh) 2.x / 4.x ASCII 读取，2.2 写出

pub mod gmsh;

pub use gmsh::{load_grid, GmshLoader, GmshMeshData, GmshWriter};
