// apps/zisa_cli/src/commands/mod.rs

//! 子命令

pub mod grid;
pub mod info;
pub mod run;
pub mod validate;
