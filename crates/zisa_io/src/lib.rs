// crates/zisa_io/src/lib.rs

//! ZisaFVM 输入输出
//!
//! # 模块
//!
//! - [`file_name`]: 连续编号的输出文件名
//! - [`snapshot`]: 二进制状态快照（重启、稳态）
//! - [`vtu`]: VTU 导出与 PVD 集合
//! - [`writers`]: 时间循环的输出实现
//! - [`progress`]: 进度报告
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use zisa_io::{make_visualization, FileNameGenerator, Snapshot};
//!
//! let fng = FileNameGenerator::from_config(&config.io)?;
//! let viz = make_visualization(config.io.mode, fng, grid, euler);
//! let restart = Snapshot::load(Path::new("out/polytrope-0004.zsnp"))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod file_name;
pub mod progress;
pub mod snapshot;
pub mod vtu;
pub mod writers;

pub use file_name::FileNameGenerator;
pub use progress::ProgressReporter;
pub use snapshot::{save_state, Snapshot, SnapshotError, SnapshotHeader, SnapshotResult};
pub use vtu::{PvdCollection, VtuError, VtuExporter};
pub use writers::{make_visualization, SnapshotWriter, VtuWriter};
