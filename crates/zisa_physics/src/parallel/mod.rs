// crates/zisa_physics/src/parallel/mod.rs

//! 分区并行
//!
//! 网格被分成若干分区，每个分区在自己的线程中推进局部网格，
//! 通过光环交换和全局归约保持与串行计算一致。
//!
//! - [`all_reduce`]: 跨分区归约（CFL 最小值、合理性检查）
//! - [`partition`]: 递归坐标二分
//! - [`local_grid`]: 局部网格与光环描述
//! - [`halo`]: 光环交换
//! - [`gather`]: 全局状态的分发与收集
//! - [`distributed`]: 多线程运行

pub mod all_reduce;
pub mod distributed;
pub mod gather;
pub mod halo;
pub mod local_grid;
pub mod partition;

pub use all_reduce::{AllReduce, NoAllReduce, ReduceOp, ThreadAllReduce};
pub use distributed::{run_distributed, PartContext};
pub use gather::{gather_all_variables, gather_owned, scatter_all_variables};
pub use halo::{
    ChannelHaloExchange, Halo, HaloExchange, HaloReceiveInfo, HaloRemoteInfo, HaloSendInfo, NoHaloExchange,
};
pub use local_grid::LocalGrid;
pub use partition::{partition_cells, recursive_coordinate_bisection, PartitionedGrid};
