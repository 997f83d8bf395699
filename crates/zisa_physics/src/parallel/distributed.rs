// crates/zisa_physics/src/parallel/distributed.rs

//! 多线程分区运行
//!
//! 每个分区一个线程（`std::thread::scope`），各自运行一个时间循环。
//! 输出步上各分区把状态发给收集线程，收集线程凑齐所有分区后拼出
//! 全局状态并交给真正的输出。

use std::collections::BTreeMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use zisa_foundation::{ZisaError, ZisaResult};
use zisa_grid::Grid;

use super::all_reduce::{AllReduce, ThreadAllReduce};
use super::gather::{gather_all_variables, gather_owned, scatter_all_variables};
use super::halo::{ChannelHaloExchange, HaloExchange};
use super::local_grid::LocalGrid;
use super::partition::partition_cells;
use crate::model::AllVariables;
use crate::reconstruction::StencilFamily;
use crate::time_loop::{TimeLoop, TimeLoopSummary, Visualization};

/// 构造一个分区的时间循环所需的全部信息
pub struct PartContext<'a> {
    /// 分区编号
    pub part: usize,
    /// 分区个数
    pub n_parts: usize,
    /// 局部网格
    pub local_grid: &'a LocalGrid,
    /// 跨分区归约
    pub all_reduce: Arc<dyn AllReduce>,
    /// 光环交换
    pub halo_exchange: Arc<dyn HaloExchange>,
    /// 输出，把状态转交收集线程
    pub visualization: Box<dyn Visualization>,
}

/// 一个分区在输出步的状态
struct GatherMessage {
    part: usize,
    t: f64,
    k: usize,
    u: AllVariables,
}

/// 分区一侧的输出：把局部状态发给收集线程
struct GatherVisualization {
    part: usize,
    tx: Sender<GatherMessage>,
}

impl Visualization for GatherVisualization {
    fn plot(&mut self, u: &AllVariables, t: f64, k: usize) -> ZisaResult<()> {
        self.tx.send(GatherMessage {
            part: self.part,
            t,
            k,
            u: u.clone(),
        })?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("gather[part {}]", self.part)
    }
}

fn collect_frames(
    rx: Receiver<GatherMessage>,
    local_grids: &[LocalGrid],
    n_cells: usize,
    n_avars: usize,
    mut visualization: Box<dyn Visualization>,
) -> ZisaResult<()> {
    let n_parts = local_grids.len();
    let mut pending: BTreeMap<usize, (f64, AllVariables, usize)> = BTreeMap::new();

    for msg in rx {
        let entry = pending
            .entry(msg.k)
            .or_insert_with(|| (msg.t, AllVariables::zeros(n_cells, n_avars), 0));
        gather_owned(&mut entry.1, &local_grids[msg.part], &msg.u)?;
        entry.2 += 1;

        if entry.2 == n_parts {
            if let Some((t, u, _)) = pending.remove(&msg.k) {
                visualization.plot(&u, t, msg.k)?;
            }
        }
    }

    if !pending.is_empty() {
        tracing::warn!("{} 个输出步没有收齐所有分区", pending.len());
    }
    visualization.finalize()
}

/// 归约组解散或通道断开导致的错误，不是失败的根源
fn is_secondary(err: &ZisaError) -> bool {
    matches!(
        err,
        ZisaError::Runtime(_) | ZisaError::ChannelSendError | ZisaError::ChannelRecvError(_)
    )
}

fn pick_error(errors: Vec<ZisaError>) -> Option<ZisaError> {
    let primary = errors.iter().position(|e| !is_secondary(e));
    let mut errors = errors;
    match primary {
        Some(i) => Some(errors.swap_remove(i)),
        None => errors.into_iter().next(),
    }
}

/// 把 `u0` 分成 `n_parts` 个分区并行推进
///
/// `make_time_loop` 在各分区线程中调用，负责用 [`PartContext`] 组装时间循环。
/// 返回拼好的全局终态与 0 号分区的统计。
pub fn run_distributed<F>(
    grid: &Grid,
    families: &[StencilFamily],
    n_parts: usize,
    u0: &AllVariables,
    visualization: Box<dyn Visualization>,
    make_time_loop: F,
) -> ZisaResult<(AllVariables, TimeLoopSummary)>
where
    F: Fn(PartContext<'_>) -> ZisaResult<TimeLoop> + Sync,
{
    ZisaError::check_size("run_distributed.u0", grid.n_cells(), u0.n_cells())?;
    let partition = partition_cells(grid, families, n_parts)?;
    let local_grids = LocalGrid::extract_all(grid, &partition, families)?;
    let halo_exchanges = ChannelHaloExchange::network(&local_grids)?;
    let all_reduces = ThreadAllReduce::group(n_parts);

    tracing::info!(
        "分布式运行: {} 个分区, 光环单元共 {}",
        n_parts,
        local_grids.iter().map(LocalGrid::n_halo).sum::<usize>()
    );

    let (n_cells, n_avars) = (u0.n_cells(), u0.n_avars());
    let (tx, rx) = channel();

    let (collector_result, part_results) = std::thread::scope(|s| {
        let local_grids = &local_grids;
        let make_time_loop = &make_time_loop;

        let collector = s.spawn(move || collect_frames(rx, local_grids, n_cells, n_avars, visualization));

        let workers: Vec<_> = local_grids
            .iter()
            .zip(halo_exchanges)
            .zip(all_reduces)
            .map(|((lg, halo_exchange), all_reduce)| {
                let tx = tx.clone();
                s.spawn(move || -> ZisaResult<(AllVariables, TimeLoopSummary)> {
                    let ctx = PartContext {
                        part: lg.part,
                        n_parts,
                        local_grid: lg,
                        all_reduce: Arc::new(all_reduce),
                        halo_exchange: Arc::new(halo_exchange),
                        visualization: Box::new(GatherVisualization { part: lg.part, tx }),
                    };
                    let mut time_loop = make_time_loop(ctx)?;
                    time_loop.run(scatter_all_variables(u0, lg))
                })
            })
            .collect();
        drop(tx);

        let part_results: Vec<ZisaResult<(AllVariables, TimeLoopSummary)>> = workers
            .into_iter()
            .map(|w| {
                w.join()
                    .unwrap_or_else(|_| Err(ZisaError::internal("分区线程 panic")))
            })
            .collect();
        let collector_result = collector
            .join()
            .unwrap_or_else(|_| Err(ZisaError::internal("收集线程 panic")));
        (collector_result, part_results)
    });

    let mut errors = Vec::new();
    if let Err(e) = collector_result {
        errors.push(e);
    }
    let mut finished = Vec::with_capacity(n_parts);
    for (part, result) in part_results.into_iter().enumerate() {
        match result {
            Ok(r) => finished.push(r),
            Err(e) => {
                tracing::error!("分区 {part} 失败: {e}");
                errors.push(e);
            }
        }
    }
    if let Some(err) = pick_error(errors) {
        return Err(err);
    }

    let u = gather_all_variables(
        n_cells,
        n_avars,
        local_grids.iter().zip(finished.iter().map(|(u, _)| u)),
    )?;
    let summary = finished
        .first()
        .map(|(_, s)| *s)
        .ok_or_else(|| ZisaError::internal("没有分区结果"))?;
    Ok((u, summary))
}
