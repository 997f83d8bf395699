// crates/zisa_physics/src/parallel/local_grid.rs

//! 分区的局部网格
//!
//! 局部网格由本分区拥有的单元和光环单元组成：
//!
//! - 拥有的单元在前，按全局编号升序
//! - 光环单元在后，先按拥有者分区、再按全局编号排序
//!
//! 光环包含拥有单元的面邻居（通量需要两侧重构）以及这些单元模板覆盖的
//! 全部单元。拥有单元及其面邻居沿用全局模板，其余光环单元只做一阶重构。
//! 光环单元在局部网格中标记为幽灵单元，两个幽灵单元之间的边不计算通量。

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use zisa_foundation::{ZisaError, ZisaResult};
use zisa_grid::{CellFlags, Grid};

use super::halo::{Halo, HaloReceiveInfo, HaloRemoteInfo, HaloSendInfo};
use super::partition::PartitionedGrid;
use crate::reconstruction::StencilFamily;

/// 一个分区的局部网格
#[derive(Debug, Clone)]
pub struct LocalGrid {
    /// 分区编号
    pub part: usize,
    /// 局部网格
    pub grid: Arc<Grid>,
    /// 局部到全局编号
    pub local2global: Vec<usize>,
    /// 拥有的单元数
    pub n_owned: usize,
    /// 每个局部单元的拥有者
    pub owner: Vec<usize>,
    /// 局部编号的模板族
    pub stencil_families: Vec<StencilFamily>,
    /// 拥有的单元中在全局网格上是幽灵单元的（局部编号）
    pub physical_ghost_cells: Vec<usize>,
    /// 光环
    pub halo: Halo,
    /// 发往其他分区的单元
    pub send_info: Vec<HaloSendInfo>,
}

impl LocalGrid {
    /// 取出分区 `part` 的局部网格，`send_info` 留空
    pub fn extract(
        global: &Grid,
        partition: &PartitionedGrid,
        families: &[StencilFamily],
        part: usize,
    ) -> ZisaResult<Self> {
        ZisaError::check_size("local_grid.families", global.n_cells(), families.len())?;
        ZisaError::check_index("Part", part, partition.n_parts())?;

        let owned = partition.cells_of(part);
        let owned_set: BTreeSet<usize> = owned.iter().copied().collect();

        // 拥有单元与其面邻居使用完整模板
        let mut full: BTreeSet<usize> = owned_set.clone();
        for &i in owned {
            full.extend(global.neighbours[i].iter().flatten().copied());
        }

        let mut halo_set: BTreeSet<usize> = BTreeSet::new();
        for &i in &full {
            halo_set.extend(families[i].local2global().iter().copied());
        }
        halo_set.extend(full.iter().copied());
        let mut halo: Vec<usize> = halo_set.difference(&owned_set).copied().collect();
        halo.sort_by_key(|&g| (partition.part_of(g), g));

        let local2global: Vec<usize> = owned.iter().chain(halo.iter()).copied().collect();
        let global2local: HashMap<usize, usize> =
            local2global.iter().enumerate().map(|(l, &g)| (g, l)).collect();
        let owner: Vec<usize> = local2global.iter().map(|&g| partition.part_of(g)).collect();

        let mut grid = global.subgrid(&local2global)?;
        for flags in grid.cell_flags[owned.len()..].iter_mut() {
            *flags = CellFlags::GHOST;
        }
        let physical_ghost_cells: Vec<usize> = (0..owned.len())
            .filter(|&l| global.cell_flags[local2global[l]].ghost_cell)
            .collect();

        let stencil_families = local2global
            .iter()
            .enumerate()
            .map(|(l, &g)| {
                if full.contains(&g) {
                    families[g]
                        .remap(|j| global2local.get(&j).copied())
                        .ok_or_else(|| ZisaError::internal(format!("单元 {g} 的模板超出分区 {part} 的局部网格")))
                } else {
                    Ok(StencilFamily::single(l))
                }
            })
            .collect::<ZisaResult<Vec<_>>>()?;

        let mut remote_info: Vec<HaloRemoteInfo> = Vec::new();
        let mut local_info: Vec<HaloReceiveInfo> = Vec::new();
        for (offset, &g) in halo.iter().enumerate() {
            let p = partition.part_of(g);
            let l = owned.len() + offset;
            match remote_info.last_mut() {
                Some(r) if r.part == p => {
                    r.global.push(g);
                    if let Some(li) = local_info.last_mut() {
                        li.local.push(l);
                    }
                }
                _ => {
                    remote_info.push(HaloRemoteInfo { part: p, global: vec![g] });
                    local_info.push(HaloReceiveInfo { part: p, local: vec![l] });
                }
            }
        }

        tracing::debug!(
            "分区 {part}: {} 个拥有单元, {} 个光环单元, {} 个相邻分区",
            owned.len(),
            halo.len(),
            remote_info.len()
        );

        Ok(Self {
            part,
            grid: Arc::new(grid),
            local2global,
            n_owned: owned.len(),
            owner,
            stencil_families,
            physical_ghost_cells,
            halo: Halo {
                remote_info,
                local_info,
            },
            send_info: Vec::new(),
        })
    }

    /// 取出所有分区并补全发送信息
    pub fn extract_all(
        global: &Grid,
        partition: &PartitionedGrid,
        families: &[StencilFamily],
    ) -> ZisaResult<Vec<Self>> {
        let mut local_grids = (0..partition.n_parts())
            .map(|p| Self::extract(global, partition, families, p))
            .collect::<ZisaResult<Vec<_>>>()?;

        // 分区 q 向分区 p 请求的单元即 p 需要发给 q 的单元
        let mut sends: Vec<Vec<HaloSendInfo>> = vec![Vec::new(); local_grids.len()];
        for lg in &local_grids {
            for remote in &lg.halo.remote_info {
                let owner = &local_grids[remote.part];
                let local = remote
                    .global
                    .iter()
                    .map(|&g| owner.global2local_owned(g))
                    .collect::<ZisaResult<Vec<_>>>()?;
                sends[remote.part].push(HaloSendInfo { part: lg.part, local });
            }
        }
        for (lg, send_info) in local_grids.iter_mut().zip(sends) {
            lg.send_info = send_info;
        }
        Ok(local_grids)
    }

    fn global2local_owned(&self, g: usize) -> ZisaResult<usize> {
        self.local2global[..self.n_owned]
            .binary_search(&g)
            .map_err(|_| ZisaError::internal(format!("单元 {g} 不属于分区 {}", self.part)))
    }

    /// 局部单元总数
    pub fn n_cells(&self) -> usize {
        self.local2global.len()
    }

    /// 光环单元数
    pub fn n_halo(&self) -> usize {
        self.n_cells() - self.n_owned
    }

    /// 局部单元 `l` 是否为本分区拥有
    #[inline]
    pub fn is_owned(&self, l: usize) -> bool {
        l < self.n_owned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::partition::partition_cells;
    use crate::reconstruction::{compute_stencil_families, make_hybrid_weno_params};
    use zisa_grid::{QuadratureDegrees, RectGridGenerator};

    fn setup(n_parts: usize) -> (Grid, Vec<StencilFamily>, Vec<LocalGrid>) {
        let grid = RectGridGenerator::new(8, 8, 1.0, 1.0)
            .build(QuadratureDegrees::for_order(3))
            .unwrap();
        let params = make_hybrid_weno_params(3).unwrap();
        let families = compute_stencil_families(&grid, &params.stencil_family_params).unwrap();
        let pg = partition_cells(&grid, &families, n_parts).unwrap();
        let local_grids = LocalGrid::extract_all(&grid, &pg, &families).unwrap();
        (grid, families, local_grids)
    }

    #[test]
    fn test_owned_cells_cover_grid() {
        let (grid, _, local_grids) = setup(3);
        let mut owned: Vec<usize> = local_grids
            .iter()
            .flat_map(|lg| lg.local2global[..lg.n_owned].iter().copied())
            .collect();
        owned.sort_unstable();
        assert_eq!(owned, (0..grid.n_cells()).collect::<Vec<_>>());
    }

    #[test]
    fn test_local_geometry_and_stencils() {
        let (grid, families, local_grids) = setup(2);
        for lg in &local_grids {
            assert_eq!(lg.grid.n_cells(), lg.n_cells());
            for l in 0..lg.n_cells() {
                let g = lg.local2global[l];
                assert!((lg.grid.volumes[l] - grid.volumes[g]).abs() < 1e-15);
                assert_eq!(lg.grid.cell_flags[l].ghost_cell, !lg.is_owned(l));
            }
            for l in 0..lg.n_owned {
                let g = lg.local2global[l];
                let mapped: Vec<usize> = lg.stencil_families[l]
                    .local2global()
                    .iter()
                    .map(|&j| lg.local2global[j])
                    .collect();
                assert_eq!(mapped, families[g].local2global());
            }
        }
    }

    #[test]
    fn test_send_and_receive_match() {
        let (_, _, local_grids) = setup(4);
        for lg in &local_grids {
            for (remote, recv) in lg.halo.remote_info.iter().zip(&lg.halo.local_info) {
                assert_eq!(remote.part, recv.part);
                let owner = &local_grids[remote.part];
                let send = owner.send_info.iter().find(|s| s.part == lg.part).unwrap();
                let sent: Vec<usize> = send.local.iter().map(|&l| owner.local2global[l]).collect();
                assert_eq!(sent, remote.global);
                let received: Vec<usize> = recv.local.iter().map(|&l| lg.local2global[l]).collect();
                assert_eq!(received, remote.global);
            }
            assert_eq!(lg.halo.n_cells(), lg.n_halo());
        }
    }
}
