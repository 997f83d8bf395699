// crates/zisa_physics/src/parallel/partition.rs

//! 区域分解
//!
//! 对单元中心做递归坐标二分（RCB）：每次沿包围盒较长的方向排序，
//! 按子分区个数的比例切开，得到单元数均衡的 `n_parts` 个分区。

use glam::DVec2;
use zisa_foundation::{ensure, ZisaError, ZisaResult};
use zisa_grid::Grid;

use crate::reconstruction::StencilFamily;

/// 分区后的网格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionedGrid {
    /// `partition[i]` 为单元 `i` 所属分区
    pub partition: Vec<usize>,
    /// 分区 `p` 的单元为 `permutation[boundaries[p]..boundaries[p+1]]`
    pub boundaries: Vec<usize>,
    /// 按分区排序的单元，分区内按全局编号升序
    pub permutation: Vec<usize>,
}

impl PartitionedGrid {
    /// 由每个单元的分区编号构造
    pub fn new(partition: Vec<usize>, n_parts: usize) -> ZisaResult<Self> {
        let mut counts = vec![0usize; n_parts];
        for &p in &partition {
            ZisaError::check_index("Part", p, n_parts)?;
            counts[p] += 1;
        }

        let mut boundaries = Vec::with_capacity(n_parts + 1);
        boundaries.push(0);
        for c in &counts {
            boundaries.push(boundaries[boundaries.len() - 1] + c);
        }

        let mut permutation: Vec<usize> = (0..partition.len()).collect();
        permutation.sort_by_key(|&i| partition[i]);

        Ok(Self {
            partition,
            boundaries,
            permutation,
        })
    }

    /// 分区数
    pub fn n_parts(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// 分区 `p` 的单元，全局编号升序
    pub fn cells_of(&self, p: usize) -> &[usize] {
        &self.permutation[self.boundaries[p]..self.boundaries[p + 1]]
    }

    /// 单元 `i` 所属分区
    #[inline]
    pub fn part_of(&self, i: usize) -> usize {
        self.partition[i]
    }
}

fn bisect(points: &[DVec2], cells: &mut [usize], first_part: usize, n_parts: usize, partition: &mut [usize]) {
    if n_parts == 1 {
        for &i in cells.iter() {
            partition[i] = first_part;
        }
        return;
    }

    let (lo, hi) = cells.iter().fold(
        (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
        |(lo, hi), &i| (lo.min(points[i]), hi.max(points[i])),
    );
    let extent = hi - lo;
    let axis = if extent.x >= extent.y { 0 } else { 1 };
    cells.sort_by(|&a, &b| points[a][axis].total_cmp(&points[b][axis]).then(a.cmp(&b)));

    let n_lo = n_parts / 2;
    let split = cells.len() * n_lo / n_parts;
    let (left, right) = cells.split_at_mut(split);
    bisect(points, left, first_part, n_lo, partition);
    bisect(points, right, first_part + n_lo, n_parts - n_lo, partition);
}

/// 点集的递归坐标二分
pub fn recursive_coordinate_bisection(points: &[DVec2], n_parts: usize) -> Vec<usize> {
    let mut partition = vec![0; points.len()];
    if n_parts > 1 {
        let mut cells: Vec<usize> = (0..points.len()).collect();
        bisect(points, &mut cells, 0, n_parts, &mut partition);
    }
    partition
}

/// 把网格单元分成 `n_parts` 个分区
///
/// `families` 只用于统计每个分区的光环大小。
pub fn partition_cells(grid: &Grid, families: &[StencilFamily], n_parts: usize) -> ZisaResult<PartitionedGrid> {
    ZisaError::check_size("partition.families", grid.n_cells(), families.len())?;
    ensure!(
        n_parts >= 1 && n_parts <= grid.n_cells(),
        ZisaError::invalid_input(format!("分区数 {n_parts} 不在 1..={} 内", grid.n_cells()))
    );

    let partition = recursive_coordinate_bisection(&grid.cell_centers, n_parts);
    let pg = PartitionedGrid::new(partition, n_parts)?;

    for p in 0..n_parts {
        let n_remote: usize = pg
            .cells_of(p)
            .iter()
            .flat_map(|&i| families[i].local2global().iter())
            .filter(|&&j| pg.part_of(j) != p)
            .count();
        tracing::debug!("分区 {p}: {} 个单元, 模板引用 {n_remote} 次远程单元", pg.cells_of(p).len());
    }
    Ok(pg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zisa_grid::{QuadratureDegrees, RectGridGenerator};

    #[test]
    fn test_balanced_parts() {
        let grid = RectGridGenerator::new(6, 6, 1.0, 1.0)
            .build(QuadratureDegrees::default())
            .unwrap();
        let families: Vec<StencilFamily> = (0..grid.n_cells()).map(StencilFamily::single).collect();
        for n_parts in [1, 2, 3, 4, 7] {
            let pg = partition_cells(&grid, &families, n_parts).unwrap();
            assert_eq!(pg.n_parts(), n_parts);
            assert_eq!(*pg.boundaries.last().unwrap(), grid.n_cells());

            let sizes: Vec<usize> = (0..n_parts).map(|p| pg.cells_of(p).len()).collect();
            let (min, max) = (sizes.iter().min().unwrap(), sizes.iter().max().unwrap());
            assert!(max - min <= 2, "{sizes:?}");

            for p in 0..n_parts {
                assert!(pg.cells_of(p).windows(2).all(|w| w[0] < w[1]));
                assert!(pg.cells_of(p).iter().all(|&i| pg.part_of(i) == p));
            }
        }
    }

    #[test]
    fn test_two_parts_split_longer_axis() {
        let points: Vec<DVec2> = (0..8).map(|i| DVec2::new(i as f64, 0.1 * (i % 2) as f64)).collect();
        let partition = recursive_coordinate_bisection(&points, 2);
        assert_eq!(partition, vec![0, 0, 0, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn test_invalid_number_of_parts() {
        let grid = RectGridGenerator::new(1, 1, 1.0, 1.0)
            .build(QuadratureDegrees::default())
            .unwrap();
        let families: Vec<StencilFamily> = (0..grid.n_cells()).map(StencilFamily::single).collect();
        assert!(partition_cells(&grid, &families, 0).is_err());
        assert!(partition_cells(&grid, &families, grid.n_cells() + 1).is_err());
    }
}
