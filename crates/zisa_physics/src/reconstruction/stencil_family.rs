// crates/zisa_physics/src/reconstruction/stencil_family.rs

//! 单元的模板族
//!
//! 一个单元的所有模板共享一张 `local2global` 表，`l2g[0]` 为单元自身。
//! 单侧模板按出现顺序依次对应边 0、1、2。

use rayon::prelude::*;
use zisa_foundation::{ensure, ZisaError, ZisaResult};
use zisa_grid::{Grid, MAX_NEIGHBOURS};

use super::stencil::{Stencil, StencilBias, StencilFamilyParams};

/// 模板族
#[derive(Debug, Clone, PartialEq)]
pub struct StencilFamily {
    stencils: Vec<Stencil>,
    l2g: Vec<usize>,
}

impl StencilFamily {
    /// 为单元 `i` 构建模板族
    pub fn new(grid: &Grid, i: usize, params: &StencilFamilyParams) -> ZisaResult<Self> {
        let mut stencils = Vec::with_capacity(params.len());
        let mut k_biased = 0;
        for k in 0..params.len() {
            let p = params.params(k);
            let stencil = match p.bias {
                StencilBias::Central => Stencil::central(grid, i, p)?,
                StencilBias::OneSided => {
                    ensure!(
                        k_biased < MAX_NEIGHBOURS,
                        ZisaError::stencil(i, format!("单侧模板超过 {MAX_NEIGHBOURS} 个"))
                    );
                    let s = Stencil::biased(grid, i, k_biased, p)?;
                    k_biased += 1;
                    s
                }
            };
            stencils.push(stencil);
        }
        Ok(Self::from_stencils(i, stencils))
    }

    /// 只含一阶模板 `{i}`
    pub fn single(i: usize) -> Self {
        Self::from_stencils(i, vec![Stencil::single(i)])
    }

    /// 由已有模板组装，重新编排局部编号
    pub fn from_stencils(i: usize, mut stencils: Vec<Stencil>) -> Self {
        let mut l2g = vec![i];
        for s in stencils.iter_mut() {
            s.assign_local_indices(&mut l2g);
        }
        Self { stencils, l2g }
    }

    /// 把全局编号换成另一套编号；有单元无法映射时返回 `None`
    pub fn remap<F>(&self, map: F) -> Option<Self>
    where
        F: Fn(usize) -> Option<usize>,
    {
        let i = map(self.l2g[0])?;
        let stencils = self
            .stencils
            .iter()
            .map(|s| s.remap(&map))
            .collect::<Option<Vec<_>>>()?;
        Some(Self::from_stencils(i, stencils))
    }

    /// 模板个数
    pub fn len(&self) -> usize {
        self.stencils.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.stencils.is_empty()
    }

    /// 第 `k` 个模板
    pub fn stencil(&self, k: usize) -> &Stencil {
        &self.stencils[k]
    }

    /// 全部模板
    pub fn stencils(&self) -> &[Stencil] {
        &self.stencils
    }

    /// 局部到全局编号
    pub fn local2global(&self) -> &[usize] {
        &self.l2g
    }

    /// 模板覆盖的单元总数
    pub fn combined_stencil_size(&self) -> usize {
        self.l2g.len()
    }

    /// 模板族的阶数，即各模板阶数的最大值
    pub fn order(&self) -> usize {
        self.stencils.iter().map(Stencil::order).max().unwrap_or(1)
    }

    /// 最高阶中心模板的位置（没有中心模板时取最高阶模板）
    pub fn highest_order_central_stencil(&self) -> usize {
        let best = |central_only: bool| {
            let mut k_best: Option<usize> = None;
            for (k, s) in self.stencils.iter().enumerate() {
                if central_only && s.bias() != StencilBias::Central {
                    continue;
                }
                match k_best {
                    Some(kb) if self.stencils[kb].order() >= s.order() => {}
                    _ => k_best = Some(k),
                }
            }
            k_best
        };
        best(true).or_else(|| best(false)).unwrap_or(0)
    }
}

/// 为所有单元并行构建模板族
pub fn compute_stencil_families(grid: &Grid, params: &StencilFamilyParams) -> ZisaResult<Vec<StencilFamily>> {
    let families = (0..grid.n_cells())
        .into_par_iter()
        .map(|i| StencilFamily::new(grid, i, params))
        .collect::<ZisaResult<Vec<_>>>()?;

    let degenerate = families.iter().filter(|f| f.order() < params.max_order()).count();
    tracing::debug!(
        "模板族: {} 个单元, {} 个降阶, 平均覆盖 {:.1} 个单元",
        families.len(),
        degenerate,
        families.iter().map(|f| f.combined_stencil_size()).sum::<usize>() as f64 / families.len().max(1) as f64
    );
    Ok(families)
}
