// crates/zisa_physics/src/reconstruction/hybrid_weno.rs

//! WENO-AO 与 CWENO-AO 重构
//!
//! 每个模板先用最小二乘得到一个多项式，再按光滑度指示子做非线性加权：
//!
//! ```text
//! α_k = γ_k / (ε + IS_k^s),   p = Σ (α_k / Σα) p_k
//! ```
//!
//! `IS_k` 取各变量指示子的最大值。CWENO-AO 先把最高阶中心多项式换成
//! `p_0 = (p_high - Σ_{k≠high} γ_k p_k) / γ_high`，线性权重下即可恢复高阶多项式。
//!
//! # 参考文献
//!
//! Balsara, D. S., Garain, S., & Shu, C.-W. (2016). An efficient class of WENO
//! schemes with adaptive order. J. Comput. Phys., 326, 780-804.

use zisa_config::{ReconstructionConfig, ReconstructionMode};
use zisa_foundation::{ensure, ZisaError, ZisaResult};
use zisa_grid::Grid;
use zisa_math::{Poly2D, MAX_DOF};

use glam::DVec2;

use super::lsq::LsqSolver;
use super::stencil::StencilFamilyParams;
use super::stencil_family::StencilFamily;

// ============================================================================
// 参数
// ============================================================================

/// 混合 WENO 参数
#[derive(Debug, Clone, PartialEq)]
pub struct HybridWenoParams {
    /// 模板族
    pub stencil_family_params: StencilFamilyParams,
    /// 归一化的线性权重
    pub linear_weights: Vec<f64>,
    /// 光滑度指示子的正则化
    pub epsilon: f64,
    /// 光滑度指示子的指数
    pub exponent: f64,
}

impl HybridWenoParams {
    /// 创建，线性权重被归一化
    pub fn new(
        stencil_family_params: StencilFamilyParams,
        linear_weights: Vec<f64>,
        epsilon: f64,
        exponent: f64,
    ) -> ZisaResult<Self> {
        ZisaError::check_size(
            "hybrid_weno.linear_weights",
            stencil_family_params.len(),
            linear_weights.len(),
        )?;
        let total: f64 = linear_weights.iter().sum();
        ensure!(
            total > 0.0 && linear_weights.iter().all(|&w| w >= 0.0),
            ZisaError::invalid_input("线性权重必须非负且和为正")
        );
        Ok(Self {
            stencil_family_params,
            linear_weights: linear_weights.iter().map(|w| w / total).collect(),
            epsilon,
            exponent,
        })
    }

    /// 从配置创建
    pub fn from_config(config: &ReconstructionConfig) -> ZisaResult<Self> {
        let family = StencilFamilyParams::parse(&config.orders, &config.biases, &config.overfit_factors)?;
        Self::new(
            family,
            config.linear_weights.clone(),
            config.smoothness_indicator.epsilon,
            config.smoothness_indicator.exponent,
        )
    }
}

/// `order` 阶格式的默认参数
pub fn make_hybrid_weno_params(order: usize) -> ZisaResult<HybridWenoParams> {
    HybridWenoParams::from_config(&ReconstructionConfig::for_order(order))
}

// ============================================================================
// 重构
// ============================================================================

/// 单元上的混合 WENO 重构
#[derive(Debug, Clone)]
pub struct HybridWeno {
    mode: ReconstructionMode,
    family: StencilFamily,
    solvers: Vec<LsqSolver>,
    linear_weights: Vec<f64>,
    epsilon: f64,
    exponent: f64,
    k_high: usize,
    moments: [f64; MAX_DOF],
    x_center: DVec2,
    length: f64,
}

impl HybridWeno {
    /// 为单元 `family.local2global()[0]` 创建
    pub fn new(
        grid: &Grid,
        family: StencilFamily,
        params: &HybridWenoParams,
        mode: ReconstructionMode,
    ) -> ZisaResult<Self> {
        let i = family.local2global()[0];
        let solvers = family
            .stencils()
            .iter()
            .map(|s| LsqSolver::new(grid, s))
            .collect::<ZisaResult<Vec<_>>>()?;

        // 局部网格上退化的模板族只保留一个模板
        let linear_weights = if family.len() == params.linear_weights.len() {
            params.linear_weights.clone()
        } else {
            vec![1.0 / family.len() as f64; family.len()]
        };

        Ok(Self {
            mode,
            k_high: family.highest_order_central_stencil(),
            family,
            solvers,
            linear_weights,
            epsilon: params.epsilon,
            exponent: params.exponent,
            moments: grid.normalized_moments[i],
            x_center: grid.cell_centers[i],
            length: grid.characteristic_length(i),
        })
    }

    /// 模板族
    pub fn stencil_family(&self) -> &StencilFamily {
        &self.family
    }

    /// 局部到全局编号
    pub fn local2global(&self) -> &[usize] {
        self.family.local2global()
    }

    /// 方法
    pub fn mode(&self) -> ReconstructionMode {
        self.mode
    }

    /// 重构，`qbar[l]` 为局部编号 `l` 的单元平均
    pub fn reconstruct<const N: usize>(&self, qbar: &[[f64; N]]) -> Poly2D<N> {
        let mut polys = self.compute_polys(qbar);
        if self.mode == ReconstructionMode::CwenoAo {
            self.cweno_high_order(&mut polys);
        }
        self.hybridize(&polys)
    }

    /// 各模板的多项式
    pub fn compute_polys<const N: usize>(&self, qbar: &[[f64; N]]) -> Vec<Poly2D<N>> {
        let q0 = qbar[0];
        self.family
            .stencils()
            .iter()
            .zip(&self.solvers)
            .map(|(stencil, solver)| {
                let rhs: Vec<[f64; N]> = stencil.local()[1..]
                    .iter()
                    .map(|&l| {
                        let mut r = qbar[l];
                        for (rk, q0k) in r.iter_mut().zip(&q0) {
                            *rk -= q0k;
                        }
                        r
                    })
                    .collect();
                let mut p = solver.solve(&rhs);
                *p.a_mut(0) = q0;
                p
            })
            .collect()
    }

    fn cweno_high_order<const N: usize>(&self, polys: &mut [Poly2D<N>]) {
        let k_high = self.k_high;
        let mut p0 = polys[k_high];
        for (k, p) in polys.iter().enumerate() {
            if k != k_high {
                let mut scaled = *p;
                scaled *= self.linear_weights[k];
                p0 -= &scaled;
            }
        }
        p0 *= 1.0 / self.linear_weights[k_high];
        polys[k_high] = p0;
    }

    fn hybridize<const N: usize>(&self, polys: &[Poly2D<N>]) -> Poly2D<N> {
        let alpha: Vec<f64> = polys
            .iter()
            .zip(&self.linear_weights)
            .map(|(p, gamma)| {
                let is = p.smoothness_indicator().into_iter().fold(0.0, f64::max);
                gamma / (self.epsilon + is.powf(self.exponent))
            })
            .collect();
        let total: f64 = alpha.iter().sum();

        let mut result = Poly2D::zeros(0, self.moments, self.x_center, self.length);
        for (p, a) in polys.iter().zip(&alpha) {
            let mut scaled = *p;
            scaled *= a / total;
            result += &scaled;
        }
        result
    }
}
