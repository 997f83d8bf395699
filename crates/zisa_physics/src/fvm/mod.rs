// crates/zisa_physics/src/fvm/mod.rs

//! 半离散有限体积算子
//!
//! 每个算子把自己的贡献累加到 `tendency`，时间积分器负责在每个阶段前清零。
//!
//! - [`flux_loop`]: 内部边数值通量
//! - [`gravity_source`]: 保平衡重力源项
//! - [`flux_bc`]: 外部边通量

pub mod flux_bc;
pub mod flux_loop;
pub mod gravity_source;

pub use flux_bc::{EquilibriumFluxBc, FluxBc, NoFluxBc};
pub use flux_loop::FluxLoop;
pub use gravity_source::GravitySourceLoop;

use std::sync::Arc;

use zisa_foundation::ZisaResult;

use crate::model::AllVariables;

/// 变化率算子 `du/dt = L(u, t)`
pub trait RateOfChange: Send + Sync {
    /// 算子名称
    fn name(&self) -> &str;

    /// 把 `L(u, t)` 累加到 `tendency`
    fn compute(&self, tendency: &mut AllVariables, u: &AllVariables, t: f64) -> ZisaResult<()>;

    /// 描述
    fn describe(&self) -> String {
        self.name().to_string()
    }
}

/// 把变化率清零
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroRateOfChange;

impl RateOfChange for ZeroRateOfChange {
    fn name(&self) -> &str {
        "zero"
    }

    fn compute(&self, tendency: &mut AllVariables, _u: &AllVariables, _t: f64) -> ZisaResult<()> {
        tendency.fill_zero();
        Ok(())
    }
}

/// 按顺序累加多个算子
///
/// 重力源项读取通量循环刚算出的重构，因此通量循环必须排在前面。
#[derive(Default, Clone)]
pub struct SumRatesOfChange {
    terms: Vec<Arc<dyn RateOfChange>>,
}

impl SumRatesOfChange {
    /// 创建
    pub fn new(terms: Vec<Arc<dyn RateOfChange>>) -> Self {
        Self { terms }
    }

    /// 追加一项
    pub fn push(&mut self, term: Arc<dyn RateOfChange>) {
        self.terms.push(term);
    }

    /// 项数
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl RateOfChange for SumRatesOfChange {
    fn name(&self) -> &str {
        "sum"
    }

    fn compute(&self, tendency: &mut AllVariables, u: &AllVariables, t: f64) -> ZisaResult<()> {
        for term in &self.terms {
            term.compute(tendency, u, t)?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.terms.iter().map(|t| t.describe()).collect();
        format!("sum[{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64);

    impl RateOfChange for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn compute(&self, tendency: &mut AllVariables, _u: &AllVariables, _t: f64) -> ZisaResult<()> {
            tendency.cvars.iter_mut().for_each(|c| c.add_scalar_mut(self.0));
            Ok(())
        }
    }

    #[test]
    fn test_sum_accumulates() {
        let u = AllVariables::zeros(3, 0);
        let mut tendency = u.zeros_like();
        let sum = SumRatesOfChange::new(vec![
            Arc::new(Constant(3.0)),
            Arc::new(ZeroRateOfChange),
            Arc::new(Constant(1.0)),
            Arc::new(Constant(0.5)),
        ]);
        sum.compute(&mut tendency, &u, 0.0).unwrap();
        assert!(tendency.cvars.iter().all(|c| c.iter().all(|&v| v == 1.5)));
        assert_eq!(sum.describe(), "sum[constant, zero, constant, constant]");
    }
}
