// crates/zisa_physics/src/model/sanity.rs

//! 状态合理性检查

use rayon::prelude::*;

use super::all_variables::AllVariables;
use super::euler::is_plausible;

/// 状态合理性检查
pub trait SanityCheck: Send + Sync {
    /// 第一个不合理的单元，全部合理时为 `None`
    fn first_implausible(&self, u: &AllVariables) -> Option<usize>;

    /// 描述
    fn describe(&self) -> String;
}

/// 检查每个单元 `ρ > 0`、`E > 0` 且有限
#[derive(Debug, Clone, Copy, Default)]
pub struct EulerSanityCheck;

impl SanityCheck for EulerSanityCheck {
    fn first_implausible(&self, u: &AllVariables) -> Option<usize> {
        let bad = u
            .cvars
            .par_iter()
            .position_first(|ui| !is_plausible(ui))
            .or_else(|| {
                let n_avars = u.n_avars().max(1);
                u.avars.iter().position(|a| !a.is_finite()).map(|k| k / n_avars)
            });
        if let Some(i) = bad {
            tracing::error!("单元 {i} 状态不合理: {:?}", u.cvars[i].as_slice());
        }
        bad
    }

    fn describe(&self) -> String {
        "Euler plausibility check".into()
    }
}

/// 不做检查
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSanityCheck;

impl SanityCheck for NoSanityCheck {
    fn first_implausible(&self, _u: &AllVariables) -> Option<usize> {
        None
    }

    fn describe(&self) -> String {
        "no sanity check".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::variables::EulerVars;

    #[test]
    fn test_finds_first_bad_cell() {
        let mut u = AllVariables::zeros(5, 1);
        for ui in &mut u.cvars {
            *ui = EulerVars::new(1.0, 0.0, 0.0, 0.0, 1.0);
        }
        assert_eq!(EulerSanityCheck.first_implausible(&u), None);

        u.cvars[3][0] = -1.0;
        u.cvars[4][4] = f64::NAN;
        assert_eq!(EulerSanityCheck.first_implausible(&u), Some(3));
        assert_eq!(NoSanityCheck.first_implausible(&u), None);
    }

    #[test]
    fn test_bad_tracer() {
        let mut u = AllVariables::zeros(3, 2);
        for ui in &mut u.cvars {
            *ui = EulerVars::new(1.0, 0.0, 0.0, 0.0, 1.0);
        }
        u.avars[5] = f64::INFINITY;
        assert_eq!(EulerSanityCheck.first_implausible(&u), Some(2));
    }
}
