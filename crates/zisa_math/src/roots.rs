// crates/zisa_math/src/roots.rs

//! 非线性方程求根
//!
//! - [`newton`]: 标量 Newton 迭代
//! - [`brent`]: 带括号区间的 Brent 方法
//! - [`quasi_newton`]: 二维拟 Newton 迭代，配合 [`RollingConvergenceRate`]
//!   检测发散，用于局部平衡态求解

use glam::DVec2;

use zisa_foundation::{ZisaError, ZisaResult};

/// 标量 Newton 迭代
///
/// `f_df` 同时返回函数值与导数。
pub fn newton<F>(f_df: F, x_guess: f64, atol: f64, max_iter: usize) -> ZisaResult<f64>
where
    F: Fn(f64) -> (f64, f64),
{
    let mut x = x_guess;
    let mut fx = f64::INFINITY;
    for _ in 0..max_iter {
        let (f, df) = f_df(x);
        fx = f;
        if fx.abs() < atol {
            return Ok(x);
        }
        x -= fx / df;
    }

    if fx.abs() < 1000.0 * atol {
        Ok(x)
    } else {
        Err(ZisaError::not_converged("newton", max_iter, fx.abs()))
    }
}

/// Brent 方法，要求 `f(a) f(b) < 0`
pub fn brent<F>(f: F, a: f64, b: f64, atol: f64, max_iter: usize) -> ZisaResult<f64>
where
    F: Fn(f64) -> f64,
{
    let (mut a, mut b) = (a, b);
    let (mut fa, mut fb) = (f(a), f(b));
    if fa * fb > 0.0 {
        return Err(ZisaError::invalid_input(format!(
            "不是有效的括号区间: ({a:e}, {fa:e}), ({b:e}, {fb:e})"
        )));
    }
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }

    if fa.abs() < fb.abs() {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = a;
    let mut used_bisection = true;

    for _ in 0..max_iter {
        if fb.abs() <= atol || (b - a).abs() <= atol {
            return Ok(b);
        }

        let mut s = if fa != fc && fb != fc {
            // 逆二次插值
            a * fb * fc / ((fa - fb) * (fa - fc))
                + b * fa * fc / ((fb - fa) * (fb - fc))
                + c * fa * fb / ((fc - fa) * (fc - fb))
        } else {
            // 割线
            b - fb * (b - a) / (fb - fa)
        };

        let lo = 0.25 * (3.0 * a + b);
        let outside = if lo < b { s < lo || s > b } else { s < b || s > lo };
        let delta = 2.0 * f64::EPSILON * b.abs();
        if outside
            || (used_bisection && (s - b).abs() >= 0.5 * (b - c).abs())
            || (!used_bisection && (s - b).abs() >= 0.5 * (c - d).abs())
            || (used_bisection && (b - c).abs() < delta)
            || (!used_bisection && (c - d).abs() < delta)
        {
            s = 0.5 * (a + b);
            used_bisection = true;
        } else {
            used_bisection = false;
        }

        let fs = f(s);
        d = c;
        c = b;
        fc = fb;

        if fa * fs < 0.0 {
            b = s;
            fb = fs;
        } else {
            a = s;
            fa = fs;
        }

        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }
    }

    Err(ZisaError::not_converged("brent", max_iter, fb.abs()))
}

// ============================================================================
// 拟 Newton
// ============================================================================

/// 滚动收敛率
///
/// 保存最近若干次迭代增量，估计收敛阶
/// `log(|dx_{k+1}| / |dx_k|) / log(|dx_k| / |dx_{k-1}|)`。
#[derive(Debug, Clone)]
pub struct RollingConvergenceRate {
    atol: DVec2,
    values: [DVec2; Self::MAX_VALUES],
    i_end: usize,
    n_values: usize,
}

impl RollingConvergenceRate {
    const MAX_VALUES: usize = 8;

    /// 创建
    pub fn new(atol: DVec2) -> Self {
        Self {
            atol,
            values: [DVec2::ZERO; Self::MAX_VALUES],
            i_end: 0,
            n_values: 0,
        }
    }

    fn index(i: isize) -> usize {
        i.rem_euclid(Self::MAX_VALUES as isize) as usize
    }

    /// 记录一次迭代增量
    pub fn push(&mut self, dx: DVec2) {
        self.values[self.i_end] = dx;
        self.i_end = Self::index(self.i_end as isize + 1);
        self.n_values += 1;
    }

    /// 已记录的次数
    pub fn len(&self) -> usize {
        self.n_values
    }

    /// 是否尚无记录
    pub fn is_empty(&self) -> bool {
        self.n_values == 0
    }

    /// 估计的收敛率是否不低于 `expected_rate`
    pub fn is_converging(&self, expected_rate: f64) -> bool {
        let end = self.i_end as isize;
        let last = self.values[Self::index(end - 1)];
        if last.abs().cmple(self.atol).all() {
            return true;
        }
        if self.n_values < 3 {
            return true;
        }

        let a = self.values[Self::index(end - 3)].abs();
        let b = self.values[Self::index(end - 2)].abs();
        let c = last.abs();
        let rate = |a: f64, b: f64, c: f64| (c / b).ln() / (b / a).ln();
        rate(a.x, b.x, c.x) >= expected_rate && rate(a.y, b.y, c.y) >= expected_rate
    }
}

/// 二维拟 Newton 迭代
///
/// `inv_df(x, fx)` 返回 `J(x)^{-1} f(x)`。收敛判据为 `|dx| <= atol`
/// 按分量成立。返回 `(x, converged)`；不收敛时返回初值。
pub fn quasi_newton<F, G>(f: F, inv_df: G, x0: DVec2, atol: DVec2, max_iter: usize) -> (DVec2, bool)
where
    F: Fn(DVec2) -> DVec2,
    G: Fn(DVec2, DVec2) -> DVec2,
{
    let mut x = x0;
    let mut fx = f(x0);
    let mut dx = atol + DVec2::ONE;
    let is_converged = |dx: DVec2, factor: f64| dx.abs().cmple(factor * atol).all();

    let mut rate = RollingConvergenceRate::new(atol);
    let mut iter = 0;
    while !is_converged(dx, 1.0) && iter < max_iter {
        dx = inv_df(x, fx);
        x -= dx;
        rate.push(dx);

        if iter >= 4 && !rate.is_converging(0.0) {
            tracing::debug!("拟 Newton 迭代不收敛: x = {x:?}, dx = {dx:?}, f(x) = {fx:?}");
            return (x0, false);
        }

        fx = f(x);
        iter += 1;
    }

    if !x.is_finite() || (iter == max_iter && !is_converged(dx, 1000.0)) {
        tracing::debug!("拟 Newton 迭代达到最大次数: dx = {dx:?}");
        return (x0, false);
    }

    (x, true)
}

/// 中心差分 Jacobian 的逆作用于 `fx`
///
/// 第 `k` 列以步长 `1e-6 |x_k|` 计算。
pub fn finite_difference_inverse<F>(f: &F, x: DVec2, fx: DVec2) -> DVec2
where
    F: Fn(DVec2) -> DVec2,
{
    let column = |k: usize| {
        let eps = 1e-6 * x[k].abs().max(f64::MIN_POSITIVE);
        let mut e = DVec2::ZERO;
        e[k] = 0.5 * eps;
        (f(x + e) - f(x - e)) / eps
    };
    let df0 = column(0);
    let df1 = column(1);

    let inv_det = 1.0 / (df0.x * df1.y - df0.y * df1.x);
    DVec2::new(
        inv_det * (df1.y * fx.x - df1.x * fx.y),
        inv_det * (-df0.y * fx.x + df0.x * fx.y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newton_sqrt2() {
        let x = newton(|x| (x * x - 2.0, 2.0 * x), 1.0, 1e-14, 50).unwrap();
        assert!((x - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_brent_cubic() {
        let f = |x: f64| (x + 3.0) * (x - 1.0) * (x - 1.0);
        let x = brent(f, -4.0, 4.0 / 3.0, 1e-12, 100).unwrap();
        assert!((x + 3.0).abs() < 1e-8);
    }

    #[test]
    fn test_brent_rejects_non_bracket() {
        assert!(brent(|x| x * x + 1.0, -1.0, 1.0, 1e-12, 10).is_err());
    }

    #[test]
    fn test_quasi_newton_linear_system() {
        let f = |x: DVec2| DVec2::new(2.0 * x.x + x.y - 3.0, x.x - x.y);
        let inv_df = |x: DVec2, fx: DVec2| finite_difference_inverse(&f, x, fx);
        let (x, converged) = quasi_newton(f, inv_df, DVec2::new(5.0, -2.0), DVec2::splat(1e-12), 20);
        assert!(converged);
        assert!((x - DVec2::ONE).length() < 1e-10);
    }

    #[test]
    fn test_quasi_newton_nonlinear() {
        // x^2 + y^2 = 4, x y = 1
        let f = |x: DVec2| DVec2::new(x.x * x.x + x.y * x.y - 4.0, x.x * x.y - 1.0);
        let inv_df = |x: DVec2, fx: DVec2| finite_difference_inverse(&f, x, fx);
        let (x, converged) = quasi_newton(f, inv_df, DVec2::new(2.0, 0.5), DVec2::splat(1e-10), 30);
        assert!(converged);
        assert!(f(x).length() < 1e-9);
    }

    #[test]
    fn test_rolling_convergence_rate() {
        let mut rate = RollingConvergenceRate::new(DVec2::splat(1e-14));
        for k in 1..=3 {
            rate.push(DVec2::splat(10f64.powi(-(1 << k))));
        }
        assert!(rate.is_converging(1.5));

        let mut diverging = RollingConvergenceRate::new(DVec2::splat(1e-14));
        for k in [1.0, 0.5, 0.1, 1.0] {
            diverging.push(DVec2::splat(k));
        }
        assert!(!diverging.is_converging(0.0));
    }
}
