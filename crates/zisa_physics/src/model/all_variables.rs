// crates/zisa_physics/src/model/all_variables.rs

//! 全部单元的守恒量与被动标量
//!
//! `cvars` 每个单元一个 [`EulerVars`]；`avars` 为行主序的
//! `n_cells × n_avars` 被动标量（示踪物质量密度）。

use rayon::prelude::*;
use zisa_foundation::{ZisaError, ZisaResult};

use super::variables::{EulerVars, N_CVARS};

/// 全部变量
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AllVariables {
    /// 守恒量
    pub cvars: Vec<EulerVars>,
    /// 被动标量，行主序
    pub avars: Vec<f64>,
    n_avars: usize,
}

impl AllVariables {
    /// 全零
    pub fn zeros(n_cells: usize, n_avars: usize) -> Self {
        Self {
            cvars: vec![EulerVars::zeros(); n_cells],
            avars: vec![0.0; n_cells * n_avars],
            n_avars,
        }
    }

    /// 由守恒量与被动标量创建
    pub fn new(cvars: Vec<EulerVars>, avars: Vec<f64>, n_avars: usize) -> ZisaResult<Self> {
        ZisaError::check_size("avars", cvars.len() * n_avars, avars.len())?;
        Ok(Self { cvars, avars, n_avars })
    }

    /// 同形状的零变量
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.n_cells(), self.n_avars)
    }

    /// 单元数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.cvars.len()
    }

    /// 每个单元的被动标量数
    #[inline]
    pub fn n_avars(&self) -> usize {
        self.n_avars
    }

    /// 每个单元的变量总数
    #[inline]
    pub fn n_vars(&self) -> usize {
        N_CVARS + self.n_avars
    }

    /// 单元 `i` 的被动标量
    #[inline]
    pub fn avars_of(&self, i: usize) -> &[f64] {
        &self.avars[i * self.n_avars..(i + 1) * self.n_avars]
    }

    /// 单元 `i` 的被动标量（可变）
    #[inline]
    pub fn avars_of_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.avars[i * self.n_avars..(i + 1) * self.n_avars]
    }

    /// 置零
    pub fn fill_zero(&mut self) {
        self.cvars.par_iter_mut().for_each(|u| u.fill(0.0));
        self.avars.iter_mut().for_each(|a| *a = 0.0);
    }

    /// 复制另一个同形状变量
    pub fn copy_from(&mut self, other: &AllVariables) -> ZisaResult<()> {
        self.check_shape(other)?;
        self.cvars.copy_from_slice(&other.cvars);
        self.avars.copy_from_slice(&other.avars);
        Ok(())
    }

    /// `self += alpha * x`
    pub fn axpy(&mut self, alpha: f64, x: &AllVariables) -> ZisaResult<()> {
        self.check_shape(x)?;
        self.cvars
            .par_iter_mut()
            .zip(x.cvars.par_iter())
            .for_each(|(u, v)| *u += v * alpha);
        self.avars
            .par_iter_mut()
            .zip(x.avars.par_iter())
            .for_each(|(a, b)| *a += alpha * b);
        Ok(())
    }

    /// `self *= alpha`
    pub fn scale(&mut self, alpha: f64) {
        self.cvars.par_iter_mut().for_each(|u| *u *= alpha);
        self.avars.par_iter_mut().for_each(|a| *a *= alpha);
    }

    /// 所有值有限
    pub fn is_finite(&self) -> bool {
        self.cvars.par_iter().all(|u| u.iter().all(|v| v.is_finite()))
            && self.avars.par_iter().all(|a| a.is_finite())
    }

    /// 最大绝对差
    pub fn max_abs_difference(&self, other: &AllVariables) -> ZisaResult<f64> {
        self.check_shape(other)?;
        let dc = self
            .cvars
            .par_iter()
            .zip(other.cvars.par_iter())
            .map(|(u, v)| (u - v).amax())
            .reduce(|| 0.0, f64::max);
        let da = self
            .avars
            .iter()
            .zip(&other.avars)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        Ok(dc.max(da))
    }

    /// 逐项满足 `|a - b| <= atol`
    pub fn approx_eq(&self, other: &AllVariables, atol: f64) -> bool {
        self.max_abs_difference(other).map_or(false, |d| d <= atol)
    }

    fn check_shape(&self, other: &AllVariables) -> ZisaResult<()> {
        ZisaError::check_size("AllVariables.n_cells", self.n_cells(), other.n_cells())?;
        ZisaError::check_size("AllVariables.n_avars", self.n_avars, other.n_avars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axpy_and_scale() {
        let mut u = AllVariables::zeros(3, 2);
        let mut x = u.zeros_like();
        x.cvars[1] = EulerVars::new(1.0, 2.0, 3.0, 0.0, 4.0);
        x.avars_of_mut(2).copy_from_slice(&[5.0, 6.0]);

        u.axpy(2.0, &x).unwrap();
        assert_eq!(u.cvars[1], EulerVars::new(2.0, 4.0, 6.0, 0.0, 8.0));
        assert_eq!(u.avars_of(2), &[10.0, 12.0]);

        u.scale(0.5);
        assert!(u.approx_eq(&x, 0.0));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut u = AllVariables::zeros(3, 0);
        let x = AllVariables::zeros(4, 0);
        assert!(u.axpy(1.0, &x).is_err());
        assert!(!u.approx_eq(&x, 1.0));
        assert!(AllVariables::new(vec![EulerVars::zeros(); 2], vec![0.0; 3], 1).is_err());
    }

    #[test]
    fn test_max_abs_difference() {
        let u = AllVariables::zeros(2, 1);
        let mut v = u.clone();
        v.cvars[0][4] = -0.5;
        v.avars[1] = 0.25;
        assert_eq!(u.max_abs_difference(&v).unwrap(), 0.5);
        assert!(v.is_finite());
    }
}
