// crates/zisa_math/src/interpolation.rs

//! 一维分段线性插值

use serde::{Deserialize, Serialize};

use zisa_foundation::{ensure, ZisaError, ZisaResult};

/// 分段线性插值，区间外取端点值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearInterpolation {
    points: Vec<f64>,
    values: Vec<f64>,
}

impl LinearInterpolation {
    /// 从严格递增的节点和对应值创建
    pub fn new(points: Vec<f64>, values: Vec<f64>) -> ZisaResult<Self> {
        ZisaError::check_size("interpolation.values", points.len(), values.len())?;
        ensure!(points.len() >= 2, ZisaError::invalid_input("插值至少需要两个节点"));
        ensure!(
            points.windows(2).all(|w| w[0] < w[1]),
            ZisaError::invalid_input("插值节点必须严格递增")
        );
        Ok(Self { points, values })
    }

    /// 等距节点 `[x0, x1]`
    pub fn uniform(x0: f64, x1: f64, values: Vec<f64>) -> ZisaResult<Self> {
        let n = values.len();
        ensure!(n >= 2, ZisaError::invalid_input("插值至少需要两个节点"));
        let dx = (x1 - x0) / (n - 1) as f64;
        let points = (0..n).map(|i| x0 + i as f64 * dx).collect();
        Self::new(points, values)
    }

    /// 节点
    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// 节点值
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// `x` 所在区间的左端点索引
    fn interval(&self, x: f64) -> usize {
        let n = self.points.len();
        match self.points.partition_point(|&p| p <= x) {
            0 => 0,
            k if k >= n => n - 2,
            k => k - 1,
        }
    }

    /// 插值
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.points.len();
        if x <= self.points[0] {
            return self.values[0];
        }
        if x >= self.points[n - 1] {
            return self.values[n - 1];
        }
        let i = self.interval(x);
        let t = (x - self.points[i]) / (self.points[i + 1] - self.points[i]);
        (1.0 - t) * self.values[i] + t * self.values[i + 1]
    }

    /// 分段常数导数，区间外为零
    pub fn derivative(&self, x: f64) -> f64 {
        let n = self.points.len();
        if x < self.points[0] || x > self.points[n - 1] {
            return 0.0;
        }
        let i = self.interval(x);
        (self.values[i + 1] - self.values[i]) / (self.points[i + 1] - self.points[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_interpolation() {
        let f = LinearInterpolation::new(vec![0.0, 1.0, 3.0], vec![0.0, 2.0, 0.0]).unwrap();
        assert_eq!(f.eval(-1.0), 0.0);
        assert!((f.eval(0.5) - 1.0).abs() < 1e-14);
        assert!((f.eval(2.0) - 1.0).abs() < 1e-14);
        assert_eq!(f.eval(10.0), 0.0);
        assert!((f.derivative(0.5) - 2.0).abs() < 1e-14);
        assert!((f.derivative(2.5) + 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_rejects_unsorted_points() {
        assert!(LinearInterpolation::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(LinearInterpolation::new(vec![0.0], vec![1.0]).is_err());
        assert!(LinearInterpolation::new(vec![0.0, 1.0], vec![1.0]).is_err());
    }

    #[test]
    fn test_uniform() {
        let f = LinearInterpolation::uniform(0.0, 2.0, vec![1.0, 3.0, 5.0]).unwrap();
        assert!((f.eval(1.5) - 4.0).abs() < 1e-14);
    }
}
