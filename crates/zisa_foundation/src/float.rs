// crates/zisa_foundation/src/float.rs

//! 数值常量与浮点比较工具

// ============================================================================
// 数值常量
// ============================================================================

/// 浮点数相等性比较的默认容差
pub const DEFAULT_EPSILON: f64 = 1e-14;

/// 最小允许面积（判断退化三角形）
pub const MIN_AREA: f64 = 1e-14;

/// 径向重力方向的正则化参数，避免在原点除零
pub const RADIAL_EPSILON: f64 = 1e-50;

// ============================================================================
// 比较
// ============================================================================

/// 混合相对/绝对误差的近似相等
///
/// `|a - b| <= atol + rtol * max(|a|, |b|)`
#[inline]
pub fn almost_equal(a: f64, b: f64, atol: f64, rtol: f64) -> bool {
    (a - b).abs() <= atol + rtol * a.abs().max(b.abs())
}

/// 切片中所有值都是有限值
#[inline]
pub fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// 整数幂，`n` 较小时比 `powi` 更精确
#[inline]
pub fn ipow(x: f64, n: usize) -> f64 {
    let mut r = 1.0;
    for _ in 0..n {
        r *= x;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_almost_equal() {
        assert!(almost_equal(1.0, 1.0 + 1e-15, 0.0, 1e-14));
        assert!(!almost_equal(1.0, 1.1, 1e-3, 1e-3));
        assert!(almost_equal(0.0, 1e-16, 1e-15, 0.0));
    }

    #[test]
    fn test_all_finite() {
        assert!(all_finite(&[1.0, -2.0, 0.0]));
        assert!(!all_finite(&[1.0, f64::NAN]));
        assert!(!all_finite(&[f64::INFINITY]));
    }

    #[test]
    fn test_ipow() {
        assert_eq!(ipow(2.0, 0), 1.0);
        assert_eq!(ipow(2.0, 5), 32.0);
        assert_eq!(ipow(-0.5, 3), -0.125);
    }
}
