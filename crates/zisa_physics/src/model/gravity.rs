// crates/zisa_physics/src/model/gravity.rs

//! 重力势
//!
//! 势函数写成 `phi(x) = base.phi(chi(x))`，其中 `chi` 由坐标方向
//! [`GravityAlignment`] 给出（径向距离或某一坐标分量），
//! 梯度为 `base.dphi(chi) * alignment.dchi(x)`。

use glam::DVec2;
use zisa_config::{AlignmentConfig, GravityConfig, GravityKind};
use zisa_foundation::float::RADIAL_EPSILON;
use zisa_foundation::ZisaResult;
use zisa_math::LinearInterpolation;

/// 一维势函数
#[derive(Debug, Clone, PartialEq)]
pub enum GravityBase {
    /// `phi = g chi`
    Constant {
        /// 重力加速度
        g: f64,
    },
    /// `phi = -GM / (X + chi)`
    PointMass {
        /// 引力常数乘质量
        gm: f64,
        /// 偏移 `X`
        offset: f64,
    },
    /// 多方指数 1 的自引力多方球
    Polytrope {
        /// 中心密度
        rho_center: f64,
        /// 多方常数
        k: f64,
        /// `α = sqrt(2πG/K)`
        alpha: f64,
        /// 避免 `chi = 0` 处 0/0 的偏移
        eps: f64,
    },
    /// 表格插值的径向势
    RadialTable {
        /// 势
        phi: LinearInterpolation,
        /// 节点上中心差分的导数
        dphi: LinearInterpolation,
    },
    /// 无重力
    None,
}

impl GravityBase {
    /// 多方球势
    pub fn polytrope(rho_center: f64, k: f64, g: f64) -> Self {
        Self::Polytrope {
            rho_center,
            k,
            alpha: (2.0 * std::f64::consts::PI * g / k).sqrt(),
            eps: f64::MIN_POSITIVE,
        }
    }

    /// 由表格创建径向势
    pub fn radial_table(points: Vec<f64>, phi: Vec<f64>) -> ZisaResult<Self> {
        let n = points.len();
        let mut dphi = vec![0.0; n];
        if n >= 2 {
            dphi[0] = (phi[1] - phi[0]) / (points[1] - points[0]);
            dphi[n - 1] = (phi[n - 1] - phi[n - 2]) / (points[n - 1] - points[n - 2]);
            for i in 1..n - 1 {
                dphi[i] = (phi[i + 1] - phi[i - 1]) / (points[i + 1] - points[i - 1]);
            }
        }
        Ok(Self::RadialTable {
            dphi: LinearInterpolation::new(points.clone(), dphi)?,
            phi: LinearInterpolation::new(points, phi)?,
        })
    }

    /// 势
    pub fn phi(&self, chi: f64) -> f64 {
        match self {
            Self::Constant { g } => g * chi,
            Self::PointMass { gm, offset } => -gm / (offset + chi),
            Self::Polytrope {
                rho_center,
                k,
                alpha,
                eps,
            } => {
                let c = alpha * (chi + eps);
                -2.0 * k * rho_center * c.sin() / c
            }
            Self::RadialTable { phi, .. } => phi.eval(chi),
            Self::None => 0.0,
        }
    }

    /// `dphi / dchi`
    pub fn dphi(&self, chi: f64) -> f64 {
        match self {
            Self::Constant { g } => *g,
            Self::PointMass { gm, offset } => {
                let r = offset + chi;
                gm / (r * r)
            }
            Self::Polytrope {
                rho_center,
                k,
                alpha,
                eps,
            } => {
                let c = alpha * (chi + eps);
                -2.0 * k * rho_center * alpha * (c.cos() - c.sin() / c) / c
            }
            Self::RadialTable { dphi, .. } => dphi.eval(chi),
            Self::None => 0.0,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Constant { .. } => "constant",
            Self::PointMass { .. } => "point_mass",
            Self::Polytrope { .. } => "polytrope",
            Self::RadialTable { .. } => "radial_table",
            Self::None => "none",
        }
    }
}

/// 势函数的自变量
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GravityAlignment {
    /// `chi = |x|`
    Radial {
        /// 原点正则化
        eps: f64,
    },
    /// `chi = x[axis]`
    Axial {
        /// 坐标轴
        axis: usize,
    },
}

impl GravityAlignment {
    /// 径向
    pub fn radial() -> Self {
        Self::Radial { eps: RADIAL_EPSILON }
    }

    /// 自变量 `chi(x)`
    #[inline]
    pub fn chi(&self, x: DVec2) -> f64 {
        match *self {
            Self::Radial { .. } => x.length(),
            Self::Axial { axis } => x[axis],
        }
    }

    /// `∇chi`
    #[inline]
    pub fn dchi(&self, x: DVec2) -> DVec2 {
        match *self {
            Self::Radial { eps } => x / (x.length() + eps),
            Self::Axial { axis } => {
                let mut e = DVec2::ZERO;
                e[axis] = 1.0;
                e
            }
        }
    }
}

/// 重力
#[derive(Debug, Clone, PartialEq)]
pub struct Gravity {
    /// 一维势函数
    pub base: GravityBase,
    /// 坐标方向
    pub alignment: GravityAlignment,
}

impl Gravity {
    /// 创建
    pub fn new(base: GravityBase, alignment: GravityAlignment) -> Self {
        Self { base, alignment }
    }

    /// 无重力
    pub fn none() -> Self {
        Self::new(GravityBase::None, GravityAlignment::radial())
    }

    /// 从配置创建
    pub fn from_config(config: &GravityConfig) -> ZisaResult<Self> {
        let base = match &config.kind {
            GravityKind::Constant { g } => GravityBase::Constant { g: *g },
            GravityKind::PointMass { gm, offset } => GravityBase::PointMass {
                gm: *gm,
                offset: *offset,
            },
            GravityKind::Polytrope { rho_center, k, g } => GravityBase::polytrope(*rho_center, *k, *g),
            GravityKind::RadialInterpolation { points, phi } => {
                GravityBase::radial_table(points.clone(), phi.clone())?
            }
            GravityKind::NoGravity => GravityBase::None,
        };
        let alignment = match config.alignment {
            AlignmentConfig::Radial => GravityAlignment::radial(),
            AlignmentConfig::Axial { axis } => GravityAlignment::Axial { axis },
        };
        Ok(Self::new(base, alignment))
    }

    /// 势 `phi(x)`
    #[inline]
    pub fn phi(&self, x: DVec2) -> f64 {
        self.base.phi(self.alignment.chi(x))
    }

    /// 梯度 `∇phi(x)`
    #[inline]
    pub fn grad_phi(&self, x: DVec2) -> DVec2 {
        self.base.dphi(self.alignment.chi(x)) * self.alignment.dchi(x)
    }

    /// 简短描述
    pub fn describe(&self) -> String {
        let alignment = match self.alignment {
            GravityAlignment::Radial { .. } => "radial".to_string(),
            GravityAlignment::Axial { axis } => format!("axial({axis})"),
        };
        format!("{} [{}]", self.base.name(), alignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_gradient(gravity: &Gravity, x: DVec2) {
        let h = 1e-6;
        let fd = DVec2::new(
            (gravity.phi(x + DVec2::X * h) - gravity.phi(x - DVec2::X * h)) / (2.0 * h),
            (gravity.phi(x + DVec2::Y * h) - gravity.phi(x - DVec2::Y * h)) / (2.0 * h),
        );
        let grad = gravity.grad_phi(x);
        assert!((fd - grad).length() < 1e-6 * (1.0 + grad.length()), "{fd:?} vs {grad:?}");
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let x = DVec2::new(0.21, -0.13);
        check_gradient(&Gravity::new(GravityBase::Constant { g: 2.5 }, GravityAlignment::radial()), x);
        check_gradient(&Gravity::new(GravityBase::Constant { g: 2.5 }, GravityAlignment::Axial { axis: 1 }), x);
        check_gradient(
            &Gravity::new(GravityBase::PointMass { gm: 1.5, offset: 0.3 }, GravityAlignment::radial()),
            x,
        );
        check_gradient(&Gravity::new(GravityBase::polytrope(1.0, 1.0, 1.0), GravityAlignment::radial()), x);
    }

    #[test]
    fn test_polytrope_center_is_finite() {
        let gravity = Gravity::new(GravityBase::polytrope(1.0, 1.0, 1.0), GravityAlignment::radial());
        let phi0 = gravity.phi(DVec2::ZERO);
        assert!((phi0 + 2.0).abs() < 1e-12);
        assert!(gravity.grad_phi(DVec2::ZERO).is_finite());
    }

    #[test]
    fn test_radial_table_derivative() {
        let points: Vec<f64> = (0..=20).map(|i| 0.05 * i as f64).collect();
        let phi: Vec<f64> = points.iter().map(|r| 3.0 * r).collect();
        let base = GravityBase::radial_table(points, phi).unwrap();
        assert!((base.phi(0.33) - 0.99).abs() < 1e-12);
        assert!((base.dphi(0.33) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_config() {
        let gravity = Gravity::from_config(&GravityConfig::default()).unwrap();
        assert!(matches!(gravity.base, GravityBase::Polytrope { .. }));
        assert_eq!(gravity.describe(), "polytrope [radial]");
    }
}
