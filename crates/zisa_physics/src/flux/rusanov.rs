// crates/zisa_physics/src/flux/rusanov.rs

//! Rusanov 通量 `½(FL + FR) - ½ s (uR - uL)`，`s = max(|vL|+aL, |vR|+aR)`

use super::{NumericalFlux, WaveSpeeds};
use crate::model::{Euler, EulerVars};

/// Rusanov 通量
#[derive(Debug, Clone, Copy, Default)]
pub struct Rusanov;

impl NumericalFlux for Rusanov {
    fn name(&self) -> &'static str {
        "Rusanov"
    }

    fn flux(&self, euler: &Euler, u_left: &EulerVars, u_right: &EulerVars) -> (EulerVars, WaveSpeeds) {
        let s = euler.max_eigen_value(u_left).max(euler.max_eigen_value(u_right));
        let nf = (euler.flux_of(u_left) + euler.flux_of(u_right)) * 0.5 - (u_right - u_left) * (0.5 * s);
        (
            nf,
            WaveSpeeds {
                s_left: -s,
                s_star: 0.0,
                s_right: s,
            },
        )
    }

    fn tracer_flux(
        &self,
        u_left: &EulerVars,
        u_right: &EulerVars,
        q_left: f64,
        q_right: f64,
        speeds: &WaveSpeeds,
    ) -> f64 {
        let f_left = q_left * u_left[1] / u_left[0];
        let f_right = q_right * u_right[1] / u_right[0];
        0.5 * (f_left + f_right) - 0.5 * speeds.s_right * (q_right - q_left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gravity, IdealGasEos};

    #[test]
    fn test_consistency() {
        let euler = Euler::new(IdealGasEos::new(1.4, 1.0), Gravity::none());
        let u = euler.cvars(0.7, 0.3, -0.1, 1.3);
        let (f, speeds) = Rusanov.flux(&euler, &u, &u);
        assert!((f - euler.flux_of(&u)).norm() < 1e-14);
        assert!(speeds.s_right > 0.0);
        assert!((Rusanov.tracer_flux(&u, &u, 0.2, 0.2, &speeds) - 0.2 * 0.3).abs() < 1e-14);
    }

    #[test]
    fn test_dissipation_sign() {
        // 密度从左往右减小时，静止气体的质量通量为正
        let euler = Euler::new(IdealGasEos::new(1.4, 1.0), Gravity::none());
        let ul = euler.cvars(1.0, 0.0, 0.0, 1.0);
        let ur = euler.cvars(0.5, 0.0, 0.0, 1.0);
        let (f, _) = Rusanov.flux(&euler, &ul, &ur);
        assert!(f[0] > 0.0);
    }
}
