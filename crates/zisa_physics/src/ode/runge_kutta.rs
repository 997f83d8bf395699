// crates/zisa_physics/src/ode/runge_kutta.rs

//! 显式 Runge-Kutta 方法
//!
//! ```text
//! k_s = L(u0 + dt Σ_{i<s} a_si k_i, t + c_s dt)
//! u1  = u0 + dt Σ_s b_s k_s
//! ```
//!
//! 每个阶段的状态在求速率前都先施加边界条件，`u1` 也一样。

use std::sync::Arc;

use zisa_config::OdeSolverKind;
use zisa_foundation::{ensure, ZisaError, ZisaResult};

use crate::boundary::BoundaryCondition;
use crate::fvm::RateOfChange;
use crate::model::AllVariables;

/// Butcher 表
#[derive(Debug, Clone, PartialEq)]
pub struct ButcherTableau {
    name: &'static str,
    order: usize,
    /// 下三角系数，`a[s]` 长度为 `s`
    a: Vec<Vec<f64>>,
    b: Vec<f64>,
    c: Vec<f64>,
}

impl ButcherTableau {
    /// 创建，`c_s = Σ_i a_si`
    pub fn new(name: &'static str, order: usize, a: Vec<Vec<f64>>, b: Vec<f64>) -> ZisaResult<Self> {
        ZisaError::check_size("butcher.b", a.len(), b.len())?;
        ensure!(
            a.iter().enumerate().all(|(s, row)| row.len() == s),
            ZisaError::invalid_input(format!("{name}: a 必须是严格下三角"))
        );
        Ok(Self::fixed(name, order, a, b))
    }

    /// 前向 Euler
    pub fn forward_euler() -> Self {
        Self::fixed("ForwardEuler", 1, vec![vec![]], vec![1.0])
    }

    /// 二阶 SSP（Heun）
    pub fn ssp2() -> Self {
        Self::fixed("SSP2", 2, vec![vec![], vec![1.0]], vec![0.5, 0.5])
    }

    /// 三阶 SSP（Shu-Osher）
    pub fn ssp3() -> Self {
        Self::fixed(
            "SSP3",
            3,
            vec![vec![], vec![1.0], vec![0.25, 0.25]],
            vec![1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0],
        )
    }

    /// Wicker-Skamarock 三阶段方法
    pub fn wicker() -> Self {
        Self::fixed(
            "Wicker",
            3,
            vec![vec![], vec![1.0 / 3.0], vec![0.0, 0.5]],
            vec![0.0, 0.0, 1.0],
        )
    }

    /// 经典四阶
    pub fn rk4() -> Self {
        Self::fixed(
            "RK4",
            4,
            vec![vec![], vec![0.5], vec![0.0, 0.5], vec![0.0, 0.0, 1.0]],
            vec![1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
        )
    }

    /// Fehlberg 六阶段，取五阶权重
    pub fn fehlberg() -> Self {
        Self::fixed(
            "Fehlberg",
            5,
            vec![
                vec![],
                vec![1.0 / 4.0],
                vec![3.0 / 32.0, 9.0 / 32.0],
                vec![1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0],
                vec![439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0],
                vec![-8.0 / 27.0, 2.0, -3544.0 / 2565.0, 1859.0 / 4104.0, -11.0 / 40.0],
            ],
            vec![
                16.0 / 135.0,
                0.0,
                6656.0 / 12825.0,
                28561.0 / 56430.0,
                -9.0 / 50.0,
                2.0 / 55.0,
            ],
        )
    }

    /// 系数已知合法的内置方法
    fn fixed(name: &'static str, order: usize, a: Vec<Vec<f64>>, b: Vec<f64>) -> Self {
        let c = a.iter().map(|row| row.iter().sum()).collect();
        Self { name, order, a, b, c }
    }

    /// 按配置选择
    pub fn from_kind(kind: OdeSolverKind) -> Self {
        match kind {
            OdeSolverKind::ForwardEuler => Self::forward_euler(),
            OdeSolverKind::Ssp2 => Self::ssp2(),
            OdeSolverKind::Ssp3 => Self::ssp3(),
            OdeSolverKind::Wicker => Self::wicker(),
            OdeSolverKind::Rk4 => Self::rk4(),
            OdeSolverKind::Fehlberg => Self::fehlberg(),
        }
    }

    /// 阶段数
    pub fn n_stages(&self) -> usize {
        self.b.len()
    }

    /// 名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 精度阶数
    pub fn order(&self) -> usize {
        self.order
    }

    /// 阶段时间系数
    pub fn c(&self) -> &[f64] {
        &self.c
    }
}

/// 按名称创建 Butcher 表，名称不区分大小写
pub fn make_tableau(name: &str) -> ZisaResult<ButcherTableau> {
    let kind: OdeSolverKind = name
        .parse()
        .map_err(|_| ZisaError::invalid_config("ode.solver", name, "未知的 Runge-Kutta 方法"))?;
    Ok(ButcherTableau::from_kind(kind))
}

/// 时间积分
pub trait TimeIntegration: Send {
    /// 从 `(u0, t)` 推进 `dt`，结果写入 `u1`
    fn compute_step(&mut self, u1: &mut AllVariables, u0: &AllVariables, t: f64, dt: f64) -> ZisaResult<()>;

    /// 精度阶数
    fn order(&self) -> usize;

    /// 描述
    fn describe(&self) -> String;
}

/// 显式 Runge-Kutta
pub struct RungeKutta {
    tableau: ButcherTableau,
    rate: Arc<dyn RateOfChange>,
    bc: Arc<dyn BoundaryCondition>,
    stages: Vec<AllVariables>,
    stage_state: Option<AllVariables>,
}

impl RungeKutta {
    /// 创建
    pub fn new(tableau: ButcherTableau, rate: Arc<dyn RateOfChange>, bc: Arc<dyn BoundaryCondition>) -> Self {
        Self {
            tableau,
            rate,
            bc,
            stages: Vec::new(),
            stage_state: None,
        }
    }

    /// Butcher 表
    pub fn tableau(&self) -> &ButcherTableau {
        &self.tableau
    }

    fn allocate(&mut self, u0: &AllVariables) {
        let n_stages = self.tableau.n_stages();
        let same_shape = |u: &AllVariables| u.n_cells() == u0.n_cells() && u.n_avars() == u0.n_avars();
        if self.stages.len() != n_stages || !self.stages.iter().all(same_shape) {
            self.stages = (0..n_stages).map(|_| u0.zeros_like()).collect();
        }
        if !self.stage_state.as_ref().is_some_and(same_shape) {
            self.stage_state = Some(u0.zeros_like());
        }
    }
}

impl TimeIntegration for RungeKutta {
    fn compute_step(&mut self, u1: &mut AllVariables, u0: &AllVariables, t: f64, dt: f64) -> ZisaResult<()> {
        self.allocate(u0);
        let mut state = self.stage_state.take().unwrap_or_else(|| u0.zeros_like());

        let result = (|| {
            for s in 0..self.tableau.n_stages() {
                let t_s = t + self.tableau.c[s] * dt;
                state.copy_from(u0)?;
                for (i, &a) in self.tableau.a[s].iter().enumerate() {
                    if a != 0.0 {
                        state.axpy(dt * a, &self.stages[i])?;
                    }
                }
                if s > 0 {
                    self.bc.apply(&mut state, t_s)?;
                }

                let k = &mut self.stages[s];
                k.fill_zero();
                self.rate.compute(k, &state, t_s)?;
            }

            u1.copy_from(u0)?;
            for (k, &b) in self.stages.iter().zip(&self.tableau.b) {
                if b != 0.0 {
                    u1.axpy(dt * b, k)?;
                }
            }
            self.bc.apply(u1, t + dt)
        })();

        self.stage_state = Some(state);
        result
    }

    fn order(&self) -> usize {
        self.tableau.order
    }

    fn describe(&self) -> String {
        format!("{} [{}; bc: {}]", self.tableau.name, self.rate.describe(), self.bc.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::NoBoundaryCondition;

    /// `du/dt = λ u`
    struct Linear(f64);

    impl RateOfChange for Linear {
        fn name(&self) -> &str {
            "linear"
        }

        fn compute(&self, tendency: &mut AllVariables, u: &AllVariables, _t: f64) -> ZisaResult<()> {
            tendency.axpy(self.0, u)
        }
    }

    /// `du/dt = t^3`
    struct Cubic;

    impl RateOfChange for Cubic {
        fn name(&self) -> &str {
            "cubic"
        }

        fn compute(&self, tendency: &mut AllVariables, _u: &AllVariables, t: f64) -> ZisaResult<()> {
            tendency.cvars.iter_mut().for_each(|c| c.add_scalar_mut(t * t * t));
            Ok(())
        }
    }

    fn integrate(tableau: ButcherTableau, rate: Arc<dyn RateOfChange>, n_steps: usize) -> f64 {
        let mut rk = RungeKutta::new(tableau, rate, Arc::new(NoBoundaryCondition));
        let mut u0 = AllVariables::zeros(1, 0);
        u0.cvars[0].fill(1.0);
        let mut u1 = u0.zeros_like();
        let dt = 1.0 / n_steps as f64;
        for k in 0..n_steps {
            rk.compute_step(&mut u1, &u0, k as f64 * dt, dt).unwrap();
            std::mem::swap(&mut u0, &mut u1);
        }
        u0.cvars[0][0]
    }

    #[test]
    fn test_stage_times_are_row_sums() {
        for kind in OdeSolverKind::ALL {
            let tableau = ButcherTableau::from_kind(kind);
            let total: f64 = tableau.b.iter().sum();
            assert!((total - 1.0).abs() < 1e-14, "{kind}");
            for (s, row) in tableau.a.iter().enumerate() {
                assert_eq!(row.len(), s);
                assert!((tableau.c[s] - row.iter().sum::<f64>()).abs() < 1e-15);
            }
        }
        assert!((ButcherTableau::fehlberg().c()[3] - 12.0 / 13.0).abs() < 1e-14);
    }

    #[test]
    fn test_convergence_order() {
        let exact = (-1.0f64).exp();
        for kind in OdeSolverKind::ALL {
            let tableau = ButcherTableau::from_kind(kind);
            let order = tableau.order() as f64;
            let e1 = (integrate(tableau.clone(), Arc::new(Linear(-1.0)), 10) - exact).abs();
            let e2 = (integrate(tableau, Arc::new(Linear(-1.0)), 20) - exact).abs();
            let rate = (e1 / e2).log2();
            assert!(rate > order - 0.3, "{kind}: {rate}");
        }
    }

    #[test]
    fn test_time_dependent_rate() {
        // u(1) = 1 + 1/4，RK4 对三次多项式精确
        let u = integrate(ButcherTableau::rk4(), Arc::new(Cubic), 3);
        assert!((u - 1.25).abs() < 1e-14);
    }

    #[test]
    fn test_make_tableau() {
        assert_eq!(make_tableau("ssp3").unwrap().n_stages(), 3);
        assert_eq!(make_tableau("RK4").unwrap().order(), 4);
        assert_eq!(make_tableau("forward_euler").unwrap().name(), "ForwardEuler");
        assert!(make_tableau("leapfrog").is_err());
    }

    #[test]
    fn test_new_checks_shape() {
        assert!(ButcherTableau::new("bad", 1, vec![vec![1.0]], vec![1.0]).is_err());
        let t = ButcherTableau::new("heun", 2, vec![vec![], vec![1.0]], vec![0.5, 0.5]).unwrap();
        assert_eq!(t.c(), &[0.0, 1.0]);
    }
}
