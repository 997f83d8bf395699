// crates/zisa_config/src/simulation_config.rs

//! SimulationConfig - 仿真配置
//!
//! JSON 配置文件的完整结构。键名沿用常见写法（`well-balancing`、
//! `flux-bc`、`specific-gas-constant`、`rhoC` 等），所有可省略的字段
//! 都有默认值，[`SimulationConfig::validate`] 负责跨字段的一致性检查。
//!
//! ```json
//! {
//!   "experiment": { "name": "polytrope", "initial_conditions": { "amplitude": 1e-3, "width": 0.05 } },
//!   "euler": {
//!     "eos": { "gamma": 2.0, "specific-gas-constant": 1.0 },
//!     "gravity": { "mode": "polytrope", "rhoC": 1.0, "K": 1.0, "G": 1.0 }
//!   },
//!   "grid": { "generator": { "kind": "disc", "radius": 0.6, "n_radial": 16, "n0": 6 } },
//!   "time": { "final_time": 0.1 },
//!   "io": { "mode": "vtu", "n_snapshots": 10 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;

/// 重构支持的最高阶数（多项式次数 4）
pub const MAX_RECONSTRUCTION_ORDER: usize = 5;

/// 三角形求积支持的最高次数
pub const MAX_QUADRATURE_DEGREE: usize = 5;

// ============================================================================
// 根配置
// ============================================================================

/// 仿真配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SimulationConfig {
    /// 数值实验
    #[serde(default)]
    pub experiment: ExperimentConfig,

    /// Euler 方程（状态方程与重力）
    #[serde(default)]
    pub euler: EulerConfig,

    /// 网格
    #[serde(default)]
    pub grid: GridConfig,

    /// 求积次数
    #[serde(default)]
    pub quadrature: QuadratureConfig,

    /// 重构
    #[serde(default)]
    pub reconstruction: ReconstructionConfig,

    /// 平衡态保持
    #[serde(rename = "well-balancing", default)]
    pub well_balancing: WellBalancingConfig,

    /// 外边界通量
    #[serde(rename = "flux-bc", default)]
    pub flux_bc: FluxBcConfig,

    /// 幽灵单元边界条件
    #[serde(rename = "boundary-condition", default)]
    pub boundary_condition: BoundaryConditionConfig,

    /// 时间积分
    #[serde(default)]
    pub ode: OdeConfig,

    /// 终止条件
    #[serde(default)]
    pub time: TimeConfig,

    /// 输出
    #[serde(default)]
    pub io: IoConfig,

    /// 并行
    #[serde(default)]
    pub parallelization: ParallelizationConfig,

    /// 从快照重启
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<RestartConfig>,
}

// ============================================================================
// 实验
// ============================================================================

/// 数值实验配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// 实验名称
    #[serde(default = "default_experiment_name")]
    pub name: String,

    /// 初始条件参数
    #[serde(default)]
    pub initial_conditions: InitialConditionsConfig,

    /// 单元中心到原点距离超过此值的单元视为幽灵单元
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ghost_cell_radius: Option<f64>,

    /// 单元中心到原点距离小于此值的单元也视为幽灵单元
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ghost_cell_inner_radius: Option<f64>,
}

fn default_experiment_name() -> String {
    "polytrope".into()
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: default_experiment_name(),
            initial_conditions: InitialConditionsConfig::default(),
            ghost_cell_radius: None,
            ghost_cell_inner_radius: None,
        }
    }
}

/// 初始条件参数，各实验按需读取
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialConditionsConfig {
    /// 扰动振幅
    #[serde(default)]
    pub amplitude: f64,

    /// 扰动宽度
    #[serde(default = "default_width")]
    pub width: f64,

    /// 角向扰动的个数
    #[serde(default = "default_n_bumps")]
    pub n_bumps: u32,

    /// 界面处的密度跳跃
    #[serde(default = "default_drho")]
    pub drho: f64,

    /// 界面半径
    #[serde(default = "default_r_crit")]
    pub r_crit: f64,

    /// 径向剖面文件 (JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<PathBuf>,
}

fn default_width() -> f64 {
    0.05
}
fn default_n_bumps() -> u32 {
    4
}
fn default_drho() -> f64 {
    0.1
}
fn default_r_crit() -> f64 {
    0.25
}

impl Default for InitialConditionsConfig {
    fn default() -> Self {
        Self {
            amplitude: 0.0,
            width: default_width(),
            n_bumps: default_n_bumps(),
            drho: default_drho(),
            r_crit: default_r_crit(),
            profile: None,
        }
    }
}

// ============================================================================
// Euler
// ============================================================================

/// Euler 方程配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EulerConfig {
    /// 状态方程
    #[serde(default)]
    pub eos: EosConfig,

    /// 重力
    #[serde(default)]
    pub gravity: GravityConfig,
}

/// 理想气体状态方程
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EosConfig {
    /// 绝热指数
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// 比气体常数
    #[serde(rename = "specific-gas-constant", default = "default_gas_constant")]
    pub specific_gas_constant: f64,
}

fn default_gamma() -> f64 {
    2.0
}
fn default_gas_constant() -> f64 {
    1.0
}

impl Default for EosConfig {
    fn default() -> Self {
        Self {
            gamma: default_gamma(),
            specific_gas_constant: default_gas_constant(),
        }
    }
}

/// 重力配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GravityConfig {
    /// 势函数
    #[serde(flatten)]
    pub kind: GravityKind,

    /// 坐标方向
    #[serde(default)]
    pub alignment: AlignmentConfig,
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self {
            kind: GravityKind::Polytrope {
                rho_center: 1.0,
                k: 1.0,
                g: 1.0,
            },
            alignment: AlignmentConfig::Radial,
        }
    }
}

/// 重力势类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GravityKind {
    /// 常重力 `phi = g chi`
    Constant {
        /// 重力加速度
        g: f64,
    },
    /// 点质量 `phi = -GM / (offset + chi)`
    PointMass {
        /// 引力常数乘质量
        #[serde(rename = "GM")]
        gm: f64,
        /// 坐标偏移
        #[serde(default)]
        offset: f64,
    },
    /// 多方球 (n = 1)
    Polytrope {
        /// 中心密度
        #[serde(rename = "rhoC")]
        rho_center: f64,
        /// 多方常数
        #[serde(rename = "K")]
        k: f64,
        /// 引力常数
        #[serde(rename = "G")]
        g: f64,
    },
    /// 径向插值表
    RadialInterpolation {
        /// 半径
        points: Vec<f64>,
        /// 势
        phi: Vec<f64>,
    },
    /// 无重力
    #[serde(alias = "none")]
    NoGravity,
}

/// 重力坐标方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignmentConfig {
    /// 径向 `chi = |x|`
    #[default]
    Radial,
    /// 沿坐标轴 `chi = x[axis]`
    Axial {
        /// 坐标轴
        axis: usize,
    },
}

// ============================================================================
// 网格
// ============================================================================

/// 网格配置，`file` 与 `generator` 二选一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// GMSH 文件
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// 结构化生成器
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GridGeneratorConfig>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            file: None,
            generator: Some(GridGeneratorConfig::Disc {
                radius: 0.6,
                n_radial: 16,
                n0: 6,
                center: [0.0, 0.0],
            }),
        }
    }
}

/// 网格生成器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridGeneratorConfig {
    /// 矩形
    Rect {
        /// x 方向矩形数
        nx: usize,
        /// y 方向矩形数
        ny: usize,
        /// 左下角
        #[serde(default)]
        origin: [f64; 2],
        /// x 方向长度
        lx: f64,
        /// y 方向长度
        ly: f64,
    },
    /// 圆盘
    Disc {
        /// 半径
        radius: f64,
        /// 环数
        n_radial: usize,
        /// 第一环顶点数
        n0: usize,
        /// 圆心
        #[serde(default)]
        center: [f64; 2],
    },
}

/// 求积次数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadratureConfig {
    /// 边
    #[serde(default = "default_quad_deg")]
    pub edge: usize,
    /// 单元
    #[serde(default = "default_quad_deg")]
    pub volume: usize,
    /// 归一化矩
    #[serde(default = "default_moments_deg")]
    pub moments: usize,
}

fn default_quad_deg() -> usize {
    3
}
fn default_moments_deg() -> usize {
    4
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        Self {
            edge: default_quad_deg(),
            volume: default_quad_deg(),
            moments: default_moments_deg(),
        }
    }
}

// ============================================================================
// 重构
// ============================================================================

/// 重构方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReconstructionMode {
    /// WENO-AO
    #[serde(rename = "WENO-AO")]
    WenoAo,
    /// CWENO-AO
    #[default]
    #[serde(rename = "CWENO-AO")]
    CwenoAo,
}

/// 光滑度指示子参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothnessIndicatorConfig {
    /// 防止除零
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// 指数
    #[serde(default = "default_exponent")]
    pub exponent: f64,
}

fn default_epsilon() -> f64 {
    1e-6
}
fn default_exponent() -> f64 {
    4.0
}

impl Default for SmoothnessIndicatorConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            exponent: default_exponent(),
        }
    }
}

/// 重构配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    /// 方法
    #[serde(default)]
    pub mode: ReconstructionMode,
    /// 各模板的阶数
    pub orders: Vec<usize>,
    /// 各模板的偏向，`"c"` 或 `"b"`
    pub biases: Vec<String>,
    /// 各模板的超定因子
    pub overfit_factors: Vec<f64>,
    /// 线性权重
    pub linear_weights: Vec<f64>,
    /// 光滑度指示子
    #[serde(default)]
    pub smoothness_indicator: SmoothnessIndicatorConfig,
    /// 每隔多少步重新计算局部平衡态
    #[serde(default = "default_steps_per_recompute")]
    pub steps_per_recompute: usize,
    /// 单元平均相对变化超过此值时重新计算局部平衡态
    #[serde(default = "default_recompute_threshold")]
    pub recompute_threshold: f64,
}

fn default_steps_per_recompute() -> usize {
    1
}
fn default_recompute_threshold() -> f64 {
    1e-3
}

impl ReconstructionConfig {
    /// `order` 阶格式的默认模板族与线性权重
    pub fn for_order(order: usize) -> Self {
        let (orders, biases, overfit_factors, linear_weights) = match order {
            0 | 1 => (vec![1], vec!["c"], vec![2.0], vec![1.0]),
            2 => (
                vec![2, 2, 2, 2],
                vec!["c", "b", "b", "b"],
                vec![3.0, 2.0, 2.0, 2.0],
                vec![100.0, 1.0, 1.0, 1.0],
            ),
            _ => (
                vec![order, 2, 2, 2],
                vec!["c", "b", "b", "b"],
                vec![2.0, 1.5, 1.5, 1.5],
                vec![100.0, 1.0, 1.0, 1.0],
            ),
        };

        Self {
            mode: ReconstructionMode::default(),
            orders,
            biases: biases.into_iter().map(String::from).collect(),
            overfit_factors,
            linear_weights,
            smoothness_indicator: SmoothnessIndicatorConfig::default(),
            steps_per_recompute: default_steps_per_recompute(),
            recompute_threshold: default_recompute_threshold(),
        }
    }

    /// 最高阶数
    pub fn max_order(&self) -> usize {
        self.orders.iter().copied().max().unwrap_or(1)
    }
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self::for_order(3)
    }
}

// ============================================================================
// 平衡态与边界
// ============================================================================

/// 平衡态类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EquilibriumMode {
    /// 不做平衡态保持
    Constant,
    /// 等熵平衡态
    #[default]
    Isentropic,
}

/// 平衡态保持配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WellBalancingConfig {
    /// 平衡态类型
    #[serde(default)]
    pub mode: EquilibriumMode,
}

/// 外边界通量类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FluxBcMode {
    /// 单元自身状态的物理通量
    Constant,
    /// 局部平衡态外推到边上的通量
    #[default]
    Isentropic,
    /// 不加外边界通量
    None,
}

/// 外边界通量配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FluxBcConfig {
    /// 类型
    #[serde(default)]
    pub mode: FluxBcMode,
}

/// 幽灵单元边界条件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryConditionMode {
    /// 不处理
    #[default]
    None,
    /// 冻结为初值（或稳态）
    Frozen,
}

/// 幽灵单元边界条件配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BoundaryConditionConfig {
    /// 类型
    #[serde(default)]
    pub mode: BoundaryConditionMode,
}

// ============================================================================
// 时间积分
// ============================================================================

/// Runge-Kutta 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OdeSolverKind {
    /// 前向 Euler
    #[serde(rename = "ForwardEuler", alias = "forward_euler")]
    ForwardEuler,
    /// 二阶 SSP
    #[serde(rename = "SSP2", alias = "ssp2")]
    Ssp2,
    /// 三阶 SSP
    #[default]
    #[serde(rename = "SSP3", alias = "ssp3")]
    Ssp3,
    /// Wicker-Skamarock 三阶
    #[serde(rename = "Wicker", alias = "wicker")]
    Wicker,
    /// 经典四阶
    #[serde(rename = "RK4", alias = "rk4")]
    Rk4,
    /// Fehlberg 五阶
    #[serde(rename = "Fehlberg", alias = "fehlberg")]
    Fehlberg,
}

impl OdeSolverKind {
    /// 全部方法
    pub const ALL: [OdeSolverKind; 6] = [
        Self::ForwardEuler,
        Self::Ssp2,
        Self::Ssp3,
        Self::Wicker,
        Self::Rk4,
        Self::Fehlberg,
    ];

    /// 名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::ForwardEuler => "ForwardEuler",
            Self::Ssp2 => "SSP2",
            Self::Ssp3 => "SSP3",
            Self::Wicker => "Wicker",
            Self::Rk4 => "RK4",
            Self::Fehlberg => "Fehlberg",
        }
    }
}

impl fmt::Display for OdeSolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OdeSolverKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.to_lowercase().replace(['-', '_'], "");
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().to_lowercase() == key)
            .ok_or_else(|| ConfigError::invalid("ode.solver", s, "未知的时间积分方法"))
    }
}

/// 时间步拒绝策略
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StepRejectionConfig {
    /// 不拒绝
    #[default]
    #[serde(rename = "none")]
    Nothing,
    /// 密度相对变化过大时拒绝
    #[serde(rename = "density")]
    LargeDensityChange {
        /// 允许的相对密度变化
        drho_crit_rel: f64,
        /// 时间步最多缩小 `2^max_exponent` 倍
        #[serde(default = "default_max_exponent")]
        max_exponent: u32,
    },
}

fn default_max_exponent() -> u32 {
    10
}

/// 时间积分配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OdeConfig {
    /// 方法
    #[serde(default)]
    pub solver: OdeSolverKind,
    /// CFL 数
    #[serde(default = "default_cfl")]
    pub cfl_number: f64,
    /// 时间步拒绝
    #[serde(default)]
    pub step_rejection: StepRejectionConfig,
}

fn default_cfl() -> f64 {
    0.45
}

impl Default for OdeConfig {
    fn default() -> Self {
        Self {
            solver: OdeSolverKind::default(),
            cfl_number: default_cfl(),
            step_rejection: StepRejectionConfig::default(),
        }
    }
}

/// 终止条件，至少给出一个
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeConfig {
    /// 终止时间
    #[serde(default, alias = "t_end", skip_serializing_if = "Option::is_none")]
    pub final_time: Option<f64>,
    /// 最大步数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_steps: Option<usize>,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            final_time: Some(0.1),
            n_steps: None,
        }
    }
}

// ============================================================================
// 输出
// ============================================================================

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IoMode {
    /// 不输出
    None,
    /// 二进制快照
    #[default]
    #[serde(alias = "hdf5")]
    Snapshot,
    /// VTU + PVD
    Vtu,
}

impl IoMode {
    /// 默认文件后缀
    pub fn default_suffix(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Snapshot => ".zsnp",
            Self::Vtu => ".vtu",
        }
    }
}

/// 文件名模式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNameConfig {
    /// 前缀
    #[serde(default = "default_stem")]
    pub stem: String,
    /// 编号模式，形如 `-%04d`
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// 后缀，省略时由输出格式决定
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

fn default_stem() -> String {
    "snapshot".into()
}
fn default_pattern() -> String {
    "-%04d".into()
}

impl Default for FileNameConfig {
    fn default() -> Self {
        Self {
            stem: default_stem(),
            pattern: default_pattern(),
            suffix: None,
        }
    }
}

/// 输出配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoConfig {
    /// 格式
    #[serde(default)]
    pub mode: IoMode,
    /// 输出目录
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    /// 每单位时间的帧数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    /// 每隔多少步输出一次
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps_per_frame: Option<usize>,
    /// 输出总次数（均匀分布到终止时间）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_snapshots: Option<usize>,
    /// 文件名
    #[serde(default)]
    pub filename: FileNameConfig,
    /// 每隔多少步记录一次进度
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_progress_every() -> usize {
    10
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            mode: IoMode::default(),
            directory: default_output_dir(),
            fps: None,
            steps_per_frame: None,
            n_snapshots: Some(10),
            filename: FileNameConfig::default(),
            progress_every: default_progress_every(),
        }
    }
}

impl IoConfig {
    /// 实际使用的文件后缀
    pub fn suffix(&self) -> String {
        self.filename
            .suffix
            .clone()
            .unwrap_or_else(|| self.mode.default_suffix().to_string())
    }
}

/// 并行配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelizationConfig {
    /// 子域个数
    #[serde(default = "default_n_parts")]
    pub n_parts: usize,
    /// rayon 线程数，省略时由 rayon 决定
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_threads: Option<usize>,
}

fn default_n_parts() -> usize {
    1
}

impl Default for ParallelizationConfig {
    fn default() -> Self {
        Self {
            n_parts: default_n_parts(),
            n_threads: None,
        }
    }
}

/// 重启配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartConfig {
    /// 快照文件
    pub file: PathBuf,
}

// ============================================================================
// 读写与校验
// ============================================================================

impl SimulationConfig {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let config = Self::from_json_str(&content)?;
        tracing::debug!(path = %path.display(), experiment = %config.experiment.name, "加载配置");
        Ok(config)
    }

    /// 从 JSON 字符串解析并校验
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }

    /// 是否从快照重启
    pub fn is_restart(&self) -> bool {
        self.restart.is_some()
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_euler()?;
        self.validate_grid()?;
        self.validate_reconstruction()?;
        self.validate_ode()?;
        self.validate_io()?;

        if self.experiment.name.trim().is_empty() {
            return Err(ConfigError::Missing("experiment.name".into()));
        }
        if let Some(r) = self.experiment.ghost_cell_radius {
            check_positive("experiment.ghost_cell_radius", r)?;
        }
        if let Some(r) = self.experiment.ghost_cell_inner_radius {
            check_positive("experiment.ghost_cell_inner_radius", r)?;
            if matches!(self.experiment.ghost_cell_radius, Some(outer) if outer <= r) {
                return Err(ConfigError::invalid(
                    "experiment.ghost_cell_inner_radius",
                    r,
                    "必须小于 ghost_cell_radius",
                ));
            }
        }
        if self.parallelization.n_parts == 0 {
            return Err(ConfigError::invalid("parallelization.n_parts", 0, "至少一个子域"));
        }
        if self.parallelization.n_threads == Some(0) {
            return Err(ConfigError::invalid("parallelization.n_threads", 0, "至少一个线程"));
        }

        Ok(())
    }

    fn validate_euler(&self) -> Result<(), ConfigError> {
        let eos = &self.euler.eos;
        if !(eos.gamma > 1.0) {
            return Err(ConfigError::invalid("euler.eos.gamma", eos.gamma, "gamma 必须大于 1"));
        }
        check_positive("euler.eos.specific-gas-constant", eos.specific_gas_constant)?;

        match &self.euler.gravity.kind {
            GravityKind::Constant { g } => check_finite("euler.gravity.g", *g)?,
            GravityKind::PointMass { gm, offset } => {
                check_positive("euler.gravity.GM", *gm)?;
                check_finite("euler.gravity.offset", *offset)?;
            }
            GravityKind::Polytrope { rho_center, k, g } => {
                check_positive("euler.gravity.rhoC", *rho_center)?;
                check_positive("euler.gravity.K", *k)?;
                check_positive("euler.gravity.G", *g)?;
            }
            GravityKind::RadialInterpolation { points, phi } => {
                if points.len() < 2 || points.len() != phi.len() {
                    return Err(ConfigError::invalid(
                        "euler.gravity.points",
                        points.len(),
                        format!("至少两个点且与 phi 等长 ({})", phi.len()),
                    ));
                }
                if points.windows(2).any(|w| !(w[1] > w[0])) {
                    return Err(ConfigError::invalid("euler.gravity.points", "[...]", "必须严格递增"));
                }
            }
            GravityKind::NoGravity => {}
        }

        if let AlignmentConfig::Axial { axis } = self.euler.gravity.alignment {
            if axis > 1 {
                return Err(ConfigError::invalid("euler.gravity.alignment.axis", axis, "二维问题只有 0 和 1"));
            }
        }
        Ok(())
    }

    fn validate_grid(&self) -> Result<(), ConfigError> {
        match (&self.grid.file, &self.grid.generator) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::invalid("grid", "file + generator", "只能给出其中一个"));
            }
            (None, None) => return Err(ConfigError::Missing("grid.file 或 grid.generator".into())),
            (None, Some(GridGeneratorConfig::Rect { nx, ny, lx, ly, .. })) => {
                if *nx == 0 || *ny == 0 {
                    return Err(ConfigError::invalid("grid.generator.nx", format!("{nx}x{ny}"), "必须为正"));
                }
                check_positive("grid.generator.lx", *lx)?;
                check_positive("grid.generator.ly", *ly)?;
            }
            (None, Some(GridGeneratorConfig::Disc { radius, n_radial, n0, .. })) => {
                check_positive("grid.generator.radius", *radius)?;
                if *n_radial == 0 || *n0 < 3 {
                    return Err(ConfigError::invalid(
                        "grid.generator",
                        format!("n_radial = {n_radial}, n0 = {n0}"),
                        "至少一环且第一环至少 3 个顶点",
                    ));
                }
            }
            (Some(_), None) => {}
        }

        let q = &self.quadrature;
        if q.volume > MAX_QUADRATURE_DEGREE {
            return Err(ConfigError::invalid("quadrature.volume", q.volume, "最高支持 5 次"));
        }
        if q.moments > MAX_QUADRATURE_DEGREE {
            return Err(ConfigError::invalid("quadrature.moments", q.moments, "最高支持 5 次"));
        }
        Ok(())
    }

    fn validate_reconstruction(&self) -> Result<(), ConfigError> {
        let rc = &self.reconstruction;
        let n = rc.orders.len();
        if n == 0 {
            return Err(ConfigError::Missing("reconstruction.orders".into()));
        }
        for (key, len) in [
            ("reconstruction.biases", rc.biases.len()),
            ("reconstruction.overfit_factors", rc.overfit_factors.len()),
            ("reconstruction.linear_weights", rc.linear_weights.len()),
        ] {
            if len != n {
                return Err(ConfigError::invalid(key, len, format!("长度必须与 orders 一致 ({n})")));
            }
        }

        if let Some(&order) = rc.orders.iter().find(|&&o| o == 0 || o > MAX_RECONSTRUCTION_ORDER) {
            return Err(ConfigError::invalid("reconstruction.orders", order, "阶数必须在 1..=5"));
        }
        if let Some(bias) = rc.biases.iter().find(|b| !matches!(b.as_str(), "c" | "b")) {
            return Err(ConfigError::invalid("reconstruction.biases", bias, "只能是 \"c\" 或 \"b\""));
        }
        if let Some(&f) = rc.overfit_factors.iter().find(|&&f| !(f >= 1.0)) {
            return Err(ConfigError::invalid("reconstruction.overfit_factors", f, "不能小于 1"));
        }
        if let Some(&w) = rc.linear_weights.iter().find(|&&w| !(w > 0.0)) {
            return Err(ConfigError::invalid("reconstruction.linear_weights", w, "必须为正"));
        }

        check_positive("reconstruction.smoothness_indicator.epsilon", rc.smoothness_indicator.epsilon)?;
        check_positive("reconstruction.smoothness_indicator.exponent", rc.smoothness_indicator.exponent)?;
        if rc.steps_per_recompute == 0 {
            return Err(ConfigError::invalid("reconstruction.steps_per_recompute", 0, "至少为 1"));
        }
        if !(rc.recompute_threshold >= 0.0) {
            return Err(ConfigError::invalid(
                "reconstruction.recompute_threshold",
                rc.recompute_threshold,
                "不能为负",
            ));
        }
        Ok(())
    }

    fn validate_ode(&self) -> Result<(), ConfigError> {
        let cfl = self.ode.cfl_number;
        if !(cfl > 0.0 && cfl <= 1.0) {
            return Err(ConfigError::invalid("ode.cfl_number", cfl, "CFL 必须在 (0, 1] 范围内"));
        }

        if let StepRejectionConfig::LargeDensityChange { drho_crit_rel, max_exponent } = self.ode.step_rejection {
            check_positive("ode.step_rejection.drho_crit_rel", drho_crit_rel)?;
            if max_exponent == 0 || max_exponent > 52 {
                return Err(ConfigError::invalid("ode.step_rejection.max_exponent", max_exponent, "必须在 1..=52"));
            }
        }

        match (self.time.final_time, self.time.n_steps) {
            (None, None) => Err(ConfigError::Missing("time.final_time 或 time.n_steps".into())),
            (Some(t), _) if !(t > 0.0) => Err(ConfigError::invalid("time.final_time", t, "必须为正")),
            (_, Some(0)) => Err(ConfigError::invalid("time.n_steps", 0, "必须为正")),
            _ => Ok(()),
        }
    }

    fn validate_io(&self) -> Result<(), ConfigError> {
        let io = &self.io;
        if io.mode == IoMode::None {
            return Ok(());
        }

        let has_final_time = self.time.final_time.is_some();
        match (io.fps, io.n_snapshots, io.steps_per_frame) {
            (Some(fps), _, _) => {
                check_positive("io.fps", fps)?;
                if !has_final_time {
                    return Err(ConfigError::Missing("io.fps 需要 time.final_time".into()));
                }
            }
            (None, Some(n), _) => {
                if n == 0 {
                    return Err(ConfigError::invalid("io.n_snapshots", 0, "必须为正"));
                }
                if !has_final_time {
                    return Err(ConfigError::Missing("io.n_snapshots 需要 time.final_time".into()));
                }
            }
            (None, None, Some(k)) => {
                if k == 0 {
                    return Err(ConfigError::invalid("io.steps_per_frame", 0, "必须为正"));
                }
            }
            (None, None, None) => {
                return Err(ConfigError::Missing("io.fps、io.n_snapshots 或 io.steps_per_frame".into()));
            }
        }

        parse_pattern_width(&io.filename.pattern)
            .ok_or_else(|| ConfigError::invalid("io.filename.pattern", &io.filename.pattern, "需要形如 \"-%04d\""))?;
        if io.progress_every == 0 {
            return Err(ConfigError::invalid("io.progress_every", 0, "至少为 1"));
        }
        Ok(())
    }
}

/// 解析 `%0Nd` 编号模式，返回 `(前缀, 宽度, 后缀)`
pub fn parse_pattern_width(pattern: &str) -> Option<(String, usize, String)> {
    let start = pattern.find('%')?;
    let rest = &pattern[start + 1..];
    let end = rest.find('d')?;
    let digits = &rest[..end];
    let width = if digits.is_empty() { 0 } else { digits.parse().ok()? };
    Some((pattern[..start].to_string(), width, rest[end + 1..].to_string()))
}

fn check_positive(key: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, value, "必须为正的有限数"))
    }
}

fn check_finite(key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, value, "必须为有限数"))
    }
}
