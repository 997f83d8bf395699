// crates/zisa_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `ZisaError` 枚举和 `ZisaResult` 类型别名，用于整个求解器的错误处理。
//!
//! # 设计原则
//!
//! 1. **层次化**: 基础层只定义核心错误，配置和 IO 的细分错误在各自 crate 中定义
//! 2. **易用性**: 提供便捷的构造方法
//! 3. **可追溯**: 支持错误链
//!
//! # 示例
//!
//! ```
//! use zisa_foundation::error::{ZisaError, ZisaResult};
//!
//! fn read_grid() -> ZisaResult<()> {
//!     Err(ZisaError::invalid_mesh("三角形面积为零"))
//! }
//! assert!(read_grid().is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型
pub type ZisaResult<T> = Result<T, ZisaError>;

/// ZisaFVM 错误类型
#[derive(Error, Debug)]
pub enum ZisaError {
    // ========================================================================
    // IO 相关错误
    // ========================================================================
    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },

    /// 文件不存在
    #[error("文件不存在: {path}")]
    FileNotFound {
        /// 未找到的路径
        path: PathBuf,
    },

    /// 文件解析错误
    #[error("文件解析错误: {file} 第{line}行: {message}")]
    ParseError {
        /// 文件路径
        file: PathBuf,
        /// 行号
        line: usize,
        /// 错误信息
        message: String,
    },

    // ========================================================================
    // 数据错误
    // ========================================================================
    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 数据超出范围
    #[error("数据超出范围: {field}={value}, 期望范围=[{min}, {max}]")]
    OutOfRange {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 索引越界
    #[error("索引越界: {index_type} 索引 {index} 超出范围 0..{len}")]
    IndexOutOfBounds {
        /// 索引类别描述
        index_type: &'static str,
        /// 访问的索引
        index: usize,
        /// 上界（长度）
        len: usize,
    },

    /// 无效网格拓扑
    #[error("无效的网格: {message}")]
    InvalidMesh {
        /// 具体错误信息
        message: String,
    },

    // ========================================================================
    // 配置错误
    // ========================================================================
    /// 配置错误
    #[error("配置错误: {message}")]
    Config {
        /// 具体错误信息
        message: String,
    },

    /// 配置值无效
    #[error("配置值无效: {key}={value}, 原因: {reason}")]
    InvalidConfig {
        /// 配置键名
        key: String,
        /// 配置值
        value: String,
        /// 无效原因说明
        reason: String,
    },

    /// 未知的数值实验
    #[error("未知的数值实验: '{name}'")]
    InvalidNumericalExperiment {
        /// 配置中给出的实验名
        name: String,
    },

    // ========================================================================
    // 数值错误
    // ========================================================================
    /// 迭代未收敛
    #[error("迭代未收敛: {what} ({iterations} 次迭代后残差 {residual:e})")]
    NotConverged {
        /// 迭代过程名称
        what: &'static str,
        /// 已执行的迭代次数
        iterations: usize,
        /// 最终残差
        residual: f64,
    },

    /// 物理状态不合理（负密度、负能量或非有限值）
    #[error("状态不合理: 单元 {cell} 在第 {step} 步 (t = {time:e}): {details}")]
    ImplausibleState {
        /// 第一个不合理单元
        cell: usize,
        /// 时间步
        step: usize,
        /// 模拟时间
        time: f64,
        /// 单元值
        details: String,
    },

    /// 无法构造模板
    #[error("模板构造失败: 单元 {cell}: {message}")]
    Stencil {
        /// 中心单元
        cell: usize,
        /// 错误信息
        message: String,
    },

    // ========================================================================
    // 并行与运行时
    // ========================================================================
    /// 锁获取失败
    #[error("锁获取失败: {resource}")]
    LockError {
        /// 失败的资源名
        resource: String,
    },

    /// 通道发送失败
    #[error("通道发送失败")]
    ChannelSendError,

    /// 通道接收失败
    #[error("通道接收失败: {0}")]
    ChannelRecvError(String),

    /// 序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        /// 序列化失败原因
        message: String,
    },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },

    /// 运行时错误
    #[error("运行时错误: {0}")]
    Runtime(String),

    /// 资源未找到
    #[error("资源未找到: {resource}")]
    NotFound {
        /// 资源名称
        resource: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl ZisaError {
    /// 从信息创建 IO 错误
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 从 IO 错误创建（带源）
    pub fn io_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 文件不存在
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// 解析错误
    pub fn parse(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 数据超出范围
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 索引越界
    pub fn index_out_of_bounds(index_type: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index_type,
            index,
            len,
        }
    }

    /// 无效网格
    pub fn invalid_mesh(message: impl Into<String>) -> Self {
        Self::InvalidMesh {
            message: message.into(),
        }
    }

    /// 配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 配置值无效
    pub fn invalid_config(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// 未知实验
    pub fn invalid_experiment(name: impl Into<String>) -> Self {
        Self::InvalidNumericalExperiment { name: name.into() }
    }

    /// 迭代未收敛
    pub fn not_converged(what: &'static str, iterations: usize, residual: f64) -> Self {
        Self::NotConverged {
            what,
            iterations,
            residual,
        }
    }

    /// 状态不合理
    pub fn implausible_state(cell: usize, step: usize, time: f64, details: impl Into<String>) -> Self {
        Self::ImplausibleState {
            cell,
            step,
            time,
            details: details.into(),
        }
    }

    /// 模板构造失败
    pub fn stencil(cell: usize, message: impl Into<String>) -> Self {
        Self::Stencil {
            cell,
            message: message.into(),
        }
    }

    /// 序列化错误
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// 内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// 运行时错误
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    /// 资源未找到
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl ZisaError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> ZisaResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查值是否在范围内
    #[inline]
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> ZisaResult<()> {
        if !(min..=max).contains(&value) {
            Err(Self::out_of_range(field, value, min, max))
        } else {
            Ok(())
        }
    }

    /// 检查索引是否在范围内
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> ZisaResult<()> {
        if index >= len {
            Err(Self::index_out_of_bounds(index_type, index, len))
        } else {
            Ok(())
        }
    }
}

// ========================================================================
// 标准库错误转换
// ========================================================================

impl From<std::io::Error> for ZisaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for ZisaError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockError {
            resource: "mutex".into(),
        }
    }
}

impl<T> From<std::sync::mpsc::SendError<T>> for ZisaError {
    fn from(_: std::sync::mpsc::SendError<T>) -> Self {
        Self::ChannelSendError
    }
}

impl From<std::sync::mpsc::RecvError> for ZisaError {
    fn from(err: std::sync::mpsc::RecvError) -> Self {
        Self::ChannelRecvError(err.to_string())
    }
}

/// 条件不满足时返回错误
///
/// ```
/// use zisa_foundation::{ensure, ZisaError, ZisaResult};
///
/// fn positive(x: f64) -> ZisaResult<f64> {
///     ensure!(x > 0.0, ZisaError::invalid_input("x 必须为正"));
///     Ok(x)
/// }
/// assert!(positive(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

// ========================================================================
// 测试
// ========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ZisaError::config("测试配置错误");
        assert!(err.to_string().contains("配置错误"));
    }

    #[test]
    fn test_implausible_state_display() {
        let err = ZisaError::implausible_state(17, 3, 0.5, "rho = -1");
        let msg = err.to_string();
        assert!(msg.contains("17"));
        assert!(msg.contains("rho = -1"));
    }

    #[test]
    fn test_index_out_of_bounds() {
        let err = ZisaError::index_out_of_bounds("Cell", 10, 5);
        assert!(err.to_string().contains("Cell"));
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn test_check_helpers() {
        assert!(ZisaError::check_size("test", 10, 10).is_ok());
        assert!(ZisaError::check_size("test", 10, 5).is_err());
        assert!(ZisaError::check_range("value", 5.0, 0.0, 10.0).is_ok());
        assert!(ZisaError::check_range("value", f64::NAN, 0.0, 10.0).is_err());
        assert!(ZisaError::check_index("Cell", 10, 10).is_err());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: ZisaError = io_err.into();
        assert!(matches!(err, ZisaError::Io { .. }));
    }

    #[test]
    fn test_channel_error_conversion() {
        let (tx, rx) = std::sync::mpsc::channel::<i32>();
        drop(rx);
        let err: ZisaError = tx.send(1).unwrap_err().into();
        assert!(matches!(err, ZisaError::ChannelSendError));
    }

    #[test]
    fn test_ensure_macro() {
        fn check(value: i32) -> ZisaResult<()> {
            ensure!(value > 0, ZisaError::invalid_input("value must be positive"));
            Ok(())
        }

        assert!(check(1).is_ok());
        assert!(check(-1).is_err());
    }
}
