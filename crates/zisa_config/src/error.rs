// crates/zisa_config/src/error.rs

//! 配置层错误类型

use zisa_foundation::ZisaError;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },

    /// 缺失配置
    #[error("缺失配置: {0}")]
    Missing(String),
}

impl ConfigError {
    /// 构造无效值错误
    pub fn invalid(key: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<ConfigError> for ZisaError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Io(source) => ZisaError::io_with_source("读取配置失败", source),
            ConfigError::Parse(message) => ZisaError::config(message),
            ConfigError::InvalidValue { key, value, reason } => ZisaError::invalid_config(key, value, reason),
            ConfigError::Missing(key) => ZisaError::config(format!("缺失配置: {key}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("ode.cfl_number", -1.0, "必须为正");
        assert!(err.to_string().contains("ode.cfl_number"));
    }

    #[test]
    fn test_into_zisa_error() {
        let err: ZisaError = ConfigError::invalid("time.final_time", 0.0, "必须为正").into();
        assert!(matches!(err, ZisaError::InvalidConfig { .. }));

        let err: ZisaError = ConfigError::Missing("grid".into()).into();
        assert!(matches!(err, ZisaError::Config { .. }));
    }
}
