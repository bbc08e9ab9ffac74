//! 应用配置加载
//!
//! 配置来源按优先级从低到高：默认值、配置文件（toml/json/yaml）、
//! 以 `LORN` 为前缀、`__` 为层级分隔符的环境变量，例如 `LORN_CONTAINER__EAGER_LOADING=false`。

use config::{Config, Environment, File};
use di_common::{ConfigError, ConfigResult};
use di_impl::ContainerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "LORN";
/// 环境变量层级分隔符
pub const ENV_SEPARATOR: &str = "__";

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别或过滤表达式，`RUST_LOG` 存在时以其为准
    pub level: String,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    /// 容器配置
    pub container: ContainerConfig,
    /// 日志配置，缺省时不初始化日志
    pub logging: Option<LoggingConfig>,
}

impl ApplicationSettings {
    /// 从配置文件和环境变量加载
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        info!("加载配置文件: {}", path.display());
        Self::build(Config::builder().add_source(File::from(path)))
    }

    /// 只从环境变量加载
    pub fn from_env() -> ConfigResult<Self> {
        Self::build(Config::builder())
    }

    fn build(builder: config::ConfigBuilder<config::builder::DefaultState>) -> ConfigResult<Self> {
        let settings: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ConfigError::ParseError {
                source: Box::new(e),
            })?;
        settings.container.validate()?;
        debug!("应用配置: {:?}", settings);
        Ok(settings)
    }
}
