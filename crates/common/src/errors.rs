//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

impl ConfigError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

/// 依赖注入错误类型
///
/// 扫描和注入阶段的所有错误都是致命的，不会重试，也不会回滚已经创建的实例。
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("检测到循环依赖: {context}, 依赖链: {chain}")]
    CircularDependency { context: String, chain: String },

    #[error("模块 {module} 导出了未知的提供者: {token}")]
    UnknownExport { module: String, token: String },

    #[error("无法解析 {type_name} 的依赖: 索引 [{index}] 处的 {token} 在模块 {module} 的上下文中不可见")]
    UnknownDependency {
        type_name: String,
        token: String,
        index: usize,
        module: String,
    },

    #[error("无效的提供者: {token}, 原因: {message}")]
    InvalidProvider { token: String, message: String },

    #[error("无效的类: {type_name} 没有可用的构造元数据")]
    InvalidClass { type_name: String },

    #[error("模块未注册: {module}")]
    UnknownModule { module: String },

    #[error("在模块 {module} 中找不到提供者: {token}")]
    UnknownToken { token: String, module: String },

    #[error("类型不匹配: {token} 不是 {expected}")]
    TypeMismatch { token: String, expected: String },

    #[error("组件创建失败: {type_name}, 原因: {source}")]
    ComponentCreationFailed {
        type_name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("解析深度超过限制: {token} (深度 {depth})")]
    ResolutionDepthExceeded { token: String, depth: usize },

    #[error("容器已冻结，不允许执行: {operation}")]
    ContainerFrozen { operation: String },

    #[error("{owner} 的构造参数缺失: 索引 [{index}]")]
    MissingDependency { owner: String, index: usize },
}

impl DependencyError {
    /// 创建组件创建失败错误
    pub fn creation_failed(
        type_name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ComponentCreationFailed {
            type_name: type_name.into(),
            source: source.into(),
        }
    }

    /// 是否为循环依赖错误
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }
}

/// 应用启动错误类型
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("应用启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type ApplicationResult<T> = Result<T, ApplicationError>;
