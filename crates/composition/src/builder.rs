//! 应用构建器

use crate::context::ApplicationContext;
use crate::settings::{ApplicationSettings, LoggingConfig};
use di_abstractions::{ModuleDecl, ModuleType, Provider};
use di_common::{ApplicationError, ApplicationResult, MetadataStore, Token};
use di_impl::{Container, ContainerConfig, DependenciesScanner, InstanceLoader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// 应用构建器
///
/// 使用建造者模式从根模块构建应用上下文：
/// 扫描模块图、应用提供者覆盖、创建实例、登记全局增强器。
pub struct ApplicationBuilder {
    /// 根模块
    root: ModuleType,
    /// 容器配置
    container_config: ContainerConfig,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
    /// 外部提供的元数据存储
    metadata: Option<Arc<MetadataStore>>,
    /// 扫描后替换的提供者
    overrides: Vec<(Token, Provider)>,
}

impl ApplicationBuilder {
    /// 以模块类型为根创建构建器
    pub fn new<M: ModuleDecl>() -> Self {
        Self::from_module(ModuleType::of::<M>())
    }

    /// 以模块描述为根创建构建器
    pub fn from_module(root: ModuleType) -> Self {
        Self {
            root,
            container_config: ContainerConfig::default(),
            logging_enabled: false, // 默认不启用日志初始化
            logging_config: LoggingConfig::default(),
            metadata: None,
            overrides: Vec::new(),
        }
    }

    /// 设置容器配置
    pub fn with_container_config(mut self, config: ContainerConfig) -> Self {
        self.container_config = config;
        self
    }

    /// 应用加载好的配置
    pub fn with_settings(mut self, settings: ApplicationSettings) -> Self {
        self.container_config = settings.container;
        if let Some(logging) = settings.logging {
            self = self.with_logging(logging);
        }
        self
    }

    /// 从配置文件和环境变量加载配置
    pub fn with_config_file<P: AsRef<Path>>(self, path: P) -> ApplicationResult<Self> {
        let settings = ApplicationSettings::load(path)?;
        Ok(self.with_settings(settings))
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true;
        self
    }

    /// 使用外部的元数据存储，声明可以在构建前写入
    pub fn with_metadata_store(mut self, store: Arc<MetadataStore>) -> Self {
        self.metadata = Some(store);
        self
    }

    /// 扫描完成后用新的提供者替换令牌对应的提供者
    pub fn override_provider(mut self, token: impl Into<Token>, provider: Provider) -> Self {
        self.overrides.push((token.into(), provider));
        self
    }

    /// 构建应用上下文
    pub async fn build(self) -> ApplicationResult<ApplicationContext> {
        // 只有在明确配置了日志时才初始化日志，避免在测试中重复初始化
        if self.logging_enabled {
            self.initialize_logging()?;
        }
        info!("开始构建应用: {}", self.root.name());

        self.container_config.validate()?;
        let container = match self.metadata {
            Some(store) => Container::with_metadata(store, self.container_config.clone()),
            None => Container::new(self.container_config.clone()),
        };

        let scanner = DependenciesScanner::new(container.clone());
        scanner.scan(&self.root)?;

        for (token, provider) in &self.overrides {
            debug!("替换提供者: {}", token);
            container.replace(token, provider)?;
        }

        let loader = InstanceLoader::new(container.clone());
        loader.create_instances_of_dependencies().await?;
        scanner.apply_application_providers().await?;

        if self.container_config.freeze_after_init {
            container.freeze();
        }

        info!("应用构建完成: {} 个模块", container.get_modules().len());
        Ok(ApplicationContext::new(container, self.root.key()))
    }

    /// 初始化日志系统
    fn initialize_logging(&self) -> ApplicationResult<()> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.logging_config.level))
            .map_err(|e| ApplicationError::BootstrapFailed {
                message: format!("日志级别无效: {}", e),
            })?;

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(self.logging_config.show_target)
            .with_thread_ids(self.logging_config.show_thread_ids)
            .with_file(self.logging_config.show_file)
            .with_line_number(self.logging_config.show_line_number);

        if self.logging_config.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        }
        .map_err(|e| ApplicationError::BootstrapFailed {
            message: format!("日志初始化失败: {}", e),
        })?;

        info!("日志系统初始化完成");
        Ok(())
    }
}

impl std::fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("root", &self.root.name())
            .field("container_config", &self.container_config)
            .field("logging_enabled", &self.logging_enabled)
            .field("overrides", &self.overrides.len())
            .finish()
    }
}
