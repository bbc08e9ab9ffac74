//! # 应用组合层
//!
//! 这个 crate 把模块图扫描、实例加载和全局增强器登记组合成一个完整的启动流程。
//!
//! ## 主要功能
//!
//! - **应用构建器**: 使用构建者模式从根模块构建应用
//! - **配置加载**: 从配置文件和 `LORN` 前缀的环境变量加载容器和日志配置
//! - **应用上下文**: 构建完成后按令牌获取或解析实例
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use di_abstractions::{ModuleDecl, ModuleMetadata, Provider};
//! use di_composition::{ApplicationBuilder, LoggingConfig};
//! use std::sync::Arc;
//!
//! struct AppModule;
//!
//! impl ModuleDecl for AppModule {
//!     fn metadata() -> ModuleMetadata {
//!         ModuleMetadata::new().provider(Provider::use_value("APP_NAME", "cats".to_string()))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = ApplicationBuilder::new::<AppModule>()
//!         .with_logging(LoggingConfig::development())
//!         .build()
//!         .await?;
//!
//!     let name: Arc<String> = app.get("APP_NAME")?;
//!     println!("应用名称: {}", name);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod context;
pub mod settings;

// 重新导出主要类型
pub use builder::ApplicationBuilder;
pub use context::ApplicationContext;
pub use settings::{ApplicationSettings, LoggingConfig, ENV_PREFIX, ENV_SEPARATOR};
