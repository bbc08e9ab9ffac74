//! # 依赖注入具体实现
//!
//! 提供模块图的扫描、容器、注入器与实例加载器。
//!
//! ## 启动流程
//!
//! ```text
//! 模块声明 -> 元数据存储 -> DependenciesScanner（构建模块图）
//!          -> InstanceLoader（创建实例）-> 冻结的 Container
//! ```
//!
//! ## 示例
//!
//! ```rust
//! use di_abstractions::{ModuleDecl, ModuleMetadata, ModuleType, Provider};
//! use di_impl::{Container, ContainerConfig, DependenciesScanner, InstanceLoader};
//! use di_common::Token;
//!
//! struct AppModule;
//!
//! impl ModuleDecl for AppModule {
//!     fn metadata() -> ModuleMetadata {
//!         ModuleMetadata::new().provider(Provider::use_value("GREETING", "hello"))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let container = Container::new(ContainerConfig::default());
//! DependenciesScanner::new(container.clone())
//!     .scan(&ModuleType::of::<AppModule>())
//!     .unwrap();
//! let loader = InstanceLoader::new(container.clone());
//! loader.create_instances_of_dependencies().await.unwrap();
//!
//! let module = container.get_module_by_type::<AppModule>().unwrap();
//! let greeting = loader
//!     .injector()
//!     .resolve(&Token::name("GREETING"), module.key())
//!     .await
//!     .unwrap();
//! assert_eq!(*greeting.downcast::<&str>().unwrap(), "hello");
//! # }
//! ```

pub mod application_config;
pub mod config;
pub mod container;
pub mod injector;
pub mod instance_loader;
pub mod metadata_scanner;
pub mod module;
pub mod module_ref;
pub mod reflector;
pub mod scanner;
pub mod wrapper;

pub use application_config::ApplicationConfig;
pub use config::ContainerConfig;
pub use container::Container;
pub use injector::Injector;
pub use instance_loader::InstanceLoader;
pub use metadata_scanner::MetadataScanner;
pub use module::ModuleNode;
pub use module_ref::ModuleRef;
pub use reflector::Reflector;
pub use scanner::DependenciesScanner;
pub use wrapper::{InstanceWrapper, Recipe};
