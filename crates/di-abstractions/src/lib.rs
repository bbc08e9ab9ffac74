//! # Dependency Injection Abstractions
//!
//! 依赖注入声明层，定义模块、提供者与可注入类型的声明方式。
//!
//! ## 核心类型
//!
//! - [`ModuleDecl`] / [`ModuleMetadata`] - 模块声明
//! - [`DynamicModule`] / [`ForwardRef`] - 动态模块与延迟引用
//! - [`Provider`] / [`ProviderRecipe`] - 提供者与构造方式
//! - [`Injectable`] - 可注入类型
//! - [`InstanceResolver`] - 实例解析接口

pub mod constants;
pub mod injectable;
pub mod module;
pub mod provider;
pub mod resolver;

pub use constants::*;
pub use injectable::*;
pub use module::*;
pub use provider::*;
pub use resolver::*;

// 派生宏生成的代码通过这里引用公共类型
#[doc(hidden)]
pub use di_common as __private;
