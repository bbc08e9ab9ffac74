//! # DI Common
//!
//! 这个 crate 提供了模块化依赖注入核心的公共类型。
//!
//! ## 核心类型
//!
//! - [`Token`] - 查找提供者的注入令牌
//! - [`TypeInfo`] - 类型标识与名称
//! - [`MetadataStore`] - 声明阶段写入、扫描阶段读取的元数据存储
//! - [`Scope`] - 实例作用域
//! - [`ResolvedDependencies`] - 传给构造函数的已解析依赖
//! - [`DependencyError`] - 扫描与注入阶段的错误
//!
//! ## 设计原则
//!
//! - 显式传递元数据，不依赖运行时反射
//! - 构造参数的令牌逐个声明
//! - 扫描完成后图结构只读

pub mod dependencies;
pub mod errors;
pub mod lifecycle;
pub mod metadata;
pub mod token;

pub use dependencies::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
pub use token::*;
