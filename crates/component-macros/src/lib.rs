//! # Component Macros
//!
//! 这个 crate 提供了自动实现 `Injectable` 的派生宏。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use component_macros::Injectable;
//! use std::sync::Arc;
//!
//! #[derive(Injectable)]
//! #[injectable(transient)]
//! pub struct CatsService {
//!     #[inject]
//!     repository: Arc<CatsRepository>,
//!     #[inject(token = "PREFIX")]
//!     prefix: Arc<String>,
//!     hits: usize,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod injectable;
mod utils;

/// 可注入类型派生宏
///
/// 为结构体实现 `di_abstractions::Injectable`。
///
/// # 结构体参数
///
/// - `default` / `transient` / `request` - 实例作用域（默认为 `default`）
/// - `scope = "transient"` - 同上的另一种写法
/// - `methods(find_all, create)` - 声明处理方法，供增强器扫描使用
///
/// # 字段参数
///
/// - `#[inject]` - 按 `Arc<T>` 中 `T` 的类型令牌注入
/// - `#[inject(token = "NAME")]` - 按字符串令牌注入
/// - `#[inject(type = Path)]` - 按另一个类型的令牌注入，字段类型仍是 `Arc<T>`
///
/// 没有 `#[inject]` 的字段使用 `Default::default()` 初始化。
/// 注入顺序就是字段声明顺序。
#[proc_macro_derive(Injectable, attributes(injectable, inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::derive_injectable_impl(input)
}
