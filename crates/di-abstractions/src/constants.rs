//! 元数据键与扩展点令牌

use di_common::Token;

/// 模块导入列表
pub const METADATA_IMPORTS: &str = "imports";
/// 模块导出列表
pub const METADATA_EXPORTS: &str = "exports";
/// 模块提供者列表
pub const METADATA_PROVIDERS: &str = "providers";
/// 模块控制器列表
pub const METADATA_CONTROLLERS: &str = "controllers";
/// 全局模块标记
pub const GLOBAL_MODULE_METADATA: &str = "global";

/// 构造参数令牌（类型默认声明）
pub const PARAMTYPES_METADATA: &str = "paramtypes";
/// 构造参数令牌覆盖（按索引）
pub const SELF_DECLARED_DEPS_METADATA: &str = "self:paramtypes";
/// 构造函数
pub const CONSTRUCTOR_METADATA: &str = "constructor";
/// 作用域选项
pub const SCOPE_OPTIONS_METADATA: &str = "scope";

/// 处理方法表
pub const METHODS_METADATA: &str = "methods";
pub const GUARDS_METADATA: &str = "guards";
pub const INTERCEPTORS_METADATA: &str = "interceptors";
pub const EXCEPTION_FILTERS_METADATA: &str = "filters";
pub const PIPES_METADATA: &str = "pipes";
/// 处理方法参数元数据
pub const ROUTE_ARGS_METADATA: &str = "route_args";

pub const APP_GUARD: &str = "APP_GUARD";
pub const APP_PIPE: &str = "APP_PIPE";
pub const APP_FILTER: &str = "APP_FILTER";
pub const APP_INTERCEPTOR: &str = "APP_INTERCEPTOR";

/// 应用级扩展点令牌
pub fn application_provider_tokens() -> [Token; 4] {
    [
        Token::name(APP_INTERCEPTOR),
        Token::name(APP_PIPE),
        Token::name(APP_GUARD),
        Token::name(APP_FILTER),
    ]
}
