//! 可注入类型
//!
//! 构造参数的令牌必须逐个声明，元数据在声明阶段写入 [`MetadataStore`]。

use crate::constants::{
    CONSTRUCTOR_METADATA, EXCEPTION_FILTERS_METADATA, GUARDS_METADATA, INTERCEPTORS_METADATA,
    METHODS_METADATA, PARAMTYPES_METADATA, PIPES_METADATA, ROUTE_ARGS_METADATA,
    SCOPE_OPTIONS_METADATA, SELF_DECLARED_DEPS_METADATA,
};
use crate::provider::{ClassRef, Constructor};
use di_common::{
    DependencyError, DependencyResult, Instance, MetadataStore, MetadataTarget,
    ResolvedDependencies, Scope, Token, TypeInfo,
};
use std::any::TypeId;
use std::sync::Arc;

/// 可注入类型 trait
///
/// 一般通过 `#[derive(Injectable)]` 自动实现。
///
/// # 示例
///
/// ```rust
/// use di_abstractions::Injectable;
/// use di_common::{DependencyResult, ResolvedDependencies, Token};
/// use std::sync::Arc;
///
/// struct CatsService {
///     prefix: Arc<String>,
/// }
///
/// impl Injectable for CatsService {
///     fn dependencies() -> Vec<Token> {
///         vec![Token::name("PREFIX")]
///     }
///
///     fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
///         Ok(Self { prefix: deps.take()? })
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// 构造参数令牌，按参数顺序
    fn dependencies() -> Vec<Token> {
        Vec::new()
    }

    /// 使用已解析的依赖构造实例
    fn construct(deps: ResolvedDependencies) -> DependencyResult<Self>;

    /// 实例作用域
    fn scope() -> Scope {
        Scope::Default
    }

    /// 声明额外元数据（处理方法、增强器等）
    fn declare_metadata(_store: &MetadataStore) {}
}

/// 把可注入类型的构造元数据写入存储
pub fn define_injectable<T: Injectable>(store: &MetadataStore) {
    let target = MetadataTarget::of::<T>();
    let constructor: Constructor =
        Arc::new(|deps| T::construct(deps).map(|instance| Arc::new(instance) as Instance));
    store.define(CONSTRUCTOR_METADATA, constructor, target);
    store.define(PARAMTYPES_METADATA, T::dependencies(), target);
    store.define(SCOPE_OPTIONS_METADATA, T::scope(), target);
    T::declare_metadata(store);
}

/// 增强器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnhancerKind {
    Guards,
    Interceptors,
    Filters,
    Pipes,
}

impl EnhancerKind {
    /// 所有种类，按扫描顺序
    pub const ALL: [EnhancerKind; 4] = [
        EnhancerKind::Guards,
        EnhancerKind::Interceptors,
        EnhancerKind::Filters,
        EnhancerKind::Pipes,
    ];

    /// 对应的元数据键
    pub fn metadata_key(self) -> &'static str {
        match self {
            Self::Guards => GUARDS_METADATA,
            Self::Interceptors => INTERCEPTORS_METADATA,
            Self::Filters => EXCEPTION_FILTERS_METADATA,
            Self::Pipes => PIPES_METADATA,
        }
    }
}

/// 处理方法参数元数据
#[derive(Clone)]
pub struct RouteParamMetadata {
    /// 参数索引
    pub index: usize,
    /// 绑定到参数上的管道
    pub pipes: Vec<ClassRef>,
}

impl RouteParamMetadata {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            pipes: Vec::new(),
        }
    }

    pub fn with_pipe(mut self, pipe: ClassRef) -> Self {
        self.pipes.push(pipe);
        self
    }
}

/// 元数据存储的声明辅助方法
pub trait MetadataStoreExt {
    /// 写入可注入类型的构造元数据
    fn define_injectable<T: Injectable>(&self);

    /// 覆盖某个构造参数的令牌
    fn define_param_token<T: ?Sized + 'static>(&self, index: usize, token: Token);

    /// 声明处理方法表
    fn define_methods<T: ?Sized + 'static>(&self, methods: &[&'static str]);

    /// 声明增强器（类级别或方法级别）
    fn define_enhancers(&self, target: MetadataTarget, kind: EnhancerKind, enhancers: Vec<ClassRef>);

    /// 声明某个处理方法的参数元数据
    fn define_route_args<T: ?Sized + 'static>(
        &self,
        method: &'static str,
        params: Vec<RouteParamMetadata>,
    );

    /// 读取构造函数
    fn constructor_of(&self, type_id: TypeId) -> Option<Constructor>;

    /// 读取构造参数令牌，已应用按索引覆盖
    ///
    /// 参数覆盖的索引必须落在声明的参数列表内，否则返回 [`DependencyError::InvalidProvider`]。
    fn constructor_tokens_of(&self, type_info: &TypeInfo) -> DependencyResult<Vec<Token>>;

    /// 读取声明的作用域
    fn scope_of(&self, type_id: TypeId) -> Option<Scope>;
}

impl MetadataStoreExt for MetadataStore {
    fn define_injectable<T: Injectable>(&self) {
        define_injectable::<T>(self);
    }

    fn define_param_token<T: ?Sized + 'static>(&self, index: usize, token: Token) {
        self.append(
            SELF_DECLARED_DEPS_METADATA,
            MetadataTarget::of::<T>(),
            (index, token),
        );
    }

    fn define_methods<T: ?Sized + 'static>(&self, methods: &[&'static str]) {
        self.define(METHODS_METADATA, methods.to_vec(), MetadataTarget::of::<T>());
    }

    fn define_enhancers(&self, target: MetadataTarget, kind: EnhancerKind, enhancers: Vec<ClassRef>) {
        self.define(kind.metadata_key(), enhancers, target);
    }

    fn define_route_args<T: ?Sized + 'static>(
        &self,
        method: &'static str,
        params: Vec<RouteParamMetadata>,
    ) {
        self.define(ROUTE_ARGS_METADATA, params, MetadataTarget::method_of::<T>(method));
    }

    fn constructor_of(&self, type_id: TypeId) -> Option<Constructor> {
        self.read(CONSTRUCTOR_METADATA, MetadataTarget::Type(type_id))
    }

    fn constructor_tokens_of(&self, type_info: &TypeInfo) -> DependencyResult<Vec<Token>> {
        let target = MetadataTarget::Type(type_info.id);
        let mut tokens: Vec<Token> = self.read_or_default(PARAMTYPES_METADATA, target);
        let overrides: Vec<(usize, Token)> = self.read_or_default(SELF_DECLARED_DEPS_METADATA, target);
        for (index, token) in overrides {
            let declared = tokens.len();
            let slot = tokens
                .get_mut(index)
                .ok_or_else(|| DependencyError::InvalidProvider {
                    token: type_info.name.clone(),
                    message: format!(
                        "索引 [{index}] 处的参数令牌 {token} 超出了声明的 {declared} 个构造参数"
                    ),
                })?;
            *slot = token;
        }
        Ok(tokens)
    }

    fn scope_of(&self, type_id: TypeId) -> Option<Scope> {
        self.read(SCOPE_OPTIONS_METADATA, MetadataTarget::Type(type_id))
    }
}
