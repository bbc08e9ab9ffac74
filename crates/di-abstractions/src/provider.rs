//! 提供者声明
//!
//! 提供者 = 令牌 + 构造方式（类、工厂或现成的值）。

use crate::injectable::{define_injectable, Injectable, MetadataStoreExt};
use di_common::{
    DependencyResult, Instance, MetadataStore, ResolvedDependencies, Scope, Token, TypeInfo,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// 类构造函数
pub type Constructor = Arc<dyn Fn(ResolvedDependencies) -> DependencyResult<Instance> + Send + Sync>;

/// 工厂函数，同步工厂也包装为 future
pub type FactoryFn =
    Arc<dyn Fn(ResolvedDependencies) -> BoxFuture<'static, DependencyResult<Instance>> + Send + Sync>;

/// 类引用
///
/// 指向一个可构造的类型。通过 [`ClassRef::of`] 创建时携带元数据声明函数，
/// 扫描器注册时先把构造元数据写入存储；[`ClassRef::by_type`] 只有类型标识，
/// 构造元数据必须已经由别处写入。
#[derive(Clone)]
pub struct ClassRef {
    type_info: TypeInfo,
    declare: Option<fn(&MetadataStore)>,
}

impl ClassRef {
    /// 可注入类型的引用
    pub fn of<T: Injectable>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            declare: Some(define_injectable::<T> as fn(&MetadataStore)),
        }
    }

    /// 仅按类型标识引用
    pub fn by_type(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            declare: None,
        }
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// 类型令牌
    pub fn token(&self) -> Token {
        Token::Type(self.type_info.clone())
    }

    /// 把构造元数据写入存储，已写入时不重复
    pub fn declare(&self, store: &MetadataStore) {
        if let Some(declare) = self.declare {
            if store.constructor_of(self.type_info.id).is_none() {
                declare(store);
            }
        }
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassRef").field(&self.type_info.name).finish()
    }
}

/// 提供者的构造方式
#[derive(Clone)]
pub enum ProviderRecipe {
    /// 调用构造函数，参数按令牌递归解析
    Class(ClassRef),
    /// 调用工厂函数，参数为 `inject` 中的令牌
    Factory { factory: FactoryFn, inject: Vec<Token> },
    /// 现成的实例
    Value(Instance),
}

impl ProviderRecipe {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Class(_) => "class",
            Self::Factory { .. } => "factory",
            Self::Value(_) => "value",
        }
    }
}

impl fmt::Debug for ProviderRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => f.debug_tuple("Class").field(class).finish(),
            Self::Factory { inject, .. } => f.debug_struct("Factory").field("inject", inject).finish(),
            Self::Value(_) => f.write_str("Value"),
        }
    }
}

/// 提供者声明
///
/// # 示例
///
/// ```rust
/// use di_abstractions::Provider;
/// use di_common::Token;
///
/// let port = Provider::use_value("PORT", 8080u16);
/// let url = Provider::use_factory("URL", vec![Token::name("PORT")], |mut deps| {
///     let port = deps.take::<u16>()?;
///     Ok(format!("http://localhost:{}", port))
/// });
/// assert_eq!(port.token(), &Token::name("PORT"));
/// assert!(url.is_custom());
/// ```
#[derive(Clone, Debug)]
pub struct Provider {
    provide: Token,
    recipe: ProviderRecipe,
    scope: Option<Scope>,
    custom: bool,
}

impl Provider {
    /// 以类型自身为令牌的类提供者
    pub fn class<T: Injectable>() -> Self {
        Self::from_class(ClassRef::of::<T>())
    }

    /// 仅按类型标识声明的类提供者
    pub fn type_ref(type_info: TypeInfo) -> Self {
        Self::from_class(ClassRef::by_type(type_info))
    }

    /// 以类引用自身为令牌
    pub fn from_class(class: ClassRef) -> Self {
        Self {
            provide: class.token(),
            recipe: ProviderRecipe::Class(class),
            scope: None,
            custom: false,
        }
    }

    /// `{ provide, useClass }`
    pub fn use_class<T: Injectable>(provide: impl Into<Token>) -> Self {
        Self {
            provide: provide.into(),
            recipe: ProviderRecipe::Class(ClassRef::of::<T>()),
            scope: None,
            custom: true,
        }
    }

    /// `{ provide, useValue }`
    pub fn use_value<V>(provide: impl Into<Token>, value: V) -> Self
    where
        V: Any + Send + Sync,
    {
        Self::use_instance(provide, Arc::new(value))
    }

    /// 使用已经包装好的实例
    pub fn use_instance(provide: impl Into<Token>, instance: Instance) -> Self {
        Self {
            provide: provide.into(),
            recipe: ProviderRecipe::Value(instance),
            scope: None,
            custom: true,
        }
    }

    /// `{ provide, useFactory, inject }`，同步工厂
    pub fn use_factory<V, F>(provide: impl Into<Token>, inject: Vec<Token>, factory: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(ResolvedDependencies) -> DependencyResult<V> + Send + Sync + 'static,
    {
        let factory: FactoryFn = Arc::new(move |deps| {
            let result = factory(deps).map(|value| Arc::new(value) as Instance);
            futures::future::ready(result).boxed()
        });
        Self::factory(provide, inject, factory)
    }

    /// `{ provide, useFactory, inject }`，异步工厂
    pub fn use_async_factory<V, F, Fut>(provide: impl Into<Token>, inject: Vec<Token>, factory: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(ResolvedDependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DependencyResult<V>> + Send + 'static,
    {
        let factory: FactoryFn = Arc::new(move |deps| {
            factory(deps)
                .map(|result| result.map(|value| Arc::new(value) as Instance))
                .boxed()
        });
        Self::factory(provide, inject, factory)
    }

    fn factory(provide: impl Into<Token>, inject: Vec<Token>, factory: FactoryFn) -> Self {
        Self {
            provide: provide.into(),
            recipe: ProviderRecipe::Factory { factory, inject },
            scope: None,
            custom: true,
        }
    }

    /// 指定作用域，覆盖类型声明的作用域
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// 以新令牌重新声明同一构造方式
    pub fn with_provide(mut self, provide: impl Into<Token>) -> Self {
        self.provide = provide.into();
        self
    }

    pub fn token(&self) -> &Token {
        &self.provide
    }

    pub fn recipe(&self) -> &ProviderRecipe {
        &self.recipe
    }

    pub fn scope(&self) -> Option<Scope> {
        self.scope
    }

    /// 是否为 `{ provide, ... }` 形式的自定义提供者
    pub fn is_custom(&self) -> bool {
        self.custom
    }
}
