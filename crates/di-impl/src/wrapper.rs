//! 实例包装器
//!
//! 每个已注册的令牌对应一个包装器，保存构造方式、作用域和已创建的实例。

use dashmap::DashMap;
use di_abstractions::{
    Constructor, FactoryFn, MetadataStoreExt, ModuleKey, Provider, ProviderRecipe,
};
use di_common::{DependencyError, DependencyResult, Instance, MetadataStore, Scope, Token, TypeInfo};
use std::fmt;
use tokio::sync::OnceCell;

type FlagCell = once_cell::sync::OnceCell<bool>;
use uuid::Uuid;

/// 已解析的构造方式
#[derive(Clone)]
pub enum Recipe {
    /// 构造函数及其参数令牌
    Class {
        type_info: TypeInfo,
        constructor: Constructor,
        param_tokens: Vec<Token>,
    },
    /// 工厂函数及其参数令牌
    Factory { factory: FactoryFn, inject: Vec<Token> },
    /// 现成的实例
    Value(Instance),
}

impl Recipe {
    /// 从提供者声明解析构造方式和作用域
    ///
    /// 类提供者的构造元数据从存储中读取，缺失时返回 [`DependencyError::InvalidProvider`]。
    pub fn from_provider(provider: &Provider, store: &MetadataStore) -> DependencyResult<(Self, Scope)> {
        match provider.recipe() {
            ProviderRecipe::Class(class) => {
                class.declare(store);
                let type_info = class.type_info().clone();
                let constructor = store.constructor_of(type_info.id).ok_or_else(|| {
                    DependencyError::InvalidProvider {
                        token: provider.token().to_string(),
                        message: format!("{} 不是可构造的类型", type_info.name),
                    }
                })?;
                let param_tokens = store.constructor_tokens_of(&type_info)?;
                let scope = provider
                    .scope()
                    .or_else(|| store.scope_of(type_info.id))
                    .unwrap_or_default();
                Ok((
                    Self::Class {
                        type_info,
                        constructor,
                        param_tokens,
                    },
                    scope,
                ))
            }
            ProviderRecipe::Factory { factory, inject } => Ok((
                Self::Factory {
                    factory: factory.clone(),
                    inject: inject.clone(),
                },
                provider.scope().unwrap_or_default(),
            )),
            // 值提供者总是单例
            ProviderRecipe::Value(value) => Ok((Self::Value(value.clone()), Scope::Default)),
        }
    }

    /// 构造所需的依赖令牌
    pub fn dependencies(&self) -> &[Token] {
        match self {
            Self::Class { param_tokens, .. } => param_tokens,
            Self::Factory { inject, .. } => inject,
            Self::Value(_) => &[],
        }
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class {
                type_info,
                param_tokens,
                ..
            } => f
                .debug_struct("Class")
                .field("type", &type_info.name)
                .field("param_tokens", param_tokens)
                .finish(),
            Self::Factory { inject, .. } => f.debug_struct("Factory").field("inject", inject).finish(),
            Self::Value(_) => f.write_str("Value"),
        }
    }
}

/// 实例包装器
pub struct InstanceWrapper {
    id: Uuid,
    token: Token,
    name: String,
    recipe: Recipe,
    scope: Scope,
    host: ModuleKey,
    instance: OnceCell<Instance>,
    per_context: DashMap<Uuid, Instance>,
    static_tree: FlagCell,
}

impl InstanceWrapper {
    /// 创建包装器，值提供者直接处于已解析状态
    pub fn new(token: Token, recipe: Recipe, scope: Scope, host: ModuleKey) -> Self {
        let instance = match &recipe {
            Recipe::Value(value) => OnceCell::new_with(Some(value.clone())),
            _ => OnceCell::new(),
        };
        let name = match &recipe {
            Recipe::Class { type_info, .. } => type_info.name.clone(),
            _ => token.to_string(),
        };
        Self {
            id: Uuid::new_v4(),
            token,
            name,
            recipe,
            scope,
            host,
            instance,
            per_context: DashMap::new(),
            static_tree: FlagCell::new(),
        }
    }

    /// 从提供者声明创建包装器
    pub fn from_provider(provider: &Provider, store: &MetadataStore, host: ModuleKey) -> DependencyResult<Self> {
        let (recipe, scope) = Recipe::from_provider(provider, store)?;
        Ok(Self::new(provider.token().clone(), recipe, scope, host))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    /// 显示名称：类名，或令牌
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// 所属模块
    pub fn host(&self) -> ModuleKey {
        self.host
    }

    pub fn dependencies(&self) -> &[Token] {
        self.recipe.dependencies()
    }

    pub fn is_transient(&self) -> bool {
        self.scope == Scope::Transient
    }

    /// 单例实例是否已创建
    pub fn is_resolved(&self) -> bool {
        self.instance.initialized()
    }

    /// 已创建的单例实例
    pub fn instance(&self) -> Option<Instance> {
        self.instance.get().cloned()
    }

    pub(crate) fn instance_cell(&self) -> &OnceCell<Instance> {
        &self.instance
    }

    /// 依赖树中是否没有请求作用域的提供者，尚未计算时为 `None`
    pub fn is_static_tree(&self) -> Option<bool> {
        self.static_tree.get().copied()
    }

    pub(crate) fn mark_static_tree(&self, is_static: bool) -> bool {
        *self.static_tree.get_or_init(|| is_static)
    }

    /// 某个请求上下文中的实例
    pub fn context_instance(&self, context: Uuid) -> Option<Instance> {
        self.per_context.get(&context).map(|entry| entry.value().clone())
    }

    /// 缓存请求上下文中的实例，已有实例时保留先写入的那个
    pub(crate) fn store_context_instance(&self, context: Uuid, instance: Instance) -> Instance {
        self.per_context.entry(context).or_insert(instance).value().clone()
    }

    /// 释放某个请求上下文中的实例
    pub fn release_context(&self, context: Uuid) -> bool {
        self.per_context.remove(&context).is_some()
    }
}

impl fmt::Debug for InstanceWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceWrapper")
            .field("token", &self.token)
            .field("recipe", &self.recipe)
            .field("scope", &self.scope)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
