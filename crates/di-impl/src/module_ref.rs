//! 模块引用
//!
//! 注入到每个模块的核心提供者，保存对容器的弱引用和所属模块的标识，
//! 用于在运行时按令牌获取或创建实例。

use crate::container::Container;
use crate::injector::Injector;
use crate::wrapper::{InstanceWrapper, Recipe};
use async_trait::async_trait;
use di_abstractions::{define_injectable, Injectable, InstanceResolver, MetadataStoreExt, ModuleKey};
use di_common::{
    downcast_instance, DependencyError, DependencyResult, Instance, RequestContext, Scope, Token,
    TypeInfo,
};
use std::any::Any;
use std::sync::{Arc, Weak};

/// 模块引用
#[derive(Clone)]
pub struct ModuleRef {
    container: Weak<Container>,
    module: ModuleKey,
}

impl ModuleRef {
    pub fn new(container: Weak<Container>, module: ModuleKey) -> Self {
        Self { container, module }
    }

    /// 所属模块
    pub fn module(&self) -> ModuleKey {
        self.module
    }

    fn container(&self) -> DependencyResult<Arc<Container>> {
        self.container
            .upgrade()
            .ok_or_else(|| DependencyError::UnknownModule {
                module: format!("{:?}", self.module),
            })
    }

    /// 在本模块中获取已创建的实例
    pub fn get<T>(&self, token: impl Into<Token>) -> DependencyResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let token = token.into();
        let container = self.container()?;
        let module = container.require_module(self.module)?;
        let instance = module
            .find_wrapper(&token)
            .and_then(|wrapper| wrapper.instance())
            .ok_or_else(|| DependencyError::UnknownToken {
                token: token.to_string(),
                module: module.name().to_string(),
            })?;
        downcast_instance(instance, &token)
    }

    /// 在所有模块中查找已创建的实例
    pub fn find<T>(&self, token: impl Into<Token>) -> DependencyResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let token = token.into();
        let container = self.container()?;
        let instance = container
            .get_modules()
            .iter()
            .filter_map(|module| module.find_wrapper(&token))
            .find_map(|wrapper| wrapper.instance())
            .ok_or_else(|| DependencyError::UnknownToken {
                token: token.to_string(),
                module: "*".to_string(),
            })?;
        downcast_instance(instance, &token)
    }

    /// 按可见性规则解析实例，必要时创建
    pub async fn resolve<T>(&self, token: impl Into<Token>) -> DependencyResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let token = token.into();
        let instance = self.resolve_instance(&token, None).await?;
        downcast_instance(instance, &token)
    }

    /// 使用本模块的依赖创建一个未注册类型的新实例
    pub async fn create<T: Injectable>(&self) -> DependencyResult<Arc<T>> {
        let container = self.container()?;
        if container.metadata().constructor_of(std::any::TypeId::of::<T>()).is_none() {
            define_injectable::<T>(container.metadata());
        }
        let info = TypeInfo::of::<T>();
        let token = Token::Type(info.clone());
        let instance = self.create_by_type(info).await?;
        downcast_instance(instance, &token)
    }

    /// 按类型标识创建实例，构造元数据必须已写入
    pub async fn create_by_type(&self, type_info: TypeInfo) -> DependencyResult<Instance> {
        let container = self.container()?;
        let store = container.metadata();
        let constructor = store
            .constructor_of(type_info.id)
            .ok_or_else(|| DependencyError::InvalidClass {
                type_name: type_info.name.clone(),
            })?;
        let param_tokens = store.constructor_tokens_of(&type_info)?;
        let wrapper = InstanceWrapper::new(
            Token::Type(type_info.clone()),
            Recipe::Class {
                type_info,
                constructor,
                param_tokens,
            },
            Scope::Transient,
            self.module,
        );
        Injector::new(container)
            .load_wrapper(&Arc::new(wrapper), None)
            .await
    }
}

#[async_trait]
impl InstanceResolver for ModuleRef {
    async fn resolve_instance(
        &self,
        token: &Token,
        context: Option<&RequestContext>,
    ) -> DependencyResult<Instance> {
        let container = self.container()?;
        Injector::new(container)
            .resolve_in(token, self.module, context)
            .await
    }
}

impl std::fmt::Debug for ModuleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRef").field("module", &self.module).finish()
    }
}
