//! 应用上下文

use async_trait::async_trait;
use di_abstractions::{InstanceResolver, ModuleDecl, ModuleKey};
use di_common::{
    downcast_instance, DependencyError, DependencyResult, Instance, RequestContext, Token,
};
use di_impl::{ApplicationConfig, Container, Injector, ModuleRef};
use std::any::Any;
use std::sync::Arc;

/// 应用上下文
///
/// 构建完成的模块图的入口，默认在根模块的作用域中解析。
#[derive(Clone)]
pub struct ApplicationContext {
    container: Arc<Container>,
    root: ModuleKey,
    injector: Injector,
}

impl ApplicationContext {
    pub fn new(container: Arc<Container>, root: ModuleKey) -> Self {
        let injector = Injector::new(container.clone());
        Self {
            container,
            root,
            injector,
        }
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn root(&self) -> ModuleKey {
        self.root
    }

    /// 全局增强器
    pub fn application_config(&self) -> &Arc<ApplicationConfig> {
        self.container.application_config()
    }

    fn module_ref(&self, module: ModuleKey) -> ModuleRef {
        ModuleRef::new(Arc::downgrade(&self.container), module)
    }

    /// 在任意模块中获取已创建的实例
    pub fn get<T>(&self, token: impl Into<Token>) -> DependencyResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.module_ref(self.root).find(token)
    }

    /// 在根模块的作用域中解析实例，必要时创建
    pub async fn resolve<T>(&self, token: impl Into<Token>) -> DependencyResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.resolve_in_context(token, None).await
    }

    /// 在请求上下文中解析实例
    pub async fn resolve_in_context<T>(
        &self,
        token: impl Into<Token>,
        context: Option<&RequestContext>,
    ) -> DependencyResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let token = token.into();
        let instance = self.resolve_instance(&token, context).await?;
        downcast_instance(instance, &token)
    }

    /// 选择某个模块，之后的查找限定在该模块内
    pub fn select<M: ModuleDecl>(&self) -> DependencyResult<ModuleRef> {
        let module = self
            .container
            .get_module_by_type::<M>()
            .ok_or_else(|| DependencyError::UnknownModule {
                module: std::any::type_name::<M>().to_string(),
            })?;
        Ok(self.module_ref(module.key()))
    }

    /// 释放请求上下文中缓存的实例
    pub fn release_context(&self, context: &RequestContext) -> usize {
        self.injector.release_context(context)
    }
}

#[async_trait]
impl InstanceResolver for ApplicationContext {
    async fn resolve_instance(
        &self,
        token: &Token,
        context: Option<&RequestContext>,
    ) -> DependencyResult<Instance> {
        self.injector.resolve_in(token, self.root, context).await
    }
}

impl std::fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("root", &self.root)
            .field("modules", &self.container.get_modules().len())
            .finish()
    }
}
