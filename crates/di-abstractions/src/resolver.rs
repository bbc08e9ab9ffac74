//! 实例解析抽象接口

use async_trait::async_trait;
use di_common::{downcast_instance, DependencyResult, Instance, RequestContext, Token};
use std::any::Any;
use std::sync::Arc;

/// 实例解析器 trait
///
/// 由模块引用和应用上下文实现，服务层通过它按令牌获取实例。
#[async_trait]
pub trait InstanceResolver: Send + Sync {
    /// 按令牌解析实例
    async fn resolve_instance(
        &self,
        token: &Token,
        context: Option<&RequestContext>,
    ) -> DependencyResult<Instance>;
}

/// 类型化解析的扩展方法
#[async_trait]
pub trait InstanceResolverExt: InstanceResolver {
    /// 解析并转换为具体类型
    async fn resolve_as<T>(&self, token: &Token) -> DependencyResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let instance = self.resolve_instance(token, None).await?;
        downcast_instance(instance, token)
    }

    /// 在请求上下文中解析并转换为具体类型
    async fn resolve_in_context<T>(
        &self,
        token: &Token,
        context: &RequestContext,
    ) -> DependencyResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let instance = self.resolve_instance(token, Some(context)).await?;
        downcast_instance(instance, token)
    }
}

impl<R: InstanceResolver + ?Sized> InstanceResolverExt for R {}
