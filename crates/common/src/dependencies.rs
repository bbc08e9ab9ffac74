//! 实例与已解析依赖

use crate::errors::{DependencyError, DependencyResult};
use crate::token::Token;
use std::any::Any;
use std::sync::Arc;

/// 容器中保存的实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 把实例转换为具体类型
pub fn downcast_instance<T>(instance: Instance, token: &Token) -> DependencyResult<Arc<T>>
where
    T: Any + Send + Sync,
{
    instance
        .downcast::<T>()
        .map_err(|_| DependencyError::TypeMismatch {
            token: token.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
}

/// 已解析的构造参数
///
/// 按声明顺序保存，传给构造函数或工厂函数。
#[derive(Clone)]
pub struct ResolvedDependencies {
    owner: String,
    items: Vec<(Token, Instance)>,
    cursor: usize,
}

impl ResolvedDependencies {
    /// 创建参数集合
    pub fn new(owner: impl Into<String>, items: Vec<(Token, Instance)>) -> Self {
        Self {
            owner: owner.into(),
            items,
            cursor: 0,
        }
    }

    /// 空参数集合
    pub fn empty(owner: impl Into<String>) -> Self {
        Self::new(owner, Vec::new())
    }

    /// 参数所属的类型名称
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 按索引读取参数
    pub fn get<T>(&self, index: usize) -> DependencyResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let (token, instance) =
            self.items
                .get(index)
                .ok_or_else(|| DependencyError::MissingDependency {
                    owner: self.owner.clone(),
                    index,
                })?;
        downcast_instance(instance.clone(), token)
    }

    /// 依次取出下一个参数
    pub fn take<T>(&mut self) -> DependencyResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let value = self.get::<T>(self.cursor)?;
        self.cursor += 1;
        Ok(value)
    }

    /// 原始实例
    pub fn raw(&self, index: usize) -> Option<&Instance> {
        self.items.get(index).map(|(_, instance)| instance)
    }

    /// 参数令牌列表
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.items.iter().map(|(token, _)| token)
    }
}

impl std::fmt::Debug for ResolvedDependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedDependencies")
            .field("owner", &self.owner)
            .field("tokens", &self.tokens().collect::<Vec<_>>())
            .field("cursor", &self.cursor)
            .finish()
    }
}
