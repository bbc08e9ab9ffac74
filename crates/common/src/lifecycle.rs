//! 实例作用域与请求上下文

use serde::{Deserialize, Serialize};

/// 实例作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// 默认模式 - 整个应用内只创建一个实例
    Default,
    /// 瞬时模式 - 每次注入都创建新实例
    Transient,
    /// 请求模式 - 每个请求处理管道创建一个实例
    Request,
}

impl Default for Scope {
    fn default() -> Self {
        Self::Default
    }
}

impl Scope {
    /// 实例是否在包装器中缓存
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Default => "default",
            Self::Transient => "transient",
            Self::Request => "request",
        };
        f.write_str(name)
    }
}

/// 请求上下文
///
/// 请求作用域的实例按上下文标识缓存，不同请求之间从不共享。
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: uuid::Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl RequestContext {
    /// 创建新的请求上下文
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            created_at: chrono::Utc::now(),
        }
    }
}

impl PartialEq for RequestContext {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RequestContext {}
