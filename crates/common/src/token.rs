//! 注入令牌
//!
//! 令牌是查找提供者的不透明标识：类型、字符串或符号。

use crate::metadata::TypeInfo;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// 符号令牌
///
/// 每个符号都有独立的标识，描述相同的两个符号互不相等。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    id: uuid::Uuid,
    description: Arc<str>,
}

impl Symbol {
    /// 创建新的符号
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            description: description.into(),
        }
    }

    /// 符号描述
    pub fn description(&self) -> &str {
        &self.description
    }

    /// 符号标识
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

/// 注入令牌
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// 类型标识
    Type(TypeInfo),
    /// 字符串
    Name(Arc<str>),
    /// 符号
    Symbol(Symbol),
}

impl Token {
    /// 类型令牌
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeInfo::of::<T>())
    }

    /// 字符串令牌
    pub fn name(name: impl Into<Arc<str>>) -> Self {
        Self::Name(name.into())
    }

    /// 新建符号令牌
    pub fn symbol(description: impl Into<Arc<str>>) -> Self {
        Self::Symbol(Symbol::new(description))
    }

    /// 是否为原始令牌（字符串或符号）
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Type(_))
    }

    /// 类型令牌对应的 `TypeId`
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Self::Type(info) => Some(info.id),
            _ => None,
        }
    }

    /// 类型令牌对应的类型信息
    pub fn type_info(&self) -> Option<&TypeInfo> {
        match self {
            Self::Type(info) => Some(info),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(info) => f.write_str(info.short_name()),
            Self::Name(name) => f.write_str(name),
            Self::Symbol(symbol) => symbol.fmt(f),
        }
    }
}

impl From<&str> for Token {
    fn from(name: &str) -> Self {
        Self::name(name)
    }
}

impl From<String> for Token {
    fn from(name: String) -> Self {
        Self::name(name)
    }
}

impl From<Symbol> for Token {
    fn from(symbol: Symbol) -> Self {
        Self::Symbol(symbol)
    }
}

impl From<TypeInfo> for Token {
    fn from(info: TypeInfo) -> Self {
        Self::Type(info)
    }
}

impl From<&Token> for Token {
    fn from(token: &Token) -> Self {
        token.clone()
    }
}
