//! 元数据定义
//!
//! 提供类型信息以及附着在声明类型上的键值元数据存储

use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 类型信息
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// 类型名称（不含模块路径和泛型参数）
    pub name: String,
    /// 类型ID
    pub id: TypeId,
    /// 完整类型路径
    pub module_path: String,
}

impl TypeInfo {
    /// 从类型获取类型信息
    pub fn of<T: ?Sized + 'static>() -> Self {
        let full_name = std::any::type_name::<T>();
        Self {
            name: short_type_name(full_name).to_string(),
            id: TypeId::of::<T>(),
            module_path: full_name.to_string(),
        }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// `a::b::Foo<c::Bar>` -> `Foo`
fn short_type_name(full_name: &str) -> &str {
    let base = full_name.split('<').next().unwrap_or(full_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// 元数据附着目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataTarget {
    /// 类型本身
    Type(TypeId),
    /// 类型上的某个处理方法
    Method(TypeId, &'static str),
}

impl MetadataTarget {
    /// 类型目标
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeId::of::<T>())
    }

    /// 方法目标
    pub fn method_of<T: ?Sized + 'static>(method: &'static str) -> Self {
        Self::Method(TypeId::of::<T>(), method)
    }
}

type MetadataValue = Arc<dyn Any + Send + Sync>;

/// 元数据存储
///
/// 以 `(目标, 键)` 为单位保存声明阶段写入的注解，扫描阶段读取。
/// 同一 `(目标, 键)` 的写入以最后一次为准，不做合并；
/// 需要累积的多值元数据使用 [`MetadataStore::append`]。
#[derive(Default)]
pub struct MetadataStore {
    entries: DashMap<(MetadataTarget, &'static str), MetadataValue>,
}

impl MetadataStore {
    /// 创建空的元数据存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 定义元数据
    pub fn define<V>(&self, key: &'static str, value: V, target: MetadataTarget)
    where
        V: Any + Send + Sync,
    {
        self.entries.insert((target, key), Arc::new(value));
    }

    /// 读取元数据，不存在或类型不符时返回 `None`
    pub fn read<V>(&self, key: &'static str, target: MetadataTarget) -> Option<V>
    where
        V: Any + Clone,
    {
        self.entries
            .get(&(target, key))
            .and_then(|entry| entry.value().downcast_ref::<V>().cloned())
    }

    /// 读取元数据，不存在时返回默认值
    pub fn read_or_default<V>(&self, key: &'static str, target: MetadataTarget) -> V
    where
        V: Any + Clone + Default,
    {
        self.read(key, target).unwrap_or_default()
    }

    /// 检查元数据是否已定义
    pub fn has(&self, key: &'static str, target: MetadataTarget) -> bool {
        self.entries.contains_key(&(target, key))
    }

    /// 读取已有数组、追加一项后写回
    pub fn append<V>(&self, key: &'static str, target: MetadataTarget, item: V)
    where
        V: Any + Clone + Send + Sync,
    {
        let mut entry = self
            .entries
            .entry((target, key))
            .or_insert_with(|| Arc::new(Vec::<V>::new()) as MetadataValue);
        let mut items = entry
            .value()
            .downcast_ref::<Vec<V>>()
            .cloned()
            .unwrap_or_default();
        items.push(item);
        let value: MetadataValue = Arc::new(items);
        *entry.value_mut() = value;
    }

    /// 删除元数据
    pub fn remove(&self, key: &'static str, target: MetadataTarget) -> bool {
        self.entries.remove(&(target, key)).is_some()
    }

    /// 已定义的元数据条目数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}
