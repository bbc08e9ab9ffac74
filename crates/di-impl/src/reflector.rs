//! 元数据读取器
//!
//! 作为核心提供者注入到每个模块，供增强器在运行时读取声明阶段写入的元数据。

use di_common::{MetadataStore, MetadataTarget};
use std::any::Any;
use std::sync::Arc;

/// 元数据读取器
#[derive(Debug, Clone)]
pub struct Reflector {
    store: Arc<MetadataStore>,
}

impl Reflector {
    pub fn new(store: Arc<MetadataStore>) -> Self {
        Self { store }
    }

    /// 读取单个目标上的元数据
    pub fn get<V>(&self, key: &'static str, target: MetadataTarget) -> Option<V>
    where
        V: Any + Clone,
    {
        self.store.read(key, target)
    }

    /// 按顺序读取多个目标上的元数据，缺失的目标跳过
    pub fn get_all<V>(&self, key: &'static str, targets: &[MetadataTarget]) -> Vec<V>
    where
        V: Any + Clone,
    {
        targets
            .iter()
            .filter_map(|target| self.store.read(key, *target))
            .collect()
    }

    /// 读取多个目标上的数组元数据并拼接
    pub fn get_all_and_merge<V>(&self, key: &'static str, targets: &[MetadataTarget]) -> Vec<V>
    where
        V: Any + Clone,
    {
        self.get_all::<Vec<V>>(key, targets).into_iter().flatten().collect()
    }

    /// 返回第一个定义了该元数据的目标上的值
    pub fn get_all_and_override<V>(&self, key: &'static str, targets: &[MetadataTarget]) -> Option<V>
    where
        V: Any + Clone,
    {
        targets.iter().find_map(|target| self.store.read(key, *target))
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }
}
