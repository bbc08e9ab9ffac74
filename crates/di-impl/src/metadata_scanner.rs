//! 方法表扫描

use di_abstractions::METHODS_METADATA;
use di_common::{MetadataStore, MetadataTarget};
use indexmap::IndexSet;
use std::any::TypeId;

/// 方法表扫描器
///
/// 遍历类型声明的处理方法，对每个方法调用回调并收集返回值。
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataScanner;

impl MetadataScanner {
    pub fn new() -> Self {
        Self
    }

    /// 类型声明的处理方法，去重后保持声明顺序
    pub fn method_names(&self, store: &MetadataStore, type_id: TypeId) -> Vec<&'static str> {
        let methods: Vec<&'static str> =
            store.read_or_default(METHODS_METADATA, MetadataTarget::Type(type_id));
        methods.into_iter().collect::<IndexSet<_>>().into_iter().collect()
    }

    /// 对每个方法调用回调，返回非空结果
    pub fn scan_from_methods<R, F>(&self, store: &MetadataStore, type_id: TypeId, mut callback: F) -> Vec<R>
    where
        F: FnMut(&'static str) -> Option<R>,
    {
        self.method_names(store, type_id)
            .into_iter()
            .filter_map(|method| callback(method))
            .collect()
    }
}
