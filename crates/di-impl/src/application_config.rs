//! 应用级全局配置
//!
//! 保存通过 `APP_GUARD`、`APP_PIPE`、`APP_FILTER`、`APP_INTERCEPTOR` 注册的全局增强器。
//! 单例作用域的增强器保存实例，瞬时和请求作用域的保存包装器，由服务层按请求解析。

use crate::wrapper::InstanceWrapper;
use di_abstractions::EnhancerKind;
use di_common::Instance;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// 应用级全局配置
#[derive(Debug, Default)]
pub struct ApplicationConfig {
    global: RwLock<HashMap<EnhancerKind, Vec<Instance>>>,
    global_request_scoped: RwLock<HashMap<EnhancerKind, Vec<Arc<InstanceWrapper>>>>,
}

impl ApplicationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加全局增强器实例
    pub fn add_global_enhancer(&self, kind: EnhancerKind, instance: Instance) {
        self.global.write().entry(kind).or_default().push(instance);
    }

    /// 全局增强器实例，按添加顺序
    pub fn global_enhancers(&self, kind: EnhancerKind) -> Vec<Instance> {
        self.global.read().get(&kind).cloned().unwrap_or_default()
    }

    /// 添加按请求解析的全局增强器
    pub fn add_global_request_enhancer(&self, kind: EnhancerKind, wrapper: Arc<InstanceWrapper>) {
        self.global_request_scoped
            .write()
            .entry(kind)
            .or_default()
            .push(wrapper);
    }

    pub fn global_request_enhancers(&self, kind: EnhancerKind) -> Vec<Arc<InstanceWrapper>> {
        self.global_request_scoped
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn global_guards(&self) -> Vec<Instance> {
        self.global_enhancers(EnhancerKind::Guards)
    }

    pub fn global_pipes(&self) -> Vec<Instance> {
        self.global_enhancers(EnhancerKind::Pipes)
    }

    pub fn global_filters(&self) -> Vec<Instance> {
        self.global_enhancers(EnhancerKind::Filters)
    }

    pub fn global_interceptors(&self) -> Vec<Instance> {
        self.global_enhancers(EnhancerKind::Interceptors)
    }
}
