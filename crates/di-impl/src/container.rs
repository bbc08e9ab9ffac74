//! 模块容器
//!
//! 按标识保存所有模块节点，并持有注入到每个模块的核心单例。

use crate::application_config::ApplicationConfig;
use crate::config::ContainerConfig;
use crate::module::ModuleNode;
use crate::module_ref::ModuleRef;
use crate::reflector::Reflector;
use di_abstractions::{Import, ModuleDecl, ModuleKey, ModuleMetadata, ModuleType, Provider};
use di_common::{DependencyError, DependencyResult, MetadataStore, Token};
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// 模块容器
pub struct Container {
    self_ref: Weak<Container>,
    modules: RwLock<IndexMap<ModuleKey, Arc<ModuleNode>>>,
    global_modules: RwLock<IndexSet<ModuleKey>>,
    dynamic_metadata: RwLock<HashMap<ModuleKey, ModuleMetadata>>,
    metadata: Arc<MetadataStore>,
    reflector: Arc<Reflector>,
    application_config: Arc<ApplicationConfig>,
    config: ContainerConfig,
    frozen: AtomicBool,
}

impl Container {
    /// 创建容器，使用新的元数据存储
    pub fn new(config: ContainerConfig) -> Arc<Self> {
        Self::with_metadata(Arc::new(MetadataStore::new()), config)
    }

    /// 使用已有的元数据存储创建容器
    pub fn with_metadata(metadata: Arc<MetadataStore>, config: ContainerConfig) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            modules: RwLock::new(IndexMap::new()),
            global_modules: RwLock::new(IndexSet::new()),
            dynamic_metadata: RwLock::new(HashMap::new()),
            reflector: Arc::new(Reflector::new(metadata.clone())),
            metadata,
            application_config: Arc::new(ApplicationConfig::new()),
            config,
            frozen: AtomicBool::new(false),
        })
    }

    /// 注册模块
    ///
    /// 同一声明重复注册时返回已有节点，第二个返回值为 `false`。
    /// 延迟引用在这里解析，解析为空时返回 [`DependencyError::CircularDependency`]。
    pub fn add_module(
        &self,
        import: &Import,
        scope: Vec<ModuleType>,
    ) -> DependencyResult<(Arc<ModuleNode>, bool)> {
        self.ensure_mutable("add_module")?;
        let unresolved = || DependencyError::CircularDependency {
            context: scope
                .last()
                .map(|module| module.name().to_string())
                .unwrap_or_default(),
            chain: scope
                .iter()
                .map(|module| module.name())
                .collect::<Vec<_>>()
                .join(" -> "),
        };
        let import = import.resolve().ok_or_else(unresolved)?;
        let (Some(key), Some(metatype)) = (import.key(), import.module_type().cloned()) else {
            return Err(unresolved());
        };
        if let Some(existing) = self.get_module(key) {
            return Ok((existing, false));
        }

        metatype.declare(&self.metadata);
        let mut global = ModuleMetadata::read(&self.metadata, metatype.target()).global;
        if let Import::Dynamic(dynamic) = &import {
            global |= dynamic.metadata().global;
            self.dynamic_metadata
                .write()
                .insert(key, dynamic.metadata().clone());
        }

        let node = Arc::new(ModuleNode::new(key, metatype, scope, global));
        node.add_core_providers(
            self.reflector.clone(),
            self.application_config.clone(),
            ModuleRef::new(self.self_ref.clone(), key),
        );
        self.modules.write().insert(key, node.clone());
        if global {
            self.global_modules.write().insert(key);
        }
        debug!("注册模块: {} (global: {})", node.name(), global);
        Ok((node, true))
    }

    /// 模块的有效元数据：声明类型的元数据加上动态模块追加的部分
    pub fn module_metadata(&self, key: ModuleKey) -> DependencyResult<ModuleMetadata> {
        let node = self.require_module(key)?;
        let metadata = ModuleMetadata::read(&self.metadata, node.metatype().target());
        Ok(match self.dynamic_metadata.read().get(&key) {
            Some(dynamic) => metadata.merge(dynamic),
            None => metadata,
        })
    }

    /// 所有模块，按注册顺序
    pub fn get_modules(&self) -> Vec<Arc<ModuleNode>> {
        self.modules.read().values().cloned().collect()
    }

    pub fn get_module(&self, key: ModuleKey) -> Option<Arc<ModuleNode>> {
        self.modules.read().get(&key).cloned()
    }

    pub(crate) fn require_module(&self, key: ModuleKey) -> DependencyResult<Arc<ModuleNode>> {
        self.get_module(key)
            .ok_or_else(|| DependencyError::UnknownModule {
                module: format!("{:?}", key),
            })
    }

    /// 按声明类型查找静态模块
    pub fn get_module_by_type<M: ModuleDecl>(&self) -> Option<Arc<ModuleNode>> {
        self.get_module(ModuleKey::Static(TypeId::of::<M>()))
    }

    pub fn has_module(&self, key: ModuleKey) -> bool {
        self.modules.read().contains_key(&key)
    }

    pub fn is_global_module(&self, key: ModuleKey) -> bool {
        self.global_modules.read().contains(&key)
    }

    pub fn global_modules(&self) -> Vec<Arc<ModuleNode>> {
        self.global_modules
            .read()
            .iter()
            .filter_map(|key| self.get_module(*key))
            .collect()
    }

    /// 为每个模块添加指向全局模块的相关模块边
    pub fn bind_global_scope(&self) {
        let globals = self.global_modules();
        for module in self.get_modules() {
            for global in &globals {
                module.add_related_module(global.key());
            }
        }
        info!("全局模块已绑定: {} 个", globals.len());
    }

    /// 在所有模块中替换已注册的提供者
    ///
    /// 应在实例加载之前调用，构造循环检查和依赖树作用域都在加载时确定。
    pub fn replace(&self, token: &Token, provider: &Provider) -> DependencyResult<()> {
        self.ensure_mutable("replace")?;
        let mut replaced = false;
        for module in self.get_modules() {
            replaced |= module.replace(token, provider, &self.metadata)?;
        }
        if !replaced {
            return Err(DependencyError::UnknownToken {
                token: token.to_string(),
                module: "*".to_string(),
            });
        }
        Ok(())
    }

    /// 冻结容器，之后不再允许结构性修改
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
        info!("容器已冻结");
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    fn ensure_mutable(&self, operation: &str) -> DependencyResult<()> {
        if self.is_frozen() {
            return Err(DependencyError::ContainerFrozen {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    pub fn metadata(&self) -> &Arc<MetadataStore> {
        &self.metadata
    }

    pub fn reflector(&self) -> &Arc<Reflector> {
        &self.reflector
    }

    pub fn application_config(&self) -> &Arc<ApplicationConfig> {
        &self.application_config
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("modules", &self.modules.read().len())
            .field("global_modules", &self.global_modules.read().len())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}
