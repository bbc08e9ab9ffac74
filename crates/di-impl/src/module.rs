//! 模块节点
//!
//! 模块图中的一个节点，拥有本地的提供者、可注入项、控制器注册表以及导出集合。
//! 相关模块只保存标识，节点本身由 [`Container`] 独占。

use crate::application_config::ApplicationConfig;
use crate::container::Container;
use crate::module_ref::ModuleRef;
use crate::reflector::Reflector;
use crate::wrapper::{InstanceWrapper, Recipe};
use di_abstractions::{ClassRef, Export, ModuleKey, ModuleType, Provider};
use di_common::{DependencyError, DependencyResult, Instance, MetadataStore, Scope, Token};
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

type Registry = RwLock<IndexMap<Token, Arc<InstanceWrapper>>>;

/// 模块节点
pub struct ModuleNode {
    id: Uuid,
    key: ModuleKey,
    metatype: ModuleType,
    scope: Vec<ModuleType>,
    global: bool,
    related_modules: RwLock<IndexSet<ModuleKey>>,
    providers: Registry,
    injectables: Registry,
    controllers: Registry,
    exports: RwLock<IndexSet<Token>>,
    declared_exports: RwLock<IndexSet<Token>>,
}

impl ModuleNode {
    /// 创建模块节点
    pub fn new(key: ModuleKey, metatype: ModuleType, scope: Vec<ModuleType>, global: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            metatype,
            scope,
            global,
            related_modules: RwLock::new(IndexSet::new()),
            providers: RwLock::new(IndexMap::new()),
            injectables: RwLock::new(IndexMap::new()),
            controllers: RwLock::new(IndexMap::new()),
            exports: RwLock::new(IndexSet::new()),
            declared_exports: RwLock::new(IndexSet::new()),
        }
    }

    /// 每个模块都可注入的核心提供者
    pub(crate) fn add_core_providers(
        &self,
        reflector: Arc<Reflector>,
        application_config: Arc<ApplicationConfig>,
        module_ref: ModuleRef,
    ) {
        self.insert_value(Token::of::<Reflector>(), reflector);
        self.insert_value(Token::of::<ApplicationConfig>(), application_config);
        self.insert_value(Token::of::<ModuleRef>(), Arc::new(module_ref));
    }

    fn insert_value(&self, token: Token, instance: Instance) {
        let wrapper = InstanceWrapper::new(token.clone(), Recipe::Value(instance), Scope::Default, self.key);
        self.providers.write().insert(token, Arc::new(wrapper));
    }

    /// 注册提供者，返回其令牌
    ///
    /// 同一令牌再次注册时覆盖先前的提供者。
    pub fn add_provider(&self, provider: &Provider, store: &MetadataStore) -> DependencyResult<Token> {
        let wrapper = InstanceWrapper::from_provider(provider, store, self.key)?;
        let token = provider.token().clone();
        debug!("模块 {} 注册提供者: {} ({})", self.name(), token, wrapper.scope());
        self.providers.write().insert(token.clone(), Arc::new(wrapper));
        Ok(token)
    }

    /// 注册可注入项（增强器、参数管道），已存在时不重复注册
    pub fn add_injectable(&self, class: &ClassRef, store: &MetadataStore) -> DependencyResult<Token> {
        let token = class.token();
        if self.injectables.read().contains_key(&token) {
            return Ok(token);
        }
        let wrapper = InstanceWrapper::from_provider(&Self::class_provider(class), store, self.key)?;
        debug!("模块 {} 注册可注入项: {}", self.name(), token);
        self.injectables.write().insert(token.clone(), Arc::new(wrapper));
        Ok(token)
    }

    /// 注册控制器
    pub fn add_controller(&self, class: &ClassRef, store: &MetadataStore) -> DependencyResult<Token> {
        let wrapper = InstanceWrapper::from_provider(&Self::class_provider(class), store, self.key)?;
        let token = class.token();
        debug!("模块 {} 注册控制器: {}", self.name(), token);
        self.controllers.write().insert(token.clone(), Arc::new(wrapper));
        Ok(token)
    }

    fn class_provider(class: &ClassRef) -> Provider {
        Provider::from_class(class.clone())
    }

    /// 记录模块声明的导出令牌，供导出校验沿导入链查找
    pub(crate) fn set_declared_exports(&self, tokens: impl IntoIterator<Item = Token>) {
        self.declared_exports.write().extend(tokens);
    }

    /// 添加导出项
    ///
    /// 令牌必须是本地提供者、导入的模块，或者可以沿导入链被导出到本模块，
    /// 否则返回 [`DependencyError::UnknownExport`]。
    pub fn add_exported_provider(&self, export: &Export, container: &Container) -> DependencyResult<Token> {
        let token = export.token();
        let mut visited = HashSet::from([self.key]);
        if !self.can_export(&token, container, &mut visited) {
            return Err(DependencyError::UnknownExport {
                module: self.name().to_string(),
                token: token.to_string(),
            });
        }
        self.exports.write().insert(token.clone());
        Ok(token)
    }

    fn can_export(&self, token: &Token, container: &Container, visited: &mut HashSet<ModuleKey>) -> bool {
        if self.has_provider(token) {
            return true;
        }
        self.related_nodes(container).iter().any(|related| {
            related.metatype.token() == *token || related.exports_token(token, container, visited)
        })
    }

    // 本模块是否（直接或经由重新导出的模块）向导入方导出该令牌
    fn exports_token(&self, token: &Token, container: &Container, visited: &mut HashSet<ModuleKey>) -> bool {
        if !visited.insert(self.key) {
            return false;
        }
        let declared = self.declared_exports.read().clone();
        if declared.contains(token) && self.can_export(token, container, visited) {
            return true;
        }
        self.related_nodes(container).iter().any(|related| {
            declared.contains(&related.metatype.token()) && related.exports_token(token, container, visited)
        })
    }

    fn related_nodes(&self, container: &Container) -> Vec<Arc<ModuleNode>> {
        self.related_modules()
            .into_iter()
            .filter_map(|key| container.get_module(key))
            .collect()
    }

    /// 添加相关模块（导入边），已存在时返回 `false`
    pub fn add_related_module(&self, key: ModuleKey) -> bool {
        if key == self.key {
            return false;
        }
        self.related_modules.write().insert(key)
    }

    /// 替换已注册的提供者或可注入项，返回是否找到
    pub fn replace(&self, token: &Token, provider: &Provider, store: &MetadataStore) -> DependencyResult<bool> {
        let provider = provider.clone().with_provide(token.clone());
        for registry in [&self.providers, &self.injectables] {
            if registry.read().contains_key(token) {
                let wrapper = InstanceWrapper::from_provider(&provider, store, self.key)?;
                registry.write().insert(token.clone(), Arc::new(wrapper));
                debug!("模块 {} 替换提供者: {}", self.name(), token);
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> ModuleKey {
        self.key
    }

    pub fn name(&self) -> &str {
        self.metatype.name()
    }

    /// 模块声明类型
    pub fn metatype(&self) -> &ModuleType {
        &self.metatype
    }

    /// 导入链，从根模块开始
    pub fn scope(&self) -> &[ModuleType] {
        &self.scope
    }

    pub fn is_global(&self) -> bool {
        self.global
    }

    pub fn related_modules(&self) -> Vec<ModuleKey> {
        self.related_modules.read().iter().copied().collect()
    }

    pub fn providers(&self) -> IndexMap<Token, Arc<InstanceWrapper>> {
        self.providers.read().clone()
    }

    pub fn injectables(&self) -> IndexMap<Token, Arc<InstanceWrapper>> {
        self.injectables.read().clone()
    }

    pub fn controllers(&self) -> IndexMap<Token, Arc<InstanceWrapper>> {
        self.controllers.read().clone()
    }

    pub fn exports(&self) -> IndexSet<Token> {
        self.exports.read().clone()
    }

    pub fn has_provider(&self, token: &Token) -> bool {
        self.providers.read().contains_key(token)
    }

    pub fn has_export(&self, token: &Token) -> bool {
        self.exports.read().contains(token)
    }

    pub fn get_provider(&self, token: &Token) -> Option<Arc<InstanceWrapper>> {
        self.providers.read().get(token).cloned()
    }

    /// 在提供者、控制器、可注入项中查找
    pub fn find_wrapper(&self, token: &Token) -> Option<Arc<InstanceWrapper>> {
        [&self.providers, &self.controllers, &self.injectables]
            .into_iter()
            .find_map(|registry| registry.read().get(token).cloned())
    }

    /// 所有包装器：提供者、可注入项、控制器
    pub fn wrappers(&self) -> Vec<Arc<InstanceWrapper>> {
        [&self.providers, &self.injectables, &self.controllers]
            .into_iter()
            .flat_map(|registry| registry.read().values().cloned().collect::<Vec<_>>())
            .collect()
    }
}

impl std::fmt::Debug for ModuleNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleNode")
            .field("name", &self.name())
            .field("key", &self.key)
            .field("global", &self.global)
            .field("providers", &self.providers.read().len())
            .field("exports", &*self.exports.read())
            .finish()
    }
}
