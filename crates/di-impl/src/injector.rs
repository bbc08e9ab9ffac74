//! 注入器
//!
//! 按令牌在模块作用域内查找提供者，递归解析构造参数并创建实例。
//!
//! 查找顺序：
//! 1. 模块自身的提供者
//! 2. 相关模块（导入的模块、全局模块）中既导出又提供该令牌的模块，
//!    并沿着被重新导出的模块继续查找，先找到者优先
//!
//! 构造循环通过每次解析携带的包装器链检测，模块之间的循环导入不受影响。
//! 依赖树中含有请求作用域提供者的默认作用域提供者按请求作用域缓存。

use crate::container::Container;
use crate::module::ModuleNode;
use crate::wrapper::{InstanceWrapper, Recipe};
use di_common::{
    DependencyError, DependencyResult, Instance, RequestContext, ResolvedDependencies, Scope, Token,
};
use di_abstractions::ModuleKey;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 单次解析经过的包装器链
#[derive(Debug, Clone, Default)]
struct ResolutionPath {
    chain: Vec<(Uuid, String)>,
}

impl ResolutionPath {
    fn contains(&self, id: Uuid) -> bool {
        self.chain.iter().any(|(seen, _)| *seen == id)
    }

    fn depth(&self) -> usize {
        self.chain.len()
    }

    fn push(&self, wrapper: &InstanceWrapper) -> Self {
        let mut chain = self.chain.clone();
        chain.push((wrapper.id(), wrapper.name().to_string()));
        Self { chain }
    }

    fn describe(&self, last: &str) -> String {
        self.chain
            .iter()
            .map(|(_, name)| name.as_str())
            .chain(std::iter::once(last))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// 注入器
#[derive(Debug, Clone)]
pub struct Injector {
    container: Arc<Container>,
    max_depth: usize,
}

impl Injector {
    pub fn new(container: Arc<Container>) -> Self {
        let max_depth = container.config().max_resolution_depth;
        Self {
            container,
            max_depth,
        }
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// 在模块作用域中解析令牌
    pub async fn resolve(&self, token: &Token, module: ModuleKey) -> DependencyResult<Instance> {
        self.resolve_in(token, module, None).await
    }

    /// 在模块作用域和请求上下文中解析令牌
    ///
    /// 这里的令牌来自调用方而不是某个构造参数，没有可指明的请求类型和参数索引，
    /// 找不到时返回 [`DependencyError::UnknownToken`]。构造参数不可见时返回
    /// [`DependencyError::UnknownDependency`]。
    pub async fn resolve_in(
        &self,
        token: &Token,
        module: ModuleKey,
        context: Option<&RequestContext>,
    ) -> DependencyResult<Instance> {
        let node = self.container.require_module(module)?;
        let wrapper = self
            .lookup(token, &node)
            .ok_or_else(|| DependencyError::UnknownToken {
                token: token.to_string(),
                module: node.name().to_string(),
            })?;
        self.load_wrapper(&wrapper, context).await
    }

    /// 查找在模块中可见的提供者
    pub fn lookup(&self, token: &Token, module: &ModuleNode) -> Option<Arc<InstanceWrapper>> {
        if let Some(wrapper) = module.get_provider(token) {
            return Some(wrapper);
        }
        let mut visited = HashSet::from([module.key()]);
        self.lookup_in_imports(token, module, &mut visited, false)
    }

    fn lookup_in_imports(
        &self,
        token: &Token,
        module: &ModuleNode,
        visited: &mut HashSet<ModuleKey>,
        traversing: bool,
    ) -> Option<Arc<InstanceWrapper>> {
        let exports = module.exports();
        for key in module.related_modules() {
            let Some(related) = self.container.get_module(key) else {
                continue;
            };
            // 经由中间模块继续查找时，只进入它重新导出的模块
            if traversing
                && !exports.contains(&related.metatype().token())
                && !exports.contains(token)
            {
                continue;
            }
            if !visited.insert(key) {
                continue;
            }
            if related.has_export(token) {
                if let Some(wrapper) = related.get_provider(token) {
                    return Some(wrapper);
                }
            }
            if let Some(wrapper) = self.lookup_in_imports(token, &related, visited, true) {
                return Some(wrapper);
            }
        }
        None
    }

    /// 包装器实际生效的作用域
    ///
    /// 默认作用域的提供者只要传递依赖了请求作用域的提供者，就按请求作用域处理。
    pub fn effective_scope(&self, wrapper: &InstanceWrapper) -> Scope {
        match wrapper.scope() {
            Scope::Default if !self.is_static_tree(wrapper) => Scope::Request,
            scope => scope,
        }
    }

    /// 依赖树中是否没有请求作用域的提供者
    pub fn is_static_tree(&self, wrapper: &InstanceWrapper) -> bool {
        if let Some(is_static) = wrapper.is_static_tree() {
            return is_static;
        }
        let is_static = self.tree_is_static(wrapper, &mut HashSet::new());
        wrapper.mark_static_tree(is_static)
    }

    fn tree_is_static(&self, wrapper: &InstanceWrapper, visited: &mut HashSet<Uuid>) -> bool {
        if !visited.insert(wrapper.id()) {
            return true;
        }
        if wrapper.scope() == Scope::Request {
            return false;
        }
        if let Some(is_static) = wrapper.is_static_tree() {
            return is_static;
        }
        let Some(host) = self.container.get_module(wrapper.host()) else {
            return true;
        };
        wrapper
            .dependencies()
            .iter()
            .filter_map(|token| self.lookup(token, &host))
            .all(|dependency| self.tree_is_static(&dependency, visited))
    }

    /// 不创建实例，沿依赖令牌检查构造循环
    ///
    /// `finished` 保存已确认无环的包装器，多次调用之间可以共享。
    /// 不可见的依赖在这里跳过，由 [`Self::verify_dependencies`] 或实例化报告。
    pub fn verify_acyclic(
        &self,
        wrapper: &Arc<InstanceWrapper>,
        finished: &mut HashSet<Uuid>,
    ) -> DependencyResult<()> {
        self.walk_acyclic(wrapper, &ResolutionPath::default(), finished)
    }

    fn walk_acyclic(
        &self,
        wrapper: &Arc<InstanceWrapper>,
        path: &ResolutionPath,
        finished: &mut HashSet<Uuid>,
    ) -> DependencyResult<()> {
        if finished.contains(&wrapper.id()) {
            return Ok(());
        }
        if path.contains(wrapper.id()) {
            return Err(DependencyError::CircularDependency {
                context: wrapper.name().to_string(),
                chain: path.describe(wrapper.name()),
            });
        }
        let host = self.container.require_module(wrapper.host())?;
        let path = path.push(wrapper);
        for token in wrapper.dependencies() {
            if let Some(dependency) = self.lookup(token, &host) {
                self.walk_acyclic(&dependency, &path, finished)?;
            }
        }
        finished.insert(wrapper.id());
        Ok(())
    }

    /// 按包装器的作用域取得实例
    pub async fn load_wrapper(
        &self,
        wrapper: &Arc<InstanceWrapper>,
        context: Option<&RequestContext>,
    ) -> DependencyResult<Instance> {
        self.load(wrapper.clone(), context, ResolutionPath::default())
            .await
    }

    fn load<'a>(
        &'a self,
        wrapper: Arc<InstanceWrapper>,
        context: Option<&'a RequestContext>,
        path: ResolutionPath,
    ) -> BoxFuture<'a, DependencyResult<Instance>> {
        async move {
            if let Some(instance) = wrapper.instance() {
                return Ok(instance);
            }
            if path.contains(wrapper.id()) {
                return Err(DependencyError::CircularDependency {
                    context: wrapper.name().to_string(),
                    chain: path.describe(wrapper.name()),
                });
            }
            if path.depth() >= self.max_depth {
                return Err(DependencyError::ResolutionDepthExceeded {
                    token: wrapper.token().to_string(),
                    depth: path.depth() + 1,
                });
            }
            let path = path.push(&wrapper);

            match self.effective_scope(&wrapper) {
                Scope::Default => {
                    let instance = wrapper
                        .instance_cell()
                        .get_or_try_init(|| self.instantiate(&wrapper, context, &path))
                        .await?;
                    Ok(instance.clone())
                }
                Scope::Transient => self.instantiate(&wrapper, context, &path).await,
                Scope::Request => match context {
                    Some(context) => {
                        if let Some(instance) = wrapper.context_instance(context.id) {
                            return Ok(instance);
                        }
                        let instance = self.instantiate(&wrapper, Some(context), &path).await?;
                        Ok(wrapper.store_context_instance(context.id, instance))
                    }
                    // 没有请求上下文时按瞬时处理
                    None => self.instantiate(&wrapper, None, &path).await,
                },
            }
        }
        .boxed()
    }

    async fn instantiate(
        &self,
        wrapper: &InstanceWrapper,
        context: Option<&RequestContext>,
        path: &ResolutionPath,
    ) -> DependencyResult<Instance> {
        let host = self.container.require_module(wrapper.host())?;
        match wrapper.recipe() {
            Recipe::Value(value) => Ok(value.clone()),
            Recipe::Class {
                constructor,
                param_tokens,
                ..
            } => {
                let deps = self
                    .resolve_dependencies(wrapper, param_tokens, &host, context, path)
                    .await?;
                debug!("创建实例: {} ({})", wrapper.name(), host.name());
                constructor(deps)
            }
            Recipe::Factory { factory, inject } => {
                let deps = self
                    .resolve_dependencies(wrapper, inject, &host, context, path)
                    .await?;
                debug!("调用工厂: {} ({})", wrapper.name(), host.name());
                factory(deps).await
            }
        }
    }

    async fn resolve_dependencies(
        &self,
        wrapper: &InstanceWrapper,
        tokens: &[Token],
        host: &ModuleNode,
        context: Option<&RequestContext>,
        path: &ResolutionPath,
    ) -> DependencyResult<ResolvedDependencies> {
        let mut items = Vec::with_capacity(tokens.len());
        for (index, token) in tokens.iter().enumerate() {
            let dependency = self
                .lookup(token, host)
                .ok_or_else(|| Self::unknown_dependency(wrapper, token, index, host))?;
            let instance = self.load(dependency, context, path.clone()).await?;
            items.push((token.clone(), instance));
        }
        Ok(ResolvedDependencies::new(wrapper.name(), items))
    }

    /// 检查包装器的依赖令牌都可见，不创建实例
    pub fn verify_dependencies(&self, wrapper: &InstanceWrapper) -> DependencyResult<()> {
        let host = self.container.require_module(wrapper.host())?;
        for (index, token) in wrapper.dependencies().iter().enumerate() {
            if self.lookup(token, &host).is_none() {
                return Err(Self::unknown_dependency(wrapper, token, index, &host));
            }
        }
        Ok(())
    }

    fn unknown_dependency(
        wrapper: &InstanceWrapper,
        token: &Token,
        index: usize,
        host: &ModuleNode,
    ) -> DependencyError {
        DependencyError::UnknownDependency {
            type_name: wrapper.name().to_string(),
            token: token.to_string(),
            index,
            module: host.name().to_string(),
        }
    }

    /// 释放请求上下文中的所有实例，返回释放的数量
    pub fn release_context(&self, context: &RequestContext) -> usize {
        let released = self
            .container
            .get_modules()
            .iter()
            .flat_map(|module| module.wrappers())
            .filter(|wrapper| wrapper.release_context(context.id))
            .count();
        debug!("释放请求上下文 {}: {} 个实例", context.name, released);
        released
    }
}
