//! 依赖扫描器
//!
//! 从根模块开始构建模块图，分两个阶段：
//!
//! 1. 模块发现：深度优先遍历导入，注册模块节点。模块之间的循环导入是合法的，
//!    已访问的模块直接跳过。
//! 2. 成员注册：按注册顺序为每个模块登记相关模块、提供者、控制器和增强器，
//!    全部模块登记完成后再校验并登记导出项。
//!
//! 最后绑定全局模块。应用级提供者（`APP_GUARD` 等）登记在旁表中，
//! 实例加载完成后由 [`DependenciesScanner::apply_application_providers`] 应用。

use crate::container::Container;
use crate::injector::Injector;
use crate::metadata_scanner::MetadataScanner;
use crate::module::ModuleNode;
use di_abstractions::{
    ClassRef, EnhancerKind, Import, ModuleKey, ModuleType, Provider,
    RouteParamMetadata, APP_FILTER, APP_GUARD, APP_INTERCEPTOR, APP_PIPE, ROUTE_ARGS_METADATA,
};
use di_common::{DependencyError, DependencyResult, MetadataTarget, Scope, Token};
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 旁表中的应用级提供者
#[derive(Debug, Clone)]
struct ApplicationProviderWrapper {
    module: ModuleKey,
    kind: EnhancerKind,
    token: Token,
}

/// 依赖扫描器
pub struct DependenciesScanner {
    container: Arc<Container>,
    metadata_scanner: MetadataScanner,
    application_providers: Mutex<Vec<ApplicationProviderWrapper>>,
}

impl DependenciesScanner {
    pub fn new(container: Arc<Container>) -> Self {
        Self {
            container,
            metadata_scanner: MetadataScanner::new(),
            application_providers: Mutex::new(Vec::new()),
        }
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// 扫描模块图
    pub fn scan(&self, root: &ModuleType) -> DependencyResult<()> {
        let mut ctx_registry = HashSet::new();
        let modules = self.scan_for_modules(&Import::Module(root.clone()), Vec::new(), &mut ctx_registry)?;
        info!("模块发现完成: 根模块 {}，共 {} 个模块", root.name(), modules.len());
        self.scan_modules_for_dependencies()?;
        self.container.bind_global_scope();
        Ok(())
    }

    /// 第一阶段：深度优先发现模块
    ///
    /// 解析为空的延迟引用在这一阶段跳过，第二阶段登记相关模块时报错。
    pub fn scan_for_modules(
        &self,
        import: &Import,
        scope: Vec<ModuleType>,
        ctx_registry: &mut HashSet<ModuleKey>,
    ) -> DependencyResult<Vec<Arc<ModuleNode>>> {
        let Some(resolved) = import.resolve() else {
            return Ok(Vec::new());
        };
        let (node, _) = self.container.add_module(&resolved, scope.clone())?;
        if !ctx_registry.insert(node.key()) {
            return Ok(Vec::new());
        }

        let metadata = self.container.module_metadata(node.key())?;
        let mut child_scope = scope;
        child_scope.push(node.metatype().clone());

        let mut registered = vec![node];
        for inner in &metadata.imports {
            if let Some(key) = inner.resolve().and_then(|inner| inner.key()) {
                if ctx_registry.contains(&key) {
                    continue;
                }
            }
            registered.extend(self.scan_for_modules(inner, child_scope.clone(), ctx_registry)?);
        }
        Ok(registered)
    }

    /// 第二阶段：登记每个模块的成员
    pub fn scan_modules_for_dependencies(&self) -> DependencyResult<()> {
        let modules = self.container.get_modules();
        for module in &modules {
            let metadata = self.container.module_metadata(module.key())?;
            self.reflect_imports(module, &metadata.imports)?;
            self.reflect_providers(module, &metadata.providers)?;
            self.reflect_controllers(module, &metadata.controllers)?;
            module.set_declared_exports(metadata.exports.iter().map(|export| export.token()));
        }
        for module in &modules {
            let metadata = self.container.module_metadata(module.key())?;
            for export in &metadata.exports {
                module.add_exported_provider(export, &self.container)?;
            }
        }
        Ok(())
    }

    fn reflect_imports(&self, module: &ModuleNode, imports: &[Import]) -> DependencyResult<()> {
        for import in imports {
            let related = import.resolve().and_then(|related| related.key()).ok_or_else(|| {
                DependencyError::CircularDependency {
                    context: module.name().to_string(),
                    chain: module
                        .scope()
                        .iter()
                        .map(|parent| parent.name())
                        .chain(std::iter::once(module.name()))
                        .collect::<Vec<_>>()
                        .join(" -> "),
                }
            })?;
            if self.container.has_module(related) {
                module.add_related_module(related);
            }
        }
        Ok(())
    }

    fn reflect_providers(&self, module: &ModuleNode, providers: &[Provider]) -> DependencyResult<()> {
        for provider in providers {
            self.insert_provider(module, provider)?;
            if !provider.is_custom() {
                if let Some(type_id) = provider.token().type_id() {
                    self.reflect_dynamic_metadata(module, type_id)?;
                }
            }
        }
        Ok(())
    }

    fn insert_provider(&self, module: &ModuleNode, provider: &Provider) -> DependencyResult<Token> {
        let store = self.container.metadata();
        let kind = provider.is_custom().then(|| application_enhancer_kind(provider.token())).flatten();
        let Some(kind) = kind else {
            return module.add_provider(provider, store);
        };

        // 应用级提供者以生成的令牌登记在所属模块中，加载后再应用
        let token = Token::name(format!("{}:{}", provider.token(), Uuid::new_v4()));
        let registered = provider.clone().with_provide(token);
        let token = module.add_provider(&registered, store)?;
        debug!("登记应用级提供者: {} ({})", provider.token(), module.name());
        self.application_providers.lock().push(ApplicationProviderWrapper {
            module: module.key(),
            kind,
            token: token.clone(),
        });
        Ok(token)
    }

    fn reflect_controllers(&self, module: &ModuleNode, controllers: &[ClassRef]) -> DependencyResult<()> {
        let store = self.container.metadata();
        for controller in controllers {
            module.add_controller(controller, store)?;
            self.reflect_dynamic_metadata(module, controller.type_info().id)?;
        }
        Ok(())
    }

    /// 登记类型及其处理方法上的增强器和参数管道
    fn reflect_dynamic_metadata(&self, module: &ModuleNode, type_id: TypeId) -> DependencyResult<()> {
        for kind in EnhancerKind::ALL {
            self.reflect_injectables(module, type_id, kind.metadata_key())?;
        }
        self.reflect_param_injectables(module, type_id)
    }

    fn reflect_injectables(
        &self,
        module: &ModuleNode,
        type_id: TypeId,
        key: &'static str,
    ) -> DependencyResult<()> {
        let store = self.container.metadata();
        let mut injectables: Vec<ClassRef> = store.read_or_default(key, MetadataTarget::Type(type_id));
        let method_injectables = self
            .metadata_scanner
            .scan_from_methods(store, type_id, |method| {
                store.read::<Vec<ClassRef>>(key, MetadataTarget::Method(type_id, method))
            });
        injectables.extend(method_injectables.into_iter().flatten());
        for injectable in &injectables {
            module.add_injectable(injectable, store)?;
        }
        Ok(())
    }

    fn reflect_param_injectables(&self, module: &ModuleNode, type_id: TypeId) -> DependencyResult<()> {
        let store = self.container.metadata();
        let params = self
            .metadata_scanner
            .scan_from_methods(store, type_id, |method| {
                store.read::<Vec<RouteParamMetadata>>(
                    ROUTE_ARGS_METADATA,
                    MetadataTarget::Method(type_id, method),
                )
            });
        for pipe in params.iter().flatten().flat_map(|param| param.pipes.iter()) {
            module.add_injectable(pipe, store)?;
        }
        Ok(())
    }

    /// 把应用级提供者的实例加入全局配置，按模块发现顺序
    ///
    /// 实际作用域为单例的实例在这里取得（尚未创建时先创建），其余作用域登记包装器。
    pub async fn apply_application_providers(&self) -> DependencyResult<()> {
        let providers = self.application_providers.lock().clone();
        let injector = Injector::new(self.container.clone());
        let config = self.container.application_config();
        for provider in providers {
            let module = self.container.require_module(provider.module)?;
            let wrapper = module
                .get_provider(&provider.token)
                .ok_or_else(|| DependencyError::UnknownToken {
                    token: provider.token.to_string(),
                    module: module.name().to_string(),
                })?;
            if injector.effective_scope(&wrapper) == Scope::Default {
                let instance = injector.load_wrapper(&wrapper, None).await?;
                config.add_global_enhancer(provider.kind, instance);
            } else {
                config.add_global_request_enhancer(provider.kind, wrapper);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for DependenciesScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependenciesScanner")
            .field("container", &self.container)
            .field("application_providers", &self.application_providers.lock().len())
            .finish()
    }
}

/// 扩展点令牌对应的增强器种类
fn application_enhancer_kind(token: &Token) -> Option<EnhancerKind> {
    let Token::Name(name) = token else {
        return None;
    };
    match name.as_ref() {
        APP_GUARD => Some(EnhancerKind::Guards),
        APP_PIPE => Some(EnhancerKind::Pipes),
        APP_FILTER => Some(EnhancerKind::Filters),
        APP_INTERCEPTOR => Some(EnhancerKind::Interceptors),
        _ => None,
    }
}
