//! 模块声明
//!
//! 模块声明由 [`ModuleDecl`] 类型、[`DynamicModule`] 描述或 [`ForwardRef`] 延迟引用给出，
//! 扫描器首次遇到声明类型时把 [`ModuleMetadata`] 写入元数据存储，之后从存储读回。

use crate::constants::{
    GLOBAL_MODULE_METADATA, METADATA_CONTROLLERS, METADATA_EXPORTS, METADATA_IMPORTS,
    METADATA_PROVIDERS,
};
use crate::injectable::Injectable;
use crate::provider::{ClassRef, Provider};
use di_common::{MetadataStore, MetadataTarget, Token, TypeInfo};
use once_cell::sync::OnceCell;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// 模块声明 trait
///
/// # 示例
///
/// ```rust
/// use di_abstractions::{ModuleDecl, ModuleMetadata, Provider};
///
/// struct ConfigModule;
///
/// impl ModuleDecl for ConfigModule {
///     fn metadata() -> ModuleMetadata {
///         ModuleMetadata::new()
///             .provider(Provider::use_value("PORT", 8080u16))
///             .export("PORT")
///             .global()
///     }
/// }
/// ```
pub trait ModuleDecl: Send + Sync + 'static {
    /// 模块的导入、导出、提供者与控制器
    fn metadata() -> ModuleMetadata;
}

/// 模块标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKey {
    /// 声明类型
    Static(TypeId),
    /// 动态模块描述
    Dynamic(Uuid),
}

/// 模块元数据
#[derive(Clone, Default)]
pub struct ModuleMetadata {
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub providers: Vec<Provider>,
    pub controllers: Vec<ClassRef>,
    pub global: bool,
}

impl ModuleMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// 导入模块
    pub fn import(mut self, import: impl Into<Import>) -> Self {
        self.imports.push(import.into());
        self
    }

    /// 导入声明类型
    pub fn import_module<M: ModuleDecl>(self) -> Self {
        self.import(ModuleType::of::<M>())
    }

    /// 导出令牌、提供者或模块
    pub fn export(mut self, export: impl Into<Export>) -> Self {
        self.exports.push(export.into());
        self
    }

    /// 导出类型令牌
    pub fn export_type<T: ?Sized + 'static>(self) -> Self {
        self.export(Token::of::<T>())
    }

    pub fn provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    /// 以类型自身为令牌提供
    pub fn provide<T: Injectable>(self) -> Self {
        self.provider(Provider::class::<T>())
    }

    pub fn controller<T: Injectable>(mut self) -> Self {
        self.controllers.push(ClassRef::of::<T>());
        self
    }

    /// 标记为全局模块
    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    /// 写入元数据存储
    pub fn define(self, store: &MetadataStore, target: MetadataTarget) {
        store.define(METADATA_IMPORTS, self.imports, target);
        store.define(METADATA_EXPORTS, self.exports, target);
        store.define(METADATA_PROVIDERS, self.providers, target);
        store.define(METADATA_CONTROLLERS, self.controllers, target);
        store.define(GLOBAL_MODULE_METADATA, self.global, target);
    }

    /// 从元数据存储读回，缺失的键视为空
    pub fn read(store: &MetadataStore, target: MetadataTarget) -> Self {
        Self {
            imports: store.read_or_default(METADATA_IMPORTS, target),
            exports: store.read_or_default(METADATA_EXPORTS, target),
            providers: store.read_or_default(METADATA_PROVIDERS, target),
            controllers: store.read_or_default(METADATA_CONTROLLERS, target),
            global: store.read_or_default(GLOBAL_MODULE_METADATA, target),
        }
    }

    /// 合并另一份元数据，列表按顺序追加
    pub fn merge(mut self, other: &ModuleMetadata) -> Self {
        self.imports.extend(other.imports.iter().cloned());
        self.exports.extend(other.exports.iter().cloned());
        self.providers.extend(other.providers.iter().cloned());
        self.controllers.extend(other.controllers.iter().cloned());
        self.global |= other.global;
        self
    }
}

impl fmt::Debug for ModuleMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleMetadata")
            .field("imports", &self.imports)
            .field("exports", &self.exports)
            .field("providers", &self.providers.len())
            .field("controllers", &self.controllers)
            .field("global", &self.global)
            .finish()
    }
}

/// 模块声明类型
#[derive(Clone)]
pub struct ModuleType {
    type_info: TypeInfo,
    metadata: fn() -> ModuleMetadata,
}

impl ModuleType {
    pub fn of<M: ModuleDecl>() -> Self {
        Self {
            type_info: TypeInfo::of::<M>(),
            metadata: M::metadata,
        }
    }

    pub fn key(&self) -> ModuleKey {
        ModuleKey::Static(self.type_info.id)
    }

    pub fn name(&self) -> &str {
        self.type_info.short_name()
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// 模块作为导出项时的令牌
    pub fn token(&self) -> Token {
        Token::Type(self.type_info.clone())
    }

    pub fn target(&self) -> MetadataTarget {
        MetadataTarget::Type(self.type_info.id)
    }

    /// 首次遇到时写入元数据，返回是否写入
    pub fn declare(&self, store: &MetadataStore) -> bool {
        if store.has(METADATA_IMPORTS, self.target()) {
            return false;
        }
        (self.metadata)().define(store, self.target());
        true
    }
}

impl fmt::Debug for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleType").field(&self.type_info.name).finish()
    }
}

impl PartialEq for ModuleType {
    fn eq(&self, other: &Self) -> bool {
        self.type_info == other.type_info
    }
}

/// 动态模块
///
/// 在声明类型的元数据之上追加导入、导出、提供者。
/// 标识在创建时确定，克隆共享同一标识。
#[derive(Clone)]
pub struct DynamicModule {
    id: Uuid,
    module: ModuleType,
    metadata: ModuleMetadata,
}

impl DynamicModule {
    pub fn new<M: ModuleDecl>() -> Self {
        Self::from_type(ModuleType::of::<M>())
    }

    pub fn from_type(module: ModuleType) -> Self {
        Self {
            id: Uuid::new_v4(),
            module,
            metadata: ModuleMetadata::default(),
        }
    }

    pub fn import(mut self, import: impl Into<Import>) -> Self {
        self.metadata = self.metadata.import(import);
        self
    }

    pub fn export(mut self, export: impl Into<Export>) -> Self {
        self.metadata = self.metadata.export(export);
        self
    }

    pub fn provider(mut self, provider: Provider) -> Self {
        self.metadata = self.metadata.provider(provider);
        self
    }

    pub fn controller<T: Injectable>(mut self) -> Self {
        self.metadata = self.metadata.controller::<T>();
        self
    }

    pub fn global(mut self) -> Self {
        self.metadata = self.metadata.global();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> ModuleKey {
        ModuleKey::Dynamic(self.id)
    }

    /// 所属的声明类型
    pub fn module(&self) -> &ModuleType {
        &self.module
    }

    /// 描述中追加的元数据
    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        self.module.name()
    }
}

impl fmt::Debug for DynamicModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicModule")
            .field("id", &self.id)
            .field("module", &self.module)
            .finish()
    }
}

type ForwardResolver = Arc<dyn Fn() -> Option<Import> + Send + Sync>;

/// 延迟引用
///
/// 解析函数只调用一次，结果缓存。解析结果为 `None` 表示引用未能解析。
#[derive(Clone)]
pub struct ForwardRef {
    resolver: ForwardResolver,
    resolved: Arc<OnceCell<Option<Import>>>,
}

impl ForwardRef {
    pub fn new<F>(resolver: F) -> Self
    where
        F: Fn() -> Option<Import> + Send + Sync + 'static,
    {
        Self {
            resolver: Arc::new(resolver),
            resolved: Arc::new(OnceCell::new()),
        }
    }

    /// 指向声明类型的延迟引用
    pub fn module<M: ModuleDecl>() -> Self {
        Self::new(|| Some(Import::Module(ModuleType::of::<M>())))
    }

    /// 解析引用，嵌套的延迟引用一并解析
    pub fn resolve(&self) -> Option<Import> {
        let import = self.resolved.get_or_init(|| (self.resolver)()).clone()?;
        match import {
            Import::Forward(inner) => inner.resolve(),
            other => Some(other),
        }
    }
}

impl fmt::Debug for ForwardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardRef")
            .field("resolved", &self.resolved.get().is_some())
            .finish()
    }
}

/// 模块导入项
#[derive(Clone, Debug)]
pub enum Import {
    Module(ModuleType),
    Dynamic(DynamicModule),
    Forward(ForwardRef),
}

impl Import {
    /// 解析延迟引用，得到具体的模块声明
    pub fn resolve(&self) -> Option<Import> {
        match self {
            Self::Forward(forward) => forward.resolve(),
            other => Some(other.clone()),
        }
    }

    /// 模块标识，延迟引用返回 `None`
    pub fn key(&self) -> Option<ModuleKey> {
        match self {
            Self::Module(module) => Some(module.key()),
            Self::Dynamic(dynamic) => Some(dynamic.key()),
            Self::Forward(_) => None,
        }
    }

    /// 声明类型，延迟引用返回 `None`
    pub fn module_type(&self) -> Option<&ModuleType> {
        match self {
            Self::Module(module) => Some(module),
            Self::Dynamic(dynamic) => Some(dynamic.module()),
            Self::Forward(_) => None,
        }
    }

    pub fn is_forward_reference(&self) -> bool {
        matches!(self, Self::Forward(_))
    }
}

impl From<ModuleType> for Import {
    fn from(module: ModuleType) -> Self {
        Self::Module(module)
    }
}

impl From<DynamicModule> for Import {
    fn from(module: DynamicModule) -> Self {
        Self::Dynamic(module)
    }
}

impl From<ForwardRef> for Import {
    fn from(forward: ForwardRef) -> Self {
        Self::Forward(forward)
    }
}

/// 模块导出项
#[derive(Clone, Debug)]
pub enum Export {
    /// 本地提供者的令牌
    Token(Token),
    /// 本地提供者本身，按其令牌导出
    Provider(Provider),
    /// 重新导出导入的模块
    Module(ModuleType),
    /// 重新导出导入的动态模块
    Dynamic(DynamicModule),
}

impl Export {
    /// 导出令牌
    pub fn token(&self) -> Token {
        match self {
            Self::Token(token) => token.clone(),
            Self::Provider(provider) => provider.token().clone(),
            Self::Module(module) => module.token(),
            Self::Dynamic(dynamic) => dynamic.module().token(),
        }
    }
}

impl From<Token> for Export {
    fn from(token: Token) -> Self {
        Self::Token(token)
    }
}

impl From<&str> for Export {
    fn from(name: &str) -> Self {
        Self::Token(Token::name(name))
    }
}

impl From<Provider> for Export {
    fn from(provider: Provider) -> Self {
        Self::Provider(provider)
    }
}

impl From<ModuleType> for Export {
    fn from(module: ModuleType) -> Self {
        Self::Module(module)
    }
}

impl From<DynamicModule> for Export {
    fn from(module: DynamicModule) -> Self {
        Self::Dynamic(module)
    }
}
