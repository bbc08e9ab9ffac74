//! Centralized integration tests for di-impl crate: module graph scanning and visibility

use di_abstractions::{
    DynamicModule, ForwardRef, Injectable, ModuleDecl, ModuleMetadata, ModuleType, Provider,
};
use di_common::{
    ApplicationError, DependencyError, DependencyResult, ResolvedDependencies, Token, TypeInfo,
};
use di_composition::{ApplicationBuilder, ApplicationContext};
use di_impl::{Container, ContainerConfig, DependenciesScanner};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

async fn build<M: ModuleDecl>() -> Result<ApplicationContext, ApplicationError> {
    ApplicationBuilder::new::<M>().build().await
}

fn dependency_error(err: ApplicationError) -> DependencyError {
    match err {
        ApplicationError::DependencyError { source } => source,
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// 跨模块注入导出的值
// ---------------------------------------------------------------------------

struct Service {
    x: Arc<u32>,
}

impl Injectable for Service {
    fn dependencies() -> Vec<Token> {
        vec![Token::name("X")]
    }

    fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self { x: deps.take()? })
    }
}

struct ModuleA;

impl ModuleDecl for ModuleA {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provider(Provider::use_value("X", 42u32))
            .export("X")
    }
}

struct ModuleB;

impl ModuleDecl for ModuleB {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import_module::<ModuleA>()
            .provide::<Service>()
            .export_type::<Service>()
    }
}

struct RootModule;

impl ModuleDecl for RootModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import_module::<ModuleA>()
            .import_module::<ModuleB>()
    }
}

#[tokio::test]
async fn test_exported_value_is_injected() -> anyhow::Result<()> {
    let app = build::<RootModule>().await?;
    let service: Arc<Service> = app.resolve(Token::of::<Service>()).await?;
    assert_eq!(*service.x, 42);

    let names: Vec<String> = app
        .container()
        .get_modules()
        .iter()
        .map(|module| module.name().to_string())
        .collect();
    assert_eq!(names, vec!["RootModule", "ModuleA", "ModuleB"]);
    Ok(())
}

#[tokio::test]
async fn test_default_scope_is_cached() -> anyhow::Result<()> {
    let app = build::<RootModule>().await?;
    let a: Arc<Service> = app.resolve(Token::of::<Service>()).await?;
    let b: Arc<Service> = app.resolve(Token::of::<Service>()).await?;
    assert!(Arc::ptr_eq(&a, &b));
    Ok(())
}

// ---------------------------------------------------------------------------
// 菱形导入
// ---------------------------------------------------------------------------

static SHARED_CREATED: AtomicUsize = AtomicUsize::new(0);

struct SharedCounter;

impl Injectable for SharedCounter {
    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        SHARED_CREATED.fetch_add(1, Ordering::SeqCst);
        Ok(Self)
    }
}

struct LeftConsumer {
    counter: Arc<SharedCounter>,
}

impl Injectable for LeftConsumer {
    fn dependencies() -> Vec<Token> {
        vec![Token::of::<SharedCounter>()]
    }

    fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self {
            counter: deps.take()?,
        })
    }
}

struct RightConsumer {
    counter: Arc<SharedCounter>,
}

impl Injectable for RightConsumer {
    fn dependencies() -> Vec<Token> {
        vec![Token::of::<SharedCounter>()]
    }

    fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self {
            counter: deps.take()?,
        })
    }
}

struct DiamondShared;

impl ModuleDecl for DiamondShared {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provide::<SharedCounter>()
            .export_type::<SharedCounter>()
    }
}

struct DiamondLeft;

impl ModuleDecl for DiamondLeft {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import_module::<DiamondShared>()
            .provide::<LeftConsumer>()
    }
}

struct DiamondRight;

impl ModuleDecl for DiamondRight {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import_module::<DiamondShared>()
            .provide::<RightConsumer>()
    }
}

struct DiamondRoot;

impl ModuleDecl for DiamondRoot {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import_module::<DiamondLeft>()
            .import_module::<DiamondRight>()
    }
}

#[tokio::test]
async fn test_diamond_import_registers_shared_module_once() -> anyhow::Result<()> {
    let app = build::<DiamondRoot>().await?;
    assert_eq!(app.container().get_modules().len(), 4);
    assert_eq!(SHARED_CREATED.load(Ordering::SeqCst), 1);

    let left: Arc<LeftConsumer> = app.get(Token::of::<LeftConsumer>())?;
    let right: Arc<RightConsumer> = app.get(Token::of::<RightConsumer>())?;
    assert!(Arc::ptr_eq(&left.counter, &right.counter));

    let shared = app
        .container()
        .get_module_by_type::<DiamondShared>()
        .expect("shared module registered");
    let chain: Vec<&str> = shared.scope().iter().map(|parent| parent.name()).collect();
    assert_eq!(chain, vec!["DiamondRoot", "DiamondLeft"]);
    Ok(())
}

// ---------------------------------------------------------------------------
// 全局模块
// ---------------------------------------------------------------------------

struct UsersService {
    connection: Arc<String>,
}

impl Injectable for UsersService {
    fn dependencies() -> Vec<Token> {
        vec![Token::name("CONNECTION")]
    }

    fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self {
            connection: deps.take()?,
        })
    }
}

struct UsersModule;

impl ModuleDecl for UsersModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new().provide::<UsersService>()
    }
}

struct DatabaseModule;

impl ModuleDecl for DatabaseModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provider(Provider::use_value("CONNECTION", "postgres://localhost".to_string()))
            .export("CONNECTION")
            .global()
    }
}

struct GlobalRoot;

impl ModuleDecl for GlobalRoot {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import_module::<UsersModule>()
            .import_module::<DatabaseModule>()
    }
}

#[tokio::test]
async fn test_global_module_is_visible_without_import() -> anyhow::Result<()> {
    let app = build::<GlobalRoot>().await?;
    let users: Arc<UsersService> = app.get(Token::of::<UsersService>())?;
    assert_eq!(users.connection.as_str(), "postgres://localhost");

    let container = app.container();
    let database = container.get_module_by_type::<DatabaseModule>().expect("registered");
    assert!(container.is_global_module(database.key()));
    let users_module = container.get_module_by_type::<UsersModule>().expect("registered");
    assert!(users_module.related_modules().contains(&database.key()));
    Ok(())
}

// ---------------------------------------------------------------------------
// 导出校验
// ---------------------------------------------------------------------------

struct GhostModule;

impl ModuleDecl for GhostModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provider(Provider::use_value("REAL", 1u8))
            .export("GHOST")
    }
}

#[tokio::test]
async fn test_unknown_export_names_module() {
    let err = dependency_error(build::<GhostModule>().await.unwrap_err());
    match err {
        DependencyError::UnknownExport { module, token } => {
            assert_eq!(module, "GhostModule");
            assert_eq!(token, "GHOST");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// 模块重新导出
// ---------------------------------------------------------------------------

struct Consumer {
    value: Arc<String>,
}

impl Injectable for Consumer {
    fn dependencies() -> Vec<Token> {
        vec![Token::name("SHARED_VALUE")]
    }

    fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self {
            value: deps.take()?,
        })
    }
}

struct SharedModule;

impl ModuleDecl for SharedModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provider(Provider::use_value("SHARED_VALUE", "shared".to_string()))
            .export("SHARED_VALUE")
    }
}

struct CoreModule;

impl ModuleDecl for CoreModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import_module::<SharedModule>()
            .export(ModuleType::of::<SharedModule>())
    }
}

struct FeatureModule;

impl ModuleDecl for FeatureModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import_module::<CoreModule>()
            .provide::<Consumer>()
    }
}

struct HiddenCoreModule;

impl ModuleDecl for HiddenCoreModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new().import_module::<SharedModule>()
    }
}

struct HiddenFeatureModule;

impl ModuleDecl for HiddenFeatureModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import_module::<HiddenCoreModule>()
            .provide::<Consumer>()
    }
}

#[tokio::test]
async fn test_reexported_module_is_visible_to_importer() -> anyhow::Result<()> {
    let app = build::<FeatureModule>().await?;
    let consumer: Arc<Consumer> = app.get(Token::of::<Consumer>())?;
    assert_eq!(consumer.value.as_str(), "shared");

    let core = app.container().get_module_by_type::<CoreModule>().expect("registered");
    assert!(core.has_export(&ModuleType::of::<SharedModule>().token()));
    Ok(())
}

#[tokio::test]
async fn test_import_without_reexport_is_not_visible() {
    let err = dependency_error(build::<HiddenFeatureModule>().await.unwrap_err());
    match err {
        DependencyError::UnknownDependency {
            type_name,
            token,
            index,
            module,
        } => {
            assert_eq!(type_name, "Consumer");
            assert_eq!(token, "SHARED_VALUE");
            assert_eq!(index, 0);
            assert_eq!(module, "HiddenFeatureModule");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// 循环：模块循环合法，构造循环报错
// ---------------------------------------------------------------------------

struct Left;
struct Right;

impl Injectable for Left {
    fn dependencies() -> Vec<Token> {
        vec![Token::of::<Right>()]
    }

    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self)
    }
}

impl Injectable for Right {
    fn dependencies() -> Vec<Token> {
        vec![Token::of::<Left>()]
    }

    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self)
    }
}

struct ProviderCycleModule;

impl ModuleDecl for ProviderCycleModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new().provide::<Left>().provide::<Right>()
    }
}

struct Cat;

impl Injectable for Cat {
    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self)
    }
}

struct Owner {
    cat: Arc<Cat>,
}

impl Injectable for Owner {
    fn dependencies() -> Vec<Token> {
        vec![Token::of::<Cat>()]
    }

    fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self { cat: deps.take()? })
    }
}

struct CatsModule;

impl ModuleDecl for CatsModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import(ForwardRef::module::<OwnersModule>())
            .provide::<Cat>()
            .export_type::<Cat>()
    }
}

struct OwnersModule;

impl ModuleDecl for OwnersModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import_module::<CatsModule>()
            .provide::<Owner>()
            .export_type::<Owner>()
    }
}

#[tokio::test]
async fn test_provider_cycle_is_rejected() {
    let err = dependency_error(build::<ProviderCycleModule>().await.unwrap_err());
    assert!(err.is_circular());
    let DependencyError::CircularDependency { chain, .. } = err else {
        unreachable!();
    };
    assert_eq!(chain, "Left -> Right -> Left");
}

#[tokio::test]
async fn test_module_cycle_without_provider_cycle_resolves() -> anyhow::Result<()> {
    let app = build::<CatsModule>().await?;
    assert_eq!(app.container().get_modules().len(), 2);
    let owner: Arc<Owner> = app.get(Token::of::<Owner>())?;
    let cat: Arc<Cat> = app.get(Token::of::<Cat>())?;
    assert!(Arc::ptr_eq(&owner.cat, &cat));
    Ok(())
}

struct BrokenForwardModule;

impl ModuleDecl for BrokenForwardModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new().import(ForwardRef::new(|| None))
    }
}

#[tokio::test]
async fn test_unresolved_forward_ref_is_circular_dependency() {
    let err = dependency_error(build::<BrokenForwardModule>().await.unwrap_err());
    match err {
        DependencyError::CircularDependency { context, .. } => {
            assert_eq!(context, "BrokenForwardModule");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// 无效提供者
// ---------------------------------------------------------------------------

struct NeverDeclared;

struct InvalidProviderModule;

impl ModuleDecl for InvalidProviderModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new().provider(Provider::type_ref(TypeInfo::of::<NeverDeclared>()))
    }
}

#[tokio::test]
async fn test_type_ref_without_constructor_is_invalid_provider() {
    let err = dependency_error(build::<InvalidProviderModule>().await.unwrap_err());
    assert!(matches!(err, DependencyError::InvalidProvider { .. }));
}

// ---------------------------------------------------------------------------
// 动态模块
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ConfigOptions {
    folder: &'static str,
}

struct ConfigModule;

impl ModuleDecl for ConfigModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
    }
}

impl ConfigModule {
    fn register(folder: &'static str) -> DynamicModule {
        DynamicModule::new::<ConfigModule>()
            .provider(Provider::use_value("CONFIG_OPTIONS", ConfigOptions { folder }))
            .export("CONFIG_OPTIONS")
    }
}

struct ConfigConsumer {
    options: Arc<ConfigOptions>,
}

impl Injectable for ConfigConsumer {
    fn dependencies() -> Vec<Token> {
        vec![Token::name("CONFIG_OPTIONS")]
    }

    fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self {
            options: deps.take()?,
        })
    }
}

struct DynamicRoot;

impl ModuleDecl for DynamicRoot {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import(ConfigModule::register("./config"))
            .provide::<ConfigConsumer>()
    }
}

#[tokio::test]
async fn test_dynamic_module_providers_are_exported() -> anyhow::Result<()> {
    let app = build::<DynamicRoot>().await?;
    let consumer: Arc<ConfigConsumer> = app.get(Token::of::<ConfigConsumer>())?;
    assert_eq!(consumer.options.folder, "./config");
    assert_eq!(app.container().get_modules().len(), 2);
    Ok(())
}

// ---------------------------------------------------------------------------
// 直接使用扫描器
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_scanner_without_builder() -> anyhow::Result<()> {
    let container = Container::new(ContainerConfig::default());
    let scanner = DependenciesScanner::new(container.clone());
    scanner.scan(&ModuleType::of::<RootModule>())?;

    let module_b = container.get_module_by_type::<ModuleB>().expect("registered");
    assert!(module_b.has_provider(&Token::of::<Service>()));
    assert!(module_b.has_export(&Token::of::<Service>()));
    // 扫描阶段不创建实例
    assert!(!module_b
        .get_provider(&Token::of::<Service>())
        .expect("registered")
        .is_resolved());
    Ok(())
}
