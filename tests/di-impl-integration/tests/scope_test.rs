//! Scopes, module references, application providers and container lifecycle

use di_abstractions::{
    ClassRef, EnhancerKind, Import, Injectable, MetadataStoreExt, ModuleDecl, ModuleMetadata,
    ModuleType, Provider, APP_GUARD, APP_INTERCEPTOR,
};
use di_common::{
    ApplicationError, DependencyError, DependencyResult, MetadataStore, MetadataTarget, RequestContext,
    ResolvedDependencies, Scope, Token, TypeInfo,
};
use di_composition::ApplicationBuilder;
use di_impl::{ContainerConfig, ModuleRef};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// 作用域
// ---------------------------------------------------------------------------

static REQUEST_CREATED: AtomicUsize = AtomicUsize::new(0);

struct RequestTracker {
    serial: usize,
}

impl Injectable for RequestTracker {
    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self {
            serial: REQUEST_CREATED.fetch_add(1, Ordering::SeqCst),
        })
    }

    fn scope() -> Scope {
        Scope::Request
    }
}

struct Stamp;

impl Injectable for Stamp {
    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self)
    }

    fn scope() -> Scope {
        Scope::Transient
    }
}

struct ScopesModule;

impl ModuleDecl for ScopesModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provide::<RequestTracker>()
            .provide::<Stamp>()
    }
}

#[tokio::test]
async fn test_request_scope_per_context() -> anyhow::Result<()> {
    let app = ApplicationBuilder::new::<ScopesModule>().build().await?;
    // 启动时只检查依赖，不创建请求作用域实例
    assert_eq!(REQUEST_CREATED.load(Ordering::SeqCst), 0);

    let token = Token::of::<RequestTracker>();
    let first = RequestContext::new("GET /cats");
    let second = RequestContext::new("GET /dogs");

    let a: Arc<RequestTracker> = app.resolve_in_context(token.clone(), Some(&first)).await?;
    let b: Arc<RequestTracker> = app.resolve_in_context(token.clone(), Some(&first)).await?;
    let c: Arc<RequestTracker> = app.resolve_in_context(token.clone(), Some(&second)).await?;
    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_ne!(a.serial, c.serial);

    assert_eq!(app.release_context(&first), 1);
    let d: Arc<RequestTracker> = app.resolve_in_context(token, Some(&first)).await?;
    assert!(!Arc::ptr_eq(&a, &d));
    Ok(())
}

#[tokio::test]
async fn test_transient_scope_is_fresh() -> anyhow::Result<()> {
    let app = ApplicationBuilder::new::<ScopesModule>().build().await?;
    let a: Arc<Stamp> = app.resolve(Token::of::<Stamp>()).await?;
    let b: Arc<Stamp> = app.resolve(Token::of::<Stamp>()).await?;
    assert!(!Arc::ptr_eq(&a, &b));
    Ok(())
}

// ---------------------------------------------------------------------------
// 异步工厂
// ---------------------------------------------------------------------------

struct Connection {
    url: String,
}

struct Repository {
    connection: Arc<Connection>,
}

impl Injectable for Repository {
    fn dependencies() -> Vec<Token> {
        vec![Token::name("CONNECTION")]
    }

    fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self {
            connection: deps.take()?,
        })
    }
}

struct AsyncModule;

impl ModuleDecl for AsyncModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provide::<Repository>()
            .provider(Provider::use_async_factory(
                "CONNECTION",
                vec![Token::name("URL")],
                |mut deps| async move {
                    let url: Arc<String> = deps.take()?;
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok::<_, DependencyError>(Connection {
                        url: format!("{}/cats", url),
                    })
                },
            ))
            .provider(Provider::use_value("URL", "postgres://localhost".to_string()))
    }
}

#[tokio::test]
async fn test_async_factory_is_awaited_before_dependants() -> anyhow::Result<()> {
    let app = ApplicationBuilder::new::<AsyncModule>().build().await?;
    let repository: Arc<Repository> = app.get(Token::of::<Repository>())?;
    assert_eq!(repository.connection.url, "postgres://localhost/cats");
    Ok(())
}

// ---------------------------------------------------------------------------
// 解析深度
// ---------------------------------------------------------------------------

macro_rules! chain_link {
    ($name:ident => $next:ty) => {
        struct $name;

        impl Injectable for $name {
            fn dependencies() -> Vec<Token> {
                vec![Token::of::<$next>()]
            }

            fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
                Ok(Self)
            }
        }
    };
}

chain_link!(First => Second);
chain_link!(Second => Third);
chain_link!(Third => Fourth);

struct Fourth;

impl Injectable for Fourth {
    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self)
    }
}

struct ChainModule;

impl ModuleDecl for ChainModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provide::<First>()
            .provide::<Second>()
            .provide::<Third>()
            .provide::<Fourth>()
    }
}

#[tokio::test]
async fn test_resolution_depth_limit() {
    let config = ContainerConfig {
        max_resolution_depth: 2,
        ..ContainerConfig::default()
    };
    let err = ApplicationBuilder::new::<ChainModule>()
        .with_container_config(config)
        .build()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("解析深度超过限制"));

    // 默认深度足够
    assert!(ApplicationBuilder::new::<ChainModule>().build().await.is_ok());
}

// ---------------------------------------------------------------------------
// 应用级提供者与增强器
// ---------------------------------------------------------------------------

struct AuthGuard;

impl Injectable for AuthGuard {
    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self)
    }
}

struct LoggingInterceptor;

impl Injectable for LoggingInterceptor {
    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self)
    }
}

struct CatsController;

impl Injectable for CatsController {
    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self)
    }

    fn declare_metadata(store: &MetadataStore) {
        store.define_methods::<Self>(&["find_all"]);
        store.define_enhancers(
            MetadataTarget::of::<Self>(),
            EnhancerKind::Guards,
            vec![ClassRef::of::<AuthGuard>()],
        );
        store.define_enhancers(
            MetadataTarget::method_of::<Self>("find_all"),
            EnhancerKind::Interceptors,
            vec![ClassRef::of::<LoggingInterceptor>()],
        );
    }
}

struct GuardsModule;

impl ModuleDecl for GuardsModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provider(Provider::use_value(APP_GUARD, "guards".to_string()))
            .provider(
                Provider::use_class::<LoggingInterceptor>(APP_INTERCEPTOR)
                    .with_scope(Scope::Request),
            )
    }
}

struct AppModule;

impl ModuleDecl for AppModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import_module::<GuardsModule>()
            .provider(Provider::use_value(APP_GUARD, "app".to_string()))
            .controller::<CatsController>()
    }
}

#[tokio::test]
async fn test_application_providers_in_discovery_order() -> anyhow::Result<()> {
    let app = ApplicationBuilder::new::<AppModule>().build().await?;
    let config = app.application_config();

    let guards: Vec<String> = config
        .global_guards()
        .into_iter()
        .map(|guard| guard.downcast::<String>().map(|guard| (*guard).clone()))
        .collect::<Result<_, _>>()
        .map_err(|_| anyhow::anyhow!("guard is not a string"))?;
    assert_eq!(guards, vec!["app".to_string(), "guards".to_string()]);

    // 请求作用域的应用级提供者登记包装器
    assert!(config.global_interceptors().is_empty());
    assert_eq!(
        config.global_request_enhancers(EnhancerKind::Interceptors).len(),
        1
    );

    // 应用级提供者不会占用原始令牌
    let guards_module = app
        .container()
        .get_module_by_type::<GuardsModule>()
        .expect("registered");
    assert!(!guards_module.has_provider(&Token::name(APP_GUARD)));
    Ok(())
}

#[tokio::test]
async fn test_enhancers_registered_as_injectables() -> anyhow::Result<()> {
    let app = ApplicationBuilder::new::<AppModule>().build().await?;
    let module = app
        .container()
        .get_module_by_type::<AppModule>()
        .expect("registered");
    let injectables = module.injectables();
    assert!(injectables.contains_key(&Token::of::<AuthGuard>()));
    assert!(injectables.contains_key(&Token::of::<LoggingInterceptor>()));
    assert!(module.controllers().contains_key(&Token::of::<CatsController>()));

    let guard = module.find_wrapper(&Token::of::<AuthGuard>()).expect("registered");
    assert!(guard.is_resolved());
    Ok(())
}

// ---------------------------------------------------------------------------
// 模块引用
// ---------------------------------------------------------------------------

struct Greeter {
    greeting: Arc<String>,
}

impl Injectable for Greeter {
    fn dependencies() -> Vec<Token> {
        vec![Token::name("GREETING")]
    }

    fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self {
            greeting: deps.take()?,
        })
    }
}

struct LazyLoader {
    module_ref: Arc<ModuleRef>,
}

impl Injectable for LazyLoader {
    fn dependencies() -> Vec<Token> {
        vec![Token::of::<ModuleRef>()]
    }

    fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self {
            module_ref: deps.take()?,
        })
    }
}

struct Unregistered;

struct GreetingModule;

impl ModuleDecl for GreetingModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provider(Provider::use_value("GREETING", "hello".to_string()))
            .provide::<LazyLoader>()
    }
}

struct GreetingRoot;

impl ModuleDecl for GreetingRoot {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import_module::<GreetingModule>()
            .provider(Provider::use_value("ROOT_ONLY", 1u8))
    }
}

#[tokio::test]
async fn test_module_ref_lookup_and_create() -> anyhow::Result<()> {
    let app = ApplicationBuilder::new::<GreetingRoot>().build().await?;
    let module = app
        .container()
        .get_module_by_type::<GreetingModule>()
        .expect("registered");

    let loader: Arc<LazyLoader> = app.get(Token::of::<LazyLoader>())?;
    let module_ref = &loader.module_ref;
    assert_eq!(module_ref.module(), module.key());

    let greeting: Arc<String> = module_ref.get("GREETING")?;
    assert_eq!(greeting.as_str(), "hello");

    // 严格模式只查本模块
    let err = module_ref.get::<u8>("ROOT_ONLY").unwrap_err();
    assert!(matches!(err, DependencyError::UnknownToken { .. }));
    let root_only: Arc<u8> = module_ref.find("ROOT_ONLY")?;
    assert_eq!(*root_only, 1);

    let a = module_ref.create::<Greeter>().await?;
    let b = module_ref.create::<Greeter>().await?;
    assert_eq!(a.greeting.as_str(), "hello");
    assert!(!Arc::ptr_eq(&a, &b));

    let err = module_ref
        .create_by_type(TypeInfo::of::<Unregistered>())
        .await
        .unwrap_err();
    assert!(matches!(err, DependencyError::InvalidClass { .. }));
    Ok(())
}

#[tokio::test]
async fn test_select_returns_module_scope() -> anyhow::Result<()> {
    let app = ApplicationBuilder::new::<GreetingRoot>().build().await?;
    let selected = app.select::<GreetingModule>()?;
    let greeting: Arc<String> = selected.resolve("GREETING").await?;
    assert_eq!(greeting.as_str(), "hello");

    // 根模块没有导入 GREETING 的导出
    let err = app.resolve::<String>("GREETING").await.unwrap_err();
    assert!(matches!(err, DependencyError::UnknownToken { .. }));
    Ok(())
}

// ---------------------------------------------------------------------------
// 容器生命周期
// ---------------------------------------------------------------------------

struct LateModule;

impl ModuleDecl for LateModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
    }
}

#[tokio::test]
async fn test_frozen_container_rejects_modules() -> anyhow::Result<()> {
    let app = ApplicationBuilder::new::<GreetingRoot>().build().await?;
    assert!(app.container().is_frozen());
    let err = app
        .container()
        .add_module(&Import::from(ModuleType::of::<LateModule>()), Vec::new())
        .unwrap_err();
    assert!(matches!(err, DependencyError::ContainerFrozen { .. }));

    let unfrozen = ApplicationBuilder::new::<GreetingRoot>()
        .with_container_config(ContainerConfig {
            freeze_after_init: false,
            ..ContainerConfig::default()
        })
        .build()
        .await?;
    assert!(!unfrozen.container().is_frozen());
    Ok(())
}

#[tokio::test]
async fn test_lazy_loading_defers_instances() -> anyhow::Result<()> {
    let app = ApplicationBuilder::new::<GreetingRoot>()
        .with_container_config(ContainerConfig {
            eager_loading: false,
            ..ContainerConfig::default()
        })
        .build()
        .await?;
    assert!(app.get::<LazyLoader>(Token::of::<LazyLoader>()).is_err());

    let loader: Arc<LazyLoader> = app
        .select::<GreetingModule>()?
        .resolve(Token::of::<LazyLoader>())
        .await?;
    let again: Arc<LazyLoader> = app.get(Token::of::<LazyLoader>())?;
    assert!(Arc::ptr_eq(&loader, &again));
    Ok(())
}

// ---------------------------------------------------------------------------
// 作用域沿依赖树传播
// ---------------------------------------------------------------------------

static AUDIT_CREATED: AtomicUsize = AtomicUsize::new(0);

struct AuditTrail;

impl Injectable for AuditTrail {
    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        AUDIT_CREATED.fetch_add(1, Ordering::SeqCst);
        Ok(Self)
    }

    fn scope() -> Scope {
        Scope::Request
    }
}

struct AuditService {
    trail: Arc<AuditTrail>,
}

impl Injectable for AuditService {
    fn dependencies() -> Vec<Token> {
        vec![Token::of::<AuditTrail>()]
    }

    fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self {
            trail: deps.take()?,
        })
    }
}

struct StampHolder {
    stamp: Arc<Stamp>,
}

impl Injectable for StampHolder {
    fn dependencies() -> Vec<Token> {
        vec![Token::of::<Stamp>()]
    }

    fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self {
            stamp: deps.take()?,
        })
    }
}

struct AuditModule;

impl ModuleDecl for AuditModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provide::<AuditService>()
            .provide::<AuditTrail>()
            .provide::<Stamp>()
            .provide::<StampHolder>()
    }
}

#[tokio::test]
async fn test_default_dependant_of_request_provider_is_per_request() -> anyhow::Result<()> {
    let app = ApplicationBuilder::new::<AuditModule>().build().await?;
    // 依赖请求作用域的单例不会在启动时创建
    assert_eq!(AUDIT_CREATED.load(Ordering::SeqCst), 0);
    assert!(app.get::<AuditService>(Token::of::<AuditService>()).is_err());

    let first = RequestContext::new("POST /cats");
    let second = RequestContext::new("POST /dogs");
    let service_token = Token::of::<AuditService>();
    let trail_token = Token::of::<AuditTrail>();

    let s1: Arc<AuditService> = app
        .resolve_in_context(service_token.clone(), Some(&first))
        .await?;
    let s1_again: Arc<AuditService> = app
        .resolve_in_context(service_token.clone(), Some(&first))
        .await?;
    let s2: Arc<AuditService> = app.resolve_in_context(service_token, Some(&second)).await?;
    let own_trail: Arc<AuditTrail> = app.resolve_in_context(trail_token, Some(&first)).await?;

    assert!(Arc::ptr_eq(&s1, &s1_again));
    assert!(!Arc::ptr_eq(&s1, &s2));
    assert!(!Arc::ptr_eq(&s1.trail, &s2.trail));
    // 同一个请求里只有一个请求作用域实例
    assert!(Arc::ptr_eq(&s1.trail, &own_trail));

    assert_eq!(app.release_context(&first), 2);
    Ok(())
}

#[tokio::test]
async fn test_default_dependant_of_transient_provider_stays_singleton() -> anyhow::Result<()> {
    let app = ApplicationBuilder::new::<AuditModule>().build().await?;
    let first = RequestContext::new("GET /stamps");
    let second = RequestContext::new("GET /stamps?page=2");

    let holder: Arc<StampHolder> = app.get(Token::of::<StampHolder>())?;
    let in_first: Arc<StampHolder> = app
        .resolve_in_context(Token::of::<StampHolder>(), Some(&first))
        .await?;
    let in_second: Arc<StampHolder> = app
        .resolve_in_context(Token::of::<StampHolder>(), Some(&second))
        .await?;
    assert!(Arc::ptr_eq(&holder, &in_first));
    assert!(Arc::ptr_eq(&holder, &in_second));

    let stamp: Arc<Stamp> = app.resolve(Token::of::<Stamp>()).await?;
    assert!(!Arc::ptr_eq(&holder.stamp, &stamp));
    Ok(())
}

// ---------------------------------------------------------------------------
// 延迟加载时的构造循环
// ---------------------------------------------------------------------------

struct CycleStart;
struct CycleEnd;

impl Injectable for CycleStart {
    fn dependencies() -> Vec<Token> {
        vec![Token::name("SLOW_C"), Token::of::<CycleEnd>()]
    }

    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self)
    }
}

impl Injectable for CycleEnd {
    fn dependencies() -> Vec<Token> {
        vec![Token::name("SLOW_D"), Token::of::<CycleStart>()]
    }

    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self)
    }
}

fn slow_value(token: &'static str) -> Provider {
    Provider::use_async_factory(token, vec![], |_| async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, DependencyError>(0u8)
    })
}

struct LazyCycleModule;

impl ModuleDecl for LazyCycleModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provide::<CycleStart>()
            .provide::<CycleEnd>()
            .provider(slow_value("SLOW_C"))
            .provider(slow_value("SLOW_D"))
    }
}

#[tokio::test]
async fn test_lazy_container_rejects_provider_cycle_at_startup() {
    let build = ApplicationBuilder::new::<LazyCycleModule>()
        .with_container_config(ContainerConfig {
            eager_loading: false,
            ..ContainerConfig::default()
        })
        .build();
    let err = tokio::time::timeout(Duration::from_secs(2), build)
        .await
        .expect("startup must not hang")
        .unwrap_err();
    match err {
        ApplicationError::DependencyError {
            source: DependencyError::CircularDependency { context, chain },
        } => {
            assert_eq!(context, "CycleStart");
            assert_eq!(chain, "CycleStart -> CycleEnd -> CycleStart");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// 构造参数覆盖与构造失败
// ---------------------------------------------------------------------------

struct NeedsTwo;

impl Injectable for NeedsTwo {
    fn construct(_deps: ResolvedDependencies) -> DependencyResult<Self> {
        Ok(Self)
    }

    fn declare_metadata(store: &MetadataStore) {
        store.define_param_token::<Self>(2, Token::name("B"));
    }
}

struct OverrideModule;

impl ModuleDecl for OverrideModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provide::<NeedsTwo>()
            .provider(Provider::use_value("B", 2u8))
    }
}

#[tokio::test]
async fn test_param_override_outside_declared_list_is_rejected() {
    let err = ApplicationBuilder::new::<OverrideModule>()
        .build()
        .await
        .unwrap_err();
    match err {
        ApplicationError::DependencyError {
            source: DependencyError::InvalidProvider { token, message },
        } => {
            assert_eq!(token, "NeedsTwo");
            assert!(message.contains("[2]"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

struct Port(u16);

impl Injectable for Port {
    fn dependencies() -> Vec<Token> {
        vec![Token::name("RAW_PORT")]
    }

    fn construct(mut deps: ResolvedDependencies) -> DependencyResult<Self> {
        let raw: Arc<String> = deps.take()?;
        raw.parse()
            .map(Self)
            .map_err(|err| DependencyError::creation_failed("Port", err))
    }
}

struct PortModule;

impl ModuleDecl for PortModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provide::<Port>()
            .provider(Provider::use_value("RAW_PORT", "eighty".to_string()))
    }
}

#[tokio::test]
async fn test_failing_constructor_aborts_startup() {
    let err = ApplicationBuilder::new::<PortModule>()
        .build()
        .await
        .unwrap_err();
    match err {
        ApplicationError::DependencyError {
            source: DependencyError::ComponentCreationFailed { type_name, .. },
        } => assert_eq!(type_name, "Port"),
        other => panic!("unexpected error: {other}"),
    }
}
