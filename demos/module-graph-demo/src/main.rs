//! # 示例应用程序
//!
//! 演示如何声明模块、构建模块图并解析实例

use clap::Parser;
use component_macros::Injectable;
use di_abstractions::{
    DynamicModule, InstanceResolverExt, ModuleDecl, ModuleMetadata, Provider, APP_GUARD,
};
use di_common::{DependencyError, RequestContext, Token};
use di_composition::{ApplicationBuilder, ApplicationContext, ApplicationSettings, LoggingConfig};
use di_impl::ModuleRef;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "module-graph-demo")]
#[command(about = "模块图依赖注入示例")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 使用 JSON 日志
    #[arg(long)]
    json: bool,
}

// ---------------------------------------------------------------------------
// 数据库模块（全局）
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Connection {
    url: String,
}

struct DatabaseModule;

impl ModuleDecl for DatabaseModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provider(Provider::use_async_factory(
                "CONNECTION",
                vec![Token::name("DATABASE_URL")],
                |mut deps| async move {
                    let url: Arc<String> = deps.take()?;
                    if !url.starts_with("postgres://") {
                        return Err(DependencyError::creation_failed(
                            "Connection",
                            format!("不支持的数据库地址: {url}"),
                        ));
                    }
                    // 模拟建立连接
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok::<_, DependencyError>(Connection {
                        url: url.to_string(),
                    })
                },
            ))
            .export("CONNECTION")
            .global()
    }
}

// ---------------------------------------------------------------------------
// 配置模块（动态）
// ---------------------------------------------------------------------------

struct ConfigModule;

impl ModuleDecl for ConfigModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
    }
}

impl ConfigModule {
    fn register(database_url: &str) -> DynamicModule {
        DynamicModule::new::<ConfigModule>()
            .provider(Provider::use_value("DATABASE_URL", database_url.to_string()))
            .export("DATABASE_URL")
            .global()
    }
}

// ---------------------------------------------------------------------------
// 猫模块
// ---------------------------------------------------------------------------

#[derive(Debug, Injectable)]
struct CatsRepository {
    #[inject(token = "CONNECTION")]
    connection: Arc<Connection>,
}

impl CatsRepository {
    fn find_all(&self) -> Vec<String> {
        vec![
            format!("Tom@{}", self.connection.url),
            format!("Garfield@{}", self.connection.url),
        ]
    }
}

#[derive(Debug, Injectable)]
struct CatsService {
    #[inject]
    repository: Arc<CatsRepository>,
}

#[derive(Debug, Injectable)]
#[injectable(request)]
struct RequestLogger;

#[derive(Injectable)]
#[injectable(methods(find_all))]
struct CatsController {
    #[inject]
    service: Arc<CatsService>,
    #[inject]
    module_ref: Arc<ModuleRef>,
}

impl CatsController {
    async fn find_all(&self, context: &RequestContext) -> anyhow::Result<Vec<String>> {
        let _logger: Arc<RequestLogger> = self
            .module_ref
            .resolve_in_context(&Token::of::<RequestLogger>(), context)
            .await?;
        Ok(self.service.repository.find_all())
    }
}

struct CatsModule;

impl ModuleDecl for CatsModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .provide::<CatsRepository>()
            .provide::<CatsService>()
            .provide::<RequestLogger>()
            .controller::<CatsController>()
            .export_type::<CatsService>()
    }
}

// ---------------------------------------------------------------------------
// 根模块
// ---------------------------------------------------------------------------

struct AppModule;

impl ModuleDecl for AppModule {
    fn metadata() -> ModuleMetadata {
        ModuleMetadata::new()
            .import(ConfigModule::register("postgres://localhost/cats"))
            .import_module::<DatabaseModule>()
            .import_module::<CatsModule>()
            .provider(Provider::use_value(APP_GUARD, "AuthGuard".to_string()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => ApplicationSettings::load(path)?,
        None => ApplicationSettings::from_env()?,
    };
    let logging = settings.logging.clone().unwrap_or_else(|| LoggingConfig {
        level: args.log_level.clone(),
        json_format: args.json,
        ..LoggingConfig::default()
    });

    let app = ApplicationBuilder::new::<AppModule>()
        .with_settings(settings)
        .with_logging(logging)
        .build()
        .await?;

    info!("启动模块图示例应用");
    describe_modules(&app);
    handle_requests(&app).await?;

    info!("应用已关闭");
    Ok(())
}

/// 打印模块图
fn describe_modules(app: &ApplicationContext) {
    for module in app.container().get_modules() {
        info!(
            "模块 {}: {} 个提供者, {} 个控制器, 导出 {:?}",
            module.name(),
            module.providers().len(),
            module.controllers().len(),
            module
                .exports()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        );
    }
    info!(
        "全局守卫: {} 个",
        app.application_config().global_guards().len()
    );
}

/// 模拟两个请求
async fn handle_requests(app: &ApplicationContext) -> anyhow::Result<()> {
    let controller: Arc<CatsController> = app.get(Token::of::<CatsController>())?;
    for name in ["GET /cats", "GET /cats?page=2"] {
        let context = RequestContext::new(name);
        let cats = controller.find_all(&context).await?;
        info!("{} -> {:?}", context.name, cats);
        app.release_context(&context);
    }
    Ok(())
}
