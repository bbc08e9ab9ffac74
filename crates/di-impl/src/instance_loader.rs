//! 实例加载器
//!
//! 扫描完成后先检查整张依赖图没有构造循环，再按模块注册顺序创建所有单例实例，
//! 并检查非单例提供者的依赖是否可见。循环检查不受延迟加载影响。

use crate::container::Container;
use crate::injector::Injector;
use crate::module::ModuleNode;
use di_common::{DependencyResult, Scope};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// 实例加载器
#[derive(Debug, Clone)]
pub struct InstanceLoader {
    container: Arc<Container>,
    injector: Injector,
}

impl InstanceLoader {
    pub fn new(container: Arc<Container>) -> Self {
        let injector = Injector::new(container.clone());
        Self {
            container,
            injector,
        }
    }

    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    /// 创建所有模块的依赖实例
    pub async fn create_instances_of_dependencies(&self) -> DependencyResult<()> {
        self.verify_acyclic()?;
        for module in self.container.get_modules() {
            self.create_instances(&module).await?;
            info!("{} 依赖已初始化", module.name());
        }
        Ok(())
    }

    /// 检查所有模块的提供者之间没有构造循环
    pub fn verify_acyclic(&self) -> DependencyResult<()> {
        let mut finished = HashSet::new();
        for module in self.container.get_modules() {
            for wrapper in module.wrappers() {
                self.injector.verify_acyclic(&wrapper, &mut finished)?;
            }
        }
        debug!("依赖图无循环: {} 个包装器", finished.len());
        Ok(())
    }

    async fn create_instances(&self, module: &ModuleNode) -> DependencyResult<()> {
        let config = self.container.config();
        // 提供者、可注入项、控制器依次处理
        for wrapper in module.wrappers() {
            match self.injector.effective_scope(&wrapper) {
                Scope::Default if config.eager_loading => {
                    self.injector.load_wrapper(&wrapper, None).await?;
                }
                Scope::Default => {}
                Scope::Transient | Scope::Request if config.verify_scoped_dependencies => {
                    self.injector.verify_dependencies(&wrapper)?;
                    debug!("{} 的依赖检查通过 ({})", wrapper.name(), wrapper.scope());
                }
                Scope::Transient | Scope::Request => {}
            }
        }
        Ok(())
    }
}
