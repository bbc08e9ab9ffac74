//! 容器配置

use di_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 构造链的最大深度
    pub max_resolution_depth: usize,
    /// 启动时实例化所有默认作用域的提供者
    pub eager_loading: bool,
    /// 启动时检查瞬时和请求作用域提供者的依赖是否可见
    pub verify_scoped_dependencies: bool,
    /// 实例加载完成后冻结容器
    pub freeze_after_init: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: 100,
            eager_loading: true,
            verify_scoped_dependencies: true,
            freeze_after_init: true,
        }
    }
}

impl ContainerConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::validation("max_resolution_depth 必须大于 0"));
        }
        Ok(())
    }
}
