//! 树配置
//!
//! 可从 JSON 文件加载，缺省字段使用默认值

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Delay before a node that is still resolving is rendered busy.
    pub busy_delay_ms: u64,
    pub prune_collapsed: bool,
    pub case_sensitive_filter: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            busy_delay_ms: 800,
            prune_collapsed: true,
            case_sensitive_filter: false,
        }
    }
}

impl TreeConfig {
    pub fn busy_delay(&self) -> Duration {
        Duration::from_millis(self.busy_delay_ms)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default tree config");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
