use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::Indexables;
use crate::storage::StoreScope;

/// 运行配置（TOML）
///
/// ```toml
/// network_mode = false
/// site_id = 1
/// store_path = "/var/lib/index-gen/settings.json"
/// indexables = ["post", "term", "user", "comment"]
/// index_prefix = "site"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 网络模式：版本数据存放在全网络作用域，而不是单站点
    pub network_mode: bool,
    pub site_id: u64,
    pub store_path: PathBuf,
    pub indexables: Vec<String>,
    pub index_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_mode: false,
            site_id: 1,
            store_path: default_store_path(),
            indexables: ["post", "term", "user", "comment"]
                .into_iter()
                .map(String::from)
                .collect(),
            index_prefix: "site".to_string(),
        }
    }
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("index-gen")
        .join("settings.json")
}

impl Config {
    /// 读取 TOML；文件不存在时使用默认配置
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("Config {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let cfg: Config = toml::from_str(text)?;
        Ok(cfg)
    }

    /// “网络模式”判定：决定版本数据的存储作用域
    pub fn scope(&self) -> StoreScope {
        if self.network_mode {
            StoreScope::Network
        } else {
            StoreScope::Site(self.site_id)
        }
    }

    pub fn indexables(&self) -> Indexables {
        Indexables::from_slugs(self.indexables.iter().cloned())
    }
}
