use std::sync::Arc;

use serde_json::{Map, Value};

use crate::core::{
    now_unix, IndexVersion, Indexable, StoreError, VersionError, VersionResult, VersionSet,
    DEFAULT_VERSION,
};
use crate::storage::{SettingsStore, StoreScope};

/// 存放全部类型版本数据的唯一 key：`{ "<type>": { "<n>": IndexVersion, ... }, ... }`
pub const VERSIONS_KEY: &str = "index_versions";

/// 显式新增的第一个版本号下限：1 永远代表原始 / 默认那一代索引
const MIN_ALLOCATED_VERSION: u32 = 2;

/// 版本注册表：按 indexable 类型创建 / 读取 / 归一化 / 持久化版本记录
///
/// 所有写路径都汇聚到 `update_versions`，存储作用域（站点 / 网络）只在这里决定。
pub struct VersionRegistry {
    store: Arc<dyn SettingsStore>,
    scope: StoreScope,
    index_prefix: String,
}

impl VersionRegistry {
    pub fn new(store: Arc<dyn SettingsStore>, scope: StoreScope) -> Self {
        Self {
            store,
            scope,
            index_prefix: String::new(),
        }
    }

    pub fn with_index_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.index_prefix = prefix.into();
        self
    }

    pub fn scope(&self) -> StoreScope {
        self.scope
    }

    /// 读取所有类型的原始版本数据；非对象视为空
    fn load_all(&self) -> Result<Map<String, Value>, StoreError> {
        match self.store.load(VERSIONS_KEY, self.scope)? {
            Some(Value::Object(m)) => Ok(m),
            Some(Value::Null) | None => Ok(Map::new()),
            Some(_) => {
                tracing::warn!(
                    "Stored {} ({}) is not a mapping, treating as empty",
                    VERSIONS_KEY,
                    self.scope
                );
                Ok(Map::new())
            }
        }
    }

    fn try_get_versions(&self, slug: &str) -> Result<VersionSet, StoreError> {
        let all = self.load_all()?;
        Ok(VersionSet::normalize(all.get(slug)))
    }

    /// 读取某类型的全部版本（已归一化）；读失败时降级为隐式的 1 号版本，从不报错
    pub fn get_versions(&self, slug: &str) -> VersionSet {
        match self.try_get_versions(slug) {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!("Failed to load index versions for {}: {}, using default", slug, e);
                VersionSet::implicit()
            }
        }
    }

    pub fn get_version(&self, slug: &str, number: u32) -> Option<IndexVersion> {
        self.get_versions(slug).get(number).cloned()
    }

    /// 标记为 active 的版本；没有任何标记时返回 None（此时 1 号版本隐式生效）
    pub fn get_active_version(&self, slug: &str) -> Option<IndexVersion> {
        self.get_versions(slug).active().cloned()
    }

    pub fn get_active_version_number(&self, slug: &str) -> u32 {
        self.get_versions(slug).active_number()
    }

    pub fn get_inactive_versions(&self, slug: &str) -> VersionSet {
        self.get_versions(slug).inactive()
    }

    /// 下一个可分配的版本号：max + 1，下限为 2；溢出时返回 None
    pub fn get_next_version_number(&self, slug: &str) -> Option<u32> {
        next_version_number(&self.get_versions(slug))
    }

    /// 新建一个（未激活的）版本并持久化
    pub fn add_version(&self, slug: &str) -> VersionResult<IndexVersion> {
        let allocation_failure = |reason: String| VersionError::AllocationFailure {
            slug: slug.to_string(),
            reason,
        };

        let mut set = self
            .try_get_versions(slug)
            .map_err(|e| allocation_failure(e.to_string()))?;
        let number = next_version_number(&set)
            .ok_or_else(|| allocation_failure("unable to get next version number".into()))?;

        let version = IndexVersion::fresh(number, now_unix());
        set.insert(version.clone());

        self.update_versions(slug, &set)
            .map_err(|e| allocation_failure(e.to_string()))?;

        tracing::info!("Index version created: type={} version={}", slug, number);
        Ok(version)
    }

    /// 激活指定版本：目标版本 active=true，其余全部 active=false，整体一次写入
    pub fn activate_version(&self, slug: &str, number: u32) -> VersionResult<IndexVersion> {
        let activation_failure = |reason: String| VersionError::ActivationFailure {
            slug: slug.to_string(),
            number,
            reason,
        };

        let mut set = self
            .try_get_versions(slug)
            .map_err(|e| activation_failure(e.to_string()))?;

        if !set.mark_active(number, now_unix()) {
            return Err(VersionError::InvalidVersion {
                slug: slug.to_string(),
                number,
            });
        }

        self.update_versions(slug, &set)
            .map_err(|e| activation_failure(e.to_string()))?;

        tracing::info!("Index version activated: type={} version={}", slug, number);
        set.get(number)
            .cloned()
            .ok_or_else(|| activation_failure("activated version vanished".into()))
    }

    /// 唯一的持久化原语：替换某类型的整个版本集合（last-writer-wins）
    pub fn update_versions(&self, slug: &str, versions: &VersionSet) -> Result<(), StoreError> {
        let mut all = self.load_all()?;
        all.insert(slug.to_string(), versions.to_value());
        self.store.save(VERSIONS_KEY, Value::Object(all), self.scope)
    }

    /// 某一代索引在后端的索引名
    pub fn index_name(&self, indexable: &Indexable, number: u32) -> String {
        indexable.index_name(&self.index_prefix, number)
    }

    /// 生效版本对应的索引名
    pub fn active_index_name(&self, indexable: &Indexable) -> String {
        let n = self.get_active_version_number(&indexable.slug);
        self.index_name(indexable, n)
    }
}

fn next_version_number(set: &VersionSet) -> Option<u32> {
    let max = set.max_number().unwrap_or(DEFAULT_VERSION);
    max.checked_add(1).map(|n| n.max(MIN_ALLOCATED_VERSION))
}
