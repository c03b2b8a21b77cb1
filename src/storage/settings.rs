use std::fmt;

use dashmap::DashMap;
use serde_json::Value;

use crate::core::StoreError;

/// 设置的作用域：单站点 or 全网络（二者互斥，由部署模式决定）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreScope {
    Site(u64),
    Network,
}

impl fmt::Display for StoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreScope::Site(id) => write!(f, "site:{}", id),
            StoreScope::Network => write!(f, "network"),
        }
    }
}

/// 持久化 KV 设置存储（外部协作方的适配层）
///
/// ## 契约
/// - `save` 成功后，同进程内随后的 `load` 必须读到新值（read-after-write）。
/// - 值是任意嵌套 JSON；结构校验由上层负责。
pub trait SettingsStore: Send + Sync {
    fn load(&self, key: &str, scope: StoreScope) -> Result<Option<Value>, StoreError>;
    fn save(&self, key: &str, value: Value, scope: StoreScope) -> Result<(), StoreError>;
}

/// 纯内存实现（测试 / 单进程嵌入）
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: DashMap<(StoreScope, String), Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self, key: &str, scope: StoreScope) -> Result<Option<Value>, StoreError> {
        Ok(self
            .inner
            .get(&(scope, key.to_string()))
            .map(|v| v.value().clone()))
    }

    fn save(&self, key: &str, value: Value, scope: StoreScope) -> Result<(), StoreError> {
        self.inner.insert((scope, key.to_string()), value);
        Ok(())
    }
}
