use std::collections::HashMap;

use crate::core::{VersionError, VersionResult};
use crate::index::registry::VersionRegistry;

/// 请求级的“当前版本”覆盖表
///
/// - current：调用点临时指定的视角，只活在本次请求内，从不落盘
/// - active：注册表里持久化的权威版本
///
/// 没有覆盖时 current == active。复制引擎正是借助覆盖把下游入队逻辑
/// 临时重定向到某个非生效版本，而不去改动持久化状态。
#[derive(Debug, Default)]
pub struct VersionState {
    overrides: HashMap<String, u32>,
}

impl VersionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 覆盖当前版本；版本号必须存在于该类型的版本集合中
    pub fn set_current_version(
        &mut self,
        registry: &VersionRegistry,
        slug: &str,
        number: u32,
    ) -> VersionResult<()> {
        if !registry.get_versions(slug).contains(number) {
            return Err(VersionError::InvalidVersion {
                slug: slug.to_string(),
                number,
            });
        }
        self.overrides.insert(slug.to_string(), number);
        Ok(())
    }

    pub fn reset_current_version(&mut self, slug: &str) {
        self.overrides.remove(slug);
    }

    /// 恢复之前的覆盖（不再校验：该值当初已经校验过）
    pub(crate) fn restore_override(&mut self, slug: &str, previous: Option<u32>) {
        match previous {
            Some(n) => {
                self.overrides.insert(slug.to_string(), n);
            }
            None => {
                self.overrides.remove(slug);
            }
        }
    }

    pub fn current_override(&self, slug: &str) -> Option<u32> {
        self.overrides.get(slug).copied()
    }

    pub fn get_current_version_number(&self, registry: &VersionRegistry, slug: &str) -> u32 {
        match self.current_override(slug) {
            Some(n) => n,
            None => registry.get_active_version_number(slug),
        }
    }

    /// 请求边界：清空全部覆盖
    pub fn clear(&mut self) {
        self.overrides.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StoreScope};
    use std::sync::Arc;

    fn registry() -> VersionRegistry {
        VersionRegistry::new(Arc::new(MemoryStore::new()), StoreScope::Site(1))
    }

    #[test]
    fn override_then_reset_falls_back_to_active() {
        let reg = registry();
        reg.add_version("post").unwrap();
        let mut st = VersionState::new();

        assert_eq!(st.get_current_version_number(&reg, "post"), 1);
        st.set_current_version(&reg, "post", 2).unwrap();
        assert_eq!(st.get_current_version_number(&reg, "post"), 2);
        // 覆盖不影响持久化的 active
        assert_eq!(reg.get_active_version_number("post"), 1);

        st.reset_current_version("post");
        assert_eq!(st.get_current_version_number(&reg, "post"), 1);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let reg = registry();
        let mut st = VersionState::new();
        let err = st.set_current_version(&reg, "post", 2).unwrap_err();
        assert!(matches!(err, VersionError::InvalidVersion { number: 2, .. }));
        assert_eq!(st.current_override("post"), None);
    }

    #[test]
    fn override_is_per_type() {
        let reg = registry();
        reg.add_version("post").unwrap();
        let mut st = VersionState::new();
        st.set_current_version(&reg, "post", 2).unwrap();
        assert_eq!(st.get_current_version_number(&reg, "user"), 1);

        st.clear();
        assert_eq!(st.current_override("post"), None);
    }

    #[test]
    fn reset_tracks_later_activation() {
        let reg = registry();
        reg.add_version("post").unwrap();
        reg.add_version("post").unwrap();
        let mut st = VersionState::new();
        st.set_current_version(&reg, "post", 3).unwrap();
        reg.activate_version("post", 2).unwrap();
        assert_eq!(st.get_current_version_number(&reg, "post"), 3);
        st.reset_current_version("post");
        assert_eq!(st.get_current_version_number(&reg, "post"), 2);
    }
}
