use std::collections::BTreeMap;

use crate::event::queue::JobOptions;

/// 一次被观察到的入队意图
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerEntry {
    pub object_id: u64,
    pub options: JobOptions,
}

/// type -> version -> 按插入顺序排列的条目
pub type LedgerSnapshot = BTreeMap<String, BTreeMap<u32, Vec<LedgerEntry>>>;

/// 复制账本：记录本次请求内所有入队事件（任意版本），只观察、不做 I/O
#[derive(Debug, Default)]
pub struct ReplicationLedger {
    entries: LedgerSnapshot,
    observed: usize,
}

impl ReplicationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_object_queued(
        &mut self,
        object_id: u64,
        slug: &str,
        options: JobOptions,
        version: u32,
    ) {
        self.entries
            .entry(slug.to_string())
            .or_default()
            .entry(version)
            .or_default()
            .push(LedgerEntry { object_id, options });
        self.observed += 1;
    }

    /// 取走累计的全部条目（请求结束时调用一次）
    pub fn drain(&mut self) -> LedgerSnapshot {
        self.observed = 0;
        std::mem::take(&mut self.entries)
    }

    pub fn entries(&self, slug: &str, version: u32) -> &[LedgerEntry] {
        self.entries
            .get(slug)
            .and_then(|by_version| by_version.get(&version))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.observed
    }

    pub fn is_empty(&self) -> bool {
        self.observed == 0
    }
}
