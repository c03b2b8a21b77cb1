use std::fmt;

/// 一次请求结束时复制过程的统计
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    /// 账本中出现的类型数
    pub types_seen: usize,
    /// 实际发生复制的类型数
    pub types_replicated: usize,
    /// 已注销 / 未知类型（静默跳过）
    pub skipped_unresolvable: usize,
    /// 只有一个版本，无需复制
    pub skipped_single_version: usize,
    /// 生效版本上没有任何入队记录（只复制生效版本的变更）
    pub skipped_no_active_activity: usize,
    /// 切换当前版本失败的 (类型, 版本) 次数
    pub version_switch_failures: usize,
    /// 成功入队的副本任务数
    pub replicas_queued: usize,
    /// 副本入队失败数
    pub replica_failures: usize,
}

impl ReplicationReport {
    pub fn is_noop(&self) -> bool {
        self.replicas_queued == 0 && self.replica_failures == 0
    }

    pub fn merge(&mut self, other: &ReplicationReport) {
        self.types_seen += other.types_seen;
        self.types_replicated += other.types_replicated;
        self.skipped_unresolvable += other.skipped_unresolvable;
        self.skipped_single_version += other.skipped_single_version;
        self.skipped_no_active_activity += other.skipped_no_active_activity;
        self.version_switch_failures += other.version_switch_failures;
        self.replicas_queued += other.replicas_queued;
        self.replica_failures += other.replica_failures;
    }
}

impl fmt::Display for ReplicationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "╔══════════════════════════════════════════════════╗")?;
        writeln!(f, "║           index-gen Replication Report           ║")?;
        writeln!(f, "╠══════════════════════════════════════════════════╣")?;
        writeln!(f, "║   types seen:       {:>10}                   ║", self.types_seen)?;
        writeln!(
            f,
            "║   types replicated: {:>10}                   ║",
            self.types_replicated
        )?;
        writeln!(f, "╠──────────────────────────────────────────────────╣")?;
        writeln!(f, "║ Skipped:                                         ║")?;
        writeln!(
            f,
            "║   unresolvable:     {:>10}                   ║",
            self.skipped_unresolvable
        )?;
        writeln!(
            f,
            "║   single version:   {:>10}                   ║",
            self.skipped_single_version
        )?;
        writeln!(
            f,
            "║   no active jobs:   {:>10}                   ║",
            self.skipped_no_active_activity
        )?;
        writeln!(f, "╠──────────────────────────────────────────────────╣")?;
        writeln!(f, "║ Replicas:                                        ║")?;
        writeln!(
            f,
            "║   queued:           {:>10}                   ║",
            self.replicas_queued
        )?;
        writeln!(
            f,
            "║   failed:           {:>10}                   ║",
            self.replica_failures
        )?;
        writeln!(
            f,
            "║   switch failures:  {:>10}                   ║",
            self.version_switch_failures
        )?;
        writeln!(f, "╚══════════════════════════════════════════════════╝")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_and_display() {
        let mut a = ReplicationReport {
            types_seen: 1,
            replicas_queued: 2,
            ..Default::default()
        };
        assert!(!a.is_noop());
        a.merge(&ReplicationReport {
            types_seen: 2,
            skipped_unresolvable: 1,
            ..Default::default()
        });
        assert_eq!(a.types_seen, 3);
        assert_eq!(a.skipped_unresolvable, 1);

        let s = a.to_string();
        assert!(s.contains("Replication Report"));
        assert!(ReplicationReport::default().is_noop());
    }
}
