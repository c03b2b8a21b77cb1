use crate::core::{Indexables, VersionError};
use crate::event::context::RequestContext;
use crate::event::ledger::LedgerSnapshot;
use crate::index::VersionRegistry;
use crate::stats::ReplicationReport;

/// 复制引擎：请求结束时，把生效版本上观察到的入队意图扇出到每个非生效版本
///
/// ## 规则
/// - 只复制“生效版本”桶里的条目；原本就投给非生效版本的条目不再二次传播，
///   因而不会出现 n 路扇出或循环。
/// - 复制期间新产生的入队观察落在非生效版本的桶里，且账本已被取走，不会反馈回本轮。
/// - 版本解析失败一律静默跳过：生效版本上的写入已经完成，不能被副本阻塞。
pub struct ReplicationEngine<'a> {
    registry: &'a VersionRegistry,
    indexables: &'a Indexables,
}

impl<'a> ReplicationEngine<'a> {
    pub fn new(registry: &'a VersionRegistry, indexables: &'a Indexables) -> Self {
        Self {
            registry,
            indexables,
        }
    }

    pub fn replicate(
        &self,
        snapshot: LedgerSnapshot,
        ctx: &mut RequestContext<'_>,
    ) -> ReplicationReport {
        let mut report = ReplicationReport::default();

        for (slug, by_version) in snapshot {
            report.types_seen += 1;

            let Some(indexable) = self.indexables.get(&slug) else {
                let e = VersionError::UnresolvableType(slug.clone());
                tracing::warn!("Replication skipped: {}", e);
                report.skipped_unresolvable += 1;
                continue;
            };

            let versions = self.registry.get_versions(&indexable.slug);
            if versions.len() <= 1 {
                report.skipped_single_version += 1;
                continue;
            }

            let active = versions.active_number();
            let active_entries = match by_version.get(&active) {
                Some(entries) if !entries.is_empty() => entries,
                _ => {
                    tracing::debug!(
                        "Replication skipped for {}: nothing queued against active version {}",
                        slug,
                        active
                    );
                    report.skipped_no_active_activity += 1;
                    continue;
                }
            };

            report.types_replicated += 1;
            for target in versions.inactive().numbers() {
                if let Err(e) = ctx.set_current_version(&slug, target) {
                    tracing::debug!("Replication to {} v{} skipped: {}", slug, target, e);
                    report.version_switch_failures += 1;
                    continue;
                }

                for entry in active_entries {
                    let options = entry.options.clone().with_index_version(target);
                    match ctx.queue_object(entry.object_id, &slug, options) {
                        Ok(_) => report.replicas_queued += 1,
                        Err(e) => {
                            tracing::warn!(
                                "Replica enqueue failed: type={} object={} version={}: {}",
                                slug,
                                entry.object_id,
                                target,
                                e
                            );
                            report.replica_failures += 1;
                        }
                    }
                }

                ctx.reset_current_version(&slug);
            }

            tracing::debug!(
                "Replicated {} job(s) of {} from v{} to {} inactive version(s)",
                active_entries.len(),
                slug,
                active,
                versions.len() - 1
            );
        }

        report
    }
}
