use crate::core::{Indexables, QueueError, VersionError, VersionResult};
use crate::event::ledger::ReplicationLedger;
use crate::event::queue::{IndexQueue, JobOptions, QueuedJob};
use crate::event::replicate::ReplicationEngine;
use crate::index::{VersionRegistry, VersionState};
use crate::stats::ReplicationReport;

/// 请求上下文：请求开始时创建，`shutdown` 时消费
///
/// 独占本次请求的“当前版本”覆盖表与复制账本；不同请求之间不共享任何内存状态。
/// 注册表、类型表与下游队列只是借用。
pub struct RequestContext<'a> {
    registry: &'a VersionRegistry,
    indexables: &'a Indexables,
    queue: &'a dyn IndexQueue,
    state: VersionState,
    ledger: ReplicationLedger,
}

impl<'a> RequestContext<'a> {
    pub fn new(
        registry: &'a VersionRegistry,
        indexables: &'a Indexables,
        queue: &'a dyn IndexQueue,
    ) -> Self {
        Self {
            registry,
            indexables,
            queue,
            state: VersionState::new(),
            ledger: ReplicationLedger::new(),
        }
    }

    pub fn registry(&self) -> &'a VersionRegistry {
        self.registry
    }

    pub fn ledger(&self) -> &ReplicationLedger {
        &self.ledger
    }

    pub fn set_current_version(&mut self, slug: &str, number: u32) -> VersionResult<()> {
        self.state.set_current_version(self.registry, slug, number)
    }

    pub fn reset_current_version(&mut self, slug: &str) {
        self.state.reset_current_version(slug);
    }

    pub fn get_current_version_number(&self, slug: &str) -> u32 {
        self.state.get_current_version_number(self.registry, slug)
    }

    /// 在指定版本的视角下执行 `f`，结束后（无论成败）恢复原先的覆盖
    pub fn with_version<T, E, F>(&mut self, slug: &str, number: u32, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<VersionError>,
    {
        let previous = self.state.current_override(slug);
        self.set_current_version(slug, number)?;
        let out = f(self);
        self.state.restore_override(slug, previous);
        out
    }

    /// 入队一个索引任务
    ///
    /// 未显式指定 `index_version` 时打上当前版本；入队成功后记入账本。
    /// 返回实际使用的版本号。
    pub fn queue_object(
        &mut self,
        object_id: u64,
        slug: &str,
        mut options: JobOptions,
    ) -> Result<u32, QueueError> {
        let version = match options.index_version {
            Some(v) => v,
            None => self.get_current_version_number(slug),
        };
        options.index_version = Some(version);

        let job = QueuedJob {
            object_id,
            slug: slug.to_string(),
            options,
        };
        self.queue.enqueue(&job)?;

        self.ledger
            .on_object_queued(object_id, slug, job.options, version);
        Ok(version)
    }

    /// 请求结束：取走账本并执行复制，随后丢弃全部请求级状态
    pub fn shutdown(mut self) -> ReplicationReport {
        let snapshot = self.ledger.drain();
        if snapshot.is_empty() {
            return ReplicationReport::default();
        }

        let engine = ReplicationEngine::new(self.registry, self.indexables);
        let report = engine.replicate(snapshot, &mut self);
        if !report.is_noop() {
            tracing::info!(
                "Request replication: {} replica(s) queued, {} failed",
                report.replicas_queued,
                report.replica_failures
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::queue::RecordingQueue;
    use crate::storage::{MemoryStore, StoreScope};
    use std::sync::Arc;

    fn registry_with_two_versions() -> VersionRegistry {
        let reg = VersionRegistry::new(Arc::new(MemoryStore::new()), StoreScope::Site(1));
        reg.add_version("post").unwrap();
        reg
    }

    #[test]
    fn active_change_is_replicated_to_inactive_version() {
        let reg = registry_with_two_versions();
        let idx = Indexables::from_slugs(["post"]);
        let q = RecordingQueue::new();

        let mut ctx = RequestContext::new(&reg, &idx, &q);
        let opts = JobOptions::new().with("reason", "save_post");
        assert_eq!(ctx.queue_object(42, "post", opts).unwrap(), 1);

        let report = ctx.shutdown();
        assert_eq!(report.replicas_queued, 1);

        let jobs = q.jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].object_id, 42);
        assert_eq!(jobs[0].options.index_version, Some(1));
        assert_eq!(jobs[1].object_id, 42);
        assert_eq!(jobs[1].options.index_version, Some(2));
        assert_eq!(jobs[0].options.extra, jobs[1].options.extra);
    }

    #[test]
    fn inactive_only_change_is_not_replicated() {
        let reg = registry_with_two_versions();
        let idx = Indexables::from_slugs(["post"]);
        let q = RecordingQueue::new();

        let mut ctx = RequestContext::new(&reg, &idx, &q);
        ctx.queue_object(42, "post", JobOptions::new().with_index_version(2))
            .unwrap();
        let report = ctx.shutdown();

        assert_eq!(report.skipped_no_active_activity, 1);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn one_job_per_version_after_activation_switch() {
        let reg = registry_with_two_versions();
        reg.add_version("post").unwrap();
        reg.activate_version("post", 3).unwrap();
        let idx = Indexables::from_slugs(["post"]);
        let q = RecordingQueue::new();

        let mut ctx = RequestContext::new(&reg, &idx, &q);
        assert_eq!(ctx.queue_object(7, "post", JobOptions::new()).unwrap(), 3);
        ctx.shutdown();

        for v in [1, 2, 3] {
            assert_eq!(q.jobs_for("post", v).len(), 1, "version {v}");
        }
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn current_override_steers_unversioned_jobs() {
        let reg = registry_with_two_versions();
        let idx = Indexables::from_slugs(["post"]);
        let q = RecordingQueue::new();

        let mut ctx = RequestContext::new(&reg, &idx, &q);
        ctx.set_current_version("post", 2).unwrap();
        assert_eq!(ctx.queue_object(1, "post", JobOptions::new()).unwrap(), 2);
        ctx.reset_current_version("post");
        assert_eq!(ctx.queue_object(2, "post", JobOptions::new()).unwrap(), 1);

        assert_eq!(ctx.ledger().entries("post", 2).len(), 1);
        assert_eq!(ctx.ledger().entries("post", 1).len(), 1);
    }

    #[test]
    fn with_version_restores_previous_override_even_on_error() {
        let reg = registry_with_two_versions();
        reg.add_version("post").unwrap();
        let idx = Indexables::from_slugs(["post"]);
        let q = RecordingQueue::new();
        let mut ctx = RequestContext::new(&reg, &idx, &q);

        ctx.set_current_version("post", 3).unwrap();
        let r: Result<(), QueueError> = ctx.with_version("post", 2, |c| {
            assert_eq!(c.get_current_version_number("post"), 2);
            Err(QueueError::Rejected {
                object_id: 1,
                slug: "post".into(),
                reason: "nope".into(),
            })
        });
        assert!(r.is_err());
        assert_eq!(ctx.get_current_version_number("post"), 3);

        let r: Result<u32, QueueError> =
            ctx.with_version("post", 9, |c| Ok(c.get_current_version_number("post")));
        assert!(matches!(r, Err(QueueError::Version(VersionError::InvalidVersion { .. }))));
        assert_eq!(ctx.get_current_version_number("post"), 3);
    }

    #[test]
    fn requests_do_not_share_state() {
        let reg = registry_with_two_versions();
        let idx = Indexables::from_slugs(["post"]);
        let q = RecordingQueue::new();

        let mut a = RequestContext::new(&reg, &idx, &q);
        let b = RequestContext::new(&reg, &idx, &q);
        a.set_current_version("post", 2).unwrap();
        a.queue_object(1, "post", JobOptions::new()).unwrap();

        assert_eq!(b.get_current_version_number("post"), 1);
        assert!(b.ledger().is_empty());
        assert!(b.shutdown().is_noop());

        // a 的唯一任务投给了非生效版本，不复制
        assert!(a.shutdown().is_noop());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn empty_request_shutdown_is_noop() {
        let reg = registry_with_two_versions();
        let idx = Indexables::from_slugs(["post"]);
        let q = RecordingQueue::new();
        let report = RequestContext::new(&reg, &idx, &q).shutdown();
        assert_eq!(report, ReplicationReport::default());
    }
}
