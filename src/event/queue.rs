use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::QueueError;

/// 入队选项：开放映射，`index_version` 是下游 worker 认识的保留字段
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_version: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index_version(mut self, version: u32) -> Self {
        self.index_version = Some(version);
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// 一条已解析出目标版本的索引任务
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub object_id: u64,
    pub slug: String,
    pub options: JobOptions,
}

impl QueuedJob {
    /// 入队时必然已写入 index_version；缺失时按 1 号版本处理
    pub fn index_version(&self) -> u32 {
        self.options.index_version.unwrap_or(crate::core::DEFAULT_VERSION)
    }
}

/// 下游索引队列（外部协作方）。实现方负责真正的调度 / 执行。
pub trait IndexQueue: Send + Sync {
    fn enqueue(&self, job: &QueuedJob) -> Result<(), QueueError>;
}

/// 内存队列：按顺序记录全部任务（测试与 `simulate` 命令使用）
#[derive(Debug, Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<QueuedJob>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<QueuedJob> {
        self.jobs.lock().clone()
    }

    pub fn jobs_for(&self, slug: &str, version: u32) -> Vec<QueuedJob> {
        self.jobs
            .lock()
            .iter()
            .filter(|j| j.slug == slug && j.index_version() == version)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    pub fn take(&self) -> Vec<QueuedJob> {
        std::mem::take(&mut *self.jobs.lock())
    }
}

impl IndexQueue for RecordingQueue {
    fn enqueue(&self, job: &QueuedJob) -> Result<(), QueueError> {
        self.jobs.lock().push(job.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn options_flatten_extra_fields() {
        let opts = JobOptions::new()
            .with("priority", 5)
            .with_index_version(2);
        let v = serde_json::to_value(&opts).unwrap();
        assert_eq!(v, json!({"index_version": 2, "priority": 5}));

        let back: JobOptions = serde_json::from_value(json!({"priority": 5})).unwrap();
        assert_eq!(back.index_version, None);
        assert_eq!(back.get("priority"), Some(&json!(5)));
    }

    #[test]
    fn recording_queue_filters_by_version() {
        let q = RecordingQueue::new();
        for (id, v) in [(1, 1), (2, 2), (3, 1)] {
            q.enqueue(&QueuedJob {
                object_id: id,
                slug: "post".into(),
                options: JobOptions::new().with_index_version(v),
            })
            .unwrap();
        }
        let ids: Vec<u64> = q.jobs_for("post", 1).iter().map(|j| j.object_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(q.take().len(), 3);
        assert!(q.is_empty());
    }
}
