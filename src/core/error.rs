use thiserror::Error;

/// 设置存储层错误（文件 / 序列化）
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 版本注册表 / 复制引擎的错误分类
///
/// - `InvalidVersion` / `AllocationFailure` / `ActivationFailure` 直接返回给调用方（运维工具）
/// - `UnresolvableType` 只在复制阶段出现，记录日志后吞掉
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("invalid index version {number} for type `{slug}`")]
    InvalidVersion { slug: String, number: u32 },

    #[error("unable to allocate a new index version for type `{slug}`: {reason}")]
    AllocationFailure { slug: String, reason: String },

    #[error("failed activating index version {number} for type `{slug}`: {reason}")]
    ActivationFailure {
        slug: String,
        number: u32,
        reason: String,
    },

    #[error("unknown indexable type `{0}`")]
    UnresolvableType(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl VersionError {
    pub fn slug(&self) -> Option<&str> {
        match self {
            VersionError::InvalidVersion { slug, .. }
            | VersionError::AllocationFailure { slug, .. }
            | VersionError::ActivationFailure { slug, .. } => Some(slug.as_str()),
            VersionError::UnresolvableType(slug) => Some(slug.as_str()),
            VersionError::Store(_) => None,
        }
    }
}

pub type VersionResult<T> = Result<T, VersionError>;

/// 下游队列拒绝入队
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue rejected object {object_id} of type `{slug}`: {reason}")]
    Rejected {
        object_id: u64,
        slug: String,
        reason: String,
    },
    #[error(transparent)]
    Version(#[from] VersionError),
}
