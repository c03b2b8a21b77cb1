use std::collections::BTreeMap;
use std::sync::Arc;

/// 被搜索层索引的一类内容（post / user / term ...），以稳定 slug 标识
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Indexable {
    pub slug: String,
}

impl Indexable {
    pub fn new(slug: impl Into<String>) -> Self {
        Self { slug: slug.into() }
    }

    /// 每一代索引对应后端的一个独立索引名：
    /// 1 号版本沿用基础名，其余版本追加 `-v<n>`
    pub fn index_name(&self, prefix: &str, version: u32) -> String {
        let base = if prefix.is_empty() {
            self.slug.clone()
        } else {
            format!("{}-{}", prefix, self.slug)
        };
        if version <= 1 {
            base
        } else {
            format!("{}-v{}", base, version)
        }
    }
}

/// 已注册的 indexable 集合；复制阶段用它把 ledger 里的 slug 解析回具体类型
#[derive(Clone, Debug, Default)]
pub struct Indexables {
    inner: BTreeMap<String, Arc<Indexable>>,
}

impl Indexables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_slugs<I, S>(slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Self::new();
        for s in slugs {
            out.register(Indexable::new(s));
        }
        out
    }

    pub fn register(&mut self, indexable: Indexable) {
        self.inner
            .insert(indexable.slug.clone(), Arc::new(indexable));
    }

    pub fn deregister(&mut self, slug: &str) -> Option<Arc<Indexable>> {
        self.inner.remove(slug)
    }

    pub fn get(&self, slug: &str) -> Option<Arc<Indexable>> {
        self.inner.get(slug).cloned()
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
