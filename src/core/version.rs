use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 隐式默认版本号：没有任何持久化记录时，1 号版本即原始索引
pub const DEFAULT_VERSION: u32 = 1;

/// 当前 Unix 时间（秒）
pub fn now_unix() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(_) => 0,
    }
}

/// 单个索引版本（一代索引）
///
/// 持久化时四个字段总是全部写出，缺失的时间字段为 `null`。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexVersion {
    pub number: u32,
    pub active: bool,
    pub created_time: Option<i64>,
    pub activated_time: Option<i64>,
}

impl IndexVersion {
    /// 隐式合成的 1 号版本（历史数据，无时间信息）
    pub fn implicit_default() -> Self {
        Self {
            number: DEFAULT_VERSION,
            active: true,
            created_time: None,
            activated_time: None,
        }
    }

    /// 新建版本：未激活，created_time = now
    pub fn fresh(number: u32, now: i64) -> Self {
        Self {
            number,
            active: false,
            created_time: Some(now),
            activated_time: None,
        }
    }

    /// 从存储中的任意 JSON 归一化；拿不到版本号时返回 None。
    ///
    /// `key` 是外层映射的键，仅在记录自身缺少 `number` 时兜底。
    pub fn normalize(key: &str, raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;
        let number = obj
            .get("number")
            .and_then(as_version_number)
            .or_else(|| key.trim().parse::<u32>().ok().filter(|n| *n >= 1))?;

        Some(Self {
            number,
            active: obj.get("active").map(as_flag).unwrap_or(false),
            created_time: obj.get("created_time").and_then(as_timestamp),
            activated_time: obj.get("activated_time").and_then(as_timestamp),
        })
    }
}

fn as_version_number(v: &Value) -> Option<u32> {
    let n = match v {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(n).ok().filter(|n| *n >= 1)
}

fn as_flag(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().map(|i| i != 0).unwrap_or(false),
        Value::String(s) => matches!(s.trim(), "1" | "true"),
        _ => false,
    }
}

fn as_timestamp(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// 某个 indexable 类型的全部版本：版本号 -> 记录（按版本号升序迭代）
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionSet(BTreeMap<u32, IndexVersion>);

impl VersionSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// 存储为空时合成的集合：`{1: {number: 1, active: true, ..}}`
    pub fn implicit() -> Self {
        let mut set = Self::new();
        set.insert(IndexVersion::implicit_default());
        set
    }

    /// 归一化存储中的原始数据；非对象、空对象、全部条目无效时回退为隐式集合。
    pub fn normalize(raw: Option<&Value>) -> Self {
        let Some(obj) = raw.and_then(Value::as_object) else {
            return Self::implicit();
        };

        let mut set = Self::new();
        for (key, entry) in obj {
            match IndexVersion::normalize(key, entry) {
                Some(v) => set.insert(v),
                None => tracing::warn!("Dropping malformed index version entry under key {:?}", key),
            }
        }

        if set.is_empty() {
            return Self::implicit();
        }
        set
    }

    pub fn insert(&mut self, version: IndexVersion) {
        self.0.insert(version.number, version);
    }

    pub fn get(&self, number: u32) -> Option<&IndexVersion> {
        self.0.get(&number)
    }

    pub fn contains(&self, number: u32) -> bool {
        self.0.contains_key(&number)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexVersion> {
        self.0.values()
    }

    pub fn numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.keys().copied()
    }

    pub fn max_number(&self) -> Option<u32> {
        self.0.keys().next_back().copied()
    }

    /// 第一个 active=true 的记录（按迭代序）。
    /// 数据损坏时可能存在多个 active，这里只容忍、不修复。
    pub fn active(&self) -> Option<&IndexVersion> {
        self.0.values().find(|v| v.active)
    }

    /// 没有显式激活的记录时，1 号版本隐式生效
    pub fn active_number(&self) -> u32 {
        self.active().map(|v| v.number).unwrap_or(DEFAULT_VERSION)
    }

    /// 去掉生效版本后的其余版本
    pub fn inactive(&self) -> VersionSet {
        let active = self.active_number();
        VersionSet(
            self.0
                .iter()
                .filter(|(n, _)| **n != active)
                .map(|(n, v)| (*n, v.clone()))
                .collect(),
        )
    }

    /// 一次性切换 active 标记：目标版本 active=true 且写入 activated_time，
    /// 其余版本全部 active=false，activated_time 保持不变。
    pub fn mark_active(&mut self, number: u32, now: i64) -> bool {
        if !self.contains(number) {
            return false;
        }
        for v in self.0.values_mut() {
            if v.number == number {
                v.active = true;
                v.activated_time = Some(now);
            } else {
                v.active = false;
            }
        }
        true
    }

    pub fn to_value(&self) -> Value {
        // BTreeMap<u32, _> 的键序列化为字符串，不会失败
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl<'a> IntoIterator for &'a VersionSet {
    type Item = &'a IndexVersion;
    type IntoIter = std::collections::btree_map::Values<'a, u32, IndexVersion>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.values()
    }
}

impl FromIterator<IndexVersion> for VersionSet {
    fn from_iter<I: IntoIterator<Item = IndexVersion>>(iter: I) -> Self {
        let mut set = VersionSet::new();
        for v in iter {
            set.insert(v);
        }
        set
    }
}
