use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::core::StoreError;
use crate::storage::settings::{SettingsStore, StoreScope};

/// 单文件 JSON 设置存储
///
/// 文件布局：`{ "<scope>": { "<key>": <value>, ... }, ... }`
///
/// 落盘流程（与索引快照相同的原子替换）：
/// 1) 写 settings.json.tmp
/// 2) fsync(tmpfile)
/// 3) rename(tmp, target)：原子替换
/// 4) fsync(dir)
///
/// 进程内的读改写由 `write_lock` 串行化；跨进程仍是 last-writer-wins。
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取整个文件；不存在或损坏时视为空（损坏会在下次写入时被覆盖）
    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let data = std::fs::read(&self.path)?;
        if data.is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_slice::<Value>(&data) {
            Ok(Value::Object(m)) => Ok(m),
            Ok(_) => {
                tracing::warn!("Settings file {:?} is not a JSON object, ignoring", self.path);
                Ok(Map::new())
            }
            Err(e) => {
                tracing::warn!("Settings file {:?} unreadable ({}), ignoring", self.path, e);
                Ok(Map::new())
            }
        }
    }

    fn write_atomic(&self, all: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            serde_json::to_writer_pretty(&mut file, all)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }

        std::fs::rename(&tmp_path, &self.path)?;

        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self, key: &str, scope: StoreScope) -> Result<Option<Value>, StoreError> {
        let all = self.read_all()?;
        Ok(all
            .get(&scope.to_string())
            .and_then(|s| s.get(key))
            .cloned())
    }

    fn save(&self, key: &str, value: Value, scope: StoreScope) -> Result<(), StoreError> {
        let _g = self.write_lock.lock();
        let mut all = self.read_all()?;

        let slot = all
            .entry(scope.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(m) = slot {
            m.insert(key.to_string(), value);
        }

        self.write_atomic(&all)?;
        tracing::debug!("Settings saved: key={} scope={} path={:?}", key, scope, self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unique_tmp_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("index-gen-{}-{}", tag, nanos))
    }

    #[test]
    fn save_then_load_survives_reopen() {
        let dir = unique_tmp_dir("json-store");
        let path = dir.join("settings.json");

        let store = JsonFileStore::new(path.clone());
        store
            .save("index_versions", json!({"post": {}}), StoreScope::Network)
            .unwrap();
        store
            .save("other", json!(3), StoreScope::Site(4))
            .unwrap();

        let reopened = JsonFileStore::new(path.clone());
        assert_eq!(
            reopened.load("index_versions", StoreScope::Network).unwrap(),
            Some(json!({"post": {}}))
        );
        assert_eq!(reopened.load("other", StoreScope::Site(4)).unwrap(), Some(json!(3)));
        assert_eq!(reopened.load("other", StoreScope::Site(5)).unwrap(), None);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_reads_as_empty_and_is_replaced() {
        let dir = unique_tmp_dir("json-corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = JsonFileStore::new(path.clone());
        assert_eq!(store.load("k", StoreScope::Site(1)).unwrap(), None);

        store.save("k", json!(true), StoreScope::Site(1)).unwrap();
        assert_eq!(store.load("k", StoreScope::Site(1)).unwrap(), Some(json!(true)));
    }
}
