//! 永続キー・バリューストア
//!
//! ブラウザの localStorage 相当。値はJSON文字列のまま保存し、
//! 容量上限（quota）を超える書き込みは `StorageWriteFailed` になる。

use crate::error::{CropDoctorError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const FILE_EXTENSION: &str = "json";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CropDoctorError::StorageWriteFailed(format!("不正なキー: {:?}", key)))
    }
}

fn quota_exceeded(used: u64, quota: u64) -> CropDoctorError {
    CropDoctorError::StorageWriteFailed(format!(
        "容量上限を超えます: {} / {} bytes",
        used, quota
    ))
}

/// キーごとに `<dir>/<key>.json` を置くストア
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: Option<u64>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota: None,
        }
    }

    pub fn with_quota(self, bytes: u64) -> Self {
        Self {
            quota: Some(bytes),
            ..self
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, FILE_EXTENSION))
    }

    /// 指定キー以外が使っている容量
    fn used_bytes_except(&self, key: &str) -> Result<u64> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let skip = self.path_for(key);
        let mut used = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_value = path.extension().map(|e| e == FILE_EXTENSION).unwrap_or(false);
            if is_value && path != skip {
                used += fs::metadata(&path)?.len();
            }
        }
        Ok(used)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;

        if let Some(quota) = self.quota {
            let used = self.used_bytes_except(key)? + value.len() as u64;
            if used > quota {
                return Err(quota_exceeded(used, quota));
            }
        }

        fs::create_dir_all(&self.dir)?;
        // 途中で落ちても前の値が壊れないよう一時ファイル経由で置き換える
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// メモリ上のストア（テスト・一時利用）
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    quota: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(self, bytes: u64) -> Self {
        Self {
            quota: Some(bytes),
            ..self
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        if let Some(quota) = self.quota {
            let others: u64 = self
                .values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len() as u64)
                .sum();
            let used = others + value.len() as u64;
            if used > quota {
                return Err(quota_exceeded(used, quota));
            }
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_roundtrip_and_remove() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("data"));

        assert_eq!(store.get("history").unwrap(), None);
        store.set("history", "[1]").unwrap();
        store.set("history", "[1,2]").unwrap();
        assert_eq!(store.get("history").unwrap().as_deref(), Some("[1,2]"));

        store.remove("history").unwrap();
        assert_eq!(store.get("history").unwrap(), None);
    }

    #[test]
    fn test_file_store_quota_counts_other_keys() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path()).with_quota(10);

        store.set("a", "12345").unwrap();
        // 同じキーの上書きは自分の旧サイズを数えない
        store.set("a", "1234567890").unwrap();

        let err = store.set("b", "1").unwrap_err();
        assert!(matches!(err, CropDoctorError::StorageWriteFailed(_)));
        assert_eq!(store.get("b").unwrap(), None);
    }

    #[test]
    fn test_invalid_key_rejected() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_memory_store_quota() {
        let mut store = MemoryStore::new().with_quota(4);
        store.set("k", "abcd").unwrap();
        assert!(store.set("other", "e").is_err());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("abcd"));
    }
}
