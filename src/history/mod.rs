//! 診断履歴
//!
//! 新しい順に最大 [`MAX_HISTORY`] 件。書き込みのたびに丸ごと保存するが、
//! 保存の失敗は握りつぶす（メモリ上の履歴は更新される）。

mod storage;

pub use storage::{FileStore, KeyValueStore, MemoryStore};

use crate::analyzer::CropChoice;
use crate::error::CropDoctorError;
use crate::upload::UploadItem;
use crop_doctor_common::{to_data_url, AnalysisResult};
use serde::{Deserialize, Serialize};

pub const HISTORY_KEY: &str = "cropDoctorHistory";
pub const MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub name: String,
    /// data URL
    pub src: String,
    #[serde(default)]
    pub crop_type: String,
    pub result: AnalysisResult,
    /// epoch ミリ秒
    pub saved_at: i64,
}

impl HistoryEntry {
    pub fn saved_at_local(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.saved_at)
            .map(|utc| {
                utc.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|| "-".to_string())
    }
}

pub struct History<S: KeyValueStore> {
    storage: S,
    entries: Vec<HistoryEntry>,
}

impl<S: KeyValueStore> History<S> {
    /// 保存済みの履歴を読み込む（無い・壊れている場合は空）
    pub fn load(storage: S) -> Self {
        let entries = match storage.get(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(error = %e, "履歴を読み込めないため空で開始");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "履歴ストアを読めないため空で開始");
                Vec::new()
            }
        };

        Self { storage, entries }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 解析結果のあるアイテムを先頭に追加する。結果が無ければ何もせず false
    pub fn save(&mut self, item: &UploadItem, crop: &CropChoice) -> bool {
        let Some(result) = item.result.clone() else {
            tracing::debug!(item = %item.id, "結果が無いため履歴に保存しない");
            return false;
        };

        let mime = image::guess_format(&item.src)
            .map(|format| format.to_mime_type())
            .unwrap_or("image/jpeg");

        let entry = HistoryEntry {
            id: item.id.to_string(),
            name: item.name.clone(),
            src: to_data_url(mime, &item.src),
            crop_type: crop.form_value(),
            result,
            saved_at: chrono::Utc::now().timestamp_millis(),
        };

        self.entries.insert(0, entry);
        self.entries.truncate(MAX_HISTORY);
        self.persist();
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        if let Err(e) = self.storage.remove(HISTORY_KEY) {
            tracing::warn!(error = %e, "履歴の削除に失敗");
        }
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    fn persist(&mut self) {
        let written = serde_json::to_string(&self.entries)
            .map_err(CropDoctorError::from)
            .and_then(|json| self.storage.set(HISTORY_KEY, &json));

        if let Err(e) = written {
            tracing::warn!(error = %e, entries = self.entries.len(), "履歴の保存に失敗");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::ImageData;

    fn done_item(name: &str) -> UploadItem {
        UploadItem::idle(name, ImageData::from(&b"jpeg-bytes"[..]))
            .analyzing()
            .done(AnalysisResult::default())
    }

    #[test]
    fn test_entry_json_keys() {
        let mut history = History::load(MemoryStore::new());
        history.save(&done_item("leaf.jpg"), &"Tomato".parse().unwrap());

        let raw = history.into_storage().get(HISTORY_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &value[0];
        assert_eq!(entry["name"], "leaf.jpg");
        assert_eq!(entry["cropType"], "Tomato");
        assert!(entry["savedAt"].is_i64());
        assert!(entry["src"].as_str().unwrap().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_clear_removes_persisted() {
        let mut history = History::load(MemoryStore::new());
        history.save(&done_item("a.jpg"), &CropChoice::Unspecified);
        history.clear();

        assert!(history.is_empty());
        assert_eq!(history.into_storage().get(HISTORY_KEY).unwrap(), None);
    }

    #[test]
    fn test_saved_at_local_format() {
        let entry = HistoryEntry {
            id: "x".into(),
            name: "x".into(),
            src: String::new(),
            crop_type: String::new(),
            result: AnalysisResult::default(),
            saved_at: 0,
        };
        assert_eq!(entry.saved_at_local().len(), "1970-01-01 00:00".len());
    }
}
