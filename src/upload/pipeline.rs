//! 圧縮パイプライン
//!
//! 1. 空き枠までファイルを切り詰める
//! 2. 圧縮中アイテムを即座に登録
//! 3. 全アイテムを並行に圧縮し、終わったものから個別に反映（完了順は不定）
//!
//! 回転・切り抜きは ready / idle のアイテムだけが対象。
//! 編集中に作業画像が差し替わった場合は最新の画像で編集し直す。

use super::item::{ImageData, ItemId, UploadItem};
use super::store::{EditApply, SharedStore, MAX_ITEMS};
use crate::codec::ImageCodec;
use crate::config::Config;
use crate::error::{CropDoctorError, Result};
use std::sync::Arc;
use tokio::task::JoinSet;

/// 取り込み対象ファイル
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub bytes: ImageData,
}

impl FileInput {
    pub fn new(name: impl Into<String>, bytes: impl Into<ImageData>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompressionSettings {
    pub max_dimension: u32,
    pub quality: u8,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            max_dimension: 1200,
            quality: 75,
        }
    }
}

impl From<&Config> for CompressionSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_dimension: config.max_dimension,
            quality: config.jpeg_quality,
        }
    }
}

/// 追加結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOutcome {
    pub accepted: Vec<ItemId>,
    /// 上限を超えて取り込まなかった枚数
    pub dropped: usize,
}

pub struct CompressionPipeline {
    store: SharedStore,
    codec: Arc<dyn ImageCodec>,
    settings: CompressionSettings,
}

impl CompressionPipeline {
    pub fn new(store: SharedStore, codec: Arc<dyn ImageCodec>, settings: CompressionSettings) -> Self {
        Self {
            store,
            codec,
            settings,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// ファイルを取り込み、全件の圧縮が終わるまで待つ
    pub async fn add_files(&self, files: Vec<FileInput>) -> AddOutcome {
        let (outcome, seeded) = self.seed(files, |name, bytes| UploadItem::seeded(name, bytes)).await;

        let mut tasks = JoinSet::new();
        for (id, bytes) in seeded {
            let store = self.store.clone();
            let codec = self.codec.clone();
            let settings = self.settings;

            tasks.spawn(async move {
                store.write().await.begin_compression(id);

                let compressed = tokio::task::spawn_blocking(move || {
                    codec.compress(&bytes, settings.max_dimension, settings.quality)
                })
                .await
                .unwrap_or_else(|e| Err(CropDoctorError::CompressionFailed(e.to_string())));

                store.write().await.complete_compression(id, compressed);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "圧縮タスクが異常終了");
            }
        }

        outcome
    }

    /// 圧縮せずに idle として取り込む
    pub async fn add_uncompressed(&self, files: Vec<FileInput>) -> AddOutcome {
        self.seed(files, |name, bytes| UploadItem::idle(name, bytes)).await.0
    }

    async fn seed(
        &self,
        files: Vec<FileInput>,
        make: fn(String, ImageData) -> UploadItem,
    ) -> (AddOutcome, Vec<(ItemId, ImageData)>) {
        let total = files.len();
        if total == 0 {
            return (AddOutcome::default(), Vec::new());
        }

        let mut store = self.store.write().await;
        let capacity = store.remaining_capacity();
        let items: Vec<UploadItem> = files
            .into_iter()
            .take(capacity)
            .map(|file| make(file.name, file.bytes))
            .collect();
        let seeded: Vec<(ItemId, ImageData)> = items
            .iter()
            .map(|item| (item.id, item.original_src.clone()))
            .collect();
        let accepted = store.add(items);
        drop(store);

        let dropped = total - accepted.len();
        if dropped > 0 {
            tracing::warn!(dropped, max = MAX_ITEMS, "上限を超えたファイルを取り込みませんでした");
        }
        tracing::debug!(accepted = accepted.len(), "アイテムを登録");

        (AddOutcome { accepted, dropped }, seeded)
    }

    /// 作業画像を回転（対象が無い・編集できない状態なら false）
    pub async fn rotate_item(&self, id: ItemId, degrees: f64) -> Result<bool> {
        let codec = self.codec.clone();
        self.edit_item(id, move |bytes| codec.rotate(bytes, degrees)).await
    }

    /// 作業画像を中央正方形に切り抜き（対象が無い・編集できない状態なら false）
    pub async fn crop_item(&self, id: ItemId) -> Result<bool> {
        let codec = self.codec.clone();
        self.edit_item(id, move |bytes| codec.crop_center_square(bytes)).await
    }

    async fn edit_item<F>(&self, id: ItemId, edit: F) -> Result<bool>
    where
        F: Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        let edit = Arc::new(edit);
        loop {
            let Some(base) = self.store.read().await.editable_src(id) else {
                return Ok(false);
            };

            let input = base.clone();
            let edit = edit.clone();
            let edited = tokio::task::spawn_blocking(move || edit(&input))
                .await
                .map_err(|e| CropDoctorError::Encode(e.to_string()))??;

            let applied = self
                .store
                .write()
                .await
                .apply_edit(id, &base, ImageData::from(edited));
            match applied {
                EditApply::Applied => return Ok(true),
                EditApply::Rejected => return Ok(false),
                EditApply::Stale => {
                    tracing::debug!(item = %id, "編集中に画像が更新されたため編集し直す");
                }
            }
        }
    }
}
