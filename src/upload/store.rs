//! アップロードアイテムストア
//!
//! 取り込み順のアイテム列（最大 [`MAX_ITEMS`] 件）と比較選択を保持する唯一の共有状態。
//! 変更は全てID単位の丸ごと置き換えで行い、変更のたびに不変スナップショットを配信する。

use super::item::{
    ImageData, ItemId, ItemStatus, UploadItem, ANALYSIS_FAILED_MESSAGE,
    COMPRESSION_FAILED_MESSAGE,
};
use crate::compare::CompareSelection;
use crate::error::Result;
use crop_doctor_common::AnalysisResult;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

pub const MAX_ITEMS: usize = 5;

pub type StoreSnapshot = Arc<[UploadItem]>;
pub type SharedStore = Arc<RwLock<UploadStore>>;

/// 編集結果の書き戻し
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditApply {
    Applied,
    /// 編集中に作業画像が差し替わった（最新の画像でやり直す）
    Stale,
    /// 対象が無い、または編集できる状態ではない
    Rejected,
}

#[derive(Debug)]
pub struct UploadStore {
    items: Vec<UploadItem>,
    compare: CompareSelection,
    last_analysis_id: Option<u64>,
    snapshots: watch::Sender<StoreSnapshot>,
}

impl Default for UploadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadStore {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(StoreSnapshot::from(Vec::new()));
        Self {
            items: Vec::new(),
            compare: CompareSelection::new(),
            last_analysis_id: None,
            snapshots,
        }
    }

    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    /// 変更通知の購読
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot::from(self.items.clone())
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&UploadItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn remaining_capacity(&self) -> usize {
        MAX_ITEMS.saturating_sub(self.items.len())
    }

    pub fn can_add_more(&self) -> bool {
        self.remaining_capacity() > 0
    }

    pub fn can_analyze(&self) -> bool {
        self.items.iter().any(UploadItem::is_analyzable)
    }

    /// 解析対象（ready / idle）を取り込み順で
    pub fn ready_items(&self) -> Vec<&UploadItem> {
        self.items.iter().filter(|item| item.is_analyzable()).collect()
    }

    pub fn done_items(&self) -> Vec<&UploadItem> {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Done)
            .collect()
    }

    /// 空き枠の分だけ追加し、追加したIDを返す（溢れた分は黙って捨てる）
    pub fn add(&mut self, items: Vec<UploadItem>) -> Vec<ItemId> {
        let capacity = self.remaining_capacity();
        let accepted: Vec<UploadItem> = items.into_iter().take(capacity).collect();
        let ids = accepted.iter().map(|item| item.id).collect();

        if !accepted.is_empty() {
            self.items.extend(accepted);
            self.publish();
        }
        ids
    }

    /// 削除（比較選択からも外す）
    pub fn remove(&mut self, id: ItemId) -> Option<UploadItem> {
        let pos = self.items.iter().position(|item| item.id == id)?;
        let removed = self.items.remove(pos);
        self.compare.remove(id);
        self.publish();
        Some(removed)
    }

    /// ID指定で丸ごと置き換え。該当なしなら false
    pub fn update(&mut self, id: ItemId, f: impl FnOnce(UploadItem) -> UploadItem) -> bool {
        let Some(pos) = self.items.iter().position(|item| item.id == id) else {
            return false;
        };
        let next = f(self.items[pos].clone());
        self.items[pos] = next;
        self.publish();
        true
    }

    /// 編集の元にする作業画像（ready / idle のときだけ）
    pub fn editable_src(&self, id: ItemId) -> Option<ImageData> {
        self.get(id)
            .filter(|item| item.is_analyzable())
            .map(|item| item.src.clone())
    }

    /// `base` から作った編集結果を書き戻す
    ///
    /// 読み出し後に `src` が差し替わっていれば反映しない。
    pub fn apply_edit(&mut self, id: ItemId, base: &ImageData, edited: ImageData) -> EditApply {
        match self.get(id) {
            Some(item) if item.is_analyzable() => {
                if !Arc::ptr_eq(&item.src, base) {
                    return EditApply::Stale;
                }
            }
            _ => return EditApply::Rejected,
        }
        self.update(id, |item| item.with_src(edited));
        EditApply::Applied
    }

    /// 圧縮タスクの開始を反映（圧縮中のアイテムのみ）
    pub fn begin_compression(&mut self, id: ItemId) {
        if self.get(id).map(|item| item.status) == Some(ItemStatus::Compressing) {
            self.update(id, UploadItem::compression_started);
        }
    }

    /// 圧縮完了を反映（圧縮中のアイテムのみ）
    pub fn complete_compression(&mut self, id: ItemId, outcome: Result<Vec<u8>>) {
        if self.get(id).map(|item| item.status) != Some(ItemStatus::Compressing) {
            tracing::debug!(item = %id, "圧縮結果を破棄（対象が圧縮中ではない）");
            return;
        }

        match outcome {
            Ok(bytes) => {
                tracing::debug!(item = %id, bytes = bytes.len(), "圧縮完了");
                let bytes = ImageData::from(bytes);
                self.update(id, |item| item.compressed(bytes));
            }
            Err(e) => {
                tracing::warn!(item = %id, error = %e, "圧縮に失敗");
                self.update(id, |item| item.failed(COMPRESSION_FAILED_MESSAGE));
            }
        }
    }

    /// 指定アイテムを一括で解析中にする（通知は1回）
    pub fn begin_analysis(&mut self, ids: &[ItemId]) {
        let mut changed = false;
        for item in self.items.iter_mut() {
            if ids.contains(&item.id) && item.is_analyzable() {
                *item = item.clone().analyzing();
                changed = true;
            }
        }
        if changed {
            self.publish();
        }
    }

    /// 送信順の結果を送信順のアイテムへ割り当てる
    ///
    /// 件数の一致は呼び出し側で検証済みであること。
    pub fn complete_analysis(&mut self, ids: &[ItemId], results: Vec<AnalysisResult>) {
        for (id, result) in ids.iter().zip(results) {
            if let Some(item) = self.items.iter_mut().find(|item| item.id == *id) {
                if item.status == ItemStatus::Analyzing {
                    *item = item.clone().done(result);
                }
            }
        }
        self.publish();
    }

    /// バッチ全体を失敗にする
    pub fn fail_analysis(&mut self, ids: &[ItemId]) {
        for item in self.items.iter_mut() {
            if ids.contains(&item.id) && item.status == ItemStatus::Analyzing {
                *item = item.clone().failed(ANALYSIS_FAILED_MESSAGE);
            }
        }
        self.publish();
    }

    /// 比較選択の切り替え（存在しないIDは無視）
    pub fn toggle_compare(&mut self, id: ItemId) {
        if self.get(id).is_none() {
            return;
        }
        self.compare.toggle(id);
    }

    pub fn compare_selection(&self) -> &CompareSelection {
        &self.compare
    }

    pub fn compared_items(&self) -> Vec<&UploadItem> {
        self.compare
            .ids()
            .into_iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    pub fn last_analysis_id(&self) -> Option<u64> {
        self.last_analysis_id
    }

    pub fn set_last_analysis_id(&mut self, id: u64) {
        self.last_analysis_id = Some(id);
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CropDoctorError;
    use crop_doctor_common::BilingualText;

    fn seeded(name: &str) -> UploadItem {
        UploadItem::seeded(name, ImageData::from(name.as_bytes()))
    }

    fn result_named(name: &str) -> AnalysisResult {
        AnalysisResult {
            disease: BilingualText {
                en: name.to_string(),
                kn: String::new(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_add_truncates_to_capacity() {
        let mut store = UploadStore::new();
        let ids = store.add((0..7).map(|i| seeded(&format!("{}.jpg", i))).collect());

        assert_eq!(ids.len(), MAX_ITEMS);
        assert_eq!(store.len(), MAX_ITEMS);
        assert!(!store.can_add_more());

        let ids = store.add(vec![seeded("late.jpg")]);
        assert!(ids.is_empty());
        assert_eq!(store.len(), MAX_ITEMS);
    }

    #[test]
    fn test_compression_outcomes_are_isolated() {
        let mut store = UploadStore::new();
        let ids = store.add(vec![seeded("a.jpg"), seeded("b.jpg")]);

        store.complete_compression(ids[1], Err(CropDoctorError::Decode("bad".into())));
        store.complete_compression(ids[0], Ok(vec![1, 2, 3]));

        let a = store.get(ids[0]).unwrap();
        let b = store.get(ids[1]).unwrap();
        assert_eq!(a.status, ItemStatus::Ready);
        assert_eq!(&*a.src, &[1, 2, 3]);
        assert_eq!(b.status, ItemStatus::Error);
        assert_eq!(b.error_message.as_deref(), Some(COMPRESSION_FAILED_MESSAGE));
    }

    #[test]
    fn test_late_compression_ignored_after_terminal_state() {
        let mut store = UploadStore::new();
        let ids = store.add(vec![seeded("a.jpg")]);
        store.complete_compression(ids[0], Err(CropDoctorError::Decode("bad".into())));
        store.complete_compression(ids[0], Ok(vec![9]));

        assert_eq!(store.get(ids[0]).unwrap().status, ItemStatus::Error);
    }

    #[test]
    fn test_ready_items_in_store_order() {
        let mut store = UploadStore::new();
        let ids = store.add(vec![seeded("a"), seeded("b"), seeded("c")]);
        store.complete_compression(ids[2], Ok(vec![3]));
        store.complete_compression(ids[0], Ok(vec![1]));

        let ready: Vec<ItemId> = store.ready_items().iter().map(|item| item.id).collect();
        assert_eq!(ready, vec![ids[0], ids[2]]);
        assert!(store.can_analyze());
    }

    #[test]
    fn test_analysis_assignment_by_position() {
        let mut store = UploadStore::new();
        let ids = store.add(vec![
            UploadItem::idle("a", ImageData::from(&b"a"[..])),
            UploadItem::idle("b", ImageData::from(&b"b"[..])),
        ]);

        store.begin_analysis(&ids);
        assert!(store.items().iter().all(|item| item.status == ItemStatus::Analyzing));

        store.complete_analysis(&ids, vec![result_named("first"), result_named("second")]);
        assert_eq!(store.get(ids[0]).unwrap().result.as_ref().unwrap().disease.en, "first");
        assert_eq!(store.get(ids[1]).unwrap().result.as_ref().unwrap().disease.en, "second");
        assert_eq!(store.done_items().len(), 2);
    }

    #[test]
    fn test_fail_analysis_marks_whole_batch() {
        let mut store = UploadStore::new();
        let ids = store.add(vec![
            UploadItem::idle("a", ImageData::from(&b"a"[..])),
            UploadItem::idle("b", ImageData::from(&b"b"[..])),
        ]);
        store.begin_analysis(&ids);
        store.fail_analysis(&ids);

        for item in store.items() {
            assert_eq!(item.status, ItemStatus::Error);
            assert_eq!(item.error_message.as_deref(), Some(ANALYSIS_FAILED_MESSAGE));
            assert!(item.result.is_none());
        }
    }

    #[test]
    fn test_remove_clears_compare_selection() {
        let mut store = UploadStore::new();
        let ids = store.add(vec![seeded("a"), seeded("b")]);
        store.toggle_compare(ids[0]);
        store.toggle_compare(ids[1]);

        store.remove(ids[0]);

        assert_eq!(store.compare_selection().ids(), vec![ids[1]]);
        assert_eq!(store.len(), 1);
        assert!(store.can_add_more());
    }

    #[test]
    fn test_toggle_compare_unknown_id_ignored() {
        let mut store = UploadStore::new();
        store.toggle_compare(ItemId::new());
        assert!(store.compare_selection().is_empty());
    }

    #[test]
    fn test_begin_compression_sets_progress() {
        let mut store = UploadStore::new();
        let ids = store.add(vec![seeded("a")]);

        store.begin_compression(ids[0]);
        let item = store.get(ids[0]).unwrap();
        assert_eq!(item.status, ItemStatus::Compressing);
        assert!(item.progress > 0);

        store.complete_compression(ids[0], Ok(vec![1]));
        assert_eq!(store.get(ids[0]).unwrap().progress, 0);

        // 圧縮中でなければ変更しない
        store.begin_compression(ids[0]);
        assert_eq!(store.get(ids[0]).unwrap().progress, 0);
    }

    #[test]
    fn test_apply_edit_requires_unchanged_src() {
        let mut store = UploadStore::new();
        let ids = store.add(vec![UploadItem::idle("a", ImageData::from(&b"x"[..]))]);

        let base = store.editable_src(ids[0]).unwrap();
        let stale_copy = ImageData::from(&b"x"[..]);
        assert_eq!(
            store.apply_edit(ids[0], &stale_copy, ImageData::from(&b"y"[..])),
            EditApply::Stale
        );
        assert_eq!(
            store.apply_edit(ids[0], &base, ImageData::from(&b"R:x"[..])),
            EditApply::Applied
        );
        assert_eq!(&*store.get(ids[0]).unwrap().src, b"R:x");

        // 書き戻し後は古い base では反映されない
        assert_eq!(
            store.apply_edit(ids[0], &base, ImageData::from(&b"z"[..])),
            EditApply::Stale
        );
    }

    #[test]
    fn test_edit_rejected_while_compressing() {
        let mut store = UploadStore::new();
        let ids = store.add(vec![seeded("a")]);
        let base = store.get(ids[0]).unwrap().src.clone();

        assert!(store.editable_src(ids[0]).is_none());
        assert_eq!(
            store.apply_edit(ids[0], &base, ImageData::from(&b"y"[..])),
            EditApply::Rejected
        );
        assert_eq!(
            store.apply_edit(ItemId::new(), &base, ImageData::from(&b"y"[..])),
            EditApply::Rejected
        );
    }

    #[test]
    fn test_update_unknown_id() {
        let mut store = UploadStore::new();
        assert!(!store.update(ItemId::new(), |item| item));
    }

    #[test]
    fn test_snapshots_published() {
        let mut store = UploadStore::new();
        let rx = store.subscribe();
        let ids = store.add(vec![seeded("a")]);

        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, ids[0]);
        assert_eq!(snapshot[0].status, ItemStatus::Compressing);
    }
}
