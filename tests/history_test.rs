//! 診断履歴の永続化テスト

use crop_doctor::analyzer::CropChoice;
use crop_doctor::history::{
    FileStore, History, KeyValueStore, MemoryStore, HISTORY_KEY, MAX_HISTORY,
};
use crop_doctor::upload::{ImageData, UploadItem};
use crop_doctor_common::{decode_data_url, AnalysisResult, BilingualText};
use tempfile::tempdir;

fn done_item(name: &str) -> UploadItem {
    let result = AnalysisResult {
        disease: BilingualText {
            en: format!("disease of {}", name),
            kn: String::new(),
        },
        ..Default::default()
    };
    UploadItem::idle(name, ImageData::from(name.as_bytes()))
        .analyzing()
        .done(result)
}

#[test]
fn test_keeps_newest_fifty() {
    let dir = tempdir().unwrap();
    let mut history = History::load(FileStore::new(dir.path()));

    for i in 0..=MAX_HISTORY {
        assert!(history.save(&done_item(&format!("{}.jpg", i)), &CropChoice::Unspecified));
    }

    assert_eq!(history.len(), MAX_HISTORY);
    assert_eq!(history.entries()[0].name, format!("{}.jpg", MAX_HISTORY));
    assert_eq!(history.entries()[MAX_HISTORY - 1].name, "1.jpg");

    // 再読み込みしても同じ内容
    let reloaded = History::load(FileStore::new(dir.path()));
    assert_eq!(reloaded.entries(), history.entries());
}

#[test]
fn test_item_without_result_not_saved() {
    let dir = tempdir().unwrap();
    let mut history = History::load(FileStore::new(dir.path()));

    let pending = UploadItem::idle("leaf.jpg", ImageData::from(&b"x"[..]));
    assert!(!history.save(&pending, &CropChoice::Unspecified));

    let failed = pending.analyzing().failed("Analysis failed");
    assert!(!history.save(&failed, &CropChoice::Unspecified));

    assert!(history.is_empty());
    assert_eq!(FileStore::new(dir.path()).get(HISTORY_KEY).unwrap(), None);
}

#[test]
fn test_entry_keeps_image_and_crop() {
    let mut history = History::load(MemoryStore::new());
    let item = done_item("leaf.jpg");
    history.save(&item, &"  Ragi ".parse().unwrap());

    let entry = &history.entries()[0];
    assert_eq!(entry.id, item.id.to_string());
    assert_eq!(entry.crop_type, "Ragi");
    assert_eq!(entry.result.disease.en, "disease of leaf.jpg");
    assert_eq!(decode_data_url(&entry.src).unwrap(), b"leaf.jpg");
}

#[test]
fn test_quota_failure_is_swallowed() {
    let dir = tempdir().unwrap();
    let mut history = History::load(FileStore::new(dir.path()).with_quota(600));

    history.save(&done_item("first.jpg"), &CropChoice::Unspecified);
    let stored_once = FileStore::new(dir.path()).get(HISTORY_KEY).unwrap();
    assert!(stored_once.is_some());

    // 2件目で上限を超える。メモリ上は更新されるが保存は前のまま
    history.save(&done_item("second.jpg"), &CropChoice::Unspecified);
    assert_eq!(history.len(), 2);
    assert_eq!(FileStore::new(dir.path()).get(HISTORY_KEY).unwrap(), stored_once);

    let reloaded = History::load(FileStore::new(dir.path()));
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.entries()[0].name, "first.jpg");
}

#[test]
fn test_corrupt_history_loads_empty() {
    let dir = tempdir().unwrap();
    let mut store = FileStore::new(dir.path());
    store.set(HISTORY_KEY, "{not json").unwrap();

    let mut history = History::load(store);
    assert!(history.is_empty());

    // 壊れたデータは次の保存で置き換わる
    history.save(&done_item("a.jpg"), &CropChoice::Unspecified);
    let reloaded = History::load(FileStore::new(dir.path()));
    assert_eq!(reloaded.len(), 1);
}

#[test]
fn test_reads_browser_payload() {
    let mut store = MemoryStore::new();
    store
        .set(
            HISTORY_KEY,
            r#"[{"id":"1700000000000","name":"leaf.jpg","src":"data:image/jpeg;base64,AAEC",
                "cropType":"Tomato","result":{"disease":{"en":"Leaf Mold","kn":""},"confidence":91,
                "severity":"high"},"savedAt":1700000000000}]"#,
        )
        .unwrap();

    let history = History::load(store);
    assert_eq!(history.len(), 1);
    let entry = &history.entries()[0];
    assert_eq!(entry.crop_type, "Tomato");
    assert_eq!(entry.result.disease.en, "Leaf Mold");
    assert_eq!(entry.saved_at, 1_700_000_000_000);
}
