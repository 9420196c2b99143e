use crop_doctor_common::AnalysisResult;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// 画像バイト列（アイテム間・スナップショット間で共有、変更しない）
pub type ImageData = Arc<[u8]>;

pub const COMPRESSION_FAILED_MESSAGE: &str = "Compression failed";
pub const ANALYSIS_FAILED_MESSAGE: &str = "Analysis failed";

/// 圧縮タスクが動き始めたときの進捗
pub const COMPRESSION_START_PROGRESS: u8 = 30;

/// 解析開始直後に表示する進捗
pub const ANALYZING_START_PROGRESS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Idle,
    Compressing,
    Ready,
    Analyzing,
    Done,
    Error,
}

impl ItemStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Idle => "idle",
            ItemStatus::Compressing => "compressing",
            ItemStatus::Ready => "ready",
            ItemStatus::Analyzing => "analyzing",
            ItemStatus::Done => "done",
            ItemStatus::Error => "error",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 取り込んだ画像1枚
///
/// 状態遷移は全て `self` を消費して新しい値を返す（ストアはID単位で丸ごと置き換える）。
/// `result` は `Done` のときだけ、`error_message` は `Error` のときだけ `Some`。
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub id: ItemId,
    pub name: String,
    pub original_src: ImageData,
    pub src: ImageData,
    pub status: ItemStatus,
    pub progress: u8,
    pub result: Option<AnalysisResult>,
    pub error_message: Option<String>,
}

impl UploadItem {
    /// 圧縮待ちとして登録（src は元画像のまま）
    pub fn seeded(name: impl Into<String>, bytes: ImageData) -> Self {
        Self::with_status(name.into(), bytes, ItemStatus::Compressing)
    }

    /// 圧縮を行わない場合の登録
    pub fn idle(name: impl Into<String>, bytes: ImageData) -> Self {
        Self::with_status(name.into(), bytes, ItemStatus::Idle)
    }

    fn with_status(name: String, bytes: ImageData, status: ItemStatus) -> Self {
        Self {
            id: ItemId::new(),
            name,
            original_src: bytes.clone(),
            src: bytes,
            status,
            progress: 0,
            result: None,
            error_message: None,
        }
    }

    pub fn compression_started(self) -> Self {
        Self {
            progress: COMPRESSION_START_PROGRESS,
            ..self
        }
    }

    pub fn compressed(self, bytes: ImageData) -> Self {
        Self {
            src: bytes,
            status: ItemStatus::Ready,
            progress: 0,
            ..self
        }
    }

    pub fn analyzing(self) -> Self {
        Self {
            status: ItemStatus::Analyzing,
            progress: ANALYZING_START_PROGRESS,
            ..self
        }
    }

    pub fn done(self, result: AnalysisResult) -> Self {
        Self {
            status: ItemStatus::Done,
            progress: 100,
            result: Some(result),
            error_message: None,
            ..self
        }
    }

    pub fn failed(self, message: impl Into<String>) -> Self {
        Self {
            status: ItemStatus::Error,
            result: None,
            error_message: Some(message.into()),
            ..self
        }
    }

    /// 回転・切り抜き後の画像に差し替え
    pub fn with_src(self, bytes: ImageData) -> Self {
        Self { src: bytes, ..self }
    }

    pub fn is_analyzable(&self) -> bool {
        matches!(self.status, ItemStatus::Ready | ItemStatus::Idle)
    }

    /// 送信時のファイル名
    pub fn upload_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("image_{}.jpg", self.id)
        } else {
            self.name.clone()
        }
    }

    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            progress: self.progress,
            result: self.result.clone(),
            error_message: self.error_message.clone(),
        }
    }
}

/// JSON出力用（画像バイトを含まない）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: ItemId,
    pub name: String,
    pub status: ItemStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
