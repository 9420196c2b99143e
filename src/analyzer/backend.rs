use crate::error::Result;
use crate::upload::ImageData;
use async_trait::async_trait;
use crop_doctor_common::{AnalysisBatch, Language};

/// 送信する画像1枚
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub file_name: String,
    pub bytes: ImageData,
}

impl ImagePart {
    /// バイト列から推定したMIMEタイプ
    pub fn mime_type(&self) -> &'static str {
        image::guess_format(&self.bytes)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream")
    }
}

/// 一括解析リクエスト（画像は送信順）
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub crop_type: String,
    pub language: Language,
    pub images: Vec<ImagePart>,
}

/// 解析バックエンド
///
/// 応答の結果配列は送信順に対応する。アイテムIDは含まれない。
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalysisBatch>;
}
