//! 解析APIレスポンスパーサー
//!
//! `POST /api/crop-doctor/analyze/` の応答JSONを検証し、
//! 解析IDと結果配列（送信順）を取り出す

use crate::error::{Error, Result};
use crate::types::AnalysisResult;
use serde::Deserialize;

/// 解析応答（外側のエンベロープ）
#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    analysis: Option<AnalysisRecord>,
}

#[derive(Debug, Deserialize)]
struct AnalysisRecord {
    id: u64,
    #[serde(default)]
    result: Option<AnalysisPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisPayload {
    #[serde(default)]
    items: Vec<AnalysisResult>,
}

/// 1回のバッチ解析の結果
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisBatch {
    /// レポート取得に使う解析ID
    pub id: u64,
    /// 送信順の結果。件数の検証は呼び出し側で行う
    pub items: Vec<AnalysisResult>,
}

/// 解析応答をパース
///
/// # Returns
/// * `Ok(AnalysisBatch)` - `success: true` かつ `analysis` あり
/// * `Err(Error::Rejected)` - `success: false`（`message` をそのまま保持）
/// * `Err(Error::Parse)` - `analysis` 欠落
/// * `Err(Error::Json)` - JSONとして不正
///
/// `analysis.result.items` が無い場合は空配列として扱う。
///
/// # Examples
/// ```
/// use crop_doctor_common::parse_analyze_response;
///
/// let body = r#"{"success": true, "analysis": {"id": 7, "result": {"items": []}}}"#;
/// let batch = parse_analyze_response(body).unwrap();
/// assert_eq!(batch.id, 7);
/// assert!(batch.items.is_empty());
/// ```
pub fn parse_analyze_response(body: &str) -> Result<AnalysisBatch> {
    let response: AnalyzeResponse = serde_json::from_str(body.trim())?;

    if !response.success {
        return Err(Error::Rejected(
            response.message.unwrap_or_else(|| "Analyze failed".to_string()),
        ));
    }

    let analysis = response
        .analysis
        .ok_or_else(|| Error::Parse("analysis フィールドがありません".into()))?;

    Ok(AnalysisBatch {
        id: analysis.id,
        items: analysis.result.unwrap_or_default().items,
    })
}
