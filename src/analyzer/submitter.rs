//! 一括解析
//!
//! 解析可能なアイテムを取り込み順に1リクエストで送り、
//! 返ってきた結果配列を位置で対応付ける（応答にアイテムIDは無い）。

use super::backend::{AnalysisBackend, AnalyzeRequest, ImagePart};
use super::crop::CropChoice;
use crate::error::{CropDoctorError, Result};
use crate::upload::{ItemId, SharedStore};
use crop_doctor_common::Language;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// 解析対象なし（何もしていない）
    Empty,
    Completed {
        analysis_id: u64,
        items: Vec<ItemId>,
    },
}

pub async fn analyze(
    store: &SharedStore,
    backend: &dyn AnalysisBackend,
    crop: &CropChoice,
    language: Language,
) -> Result<BatchOutcome> {
    // 選択と解析中への遷移は同じロック内で行う
    let (ids, images) = {
        let mut guard = store.write().await;
        let ready = guard.ready_items();
        if ready.is_empty() {
            tracing::debug!("解析対象なし");
            return Ok(BatchOutcome::Empty);
        }

        let ids: Vec<ItemId> = ready.iter().map(|item| item.id).collect();
        let images: Vec<ImagePart> = ready
            .iter()
            .map(|item| ImagePart {
                file_name: item.upload_name(),
                bytes: item.src.clone(),
            })
            .collect();

        guard.begin_analysis(&ids);
        (ids, images)
    };

    let request = AnalyzeRequest {
        crop_type: crop.form_value(),
        language,
        images,
    };

    let outcome = backend.analyze(request).await.and_then(|batch| {
        if batch.items.len() == ids.len() {
            Ok(batch)
        } else {
            Err(CropDoctorError::ResultCountMismatch {
                expected: ids.len(),
                actual: batch.items.len(),
            })
        }
    });

    let mut guard = store.write().await;
    match outcome {
        Ok(batch) => {
            tracing::info!(analysis_id = batch.id, items = ids.len(), "解析完了");
            guard.set_last_analysis_id(batch.id);
            guard.complete_analysis(&ids, batch.items);
            Ok(BatchOutcome::Completed {
                analysis_id: batch.id,
                items: ids,
            })
        }
        Err(e) => {
            tracing::error!(error = %e, items = ids.len(), "解析に失敗");
            guard.fail_analysis(&ids);
            Err(match e {
                CropDoctorError::ResultCountMismatch { .. } | CropDoctorError::AnalysisFailed(_) => e,
                other => CropDoctorError::AnalysisFailed(other.to_string()),
            })
        }
    }
}
