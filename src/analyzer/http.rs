//! 解析APIへのmultipart送信

use super::backend::{AnalysisBackend, AnalyzeRequest};
use crate::error::{CropDoctorError, Result};
use crate::session::Session;
use async_trait::async_trait;
use crop_doctor_common::{parse_analyze_response, AnalysisBatch};
use reqwest::multipart::{Form, Part};

pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpBackend {
    pub fn new(session: &Session) -> Self {
        Self {
            client: session.client().clone(),
            url: session.analyze_url(),
        }
    }

    fn build_form(request: AnalyzeRequest) -> Result<Form> {
        let mut form = Form::new()
            .text("crop_type", request.crop_type)
            .text("language", request.language.code().to_string());

        // 同名フィールド `images` を送信順に繰り返す
        for image in request.images {
            let mime = image.mime_type();
            let part = Part::bytes(image.bytes.to_vec())
                .file_name(image.file_name)
                .mime_str(mime)?;
            form = form.part("images", part);
        }
        Ok(form)
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalysisBatch> {
        let count = request.images.len();
        tracing::info!(url = %self.url, images = count, "解析リクエスト送信");

        let form = Self::build_form(request)?;
        let response = self.client.post(&self.url).multipart(form).send().await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(status = %status, bytes = body.len(), "解析レスポンス受信");

        if !status.is_success() {
            // 失敗時もエンベロープに message が入っていればそれを使う
            let detail = match parse_analyze_response(&body) {
                Err(crop_doctor_common::Error::Rejected(message)) => message,
                _ => format!("HTTP {}", status),
            };
            return Err(CropDoctorError::AnalysisFailed(detail));
        }

        Ok(parse_analyze_response(&body)?)
    }
}
