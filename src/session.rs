//! セッション
//!
//! HTTPクライアント・APIのURL・表示言語をまとめて持つ。
//! ストアや履歴とは独立しており、`close` で明示的に破棄する。

use crate::config::Config;
use crate::error::{CropDoctorError, Result};
use crop_doctor_common::Language;
use std::path::Path;
use std::time::Duration;

const ANALYZE_PATH: &str = "/api/crop-doctor/analyze/";
const REPORT_PATH: &str = "/api/crop-doctor/report/";

#[derive(Debug, Clone)]
pub struct Session {
    client: reqwest::Client,
    api_base: String,
    language: Language,
}

impl Session {
    pub fn open(config: &Config) -> Result<Self> {
        let api_base = normalize_base(&config.api_base)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()?;

        tracing::debug!(api_base = %api_base, language = %config.language, "セッション開始");

        Ok(Self {
            client,
            api_base,
            language: config.language,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn with_language(self, language: Language) -> Self {
        Self { language, ..self }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn analyze_url(&self) -> String {
        format!("{}{}", self.api_base, ANALYZE_PATH)
    }

    /// PDFレポートのURL
    pub fn report_url(&self, analysis_id: u64) -> String {
        format!("{}{}{}/", self.api_base, REPORT_PATH, analysis_id)
    }

    /// レポートを保存し、書き込んだバイト数を返す
    pub async fn download_report(&self, analysis_id: u64, path: &Path) -> Result<u64> {
        let url = self.report_url(analysis_id);
        tracing::info!(url = %url, "レポートをダウンロード");

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &bytes).await?;

        Ok(bytes.len() as u64)
    }

    pub fn close(self) {
        tracing::debug!(api_base = %self.api_base, "セッション終了");
    }
}

fn normalize_base(base: &str) -> Result<String> {
    let base = base.trim().trim_end_matches('/');
    if !base.starts_with("http://") && !base.starts_with("https://") {
        return Err(CropDoctorError::Config(format!(
            "APIのURLが不正です: {}",
            base
        )));
    }
    Ok(base.to_string())
}
