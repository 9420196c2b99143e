use crate::error::{CropDoctorError, Result};
use crop_doctor_common::Language;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const API_BASE_ENV: &str = "CROP_DOCTOR_API_BASE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    pub language: Language,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
    pub timeout_seconds: u64,
    pub speech_command: String,
    pub storage_quota_bytes: u64,
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8000".into(),
            language: Language::En,
            max_dimension: 1200,
            jpeg_quality: 75,
            timeout_seconds: 120,
            speech_command: "espeak-ng".into(),
            // ブラウザのlocalStorage相当の上限
            storage_quota_bytes: 5 * 1024 * 1024,
            data_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        // 環境変数を優先
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            if !base.trim().is_empty() {
                config.api_base = base.trim().to_string();
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CropDoctorError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("crop-doctor").join("config.json"))
    }

    /// 履歴などの永続データ置き場
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_dir()
            .ok_or_else(|| CropDoctorError::Config("データディレクトリが見つかりません".into()))?;
        Ok(base.join("crop-doctor"))
    }

    pub fn set_api_base(&mut self, base: String) -> Result<()> {
        let base = base.trim().trim_end_matches('/').to_string();
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(CropDoctorError::Config(format!(
                "APIのURLは http:// または https:// で始めてください: {}",
                base
            )));
        }
        self.api_base = base;
        self.save()
    }

    pub fn set_language(&mut self, language: Language) -> Result<()> {
        self.language = language;
        self.save()
    }
}
