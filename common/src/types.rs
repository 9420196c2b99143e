//! 診断結果の型定義
//!
//! CLIとバックエンド応答で共有される型:
//! - Language: 結果表示言語（英語/カンナダ語）
//! - BilingualText / BilingualList: 二言語テキスト
//! - AnalysisResult: 1枚の画像に対する病害診断結果

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 結果言語
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Kn,
}

impl Language {
    /// フォーム送信用の言語コード
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Kn => "kn",
        }
    }

    /// 音声合成用の言語タグ
    pub fn speech_tag(&self) -> &'static str {
        match self {
            Language::En => "en-US",
            Language::Kn => "kn-IN",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "kn" | "kannada" => Ok(Language::Kn),
            _ => Err(format!("Unknown language: {}. Use en or kn", s)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 重症度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// 二言語テキスト
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilingualText {
    pub en: String,
    pub kn: String,
}

impl BilingualText {
    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::En => &self.en,
            Language::Kn => &self.kn,
        }
    }
}

/// 二言語リスト
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilingualList {
    pub en: Vec<String>,
    pub kn: Vec<String>,
}

impl BilingualList {
    pub fn get(&self, language: Language) -> &[String] {
        match language {
            Language::En => &self.en,
            Language::Kn => &self.kn,
        }
    }
}

/// 処置（即時・化学的・有機）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Treatment {
    pub immediate: BilingualList,
    pub chemical: BilingualList,
    pub organic: BilingualList,
}

/// 病害診断結果
///
/// バックエンド応答からのみ生成され、アイテムに付与された後は変更しない。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub disease: BilingualText,

    /// 信頼度 (0-100)
    #[serde(default)]
    pub confidence: f64,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub cause: BilingualText,

    #[serde(default)]
    pub treatment: Treatment,

    #[serde(default)]
    pub prevention: BilingualList,
}

impl AnalysisResult {
    /// 即時→化学的→有機の順で処置手順を連結
    pub fn treatment_steps(&self, language: Language) -> Vec<&str> {
        [
            &self.treatment.immediate,
            &self.treatment.chemical,
            &self.treatment.organic,
        ]
        .iter()
        .flat_map(|list| list.get(language).iter().map(String::as_str))
        .collect()
    }

    /// 読み上げ用テキスト（". " 区切り）
    pub fn treatment_speech_text(&self, language: Language) -> String {
        self.treatment_steps(language).join(". ")
    }
}
