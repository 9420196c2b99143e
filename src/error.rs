use thiserror::Error;

#[derive(Error, Debug)]
pub enum CropDoctorError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("画像デコードエラー: {0}")]
    Decode(String),

    #[error("画像エンコードエラー: {0}")]
    Encode(String),

    #[error("圧縮に失敗: {0}")]
    CompressionFailed(String),

    #[error("解析に失敗: {0}")]
    AnalysisFailed(String),

    #[error("解析結果の件数が不一致: 送信 {expected}件 / 受信 {actual}件")]
    ResultCountMismatch { expected: usize, actual: usize },

    #[error("ストレージ書き込みエラー: {0}")]
    StorageWriteFailed(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] crop_doctor_common::Error),
}

pub type Result<T> = std::result::Result<T, CropDoctorError>;

