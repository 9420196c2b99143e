//! Data URL変換
//!
//! 履歴エントリは画像を `data:image/jpeg;base64,...` 形式で保持する

use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine};

/// バイト列をData URLに変換
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Data URLをデコードしてバイト列を返す
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| Error::DataUrl("カンマ区切りがありません".into()))?;

    if !header.starts_with("data:") || !header.ends_with(";base64") {
        return Err(Error::DataUrl(format!("未対応のヘッダ: {}", header)));
    }

    STANDARD
        .decode(payload)
        .map_err(|e| Error::DataUrl(e.to_string()))
}
