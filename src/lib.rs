//! 作物写真の病害診断クライアント
//!
//! 画像の取り込み・圧縮から一括解析、比較・履歴・読み上げまで。
//! 共有状態は [`upload::UploadStore`] のみで、各処理はアイテムID単位で更新する。

pub mod analyzer;
pub mod cli;
pub mod codec;
pub mod compare;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod progress;
pub mod render;
pub mod scanner;
pub mod session;
pub mod speech;
pub mod upload;
