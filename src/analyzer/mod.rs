//! 病害解析
//!
//! - `crop`: 作物の指定
//! - `backend`: 解析バックエンドの抽象
//! - `http`: 解析APIへの送信
//! - `submitter`: ストアからの一括送信と結果の割り当て

mod backend;
mod crop;
mod http;
mod submitter;

pub use backend::{AnalysisBackend, AnalyzeRequest, ImagePart};
pub use crop::{Crop, CropChoice};
pub use http::HttpBackend;
pub use submitter::{analyze, BatchOutcome};
