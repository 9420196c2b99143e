//! Crop Doctor Common Library
//!
//! CLIとバックエンド連携で共有される型とユーティリティ

pub mod dataurl;
pub mod error;
pub mod parser;
pub mod types;

pub use dataurl::{decode_data_url, to_data_url};
pub use error::{Error, Result};
pub use parser::{parse_analyze_response, AnalysisBatch};
pub use types::{AnalysisResult, BilingualList, BilingualText, Language, Severity, Treatment};
