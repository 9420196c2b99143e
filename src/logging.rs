//! ログ初期化
//!
//! `CROP_DOCTOR_LOG` が設定されていればそのフィルタを使い、
//! 未設定なら `--verbose` の有無で info / debug を切り替える。

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CROP_DOCTOR_LOG";

pub fn init(verbose: bool) {
    let default_level = if verbose { "crop_doctor=debug" } else { "crop_doctor=info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    // 二重初期化（テスト等）は無視する
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
