//! 処置内容の読み上げ
//!
//! 読み上げは投げっぱなし。失敗はログに残すだけで呼び出し側には返さない。

use crop_doctor_common::{AnalysisResult, Language};
use std::process::Stdio;
use std::sync::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub trait SpeechOutput: Send + Sync {
    fn speak(&self, text: &str, lang_tag: &str);
}

/// 外部TTSコマンド（既定は espeak-ng）で読み上げる
pub struct CommandSpeech {
    program: String,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// 言語タグを espeak の声名に変換
    fn voice_for(lang_tag: &str) -> &'static str {
        if lang_tag.to_ascii_lowercase().starts_with("kn") {
            "kn"
        } else {
            "en-us"
        }
    }

    /// 発話中のコマンドが終わるまで待つ
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.drain(..).collect()
        };
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "読み上げタスクが異常終了");
            }
        }
    }
}

impl SpeechOutput for CommandSpeech {
    fn speak(&self, text: &str, lang_tag: &str) {
        if text.trim().is_empty() {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("非同期ランタイム外のため読み上げをスキップ");
            return;
        };

        let program = self.program.clone();
        let voice = Self::voice_for(lang_tag);
        let text = text.to_string();
        tracing::debug!(program = %program, voice, chars = text.chars().count(), "読み上げ開始");

        let handle = runtime.spawn(async move {
            let status = tokio::process::Command::new(&program)
                .args(["-v", voice])
                .arg(&text)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;

            match status {
                Ok(status) if status.success() => {}
                Ok(status) => tracing::warn!(program = %program, code = ?status.code(), "読み上げコマンドが失敗"),
                Err(e) => tracing::warn!(program = %program, error = %e, "読み上げコマンドを起動できません"),
            }
        });

        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle);
    }
}

/// 処置（即時・化学・有機）を続けて読み上げる
pub fn speak_treatment(speech: &dyn SpeechOutput, result: &AnalysisResult, language: Language) {
    let text = result.treatment_speech_text(language);
    speech.speak(&text, language.speech_tag());
}
