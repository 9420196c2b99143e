//! 結果のテキスト整形
//!
//! 選択言語で表示し、カンナダ語表示のときは病名に英語名を併記する。
//! 選択言語の値が空なら英語で補う。

use crate::history::HistoryEntry;
use crate::upload::{ItemStatus, UploadItem};
use crop_doctor_common::{AnalysisResult, BilingualList, BilingualText, Language};
use std::fmt::Write;

fn text_in<'a>(text: &'a BilingualText, language: Language) -> &'a str {
    let value = text.get(language);
    if value.trim().is_empty() {
        &text.en
    } else {
        value
    }
}

fn list_in(list: &BilingualList, language: Language) -> &[String] {
    let value = list.get(language);
    if value.is_empty() {
        &list.en
    } else {
        value
    }
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {}:", heading);
    for item in items {
        let _ = writeln!(out, "    - {}", item);
    }
}

pub fn format_result(result: &AnalysisResult, language: Language) -> String {
    let mut out = String::new();

    let disease = text_in(&result.disease, language);
    if language == Language::En || disease == result.disease.en {
        let _ = writeln!(out, "  病名: {}", disease);
    } else {
        let _ = writeln!(out, "  病名: {} ({})", disease, result.disease.en);
    }
    let _ = writeln!(out, "  信頼度: {:.0}%  重症度: {}", result.confidence, result.severity);

    let cause = text_in(&result.cause, language);
    if !cause.is_empty() {
        let _ = writeln!(out, "  原因: {}", cause);
    }

    push_list(&mut out, "即時の処置", list_in(&result.treatment.immediate, language));
    push_list(&mut out, "化学的処置", list_in(&result.treatment.chemical, language));
    push_list(&mut out, "有機的処置", list_in(&result.treatment.organic, language));
    push_list(&mut out, "予防", list_in(&result.prevention, language));

    out
}

/// アイテム1件分（番号は1始まり）
pub fn format_item(position: usize, item: &UploadItem, language: Language) -> String {
    let mut out = format!("[{}] {} - {}\n", position, item.name, item.status);
    match (&item.status, &item.result, &item.error_message) {
        (ItemStatus::Done, Some(result), _) => out.push_str(&format_result(result, language)),
        (ItemStatus::Error, _, Some(message)) => {
            let _ = writeln!(out, "  エラー: {}", message);
        }
        _ => {}
    }
    out
}

/// 比較表示（2件を並べて要点のみ）
pub fn format_comparison(items: &[&UploadItem], language: Language) -> String {
    let mut out = String::from("=== 比較 ===\n");
    for item in items {
        match &item.result {
            Some(result) => {
                let _ = writeln!(
                    out,
                    "{}: {} / {:.0}% / {}",
                    item.name,
                    text_in(&result.disease, language),
                    result.confidence,
                    result.severity
                );
            }
            None => {
                let _ = writeln!(out, "{}: (結果なし)", item.name);
            }
        }
    }
    out
}

pub fn format_history_line(position: usize, entry: &HistoryEntry, language: Language) -> String {
    let crop = if entry.crop_type.is_empty() { "-" } else { entry.crop_type.as_str() };
    format!(
        "{:>2}. {}  {}  [{}]  {}",
        position,
        entry.saved_at_local(),
        entry.name,
        crop,
        text_in(&entry.result.disease, language)
    )
}
