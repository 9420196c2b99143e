//! アイテムごとの進捗表示
//!
//! ストアのスナップショットを購読し、1アイテム1本のバーで状態を表示する。

use crate::upload::{ItemId, ItemStatus, StoreSnapshot, UploadItem};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

const TEMPLATE: &str = "{prefix:.bold} [{bar:30.green/white}] {pos:>3}% {msg}";

pub struct ProgressView {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ProgressView {
    pub fn spawn(mut snapshots: watch::Receiver<StoreSnapshot>) -> Self {
        let (stop, mut stopped) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut bars = Bars::new();
            bars.render(&snapshots.borrow_and_update().clone());

            loop {
                tokio::select! {
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = snapshots.borrow_and_update().clone();
                        bars.render(&snapshot);
                    }
                    _ = &mut stopped => break,
                }
            }

            // 停止直前の変更を取りこぼさない
            let snapshot = snapshots.borrow().clone();
            bars.render(&snapshot);
            bars.finish();
        });

        Self { stop, task }
    }

    /// 表示を止め、バーを確定させる
    pub async fn finish(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "進捗表示タスクが異常終了");
        }
    }
}

struct Bars {
    multi: MultiProgress,
    bars: HashMap<ItemId, ProgressBar>,
    style: ProgressStyle,
}

impl Bars {
    fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        Self {
            multi: MultiProgress::new(),
            bars: HashMap::new(),
            style,
        }
    }

    fn render(&mut self, snapshot: &[UploadItem]) {
        for item in snapshot {
            let bar = self.bars.entry(item.id).or_insert_with(|| {
                let bar = self.multi.add(ProgressBar::new(100));
                bar.set_style(self.style.clone());
                bar.set_prefix(item.name.clone());
                bar
            });
            bar.set_position(item.progress as u64);
            bar.set_message(status_message(item));
        }

        // 削除されたアイテム
        let live: Vec<ItemId> = snapshot.iter().map(|item| item.id).collect();
        self.bars.retain(|id, bar| {
            let keep = live.contains(id);
            if !keep {
                bar.finish_and_clear();
            }
            keep
        });
    }

    fn finish(&self) {
        for bar in self.bars.values() {
            bar.finish();
        }
    }
}

fn status_message(item: &UploadItem) -> String {
    match (&item.status, &item.error_message) {
        (ItemStatus::Error, Some(message)) => format!("error: {}", message),
        (status, _) => status.label().to_string(),
    }
}
