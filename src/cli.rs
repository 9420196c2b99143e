use crate::analyzer::CropChoice;
use clap::{Parser, Subcommand};
use crop_doctor_common::Language;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crop-doctor")]
#[command(about = "作物写真の病害AI診断ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 写真を取り込み、圧縮して一括診断
    Analyze {
        /// 写真ファイルまたはフォルダ（最大5枚まで取り込む）
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 作物名 (Tomato/Potato/Rice/Wheat/Maize/Cotton または任意の名前)
        #[arg(short, long)]
        crop: Option<CropChoice>,

        /// 結果言語 (en/kn)。省略時は設定値
        #[arg(short, long)]
        lang: Option<Language>,

        /// 解析前に全画像を回転（度）
        #[arg(long, allow_negative_numbers = true)]
        rotate: Option<f64>,

        /// 解析前に中央正方形へ切り抜き
        #[arg(long)]
        square: bool,

        /// 比較に追加する画像の番号（1始まり、複数指定可）
        #[arg(long)]
        compare: Vec<usize>,

        /// 診断結果を履歴に保存
        #[arg(long)]
        save: bool,

        /// 処置内容を読み上げ
        #[arg(long)]
        speak: bool,

        /// 結果JSONの出力先
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 圧縮せずに送信
        #[arg(long)]
        no_compress: bool,
    },

    /// 画像を縮小・JPEG再エンコード
    Compress {
        #[arg(required = true)]
        input: PathBuf,

        /// 出力ファイル
        #[arg(short, long)]
        output: PathBuf,

        /// 長辺の上限（省略時は設定値）
        #[arg(long)]
        max_dimension: Option<u32>,

        /// JPEG品質 1-100（省略時は設定値）
        #[arg(short, long)]
        quality: Option<u8>,
    },

    /// 画像を回転
    Rotate {
        #[arg(required = true)]
        input: PathBuf,

        /// 回転角（度、時計回り）
        #[arg(allow_negative_numbers = true)]
        degrees: f64,

        /// 出力ファイル
        #[arg(short, long)]
        output: PathBuf,
    },

    /// 画像を中央正方形に切り抜き
    Crop {
        #[arg(required = true)]
        input: PathBuf,

        /// 出力ファイル
        #[arg(short, long)]
        output: PathBuf,
    },

    /// 診断履歴
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// 解析レポート（PDF）のURL表示・ダウンロード
    Report {
        /// 解析ID
        id: u64,

        /// 保存先ファイル
        #[arg(short, long)]
        download: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// 解析APIのURLを設定
        #[arg(long)]
        set_api_base: Option<String>,

        /// 既定の結果言語を設定 (en/kn)
        #[arg(long)]
        set_language: Option<Language>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// 一覧（新しい順）
    List,

    /// 詳細を表示
    Show {
        /// 一覧の番号（1始まり）
        n: usize,
    },

    /// 処置内容を読み上げ
    Speak {
        /// 一覧の番号（1始まり）
        n: usize,
    },

    /// 全削除
    Clear {
        /// 確認を省略
        #[arg(short, long)]
        yes: bool,
    },
}
