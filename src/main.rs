use anyhow::{bail, Context};
use clap::Parser;
use crop_doctor::analyzer::{self, BatchOutcome, CropChoice, HttpBackend};
use crop_doctor::cli::{Cli, Commands, HistoryAction};
use crop_doctor::codec::{ImageCodec, RasterCodec};
use crop_doctor::config::Config;
use crop_doctor::history::{FileStore, History};
use crop_doctor::progress::ProgressView;
use crop_doctor::session::Session;
use crop_doctor::speech::{speak_treatment, CommandSpeech};
use crop_doctor::upload::{CompressionPipeline, CompressionSettings, UploadStore, MAX_ITEMS};
use crop_doctor::{logging, render, scanner};
use crop_doctor_common::Language;
use dialoguer::Confirm;
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct AnalyzeOptions {
    paths: Vec<PathBuf>,
    crop: CropChoice,
    language: Language,
    rotate: Option<f64>,
    square: bool,
    compare: Vec<usize>,
    save: bool,
    speak: bool,
    output: Option<PathBuf>,
    no_compress: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = Config::load().context("設定の読み込みに失敗")?;

    match cli.command {
        Commands::Analyze {
            paths,
            crop,
            lang,
            rotate,
            square,
            compare,
            save,
            speak,
            output,
            no_compress,
        } => {
            let options = AnalyzeOptions {
                paths,
                crop: crop.unwrap_or_default(),
                language: lang.unwrap_or(config.language),
                rotate,
                square,
                compare,
                save,
                speak,
                output,
                no_compress,
            };
            run_analyze(&config, options).await?;
        }

        Commands::Compress { input, output, max_dimension, quality } => {
            let max_dimension = max_dimension.unwrap_or(config.max_dimension);
            let quality = quality.unwrap_or(config.jpeg_quality);
            convert(&input, &output, move |bytes| RasterCodec.compress(bytes, max_dimension, quality)).await?;
        }

        Commands::Rotate { input, degrees, output } => {
            convert(&input, &output, move |bytes| RasterCodec.rotate(bytes, degrees)).await?;
        }

        Commands::Crop { input, output } => {
            convert(&input, &output, |bytes| RasterCodec.crop_center_square(bytes)).await?;
        }

        Commands::History { action } => {
            run_history(&config, action).await?;
        }

        Commands::Report { id, download } => {
            let session = Session::open(&config)?;
            println!("レポート: {}", session.report_url(id));

            if let Some(path) = download {
                let bytes = session
                    .download_report(id, &path)
                    .await
                    .with_context(|| format!("レポートのダウンロードに失敗: {}", id))?;
                println!("✔ 保存しました: {} ({} bytes)", path.display(), bytes);
            }
            session.close();
        }

        Commands::Config { set_api_base, set_language, show } => {
            let mut config = config;

            if let Some(base) = set_api_base {
                config.set_api_base(base)?;
                println!("✔ APIのURLを設定しました");
            }

            if let Some(language) = set_language {
                config.set_language(language)?;
                println!("✔ 結果言語を設定しました");
            }

            if show {
                println!("設定:");
                println!("  API: {}", config.api_base);
                println!("  結果言語: {}", config.language);
                println!("  最大画像サイズ: {}px", config.max_dimension);
                println!("  JPEG品質: {}", config.jpeg_quality);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  読み上げコマンド: {}", config.speech_command);
                println!("  履歴容量: {} bytes", config.storage_quota_bytes);
                match config.resolve_data_dir() {
                    Ok(dir) => println!("  データ: {}", dir.display()),
                    Err(e) => println!("  データ: ({})", e),
                }
            }
        }
    }

    Ok(())
}

async fn run_analyze(config: &Config, options: AnalyzeOptions) -> anyhow::Result<()> {
    println!("🌱 crop-doctor - 病害診断\n");

    let session = Session::open(config)?.with_language(options.language);

    // 1. 取り込み
    let inputs = scanner::collect_inputs(&options.paths)?;
    println!("[1/3] {}枚の写真を検出", inputs.len());

    let store = UploadStore::shared();
    let view = ProgressView::spawn(store.read().await.subscribe());

    // 2. 圧縮・編集
    let pipeline = CompressionPipeline::new(
        store.clone(),
        Arc::new(RasterCodec),
        CompressionSettings::from(config),
    );
    let added = if options.no_compress {
        pipeline.add_uncompressed(inputs).await
    } else {
        pipeline.add_files(inputs).await
    };

    // 圧縮に失敗したアイテムは編集されない（false が返る）
    for id in &added.accepted {
        if let Some(degrees) = options.rotate {
            if let Err(e) = pipeline.rotate_item(*id, degrees).await {
                tracing::warn!(item = %id, error = %e, "回転に失敗");
            }
        }
        if options.square {
            if let Err(e) = pipeline.crop_item(*id).await {
                tracing::warn!(item = %id, error = %e, "切り抜きに失敗");
            }
        }
    }

    // 3. 一括解析
    let backend = HttpBackend::new(&session);
    let batch = analyzer::analyze(&store, &backend, &options.crop, options.language).await;
    view.finish().await;

    println!();
    if added.dropped > 0 {
        println!(
            "⚠ 最大{}枚のため {}枚は取り込みませんでした",
            MAX_ITEMS, added.dropped
        );
    }

    let mut store = store.write().await;
    for (i, item) in store.items().iter().enumerate() {
        print!("{}", render::format_item(i + 1, item, options.language));
    }

    match &batch {
        Ok(BatchOutcome::Completed { analysis_id, .. }) => {
            println!("\n[2/3] レポート: {}", session.report_url(*analysis_id));
        }
        Ok(BatchOutcome::Empty) => println!("\n解析できる画像がありません"),
        Err(_) => {}
    }

    // 比較（番号は1始まり）
    if !options.compare.is_empty() {
        let ids: Vec<_> = store.items().iter().map(|item| item.id).collect();
        for n in &options.compare {
            match n.checked_sub(1).and_then(|i| ids.get(i)) {
                Some(id) => store.toggle_compare(*id),
                None => println!("⚠ 比較対象の番号が範囲外: {}", n),
            }
        }
        let compared = store.compared_items();
        if !compared.is_empty() {
            println!("\n{}", render::format_comparison(&compared, options.language));
        }
    }

    if options.save {
        let storage = FileStore::new(config.resolve_data_dir()?).with_quota(config.storage_quota_bytes);
        let mut history = History::load(storage);
        let saved = store
            .done_items()
            .into_iter()
            .filter(|item| history.save(item, &options.crop))
            .count();
        println!("[3/3] 履歴に{}件保存 (計{}件)", saved, history.len());
    }

    if options.speak {
        let speech = CommandSpeech::new(config.speech_command.clone());
        for item in store.done_items() {
            if let Some(result) = &item.result {
                speak_treatment(&speech, result, options.language);
            }
        }
        speech.flush().await;
    }

    if let Some(path) = &options.output {
        let summaries: Vec<_> = store.items().iter().map(|item| item.summary()).collect();
        let json = serde_json::json!({
            "analysisId": store.last_analysis_id(),
            "language": options.language,
            "cropType": options.crop.form_value(),
            "items": summaries,
        });
        std::fs::write(path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("結果の書き込みに失敗: {}", path.display()))?;
        println!("✔ 結果を保存: {}", path.display());
    }

    drop(store);
    session.close();

    batch.context("一括解析に失敗")?;
    println!("\n✅ 完了");
    Ok(())
}

async fn run_history(config: &Config, action: HistoryAction) -> anyhow::Result<()> {
    let storage = FileStore::new(config.resolve_data_dir()?).with_quota(config.storage_quota_bytes);
    let mut history = History::load(storage);
    let language = config.language;

    match action {
        HistoryAction::List => {
            if history.is_empty() {
                println!("履歴はありません");
            }
            for (i, entry) in history.entries().iter().enumerate() {
                println!("{}", render::format_history_line(i + 1, entry, language));
            }
        }

        HistoryAction::Show { n } => {
            let entry = n
                .checked_sub(1)
                .and_then(|i| history.entries().get(i))
                .with_context(|| format!("履歴 {} は存在しません", n))?;
            println!("{}", render::format_history_line(n, entry, language));
            print!("{}", render::format_result(&entry.result, language));
        }

        HistoryAction::Speak { n } => {
            let entry = n
                .checked_sub(1)
                .and_then(|i| history.entries().get(i))
                .with_context(|| format!("履歴 {} は存在しません", n))?;
            let speech = CommandSpeech::new(config.speech_command.clone());
            speak_treatment(&speech, &entry.result, language);
            speech.flush().await;
        }

        HistoryAction::Clear { yes } => {
            if history.is_empty() {
                println!("履歴はありません");
                return Ok(());
            }
            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!("履歴{}件を削除しますか？", history.len()))
                    .default(false)
                    .interact()?;
            if confirmed {
                history.clear();
                println!("✔ 履歴を削除しました");
            } else {
                println!("中止しました");
            }
        }
    }

    Ok(())
}

/// 単体の画像変換（ファイル → ファイル）
async fn convert<F>(input: &Path, output: &Path, op: F) -> anyhow::Result<()>
where
    F: FnOnce(&[u8]) -> crop_doctor::error::Result<Vec<u8>> + Send + 'static,
{
    if !input.is_file() {
        bail!("ファイルが見つかりません: {}", input.display());
    }
    let bytes = tokio::fs::read(input).await?;
    let before = bytes.len();

    let converted = tokio::task::spawn_blocking(move || op(&bytes)).await??;
    tokio::fs::write(output, &converted).await?;

    println!(
        "✔ {} → {} ({} → {} bytes)",
        input.display(),
        output.display(),
        before,
        converted.len()
    );
    Ok(())
}
