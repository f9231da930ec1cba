use chrono::NaiveDate;
use clap::Parser;
use daily_ingest::config::{Cli, Commands};
use daily_ingest::core::download::DownloadOptions;
use daily_ingest::core::schedule::serve;
use daily_ingest::core::{RemoteSource, RunSummary};
use daily_ingest::utils::error::ErrorSeverity;
use daily_ingest::utils::{logger, validation::Validate};
use daily_ingest::{
    ArchiveSelection, DailyIngestPipeline, EtlEngine, EtlError, IngestConfig, Result, SftpSource,
    ShareSource, SourceType,
};
use std::path::Path;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // 本機執行時從 .env 讀取 ftp_* 與輸出目錄
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting daily-ingest");

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config.display(), e);
            eprintln!("💡 Make sure the file is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    let monitor_enabled = cli.monitor || config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let source_type = config.source.r#type;
    let result = match source_type {
        SourceType::Sftp => match SftpSource::from_config(&config) {
            Ok(source) => dispatch(source, config, &cli.command, monitor_enabled).await,
            Err(e) => Err(e),
        },
        SourceType::Share => match ShareSource::from_config(&config) {
            Ok(source) => dispatch(source, config, &cli.command, monitor_enabled).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        // 輸出用戶友好的錯誤信息
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        let exit_code = exit_code(&e);
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

/// 設定檔不存在時改用預設值，連線資訊由環境變數提供
fn load_config(path: &Path) -> Result<IngestConfig> {
    let mut config = if path.exists() {
        tracing::info!("📁 Loading configuration from: {}", path.display());
        IngestConfig::from_file(path)?
    } else {
        tracing::warn!(
            "⚠️ Config file {} not found, using defaults and environment variables",
            path.display()
        );
        IngestConfig::default()
    };
    config.apply_env_overrides()?;
    Ok(config)
}

// 根據錯誤嚴重程度決定退出碼
fn exit_code(e: &EtlError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 重跑可能成功
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

async fn dispatch<R>(source: R, config: IngestConfig, command: &Commands, monitor: bool) -> Result<()>
where
    R: RemoteSource + Clone,
{
    match command {
        Commands::Run { as_of, json } => {
            let pipeline = build_pipeline(source, config, *as_of, ArchiveSelection::Download)?;
            run_once(pipeline, monitor, *json).await
        }
        Commands::Process {
            archive,
            as_of,
            json,
        } => {
            let selection = match archive {
                Some(path) => ArchiveSelection::Explicit(path.clone()),
                None => ArchiveSelection::Latest,
            };
            let pipeline = build_pipeline(source, config, *as_of, selection)?;
            run_once(pipeline, monitor, *json).await
        }
        Commands::Download { as_of } => {
            let pipeline = build_pipeline(source, config, *as_of, ArchiveSelection::Download)?;
            let path = pipeline.download().await?;
            println!("✅ Downloaded: {}", path.display());
            Ok(())
        }
        Commands::Serve => {
            let schedule = config.daily_schedule()?;
            tracing::info!("⏰ Serving daily runs at {} (local time)", schedule);
            serve(schedule, || {
                // 每次觸發都以當天日期重新建立管道
                let pipeline = DailyIngestPipeline::new(source.clone(), config.clone());
                async move {
                    let summary = EtlEngine::new_with_monitoring(pipeline?, monitor)
                        .run()
                        .await?;
                    log_summary(&summary);
                    Ok::<_, EtlError>(summary)
                }
            })
            .await
        }
        Commands::Check { dry_run } => {
            display_config_summary(&config, &source, *dry_run);
            Ok(())
        }
    }
}

fn build_pipeline<R: RemoteSource>(
    source: R,
    config: IngestConfig,
    as_of: Option<NaiveDate>,
    selection: ArchiveSelection,
) -> Result<DailyIngestPipeline<R>> {
    let mut pipeline = DailyIngestPipeline::new(source, config)?.with_archive(selection);
    if let Some(date) = as_of {
        tracing::info!("📅 Running as of {}", date);
        pipeline = pipeline.with_run_date(date);
    }
    Ok(pipeline)
}

async fn run_once<R: RemoteSource>(
    pipeline: DailyIngestPipeline<R>,
    monitor: bool,
    json: bool,
) -> Result<()> {
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor);
    let summary = engine.run().await?;
    log_summary(&summary);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if summary.saved {
        println!("✅ ETL process completed successfully!");
        println!("📁 Output saved to: {}", summary.output_path);
        println!(
            "📊 {} rows extracted, {} records loaded, {} contract failures ({} ms)",
            summary.rows_extracted,
            summary.records_loaded,
            summary.contract_failures,
            summary.duration_ms
        );
    } else {
        println!("🛑 Output already exists, nothing written: {}", summary.output_path);
    }
    Ok(())
}

fn log_summary(summary: &RunSummary) {
    tracing::info!(
        pipeline = %summary.pipeline,
        run_date = %summary.run_date,
        rows_extracted = summary.rows_extracted,
        records_loaded = summary.records_loaded,
        contract_failures = summary.contract_failures,
        saved = summary.saved,
        duration_ms = summary.duration_ms as u64,
        "📋 Run summary"
    );
}

fn display_config_summary<R: RemoteSource>(config: &IngestConfig, source: &R, dry_run: bool) {
    let today = chrono::Local::now().date_naive();
    let download = DownloadOptions::from_config(config);

    println!("📋 Configuration Summary:");
    println!("  Pipeline: {}", config.pipeline.name);
    if let Some(description) = &config.pipeline.description {
        println!("  Description: {}", description);
    }
    println!("  Source: {}", source.describe());
    println!("  Remote file today: {}", download.remote_path(today));
    println!("  Raw dir: {}", config.extract.raw_dir);
    println!("  Extract dir: {}", config.extract_dir());
    println!("  Output dir: {}", config.load.output_dir);
    println!("  Output prefix: {}", config.output_file_prefix());
    println!("  Lookback days: {}", config.lookback_days());
    println!("  Strict contract: {}", config.is_strict());
    println!(
        "  Retries: {} (delay {:?})",
        config.retry_attempts(),
        config.retry_delay()
    );

    match config.daily_schedule() {
        Ok(schedule) => {
            let now = chrono::Local::now().naive_local();
            println!("  Schedule: daily at {}", schedule);
            println!("  Next run: {}", schedule.next_run_after(now));
        }
        Err(_) => println!("  Schedule: not configured"),
    }

    if dry_run {
        println!();
        println!("🔍 Dry Run Analysis:");
        println!(
            "  1. Delete {}*.zip in {}",
            download.file_prefix,
            download.raw_dir.display()
        );
        println!(
            "  2. Download {} → {}",
            download.remote_path(today),
            download.raw_dir.join(download.archive_name(today)).display()
        );
        println!(
            "  3. Read the first CSV inside the newest {} archive",
            config.zip_pattern()
        );
        println!(
            "  4. Write {}<min>_to_<max>.csv if dates fall within {} days of {}",
            config.output_file_prefix(),
            config.lookback_days(),
            today
        );
    }

    println!();
}
