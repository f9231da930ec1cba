use crate::config::toml_config::IngestConfig;
use crate::core::archive::{latest_archive, read_first_csv};
use crate::core::contract::{enforce, ContractValidator};
use crate::core::download::{download_daily_archive, DownloadOptions};
use crate::core::load::{load_to_local, LoadOptions};
use crate::core::transform::{total_quantity, transform_rows, TransformOptions};
use crate::core::{LoadOutcome, Pipeline, RawSalesRow, RemoteSource, TransformResult};
use crate::utils::error::Result;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// 決定 extract 階段要讀哪一個壓縮檔
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSelection {
    /// 先下載當日檔案，再取 raw 目錄中最新的壓縮檔
    Download,
    /// 不下載，直接取 raw 目錄中最新的壓縮檔
    Latest,
    /// 指定壓縮檔
    Explicit(PathBuf),
}

pub struct DailyIngestPipeline<R: RemoteSource> {
    config: IngestConfig,
    source: R,
    run_date: NaiveDate,
    archive: ArchiveSelection,
    validator: ContractValidator,
}

impl<R: RemoteSource> DailyIngestPipeline<R> {
    pub fn new(source: R, config: IngestConfig) -> Result<Self> {
        Ok(Self {
            config,
            source,
            run_date: chrono::Local::now().date_naive(),
            archive: ArchiveSelection::Download,
            validator: ContractValidator::new()?,
        })
    }

    /// 以指定日期執行：決定下載哪一天的檔案，也是新鮮度檢查的「今天」
    pub fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.run_date = run_date;
        self
    }

    pub fn with_archive(mut self, archive: ArchiveSelection) -> Self {
        self.archive = archive;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    pub async fn download(&self) -> Result<PathBuf> {
        let options = DownloadOptions::from_config(&self.config);
        download_daily_archive(&self.source, &options, self.run_date).await
    }

    fn raw_dir(&self) -> &Path {
        Path::new(&self.config.extract.raw_dir)
    }

    async fn select_archive(&self) -> Result<PathBuf> {
        match &self.archive {
            ArchiveSelection::Download => {
                self.download().await?;
                latest_archive(self.raw_dir(), &self.config.zip_pattern())
            }
            ArchiveSelection::Latest => latest_archive(self.raw_dir(), &self.config.zip_pattern()),
            ArchiveSelection::Explicit(path) => Ok(path.clone()),
        }
    }
}

#[async_trait::async_trait]
impl<R: RemoteSource> Pipeline for DailyIngestPipeline<R> {
    fn name(&self) -> &str {
        &self.config.pipeline.name
    }

    fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    async fn extract(&self) -> Result<Vec<RawSalesRow>> {
        let archive_path = self.select_archive().await?;
        let extract_dir = PathBuf::from(self.config.extract_dir());

        let rows =
            tokio::task::spawn_blocking(move || read_first_csv(&archive_path, &extract_dir))
                .await??;

        tracing::info!("✅ Data extracted successfully: {} rows", rows.len());
        Ok(rows)
    }

    async fn transform(&self, rows: Vec<RawSalesRow>) -> Result<TransformResult> {
        let options = TransformOptions::from_config(&self.config);
        let records = transform_rows(&rows, &options);
        let total = total_quantity(&records);

        let report = self.validator.validate(&records);
        enforce(&report, self.config.is_strict())?;

        Ok(TransformResult {
            records,
            total_quantity: total,
            report,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<LoadOutcome> {
        let options = LoadOptions::from_config(&self.config);
        load_to_local(&result.records, &options, self.run_date)
    }
}
