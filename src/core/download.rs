use crate::config::toml_config::IngestConfig;
use crate::domain::ports::RemoteSource;
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub raw_dir: PathBuf,
    pub remote_dir: String,
    pub file_prefix: String,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl DownloadOptions {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            raw_dir: PathBuf::from(&config.extract.raw_dir),
            remote_dir: config.source.remote_dir.clone(),
            file_prefix: config.remote_file_prefix().to_string(),
            retry_attempts: config.retry_attempts(),
            retry_delay: config.retry_delay(),
        }
    }

    /// `Vilbev-YYYYMMDD.zip`
    pub fn archive_name(&self, run_date: NaiveDate) -> String {
        format!("{}{}.zip", self.file_prefix, run_date.format("%Y%m%d"))
    }

    pub fn remote_path(&self, run_date: NaiveDate) -> String {
        format!(
            "{}/{}",
            self.remote_dir.trim_end_matches('/'),
            self.archive_name(run_date)
        )
    }
}

/// 下載當日壓縮檔到 raw 目錄，下載前先清掉舊的壓縮檔
pub async fn download_daily_archive<R: RemoteSource>(
    source: &R,
    options: &DownloadOptions,
    run_date: NaiveDate,
) -> Result<PathBuf> {
    fs::create_dir_all(&options.raw_dir)?;

    let local_file = options.raw_dir.join(options.archive_name(run_date));
    let remote_file = options.remote_path(run_date);

    remove_stale_archives(&options.raw_dir, &options.file_prefix);
    if local_file.exists() {
        match fs::remove_file(&local_file) {
            Ok(()) => tracing::info!("🗑️ Removed pre-existing target file: {}", local_file.display()),
            Err(e) => tracing::error!(
                "❌ Error deleting pre-existing target file {}: {}",
                local_file.display(),
                e
            ),
        }
    }

    tracing::info!(
        "📥 Downloading {} from {} → {}",
        remote_file,
        source.describe(),
        local_file.display()
    );

    let bytes = with_retries(options.retry_attempts, options.retry_delay, || {
        fetch_once(source, &remote_file, &local_file)
    })
    .await?;

    tracing::info!("✅ Download complete ({} bytes): {}", bytes, local_file.display());
    Ok(local_file)
}

async fn fetch_once<R: RemoteSource>(source: &R, remote_file: &str, local_file: &Path) -> Result<u64> {
    let result = source.fetch(remote_file, local_file).await;
    if result.is_err() && local_file.exists() {
        // 不留下寫到一半的檔案
        let _ = fs::remove_file(local_file);
    }
    result
}

/// 刪除 raw 目錄中所有 `<prefix>*.zip`；刪除失敗只記錄
pub fn remove_stale_archives(raw_dir: &Path, prefix: &str) -> usize {
    tracing::info!(
        "🧹 Cleaning up existing {}*.zip files in {}",
        prefix,
        raw_dir.display()
    );

    let pattern = Path::new(&glob::Pattern::escape(&raw_dir.to_string_lossy()))
        .join(format!("{}*.zip", glob::Pattern::escape(prefix)))
        .to_string_lossy()
        .to_string();

    let mut deleted = 0;
    if let Ok(paths) = glob::glob(&pattern) {
        for path in paths.filter_map(|p| p.ok()).filter(|p| p.is_file()) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    deleted += 1;
                    tracing::info!("🗑️ Deleted: {}", path.display());
                }
                Err(e) => tracing::error!("❌ Error deleting {}: {}", path.display(), e),
            }
        }
    }

    if deleted == 0 {
        tracing::info!("ℹ️ No existing {}*.zip files found to delete.", prefix);
    }
    deleted
}

/// 最多重試 `retries` 次；遠端檔案不存在這類錯誤不重試
pub async fn with_retries<T, F, Fut>(retries: u32, delay: Duration, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < retries && e.is_retryable() => {
                attempt += 1;
                tracing::warn!(
                    "⚠️ Attempt {} failed: {}. Retrying in {:?} ({} of {} retries)",
                    attempt,
                    e,
                    delay,
                    attempt,
                    retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if let EtlError::RemoteFileNotFound { path } = &e {
                    tracing::error!("❌ Remote file not found: {}", path);
                }
                return Err(e);
            }
        }
    }
}
