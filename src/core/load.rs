use crate::config::toml_config::IngestConfig;
use crate::domain::model::{LoadOutcome, SalesRecord};
use crate::utils::error::{EtlError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub output_dir: PathBuf,
    pub file_prefix: String,
    pub create_dir_if_missing: bool,
    pub delete_existing_csvs: bool,
    /// 只刪除此前綴開頭的 CSV；None 時刪除全部 CSV
    pub restrict_delete_to_prefix: Option<String>,
    pub lookback_days: u32,
}

impl LoadOptions {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.load.output_dir),
            file_prefix: config.output_file_prefix().to_string(),
            create_dir_if_missing: config.create_dir_if_missing(),
            delete_existing_csvs: config.delete_existing_csvs(),
            restrict_delete_to_prefix: config.load.restrict_delete_to_prefix.clone(),
            lookback_days: config.lookback_days(),
        }
    }
}

/// 寫出清理後的資料。日期範圍必須落在回溯視窗內，且同名檔案已存在時不覆寫。
pub fn load_to_local(
    records: &[SalesRecord],
    options: &LoadOptions,
    today: NaiveDate,
) -> Result<LoadOutcome> {
    let output_dir = prepare_output_dir(&options.output_dir, options.create_dir_if_missing)?;

    if options.delete_existing_csvs {
        delete_existing_csvs(&output_dir, options.restrict_delete_to_prefix.as_deref());
    }

    let (min_date, max_date) = date_bounds(records)?;
    validate_dates(min_date, max_date, today, options.lookback_days)?;

    let filename = format!(
        "{}{}_to_{}.csv",
        options.file_prefix,
        min_date.format("%Y-%m-%d"),
        max_date.format("%Y-%m-%d")
    );
    let full_path = output_dir.join(filename);
    let path = full_path.display().to_string();

    if full_path.exists() {
        tracing::warn!("🛑 File already exists, skipping save: {}", path);
        return Ok(LoadOutcome { path, saved: false });
    }

    write_records(&full_path, records)?;
    tracing::info!("✅ Data saved to: {} ({} records)", path, records.len());
    Ok(LoadOutcome { path, saved: true })
}

fn prepare_output_dir(output_dir: &Path, create_if_missing: bool) -> Result<PathBuf> {
    if !output_dir.is_dir() {
        if create_if_missing {
            fs::create_dir_all(output_dir)?;
            tracing::info!("📁 Created output directory: {}", output_dir.display());
        } else {
            return Err(EtlError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Output directory does not exist: {}", output_dir.display()),
            )));
        }
    }
    Ok(fs::canonicalize(output_dir)?)
}

/// 刪除輸出目錄內舊的 CSV；單一檔案刪除失敗只記錄
pub fn delete_existing_csvs(output_dir: &Path, prefix: Option<&str>) -> usize {
    let pattern = match prefix {
        Some(prefix) => format!("{}*.csv", prefix),
        None => "*.csv".to_string(),
    };
    tracing::info!("🧹 Cleaning up existing CSV files in {}", output_dir.display());

    let full_pattern = Path::new(&glob::Pattern::escape(&output_dir.to_string_lossy()))
        .join(&pattern)
        .to_string_lossy()
        .to_string();

    let mut deleted = 0;
    match glob::glob(&full_pattern) {
        Ok(paths) => {
            for path in paths.filter_map(|p| p.ok()).filter(|p| p.is_file()) {
                match fs::remove_file(&path) {
                    Ok(()) => {
                        deleted += 1;
                        tracing::info!("🗑️ Deleted CSV: {}", path.display());
                    }
                    Err(e) => tracing::error!("❌ Error deleting {}: {}", path.display(), e),
                }
            }
        }
        Err(e) => tracing::error!("❌ Invalid cleanup pattern {}: {}", pattern, e),
    }

    if deleted == 0 {
        tracing::info!("ℹ️ No matching CSV files found to delete.");
    }
    deleted
}

fn date_bounds(records: &[SalesRecord]) -> Result<(NaiveDate, NaiveDate)> {
    let mut dates = records.iter().filter_map(|r| r.date);
    let first = dates.next().ok_or(EtlError::EmptyDates)?;
    Ok(dates.fold((first, first), |(min, max), d| (min.min(d), max.max(d))))
}

/// 整個日期範圍要落在最近 `lookback_days` 天內 (含頭尾)，
/// 且最新日期的月份必須是本月或上個月。
pub fn validate_dates(
    min_date: NaiveDate,
    max_date: NaiveDate,
    today: NaiveDate,
    lookback_days: u32,
) -> Result<()> {
    let window_start = today - Duration::days(i64::from(lookback_days));
    let in_window = |d: NaiveDate| window_start <= d && d <= today;

    if !(in_window(min_date) && in_window(max_date)) {
        return Err(EtlError::StaleDateRange {
            min: min_date,
            max: max_date,
            lookback_days,
            window_start,
            today,
        });
    }

    let current_month = today.month();
    let previous_month = if current_month == 1 { 12 } else { current_month - 1 };
    let file_month = max_date.month();

    if file_month != current_month && file_month != previous_month {
        return Err(EtlError::MonthOutOfRange {
            file_month,
            current_month,
            previous_month,
        });
    }

    Ok(())
}

fn write_records(path: &Path, records: &[SalesRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if records.is_empty() {
        writer.write_record(SalesRecord::COLUMNS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
