//! Locating the newest daily archive and reading the CSV inside it.

use crate::domain::model::RawSalesRow;
use crate::utils::error::{EtlError, Result};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Return the most recently modified file in `directory` matching `pattern`.
pub fn latest_archive(directory: &Path, pattern: &str) -> Result<PathBuf> {
    let escaped_dir = glob::Pattern::escape(&directory.to_string_lossy());
    let full_pattern = Path::new(&escaped_dir).join(pattern);
    let full_pattern = full_pattern.to_string_lossy();

    let entries: Vec<PathBuf> = glob::glob(&full_pattern)
        .map_err(|e| EtlError::InvalidConfigValueError {
            field: "extract.zip_pattern".to_string(),
            value: pattern.to_string(),
            reason: e.to_string(),
        })?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();

    let newest = entries
        .into_iter()
        .max_by_key(|p| p.metadata().and_then(|m| m.modified()).ok());

    match newest {
        Some(path) => {
            tracing::info!("📦 Latest ZIP selected: {}", path.display());
            Ok(path)
        }
        None => Err(EtlError::NoMatchingFiles {
            pattern: pattern.to_string(),
            directory: directory.display().to_string(),
        }),
    }
}

/// Pick the first `.csv` entry of `archive_path`, extract a copy under
/// `extract_dir`, and parse it into raw rows.
pub fn read_first_csv(archive_path: &Path, extract_dir: &Path) -> Result<Vec<RawSalesRow>> {
    if !archive_path.is_file() {
        return Err(EtlError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("ZIP file does not exist: {}", archive_path.display()),
        )));
    }

    tracing::info!("📦 Reading ZIP archive {}", archive_path.display());
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    tracing::debug!("📁 Files inside ZIP: {:?}", names);

    let csv_name = first_csv_entry(&mut archive)?.ok_or_else(|| EtlError::NoCsvInArchive {
        archive: archive_path.display().to_string(),
    })?;
    tracing::info!("📄 Found CSV file: {}", csv_name);

    let mut entry = archive.by_name(&csv_name)?;
    let relative = entry.enclosed_name().ok_or_else(|| EtlError::ProcessingError {
        message: format!("Unsafe entry name in archive: {}", csv_name),
    })?;
    let mut bytes = Vec::with_capacity(capacity_hint(entry.size()));
    entry.read_to_end(&mut bytes)?;

    fs::create_dir_all(extract_dir)?;
    let extracted_path = extract_dir.join(relative);
    if let Some(parent) = extracted_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&extracted_path, &bytes)?;
    tracing::debug!("📤 Extracted to: {}", extracted_path.display());

    let rows = parse_rows(bytes.as_slice())?;
    tracing::info!("✅ Loaded CSV {} ({} rows)", csv_name, rows.len());
    Ok(rows)
}

/// 中央目錄的大小欄位由對方控制，只當作上限有限的提示
const MAX_PREALLOCATION: u64 = 64 << 20;

fn capacity_hint(declared_size: u64) -> usize {
    usize::try_from(declared_size.min(MAX_PREALLOCATION)).unwrap_or(0)
}

// Archive order, not name order: "first" is the first entry written.
fn first_csv_entry<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> Result<Option<String>> {
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if entry.is_file() && entry.name().to_lowercase().ends_with(".csv") {
            return Ok(Some(entry.name().to_string()));
        }
    }
    Ok(None)
}

pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<RawSalesRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let missing: Vec<String> = RawSalesRow::COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(EtlError::MissingColumns { columns: missing });
    }

    let mut rows = Vec::new();
    for row in csv_reader.deserialize::<RawSalesRow>() {
        rows.push(row?);
    }
    Ok(rows)
}
