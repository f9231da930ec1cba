use crate::config::toml_config::IngestConfig;
use crate::domain::ports::RemoteSource;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::validate_required_field;
use std::path::{Path, PathBuf};

/// 從掛載的網路磁碟 (或對應成磁碟代號的共享路徑) 複製檔案
#[derive(Debug, Clone)]
pub struct ShareSource {
    root: PathBuf,
}

impl ShareSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        let root = validate_required_field("source.root", &config.source.root)?;
        Ok(Self::new(root))
    }

    fn resolve(&self, remote_path: &str) -> PathBuf {
        self.root.join(remote_path.trim_start_matches(['/', '\\']))
    }
}

impl RemoteSource for ShareSource {
    async fn fetch(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        let source = self.resolve(remote_path);
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            return Err(EtlError::RemoteFileNotFound {
                path: source.display().to_string(),
            });
        }
        Ok(tokio::fs::copy(&source, local_path).await?)
    }

    fn describe(&self) -> String {
        format!("share {}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copies_from_share_root() {
        let share = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        std::fs::create_dir_all(share.path().join("home/viljoenbev")).unwrap();
        std::fs::write(share.path().join("home/viljoenbev/Vilbev-20250310.zip"), b"zip").unwrap();

        let source = ShareSource::new(share.path());
        let target = local.path().join("Vilbev-20250310.zip");
        let bytes = source
            .fetch("/home/viljoenbev/Vilbev-20250310.zip", &target)
            .await
            .unwrap();

        assert_eq!(bytes, 3);
        assert_eq!(std::fs::read(target).unwrap(), b"zip");
    }

    #[tokio::test]
    async fn test_missing_file_is_remote_not_found() {
        let share = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        let source = ShareSource::new(share.path());

        let result = source
            .fetch("viljoen/Vilbev-20250310.zip", &local.path().join("x.zip"))
            .await;
        assert!(matches!(result, Err(EtlError::RemoteFileNotFound { .. })));
    }
}
