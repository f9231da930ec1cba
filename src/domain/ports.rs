use crate::domain::model::{LoadOutcome, RawSalesRow, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::Path;

/// 每日匯出檔所在的遠端位置 (SFTP 伺服器或掛載的網路磁碟)
pub trait RemoteSource: Send + Sync {
    /// 將 `remote_path` 複製到 `local_path`，回傳寫入的位元組數
    fn fetch(
        &self,
        remote_path: &str,
        local_path: &Path,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    fn describe(&self) -> String;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    fn name(&self) -> &str;
    fn run_date(&self) -> NaiveDate;
    async fn extract(&self) -> Result<Vec<RawSalesRow>>;
    async fn transform(&self, rows: Vec<RawSalesRow>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<LoadOutcome>;
}
