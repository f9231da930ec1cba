use crate::core::Pipeline;
use crate::domain::model::RunSummary;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let run_date = self.pipeline.run_date();
        tracing::info!(
            "🚀 Starting pipeline '{}' for {}",
            self.pipeline.name(),
            run_date
        );
        self.monitor.log_stats("Start");

        tracing::info!("📥 Extracting data...");
        let raw_rows = self.pipeline.extract().await?;
        let rows_extracted = raw_rows.len();
        tracing::info!("Extracted {} rows", rows_extracted);
        self.monitor.log_stats("Extract");

        tracing::info!("🔧 Transforming data...");
        let transformed = self.pipeline.transform(raw_rows).await?;
        let records_loaded = transformed.records.len();
        let contract_failures = transformed.report.failures.len();
        tracing::info!(
            "Transformed {} records ({} contract failures)",
            records_loaded,
            contract_failures
        );
        self.monitor.log_stats("Transform");

        tracing::info!("💾 Loading data...");
        let outcome = self.pipeline.load(transformed).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        tracing::info!("🏁 Pipeline '{}' finished", self.pipeline.name());

        Ok(RunSummary {
            pipeline: self.pipeline.name().to_string(),
            run_date,
            rows_extracted,
            records_loaded: if outcome.saved { records_loaded } else { 0 },
            contract_failures,
            output_path: outcome.path,
            saved: outcome.saved,
            duration_ms: started.elapsed().as_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        ContractReport, LoadOutcome, RawSalesRow, SalesRecord, TransformResult,
    };
    use crate::utils::error::EtlError;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubPipeline {
        rows: usize,
        fail_extract: bool,
        saved: bool,
        loaded: AtomicBool,
    }

    impl StubPipeline {
        fn new(rows: usize) -> Self {
            Self {
                rows,
                fail_extract: false,
                saved: true,
                loaded: AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl Pipeline for StubPipeline {
        fn name(&self) -> &str {
            "stub"
        }

        fn run_date(&self) -> NaiveDate {
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
        }

        async fn extract(&self) -> Result<Vec<RawSalesRow>> {
            if self.fail_extract {
                return Err(EtlError::RemoteFileNotFound {
                    path: "/remote/x.zip".to_string(),
                });
            }
            Ok(vec![RawSalesRow::default(); self.rows])
        }

        async fn transform(&self, rows: Vec<RawSalesRow>) -> Result<TransformResult> {
            let records = rows
                .iter()
                .map(|_| SalesRecord {
                    seller_id: "VILJOEN".to_string(),
                    guid: 0,
                    date: Some(self.run_date()),
                    reference: None,
                    customer_code: None,
                    name: None,
                    physical_address1: None,
                    physical_address2: None,
                    physical_address3: None,
                    physical_address4: None,
                    telephone: None,
                    stock_code: None,
                    description: None,
                    price_ex_vat: None,
                    quantity: None,
                    rep_code: None,
                    product_barcode_id: String::new(),
                })
                .collect();
            Ok(TransformResult {
                records,
                total_quantity: 0,
                report: ContractReport::default(),
            })
        }

        async fn load(&self, _result: TransformResult) -> Result<LoadOutcome> {
            self.loaded.store(true, Ordering::SeqCst);
            Ok(LoadOutcome {
                path: "/out/file.csv".to_string(),
                saved: self.saved,
            })
        }
    }

    #[tokio::test]
    async fn test_run_produces_summary() {
        let engine = EtlEngine::new(StubPipeline::new(4));
        let summary = engine.run().await.unwrap();

        assert_eq!(summary.pipeline, "stub");
        assert_eq!(summary.rows_extracted, 4);
        assert_eq!(summary.records_loaded, 4);
        assert!(summary.saved);
        assert_eq!(summary.output_path, "/out/file.csv");
    }

    #[tokio::test]
    async fn test_skipped_load_reports_zero_loaded() {
        let mut pipeline = StubPipeline::new(2);
        pipeline.saved = false;
        let summary = EtlEngine::new(pipeline).run().await.unwrap();
        assert!(!summary.saved);
        assert_eq!(summary.records_loaded, 0);
    }

    #[tokio::test]
    async fn test_extract_failure_stops_pipeline() {
        let mut pipeline = StubPipeline::new(1);
        pipeline.fail_extract = true;
        let engine = EtlEngine::new_with_monitoring(pipeline, false);

        let result = engine.run().await;
        assert!(matches!(result, Err(EtlError::RemoteFileNotFound { .. })));
        assert!(!engine.pipeline().loaded.load(Ordering::SeqCst));
    }
}
