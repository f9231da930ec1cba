//! Sales data contract: every record is checked and all breaches are
//! collected before reporting.

use crate::domain::model::{ContractReport, FailureCase, SalesRecord};
use crate::utils::error::{EtlError, Result};
use regex::Regex;

pub struct ContractValidator {
    customer_code: Regex,
}

impl ContractValidator {
    pub fn new() -> Result<Self> {
        let customer_code = Regex::new(r"^[A-Z0-9]+$").map_err(|e| EtlError::ProcessingError {
            message: format!("customer code pattern: {}", e),
        })?;
        Ok(Self { customer_code })
    }

    pub fn validate(&self, records: &[SalesRecord]) -> ContractReport {
        let mut failures = Vec::new();

        for (row, record) in records.iter().enumerate() {
            let mut fail = |column: &'static str, check: &str, value: String| {
                failures.push(FailureCase {
                    row,
                    column,
                    check: check.to_string(),
                    failure_case: value,
                });
            };

            require_text(&mut fail, "SellerID", Some(&record.seller_id));
            if record.guid < 0 {
                fail("GUID", "greater_than_or_equal_to(0)", record.guid.to_string());
            }
            if record.date.is_none() {
                fail("Date", "not_nullable", "NaT".to_string());
            }
            require_text(&mut fail, "Reference", record.reference.as_ref());

            match record.customer_code.as_deref() {
                None | Some("") => fail("Customer_Code", "not_nullable", "NaN".to_string()),
                Some(code) if !self.customer_code.is_match(code) => fail(
                    "Customer_Code",
                    "str_matches('^[A-Z0-9]+$')",
                    code.to_string(),
                ),
                Some(_) => {}
            }

            require_text(&mut fail, "Name", record.name.as_ref());
            require_text(&mut fail, "Stock_Code", record.stock_code.as_ref());
            require_text(&mut fail, "Description", record.description.as_ref());

            match record.price_ex_vat {
                None => fail("Price_Ex_Vat", "not_nullable", "NaN".to_string()),
                Some(price) if !price.is_finite() || price < 0.0 => fail(
                    "Price_Ex_Vat",
                    "greater_than_or_equal_to(0.0)",
                    price.to_string(),
                ),
                Some(_) => {}
            }

            if record.quantity.is_none() {
                fail("Quantity", "not_nullable", "NaN".to_string());
            }
        }

        ContractReport {
            rows_checked: records.len(),
            failures,
        }
    }
}

fn require_text<F>(fail: &mut F, column: &'static str, value: Option<&String>)
where
    F: FnMut(&'static str, &str, String),
{
    if value.map(|v| v.trim().is_empty()).unwrap_or(true) {
        fail(column, "not_nullable", "NaN".to_string());
    }
}

/// 將報告寫進日誌；strict 模式下有違規就回傳錯誤
pub fn enforce(report: &ContractReport, strict: bool) -> Result<()> {
    if report.is_clean() {
        tracing::info!(
            "✅ Data passed validation ({} rows). Proceeding to next step.",
            report.rows_checked
        );
        return Ok(());
    }

    tracing::warn!("⚠️ Data contract breached!");
    tracing::warn!("❌ Total errors found: {}", report.failures.len());
    tracing::warn!("********* ⚠️ Failure Report ⚠️ *********");
    tracing::warn!("{:>6} | {:<18} | {:<32} | failure_case", "row", "column", "check");
    for failure in &report.failures {
        tracing::warn!(
            "{:>6} | {:<18} | {:<32} | {}",
            failure.row,
            failure.column,
            failure.check,
            failure.failure_case
        );
    }

    if strict {
        return Err(EtlError::ContractBreach {
            failures: report.failures.len(),
        });
    }
    tracing::warn!("↪ Continuing with load (validation.strict = false)");
    Ok(())
}
