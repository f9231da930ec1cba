use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 經銷商匯出的原始 CSV 列，欄位名稱照原檔表頭
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSalesRow {
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "Reference")]
    pub reference: Option<String>,
    #[serde(rename = "Customer code")]
    pub customer_code: Option<String>,
    #[serde(rename = "Customer name")]
    pub customer_name: Option<String>,
    #[serde(rename = "Physical_Address1")]
    pub physical_address1: Option<String>,
    #[serde(rename = "Physical_Address2")]
    pub physical_address2: Option<String>,
    #[serde(rename = "Physical_Address3")]
    pub physical_address3: Option<String>,
    #[serde(rename = "Deliver1")]
    pub deliver1: Option<String>,
    #[serde(rename = "Deliver2")]
    pub deliver2: Option<String>,
    #[serde(rename = "Deliver3")]
    pub deliver3: Option<String>,
    #[serde(rename = "Deliver4")]
    pub deliver4: Option<String>,
    #[serde(rename = "Telephone")]
    pub telephone: Option<String>,
    #[serde(rename = "Product code")]
    pub product_code: Option<String>,
    #[serde(rename = "Product description")]
    pub product_description: Option<String>,
    #[serde(rename = "Value")]
    pub value: Option<f64>,
    #[serde(rename = "Quantity")]
    pub quantity: Option<f64>,
    #[serde(rename = "Rep")]
    pub rep: Option<String>,
}

impl RawSalesRow {
    pub const COLUMNS: [&'static str; 17] = [
        "Date",
        "Reference",
        "Customer code",
        "Customer name",
        "Physical_Address1",
        "Physical_Address2",
        "Physical_Address3",
        "Deliver1",
        "Deliver2",
        "Deliver3",
        "Deliver4",
        "Telephone",
        "Product code",
        "Product description",
        "Value",
        "Quantity",
        "Rep",
    ];
}

/// 標準銷售欄位配置，輸出 CSV 的欄位順序即為欄位宣告順序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    #[serde(rename = "SellerID")]
    pub seller_id: String,
    #[serde(rename = "GUID")]
    pub guid: i64,
    #[serde(rename = "Date")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "Reference")]
    pub reference: Option<String>,
    #[serde(rename = "Customer_Code")]
    pub customer_code: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Physical_Address1")]
    pub physical_address1: Option<String>,
    #[serde(rename = "Physical_Address2")]
    pub physical_address2: Option<String>,
    #[serde(rename = "Physical_Address3")]
    pub physical_address3: Option<String>,
    #[serde(rename = "Physical_Address4")]
    pub physical_address4: Option<String>,
    #[serde(rename = "Telephone")]
    pub telephone: Option<String>,
    #[serde(rename = "Stock_Code")]
    pub stock_code: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Price_Ex_Vat")]
    pub price_ex_vat: Option<f64>,
    #[serde(rename = "Quantity")]
    pub quantity: Option<i64>,
    #[serde(rename = "RepCode")]
    pub rep_code: Option<String>,
    #[serde(rename = "ProductBarCodeID")]
    pub product_barcode_id: String,
}

impl SalesRecord {
    pub const COLUMNS: [&'static str; 17] = [
        "SellerID",
        "GUID",
        "Date",
        "Reference",
        "Customer_Code",
        "Name",
        "Physical_Address1",
        "Physical_Address2",
        "Physical_Address3",
        "Physical_Address4",
        "Telephone",
        "Stock_Code",
        "Description",
        "Price_Ex_Vat",
        "Quantity",
        "RepCode",
        "ProductBarCodeID",
    ];
}

/// 單一資料合約違規
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureCase {
    /// 0 起算的資料列索引
    pub row: usize,
    pub column: &'static str,
    pub check: String,
    pub failure_case: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContractReport {
    pub rows_checked: usize,
    pub failures: Vec<FailureCase>,
}

impl ContractReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures_for<'a>(
        &'a self,
        column: &'a str,
    ) -> impl Iterator<Item = &'a FailureCase> + 'a {
        self.failures.iter().filter(move |f| f.column == column)
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub records: Vec<SalesRecord>,
    pub total_quantity: i64,
    pub report: ContractReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadOutcome {
    pub path: String,
    /// false 表示同名檔案已存在，沒有覆寫
    pub saved: bool,
}

/// 一次執行的摘要，`--json` 時輸出到 stdout
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub pipeline: String,
    pub run_date: NaiveDate,
    pub rows_extracted: usize,
    pub records_loaded: usize,
    pub contract_failures: usize,
    pub output_path: String,
    pub saved: bool,
    pub duration_ms: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(row: usize, column: &'static str) -> FailureCase {
        FailureCase {
            row,
            column,
            check: "not_nullable".to_string(),
            failure_case: "NaN".to_string(),
        }
    }

    #[test]
    fn test_failures_for_borrowed_column_name() {
        let report = ContractReport {
            rows_checked: 3,
            failures: vec![failure(0, "Date"), failure(1, "Quantity"), failure(2, "Date")],
        };

        let column = String::from("Date");
        let rows: Vec<usize> = report.failures_for(&column).map(|f| f.row).collect();
        drop(column);

        assert_eq!(rows, vec![0, 2]);
        assert!(!report.is_clean());
        assert!(ContractReport::default().is_clean());
    }
}
