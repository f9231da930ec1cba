use crate::config::toml_config::IngestConfig;
use crate::domain::model::{RawSalesRow, SalesRecord};
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub seller_id: String,
    pub default_customer_name: String,
    pub date_formats: Vec<String>,
}

impl TransformOptions {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            seller_id: config.seller_id().to_string(),
            default_customer_name: config.default_customer_name().to_string(),
            date_formats: config.date_formats(),
        }
    }
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}

/// 將經銷商原始欄位轉成標準銷售欄位
pub fn transform_rows(rows: &[RawSalesRow], options: &TransformOptions) -> Vec<SalesRecord> {
    tracing::info!("🔧 Transforming {} rows", rows.len());

    let records: Vec<SalesRecord> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| transform_row(index, row, options))
        .collect();

    tracing::info!("ℹ️ Total quantity: {}", total_quantity(&records));
    tracing::info!("✅ Transformation complete. Rows: {}", records.len());
    records
}

fn transform_row(index: usize, row: &RawSalesRow, options: &TransformOptions) -> SalesRecord {
    let date = row
        .date
        .as_deref()
        .and_then(|value| parse_date(value, &options.date_formats));
    if date.is_none() {
        tracing::debug!("Row {}: unparseable date {:?}", index, row.date);
    }

    let quantity = row.quantity.and_then(whole_quantity);
    if quantity.is_none() && row.quantity.is_some() {
        tracing::warn!(
            "⚠️ Row {}: quantity {:?} is not a whole number",
            index,
            row.quantity
        );
    }

    let name = row
        .customer_name
        .clone()
        .unwrap_or_else(|| options.default_customer_name.clone());

    SalesRecord {
        seller_id: options.seller_id.clone(),
        guid: 0,
        date,
        reference: row.reference.clone(),
        customer_code: row.customer_code.clone(),
        name: Some(name),
        physical_address1: row.physical_address1.clone(),
        physical_address2: row.physical_address2.clone(),
        physical_address3: row.physical_address3.clone(),
        physical_address4: Some(delivery_address(row)).filter(|a| !a.is_empty()),
        telephone: row.telephone.clone(),
        stock_code: row.product_code.clone(),
        description: row.product_description.clone(),
        price_ex_vat: unit_price(row.value, row.quantity),
        quantity,
        rep_code: row.rep.clone(),
        product_barcode_id: String::new(),
    }
}

/// Deliver1..4 以空白串接，只去掉頭尾空白
pub fn delivery_address(row: &RawSalesRow) -> String {
    [&row.deliver1, &row.deliver2, &row.deliver3, &row.deliver4]
        .iter()
        .map(|part| part.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// |Value / Quantity| 四捨六入五成雙到小數兩位；數量為 0 或缺值時無單價
pub fn unit_price(value: Option<f64>, quantity: Option<f64>) -> Option<f64> {
    let value = value?;
    let quantity = quantity?;
    if quantity == 0.0 {
        return None;
    }
    let price = (value / quantity).abs();
    if !price.is_finite() {
        return None;
    }
    Some((price * 100.0).round_ties_even() / 100.0)
}

/// 依序嘗試每個格式，全部失敗就當作缺值
pub fn parse_date(value: &str, formats: &[String]) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    formats.iter().find_map(|format| {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(value, format)
                    .ok()
                    .map(|dt| dt.date())
            })
    })
}

// i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
fn whole_quantity(quantity: f64) -> Option<i64> {
    let in_range = quantity >= i64::MIN as f64 && quantity < i64::MAX as f64;
    (quantity.is_finite() && quantity.fract() == 0.0 && in_range).then_some(quantity as i64)
}

pub fn total_quantity(records: &[SalesRecord]) -> i64 {
    records
        .iter()
        .filter_map(|r| r.quantity)
        .fold(0i64, |total, q| total.saturating_add(q))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(date: &str, value: f64, quantity: f64) -> RawSalesRow {
        RawSalesRow {
            date: Some(date.to_string()),
            reference: Some("INV100".to_string()),
            customer_code: Some("C001".to_string()),
            customer_name: Some("Corner Cafe".to_string()),
            product_code: Some("P1".to_string()),
            product_description: Some("Cola 330ml".to_string()),
            value: Some(value),
            quantity: Some(quantity),
            rep: Some("R7".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_maps_standard_layout() {
        let options = TransformOptions::default();
        let records = transform_rows(&[raw("2025-03-09", 120.0, 12.0)], &options);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.seller_id, "VILJOEN");
        assert_eq!(record.guid, 0);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 3, 9));
        assert_eq!(record.customer_code.as_deref(), Some("C001"));
        assert_eq!(record.stock_code.as_deref(), Some("P1"));
        assert_eq!(record.description.as_deref(), Some("Cola 330ml"));
        assert_eq!(record.price_ex_vat, Some(10.0));
        assert_eq!(record.quantity, Some(12));
        assert_eq!(record.rep_code.as_deref(), Some("R7"));
        assert_eq!(record.product_barcode_id, "");
    }

    #[test]
    fn test_delivery_address_join_and_trim() {
        let mut row = raw("2025-03-09", 1.0, 1.0);
        row.deliver1 = Some("12 Main Rd".to_string());
        row.deliver3 = Some("Randburg".to_string());
        assert_eq!(delivery_address(&row), "12 Main Rd  Randburg");

        let mut row = raw("2025-03-09", 1.0, 1.0);
        row.deliver4 = Some("2194".to_string());
        assert_eq!(delivery_address(&row), "2194");

        let record = &transform_rows(&[raw("2025-03-09", 1.0, 1.0)], &TransformOptions::default())[0];
        assert!(record.physical_address4.is_none());
    }

    #[test]
    fn test_missing_name_uses_default() {
        let mut row = raw("2025-03-09", 1.0, 1.0);
        row.customer_name = None;
        let record = &transform_rows(&[row], &TransformOptions::default())[0];
        assert_eq!(record.name.as_deref(), Some("SPAR NORTH RAND (11691)"));
    }

    #[test]
    fn test_unit_price_rounding_and_sign() {
        assert_eq!(unit_price(Some(-100.0), Some(3.0)), Some(33.33));
        assert_eq!(unit_price(Some(50.0), Some(-4.0)), Some(12.5));
        assert_eq!(unit_price(Some(0.125), Some(1.0)), Some(0.12));
        assert_eq!(unit_price(Some(10.0), Some(0.0)), None);
        assert_eq!(unit_price(None, Some(2.0)), None);
        assert_eq!(unit_price(Some(10.0), None), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let formats = TransformOptions::default().date_formats;
        let expected = NaiveDate::from_ymd_opt(2025, 3, 9);
        assert_eq!(parse_date("2025-03-09", &formats), expected);
        assert_eq!(parse_date("2025/03/09", &formats), expected);
        assert_eq!(parse_date("03/09/2025", &formats), expected);
        assert_eq!(parse_date("03/09/2025 08:15", &formats), expected);
        assert_eq!(parse_date("2025-03-09 14:22:01", &formats), expected);
        assert_eq!(parse_date("not a date", &formats), None);
        assert_eq!(parse_date("  ", &formats), None);
    }

    #[test]
    fn test_ambiguous_slash_date_is_month_first() {
        let formats = TransformOptions::default().date_formats;
        assert_eq!(
            parse_date("09/03/2025", &formats),
            NaiveDate::from_ymd_opt(2025, 9, 3)
        );
        // 日大於 12 只能是日在前
        assert_eq!(
            parse_date("13/03/2025", &formats),
            NaiveDate::from_ymd_opt(2025, 3, 13)
        );
        assert_eq!(
            parse_date("25/12/2024 17:40", &formats),
            NaiveDate::from_ymd_opt(2024, 12, 25)
        );
    }

    #[test]
    fn test_fractional_quantity_is_dropped() {
        let record = &transform_rows(&[raw("2025-03-09", 10.0, 2.5)], &TransformOptions::default())[0];
        assert_eq!(record.quantity, None);
        assert_eq!(record.price_ex_vat, Some(4.0));
    }

    #[test]
    fn test_total_quantity() {
        let records = transform_rows(
            &[raw("2025-03-09", 10.0, 2.0), raw("2025-03-09", 10.0, -1.0)],
            &TransformOptions::default(),
        );
        assert_eq!(total_quantity(&records), 1);
    }

    #[test]
    fn test_out_of_range_quantity_is_dropped() {
        assert_eq!(whole_quantity(1e20), None);
        assert_eq!(whole_quantity(-1e20), None);
        assert_eq!(whole_quantity(9_223_372_036_854_775_808.0), None);
        assert_eq!(whole_quantity(f64::NAN), None);
        assert_eq!(whole_quantity(-4.0), Some(-4));

        let record = &transform_rows(&[raw("2025-03-09", 10.0, 1e20)], &TransformOptions::default())[0];
        assert_eq!(record.quantity, None);
    }

    #[test]
    fn test_total_quantity_saturates() {
        let mut records = transform_rows(
            &[raw("2025-03-09", 10.0, 1.0), raw("2025-03-09", 10.0, 1.0)],
            &TransformOptions::default(),
        );
        records[0].quantity = Some(i64::MAX);
        records[1].quantity = Some(5);
        assert_eq!(total_quantity(&records), i64::MAX);
    }
}
