//! CSV ingestion for ERP purchase exports.
//!
//! Accepts either snake_case headers or the column names of the ERP export
//! (`SKU`, `Centro`, `Valor Liquido`, ...). Every row must parse and validate;
//! a single bad row rejects the whole file.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use super::{validate_batch, RawTransaction, TransactionRecord};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// One CSV row before validation.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "SKU")]
    sku: String,
    #[serde(alias = "Centro")]
    location: String,
    #[serde(default, alias = "Descrição")]
    description: Option<String>,
    #[serde(default, alias = "Fornecedor")]
    supplier: Option<String>,
    #[serde(alias = "Quantidade", deserialize_with = "amount")]
    quantity: f64,
    #[serde(alias = "Valor Liquido", deserialize_with = "amount")]
    net_value: f64,
    #[serde(default, alias = "Data Doc.", deserialize_with = "lenient_date")]
    document_date: Option<NaiveDate>,
    #[serde(default, alias = "Nº Pedido")]
    order_number: Option<String>,
    #[serde(default, alias = "Item")]
    item: Option<String>,
    #[serde(default, alias = "UN")]
    unit_of_measure: Option<String>,
    #[serde(default, alias = "Grp. Mercadoria")]
    merchandise_group: Option<String>,
    #[serde(default, alias = "Descrição.1")]
    group_description: Option<String>,
}

impl From<CsvRow> for RawTransaction {
    fn from(row: CsvRow) -> Self {
        RawTransaction {
            sku: row.sku,
            location: row.location,
            description: row.description.unwrap_or_default(),
            supplier: row.supplier.unwrap_or_default(),
            quantity: row.quantity,
            net_value: row.net_value,
            document_date: row.document_date,
            order_number: row.order_number.unwrap_or_default(),
            item: row.item,
            unit_of_measure: row.unit_of_measure,
            merchandise_group: row.merchandise_group,
            group_description: row.group_description,
        }
    }
}

/// Load and validate purchase records from a CSV reader.
pub fn load_csv<R: Read>(reader: R) -> Result<Vec<TransactionRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (line_num, result) in csv_reader.deserialize::<CsvRow>().enumerate() {
        // +2: one for the header, one for 1-based numbering
        let row = result.with_context(|| format!("CSV parse error at line {}", line_num + 2))?;
        rows.push(RawTransaction::from(row));
    }
    debug!(rows = rows.len(), "parsed CSV rows");

    validate_batch(rows).map_err(|e| {
        anyhow::anyhow!("invalid record at line {}: {}", e.index + 2, e.reason)
    })
}

/// Load and validate purchase records from a CSV file path.
pub fn load_csv_file(path: &Path) -> Result<Vec<TransactionRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open '{}'", path.display()))?;
    let records = load_csv(file).with_context(|| format!("failed to load '{}'", path.display()))?;
    info!(path = %path.display(), records = records.len(), "loaded purchase records");
    Ok(records)
}

/// Parse a monetary or quantity field. Accepts `1234.5`, `1234,5`,
/// `1.234,50` and `1,234.50`.
///
/// When both separators appear, the last one is the decimal mark and the
/// other must group the integer digits in threes. A lone separator that
/// repeats (`1.234.567`) is a thousands mark; a single one is decimal.
/// Anything else is rejected rather than guessed.
fn parse_amount(text: &str) -> Option<f64> {
    let text = text.trim();
    let (thousands, decimal) = match (text.rfind(','), text.rfind('.')) {
        (Some(c), Some(d)) if c > d => (Some('.'), Some(',')),
        (Some(_), Some(_)) => (Some(','), Some('.')),
        (Some(_), None) if text.matches(',').count() > 1 => (Some(','), None),
        (Some(_), None) => (None, Some(',')),
        (None, Some(_)) if text.matches('.').count() > 1 => (Some('.'), None),
        (None, Some(_)) => (None, Some('.')),
        (None, None) => (None, None),
    };

    let (integer, fraction) = match decimal.and_then(|sep| text.rsplit_once(sep)) {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (text, None),
    };
    let (sign, digits) = match integer.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer),
    };

    let integer_digits = match thousands {
        Some(sep) => {
            let groups: Vec<&str> = digits.split(sep).collect();
            let well_formed = groups.iter().enumerate().all(|(i, g)| {
                let len_ok = if i == 0 { (1..=3).contains(&g.len()) } else { g.len() == 3 };
                len_ok && g.chars().all(|c| c.is_ascii_digit())
            });
            if !well_formed {
                return None;
            }
            groups.concat()
        }
        None => digits.to_string(),
    };

    let mut normalized = format!("{}{}", sign, integer_digits);
    if let Some(fraction) = fraction {
        if !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        normalized.push('.');
        normalized.push_str(fraction);
    }
    normalized.parse::<f64>().ok()
}

fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_amount(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("malformed amount: '{}'", text)))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Unparseable dates are kept as `None` rather than failing the row.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = Option::<String>::deserialize(deserializer)?;
    Ok(text.as_deref().and_then(parse_date))
}
