//! Typed procurement records and the `(sku, location)` grouping key.
//!
//! A [`TransactionRecord`] is validated once at construction and is immutable
//! afterwards; every downstream stage can rely on `quantity > 0`,
//! `net_value >= 0` and non-empty `sku`/`location`.

pub mod loader;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("sku must not be empty")]
    EmptySku,

    #[error("location must not be empty")]
    EmptyLocation,

    #[error("quantity must be a finite number greater than zero (got {0})")]
    InvalidQuantity(f64),

    #[error("net value must be a finite, non-negative number (got {0})")]
    InvalidNetValue(f64),
}

/// Unvalidated purchase line as handed over by an ingestion collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    pub sku: String,
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub supplier: String,
    pub quantity: f64,
    pub net_value: f64,
    #[serde(default)]
    pub document_date: Option<NaiveDate>,
    #[serde(default)]
    pub order_number: String,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub unit_of_measure: Option<String>,
    #[serde(default)]
    pub merchandise_group: Option<String>,
    #[serde(default)]
    pub group_description: Option<String>,
}

/// One validated purchase line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTransaction")]
pub struct TransactionRecord {
    sku: String,
    location: String,
    description: String,
    supplier: String,
    quantity: f64,
    net_value: f64,
    unit_price: f64,
    document_date: Option<NaiveDate>,
    order_number: String,
    item: Option<String>,
    unit_of_measure: Option<String>,
    merchandise_group: Option<String>,
    group_description: Option<String>,
}

impl TransactionRecord {
    /// Validate a raw row and derive its unit price.
    pub fn new(raw: RawTransaction) -> Result<Self, RecordError> {
        let sku = raw.sku.trim().to_string();
        let location = raw.location.trim().to_string();

        if sku.is_empty() {
            return Err(RecordError::EmptySku);
        }
        if location.is_empty() {
            return Err(RecordError::EmptyLocation);
        }
        if !raw.quantity.is_finite() || raw.quantity <= 0.0 {
            return Err(RecordError::InvalidQuantity(raw.quantity));
        }
        if !raw.net_value.is_finite() || raw.net_value < 0.0 {
            return Err(RecordError::InvalidNetValue(raw.net_value));
        }

        Ok(Self {
            unit_price: raw.net_value / raw.quantity,
            sku,
            location,
            description: raw.description,
            supplier: raw.supplier,
            quantity: raw.quantity,
            net_value: raw.net_value,
            document_date: raw.document_date,
            order_number: raw.order_number,
            item: non_empty(raw.item),
            unit_of_measure: non_empty(raw.unit_of_measure),
            merchandise_group: non_empty(raw.merchandise_group),
            group_description: non_empty(raw.group_description),
        })
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn supplier(&self) -> &str {
        &self.supplier
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn net_value(&self) -> f64 {
        self.net_value
    }

    /// `net_value / quantity`, fixed at construction.
    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    pub fn document_date(&self) -> Option<NaiveDate> {
        self.document_date
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn item(&self) -> Option<&str> {
        self.item.as_deref()
    }

    pub fn unit_of_measure(&self) -> Option<&str> {
        self.unit_of_measure.as_deref()
    }

    pub fn merchandise_group(&self) -> Option<&str> {
        self.merchandise_group.as_deref()
    }

    pub fn group_description(&self) -> Option<&str> {
        self.group_description.as_deref()
    }

    pub fn key(&self) -> GroupKey {
        GroupKey::new(&self.sku, &self.location)
    }

    pub(crate) fn has_key(&self, key: &GroupKey) -> bool {
        self.sku == key.sku && self.location == key.location
    }
}

impl TryFrom<RawTransaction> for TransactionRecord {
    type Error = RecordError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

/// A row that failed validation, with its zero-based position in the batch.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("record {index} rejected: {reason}")]
pub struct BatchError {
    pub index: usize,
    pub reason: RecordError,
}

/// Validate a whole batch. The first invalid row rejects everything; nothing
/// is skipped or coerced.
pub fn validate_batch(rows: Vec<RawTransaction>) -> Result<Vec<TransactionRecord>, BatchError> {
    rows.into_iter()
        .enumerate()
        .map(|(index, raw)| TransactionRecord::new(raw).map_err(|reason| BatchError { index, reason }))
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Unit of statistical aggregation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub sku: String,
    pub location: String,
}

impl GroupKey {
    pub fn new(sku: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            location: location.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.sku, self.location)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal valid record for unit tests.
    pub fn record(sku: &str, location: &str, quantity: f64, net_value: f64) -> TransactionRecord {
        TransactionRecord::new(RawTransaction {
            sku: sku.to_string(),
            location: location.to_string(),
            quantity,
            net_value,
            ..Default::default()
        })
        .expect("fixture record must be valid")
    }

    pub fn priced(sku: &str, location: &str, unit_price: f64) -> TransactionRecord {
        record(sku, location, 1.0, unit_price)
    }
}
