//! Market-price threshold rule.
//!
//! Flags a purchase whose price exceeds the market reference plus tax:
//! `ceiling = market_reference_price * (1 + tax_rate_percent / 100)`.
//!
//! The ERP workflow this replaces compared the *line total* against a *unit*
//! reference price. That comparison is kept as the default
//! ([`PriceBasis::LineTotal`]); callers that want a per-unit comparison select
//! [`PriceBasis::UnitPrice`] explicitly.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Severity;
use crate::records::TransactionRecord;

/// Which value of the record is compared against the ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PriceBasis {
    /// Compare `net_value` (the whole purchase line).
    #[default]
    LineTotal,
    /// Compare `unit_price`.
    UnitPrice,
}

impl fmt::Display for PriceBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceBasis::LineTotal => write!(f, "line total"),
            PriceBasis::UnitPrice => write!(f, "unit price"),
        }
    }
}

/// A purchase priced above the taxed market reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub sku: String,
    pub location: String,
    pub order_number: String,
    pub basis: PriceBasis,
    pub actual: f64,
    pub market_reference_price: f64,
    pub ceiling: f64,
    pub severity: Severity,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Value above market ({} > {})",
            self.actual, self.market_reference_price
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdRule {
    basis: PriceBasis,
}

impl ThresholdRule {
    pub fn new(basis: PriceBasis) -> Self {
        Self { basis }
    }

    pub fn basis(&self) -> PriceBasis {
        self.basis
    }

    /// Compare one record against the taxed market reference. Total over all
    /// inputs: a non-positive reference flags any positive purchase.
    pub fn evaluate(
        &self,
        record: &TransactionRecord,
        market_reference_price: f64,
        tax_rate_percent: f64,
    ) -> Option<Alert> {
        let ceiling = market_reference_price * (1.0 + tax_rate_percent / 100.0);
        let actual = match self.basis {
            PriceBasis::LineTotal => record.net_value(),
            PriceBasis::UnitPrice => record.unit_price(),
        };

        if actual > ceiling {
            Some(Alert {
                sku: record.sku().to_string(),
                location: record.location().to_string(),
                order_number: record.order_number().to_string(),
                basis: self.basis,
                actual,
                market_reference_price,
                ceiling,
                severity: Severity::from_overshoot(actual, ceiling),
            })
        } else {
            None
        }
    }

    /// Evaluate every record, keeping input order.
    pub fn scan(
        &self,
        records: &[TransactionRecord],
        market_reference_price: f64,
        tax_rate_percent: f64,
    ) -> Vec<Alert> {
        let alerts: Vec<Alert> = records
            .iter()
            .filter_map(|r| self.evaluate(r, market_reference_price, tax_rate_percent))
            .collect();
        tracing::debug!(
            records = records.len(),
            alerts = alerts.len(),
            basis = %self.basis,
            "threshold scan complete"
        );
        alerts
    }
}
