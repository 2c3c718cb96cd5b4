//! Internal vs. external reference prices.
//!
//! Reference data is injected through [`ReferencePriceProvider`] so the
//! comparison does not depend on a particular snapshot. [`ReferenceTable`] is
//! the in-memory implementation, loadable from TOML:
//!
//! ```toml
//! [[reference]]
//! sku = "00-060.742"
//! location = "CDF2"
//! description = "LINGUICA MINEIRA 0,8KG"
//! internal_average_price = 10.78
//! external_reference_price = 23.99
//! note = "High internal variation"
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::stats::GroupAggregate;
use crate::records::GroupKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePrice {
    pub sku: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: String,
    pub internal_average_price: f64,
    pub external_reference_price: f64,
    #[serde(default)]
    pub note: String,
}

pub trait ReferencePriceProvider {
    /// All entries, in a stable order.
    fn entries(&self) -> Vec<&ReferencePrice>;
}

/// Entries are unique per `(sku, location)`; an entry without a location
/// applies to the SKU at every location.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    entries: Vec<ReferencePrice>,
    by_key: HashMap<(String, Option<String>), usize>,
}

#[derive(Deserialize)]
struct ReferenceFile {
    #[serde(default)]
    reference: Vec<ReferencePrice>,
}

impl ReferenceTable {
    /// Build a table; a later entry for the same `(sku, location)` replaces
    /// an earlier one.
    pub fn new(entries: impl IntoIterator<Item = ReferencePrice>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            let key = (entry.sku.clone(), entry.location.clone());
            match table.by_key.get(&key) {
                Some(&i) => {
                    warn!(
                        sku = %entry.sku,
                        location = entry.location.as_deref().unwrap_or("*"),
                        "duplicate reference price replaces an earlier entry"
                    );
                    table.entries[i] = entry;
                }
                None => {
                    table.by_key.insert(key, table.entries.len());
                    table.entries.push(entry);
                }
            }
        }
        table
    }


    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ReferenceFile = toml::from_str(content).context("failed to parse reference table")?;
        Ok(Self::new(file.reference))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read reference table: {}", path.display()))?;
        let table = Self::from_toml_str(&content)
            .with_context(|| format!("failed to load reference table: {}", path.display()))?;
        info!(path = %path.display(), entries = table.len(), "loaded reference prices");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReferencePriceProvider for ReferenceTable {
    fn entries(&self) -> Vec<&ReferencePrice> {
        self.entries.iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceComparison {
    pub sku: String,
    pub location: Option<String>,
    pub description: String,
    pub internal_average_price: f64,
    /// Mean unit price observed in the analysed records, if the group is present.
    pub observed_mean_price: Option<f64>,
    pub external_reference_price: f64,
    /// `internal_average_price / external_reference_price`.
    pub ratio: Option<f64>,
    pub note: String,
}

/// One comparison per provider entry. The observed mean is taken from the
/// aggregate of the matching `(sku, location)` group, or from the first
/// aggregate with that SKU when the entry has no location.
pub fn compare<P>(provider: &P, aggregates: &[GroupAggregate]) -> Vec<PriceComparison>
where
    P: ReferencePriceProvider + ?Sized,
{
    provider
        .entries()
        .into_iter()
        .map(|entry| {
            let observed = match &entry.location {
                Some(location) => {
                    let key = GroupKey::new(entry.sku.as_str(), location.as_str());
                    aggregates.iter().find(|a| a.key == key)
                }
                None => aggregates.iter().find(|a| a.key.sku == entry.sku),
            };
            let ratio = (entry.external_reference_price > 0.0)
                .then(|| entry.internal_average_price / entry.external_reference_price);

            PriceComparison {
                sku: entry.sku.clone(),
                location: entry.location.clone(),
                description: entry.description.clone(),
                internal_average_price: entry.internal_average_price,
                observed_mean_price: observed.map(|a| a.mean_price),
                external_reference_price: entry.external_reference_price,
                ratio,
                note: entry.note.clone(),
            }
        })
        .collect()
}
