//! Per-group price statistics.
//!
//! Records are partitioned by `(sku, location)` in discovery order and each
//! group gets a fresh [`GroupAggregate`]: mean, extremes, quartiles, Tukey
//! fences and coefficient of variation of the unit price.

use std::collections::HashMap;

use serde::Serialize;

use crate::records::{GroupKey, TransactionRecord};

/// Tukey's conventional fence multiplier.
pub const DEFAULT_OUTLIER_MULTIPLIER: f64 = 1.5;

/// Whether a group had enough samples for dispersion to be observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispersionStatus {
    Tested,
    /// One record only: CV and IQR are zero by definition, not by measurement.
    SingleSample,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub key: GroupKey,
    pub description: String,
    pub count: usize,
    pub total_spend: f64,
    pub mean_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Sample standard deviation over mean, in percent.
    pub coefficient_of_variation: f64,
    pub status: DispersionStatus,
}

impl GroupAggregate {
    /// Build the aggregate for one group's unit prices. Returns `None` for an
    /// empty slice.
    pub fn from_prices(
        key: GroupKey,
        description: &str,
        prices: &[f64],
        total_spend: f64,
        multiplier: f64,
    ) -> Option<Self> {
        if prices.is_empty() {
            return None;
        }

        let mut sorted = prices.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean_price = mean(&sorted);
        let q1 = quantile(&sorted, 0.25);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;

        let (coefficient_of_variation, status) = if count < 2 {
            (0.0, DispersionStatus::SingleSample)
        } else if mean_price == 0.0 {
            (0.0, DispersionStatus::Tested)
        } else {
            (sample_std_dev(&sorted, mean_price) / mean_price * 100.0, DispersionStatus::Tested)
        };

        Some(Self {
            key,
            description: description.to_string(),
            count,
            total_spend,
            mean_price,
            min_price: sorted[0],
            max_price: sorted[count - 1],
            q1,
            q3,
            iqr,
            lower_bound: q1 - multiplier * iqr,
            upper_bound: q3 + multiplier * iqr,
            coefficient_of_variation,
            status,
        })
    }

    pub fn is_single_sample(&self) -> bool {
        self.status == DispersionStatus::SingleSample
    }
}

/// A group's aggregate together with the records it was computed from.
#[derive(Debug, Clone)]
pub struct PriceGroup<'a> {
    pub aggregate: GroupAggregate,
    pub members: Vec<&'a TransactionRecord>,
}

pub struct GroupStatistics;

impl GroupStatistics {
    /// Partition records by group key, preserving the order in which keys are
    /// first seen and the order of records within each group.
    pub fn partition<'a, I>(records: I) -> Vec<(GroupKey, Vec<&'a TransactionRecord>)>
    where
        I: IntoIterator<Item = &'a TransactionRecord>,
    {
        let mut index: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: Vec<(GroupKey, Vec<&'a TransactionRecord>)> = Vec::new();

        for record in records {
            let key = record.key();
            match index.get(&key) {
                Some(&i) => groups[i].1.push(record),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push((key, vec![record]));
                }
            }
        }
        groups
    }

    pub fn compute<'a, I>(records: I, multiplier: f64) -> Vec<PriceGroup<'a>>
    where
        I: IntoIterator<Item = &'a TransactionRecord>,
    {
        Self::partition(records)
            .into_iter()
            .filter_map(|(key, members)| {
                let prices: Vec<f64> = members.iter().map(|r| r.unit_price()).collect();
                let total_spend: f64 = members.iter().map(|r| r.net_value()).sum();
                let description = members
                    .iter()
                    .map(|r| r.description())
                    .find(|d| !d.is_empty())
                    .unwrap_or_default();
                GroupAggregate::from_prices(key, description, &prices, total_spend, multiplier)
                    .map(|aggregate| PriceGroup { aggregate, members })
            })
            .collect()
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with the n-1 denominator. Zero for fewer than two values.
pub fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let sum_sq_diff: f64 = values.iter().map(|&x| (x - mean).powi(2)).sum();
    (sum_sq_diff / (values.len() - 1) as f64).sqrt()
}

/// Quantile `p` (0..=1) of an ascending slice, by linear interpolation
/// between the order statistics around position `p * (n - 1)`.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;

    sorted[lower] * (1.0 - frac) + sorted[upper] * frac
}
