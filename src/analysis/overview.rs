//! Dataset overview: spend per location, busiest groups, monthly price
//! trend and the distinct values available to each filter dimension.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::stats::{mean, quantile, GroupStatistics};
use crate::records::{GroupKey, TransactionRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSpend {
    pub location: String,
    pub total_spend: f64,
    pub transactions: usize,
}

/// Number of busiest groups whose monthly trend is reported.
pub const TREND_GROUPS: usize = 5;

/// Five-number summary of a group's unit prices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PriceSpread {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl PriceSpread {
    /// All zeros for an empty slice.
    pub fn of(prices: &[f64]) -> Self {
        let mut sorted = prices.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self {
            min: sorted.first().copied().unwrap_or_default(),
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted.last().copied().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupVolume {
    pub key: GroupKey,
    pub description: String,
    pub transactions: usize,
    pub spread: PriceSpread,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPrice {
    /// `YYYY-MM`
    pub month: String,
    pub mean_price: f64,
    pub transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTrend {
    pub key: GroupKey,
    pub description: String,
    pub months: Vec<MonthlyPrice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub skus: Vec<String>,
    pub locations: Vec<String>,
    pub suppliers: Vec<String>,
    pub merchandise_groups: Vec<String>,
    pub group_descriptions: Vec<String>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Total net value per location, largest first.
pub fn spend_by_location<'a, I>(records: I) -> Vec<LocationSpend>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut totals: HashMap<&str, (f64, usize)> = HashMap::new();
    for record in records {
        let entry = totals.entry(record.location()).or_insert((0.0, 0));
        entry.0 += record.net_value();
        entry.1 += 1;
    }

    let mut spend: Vec<LocationSpend> = totals
        .into_iter()
        .map(|(location, (total_spend, transactions))| LocationSpend {
            location: location.to_string(),
            total_spend,
            transactions,
        })
        .collect();
    spend.sort_by(|a, b| {
        b.total_spend
            .total_cmp(&a.total_spend)
            .then_with(|| a.location.cmp(&b.location))
    });
    spend
}

/// The `n` groups with the most transactions, each with its unit-price
/// spread; ties keep discovery order.
pub fn busiest_groups<'a, I>(records: I, n: usize) -> Vec<GroupVolume>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut volumes: Vec<GroupVolume> = GroupStatistics::partition(records)
        .into_iter()
        .map(|(key, members)| {
            let prices: Vec<f64> = members.iter().map(|r| r.unit_price()).collect();
            GroupVolume {
                description: members
                    .iter()
                    .map(|r| r.description())
                    .find(|d| !d.is_empty())
                    .unwrap_or_default()
                    .to_string(),
                transactions: members.len(),
                spread: PriceSpread::of(&prices),
                key,
            }
        })
        .collect();
    volumes.sort_by(|a, b| b.transactions.cmp(&a.transactions));
    volumes.truncate(n);
    volumes
}

/// Mean unit price per calendar month for one group. Undated records are
/// skipped.
pub fn monthly_average_price<'a, I>(records: I, key: &GroupKey) -> Vec<MonthlyPrice>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut months: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
    for record in records.into_iter().filter(|r| r.has_key(key)) {
        if let Some(date) = record.document_date() {
            months
                .entry((date.year(), date.month()))
                .or_default()
                .push(record.unit_price());
        }
    }

    months
        .into_iter()
        .map(|((year, month), prices)| MonthlyPrice {
            month: format!("{:04}-{:02}", year, month),
            mean_price: mean(&prices),
            transactions: prices.len(),
        })
        .collect()
}

/// Monthly average price of the first `n` of `groups`, in their order.
pub fn monthly_trends(records: &[TransactionRecord], groups: &[GroupVolume], n: usize) -> Vec<GroupTrend> {
    groups
        .iter()
        .take(n)
        .map(|g| GroupTrend {
            key: g.key.clone(),
            description: g.description.clone(),
            months: monthly_average_price(records, &g.key),
        })
        .collect()
}

/// Sorted distinct values per filter dimension, plus the date span.
pub fn filter_options<'a, I>(records: I) -> FilterOptions
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut skus = BTreeSet::new();
    let mut locations = BTreeSet::new();
    let mut suppliers = BTreeSet::new();
    let mut groups = BTreeSet::new();
    let mut group_descriptions = BTreeSet::new();
    let mut first_date: Option<NaiveDate> = None;
    let mut last_date: Option<NaiveDate> = None;

    for record in records {
        skus.insert(record.sku());
        locations.insert(record.location());
        if !record.supplier().is_empty() {
            suppliers.insert(record.supplier());
        }
        if let Some(g) = record.merchandise_group() {
            groups.insert(g);
        }
        if let Some(d) = record.group_description() {
            group_descriptions.insert(d);
        }
        if let Some(date) = record.document_date() {
            first_date = Some(first_date.map_or(date, |f| f.min(date)));
            last_date = Some(last_date.map_or(date, |l| l.max(date)));
        }
    }

    fn owned(set: BTreeSet<&str>) -> Vec<String> {
        set.into_iter().map(String::from).collect()
    }

    FilterOptions {
        skus: owned(skus),
        locations: owned(locations),
        suppliers: owned(suppliers),
        merchandise_groups: owned(groups),
        group_descriptions: owned(group_descriptions),
        first_date,
        last_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RawTransaction;

    fn rec(sku: &str, location: &str, net_value: f64, date: Option<(i32, u32, u32)>) -> TransactionRecord {
        TransactionRecord::new(RawTransaction {
            sku: sku.to_string(),
            location: location.to_string(),
            supplier: "ACME".to_string(),
            quantity: 1.0,
            net_value,
            document_date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_spend_by_location_sorted_desc() {
        let records = vec![
            rec("A", "CDF2", 100.0, None),
            rec("B", "CDUA", 300.0, None),
            rec("C", "CDF2", 150.0, None),
            rec("D", "CDAA", 250.0, None),
        ];
        let spend = spend_by_location(&records);
        let order: Vec<(&str, f64)> = spend.iter().map(|s| (s.location.as_str(), s.total_spend)).collect();
        assert_eq!(order, vec![("CDUA", 300.0), ("CDAA", 250.0), ("CDF2", 250.0)]);
        assert_eq!(spend[2].transactions, 2);
    }

    #[test]
    fn test_busiest_groups() {
        let records = vec![
            rec("A", "L1", 1.0, None),
            rec("B", "L1", 1.0, None),
            rec("B", "L1", 1.0, None),
            rec("C", "L1", 1.0, None),
        ];
        let top = busiest_groups(&records, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key, GroupKey::new("B", "L1"));
        assert_eq!(top[0].transactions, 2);
        // A and C tie; A was seen first
        assert_eq!(top[1].key, GroupKey::new("A", "L1"));
    }

    #[test]
    fn test_busiest_groups_carry_price_spread() {
        let records: Vec<TransactionRecord> = [40.0, 10.0, 30.0, 20.0, 50.0]
            .iter()
            .map(|&p| rec("A", "L1", p, None))
            .collect();
        let top = busiest_groups(&records, 1);
        assert_eq!(
            top[0].spread,
            PriceSpread { min: 10.0, q1: 20.0, median: 30.0, q3: 40.0, max: 50.0 }
        );

        let single = vec![rec("S", "L1", 7.0, None)];
        let spread = busiest_groups(&single, 1)[0].spread;
        assert_eq!((spread.min, spread.median, spread.max), (7.0, 7.0, 7.0));
        assert_eq!(PriceSpread::of(&[]), PriceSpread::default());
    }

    #[test]
    fn test_monthly_trends_for_leading_groups() {
        let records = vec![
            rec("A", "L1", 10.0, Some((2024, 1, 3))),
            rec("A", "L1", 30.0, Some((2024, 1, 9))),
            rec("A", "L1", 40.0, Some((2024, 2, 1))),
            rec("B", "L1", 5.0, Some((2024, 1, 1))),
            rec("C", "L1", 5.0, Some((2024, 1, 1))),
        ];
        let busiest = busiest_groups(&records, 10);
        let trends = monthly_trends(&records, &busiest, 2);
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].key, GroupKey::new("A", "L1"));
        assert_eq!(trends[0].months.len(), 2);
        assert_eq!(trends[0].months[0].mean_price, 20.0);
        assert_eq!(trends[1].key, GroupKey::new("B", "L1"));
    }

    #[test]
    fn test_monthly_average_price() {
        let records = vec![
            rec("A", "L1", 10.0, Some((2024, 2, 3))),
            rec("A", "L1", 20.0, Some((2024, 1, 9))),
            rec("A", "L1", 30.0, Some((2024, 1, 20))),
            rec("A", "L1", 99.0, None),
            rec("A", "L2", 500.0, Some((2024, 1, 5))),
        ];
        let trend = monthly_average_price(&records, &GroupKey::new("A", "L1"));
        assert_eq!(
            trend,
            vec![
                MonthlyPrice { month: "2024-01".into(), mean_price: 25.0, transactions: 2 },
                MonthlyPrice { month: "2024-02".into(), mean_price: 10.0, transactions: 1 },
            ]
        );
    }

    #[test]
    fn test_filter_options() {
        let records = vec![
            rec("B", "L2", 1.0, Some((2024, 3, 1))),
            rec("A", "L1", 1.0, Some((2023, 12, 31))),
            rec("A", "L2", 1.0, None),
        ];
        let options = filter_options(&records);
        assert_eq!(options.skus, vec!["A", "B"]);
        assert_eq!(options.locations, vec!["L1", "L2"]);
        assert_eq!(options.suppliers, vec!["ACME"]);
        assert!(options.merchandise_groups.is_empty());
        assert_eq!(options.first_date, NaiveDate::from_ymd_opt(2023, 12, 31));
        assert_eq!(options.last_date, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_empty_overview() {
        let records: Vec<TransactionRecord> = Vec::new();
        assert!(spend_by_location(&records).is_empty());
        assert!(busiest_groups(&records, 10).is_empty());
        assert_eq!(filter_options(&records), FilterOptions::default());
    }
}
