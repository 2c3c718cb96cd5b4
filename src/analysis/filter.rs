//! Multi-attribute filtering over purchase records.
//!
//! Dimensions combine with AND; values inside one dimension combine with OR.
//! An empty dimension imposes no restriction. Each dimension is an
//! independent per-record predicate, so the result does not depend on the
//! order in which dimensions are checked.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::records::{GroupKey, TransactionRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub skus: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    pub suppliers: BTreeSet<String>,
    pub merchandise_groups: BTreeSet<String>,
    pub group_descriptions: BTreeSet<String>,
    /// Inclusive lower date bound.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper date bound.
    pub date_to: Option<NaiveDate>,
    pub suspects_only: bool,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skus<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skus.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn locations<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn suppliers<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suppliers.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn merchandise_groups<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.merchandise_groups.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn group_descriptions<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_descriptions.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn suspects_only(mut self, enabled: bool) -> Self {
        self.suspects_only = enabled;
        self
    }

    /// True when no dimension constrains anything.
    pub fn is_unrestricted(&self) -> bool {
        *self == Self::default()
    }
}

fn allows(allowed: &BTreeSet<String>, value: Option<&str>) -> bool {
    allowed.is_empty() || value.is_some_and(|v| allowed.contains(v))
}

pub struct FilterComposer<'c> {
    criteria: &'c FilterCriteria,
    suspects: Option<&'c HashSet<GroupKey>>,
}

impl<'c> FilterComposer<'c> {
    /// `suspects` is the suspect set of the *full* population; it is only
    /// consulted when `criteria.suspects_only` is set.
    pub fn new(criteria: &'c FilterCriteria, suspects: Option<&'c HashSet<GroupKey>>) -> Self {
        if criteria.suspects_only && suspects.is_none() {
            warn!("suspects-only filter requested without a suspect set; no record will match");
        }
        Self { criteria, suspects }
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        let c = self.criteria;
        allows(&c.skus, Some(record.sku()))
            && allows(&c.locations, Some(record.location()))
            && allows(&c.suppliers, Some(record.supplier()))
            && allows(&c.merchandise_groups, record.merchandise_group())
            && allows(&c.group_descriptions, record.group_description())
            && self.within_dates(record)
            && self.is_admitted_suspect(record)
    }

    fn within_dates(&self, record: &TransactionRecord) -> bool {
        let (from, to) = (self.criteria.date_from, self.criteria.date_to);
        if from.is_none() && to.is_none() {
            return true;
        }
        // undated records cannot satisfy a date range
        match record.document_date() {
            Some(date) => from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t),
            None => false,
        }
    }

    fn is_admitted_suspect(&self, record: &TransactionRecord) -> bool {
        if !self.criteria.suspects_only {
            return true;
        }
        self.suspects
            .is_some_and(|set| set.contains(&record.key()))
    }

    /// Keep the matching records, in input order.
    pub fn apply<'a, I>(&self, records: I) -> Vec<&'a TransactionRecord>
    where
        I: IntoIterator<Item = &'a TransactionRecord>,
    {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RawTransaction;

    fn rec(sku: &str, location: &str, supplier: &str, group: Option<&str>, date: Option<(i32, u32, u32)>) -> TransactionRecord {
        TransactionRecord::new(RawTransaction {
            sku: sku.to_string(),
            location: location.to_string(),
            supplier: supplier.to_string(),
            quantity: 1.0,
            net_value: 10.0,
            merchandise_group: group.map(String::from),
            document_date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            ..Default::default()
        })
        .unwrap()
    }

    fn dataset() -> Vec<TransactionRecord> {
        vec![
            rec("A", "CDF2", "ACME", Some("F01"), Some((2024, 1, 1))),
            rec("B", "CDUA", "ACME", Some("F02"), Some((2024, 1, 15))),
            rec("A", "CDUA", "FRIGO", None, Some((2024, 1, 31))),
            rec("C", "CDF2", "FRIGO", Some("F01"), None),
            rec("B", "CDF2", "AVES", Some("F02"), Some((2024, 2, 1))),
        ]
    }

    fn skus(records: &[&TransactionRecord]) -> Vec<String> {
        records.iter().map(|r| format!("{}@{}", r.sku(), r.location())).collect()
    }

    #[test]
    fn test_unrestricted_keeps_everything() {
        let data = dataset();
        let criteria = FilterCriteria::new();
        assert!(criteria.is_unrestricted());
        assert_eq!(FilterComposer::new(&criteria, None).apply(&data).len(), data.len());
    }

    #[test]
    fn test_or_within_dimension_and_across() {
        let data = dataset();
        let criteria = FilterCriteria::new().skus(["A", "B"]).locations(["CDUA"]);
        let out = FilterComposer::new(&criteria, None).apply(&data);
        assert_eq!(skus(&out), vec!["B@CDUA", "A@CDUA"]);
    }

    #[test]
    fn test_optional_dimension_excludes_missing_values() {
        let data = dataset();
        let criteria = FilterCriteria::new().merchandise_groups(["F01"]);
        let out = FilterComposer::new(&criteria, None).apply(&data);
        assert_eq!(skus(&out), vec!["A@CDF2", "C@CDF2"]);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let data = dataset();
        let criteria = FilterCriteria::new().date_range(
            NaiveDate::from_ymd_opt(2024, 1, 1),
            NaiveDate::from_ymd_opt(2024, 1, 31),
        );
        let out = FilterComposer::new(&criteria, None).apply(&data);
        // undated C is excluded, Feb 1 is outside
        assert_eq!(skus(&out), vec!["A@CDF2", "B@CDUA", "A@CDUA"]);
    }

    #[test]
    fn test_open_ended_date_range() {
        let data = dataset();
        let criteria = FilterCriteria::new().date_range(NaiveDate::from_ymd_opt(2024, 1, 31), None);
        let out = FilterComposer::new(&criteria, None).apply(&data);
        assert_eq!(skus(&out), vec!["A@CDUA", "B@CDF2"]);
    }

    #[test]
    fn test_suspects_only_uses_supplied_set() {
        let data = dataset();
        let suspects: HashSet<GroupKey> = [GroupKey::new("B", "CDF2")].into_iter().collect();
        let criteria = FilterCriteria::new().suspects_only(true);
        let out = FilterComposer::new(&criteria, Some(&suspects)).apply(&data);
        assert_eq!(skus(&out), vec!["B@CDF2"]);

        // without a set nothing is admitted
        assert!(FilterComposer::new(&criteria, None).apply(&data).is_empty());
    }

    #[test]
    fn test_filters_commute() {
        let data = dataset();
        let by_supplier = FilterCriteria::new().suppliers(["ACME", "FRIGO"]);
        let by_location = FilterCriteria::new().locations(["CDF2"]);
        let combined = FilterCriteria::new().suppliers(["ACME", "FRIGO"]).locations(["CDF2"]);

        let supplier_first = FilterComposer::new(&by_location, None)
            .apply(FilterComposer::new(&by_supplier, None).apply(&data));
        let location_first = FilterComposer::new(&by_supplier, None)
            .apply(FilterComposer::new(&by_location, None).apply(&data));
        let at_once = FilterComposer::new(&combined, None).apply(&data);

        assert_eq!(supplier_first, location_first);
        assert_eq!(supplier_first, at_once);
        assert_eq!(skus(&at_once), vec!["A@CDF2", "C@CDF2"]);
    }

    #[test]
    fn test_empty_input() {
        let data: Vec<TransactionRecord> = Vec::new();
        let criteria = FilterCriteria::new().skus(["A"]);
        assert!(FilterComposer::new(&criteria, None).apply(&data).is_empty());
    }
}
