//! Suspicion scoring and ranking of price groups.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::stats::GroupAggregate;
use crate::records::{GroupKey, TransactionRecord};

/// Default CV (percent) above which a group counts as unstable.
pub const DEFAULT_SUSPICION_THRESHOLD: f64 = 30.0;

/// Why a group was flagged for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspicionReason {
    IqrOutliers,
    HighDispersion,
    OutliersAndHighDispersion,
}

impl fmt::Display for SuspicionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspicionReason::IqrOutliers => write!(f, "IQR outliers"),
            SuspicionReason::HighDispersion => write!(f, "High price variation (CV)"),
            SuspicionReason::OutliersAndHighDispersion => {
                write!(f, "IQR outliers + high price variation (CV)")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuspectGroup<'a> {
    #[serde(flatten)]
    pub aggregate: GroupAggregate,
    pub outlier_count: usize,
    pub suspicion_reason: SuspicionReason,
    pub outliers: Vec<&'a TransactionRecord>,
}

/// Suspect groups ordered by `(outlier_count, coefficient_of_variation)`,
/// highest first.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RankedSuspects<'a> {
    groups: Vec<SuspectGroup<'a>>,
}

impl<'a> RankedSuspects<'a> {
    /// The first `n` ranked groups (fewer if not that many exist).
    pub fn top(&self, n: usize) -> &[SuspectGroup<'a>] {
        &self.groups[..n.min(self.groups.len())]
    }

    pub fn all(&self) -> &[SuspectGroup<'a>] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SuspectGroup<'a>> {
        self.groups.iter()
    }

    pub fn keys(&self) -> HashSet<GroupKey> {
        self.groups.iter().map(|g| g.aggregate.key.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SuspicionRanker {
    threshold: f64,
}

impl Default for SuspicionRanker {
    fn default() -> Self {
        Self::new(DEFAULT_SUSPICION_THRESHOLD)
    }
}

impl SuspicionRanker {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify one group, or `None` if it is not suspect. Single-sample
    /// groups are never suspect: they were not tested for dispersion.
    pub fn classify(&self, aggregate: &GroupAggregate, outlier_count: usize) -> Option<SuspicionReason> {
        let unstable =
            !aggregate.is_single_sample() && aggregate.coefficient_of_variation > self.threshold;
        match (outlier_count > 0, unstable) {
            (true, true) => Some(SuspicionReason::OutliersAndHighDispersion),
            (true, false) => Some(SuspicionReason::IqrOutliers),
            (false, true) => Some(SuspicionReason::HighDispersion),
            (false, false) => None,
        }
    }

    /// Keep the suspect groups and rank them. Groups must be supplied in
    /// discovery order; equal keys keep that order.
    pub fn rank<'a, I>(&self, groups: I) -> RankedSuspects<'a>
    where
        I: IntoIterator<Item = (GroupAggregate, Vec<&'a TransactionRecord>)>,
    {
        let mut suspects: Vec<SuspectGroup<'a>> = groups
            .into_iter()
            .filter_map(|(aggregate, outliers)| {
                let outlier_count = outliers.len();
                self.classify(&aggregate, outlier_count)
                    .map(|suspicion_reason| SuspectGroup {
                        aggregate,
                        outlier_count,
                        suspicion_reason,
                        outliers,
                    })
            })
            .collect();

        // sort_by is stable
        suspects.sort_by(|a, b| {
            b.outlier_count.cmp(&a.outlier_count).then_with(|| {
                b.aggregate
                    .coefficient_of_variation
                    .total_cmp(&a.aggregate.coefficient_of_variation)
            })
        });

        RankedSuspects { groups: suspects }
    }
}
