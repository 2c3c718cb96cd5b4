//! Query entry point: validate parameters, filter, then group, detect and
//! rank on whatever survives the filters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::filter::{FilterComposer, FilterCriteria};
use super::ranker::{RankedSuspects, SuspicionRanker, DEFAULT_SUSPICION_THRESHOLD};
use super::stats::{GroupStatistics, DEFAULT_OUTLIER_MULTIPLIER};
use super::AuditError;
use crate::detect::OutlierDetector;
use crate::records::{validate_batch, GroupKey, RawTransaction, TransactionRecord};

/// Tunables for one query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    /// CV (percent) above which a group is flagged as unstable.
    pub suspicion_threshold: f64,
    /// Tukey fence multiplier `k` in `q1 - k*iqr` / `q3 + k*iqr`.
    pub outlier_multiplier: f64,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            suspicion_threshold: DEFAULT_SUSPICION_THRESHOLD,
            outlier_multiplier: DEFAULT_OUTLIER_MULTIPLIER,
        }
    }
}

impl QueryParams {
    pub fn validate(&self) -> Result<(), AuditError> {
        if !self.suspicion_threshold.is_finite() || self.suspicion_threshold < 0.0 {
            return Err(AuditError::InvalidParameter {
                name: "suspicion_threshold",
                value: self.suspicion_threshold,
            });
        }
        if !self.outlier_multiplier.is_finite() || self.outlier_multiplier < 0.0 {
            return Err(AuditError::InvalidParameter {
                name: "outlier_multiplier",
                value: self.outlier_multiplier,
            });
        }
        Ok(())
    }
}

/// Filtered records plus the ranked suspect groups computed over them.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome<'a> {
    pub records: Vec<&'a TransactionRecord>,
    pub suspects: RankedSuspects<'a>,
    /// Groups with a single purchase, in discovery order. They were not
    /// tested for dispersion and are therefore absent from `suspects`.
    pub single_sample: Vec<GroupKey>,
}

/// Stateless audit engine. Holds only validated parameters, so one instance
/// can serve any number of independent queries.
#[derive(Debug, Clone, Copy)]
pub struct AuditEngine {
    params: QueryParams,
}

impl AuditEngine {
    pub fn new(params: QueryParams) -> Result<Self, AuditError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> QueryParams {
        self.params
    }

    /// Validate a batch of raw rows. Any invalid row rejects the batch.
    pub fn ingest(rows: Vec<RawTransaction>) -> Result<Vec<TransactionRecord>, AuditError> {
        Ok(validate_batch(rows)?)
    }

    /// Group, detect outliers and rank the given records.
    pub fn rank<'a, I>(&self, records: I) -> RankedSuspects<'a>
    where
        I: IntoIterator<Item = &'a TransactionRecord>,
    {
        self.score(records).0
    }

    /// Ranked suspects plus the keys of the single-sample groups seen on the way.
    fn score<'a, I>(&self, records: I) -> (RankedSuspects<'a>, Vec<GroupKey>)
    where
        I: IntoIterator<Item = &'a TransactionRecord>,
    {
        let groups = GroupStatistics::compute(records, self.params.outlier_multiplier);
        let group_count = groups.len();
        let single_sample: Vec<GroupKey> = groups
            .iter()
            .filter(|g| g.aggregate.is_single_sample())
            .map(|g| g.aggregate.key.clone())
            .collect();

        let scored = groups.into_iter().map(|group| {
            let outliers = OutlierDetector::detect(&group.aggregate, &group.members);
            (group.aggregate, outliers)
        });
        let ranked = SuspicionRanker::new(self.params.suspicion_threshold).rank(scored);

        debug!(
            groups = group_count,
            suspects = ranked.len(),
            single_sample = single_sample.len(),
            "ranked price groups"
        );
        (ranked, single_sample)
    }

    /// Run one query: filter, then compute statistics and rank on what is
    /// left. The suspects-only filter is judged against the full population.
    pub fn run<'a>(
        &self,
        records: &'a [TransactionRecord],
        criteria: Option<&FilterCriteria>,
    ) -> QueryOutcome<'a> {
        let filtered: Vec<&'a TransactionRecord> = match criteria {
            None => records.iter().collect(),
            Some(criteria) if criteria.is_unrestricted() => records.iter().collect(),
            Some(criteria) if criteria.suspects_only => {
                let suspect_keys = self.rank(records).keys();
                FilterComposer::new(criteria, Some(&suspect_keys)).apply(records)
            }
            Some(criteria) => FilterComposer::new(criteria, None).apply(records),
        };
        debug!(input = records.len(), kept = filtered.len(), "applied filters");

        let (suspects, single_sample) = self.score(filtered.iter().copied());
        QueryOutcome {
            records: filtered,
            suspects,
            single_sample,
        }
    }
}

/// Single-call form of the query boundary.
pub fn run_query<'a>(
    records: &'a [TransactionRecord],
    criteria: Option<&FilterCriteria>,
    suspicion_threshold: f64,
    outlier_multiplier: f64,
) -> Result<QueryOutcome<'a>, AuditError> {
    let engine = AuditEngine::new(QueryParams {
        suspicion_threshold,
        outlier_multiplier,
    })?;
    Ok(engine.run(records, criteria))
}
