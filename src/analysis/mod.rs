//! Group-level price analysis: statistics, filtering, suspicion ranking and
//! the query entry point tying them together.

pub mod filter;
pub mod overview;
pub mod ranker;
pub mod runner;
pub mod stats;

pub use filter::{FilterComposer, FilterCriteria};
pub use ranker::{RankedSuspects, SuspectGroup, SuspicionRanker, SuspicionReason};
pub use runner::{run_query, AuditEngine, QueryOutcome, QueryParams};
pub use stats::{DispersionStatus, GroupAggregate, GroupStatistics, PriceGroup};

use thiserror::Error;

use crate::records::{BatchError, RecordError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuditError {
    #[error("record {index} rejected: {reason}")]
    InvalidRecord { index: usize, reason: RecordError },

    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

impl From<BatchError> for AuditError {
    fn from(e: BatchError) -> Self {
        AuditError::InvalidRecord {
            index: e.index,
            reason: e.reason,
        }
    }
}
