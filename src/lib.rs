//! priceaudit -- procurement price anomaly detection.
//!
//! This crate flags purchases priced above a market reference and ranks
//! SKU/location groups whose unit-price history is unstable (high coefficient
//! of variation, IQR outliers). The engine is pure and synchronous; the
//! `records::loader`, `config` and `report` modules are the shell around it.

pub mod analysis;
pub mod config;
pub mod detect;
pub mod records;
pub mod reference;
pub mod report;

pub use analysis::{
    run_query, AuditEngine, AuditError, FilterCriteria, QueryOutcome, QueryParams, RankedSuspects,
    SuspectGroup,
};
pub use detect::{Alert, PriceBasis, ThresholdRule};
pub use records::{GroupKey, RawTransaction, TransactionRecord};
