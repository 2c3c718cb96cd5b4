//! Tukey-fence outlier test on unit price.

use crate::analysis::stats::GroupAggregate;
use crate::records::TransactionRecord;

/// Flags records whose unit price falls outside their group's fences.
///
/// Fences are only meaningful within one `(sku, location)` group; records
/// belonging to another group are never flagged.
pub struct OutlierDetector;

impl OutlierDetector {
    pub fn is_outlier(aggregate: &GroupAggregate, unit_price: f64) -> bool {
        unit_price < aggregate.lower_bound || unit_price > aggregate.upper_bound
    }

    /// Return the outlier members of a group, in their original order.
    pub fn detect<'a>(
        aggregate: &GroupAggregate,
        members: &[&'a TransactionRecord],
    ) -> Vec<&'a TransactionRecord> {
        members
            .iter()
            .copied()
            .filter(|r| r.has_key(&aggregate.key))
            .filter(|r| Self::is_outlier(aggregate, r.unit_price()))
            .collect()
    }
}
