//! Record-level detection rules: market-price threshold and Tukey fences.

pub mod outlier;
pub mod threshold;

pub use outlier::OutlierDetector;
pub use threshold::{Alert, PriceBasis, ThresholdRule};

/// Severity levels for price alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Grade how far `actual` overshoots `ceiling`, as a fraction of the ceiling.
    pub(crate) fn from_overshoot(actual: f64, ceiling: f64) -> Self {
        if ceiling <= 0.0 {
            return Severity::Critical;
        }
        let overshoot = (actual - ceiling) / ceiling;
        if overshoot > 0.5 {
            Severity::Critical
        } else if overshoot > 0.2 {
            Severity::Warning
        } else {
            Severity::Info
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Critical => write!(f, "CRIT"),
        }
    }
}
