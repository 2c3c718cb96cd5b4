//! TOML configuration for priceaudit.
//!
//! Every section has defaults, so an empty file (or no file) is valid.
//! Command-line flags override whatever is loaded here.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::ranker::DEFAULT_SUSPICION_THRESHOLD;
use crate::analysis::stats::DEFAULT_OUTLIER_MULTIPLIER;
use crate::analysis::QueryParams;
use crate::detect::PriceBasis;

pub const CONFIG_ENV: &str = "PRICEAUDIT_CONFIG";
pub const LOCAL_CONFIG: &str = "priceaudit.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub threshold: ThresholdConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AuditConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try, in order:
    /// 1. the path in `PRICEAUDIT_CONFIG`;
    /// 2. `./priceaudit.toml`;
    /// 3. compiled-in defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "PRICEAUDIT_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    pub fn query_params(&self) -> QueryParams {
        QueryParams {
            suspicion_threshold: self.detection.suspicion_threshold,
            outlier_multiplier: self.detection.outlier_multiplier,
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Group statistics and suspicion scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Coefficient of variation (percent) above which a group is suspect.
    pub suspicion_threshold: f64,
    /// Tukey fence multiplier.
    pub outlier_multiplier: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            suspicion_threshold: DEFAULT_SUSPICION_THRESHOLD,
            outlier_multiplier: DEFAULT_OUTLIER_MULTIPLIER,
        }
    }
}

/// Market-price threshold rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub market_reference_price: f64,
    pub tax_rate_percent: f64,
    pub basis: PriceBasis,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            market_reference_price: 1000.0,
            tax_rate_percent: 17.0,
            basis: PriceBasis::LineTotal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Number of ranked groups shown in text reports.
    pub top: usize,
    /// Outlier transactions listed per group in text reports.
    pub outliers_per_group: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top: 10,
            outliers_per_group: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON log lines instead of human-readable ones.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
