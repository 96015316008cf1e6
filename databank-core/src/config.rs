//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Frontend configuration.
///
/// Defaults describe a self-cleaning cache whose entries never expire
/// unless the caller sets a lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabankConfig {
    /// Hot databanks do not expire entries lazily on read; the caller is
    /// responsible for running `review`/`cleanup`.
    pub hot: bool,
    /// Lifetime of newly created entries. Zero means entries never expire.
    pub lifetime: Duration,
    /// Report driver errors through `tracing` instead of discarding them.
    pub report_errors: bool,
}

impl Default for DatabankConfig {
    fn default() -> Self {
        Self {
            hot: false,
            lifetime: Duration::ZERO,
            report_errors: true,
        }
    }
}

impl DatabankConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable lazy expiration on read.
    pub fn with_hot(mut self, hot: bool) -> Self {
        self.hot = hot;
        self
    }

    /// Set the default entry lifetime.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_report_errors(mut self, report: bool) -> Self {
        self.report_errors = report;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatabankConfig::default();
        assert!(!config.hot);
        assert_eq!(config.lifetime, Duration::ZERO);
        assert!(config.report_errors);
    }

    #[test]
    fn test_builder() {
        let config = DatabankConfig::new()
            .with_hot(true)
            .with_lifetime(Duration::from_millis(250))
            .with_report_errors(false);

        assert!(config.hot);
        assert_eq!(config.lifetime, Duration::from_millis(250));
        assert!(!config.report_errors);
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: DatabankConfig =
            serde_json::from_str(r#"{"hot": true}"#).expect("deserialize config");
        assert!(config.hot);
        assert_eq!(config.lifetime, Duration::ZERO);
        assert!(config.report_errors);
    }
}
