//! Tuning knobs for [`crate::SaleService`]. Deserialized from the `[sales]`
//! section of the app config.

use serde::Deserialize;
use std::time::Duration;

const MAX_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SaleServiceConfig {
    /// Total attempts per operation, including the first (>= 1).
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each further retry.
    pub retry_backoff_ms: u64,

    /// Compute item tax from the product's rate when the caller omits it.
    pub derive_tax_from_catalog: bool,
}

impl Default for SaleServiceConfig {
    fn default() -> Self {
        SaleServiceConfig {
            max_attempts: 5,
            retry_backoff_ms: 25,
            derive_tax_from_catalog: false,
        }
    }
}

impl SaleServiceConfig {
    /// Backoff before retry number `attempt` (1-indexed), capped at one second.
    ///
    /// ```text
    /// attempt   1    2    3     4
    /// delay    25ms 50ms 100ms 200ms   (retry_backoff_ms = 25)
    /// ```
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor)).min(MAX_BACKOFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = SaleServiceConfig::default();
        assert_eq!(config.backoff_for(1), Duration::from_millis(25));
        assert_eq!(config.backoff_for(3), Duration::from_millis(100));
        assert_eq!(config.backoff_for(30), MAX_BACKOFF);
    }
}
