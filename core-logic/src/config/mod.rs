use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_RECEIPT_POLL_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FALLBACK_GAS_PRICE_GWEI: u64 = 5;

/// Runtime settings for a broadcast race.
///
/// Every field has a default so an empty settings file (or none at all)
/// yields a usable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceSettings {
    /// Chain id used for EIP-155 signing. Fetched from the node when unset.
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Wait for receipts forever when unset.
    #[serde(default)]
    pub deadline_secs: Option<u64>,
    #[serde(default = "default_fallback_gas_price_gwei")]
    pub fallback_gas_price_gwei: u64,
}

fn default_receipt_poll_ms() -> u64 {
    DEFAULT_RECEIPT_POLL_MS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_fallback_gas_price_gwei() -> u64 {
    DEFAULT_FALLBACK_GAS_PRICE_GWEI
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            chain_id: None,
            receipt_poll_ms: DEFAULT_RECEIPT_POLL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            deadline_secs: None,
            fallback_gas_price_gwei: DEFAULT_FALLBACK_GAS_PRICE_GWEI,
        }
    }
}

impl RaceSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.receipt_poll_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "receipt_poll_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.chain_id == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "chain_id".to_string(),
                reason: "chain id 0 is not signable".to_string(),
            });
        }
        if self.deadline_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "deadline_secs".to_string(),
                reason: "omit the deadline instead of setting it to zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}
