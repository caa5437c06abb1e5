use core_logic::{ConfigError, NetworkError, WalletError};
use thiserror::Error;

/// Errors raised while preparing or running a race.
///
/// Everything except `Submission` aborts the run before any transaction
/// leaves the process. `Submission` is scoped to a single dispatch unit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RaceError {
    #[error("Invalid private key: {0}")]
    InvalidKey(#[from] WalletError),

    #[error("Invalid transaction field '{field}': {reason}")]
    InvalidDescriptor { field: String, reason: String },

    #[error("Nonce resolution failed for {address} at {endpoint}: {reason}")]
    NonceResolution {
        address: String,
        endpoint: String,
        reason: String,
    },

    #[error("Submission to {endpoint} failed: {reason}")]
    Submission { endpoint: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl RaceError {
    pub fn invalid_descriptor(field: &str, reason: impl Into<String>) -> Self {
        RaceError::InvalidDescriptor {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Amount parsing reports through `ConfigError`; a bad amount is a bad descriptor.
    pub fn from_amount(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidValue { field, reason } => {
                RaceError::InvalidDescriptor { field, reason }
            }
            other => RaceError::Config(other),
        }
    }
}
