//! # Core Error Types
//!
//! Error definitions shared by every chain implementation.
//! Chain crates wrap these in their own error enums.

use thiserror::Error;

/// Settings and argument errors. Raised before any network traffic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid RPC URL format: '{url}'")]
    InvalidRpcUrl { url: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to load settings from {source_name}: {msg}")]
    LoadFailed { source_name: String, msg: String },
}

/// Private key errors. Keys are only ever held in memory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Invalid private key format: expected hex string")]
    InvalidKeyFormat,

    #[error("Private key has wrong length: expected 32 bytes, got {length}")]
    InvalidKeyLength { length: usize },

    #[error("Private key is not a valid secp256k1 secret")]
    InvalidSecret,
}

/// Failures of a single JSON-RPC call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The request never got a JSON-RPC answer (refused, timed out, bad HTTP status).
    #[error("Connection to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error from {endpoint}: {message}")]
    Rpc { endpoint: String, message: String },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl NetworkError {
    /// Endpoint the failed call was addressed to.
    pub fn endpoint(&self) -> &str {
        match self {
            NetworkError::Transport { endpoint, .. }
            | NetworkError::Rpc { endpoint, .. }
            | NetworkError::InvalidResponse { endpoint, .. } => endpoint,
        }
    }

    /// Short description without the endpoint prefix.
    pub fn reason(&self) -> String {
        match self {
            NetworkError::Transport { reason, .. } => reason.clone(),
            NetworkError::Rpc { message, .. } => message.clone(),
            NetworkError::InvalidResponse { reason, .. } => reason.clone(),
        }
    }
}
