//! # Core Logic - Shared Utilities for the Racer
//!
//! Chain-agnostic pieces used by every chain implementation: typed errors,
//! runtime settings, gas policy parsing, logging setup and the ordered
//! concurrent worker runner.
//!
//! ## Modules
//!
//! - [`config`] - Runtime settings with defaults and validation
//! - [`error`] - Typed error handling with thiserror
//! - [`utils`] - Gas policy, logger and worker runner

pub mod config;
pub mod error;
pub(crate) mod utils;

pub use config::RaceSettings;
pub use error::{ConfigError, NetworkError, WalletError};

pub use utils::{
    gwei_to_wei, parse_gas_limit, parse_gwei, setup_logger, GasConfig, GasFields, WorkerExit,
    WorkerRunner, RESULT_TARGET, WEI_PER_GWEI,
};
