//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod gas;
pub(crate) mod logger;
pub(crate) mod runner;

// Selective exports - only public utilities
pub use gas::{gwei_to_wei, parse_gas_limit, parse_gwei, GasConfig, GasFields, WEI_PER_GWEI};
pub use logger::{setup_logger, RESULT_TARGET};
pub use runner::{WorkerExit, WorkerRunner};
