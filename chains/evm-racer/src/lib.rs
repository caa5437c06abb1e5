//! EVM Racer - broadcast signed transfers to many JSON-RPC nodes and time them
//!
//! Builds one or more signed legacy transactions, submits them concurrently
//! to a set of endpoints and follows every submission until the endpoint
//! returns a receipt or an error, with microsecond timestamps at each step.
//!
//! # Architecture
//!
//! - **[`PlanBuilder`]**: turns a [`Scenario`] into a [`DispatchPlan`]
//!   (nonces resolved, payloads signed, endpoints paired)
//! - **[`sign`]**: pure, deterministic EIP-155 signing
//! - **[`NonceResolver`]**: one `eth_getTransactionCount` per (account, endpoint)
//! - **[`GasResolver`]**: `<gasLimit> <gasPrice>` parsing, `auto` via `eth_gasPrice`
//! - **[`Broadcaster`]**: submit, hash acknowledgement, receipt polling for one unit
//! - **[`RaceCoordinator`]**: all units at once, outcomes joined in plan order
//! - **[`report`]**: line formatting and the final [`RaceReport`]
//!
//! # Example
//!
//! ```rust,no_run
//! use evm_racer::{
//!     Broadcaster, Endpoint, GasResolver, Leg, NodeConnector, NonceResolver, PlanBuilder,
//!     PrivateKey, RaceCoordinator, Scenario, Transfer,
//! };
//! use core_logic::{GasFields, RaceSettings, WorkerRunner};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = RaceSettings::default();
//! let connector = Arc::new(NodeConnector::new(&settings)?);
//!
//! let endpoint = Endpoint::parse("http://127.0.0.1:8545")?;
//! let scenario = Scenario::Single(Leg {
//!     key: PrivateKey::from_hex("0x...")?,
//!     transfer: Transfer {
//!         recipient: "0x1fed25aa5311d770f29e22870cdb9e715052fea7".parse()?,
//!         value: 1u64.into(),
//!         gas: GasResolver::fixed(GasFields::MAIN, "21000", "1")?,
//!     },
//!     endpoint,
//! });
//!
//! let plan = PlanBuilder::new(NonceResolver::new(connector.clone()), Some(1))
//!     .build(&scenario)
//!     .await?;
//! let broadcaster = Broadcaster::new(connector, settings.receipt_poll_interval());
//! let outcomes = RaceCoordinator::new(Arc::new(broadcaster), WorkerRunner::default())
//!     .run(plan)
//!     .await;
//! # Ok(())
//! # }
//! ```
//!
//! # Safety
//!
//! - Private keys are zeroized on drop and never logged
//! - Payloads sharing a nonce are sent as-is; nothing arbitrates between them

pub mod broadcaster;
pub mod cli;
pub mod config;
pub mod error;
pub mod plan;
pub mod race;
pub mod report;
pub mod signer;
pub mod types;
pub mod utils;

pub use broadcaster::Broadcaster;
pub use cli::{Cli, Command};
pub use error::RaceError;
pub use plan::{Leg, PayloadMode, PlanBuilder, Scenario, Transfer};
pub use race::RaceCoordinator;
pub use report::RaceReport;
pub use signer::{address_of, sign, PrivateKey};
pub use types::{
    DispatchPlan, DispatchUnit, Endpoint, Label, OutcomeStatus, SignedPayload,
    SubmissionOutcome, TransactionDescriptor, SIDE_LEG_LABEL,
};
pub use utils::{
    Connector, EndpointClient, EthersClient, GasOracle, GasParams, GasResolver, NodeConnector,
    NonceResolver,
};
