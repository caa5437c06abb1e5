//! Data model shared by the plan builder, broadcaster and reporter.

use chrono::{DateTime, Utc};
use core_logic::ConfigError;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Label given to the independent leg of the `...Plus` scenarios.
pub const SIDE_LEG_LABEL: &str = "XXX";

/// An RPC target over http(s) or ws(s). Holds no connection state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    raw: String,
    url: Url,
}

impl Endpoint {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let raw = input.trim();
        let url = Url::parse(raw).map_err(|_| ConfigError::InvalidRpcUrl {
            url: input.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" | "ws" | "wss" => Ok(Self {
                raw: raw.to_string(),
                url,
            }),
            _ => Err(ConfigError::InvalidRpcUrl {
                url: input.to_string(),
            }),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_websocket(&self) -> bool {
        matches!(self.url.scheme(), "ws" | "wss")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The logical transaction before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDescriptor {
    pub sender: Address,
    pub recipient: Address,
    pub value: U256,
    pub nonce: U256,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub chain_id: u64,
}

impl TransactionDescriptor {
    /// Legacy (type 0) request carrying every field of the descriptor.
    pub fn to_typed_transaction(&self) -> TypedTransaction {
        TransactionRequest::new()
            .from(self.sender)
            .to(self.recipient)
            .value(self.value)
            .nonce(self.nonce)
            .gas(self.gas_limit)
            .gas_price(self.gas_price)
            .chain_id(self.chain_id)
            .into()
    }
}

/// Signed, RLP-encoded transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    raw: Bytes,
    descriptor: TransactionDescriptor,
    tx_hash: H256,
}

impl SignedPayload {
    pub(crate) fn new(raw: Bytes, descriptor: TransactionDescriptor, tx_hash: H256) -> Self {
        Self {
            raw,
            descriptor,
            tx_hash,
        }
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn descriptor(&self) -> &TransactionDescriptor {
        &self.descriptor
    }

    pub fn tx_hash(&self) -> H256 {
        self.tx_hash
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// 1-based position in the main race.
    Index(usize),
    Named(String),
}

impl Label {
    pub fn side_leg() -> Self {
        Label::Named(SIDE_LEG_LABEL.to_string())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Index(i) => write!(f, "{}", i),
            Label::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchUnit {
    pub payload: Arc<SignedPayload>,
    pub endpoint: Endpoint,
    pub label: Label,
}

/// Ordered units of concurrent work. Order fixes labels and result order only.
#[derive(Debug, Clone, Default)]
pub struct DispatchPlan {
    units: Vec<DispatchUnit>,
}

impl DispatchPlan {
    pub fn new(units: Vec<DispatchUnit>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &[DispatchUnit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<DispatchUnit> {
        self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Pending,
    Confirmed,
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Pending => f.write_str("PENDING"),
            OutcomeStatus::Confirmed => f.write_str("SUCCESS"),
            OutcomeStatus::Failed => f.write_str("FAILED"),
        }
    }
}

/// Lifecycle record of one dispatch unit.
///
/// Starts pending; the first of `record_receipt` / `record_error` freezes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub label: Label,
    pub endpoint: Endpoint,
    pub tx_hash: H256,
    pub submitted_at: DateTime<Utc>,
    pub hash_seen_at: Option<DateTime<Utc>>,
    pub receipt_at: Option<DateTime<Utc>>,
    pub block_number: Option<u64>,
    pub error: Option<String>,
}

impl SubmissionOutcome {
    pub fn started(unit: &DispatchUnit) -> Self {
        Self {
            label: unit.label.clone(),
            endpoint: unit.endpoint.clone(),
            tx_hash: unit.payload.tx_hash(),
            submitted_at: Utc::now(),
            hash_seen_at: None,
            receipt_at: None,
            block_number: None,
            error: None,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        if self.error.is_some() {
            OutcomeStatus::Failed
        } else if self.receipt_at.is_some() {
            OutcomeStatus::Confirmed
        } else {
            OutcomeStatus::Pending
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status() != OutcomeStatus::Pending
    }

    pub fn mark_submitted(&mut self, at: DateTime<Utc>) {
        if !self.is_terminal() {
            self.submitted_at = at;
        }
    }

    pub fn record_hash_seen(&mut self, at: DateTime<Utc>) {
        if !self.is_terminal() && self.hash_seen_at.is_none() {
            self.hash_seen_at = Some(at);
        }
    }

    pub fn record_receipt(&mut self, at: DateTime<Utc>, block_number: u64) {
        if !self.is_terminal() {
            self.receipt_at = Some(at);
            self.block_number = Some(block_number);
        }
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        if !self.is_terminal() {
            self.error = Some(message.into());
        }
    }

    /// Microseconds from submission until the endpoint acknowledged the hash.
    pub fn hash_latency_us(&self) -> Option<i64> {
        self.hash_seen_at
            .and_then(|at| (at - self.submitted_at).num_microseconds())
    }

    /// Microseconds from submission until the receipt was observed.
    pub fn receipt_latency_us(&self) -> Option<i64> {
        self.receipt_at
            .and_then(|at| (at - self.submitted_at).num_microseconds())
    }
}
