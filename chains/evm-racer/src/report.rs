//! # Timing Reporter
//!
//! Pure formatting: the broadcaster and coordinator decide when a line is
//! emitted, this module decides what it says. Latencies are microseconds
//! measured from the moment the unit was handed to its endpoint.

use crate::types::{DispatchUnit, OutcomeStatus, SubmissionOutcome};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Exit code when the plan could not be built and nothing was sent.
pub const EXIT_PLAN_FAILED: i32 = 2;

const BANNER_TIME_FORMAT: &str = "%b-%d-%Y %I:%M:%S %p";

pub fn format_banner(scenario: &str, units: usize, at: DateTime<Utc>) -> String {
    format!(
        "🚀 {} | {} unit(s) | start UTC:{}",
        scenario,
        units,
        at.format(BANNER_TIME_FORMAT)
    )
}

/// Per-send banner, emitted right before the raw transaction goes out.
pub fn format_submit(unit: &DispatchUnit) -> String {
    let descriptor = unit.payload.descriptor();
    format!(
        "[{}] ➡️  {} | from {:?} nonce {} value {} | {:?}",
        unit.label,
        unit.endpoint,
        descriptor.sender,
        descriptor.nonce,
        descriptor.value,
        unit.payload.tx_hash()
    )
}

pub fn format_hash_seen(outcome: &SubmissionOutcome) -> String {
    format!(
        "[{}] 📨 {} | hash {:?} | +{}µs",
        outcome.label,
        outcome.endpoint,
        outcome.tx_hash,
        latency(outcome.hash_latency_us())
    )
}

pub fn format_receipt(outcome: &SubmissionOutcome) -> String {
    format!(
        "[{}] ✅ {} {} | block {} | hash {:?} | +{}µs",
        outcome.label,
        outcome.status(),
        outcome.endpoint,
        outcome
            .block_number
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string()),
        outcome.tx_hash,
        latency(outcome.receipt_latency_us())
    )
}

pub fn format_error(outcome: &SubmissionOutcome) -> String {
    format!(
        "[{}] ❌ {} {} | {}",
        outcome.label,
        outcome.status(),
        outcome.endpoint,
        outcome.error.as_deref().unwrap_or("unknown error")
    )
}

fn latency(us: Option<i64>) -> String {
    us.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitRow {
    pub label: String,
    pub endpoint: String,
    pub tx_hash: String,
    pub status: OutcomeStatus,
    pub submitted_at: String,
    pub hash_latency_us: Option<i64>,
    pub receipt_latency_us: Option<i64>,
    pub block_number: Option<u64>,
    pub error: Option<String>,
}

impl From<&SubmissionOutcome> for UnitRow {
    fn from(outcome: &SubmissionOutcome) -> Self {
        Self {
            label: outcome.label.to_string(),
            endpoint: outcome.endpoint.to_string(),
            tx_hash: format!("{:?}", outcome.tx_hash),
            status: outcome.status(),
            submitted_at: timestamp(outcome.submitted_at),
            hash_latency_us: outcome.hash_latency_us(),
            receipt_latency_us: outcome.receipt_latency_us(),
            block_number: outcome.block_number,
            error: outcome.error.clone(),
        }
    }
}

/// Final per-run report, printed as a summary or as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceReport {
    pub scenario: String,
    pub started_at: String,
    pub units: Vec<UnitRow>,
    pub confirmed: usize,
    pub failed: usize,
    pub pending: usize,
}

impl RaceReport {
    pub fn new(scenario: &str, started_at: DateTime<Utc>, outcomes: &[SubmissionOutcome]) -> Self {
        let units: Vec<UnitRow> = outcomes.iter().map(UnitRow::from).collect();
        let count = |status: OutcomeStatus| units.iter().filter(|u| u.status == status).count();

        Self {
            scenario: scenario.to_string(),
            started_at: timestamp(started_at),
            confirmed: count(OutcomeStatus::Confirmed),
            failed: count(OutcomeStatus::Failed),
            pending: count(OutcomeStatus::Pending),
            units,
        }
    }

    pub fn all_confirmed(&self) -> bool {
        self.failed == 0 && self.pending == 0
    }

    /// 0 when every unit confirmed, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.all_confirmed() {
            0
        } else {
            1
        }
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.units.len() + 2);
        lines.push(format!(
            "📊 {} finished: {} SUCCESS, {} FAILED, {} PENDING",
            self.scenario, self.confirmed, self.failed, self.pending
        ));
        for row in &self.units {
            let detail = match row.status {
                OutcomeStatus::Confirmed => format!(
                    "block {} +{}µs",
                    row.block_number
                        .map(|b| b.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    latency(row.receipt_latency_us)
                ),
                OutcomeStatus::Failed => row.error.clone().unwrap_or_default(),
                OutcomeStatus::Pending => "no receipt".to_string(),
            };
            lines.push(format!(
                "   [{}] {} {} | {}",
                row.label, row.status, row.endpoint, detail
            ));
        }
        lines
    }
}
