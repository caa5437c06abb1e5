use crate::error::RaceError;
use crate::report;
use crate::types::{DispatchUnit, SubmissionOutcome};
use crate::utils::Connector;
use chrono::Utc;
use core_logic::RESULT_TARGET;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Submits one unit to its endpoint and follows it to a receipt or an error.
///
/// Never retries and never gives up on its own; stopping a slow unit is the
/// coordinator's job.
#[derive(Clone)]
pub struct Broadcaster {
    connector: Arc<dyn Connector>,
    poll_interval: Duration,
}

impl Broadcaster {
    pub fn new(connector: Arc<dyn Connector>, poll_interval: Duration) -> Self {
        Self {
            connector,
            poll_interval,
        }
    }

    pub async fn submit(&self, unit: &DispatchUnit) -> SubmissionOutcome {
        let (progress, _) = watch::channel(SubmissionOutcome::started(unit));
        self.track(unit, &progress).await
    }

    /// Like `submit`, publishing every state change on `progress` so a caller
    /// that stops this future still knows how far the unit got.
    pub async fn track(
        &self,
        unit: &DispatchUnit,
        progress: &watch::Sender<SubmissionOutcome>,
    ) -> SubmissionOutcome {
        let endpoint = unit.endpoint.to_string();
        let failed = |reason: String| RaceError::Submission {
            endpoint: endpoint.clone(),
            reason,
        };

        let client = match self.connector.connect(&unit.endpoint) {
            Ok(client) => client,
            Err(e) => return fail(progress, failed(e.reason())),
        };

        progress.send_modify(|o| o.mark_submitted(Utc::now()));
        info!(target: RESULT_TARGET, "{}", report::format_submit(unit));

        let local_hash = unit.payload.tx_hash();
        match client.send_raw_transaction(unit.payload.raw().clone()).await {
            Ok(remote_hash) => {
                let seen_at = Utc::now();
                if remote_hash != local_hash {
                    warn!(
                        "{} answered with hash {:?}, expected {:?}; tracking the local hash",
                        endpoint, remote_hash, local_hash
                    );
                }
                progress.send_modify(|o| o.record_hash_seen(seen_at));
                let line = report::format_hash_seen(&progress.borrow());
                info!(target: RESULT_TARGET, "{}", line);
            }
            Err(e) => return fail(progress, failed(e.reason())),
        }

        loop {
            match client.transaction_receipt(local_hash).await {
                Ok(Some(receipt)) => match receipt.block_number {
                    Some(block) => {
                        let at = Utc::now();
                        progress.send_modify(|o| o.record_receipt(at, block.as_u64()));
                        let line = report::format_receipt(&progress.borrow());
                        info!(target: RESULT_TARGET, "{}", line);
                        break;
                    }
                    None => debug!("Receipt for {:?} has no block yet", local_hash),
                },
                Ok(None) => {}
                Err(e) => return fail(progress, failed(e.reason())),
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        progress.borrow().clone()
    }
}

fn fail(progress: &watch::Sender<SubmissionOutcome>, err: RaceError) -> SubmissionOutcome {
    progress.send_modify(|o| o.record_error(err.to_string()));
    let outcome = progress.borrow().clone();
    error!(target: RESULT_TARGET, "{}", report::format_error(&outcome));
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::{sign, PrivateKey};
    use crate::types::{Endpoint, Label, OutcomeStatus, TransactionDescriptor};
    use crate::utils::{EndpointClient, EthersClient};
    use core_logic::NetworkError;
    use ethers::providers::{MockProvider, MockResponse, Provider};
    use ethers::types::{TransactionReceipt, H256, U256, U64};

    const KEY: &str = "99800E73C5AE15C80937FD42D26CA08249081727AE72155072BCA9565C2AFF40";

    struct MockConnector(MockProvider);

    impl Connector for MockConnector {
        fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn EndpointClient>, NetworkError> {
            Ok(Arc::new(EthersClient::new(
                endpoint.clone(),
                Provider::new(self.0.clone()),
            )))
        }
    }

    fn unit() -> DispatchUnit {
        let key = PrivateKey::from_hex(KEY).unwrap();
        let descriptor = TransactionDescriptor {
            sender: key.address(),
            recipient: "0x1fed25aa5311d770f29e22870cdb9e715052fea7".parse().unwrap(),
            value: U256::one(),
            nonce: U256::zero(),
            gas_price: U256::from(1_000_000_000u64),
            gas_limit: U256::from(100_000u64),
            chain_id: 3,
        };
        DispatchUnit {
            payload: Arc::new(sign(&descriptor, key.as_bytes()).unwrap()),
            endpoint: Endpoint::parse("http://node-a:8545").unwrap(),
            label: Label::Index(1),
        }
    }

    fn broadcaster(mock: &MockProvider) -> Broadcaster {
        Broadcaster::new(
            Arc::new(MockConnector(mock.clone())),
            Duration::from_millis(1),
        )
    }

    fn mined(block: u64) -> TransactionReceipt {
        TransactionReceipt {
            block_number: Some(U64::from(block)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_submit_until_receipt() {
        let unit = unit();
        let mock = MockProvider::new();
        // Responses are served last-in first-out
        mock.push::<TransactionReceipt, _>(mined(42)).unwrap();
        mock.push::<Option<TransactionReceipt>, _>(None).unwrap();
        mock.push::<H256, _>(unit.payload.tx_hash()).unwrap();

        let outcome = broadcaster(&mock).submit(&unit).await;
        assert_eq!(outcome.status(), OutcomeStatus::Confirmed);
        assert_eq!(outcome.block_number, Some(42));
        assert!(outcome.hash_seen_at.is_some());
        assert!(outcome.error.is_none());
        assert!(outcome.hash_latency_us().unwrap() >= 0);
    }

    #[tokio::test]
    async fn test_unmined_receipt_keeps_polling() {
        let unit = unit();
        let mock = MockProvider::new();
        mock.push::<TransactionReceipt, _>(mined(9)).unwrap();
        mock.push::<TransactionReceipt, _>(TransactionReceipt::default()).unwrap();
        mock.push::<H256, _>(unit.payload.tx_hash()).unwrap();

        let outcome = broadcaster(&mock).submit(&unit).await;
        assert_eq!(outcome.block_number, Some(9));
    }

    #[tokio::test]
    async fn test_rejection_fails_the_unit() {
        let unit = unit();
        let mock = MockProvider::new();
        mock.push_response(MockResponse::Error(ethers::providers::JsonRpcError {
            code: -32000,
            message: "insufficient funds for gas * price + value".to_string(),
            data: None,
        }));

        let outcome = broadcaster(&mock).submit(&unit).await;
        assert_eq!(outcome.status(), OutcomeStatus::Failed);
        assert!(outcome.hash_seen_at.is_none());
        assert_eq!(
            outcome.error.as_deref(),
            Some("Submission to http://node-a:8545 failed: insufficient funds for gas * price + value")
        );
    }

    #[tokio::test]
    async fn test_receipt_lookup_failure_keeps_hash_seen() {
        let unit = unit();
        let mock = MockProvider::new();
        // Only the send is answered; the receipt poll finds no response
        mock.push::<H256, _>(unit.payload.tx_hash()).unwrap();

        let (progress, watcher) = watch::channel(SubmissionOutcome::started(&unit));
        let outcome = broadcaster(&mock).track(&unit, &progress).await;

        assert_eq!(outcome.status(), OutcomeStatus::Failed);
        assert!(outcome.hash_seen_at.is_some());
        assert_eq!(*watcher.borrow(), outcome);
    }
}
