use crate::broadcaster::Broadcaster;
use crate::report;
use crate::types::{DispatchPlan, SubmissionOutcome};
use core_logic::{WorkerRunner, RESULT_TARGET};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Fans a plan out to concurrent broadcaster tasks and joins them all.
///
/// Outcomes come back in plan order whatever order the units finish in.
/// A failing unit never cancels or delays its siblings.
pub struct RaceCoordinator {
    broadcaster: Arc<Broadcaster>,
    runner: WorkerRunner,
}

impl RaceCoordinator {
    pub fn new(broadcaster: Arc<Broadcaster>, runner: WorkerRunner) -> Self {
        Self {
            broadcaster,
            runner,
        }
    }

    pub async fn run(&self, plan: DispatchPlan) -> Vec<SubmissionOutcome> {
        let units = plan.into_units();
        info!("🏁 Racing {} unit(s)", units.len());

        let mut watchers = Vec::with_capacity(units.len());
        let mut jobs = Vec::with_capacity(units.len());
        for unit in units {
            let (progress, watcher) = watch::channel(SubmissionOutcome::started(&unit));
            watchers.push(watcher);

            let broadcaster = self.broadcaster.clone();
            jobs.push((unit.label.to_string(), async move {
                broadcaster.track(&unit, &progress).await
            }));
        }

        self.runner
            .run_ordered(jobs)
            .await
            .into_iter()
            .zip(watchers)
            .map(|(result, watcher)| match result {
                Ok(outcome) => outcome,
                Err(exit) => {
                    // Keep whatever the unit reached before it was stopped
                    let mut outcome = watcher.borrow().clone();
                    outcome.record_error(exit.to_string());
                    error!(target: RESULT_TARGET, "{}", report::format_error(&outcome));
                    outcome
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DispatchUnit, Endpoint, Label, OutcomeStatus, SignedPayload, TransactionDescriptor};
    use crate::utils::{Connector, EndpointClient};
    use async_trait::async_trait;
    use core_logic::NetworkError;
    use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256, U64};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// Node whose behaviour is keyed on its host name.
    struct ScriptedClient {
        endpoint: Endpoint,
    }

    #[async_trait]
    impl EndpointClient for ScriptedClient {
        fn endpoint(&self) -> &Endpoint {
            &self.endpoint
        }

        async fn transaction_count(&self, _address: Address) -> Result<U256, NetworkError> {
            Ok(U256::zero())
        }

        async fn chain_id(&self) -> Result<u64, NetworkError> {
            Ok(1)
        }

        async fn gas_price(&self) -> Result<U256, NetworkError> {
            Ok(U256::one())
        }

        async fn send_raw_transaction(&self, _raw: Bytes) -> Result<H256, NetworkError> {
            match self.endpoint.url().host_str() {
                Some("bad") => Err(NetworkError::Rpc {
                    endpoint: self.endpoint.to_string(),
                    message: "already known".to_string(),
                }),
                Some("slow") => {
                    tokio::time::sleep(Duration::from_millis(40)).await;
                    Ok(H256::zero())
                }
                _ => Ok(H256::zero()),
            }
        }

        async fn transaction_receipt(
            &self,
            _hash: H256,
        ) -> Result<Option<TransactionReceipt>, NetworkError> {
            if self.endpoint.url().host_str() == Some("stuck") {
                return Ok(None);
            }
            Ok(Some(TransactionReceipt {
                block_number: Some(U64::from(42u64)),
                ..Default::default()
            }))
        }
    }

    struct ScriptedConnector;

    impl Connector for ScriptedConnector {
        fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn EndpointClient>, NetworkError> {
            Ok(Arc::new(ScriptedClient {
                endpoint: endpoint.clone(),
            }))
        }
    }

    fn plan(hosts: &[&str]) -> DispatchPlan {
        let payload = Arc::new(SignedPayload::new(
            Bytes::from(vec![0xc0]),
            TransactionDescriptor {
                sender: Address::zero(),
                recipient: Address::zero(),
                value: U256::one(),
                nonce: U256::zero(),
                gas_price: U256::one(),
                gas_limit: U256::from(21_000u64),
                chain_id: 1,
            },
            H256::zero(),
        ));
        DispatchPlan::new(
            hosts
                .iter()
                .enumerate()
                .map(|(i, host)| DispatchUnit {
                    payload: payload.clone(),
                    endpoint: Endpoint::parse(&format!("http://{}:8545", host)).unwrap(),
                    label: Label::Index(i + 1),
                })
                .collect(),
        )
    }

    fn coordinator(runner: WorkerRunner) -> RaceCoordinator {
        let broadcaster = Broadcaster::new(Arc::new(ScriptedConnector), Duration::from_millis(2));
        RaceCoordinator::new(Arc::new(broadcaster), runner)
    }

    #[tokio::test]
    async fn test_one_failure_does_not_affect_siblings() {
        let outcomes = coordinator(WorkerRunner::default())
            .run(plan(&["slow", "bad", "good"]))
            .await;

        let statuses: Vec<OutcomeStatus> = outcomes.iter().map(|o| o.status()).collect();
        assert_eq!(
            statuses,
            vec![
                OutcomeStatus::Confirmed,
                OutcomeStatus::Failed,
                OutcomeStatus::Confirmed
            ]
        );
        let labels: Vec<String> = outcomes.iter().map(|o| o.label.to_string()).collect();
        assert_eq!(labels, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_empty_plan_returns_nothing() {
        let outcomes = coordinator(WorkerRunner::default())
            .run(DispatchPlan::default())
            .await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_fails_stuck_units_with_progress() {
        let runner = WorkerRunner::default().with_deadline(Some(Duration::from_millis(100)));
        let outcomes = coordinator(runner).run(plan(&["good", "stuck"])).await;

        assert_eq!(outcomes[0].status(), OutcomeStatus::Confirmed);
        assert_eq!(outcomes[1].status(), OutcomeStatus::Failed);
        assert_eq!(outcomes[1].error.as_deref(), Some("deadline exceeded"));
        assert!(outcomes[1].hash_seen_at.is_some());
    }

    #[tokio::test]
    async fn test_cancellation_resolves_every_pending_unit() {
        let token = CancellationToken::new();
        let race = coordinator(WorkerRunner::new(token.clone()));

        let cancel = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });
        let outcomes = race.run(plan(&["stuck", "stuck"])).await;
        cancel.await.unwrap();

        assert!(outcomes
            .iter()
            .all(|o| o.error.as_deref() == Some("cancelled")));
    }
}
