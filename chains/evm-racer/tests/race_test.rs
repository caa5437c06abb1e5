use clap::Parser;
use core_logic::{NetworkError, WorkerRunner};
use ethers::providers::{MockProvider, Provider};
use ethers::types::{TransactionReceipt, H256, U256, U64};
use evm_racer::{
    Broadcaster, Cli, Connector, Endpoint, EndpointClient, EthersClient, GasResolver,
    NonceResolver, OutcomeStatus, PlanBuilder, RaceCoordinator, RaceReport,
};
use std::sync::Arc;
use std::time::Duration;

const KEY: &str = "99800E73C5AE15C80937FD42D26CA08249081727AE72155072BCA9565C2AFF40";
const TO: &str = "0x1fed25aa5311d770f29e22870cdb9e715052fea7";

/// Every endpoint answers from the same scripted mock.
struct MockConnector(MockProvider);

impl Connector for MockConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn EndpointClient>, NetworkError> {
        Ok(Arc::new(EthersClient::new(
            endpoint.clone(),
            Provider::new(self.0.clone()),
        )))
    }
}

#[tokio::test]
async fn test_send_end_to_end() {
    let mock = MockProvider::new();
    let connector = Arc::new(MockConnector(mock.clone()));

    let cli = Cli::try_parse_from([
        "evm-racer",
        "send",
        "100000",
        "1",
        KEY,
        TO,
        "1",
        "http://mock-node:8545",
    ])
    .unwrap();

    let gas = GasResolver::new(connector.clone(), 5);
    let scenario = cli.command.into_scenario(&gas).await.unwrap();

    // eth_getTransactionCount
    mock.push::<U256, _>(U256::zero()).unwrap();
    let plan = PlanBuilder::new(NonceResolver::new(connector.clone()), Some(3))
        .build(&scenario)
        .await
        .unwrap();
    assert_eq!(plan.len(), 1);
    let local_hash = plan.units()[0].payload.tx_hash();

    // Served last-in first-out: send, then the receipt
    mock.push::<TransactionReceipt, _>(TransactionReceipt {
        transaction_hash: local_hash,
        block_number: Some(U64::from(42u64)),
        ..Default::default()
    })
    .unwrap();
    mock.push::<H256, _>(local_hash).unwrap();

    let broadcaster = Broadcaster::new(connector, Duration::from_millis(1));
    let outcomes = RaceCoordinator::new(Arc::new(broadcaster), WorkerRunner::default())
        .run(plan)
        .await;

    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert_eq!(outcome.block_number, Some(42));
    assert!(outcome.error.is_none());
    assert_eq!(outcome.status(), OutcomeStatus::Confirmed);
    assert_eq!(outcome.tx_hash, local_hash);

    let report = RaceReport::new(scenario.name(), outcome.submitted_at, &outcomes);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_auto_gas_price_comes_from_the_node() {
    let mock = MockProvider::new();
    let connector = Arc::new(MockConnector(mock.clone()));
    mock.push::<U256, _>(U256::from(3_000_000_000u64)).unwrap();

    let cli = Cli::try_parse_from([
        "evm-racer",
        "sendToMulNodes",
        "21000",
        "auto",
        KEY,
        TO,
        "1",
        "http://a:8545",
        "http://b:8545",
    ])
    .unwrap();

    let gas = GasResolver::new(connector, 5);
    match cli.command.into_scenario(&gas).await.unwrap() {
        evm_racer::Scenario::FanOutEndpoints {
            transfer,
            endpoints,
            ..
        } => {
            assert_eq!(transfer.gas.gas_price, U256::from(3_000_000_000u64));
            assert_eq!(endpoints.len(), 2);
        }
        other => panic!("Expected FanOutEndpoints, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_submission_is_reported_not_raised() {
    let mock = MockProvider::new();
    let connector = Arc::new(MockConnector(mock.clone()));

    let cli = Cli::try_parse_from([
        "evm-racer",
        "send",
        "21000",
        "1",
        KEY,
        TO,
        "1",
        "http://mock-node:8545",
    ])
    .unwrap();
    let scenario = cli
        .command
        .into_scenario(&GasResolver::new(connector.clone(), 5))
        .await
        .unwrap();

    mock.push::<U256, _>(U256::from(7u64)).unwrap();
    let plan = PlanBuilder::new(NonceResolver::new(connector.clone()), Some(3))
        .build(&scenario)
        .await
        .unwrap();
    assert_eq!(plan.units()[0].payload.descriptor().nonce, U256::from(7u64));

    // Nothing scripted for the send: the mock answers with an error
    let broadcaster = Broadcaster::new(connector, Duration::from_millis(1));
    let outcomes = RaceCoordinator::new(Arc::new(broadcaster), WorkerRunner::default())
        .run(plan)
        .await;

    assert_eq!(outcomes[0].status(), OutcomeStatus::Failed);
    assert!(outcomes[0].hash_seen_at.is_none());

    let report = RaceReport::new(scenario.name(), outcomes[0].submitted_at, &outcomes);
    assert_eq!((report.confirmed, report.failed), (0, 1));
    assert_eq!(report.exit_code(), 1);
}
