use crate::error::RaceError;
use crate::types::Endpoint;
use crate::utils::rpc_client::Connector;
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::debug;

/// Reads account nonces and the chain id from a chosen endpoint.
///
/// Nothing is cached: every plan asks the node again, so two runs started
/// back to back may legitimately see different counts.
#[derive(Clone)]
pub struct NonceResolver {
    connector: Arc<dyn Connector>,
}

impl NonceResolver {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    /// Transaction count of `address` at the latest block, as seen by `endpoint`.
    pub async fn resolve(&self, address: Address, endpoint: &Endpoint) -> Result<U256, RaceError> {
        let failed = |reason: String| RaceError::NonceResolution {
            address: format!("{:?}", address),
            endpoint: endpoint.to_string(),
            reason,
        };

        let client = self
            .connector
            .connect(endpoint)
            .map_err(|e| failed(e.reason()))?;
        let nonce = client
            .transaction_count(address)
            .await
            .map_err(|e| failed(e.reason()))?;

        debug!("Nonce for {:?} at {}: {}", address, endpoint, nonce);
        Ok(nonce)
    }

    pub async fn resolve_chain_id(&self, endpoint: &Endpoint) -> Result<u64, RaceError> {
        let client = self.connector.connect(endpoint)?;
        let chain_id = client.chain_id().await?;
        debug!("Chain id reported by {}: {}", endpoint, chain_id);
        Ok(chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::rpc_client::EthersClient;
    use crate::utils::EndpointClient;
    use core_logic::NetworkError;
    use ethers::providers::{MockProvider, Provider};

    struct MockConnector {
        mock: MockProvider,
    }

    impl Connector for MockConnector {
        fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn EndpointClient>, NetworkError> {
            Ok(Arc::new(EthersClient::new(
                endpoint.clone(),
                Provider::new(self.mock.clone()),
            )))
        }
    }

    fn resolver() -> (NonceResolver, MockProvider) {
        let mock = MockProvider::new();
        let connector = MockConnector { mock: mock.clone() };
        (NonceResolver::new(Arc::new(connector)), mock)
    }

    #[tokio::test]
    async fn test_resolve_returns_node_count() {
        let (resolver, mock) = resolver();
        mock.push::<U256, _>(U256::from(7u64)).unwrap();

        let endpoint = Endpoint::parse("http://node-a:8545").unwrap();
        let nonce = resolver
            .resolve(Address::repeat_byte(0x01), &endpoint)
            .await
            .unwrap();
        assert_eq!(nonce, U256::from(7u64));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_a_nonce_error() {
        let (resolver, _mock) = resolver();
        let endpoint = Endpoint::parse("http://node-a:8545").unwrap();

        match resolver.resolve(Address::repeat_byte(0x01), &endpoint).await {
            Err(RaceError::NonceResolution {
                address, endpoint, ..
            }) => {
                assert_eq!(address, format!("{:?}", Address::repeat_byte(0x01)));
                assert_eq!(endpoint, "http://node-a:8545");
            }
            other => panic!("Expected NonceResolution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chain_id_failure_is_a_network_error() {
        let (resolver, _mock) = resolver();
        let endpoint = Endpoint::parse("http://node-a:8545").unwrap();
        assert!(matches!(
            resolver.resolve_chain_id(&endpoint).await,
            Err(RaceError::Network(_))
        ));
    }
}
