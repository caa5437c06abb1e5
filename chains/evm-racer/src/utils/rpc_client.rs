use crate::types::Endpoint;
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{NetworkError, RaceSettings};
use ethers::providers::{Http, JsonRpcClient, Middleware, Provider, ProviderError, RpcError, Ws};
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

/// The JSON-RPC calls the racer makes against one endpoint.
#[async_trait]
pub trait EndpointClient: Send + Sync {
    fn endpoint(&self) -> &Endpoint;

    async fn transaction_count(&self, address: Address) -> Result<U256, NetworkError>;

    async fn chain_id(&self) -> Result<u64, NetworkError>;

    async fn gas_price(&self) -> Result<U256, NetworkError>;

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, NetworkError>;

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, NetworkError>;
}

/// Turns an `Endpoint` into a client. Called once per use; clients are cheap.
pub trait Connector: Send + Sync {
    fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn EndpointClient>, NetworkError>;
}

/// `EndpointClient` backed by an ethers provider.
#[derive(Debug)]
pub struct EthersClient<P> {
    endpoint: Endpoint,
    provider: Provider<P>,
}

impl<P: JsonRpcClient> EthersClient<P> {
    pub fn new(endpoint: Endpoint, provider: Provider<P>) -> Self {
        Self { endpoint, provider }
    }

    fn network_error(&self, e: ProviderError) -> NetworkError {
        let endpoint = self.endpoint.to_string();
        if let Some(resp) = e.as_error_response() {
            return NetworkError::Rpc {
                endpoint,
                message: resp.message.clone(),
            };
        }
        if e.as_serde_error().is_some() {
            return NetworkError::InvalidResponse {
                endpoint,
                reason: e.to_string(),
            };
        }
        NetworkError::Transport {
            endpoint,
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> EndpointClient for EthersClient<P> {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn transaction_count(&self, address: Address) -> Result<U256, NetworkError> {
        self.provider
            .get_transaction_count(address, None)
            .await
            .map_err(|e| self.network_error(e))
    }

    async fn chain_id(&self) -> Result<u64, NetworkError> {
        let id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| self.network_error(e))?;
        if id > U256::from(u64::MAX) {
            return Err(NetworkError::InvalidResponse {
                endpoint: self.endpoint.to_string(),
                reason: format!("chain id {} does not fit in 64 bits", id),
            });
        }
        Ok(id.as_u64())
    }

    async fn gas_price(&self) -> Result<U256, NetworkError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| self.network_error(e))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, NetworkError> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| self.network_error(e))?;
        Ok(pending.tx_hash())
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, NetworkError> {
        self.provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| self.network_error(e))
    }
}

/// `EndpointClient` over a WebSocket. The socket is opened by the first call
/// and reused by every later call on this client.
pub struct WebSocketClient {
    endpoint: Endpoint,
    connect_timeout: Duration,
    inner: OnceCell<EthersClient<Ws>>,
}

impl WebSocketClient {
    pub fn new(endpoint: Endpoint, connect_timeout: Duration) -> Self {
        Self {
            endpoint,
            connect_timeout,
            inner: OnceCell::new(),
        }
    }

    async fn inner(&self) -> Result<&EthersClient<Ws>, NetworkError> {
        self.inner
            .get_or_try_init(|| async {
                let failed = |reason: String| NetworkError::Transport {
                    endpoint: self.endpoint.to_string(),
                    reason,
                };
                let handshake = Ws::connect(self.endpoint.as_str());
                let ws = tokio::time::timeout(self.connect_timeout, handshake)
                    .await
                    .map_err(|_| failed("websocket handshake timed out".to_string()))?
                    .map_err(|e| failed(e.to_string()))?;
                debug!("🔌 WebSocket open to {}", self.endpoint);
                Ok::<_, NetworkError>(EthersClient::new(self.endpoint.clone(), Provider::new(ws)))
            })
            .await
    }
}

#[async_trait]
impl EndpointClient for WebSocketClient {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn transaction_count(&self, address: Address) -> Result<U256, NetworkError> {
        self.inner().await?.transaction_count(address).await
    }

    async fn chain_id(&self) -> Result<u64, NetworkError> {
        self.inner().await?.chain_id().await
    }

    async fn gas_price(&self) -> Result<U256, NetworkError> {
        self.inner().await?.gas_price().await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, NetworkError> {
        self.inner().await?.send_raw_transaction(raw).await
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, NetworkError> {
        self.inner().await?.transaction_receipt(hash).await
    }
}

/// Production connector. http(s) endpoints share one reqwest client;
/// ws(s) endpoints get their own socket per client.
#[derive(Debug, Clone)]
pub struct NodeConnector {
    client: Client,
    connect_timeout: Duration,
}

impl NodeConnector {
    pub fn new(settings: &RaceSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .connect_timeout(settings.connect_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            connect_timeout: settings.connect_timeout(),
        })
    }
}

impl Connector for NodeConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn EndpointClient>, NetworkError> {
        if endpoint.is_websocket() {
            return Ok(Arc::new(WebSocketClient::new(
                endpoint.clone(),
                self.connect_timeout,
            )));
        }

        let http = Http::new_with_client(endpoint.url().clone(), self.client.clone());
        Ok(Arc::new(EthersClient::new(
            endpoint.clone(),
            Provider::new(http),
        )))
    }
}
