use crate::error::RaceError;
use crate::types::Endpoint;
use crate::utils::rpc_client::{Connector, EndpointClient};
use async_trait::async_trait;
use core_logic::{gwei_to_wei, parse_gas_limit, GasConfig, GasFields};
use ethers::types::U256;
use std::sync::Arc;
use tracing::{debug, warn};

/// Gas price argument that asks the node instead of taking a fixed value.
pub const AUTO_GAS_PRICE: &str = "auto";

/// Gas values of one leg, in the units the descriptor carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasParams {
    pub gas_limit: U256,
    pub gas_price: U256,
}

impl From<GasConfig> for GasParams {
    fn from(config: GasConfig) -> Self {
        Self {
            gas_limit: U256::from(config.gas_limit),
            gas_price: U256::from(config.gas_price_wei),
        }
    }
}

#[async_trait]
pub trait GasOracle: Send + Sync {
    /// Gas price in wei. Oracles degrade to a fallback rather than fail.
    async fn current_price(&self) -> U256;
}

/// Caller-supplied price.
#[derive(Debug, Clone, Copy)]
pub struct FixedGasPrice(pub U256);

#[async_trait]
impl GasOracle for FixedGasPrice {
    async fn current_price(&self) -> U256 {
        self.0
    }
}

/// `eth_gasPrice` on one endpoint, with a fallback when the call fails.
pub struct RpcGasOracle {
    client: Arc<dyn EndpointClient>,
    fallback: U256,
}

impl RpcGasOracle {
    pub fn new(client: Arc<dyn EndpointClient>, fallback: U256) -> Self {
        Self { client, fallback }
    }
}

#[async_trait]
impl GasOracle for RpcGasOracle {
    async fn current_price(&self) -> U256 {
        match self.client.gas_price().await {
            Ok(price) => {
                debug!("⛽ Gas price from {}: {} wei", self.client.endpoint(), price);
                price
            }
            Err(e) => {
                warn!(
                    "⚠️  Gas price lookup failed ({}), using fallback {} wei",
                    e, self.fallback
                );
                self.fallback
            }
        }
    }
}

/// Turns the `<gasLimit> <gasPrice>` argument pair into `GasParams`.
#[derive(Clone)]
pub struct GasResolver {
    connector: Arc<dyn Connector>,
    fallback: U256,
}

impl GasResolver {
    pub fn new(connector: Arc<dyn Connector>, fallback_gwei: u64) -> Self {
        Self {
            connector,
            fallback: U256::from(gwei_to_wei(fallback_gwei)),
        }
    }

    fn oracle(&self, endpoint: Option<&Endpoint>) -> Box<dyn GasOracle> {
        let Some(endpoint) = endpoint else {
            return Box::new(FixedGasPrice(self.fallback));
        };
        match self.connector.connect(endpoint) {
            Ok(client) => Box::new(RpcGasOracle::new(client, self.fallback)),
            Err(e) => {
                warn!("⚠️  Cannot reach {} for gas price: {}", endpoint, e);
                Box::new(FixedGasPrice(self.fallback))
            }
        }
    }

    /// Parse a fixed pair. `auto` is not accepted here.
    pub fn fixed(
        fields: GasFields,
        gas_limit: &str,
        gas_price: &str,
    ) -> Result<GasParams, RaceError> {
        let config =
            GasConfig::from_args(fields, gas_limit, gas_price).map_err(RaceError::from_amount)?;
        Ok(config.into())
    }

    /// Parse the pair, asking `endpoint` for the price when it is `auto`.
    /// Without an endpoint `auto` means the fallback price.
    pub async fn resolve(
        &self,
        fields: GasFields,
        gas_limit: &str,
        gas_price: &str,
        endpoint: Option<&Endpoint>,
    ) -> Result<GasParams, RaceError> {
        if !gas_price.trim().eq_ignore_ascii_case(AUTO_GAS_PRICE) {
            return Self::fixed(fields, gas_limit, gas_price);
        }

        let limit = parse_gas_limit(fields.gas_limit, gas_limit).map_err(RaceError::from_amount)?;
        Ok(GasParams {
            gas_limit: U256::from(limit),
            gas_price: self.oracle(endpoint).current_price().await,
        })
    }
}
