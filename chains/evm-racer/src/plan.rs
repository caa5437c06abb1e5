//! # Dispatch Plan Builder
//!
//! Every command reduces to the same steps: resolve nonces, build
//! descriptors, sign, pair each payload with an endpoint. Nothing here
//! submits anything; a failure at any step aborts before the race starts.

use crate::error::RaceError;
use crate::signer::{sign, PrivateKey};
use crate::types::{DispatchPlan, DispatchUnit, Endpoint, Label, SignedPayload, TransactionDescriptor};
use crate::utils::{GasParams, NonceResolver};
use ethers::types::{Address, U256};
use futures::future::{try_join, try_join_all};
use std::sync::Arc;
use tracing::{debug, info};

/// Recipient, amount and gas shared by the legs of one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub recipient: Address,
    pub value: U256,
    pub gas: GasParams,
}

/// One self-contained (sender, transfer, endpoint) transaction.
#[derive(Debug, Clone)]
pub struct Leg {
    pub key: PrivateKey,
    pub transfer: Transfer,
    pub endpoint: Endpoint,
}

/// How a fan-out-endpoints race builds its payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// One signed payload broadcast to every endpoint.
    Shared,
    /// One payload per endpoint, same nonce, value lowered by the endpoint index.
    Distinct,
}

#[derive(Debug, Clone)]
pub enum Scenario {
    Single(Leg),
    FanOutSenders {
        keys: Vec<PrivateKey>,
        transfer: Transfer,
        endpoint: Endpoint,
    },
    FanOutEndpoints {
        mode: PayloadMode,
        key: PrivateKey,
        transfer: Transfer,
        endpoints: Vec<Endpoint>,
    },
    /// A fan-out-endpoints race plus one independent leg labelled `XXX`.
    WithSideLeg {
        mode: PayloadMode,
        key: PrivateKey,
        transfer: Transfer,
        endpoints: Vec<Endpoint>,
        side: Leg,
    },
    FanOutMixed {
        transfer: Transfer,
        legs: Vec<(PrivateKey, Endpoint)>,
    },
}

impl Scenario {
    /// Command name the scenario was typed as.
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Single(_) => "send",
            Scenario::FanOutSenders { .. } => "sendFromMul",
            Scenario::FanOutEndpoints {
                mode: PayloadMode::Shared,
                ..
            } => "sendToMulNodes",
            Scenario::FanOutEndpoints {
                mode: PayloadMode::Distinct,
                ..
            } => "sendToMulNodesDiff",
            Scenario::WithSideLeg {
                mode: PayloadMode::Shared,
                ..
            } => "sendToMulNodesPlus",
            Scenario::WithSideLeg {
                mode: PayloadMode::Distinct,
                ..
            } => "sendToMulNodesDiffPlus",
            Scenario::FanOutMixed { .. } => "sendFromMultToMultNodesDiff",
        }
    }

    /// Endpoint consulted for chain-wide facts such as the chain id.
    pub fn first_endpoint(&self) -> Option<&Endpoint> {
        match self {
            Scenario::Single(leg) => Some(&leg.endpoint),
            Scenario::FanOutSenders { keys, endpoint, .. } => {
                keys.first().map(|_| endpoint)
            }
            Scenario::FanOutEndpoints { endpoints, .. } => endpoints.first(),
            Scenario::WithSideLeg {
                endpoints, side, ..
            } => endpoints.first().or(Some(&side.endpoint)),
            Scenario::FanOutMixed { legs, .. } => legs.first().map(|(_, ep)| ep),
        }
    }

    /// Attach an independent side leg to a fan-out-endpoints race.
    pub fn with_side_leg(self, side: Leg) -> Result<Scenario, RaceError> {
        match self {
            Scenario::FanOutEndpoints {
                mode,
                key,
                transfer,
                endpoints,
            } => Ok(Scenario::WithSideLeg {
                mode,
                key,
                transfer,
                endpoints,
                side,
            }),
            other => Err(RaceError::invalid_descriptor(
                "scenario",
                format!("{} cannot carry a side leg", other.name()),
            )),
        }
    }
}

/// Parse a decimal wei amount.
pub fn parse_wei(field: &str, input: &str) -> Result<U256, RaceError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(RaceError::invalid_descriptor(
            field,
            format!("'{}' is not a non-negative integer amount of wei", input),
        ));
    }
    U256::from_dec_str(trimmed).map_err(|e| {
        RaceError::invalid_descriptor(field, format!("'{}' is out of range: {}", input, e))
    })
}

/// Values for the distinct-payload race: `value - index` for each endpoint.
fn distinct_values(value: U256, count: usize) -> Result<Vec<U256>, RaceError> {
    (0..count)
        .map(|index| {
            value.checked_sub(U256::from(index)).ok_or_else(|| {
                RaceError::invalid_descriptor(
                    "value",
                    format!(
                        "{} wei cannot be lowered by endpoint index {} without going negative",
                        value, index
                    ),
                )
            })
        })
        .collect()
}

pub struct PlanBuilder {
    resolver: NonceResolver,
    chain_id: Option<u64>,
}

impl PlanBuilder {
    /// `chain_id` of `None` asks the scenario's first endpoint.
    pub fn new(resolver: NonceResolver, chain_id: Option<u64>) -> Self {
        Self { resolver, chain_id }
    }

    pub async fn build(&self, scenario: &Scenario) -> Result<DispatchPlan, RaceError> {
        // Underflow is a descriptor error and must surface before any I/O
        let distinct = match scenario {
            Scenario::FanOutEndpoints {
                mode: PayloadMode::Distinct,
                transfer,
                endpoints,
                ..
            }
            | Scenario::WithSideLeg {
                mode: PayloadMode::Distinct,
                transfer,
                endpoints,
                ..
            } => Some(distinct_values(transfer.value, endpoints.len())?),
            _ => None,
        };

        let Some(first) = scenario.first_endpoint() else {
            debug!("{} has nothing to dispatch", scenario.name());
            return Ok(DispatchPlan::default());
        };
        let chain_id = self.chain_id(first).await?;

        let units = match scenario {
            Scenario::Single(leg) => {
                let payload = self.sign_leg(leg, chain_id).await?;
                vec![unit(payload, &leg.endpoint, Label::Index(1))]
            }
            Scenario::FanOutSenders {
                keys,
                transfer,
                endpoint,
            } => {
                let nonces = try_join_all(
                    keys.iter()
                        .map(|key| self.resolver.resolve(key.address(), endpoint)),
                )
                .await?;

                keys.iter()
                    .zip(nonces)
                    .enumerate()
                    .map(|(i, (key, nonce))| {
                        let payload = signed(key, transfer, transfer.value, nonce, chain_id)?;
                        Ok(unit(payload, endpoint, Label::Index(i + 1)))
                    })
                    .collect::<Result<Vec<_>, RaceError>>()?
            }
            Scenario::FanOutEndpoints {
                key,
                transfer,
                endpoints,
                ..
            } => {
                let nonce = self.resolver.resolve(key.address(), first).await?;
                race_units(key, transfer, endpoints, nonce, distinct.as_deref(), chain_id)?
            }
            Scenario::WithSideLeg {
                key,
                transfer,
                endpoints,
                side,
                ..
            } => {
                match endpoints.first() {
                    Some(race_endpoint) => {
                        let (nonce, side_payload) = try_join(
                            self.resolver.resolve(key.address(), race_endpoint),
                            self.sign_leg(side, chain_id),
                        )
                        .await?;
                        let mut units = race_units(
                            key,
                            transfer,
                            endpoints,
                            nonce,
                            distinct.as_deref(),
                            chain_id,
                        )?;
                        units.push(unit(side_payload, &side.endpoint, Label::side_leg()));
                        units
                    }
                    None => {
                        let side_payload = self.sign_leg(side, chain_id).await?;
                        vec![unit(side_payload, &side.endpoint, Label::side_leg())]
                    }
                }
            }
            Scenario::FanOutMixed { transfer, legs } => {
                let nonces = try_join_all(
                    legs.iter()
                        .map(|(key, endpoint)| self.resolver.resolve(key.address(), endpoint)),
                )
                .await?;

                legs.iter()
                    .zip(nonces)
                    .enumerate()
                    .map(|(i, ((key, endpoint), nonce))| {
                        let payload = signed(key, transfer, transfer.value, nonce, chain_id)?;
                        Ok(unit(payload, endpoint, Label::Index(i + 1)))
                    })
                    .collect::<Result<Vec<_>, RaceError>>()?
            }
        };

        info!(
            "📋 {} plan ready: {} unit(s) on chain {}",
            scenario.name(),
            units.len(),
            chain_id
        );
        Ok(DispatchPlan::new(units))
    }

    async fn chain_id(&self, endpoint: &Endpoint) -> Result<u64, RaceError> {
        match self.chain_id {
            Some(id) => Ok(id),
            None => self.resolver.resolve_chain_id(endpoint).await,
        }
    }

    async fn sign_leg(&self, leg: &Leg, chain_id: u64) -> Result<Arc<SignedPayload>, RaceError> {
        let nonce = self.resolver.resolve(leg.key.address(), &leg.endpoint).await?;
        signed(&leg.key, &leg.transfer, leg.transfer.value, nonce, chain_id)
    }
}

fn race_units(
    key: &PrivateKey,
    transfer: &Transfer,
    endpoints: &[Endpoint],
    nonce: U256,
    distinct: Option<&[U256]>,
    chain_id: u64,
) -> Result<Vec<DispatchUnit>, RaceError> {
    match distinct {
        None => {
            let payload = signed(key, transfer, transfer.value, nonce, chain_id)?;
            Ok(endpoints
                .iter()
                .enumerate()
                .map(|(i, endpoint)| unit(payload.clone(), endpoint, Label::Index(i + 1)))
                .collect())
        }
        Some(values) => endpoints
            .iter()
            .zip(values)
            .enumerate()
            .map(|(i, (endpoint, value))| {
                let payload = signed(key, transfer, *value, nonce, chain_id)?;
                Ok(unit(payload, endpoint, Label::Index(i + 1)))
            })
            .collect(),
    }
}

fn signed(
    key: &PrivateKey,
    transfer: &Transfer,
    value: U256,
    nonce: U256,
    chain_id: u64,
) -> Result<Arc<SignedPayload>, RaceError> {
    let descriptor = TransactionDescriptor {
        sender: key.address(),
        recipient: transfer.recipient,
        value,
        nonce,
        gas_price: transfer.gas.gas_price,
        gas_limit: transfer.gas.gas_limit,
        chain_id,
    };
    Ok(Arc::new(sign(&descriptor, key.as_bytes())?))
}

fn unit(payload: Arc<SignedPayload>, endpoint: &Endpoint, label: Label) -> DispatchUnit {
    DispatchUnit {
        payload,
        endpoint: endpoint.clone(),
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wei() {
        assert_eq!(parse_wei("value", "1000").unwrap(), U256::from(1000u64));
        assert_eq!(parse_wei("value", " 0 ").unwrap(), U256::zero());
        assert!(parse_wei("value", "-1").is_err());
        assert!(parse_wei("value", "1.5").is_err());
        assert!(parse_wei("value", "0x10").is_err());
        assert!(parse_wei("value", "").is_err());
    }

    #[test]
    fn test_distinct_values_count_down() {
        let values = distinct_values(U256::from(1000u64), 3).unwrap();
        assert_eq!(
            values,
            vec![U256::from(1000u64), U256::from(999u64), U256::from(998u64)]
        );
    }

    #[test]
    fn test_distinct_values_reject_underflow() {
        assert!(distinct_values(U256::from(1u64), 2).is_ok());
        assert!(matches!(
            distinct_values(U256::from(1u64), 3),
            Err(RaceError::InvalidDescriptor { .. })
        ));
        assert!(distinct_values(U256::zero(), 0).unwrap().is_empty());
    }
}
