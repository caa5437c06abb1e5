//! Command line surface. Maps arguments onto a `Scenario` and nothing more.

use crate::error::RaceError;
use crate::plan::{parse_wei, Leg, PayloadMode, Scenario, Transfer};
use crate::signer::PrivateKey;
use crate::types::Endpoint;
use crate::utils::GasResolver;
use clap::{Parser, Subcommand};
use core_logic::GasFields;
use ethers::types::Address;

/// Argument names of one leg, as reported in validation errors.
struct LegFields {
    gas: GasFields,
    to: &'static str,
    value: &'static str,
}

const MAIN_LEG: LegFields = LegFields {
    gas: GasFields::MAIN,
    to: "to",
    value: "value",
};

const SIDE_LEG: LegFields = LegFields {
    gas: GasFields::SIDE_LEG,
    to: "to1",
    value: "value1",
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Race signed EVM transfers across JSON-RPC endpoints",
    long_about = None
)]
pub struct Cli {
    /// Settings file (TOML). RACER_* environment variables override it.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Chain id for signing; asked from the first node when omitted
    #[arg(long, global = true)]
    pub chain_id: Option<u64>,

    /// Receipt polling interval in milliseconds
    #[arg(long, global = true)]
    pub poll_ms: Option<u64>,

    /// Give up on units still pending after this many seconds
    #[arg(long, global = true)]
    pub deadline_secs: Option<u64>,

    /// Print the final report as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// `gasPrice` is in gwei (`auto` asks the node); `value` is in wei.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send <value> to <to> from private key <from> through <node>
    #[command(name = "send")]
    Send {
        #[arg(value_name = "gasLimit")]
        gas_limit: String,
        #[arg(value_name = "gasPrice")]
        gas_price: String,
        from: String,
        to: String,
        value: String,
        node: String,
    },

    /// Send <value> to <to> from several private keys through one <node>
    #[command(name = "sendFromMul")]
    SendFromMul {
        #[arg(value_name = "gasLimit")]
        gas_limit: String,
        #[arg(value_name = "gasPrice")]
        gas_price: String,
        to: String,
        value: String,
        node: String,
        froms: Vec<String>,
    },

    /// Broadcast one signed transaction to every node
    #[command(name = "sendToMulNodes")]
    SendToMulNodes {
        #[arg(value_name = "gasLimit")]
        gas_limit: String,
        #[arg(value_name = "gasPrice")]
        gas_price: String,
        from: String,
        to: String,
        value: String,
        nodes: Vec<String>,
    },

    /// Send a different transaction to each node, all with the same nonce.
    /// Node i gets value - i; at most one of them can be mined.
    #[command(name = "sendToMulNodesDiff")]
    SendToMulNodesDiff {
        #[arg(value_name = "gasLimit")]
        gas_limit: String,
        #[arg(value_name = "gasPrice")]
        gas_price: String,
        from: String,
        to: String,
        value: String,
        nodes: Vec<String>,
    },

    /// sendToMulNodes plus one independent transaction labelled XXX
    #[command(name = "sendToMulNodesPlus")]
    SendToMulNodesPlus {
        #[command(flatten)]
        side: SideLegArgs,
        #[arg(value_name = "gasLimit")]
        gas_limit: String,
        #[arg(value_name = "gasPrice")]
        gas_price: String,
        from: String,
        to: String,
        value: String,
        nodes: Vec<String>,
    },

    /// sendToMulNodesDiff plus one independent transaction labelled XXX
    #[command(name = "sendToMulNodesDiffPlus")]
    SendToMulNodesDiffPlus {
        #[command(flatten)]
        side: SideLegArgs,
        #[arg(value_name = "gasLimit")]
        gas_limit: String,
        #[arg(value_name = "gasPrice")]
        gas_price: String,
        from: String,
        to: String,
        value: String,
        nodes: Vec<String>,
    },

    /// Each sender submits through its own node; entries are <privateKey>_<node>
    #[command(name = "sendFromMultToMultNodesDiff")]
    SendFromMultToMultNodesDiff {
        #[arg(value_name = "gasLimit")]
        gas_limit: String,
        #[arg(value_name = "gasPrice")]
        gas_price: String,
        to: String,
        value: String,
        from_nodes: Vec<String>,
    },
}

/// The independent leg of the `...Plus` commands.
#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct SideLegArgs {
    #[arg(value_name = "gasLimit1")]
    pub gas_limit1: String,
    #[arg(value_name = "gasPrice1")]
    pub gas_price1: String,
    pub from1: String,
    pub to1: String,
    pub value1: String,
    pub node1: String,
}

impl Command {
    /// Parse every argument into a scenario. `auto` gas prices are looked up
    /// here, before the plan builder runs.
    pub async fn into_scenario(self, gas: &GasResolver) -> Result<Scenario, RaceError> {
        match self {
            Command::Send {
                gas_limit,
                gas_price,
                from,
                to,
                value,
                node,
            } => {
                let endpoint = Endpoint::parse(&node)?;
                let transfer = transfer(
                    gas,
                    &MAIN_LEG,
                    &gas_limit,
                    &gas_price,
                    &to,
                    &value,
                    Some(&endpoint),
                )
                .await?;
                Ok(Scenario::Single(Leg {
                    key: PrivateKey::from_hex(&from)?,
                    transfer,
                    endpoint,
                }))
            }
            Command::SendFromMul {
                gas_limit,
                gas_price,
                to,
                value,
                node,
                froms,
            } => {
                let endpoint = Endpoint::parse(&node)?;
                let keys = froms
                    .iter()
                    .map(|k| PrivateKey::from_hex(k))
                    .collect::<Result<Vec<_>, _>>()?;
                let transfer = transfer(
                    gas,
                    &MAIN_LEG,
                    &gas_limit,
                    &gas_price,
                    &to,
                    &value,
                    Some(&endpoint),
                )
                .await?;
                Ok(Scenario::FanOutSenders {
                    keys,
                    transfer,
                    endpoint,
                })
            }
            Command::SendToMulNodes {
                gas_limit,
                gas_price,
                from,
                to,
                value,
                nodes,
            } => {
                fan_out(gas, PayloadMode::Shared, &gas_limit, &gas_price, &from, &to, &value, &nodes)
                    .await
            }
            Command::SendToMulNodesDiff {
                gas_limit,
                gas_price,
                from,
                to,
                value,
                nodes,
            } => {
                fan_out(gas, PayloadMode::Distinct, &gas_limit, &gas_price, &from, &to, &value, &nodes)
                    .await
            }
            Command::SendToMulNodesPlus {
                side,
                gas_limit,
                gas_price,
                from,
                to,
                value,
                nodes,
            } => {
                let race =
                    fan_out(gas, PayloadMode::Shared, &gas_limit, &gas_price, &from, &to, &value, &nodes)
                        .await?;
                race.with_side_leg(side.into_leg(gas).await?)
            }
            Command::SendToMulNodesDiffPlus {
                side,
                gas_limit,
                gas_price,
                from,
                to,
                value,
                nodes,
            } => {
                let race =
                    fan_out(gas, PayloadMode::Distinct, &gas_limit, &gas_price, &from, &to, &value, &nodes)
                        .await?;
                race.with_side_leg(side.into_leg(gas).await?)
            }
            Command::SendFromMultToMultNodesDiff {
                gas_limit,
                gas_price,
                to,
                value,
                from_nodes,
            } => {
                let legs = from_nodes
                    .iter()
                    .map(|entry| split_from_node(entry))
                    .collect::<Result<Vec<_>, _>>()?;
                let first = legs.first().map(|(_, endpoint)| endpoint);
                let transfer =
                    transfer(gas, &MAIN_LEG, &gas_limit, &gas_price, &to, &value, first).await?;
                Ok(Scenario::FanOutMixed { transfer, legs })
            }
        }
    }
}

impl SideLegArgs {
    async fn into_leg(self, gas: &GasResolver) -> Result<Leg, RaceError> {
        let endpoint = Endpoint::parse(&self.node1)?;
        let transfer = transfer(
            gas,
            &SIDE_LEG,
            &self.gas_limit1,
            &self.gas_price1,
            &self.to1,
            &self.value1,
            Some(&endpoint),
        )
        .await?;
        Ok(Leg {
            key: PrivateKey::from_hex(&self.from1)?,
            transfer,
            endpoint,
        })
    }
}

#[allow(clippy::too_many_arguments)]
async fn fan_out(
    gas: &GasResolver,
    mode: PayloadMode,
    gas_limit: &str,
    gas_price: &str,
    from: &str,
    to: &str,
    value: &str,
    nodes: &[String],
) -> Result<Scenario, RaceError> {
    let endpoints = nodes
        .iter()
        .map(|n| Endpoint::parse(n))
        .collect::<Result<Vec<_>, _>>()?;
    let transfer = transfer(
        gas,
        &MAIN_LEG,
        gas_limit,
        gas_price,
        to,
        value,
        endpoints.first(),
    )
    .await?;
    Ok(Scenario::FanOutEndpoints {
        mode,
        key: PrivateKey::from_hex(from)?,
        transfer,
        endpoints,
    })
}

#[allow(clippy::too_many_arguments)]
async fn transfer(
    gas: &GasResolver,
    fields: &LegFields,
    gas_limit: &str,
    gas_price: &str,
    to: &str,
    value: &str,
    endpoint: Option<&Endpoint>,
) -> Result<Transfer, RaceError> {
    let recipient = parse_address(fields.to, to)?;
    let value = parse_wei(fields.value, value)?;
    let gas = gas.resolve(fields.gas, gas_limit, gas_price, endpoint).await?;
    Ok(Transfer {
        recipient,
        value,
        gas,
    })
}

pub fn parse_address(field: &str, input: &str) -> Result<Address, RaceError> {
    input.trim().parse::<Address>().map_err(|e| {
        RaceError::invalid_descriptor(field, format!("'{}' is not a hex address: {}", input, e))
    })
}

/// Split `<privateKey>_<node>` at the first underscore.
pub fn split_from_node(entry: &str) -> Result<(PrivateKey, Endpoint), RaceError> {
    let (key, node) = entry.split_once('_').ok_or_else(|| {
        RaceError::invalid_descriptor(
            "from_nodes",
            "expected <privateKey>_<node>, found no underscore",
        )
    })?;
    Ok((PrivateKey::from_hex(key)?, Endpoint::parse(node)?))
}
