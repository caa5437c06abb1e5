//! # Core Logic - Gas Configuration
//!
//! Caller-supplied gas policy shared by every chain implementation.
//! Prices are entered in gwei and stored in wei; nothing here estimates gas.

use crate::error::ConfigError;

pub const WEI_PER_GWEI: u128 = 1_000_000_000;
const GWEI_DECIMALS: usize = 9;

/// Gas limit and gas price applied to one transaction leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasConfig {
    pub gas_limit: u64,
    pub gas_price_wei: u128,
}

/// Argument names a gas pair is reported under when it does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasFields {
    pub gas_limit: &'static str,
    pub gas_price: &'static str,
}

impl GasFields {
    pub const MAIN: GasFields = GasFields {
        gas_limit: "gasLimit",
        gas_price: "gasPrice",
    };

    /// The independent leg of the `...Plus` commands.
    pub const SIDE_LEG: GasFields = GasFields {
        gas_limit: "gasLimit1",
        gas_price: "gasPrice1",
    };
}

impl GasConfig {
    /// Parse the `<gasLimit> <gasPrice>` pair as typed on the command line.
    pub fn from_args(
        fields: GasFields,
        gas_limit: &str,
        gas_price_gwei: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            gas_limit: parse_gas_limit(fields.gas_limit, gas_limit)?,
            gas_price_wei: parse_gwei(fields.gas_price, gas_price_gwei)?,
        })
    }
}

/// Convert whole gwei to wei
pub fn gwei_to_wei(gwei: u64) -> u128 {
    gwei as u128 * WEI_PER_GWEI
}

/// Parse a decimal gwei amount (at most 9 fractional digits) into wei exactly.
pub fn parse_gwei(field: &str, input: &str) -> Result<u128, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("'{}' {}", input, reason),
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid("is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid("is negative"));
    }

    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid("is not a number"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("is not a decimal number"));
    }
    if frac.len() > GWEI_DECIMALS {
        return Err(invalid("has more precision than 1 wei"));
    }

    let whole_wei = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|_| invalid("is out of range"))?
            .checked_mul(WEI_PER_GWEI)
            .ok_or_else(|| invalid("is out of range"))?
    };
    let frac_wei = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = GWEI_DECIMALS);
        padded.parse::<u128>().map_err(|_| invalid("is out of range"))?
    };

    whole_wei
        .checked_add(frac_wei)
        .ok_or_else(|| invalid("is out of range"))
}

pub fn parse_gas_limit(field: &str, input: &str) -> Result<u64, ConfigError> {
    let trimmed = input.trim();
    let limit = trimmed
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{}' is not a non-negative integer: {}", input, e),
        })?;
    if limit == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(limit)
}
