//! Deterministic transaction signing.
//!
//! ECDSA nonces follow RFC 6979, so the same descriptor and key always give
//! the same bytes and the same hash. No I/O happens here.

use crate::error::RaceError;
use crate::types::{SignedPayload, TransactionDescriptor};
use core_logic::WalletError;
use ethers::core::k256::ecdsa::SigningKey;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256};
use ethers::utils::{keccak256, secret_key_to_address};
use std::fmt;
use zeroize::Zeroizing;

/// A 32-byte secp256k1 secret, wiped from memory on drop.
#[derive(Clone)]
pub struct PrivateKey {
    secret: Zeroizing<[u8; 32]>,
    address: Address,
}

impl PrivateKey {
    /// Parse a hex secret, with or without the `0x` prefix.
    pub fn from_hex(input: &str) -> Result<Self, WalletError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = Zeroizing::new(hex::decode(digits).map_err(|_| WalletError::InvalidKeyFormat)?);
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        let signing_key = signing_key(bytes)?;
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(bytes);

        Ok(Self {
            secret,
            address: secret_key_to_address(&signing_key),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.secret[..]
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

fn signing_key(bytes: &[u8]) -> Result<SigningKey, WalletError> {
    if bytes.len() != 32 {
        return Err(WalletError::InvalidKeyLength {
            length: bytes.len(),
        });
    }
    SigningKey::from_slice(bytes).map_err(|_| WalletError::InvalidSecret)
}

/// Address controlled by `key`.
pub fn address_of(key: &[u8]) -> Result<Address, RaceError> {
    Ok(secret_key_to_address(&signing_key(key)?))
}

/// Sign `descriptor` with `key` into a legacy EIP-155 transaction.
pub fn sign(descriptor: &TransactionDescriptor, key: &[u8]) -> Result<SignedPayload, RaceError> {
    let wallet = LocalWallet::from(signing_key(key)?).with_chain_id(descriptor.chain_id);

    if descriptor.chain_id == 0 {
        return Err(RaceError::invalid_descriptor(
            "chainId",
            "chain id 0 cannot be signed with replay protection",
        ));
    }
    if wallet.address() != descriptor.sender {
        return Err(RaceError::invalid_descriptor(
            "sender",
            format!(
                "{:?} is not the address of the signing key ({:?})",
                descriptor.sender,
                wallet.address()
            ),
        ));
    }

    let tx = descriptor.to_typed_transaction();
    let signature = wallet
        .sign_transaction_sync(&tx)
        .map_err(|e| RaceError::invalid_descriptor("signature", e.to_string()))?;

    let raw = tx.rlp_signed(&signature);
    let tx_hash = H256::from(keccak256(&raw));

    Ok(SignedPayload::new(raw, descriptor.clone(), tx_hash))
}
