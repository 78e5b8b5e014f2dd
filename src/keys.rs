//! Key specification decoding
//!
//! Key material reaches the service from three independent sources:
//! interactive generation (`"random"`), copy-pasted base58 secrets, and raw
//! byte-array exports from wallet tooling. [`KeySpec::parse`] normalizes all
//! three into a tagged variant before any signing key is constructed; every
//! other shape is rejected with [`LaunchError::InvalidKeySpec`].

use solana_sdk::signature::Keypair;

use crate::errors::{LaunchError, LaunchResult};

/// Length of a base58-encoded 64-byte secret key
const BASE58_SECRET_LEN: usize = 87;

/// Length of an ed25519 secret key in bytes
const SECRET_KEY_BYTES: usize = 64;

/// One of the accepted key-material encodings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySpec {
    /// Freshly generated identity (valid for mint specs only)
    Random,
    /// Base58-encoded 64-byte secret key
    Base58(String),
    /// Raw byte-array export, e.g. `[12,45,...]`
    ByteArray(Vec<u8>),
}

impl KeySpec {
    /// Decode a raw spec string into its tagged variant
    ///
    /// Variants are tried in precedence order: the `"random"` literal, the
    /// fixed-length base58 shape, then the bracketed byte list. Anything
    /// else fails with `InvalidKeySpec`.
    pub fn parse(raw: &str) -> LaunchResult<Self> {
        let raw = raw.trim();
        if raw == "random" {
            return Ok(Self::Random);
        }
        if raw.len() == BASE58_SECRET_LEN {
            return Ok(Self::Base58(raw.to_string()));
        }
        if raw.starts_with('[') && raw.ends_with(']') {
            let inner = &raw[1..raw.len() - 1];
            let bytes = inner
                .split(',')
                .map(|elem| {
                    elem.trim().parse::<u8>().map_err(|_| {
                        LaunchError::InvalidKeySpec(format!(
                            "byte list element {:?} is not in 0..=255",
                            elem.trim()
                        ))
                    })
                })
                .collect::<LaunchResult<Vec<u8>>>()?;
            if bytes.len() != SECRET_KEY_BYTES {
                return Err(LaunchError::InvalidKeySpec(format!(
                    "byte list has {} elements, expected {}",
                    bytes.len(),
                    SECRET_KEY_BYTES
                )));
            }
            return Ok(Self::ByteArray(bytes));
        }
        Err(LaunchError::InvalidKeySpec(format!(
            "unrecognized key spec shape (len={})",
            raw.len()
        )))
    }

    /// Materialize the signing keypair for this spec
    pub fn resolve(&self) -> LaunchResult<Keypair> {
        match self {
            Self::Random => Ok(Keypair::new()),
            Self::Base58(encoded) => {
                let bytes = bs58::decode(encoded).into_vec().map_err(|e| {
                    LaunchError::InvalidKeySpec(format!("base58 decode failed: {e}"))
                })?;
                keypair_from_bytes(&bytes)
            }
            Self::ByteArray(bytes) => keypair_from_bytes(bytes),
        }
    }
}

fn keypair_from_bytes(bytes: &[u8]) -> LaunchResult<Keypair> {
    if bytes.len() != SECRET_KEY_BYTES {
        return Err(LaunchError::InvalidKeySpec(format!(
            "secret key is {} bytes, expected {}",
            bytes.len(),
            SECRET_KEY_BYTES
        )));
    }
    if bytes.iter().all(|&b| b == 0) {
        return Err(LaunchError::InvalidKeySpec(
            "all-zero secret key rejected".to_string(),
        ));
    }
    Keypair::try_from(bytes)
        .map_err(|e| LaunchError::InvalidKeySpec(format!("invalid secret key bytes: {e}")))
}

/// Resolve a funding-wallet spec; `"random"` is not a valid wallet
pub fn resolve_wallet(raw: &str) -> LaunchResult<Keypair> {
    match KeySpec::parse(raw)? {
        KeySpec::Random => Err(LaunchError::InvalidKeySpec(
            "\"random\" is not valid for wallet specs".to_string(),
        )),
        spec => spec.resolve(),
    }
}

/// Resolve a mint spec; `"random"` generates a fresh mint identity
pub fn resolve_mint(raw: &str) -> LaunchResult<Keypair> {
    KeySpec::parse(raw)?.resolve()
}
