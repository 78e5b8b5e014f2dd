//! Collaborator interfaces for chain access
//!
//! Two seams isolate the core from the network: [`LedgerRpc`] for reads and
//! single-transaction dispatch against a Solana RPC node, and [`BundleRelay`]
//! for atomic multi-transaction submission through a Jito block engine.
//! Orchestration code only ever sees the traits, so tests substitute
//! recording mocks for both.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::VersionedTransaction,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Raw token-account balance with its mint's decimal scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBalance {
    /// Balance in the token's smallest denomination
    pub amount: u64,
    /// Decimal places of the mint
    pub decimals: u8,
}

/// Read + single-dispatch interface against the ledger
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Lamport balance of a system account
    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64>;

    /// Fetch an account, `None` if it does not exist
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>>;

    /// Balance of an SPL token account; `None` if the account does not exist
    async fn get_token_balance(&self, token_account: &Pubkey) -> Result<Option<TokenBalance>>;

    /// A fresh blockhash for transaction construction
    async fn latest_blockhash(&self) -> Result<Hash>;

    /// Dispatch one signed transaction, returning its signature
    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature>;
}

/// `LedgerRpc` over the nonblocking Solana RPC client
pub struct SolanaRpc {
    client: RpcClient,
}

impl SolanaRpc {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: RpcClient::new_with_commitment(
                endpoint.into(),
                CommitmentConfig::confirmed(),
            ),
        }
    }
}

#[async_trait]
impl LedgerRpc for SolanaRpc {
    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64> {
        self.client
            .get_balance(pubkey)
            .await
            .with_context(|| format!("getBalance failed for {pubkey}"))
    }

    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>> {
        let response = self
            .client
            .get_account_with_commitment(pubkey, CommitmentConfig::confirmed())
            .await
            .with_context(|| format!("getAccountInfo failed for {pubkey}"))?;
        Ok(response.value)
    }

    async fn get_token_balance(&self, token_account: &Pubkey) -> Result<Option<TokenBalance>> {
        // A missing token account reads as "no holding"; transport and node
        // failures must surface as errors, not empty balances.
        match self.client.get_token_account_balance(token_account).await {
            Ok(ui) => {
                let amount = ui
                    .amount
                    .parse::<u64>()
                    .context("token balance amount is not a u64")?;
                Ok(Some(TokenBalance {
                    amount,
                    decimals: ui.decimals,
                }))
            }
            Err(e) if is_missing_account_message(&e.to_string()) => {
                debug!(account = %token_account, "Token account not found, treating as empty");
                Ok(None)
            }
            Err(e) => {
                Err(e).with_context(|| format!("getTokenAccountBalance failed for {token_account}"))
            }
        }
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        self.client
            .get_latest_blockhash()
            .await
            .context("getLatestBlockhash failed")
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature> {
        self.client
            .send_transaction(tx)
            .await
            .context("sendTransaction failed")
    }
}

/// Whether an RPC error message reports a nonexistent token account, as
/// opposed to a transport or node failure
fn is_missing_account_message(message: &str) -> bool {
    message.contains("could not find account") || message.contains("Invalid param")
}

/// Geographic block-engine region for bundle delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Ny,
    Amsterdam,
    Frankfurt,
    London,
    Tokyo,
    Slc,
}

impl Region {
    /// Block-engine base URL for this region
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Ny => "https://ny.mainnet.block-engine.jito.wtf",
            Self::Amsterdam => "https://amsterdam.mainnet.block-engine.jito.wtf",
            Self::Frankfurt => "https://frankfurt.mainnet.block-engine.jito.wtf",
            Self::London => "https://london.mainnet.block-engine.jito.wtf",
            Self::Tokyo => "https://tokyo.mainnet.block-engine.jito.wtf",
            Self::Slc => "https://slc.mainnet.block-engine.jito.wtf",
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::Ny
    }
}

impl FromStr for Region {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ny" | "newyork" => Ok(Self::Ny),
            "amsterdam" => Ok(Self::Amsterdam),
            "frankfurt" => Ok(Self::Frankfurt),
            "london" => Ok(Self::London),
            "tokyo" => Ok(Self::Tokyo),
            "slc" => Ok(Self::Slc),
            other => Err(anyhow!("unknown region: {other}")),
        }
    }
}

/// Tip accounts accepted by the Jito block engine
pub const TIP_ACCOUNTS: [&str; 8] = [
    "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5",
    "HFqU5x63VTqvQss8hp11i4wVV8bD44PvwucfZ2bU7gRe",
    "Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY",
    "ADaUMid9yfUytqMBgopwjb2DTLSokTSzL1zt6iGPaS49",
    "DfXygSm4jCyNCybVYYK6DwvWqjKee8pbDmJGcLWNDXjh",
    "ADuUkR4vqLUMWXxW9gh6D6L8pMSawimctcNZ5pGwDcEt",
    "DttWaMuVvTiduZRnguLF7jNxTgiMBZ1hyAumKUiL2KRL",
    "3AVi9Tg9Uo68tJfuvoKvqKNWKkC5wPdSSdeBnizKZ6jT",
];

/// Pick a tip account; index keeps the choice deterministic per bundle
pub fn tip_account(index: usize) -> Pubkey {
    Pubkey::from_str(TIP_ACCOUNTS[index % TIP_ACCOUNTS.len()]).expect("static tip account")
}

/// Atomic multi-transaction relay interface
#[async_trait]
pub trait BundleRelay: Send + Sync {
    /// Submit independently signed transactions for atomic inclusion
    ///
    /// Returns the relay's opaque bundle id. Per-transaction landing is not
    /// observable from this call; confirmation is a separate concern.
    async fn submit_bundle(
        &self,
        txs: &[VersionedTransaction],
        region: Region,
    ) -> Result<String>;
}

/// `BundleRelay` over the Jito block-engine JSON-RPC `sendBundle` method
pub struct JitoRelay {
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct SendBundleResponse {
    result: Option<String>,
    error: Option<serde_json::Value>,
}

impl JitoRelay {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for JitoRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BundleRelay for JitoRelay {
    async fn submit_bundle(
        &self,
        txs: &[VersionedTransaction],
        region: Region,
    ) -> Result<String> {
        let encoded: Vec<String> = txs
            .iter()
            .map(|tx| {
                bincode::serialize(tx)
                    .map(|bytes| BASE64.encode(bytes))
                    .context("failed to serialize bundle transaction")
            })
            .collect::<Result<_>>()?;

        let url = format!("{}/api/v1/bundles", region.endpoint());
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "sendBundle",
            "params": [encoded, {"encoding": "base64"}],
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("sendBundle request to {url} failed"))?;

        let status = response.status();
        let parsed: SendBundleResponse = response
            .json()
            .await
            .with_context(|| format!("sendBundle response from {url} was not JSON"))?;

        if let Some(err) = parsed.error {
            warn!(region = ?region, %status, "Block engine rejected bundle");
            return Err(anyhow!("block engine error: {err}"));
        }
        parsed
            .result
            .ok_or_else(|| anyhow!("block engine returned neither result nor error"))
    }
}
