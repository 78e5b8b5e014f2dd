//! Launch configuration and request types
//!
//! A [`LaunchConfig`] is loaded from TOML and turned into the immutable
//! [`TokenCreationRequest`] that travels through the queue. All settings are
//! per-request; the service keeps no process-wide configuration state.

use serde::{Deserialize, Serialize};

use crate::rpc::Region;

/// Token metadata attached to a creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

/// Image blob accompanying the metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageBlob {
    /// Raw file contents
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `image/png`
    pub mime_type: String,
}

/// Immutable creation request; frozen once enqueued
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCreationRequest {
    pub metadata: TokenMetadata,
    pub image: ImageBlob,
    /// Funding wallet key spec (base58 or byte list)
    pub wallet: String,
    /// Mint key spec (`"random"`, base58 or byte list)
    pub mint: String,
    /// Dev buy placed in the creation transaction, in SOL
    pub buy_amount_sol: f64,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,
    /// Priority fee in lamports per compute unit
    #[serde(default = "default_priority_fee")]
    pub priority_fee: u64,
    /// Relay tip in SOL, paid when the create goes out as a bundle
    #[serde(default = "default_tip_sol")]
    pub tip_sol: f64,
}

/// Parallel wallet/amount arrays for a multi-wallet buy-in
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SnipeConfig {
    /// Key specs of the sniping wallets
    #[serde(default)]
    pub wallets: Vec<String>,
    /// Buy amount in SOL per wallet, matched 1:1 by position
    #[serde(default)]
    pub amounts_sol: Vec<f64>,
    /// Block-engine delivery region
    #[serde(default)]
    pub region: Region,
}

/// Top-level TOML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// RPC endpoint URL
    pub rpc_url: String,
    pub metadata: TokenMetadata,
    /// Path to the token image file
    pub image_path: String,
    pub wallet: String,
    #[serde(default = "default_mint_spec")]
    pub mint: String,
    pub buy_amount_sol: f64,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,
    /// Priority fee in lamports per compute unit
    #[serde(default = "default_priority_fee")]
    pub priority_fee: u64,
    #[serde(default = "default_tip_sol")]
    pub tip_sol: f64,
    #[serde(default)]
    pub snipe: SnipeConfig,
}

fn default_mint_spec() -> String {
    "random".to_string()
}
fn default_slippage_bps() -> u16 {
    100
}
// Priority fees are denominated in lamports per compute unit, not
// micro-lamports; 1 lamport/CU already prices a 250k-CU create at 0.25 SOL.
fn default_priority_fee() -> u64 {
    1
}
fn default_tip_sol() -> f64 {
    0.001
}

impl LaunchConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LaunchConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Assemble the immutable request, attaching the image blob
    pub fn into_request(self, image: ImageBlob) -> TokenCreationRequest {
        TokenCreationRequest {
            metadata: self.metadata,
            image,
            wallet: self.wallet,
            mint: self.mint,
            buy_amount_sol: self.buy_amount_sol,
            slippage_bps: self.slippage_bps,
            priority_fee: self.priority_fee,
            tip_sol: self.tip_sol,
        }
    }
}
