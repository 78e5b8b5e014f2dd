//! Error taxonomy for the launch service
//!
//! One typed error covers the whole request lifecycle: key resolution,
//! balance/idempotency probes, planning, signing and submission. Errors carry
//! the relevant public key where one exists so a failed job's terminal state
//! is diagnosable without replaying the request.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Error type for all launch, snipe, sell and transfer operations
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The supplied key specification matched none of the accepted encodings
    ///
    /// Accepted shapes: the literal `"random"` (mint specs only), an
    /// 87-character base58 secret key, or a bracketed byte list.
    #[error("Invalid key spec: {0}")]
    InvalidKeySpec(String),

    /// The funding wallet holds exactly zero lamports
    ///
    /// Low-but-nonzero balances are not rejected here; an underfunded
    /// submission surfaces as `SubmissionFailed` instead.
    #[error("Wallet {wallet} holds zero SOL")]
    InsufficientFunds {
        /// Public key of the unfunded wallet
        wallet: Pubkey,
    },

    /// Malformed request (missing image, mismatched snipe arrays, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A read against chain state failed (balance, account, blockhash)
    #[error("RPC error: {0}")]
    Rpc(#[source] anyhow::Error),

    /// Signing, serialization or dispatch failed
    ///
    /// Wraps the underlying RPC/relay error. Never retried by the core;
    /// retry policy belongs to whoever drives the queue.
    #[error("Submission failed: {0}")]
    SubmissionFailed(#[source] anyhow::Error),
}

impl LaunchError {
    /// Error category for log fields
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidKeySpec(_) => "keys",
            Self::InsufficientFunds { .. } => "funds",
            Self::Validation(_) => "validation",
            Self::Rpc(_) => "rpc",
            Self::SubmissionFailed(_) => "submission",
        }
    }

    /// Whether a supervising loop could reasonably retry the operation
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rpc(_) | Self::SubmissionFailed(_) => true,
            Self::InvalidKeySpec(_) | Self::InsufficientFunds { .. } | Self::Validation(_) => false,
        }
    }

    /// Create an RPC error with context
    pub fn rpc(err: impl Into<anyhow::Error>) -> Self {
        Self::Rpc(err.into())
    }

    /// Create a submission error with the underlying cause attached
    pub fn submission(err: impl Into<anyhow::Error>) -> Self {
        Self::SubmissionFailed(err.into())
    }
}

/// Result alias used throughout the crate
pub type LaunchResult<T> = std::result::Result<T, LaunchError>;
