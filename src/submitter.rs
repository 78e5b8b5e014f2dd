//! Signing and dispatch
//!
//! Turns a [`TransactionPlan`] into a signed v0 transaction and hands it to
//! the ledger, or — for snipe and collect flows that need several
//! independently signed transactions to land together — to the bundle relay.
//! Any failure in the blockhash/sign/serialize/send chain surfaces as
//! `SubmissionFailed` with the cause attached; nothing is retried here.

use anyhow::Context;
use solana_sdk::{
    hash::Hash,
    message::{v0, VersionedMessage},
    signature::{Keypair, Signature},
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{LaunchError, LaunchResult};
use crate::planner::TransactionPlan;
use crate::rpc::{BundleRelay, LedgerRpc, Region};

/// Signs planned transactions and dispatches them, singly or as a bundle
pub struct Submitter {
    rpc: Arc<dyn LedgerRpc>,
    relay: Arc<dyn BundleRelay>,
}

impl Submitter {
    pub fn new(rpc: Arc<dyn LedgerRpc>, relay: Arc<dyn BundleRelay>) -> Self {
        Self { rpc, relay }
    }

    /// Sign a plan with all required signers and send it
    pub async fn submit(
        &self,
        plan: &TransactionPlan,
        signers: &[&Keypair],
    ) -> LaunchResult<Signature> {
        let blockhash = self
            .rpc
            .latest_blockhash()
            .await
            .map_err(LaunchError::submission)?;
        let tx = sign_plan(plan, signers, blockhash)?;
        let signature = self
            .rpc
            .send_transaction(&tx)
            .await
            .map_err(LaunchError::submission)?;
        info!(%signature, "Transaction submitted");
        Ok(signature)
    }

    /// Sign each plan with its own signer set and relay them atomically
    ///
    /// All transactions share one blockhash fetch. Returns the relay's
    /// opaque bundle id; per-transaction landing is not observable here.
    pub async fn submit_bundle(
        &self,
        plans: &[(TransactionPlan, Vec<&Keypair>)],
        region: Region,
    ) -> LaunchResult<String> {
        if plans.is_empty() {
            return Err(LaunchError::Validation("empty bundle".to_string()));
        }
        let blockhash = self
            .rpc
            .latest_blockhash()
            .await
            .map_err(LaunchError::submission)?;

        let mut txs = Vec::with_capacity(plans.len());
        for (plan, signers) in plans {
            txs.push(sign_plan(plan, signers, blockhash)?);
        }
        debug!(tx_count = txs.len(), ?region, "Submitting bundle");

        let bundle_id = self
            .relay
            .submit_bundle(&txs, region)
            .await
            .map_err(LaunchError::submission)?;
        info!(%bundle_id, ?region, "Bundle submitted");
        Ok(bundle_id)
    }
}

fn sign_plan(
    plan: &TransactionPlan,
    signers: &[&Keypair],
    blockhash: Hash,
) -> LaunchResult<VersionedTransaction> {
    let message = v0::Message::try_compile(&plan.fee_payer, &plan.instructions, &[], blockhash)
        .context("message compile failed")
        .map_err(LaunchError::submission)?;
    VersionedTransaction::try_new(VersionedMessage::V0(message), &signers.to_vec())
        .context("signing failed")
        .map_err(LaunchError::submission)
}
