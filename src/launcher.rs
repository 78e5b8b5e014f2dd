//! Launch orchestration
//!
//! Composes key resolution, the balance guard, the bonding-curve
//! idempotency probe, planning and submission into the token flows:
//! create, create-and-snipe, snipe, sell, transfer and collect.
//!
//! The idempotency probe runs synchronously, immediately before the plan is
//! built, to keep the probe-to-submit window small. The window cannot be
//! closed from here; a duplicate create that slips through fails at the
//! ledger, not in this service.

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::TokenCreationRequest;
use crate::errors::{LaunchError, LaunchResult};
use crate::keys;
use crate::planner::{
    self, TransactionPlan, CREATE_UNIT_LIMIT, SIGNATURE_FEE_LAMPORTS, TRADE_UNIT_LIMIT,
    TRANSFER_UNIT_LIMIT,
};
use crate::pump::{self, BondingCurveAccount};
use crate::rpc::{tip_account, LedgerRpc, Region};
use crate::submitter::Submitter;

/// Lamports withheld from a balance sweep to cover residual fees
pub const DUST_RESERVE_LAMPORTS: u64 = 1_000_000;

/// Terminal result of a creation flow
///
/// `AlreadyExists` is a normal outcome, not an error: the probe observed a
/// live bonding curve for the requested mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Token created via single submission
    Created { mint: Pubkey, signature: Signature },
    /// Token created inside an atomic bundle
    CreatedBundle { mint: Pubkey, bundle_id: String },
    /// A bonding curve already exists for this mint
    AlreadyExists { mint: Pubkey },
}

/// Terminal result of a sell flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SellOutcome {
    /// Holding was zero (or nothing above the reserve); no transaction built
    NoHolding,
    /// Sell submitted
    Sold(Signature),
}

/// Resolved multi-wallet buy-in: signing identities paired 1:1 with
/// lamport buy amounts
#[derive(Debug)]
pub struct SnipeSet {
    entries: Vec<(Keypair, u64)>,
}

impl SnipeSet {
    /// Validate lengths and resolve every wallet spec
    ///
    /// The length check runs before any key material is touched, so a
    /// malformed request never reaches signing.
    pub fn resolve(wallet_specs: &[String], amounts_sol: &[f64]) -> LaunchResult<Self> {
        if wallet_specs.len() != amounts_sol.len() {
            return Err(LaunchError::Validation(format!(
                "snipe arrays differ in length: {} wallets, {} amounts",
                wallet_specs.len(),
                amounts_sol.len()
            )));
        }
        if wallet_specs.is_empty() {
            return Err(LaunchError::Validation("empty snipe set".to_string()));
        }
        let mut entries = Vec::with_capacity(wallet_specs.len());
        for (spec, amount) in wallet_specs.iter().zip(amounts_sol) {
            entries.push((keys::resolve_wallet(spec)?, planner::sol_to_lamports(*amount)));
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Orchestrates the launch flows over the collaborator seams
pub struct LaunchOrchestrator {
    rpc: Arc<dyn LedgerRpc>,
    submitter: Submitter,
}

impl LaunchOrchestrator {
    pub fn new(rpc: Arc<dyn LedgerRpc>, submitter: Submitter) -> Self {
        Self { rpc, submitter }
    }

    /// Balance guard: abort before any plan is built if the wallet holds
    /// exactly zero lamports
    async fn check_funded(&self, wallet: &Pubkey) -> LaunchResult<()> {
        let balance = self
            .rpc
            .get_balance(wallet)
            .await
            .map_err(LaunchError::rpc)?;
        if balance == 0 {
            return Err(LaunchError::InsufficientFunds { wallet: *wallet });
        }
        Ok(())
    }

    /// Idempotency probe: `Some(curve)` means the token already exists
    async fn probe_curve(&self, mint: &Pubkey) -> LaunchResult<Option<BondingCurveAccount>> {
        let curve_address = pump::find_bonding_curve(mint);
        let account = self
            .rpc
            .get_account(&curve_address)
            .await
            .map_err(LaunchError::rpc)?;
        match account {
            Some(account) => Ok(Some(BondingCurveAccount::decode(&account.data)?)),
            None => Ok(None),
        }
    }

    /// Creation instruction set: create, plus the dev buy when requested
    fn creation_instructions(
        &self,
        request: &TokenCreationRequest,
        metadata_uri: &str,
        creator: &Pubkey,
        mint: &Pubkey,
    ) -> Vec<solana_sdk::instruction::Instruction> {
        let mut instructions = vec![pump::create_instruction(
            mint,
            creator,
            &request.metadata.name,
            &request.metadata.symbol,
            metadata_uri,
        )];
        let buy_lamports = planner::sol_to_lamports(request.buy_amount_sol);
        if buy_lamports > 0 {
            let curve = BondingCurveAccount::initial();
            let min_tokens_out =
                pump::apply_slippage(curve.tokens_out(buy_lamports), request.slippage_bps);
            instructions.push(create_associated_token_account_idempotent(
                creator,
                creator,
                mint,
                &spl_token::id(),
            ));
            // The dev buy lands in the create transaction, so the creator
            // vault belongs to the creator itself.
            instructions.push(pump::buy_instruction(
                mint,
                creator,
                creator,
                min_tokens_out,
                buy_lamports,
            ));
        }
        instructions
    }

    /// Create a token and place the dev buy in the same transaction
    ///
    /// State machine: resolve keys, balance guard, idempotency probe, plan,
    /// submit. `AlreadyExists` short-circuits after the probe.
    #[instrument(skip_all, fields(symbol = %request.metadata.symbol))]
    pub async fn create_token(
        &self,
        request: &TokenCreationRequest,
        metadata_uri: &str,
    ) -> LaunchResult<LaunchOutcome> {
        let creator = keys::resolve_wallet(&request.wallet)?;
        let mint = keys::resolve_mint(&request.mint)?;

        self.check_funded(&creator.pubkey()).await?;

        if self.probe_curve(&mint.pubkey()).await?.is_some() {
            info!(mint = %mint.pubkey(), "Token already exists, skipping creation");
            return Ok(LaunchOutcome::AlreadyExists {
                mint: mint.pubkey(),
            });
        }

        let instructions =
            self.creation_instructions(request, metadata_uri, &creator.pubkey(), &mint.pubkey());
        let plan = planner::plan(
            creator.pubkey(),
            CREATE_UNIT_LIMIT,
            request.priority_fee,
            instructions,
        );
        let signature = self.submitter.submit(&plan, &[&creator, &mint]).await?;
        info!(mint = %mint.pubkey(), %signature, "Token created");
        Ok(LaunchOutcome::Created {
            mint: mint.pubkey(),
            signature,
        })
    }

    /// Create a token and buy in from every snipe wallet atomically
    ///
    /// The create transaction (with dev buy and relay tip) goes first in
    /// the bundle, one buy transaction per snipe wallet after it.
    #[instrument(skip_all, fields(symbol = %request.metadata.symbol, wallets = snipe.len()))]
    pub async fn create_and_snipe(
        &self,
        request: &TokenCreationRequest,
        metadata_uri: &str,
        snipe: &SnipeSet,
        region: Region,
    ) -> LaunchResult<LaunchOutcome> {
        let creator = keys::resolve_wallet(&request.wallet)?;
        let mint = keys::resolve_mint(&request.mint)?;

        self.check_funded(&creator.pubkey()).await?;
        for (wallet, _) in &snipe.entries {
            self.check_funded(&wallet.pubkey()).await?;
        }

        if self.probe_curve(&mint.pubkey()).await?.is_some() {
            info!(mint = %mint.pubkey(), "Token already exists, skipping creation");
            return Ok(LaunchOutcome::AlreadyExists {
                mint: mint.pubkey(),
            });
        }

        let mut instructions =
            self.creation_instructions(request, metadata_uri, &creator.pubkey(), &mint.pubkey());
        let tip_lamports = planner::sol_to_lamports(request.tip_sol);
        if tip_lamports > 0 {
            instructions.push(system_instruction::transfer(
                &creator.pubkey(),
                &tip_account(0),
                tip_lamports,
            ));
        }
        let create_plan = planner::plan(
            creator.pubkey(),
            CREATE_UNIT_LIMIT,
            request.priority_fee,
            instructions,
        );

        // Quote each snipe buy against the curve state predicted after the
        // buys ahead of it in the bundle.
        let dev_buy = planner::sol_to_lamports(request.buy_amount_sol);
        let mut curve = BondingCurveAccount::initial();
        curve = curve.after_buy(dev_buy, curve.tokens_out(dev_buy));

        let mut plans: Vec<(TransactionPlan, Vec<&Keypair>)> =
            vec![(create_plan, vec![&creator, &mint])];
        for (wallet, lamports) in &snipe.entries {
            let tokens_out = curve.tokens_out(*lamports);
            let min_tokens_out = pump::apply_slippage(tokens_out, request.slippage_bps);
            let buy_plan = planner::plan(
                wallet.pubkey(),
                TRADE_UNIT_LIMIT,
                request.priority_fee,
                vec![
                    create_associated_token_account_idempotent(
                        &wallet.pubkey(),
                        &wallet.pubkey(),
                        &mint.pubkey(),
                        &spl_token::id(),
                    ),
                    pump::buy_instruction(
                        &mint.pubkey(),
                        &wallet.pubkey(),
                        &creator.pubkey(),
                        min_tokens_out,
                        *lamports,
                    ),
                ],
            );
            plans.push((buy_plan, vec![wallet]));
            curve = curve.after_buy(*lamports, tokens_out);
        }

        let bundle_id = self.submitter.submit_bundle(&plans, region).await?;
        info!(mint = %mint.pubkey(), %bundle_id, "Create-and-snipe bundle submitted");
        Ok(LaunchOutcome::CreatedBundle {
            mint: mint.pubkey(),
            bundle_id,
        })
    }

    /// Buy into an existing token from every snipe wallet atomically
    ///
    /// The token is assumed to exist; the curve read here feeds the quotes
    /// and the creator-vault derivation, it is not an idempotency gate.
    #[instrument(skip_all, fields(%mint, wallets = snipe.len()))]
    pub async fn snipe(
        &self,
        mint: Pubkey,
        snipe: &SnipeSet,
        slippage_bps: u16,
        priority_fee: u64,
        tip_sol: f64,
        region: Region,
    ) -> LaunchResult<String> {
        let mut curve = self.probe_curve(&mint).await?.ok_or_else(|| {
            LaunchError::Validation(format!("no bonding curve for mint {mint}"))
        })?;
        for (wallet, _) in &snipe.entries {
            self.check_funded(&wallet.pubkey()).await?;
        }

        let tip_lamports = planner::sol_to_lamports(tip_sol);
        let mut plans: Vec<(TransactionPlan, Vec<&Keypair>)> = Vec::with_capacity(snipe.len());
        let last = snipe.entries.len() - 1;
        for (index, (wallet, lamports)) in snipe.entries.iter().enumerate() {
            let tokens_out = curve.tokens_out(*lamports);
            let min_tokens_out = pump::apply_slippage(tokens_out, slippage_bps);
            let mut instructions = vec![
                create_associated_token_account_idempotent(
                    &wallet.pubkey(),
                    &wallet.pubkey(),
                    &mint,
                    &spl_token::id(),
                ),
                pump::buy_instruction(
                    &mint,
                    &wallet.pubkey(),
                    &curve.creator,
                    min_tokens_out,
                    *lamports,
                ),
            ];
            // The bundle pays its tip from the final transaction.
            if index == last && tip_lamports > 0 {
                instructions.push(system_instruction::transfer(
                    &wallet.pubkey(),
                    &tip_account(0),
                    tip_lamports,
                ));
            }
            plans.push((
                planner::plan(wallet.pubkey(), TRADE_UNIT_LIMIT, priority_fee, instructions),
                vec![wallet],
            ));
            curve = curve.after_buy(*lamports, tokens_out);
        }

        let bundle_id = self.submitter.submit_bundle(&plans, region).await?;
        info!(%mint, %bundle_id, "Snipe bundle submitted");
        Ok(bundle_id)
    }

    /// Sell a wallet's holding, keeping a one-token reserve
    ///
    /// A zero holding is a no-op: no instruction is built and the submitter
    /// is never invoked.
    #[instrument(skip_all, fields(%mint))]
    pub async fn sell(
        &self,
        wallet_spec: &str,
        mint: Pubkey,
        slippage_bps: u16,
        priority_fee: u64,
    ) -> LaunchResult<SellOutcome> {
        let wallet = keys::resolve_wallet(wallet_spec)?;
        let token_account = get_associated_token_address(&wallet.pubkey(), &mint);
        let holding = self
            .rpc
            .get_token_balance(&token_account)
            .await
            .map_err(LaunchError::rpc)?;

        let Some(holding) = holding else {
            info!(wallet = %wallet.pubkey(), "No token account, nothing to sell");
            return Ok(SellOutcome::NoHolding);
        };
        if holding.amount == 0 {
            info!(wallet = %wallet.pubkey(), "Zero holding, nothing to sell");
            return Ok(SellOutcome::NoHolding);
        }

        let sellable = holding
            .amount
            .saturating_sub(planner::one_token(holding.decimals));
        if sellable == 0 {
            info!(wallet = %wallet.pubkey(), "Holding within reserve, nothing to sell");
            return Ok(SellOutcome::NoHolding);
        }

        let curve = self.probe_curve(&mint).await?.ok_or_else(|| {
            LaunchError::Validation(format!("no bonding curve for mint {mint}"))
        })?;
        let min_sol_output = pump::apply_slippage(curve.sol_out(sellable), slippage_bps);
        let plan = planner::plan(
            wallet.pubkey(),
            TRADE_UNIT_LIMIT,
            priority_fee,
            vec![pump::sell_instruction(
                &mint,
                &wallet.pubkey(),
                &curve.creator,
                sellable,
                min_sol_output,
            )],
        );
        let signature = self.submitter.submit(&plan, &[&wallet]).await?;
        info!(%mint, %signature, amount = sellable, "Holding sold");
        Ok(SellOutcome::Sold(signature))
    }

    /// Transfer a caller-specified SOL amount between wallets
    #[instrument(skip_all, fields(%to))]
    pub async fn transfer(
        &self,
        from_spec: &str,
        to: Pubkey,
        amount_sol: f64,
        priority_fee: u64,
        tip_sol: f64,
        region: Region,
    ) -> LaunchResult<String> {
        let from = keys::resolve_wallet(from_spec)?;
        self.check_funded(&from.pubkey()).await?;

        let lamports = planner::sol_to_lamports(amount_sol);
        let mut instructions = vec![system_instruction::transfer(&from.pubkey(), &to, lamports)];
        let tip_lamports = planner::sol_to_lamports(tip_sol);
        if tip_lamports > 0 {
            instructions.push(system_instruction::transfer(
                &from.pubkey(),
                &tip_account(0),
                tip_lamports,
            ));
        }
        let plan = planner::plan(from.pubkey(), TRANSFER_UNIT_LIMIT, priority_fee, instructions);
        let bundle_id = self
            .submitter
            .submit_bundle(&[(plan, vec![&from])], region)
            .await?;
        info!(from = %from.pubkey(), %to, lamports, %bundle_id, "Transfer submitted");
        Ok(bundle_id)
    }

    /// Sweep each source wallet into `to`, withholding the signature fee
    /// and a fixed dust reserve
    #[instrument(skip_all, fields(%to, wallets = from_specs.len()))]
    pub async fn collect(
        &self,
        from_specs: &[String],
        to: Pubkey,
        priority_fee: u64,
        tip_sol: f64,
        region: Region,
    ) -> LaunchResult<String> {
        if from_specs.is_empty() {
            return Err(LaunchError::Validation("no wallets to collect".to_string()));
        }
        let mut wallets = Vec::with_capacity(from_specs.len());
        for spec in from_specs {
            wallets.push(keys::resolve_wallet(spec)?);
        }

        let tip_lamports = planner::sol_to_lamports(tip_sol);
        let mut plans: Vec<(TransactionPlan, Vec<&Keypair>)> = Vec::new();
        for wallet in &wallets {
            let balance = self
                .rpc
                .get_balance(&wallet.pubkey())
                .await
                .map_err(LaunchError::rpc)?;
            let sweep = balance
                .saturating_sub(SIGNATURE_FEE_LAMPORTS)
                .saturating_sub(DUST_RESERVE_LAMPORTS);
            if sweep == 0 {
                warn!(wallet = %wallet.pubkey(), balance, "Nothing to sweep, skipping wallet");
                continue;
            }
            plans.push((
                planner::plan(
                    wallet.pubkey(),
                    TRANSFER_UNIT_LIMIT,
                    priority_fee,
                    vec![system_instruction::transfer(&wallet.pubkey(), &to, sweep)],
                ),
                vec![wallet],
            ));
        }
        if plans.is_empty() {
            return Err(LaunchError::Validation(
                "no wallet held enough to sweep".to_string(),
            ));
        }
        if tip_lamports > 0 {
            let (last_plan, _) = plans.last_mut().expect("non-empty plans");
            let payer = last_plan.fee_payer;
            last_plan.instructions.push(system_instruction::transfer(
                &payer,
                &tip_account(0),
                tip_lamports,
            ));
        }

        let bundle_id = self.submitter.submit_bundle(&plans, region).await?;
        info!(%to, swept = plans.len(), %bundle_id, "Collect bundle submitted");
        Ok(bundle_id)
    }
}
