//! Transaction planning and unit conversions
//!
//! Every transaction this service signs starts with the same two-instruction
//! fee prelude: a compute-unit ceiling followed by a per-unit price. The
//! prelude must precede the instructions it prices, so [`plan`] owns the
//! ordering and callers only supply domain instructions.
//!
//! All value conversions (SOL to lamports, lamports to micro-lamports) live
//! here so every flow rounds the same way.

use solana_sdk::{
    compute_budget::ComputeBudgetInstruction, instruction::Instruction, native_token,
    pubkey::Pubkey,
};

/// Micro-lamports per lamport, the compute-unit price denomination
pub const MICRO_LAMPORTS_PER_LAMPORT: u64 = 1_000_000;

/// Compute-unit ceiling for a token creation transaction
pub const CREATE_UNIT_LIMIT: u32 = 250_000;

/// Compute-unit ceiling for a standalone buy or sell
pub const TRADE_UNIT_LIMIT: u32 = 120_000;

/// Compute-unit ceiling for a plain SOL transfer
pub const TRANSFER_UNIT_LIMIT: u32 = 10_000;

/// Base signature fee per transaction, in lamports
pub const SIGNATURE_FEE_LAMPORTS: u64 = 5_000;

/// Ordered instruction set for one transaction
///
/// Built fresh per operation and consumed by the submitter; never reused.
#[derive(Debug, Clone)]
pub struct TransactionPlan {
    /// Fee prelude followed by the domain instructions
    pub instructions: Vec<Instruction>,
    /// Account that pays the transaction fee
    pub fee_payer: Pubkey,
}

impl TransactionPlan {
    /// Number of instructions ahead of the domain instructions
    pub const FEE_PRELUDE_LEN: usize = 2;
}

/// Build a plan: two compute-budget instructions, then the domain
/// instructions in caller order
///
/// `unit_price_lamports` is the caller-facing fee rate in lamports per
/// compute unit; it is converted to the chain's micro-lamport denomination
/// here and nowhere else. No economic sanity check is applied.
pub fn plan(
    fee_payer: Pubkey,
    unit_limit: u32,
    unit_price_lamports: u64,
    domain_instructions: Vec<Instruction>,
) -> TransactionPlan {
    let mut instructions = Vec::with_capacity(TransactionPlan::FEE_PRELUDE_LEN + domain_instructions.len());
    instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(unit_limit));
    instructions.push(ComputeBudgetInstruction::set_compute_unit_price(
        lamports_to_micro_lamports(unit_price_lamports),
    ));
    instructions.extend(domain_instructions);
    TransactionPlan {
        instructions,
        fee_payer,
    }
}

/// Convert a lamport fee rate to micro-lamports per compute unit
pub fn lamports_to_micro_lamports(lamports: u64) -> u64 {
    lamports.saturating_mul(MICRO_LAMPORTS_PER_LAMPORT)
}

/// Convert a SOL amount to lamports
pub fn sol_to_lamports(sol: f64) -> u64 {
    native_token::sol_to_lamports(sol)
}

/// One whole token in base units, the reserve withheld from a full sell
pub fn one_token(decimals: u8) -> u64 {
    10u64.pow(decimals as u32)
}
