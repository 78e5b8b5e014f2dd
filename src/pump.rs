//! pump.fun program interface
//!
//! Instruction builders, PDA derivations and account decoding for the
//! bonding-curve program. Instruction data follows the Anchor wire format:
//! an 8-byte method discriminator followed by borsh-encoded arguments.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};
use spl_associated_token_account::get_associated_token_address;
use std::str::FromStr;

use crate::errors::{LaunchError, LaunchResult};

/// pump.fun bonding-curve program
pub const PUMP_PROGRAM_ID: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";
/// Global config account
pub const PUMP_GLOBAL: &str = "4wTV1YmiEkRvAtNtsSGPtUrqRYQMe5SKy2uB4Jjaxnjf";
/// Protocol fee recipient
pub const PUMP_FEE_RECIPIENT: &str = "CebN5WGQ4jvEPvsVU4EoHEpgzq1VV7AbicfhtW4xC9iM";
/// Mint authority PDA owned by the program
pub const PUMP_MINT_AUTHORITY: &str = "TSLvdd1pWpHVjahSpsvCXUbgwsL3JAcvokwaKt1eokM";
/// Metaplex token-metadata program
pub const METAPLEX_PROGRAM_ID: &str = "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s";

/// Virtual reserves of a freshly initialized curve, used to quote the
/// create-and-buy where no curve account exists yet
pub const INITIAL_VIRTUAL_SOL_RESERVES: u64 = 30_000_000_000;
pub const INITIAL_VIRTUAL_TOKEN_RESERVES: u64 = 1_073_000_000_000_000;

const CREATE_DISCRIMINATOR: [u8; 8] = [24, 30, 200, 40, 5, 28, 7, 119];
const BUY_DISCRIMINATOR: [u8; 8] = [102, 6, 61, 18, 1, 218, 235, 234];
const SELL_DISCRIMINATOR: [u8; 8] = [51, 230, 133, 164, 1, 127, 131, 173];

pub fn program_id() -> Pubkey {
    Pubkey::from_str(PUMP_PROGRAM_ID).expect("static program id")
}

pub fn global() -> Pubkey {
    Pubkey::from_str(PUMP_GLOBAL).expect("static global account")
}

pub fn fee_recipient() -> Pubkey {
    Pubkey::from_str(PUMP_FEE_RECIPIENT).expect("static fee recipient")
}

pub fn mint_authority() -> Pubkey {
    Pubkey::from_str(PUMP_MINT_AUTHORITY).expect("static mint authority")
}

/// Bonding-curve PDA for a mint; presence of this account is the
/// "token already exists" signal
pub fn find_bonding_curve(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"bonding-curve", mint.as_ref()], &program_id()).0
}

/// Creator-vault PDA that accrues the creator's share of trading fees
pub fn find_creator_vault(creator: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"creator-vault", creator.as_ref()], &program_id()).0
}

/// Event-authority PDA required by every instruction
pub fn find_event_authority() -> Pubkey {
    Pubkey::find_program_address(&[b"__event_authority"], &program_id()).0
}

/// Metaplex metadata PDA for a mint
pub fn find_metadata(mint: &Pubkey) -> Pubkey {
    let metaplex = Pubkey::from_str(METAPLEX_PROGRAM_ID).expect("static metaplex id");
    Pubkey::find_program_address(
        &[b"metadata", metaplex.as_ref(), mint.as_ref()],
        &metaplex,
    )
    .0
}

/// Decoded bonding-curve account state
///
/// Presence of this account means the token exists; the reserve fields feed
/// the buy/sell quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondingCurveAccount {
    pub virtual_token_reserves: u64,
    pub virtual_sol_reserves: u64,
    pub real_token_reserves: u64,
    pub real_sol_reserves: u64,
    pub token_total_supply: u64,
    pub complete: bool,
    pub creator: Pubkey,
}

impl BondingCurveAccount {
    /// Virtual reserves of a curve that has not been created yet
    pub fn initial() -> Self {
        Self {
            virtual_token_reserves: INITIAL_VIRTUAL_TOKEN_RESERVES,
            virtual_sol_reserves: INITIAL_VIRTUAL_SOL_RESERVES,
            real_token_reserves: 0,
            real_sol_reserves: 0,
            token_total_supply: 0,
            complete: false,
            creator: Pubkey::default(),
        }
    }

    /// Decode from raw account data (8-byte discriminator, then fields)
    pub fn decode(data: &[u8]) -> LaunchResult<Self> {
        if data.len() < 81 {
            return Err(LaunchError::Validation(format!(
                "bonding curve account too short: {} bytes",
                data.len()
            )));
        }
        let u64_at = |offset: usize| {
            u64::from_le_bytes(data[offset..offset + 8].try_into().expect("8-byte slice"))
        };
        let creator =
            Pubkey::try_from(&data[49..81]).expect("32-byte slice");
        Ok(Self {
            virtual_token_reserves: u64_at(8),
            virtual_sol_reserves: u64_at(16),
            real_token_reserves: u64_at(24),
            real_sol_reserves: u64_at(32),
            token_total_supply: u64_at(40),
            complete: data[48] != 0,
            creator,
        })
    }

    /// Tokens received for `sol_in` lamports on the constant-product curve
    pub fn tokens_out(&self, sol_in: u64) -> u64 {
        quote_tokens_out(sol_in, self.virtual_sol_reserves, self.virtual_token_reserves)
    }

    /// SOL received for selling `tokens_in` base units
    pub fn sol_out(&self, tokens_in: u64) -> u64 {
        quote_sol_out(tokens_in, self.virtual_sol_reserves, self.virtual_token_reserves)
    }

    /// Predicted reserves after a buy, used to quote the next wallet in a
    /// bundle where earlier buys have not landed yet
    pub fn after_buy(&self, sol_in: u64, tokens_out: u64) -> Self {
        Self {
            virtual_sol_reserves: self.virtual_sol_reserves.saturating_add(sol_in),
            virtual_token_reserves: self.virtual_token_reserves.saturating_sub(tokens_out),
            ..*self
        }
    }
}

/// Constant-product quote: tokens out for a SOL input against the given
/// virtual reserves
pub fn quote_tokens_out(sol_in: u64, virtual_sol: u64, virtual_token: u64) -> u64 {
    if sol_in == 0 || virtual_sol == 0 || virtual_token == 0 {
        return 0;
    }
    let k = virtual_sol as u128 * virtual_token as u128;
    let new_sol = virtual_sol as u128 + sol_in as u128;
    let new_token = k / new_sol;
    (virtual_token as u128).saturating_sub(new_token) as u64
}

/// Constant-product quote: SOL out for a token input against the given
/// virtual reserves
pub fn quote_sol_out(tokens_in: u64, virtual_sol: u64, virtual_token: u64) -> u64 {
    if tokens_in == 0 || virtual_sol == 0 || virtual_token == 0 {
        return 0;
    }
    let k = virtual_sol as u128 * virtual_token as u128;
    let new_token = virtual_token as u128 + tokens_in as u128;
    let new_sol = k / new_token;
    (virtual_sol as u128).saturating_sub(new_sol) as u64
}

/// Apply a downward slippage tolerance to a quoted amount
pub fn apply_slippage(amount: u64, slippage_bps: u16) -> u64 {
    let bps = (slippage_bps as u128).min(10_000);
    (amount as u128 * (10_000 - bps) / 10_000) as u64
}

fn borsh_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// Build the `create` instruction for a new token
///
/// `uri` is the hosted metadata JSON (name/symbol/description/image)
/// produced by the IPFS upload.
pub fn create_instruction(
    mint: &Pubkey,
    creator: &Pubkey,
    name: &str,
    symbol: &str,
    uri: &str,
) -> Instruction {
    let bonding_curve = find_bonding_curve(mint);
    let curve_token_account = get_associated_token_address(&bonding_curve, mint);
    let metaplex = Pubkey::from_str(METAPLEX_PROGRAM_ID).expect("static metaplex id");

    let mut data = Vec::from(CREATE_DISCRIMINATOR);
    borsh_string(&mut data, name);
    borsh_string(&mut data, symbol);
    borsh_string(&mut data, uri);
    data.extend_from_slice(creator.as_ref());

    Instruction {
        program_id: program_id(),
        accounts: vec![
            AccountMeta::new(*mint, true),
            AccountMeta::new_readonly(mint_authority(), false),
            AccountMeta::new(bonding_curve, false),
            AccountMeta::new(curve_token_account, false),
            AccountMeta::new_readonly(global(), false),
            AccountMeta::new_readonly(metaplex, false),
            AccountMeta::new(find_metadata(mint), false),
            AccountMeta::new(*creator, true),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(solana_sdk::sysvar::rent::id(), false),
            AccountMeta::new_readonly(find_event_authority(), false),
            AccountMeta::new_readonly(program_id(), false),
        ],
        data,
    }
}

/// Build a `buy` instruction
///
/// `token_amount` is the minimum tokens out (already slippage-adjusted),
/// `max_sol_cost` the lamport spend ceiling.
pub fn buy_instruction(
    mint: &Pubkey,
    buyer: &Pubkey,
    curve_creator: &Pubkey,
    token_amount: u64,
    max_sol_cost: u64,
) -> Instruction {
    let bonding_curve = find_bonding_curve(mint);
    let curve_token_account = get_associated_token_address(&bonding_curve, mint);
    let buyer_token_account = get_associated_token_address(buyer, mint);

    let mut data = Vec::from(BUY_DISCRIMINATOR);
    data.extend_from_slice(&token_amount.to_le_bytes());
    data.extend_from_slice(&max_sol_cost.to_le_bytes());

    Instruction {
        program_id: program_id(),
        accounts: vec![
            AccountMeta::new_readonly(global(), false),
            AccountMeta::new(fee_recipient(), false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(bonding_curve, false),
            AccountMeta::new(curve_token_account, false),
            AccountMeta::new(buyer_token_account, false),
            AccountMeta::new(*buyer, true),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new(find_creator_vault(curve_creator), false),
            AccountMeta::new_readonly(find_event_authority(), false),
            AccountMeta::new_readonly(program_id(), false),
        ],
        data,
    }
}

/// Build a `sell` instruction
///
/// `token_amount` is the base-unit amount to sell, `min_sol_output` the
/// lamport floor after slippage.
pub fn sell_instruction(
    mint: &Pubkey,
    seller: &Pubkey,
    curve_creator: &Pubkey,
    token_amount: u64,
    min_sol_output: u64,
) -> Instruction {
    let bonding_curve = find_bonding_curve(mint);
    let curve_token_account = get_associated_token_address(&bonding_curve, mint);
    let seller_token_account = get_associated_token_address(seller, mint);

    let mut data = Vec::from(SELL_DISCRIMINATOR);
    data.extend_from_slice(&token_amount.to_le_bytes());
    data.extend_from_slice(&min_sol_output.to_le_bytes());

    Instruction {
        program_id: program_id(),
        accounts: vec![
            AccountMeta::new_readonly(global(), false),
            AccountMeta::new(fee_recipient(), false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(bonding_curve, false),
            AccountMeta::new(curve_token_account, false),
            AccountMeta::new(seller_token_account, false),
            AccountMeta::new(*seller, true),
            AccountMeta::new_readonly(system_program::id(), false),
            // Sell places the creator vault ahead of the token program
            AccountMeta::new(find_creator_vault(curve_creator), false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(find_event_authority(), false),
            AccountMeta::new_readonly(program_id(), false),
        ],
        data,
    }
}
