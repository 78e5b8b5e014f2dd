//! End-to-end launch flow tests over mock collaborators
//!
//! The mocks record every ledger call and bundle submission, so tests can
//! assert not only outcomes but that the submitter was (or was not)
//! invoked, and what the submitted transactions contained.

use async_trait::async_trait;
use solana_sdk::{
    account::Account,
    compute_budget,
    hash::Hash,
    message::VersionedMessage,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use pumplaunch::config::{ImageBlob, TokenCreationRequest, TokenMetadata};
use pumplaunch::launcher::{
    LaunchOrchestrator, LaunchOutcome, SellOutcome, SnipeSet, DUST_RESERVE_LAMPORTS,
};
use pumplaunch::metadata::MetadataUploader;
use pumplaunch::planner::{TransactionPlan, SIGNATURE_FEE_LAMPORTS};
use pumplaunch::pump;
use pumplaunch::queue::{JobQueue, JobState};
use pumplaunch::rpc::{BundleRelay, LedgerRpc, Region, TokenBalance};
use pumplaunch::submitter::Submitter;
use pumplaunch::LaunchError;

#[derive(Default)]
struct MockLedger {
    balances: Mutex<HashMap<Pubkey, u64>>,
    accounts: Mutex<HashMap<Pubkey, Account>>,
    token_balances: Mutex<HashMap<Pubkey, TokenBalance>>,
    sent: Mutex<Vec<VersionedTransaction>>,
}

impl MockLedger {
    fn fund(&self, pubkey: Pubkey, lamports: u64) {
        self.balances.lock().unwrap().insert(pubkey, lamports);
    }

    fn install_curve(&self, mint: &Pubkey, creator: Pubkey) {
        let mut data = vec![0u8; 81];
        data[8..16].copy_from_slice(&pump::INITIAL_VIRTUAL_TOKEN_RESERVES.to_le_bytes());
        data[16..24].copy_from_slice(&pump::INITIAL_VIRTUAL_SOL_RESERVES.to_le_bytes());
        data[49..81].copy_from_slice(creator.as_ref());
        let account = Account {
            lamports: 1,
            data,
            owner: pump::program_id(),
            executable: false,
            rent_epoch: 0,
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(pump::find_bonding_curve(mint), account);
    }

    fn set_token_balance(&self, token_account: Pubkey, amount: u64, decimals: u8) {
        self.token_balances
            .lock()
            .unwrap()
            .insert(token_account, TokenBalance { amount, decimals });
    }

    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn get_balance(&self, pubkey: &Pubkey) -> anyhow::Result<u64> {
        Ok(*self.balances.lock().unwrap().get(pubkey).unwrap_or(&0))
    }

    async fn get_account(&self, pubkey: &Pubkey) -> anyhow::Result<Option<Account>> {
        Ok(self.accounts.lock().unwrap().get(pubkey).cloned())
    }

    async fn get_token_balance(
        &self,
        token_account: &Pubkey,
    ) -> anyhow::Result<Option<TokenBalance>> {
        Ok(self.token_balances.lock().unwrap().get(token_account).copied())
    }

    async fn latest_blockhash(&self) -> anyhow::Result<Hash> {
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> anyhow::Result<Signature> {
        self.sent.lock().unwrap().push(tx.clone());
        Ok(tx.signatures[0])
    }
}

#[derive(Default)]
struct MockRelay {
    bundles: Mutex<Vec<(Vec<VersionedTransaction>, Region)>>,
}

#[async_trait]
impl BundleRelay for MockRelay {
    async fn submit_bundle(
        &self,
        txs: &[VersionedTransaction],
        region: Region,
    ) -> anyhow::Result<String> {
        let mut bundles = self.bundles.lock().unwrap();
        bundles.push((txs.to_vec(), region));
        Ok(format!("bundle-{}", bundles.len()))
    }
}

struct MockUploader;

#[async_trait]
impl MetadataUploader for MockUploader {
    async fn upload(&self, _: &TokenMetadata, _: &ImageBlob) -> anyhow::Result<String> {
        Ok("https://ipfs.test/metadata.json".to_string())
    }
}

fn byte_list_spec(keypair: &Keypair) -> String {
    let bytes: Vec<String> = keypair.to_bytes().iter().map(|b| b.to_string()).collect();
    format!("[{}]", bytes.join(","))
}

fn request(wallet: &Keypair, mint_spec: &str, buy_amount_sol: f64) -> TokenCreationRequest {
    TokenCreationRequest {
        metadata: TokenMetadata {
            name: "Launch Test".to_string(),
            symbol: "LT".to_string(),
            description: "integration".to_string(),
            twitter: None,
            telegram: None,
            website: None,
        },
        image: ImageBlob {
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
            mime_type: "image/png".to_string(),
        },
        wallet: byte_list_spec(wallet),
        mint: mint_spec.to_string(),
        buy_amount_sol,
        slippage_bps: 100,
        priority_fee: 100_000,
        tip_sol: 0.001,
    }
}

fn build_orchestrator() -> (Arc<MockLedger>, Arc<MockRelay>, LaunchOrchestrator) {
    let ledger = Arc::new(MockLedger::default());
    let relay = Arc::new(MockRelay::default());
    let submitter = Submitter::new(ledger.clone(), relay.clone());
    let orchestrator = LaunchOrchestrator::new(ledger.clone(), submitter);
    (ledger, relay, orchestrator)
}

/// Resolve a compiled instruction's program id from the message's key table
fn instruction_programs(tx: &VersionedTransaction) -> Vec<Pubkey> {
    let VersionedMessage::V0(message) = &tx.message else {
        panic!("expected v0 message");
    };
    message
        .instructions
        .iter()
        .map(|ix| message.account_keys[ix.program_id_index as usize])
        .collect()
}

#[tokio::test]
async fn zero_balance_aborts_before_any_submission() {
    let (ledger, relay, orchestrator) = build_orchestrator();
    let wallet = Keypair::new();
    // Wallet deliberately unfunded

    let err = orchestrator
        .create_token(&request(&wallet, "random", 0.1), "https://meta")
        .await
        .unwrap_err();

    match err {
        LaunchError::InsufficientFunds { wallet: reported } => {
            assert_eq!(reported, wallet.pubkey());
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }
    assert_eq!(ledger.sent_count(), 0);
    assert!(relay.bundles.lock().unwrap().is_empty());
}

#[tokio::test]
async fn create_without_dev_buy_submits_two_fee_plus_create() {
    let (ledger, _relay, orchestrator) = build_orchestrator();
    let wallet = Keypair::new();
    ledger.fund(wallet.pubkey(), 1_000_000_000);

    let outcome = orchestrator
        .create_token(&request(&wallet, "random", 0.0), "https://meta")
        .await
        .unwrap();
    assert!(matches!(outcome, LaunchOutcome::Created { .. }));

    let sent = ledger.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let programs = instruction_programs(&sent[0]);
    assert_eq!(programs.len(), TransactionPlan::FEE_PRELUDE_LEN + 1);
    assert_eq!(programs[0], compute_budget::id());
    assert_eq!(programs[1], compute_budget::id());
    assert_eq!(programs[2], pump::program_id());
}

#[tokio::test]
async fn second_creation_observes_existing_curve() {
    let (ledger, _relay, orchestrator) = build_orchestrator();
    let wallet = Keypair::new();
    let mint = Keypair::new();
    ledger.fund(wallet.pubkey(), 1_000_000_000);

    let req = request(&wallet, &byte_list_spec(&mint), 0.0);
    let first = orchestrator.create_token(&req, "https://meta").await.unwrap();
    match first {
        LaunchOutcome::Created { mint: created, .. } => assert_eq!(created, mint.pubkey()),
        other => panic!("expected Created, got {other:?}"),
    }

    // The curve now exists on chain; the second probe must observe it.
    ledger.install_curve(&mint.pubkey(), wallet.pubkey());
    let second = orchestrator.create_token(&req, "https://meta").await.unwrap();
    assert_eq!(
        second,
        LaunchOutcome::AlreadyExists {
            mint: mint.pubkey()
        }
    );
    // Exactly one submission across both calls
    assert_eq!(ledger.sent_count(), 1);
}

#[tokio::test]
async fn snipe_set_mismatch_rejected_before_signing() {
    let specs = vec![byte_list_spec(&Keypair::new()); 3];
    let err = SnipeSet::resolve(&specs, &[0.1, 0.2]).unwrap_err();
    assert!(matches!(err, LaunchError::Validation(_)));
}

#[tokio::test]
async fn create_and_snipe_bundles_one_tx_per_wallet() {
    let (ledger, relay, orchestrator) = build_orchestrator();
    let creator = Keypair::new();
    let sniper_a = Keypair::new();
    let sniper_b = Keypair::new();
    ledger.fund(creator.pubkey(), 5_000_000_000);
    ledger.fund(sniper_a.pubkey(), 1_000_000_000);
    ledger.fund(sniper_b.pubkey(), 1_000_000_000);

    let snipe = SnipeSet::resolve(
        &[byte_list_spec(&sniper_a), byte_list_spec(&sniper_b)],
        &[0.1, 0.2],
    )
    .unwrap();
    let outcome = orchestrator
        .create_and_snipe(
            &request(&creator, "random", 0.5),
            "https://meta",
            &snipe,
            Region::Frankfurt,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, LaunchOutcome::CreatedBundle { .. }));

    let bundles = relay.bundles.lock().unwrap();
    assert_eq!(bundles.len(), 1);
    let (txs, region) = &bundles[0];
    assert_eq!(*region, Region::Frankfurt);
    // create tx + one buy tx per snipe wallet
    assert_eq!(txs.len(), 3);
    // The create instruction rides in the first transaction
    assert!(instruction_programs(&txs[0]).contains(&pump::program_id()));
    // Nothing went out over the single-transaction path
    assert_eq!(ledger.sent_count(), 0);
}

#[tokio::test]
async fn snipe_requires_existing_curve() {
    let (_ledger, _relay, orchestrator) = build_orchestrator();
    let sniper = Keypair::new();
    let snipe = SnipeSet::resolve(&[byte_list_spec(&sniper)], &[0.1]).unwrap();

    let err = orchestrator
        .snipe(
            Pubkey::new_unique(),
            &snipe,
            100,
            100_000,
            0.001,
            Region::Ny,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchError::Validation(_)));
}

#[tokio::test]
async fn snipe_bundles_buy_per_wallet() {
    let (ledger, relay, orchestrator) = build_orchestrator();
    let creator = Keypair::new();
    let sniper_a = Keypair::new();
    let sniper_b = Keypair::new();
    ledger.fund(sniper_a.pubkey(), 1_000_000_000);
    ledger.fund(sniper_b.pubkey(), 1_000_000_000);

    let mint = Pubkey::new_unique();
    ledger.install_curve(&mint, creator.pubkey());

    let snipe = SnipeSet::resolve(
        &[byte_list_spec(&sniper_a), byte_list_spec(&sniper_b)],
        &[0.1, 0.1],
    )
    .unwrap();
    let bundle_id = orchestrator
        .snipe(mint, &snipe, 100, 100_000, 0.001, Region::Tokyo)
        .await
        .unwrap();
    assert!(!bundle_id.is_empty());

    let bundles = relay.bundles.lock().unwrap();
    let (txs, _) = &bundles[0];
    assert_eq!(txs.len(), 2);
}

#[tokio::test]
async fn sell_with_zero_holding_is_a_noop() {
    let (ledger, relay, orchestrator) = build_orchestrator();
    let wallet = Keypair::new();
    let mint = Pubkey::new_unique();
    // No token account at all
    let outcome = orchestrator
        .sell(&byte_list_spec(&wallet), mint, 100, 100_000)
        .await
        .unwrap();
    assert_eq!(outcome, SellOutcome::NoHolding);

    // Explicit zero balance behaves the same
    let ata = spl_associated_token_account::get_associated_token_address(&wallet.pubkey(), &mint);
    ledger.set_token_balance(ata, 0, 6);
    let outcome = orchestrator
        .sell(&byte_list_spec(&wallet), mint, 100, 100_000)
        .await
        .unwrap();
    assert_eq!(outcome, SellOutcome::NoHolding);

    // The submitter was never invoked on either path
    assert_eq!(ledger.sent_count(), 0);
    assert!(relay.bundles.lock().unwrap().is_empty());
}

#[tokio::test]
async fn sell_keeps_one_token_reserve() {
    let (ledger, _relay, orchestrator) = build_orchestrator();
    let creator = Keypair::new();
    let wallet = Keypair::new();
    let mint = Pubkey::new_unique();
    ledger.install_curve(&mint, creator.pubkey());

    let ata = spl_associated_token_account::get_associated_token_address(&wallet.pubkey(), &mint);
    // 5 tokens at 6 decimals; 4 should be sellable
    ledger.set_token_balance(ata, 5_000_000, 6);

    let outcome = orchestrator
        .sell(&byte_list_spec(&wallet), mint, 100, 100_000)
        .await
        .unwrap();
    assert!(matches!(outcome, SellOutcome::Sold(_)));

    let sent = ledger.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let VersionedMessage::V0(message) = &sent[0].message else {
        panic!("expected v0 message");
    };
    // 2 fee instructions + 1 sell
    assert_eq!(message.instructions.len(), 3);
    let sell_data = &message.instructions[2].data;
    let amount = u64::from_le_bytes(sell_data[8..16].try_into().unwrap());
    assert_eq!(amount, 4_000_000);
}

#[tokio::test]
async fn sell_surfaces_balance_lookup_failure() {
    // A transport failure during the holding lookup must not read as an
    // empty balance.
    struct FlakyLedger;

    #[async_trait]
    impl LedgerRpc for FlakyLedger {
        async fn get_balance(&self, _: &Pubkey) -> anyhow::Result<u64> {
            unreachable!()
        }
        async fn get_account(&self, _: &Pubkey) -> anyhow::Result<Option<Account>> {
            unreachable!()
        }
        async fn get_token_balance(&self, _: &Pubkey) -> anyhow::Result<Option<TokenBalance>> {
            Err(anyhow::anyhow!("error sending request: timed out"))
        }
        async fn latest_blockhash(&self) -> anyhow::Result<Hash> {
            unreachable!()
        }
        async fn send_transaction(&self, _: &VersionedTransaction) -> anyhow::Result<Signature> {
            unreachable!()
        }
    }

    let ledger = Arc::new(FlakyLedger);
    let relay = Arc::new(MockRelay::default());
    let submitter = Submitter::new(ledger.clone(), relay.clone());
    let orchestrator = LaunchOrchestrator::new(ledger, submitter);

    let err = orchestrator
        .sell(&byte_list_spec(&Keypair::new()), Pubkey::new_unique(), 100, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchError::Rpc(_)));
    assert!(relay.bundles.lock().unwrap().is_empty());
}

#[tokio::test]
async fn sell_reserve_follows_reported_decimals() {
    let (ledger, _relay, orchestrator) = build_orchestrator();
    let creator = Keypair::new();
    let wallet = Keypair::new();
    let mint = Pubkey::new_unique();
    ledger.install_curve(&mint, creator.pubkey());

    // A 0-decimal mint keeps exactly one base unit in reserve
    let ata = spl_associated_token_account::get_associated_token_address(&wallet.pubkey(), &mint);
    ledger.set_token_balance(ata, 5, 0);

    let outcome = orchestrator
        .sell(&byte_list_spec(&wallet), mint, 100, 100_000)
        .await
        .unwrap();
    assert!(matches!(outcome, SellOutcome::Sold(_)));

    let sent = ledger.sent.lock().unwrap();
    let VersionedMessage::V0(message) = &sent[0].message else {
        panic!("expected v0 message");
    };
    let sell_data = &message.instructions[2].data;
    let amount = u64::from_le_bytes(sell_data[8..16].try_into().unwrap());
    assert_eq!(amount, 4);
}

#[tokio::test]
async fn collect_withholds_fee_and_dust_reserve() {
    let (ledger, relay, orchestrator) = build_orchestrator();
    let source = Keypair::new();
    let destination = Pubkey::new_unique();
    let balance = 2_000_000_000u64;
    ledger.fund(source.pubkey(), balance);

    orchestrator
        .collect(
            &[byte_list_spec(&source)],
            destination,
            100_000,
            0.0,
            Region::Ny,
        )
        .await
        .unwrap();

    let bundles = relay.bundles.lock().unwrap();
    let (txs, _) = &bundles[0];
    assert_eq!(txs.len(), 1);
    let VersionedMessage::V0(message) = &txs[0].message else {
        panic!("expected v0 message");
    };
    // System transfer data: 4-byte tag, then the lamport amount
    let transfer_data = &message.instructions[2].data;
    let swept = u64::from_le_bytes(transfer_data[4..12].try_into().unwrap());
    assert_eq!(
        swept,
        balance - SIGNATURE_FEE_LAMPORTS - DUST_RESERVE_LAMPORTS
    );
}

#[tokio::test]
async fn transfer_goes_through_the_bundle_path() {
    let (ledger, relay, orchestrator) = build_orchestrator();
    let source = Keypair::new();
    ledger.fund(source.pubkey(), 1_000_000_000);

    let bundle_id = orchestrator
        .transfer(
            &byte_list_spec(&source),
            Pubkey::new_unique(),
            0.25,
            100_000,
            0.0,
            Region::Amsterdam,
        )
        .await
        .unwrap();
    assert!(!bundle_id.is_empty());
    assert_eq!(relay.bundles.lock().unwrap().len(), 1);
    assert_eq!(ledger.sent_count(), 0);
}

#[tokio::test]
async fn queued_creation_runs_to_created() {
    let (ledger, _relay, orchestrator) = build_orchestrator();
    let wallet = Keypair::new();
    ledger.fund(wallet.pubkey(), 1_000);

    let (queue, worker) = JobQueue::new(orchestrator, Arc::new(MockUploader));
    let worker_task = tokio::spawn(worker.run());

    let handle = queue.enqueue(request(&wallet, "random", 0.0)).unwrap();
    let job = queue.wait_terminal(handle.id).await.unwrap();

    match &job.state {
        JobState::Completed(LaunchOutcome::Created { .. }) => {}
        other => panic!("expected Created, got {other:?}"),
    }
    // Exactly one submission, shaped 2 fee + 1 create
    let programs = {
        let sent = ledger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        instruction_programs(&sent[0])
    };
    assert_eq!(programs.len(), 3);
    assert_eq!(programs[0], compute_budget::id());
    assert_eq!(programs[1], compute_budget::id());
    assert_eq!(programs[2], pump::program_id());

    drop(queue);
    worker_task.await.unwrap();
}

#[tokio::test]
async fn worker_survives_a_failed_job() {
    let (ledger, _relay, orchestrator) = build_orchestrator();
    let good_wallet = Keypair::new();
    ledger.fund(good_wallet.pubkey(), 1_000_000_000);

    let (queue, worker) = JobQueue::new(orchestrator, Arc::new(MockUploader));
    let worker_task = tokio::spawn(worker.run());

    // First job carries a malformed wallet spec and must fail in place.
    let mut bad = request(&good_wallet, "random", 0.0);
    bad.wallet = "not-a-key".to_string();
    let bad_handle = queue.enqueue(bad).unwrap();

    let good_handle = queue
        .enqueue(request(&good_wallet, "random", 0.0))
        .unwrap();

    let bad_job = queue.wait_terminal(bad_handle.id).await.unwrap();
    assert!(matches!(bad_job.state, JobState::Failed(_)));

    let good_job = queue.wait_terminal(good_handle.id).await.unwrap();
    assert!(matches!(
        good_job.state,
        JobState::Completed(LaunchOutcome::Created { .. })
    ));

    drop(queue);
    worker_task.await.unwrap();
}

#[tokio::test]
async fn random_mint_spec_is_fresh_per_job() {
    let (ledger, _relay, orchestrator) = build_orchestrator();
    let wallet = Keypair::new();
    ledger.fund(wallet.pubkey(), 1_000_000_000);

    let req = request(&wallet, "random", 0.0);
    let first = orchestrator.create_token(&req, "https://meta").await.unwrap();
    let second = orchestrator.create_token(&req, "https://meta").await.unwrap();
    let (LaunchOutcome::Created { mint: m1, .. }, LaunchOutcome::Created { mint: m2, .. }) =
        (first, second)
    else {
        panic!("expected two Created outcomes");
    };
    assert_ne!(m1, m2);
}

#[test]
fn program_id_matches_documented_constant() {
    assert_eq!(
        pump::program_id(),
        Pubkey::from_str("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P").unwrap()
    );
}
