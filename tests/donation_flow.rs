//! End-to-end donation attempts through `DonationService` with in-process
//! ledger, contract and wallet doubles.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Notify};

use crowdfund_orchestrator::config::ConfirmationConfig;
use crowdfund_orchestrator::contract::{
    ContractClient, ContractResult, ContractRpc, ScArg, SimulationRequest, SimulationResponse,
};
use crowdfund_orchestrator::ledger::{
    AccountInfo, LedgerApi, LedgerError, LedgerResult, PaymentRecord, TransactionStatus, TransactionSummary,
};
use crowdfund_orchestrator::network::NetworkContext;
use crowdfund_orchestrator::orchestrator::{AttemptOutcome, AttemptState, Endpoints, Invalidation};
use crowdfund_orchestrator::primitives::{ContractAddress, PublicKey, SignedPayload, TxHash, UnsignedPayload};
use crowdfund_orchestrator::session::ConnectionStatus;
use crowdfund_orchestrator::wallet::{WalletAdapter, WalletError, WalletKind, WalletRegistry, WalletResult};
use crowdfund_orchestrator::{DonationError, DonationService, ErrorKind};

mod common;
use common::{ACCOUNT, CONTRACT, PASSPHRASE};

const HASH: &str = "3389e9f0f1a65f19736cacf544c2e825313e8447f569233bb8db39aa607c8889";

// --- doubles ---

struct MockLedger {
    statuses: Mutex<VecDeque<TransactionStatus>>,
    submit_error: Option<LedgerError>,
    /// When set, the first submit blocks until notified.
    submit_gate: Option<Notify>,
    gate_passed: AtomicBool,
    loads: AtomicU32,
    submits: AtomicU32,
    polls: AtomicU32,
}

impl MockLedger {
    /// Status checks answer from `statuses`, then `Pending` forever.
    fn new(statuses: Vec<TransactionStatus>) -> Arc<Self> {
        Arc::new(Self::with_statuses(statuses))
    }

    fn failing_submit(error: LedgerError) -> Arc<Self> {
        Arc::new(Self {
            submit_error: Some(error),
            ..Self::with_statuses(vec![])
        })
    }

    /// First submit stays outstanding until `release_submit`.
    fn held_submit() -> Arc<Self> {
        Arc::new(Self {
            submit_gate: Some(Notify::new()),
            ..Self::with_statuses(vec![])
        })
    }

    fn with_statuses(statuses: Vec<TransactionStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            submit_error: None,
            submit_gate: None,
            gate_passed: AtomicBool::new(false),
            loads: AtomicU32::new(0),
            submits: AtomicU32::new(0),
            polls: AtomicU32::new(0),
        }
    }

    fn release_submit(&self) {
        if let Some(gate) = &self.submit_gate {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl LedgerApi for MockLedger {
    async fn load_account(&self, account: &PublicKey) -> LedgerResult<AccountInfo> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(AccountInfo {
            account_id: account.clone(),
            sequence: 41,
            balances: Vec::new(),
        })
    }

    async fn submit(&self, _payload: &SignedPayload) -> LedgerResult<TxHash> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.submit_gate {
            if !self.gate_passed.swap(true, Ordering::SeqCst) {
                gate.notified().await;
            }
        }
        match &self.submit_error {
            Some(e) => Err(e.clone()),
            None => Ok(TxHash::new(HASH)),
        }
    }

    async fn transaction_status(&self, _hash: &TxHash) -> LedgerResult<TransactionStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(TransactionStatus::Pending))
    }

    async fn transactions_for_account(&self, _: &PublicKey, _: u32) -> LedgerResult<Vec<TransactionSummary>> {
        Ok(Vec::new())
    }

    async fn payments_for_account(&self, _: &PublicKey, _: u32) -> LedgerResult<Vec<PaymentRecord>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct MockRpc {
    requests: Mutex<Vec<SimulationRequest>>,
}

#[async_trait]
impl ContractRpc for MockRpc {
    async fn simulate(&self, request: &SimulationRequest) -> ContractResult<SimulationResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let response = match request.function.as_str() {
            "get_campaign" => SimulationResponse {
                result: Some(json!({
                    "creator": ACCOUNT,
                    "goal": "1000000000",
                    "min_donation": "0",
                    "total_raised": "125000000",
                    "supporters": 1
                })),
                ..Default::default()
            },
            _ => SimulationResponse {
                transaction_xdr: Some(format!("AAAA{}", request.function)),
                ..Default::default()
            },
        };
        Ok(response)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Signing {
    Approve,
    Decline,
    /// Block until `release` is notified.
    Hold,
}

struct MockWallet {
    signing: Signing,
    release: Notify,
    signs: AtomicU32,
    connected: AtomicBool,
}

impl MockWallet {
    fn new(signing: Signing) -> Arc<Self> {
        Arc::new(Self {
            signing,
            release: Notify::new(),
            signs: AtomicU32::new(0),
            connected: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl WalletAdapter for MockWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::Freighter
    }

    async fn connect(&self) -> WalletResult<PublicKey> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(PublicKey::parse(ACCOUNT).unwrap())
    }

    async fn public_key(&self) -> WalletResult<PublicKey> {
        Ok(PublicKey::parse(ACCOUNT).unwrap())
    }

    async fn sign_transaction(
        &self,
        payload: &UnsignedPayload,
        network: &NetworkContext,
    ) -> WalletResult<SignedPayload> {
        self.signs.fetch_add(1, Ordering::SeqCst);
        assert_eq!(network.network_passphrase, PASSPHRASE);
        match self.signing {
            Signing::Approve => Ok(SignedPayload::new(format!("{}+sig", payload.as_xdr()))),
            Signing::Decline => Err(WalletError::SigningRejected),
            Signing::Hold => {
                self.release.notified().await;
                Ok(SignedPayload::new(format!("{}+sig", payload.as_xdr())))
            }
        }
    }

    async fn disconnect(&self) -> WalletResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// --- harness ---

struct Harness {
    service: Arc<DonationService>,
    ledger: Arc<MockLedger>,
    rpc: Arc<MockRpc>,
    wallet: Arc<MockWallet>,
    invalidations: broadcast::Receiver<Invalidation>,
}

fn endpoints(ledger: Arc<MockLedger>, rpc: Arc<MockRpc>) -> Endpoints {
    let environment = common::environment("http://127.0.0.1:8000/", "http://127.0.0.1:8001/");
    let ledger: Arc<dyn LedgerApi> = ledger;
    let contract = ContractClient::new(
        rpc,
        ledger.clone(),
        ContractAddress::parse(CONTRACT).unwrap(),
        PASSPHRASE,
        100,
    );
    Endpoints {
        environment,
        ledger,
        contract,
    }
}

fn harness(ledger: Arc<MockLedger>, signing: Signing) -> Harness {
    let rpc = Arc::new(MockRpc::default());
    let wallet = MockWallet::new(signing);
    let registry = WalletRegistry::new();
    registry.register(wallet.clone());

    let confirmation = ConfirmationConfig {
        poll_interval_ms: 2000,
        timeout_secs: 30,
    };
    let service = Arc::new(DonationService::new(
        endpoints(ledger.clone(), rpc.clone()),
        registry,
        &confirmation,
    ));
    let invalidations = service.subscribe_invalidations();

    Harness {
        service,
        ledger,
        rpc,
        wallet,
        invalidations,
    }
}

/// Wait until the latest attempt reaches `state`.
async fn reached(service: &DonationService, state: AttemptState) {
    let mut progress = service.subscribe_progress();
    progress
        .wait_for(|p| p.as_ref().map(|p| p.state) == Some(state))
        .await
        .unwrap();
}

// --- scenarios ---

#[tokio::test(start_paused = true)]
async fn test_donate_without_wallet_is_not_connected() {
    let mut h = harness(MockLedger::new(vec![]), Signing::Approve);

    let err = h.service.donate("10", CONTRACT).await.unwrap_err();
    assert_eq!(err, DonationError::NotConnected);

    assert_eq!(h.ledger.loads.load(Ordering::SeqCst), 0);
    assert!(h.rpc.requests.lock().unwrap().is_empty());
    assert!(h.invalidations.try_recv().is_err());
    assert!(h.service.subscribe_progress().borrow().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_contribution_confirms_after_pending_polls() {
    let ledger = MockLedger::new(vec![
        TransactionStatus::Pending,
        TransactionStatus::Pending,
        TransactionStatus::Pending,
        TransactionStatus::Successful,
    ]);
    let mut h = harness(ledger, Signing::Approve);
    h.service.connect(WalletKind::Freighter).await.unwrap();

    let receipt = h.service.donate("12.5", CONTRACT).await.unwrap();
    assert_eq!(receipt.hash.as_str(), HASH);
    assert_eq!(receipt.campaign_address.as_str(), CONTRACT);

    {
        let requests = h.rpc.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].function, "contribute");
        assert_eq!(requests[0].args[0], ScArg::address(ACCOUNT));
        assert_eq!(requests[0].args[2], ScArg::I128(125_000_000));
    }
    assert_eq!(h.wallet.signs.load(Ordering::SeqCst), 1);
    assert_eq!(h.ledger.submits.load(Ordering::SeqCst), 1);
    assert_eq!(h.ledger.polls.load(Ordering::SeqCst), 4);

    let invalidation = h.invalidations.try_recv().unwrap();
    assert_eq!(invalidation.attempt_id, receipt.attempt_id);
    assert_eq!(invalidation.outcome, AttemptOutcome::Succeeded);
    assert!(h.invalidations.try_recv().is_err());

    let progress = h.service.subscribe_progress().borrow().clone().unwrap();
    assert_eq!(progress.state, AttemptState::Succeeded);
    assert_eq!(progress.tx_hash.as_ref().map(|t| t.as_str()), Some(HASH));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_amount_never_leaves_the_process() {
    let mut h = harness(MockLedger::new(vec![]), Signing::Approve);
    h.service.connect(WalletKind::Freighter).await.unwrap();

    for amount in ["0", "-5", "1.2.3", "ten"] {
        let err = h.service.donate(amount, CONTRACT).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount, "amount {:?}", amount);
    }
    assert!(h.rpc.requests.lock().unwrap().is_empty());
    assert_eq!(h.wallet.signs.load(Ordering::SeqCst), 0);
    assert!(h.invalidations.try_recv().is_err());

    // The session is free again afterwards.
    let receipt = h.service.refund(CONTRACT).await;
    assert!(matches!(receipt, Err(DonationError::ConfirmationTimeout { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_declined_signature_is_cancelled_without_submit() {
    let mut h = harness(MockLedger::new(vec![]), Signing::Decline);
    h.service.connect(WalletKind::Freighter).await.unwrap();

    let err = h.service.donate("5", CONTRACT).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserCancelled);
    assert!(err.is_cancellation());
    assert_eq!(h.ledger.submits.load(Ordering::SeqCst), 0);

    let invalidation = h.invalidations.try_recv().unwrap();
    assert_eq!(invalidation.outcome, AttemptOutcome::Failed(ErrorKind::UserCancelled));
    assert_eq!(
        h.service.subscribe_progress().borrow().as_ref().map(|p| p.state),
        Some(AttemptState::Failed(ErrorKind::UserCancelled))
    );
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_timeout_leaves_outcome_unknown() {
    let mut h = harness(MockLedger::new(vec![]), Signing::Approve);
    h.service.connect(WalletKind::Freighter).await.unwrap();

    let started = tokio::time::Instant::now();
    let err = h.service.donate("1", CONTRACT).await.unwrap_err();
    assert_eq!(
        err,
        DonationError::ConfirmationTimeout {
            hash: TxHash::new(HASH),
            timeout_secs: 30
        }
    );
    assert!(err.outcome_unknown());
    assert_eq!(err.transaction_hash().map(|h| h.as_str()), Some(HASH));
    assert!(started.elapsed() >= std::time::Duration::from_secs(30));
    assert!(h.ledger.polls.load(Ordering::SeqCst) >= 15);

    let invalidation = h.invalidations.try_recv().unwrap();
    assert_eq!(invalidation.outcome, AttemptOutcome::Failed(ErrorKind::ConfirmationTimeout));
}

#[tokio::test(start_paused = true)]
async fn test_failed_transaction_is_reported() {
    let mut h = harness(
        MockLedger::new(vec![TransactionStatus::Pending, TransactionStatus::Failed]),
        Signing::Approve,
    );
    h.service.connect(WalletKind::Freighter).await.unwrap();

    let err = h.service.withdraw(CONTRACT).await.unwrap_err();
    assert_eq!(err, DonationError::TransactionFailed { hash: TxHash::new(HASH) });
    assert_eq!(h.rpc.requests.lock().unwrap()[0].function, "withdraw");
    assert_eq!(
        h.invalidations.try_recv().unwrap().outcome,
        AttemptOutcome::Failed(ErrorKind::TransactionFailed)
    );
}

#[tokio::test(start_paused = true)]
async fn test_ambiguous_submit_is_not_retried() {
    let ledger = MockLedger::failing_submit(LedgerError::NetworkUnavailable {
        message: "504 Gateway Timeout".into(),
        maybe_submitted: true,
    });
    let mut h = harness(ledger, Signing::Approve);
    h.service.connect(WalletKind::Freighter).await.unwrap();

    let err = h.service.donate("3", CONTRACT).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkUnavailable);
    assert!(err.outcome_unknown());
    assert!(!err.is_retryable());
    assert_eq!(h.ledger.submits.load(Ordering::SeqCst), 1);
    assert_eq!(h.ledger.polls.load(Ordering::SeqCst), 0);
    assert!(h.invalidations.try_recv().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_second_attempt_while_in_flight_is_refused() {
    let mut h = harness(MockLedger::new(vec![TransactionStatus::Successful]), Signing::Hold);
    h.service.connect(WalletKind::Freighter).await.unwrap();

    let service = h.service.clone();
    let first = tokio::spawn(async move { service.donate("2", CONTRACT).await });
    reached(&h.service, AttemptState::AwaitingSignature).await;

    let err = h.service.donate("2", CONTRACT).await.unwrap_err();
    assert_eq!(err, DonationError::AttemptInProgress);
    assert_eq!(h.wallet.signs.load(Ordering::SeqCst), 1);

    h.wallet.release.notify_one();
    let receipt = first.await.unwrap().unwrap();
    assert_eq!(receipt.hash.as_str(), HASH);

    // Only the attempt that ran publishes an invalidation.
    assert_eq!(h.invalidations.try_recv().unwrap().attempt_id, receipt.attempt_id);
    assert!(h.invalidations.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_cannot_race_an_outstanding_submit() {
    let h = harness(MockLedger::held_submit(), Signing::Approve);
    h.service.connect(WalletKind::Freighter).await.unwrap();

    let service = h.service.clone();
    let first = tokio::spawn(async move { service.donate("2", CONTRACT).await });
    reached(&h.service, AttemptState::Submitting).await;

    // Same wallet, same account, fresh session.
    h.service.connect(WalletKind::Freighter).await.unwrap();
    let err = h.service.donate("2", CONTRACT).await.unwrap_err();
    assert_eq!(err, DonationError::AttemptInProgress);
    assert_eq!(h.ledger.loads.load(Ordering::SeqCst), 1);
    assert_eq!(h.wallet.signs.load(Ordering::SeqCst), 1);
    assert_eq!(h.ledger.submits.load(Ordering::SeqCst), 1);

    h.ledger.release_submit();
    let err = first.await.unwrap().unwrap_err();
    assert_eq!(err, DonationError::ConfirmationCancelled { hash: TxHash::new(HASH) });

    // The account is free once the first attempt has finished.
    let err = h.service.donate("2", CONTRACT).await.unwrap_err();
    assert!(matches!(err, DonationError::ConfirmationTimeout { .. }));
    assert_eq!(h.ledger.submits.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_while_signing_cancels() {
    let h = harness(MockLedger::new(vec![]), Signing::Hold);
    h.service.connect(WalletKind::Freighter).await.unwrap();

    let service = h.service.clone();
    let attempt = tokio::spawn(async move { service.donate("2", CONTRACT).await });
    reached(&h.service, AttemptState::AwaitingSignature).await;

    h.service.disconnect().await;
    let err = attempt.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserCancelled);
    assert_eq!(h.ledger.submits.load(Ordering::SeqCst), 0);
    assert_eq!(h.service.subscribe_session().borrow().status, ConnectionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_while_confirming_cancels() {
    let h = harness(MockLedger::new(vec![]), Signing::Approve);
    h.service.connect(WalletKind::Freighter).await.unwrap();

    let service = h.service.clone();
    let attempt = tokio::spawn(async move { service.donate("2", CONTRACT).await });
    reached(&h.service, AttemptState::Confirming).await;

    h.service.disconnect().await;
    let err = attempt.await.unwrap().unwrap_err();
    assert_eq!(err, DonationError::ConfirmationCancelled { hash: TxHash::new(HASH) });
    assert!(h.service.current_session().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reconfigure_ends_session() {
    let h = harness(MockLedger::new(vec![]), Signing::Approve);
    h.service.connect(WalletKind::Freighter).await.unwrap();
    assert!(h.wallet.is_connected());

    let ledger = MockLedger::new(vec![]);
    let mut next = endpoints(ledger, Arc::new(MockRpc::default()));
    next.environment.network_passphrase = "Standalone Network ; February 2017".into();
    h.service.swap_endpoints(next).await;

    assert!(h.service.current_session().is_none());
    assert!(!h.wallet.is_connected());
    assert_eq!(
        h.service.environment().network_passphrase,
        "Standalone Network ; February 2017"
    );
    assert_eq!(
        h.service.donate("1", CONTRACT).await.unwrap_err(),
        DonationError::NotConnected
    );
}

#[tokio::test(start_paused = true)]
async fn test_campaign_read_and_formatting() {
    let h = harness(MockLedger::new(vec![]), Signing::Approve);

    let campaign = h.service.get_campaign(CONTRACT).await.unwrap();
    assert_eq!(h.service.format_amount(campaign.goal), "100.0000000");
    assert_eq!(h.service.format_amount(campaign.total_raised), "12.5000000");
    assert_eq!(campaign.supporter_count, 1);

    let err = h.service.get_campaign("not-an-address").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    assert_eq!(h.service.available_wallets(), vec![WalletKind::Freighter]);
}
