//! Composition root and caller-facing operations.
//!
//! # Responsibilities
//! - Build network clients from a resolved environment
//! - Own the session state and the orchestrator
//! - Expose donate/refund/withdraw, contract reads and session accessors
//! - Swap the environment atomically on reconfigure
//!
//! # Design Decisions
//! - Clients live behind `ArcSwap`; an attempt keeps the snapshot it started with
//! - Reconfiguring tears down the wallet session, since it was authorized
//!   against the previous network

use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::amount::{to_display_units, MinorUnits, SCALE_DIGITS};
use crate::config::{AppConfig, ConfirmationConfig, LedgerConfig};
use crate::contract::{Campaign, ContractClient, ContributionRecord, SorobanRpcClient};
use crate::error::DonationError;
use crate::ledger::{HorizonClient, LedgerApi, PaymentRecord, TransactionSummary};
use crate::network::{self, NetworkEnvironment};
use crate::orchestrator::{ActionRequest, AttemptProgress, Endpoints, Invalidation, Orchestrator, Receipt};
use crate::primitives::{Address, PublicKey};
use crate::resilience::RetryPolicy;
use crate::session::{SessionSnapshot, SessionState, TeardownReason, WalletSession};
use crate::wallet::{AgentRuntime, WalletKind, WalletRegistry};

/// Build live HTTP clients for `environment`.
pub fn connect_endpoints(environment: NetworkEnvironment, ledger_config: &LedgerConfig) -> Result<Endpoints, DonationError> {
    let horizon =
        HorizonClient::new(&environment, ledger_config).map_err(|e| DonationError::Configuration(e.to_string()))?;
    let ledger: Arc<dyn LedgerApi> = Arc::new(horizon);
    let rpc = SorobanRpcClient::new(environment.contract_rpc_url.clone(), ledger_config.request_timeout())
        .map_err(|e| DonationError::Configuration(e.to_string()))?;
    let contract = ContractClient::new(
        Arc::new(rpc),
        ledger.clone(),
        environment.contract_id.clone(),
        environment.network_passphrase.clone(),
        ledger_config.base_fee,
    )
    .with_read_retry(RetryPolicy::from(ledger_config));

    Ok(Endpoints {
        environment,
        ledger,
        contract,
    })
}

pub struct DonationService {
    endpoints: ArcSwap<Endpoints>,
    session: Arc<SessionState>,
    orchestrator: Orchestrator,
    ledger_config: LedgerConfig,
    fraction_digits: usize,
}

impl DonationService {
    pub fn new(endpoints: Endpoints, registry: WalletRegistry, confirmation: &ConfirmationConfig) -> Self {
        let session = Arc::new(SessionState::new(registry));
        let orchestrator = Orchestrator::new(session.clone(), confirmation);
        Self {
            endpoints: ArcSwap::from_pointee(endpoints),
            session,
            orchestrator,
            ledger_config: LedgerConfig::default(),
            fraction_digits: SCALE_DIGITS,
        }
    }

    /// Resolve the network, build clients and register the enabled wallets.
    pub fn from_config(config: &AppConfig, runtime: Arc<dyn AgentRuntime>) -> Result<Self, DonationError> {
        let environment = network::resolve(&config.network)?;
        tracing::info!(
            network = %environment.network_id,
            ledger = %environment.ledger_endpoint_url,
            contract = %environment.contract_id,
            "Network environment resolved"
        );

        let endpoints = connect_endpoints(environment, &config.ledger)?;
        let registry = WalletRegistry::with_builtin(runtime, &config.wallets.enabled);

        let mut service = Self::new(endpoints, registry, &config.confirmation);
        service.ledger_config = config.ledger.clone();
        service.fraction_digits = config.display.fraction_digits;
        Ok(service)
    }

    pub fn environment(&self) -> NetworkEnvironment {
        self.endpoints.load().environment.clone()
    }

    pub fn endpoints(&self) -> Arc<Endpoints> {
        self.endpoints.load_full()
    }

    // --- session ---

    pub async fn connect(&self, kind: WalletKind) -> Result<WalletSession, DonationError> {
        Ok(self.session.connect(kind).await?)
    }

    pub async fn disconnect(&self) {
        self.session.disconnect().await;
    }

    pub fn current_session(&self) -> Option<WalletSession> {
        self.session.current_session()
    }

    pub fn available_wallets(&self) -> Vec<WalletKind> {
        self.session.registry().kinds()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<Option<AttemptProgress>> {
        self.orchestrator.subscribe_progress()
    }

    pub fn subscribe_invalidations(&self) -> broadcast::Receiver<Invalidation> {
        self.orchestrator.subscribe_invalidations()
    }

    // --- actions ---

    /// Contribute `amount` display units to `campaign`.
    pub async fn donate(&self, amount: &str, campaign: &str) -> Result<Receipt, DonationError> {
        self.run(ActionRequest::contribute(campaign, amount)).await
    }

    pub async fn refund(&self, campaign: &str) -> Result<Receipt, DonationError> {
        self.run(ActionRequest::refund(campaign)).await
    }

    pub async fn withdraw(&self, campaign: &str) -> Result<Receipt, DonationError> {
        self.run(ActionRequest::withdraw(campaign)).await
    }

    async fn run(&self, request: ActionRequest) -> Result<Receipt, DonationError> {
        let endpoints = self.endpoints.load_full();
        self.orchestrator.run(&endpoints, request).await
    }

    // --- reads ---

    pub async fn get_campaign(&self, campaign: &str) -> Result<Campaign, DonationError> {
        let campaign = Address::parse(campaign)?;
        let endpoints = self.endpoints.load_full();
        Ok(endpoints.contract.get_campaign(&campaign).await?)
    }

    pub async fn get_contribution(&self, campaign: &str, contributor: &str) -> Result<ContributionRecord, DonationError> {
        let campaign = Address::parse(campaign)?;
        let contributor = Address::parse(contributor)?;
        let endpoints = self.endpoints.load_full();
        Ok(endpoints.contract.get_contribution(&campaign, &contributor).await?)
    }

    pub async fn account_transactions(&self, account: &str, limit: u32) -> Result<Vec<TransactionSummary>, DonationError> {
        let account = PublicKey::parse(account)?;
        let endpoints = self.endpoints.load_full();
        Ok(endpoints.ledger.transactions_for_account(&account, limit).await?)
    }

    pub async fn account_payments(&self, account: &str, limit: u32) -> Result<Vec<PaymentRecord>, DonationError> {
        let account = PublicKey::parse(account)?;
        let endpoints = self.endpoints.load_full();
        Ok(endpoints.ledger.payments_for_account(&account, limit).await?)
    }

    /// Format minor units with the configured number of fraction digits.
    pub fn format_amount(&self, minor: MinorUnits) -> String {
        to_display_units(minor, self.fraction_digits)
    }

    // --- reconfiguration ---

    /// Switch to a new network environment with freshly built clients.
    pub async fn reconfigure(&self, environment: NetworkEnvironment) -> Result<(), DonationError> {
        let endpoints = connect_endpoints(environment, &self.ledger_config)?;
        self.swap_endpoints(endpoints).await;
        Ok(())
    }

    /// Install prebuilt clients and end the wallet session.
    pub async fn swap_endpoints(&self, endpoints: Endpoints) {
        let network_id = endpoints.environment.network_id.clone();
        self.endpoints.store(Arc::new(endpoints));
        self.session.teardown(TeardownReason::Reconfigured).await;
        tracing::info!(network = %network_id, "Service reconfigured");
    }
}
