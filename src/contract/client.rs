//! Typed façade over the crowdfunding contract.
//!
//! # Responsibilities
//! - Validate method arguments before any network call
//! - Build unsigned invocations (source sequence + remote simulation)
//! - Read campaign and contribution state
//!
//! Authorization is enforced by the contract. The caller passes the
//! active session key as the role argument; a wrong identity surfaces as
//! `ContractCallFailed` from the simulation.

use std::sync::Arc;

use crate::amount::MinorUnits;
use crate::contract::rpc::{ContractRpc, SimulationRequest, SimulationResponse};
use crate::contract::types::{
    Campaign, ContractError, ContractMethod, ContractResult, ContributionRecord, Invocation, ScArg,
};
use crate::ledger::{calculate_fee, LedgerApi};
use crate::observability::metrics;
use crate::primitives::{Address, ContractAddress, PublicKey, UnsignedPayload};
use crate::resilience::{retry_idempotent, RetryPolicy};

/// Builds invocations of one deployed contract on one network.
#[derive(Clone)]
pub struct ContractClient {
    rpc: Arc<dyn ContractRpc>,
    ledger: Arc<dyn LedgerApi>,
    contract_id: ContractAddress,
    network_passphrase: String,
    base_fee: u64,
    read_retry: RetryPolicy,
}

impl ContractClient {
    pub fn new(
        rpc: Arc<dyn ContractRpc>,
        ledger: Arc<dyn LedgerApi>,
        contract_id: ContractAddress,
        network_passphrase: impl Into<String>,
        base_fee: u64,
    ) -> Self {
        Self {
            rpc,
            ledger,
            contract_id,
            network_passphrase: network_passphrase.into(),
            base_fee,
            read_retry: RetryPolicy::none(),
        }
    }

    /// Retry policy for idempotent reads.
    pub fn with_read_retry(mut self, policy: RetryPolicy) -> Self {
        self.read_retry = policy;
        self
    }

    pub fn contract_id(&self) -> &ContractAddress {
        &self.contract_id
    }

    /// Build an unsigned invocation of `method` signed by `source`.
    ///
    /// Validates arity and types first, then loads the source account's
    /// sequence and asks the endpoint to simulate and assemble the envelope.
    pub async fn build_invocation(
        &self,
        method: ContractMethod,
        args: Vec<ScArg>,
        source: &PublicKey,
    ) -> ContractResult<UnsignedPayload> {
        let invocation = Invocation::new(method, args)?;

        let account = self.ledger.load_account(source).await?;
        let request = SimulationRequest {
            contract_id: self.contract_id.to_string(),
            function: method.name().to_string(),
            args: invocation.args().to_vec(),
            source: Some(source.to_string()),
            sequence: Some(account.sequence),
            fee: calculate_fee(self.base_fee, 1),
            network_passphrase: self.network_passphrase.clone(),
        };

        let sim = self.rpc.simulate(&request).await?;
        let xdr = sim
            .transaction_xdr
            .filter(|x| !x.is_empty())
            .ok_or_else(|| ContractError::Protocol(format!("simulation of {} returned no transaction", method)))?;

        tracing::debug!(
            method = %method,
            source = %source.abbreviated(),
            sequence = account.sequence,
            latest_ledger = sim.latest_ledger,
            "Invocation built"
        );
        Ok(UnsignedPayload::new(xdr))
    }

    /// Build by method name, as received from an untyped caller.
    pub async fn build_named(&self, method: &str, args: Vec<ScArg>, source: &PublicKey) -> ContractResult<UnsignedPayload> {
        let method: ContractMethod = method.parse()?;
        self.build_invocation(method, args, source).await
    }

    pub async fn create_campaign(
        &self,
        creator: &PublicKey,
        goal: MinorUnits,
        min_donation: MinorUnits,
    ) -> ContractResult<UnsignedPayload> {
        let args = vec![ScArg::address(creator), ScArg::amount(goal), ScArg::amount(min_donation)];
        self.build_invocation(ContractMethod::CreateCampaign, args, creator).await
    }

    pub async fn contribute(
        &self,
        contributor: &PublicKey,
        campaign: &Address,
        amount: MinorUnits,
    ) -> ContractResult<UnsignedPayload> {
        let args = vec![ScArg::address(contributor), ScArg::address(campaign), ScArg::amount(amount)];
        self.build_invocation(ContractMethod::Contribute, args, contributor).await
    }

    pub async fn refund(&self, contributor: &PublicKey, campaign: &Address) -> ContractResult<UnsignedPayload> {
        let args = vec![ScArg::address(contributor), ScArg::address(campaign)];
        self.build_invocation(ContractMethod::Refund, args, contributor).await
    }

    pub async fn withdraw(&self, creator: &PublicKey) -> ContractResult<UnsignedPayload> {
        self.build_invocation(ContractMethod::Withdraw, vec![ScArg::address(creator)], creator)
            .await
    }

    pub async fn get_campaign(&self, campaign: &Address) -> ContractResult<Campaign> {
        let result = self
            .read(ContractMethod::GetCampaign, vec![ScArg::address(campaign)])
            .await?;
        match result {
            Some(value) if !value.is_null() => Campaign::from_result(campaign.clone(), &value),
            _ => Err(ContractError::ContractCallFailed {
                message: format!("campaign {} not found", campaign),
                reason_codes: Vec::new(),
            }),
        }
    }

    pub async fn get_contribution(&self, campaign: &Address, contributor: &Address) -> ContractResult<ContributionRecord> {
        let result = self
            .read(
                ContractMethod::GetContribution,
                vec![ScArg::address(campaign), ScArg::address(contributor)],
            )
            .await?;
        let value = result.unwrap_or(serde_json::Value::Null);
        ContributionRecord::from_result(campaign.clone(), contributor.clone(), &value)
    }

    async fn read(&self, method: ContractMethod, args: Vec<ScArg>) -> ContractResult<Option<serde_json::Value>> {
        let invocation = Invocation::new(method, args)?;
        let request = SimulationRequest {
            contract_id: self.contract_id.to_string(),
            function: method.name().to_string(),
            args: invocation.args().to_vec(),
            source: None,
            sequence: None,
            fee: calculate_fee(self.base_fee, 1),
            network_passphrase: self.network_passphrase.clone(),
        };

        let outcome = retry_idempotent(&self.read_retry, method.name(), ContractError::is_retryable, || {
            self.rpc.simulate(&request)
        })
        .await;

        match outcome {
            Ok(SimulationResponse { result, .. }) => Ok(result),
            Err(e) => {
                metrics::record_remote_error("contract", e.kind_label());
                tracing::warn!(method = %method, error = %e, "Contract read failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for ContractClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractClient")
            .field("contract_id", &self.contract_id)
            .field("base_fee", &self.base_fee)
            .finish()
    }
}
