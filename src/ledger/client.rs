//! Ledger endpoint client with timeout and failover handling.
//!
//! # Responsibilities
//! - Look up accounts (presence, sequence, balances)
//! - Submit signed envelopes, classifying network rejections
//! - Report transaction status for confirmation polling
//! - Page through an account's recent transactions and payments
//! - Provide a health check for the endpoint

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::amount::{parse_non_negative, MinorUnits};
use crate::config::LedgerConfig;
use crate::ledger::types::{
    AccountInfo, Asset, Balance, LedgerError, LedgerResult, PaymentRecord, TransactionStatus, TransactionSummary,
};
use crate::network::{check_endpoint_network, NetworkEnvironment};
use crate::observability::metrics;
use crate::primitives::{PublicKey, SignedPayload, TxHash};
use crate::resilience::{retry_idempotent, RetryPolicy};

/// Read and write operations against the ledger endpoint.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn load_account(&self, account: &PublicKey) -> LedgerResult<AccountInfo>;

    /// Submit once. Never retried by the implementation.
    async fn submit(&self, payload: &SignedPayload) -> LedgerResult<TxHash>;

    /// One immediate status check.
    async fn transaction_status(&self, hash: &TxHash) -> LedgerResult<TransactionStatus>;

    /// Most recent transactions sourced by or touching `account`, newest first.
    async fn transactions_for_account(&self, account: &PublicKey, limit: u32) -> LedgerResult<Vec<TransactionSummary>>;

    /// Most recent payments to or from `account`, newest first.
    async fn payments_for_account(&self, account: &PublicKey, limit: u32) -> LedgerResult<Vec<PaymentRecord>>;

    async fn has_sufficient_balance(&self, account: &PublicKey, amount: MinorUnits) -> LedgerResult<bool> {
        Ok(self.load_account(account).await?.native_balance() >= amount)
    }
}

#[derive(Deserialize)]
struct AccountRecord {
    account_id: String,
    sequence: String,
    #[serde(default)]
    balances: Vec<BalanceRecord>,
}

#[derive(Deserialize)]
struct BalanceRecord {
    balance: String,
    asset_type: String,
    asset_code: Option<String>,
    asset_issuer: Option<String>,
}

#[derive(Deserialize)]
struct SubmitRecord {
    hash: String,
}

#[derive(Deserialize)]
struct TransactionRecord {
    successful: bool,
}

/// Horizon collection envelope.
#[derive(Deserialize)]
struct Page<T> {
    #[serde(rename = "_embedded")]
    embedded: Embedded<T>,
}

#[derive(Deserialize)]
struct Embedded<T> {
    records: Vec<T>,
}

#[derive(Deserialize)]
struct HistoryTransaction {
    hash: String,
    ledger: u64,
    created_at: String,
    successful: bool,
    source_account: String,
    operation_count: u32,
    fee_charged: String,
}

#[derive(Deserialize)]
struct HistoryPayment {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    transaction_hash: String,
    created_at: String,
    from: Option<String>,
    to: Option<String>,
    amount: Option<String>,
    asset_type: Option<String>,
    asset_code: Option<String>,
    asset_issuer: Option<String>,
    // create_account
    funder: Option<String>,
    account: Option<String>,
    starting_balance: Option<String>,
}

#[derive(Deserialize, Default)]
struct ProblemRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    extras: Option<ProblemExtras>,
}

#[derive(Deserialize, Default)]
struct ProblemExtras {
    result_codes: Option<ResultCodes>,
}

#[derive(Deserialize, Default)]
struct ResultCodes {
    transaction: Option<String>,
    #[serde(default)]
    operations: Vec<String>,
}

/// Largest page the endpoint serves.
const MAX_PAGE_LIMIT: u32 = 200;

/// Ledger client for a Horizon-style REST endpoint.
#[derive(Clone)]
pub struct HorizonClient {
    http: reqwest::Client,
    /// Primary endpoint first, then read-only failovers.
    endpoints: Vec<Url>,
    retry: RetryPolicy,
}

impl HorizonClient {
    /// Create a client for the environment's ledger endpoint.
    pub fn new(env: &NetworkEnvironment, config: &LedgerConfig) -> LedgerResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| LedgerError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        let mut endpoints = vec![with_trailing_slash(env.ledger_endpoint_url.clone())];
        for raw in &config.failover_urls {
            let url = match Url::parse(raw) {
                Ok(url) => url,
                Err(_) => {
                    tracing::warn!(url = %raw, "Ignoring invalid failover ledger URL");
                    continue;
                }
            };
            check_endpoint_network(&env.network_id, "ledger.failover_urls", raw)
                .map_err(|e| LedgerError::Configuration(e.to_string()))?;
            endpoints.push(with_trailing_slash(url));
        }

        tracing::info!(
            endpoint = %endpoints[0],
            failovers = endpoints.len() - 1,
            "Ledger client initialized"
        );

        Ok(Self {
            http,
            endpoints,
            retry: RetryPolicy::from(config),
        })
    }

    pub fn primary_endpoint(&self) -> &Url {
        &self.endpoints[0]
    }

    /// Check if the primary endpoint is reachable.
    pub async fn is_healthy(&self) -> bool {
        match self.http.get(self.endpoints[0].clone()).send().await {
            Ok(res) => res.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "Ledger health check failed");
                false
            }
        }
    }

    /// GET `path` from the first endpoint that answers. `None` on 404.
    async fn get_json(&self, path: &str) -> LedgerResult<Option<Value>> {
        for (i, base) in self.endpoints.iter().enumerate() {
            let url = join(base, path)?;
            match self.http.get(url).send().await {
                Ok(res) if res.status() == StatusCode::NOT_FOUND => return Ok(None),
                Ok(res) if res.status().is_success() => {
                    let body = res
                        .json::<Value>()
                        .await
                        .map_err(|e| LedgerError::Protocol(format!("invalid JSON body: {}", e)))?;
                    return Ok(Some(body));
                }
                Ok(res) if res.status().is_server_error() || res.status() == StatusCode::TOO_MANY_REQUESTS => {
                    tracing::warn!(endpoint_idx = i, status = %res.status(), "Ledger endpoint error, trying next");
                }
                Ok(res) => {
                    return Err(LedgerError::Protocol(format!("GET {} returned {}", path, res.status())));
                }
                Err(e) => {
                    tracing::warn!(endpoint_idx = i, error = %e, "Ledger request failed, trying next");
                }
            }
        }
        Err(LedgerError::unavailable("all ledger endpoints failed"))
    }

    /// Fetch one newest-first page of an account sub-collection.
    async fn history_page<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        account: &PublicKey,
        collection: &str,
        limit: u32,
    ) -> LedgerResult<Vec<T>> {
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        let path = format!("accounts/{}/{}?order=desc&limit={}", account, collection, limit);
        let body = self
            .read(operation, &path)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account.to_string()))?;
        let page: Page<T> = serde_json::from_value(body)
            .map_err(|e| LedgerError::Protocol(format!("invalid {} page: {}", collection, e)))?;
        Ok(page.embedded.records)
    }

    async fn read(&self, operation: &str, path: &str) -> LedgerResult<Option<Value>> {
        let result = retry_idempotent(&self.retry, operation, LedgerError::is_retryable, || {
            self.get_json(path)
        })
        .await;
        if let Err(e) = &result {
            metrics::record_remote_error("ledger", e.kind_label());
        }
        result
    }
}

#[async_trait]
impl LedgerApi for HorizonClient {
    async fn load_account(&self, account: &PublicKey) -> LedgerResult<AccountInfo> {
        let path = format!("accounts/{}", account);
        let body = self
            .read("load_account", &path)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account.to_string()))?;

        let record: AccountRecord = serde_json::from_value(body)
            .map_err(|e| LedgerError::Protocol(format!("invalid account record: {}", e)))?;
        parse_account(record)
    }

    async fn submit(&self, payload: &SignedPayload) -> LedgerResult<TxHash> {
        let url = join(&self.endpoints[0], "transactions")?;
        let response = self
            .http
            .post(url)
            .form(&[("tx", payload.as_xdr())])
            .send()
            .await;

        let res = match response {
            Ok(res) => res,
            Err(e) => {
                // A connect failure means the request never left; anything
                // later (timeout, reset) may have been received.
                let maybe_submitted = !e.is_connect();
                metrics::record_remote_error("ledger", "network_unavailable");
                tracing::warn!(error = %e, maybe_submitted, "Transaction submission transport failure");
                return Err(LedgerError::NetworkUnavailable {
                    message: e.to_string(),
                    maybe_submitted,
                });
            }
        };

        let status = res.status();
        if status.is_success() {
            let record: SubmitRecord = res
                .json()
                .await
                .map_err(|e| LedgerError::Protocol(format!("invalid submit response: {}", e)))?;
            let hash = TxHash::new(record.hash);
            tracing::info!(tx_hash = %hash, "Transaction submitted");
            return Ok(hash);
        }

        let problem: ProblemRecord = res.json().await.unwrap_or_default();
        let err = classify_submit_failure(status, problem);
        metrics::record_remote_error("ledger", err.kind_label());
        tracing::warn!(status = %status, error = %err, "Transaction submission failed");
        Err(err)
    }

    async fn transaction_status(&self, hash: &TxHash) -> LedgerResult<TransactionStatus> {
        let path = format!("transactions/{}", hash);
        match self.get_json(&path).await? {
            None => Ok(TransactionStatus::Pending),
            Some(body) => {
                let record: TransactionRecord = serde_json::from_value(body)
                    .map_err(|e| LedgerError::Protocol(format!("invalid transaction record: {}", e)))?;
                Ok(if record.successful {
                    TransactionStatus::Successful
                } else {
                    TransactionStatus::Failed
                })
            }
        }
    }

    async fn transactions_for_account(&self, account: &PublicKey, limit: u32) -> LedgerResult<Vec<TransactionSummary>> {
        let records: Vec<HistoryTransaction> = self
            .history_page("transactions_for_account", account, "transactions", limit)
            .await?;
        records.into_iter().map(parse_history_transaction).collect()
    }

    async fn payments_for_account(&self, account: &PublicKey, limit: u32) -> LedgerResult<Vec<PaymentRecord>> {
        let records: Vec<HistoryPayment> = self
            .history_page("payments_for_account", account, "payments", limit)
            .await?;
        records.into_iter().map(parse_history_payment).collect()
    }
}

fn classify_submit_failure(status: StatusCode, problem: ProblemRecord) -> LedgerError {
    let message = if problem.detail.is_empty() {
        if problem.title.is_empty() {
            status.to_string()
        } else {
            problem.title.clone()
        }
    } else {
        problem.detail.clone()
    };

    match status {
        StatusCode::BAD_REQUEST => {
            let codes = problem.extras.and_then(|e| e.result_codes).unwrap_or_default();
            let reason_codes = codes.transaction.into_iter().chain(codes.operations).collect();
            LedgerError::SubmissionRejected { message, reason_codes }
        }
        // Rejected before processing.
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::TOO_MANY_REQUESTS => LedgerError::NetworkUnavailable {
            message,
            maybe_submitted: false,
        },
        // Includes 504: the network may still include the transaction.
        s if s.is_server_error() => LedgerError::NetworkUnavailable {
            message,
            maybe_submitted: true,
        },
        _ => LedgerError::Protocol(format!("submit returned {}: {}", status, message)),
    }
}

fn parse_account(record: AccountRecord) -> LedgerResult<AccountInfo> {
    let account_id = PublicKey::parse(&record.account_id)
        .map_err(|e| LedgerError::Protocol(format!("invalid account id: {}", e)))?;
    let sequence = record
        .sequence
        .parse::<u64>()
        .map_err(|e| LedgerError::Protocol(format!("invalid sequence '{}': {}", record.sequence, e)))?;

    let mut balances = Vec::with_capacity(record.balances.len());
    for b in record.balances {
        let amount = parse_non_negative(&b.balance)
            .map_err(|e| LedgerError::Protocol(format!("invalid balance: {}", e)))?;
        let asset = match (b.asset_type.as_str(), b.asset_code, b.asset_issuer) {
            ("native", _, _) => Asset::Native,
            (_, Some(code), Some(issuer)) => Asset::Credit { code, issuer },
            // Liquidity pool shares and similar have no code/issuer.
            _ => continue,
        };
        balances.push(Balance { asset, amount });
    }

    Ok(AccountInfo {
        account_id,
        sequence,
        balances,
    })
}

fn parse_history_transaction(record: HistoryTransaction) -> LedgerResult<TransactionSummary> {
    let fee_charged = record
        .fee_charged
        .parse::<u64>()
        .map_err(|e| LedgerError::Protocol(format!("invalid fee_charged '{}': {}", record.fee_charged, e)))?;
    Ok(TransactionSummary {
        hash: TxHash::new(record.hash),
        ledger: record.ledger,
        created_at: record.created_at,
        successful: record.successful,
        source_account: record.source_account,
        operation_count: record.operation_count,
        fee_charged: MinorUnits(fee_charged),
    })
}

fn parse_history_payment(record: HistoryPayment) -> LedgerResult<PaymentRecord> {
    let created = record.kind == "create_account";
    let raw_amount = if created { record.starting_balance } else { record.amount };
    let amount = raw_amount
        .map(|a| parse_non_negative(&a).map_err(|e| LedgerError::Protocol(format!("invalid payment amount: {}", e))))
        .transpose()?;

    let asset = match (record.asset_type.as_deref(), record.asset_code, record.asset_issuer) {
        (Some("native"), _, _) => Some(Asset::Native),
        (_, Some(code), Some(issuer)) => Some(Asset::Credit { code, issuer }),
        _ if created => Some(Asset::Native),
        _ => None,
    };

    Ok(PaymentRecord {
        id: record.id,
        operation_type: record.kind,
        transaction_hash: TxHash::new(record.transaction_hash),
        created_at: record.created_at,
        from: if created { record.funder } else { record.from },
        to: if created { record.account } else { record.to },
        asset,
        amount,
    })
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn join(base: &Url, path: &str) -> LedgerResult<Url> {
    base.join(path)
        .map_err(|e| LedgerError::Protocol(format!("invalid endpoint path '{}': {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_reason_codes() {
        let problem: ProblemRecord = serde_json::from_str(
            r#"{
                "title": "Transaction Failed",
                "status": 400,
                "extras": {"result_codes": {"transaction": "tx_failed", "operations": ["op_underfunded"]}}
            }"#,
        )
        .unwrap();

        match classify_submit_failure(StatusCode::BAD_REQUEST, problem) {
            LedgerError::SubmissionRejected { message, reason_codes } => {
                assert_eq!(message, "Transaction Failed");
                assert_eq!(reason_codes, vec!["tx_failed", "op_underfunded"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_gateway_timeout_is_ambiguous() {
        let err = classify_submit_failure(StatusCode::GATEWAY_TIMEOUT, ProblemRecord::default());
        assert_eq!(
            err,
            LedgerError::NetworkUnavailable {
                message: "504 Gateway Timeout".into(),
                maybe_submitted: true
            }
        );

        let err = classify_submit_failure(StatusCode::SERVICE_UNAVAILABLE, ProblemRecord::default());
        assert!(matches!(err, LedgerError::NetworkUnavailable { maybe_submitted: false, .. }));
    }

    #[test]
    fn test_parse_account_skips_pool_shares() {
        let record: AccountRecord = serde_json::from_str(
            r#"{
                "account_id": "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7",
                "sequence": "4294967296",
                "balances": [
                    {"balance": "12.5000000", "asset_type": "native"},
                    {"balance": "1.0000000", "asset_type": "liquidity_pool_shares"}
                ]
            }"#,
        )
        .unwrap();

        let account = parse_account(record).unwrap();
        assert_eq!(account.sequence, 4_294_967_296);
        assert_eq!(account.balances.len(), 1);
        assert_eq!(account.native_balance(), MinorUnits(125_000_000));
    }

    #[test]
    fn test_trailing_slash_join() {
        let base = with_trailing_slash(Url::parse("http://127.0.0.1:8000/horizon").unwrap());
        assert_eq!(
            join(&base, "transactions").unwrap().as_str(),
            "http://127.0.0.1:8000/horizon/transactions"
        );
    }
}
