//! JSON-RPC client for the contract-simulation endpoint.
//!
//! # Responsibilities
//! - Send `simulateInvocation` requests (JSON-RPC 2.0)
//! - Classify transport failures, RPC errors and simulation errors
//!
//! The endpoint assembles the transaction envelope from the current
//! source sequence, so the client never handles XDR itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

use crate::contract::types::{ContractError, ContractResult, ScArg};
use crate::observability::metrics;

/// Parameters of one simulation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    pub contract_id: String,
    pub function: String,
    pub args: Vec<ScArg>,
    /// Source account; absent for read-only calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Current sequence of the source account. The envelope uses the next one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    pub fee: u64,
    pub network_passphrase: String,
}

/// Simulation outcome as returned by the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResponse {
    /// Assembled unsigned envelope, present for invocations that need signing.
    pub transaction_xdr: Option<String>,
    /// Decoded return value of the contract function.
    pub result: Option<Value>,
    pub min_resource_fee: Option<String>,
    #[serde(default)]
    pub latest_ledger: u64,
    /// Set when the contract rejected the call during simulation.
    pub error: Option<String>,
    #[serde(default)]
    pub error_codes: Vec<String>,
}

/// The contract-simulation capability.
#[async_trait]
pub trait ContractRpc: Send + Sync {
    async fn simulate(&self, request: &SimulationRequest) -> ContractResult<SimulationResponse>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: &'a SimulationRequest,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<SimulationResponse>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// HTTP client for a Soroban-style RPC endpoint.
pub struct SorobanRpcClient {
    http: reqwest::Client,
    endpoint: Url,
    next_id: AtomicU64,
}

impl SorobanRpcClient {
    pub fn new(endpoint: Url, request_timeout: Duration) -> ContractResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ContractError::Protocol(format!("failed to build HTTP client: {}", e)))?;

        tracing::info!(endpoint = %endpoint, "Contract RPC client initialized");

        Ok(Self {
            http,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Check if the endpoint answers a `getHealth` call.
    pub async fn is_healthy(&self) -> bool {
        let body = serde_json::json!({"jsonrpc": "2.0", "id": 0, "method": "getHealth"});
        match self.http.post(self.endpoint.clone()).json(&body).send().await {
            Ok(res) => res.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "Contract RPC health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl ContractRpc for SorobanRpcClient {
    async fn simulate(&self, request: &SimulationRequest) -> ContractResult<SimulationResponse> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method: "simulateInvocation",
            params: request,
        };

        let res = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                metrics::record_remote_error("contract", "network_unavailable");
                tracing::warn!(error = %e, function = %request.function, "Contract RPC request failed");
                ContractError::NetworkUnavailable(e.to_string())
            })?;

        let status = res.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            metrics::record_remote_error("contract", "network_unavailable");
            return Err(ContractError::NetworkUnavailable(format!("endpoint returned {}", status)));
        }
        if !status.is_success() {
            return Err(ContractError::Protocol(format!("endpoint returned {}", status)));
        }

        let envelope: RpcResponse = res
            .json()
            .await
            .map_err(|e| ContractError::Protocol(format!("invalid JSON-RPC response: {}", e)))?;

        if let Some(err) = envelope.error {
            metrics::record_remote_error("contract", "contract_call_failed");
            return Err(ContractError::ContractCallFailed {
                message: err.message,
                reason_codes: vec![err.code.to_string()],
            });
        }

        let sim = envelope
            .result
            .ok_or_else(|| ContractError::Protocol("JSON-RPC response has neither result nor error".into()))?;

        if let Some(message) = sim.error {
            metrics::record_remote_error("contract", "contract_call_failed");
            tracing::debug!(function = %request.function, error = %message, "Simulation rejected");
            return Err(ContractError::ContractCallFailed {
                message,
                reason_codes: sim.error_codes,
            });
        }

        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_form() {
        let request = SimulationRequest {
            contract_id: "CABC".into(),
            function: "contribute".into(),
            args: vec![ScArg::I128(5)],
            source: Some("GABC".into()),
            sequence: Some(42),
            fee: 100,
            network_passphrase: "Test SDF Network ; September 2015".into(),
        };
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "simulateInvocation",
            params: &request,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["method"], "simulateInvocation");
        assert_eq!(value["params"]["contractId"], "CABC");
        assert_eq!(value["params"]["networkPassphrase"], "Test SDF Network ; September 2015");
        assert_eq!(value["params"]["args"][0], json!({"type": "i128", "value": "5"}));
        assert_eq!(value["params"]["sequence"], 42);
    }

    #[test]
    fn test_read_request_omits_source() {
        let request = SimulationRequest {
            contract_id: "CABC".into(),
            function: "get_campaign".into(),
            args: vec![],
            source: None,
            sequence: None,
            fee: 100,
            network_passphrase: "p".into(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("source").is_none());
        assert!(value.get("sequence").is_none());
    }

    #[test]
    fn test_response_decoding() {
        let sim: SimulationResponse = serde_json::from_value(json!({
            "transactionXdr": "AAAA",
            "minResourceFee": "5000",
            "latestLedger": 1234
        }))
        .unwrap();
        assert_eq!(sim.transaction_xdr.as_deref(), Some("AAAA"));
        assert_eq!(sim.latest_ledger, 1234);
        assert!(sim.error.is_none());
    }
}
