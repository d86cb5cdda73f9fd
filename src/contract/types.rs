//! Contract method table, typed arguments and decoded results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::amount::MinorUnits;
use crate::ledger::LedgerError;
use crate::primitives::{Address, AddressError, PublicKey};

/// Errors that can occur building or reading a contract invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// Arguments violate the method's arity or typing contract.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The remote simulation rejected the call.
    #[error("contract call failed: {message}")]
    ContractCallFailed {
        message: String,
        reason_codes: Vec<String>,
    },

    /// Transport failure reaching the simulation endpoint.
    #[error("contract endpoint unavailable: {0}")]
    NetworkUnavailable(String),

    /// Loading the source account failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The endpoint answered with something we cannot interpret.
    #[error("unexpected contract response: {0}")]
    Protocol(String),
}

impl ContractError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkUnavailable(_) => true,
            Self::Ledger(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::ContractCallFailed { .. } => "contract_call_failed",
            Self::NetworkUnavailable(_) => "network_unavailable",
            Self::Ledger(e) => e.kind_label(),
            Self::Protocol(_) => "protocol",
        }
    }
}

impl From<AddressError> for ContractError {
    fn from(e: AddressError) -> Self {
        Self::InvalidArguments(e.to_string())
    }
}

pub type ContractResult<T> = Result<T, ContractError>;

/// Declared type of one contract argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    /// Account key only; used for caller roles.
    Account,
    /// Account or contract address.
    Address,
    /// Non-negative amount; `positive` additionally rejects zero.
    Amount { positive: bool },
}

/// Remote-callable methods of the crowdfunding contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractMethod {
    CreateCampaign,
    GetCampaign,
    GetContribution,
    Contribute,
    Withdraw,
    Refund,
}

impl ContractMethod {
    pub const ALL: [ContractMethod; 6] = [
        Self::CreateCampaign,
        Self::GetCampaign,
        Self::GetContribution,
        Self::Contribute,
        Self::Withdraw,
        Self::Refund,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CreateCampaign => "create_campaign",
            Self::GetCampaign => "get_campaign",
            Self::GetContribution => "get_contribution",
            Self::Contribute => "contribute",
            Self::Withdraw => "withdraw",
            Self::Refund => "refund",
        }
    }

    /// Ordered parameter names and types.
    pub fn signature(self) -> &'static [(&'static str, ArgType)] {
        match self {
            Self::CreateCampaign => &[
                ("creator", ArgType::Account),
                ("goal", ArgType::Amount { positive: true }),
                ("min_donation", ArgType::Amount { positive: false }),
            ],
            Self::GetCampaign => &[("campaign_address", ArgType::Address)],
            Self::GetContribution => &[
                ("campaign_address", ArgType::Address),
                ("contributor", ArgType::Address),
            ],
            Self::Contribute => &[
                ("contributor", ArgType::Account),
                ("campaign_address", ArgType::Address),
                ("amount", ArgType::Amount { positive: true }),
            ],
            Self::Withdraw => &[("creator", ArgType::Account)],
            Self::Refund => &[
                ("contributor", ArgType::Account),
                ("campaign_address", ArgType::Address),
            ],
        }
    }

    pub fn is_read_only(self) -> bool {
        matches!(self, Self::GetCampaign | Self::GetContribution)
    }
}

impl fmt::Display for ContractMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContractMethod {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| ContractError::InvalidArguments(format!("unknown contract method '{}'", s)))
    }
}

/// A typed contract argument in its JSON wire form.
///
/// `{"type": "address", "value": "G..."}` or `{"type": "i128", "value": "125000000"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ScArg {
    Address(String),
    I128(#[serde(with = "i128_string")] i128),
}

impl ScArg {
    pub fn address(address: impl fmt::Display) -> Self {
        Self::Address(address.to_string())
    }

    pub fn amount(amount: MinorUnits) -> Self {
        Self::I128(i128::from(amount.get()))
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Address(_) => "address",
            Self::I128(_) => "i128",
        }
    }
}

mod i128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A validated method call: the method plus arguments matching its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    method: ContractMethod,
    args: Vec<ScArg>,
}

impl Invocation {
    /// Check `args` against the method signature.
    pub fn new(method: ContractMethod, args: Vec<ScArg>) -> ContractResult<Self> {
        let signature = method.signature();
        if args.len() != signature.len() {
            return Err(ContractError::InvalidArguments(format!(
                "{} takes {} argument(s), got {}",
                method,
                signature.len(),
                args.len()
            )));
        }

        for ((name, expected), arg) in signature.iter().zip(&args) {
            check_arg(method, name, *expected, arg)?;
        }

        Ok(Self { method, args })
    }

    pub fn method(&self) -> ContractMethod {
        self.method
    }

    pub fn args(&self) -> &[ScArg] {
        &self.args
    }
}

fn check_arg(method: ContractMethod, name: &str, expected: ArgType, arg: &ScArg) -> ContractResult<()> {
    let mismatch = || {
        ContractError::InvalidArguments(format!(
            "{}: argument '{}' must be {}, got {}",
            method,
            name,
            match expected {
                ArgType::Account => "an account address",
                ArgType::Address => "an address",
                ArgType::Amount { .. } => "an i128 amount",
            },
            arg.type_name()
        ))
    };

    match (expected, arg) {
        (ArgType::Account, ScArg::Address(raw)) => {
            PublicKey::parse(raw).map_err(|e| invalid_field(method, name, e))?;
        }
        (ArgType::Address, ScArg::Address(raw)) => {
            Address::parse(raw).map_err(|e| invalid_field(method, name, e))?;
        }
        (ArgType::Amount { positive }, ScArg::I128(value)) => {
            if *value < 0 || (positive && *value == 0) {
                return Err(ContractError::InvalidArguments(format!(
                    "{}: argument '{}' must be {}, got {}",
                    method,
                    name,
                    if positive { "positive" } else { "non-negative" },
                    value
                )));
            }
        }
        _ => return Err(mismatch()),
    }
    Ok(())
}

fn invalid_field(method: ContractMethod, name: &str, e: AddressError) -> ContractError {
    ContractError::InvalidArguments(format!("{}: argument '{}': {}", method, name, e))
}

/// Campaign snapshot as reported by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Campaign {
    pub address: Address,
    pub creator: PublicKey,
    pub goal: MinorUnits,
    pub min_donation: MinorUnits,
    pub total_raised: MinorUnits,
    pub supporter_count: u32,
}

impl Campaign {
    /// Decode a `get_campaign` result value.
    pub fn from_result(address: Address, value: &Value) -> ContractResult<Self> {
        let creator = value
            .get("creator")
            .and_then(Value::as_str)
            .ok_or_else(|| ContractError::Protocol("campaign result missing 'creator'".into()))?;
        let creator = PublicKey::parse(creator)
            .map_err(|e| ContractError::Protocol(format!("campaign creator: {}", e)))?;

        let supporter_count: u32 = match value.get("supporters") {
            None | Some(Value::Null) => 0,
            Some(v) => decode_amount(v, "supporters")?
                .get()
                .try_into()
                .map_err(|_| ContractError::Protocol("supporter count out of range".into()))?,
        };

        Ok(Self {
            address,
            creator,
            goal: required_amount(value, "goal")?,
            min_donation: optional_amount(value, "min_donation")?,
            total_raised: optional_amount(value, "total_raised")?,
            supporter_count,
        })
    }

    /// Amount still needed to reach the goal.
    pub fn remaining(&self) -> MinorUnits {
        MinorUnits(self.goal.get().saturating_sub(self.total_raised.get()))
    }

    /// Funding progress in percent, capped at 100.
    pub fn progress_percent(&self) -> f64 {
        if self.goal.is_zero() {
            return 0.0;
        }
        (self.total_raised.get() as f64 / self.goal.get() as f64 * 100.0).min(100.0)
    }
}

/// One contributor's recorded contribution to a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributionRecord {
    pub campaign_address: Address,
    pub contributor: Address,
    pub amount: MinorUnits,
    pub timestamp: Option<u64>,
}

impl ContributionRecord {
    /// Decode a `get_contribution` result. The contract may answer with a
    /// bare amount, an object, or null when nothing was contributed.
    pub fn from_result(campaign_address: Address, contributor: Address, value: &Value) -> ContractResult<Self> {
        let (amount, timestamp) = match value {
            Value::Null => (MinorUnits::ZERO, None),
            Value::Object(_) => (
                optional_amount(value, "amount")?,
                value.get("timestamp").and_then(Value::as_u64).filter(|t| *t > 0),
            ),
            other => (decode_amount(other, "amount")?, None),
        };

        Ok(Self {
            campaign_address,
            contributor,
            amount,
            timestamp,
        })
    }
}

/// Accept an i128 amount encoded as a JSON number or decimal string.
fn decode_amount(value: &Value, field: &str) -> ContractResult<MinorUnits> {
    let parsed: Option<i128> = match value {
        Value::Number(n) => n.as_u64().map(i128::from).or_else(|| n.as_i64().map(i128::from)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    let parsed = parsed.ok_or_else(|| ContractError::Protocol(format!("'{}' is not an integer", field)))?;
    u64::try_from(parsed)
        .map(MinorUnits)
        .map_err(|_| ContractError::Protocol(format!("'{}' out of range: {}", field, parsed)))
}

fn required_amount(value: &Value, field: &str) -> ContractResult<MinorUnits> {
    let raw = value
        .get(field)
        .ok_or_else(|| ContractError::Protocol(format!("result missing '{}'", field)))?;
    decode_amount(raw, field)
}

fn optional_amount(value: &Value, field: &str) -> ContractResult<MinorUnits> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(MinorUnits::ZERO),
        Some(raw) => decode_amount(raw, field),
    }
}
