//! `crowdfund`: operator CLI over the donation library.
//!
//! Read-only commands against the configured network: inspect the
//! resolved environment, accounts, campaigns and transactions. Output is
//! pretty JSON on stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use crowdfund_orchestrator::amount::{to_display_units, to_minor_units, MinorUnits};
use crowdfund_orchestrator::config::{load_config, AppConfig};
use crowdfund_orchestrator::contract::{ContractClient, SorobanRpcClient};
use crowdfund_orchestrator::ledger::{wait_for_confirmation, HorizonClient, LedgerApi};
use crowdfund_orchestrator::network::{self, NetworkEnvironment};
use crowdfund_orchestrator::observability::{logging, metrics};
use crowdfund_orchestrator::primitives::{Address, PublicKey, TxHash};
use crowdfund_orchestrator::resilience::RetryPolicy;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "crowdfund")]
#[command(about = "Inspect crowdfunding campaigns and transactions on a Stellar network", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "crowdfund.toml")]
    config: PathBuf,

    /// Network profile to use instead of the configured one
    #[arg(short, long)]
    network: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved network environment and endpoint health
    Network,
    /// Look up an account's sequence and balances
    Account { key: String },
    /// List an account's most recent transactions, or payments with --payments
    History {
        key: String,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        payments: bool,
    },
    /// Fetch a campaign snapshot from the contract
    Campaign { address: String },
    /// Fetch one contributor's recorded contribution
    Contribution { campaign: String, contributor: String },
    /// One immediate status check for a transaction
    TxStatus { hash: String },
    /// Poll until a transaction is confirmed, fails or times out
    Wait {
        hash: String,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Convert between display units and minor units
    Convert {
        #[arg(long, conflicts_with = "to_display", required_unless_present = "to_display")]
        to_minor: Option<String>,
        #[arg(long)]
        to_display: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut config = load_config(&cli.config)?;
    if let Some(name) = cli.network {
        config.network.name = name;
    }

    logging::init_logging(&config.observability);
    tracing::debug!(config = %cli.config.display(), "Configuration loaded");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    if let Commands::Convert { to_minor, to_display } = &cli.command {
        return convert(&config, to_minor.as_deref(), *to_display);
    }

    let environment = network::resolve(&config.network)?;
    let ledger = HorizonClient::new(&environment, &config.ledger)?;

    match cli.command {
        Commands::Network => {
            let rpc = SorobanRpcClient::new(environment.contract_rpc_url.clone(), config.ledger.request_timeout())?;
            let (ledger_healthy, rpc_healthy) = tokio::join!(ledger.is_healthy(), rpc.is_healthy());
            print_json(&json!({
                "environment": environment,
                "ledger_healthy": ledger_healthy,
                "contract_rpc_healthy": rpc_healthy,
            }))
        }
        Commands::Account { key } => {
            let key = PublicKey::parse(&key)?;
            let account = ledger.load_account(&key).await?;
            print_json(&json!({
                "account": account,
                "native_balance": to_display_units(account.native_balance(), config.display.fraction_digits),
            }))
        }
        Commands::History { key, limit, payments } => {
            let key = PublicKey::parse(&key)?;
            if payments {
                let records = ledger.payments_for_account(&key, limit).await?;
                print_json(&json!({ "account": key, "payments": records }))
            } else {
                let records = ledger.transactions_for_account(&key, limit).await?;
                print_json(&json!({ "account": key, "transactions": records }))
            }
        }
        Commands::Campaign { address } => {
            let address = Address::parse(&address)?;
            let contract = contract_client(&environment, &config, ledger)?;
            let campaign = contract.get_campaign(&address).await?;
            let digits = config.display.fraction_digits;
            print_json(&json!({
                "campaign": campaign,
                "goal": to_display_units(campaign.goal, digits),
                "total_raised": to_display_units(campaign.total_raised, digits),
                "remaining": to_display_units(campaign.remaining(), digits),
                "progress_percent": campaign.progress_percent(),
            }))
        }
        Commands::Contribution { campaign, contributor } => {
            let campaign = Address::parse(&campaign)?;
            let contributor = Address::parse(&contributor)?;
            let contract = contract_client(&environment, &config, ledger)?;
            let record = contract.get_contribution(&campaign, &contributor).await?;
            print_json(&json!({
                "contribution": record,
                "amount": to_display_units(record.amount, config.display.fraction_digits),
            }))
        }
        Commands::TxStatus { hash } => {
            let hash = TxHash::new(hash);
            let status = ledger.transaction_status(&hash).await?;
            print_json(&json!({ "hash": hash, "status": status }))
        }
        Commands::Wait { hash, timeout_secs } => {
            let hash = TxHash::new(hash);
            let deadline = timeout_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.confirmation.timeout());
            let started = tokio::time::Instant::now();
            let outcome = wait_for_confirmation(
                &ledger,
                &hash,
                config.confirmation.poll_interval(),
                deadline,
                async {
                    let _ = tokio::signal::ctrl_c().await;
                },
            )
            .await;
            print_json(&json!({
                "hash": hash,
                "outcome": outcome.as_str(),
                "elapsed_ms": started.elapsed().as_millis() as u64,
            }))
        }
        Commands::Convert { .. } => Ok(()),
    }
}

fn contract_client(environment: &NetworkEnvironment, config: &AppConfig, ledger: HorizonClient) -> CliResult<ContractClient> {
    let rpc = SorobanRpcClient::new(environment.contract_rpc_url.clone(), config.ledger.request_timeout())?;
    let ledger: Arc<dyn LedgerApi> = Arc::new(ledger);
    Ok(ContractClient::new(
        Arc::new(rpc),
        ledger,
        environment.contract_id.clone(),
        environment.network_passphrase.clone(),
        config.ledger.base_fee,
    )
    .with_read_retry(RetryPolicy::from(&config.ledger)))
}

fn convert(config: &AppConfig, to_minor: Option<&str>, to_display: Option<u64>) -> CliResult<()> {
    match (to_minor, to_display) {
        (Some(amount), _) => {
            let minor = to_minor_units(amount)?;
            print_json(&json!({ "display": amount, "minor_units": minor }))
        }
        (None, Some(minor)) => {
            let display = to_display_units(MinorUnits(minor), config.display.fraction_digits);
            print_json(&json!({ "minor_units": minor, "display": display }))
        }
        (None, None) => Err("one of --to-minor or --to-display is required".into()),
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
