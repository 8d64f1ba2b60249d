//! DSC Client
//!
//! Command-line client for the DSC stablecoin engine.
//! Commands:
//! - `stats`: protocol-wide statistics (cached)
//! - `position [address]`: risk metrics of one account
//! - `deposit|mint|burn|withdraw <amount> [secondary]`: submit a transaction

use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dsc_chain::AlloyChainClient;
use dsc_core::{
    network_config, ClientConfig, DeploymentAddresses, NetworkConfig, ProtocolMetric, Session,
    TracingPresenter, TransactionKind, TransactionOrchestrator, TransactionOutcome,
};

/// Environment variable names.
mod env {
    pub const CHAIN_ID: &str = "DSC_CHAIN_ID";
    pub const RPC_URL: &str = "DSC_RPC_URL";
    pub const ADDRESSES_FILE: &str = "DSC_ADDRESSES_FILE";
    pub const ACCOUNT: &str = "DSC_ACCOUNT";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
}

const DEFAULT_CHAIN_ID: u64 = 31337;

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,dsc_core=debug,dsc_chain=debug")),
        )
        .init();

    // DSC_CONFIG points at a TOML file; otherwise DSC_PROFILE picks a profile
    let config = ClientConfig::load()?;
    config.log_config();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let (session, network) = connect(config, &command).await?;
    let session = Arc::new(session);

    match command {
        Command::Overview => {
            show_stats(&session).await;
            if session.account().is_some() {
                session.refresh_position().await?;
            }
        }
        Command::Stats => show_stats(&session).await,
        Command::Position(_) => {
            session.refresh_position().await?;
        }
        Command::Transact {
            kind,
            primary,
            secondary,
        } => transact(session, network, kind, &primary, &secondary).await?,
    }

    Ok(())
}

/// Parsed command line.
enum Command {
    Overview,
    Stats,
    Position(Option<Address>),
    Transact {
        kind: TransactionKind,
        primary: String,
        secondary: String,
    },
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let Some(name) = args.first() else {
            return Ok(Self::Overview);
        };

        match name.as_str() {
            "stats" => Ok(Self::Stats),
            "position" => {
                let account = args
                    .get(1)
                    .map(|raw| raw.parse().with_context(|| format!("Invalid address: {}", raw)))
                    .transpose()?;
                Ok(Self::Position(account))
            }
            other => {
                let kind = TransactionKind::parse(other)
                    .ok_or_else(|| anyhow::anyhow!("Unknown command: {}", other))?;
                let primary = args
                    .get(1)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("Usage: {} <amount> [secondary]", other))?;
                Ok(Self::Transact {
                    kind,
                    primary,
                    secondary: args.get(2).cloned().unwrap_or_default(),
                })
            }
        }
    }

    fn needs_signer(&self) -> bool {
        matches!(self, Self::Transact { .. })
    }
}

/// Build the chain client and session for the configured network.
async fn connect(
    config: ClientConfig,
    command: &Command,
) -> Result<(Session, &'static NetworkConfig)> {
    let chain_id = match std::env::var(env::CHAIN_ID) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("Invalid {}: {}", env::CHAIN_ID, raw))?,
        Err(_) => DEFAULT_CHAIN_ID,
    };
    let network = network_config(chain_id)?;
    let rpc_url = std::env::var(env::RPC_URL).unwrap_or_else(|_| network.rpc_url.to_string());

    let deployments = match std::env::var(env::ADDRESSES_FILE) {
        Ok(path) => DeploymentAddresses::from_file(path)?,
        Err(_) => DeploymentAddresses::from_env(chain_id),
    };
    let addresses = deployments.resolve(chain_id)?;

    let mut client = AlloyChainClient::new(&rpc_url, addresses)?
        .with_poll_interval(config.transactions.receipt_poll_interval());

    match std::env::var(env::PRIVATE_KEY) {
        Ok(key) => client = client.with_signer(&key)?,
        Err(_) if command.needs_signer() => {
            anyhow::bail!("Missing env var: {}", env::PRIVATE_KEY)
        }
        Err(_) => {}
    }

    let remote_chain_id = client.chain_id().await?;
    if remote_chain_id != chain_id {
        anyhow::bail!(
            "RPC endpoint is on chain {}, expected {} ({})",
            remote_chain_id,
            chain_id,
            network.name
        );
    }

    info!(chain_id, network = network.name, rpc = %rpc_url, "Connected");

    let account = match command {
        Command::Position(Some(account)) => Some(*account),
        _ => match std::env::var(env::ACCOUNT) {
            Ok(raw) => Some(
                raw.parse()
                    .with_context(|| format!("Invalid {}: {}", env::ACCOUNT, raw))?,
            ),
            Err(_) => client.account(),
        },
    };

    let mut session = Session::new(Arc::new(client), Arc::new(TracingPresenter), config);
    if let Some(account) = account {
        session = session.with_account(account);
    } else {
        warn!("No account configured; position metrics unavailable");
    }
    Ok((session, network))
}

async fn show_stats(session: &Session) {
    let stats = session.refresh_protocol_stats().await;
    for metric in ProtocolMetric::ALL {
        info!(
            metric = metric.label(),
            value = stats.get(metric).unwrap_or("-"),
            "Protocol stat"
        );
    }
}

async fn transact(
    session: Arc<Session>,
    network: &NetworkConfig,
    kind: TransactionKind,
    primary: &str,
    secondary: &str,
) -> Result<()> {
    // Last known debt guards burns before anything is signed
    if let Err(e) = session.refresh_position().await {
        warn!(error = %e, "Could not read position before submitting");
    }

    let orchestrator = TransactionOrchestrator::new(session);
    orchestrator.open(kind)?;
    orchestrator.update_form(primary, secondary)?;

    match orchestrator.execute().await? {
        TransactionOutcome::Succeeded { hashes } => {
            for hash in &hashes {
                match network.tx_url(&hash.to_string()) {
                    Some(url) => info!(hash = %hash, url = %url, "Confirmed"),
                    None => info!(hash = %hash, "Confirmed"),
                }
            }
        }
        TransactionOutcome::Failed(classification) => {
            warn!(kind = ?classification.kind, "Transaction failed");
        }
    }

    orchestrator.acknowledge()?;
    Ok(())
}

fn print_banner() {
    println!(
        r#"
  ____  ____   ____
 |  _ \/ ___| / ___|
 | | | \___ \| |
 | |_| |___) | |___
 |____/|____/ \____|

 DSC Client v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
