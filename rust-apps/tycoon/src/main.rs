use clap::{
    ArgGroup,
    Parser,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use miner_tycoon::{
    chain_reader::{
        DEFAULT_MAINNET_RPC_URL,
        DEFAULT_TESTNET_RPC_URL,
    },
    inventory_reader::{
        DEFAULT_MAINNET_INDEXER_URL,
        DEFAULT_TESTNET_INDEXER_URL,
    },
    session::{
        DEFAULT_CONFIRMATION_DELAY,
        DEFAULT_POLL_INTERVAL,
        SessionConfig,
    },
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    sync::OnceLock,
    time::Duration,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};
use url::Url;

mod app;
mod commands;
mod wallet;

const DEFAULT_DATA_DIR: &str = "~/.miner-tycoon";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Terminal client for the TON Miner Tycoon staking farm",
    long_about = None,
    group(
        ArgGroup::new("network")
            .args(["testnet", "mainnet"])
            .multiple(false)
    )
)]
struct Args {
    /// Use TON testnet endpoints (default).
    #[arg(long)]
    testnet: bool,

    #[arg(long)]
    mainnet: bool,

    /// Override the toncenter JSON-RPC endpoint.
    #[arg(long, env = "TYCOON_RPC_URL")]
    rpc_url: Option<Url>,

    /// Override the tonapi base URL.
    #[arg(long, env = "TYCOON_INDEXER_URL")]
    indexer_url: Option<Url>,

    #[arg(long, env = "TONCENTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Connect this wallet address on startup.
    #[arg(long)]
    account: Option<String>,

    #[arg(long, env = "TYCOON_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: String,

    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    poll_secs: u64,

    #[arg(long, default_value_t = DEFAULT_CONFIRMATION_DELAY.as_secs())]
    confirm_secs: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    Testnet,
    Mainnet,
}

#[derive(Debug)]
pub struct AppConfig {
    pub network: Network,
    pub rpc_url: String,
    pub indexer_url: String,
    pub api_key: Option<String>,
    pub account: Option<String>,
    pub data_dir: PathBuf,
    pub session: SessionConfig,
}

impl Args {
    fn into_config(self) -> Result<AppConfig> {
        let network = if self.mainnet && !self.testnet {
            Network::Mainnet
        } else {
            Network::Testnet
        };
        let (default_rpc, default_indexer) = match network {
            Network::Testnet => (DEFAULT_TESTNET_RPC_URL, DEFAULT_TESTNET_INDEXER_URL),
            Network::Mainnet => (DEFAULT_MAINNET_RPC_URL, DEFAULT_MAINNET_INDEXER_URL),
        };
        let rpc_url = self
            .rpc_url
            .map(String::from)
            .unwrap_or_else(|| default_rpc.to_string());
        let indexer_url = self
            .indexer_url
            .map(|url| url.as_str().trim_end_matches('/').to_string())
            .unwrap_or_else(|| default_indexer.to_string());
        let data_dir = resolve_data_dir(&self.data_dir)?;
        let session = SessionConfig {
            poll_interval: Duration::from_secs(self.poll_secs.max(1)),
            confirmation_delay: Duration::from_secs(self.confirm_secs),
        };

        Ok(AppConfig {
            network,
            rpc_url,
            indexer_url,
            api_key: self.api_key,
            account: self.account,
            data_dir,
            session,
        })
    }
}

fn resolve_data_dir(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .wrap_err_with(|| format!("failed to expand data directory '{raw}'"))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Logs go to a daily file under the data directory; stdout belongs to the
/// interactive session.
fn init_tracing(data_dir: &Path) -> Result<()> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .wrap_err_with(|| format!("failed to create log directory {}", log_dir.display()))?;
    let appender = rolling::daily(&log_dir, "tycoon.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = Args::parse().into_config()?;
    init_tracing(&config.data_dir)?;
    tracing::info!(
        network = ?config.network,
        rpc = %config.rpc_url,
        indexer = %config.indexer_url,
        "starting miner tycoon client"
    );
    app::run_app(config).await
}
