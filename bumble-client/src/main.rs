//! bumble-client: connects to a bumble router, authenticates, and sends a
//! heartbeat message to itself every second while authenticated.
//!
//! Reconnects after every disconnect. Exits with status 1 on a bad config,
//! an unreadable key, or a fatal session error.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Result, anyhow};
use clap::Parser;

use bumble_client::config::{ClientSettings, Config, DEFAULT_CONFIG_FILE};
use bumble_client::dispatcher::LogHandler;
use bumble_client::runtime::Runtime;
use bumble_sdk::{ClientIdentity, TcpTransport, load_private_key};

#[derive(Parser)]
#[command(name = "bumble-client", about = "Example client for a bumble router")]
struct Args {
    /// Path to the JSON config file
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Router address (host:port), overrides RouterAddress from the config
    #[arg(long, env = "BUMBLE_ROUTER")]
    router: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bumble_client=info,bumble_sdk=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // `run` only comes back with an error.
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(&args.config).map_err(|e| anyhow!(e.diagnostic()))?;
    let settings = ClientSettings::resolve(&args.config, &config, args.router.as_deref())
        .map_err(|e| anyhow!(e.diagnostic()))?;

    let key = load_private_key(&settings.key_path).map_err(|e| anyhow!("[PRIVATEKEY ERROR] {e}"))?;
    let identity = ClientIdentity::new(settings.name, key);

    let transport =
        TcpTransport::new(settings.router_addr).with_connect_timeout(settings.connect_timeout);
    tracing::info!(
        name = identity.name(),
        router = transport.router_addr(),
        key = %settings.key_path.display(),
        "Starting bumble client"
    );

    let runtime = Runtime::new(transport, identity, LogHandler, settings.runtime);
    let fatal = runtime.run().await;

    Err(anyhow!("[FATAL] {fatal}"))
}
