use std::sync::Arc;

use clap::{Parser, Subcommand};
use herald::{
    abi::AbiLoader,
    cmd::{DecodeArgs, decode},
    config::AppConfig,
    http_client::HttpClientPool,
    notification::NotificationService,
    persistence::SqliteStateRepository,
    providers::{WsChainClient, create_ws_provider},
    supervisor::Supervisor,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the event watcher and the rule API.
    Run {
        /// Directory containing `app.yaml`.
        #[arg(long)]
        config_dir: Option<String>,
    },
    /// Decodes a single log against an ABI file and prints it.
    Decode(DecodeArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config_dir } => run_supervisor(config_dir.as_deref()).await?,
        Commands::Decode(args) => decode::execute(args)?,
    }

    Ok(())
}

async fn run_supervisor(config_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Loading application configuration...");
    let config = AppConfig::new(config_dir)?;
    tracing::debug!(database_url = %config.database_url, abi_path = %config.abi_path.display(), "Configuration loaded.");

    let interface = Arc::new(AbiLoader::new(&config.abi_path).load()?);
    tracing::info!(events = interface.len(), "Contract interface loaded.");

    tracing::debug!("Initializing state repository...");
    let repo = Arc::new(SqliteStateRepository::new(&config.database_url).await?);
    repo.run_migrations().await?;

    tracing::debug!(ws_rpc_url = %config.ws_rpc_url, "Connecting to chain...");
    let provider = create_ws_provider(&config.ws_rpc_url).await?;
    let chain = Arc::new(WsChainClient::new(provider));
    tracing::info!("Connected to chain.");

    let http_pool = HttpClientPool::new(config.http_base_config.clone());
    let notifier = Arc::new(NotificationService::from_config(&config, &http_pool).await?);

    let supervisor = Supervisor::builder()
        .config(config)
        .repository(repo)
        .chain_client(chain)
        .contract_interface(interface)
        .notification_service(notifier)
        .build()?;

    tracing::info!("Supervisor initialized, watching for events...");
    supervisor.run().await?;

    Ok(())
}
