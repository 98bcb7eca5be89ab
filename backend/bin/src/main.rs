//! Wallet Guard Binary
//!
//! Runs the guard service and offers a few helpers to operate it.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
#[cfg(feature = "mocks")]
use wallet_guard_lib::data::registry::MockRegistry;
use wallet_guard_lib::{
    api::create_app,
    auth::{parse_address, Wallet},
    client::GuardClient,
    config::Config,
    data::registry::{AuthorizationRegistry, ContractRegistryBuilder},
    log::initialize_logging,
    services::Services,
};

#[derive(Parser, Debug)]
#[command(name = "guard")]
#[command(about = "Wallet Guard: wallet based authentication service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the guard service
    Serve(ConfigArgs),

    /// Generate a new wallet and print its address and secret key
    Wallet,

    /// Ask the registry whether an address is authorized
    IsAuthorized {
        #[command(flatten)]
        config: ConfigArgs,

        /// Address to look up
        #[arg(long)]
        user: String,
    },

    /// Log in to a running guard and fetch the protected resource
    Login {
        /// Base URL of the guard
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        url: String,

        /// Hex encoded private key of the wallet to log in with
        #[arg(long, env = "GUARD_WALLET_KEY")]
        key: String,
    },
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Override server host
    #[arg(long)]
    host: Option<String>,

    /// Override server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override registry RPC URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// Override registry contract address
    #[arg(long)]
    contract_address: Option<String>,

    /// Override the token signing key
    #[arg(long, env = "GUARD_SIGNING_KEY", hide_env_values = true)]
    signing_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Wallet => {
            let wallet = Wallet::random();
            println!("address: {}", wallet.address().to_checksum(None));
            println!("secret:  {}", wallet.secret_hex());
            Ok(())
        }
        Command::IsAuthorized { config, user } => is_authorized(config, &user).await,
        Command::Login { url, key } => login(&url, &key).await,
    }
}

async fn serve(args: ConfigArgs) -> Result<()> {
    let config = load_config(args)?;
    initialize_logging(config.log_format);

    info!("Starting Wallet Guard");

    config.validate().context("Invalid configuration")?;

    let registry = create_registry(&config)?;
    let services = Services::new(&config, registry).context("Failed to create services")?;
    info!(issuer = %services.auth.issuer_address(), "Tokens will be signed by the configured wallet");

    let app = create_app(services);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .context("Failed to bind TCP listener")?;

    info!("Server listening on http://{}:{}", config.host, config.port);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn is_authorized(args: ConfigArgs, user: &str) -> Result<()> {
    let config = load_config(args)?;
    initialize_logging(config.log_format);

    let address = parse_address(user).map_err(|e| anyhow!("Invalid user address: {e}"))?;
    let registry = create_registry(&config)?;

    let authorized = registry
        .is_authorized(&address)
        .await
        .context("Registry lookup failed")?;

    println!("{}: {authorized}", address.to_checksum(None));
    Ok(())
}

async fn login(url: &str, key: &str) -> Result<()> {
    let wallet = Wallet::from_hex(key).map_err(|_| anyhow!("Invalid wallet key"))?;
    let client = GuardClient::new(url);

    let token = client
        .authenticate(&wallet)
        .await
        .context("Authentication failed")?;
    println!("token: {token}");

    let protected = client
        .fetch_protected(&token)
        .await
        .context("Failed to fetch the protected resource")?;
    println!("{}", protected.message);

    Ok(())
}

fn load_config(args: ConfigArgs) -> Result<Config> {
    let mut config = match args.config {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to read config file: {}", path))?,
        None => {
            debug!("No config file specified, using defaults");
            Config::default()
        }
    };

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(rpc_url) = args.rpc_url {
        config.registry.rpc_url = rpc_url;
    }
    if let Some(contract_address) = args.contract_address {
        config.registry.contract_address = contract_address;
    }
    if let Some(signing_key) = args.signing_key {
        config.auth.signing_key = signing_key;
    }

    Ok(config)
}

fn create_registry(config: &Config) -> Result<Arc<dyn AuthorizationRegistry>> {
    #[cfg(feature = "mocks")]
    {
        if config.registry.mock_mode {
            info!("Using mock registry (mock_mode enabled)");
            return Ok(Arc::new(MockRegistry::new()));
        }
    }

    let contract = parse_address(&config.registry.contract_address)
        .map_err(|_| anyhow!("Invalid registry contract address"))?;
    let mut builder = ContractRegistryBuilder::new(config.registry.rpc_url.clone(), contract);
    if let Some(timeout) = config.registry.timeout_secs {
        builder = builder.timeout_secs(timeout);
    }

    let registry = builder
        .build()
        .context("Failed to create registry client")?;

    info!(rpc_url = %config.registry.rpc_url, contract = %contract, "Using registry contract");
    Ok(Arc::new(registry))
}
