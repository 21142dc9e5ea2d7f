//! Crosstalk server binary

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crosstalk_server::{server, AppState, Server, ServerConfig};

#[derive(Parser)]
#[command(name = "crosstalk-server")]
#[command(about = "Crosstalk signaling platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API and signaling listeners
    Serve {
        /// Bind host for both listeners
        #[arg(long, env = "CROSSTALK_HOST")]
        host: Option<String>,

        /// REST access-plane port
        #[arg(long, env = "CROSSTALK_API_PORT")]
        api_port: Option<u16>,

        /// WebSocket signaling port
        #[arg(long, env = "CROSSTALK_SIGNALING_PORT")]
        signaling_port: Option<u16>,

        /// Store snapshot path (in-memory store when unset)
        #[arg(long, env = "CROSSTALK_STORE_PATH")]
        store_path: Option<PathBuf>,

        /// Shared grant signing secret
        #[arg(long, env = "CROSSTALK_SIGNING_SECRET", hide_env_values = true)]
        signing_secret: Option<String>,

        /// Default grant lifetime, e.g. 30m or 1h
        #[arg(long, env = "CROSSTALK_DEFAULT_TTL")]
        default_ttl: Option<String>,

        /// Liveness ping interval in seconds
        #[arg(long, env = "CROSSTALK_HEARTBEAT_SECS")]
        heartbeat_secs: Option<u64>,

        /// REST rate limit, requests per second per IP
        #[arg(long, env = "CROSSTALK_RATE_LIMIT")]
        rate_limit: Option<u32>,

        /// Deployment environment; "production" requires a signing secret
        #[arg(long = "env", env = "CROSSTALK_ENV")]
        environment: Option<String>,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            host,
            api_port,
            signaling_port,
            store_path,
            signing_secret,
            default_ttl,
            heartbeat_secs,
            rate_limit,
            environment,
            config,
        } => {
            let mut config = match config {
                Some(path) => ServerConfig::load(&path)?,
                None => ServerConfig::default(),
            };
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = api_port {
                config.api_port = port;
            }
            if let Some(port) = signaling_port {
                config.signaling_port = port;
            }
            if let Some(path) = store_path {
                config.store_path = Some(path);
            }
            if let Some(secret) = signing_secret {
                config.signing_secret = Some(secret);
            }
            if let Some(ttl) = default_ttl {
                config.default_ttl = ttl;
            }
            if let Some(secs) = heartbeat_secs {
                config.heartbeat_secs = secs;
            }
            if let Some(limit) = rate_limit {
                config.rate_limit = limit;
            }
            if let Some(environment) = environment {
                config.production = environment == "production";
            }
            config.validate()?;

            let state = AppState::from_config(&config)?;
            let server = Server::bind(&config, state).await?;
            server.serve(server::shutdown_signal()).await
        }
    }
}
