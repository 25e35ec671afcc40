use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use prompt2prod_core::{
    Dispatcher, GenerationRequest, Mode, ModelCatalog, ReqwestTransport, UpstreamConfig,
    UpstreamTransport,
};
use prompt2prod_gateway::{AppState, GatewayServer, mock};

mod config;

use config::Prompt2ProdConfig;

#[derive(Parser)]
#[command(name = "prompt2prod")]
#[command(version)]
#[command(about = "Prompt2Prod: code generation API over local and cloud models")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve,

    /// Run a mock upstream gateway with canned answers
    MockGateway {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },

    /// Send a one-shot prompt through the gateway
    Ask {
        /// The prompt to send
        prompt: String,

        /// Routing mode: local or cloud
        #[arg(long)]
        mode: Option<Mode>,

        /// Model identifier (defaults depend on the mode)
        #[arg(long)]
        model: Option<String>,
    },

    /// List available local and cloud models
    Models,

    /// Write the default config file
    Init,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve => cmd_serve(&cli.config).await,
        Commands::MockGateway { port } => cmd_mock_gateway(port).await,
        Commands::Ask {
            prompt,
            mode,
            model,
        } => cmd_ask(&cli.config, prompt, mode, model).await,
        Commands::Models => cmd_models(&cli.config).await,
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
    }
}

fn transport() -> Result<Arc<dyn UpstreamTransport>> {
    let transport = ReqwestTransport::new().context("Failed to build HTTP client")?;
    Ok(Arc::new(transport))
}

fn app_state(upstream: &UpstreamConfig) -> Result<AppState> {
    let transport = transport()?;
    Ok(AppState::new(
        Dispatcher::from_config(transport.clone(), upstream),
        ModelCatalog::from_config(transport, upstream),
    ))
}

async fn cmd_serve(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = Prompt2ProdConfig::load(config_path)?;
    let upstream = cfg.upstream();
    info!(
        "Starting Prompt2Prod API (gateway: {}, local registry: {})",
        upstream.gateway_url, upstream.ollama_host
    );

    let server = GatewayServer::new(cfg.bind_addr()?, app_state(&upstream)?)
        .with_max_body_bytes(cfg.server.max_body_bytes);

    let cancel = CancellationToken::new();
    let mut handle = server.spawn(cancel.clone());

    tokio::select! {
        res = signal::ctrl_c() => {
            res?;
            info!("Received Ctrl+C, shutting down...");
            cancel.cancel();
            handle.await??;
        }
        res = &mut handle => {
            res??;
        }
    }

    println!("Prompt2Prod stopped.");
    Ok(())
}

async fn cmd_mock_gateway(port: u16) -> Result<()> {
    let bind = SocketAddr::from(([0, 0, 0, 0], port));
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let mut handle = tokio::spawn(async move { mock::serve(bind, cancel_clone).await });

    tokio::select! {
        res = signal::ctrl_c() => {
            res?;
            info!("Received Ctrl+C, stopping mock gateway...");
            cancel.cancel();
            handle.await??;
        }
        res = &mut handle => {
            res??;
        }
    }
    Ok(())
}

async fn cmd_ask(
    config_path: &Option<PathBuf>,
    prompt: String,
    mode: Option<Mode>,
    model: Option<String>,
) -> Result<()> {
    let cfg = Prompt2ProdConfig::load(config_path)?;
    let upstream = cfg.upstream();
    let dispatcher = Dispatcher::from_config(transport()?, &upstream);

    let request = GenerationRequest {
        prompt,
        model,
        mode,
    };
    let result = dispatcher
        .generate(request)
        .await
        .context("Generation failed")?;

    info!(
        "Answered by {} (mode: {}, model: {})",
        result.provider, result.mode, result.model
    );
    println!("{}", result.text);
    Ok(())
}

async fn cmd_models(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = Prompt2ProdConfig::load(config_path)?;
    let catalog = ModelCatalog::from_config(transport()?, &cfg.upstream());
    let listing = catalog.listing().await;
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        info!("Created default config at {}", config_path.display());
    }

    println!("Prompt2Prod initialized at {}", config_dir.display());
    println!("Edit {} to point at your gateway.", config_path.display());
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = Prompt2ProdConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_ask() {
        let cli = Cli::try_parse_from([
            "prompt2prod",
            "ask",
            "write a function",
            "--mode",
            "local",
            "--model",
            "llama3.2:1b",
        ])
        .unwrap();
        match cli.command {
            Commands::Ask {
                prompt,
                mode,
                model,
            } => {
                assert_eq!(prompt, "write a function");
                assert_eq!(mode, Some(Mode::Local));
                assert_eq!(model.as_deref(), Some("llama3.2:1b"));
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        let parsed = Cli::try_parse_from(["prompt2prod", "ask", "hi", "--mode", "hybrid"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_cli_mock_gateway_default_port() {
        let cli = Cli::try_parse_from(["prompt2prod", "mock-gateway"]).unwrap();
        assert!(matches!(cli.command, Commands::MockGateway { port: 8080 }));
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from(["prompt2prod", "serve", "--debug", "-c", "/tmp/p2p.toml"])
            .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p2p.toml")));
        assert!(matches!(cli.command, Commands::Serve));
    }

    #[test]
    fn test_app_state_from_defaults() {
        let state = app_state(&UpstreamConfig::default()).unwrap();
        assert_eq!(state.app_name, "Prompt2Prod API");
        assert_eq!(state.dispatcher.defaults().cloud, "gpt-4o-mini");
    }
}
