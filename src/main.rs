use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, error, trace};

use biodata::{ApiServer, ServerConfig};

/// Biodata record service
#[derive(Parser)]
#[command(name = "biodata")]
#[command(about = "REST backend for biodata profile records", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default command)
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Directory containing index.html and other static files
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Print the resolved configuration as TOML and exit
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        2 => "trace",
        _ => "trace,hyper=debug,tower=debug", // -vvv shows everything including dependencies
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose >= 2)
        .with_thread_ids(cli.verbose >= 3)
        .with_line_number(cli.verbose >= 3)
        .init();

    debug!("biodata started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = run(cli).await;

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config =
        ServerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Commands::CheckConfig) => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Some(Commands::Serve {
            port,
            host,
            static_dir,
        }) => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(dir) = static_dir {
                config.static_dir = dir;
            }
            serve(config).await
        }
        None => serve(config).await,
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let server = ApiServer::from_config(&config).await?;
    server.start(&config.host, config.port).await
}
