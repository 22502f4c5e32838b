use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

use room_client::config::{ClientConfig, ClientPaths, FileConfig, load_config};

mod cli;

#[derive(Parser)]
#[command(name = "roomchat")]
#[command(about = "Chat in rooms shared with an AI facilitator and AI participants")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Custom data directory (defaults to ~/.roomchat)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Backend HTTP base URL; overrides server.api_url
    #[arg(long, global = true)]
    server: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a room and chat interactively
    Join(JoinArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

#[derive(Parser)]
struct JoinArgs {
    /// Room to join
    room: String,

    /// Display name (defaults to session.display_name)
    #[arg(short, long)]
    name: Option<String>,
}

#[derive(Parser)]
struct ConfigArgs {
    /// Write a starter config.toml if none exists
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.debug {
        "roomchat=debug,room_client=debug,info"
    } else {
        "roomchat=info,room_client=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    let paths = ClientPaths::new(cli.data_dir)?;
    let mut file_config: FileConfig = load_config(&paths.data_dir).extract()?;
    if let Some(server) = cli.server {
        file_config.server.api_url = server;
        file_config.server.ws_url = None;
    }

    match cli.command {
        Commands::Join(args) => {
            let config = ClientConfig::from_file(&file_config)?;
            cli::join_command(&config, &args.room, args.name).await
        }
        Commands::Config(args) => cli::config_command(&paths, &file_config, args.init),
    }
}
