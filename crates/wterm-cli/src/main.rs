//! wterm: web terminal client CLI.
//!
//! Interactive shell sessions through a terminal bridge that speaks STOMP
//! over WebSocket, with local line editing and editing of remote files in
//! a local editor.

mod commands;
mod config;
mod editor;
mod terminal;

use clap::{Parser, Subcommand};
use tracing::error;

/// wterm: web terminal client
#[derive(Parser)]
#[command(name = "wterm", version, about = "Web terminal client over STOMP/WebSocket")]
struct Cli {
    /// Config file path
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Bridge WebSocket URL (overrides the config file)
    #[arg(long = "url", global = true)]
    url: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open an interactive terminal session
    Connect {
        /// Host name or id from the host book; omit to pick interactively
        target: Option<String>,

        /// Connection type sent to the bridge ("0" password, "1" key path)
        #[arg(long = "type")]
        connection_type: Option<String>,
    },

    /// List the configured hosts
    Hosts,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is the terminal display.
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("wterm=debug,wterm_cli=debug,wterm_client=debug,wterm_core=debug")
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("wterm=warn,wterm_cli=warn")
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.clone().unwrap_or_else(|| {
        let home = dirs::home_dir().unwrap_or_default();
        home.join(".wterm").join("config.toml").to_string_lossy().to_string()
    });
    let cfg = match config::Config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("wterm: {e:#}");
            std::process::exit(1);
        }
    };

    let url = cli.url.clone().unwrap_or_else(|| cfg.default.url.clone());

    let result = match cli.command {
        Command::Connect {
            target,
            connection_type,
        } => {
            commands::connect::run(&cfg, &url, target.as_deref(), connection_type.as_deref())
                .await
        }
        Command::Hosts => commands::hosts::run(&cfg),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("wterm: {e:#}");
        std::process::exit(1);
    }
}
