use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use netadmit::{Config, MonitorHandler, Result, Server, bind_dhcp_socket};

#[derive(Parser)]
#[command(name = "netadmit")]
#[command(author, version, about = "A DHCP packet engine for network admission control", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Run,
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = Config::load_or_create(&cli.config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            info!("Starting packet engine with config: {:?}", cli.config);
            let socket = bind_dhcp_socket(&config)?;
            let server = Server::new(&config, socket, MonitorHandler);
            let stats = server.stats();

            // Graceful on ctrl-c: stop receiving, finish in-flight jobs.
            let result = server
                .run_until(async {
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Received shutdown signal, stopping engine...");
                })
                .await;

            info!(
                "received {}, replied {}, dropped {} malformed / {} untyped / {} overload, {} handler panics",
                stats.received(),
                stats.replies_sent(),
                stats.dropped_malformed(),
                stats.dropped_no_type(),
                stats.dropped_overload(),
                stats.handler_panics()
            );

            result
        }
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
