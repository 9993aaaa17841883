use std::time::Duration;

use clap::{Parser, Subcommand};

use arlink_connector::{ConnectorConfig, MocapConnector};
use arlink_server::ServerConfig;
use arlink_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "arlink", about = "AR pose telemetry bridge")]
struct Cli {
    /// Emit JSON log lines instead of the human-readable format.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the WebSocket telemetry server until interrupted.
    Serve {
        #[arg(long, default_value_t = 9999)]
        port: u16,
    },
    /// Start the connector and print the latest telemetry in a loop.
    Poll {
        #[arg(long, default_value_t = 9999)]
        port: u16,
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_telemetry(&TelemetryConfig {
        json: cli.json_logs,
        ..Default::default()
    });

    match cli.command {
        Command::Serve { port } => serve(port).await,
        Command::Poll { port, interval_ms } => poll(port, interval_ms).await,
    }
}

async fn serve(port: u16) {
    let handle = arlink_server::start(ServerConfig {
        port,
        ..Default::default()
    })
    .await
    .expect("Failed to start server");

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl+c");

    tracing::info!("Server stopped by user");
    handle.shutdown();
}

async fn poll(port: u16, interval_ms: u64) {
    let mut connector = MocapConnector::new(ConnectorConfig { port });
    connector.start().await.expect("Failed to start connector");

    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let data = connector.get_latest_data();
                match serde_json::to_string(&data) {
                    Ok(line) => println!("{line}"),
                    Err(err) => tracing::error!("Failed to serialize telemetry: {err}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Poll loop stopped by user");
                break;
            }
        }
    }

    connector.stop();
}
