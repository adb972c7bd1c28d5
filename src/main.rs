//! UartBridge - UART-to-UDP RPC proxy
//!
//! Bridges a byte-stream peripheral transport and a UDP network endpoint: a
//! serial peer sends textual RPC frames asking this host to open a socket,
//! send datagrams, and fetch a location fix; received datagrams flow back as
//! RECV frames.

mod config;
mod network;
mod protocol;
mod rpc;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use protocol::Command;
use rpc::{LocationProvider, RpcEngine, TransportSink};

/// UartBridge - UART-to-UDP RPC proxy
#[derive(Parser)]
#[command(name = "uartbridge")]
#[command(author = "UartBridge Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Bridge a serial RPC peer to a UDP socket", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge, reading frames from stdin and writing frames to stdout
    Run {
        /// Override the static location fix ("<lat> <lon>")
        #[arg(short, long)]
        location: Option<String>,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show protocol information
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    match cli.command {
        Commands::Run { location } => {
            run_bridge(config, location).await?;
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config();
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
        Commands::Info => {
            print_protocol_info();
        }
    }

    Ok(())
}

/// Ships outbound frames to the peer on stdout, one frame per line.
struct StdoutSink;

#[async_trait::async_trait]
impl TransportSink for StdoutSink {
    async fn send_frame(&self, frame: &str) -> bool {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{}", frame).and_then(|_| stdout.flush()).is_ok()
    }

    async fn ack_open(&self, success: bool) {
        let ack = format!(
            "{}{}{}{}{}",
            protocol::FRAME_HEAD,
            Command::OpenSocket.id(),
            protocol::FIELD_DELIMITER,
            u8::from(success),
            protocol::FRAME_TAIL
        );
        self.send_frame(&ack).await;
    }
}

/// Reports the fix configured in the config file or on the command line.
struct StaticLocation {
    fix: String,
}

impl LocationProvider for StaticLocation {
    fn current_location(&self) -> String {
        self.fix.clone()
    }
}

/// Run the bridge with stdin/stdout standing in for the serial transport.
async fn run_bridge(config: Config, location: Option<String>) -> anyhow::Result<()> {
    let fix = location.unwrap_or_else(|| config.location.fix.clone());

    tracing::info!(
        "Starting uartbridge '{}' (socket timeout {} ms, buffer {} bytes)",
        config.general.name,
        config.socket.timeout_ms,
        config.socket.buffer_size
    );

    let mut engine = RpcEngine::new(
        config.socket_config(),
        Arc::new(StdoutSink),
        Arc::new(StaticLocation { fix }),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        let chunk = protocol::trim_chunk(&line);
                        if engine.accumulate(&chunk) && !engine.dispatch().await {
                            tracing::warn!("dispatch reported failure");
                        }
                    }
                    None => {
                        tracing::info!("transport closed, shutting down");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                break;
            }
        }
    }

    engine.close().await;
    Ok(())
}

/// Print protocol information
fn print_protocol_info() {
    println!("UartBridge Protocol Information");
    println!("===============================\n");

    println!("Frame format: [<command_id>|<payload>]");
    println!("Socket timeout: {} ms", network::SOCKET_TIMEOUT_MS);
    println!("Socket buffer: {} bytes", network::SOCKET_BUFFER_SIZE);
    println!();
    println!("Commands:");
    println!("  {:>2}  OPEN_SOCKET   inbound   \"<address> <port>\"", Command::OpenSocket.id());
    println!("  {:>2}  CLOSE_SOCKET  inbound   none", Command::CloseSocket.id());
    println!("  {:>2}  SEND_DATA     inbound   Base64 datagram", Command::SendData.id());
    println!("  {:>2}  RECV_DATA     outbound  Base64 datagram", Command::RecvData.id());
    println!("  {:>2}  GET_LOCATION  inbound   answered with Base64 fix", Command::GetLocation.id());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        // Test that CLI parsing works
        let cli = Cli::try_parse_from(["uartbridge", "info"]);
        assert!(cli.is_ok());
    }
}
