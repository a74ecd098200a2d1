//! Chat relay — real-time text chat over WebSocket.
//!
//! Clients connect to `/ws?username=<name>`, then exchange broadcast
//! messages and `@name` private messages while connected. Membership and
//! routing are in-memory and single-process.
//!
//! Usage:
//!   chat-relay                                   # Default port 8000
//!   chat-relay --port 9000                       # Custom port
//!   chat-relay --allowed-origins https://a.example,https://b.example
//!   chat-relay --wire-format json                # Structured JSON frames
//!
//! Every option can also come from the environment (`RELAY_*`) or a `.env`
//! file in the working directory.

use std::path::PathBuf;

use clap::Parser;
use relay_protocol::WireFormat;
use relay_server::ChatServer;
use relay_transport::server::{TransportConfig, TransportServer};
use relay_transport::connection::DEFAULT_OUTBOUND_CAPACITY;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chat-relay", about = "Chat relay — real-time WebSocket chat server")]
struct Cli {
    /// Port to listen on (0 for OS-assigned)
    #[arg(long, env = "RELAY_PORT", default_value = "8000")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, env = "RELAY_HOST", default_value = "127.0.0.1")]
    hostname: String,

    /// Origins allowed by CORS (comma separated, `*` for any)
    #[arg(
        long,
        env = "RELAY_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    allowed_origins: Vec<String>,

    /// Maximum concurrent connections (unlimited if unset)
    #[arg(long, env = "RELAY_MAX_CONNECTIONS")]
    max_connections: Option<usize>,

    /// Per-connection outbound queue capacity
    #[arg(long, env = "RELAY_OUTBOUND_CAPACITY", default_value_t = DEFAULT_OUTBOUND_CAPACITY)]
    outbound_capacity: usize,

    /// Outbound frame encoding: text or json
    #[arg(long, env = "RELAY_WIRE_FORMAT", default_value = "text")]
    wire_format: WireFormat,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to a file (defaults to ~/.chat-relay/logs/relay.log if no path given)
    #[arg(long, default_missing_value = "DEFAULT", num_args = 0..=1)]
    log_file: Option<String>,
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let Some(ref log_file_arg) = cli.log_file else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return;
    };

    let log_path = if log_file_arg == "DEFAULT" {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(&home).join(".chat-relay/logs/relay.log")
    } else {
        PathBuf::from(log_file_arg)
    };

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {}: {e}", log_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();

    eprintln!("Logging to {}", log_path.display());
}

#[tokio::main]
async fn main() {
    // Load .env before parsing so its values act as env fallbacks.
    let dotenv_path = dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli);

    if let Some(path) = dotenv_path {
        debug!("Loaded environment from {}", path.display());
    }

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                         Chat Relay                           ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Port:        {}", cli.port);
    println!("  Binding:     {}", cli.hostname);
    println!("  Origins:     {}", cli.allowed_origins.join(", "));
    match cli.max_connections {
        Some(max) => println!("  Max conns:   {max}"),
        None => println!("  Max conns:   unlimited"),
    }
    println!("  Wire format: {}", cli.wire_format);
    println!();

    let transport_config = TransportConfig {
        port: cli.port,
        hostname: cli.hostname.clone(),
        allowed_origins: cli.allowed_origins.clone(),
        max_connections: cli.max_connections,
        outbound_capacity: cli.outbound_capacity,
        wire_format: cli.wire_format,
        verbose_logging: cli.verbose,
    };

    let mut transport = match TransportServer::start(transport_config, ChatServer::new()).await {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to start transport: {e}");
            std::process::exit(1);
        }
    };

    println!("────────────────────────────────────────────────────────────────");
    println!();
    println!("  Server running!");
    println!();
    println!("  WebSocket endpoint:");
    println!("    ws://{}:{}/ws?username=<name>", cli.hostname, transport.port());
    println!();
    println!("  Press Ctrl+C to stop.");
    println!();

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {e}");
    }

    println!();
    println!("  Shutting down...");
    transport.stop().await;
    println!("  Server stopped.");
}
