//! # svdb Server Binary
//!
//! Serve the shared integer over TCP while the terminal reads and writes
//! it directly:
//!
//! - `q`          quit
//! - blank line   print the current value
//! - `<integer>`  set the value

use std::io;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use clap::Parser;
use tokio::sync::oneshot;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use svdb_common::DEFAULT_PORT;
use svdb_engine::{Console, SharedValue};
use svdb_server::server::DEFAULT_MAX_CONNECTIONS;
use svdb_server::{Server, ServerConfig};

/// Server command line arguments.
#[derive(Parser, Debug)]
#[command(name = "svdb-server")]
#[command(about = "Share one integer with any number of TCP clients")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, env = "SVDB_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Print connection and request diagnostics
    #[arg(short, long)]
    debug: bool,

    /// Maximum connections served at once (0 = unlimited)
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    max_connections: usize,
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let cell = Arc::new(SharedValue::default());
    let config = ServerConfig {
        addr: format!("0.0.0.0:{}", args.port),
        max_connections: (args.max_connections > 0).then_some(args.max_connections),
    };
    let server = Server::bind(config, Arc::clone(&cell))
        .await
        .with_context(|| format!("can't serve port {}", args.port))?;
    debug!(port = args.port, "serving");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let listener = tokio::spawn(server.run_until(async move {
        let _ = stop_rx.await;
    }));

    // Stdin blocks, so the console gets a plain thread rather than a task.
    let (done_tx, done_rx) = oneshot::channel::<()>();
    let console_cell = Arc::clone(&cell);
    thread::spawn(move || {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let console = Console::with_prompt("> ");
        if let Err(err) = console.run(stdin.lock(), stdout.lock(), console_cell.as_ref()) {
            error!(%err, "console failed");
        }
        let _ = done_tx.send(());
    });

    let _ = done_rx.await;
    let _ = stop_tx.send(());
    // Accept failures are already logged by the listener.
    let _ = listener.await;
    Ok(())
}
