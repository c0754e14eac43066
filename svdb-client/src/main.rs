//! # svdb Client Binary
//!
//! Keep a local integer edited from the terminal and mirror it to the
//! server once per interval, printing every reply:
//!
//! - `q`          quit
//! - blank line   print the local value
//! - `<integer>`  set the local value

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use svdb_client::{spawn_poller, ClientConfig, Connection};
use svdb_common::DEFAULT_PORT;
use svdb_engine::{Console, SharedValue};

/// Client command line arguments.
#[derive(Parser, Debug)]
#[command(name = "svdb-client")]
#[command(about = "Mirror a local integer to an svdb server")]
#[command(disable_help_flag = true)]
struct Args {
    /// Server TCP port
    #[arg(short, long, env = "SVDB_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Server host name
    #[arg(short = 'h', long, env = "SVDB_HOST", default_value = "localhost")]
    host: String,

    /// Print connection diagnostics
    #[arg(short, long)]
    debug: bool,

    /// Milliseconds between two polls of the server
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let config = ClientConfig {
        addr: format!("{}:{}", args.host, args.port),
        poll_interval: Duration::from_millis(args.interval_ms),
        ..ClientConfig::default()
    };
    let conn = Connection::connect(&config)
        .with_context(|| format!("can't connect to {}", config.addr))?;
    debug!(addr = %config.addr, "connected");

    let cell = Arc::new(SharedValue::default());
    let poller = spawn_poller(conn, Arc::clone(&cell), config.poll_interval, io::stdout())
        .context("can't start the poller")?;

    let stdin = io::stdin();
    Console::new().run(stdin.lock(), io::stdout(), cell.as_ref())?;

    poller.stop();
    Ok(())
}
