//! # Poller
//!
//! Purpose: Push changes of the local cell to the server, once per tick.
//!
//! Each tick compares the local value with the last value sent. A change
//! sends `write <value>`, no change sends `read`; the reply is printed
//! either way. The loop sleeps a fixed interval between ticks, so a local
//! change reaches the server at most one interval late, and a value that
//! changes and changes back within one interval is never sent.
//!
//! ```text
//! Connected ─▶ BuildRequest ─▶ Send ─▶ AwaitReply ─▶ Print ─▶ Sleep ─┐
//!                   ▲                      │                          │
//!                   └──────────────────────┼──────────────────────────┘
//!                                          └── EOF / error ─▶ Closed
//! ```

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use svdb_common::{Request, Value};
use svdb_engine::ValueCell;

use crate::client::{ClientError, ClientResult, Connection};

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    /// Request sent this tick.
    pub request: Request,
    /// Reply text as received.
    pub reply: String,
}

/// Change notifier owning the connection.
pub struct Poller {
    conn: Connection,
    last_sent: Value,
}

impl Poller {
    /// Wraps a connected socket. The server is assumed to start at zero.
    pub fn new(conn: Connection) -> Self {
        Poller { conn, last_sent: 0 }
    }

    /// Picks the request for a tick observing `current`.
    ///
    /// A changed value is recorded as sent before the request goes out.
    pub fn next_request(&mut self, current: Value) -> Request {
        if current != self.last_sent {
            self.last_sent = current;
            Request::Write(current)
        } else {
            Request::Read
        }
    }

    /// Runs one request/reply exchange.
    pub fn tick<C: ValueCell + ?Sized>(&mut self, cell: &C) -> ClientResult<Tick> {
        let request = self.next_request(cell.get());
        let reply = self.conn.exec(&request)?;
        Ok(Tick { request, reply })
    }

    /// Ticks every `interval` until the connection ends or `stop` is set.
    ///
    /// EOF from the server and any error seen after `stop` was set end the
    /// loop with `Ok(())`.
    pub fn run<C, W>(
        mut self,
        cell: &C,
        interval: Duration,
        mut out: W,
        stop: &AtomicBool,
    ) -> ClientResult<()>
    where
        C: ValueCell + ?Sized,
        W: Write,
    {
        while !stop.load(Ordering::Acquire) {
            let tick = match self.tick(cell) {
                Ok(tick) => tick,
                Err(_) if stop.load(Ordering::Acquire) => break,
                Err(ClientError::Closed) => {
                    debug!("end of file");
                    break;
                }
                Err(err) => {
                    debug!(%err, "connection closed");
                    return Err(err);
                }
            };
            debug!(request = %tick.request, reply = %tick.reply, "tick");
            writeln!(out, "{}", tick.reply)?;
            out.flush()?;

            pause(interval, stop);
        }
        Ok(())
    }
}

/// Sleeps for `interval`, waking early once `stop` is set and the thread
/// is unparked.
fn pause(interval: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while !stop.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::park_timeout(deadline - now);
    }
}

/// Handle to a poller thread.
///
/// Dropping the handle stops the poller without waiting for it.
pub struct PollerHandle {
    stop: Arc<AtomicBool>,
    socket: TcpStream,
    join: Option<JoinHandle<ClientResult<()>>>,
}

impl PollerHandle {
    /// Asks the poller to stop and shuts its socket down so a blocked read
    /// returns.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        let _ = self.socket.shutdown(Shutdown::Both);
        if let Some(join) = &self.join {
            join.thread().unpark();
        }
    }

    /// Returns true once the poller thread has exited.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |join| join.is_finished())
    }

    /// Waits for the poller thread and returns how it ended.
    pub fn join(mut self) -> ClientResult<()> {
        match self.join.take() {
            Some(join) => join.join().unwrap_or(Err(ClientError::PollerPanicked)),
            None => Ok(()),
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.stop();
        }
    }
}

/// Starts a poller thread mirroring `cell` over `conn`, printing replies
/// to `out`.
pub fn spawn_poller<C, W>(
    conn: Connection,
    cell: Arc<C>,
    interval: Duration,
    out: W,
) -> ClientResult<PollerHandle>
where
    C: ValueCell + 'static,
    W: Write + Send + 'static,
{
    let socket = conn.socket()?;
    let stop = Arc::new(AtomicBool::new(false));
    let stop_thread = Arc::clone(&stop);

    let join = thread::Builder::new()
        .name("svdb-poller".to_string())
        .spawn(move || Poller::new(conn).run(cell.as_ref(), interval, out, &stop_thread))?;

    Ok(PollerHandle {
        stop,
        socket,
        join: Some(join),
    })
}
