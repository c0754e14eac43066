//! # TCP Server
//!
//! Accept connections, read request lines, and apply them to the shared
//! cell. Every connection is served by its own task; a connection failing
//! never touches the listener or its siblings.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! AwaitRequest ──frame──▶ Processing ──▶ Reply ──▶ AwaitRequest
//!      │
//!      └── EOF / read error ──▶ Closed (socket dropped)
//! ```

use std::future::{self, Future};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, warn};

use svdb_common::{encode_reply, frame_text, Request, Value, DEFAULT_PORT, MAX_LINE};
use svdb_engine::{SharedValue, ValueCell};

use crate::protocol::{next_frame, take_remainder, Frame};

/// Default cap on concurrently served connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 1024;

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. "0.0.0.0:1234".
    pub addr: String,
    /// Maximum connections served at once; `None` accepts without limit.
    pub max_connections: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            max_connections: Some(DEFAULT_MAX_CONNECTIONS),
        }
    }
}

/// A bound listener plus the cell its connections share.
pub struct Server {
    listener: TcpListener,
    cell: Arc<SharedValue>,
    slots: Option<Arc<Semaphore>>,
}

impl Server {
    /// Binds the listen socket.
    ///
    /// Failure here (port in use, permission denied) is fatal to startup.
    pub async fn bind(config: ServerConfig, cell: Arc<SharedValue>) -> io::Result<Self> {
        let listener = TcpListener::bind(config.addr.as_str()).await?;
        let slots = config
            .max_connections
            .map(|limit| Arc::new(Semaphore::new(limit.clamp(1, Semaphore::MAX_PERMITS))));
        Ok(Server {
            listener,
            cell,
            slots,
        })
    }

    /// Returns the address actually bound (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until accepting fails.
    pub async fn run(self) -> io::Result<()> {
        self.run_until(future::pending()).await
    }

    /// Accepts connections until accepting fails or `shutdown` resolves.
    ///
    /// The listen socket is released on return. Connections already being
    /// served keep running.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let permit = match &self.slots {
                Some(slots) => tokio::select! {
                    permit = acquire_slot(slots) => Some(permit?),
                    _ = &mut shutdown => break,
                },
                None => None,
            };

            debug!("waiting for client connection");
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        error!(%err, "accept failed, closing listener");
                        return Err(err);
                    }
                },
                _ = &mut shutdown => break,
            };

            debug!(%peer, "client connected");
            if let Err(err) = stream.set_nodelay(true) {
                debug!(%peer, %err, "set_nodelay failed");
            }
            let cell = Arc::clone(&self.cell);
            tokio::spawn(async move {
                let _permit = permit;
                match handle_connection(stream, cell).await {
                    Ok(()) => debug!(%peer, "client disconnected"),
                    Err(err) => debug!(%peer, %err, "client closed"),
                }
            });
        }

        debug!("listener shut down");
        Ok(())
    }
}

async fn acquire_slot(slots: &Arc<Semaphore>) -> io::Result<OwnedSemaphorePermit> {
    Arc::clone(slots)
        .acquire_owned()
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "connection slots closed"))
}

/// Handles a single TCP client connection.
///
/// Returns `Ok(())` when the peer closes the connection and `Err` on a read
/// or write failure. Either way the socket is dropped on return.
pub async fn handle_connection(stream: TcpStream, cell: Arc<SharedValue>) -> io::Result<()> {
    let mut stream = stream;
    let mut buffer = BytesMut::with_capacity(MAX_LINE + 1);
    let mut reply = Vec::with_capacity(24);

    loop {
        while let Some(frame) = next_frame(&mut buffer) {
            respond(&mut stream, &frame, cell.as_ref(), &mut reply).await?;
        }

        let bytes = stream.read_buf(&mut buffer).await?;
        if bytes == 0 {
            // Peer may have shut down only its write half.
            if let Some(frame) = take_remainder(&mut buffer) {
                respond(&mut stream, &frame, cell.as_ref(), &mut reply).await?;
            }
            return Ok(());
        }
    }
}

async fn respond(
    stream: &mut TcpStream,
    frame: &Frame,
    cell: &SharedValue,
    reply: &mut Vec<u8>,
) -> io::Result<()> {
    let value = dispatch(&frame.payload, cell);
    reply.clear();
    encode_reply(value, frame.reply_terminator(), reply);
    stream.write_all(&reply[..]).await
}

/// Applies one request line and returns the value to reply with.
///
/// Unrecognized lines leave the cell untouched and still get the current
/// value back.
fn dispatch<C: ValueCell + ?Sized>(payload: &[u8], cell: &C) -> Value {
    let line = match frame_text(payload) {
        Ok(line) => line,
        Err(err) => {
            warn!(%err, len = payload.len(), "unknown request");
            return cell.get();
        }
    };
    debug!(request = line, "request");

    match Request::parse(line) {
        Some(Request::Write(value)) => {
            cell.set(value);
            value
        }
        Some(Request::Read) => cell.get(),
        None => {
            warn!(request = line, "unknown request");
            cell.get()
        }
    }
}
