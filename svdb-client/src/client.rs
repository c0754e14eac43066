//! # Blocking Connection
//!
//! Purpose: Send one request line to the server and wait for its reply.
//!
//! ## Design Principles
//! 1. **Half-Duplex**: Exactly one request in flight; the reply is read
//!    before anything else is written.
//! 2. **Buffer Reuse**: Request and reply buffers live on the connection.
//! 3. **Fail Fast**: EOF and I/O errors surface immediately; nothing retries.

use std::io::{BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;

use svdb_common::{parse_reply, ProtocolError, Request, Terminator, Value, DEFAULT_PORT};

use crate::wire::read_frame;

/// Result type for the sync client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the sync client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,
    /// Address could not be resolved.
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
    /// A reply could not be interpreted.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The poller thread panicked.
    #[error("poller thread panicked")]
    PollerPanicked,
}

/// Configuration for the client connection and its poller.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address, e.g. "localhost:1234".
    pub addr: String,
    /// Time between two poller ticks.
    pub poll_interval: Duration,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: format!("localhost:{}", DEFAULT_PORT),
            poll_interval: Duration::from_secs(1),
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Single TCP connection to the server.
pub struct Connection {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
}

impl Connection {
    /// Connects to `config.addr`.
    pub fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let stream = connect_stream(config)?;
        if let Some(timeout) = config.read_timeout {
            stream.set_read_timeout(Some(timeout))?;
        }
        if let Some(timeout) = config.write_timeout {
            stream.set_write_timeout(Some(timeout))?;
        }
        stream.set_nodelay(true)?;

        Ok(Connection {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(64),
            write_buf: Vec::with_capacity(64),
        })
    }

    /// Sends `request` and returns the raw reply text.
    pub fn exec(&mut self, request: &Request) -> ClientResult<String> {
        self.write_buf.clear();
        request.encode(Terminator::Nul, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        read_frame(&mut self.reader, &mut self.line_buf)?;
        Ok(String::from_utf8_lossy(&self.line_buf).into_owned())
    }

    /// Fetches the server's value.
    pub fn read(&mut self) -> ClientResult<Value> {
        let reply = self.exec(&Request::Read)?;
        Ok(parse_reply(&reply)?)
    }

    /// Stores `value` on the server and returns the value it reports back.
    pub fn write(&mut self, value: Value) -> ClientResult<Value> {
        let reply = self.exec(&Request::Write(value))?;
        Ok(parse_reply(&reply)?)
    }

    /// Returns a second handle to the socket, used to shut it down from
    /// another thread.
    pub(crate) fn socket(&self) -> ClientResult<TcpStream> {
        Ok(self.reader.get_ref().try_clone()?)
    }
}

fn connect_stream(config: &ClientConfig) -> ClientResult<TcpStream> {
    let addrs = config
        .addr
        .to_socket_addrs()
        .map_err(|_| ClientError::InvalidAddress(config.addr.clone()))?;

    let mut last_err = None;
    for addr in addrs {
        let attempt = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }

    match last_err {
        Some(err) => Err(ClientError::Io(err)),
        None => Err(ClientError::InvalidAddress(config.addr.clone())),
    }
}
