//! # svdb Sync Client
//!
//! Purpose: Mirror a local integer to the server by polling it once per
//! interval from a dedicated thread.
//!
//! ## Design Principles
//! 1. **Blocking I/O**: One thread, one socket, strict request/reply.
//! 2. **Level-Triggered**: Every tick sends something; a change sends `write`.
//! 3. **No Reconnect**: A dropped connection ends the poller for good.

mod client;
mod poller;
mod wire;

pub use client::{ClientConfig, ClientError, ClientResult, Connection};
pub use poller::{spawn_poller, Poller, PollerHandle, Tick};
