//! # svdb Server
//!
//! Purpose: Serve one shared integer to any number of TCP clients speaking
//! the `read` / `write <n>` line protocol.
//!
//! ## Design Principles
//! 1. **One Task Per Connection**: Each accepted socket gets its own worker;
//!    the shared cell is the only state they have in common.
//! 2. **Bounded Fan-Out**: An optional connection cap turns the listener into
//!    a producer that stops accepting while every slot is busy.
//! 3. **Fail-Open Protocol**: Unknown lines are answered, not punished.

pub mod protocol;
pub mod server;

pub use server::{handle_connection, Server, ServerConfig};
