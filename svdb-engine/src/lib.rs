//! # svdb Engine
//!
//! Purpose: Hold the single integer shared by every worker of a process,
//! and the interactive console that reads and writes it from stdin.

mod cell;
mod console;
mod shared;

pub use cell::ValueCell;
pub use console::{Command, Console};
pub use shared::SharedValue;
