//! # Shared Value
//!
//! The one-integer database. A single instance lives for the whole process
//! and is handed to workers as `Arc<SharedValue>`; the integer itself is
//! only reachable through `get`/`set`.
//!
//! ## Structure Overview
//!
//! ```text
//! Arc<SharedValue>  (one per process)
//!   └── inner: Mutex<Value>
//!         ├── Connection Handler #1 ──┐
//!         ├── Connection Handler #2 ──┼── get()/set(), lock held for the copy only
//!         └── console / Poller ───────┘
//! ```

use parking_lot::Mutex;

use svdb_common::Value;

use crate::cell::ValueCell;

/// Mutex-guarded integer shared between threads.
///
/// `parking_lot::Mutex` is not poisoned by a panicking holder, so lock
/// acquisition has no error path; it can only block.
#[derive(Debug, Default)]
pub struct SharedValue {
    inner: Mutex<Value>,
}

impl SharedValue {
    /// Creates a cell holding `initial`.
    pub fn new(initial: Value) -> Self {
        SharedValue {
            inner: Mutex::new(initial),
        }
    }
}

impl ValueCell for SharedValue {
    fn get(&self) -> Value {
        *self.inner.lock()
    }

    fn set(&self, value: Value) {
        *self.inner.lock() = value;
    }
}
