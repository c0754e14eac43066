//! # Cell Trait
//!
//! Abstraction over a mutex-guarded value so callers only ever see whole
//! reads and whole writes.

use svdb_common::Value;

/// A value that many threads read and write under mutual exclusion.
///
/// Implementations must take their lock for the whole access and release it
/// on every exit path. Concurrent `set` calls are ordered only by the lock:
/// the last writer to acquire it wins.
pub trait ValueCell: Send + Sync {
    /// Returns the current value.
    fn get(&self) -> Value;

    /// Replaces the current value.
    fn set(&self, value: Value);
}
