//! Fixed-block append-only storage for idx: a bin-framed record volume,
//! an async fsync debouncer, and the blocking queue used to hand
//! completed documents off to a storage writer thread.

#![warn(missing_docs)]

mod debounce;
mod error;
mod queue;
mod volume;

pub use debounce::FsyncDebouncer;
pub use error::StorageError;
pub use queue::BlockingQueue;
pub use volume::{Volume, get_volumes_range};
