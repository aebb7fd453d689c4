//! Traffic generation
//!
//! Drives the write/read loop against the store and reports, for every key,
//! which node owns it.

pub mod backoff;
pub mod keygen;
mod runner;
pub mod types;

pub use backoff::Backoff;
pub use keygen::{KeyGenerator, TrafficEntry};
pub use runner::TrafficLoop;
pub use types::{IterationReport, LoopState, OperationError, TrafficStats};
