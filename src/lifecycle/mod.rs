//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → HTTP server stops accepting and drains
//!               → sweeper exits its loop
//!
//! Sweeper (sweeper.rs):
//!     every interval → evict idle sessions, stale rate-limit windows
//! ```

pub mod shutdown;
pub mod signals;
pub mod sweeper;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use sweeper::Sweeper;
