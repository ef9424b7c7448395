//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → load store snapshot (blocking) → secrets → proxy client
//!     → HttpServer → bind listener
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     stop accepting → drain in-flight requests → settle snapshot writes
//! ```
//!
//! # Design Decisions
//! - No request is served before the store is loaded
//! - Pending snapshot writes are awaited on graceful shutdown; a crash can
//!   still lose writes that were never flushed

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{bootstrap, Gateway, StartupError};
