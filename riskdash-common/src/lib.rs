//! Shared helpers for the riskdash workspace.
//!
//! Today this is only the [`observability`] module: every binary and
//! integration test goes through [`observability::init_logging`] so events
//! land in the same rolling file sink.
//!
//! ```no_run
//! use riskdash_common::observability::{init_logging, LogConfig};
//!
//! let path = init_logging(LogConfig::default()).expect("logging");
//! tracing::info!(log = %path.display(), "ready");
//! ```
pub mod observability;
