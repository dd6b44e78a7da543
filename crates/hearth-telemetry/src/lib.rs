//! Hearth Telemetry - logging and request tracing.
//!
//! This crate provides:
//! - [`LogConfig`] and [`setup_logging`] for the global `tracing` subscriber
//! - [`RequestContext`] spans that tie log lines to a request and household
//!
//! # Example
//!
//! ```rust,no_run
//! use hearth_telemetry::{LogConfig, LogFormat, RequestContext, setup_logging};
//!
//! # fn main() -> Result<(), hearth_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("hearth_approval=debug");
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("cli").with_operation("propose");
//! let _guard = ctx.span().entered();
//! tracing::info!("creating proposal");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
