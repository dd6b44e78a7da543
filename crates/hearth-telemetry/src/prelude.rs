//! Prelude module - commonly used types for convenient import.
//!
//! Use `use hearth_telemetry::prelude::*;` to import all essential types.

pub use crate::{
    LogConfig, LogFormat, LogTarget, RequestContext, RequestGuard, TelemetryError,
    TelemetryResult, setup_default_logging, setup_logging,
};
