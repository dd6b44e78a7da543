//! Hearth Test - shared test utilities for the Hearth workspace.
//!
//! Mock collaborators, intent fixtures and an engine harness with a manual
//! clock, for use as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! hearth-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use hearth_test::{TestEngine, add_shopping_item};
//!
//! #[tokio::test]
//! async fn test_undo_window() {
//!     let t = TestEngine::new();
//!     let result = t
//!         .engine
//!         .execute_auto(t.household, &add_shopping_item("milk"), None)
//!         .await
//!         .unwrap();
//!     t.clock.advance_secs(301);
//!     let id = result.executed_actions[0].audit_log_id;
//!     assert!(t.engine.undo(t.household, &id, None).await.is_err());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
