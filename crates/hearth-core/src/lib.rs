//! Hearth Core - Foundation types shared by every Hearth crate.
//!
//! This crate provides:
//! - Identifier newtypes for households, sessions and users
//! - The `Timestamp` wrapper and the ordered `RiskLevel` scale
//! - The `Clock` trait, so expiry and rate windows can be tested with a
//!   manually advanced clock

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod clock;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use types::{
    ActionId, HouseholdId, ParseError, ProposalId, RiskLevel, SessionId, Timestamp, UserId,
};
