//! State management for settlement attempts.
//!
//! Each attempt walks a linear state machine. Transitions are checked against
//! a static table so a misordered executor shows up as an internal error
//! instead of a silently wrong status.

pub mod settlement;

pub use settlement::{Progress, SettlementState};
