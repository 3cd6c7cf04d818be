//! The frame clock, input history, snapshot ring, and predict/confirm/rewind
//! loop (`spec.md` §4.5 "Rollback Controller").
//!
//! [`controller::RollbackController`] is the module's public surface;
//! [`input_queue`] and [`snapshot_ring`] are its two supporting data
//! structures, kept in their own files because each carries its own focused
//! test suite.

pub mod controller;
pub mod input_queue;
pub mod snapshot_ring;

pub use controller::{RollbackController, RollbackStats};
