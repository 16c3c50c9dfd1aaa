//! Batch state machine.

pub mod batch;

pub use batch::{is_valid_transition, transition, BatchStateError};
