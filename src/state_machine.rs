//! Chat turn state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the transition function decides what happens next, the runtime
//! executor performs the I/O.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{FailureKind, TurnContext, TurnOutcome, TurnState};
pub use transition::{start, transition};
