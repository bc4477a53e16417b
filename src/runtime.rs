//! Runtime for executing chat turns
//!
//! The executor owns the injected collaborators (store, completion model,
//! system instruction) and drives the pure state machine to completion.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{TurnError, TurnOrchestrator};
pub use traits::*;

use crate::db::Database;

/// Type alias for the production orchestrator with concrete implementations
pub type ProductionOrchestrator = TurnOrchestrator<Database>;
