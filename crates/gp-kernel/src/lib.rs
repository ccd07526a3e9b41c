//! Group Planning Kernel
//!
//! Workflow state for a multi-role planning process.
//!
//! - [`StateRecord`]: one phase with goal, roles, instructions, transitions
//! - [`WorkflowGraph`]: registry of phases with a gated current pointer
//! - [`MutationLog`]: hash-chained record of every applied command

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod logging;
mod state;
mod workflow;

pub use error::{LogError, WorkflowError};
pub use logging::{MutationEvent, MutationLog};
pub use state::{StateRecord, NEXT_LABEL};
pub use workflow::{Transition, WorkflowGraph, INITIAL_STATE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
