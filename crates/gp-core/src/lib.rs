//! Group Planning Core
//!
//! The orchestrator that lets a team of roles edit their own plan:
//! - Renders capability manifests and per-role system messages
//! - Extracts invocations from free-form responses
//! - Binds invocations to a closed set of commands and applies them
//! - Drives turn-based planning sessions over an injected dialogue engine
//!
//! # Example
//!
//! ```rust,ignore
//! use gp_core::prelude::*;
//!
//! # async fn example(engine: impl DialogueEngine) -> Result<(), CoreError> {
//! let graph = WorkflowGraph::new(StateRecord::new("init", "Plan the work"));
//! let tree = TaskTree::new(TaskSpec::new("Fullfill_Request", "Answer the user"))?;
//! let mut session = PlanningSession::new(PlanningState::new(graph, tree), SessionConfig::default(), engine)
//!     .with_user_request("Write a release checklist");
//!
//! let rounds = session.run().await?;
//! println!("Finished in {} rounds", rounds.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod capability;
pub mod command;
pub mod config;
pub mod error;
pub mod invocation;
pub mod manifest;
pub mod session;

pub use capability::{CapabilityDescriptor, CapabilityRegistry, CommandKind, ParameterDescriptor, Scope};
pub use command::{Command, CommandOutcome, PlanningState};
pub use config::{SessionConfig, DEFAULT_MAX_ROUNDS, DEFAULT_TERMINAL_STATE};
pub use error::{CoreError, InvocationError};
pub use invocation::{Invocation, InvocationExtractor, DEFAULT_END_MARKER, DEFAULT_START_MARKER};
pub use manifest::{ManifestBuilder, DEFAULT_MANAGER_ROLE};
pub use session::{DialogueEngine, DialogueRequest, PlanningSession, RoleOutcome, RoleResult, RoundReport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running a planning session
    pub use crate::{
        CapabilityRegistry, Command, CoreError, DialogueEngine, DialogueRequest, Invocation,
        InvocationExtractor, ManifestBuilder, PlanningSession, PlanningState, RoundReport,
        SessionConfig,
    };
    pub use gp_kernel::{StateRecord, Transition, WorkflowGraph};
    pub use gp_task::{PathMutationEngine, TaskSpec, TaskTree};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
