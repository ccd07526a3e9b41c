//! Group Planning Task Hierarchy
//!
//! Nested planning units and the machinery to change them from text.
//!
//! # Core Concepts
//!
//! - [`TaskTree`]: arena of [`TaskNode`]s addressed by [`TaskId`] handles
//! - [`TaskSpec`]: owned, serializable form of a task subtree
//! - [`TaskPath`]: dotted address such as `Task2.sub_tasks.Task3.goal`
//! - [`PathMutationEngine`]: applies `(path, value)` updates in order
//! - [`descriptor`]: bounded `Task(...)` constructor grammar for new sub-tasks
//!
//! # Example
//!
//! ```rust,ignore
//! use gp_task::{PathMutationEngine, TaskSpec, TaskTree};
//!
//! let mut tree = TaskTree::new(TaskSpec::new("Root", "Ship it"))?;
//! let report = PathMutationEngine::default()
//!     .apply(&mut tree, [("Review", "Task('Review', 'Check the draft')")])?;
//! assert!(report.is_clean());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod mutation;
mod node;
mod path;
mod tree;

pub mod descriptor;
pub mod literal;

pub use descriptor::DescriptorError;
pub use error::TaskError;
pub use literal::{Call, Literal, LiteralError};
pub use mutation::{
    ApplyMode, Change, MutationReport, PathMutationEngine, PathUpdate, SkipReason, UpdateOutcome,
};
pub use node::{TaskField, TaskId, TaskNode, TaskSpec};
pub use path::{PathError, TaskPath, SEPARATOR, SUB_TASKS_SEGMENT};
pub use tree::TaskTree;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
