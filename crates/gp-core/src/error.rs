//! Error types for the planning orchestrator
//!
//! - [`InvocationError`]: response text that is not a usable command
//! - [`CoreError`]: everything a session operation can fail with

use gp_kernel::{LogError, WorkflowError};
use gp_task::TaskError;

/// Main orchestrator error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Invocation text is not call-shaped or names no known command
    #[error("malformed invocation: {0}")]
    MalformedInvocation(#[from] InvocationError),

    /// Workflow graph operation failed
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Task tree operation failed
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// Mutation log failed verification
    #[error("log error: {0}")]
    Log(#[from] LogError),

    /// Dialogue engine failed to answer
    #[error("dialogue engine failed: {0}")]
    Dialogue(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Whether re-prompting the role may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::MalformedInvocation(_) | Self::Dialogue(_) => true,
            Self::Workflow(e) => e.is_recoverable(),
            Self::Task(e) => !e.is_structural(),
            Self::Log(_) | Self::Config(_) => false,
        }
    }
}

/// Invocation parse and binding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvocationError {
    /// Text is not `name(args)`
    #[error("not a function call: {reason} in '{text}'")]
    NotACall { text: String, reason: &'static str },

    /// Name outside the registered command set
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// Keyword outside the parameter list
    #[error("{function}() has no parameter '{argument}'")]
    UnexpectedArgument { function: String, argument: String },

    /// More positional arguments than parameters
    #[error("{function}() takes {expected} arguments, {found} given")]
    TooManyArguments {
        function: String,
        expected: usize,
        found: usize,
    },

    /// Parameter given more than once
    #[error("{function}() got '{parameter}' more than once")]
    DuplicateArgument { function: String, parameter: String },

    /// Required parameter absent
    #[error("{function}() is missing '{parameter}'")]
    MissingArgument {
        function: String,
        parameter: &'static str,
    },

    /// Argument text does not fit the parameter
    #[error("{function}() argument '{parameter}': {reason}")]
    InvalidArgument {
        function: String,
        parameter: &'static str,
        reason: String,
    },
}

impl InvocationError {
    pub(crate) fn not_a_call(text: &str, reason: &'static str) -> Self {
        Self::NotACall {
            text: text.to_string(),
            reason,
        }
    }
}
