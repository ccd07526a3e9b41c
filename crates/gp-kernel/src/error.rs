use gp_task::{LiteralError, PathError};

/// Workflow graph and state record errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// No state registered under the name
    #[error("state not found: {0}")]
    NotFound(String),

    /// Current state has no transition under the label
    #[error("state {state} has no transition labeled '{label}'")]
    UnknownLabel { state: String, label: String },

    /// Several labels and none is `next`
    #[error("state {state} has several transitions ({labels:?}); a label is required")]
    AmbiguousTransition { state: String, labels: Vec<String> },

    /// Current state declares no transitions
    #[error("state {0} has no transitions")]
    NoTransition(String),

    /// Path names no field of a state record
    #[error("'{attribute}' is not an attribute of a state: {reason}")]
    InvalidAttribute { attribute: String, reason: String },

    /// Value does not fit the field
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Path syntax error
    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// Workflow definition could not be read
    #[error("failed to load workflow definition: {0}")]
    Load(String),
}

impl WorkflowError {
    /// Whether the caller can correct the request and retry
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Load(_))
    }

    pub(crate) fn invalid_value(field: impl Into<String>, reason: &LiteralError) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// Mutation log errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    /// Entry hash or chain link does not match its contents
    #[error("log integrity violation at entry {index}")]
    IntegrityViolation { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            WorkflowError::NotFound("review".into()).to_string(),
            "state not found: review"
        );
        assert_eq!(
            LogError::IntegrityViolation { index: 2 }.to_string(),
            "log integrity violation at entry 2"
        );
    }

    #[test]
    fn test_recoverable() {
        assert!(WorkflowError::NoTransition("init".into()).is_recoverable());
        assert!(!WorkflowError::Load("bad yaml".into()).is_recoverable());
    }
}
