//! Error types for the task hierarchy

use crate::descriptor::DescriptorError;
use crate::path::PathError;

/// Task tree and path mutation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// Handle does not resolve to a live node
    #[error("task not found: {0}")]
    NotFound(String),

    /// Path segment is not a child of the node reached so far
    #[error("'{segment}' is not a valid task name under {parent}")]
    InvalidPath { segment: String, parent: String },

    /// Final segment is neither a field nor a parseable sub-task descriptor
    #[error("'{attribute}' is not an attribute of {node}: {reason}")]
    InvalidAttribute {
        attribute: String,
        node: String,
        reason: String,
    },

    /// Field value could not be interpreted
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// `current_sub_task` names no child
    #[error("current sub-task '{reference}' of {node} does not exist")]
    DanglingReference { node: String, reference: String },

    /// Sibling with the same name already exists
    #[error("task '{name}' already exists under {parent}")]
    NameCollision { parent: String, name: String },

    /// Update with empty key or value (strict mode only)
    #[error("update has an empty path or value: '{path}'")]
    EmptyUpdate { path: String },

    /// Path syntax error
    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// Sub-task descriptor error
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
}

impl TaskError {
    /// Whether the error comes from navigating the tree rather than the value
    #[inline]
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::InvalidPath { .. } | Self::DanglingReference { .. }
        )
    }

    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}
