//! Task node types
//!
//! - [`TaskSpec`]: owned, recursive, serializable form of a task subtree
//! - [`TaskNode`]: a node stored in a [`TaskTree`](crate::TaskTree) arena
//! - [`TaskId`]: handle into the arena
//! - [`TaskField`]: the closed set of node attributes addressable by path

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Handle of a node inside a [`TaskTree`](crate::TaskTree)
///
/// Slots are never reused, so a handle to a detached node stays invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    /// Arena slot index
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structured form of a task and everything beneath it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Task name, unique among its siblings
    pub name: String,
    /// What this task should achieve
    pub goal: String,
    /// Role name → instructions
    #[serde(default)]
    pub participants: IndexMap<String, String>,
    /// Ordered sub-tasks
    #[serde(default)]
    pub sub_tasks: Vec<TaskSpec>,
    /// Name of the active sub-task
    #[serde(default)]
    pub current_sub_task: Option<String>,
    /// Completion flag
    #[serde(default)]
    pub completed: bool,
}

impl TaskSpec {
    /// Create a leaf task
    #[must_use]
    pub fn new(name: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goal: goal.into(),
            participants: IndexMap::new(),
            sub_tasks: Vec::new(),
            current_sub_task: None,
            completed: false,
        }
    }

    /// Add a participant role
    #[must_use]
    pub fn with_participant(mut self, role: impl Into<String>, instructions: impl Into<String>) -> Self {
        self.participants.insert(role.into(), instructions.into());
        self
    }

    /// Append a sub-task
    ///
    /// The first sub-task becomes the current one unless a pointer is set.
    #[must_use]
    pub fn with_sub_task(mut self, sub_task: TaskSpec) -> Self {
        if self.current_sub_task.is_none() {
            self.current_sub_task = Some(sub_task.name.clone());
        }
        self.sub_tasks.push(sub_task);
        self
    }

    /// Point at a specific sub-task
    #[must_use]
    pub fn with_current_sub_task(mut self, name: impl Into<String>) -> Self {
        self.current_sub_task = Some(name.into());
        self
    }

    /// Mark as completed
    #[must_use]
    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }

    /// Total number of tasks in this subtree, including self
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.sub_tasks.iter().map(TaskSpec::count).sum::<usize>()
    }
}

/// A node stored in the task arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub(crate) name: String,
    pub(crate) goal: String,
    pub(crate) participants: IndexMap<String, String>,
    pub(crate) sub_tasks: Vec<TaskId>,
    pub(crate) current_sub_task: Option<String>,
    pub(crate) completed: bool,
    pub(crate) parent: Option<TaskId>,
}

impl TaskNode {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Role name → instructions
    #[inline]
    #[must_use]
    pub fn participants(&self) -> &IndexMap<String, String> {
        &self.participants
    }

    /// Child handles in order
    #[inline]
    #[must_use]
    pub fn sub_tasks(&self) -> &[TaskId] {
        &self.sub_tasks
    }

    #[inline]
    #[must_use]
    pub fn current_sub_task(&self) -> Option<&str> {
        self.current_sub_task.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }
}

/// Attributes of a task node that a path may address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    Name,
    Goal,
    Participants,
    SubTasks,
    CurrentSubTask,
    Completed,
}

impl TaskField {
    /// All fields in declaration order
    pub const ALL: [TaskField; 6] = [
        Self::Name,
        Self::Goal,
        Self::Participants,
        Self::SubTasks,
        Self::CurrentSubTask,
        Self::Completed,
    ];

    /// Attribute name as written in paths
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Goal => "goal",
            Self::Participants => "participants",
            Self::SubTasks => "sub_tasks",
            Self::CurrentSubTask => "current_sub_task",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|f| f.as_str() == s).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_points_at_first_sub_task() {
        let spec = TaskSpec::new("Root", "g")
            .with_sub_task(TaskSpec::new("A", "a"))
            .with_sub_task(TaskSpec::new("B", "b"));
        assert_eq!(spec.current_sub_task.as_deref(), Some("A"));
        assert_eq!(spec.count(), 3);
    }

    #[test]
    fn explicit_pointer_is_kept() {
        let spec = TaskSpec::new("Root", "g")
            .with_current_sub_task("B")
            .with_sub_task(TaskSpec::new("A", "a"))
            .with_sub_task(TaskSpec::new("B", "b"));
        assert_eq!(spec.current_sub_task.as_deref(), Some("B"));
    }

    #[test]
    fn field_names_round_trip() {
        for field in TaskField::ALL {
            assert_eq!(field.as_str().parse::<TaskField>(), Ok(field));
        }
        assert!("Task2".parse::<TaskField>().is_err());
    }

    #[test]
    fn spec_deserializes_with_defaults() {
        let spec: TaskSpec = serde_json::from_str(r#"{"name": "A", "goal": "g"}"#).unwrap();
        assert_eq!(spec, TaskSpec::new("A", "g"));
    }
}
