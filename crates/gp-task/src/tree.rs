//! Arena task tree
//!
//! [`TaskTree`] owns every node in a slot vector. Children are handle lists,
//! each node knows its parent, and nothing outside the tree holds a node.
//! Detached subtrees vacate their slots; slots are never reused.

use crate::error::TaskError;
use crate::node::{TaskId, TaskNode, TaskSpec};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

/// Task hierarchy rooted at a single node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTree {
    slots: Vec<Option<TaskNode>>,
    root: TaskId,
}

impl TaskTree {
    /// Build a tree from its structured form
    ///
    /// # Errors
    /// - `NameCollision` if two siblings share a name
    /// - `DanglingReference` if a `current_sub_task` names no child
    /// - `InvalidValue` if a name is blank
    pub fn new(spec: TaskSpec) -> Result<Self, TaskError> {
        validate_spec(&spec)?;
        let mut tree = Self {
            slots: Vec::with_capacity(spec.count()),
            root: TaskId(0),
        };
        tree.root = tree.alloc(spec, None);
        Ok(tree)
    }

    /// Root handle
    #[inline]
    #[must_use]
    pub fn root(&self) -> TaskId {
        self.root
    }

    /// Number of live nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Always false, a tree has a root
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Resolve a handle
    ///
    /// # Errors
    /// Returns `NotFound` for a detached or foreign handle
    pub fn node(&self, id: TaskId) -> Result<&TaskNode, TaskError> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    fn node_mut(&mut self, id: TaskId) -> Result<&mut TaskNode, TaskError> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    /// Find a direct child by name
    ///
    /// # Errors
    /// Returns `NotFound` if `parent` is not a live node
    pub fn child_named(&self, parent: TaskId, name: &str) -> Result<Option<TaskId>, TaskError> {
        let node = self.node(parent)?;
        Ok(node
            .sub_tasks
            .iter()
            .copied()
            .find(|c| self.slots[c.0].as_ref().is_some_and(|n| n.name == name)))
    }

    /// Active task: follow `current_sub_task` from the root
    ///
    /// A node without sub-tasks or without a pointer is the active one.
    ///
    /// # Errors
    /// Returns `DanglingReference` if a pointer names no child
    pub fn current_task(&self) -> Result<TaskId, TaskError> {
        let mut id = self.root;
        loop {
            let node = self.node(id)?;
            let Some(current) = node.current_sub_task.as_deref() else {
                return Ok(id);
            };
            if node.sub_tasks.is_empty() {
                return Ok(id);
            }
            id = self
                .child_named(id, current)?
                .ok_or_else(|| TaskError::DanglingReference {
                    node: node.name.clone(),
                    reference: current.to_string(),
                })?;
        }
    }

    /// Per-participant prompts for the active task
    ///
    /// # Errors
    /// Propagates [`current_task`](Self::current_task) failures
    pub fn generate_prompts(&self, terminal_goal: &str) -> Result<IndexMap<String, String>, TaskError> {
        let task = self.node(self.current_task()?)?;
        Ok(task
            .participants
            .iter()
            .map(|(role, instructions)| {
                let prompt = format!(
                    "You are an AI assistant taking the role of {role} in a team that is working to accomplish a goal.\n\
                     The terminal goal is {terminal_goal}\n\
                     The current goal is: {goal}.\n\
                     Your instructions are: {instructions}.\n\
                     Accomplish the goal through discussion and agent callable functions.\n",
                    goal = task.goal,
                );
                (role.clone(), prompt)
            })
            .collect())
    }

    /// Append a new sub-task (and its subtree) under `parent`
    ///
    /// # Errors
    /// - `NameCollision` if `parent` already has a child with that name
    /// - any [`TaskTree::new`] validation error for the subtree
    pub fn insert_sub_task(&mut self, parent: TaskId, spec: TaskSpec) -> Result<TaskId, TaskError> {
        validate_spec(&spec)?;
        if self.child_named(parent, &spec.name)?.is_some() {
            return Err(TaskError::NameCollision {
                parent: self.node(parent)?.name.clone(),
                name: spec.name,
            });
        }
        let id = self.alloc(spec, Some(parent));
        self.node_mut(parent)?.sub_tasks.push(id);
        Ok(id)
    }

    /// Replace all sub-tasks of `parent`
    ///
    /// A `current_sub_task` that no longer names a child moves to the first
    /// new child (or `None`).
    ///
    /// # Errors
    /// Same as [`insert_sub_task`](Self::insert_sub_task); nothing changes on error
    pub fn replace_sub_tasks(&mut self, parent: TaskId, specs: Vec<TaskSpec>) -> Result<(), TaskError> {
        let parent_name = self.node(parent)?.name.clone();
        check_unique(&parent_name, &specs)?;
        for spec in &specs {
            validate_spec(spec)?;
        }

        let old = std::mem::take(&mut self.node_mut(parent)?.sub_tasks);
        for child in old {
            self.vacate(child);
        }

        let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
        let ids: Vec<TaskId> = specs
            .into_iter()
            .map(|spec| self.alloc(spec, Some(parent)))
            .collect();

        let node = self.node_mut(parent)?;
        node.sub_tasks = ids;
        if !node
            .current_sub_task
            .as_ref()
            .is_some_and(|c| names.contains(c))
        {
            node.current_sub_task = names.into_iter().next();
        }
        Ok(())
    }

    /// Rename a node, keeping the parent's pointer valid
    ///
    /// # Errors
    /// - `NameCollision` if a sibling already has the name
    /// - `InvalidValue` for a blank name
    pub fn rename(&mut self, id: TaskId, name: impl Into<String>) -> Result<(), TaskError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TaskError::invalid_value("name", "name must not be empty"));
        }
        let node = self.node(id)?;
        let old = node.name.clone();
        if old == name {
            return Ok(());
        }
        if let Some(parent) = node.parent {
            if self.child_named(parent, &name)?.is_some() {
                return Err(TaskError::NameCollision {
                    parent: self.node(parent)?.name.clone(),
                    name,
                });
            }
            let parent = self.node_mut(parent)?;
            if parent.current_sub_task.as_deref() == Some(old.as_str()) {
                parent.current_sub_task = Some(name.clone());
            }
        }
        self.node_mut(id)?.name = name;
        Ok(())
    }

    /// Set the goal of a node
    ///
    /// # Errors
    /// Returns `NotFound` for a dead handle
    pub fn set_goal(&mut self, id: TaskId, goal: impl Into<String>) -> Result<(), TaskError> {
        self.node_mut(id)?.goal = goal.into();
        Ok(())
    }

    /// Replace the participants of a node
    ///
    /// # Errors
    /// Returns `NotFound` for a dead handle
    pub fn set_participants(
        &mut self,
        id: TaskId,
        participants: IndexMap<String, String>,
    ) -> Result<(), TaskError> {
        self.node_mut(id)?.participants = participants;
        Ok(())
    }

    /// Set the completion flag of a node
    ///
    /// # Errors
    /// Returns `NotFound` for a dead handle
    pub fn set_completed(&mut self, id: TaskId, completed: bool) -> Result<(), TaskError> {
        self.node_mut(id)?.completed = completed;
        Ok(())
    }

    /// Point a node at one of its children, or clear the pointer
    ///
    /// # Errors
    /// Returns `DanglingReference` if no child has that name
    pub fn set_current_sub_task(&mut self, id: TaskId, name: Option<String>) -> Result<(), TaskError> {
        if let Some(name) = &name {
            if self.child_named(id, name)?.is_none() {
                return Err(TaskError::DanglingReference {
                    node: self.node(id)?.name.clone(),
                    reference: name.clone(),
                });
            }
        }
        self.node_mut(id)?.current_sub_task = name;
        Ok(())
    }

    /// Structured form of the whole tree
    ///
    /// # Errors
    /// Returns `NotFound` if the arena is inconsistent
    pub fn to_spec(&self) -> Result<TaskSpec, TaskError> {
        self.spec_of(self.root)
    }

    /// Structured form of a subtree
    ///
    /// # Errors
    /// Returns `NotFound` for a dead handle
    pub fn spec_of(&self, id: TaskId) -> Result<TaskSpec, TaskError> {
        let node = self.node(id)?;
        Ok(TaskSpec {
            name: node.name.clone(),
            goal: node.goal.clone(),
            participants: node.participants.clone(),
            sub_tasks: node
                .sub_tasks
                .iter()
                .map(|c| self.spec_of(*c))
                .collect::<Result<_, _>>()?,
            current_sub_task: node.current_sub_task.clone(),
            completed: node.completed,
        })
    }

    /// Dotted path of names from below the root to `id`
    ///
    /// # Errors
    /// Returns `NotFound` for a dead handle
    pub fn path_of(&self, id: TaskId) -> Result<String, TaskError> {
        let mut names = Vec::new();
        let mut cursor = id;
        while let Some(parent) = self.node(cursor)?.parent {
            names.push(self.node(cursor)?.name.as_str());
            cursor = parent;
        }
        names.reverse();
        Ok(names.join("."))
    }

    /// Human-readable summary of one node
    ///
    /// # Errors
    /// Returns `NotFound` for a dead handle
    pub fn render(&self, id: TaskId) -> Result<String, TaskError> {
        let node = self.node(id)?;
        let sub_tasks: Vec<&str> = node
            .sub_tasks
            .iter()
            .filter_map(|c| self.slots[c.0].as_ref().map(|n| n.name.as_str()))
            .collect();
        let participants: Vec<String> = node
            .participants
            .iter()
            .map(|(role, instructions)| format!("{role}: {instructions}"))
            .collect();
        Ok(format!(
            "Task: {}\nGoal: {}\nParticipants: {{{}}}\nSub Tasks: [{}]\nCurrent Sub Task: {}\nCompleted: {}",
            node.name,
            node.goal,
            participants.join(", "),
            sub_tasks.join(", "),
            node.current_sub_task.as_deref().unwrap_or("None"),
            node.completed,
        ))
    }

    fn alloc(&mut self, spec: TaskSpec, parent: Option<TaskId>) -> TaskId {
        let id = TaskId(self.slots.len());
        self.slots.push(Some(TaskNode {
            name: spec.name,
            goal: spec.goal,
            participants: spec.participants,
            sub_tasks: Vec::with_capacity(spec.sub_tasks.len()),
            current_sub_task: spec.current_sub_task,
            completed: spec.completed,
            parent,
        }));
        let children: Vec<TaskId> = spec
            .sub_tasks
            .into_iter()
            .map(|child| self.alloc(child, Some(id)))
            .collect();
        if let Some(node) = self.slots[id.0].as_mut() {
            node.sub_tasks = children;
        }
        id
    }

    fn vacate(&mut self, id: TaskId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.slots.get_mut(id.0).and_then(Option::take) {
                stack.extend(node.sub_tasks);
            }
        }
    }
}

impl fmt::Display for TaskTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render(self.root) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}

fn check_unique(parent: &str, specs: &[TaskSpec]) -> Result<(), TaskError> {
    let mut seen = HashSet::with_capacity(specs.len());
    for spec in specs {
        if !seen.insert(spec.name.as_str()) {
            return Err(TaskError::NameCollision {
                parent: parent.to_string(),
                name: spec.name.clone(),
            });
        }
    }
    Ok(())
}

fn validate_spec(spec: &TaskSpec) -> Result<(), TaskError> {
    if spec.name.trim().is_empty() {
        return Err(TaskError::invalid_value("name", "name must not be empty"));
    }
    check_unique(&spec.name, &spec.sub_tasks)?;
    if let Some(current) = &spec.current_sub_task {
        if !spec.sub_tasks.is_empty() && !spec.sub_tasks.iter().any(|t| &t.name == current) {
            return Err(TaskError::DanglingReference {
                node: spec.name.clone(),
                reference: current.clone(),
            });
        }
    }
    spec.sub_tasks.iter().try_for_each(validate_spec)
}
