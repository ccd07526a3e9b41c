//! Capability descriptors
//!
//! Static declarations of every command a role may invoke. The manifest is
//! rendered from these tables and invocations are bound against them; nothing
//! is discovered at runtime.

use crate::error::InvocationError;
use crate::invocation::Invocation;
use indexmap::IndexMap;
use std::fmt;

/// Which round a command belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Edits the workflow graph
    Workflow,
    /// Edits the task tree
    Task,
}

/// One declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: &'static str,
    pub required: bool,
}

const fn required(name: &'static str) -> ParameterDescriptor {
    ParameterDescriptor {
        name,
        required: true,
    }
}

const fn optional(name: &'static str) -> ParameterDescriptor {
    ParameterDescriptor {
        name,
        required: false,
    }
}

/// Static declaration of one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    pub kind: CommandKind,
    pub name: &'static str,
    pub parameters: &'static [ParameterDescriptor],
    pub documentation: &'static str,
    pub scope: Scope,
}

impl CapabilityDescriptor {
    /// Parameter names in declaration order
    pub fn parameter_names(&self) -> impl Iterator<Item = &'static str> {
        self.parameters.iter().map(|p| p.name)
    }

    /// Bind an invocation's arguments to parameter names
    ///
    /// Positional arguments fill parameters in declaration order.
    ///
    /// # Errors
    /// Returns error for surplus, unknown, duplicate or missing arguments
    pub fn bind(&self, invocation: &Invocation) -> Result<IndexMap<&'static str, String>, InvocationError> {
        if invocation.positional.len() > self.parameters.len() {
            return Err(InvocationError::TooManyArguments {
                function: self.name.to_string(),
                expected: self.parameters.len(),
                found: invocation.positional.len(),
            });
        }

        let mut bound: IndexMap<&'static str, String> = self
            .parameter_names()
            .zip(invocation.positional.iter().cloned())
            .collect();

        for (key, value) in &invocation.named {
            let Some(param) = self.parameter_names().find(|p| *p == key.as_str()) else {
                return Err(InvocationError::UnexpectedArgument {
                    function: self.name.to_string(),
                    argument: key.clone(),
                });
            };
            if bound.insert(param, value.clone()).is_some() {
                return Err(InvocationError::DuplicateArgument {
                    function: self.name.to_string(),
                    parameter: key.clone(),
                });
            }
        }

        if let Some(missing) = self
            .parameters
            .iter()
            .find(|p| p.required && !bound.contains_key(p.name))
        {
            return Err(InvocationError::MissingArgument {
                function: self.name.to_string(),
                parameter: missing.name,
            });
        }
        Ok(bound)
    }
}

/// Closed set of commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    AddTaskToPlan,
    SearchTheWeb,
    SetTaskCompleted,
    UpdateGoal,
    UpdateInstructions,
    UpdateRoles,
    UpdateState,
    UpdateTransitions,
    UpdateTask,
}

impl CommandKind {
    /// All commands in manifest order
    pub const ALL: [CommandKind; 9] = [
        Self::AddTaskToPlan,
        Self::SearchTheWeb,
        Self::SetTaskCompleted,
        Self::UpdateGoal,
        Self::UpdateInstructions,
        Self::UpdateRoles,
        Self::UpdateState,
        Self::UpdateTransitions,
        Self::UpdateTask,
    ];

    /// Static descriptor of this command
    #[must_use]
    pub fn descriptor(self) -> &'static CapabilityDescriptor {
        match self {
            Self::AddTaskToPlan => &ADD_TASK_TO_PLAN,
            Self::SearchTheWeb => &SEARCH_THE_WEB,
            Self::SetTaskCompleted => &SET_TASK_COMPLETED,
            Self::UpdateGoal => &UPDATE_GOAL,
            Self::UpdateInstructions => &UPDATE_INSTRUCTIONS,
            Self::UpdateRoles => &UPDATE_ROLES,
            Self::UpdateState => &UPDATE_STATE,
            Self::UpdateTransitions => &UPDATE_TRANSITIONS,
            Self::UpdateTask => &UPDATE_TASK,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static ADD_TASK_TO_PLAN: CapabilityDescriptor = CapabilityDescriptor {
    kind: CommandKind::AddTaskToPlan,
    name: "add_task_to_plan",
    parameters: &[required("state_name"), required("state")],
    documentation: r#"
        Adds a new state to the workflow with its goal, roles, instructions and transitions.

        Args:
            state_name (str): The name of the new state.
            state (dict): The state, e.g. {"goal": "...", "roles": ["..."], "transitions": {"next": "..."}}.
    "#,
    scope: Scope::Workflow,
};

static SEARCH_THE_WEB: CapabilityDescriptor = CapabilityDescriptor {
    kind: CommandKind::SearchTheWeb,
    name: "search_the_web",
    parameters: &[required("query")],
    documentation: r"
        Searches the web for the given query.

        Args:
            query (str): The query to search the web for.
    ",
    scope: Scope::Workflow,
};

static SET_TASK_COMPLETED: CapabilityDescriptor = CapabilityDescriptor {
    kind: CommandKind::SetTaskCompleted,
    name: "set_task_completed",
    parameters: &[required("state_name"), optional("completed")],
    documentation: r"
        Sets a state's completion status. A completed state moves the workflow along its transition.

        Args:
            state_name (str): The name of the state.
            completed (bool): The completion status to set for the state. Defaults to True.
    ",
    scope: Scope::Workflow,
};

static UPDATE_GOAL: CapabilityDescriptor = CapabilityDescriptor {
    kind: CommandKind::UpdateGoal,
    name: "update_goal",
    parameters: &[required("state_name"), required("goal")],
    documentation: r"
        Updates the goal for a given state, giving agents control over their operating plan.

        Args:
            state_name (str): The name of the state.
            goal (str): The updated goal for the state.
    ",
    scope: Scope::Workflow,
};

static UPDATE_INSTRUCTIONS: CapabilityDescriptor = CapabilityDescriptor {
    kind: CommandKind::UpdateInstructions,
    name: "update_instructions",
    parameters: &[
        required("state_name"),
        required("instructions"),
        optional("role"),
    ],
    documentation: r"
        Updates instructions for a given state. If a role is specified, updates that role's individual instructions;
        otherwise, updates the group instructions.

        Args:
            state_name (str): The name of the state.
            instructions (str): The updated instructions.
            role (str, optional): The role whose instructions to update. If None, updates the group instructions.
    ",
    scope: Scope::Workflow,
};

static UPDATE_ROLES: CapabilityDescriptor = CapabilityDescriptor {
    kind: CommandKind::UpdateRoles,
    name: "update_roles",
    parameters: &[required("state_name"), required("new_roles")],
    documentation: r"
        Updates the roles for a given state, giving agents control over their operating plan.

        Args:
            state_name (str): The name of the state.
            new_roles (list of str): A list of new roles for the state.
    ",
    scope: Scope::Workflow,
};

static UPDATE_STATE: CapabilityDescriptor = CapabilityDescriptor {
    kind: CommandKind::UpdateState,
    name: "update_state",
    parameters: &[required("state_name"), required("path"), required("value")],
    documentation: r"
        Updates one field of a state addressed by a dotted path, such as goal, completed,
        individual_instructions.<role> or transitions.<label>.

        Args:
            state_name (str): The name of the state.
            path (str): The dotted path of the field.
            value (str): The new value.
    ",
    scope: Scope::Workflow,
};

static UPDATE_TRANSITIONS: CapabilityDescriptor = CapabilityDescriptor {
    kind: CommandKind::UpdateTransitions,
    name: "update_transitions",
    parameters: &[required("state_name"), required("transitions")],
    documentation: r"
        Updates the transitions for a given state, giving agents control over their operating plan.

        Args:
            state_name (str): The name of the state.
            transitions (dict): A dictionary mapping transition labels to target state names.
    ",
    scope: Scope::Workflow,
};

static UPDATE_TASK: CapabilityDescriptor = CapabilityDescriptor {
    kind: CommandKind::UpdateTask,
    name: "update_task",
    parameters: &[required("task_updates")],
    documentation: r#"
        Update a named task in the Task hierarchy.

        Args:
            task_updates (dict): Dotted task paths mapped to new values, e.g. {"Task2.Task3.goal": "New goal"}.
                A path ending in a new name takes a Task("name", "goal", {"Role": "Instructions"}) value.
    "#,
    scope: Scope::Task,
};

/// Ordered set of commands offered to roles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityRegistry {
    commands: Vec<CommandKind>,
}

impl CapabilityRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every command
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in CommandKind::ALL {
            registry.register(kind);
        }
        registry
    }

    /// Registry with the task-tree commands only
    #[must_use]
    pub fn for_tasks() -> Self {
        let mut registry = Self::new();
        for kind in CommandKind::ALL {
            if kind.descriptor().scope == Scope::Task {
                registry.register(kind);
            }
        }
        registry
    }

    /// Append a command; registering twice keeps the first position
    pub fn register(&mut self, kind: CommandKind) {
        if !self.commands.contains(&kind) {
            self.commands.push(kind);
        }
    }

    /// Remove a command
    pub fn remove(&mut self, kind: CommandKind) -> bool {
        let before = self.commands.len();
        self.commands.retain(|k| *k != kind);
        self.commands.len() != before
    }

    /// Look up a registered command by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'static CapabilityDescriptor> {
        self.commands
            .iter()
            .map(|k| k.descriptor())
            .find(|d| d.name == name)
    }

    /// Descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &'static CapabilityDescriptor> + '_ {
        self.commands.iter().map(|k| k.descriptor())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
