//! Command dispatch
//!
//! An [`Invocation`] is bound against the registry into a typed [`Command`],
//! which is then applied to the [`PlanningState`]. Argument text is converted
//! with the bounded literal grammar; nothing is evaluated.

use crate::capability::{CapabilityRegistry, CommandKind};
use crate::error::{CoreError, InvocationError};
use crate::invocation::Invocation;
use gp_kernel::{StateRecord, WorkflowGraph};
use gp_task::literal::{self, Literal};
use gp_task::{MutationReport, PathMutationEngine, PathUpdate, TaskTree};
use indexmap::IndexMap;
use std::fmt;

/// Everything commands may edit
#[derive(Debug, Clone)]
pub struct PlanningState {
    pub graph: WorkflowGraph,
    pub tree: TaskTree,
}

impl PlanningState {
    #[must_use]
    pub fn new(graph: WorkflowGraph, tree: TaskTree) -> Self {
        Self { graph, tree }
    }
}

/// A bound command with typed arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddTaskToPlan {
        state_name: String,
        state: StateRecord,
    },
    SearchTheWeb {
        query: String,
    },
    SetTaskCompleted {
        state_name: String,
        completed: bool,
    },
    UpdateGoal {
        state_name: String,
        goal: String,
    },
    UpdateInstructions {
        state_name: String,
        instructions: String,
        role: Option<String>,
    },
    UpdateRoles {
        state_name: String,
        roles: Vec<String>,
    },
    UpdateState {
        state_name: String,
        path: String,
        value: String,
    },
    UpdateTransitions {
        state_name: String,
        transitions: IndexMap<String, String>,
    },
    UpdateTask {
        updates: Vec<PathUpdate>,
    },
}

/// Result of a successfully applied command
#[derive(Debug, Clone, Default)]
pub struct CommandOutcome {
    /// One-line description for logs and reports
    pub summary: String,
    /// Per-update outcomes of `update_task`
    pub report: Option<MutationReport>,
}

impl CommandOutcome {
    fn summary(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            report: None,
        }
    }
}

/// Bound arguments of one invocation
struct Args {
    function: &'static str,
    values: IndexMap<&'static str, String>,
}

impl Args {
    fn take(&mut self, parameter: &'static str) -> Result<String, InvocationError> {
        self.values
            .shift_remove(parameter)
            .ok_or_else(|| InvocationError::MissingArgument {
                function: self.function.to_string(),
                parameter,
            })
    }

    fn text(&mut self, parameter: &'static str) -> Result<String, InvocationError> {
        self.take(parameter).map(|v| literal::text(&v))
    }

    fn optional_text(&mut self, parameter: &'static str) -> Option<String> {
        self.values
            .shift_remove(parameter)
            .map(|v| literal::text(&v))
            .filter(|v| !v.is_empty() && v != "None")
    }

    fn literal(&mut self, parameter: &'static str) -> Result<Literal, InvocationError> {
        let raw = self.take(parameter)?;
        literal::parse(&raw).map_err(|e| self.invalid(parameter, e))
    }

    fn invalid(&self, parameter: &'static str, reason: impl fmt::Display) -> InvocationError {
        InvocationError::InvalidArgument {
            function: self.function.to_string(),
            parameter,
            reason: reason.to_string(),
        }
    }
}

impl Command {
    /// Bind an invocation to a registered command
    ///
    /// # Errors
    /// `UnknownFunction` if the name is not registered, a binding error for
    /// bad argument shapes, or `InvalidArgument` if a value does not convert
    pub fn bind(registry: &CapabilityRegistry, invocation: &Invocation) -> Result<Self, InvocationError> {
        let descriptor = registry
            .get(&invocation.name)
            .ok_or_else(|| InvocationError::UnknownFunction(invocation.name.clone()))?;
        let mut args = Args {
            function: descriptor.name,
            values: descriptor.bind(invocation)?,
        };

        Ok(match descriptor.kind {
            CommandKind::AddTaskToPlan => {
                let state_name = args.text("state_name")?;
                let value = args.literal("state")?;
                let json = value.into_json().map_err(|e| args.invalid("state", e))?;
                let mut state: StateRecord =
                    serde_json::from_value(json).map_err(|e| args.invalid("state", e))?;
                state.name.clone_from(&state_name);
                Self::AddTaskToPlan { state_name, state }
            }
            CommandKind::SearchTheWeb => Self::SearchTheWeb {
                query: args.text("query")?,
            },
            CommandKind::SetTaskCompleted => {
                let state_name = args.text("state_name")?;
                let completed = match args.values.shift_remove("completed") {
                    None => true,
                    Some(raw) => Literal::parse_bool(&raw)
                        .ok_or_else(|| args.invalid("completed", format!("'{raw}' is not a boolean")))?,
                };
                Self::SetTaskCompleted {
                    state_name,
                    completed,
                }
            }
            CommandKind::UpdateGoal => Self::UpdateGoal {
                state_name: args.text("state_name")?,
                goal: args.text("goal")?,
            },
            CommandKind::UpdateInstructions => Self::UpdateInstructions {
                state_name: args.text("state_name")?,
                instructions: args.text("instructions")?,
                role: args.optional_text("role"),
            },
            CommandKind::UpdateRoles => {
                let state_name = args.text("state_name")?;
                let raw = args.take("new_roles")?;
                let roles = match literal::parse(&raw) {
                    Ok(Literal::Str(role)) => vec![role],
                    Ok(value) => value
                        .into_string_list()
                        .map_err(|e| args.invalid("new_roles", e))?,
                    // A bare role name
                    Err(_) => vec![raw.trim().to_string()],
                };
                Self::UpdateRoles { state_name, roles }
            }
            CommandKind::UpdateState => Self::UpdateState {
                state_name: args.text("state_name")?,
                path: args.text("path")?,
                value: args.take("value")?,
            },
            CommandKind::UpdateTransitions => {
                let state_name = args.text("state_name")?;
                let transitions = args
                    .literal("transitions")?
                    .into_string_map()
                    .map_err(|e| args.invalid("transitions", e))?;
                Self::UpdateTransitions {
                    state_name,
                    transitions,
                }
            }
            CommandKind::UpdateTask => {
                let Literal::Map(map) = args.literal("task_updates")? else {
                    return Err(args.invalid("task_updates", "expected a map of path to value"));
                };
                let updates = map
                    .into_iter()
                    .map(|(path, value)| PathUpdate {
                        path: Some(path),
                        // Values stay in literal form and are decoded once by the mutation engine
                        value: match value {
                            Literal::Null => None,
                            other => Some(other.to_string()),
                        },
                    })
                    .collect();
                Self::UpdateTask { updates }
            }
        })
    }

    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::AddTaskToPlan { .. } => CommandKind::AddTaskToPlan,
            Self::SearchTheWeb { .. } => CommandKind::SearchTheWeb,
            Self::SetTaskCompleted { .. } => CommandKind::SetTaskCompleted,
            Self::UpdateGoal { .. } => CommandKind::UpdateGoal,
            Self::UpdateInstructions { .. } => CommandKind::UpdateInstructions,
            Self::UpdateRoles { .. } => CommandKind::UpdateRoles,
            Self::UpdateState { .. } => CommandKind::UpdateState,
            Self::UpdateTransitions { .. } => CommandKind::UpdateTransitions,
            Self::UpdateTask { .. } => CommandKind::UpdateTask,
        }
    }

    /// Execute against the planning state
    ///
    /// # Errors
    /// Workflow errors for unknown states or bad field values; task errors
    /// only when `engine` is strict
    pub fn apply(self, state: &mut PlanningState, engine: &PathMutationEngine) -> Result<CommandOutcome, CoreError> {
        let graph = &mut state.graph;
        let outcome = match self {
            Self::AddTaskToPlan {
                state_name,
                state: record,
            } => {
                let replaced = graph.contains(&state_name);
                graph.add_state(state_name.clone(), record);
                CommandOutcome::summary(if replaced {
                    format!("replaced state {state_name}")
                } else {
                    format!("added state {state_name}")
                })
            }
            Self::SearchTheWeb { query } => {
                tracing::info!("Web search requested: {}", query);
                CommandOutcome::summary(format!("search for '{query}' is not available"))
            }
            Self::SetTaskCompleted {
                state_name,
                completed,
            } => {
                graph.set_completed(&state_name, completed)?;
                CommandOutcome::summary(format!("set {state_name} completed={completed}"))
            }
            Self::UpdateGoal { state_name, goal } => {
                graph.update_goal(&state_name, goal)?;
                CommandOutcome::summary(format!("updated goal of {state_name}"))
            }
            Self::UpdateInstructions {
                state_name,
                instructions,
                role,
            } => {
                graph.update_instructions(&state_name, instructions, role.as_deref())?;
                CommandOutcome::summary(match role {
                    Some(role) => format!("updated {role} instructions of {state_name}"),
                    None => format!("updated group instructions of {state_name}"),
                })
            }
            Self::UpdateRoles { state_name, roles } => {
                let count = roles.len();
                graph.update_roles(&state_name, roles)?;
                CommandOutcome::summary(format!("set {count} roles on {state_name}"))
            }
            Self::UpdateState {
                state_name,
                path,
                value,
            } => {
                graph.update_state_path(&state_name, &path, &value)?;
                CommandOutcome::summary(format!("set {state_name}.{path}"))
            }
            Self::UpdateTransitions {
                state_name,
                transitions,
            } => {
                let count = transitions.len();
                graph.update_transitions(&state_name, transitions)?;
                CommandOutcome::summary(format!("set {count} transitions on {state_name}"))
            }
            Self::UpdateTask { updates } => {
                let report = engine.apply(&mut state.tree, updates)?;
                CommandOutcome {
                    summary: format!(
                        "applied {} of {} task updates",
                        report.applied(),
                        report.outcomes.len()
                    ),
                    report: Some(report),
                }
            }
        };
        tracing::info!("{}", outcome.summary);
        Ok(outcome)
    }
}
