//! Capability manifests
//!
//! Builds the system message each role receives: the list of callable
//! commands, the framing text, the current state's group instructions, the
//! role's own instructions and the expected invocation format. Output is a
//! pure function of the registry, the role and the workflow state.

use crate::capability::{CapabilityDescriptor, CapabilityRegistry, Scope};
use crate::error::CoreError;
use gp_kernel::WorkflowGraph;
use gp_task::descriptor;
use indexmap::IndexMap;

/// Role that coordinates a round and has no individual instructions
pub const DEFAULT_MANAGER_ROLE: &str = "Manager";

const MANIFEST_HEADER: &str = "Functions available for AI to execute:\n";

const FRAMING: &str = r#"
Example State:
{
  "name": "Initial_Assessment",
  "roles": ["Task_Analyzer", "Workflow_Planner"],
  "group_instructions": "Review the user request and collaboratively develop an initial plan. Use the functions listed above to update the workflow you are operating on and plan tasks for later phases.",
  "individual_instructions": {
      "Task_Analyzer": "Analyze the user's request, identify key objectives and potential challenges.",
      "Workflow_Planner": "Based on the analysis, propose an initial set of states and actions required to accomplish the objectives."
  },
  "goal": "To understand the user's request and create a preliminary plan for the workflow.",
  "completed": false,
  "transitions": {
      "Plan_Developed": "Plan_Development",
      "Need_More_Info": "Information_Gathering"
  }
}
You are directed to assert full control over your workflow by calling the functions provided. Your primary task is to populate the workflow with states, outlining a detailed plan to address the user request. For each inquiry, you must:

Execute your plan by completing the goal and transitioning to the next step.
Each task required to complete the user's request is represented as a state in the workflow. Each state has a goal and transitions.

Instructions for this phase:
"#;

const FOOTER: &str = "
Manipulate the workflow (aka your plan) to fulfill the user's request:
```
function_name(arg1=value1, arg2=value2);
```";

const TASK_FRAMING: &str = "You are an AI agent that is a member of a collaborative team of AI agents operating within a framework of Task objects which you have access to create and to modify in pursuit of the user's goal.
You will be assigned a role and a set of instructions for that role.
Your goal is to accomplish the task by following your instructions and by communicating with your teammates.
You must update your operational plan by responding with the agent callable function 'update_task' to modify the Task hierarchy when applicable.
A Task hierarchy is a tree of Task objects where each Task object has a list of sub-Tasks.
";

const TASK_FOOTER: &str = "
# Respond in the following format:
# Team Discussion
 ...
# agent callable functions

Here are the Task updates that I think we should make to complete the user request
```
...
```
";

/// Renders manifests and per-role system messages
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    registry: CapabilityRegistry,
    manager_role: String,
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new(CapabilityRegistry::with_defaults())
    }
}

impl ManifestBuilder {
    #[must_use]
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            registry,
            manager_role: DEFAULT_MANAGER_ROLE.to_string(),
        }
    }

    /// Use a different manager role name
    #[inline]
    #[must_use]
    pub fn with_manager_role(mut self, role: impl Into<String>) -> Self {
        self.manager_role = role.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn manager_role(&self) -> &str {
        &self.manager_role
    }

    /// Every registered command in registration order
    #[must_use]
    pub fn manifest(&self) -> String {
        let mut out = String::from(MANIFEST_HEADER);
        for descriptor in self.registry.iter() {
            render_descriptor(&mut out, descriptor);
            out.push_str("\n\n");
        }
        out
    }

    /// Full system message for `role` in the current state
    ///
    /// # Errors
    /// Returns `NotFound` if the current state was removed
    pub fn system_message(&self, role: &str, graph: &WorkflowGraph) -> Result<String, CoreError> {
        let state = graph.current_state_details()?;
        let individual = if role == self.manager_role {
            "\n"
        } else {
            state.instructions_for(role)
        };
        Ok(format!(
            "{manifest}\nGroup Goal: \n{FRAMING}{group}\nYour role to play:\n{individual}\n{FOOTER}",
            manifest = self.manifest(),
            group = state.group_instructions,
        ))
    }

    /// Messages for the manager followed by every role of the current state
    ///
    /// # Errors
    /// Returns `NotFound` if the current state was removed
    pub fn prompts(&self, graph: &WorkflowGraph) -> Result<IndexMap<String, String>, CoreError> {
        let state = graph.current_state_details()?;
        let mut prompts = IndexMap::with_capacity(state.roles.len() + 1);
        prompts.insert(
            self.manager_role.clone(),
            self.system_message(&self.manager_role, graph)?,
        );
        for role in &state.roles {
            prompts.insert(role.clone(), self.system_message(role, graph)?);
        }
        Ok(prompts)
    }

    /// System message for task-tree rounds
    ///
    /// Lists the task commands and the `Task(...)` constructor they accept.
    #[must_use]
    pub fn task_system_message(&self) -> String {
        let mut out = String::from(TASK_FRAMING);
        out.push_str("# agent callable functions\n");
        out.push_str(&format!(
            "{}({})\n\nConstructs a sub-task for use as an update_task value.\n\n",
            descriptor::CONSTRUCTORS[0],
            descriptor::PARAMETERS.join(", ")
        ));
        for descriptor in self.registry.iter().filter(|d| d.scope == Scope::Task) {
            render_descriptor(&mut out, descriptor);
        }
        out.push_str(TASK_FOOTER);
        out
    }
}

fn render_descriptor(out: &mut String, descriptor: &CapabilityDescriptor) {
    let args: Vec<String> = std::iter::once("self".to_string())
        .chain(descriptor.parameter_names().map(|p| format!("{p}=None")))
        .collect();
    out.push_str(&format!(
        "# {name}\ndef {name}({args}):\n\n{doc}\n",
        name = descriptor.name,
        args = args.join(", "),
        doc = trim_quotes_and_spaces(descriptor.documentation),
    ));
}

fn trim_quotes_and_spaces(doc: &str) -> String {
    doc.replace('"', "").trim().to_string()
}
