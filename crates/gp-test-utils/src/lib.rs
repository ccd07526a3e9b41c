//! Testing utilities for the group planning workspace
//!
//! Shared fixtures and a scripted dialogue engine.

#![allow(missing_docs)]

use gp_core::{CoreError, DialogueEngine, DialogueRequest, PlanningState, DEFAULT_END_MARKER, DEFAULT_START_MARKER};
use gp_kernel::{StateRecord, WorkflowGraph};
use gp_task::{TaskSpec, TaskTree};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Two-role initial state moving on to `review`
pub fn sample_state() -> StateRecord {
    StateRecord::new("init", "Draft a plan for the user's request")
        .with_group_instructions("Review the request and agree on the first steps.")
        .with_role("Planner", "Propose the states the workflow needs.")
        .with_role("Critic", "Point out missing steps.")
        .with_transition("next", "review")
}

/// `init` plus a `review` state leading to `complete`
pub fn sample_workflow() -> WorkflowGraph {
    let mut graph = WorkflowGraph::new(sample_state());
    graph.add_state(
        "review",
        StateRecord::new("review", "Check the plan")
            .with_role("Critic", "Approve or reject the plan.")
            .with_transition("next", "complete"),
    );
    graph
}

/// Root task with no sub-tasks
pub fn request_task() -> TaskSpec {
    TaskSpec::new("Fullfill_Request", "Fulfill the user's request")
        .with_participant("Planner", "Break the request into tasks.")
}

/// `Task1` → `Task2` → `Task3` → `Task4` → `Task5`, with a `Sibling` next to `Task2`
pub fn nested_tasks() -> TaskSpec {
    let task5 = TaskSpec::new("Task5", "Goal 5").with_participant("Writer", "Write it");
    let task4 = TaskSpec::new("Task4", "Goal 4").with_sub_task(task5).with_current_sub_task("Task5");
    let task3 = TaskSpec::new("Task3", "Goal 3").with_sub_task(task4).with_current_sub_task("Task4");
    let task2 = TaskSpec::new("Task2", "Goal 2").with_sub_task(task3).with_current_sub_task("Task3");
    TaskSpec::new("Task1", "Goal 1")
        .with_participant("Manager", "Coordinate")
        .with_sub_task(task2)
        .with_sub_task(TaskSpec::new("Sibling", "Side goal"))
        .with_current_sub_task("Task2")
}

/// Sample workflow with the request task
pub fn planning_state() -> PlanningState {
    let tree = TaskTree::new(request_task()).expect("fixture tree is valid");
    PlanningState::new(sample_workflow(), tree)
}

/// Wrap an invocation in the default markers
pub fn answer(invocation: &str) -> String {
    format!("Thought: let me act.\n{DEFAULT_START_MARKER}{invocation}{DEFAULT_END_MARKER}that should work.")
}

/// Wrap calls in a fenced block the way task rounds expect
pub fn fenced(calls: &[&str]) -> String {
    format!(
        "# Team Discussion\nAgreed.\n# agent callable functions\n```\n{}\n```\n",
        calls.join("\n")
    )
}

/// Dialogue engine answering each role from its own queue
///
/// Roles without a queued response get a `Dialogue` error. Every request is
/// recorded.
#[derive(Debug, Default)]
pub struct ScriptedDialogue {
    scripts: Mutex<IndexMap<String, VecDeque<String>>>,
    requests: Mutex<Vec<DialogueRequest>>,
}

impl ScriptedDialogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `role`
    #[must_use]
    pub fn with_response(self, role: &str, response: impl Into<String>) -> Self {
        self.push(role, response);
        self
    }

    pub fn push(&self, role: &str, response: impl Into<String>) {
        self.scripts
            .lock()
            .entry(role.to_string())
            .or_default()
            .push_back(response.into());
    }

    /// Requests seen so far, in order
    pub fn requests(&self) -> Vec<DialogueRequest> {
        self.requests.lock().clone()
    }

    /// Roles asked so far, in order
    pub fn roles_asked(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.role.clone()).collect()
    }
}

#[async_trait::async_trait]
impl DialogueEngine for ScriptedDialogue {
    async fn respond(&self, request: &DialogueRequest) -> Result<String, CoreError> {
        self.requests.lock().push(request.clone());
        self.scripts
            .lock()
            .get_mut(&request.role)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| CoreError::Dialogue(format!("no scripted response for {}", request.role)))
    }
}
