//! Planning sessions
//!
//! A [`PlanningSession`] drives rounds of dialogue: it renders a prompt for
//! every role of the current state, asks the injected [`DialogueEngine`] for
//! each response in turn, dispatches the command found in the response and
//! records what happened. Roles never fail a round; their errors are kept in
//! the [`RoundReport`].

use crate::capability::{CapabilityRegistry, Scope};
use crate::command::{Command, CommandOutcome, PlanningState};
use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::invocation::{Invocation, InvocationExtractor};
use crate::manifest::ManifestBuilder;
use gp_kernel::{MutationEvent, MutationLog, StateRecord, Transition, WorkflowError, WorkflowGraph};
use gp_task::{PathMutationEngine, TaskTree};

/// One prompt sent to the dialogue engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueRequest {
    pub role: String,
    /// System message for the role
    pub system: String,
    /// The user's request
    pub message: String,
}

/// Produces a role's response text
///
/// Implementations wrap a model client, a human at a terminal or a script.
#[async_trait::async_trait]
pub trait DialogueEngine: Send + Sync {
    /// # Errors
    /// Returns `Dialogue` if no response could be produced
    async fn respond(&self, request: &DialogueRequest) -> Result<String, CoreError>;
}

/// What came of one role's response
#[derive(Debug)]
pub enum RoleOutcome {
    /// The engine produced no response
    EngineFailed(CoreError),
    /// Response carried no invocation
    NoInvocation,
    /// Invocation could not be parsed, bound or applied
    Failed { invocation: String, error: CoreError },
    /// Command applied
    Applied {
        invocation: Invocation,
        outcome: CommandOutcome,
    },
}

impl RoleOutcome {
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// One role's part in a round
#[derive(Debug)]
pub struct RoleResult {
    pub role: String,
    pub outcome: RoleOutcome,
}

/// Summary of one round
#[derive(Debug)]
pub struct RoundReport {
    /// Workflow state, or task path, the round ran in
    pub state: String,
    /// Results in dispatch order; a task round may hold several per role
    pub roles: Vec<RoleResult>,
    /// Transition attempted after a workflow round
    pub transition: Option<Transition>,
    /// Why a completed state could not move on
    pub transition_error: Option<WorkflowError>,
}

impl RoundReport {
    fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            roles: Vec::new(),
            transition: None,
            transition_error: None,
        }
    }

    /// Number of commands applied
    #[must_use]
    pub fn applied(&self) -> usize {
        self.roles.iter().filter(|r| r.outcome.is_applied()).count()
    }

    #[must_use]
    pub fn advanced(&self) -> bool {
        self.transition.as_ref().is_some_and(Transition::is_advanced)
    }
}

/// Turn-based planning session over a workflow graph and task tree
pub struct PlanningSession<E> {
    state: PlanningState,
    config: SessionConfig,
    manifest: ManifestBuilder,
    task_registry: CapabilityRegistry,
    extractor: InvocationExtractor,
    engine: E,
    mutations: PathMutationEngine,
    log: MutationLog,
    user_request: String,
}

impl<E: DialogueEngine> PlanningSession<E> {
    /// Create a session; the terminal state is registered if absent
    pub fn new(mut state: PlanningState, config: SessionConfig, engine: E) -> Self {
        if !state.graph.contains(&config.terminal_state) {
            tracing::debug!("Registering terminal state {}", config.terminal_state);
            state.graph.add_state(
                config.terminal_state.clone(),
                StateRecord::new(config.terminal_state.clone(), ""),
            );
        }
        Self {
            state,
            manifest: ManifestBuilder::new(CapabilityRegistry::with_defaults())
                .with_manager_role(config.manager_role.clone()),
            task_registry: CapabilityRegistry::for_tasks(),
            extractor: config.extractor(),
            mutations: PathMutationEngine::new(config.apply_mode),
            config,
            engine,
            log: MutationLog::new(),
            user_request: String::new(),
        }
    }

    /// Set the request every role is asked to work on
    #[inline]
    #[must_use]
    pub fn with_user_request(mut self, request: impl Into<String>) -> Self {
        self.user_request = request.into();
        self
    }

    /// Replace the command set offered in workflow rounds
    #[inline]
    #[must_use]
    pub fn with_registry(mut self, registry: CapabilityRegistry) -> Self {
        self.manifest = ManifestBuilder::new(registry).with_manager_role(self.config.manager_role.clone());
        self
    }

    #[inline]
    pub fn state(&self) -> &PlanningState {
        &self.state
    }

    #[inline]
    pub fn graph(&self) -> &WorkflowGraph {
        &self.state.graph
    }

    #[inline]
    pub fn tree(&self) -> &TaskTree {
        &self.state.tree
    }

    #[inline]
    pub fn log(&self) -> &MutationLog {
        &self.log
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[inline]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    #[inline]
    pub fn manifest(&self) -> &ManifestBuilder {
        &self.manifest
    }

    pub fn into_state(self) -> PlanningState {
        self.state
    }

    /// Whether the workflow reached the terminal state
    pub fn is_finished(&self) -> bool {
        self.state.graph.current_state() == self.config.terminal_state
    }

    /// Query the manager and every role of the current state once
    ///
    /// Prompts are rendered before the first query, so every role sees the
    /// state as it was when the round began.
    ///
    /// # Errors
    /// Returns error only if the current state no longer exists
    pub async fn run_round(&mut self) -> Result<RoundReport, CoreError> {
        let state_name = self.state.graph.current_state().to_string();
        let prompts = self.manifest.prompts(&self.state.graph)?;
        tracing::info!("Round in state {} with {} roles", state_name, prompts.len());

        let mut report = RoundReport::new(state_name);
        for (role, system) in prompts {
            let request = DialogueRequest {
                role,
                system,
                message: self.user_request.clone(),
            };
            let outcome = match self.engine.respond(&request).await {
                Err(error) => {
                    tracing::warn!("No response from {}: {}", request.role, error);
                    RoleOutcome::EngineFailed(error)
                }
                Ok(text) => match self.extractor.extract(&text) {
                    None => {
                        tracing::debug!("No invocation in response from {}", request.role);
                        RoleOutcome::NoInvocation
                    }
                    Some(raw) => self.dispatch(&request.role, raw, Scope::Workflow),
                },
            };
            report.roles.push(RoleResult {
                role: request.role,
                outcome,
            });
        }

        match self.state.graph.transition() {
            Ok(transition) => report.transition = Some(transition),
            Err(error) => {
                tracing::warn!("Transition from {} failed: {}", report.state, error);
                report.transition_error = Some(error);
            }
        }
        Ok(report)
    }

    /// Query every participant of the active task once
    ///
    /// Each call-shaped line of the last fenced block in a response is
    /// dispatched against the task commands.
    ///
    /// # Errors
    /// Returns error if the active task cannot be resolved
    pub async fn run_task_round(&mut self) -> Result<RoundReport, CoreError> {
        let tree = &self.state.tree;
        let current = tree.current_task()?;
        let terminal_goal = tree.node(tree.root())?.goal().to_string();
        let prompts = tree.generate_prompts(&terminal_goal)?;
        let path = tree.path_of(current)?;
        let mut report = RoundReport::new(if path.is_empty() {
            tree.node(current)?.name().to_string()
        } else {
            path
        });
        let task_system = self.manifest.task_system_message();
        tracing::info!("Task round in '{}' with {} participants", report.state, prompts.len());

        for (role, prompt) in prompts {
            let request = DialogueRequest {
                role,
                system: format!("{task_system}\n{prompt}"),
                message: self.user_request.clone(),
            };
            match self.engine.respond(&request).await {
                Err(error) => {
                    tracing::warn!("No response from {}: {}", request.role, error);
                    report.roles.push(RoleResult {
                        role: request.role,
                        outcome: RoleOutcome::EngineFailed(error),
                    });
                }
                Ok(text) => {
                    let lines = InvocationExtractor::extract_fenced(&text);
                    if lines.is_empty() {
                        report.roles.push(RoleResult {
                            role: request.role.clone(),
                            outcome: RoleOutcome::NoInvocation,
                        });
                    }
                    for line in lines {
                        let outcome = self.dispatch(&request.role, line, Scope::Task);
                        report.roles.push(RoleResult {
                            role: request.role.clone(),
                            outcome,
                        });
                    }
                }
            }
        }
        Ok(report)
    }

    /// Run rounds until the terminal state or the round limit
    ///
    /// # Errors
    /// Propagates [`run_round`](Self::run_round) errors
    pub async fn run(&mut self) -> Result<Vec<RoundReport>, CoreError> {
        let mut reports = Vec::new();
        while !self.is_finished() {
            if reports.len() >= self.config.max_rounds {
                tracing::warn!(
                    "Stopping after {} rounds in state {}",
                    reports.len(),
                    self.state.graph.current_state()
                );
                break;
            }
            reports.push(self.run_round().await?);
        }
        if self.is_finished() {
            tracing::info!("Reached {} after {} rounds", self.config.terminal_state, reports.len());
        }
        Ok(reports)
    }

    fn dispatch(&mut self, role: &str, raw: &str, scope: Scope) -> RoleOutcome {
        let state_name = self.state.graph.current_state().to_string();
        let registry = match scope {
            Scope::Workflow => self.manifest.registry(),
            Scope::Task => &self.task_registry,
        };
        let result = Invocation::parse(raw).and_then(|invocation| {
            let command = Command::bind(registry, &invocation)?;
            Ok((invocation, command))
        });
        let result = match result {
            Ok((invocation, command)) => command
                .apply(&mut self.state, &self.mutations)
                .map(|outcome| (invocation, outcome)),
            Err(error) => Err(CoreError::from(error)),
        };

        let (outcome, summary) = match result {
            Ok((invocation, outcome)) => {
                let summary = outcome.summary.clone();
                (RoleOutcome::Applied { invocation, outcome }, summary)
            }
            Err(error) => {
                tracing::warn!("Command from {} failed: {}", role, error);
                let summary = format!("error: {error}");
                (
                    RoleOutcome::Failed {
                        invocation: raw.trim().to_string(),
                        error,
                    },
                    summary,
                )
            }
        };
        self.log
            .append(MutationEvent::new(role, state_name, raw.trim(), summary));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gp_task::TaskSpec;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    struct Queue(Mutex<VecDeque<String>>);

    #[async_trait::async_trait]
    impl DialogueEngine for Queue {
        async fn respond(&self, _request: &DialogueRequest) -> Result<String, CoreError> {
            self.0
                .lock()
                .pop_front()
                .ok_or_else(|| CoreError::Dialogue("script exhausted".into()))
        }
    }

    fn session(responses: &[&str]) -> PlanningSession<Queue> {
        let graph = WorkflowGraph::new(StateRecord::new("init", "Plan").with_transition("next", "complete"));
        let tree = TaskTree::new(TaskSpec::new("Root", "Do it")).unwrap();
        let queue = Queue(Mutex::new(responses.iter().map(|s| (*s).to_string()).collect()));
        PlanningSession::new(PlanningState::new(graph, tree), SessionConfig::default(), queue)
    }

    #[test]
    fn registers_terminal_state() {
        let s = session(&[]);
        assert!(s.graph().contains("complete"));
        assert!(!s.is_finished());
    }

    #[tokio::test]
    async fn manager_completes_state() {
        let mut s = session(&["Initial Answer: set_task_completed('init')\nReflection: done"]);
        let report = s.run_round().await.unwrap();
        assert_eq!(report.applied(), 1);
        assert!(report.advanced());
        assert!(s.is_finished());
        assert_eq!(s.log().len(), 1);
        s.log().verify_integrity().unwrap();
    }

    #[tokio::test]
    async fn engine_failure_is_recorded() {
        let mut s = session(&[]);
        let report = s.run_round().await.unwrap();
        assert!(matches!(report.roles[0].outcome, RoleOutcome::EngineFailed(_)));
        assert_eq!(report.transition, Some(Transition::Blocked));
        assert!(s.log().is_empty());
    }

    #[tokio::test]
    async fn run_stops_at_round_limit() {
        let graph = WorkflowGraph::new(StateRecord::new("init", "Plan"));
        let tree = TaskTree::new(TaskSpec::new("Root", "Do it")).unwrap();
        let queue = Queue(Mutex::new(VecDeque::new()));
        let mut s = PlanningSession::new(
            PlanningState::new(graph, tree),
            SessionConfig::default().with_max_rounds(3),
            queue,
        );
        let reports = s.run().await.unwrap();
        assert_eq!(reports.len(), 3);
        assert!(!s.is_finished());
    }
}
