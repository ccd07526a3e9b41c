//! Workflow graph
//!
//! Registry of [`StateRecord`]s with a current-state pointer. Transitions are
//! gated on the current record's `completed` flag and follow its labeled
//! `transitions` map.

use crate::error::WorkflowError;
use crate::state::{StateRecord, NEXT_LABEL};
use indexmap::{IndexMap, IndexSet};

/// Name of the state seeded by [`WorkflowGraph::new`]
pub const INITIAL_STATE: &str = "init";

/// Result of a transition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Current state is not completed; nothing changed
    Blocked,
    /// Moved along `label` from `from` to `to`
    Advanced {
        from: String,
        to: String,
        label: String,
    },
}

impl Transition {
    #[inline]
    #[must_use]
    pub fn is_advanced(&self) -> bool {
        matches!(self, Self::Advanced { .. })
    }
}

/// Named states plus the current one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowGraph {
    states: IndexMap<String, StateRecord>,
    current: String,
}

impl WorkflowGraph {
    /// Seed the graph with `initial` registered as `init`
    #[must_use]
    pub fn new(initial: StateRecord) -> Self {
        let mut states = IndexMap::new();
        states.insert(INITIAL_STATE.to_string(), initial);
        Self {
            states,
            current: INITIAL_STATE.to_string(),
        }
    }

    /// Insert or overwrite a state; the last write wins
    pub fn add_state(&mut self, name: impl Into<String>, record: StateRecord) {
        let name = name.into();
        tracing::debug!("Adding state {}", name);
        self.states.insert(name, record);
    }

    /// # Errors
    /// Returns `NotFound` if no state has this name
    pub fn retrieve_state(&self, name: &str) -> Result<&StateRecord, WorkflowError> {
        self.states
            .get(name)
            .ok_or_else(|| WorkflowError::NotFound(name.to_string()))
    }

    /// Replace an existing state
    ///
    /// # Errors
    /// Returns `NotFound` if no state has this name
    pub fn update_state(&mut self, name: &str, record: StateRecord) -> Result<(), WorkflowError> {
        *self.state_mut(name)? = record;
        Ok(())
    }

    /// Delete a state
    ///
    /// Removing the current state leaves `current` dangling; later reads of
    /// the current state fail with `NotFound`.
    ///
    /// # Errors
    /// Returns `NotFound` if no state has this name
    pub fn remove_state(&mut self, name: &str) -> Result<StateRecord, WorkflowError> {
        let removed = self
            .states
            .shift_remove(name)
            .ok_or_else(|| WorkflowError::NotFound(name.to_string()))?;
        if name == self.current {
            tracing::warn!("Removed current state {}", name);
        }
        Ok(removed)
    }

    /// Name of the current state
    #[inline]
    #[must_use]
    pub fn current_state(&self) -> &str {
        &self.current
    }

    /// Record of the current state
    ///
    /// # Errors
    /// Returns `NotFound` if the current state was removed
    pub fn current_state_details(&self) -> Result<&StateRecord, WorkflowError> {
        self.retrieve_state(&self.current)
    }

    /// Whether a state is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// State names in insertion order
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// Advance along the default transition
    ///
    /// The default is the only label when there is one, otherwise `next`.
    ///
    /// # Errors
    /// - `NotFound` if the current state or the target is missing
    /// - `NoTransition` / `AmbiguousTransition` if no default label exists
    pub fn transition(&mut self) -> Result<Transition, WorkflowError> {
        let record = self.current_state_details()?;
        if !record.completed {
            tracing::debug!("Transition from {} blocked: not completed", self.current);
            return Ok(Transition::Blocked);
        }
        let label = match record.transitions.len() {
            0 => return Err(WorkflowError::NoTransition(self.current.clone())),
            1 => record.transitions.keys().next().cloned(),
            _ => record
                .transitions
                .contains_key(NEXT_LABEL)
                .then(|| NEXT_LABEL.to_string()),
        };
        let label = label.ok_or_else(|| WorkflowError::AmbiguousTransition {
            state: self.current.clone(),
            labels: record.transitions.keys().cloned().collect(),
        })?;
        self.transition_via(&label)
    }

    /// Advance along a labeled transition
    ///
    /// # Errors
    /// - `NotFound` if the current state or the target is missing
    /// - `UnknownLabel` if the current state has no such label
    pub fn transition_via(&mut self, label: &str) -> Result<Transition, WorkflowError> {
        let record = self.current_state_details()?;
        if !record.completed {
            tracing::debug!("Transition from {} blocked: not completed", self.current);
            return Ok(Transition::Blocked);
        }
        let target = record
            .transitions
            .get(label)
            .ok_or_else(|| WorkflowError::UnknownLabel {
                state: self.current.clone(),
                label: label.to_string(),
            })?;
        if !self.states.contains_key(target) {
            return Err(WorkflowError::NotFound(target.clone()));
        }
        let to = target.clone();
        let from = std::mem::replace(&mut self.current, to.clone());
        tracing::info!("Transitioned {} -> {} via '{}'", from, to, label);
        Ok(Transition::Advanced {
            from,
            to,
            label: label.to_string(),
        })
    }

    /// Replace the roles of a state
    ///
    /// # Errors
    /// Returns `NotFound` if no state has this name
    pub fn update_roles<I, S>(&mut self, state: &str, roles: I) -> Result<(), WorkflowError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state_mut(state)?.roles = roles.into_iter().map(Into::into).collect::<IndexSet<_>>();
        Ok(())
    }

    /// Set a role's individual instructions, or the group instructions when
    /// `role` is `None`
    ///
    /// # Errors
    /// Returns `NotFound` if no state has this name
    pub fn update_instructions(
        &mut self,
        state: &str,
        instructions: impl Into<String>,
        role: Option<&str>,
    ) -> Result<(), WorkflowError> {
        let record = self.state_mut(state)?;
        match role {
            Some(role) => {
                record
                    .individual_instructions
                    .insert(role.to_string(), instructions.into());
            }
            None => record.group_instructions = instructions.into(),
        }
        Ok(())
    }

    /// # Errors
    /// Returns `NotFound` if no state has this name
    pub fn update_goal(&mut self, state: &str, goal: impl Into<String>) -> Result<(), WorkflowError> {
        self.state_mut(state)?.goal = goal.into();
        Ok(())
    }

    /// Replace the labeled transitions of a state
    ///
    /// # Errors
    /// Returns `NotFound` if no state has this name
    pub fn update_transitions(
        &mut self,
        state: &str,
        transitions: IndexMap<String, String>,
    ) -> Result<(), WorkflowError> {
        self.state_mut(state)?.transitions = transitions;
        Ok(())
    }

    /// # Errors
    /// Returns `NotFound` if no state has this name
    pub fn set_completed(&mut self, state: &str, completed: bool) -> Result<(), WorkflowError> {
        self.state_mut(state)?.completed = completed;
        Ok(())
    }

    /// Set a field of a state through a dotted path
    ///
    /// # Errors
    /// `NotFound` for an unknown state, otherwise see
    /// [`StateRecord::apply_path`]
    pub fn update_state_path(&mut self, state: &str, path: &str, value: &str) -> Result<(), WorkflowError> {
        self.state_mut(state)?.apply_path(path, value)
    }

    fn state_mut(&mut self, name: &str) -> Result<&mut StateRecord, WorkflowError> {
        self.states
            .get_mut(name)
            .ok_or_else(|| WorkflowError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn graph() -> WorkflowGraph {
        let mut g = WorkflowGraph::new(
            StateRecord::new("init", "Gather requirements").with_transition(NEXT_LABEL, "design"),
        );
        g.add_state("design", StateRecord::new("design", "Design it"));
        g
    }

    #[test]
    fn test_new_registers_init() {
        let g = graph();
        assert_eq!(g.current_state(), INITIAL_STATE);
        assert_eq!(g.current_state_details().unwrap().goal, "Gather requirements");
    }

    #[test]
    fn test_add_state_last_write_wins() {
        let mut g = graph();
        g.add_state("design", StateRecord::new("design", "Second"));
        assert_eq!(g.retrieve_state("design").unwrap().goal, "Second");
    }

    #[test]
    fn test_update_and_remove_require_existing() {
        let mut g = graph();
        assert_eq!(
            g.update_state("missing", StateRecord::default()),
            Err(WorkflowError::NotFound("missing".into()))
        );
        assert!(g.remove_state("missing").is_err());
        assert!(g.remove_state("design").is_ok());
        assert!(!g.contains("design"));
    }

    #[test]
    fn test_removing_current_dangles() {
        let mut g = graph();
        g.remove_state(INITIAL_STATE).unwrap();
        assert_eq!(g.current_state(), INITIAL_STATE);
        assert!(matches!(
            g.current_state_details(),
            Err(WorkflowError::NotFound(_))
        ));
    }

    #[test]
    fn test_blocked_until_completed() {
        let mut g = graph();
        assert_eq!(g.transition().unwrap(), Transition::Blocked);
        assert_eq!(g.current_state(), INITIAL_STATE);

        g.set_completed(INITIAL_STATE, true).unwrap();
        let t = g.transition().unwrap();
        assert!(t.is_advanced());
        assert_eq!(g.current_state(), "design");
    }

    #[test]
    fn test_missing_target_is_not_found() {
        let mut g = WorkflowGraph::new(
            StateRecord::new("init", "g")
                .with_transition(NEXT_LABEL, "nowhere")
                .completed(),
        );
        assert_eq!(
            g.transition(),
            Err(WorkflowError::NotFound("nowhere".into()))
        );
        assert_eq!(g.current_state(), INITIAL_STATE);
    }

    #[test]
    fn test_label_selection() {
        let mut g = WorkflowGraph::new(
            StateRecord::new("init", "g")
                .with_transition("approve", "done")
                .with_transition("reject", "init")
                .completed(),
        );
        g.add_state("done", StateRecord::default());
        assert!(matches!(
            g.transition(),
            Err(WorkflowError::AmbiguousTransition { .. })
        ));
        assert!(matches!(
            g.transition_via("escalate"),
            Err(WorkflowError::UnknownLabel { .. })
        ));
        g.transition_via("approve").unwrap();
        assert_eq!(g.current_state(), "done");
        assert_eq!(
            g.transition(),
            Ok(Transition::Blocked)
        );
    }

    #[test]
    fn test_no_transitions() {
        let mut g = WorkflowGraph::new(StateRecord::new("init", "g").completed());
        assert_eq!(
            g.transition(),
            Err(WorkflowError::NoTransition(INITIAL_STATE.into()))
        );
    }

    #[test]
    fn test_agent_mutators() {
        let mut g = graph();
        g.update_roles("design", ["Architect", "Reviewer"]).unwrap();
        g.update_instructions("design", "Sketch the modules", Some("Architect"))
            .unwrap();
        g.update_instructions("design", "Agree on one design", None)
            .unwrap();
        g.update_goal("design", "Pick a design").unwrap();
        g.update_transitions(
            "design",
            IndexMap::from([("next".to_string(), "init".to_string())]),
        )
        .unwrap();
        g.update_state_path("design", "completed", "true").unwrap();

        let rec = g.retrieve_state("design").unwrap();
        assert_eq!(rec.roles.len(), 2);
        assert_eq!(rec.instructions_for("Architect"), "Sketch the modules");
        assert_eq!(rec.group_instructions, "Agree on one design");
        assert_eq!(rec.goal, "Pick a design");
        assert_eq!(rec.transitions["next"], "init");
        assert!(rec.completed);

        assert!(g.update_goal("missing", "x").is_err());
    }
}
