//! Path mutation engine
//!
//! Applies ordered `(path, value)` updates against a [`TaskTree`]:
//!
//! ```text
//! goal = "Ship the release"
//! Task2.Task3.goal = "New goal"
//! sub_tasks.Task2.completed = True
//! Task2.Review = Task("Review", "Check the draft")
//! ```
//!
//! Every non-final segment except `sub_tasks` must name a child. The final
//! segment is a [`TaskField`], or else the value must be a sub-task
//! descriptor which is appended under the node reached.

use crate::descriptor;
use crate::error::TaskError;
use crate::literal::{self, Literal};
use crate::node::{TaskField, TaskId, TaskSpec};
use crate::path::TaskPath;
use crate::tree::TaskTree;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How failures inside a batch of updates are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// Record each failure and keep going
    #[default]
    BestEffort,
    /// Stop at the first failure
    Strict,
}

/// One path update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathUpdate {
    pub path: Option<String>,
    pub value: Option<String>,
}

impl PathUpdate {
    #[must_use]
    pub fn new(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            value: Some(value.into()),
        }
    }

    fn path_text(&self) -> String {
        self.path.clone().unwrap_or_default()
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for PathUpdate {
    fn from((path, value): (K, V)) -> Self {
        Self::new(path, value)
    }
}

impl FromStr for PathUpdate {
    type Err = std::convert::Infallible;

    /// Parse `path = value`; a missing side is left empty
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let non_empty = |t: &str| {
            let t = t.trim();
            (!t.is_empty()).then(|| t.to_string())
        };
        Ok(match s.split_once('=') {
            Some((path, value)) => Self {
                path: non_empty(path),
                value: non_empty(value),
            },
            None => Self {
                path: non_empty(s),
                value: None,
            },
        })
    }
}

/// What an applied update changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A node attribute was set
    Field(TaskField),
    /// A sub-task with this name was appended
    Inserted(String),
}

/// Why an update was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyPath,
    EmptyValue,
}

/// Result of one update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied {
        path: String,
        node: TaskId,
        change: Change,
    },
    Skipped {
        path: String,
        reason: SkipReason,
    },
    Failed {
        path: String,
        error: TaskError,
    },
}

impl UpdateOutcome {
    /// Path as given in the update
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Applied { path, .. } | Self::Skipped { path, .. } | Self::Failed { path, .. } => {
                path
            }
        }
    }
}

/// Per-update outcomes of a batch, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationReport {
    pub outcomes: Vec<UpdateOutcome>,
}

impl MutationReport {
    /// Number of applied updates
    #[must_use]
    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, UpdateOutcome::Applied { .. }))
            .count()
    }

    /// Skipped updates
    pub fn skipped(&self) -> impl Iterator<Item = (&str, SkipReason)> {
        self.outcomes.iter().filter_map(|o| match o {
            UpdateOutcome::Skipped { path, reason } => Some((path.as_str(), *reason)),
            _ => None,
        })
    }

    /// Failed updates
    pub fn failures(&self) -> impl Iterator<Item = (&str, &TaskError)> {
        self.outcomes.iter().filter_map(|o| match o {
            UpdateOutcome::Failed { path, error } => Some((path.as_str(), error)),
            _ => None,
        })
    }

    /// Every update applied
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.applied() == self.outcomes.len()
    }
}

/// Applies dotted-path updates to a task tree
#[derive(Debug, Clone, Copy, Default)]
pub struct PathMutationEngine {
    mode: ApplyMode,
}

impl PathMutationEngine {
    #[must_use]
    pub fn new(mode: ApplyMode) -> Self {
        Self { mode }
    }

    /// Best-effort engine
    #[must_use]
    pub fn best_effort() -> Self {
        Self::new(ApplyMode::BestEffort)
    }

    /// Strict engine
    #[must_use]
    pub fn strict() -> Self {
        Self::new(ApplyMode::Strict)
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> ApplyMode {
        self.mode
    }

    /// Apply updates in order
    ///
    /// Updates are independent: a failure never rolls back earlier ones.
    ///
    /// # Errors
    /// Only in [`ApplyMode::Strict`]: `EmptyUpdate` for an empty key or
    /// value, otherwise the first update error
    pub fn apply<I, U>(&self, tree: &mut TaskTree, updates: I) -> Result<MutationReport, TaskError>
    where
        I: IntoIterator<Item = U>,
        U: Into<PathUpdate>,
    {
        let mut report = MutationReport::default();
        for update in updates {
            let update = update.into();
            let outcome = self.apply_one(tree, &update);
            if self.mode == ApplyMode::Strict {
                match outcome {
                    UpdateOutcome::Skipped { path, .. } => return Err(TaskError::EmptyUpdate { path }),
                    UpdateOutcome::Failed { error, .. } => return Err(error),
                    UpdateOutcome::Applied { .. } => {}
                }
            }
            report.outcomes.push(outcome);
        }
        Ok(report)
    }

    fn apply_one(&self, tree: &mut TaskTree, update: &PathUpdate) -> UpdateOutcome {
        let path = update.path_text();
        let reason = match (&update.path, &update.value) {
            (None, _) => Some(SkipReason::EmptyPath),
            (Some(p), _) if p.trim().is_empty() => Some(SkipReason::EmptyPath),
            (_, None) => Some(SkipReason::EmptyValue),
            (_, Some(v)) if v.trim().is_empty() => Some(SkipReason::EmptyValue),
            _ => None,
        };
        if let Some(reason) = reason {
            tracing::warn!("Skipping update '{}': {:?}", path, reason);
            return UpdateOutcome::Skipped { path, reason };
        }

        let value = update.value.as_deref().unwrap_or_default();
        match set_path(tree, &path, value) {
            Ok((node, change)) => {
                tracing::info!("Applied update '{}' to {}", path, node);
                UpdateOutcome::Applied { path, node, change }
            }
            Err(error) => {
                tracing::warn!("Update '{}' failed: {}", path, error);
                UpdateOutcome::Failed { path, error }
            }
        }
    }
}

/// Resolve a path and apply one value
fn set_path(tree: &mut TaskTree, path: &str, value: &str) -> Result<(TaskId, Change), TaskError> {
    let path: TaskPath = path.parse()?;
    let node = navigate(tree, &path)?;
    let target = path.target();

    if let Ok(field) = target.parse::<TaskField>() {
        set_field(tree, node, field, value)?;
        return Ok((node, Change::Field(field)));
    }

    let spec = descriptor::parse(value).map_err(|e| TaskError::InvalidAttribute {
        attribute: target.to_string(),
        node: tree.node(node).map(|n| n.name().to_string()).unwrap_or_default(),
        reason: e.to_string(),
    })?;
    let name = spec.name.clone();
    tree.insert_sub_task(node, spec)?;
    Ok((node, Change::Inserted(name)))
}

fn navigate(tree: &TaskTree, path: &TaskPath) -> Result<TaskId, TaskError> {
    let mut node = tree.root();
    for segment in path.navigation() {
        tracing::debug!("Navigating '{}' under {}", segment, node);
        node = tree
            .child_named(node, segment)?
            .ok_or_else(|| TaskError::InvalidPath {
                segment: segment.to_string(),
                parent: tree.node(node).map(|n| n.name().to_string()).unwrap_or_default(),
            })?;
    }
    Ok(node)
}

fn set_field(tree: &mut TaskTree, node: TaskId, field: TaskField, value: &str) -> Result<(), TaskError> {
    match field {
        TaskField::Name => tree.rename(node, literal::text(value)),
        TaskField::Goal => tree.set_goal(node, literal::text(value)),
        TaskField::Participants => {
            let participants = literal::parse(value)
                .and_then(Literal::into_string_map)
                .map_err(|e| TaskError::invalid_value("participants", e))?;
            tree.set_participants(node, participants)
        }
        TaskField::SubTasks => tree.replace_sub_tasks(node, sub_task_list(value)?),
        TaskField::CurrentSubTask => {
            let name = match literal::parse(value) {
                Ok(Literal::Null) => None,
                Ok(Literal::Str(s)) => Some(s),
                _ => Some(value.trim().to_string()),
            };
            tree.set_current_sub_task(node, name)
        }
        TaskField::Completed => {
            let completed = Literal::parse_bool(value).ok_or_else(|| {
                TaskError::invalid_value("completed", format!("expected a boolean, got '{}'", value.trim()))
            })?;
            tree.set_completed(node, completed)
        }
    }
}

fn sub_task_list(value: &str) -> Result<Vec<TaskSpec>, TaskError> {
    match literal::parse(value).map_err(|e| TaskError::invalid_value("sub_tasks", e))? {
        Literal::List(items) => items
            .into_iter()
            .map(|item| descriptor::from_literal(item).map_err(TaskError::from))
            .collect(),
        call @ Literal::Call(_) => Ok(vec![descriptor::from_literal(call)?]),
        other => Err(TaskError::invalid_value(
            "sub_tasks",
            format!("expected a list of tasks, got {}", other.kind()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree() -> TaskTree {
        TaskTree::new(
            TaskSpec::new("Root", "Y")
                .with_participant("Lead", "Coordinate")
                .with_sub_task(
                    TaskSpec::new("A", "a")
                        .with_sub_task(TaskSpec::new("B", "b"))
                        .with_sub_task(TaskSpec::new("C", "c")),
                ),
        )
        .unwrap()
    }

    fn node<'a>(tree: &'a TaskTree, path: &[&str]) -> &'a crate::TaskNode {
        let mut id = tree.root();
        for name in path {
            id = tree.child_named(id, name).unwrap().unwrap();
        }
        tree.node(id).unwrap()
    }

    #[test]
    fn sets_root_goal() {
        let mut t = tree();
        let report = PathMutationEngine::default()
            .apply(&mut t, [("goal", "\"X\"")])
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(node(&t, &[]).goal(), "X");
        assert_eq!(node(&t, &[]).name(), "Root");
    }

    #[test]
    fn unquoted_text_is_taken_verbatim() {
        let mut t = tree();
        PathMutationEngine::default()
            .apply(&mut t, [(".A.goal", "  Plan the launch  ")])
            .unwrap();
        assert_eq!(node(&t, &["A"]).goal(), "Plan the launch");
    }

    #[test]
    fn sub_tasks_segments_are_skipped() {
        let mut t = tree();
        PathMutationEngine::strict()
            .apply(&mut t, [("sub_tasks.A.sub_tasks.B.completed", "True")])
            .unwrap();
        assert!(node(&t, &["A", "B"]).is_completed());
        assert!(!node(&t, &["A", "C"]).is_completed());
    }

    #[test]
    fn invalid_segment_fails() {
        let mut t = tree();
        let err = PathMutationEngine::strict()
            .apply(&mut t, [("A.Z.goal", "z")])
            .unwrap_err();
        assert_eq!(
            err,
            TaskError::InvalidPath {
                segment: "Z".into(),
                parent: "A".into()
            }
        );
    }

    #[test]
    fn descriptor_value_inserts_sub_task() {
        let mut t = tree();
        let report = PathMutationEngine::default()
            .apply(&mut t, [("A.Review", "Task('D', 'd', {'Lead': 'Check'})")])
            .unwrap();
        assert!(matches!(
            &report.outcomes[0],
            UpdateOutcome::Applied { change: Change::Inserted(name), .. } if name == "D"
        ));
        assert_eq!(node(&t, &["A", "D"]).participants()["Lead"], "Check");
    }

    #[test]
    fn unknown_attribute_without_descriptor() {
        let mut t = tree();
        let err = PathMutationEngine::strict()
            .apply(&mut t, [("A.owner", "someone")])
            .unwrap_err();
        assert!(matches!(err, TaskError::InvalidAttribute { ref attribute, node: ref parent, .. }
            if attribute == "owner" && parent == "A"));
    }

    #[test]
    fn collision_is_rejected() {
        let mut t = tree();
        let before = t.clone();
        let report = PathMutationEngine::default()
            .apply(&mut t, [("A.new", "Task('B', 'dup')")])
            .unwrap();
        let failures: Vec<_> = report.failures().collect();
        assert!(matches!(failures[0].1, TaskError::NameCollision { .. }));
        assert_eq!(t, before);
    }

    #[test]
    fn empty_updates_are_skipped_and_reported() {
        let mut t = tree();
        let before = t.clone();
        let report = PathMutationEngine::default()
            .apply(
                &mut t,
                [
                    PathUpdate { path: None, value: Some("x".into()) },
                    PathUpdate::new("goal", ""),
                ],
            )
            .unwrap();
        let skipped: Vec<_> = report.skipped().collect();
        assert_eq!(skipped, vec![("", SkipReason::EmptyPath), ("goal", SkipReason::EmptyValue)]);
        assert_eq!(t, before);
    }

    #[test]
    fn strict_rejects_empty_update() {
        let mut t = tree();
        let err = PathMutationEngine::strict()
            .apply(&mut t, [("goal", " ")])
            .unwrap_err();
        assert_eq!(err, TaskError::EmptyUpdate { path: "goal".into() });
    }

    #[test]
    fn best_effort_continues_after_failure() {
        let mut t = tree();
        let report = PathMutationEngine::default()
            .apply(&mut t, [("Nope.goal", "x"), ("goal", "after")])
            .unwrap();
        assert_eq!(report.applied(), 1);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(node(&t, &[]).goal(), "after");
    }

    #[test]
    fn later_update_on_same_path_wins() {
        let mut t = tree();
        PathMutationEngine::default()
            .apply(&mut t, [("goal", "first"), ("goal", "second")])
            .unwrap();
        assert_eq!(node(&t, &[]).goal(), "second");
    }

    #[test]
    fn field_values_are_typed() {
        let mut t = tree();
        let engine = PathMutationEngine::strict();
        engine
            .apply(&mut t, [("A.participants", "{'Writer': 'Draft', 'Editor': 'Review'}")])
            .unwrap();
        assert_eq!(node(&t, &["A"]).participants().len(), 2);

        engine.apply(&mut t, [("A.current_sub_task", "'C'")]).unwrap();
        assert_eq!(node(&t, &["A"]).current_sub_task(), Some("C"));

        engine.apply(&mut t, [("A.current_sub_task", "None")]).unwrap();
        assert_eq!(node(&t, &["A"]).current_sub_task(), None);

        assert!(matches!(
            engine.apply(&mut t, [("completed", "maybe")]).unwrap_err(),
            TaskError::InvalidValue { .. }
        ));
        assert!(matches!(
            engine.apply(&mut t, [("participants", "'not a map'")]).unwrap_err(),
            TaskError::InvalidValue { .. }
        ));
    }

    #[test]
    fn replaces_sub_task_list() {
        let mut t = tree();
        PathMutationEngine::strict()
            .apply(&mut t, [("A.sub_tasks", "[Task('X', 'x'), Task('Y', 'y')]")])
            .unwrap();
        let a = node(&t, &["A"]);
        assert_eq!(a.sub_tasks().len(), 2);
        assert_eq!(a.current_sub_task(), Some("X"));
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn rename_through_path() {
        let mut t = tree();
        PathMutationEngine::strict()
            .apply(&mut t, [("A.B.name", "\"Renamed\"")])
            .unwrap();
        assert_eq!(node(&t, &["A"]).current_sub_task(), Some("Renamed"));
    }

    #[test]
    fn parses_wire_lines() {
        let update: PathUpdate = r#"Task2.Task3.goal = "New goal""#.parse().unwrap();
        assert_eq!(update, PathUpdate::new("Task2.Task3.goal", "\"New goal\""));
        let bare: PathUpdate = "goal".parse().unwrap();
        assert_eq!(bare.value, None);
    }
}
