//! State records
//!
//! A [`StateRecord`] is one phase of a workflow: a goal, the roles taking
//! part, their instructions, and labeled transitions to other phases.

use crate::error::WorkflowError;
use gp_task::literal::{self, Literal};
use gp_task::TaskPath;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Label used for the single forward transition
pub const NEXT_LABEL: &str = "next";

/// One phase of the workflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawStateRecord")]
pub struct StateRecord {
    pub name: String,
    pub goal: String,
    pub roles: IndexSet<String>,
    pub group_instructions: String,
    /// Role → instructions; a missing role reads as empty
    pub individual_instructions: IndexMap<String, String>,
    pub completed: bool,
    /// Label → target state name; targets are checked at transition time
    pub transitions: IndexMap<String, String>,
}

/// Input form, also accepting the scalar `transition` key
#[derive(Deserialize)]
struct RawStateRecord {
    #[serde(default)]
    name: String,
    #[serde(default)]
    goal: String,
    #[serde(default)]
    roles: IndexSet<String>,
    #[serde(default)]
    group_instructions: String,
    #[serde(default)]
    individual_instructions: IndexMap<String, String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    transitions: IndexMap<String, String>,
    #[serde(default)]
    transition: Option<String>,
}

impl From<RawStateRecord> for StateRecord {
    fn from(raw: RawStateRecord) -> Self {
        let mut transitions = raw.transitions;
        if let Some(target) = raw.transition.filter(|t| !t.is_empty()) {
            transitions.entry(NEXT_LABEL.to_string()).or_insert(target);
        }
        Self {
            name: raw.name,
            goal: raw.goal,
            roles: raw.roles,
            group_instructions: raw.group_instructions,
            individual_instructions: raw.individual_instructions,
            completed: raw.completed,
            transitions,
        }
    }
}

impl StateRecord {
    /// Create a record with a name and goal
    #[must_use]
    pub fn new(name: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goal: goal.into(),
            ..Self::default()
        }
    }

    /// Add a role and its individual instructions
    #[inline]
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>, instructions: impl Into<String>) -> Self {
        let role = role.into();
        self.roles.insert(role.clone());
        self.individual_instructions.insert(role, instructions.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_group_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.group_instructions = instructions.into();
        self
    }

    /// Add a labeled transition
    #[inline]
    #[must_use]
    pub fn with_transition(mut self, label: impl Into<String>, target: impl Into<String>) -> Self {
        self.transitions.insert(label.into(), target.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }

    /// Instructions for a role, empty if none were given
    #[must_use]
    pub fn instructions_for(&self, role: &str) -> &str {
        self.individual_instructions
            .get(role)
            .map_or("", String::as_str)
    }

    /// Parse a JSON definition
    ///
    /// # Errors
    /// Returns `Load` on malformed JSON
    pub fn from_json(text: &str) -> Result<Self, WorkflowError> {
        serde_json::from_str(text).map_err(|e| WorkflowError::Load(e.to_string()))
    }

    /// Parse a YAML definition
    ///
    /// # Errors
    /// Returns `Load` on malformed YAML
    pub fn from_yaml(text: &str) -> Result<Self, WorkflowError> {
        serde_yaml::from_str(text).map_err(|e| WorkflowError::Load(e.to_string()))
    }

    /// Load a definition file, YAML for `.yaml`/`.yml`, JSON otherwise
    ///
    /// # Errors
    /// Returns `Load` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| WorkflowError::Load(format!("{}: {e}", path.display())))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&text),
            _ => Self::from_json(&text),
        }
    }

    /// Set a field addressed by a dotted path
    ///
    /// Accepted paths: `name`, `goal`, `group_instructions`, `completed`,
    /// `roles`, `individual_instructions`, `individual_instructions.<role>`,
    /// `transitions`, `transitions.<label>`.
    ///
    /// # Errors
    /// - `InvalidAttribute` for any other path
    /// - `InvalidValue` if the value does not parse for the field
    pub fn apply_path(&mut self, path: &str, value: &str) -> Result<(), WorkflowError> {
        let path: TaskPath = path.parse()?;
        match path.segments() {
            [field] => self.set_field(field, value),
            [map, key] if map == "individual_instructions" => {
                self.individual_instructions
                    .insert(key.clone(), literal::text(value));
                Ok(())
            }
            [map, label] if map == "transitions" => {
                self.transitions.insert(label.clone(), literal::text(value));
                Ok(())
            }
            _ => Err(WorkflowError::InvalidAttribute {
                attribute: path.to_string(),
                reason: "path is too deep".into(),
            }),
        }
    }

    fn set_field(&mut self, field: &str, value: &str) -> Result<(), WorkflowError> {
        match field {
            "name" => self.name = literal::text(value),
            "goal" => self.goal = literal::text(value),
            "group_instructions" => self.group_instructions = literal::text(value),
            "completed" => {
                self.completed = Literal::parse_bool(value).ok_or_else(|| WorkflowError::InvalidValue {
                    field: field.into(),
                    reason: format!("expected a boolean, got '{}'", value.trim()),
                })?;
            }
            "roles" => {
                self.roles = literal::parse(value)
                    .and_then(Literal::into_string_list)
                    .map_err(|e| WorkflowError::invalid_value(field, &e))?
                    .into_iter()
                    .collect();
            }
            "individual_instructions" => {
                self.individual_instructions = string_map(field, value)?;
            }
            "transitions" => self.transitions = string_map(field, value)?,
            other => {
                return Err(WorkflowError::InvalidAttribute {
                    attribute: other.into(),
                    reason: "unknown field".into(),
                })
            }
        }
        Ok(())
    }
}

fn string_map(field: &str, value: &str) -> Result<IndexMap<String, String>, WorkflowError> {
    literal::parse(value)
        .and_then(Literal::into_string_map)
        .map_err(|e| WorkflowError::invalid_value(field, &e))
}

impl fmt::Display for StateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "State: {}", self.name)?;
        writeln!(f, "Goal: {}", self.goal)?;
        writeln!(f, "Group Instructions: {}", self.group_instructions)?;
        for role in &self.roles {
            writeln!(f, "  {role}: {}", self.instructions_for(role))?;
        }
        let transitions: Vec<String> = self
            .transitions
            .iter()
            .map(|(label, target)| format!("{label} -> {target}"))
            .collect();
        writeln!(f, "Transitions: [{}]", transitions.join(", "))?;
        write!(f, "Completed: {}", self.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record() -> StateRecord {
        StateRecord::new("Plan", "Write a plan")
            .with_group_instructions("Work together")
            .with_role("Planner", "Draft steps")
            .with_role("Critic", "Find gaps")
            .with_transition(NEXT_LABEL, "Review")
    }

    #[test]
    fn test_legacy_transition_key() {
        let json = r#"{"name": "init", "goal": "g", "transition": "review"}"#;
        let rec = StateRecord::from_json(json).unwrap();
        assert_eq!(rec.transitions[NEXT_LABEL], "review");
        let out = serde_json::to_value(&rec).unwrap();
        assert!(out.get("transition").is_none());
    }

    #[test]
    fn test_labeled_map_wins_over_legacy_key() {
        let json = r#"{"transitions": {"next": "a"}, "transition": "b"}"#;
        let rec = StateRecord::from_json(json).unwrap();
        assert_eq!(rec.transitions.len(), 1);
        assert_eq!(rec.transitions[NEXT_LABEL], "a");
    }

    #[test]
    fn test_json_round_trip() {
        let rec = record().completed();
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(StateRecord::from_json(&json).unwrap(), rec);
    }

    #[test]
    fn test_yaml_round_trip() {
        let rec = record();
        let yaml = serde_yaml::to_string(&rec).unwrap();
        assert_eq!(StateRecord::from_yaml(&yaml).unwrap(), rec);
    }

    #[test]
    fn test_missing_instructions_read_empty() {
        let mut rec = record();
        rec.roles.insert("Observer".into());
        assert_eq!(rec.instructions_for("Observer"), "");
        assert_eq!(rec.instructions_for("Planner"), "Draft steps");
    }

    #[test]
    fn test_apply_path_fields() {
        let mut rec = record();
        rec.apply_path("goal", "'Ship it'").unwrap();
        rec.apply_path("completed", "True").unwrap();
        rec.apply_path("roles", "['Planner', 'Writer']").unwrap();
        rec.apply_path("individual_instructions.Writer", "Write it").unwrap();
        rec.apply_path("transitions.retry", "\"Plan\"").unwrap();
        assert_eq!(rec.goal, "Ship it");
        assert!(rec.completed);
        assert_eq!(rec.roles.len(), 2);
        assert_eq!(rec.instructions_for("Writer"), "Write it");
        assert_eq!(rec.transitions["retry"], "Plan");
    }

    #[test]
    fn test_apply_path_rejects() {
        let mut rec = record();
        let before = rec.clone();
        assert!(matches!(
            rec.apply_path("owner", "x"),
            Err(WorkflowError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            rec.apply_path("goal.text", "x"),
            Err(WorkflowError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            rec.apply_path("roles", "'Planner'"),
            Err(WorkflowError::InvalidValue { .. })
        ));
        assert!(matches!(
            rec.apply_path("completed", "soon"),
            Err(WorkflowError::InvalidValue { .. })
        ));
        assert!(matches!(rec.apply_path("", "x"), Err(WorkflowError::Path(_))));
        assert_eq!(rec, before);
    }

    #[test]
    fn test_display() {
        let text = record().to_string();
        assert!(text.starts_with("State: Plan\nGoal: Write a plan"));
        assert!(text.contains("  Critic: Find gaps"));
        assert!(text.contains("Transitions: [next -> Review]"));
    }
}
