//! Session configuration

use crate::error::CoreError;
use crate::invocation::{InvocationExtractor, DEFAULT_END_MARKER, DEFAULT_START_MARKER};
use crate::manifest::DEFAULT_MANAGER_ROLE;
use gp_task::ApplyMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// State whose arrival ends a session
pub const DEFAULT_TERMINAL_STATE: &str = "complete";

/// Round limit for [`crate::PlanningSession::run`]
pub const DEFAULT_MAX_ROUNDS: usize = 20;

/// Planning session settings; every field has a default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub start_marker: String,
    pub end_marker: String,
    pub manager_role: String,
    pub terminal_state: String,
    pub max_rounds: usize,
    /// How `update_task` treats failing paths
    pub apply_mode: ApplyMode,
    /// Opaque model settings handed to the dialogue engine
    pub llm: serde_json::Value,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_marker: DEFAULT_START_MARKER.to_string(),
            end_marker: DEFAULT_END_MARKER.to_string(),
            manager_role: DEFAULT_MANAGER_ROLE.to_string(),
            terminal_state: DEFAULT_TERMINAL_STATE.to_string(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            apply_mode: ApplyMode::default(),
            llm: serde_json::Value::Null,
        }
    }
}

impl SessionConfig {
    #[inline]
    #[must_use]
    pub fn with_markers(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_marker = start.into();
        self.end_marker = end.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_manager_role(mut self, role: impl Into<String>) -> Self {
        self.manager_role = role.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_terminal_state(mut self, state: impl Into<String>) -> Self {
        self.terminal_state = state.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_apply_mode(mut self, mode: ApplyMode) -> Self {
        self.apply_mode = mode;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_llm(mut self, llm: serde_json::Value) -> Self {
        self.llm = llm;
        self
    }

    /// # Errors
    /// Returns `Config` if the text is not a valid configuration
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        serde_json::from_str(text).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Read a JSON configuration file
    ///
    /// # Errors
    /// Returns `Config` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Extractor using the configured markers
    #[must_use]
    pub fn extractor(&self) -> InvocationExtractor {
        InvocationExtractor::new(&self.start_marker, &self.end_marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(SessionConfig::from_json("{}").unwrap(), SessionConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = SessionConfig::from_json(
            r#"{"max_rounds": 3, "apply_mode": "strict", "llm": {"model": "local", "temperature": 0.2}}"#,
        )
        .unwrap();
        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.apply_mode, ApplyMode::Strict);
        assert_eq!(config.llm["model"], "local");
        assert_eq!(config.terminal_state, "complete");
        assert_eq!(config.manager_role, "Manager");
    }

    #[test]
    fn rejects_bad_json() {
        assert!(matches!(
            SessionConfig::from_json(r#"{"max_rounds": "many"}"#),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"terminal_state": "done"}"#).unwrap();
        assert_eq!(SessionConfig::load(&path).unwrap().terminal_state, "done");
        assert!(SessionConfig::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn extractor_uses_markers() {
        let config = SessionConfig::default().with_markers("<<", ">>");
        assert_eq!(config.extractor().extract("x << f() >> y"), Some(" f() "));
    }
}
