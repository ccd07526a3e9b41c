//! Dotted task paths
//!
//! Provides [`TaskPath`] for addressing a field of a node inside a task tree.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path separator
pub const SEPARATOR: char = '.';

/// Segment that names the sub-task list itself.
///
/// Skipped when it appears before the final segment, so `sub_tasks.Plan.goal`
/// and `Plan.goal` address the same field.
pub const SUB_TASKS_SEGMENT: &str = "sub_tasks";

/// Path from the root of a task tree to a field
///
/// Every segment but the last names a sub-task; the last names a field of the
/// node reached (or, for insertions, the new sub-task).
///
/// # Examples
/// - `goal` → root goal
/// - `Task2.Task3.goal` → goal of `Task3` under `Task2`
/// - `.Task2.participants` → leading separator is stripped
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskPath(Vec<String>);

impl TaskPath {
    /// Create path from segments
    ///
    /// # Errors
    /// Returns error if there are no segments or a segment is blank
    pub fn new(segments: Vec<String>) -> Result<Self, PathError> {
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(PathError::EmptySegment);
        }
        Ok(Self(segments))
    }

    /// Path to a field of the root node
    #[inline]
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false, a parsed path has at least one segment
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Segments that navigate to the target node
    ///
    /// `sub_tasks` navigation aids are already filtered out.
    pub fn navigation(&self) -> impl Iterator<Item = &str> {
        self.0[..self.0.len() - 1]
            .iter()
            .map(String::as_str)
            .filter(|s| *s != SUB_TASKS_SEGMENT)
    }

    /// Final segment
    #[inline]
    #[must_use]
    pub fn target(&self) -> &str {
        &self.0[self.0.len() - 1]
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }
}

impl Display for TaskPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for TaskPath {
    type Err = PathError;

    /// Parse `a.b.c`; a single leading separator is stripped, surrounding
    /// whitespace around the path and each segment is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix(SEPARATOR).unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }

        let segments: Vec<String> = trimmed
            .split(SEPARATOR)
            .map(|seg| {
                let seg = seg.trim();
                if seg.is_empty() {
                    Err(PathError::EmptySegment)
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

/// Errors related to task paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// No segments at all
    #[error("path is empty")]
    Empty,

    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_field() {
        let path: TaskPath = "goal".parse().unwrap();
        assert_eq!(path.segments(), &["goal"]);
        assert_eq!(path.target(), "goal");
        assert_eq!(path.navigation().count(), 0);
    }

    #[test]
    fn parse_nested() {
        let path: TaskPath = "Task2.Task3.goal".parse().unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.navigation().collect::<Vec<_>>(), vec!["Task2", "Task3"]);
        assert_eq!(path.target(), "goal");
    }

    #[test]
    fn strips_one_leading_separator() {
        let path: TaskPath = ".Task2.goal".parse().unwrap();
        assert_eq!(path.segments(), &["Task2", "goal"]);

        let result: Result<TaskPath, _> = "..Task2.goal".parse();
        assert_eq!(result, Err(PathError::EmptySegment));
    }

    #[test]
    fn sub_tasks_segment_is_skipped_in_navigation() {
        let path: TaskPath = "sub_tasks.Plan.sub_tasks.Draft.goal".parse().unwrap();
        assert_eq!(path.navigation().collect::<Vec<_>>(), vec!["Plan", "Draft"]);
    }

    #[test]
    fn sub_tasks_as_target_is_kept() {
        let path: TaskPath = "Plan.sub_tasks".parse().unwrap();
        assert_eq!(path.target(), SUB_TASKS_SEGMENT);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!("".parse::<TaskPath>(), Err(PathError::Empty));
        assert_eq!("  . ".parse::<TaskPath>(), Err(PathError::Empty));
        assert_eq!("a..b".parse::<TaskPath>(), Err(PathError::EmptySegment));
    }

    #[test]
    fn segments_are_trimmed() {
        let path: TaskPath = " Task2 . goal ".parse().unwrap();
        assert_eq!(path.segments(), &["Task2", "goal"]);
    }

    #[test]
    fn display_and_child() {
        let path = TaskPath::field("Task2").child("goal");
        assert_eq!(path.to_string(), "Task2.goal");
        assert!(TaskPath::field("Task2").is_prefix_of(&path));
    }

    #[test]
    fn new_validates_segments() {
        assert!(TaskPath::new(vec![]).is_err());
        assert!(TaskPath::new(vec!["a".into(), " ".into()]).is_err());
        assert!(TaskPath::new(vec!["a".into()]).is_ok());
    }
}
