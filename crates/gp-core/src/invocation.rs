//! Invocation extraction
//!
//! Recovers a single call such as
//!
//! ```text
//! update_goal(state_name="init", goal="Draft a plan")
//! ```
//!
//! from free-form response text, either between two markers or from the last
//! fenced code block.

use crate::error::InvocationError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default text preceding the invocation
pub const DEFAULT_START_MARKER: &str = "Initial Answer: ";
/// Default text following the invocation
pub const DEFAULT_END_MARKER: &str = "\nReflection: ";

const FENCE: &str = "```";

static CALL_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("call pattern is valid")
});

static KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*=").expect("keyword pattern is valid")
});

/// A parsed call: name plus argument text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub name: String,
    /// Bare arguments in order
    pub positional: Vec<String>,
    /// `key=value` arguments in order of appearance
    pub named: IndexMap<String, String>,
}

impl Invocation {
    /// Parse `name(args)`
    ///
    /// Arguments split on top-level commas; quotes and brackets nest.
    /// Values keep their text with one pair of surrounding quotes removed.
    /// A trailing `;` is accepted.
    ///
    /// # Errors
    /// Returns `NotACall` if the text is not call-shaped, and
    /// `DuplicateArgument` if a keyword repeats
    pub fn parse(text: &str) -> Result<Self, InvocationError> {
        let text = text.trim();
        let text = text.strip_suffix(';').unwrap_or(text).trim_end();
        if !InvocationExtractor::has_call_syntax(text) {
            return Err(InvocationError::not_a_call(text, "unbalanced or missing parentheses"));
        }
        let head = CALL_HEAD
            .captures(text)
            .ok_or_else(|| InvocationError::not_a_call(text, "missing function name"))?;
        let name = head[1].to_string();
        let open = head.get(0).map_or(0, |m| m.end());
        let Some(inner) = text.strip_suffix(')').and_then(|t| t.get(open..)) else {
            return Err(InvocationError::not_a_call(text, "text after closing parenthesis"));
        };

        let mut invocation = Self {
            name,
            ..Self::default()
        };
        let args = split_top_level(inner).ok_or_else(|| InvocationError::not_a_call(text, "unbalanced quotes or brackets"))?;
        let count = args.len();
        for (i, arg) in args.into_iter().enumerate() {
            let arg = arg.trim();
            if arg.is_empty() {
                // `f()` and a trailing comma are fine
                if count == 1 || i + 1 == count {
                    continue;
                }
                return Err(InvocationError::not_a_call(text, "empty argument"));
            }
            let keyword = KEYWORD
                .captures(arg)
                .and_then(|kw| Some((kw[1].to_string(), kw.get(0)?.end())));
            match keyword {
                Some((key, end)) if !arg[end..].starts_with('=') => {
                    let value = unquote(&arg[end..]);
                    if invocation.named.insert(key.clone(), value).is_some() {
                        return Err(InvocationError::DuplicateArgument {
                            function: invocation.name,
                            parameter: key,
                        });
                    }
                }
                _ => {
                    if !invocation.named.is_empty() {
                        return Err(InvocationError::not_a_call(text, "positional argument after keyword"));
                    }
                    invocation.positional.push(unquote(arg));
                }
            }
        }
        Ok(invocation)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self
            .positional
            .iter()
            .map(|v| format!("{v:?}"))
            .chain(self.named.iter().map(|(k, v)| format!("{k}={v:?}")))
            .collect();
        write!(f, "{}({})", self.name, args.join(", "))
    }
}

fn unquote(value: &str) -> String {
    gp_task::literal::strip_quotes(value.trim()).to_string()
}

/// Split on commas outside quotes and brackets; `None` if unbalanced
fn split_top_level(text: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() || depth != 0 {
        return None;
    }
    parts.push(&text[start..]);
    Some(parts)
}

/// Finds invocations inside response text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationExtractor {
    start_marker: String,
    end_marker: String,
}

impl Default for InvocationExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_START_MARKER, DEFAULT_END_MARKER)
    }
}

impl InvocationExtractor {
    #[must_use]
    pub fn new(start_marker: impl Into<String>, end_marker: impl Into<String>) -> Self {
        Self {
            start_marker: start_marker.into(),
            end_marker: end_marker.into(),
        }
    }

    /// Text strictly between the start marker and the next end marker
    ///
    /// `None` if either marker is missing.
    #[must_use]
    pub fn extract<'a>(&self, text: &'a str) -> Option<&'a str> {
        let start = text.find(&self.start_marker)? + self.start_marker.len();
        let len = text[start..].find(&self.end_marker)?;
        Some(&text[start..start + len])
    }

    /// Extract and parse in one step
    ///
    /// # Errors
    /// Returns `NotACall` if no markers are present or the text is malformed
    pub fn extract_invocation(&self, text: &str) -> Result<Invocation, InvocationError> {
        let raw = self
            .extract(text)
            .ok_or_else(|| InvocationError::not_a_call("", "no invocation markers"))?;
        Invocation::parse(raw)
    }

    /// Equal, nonzero counts of `(` and `)`
    #[must_use]
    pub fn has_call_syntax(line: &str) -> bool {
        let open = line.matches('(').count();
        open > 0 && open == line.matches(')').count()
    }

    /// Call-shaped lines of the last fenced code block, `#` lines skipped
    #[must_use]
    pub fn extract_fenced(text: &str) -> Vec<&str> {
        let blocks: Vec<&str> = text.split(FENCE).collect();
        if blocks.len() < 3 {
            return Vec::new();
        }
        // Odd indices are inside fences
        let last = if blocks.len() % 2 == 1 {
            blocks.len() - 2
        } else {
            blocks.len() - 3
        };
        blocks[last]
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#') && Self::has_call_syntax(line))
            .collect()
    }
}
