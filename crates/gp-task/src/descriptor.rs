//! Sub-task descriptors
//!
//! A descriptor is a constructor call in the [literal grammar](crate::literal)
//! that builds a [`TaskSpec`]:
//!
//! ```text
//! Task("Review", "Check the draft", {"Editor": "Read it"}, current_sub_task=None)
//! TaskNode(name="Ship", goal="Release", sub_tasks=[Task("Tag", "Tag release")])
//! ```
//!
//! Only the constructors in [`CONSTRUCTORS`] are accepted, and only the
//! parameters in [`PARAMETERS`], positionally in that order or by keyword.

use crate::literal::{self, Call, Literal, LiteralError};
use crate::node::TaskSpec;
use indexmap::IndexMap;

/// Accepted constructor names
pub const CONSTRUCTORS: &[&str] = &["Task", "TaskNode"];

/// Constructor parameters in positional order
pub const PARAMETERS: [&str; 6] = [
    "name",
    "goal",
    "participants",
    "sub_tasks",
    "current_sub_task",
    "completed",
];

/// Descriptor errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// Text is not a valid literal
    #[error(transparent)]
    Literal(#[from] LiteralError),

    /// Literal is not a constructor call
    #[error("expected a task constructor, found {0}")]
    NotACall(&'static str),

    /// Constructor outside the closed set
    #[error("unknown constructor '{0}'")]
    UnknownConstructor(String),

    /// Keyword outside the parameter list
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    /// More positional arguments than parameters
    #[error("too many positional arguments ({0})")]
    TooManyArguments(usize),

    /// Parameter given positionally and by keyword
    #[error("parameter '{0}' given more than once")]
    DuplicateParameter(String),

    /// Required parameter absent
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    /// Parameter of the wrong literal kind
    #[error("parameter '{parameter}' expects {expected}, found {found}")]
    WrongType {
        parameter: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// Parse descriptor text into a task spec
///
/// # Errors
/// Returns error if the text is not a literal, not a known constructor
/// call, or its arguments do not fit the parameter list
pub fn parse(text: &str) -> Result<TaskSpec, DescriptorError> {
    from_literal(literal::parse(text.trim())?)
}

/// Build a task spec from a parsed literal
///
/// # Errors
/// See [`parse`]
pub fn from_literal(value: Literal) -> Result<TaskSpec, DescriptorError> {
    let Literal::Call(call) = value else {
        return Err(DescriptorError::NotACall(value.kind()));
    };
    from_call(call)
}

fn from_call(call: Call) -> Result<TaskSpec, DescriptorError> {
    if !CONSTRUCTORS.contains(&call.name.as_str()) {
        return Err(DescriptorError::UnknownConstructor(call.name));
    }
    if call.positional.len() > PARAMETERS.len() {
        return Err(DescriptorError::TooManyArguments(call.positional.len()));
    }

    let mut args: IndexMap<&'static str, Literal> = PARAMETERS
        .iter()
        .copied()
        .zip(call.positional)
        .collect();

    for (key, value) in call.keywords {
        let Some(param) = PARAMETERS.iter().copied().find(|p| *p == key) else {
            return Err(DescriptorError::UnknownParameter(key));
        };
        if args.insert(param, value).is_some() {
            return Err(DescriptorError::DuplicateParameter(key));
        }
    }

    let name = required_str(&mut args, "name")?;
    let goal = required_str(&mut args, "goal")?;

    let participants = match args.shift_remove("participants") {
        None | Some(Literal::Null) => IndexMap::new(),
        Some(value) => {
            let found = value.kind();
            value
                .into_string_map()
                .map_err(|_| DescriptorError::WrongType {
                    parameter: "participants",
                    expected: "map of strings",
                    found,
                })?
        }
    };

    let sub_tasks = match args.shift_remove("sub_tasks") {
        None | Some(Literal::Null) => Vec::new(),
        Some(Literal::List(items)) => items
            .into_iter()
            .map(from_literal)
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(DescriptorError::WrongType {
                parameter: "sub_tasks",
                expected: "list of tasks",
                found: other.kind(),
            })
        }
    };

    let current_sub_task = match args.shift_remove("current_sub_task") {
        None | Some(Literal::Null) => sub_tasks.first().map(|t: &TaskSpec| t.name.clone()),
        Some(Literal::Str(s)) => Some(s),
        Some(other) => {
            return Err(DescriptorError::WrongType {
                parameter: "current_sub_task",
                expected: "string",
                found: other.kind(),
            })
        }
    };

    let completed = match args.shift_remove("completed") {
        None | Some(Literal::Null) => false,
        Some(Literal::Bool(b)) => b,
        Some(other) => {
            return Err(DescriptorError::WrongType {
                parameter: "completed",
                expected: "bool",
                found: other.kind(),
            })
        }
    };

    Ok(TaskSpec {
        name,
        goal,
        participants,
        sub_tasks,
        current_sub_task,
        completed,
    })
}

fn required_str(
    args: &mut IndexMap<&'static str, Literal>,
    parameter: &'static str,
) -> Result<String, DescriptorError> {
    match args.shift_remove(parameter) {
        Some(Literal::Str(s)) => Ok(s),
        None | Some(Literal::Null) => Err(DescriptorError::MissingParameter(parameter)),
        Some(other) => Err(DescriptorError::WrongType {
            parameter,
            expected: "string",
            found: other.kind(),
        }),
    }
}
