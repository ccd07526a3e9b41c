//! Literal value grammar
//!
//! The closed grammar used for every structured value that arrives as text:
//! participant maps, role lists, transition maps and sub-task descriptors.
//! Nothing here evaluates code; a call such as `Task("a", "b")` is parsed
//! into a [`Call`] and interpreted by the caller against a fixed set of
//! constructors.
//!
//! ```text
//! value   := string | number | 'None' | 'null' | 'True' | 'False' | 'true' | 'false'
//!          | map | list | call
//! map     := '{' [ string ':' value { ',' string ':' value } [','] ] '}'
//! list    := '[' [ value { ',' value } [','] ] ']'
//! call    := ident '(' [ arg { ',' arg } [','] ] ')'
//! arg     := ident '=' value | value
//! string  := '"' ... '"' | '\'' ... '\''
//! ```

use indexmap::IndexMap;
use std::fmt::{self, Display, Formatter, Write as _};

/// Maximum nesting of maps, lists and calls
pub const MAX_DEPTH: usize = 32;

/// A parsed literal
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Quoted string
    Str(String),
    /// Numeric token, kept as written
    Number(String),
    /// Boolean
    Bool(bool),
    /// `None` / `null`
    Null,
    /// Ordered list
    List(Vec<Literal>),
    /// Ordered string-keyed map
    Map(IndexMap<String, Literal>),
    /// Constructor call
    Call(Call),
}

/// Constructor call with positional and keyword arguments
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Call {
    /// Constructor name
    pub name: String,
    /// Positional arguments in order
    pub positional: Vec<Literal>,
    /// Keyword arguments in order of appearance
    pub keywords: IndexMap<String, Literal>,
}

impl Literal {
    /// Short name of the literal kind, used in error messages
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Null => "null",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Call(_) => "call",
        }
    }

    /// Borrow the string content, if this is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a map of strings into an ordered string map
    ///
    /// # Errors
    /// Returns error if this is not a map or a value is not a string
    pub fn into_string_map(self) -> Result<IndexMap<String, String>, LiteralError> {
        match self {
            Self::Map(map) => map
                .into_iter()
                .map(|(k, v)| match v {
                    Self::Str(s) => Ok((k, s)),
                    other => Err(LiteralError::WrongKind {
                        expected: "string",
                        found: other.kind(),
                    }),
                })
                .collect(),
            other => Err(LiteralError::WrongKind {
                expected: "map",
                found: other.kind(),
            }),
        }
    }

    /// Convert a list of strings into a vector
    ///
    /// # Errors
    /// Returns error if this is not a list or an element is not a string
    pub fn into_string_list(self) -> Result<Vec<String>, LiteralError> {
        match self {
            Self::List(items) => items
                .into_iter()
                .map(|v| match v {
                    Self::Str(s) => Ok(s),
                    other => Err(LiteralError::WrongKind {
                        expected: "string",
                        found: other.kind(),
                    }),
                })
                .collect(),
            other => Err(LiteralError::WrongKind {
                expected: "list",
                found: other.kind(),
            }),
        }
    }

    /// Convert to a JSON value
    ///
    /// # Errors
    /// Returns error for calls, which have no data representation
    pub fn into_json(self) -> Result<serde_json::Value, LiteralError> {
        use serde_json::Value;
        Ok(match self {
            Self::Str(s) => Value::String(s),
            Self::Number(n) => serde_json::from_str::<serde_json::Number>(&n)
                .map(Value::Number)
                .map_err(|_| LiteralError::InvalidNumber(n))?,
            Self::Bool(b) => Value::Bool(b),
            Self::Null => Value::Null,
            Self::List(items) => Value::Array(
                items
                    .into_iter()
                    .map(Self::into_json)
                    .collect::<Result<_, _>>()?,
            ),
            Self::Map(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| v.into_json().map(|v| (k, v)))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Call(_) => {
                return Err(LiteralError::WrongKind {
                    expected: "data",
                    found: "call",
                })
            }
        })
    }

    /// Parse a boolean written as a bare word or a string
    #[must_use]
    pub fn parse_bool(text: &str) -> Option<bool> {
        match strip_quotes(text.trim()) {
            "True" | "true" => Some(true),
            "False" | "false" => Some(false),
            _ => None,
        }
    }
}

impl Display for Literal {
    /// Canonical text form; parsing it again yields an equal literal
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write_quoted(f, s),
            Self::Number(n) => f.write_str(n),
            Self::Bool(true) => f.write_str("true"),
            Self::Bool(false) => f.write_str("false"),
            Self::Null => f.write_str("null"),
            Self::List(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_char(']')
            }
            Self::Map(map) => {
                f.write_char('{')?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, k)?;
                    write!(f, ": {v}")?;
                }
                f.write_char('}')
            }
            Self::Call(call) => write!(f, "{call}"),
        }
    }
}

impl Display for Call {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        let mut first = true;
        for arg in &self.positional {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{arg}")?;
        }
        for (k, v) in &self.keywords {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{k}={v}")?;
        }
        f.write_char(')')
    }
}

fn write_quoted(f: &mut Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

/// Remove one matching pair of surrounding quotes
#[must_use]
pub fn strip_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Contents of a string literal, or the trimmed text itself
///
/// Lets agents write free text with or without quotes.
#[must_use]
pub fn text(value: &str) -> String {
    match parse(value) {
        Ok(Literal::Str(s)) => s,
        _ => value.trim().to_string(),
    }
}

/// Parse a complete literal
///
/// # Errors
/// Returns error on any syntax violation, trailing input, or nesting
/// deeper than [`MAX_DEPTH`]
pub fn parse(text: &str) -> Result<Literal, LiteralError> {
    let mut parser = Parser::new(text);
    let value = parser.value()?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        return Err(LiteralError::TrailingInput {
            found: c,
            position: parser.pos,
        });
    }
    Ok(value)
}

/// Literal parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiteralError {
    /// Input ended early
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// Unexpected character
    #[error("unexpected character '{found}' at {position}")]
    UnexpectedChar { found: char, position: usize },

    /// Bare word that is not a keyword or call
    #[error("unexpected word '{word}' at {position}")]
    UnexpectedWord { word: String, position: usize },

    /// Unterminated string
    #[error("unterminated string starting at {0}")]
    UnterminatedString(usize),

    /// Map key is not a string
    #[error("map key at {0} must be a string")]
    InvalidKey(usize),

    /// Keyword repeated in a call
    #[error("duplicate keyword argument '{0}'")]
    DuplicateKeyword(String),

    /// Positional argument after keyword
    #[error("positional argument after keyword argument at {0}")]
    PositionalAfterKeyword(usize),

    /// Nesting bound exceeded
    #[error("nesting deeper than {MAX_DEPTH}")]
    TooDeep,

    /// Content after the literal
    #[error("trailing input '{found}' at {position}")]
    TrailingInput { found: char, position: usize },

    /// Number that JSON cannot represent
    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    /// Well-formed literal of the wrong kind
    #[error("expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, depth: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<(), LiteralError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(LiteralError::UnexpectedChar {
                found: c,
                position: self.pos - c.len_utf8(),
            }),
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    fn enter(&mut self) -> Result<(), LiteralError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(LiteralError::TooDeep);
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn value(&mut self) -> Result<Literal, LiteralError> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            None => Err(LiteralError::UnexpectedEnd),
            Some('"' | '\'') => self.string().map(Literal::Str),
            Some('{') => self.map(),
            Some('[') => self.list(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(c) if is_ident_start(c) => {
                let word = self.ident();
                self.skip_ws();
                if self.peek() == Some('(') {
                    return self.call(word.to_string());
                }
                match word {
                    "None" | "null" => Ok(Literal::Null),
                    "True" | "true" => Ok(Literal::Bool(true)),
                    "False" | "false" => Ok(Literal::Bool(false)),
                    _ => Err(LiteralError::UnexpectedWord {
                        word: word.to_string(),
                        position: start,
                    }),
                }
            }
            Some(c) => Err(LiteralError::UnexpectedChar {
                found: c,
                position: start,
            }),
        }
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn number(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        let mut prev = self.bump();
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '+' | '-') && matches!(prev, Some('e' | 'E'));
            if !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E') || exponent_sign) {
                break;
            }
            prev = self.bump();
        }
        let text = &self.src[start..self.pos];
        match serde_json::from_str::<serde_json::Number>(text) {
            Ok(_) => Ok(Literal::Number(text.to_string())),
            Err(_) => Err(LiteralError::InvalidNumber(text.to_string())),
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let start = self.pos;
        let quote = self.bump().ok_or(LiteralError::UnexpectedEnd)?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(LiteralError::UnterminatedString(start)),
                Some('\\') => match self.bump() {
                    None => return Err(LiteralError::UnterminatedString(start)),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c @ ('\\' | '"' | '\'')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    /// Consume a separator; true when the closing delimiter was reached
    fn separator(&mut self, close: char) -> Result<bool, LiteralError> {
        self.skip_ws();
        match self.bump() {
            Some(',') => {
                self.skip_ws();
                if self.peek() == Some(close) {
                    self.bump();
                    return Ok(true);
                }
                Ok(false)
            }
            Some(c) if c == close => Ok(true),
            Some(c) => Err(LiteralError::UnexpectedChar {
                found: c,
                position: self.pos - c.len_utf8(),
            }),
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    /// True when the next character closes the collection (consumed)
    fn closes(&mut self, close: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(close) {
            self.bump();
            return true;
        }
        false
    }

    fn map(&mut self) -> Result<Literal, LiteralError> {
        self.enter()?;
        self.expect('{')?;
        let mut map = IndexMap::new();
        if !self.closes('}') {
            loop {
                self.skip_ws();
                let key_pos = self.pos;
                if !matches!(self.peek(), Some('"' | '\'')) {
                    return Err(LiteralError::InvalidKey(key_pos));
                }
                let key = self.string()?;
                self.expect(':')?;
                let value = self.value()?;
                map.insert(key, value);
                if self.separator('}')? {
                    break;
                }
            }
        }
        self.leave();
        Ok(Literal::Map(map))
    }

    fn list(&mut self) -> Result<Literal, LiteralError> {
        self.enter()?;
        self.expect('[')?;
        let mut items = Vec::new();
        if !self.closes(']') {
            loop {
                items.push(self.value()?);
                if self.separator(']')? {
                    break;
                }
            }
        }
        self.leave();
        Ok(Literal::List(items))
    }

    fn call(&mut self, name: String) -> Result<Literal, LiteralError> {
        self.enter()?;
        self.expect('(')?;
        let mut call = Call {
            name,
            ..Call::default()
        };
        if !self.closes(')') {
            loop {
                self.skip_ws();
                let arg_pos = self.pos;
                match self.keyword() {
                    Some(key) => {
                        let value = self.value()?;
                        if call.keywords.contains_key(key) {
                            return Err(LiteralError::DuplicateKeyword(key.to_string()));
                        }
                        call.keywords.insert(key.to_string(), value);
                    }
                    None => {
                        if !call.keywords.is_empty() {
                            return Err(LiteralError::PositionalAfterKeyword(arg_pos));
                        }
                        call.positional.push(self.value()?);
                    }
                }
                if self.separator(')')? {
                    break;
                }
            }
        }
        self.leave();
        Ok(Literal::Call(call))
    }

    /// Consume `ident =` if present, otherwise leave the position untouched
    fn keyword(&mut self) -> Option<&'a str> {
        let save = self.pos;
        if !self.peek().is_some_and(is_ident_start) {
            return None;
        }
        let key = self.ident();
        self.skip_ws();
        let rest = &self.src[self.pos..];
        if rest.starts_with('=') && !rest.starts_with("==") {
            self.bump();
            return Some(key);
        }
        self.pos = save;
        None
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
