//! Document tree mutated by a session.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{JfuzzError, JfuzzResult};

pub type Map = IndexMap<String, Value>;

/// A JSON-like value. Unlike `serde_json::Value` it can hold the
/// non-finite floats produced by mutation (`NaN`, `Infinity`).
///
/// Parsed numbers that are not plain `i64` integers stay as [`Value::Number`]
/// and keep their source text; `Float` only comes out of mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Number(serde_json::Number),
    Text(String),
    Array(Vec<Value>),
    Object(Map),
}

/// Value kinds tracked by the behavior weight model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Int,
    Bool,
    Text,
    Null,
}

impl ValueKind {
    pub const ALL: [ValueKind; 4] = [Self::Int, Self::Bool, Self::Text, Self::Null];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Text => "text",
            Self::Null => "null",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ValueKind {
    type Err = JfuzzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(Self::Int),
            "bool" | "boolean" => Ok(Self::Bool),
            "text" | "str" | "string" => Ok(Self::Text),
            "null" | "none" => Ok(Self::Null),
            other => Err(JfuzzError::InvalidArgument(format!(
                "unknown value kind {other:?} (expected int|bool|text|null)"
            ))),
        }
    }
}

impl Value {
    /// Behavior-tracked kind of a scalar; containers and floats have none.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => Some(ValueKind::Null),
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Int(_) => Some(ValueKind::Int),
            Value::Text(_) => Some(ValueKind::Text),
            Value::Float(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Parses JSON text into a tree. Only integers whose text is their
    /// canonical `i64` spelling become [`Value::Int`].
    pub fn parse(text: &str) -> JfuzzResult<Value> {
        let raw: serde_json::Value =
            serde_json::from_str(text).map_err(|e| JfuzzError::Parse(e.to_string()))?;
        Ok(Value::from(raw))
    }

    /// Replays the reparse a serialized child result goes through before it
    /// is spliced into its parent: `\uXXXX` sequences left in text by the
    /// escape normalization turn into the characters they denote.
    pub fn decode_escapes(self) -> Value {
        match self {
            Value::Text(s) => Value::Text(decode_unicode_escapes(&s)),
            Value::Array(items) => Value::Array(items.into_iter().map(Value::decode_escapes).collect()),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (decode_unicode_escapes(&k), v.decode_escapes()))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) if i.to_string() == n.to_string() => Value::Int(i),
                _ => Value::Number(n),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

fn decode_unicode_escapes(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0usize;
    while i < chars.len() {
        if chars[i] == '\\' && chars.get(i + 1) == Some(&'u') {
            if let Some(c) = hex4(&chars, i + 2).and_then(char::from_u32) {
                out.push(c);
                i += 6;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn hex4(chars: &[char], start: usize) -> Option<u32> {
    let digits = chars.get(start..start + 4)?;
    digits
        .iter()
        .try_fold(0u32, |acc, c| c.to_digit(16).map(|d| (acc << 4) | d))
}
