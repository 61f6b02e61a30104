//! Capability keys and the read-only lookup the compiler consumes.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{CompileError, Result};

pub const SCRIPTING_CSV_MODE: &str = "SCRIPTING_CSV_MODE";
pub const SCRIPTING_CSV_SEPARATOR: &str = "SCRIPTING_CSV_SEPARATOR";
pub const SCRIPTING_CSV_USE_HEADER: &str = "SCRIPTING_CSV_USE_HEADER";

/// Prefix shared by all question/answer column capabilities.
pub const QUESTION_ANSWER_PREFIX: &str = "SCRIPTING_CSV_MODE_QUESTION_ANSWER";
/// Prefix shared by all row-per-message column capabilities.
pub const ROW_PER_MESSAGE_PREFIX: &str = "SCRIPTING_CSV_MODE_ROW_PER_MESSAGE";

pub const SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_CONVERSATION_ID: &str =
    "SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_CONVERSATION_ID";
pub const SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_SENDER: &str =
    "SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_SENDER";
pub const SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_TEXT: &str =
    "SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_TEXT";
pub const SCRIPTING_CSV_MODE_QUESTION_ANSWER_COL_QUESTION: &str =
    "SCRIPTING_CSV_MODE_QUESTION_ANSWER_COL_QUESTION";
pub const SCRIPTING_CSV_MODE_QUESTION_ANSWER_COL_ANSWER: &str =
    "SCRIPTING_CSV_MODE_QUESTION_ANSWER_COL_ANSWER";

/// Read-only key/value configuration lookup.
///
/// Implementors only need the two primitive operations; the typed helpers are
/// derived from them.
pub trait CapabilityLookup {
    /// Value for `key`, or `None` when unset.
    fn get_optional(&self, key: &str) -> Option<String>;

    /// All set capabilities whose key starts with `prefix`.
    fn get_all_by_prefix(&self, prefix: &str) -> BTreeMap<String, String>;

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get_optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Boolean capability with a fallback when unset.
    fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get_optional(key) {
            None => Ok(default),
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(CompileError::IllegalBoolean {
                    key: key.to_string(),
                    value,
                }),
            },
        }
    }

    fn has_prefix(&self, prefix: &str) -> bool {
        !self.get_all_by_prefix(prefix).is_empty()
    }
}

// Blanket implementation for references to lookups
impl<T: CapabilityLookup + ?Sized> CapabilityLookup for &T {
    fn get_optional(&self, key: &str) -> Option<String> {
        (*self).get_optional(key)
    }

    fn get_all_by_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        (*self).get_all_by_prefix(prefix)
    }
}

/// In-memory capability set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    values: BTreeMap<String, Value>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse a JSON object of capabilities.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| CompileError::InvalidCapabilities(e.to_string()))?;
        match value {
            Value::Object(map) => Ok(Self {
                values: map.into_iter().collect(),
            }),
            other => Err(CompileError::InvalidCapabilities(format!(
                "expected a JSON object, found {}",
                other
            ))),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Apply a `KEY=VALUE` override. The value is stored as a string.
    pub fn apply_override(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            CompileError::InvalidCapabilities(format!(
                "override \"{}\" is not of the form KEY=VALUE",
                assignment
            ))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CompileError::InvalidCapabilities(format!(
                "override \"{}\" has an empty key",
                assignment
            )));
        }
        self.insert(key, value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl CapabilityLookup for Capabilities {
    fn get_optional(&self, key: &str) -> Option<String> {
        self.values.get(key).and_then(scalar_to_string)
    }

    fn get_all_by_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.values
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), s)))
            .collect()
    }
}
