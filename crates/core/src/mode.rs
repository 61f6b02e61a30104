//! Conversation shape and column identification strategy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::caps::{CapabilityLookup, QUESTION_ANSWER_PREFIX, ROW_PER_MESSAGE_PREFIX, SCRIPTING_CSV_MODE};
use crate::error::{CompileError, Result};
use crate::helpers::equals_fuzzy;
use crate::mapping::Field;

/// Header words that only make sense for question/answer tables.
pub const QUESTION_ANSWER_VOCABULARY: [&str; 5] = ["question", "user", "me", "answer", "bot"];

/// How a table encodes its conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// One row holds a user question and the expected bot answer.
    QuestionAnswer,
    /// One row holds one message; sender is a column or alternates.
    RowPerMessage,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::QuestionAnswer => "QUESTION_ANSWER",
            Mode::RowPerMessage => "ROW_PER_MESSAGE",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "QUESTION_ANSWER" => Ok(Mode::QuestionAnswer),
            "ROW_PER_MESSAGE" => Ok(Mode::RowPerMessage),
            other => Err(CompileError::IllegalMode {
                value: other.to_string(),
            }),
        }
    }
}

/// How column indices are found for each field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingMode {
    /// Explicit capability per field, either an index or a header name.
    Cap,
    /// Header cells matched against field names and aliases.
    Name,
    /// Fixed default positions.
    Index,
}

impl fmt::Display for MappingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MappingMode::Cap => "CAP",
            MappingMode::Name => "NAME",
            MappingMode::Index => "INDEX",
        })
    }
}

/// The explicitly configured mode, if any. Unknown values are rejected.
pub fn explicit_mode<C: CapabilityLookup>(caps: &C) -> Result<Option<Mode>> {
    caps.get_optional(SCRIPTING_CSV_MODE)
        .filter(|value| !value.is_empty())
        .map(|value| value.parse::<Mode>())
        .transpose()
}

/// Decide the conversation shape of a table.
pub fn resolve_mode<C, S>(caps: &C, header: Option<&[S]>) -> Result<Mode>
where
    C: CapabilityLookup,
    S: AsRef<str>,
{
    let mode = if let Some(mode) = explicit_mode(caps)? {
        mode
    } else if caps.has_prefix(QUESTION_ANSWER_PREFIX) {
        Mode::QuestionAnswer
    } else if caps.has_prefix(ROW_PER_MESSAGE_PREFIX) {
        Mode::RowPerMessage
    } else if let Some(header) = header {
        let looks_like_qa = header.iter().any(|cell| {
            QUESTION_ANSWER_VOCABULARY
                .iter()
                .any(|word| equals_fuzzy(word, cell.as_ref()))
        });
        if looks_like_qa {
            Mode::QuestionAnswer
        } else {
            Mode::RowPerMessage
        }
    } else {
        Mode::RowPerMessage
    };
    debug!("Compile mode is {}", mode);
    Ok(mode)
}

/// Decide how columns are identified.
///
/// Column capabilities of either mode force [`MappingMode::Cap`], whichever
/// mode was resolved.
pub fn resolve_mapping_mode<C, S>(caps: &C, header: Option<&[S]>) -> MappingMode
where
    C: CapabilityLookup,
    S: AsRef<str>,
{
    let mapping_mode = if caps.has_prefix(QUESTION_ANSWER_PREFIX) || caps.has_prefix(ROW_PER_MESSAGE_PREFIX) {
        MappingMode::Cap
    } else if header.map_or(false, |header| {
        header
            .iter()
            .any(|cell| Field::ALL.iter().any(|field| field.name() == cell.as_ref()))
    }) {
        MappingMode::Name
    } else {
        MappingMode::Index
    };
    debug!("Compile columnMappingMode is {}", mapping_mode);
    mapping_mode
}
