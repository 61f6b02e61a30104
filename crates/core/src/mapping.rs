//! Field definitions and column mapping resolution.
//!
//! A [`FieldSpec`] describes a semantic slot (conversation id, sender, text,
//! question, answer) together with the three ways it can be located: a
//! default position, a capability, and accepted header names. The resolver
//! picks one strategy per table ([`MappingMode`]) and applies it to every
//! field of the active set, rejecting out-of-range and shared indices.

use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::caps::{
    CapabilityLookup, SCRIPTING_CSV_MODE_QUESTION_ANSWER_COL_ANSWER,
    SCRIPTING_CSV_MODE_QUESTION_ANSWER_COL_QUESTION, SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_CONVERSATION_ID,
    SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_SENDER, SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_TEXT,
};
use crate::error::{CompileError, Result};
use crate::helpers::{header_index_fuzzy, parse_column_index};
use crate::mode::{MappingMode, Mode};

/// Semantic column slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    ConversationId,
    Sender,
    Text,
    Question,
    Answer,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::ConversationId,
        Field::Sender,
        Field::Text,
        Field::Question,
        Field::Answer,
    ];

    /// Name as it appears in headers and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Field::ConversationId => "conversationId",
            Field::Sender => "sender",
            Field::Text => "text",
            Field::Question => "question",
            Field::Answer => "answer",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolution hints for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    /// Position used in [`MappingMode::Index`].
    pub index: usize,
    /// Capability consulted in [`MappingMode::Cap`].
    pub cap: &'static str,
    /// Header names tried in [`MappingMode::Name`]; empty means the field name.
    pub accepted_columns: &'static [&'static str],
}

impl FieldSpec {
    fn names(&self) -> Vec<&'static str> {
        if self.accepted_columns.is_empty() {
            vec![self.field.name()]
        } else {
            self.accepted_columns.to_vec()
        }
    }
}

pub const ROW_PER_MESSAGE_FIELDS: [FieldSpec; 3] = [
    FieldSpec {
        field: Field::ConversationId,
        index: 0,
        cap: SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_CONVERSATION_ID,
        accepted_columns: &[],
    },
    FieldSpec {
        field: Field::Sender,
        index: 1,
        cap: SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_SENDER,
        accepted_columns: &[],
    },
    FieldSpec {
        field: Field::Text,
        index: 2,
        cap: SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_TEXT,
        accepted_columns: &[],
    },
];

/// Single text column, sender alternates by row.
pub const ROW_PER_MESSAGE_ONE_COLUMN_FIELDS: [FieldSpec; 1] = [FieldSpec {
    field: Field::Text,
    index: 0,
    cap: SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_TEXT,
    accepted_columns: &[],
}];

pub const QUESTION_ANSWER_FIELDS: [FieldSpec; 2] = [
    FieldSpec {
        field: Field::Question,
        index: 0,
        cap: SCRIPTING_CSV_MODE_QUESTION_ANSWER_COL_QUESTION,
        accepted_columns: &["question", "user", "me"],
    },
    FieldSpec {
        field: Field::Answer,
        index: 1,
        cap: SCRIPTING_CSV_MODE_QUESTION_ANSWER_COL_ANSWER,
        accepted_columns: &["answer", "bot"],
    },
];

/// Field set for a mode and table width.
pub fn field_specs(mode: Mode, column_count: usize) -> &'static [FieldSpec] {
    match mode {
        Mode::QuestionAnswer => &QUESTION_ANSWER_FIELDS,
        Mode::RowPerMessage if column_count > 2 => &ROW_PER_MESSAGE_FIELDS,
        Mode::RowPerMessage => &ROW_PER_MESSAGE_ONE_COLUMN_FIELDS,
    }
}

/// Resolved field to column index table, in resolution order.
///
/// Indices are unique and below the column count of the table they were
/// resolved against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    entries: Vec<(Field, usize)>,
}

impl Mapping {
    pub fn get(&self, field: Field) -> Option<usize> {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, index)| *index)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.entries.iter().map(|(f, _)| *f)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, usize)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an entry after checking bounds and collisions.
    pub fn insert(&mut self, field: Field, index: i64, column_count: usize) -> Result<()> {
        let index = usize::try_from(index)
            .ok()
            .filter(|i| *i < column_count)
            .ok_or(CompileError::IndexOutOfBounds { field, index })?;
        if let Some((existing, _)) = self.entries.iter().find(|(_, i)| *i == index) {
            return Err(CompileError::IndexCollision {
                field,
                index,
                existing: *existing,
            });
        }
        self.entries.push((field, index));
        Ok(())
    }

    /// Require exactly `fields` to be mapped.
    pub fn check_required(&self, fields: &[Field]) -> Result<()> {
        if let Some(missing) = fields.iter().find(|f| !self.contains(**f)) {
            return Err(CompileError::MissingMapping(*missing));
        }
        if fields.len() != self.len() {
            return Err(CompileError::WrongMapping {
                expected: join_names(fields.iter().copied()),
                actual: join_names(self.fields()),
            });
        }
        Ok(())
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, index) in &self.entries {
            map.serialize_entry(field.name(), index)?;
        }
        map.end()
    }
}

fn join_names(fields: impl Iterator<Item = Field>) -> String {
    fields.map(|f| f.name()).collect::<Vec<_>>().join(",")
}

/// Index named by a field's capability, or `None` when the capability is unset.
fn index_by_cap<C, S>(caps: &C, header: Option<&[S]>, spec: &FieldSpec) -> Result<Option<i64>>
where
    C: CapabilityLookup,
    S: AsRef<str>,
{
    let value = match caps.get_optional(spec.cap) {
        Some(value) => value,
        None => return Ok(None),
    };
    if let Some(index) = parse_column_index(&value) {
        return Ok(Some(index));
    }
    let header = header.ok_or_else(|| CompileError::NoHeader {
        value: value.clone(),
    })?;
    match header_index_fuzzy(header, &value) {
        Some(index) => Ok(Some(index as i64)),
        None => Err(CompileError::ColumnNotFound { value }),
    }
}

fn index_by_name<S: AsRef<str>>(header: Option<&[S]>, spec: &FieldSpec) -> Option<i64> {
    let header = header?;
    spec.names()
        .into_iter()
        .find_map(|name| header_index_fuzzy(header, name))
        .map(|index| index as i64)
}

/// Resolve every field of `specs` into a [`Mapping`].
///
/// Unmapped fields are left out; whether the result is complete is decided
/// by the conversation builder.
pub fn resolve_mapping<C, S>(
    caps: &C,
    header: Option<&[S]>,
    specs: &[FieldSpec],
    mapping_mode: MappingMode,
    column_count: usize,
) -> Result<Mapping>
where
    C: CapabilityLookup,
    S: AsRef<str>,
{
    let mut mapping = Mapping::default();
    for spec in specs {
        let index = match mapping_mode {
            MappingMode::Cap => index_by_cap(caps, header, spec)?,
            MappingMode::Name => index_by_name(header, spec),
            MappingMode::Index => Some(spec.index as i64),
        };
        if let Some(index) = index {
            mapping.insert(spec.field, index, column_count)?;
        }
    }
    debug!("Compile mapped columns: {}", join_names(mapping.fields()));
    Ok(mapping)
}
