//! Error type shared by every compile stage.

use thiserror::Error;

use crate::compiler::ScriptType;
use crate::mapping::Field;

/// Coarse classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Capabilities are contradictory or reference something that does not exist.
    Configuration,
    /// The table shape does not fit the resolved mode or mapping.
    Structural,
    /// The requested destination is recognized but not implemented.
    Unsupported,
    /// Raw input could not be read or tokenized.
    Input,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Illegal value \"{value}\" in capability SCRIPTING_CSV_MODE. If it is set then it must be QUESTION_ANSWER or ROW_PER_MESSAGE")]
    IllegalMode { value: String },

    #[error("Illegal value \"{value}\" in capability {key}, expected a boolean")]
    IllegalBoolean { key: String, value: String },

    #[error("Illegal value \"{value}\" in capability SCRIPTING_CSV_SEPARATOR, expected a single byte delimiter")]
    IllegalSeparator { value: String },

    #[error("Unknown script type \"{0}\"")]
    UnknownScriptType(String),

    #[error("Unknown column definition {value}. Column not found by name")]
    ColumnNotFound { value: String },

    #[error("Unknown column definition {value}. There is no header in CSV.")]
    NoHeader { value: String },

    #[error("Invalid row {row} sender must be 'me' or 'bot', found \"{value}\"")]
    InvalidSender { row: usize, value: String },

    #[error("Tried to map column {field}, but the mapped index {index} is invalid in CSV")]
    IndexOutOfBounds { field: Field, index: i64 },

    #[error("Tried to map column {field}, but the mapped index {index} is already mapped to {existing}")]
    IndexCollision {
        field: Field,
        index: usize,
        existing: Field,
    },

    #[error("Mapping not found for {0}")]
    MissingMapping(Field),

    #[error("Wrong mapping. Expected: {expected} actual: {actual}")]
    WrongMapping { expected: String, actual: String },

    #[error("Convo Id cant be null! (row {row})")]
    MissingConversationId { row: usize },

    #[error("Row {row} has no cell at index {index} for column {field}")]
    MissingCell {
        row: usize,
        field: Field,
        index: usize,
    },

    #[error("Illegal state, convo can't be empty here")]
    EmptyConversation,

    #[error("Script type {0} is not supported yet")]
    Unsupported(ScriptType),

    #[error("Invalid CSV!\n{0}")]
    InvalidCsv(#[from] csv::Error),

    #[error("Invalid capabilities: {0}")]
    InvalidCapabilities(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::IllegalMode { .. }
            | CompileError::IllegalBoolean { .. }
            | CompileError::IllegalSeparator { .. }
            | CompileError::UnknownScriptType(_)
            | CompileError::ColumnNotFound { .. }
            | CompileError::NoHeader { .. }
            | CompileError::InvalidSender { .. }
            | CompileError::InvalidCapabilities(_) => ErrorKind::Configuration,
            CompileError::IndexOutOfBounds { .. }
            | CompileError::IndexCollision { .. }
            | CompileError::MissingMapping(_)
            | CompileError::WrongMapping { .. }
            | CompileError::MissingConversationId { .. }
            | CompileError::MissingCell { .. }
            | CompileError::EmptyConversation => ErrorKind::Structural,
            CompileError::Unsupported(_) => ErrorKind::Unsupported,
            CompileError::InvalidCsv(_) | CompileError::Io(_) => ErrorKind::Input,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
