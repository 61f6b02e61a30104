//! Compiles CSV test scripts into conversations.
//!
//! A table is read in four stages: the optional header row is split off,
//! the conversation shape ([`Mode`]) is decided, every semantic field is
//! mapped to a column ([`Mapping`]), and rows are grouped into [`Convo`]s.
//! All decisions are driven by the table itself plus an explicit, read-only
//! [`CapabilityLookup`].

pub mod caps;
mod compiler;
mod conversation;
mod error;
mod helpers;
mod mapping;
mod mode;
pub mod pipeline;
mod table;
mod tokenize;

pub use caps::{CapabilityLookup, Capabilities};
pub use compiler::{ConvoSink, CsvCompiler, ScriptContext, ScriptType, TableLayout, DEFAULT_USE_HEADER};
pub use conversation::{
    build_conversations, build_question_answer, build_row_per_message, Convo, ConvoStep, Sender,
};
pub use error::{CompileError, ErrorKind, Result};
pub use helpers::{equals_fuzzy, header_index_fuzzy, normalize_column_name, parse_column_index};
pub use mapping::{
    field_specs, resolve_mapping, Field, FieldSpec, Mapping, QUESTION_ANSWER_FIELDS,
    ROW_PER_MESSAGE_FIELDS, ROW_PER_MESSAGE_ONE_COLUMN_FIELDS,
};
pub use mode::{explicit_mode, resolve_mapping_mode, resolve_mode, MappingMode, Mode, QUESTION_ANSWER_VOCABULARY};
pub use pipeline::{
    compile_all_files, compile_file, discover_csv_files, write_jsonl, write_jsonl_output,
    FileResult, PipelineResult,
};
pub use table::{split_header, Row, Table};
pub use tokenize::{separator_byte, tokenize, DEFAULT_SEPARATOR};
