//! The compile pipeline: header split, mode, mapping, conversations, sink.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::caps::{CapabilityLookup, SCRIPTING_CSV_SEPARATOR, SCRIPTING_CSV_USE_HEADER};
use crate::conversation::{build_conversations, Convo};
use crate::error::{CompileError, Result};
use crate::mapping::{field_specs, resolve_mapping, Mapping};
use crate::mode::{explicit_mode, resolve_mapping_mode, resolve_mode, MappingMode, Mode};
use crate::table::{split_header, Row};
use crate::tokenize::{separator_byte, tokenize, DEFAULT_SEPARATOR};

pub const DEFAULT_USE_HEADER: bool = true;

/// Destination of compiled conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptType {
    #[default]
    Convo,
    PartialConvo,
    Utterances,
    ScriptingMemory,
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScriptType::Convo => "SCRIPTING_TYPE_CONVO",
            ScriptType::PartialConvo => "SCRIPTING_TYPE_PCONVO",
            ScriptType::Utterances => "SCRIPTING_TYPE_UTTERANCES",
            ScriptType::ScriptingMemory => "SCRIPTING_TYPE_SCRIPTING_MEMORY",
        })
    }
}

impl FromStr for ScriptType {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SCRIPTING_TYPE_CONVO" | "convo" => Ok(ScriptType::Convo),
            "SCRIPTING_TYPE_PCONVO" | "pconvo" | "partial_convo" => Ok(ScriptType::PartialConvo),
            "SCRIPTING_TYPE_UTTERANCES" | "utterances" => Ok(ScriptType::Utterances),
            "SCRIPTING_TYPE_SCRIPTING_MEMORY" | "scripting_memory" => Ok(ScriptType::ScriptingMemory),
            other => Err(CompileError::UnknownScriptType(other.to_string())),
        }
    }
}

/// Receiver of compiled conversations.
pub trait ConvoSink {
    fn add_convos(&mut self, convos: Vec<Convo>);
    fn add_partial_convos(&mut self, convos: Vec<Convo>);
}

impl<T: ConvoSink + ?Sized> ConvoSink for &mut T {
    fn add_convos(&mut self, convos: Vec<Convo>) {
        (**self).add_convos(convos)
    }

    fn add_partial_convos(&mut self, convos: Vec<Convo>) {
        (**self).add_partial_convos(convos)
    }
}

/// In-memory sink keeping both kinds of conversations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptContext {
    pub convos: Vec<Convo>,
    pub partial_convos: Vec<Convo>,
}

impl ConvoSink for ScriptContext {
    fn add_convos(&mut self, convos: Vec<Convo>) {
        self.convos.extend(convos);
    }

    fn add_partial_convos(&mut self, convos: Vec<Convo>) {
        self.partial_convos.extend(convos);
    }
}

/// Everything decided about a table before conversations are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableLayout {
    pub header: Option<Row>,
    #[serde(skip)]
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub column_count: usize,
    pub mode: Mode,
    pub mapping_mode: MappingMode,
    pub mapping: Mapping,
}

/// Compiles tokenized tables into conversations using a capability set.
#[derive(Debug, Clone)]
pub struct CsvCompiler<C>
where
    C: CapabilityLookup,
{
    caps: C,
}

impl<C> CsvCompiler<C>
where
    C: CapabilityLookup,
{
    pub fn new(caps: C) -> Self {
        Self { caps }
    }

    pub fn capabilities(&self) -> &C {
        &self.caps
    }

    /// Check capabilities that can be rejected without looking at data.
    pub fn validate(&self) -> Result<()> {
        explicit_mode(&self.caps)?;
        self.caps.get_bool(SCRIPTING_CSV_USE_HEADER, DEFAULT_USE_HEADER)?;
        separator_byte(&self.caps.get_or(SCRIPTING_CSV_SEPARATOR, DEFAULT_SEPARATOR))?;
        Ok(())
    }

    /// Run header split, mode and mapping resolution.
    ///
    /// Returns `None` when there are no data rows.
    pub fn analyze(&self, rows_raw: Vec<Row>) -> Result<Option<TableLayout>> {
        let use_header = self.caps.get_bool(SCRIPTING_CSV_USE_HEADER, DEFAULT_USE_HEADER)?;
        let table = match split_header(rows_raw, use_header) {
            Some(table) => table,
            None => return Ok(None),
        };
        let header = table.header.as_deref();

        let mode = resolve_mode(&self.caps, header)?;
        let mapping_mode = resolve_mapping_mode(&self.caps, header);
        let mapping = resolve_mapping(
            &self.caps,
            header,
            field_specs(mode, table.column_count),
            mapping_mode,
            table.column_count,
        )?;

        Ok(Some(TableLayout {
            row_count: table.rows.len(),
            header: table.header,
            rows: table.rows,
            column_count: table.column_count,
            mode,
            mapping_mode,
            mapping,
        }))
    }

    /// Compile tokenized rows and hand the result to `sink`.
    ///
    /// An empty vector means there was nothing to compile; the sink is not
    /// called in that case.
    pub fn compile_rows<S: ConvoSink>(
        &self,
        rows_raw: Vec<Row>,
        script_type: ScriptType,
        mut sink: S,
    ) -> Result<Vec<Convo>> {
        let layout = match self.analyze(rows_raw)? {
            Some(layout) => layout,
            None => return Ok(Vec::new()),
        };
        let convos = build_conversations(layout.mode, &layout.rows, &layout.mapping)?;
        if convos.is_empty() {
            return Ok(convos);
        }

        match script_type {
            ScriptType::Convo => sink.add_convos(convos.clone()),
            ScriptType::PartialConvo => sink.add_partial_convos(convos.clone()),
            ScriptType::Utterances | ScriptType::ScriptingMemory => {
                return Err(CompileError::Unsupported(script_type))
            }
        }
        Ok(convos)
    }

    fn tokenize_script(&self, script: &[u8]) -> Result<Vec<Row>> {
        let delimiter = separator_byte(&self.caps.get_or(SCRIPTING_CSV_SEPARATOR, DEFAULT_SEPARATOR))?;
        tokenize(script, delimiter)
    }

    /// Tokenize raw CSV bytes, then analyze them.
    pub fn analyze_script(&self, script: &[u8]) -> Result<Option<TableLayout>> {
        self.analyze(self.tokenize_script(script)?)
    }

    /// Tokenize raw CSV bytes, then compile them.
    pub fn compile<S: ConvoSink>(
        &self,
        script: &[u8],
        script_type: ScriptType,
        sink: S,
    ) -> Result<Vec<Convo>> {
        let rows_raw = self.tokenize_script(script)?;
        self.compile_rows(rows_raw, script_type, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::{Capabilities, SCRIPTING_CSV_MODE, SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_TEXT};
    use crate::conversation::ConvoStep;
    use crate::mapping::Field;
    use crate::ErrorKind;

    fn rows(data: &[&[&str]]) -> Vec<Row> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_script_type_parsing() {
        assert_eq!("convo".parse::<ScriptType>().unwrap(), ScriptType::Convo);
        assert_eq!(
            "SCRIPTING_TYPE_PCONVO".parse::<ScriptType>().unwrap(),
            ScriptType::PartialConvo
        );
        assert!("yaml".parse::<ScriptType>().is_err());
        assert_eq!(ScriptType::default(), ScriptType::Convo);
    }

    #[test]
    fn test_validate() {
        for mode in ["QUESTION_ANSWER", "ROW_PER_MESSAGE"] {
            let compiler = CsvCompiler::new(Capabilities::from_pairs([(SCRIPTING_CSV_MODE, mode)]));
            assert!(compiler.validate().is_ok());
        }
        let compiler = CsvCompiler::new(Capabilities::from_pairs([(SCRIPTING_CSV_MODE, "FOO")]));
        assert_eq!(compiler.validate().unwrap_err().kind(), ErrorKind::Configuration);
        let compiler = CsvCompiler::new(Capabilities::from_pairs([(SCRIPTING_CSV_SEPARATOR, "::")]));
        assert!(compiler.validate().is_err());
        assert!(CsvCompiler::new(Capabilities::new()).validate().is_ok());
    }

    #[test]
    fn test_analyze_question_answer_header() {
        let compiler = CsvCompiler::new(Capabilities::new());
        let layout = compiler
            .analyze(rows(&[&["question", "answer"], &["Hi", "Hello"]]))
            .unwrap()
            .unwrap();
        assert_eq!(layout.mode, Mode::QuestionAnswer);
        assert_eq!(layout.mapping_mode, MappingMode::Name);
        assert_eq!(layout.mapping.get(Field::Question), Some(0));
        assert_eq!(layout.mapping.get(Field::Answer), Some(1));
    }

    #[test]
    fn test_compile_routes_to_sink() {
        let compiler = CsvCompiler::new(Capabilities::from_pairs([(SCRIPTING_CSV_USE_HEADER, false)]));
        let data = rows(&[&["hi"], &["hello"]]);

        let mut context = ScriptContext::default();
        let convos = compiler
            .compile_rows(data.clone(), ScriptType::Convo, &mut context)
            .unwrap();
        assert_eq!(convos.len(), 1);
        assert_eq!(context.convos, convos);
        assert!(context.partial_convos.is_empty());

        let mut context = ScriptContext::default();
        compiler
            .compile_rows(data, ScriptType::PartialConvo, &mut context)
            .unwrap();
        assert!(context.convos.is_empty());
        assert_eq!(
            context.partial_convos[0].conversation,
            vec![ConvoStep::me("hi", "Row 0"), ConvoStep::bot("hello", "Row 1")]
        );
    }

    #[test]
    fn test_unsupported_script_types() {
        let compiler = CsvCompiler::new(Capabilities::new());
        for script_type in [ScriptType::Utterances, ScriptType::ScriptingMemory] {
            let mut context = ScriptContext::default();
            let err = compiler
                .compile(b"text\nhi\nhello\n", script_type, &mut context)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unsupported);
            assert_eq!(context, ScriptContext::default());
        }
    }

    #[test]
    fn test_no_data_is_silent() {
        let compiler = CsvCompiler::new(Capabilities::new());
        let mut context = ScriptContext::default();
        assert!(compiler.compile(b"", ScriptType::Convo, &mut context).unwrap().is_empty());
        assert!(compiler
            .compile(b"question,answer\n", ScriptType::Convo, &mut context)
            .unwrap()
            .is_empty());
        assert_eq!(context, ScriptContext::default());
    }

    #[test]
    fn test_compile_with_separator() {
        let compiler = CsvCompiler::new(Capabilities::from_pairs([
            (SCRIPTING_CSV_SEPARATOR, ";"),
            (SCRIPTING_CSV_MODE_ROW_PER_MESSAGE_COL_TEXT, "Line"),
        ]));
        let convos = compiler
            .compile(b"Line\nhi, there\nhello\n", ScriptType::Convo, ScriptContext::default())
            .unwrap();
        assert_eq!(convos.len(), 1);
        assert_eq!(convos[0].conversation[0].message_text, "hi, there");
    }
}
