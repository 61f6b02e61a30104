//! Grouping data rows into conversations.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CompileError, Result};
use crate::mapping::{Field, Mapping};
use crate::mode::Mode;
use crate::table::Row;

/// The two roles of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Me,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Me => "me",
            Sender::Bot => "bot",
        }
    }

    /// Parse a sender cell. Only the exact literals `me` and `bot` are valid.
    pub fn parse(value: &str, row: usize) -> Result<Self> {
        match value {
            "me" => Ok(Sender::Me),
            "bot" => Ok(Sender::Bot),
            other => Err(CompileError::InvalidSender {
                row,
                value: other.to_string(),
            }),
        }
    }

    /// Role of row `row` in a one-column table.
    fn alternating(row: usize) -> Self {
        if row % 2 == 0 {
            Sender::Me
        } else {
            Sender::Bot
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single step of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvoStep {
    pub sender: Sender,
    pub message_text: String,
    /// Where the step came from, e.g. `Row 3` or `Answer 0`.
    pub step_tag: String,
}

impl ConvoStep {
    pub fn me(text: impl Into<String>, step_tag: impl Into<String>) -> Self {
        Self::new(Sender::Me, text, step_tag)
    }

    pub fn bot(text: impl Into<String>, step_tag: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text, step_tag)
    }

    pub fn new(sender: Sender, text: impl Into<String>, step_tag: impl Into<String>) -> Self {
        Self {
            sender,
            message_text: text.into(),
            step_tag: step_tag.into(),
        }
    }
}

/// A compiled conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Convo {
    pub name: String,
    pub conversation: Vec<ConvoStep>,
}

/// Read the mapped cell of `field` in row `row`.
fn cell<'a>(rows: &'a [Row], mapping: &Mapping, row: usize, field: Field) -> Result<&'a str> {
    let index = mapping.get(field).ok_or(CompileError::MissingMapping(field))?;
    rows[row]
        .get(index)
        .map(String::as_str)
        .ok_or(CompileError::MissingCell { row, field, index })
}

/// Accumulates consecutive rows sharing a conversation id.
#[derive(Debug, Default)]
struct Segmenter {
    current: Option<(String, Vec<ConvoStep>)>,
    finished: Vec<Convo>,
}

impl Segmenter {
    fn push(&mut self, id: String, step: ConvoStep) {
        if let Some((current_id, steps)) = &mut self.current {
            if *current_id == id {
                steps.push(step);
                return;
            }
        }
        self.flush();
        self.current = Some((id, vec![step]));
    }

    fn flush(&mut self) {
        if let Some((name, conversation)) = self.current.take() {
            self.finished.push(Convo { name, conversation });
        }
    }

    fn finish(mut self) -> Result<Vec<Convo>> {
        match &self.current {
            Some((_, steps)) if !steps.is_empty() => {}
            _ => return Err(CompileError::EmptyConversation),
        }
        self.flush();
        Ok(self.finished)
    }
}

/// Build conversations from a row-per-message table.
///
/// With a conversation id or sender column the table must map exactly
/// conversation id, sender and text. Otherwise only text is mapped, every
/// two rows form one conversation and senders alternate `me`, `bot`.
pub fn build_row_per_message(rows: &[Row], mapping: &Mapping) -> Result<Vec<Convo>> {
    let one_column = !mapping.contains(Field::ConversationId) && !mapping.contains(Field::Sender);
    if one_column {
        debug!("Compile one-column sender mode detected");
        mapping.check_required(&[Field::Text])?;
    } else {
        mapping.check_required(&[Field::ConversationId, Field::Sender, Field::Text])?;
    }

    let mut segmenter = Segmenter::default();
    for row in 0..rows.len() {
        let (id, sender) = if one_column {
            ((row / 2).to_string(), Sender::alternating(row))
        } else {
            let id = cell(rows, mapping, row, Field::ConversationId)
                .map_err(|_| CompileError::MissingConversationId { row })?;
            let sender = Sender::parse(cell(rows, mapping, row, Field::Sender)?, row)?;
            (id.to_string(), sender)
        };
        let text = cell(rows, mapping, row, Field::Text)?;
        segmenter.push(id, ConvoStep::new(sender, text, format!("Row {}", row)));
    }
    segmenter.finish()
}

/// Build one two-step conversation per question/answer row.
pub fn build_question_answer(rows: &[Row], mapping: &Mapping) -> Result<Vec<Convo>> {
    mapping.check_required(&[Field::Question, Field::Answer])?;

    (0..rows.len())
        .map(|row| {
            let question = cell(rows, mapping, row, Field::Question)?;
            let answer = cell(rows, mapping, row, Field::Answer)?;
            Ok(Convo {
                name: row.to_string(),
                conversation: vec![
                    ConvoStep::me(question, format!("Question {}", row)),
                    ConvoStep::bot(answer, format!("Answer {}", row)),
                ],
            })
        })
        .collect()
}

/// Build conversations for `mode`.
pub fn build_conversations(mode: Mode, rows: &[Row], mapping: &Mapping) -> Result<Vec<Convo>> {
    match mode {
        Mode::RowPerMessage => build_row_per_message(rows, mapping),
        Mode::QuestionAnswer => build_question_answer(rows, mapping),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Row> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn mapping(entries: &[(Field, i64)], column_count: usize) -> Mapping {
        let mut mapping = Mapping::default();
        for (field, index) in entries {
            mapping.insert(*field, *index, column_count).unwrap();
        }
        mapping
    }

    fn three_column() -> Mapping {
        mapping(
            &[(Field::ConversationId, 0), (Field::Sender, 1), (Field::Text, 2)],
            3,
        )
    }

    #[test]
    fn test_grouping_by_conversation_id() {
        let data = rows(&[&["1", "me", "hi"], &["1", "bot", "hello"], &["2", "me", "bye"]]);
        let convos = build_row_per_message(&data, &three_column()).unwrap();

        assert_eq!(convos.len(), 2);
        assert_eq!(convos[0].name, "1");
        assert_eq!(
            convos[0].conversation,
            vec![ConvoStep::me("hi", "Row 0"), ConvoStep::bot("hello", "Row 1")]
        );
        assert_eq!(convos[1].name, "2");
        assert_eq!(convos[1].conversation, vec![ConvoStep::me("bye", "Row 2")]);
    }

    #[test]
    fn test_non_contiguous_ids_start_new_conversations() {
        let data = rows(&[&["a", "me", "1"], &["b", "me", "2"], &["a", "bot", "3"]]);
        let convos = build_row_per_message(&data, &three_column()).unwrap();
        let names: Vec<&str> = convos.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_one_column_alternates() {
        let data = rows(&[&["hi"], &["hello"], &["how are you"]]);
        let convos = build_row_per_message(&data, &mapping(&[(Field::Text, 0)], 1)).unwrap();

        assert_eq!(convos.len(), 2);
        assert_eq!(convos[0].name, "0");
        assert_eq!(
            convos[0].conversation,
            vec![ConvoStep::me("hi", "Row 0"), ConvoStep::bot("hello", "Row 1")]
        );
        assert_eq!(convos[1].name, "1");
        assert_eq!(convos[1].conversation, vec![ConvoStep::me("how are you", "Row 2")]);
    }

    #[test]
    fn test_invalid_sender() {
        let data = rows(&[&["1", "me", "hi"], &["1", "Bot", "hello"]]);
        let err = build_row_per_message(&data, &three_column()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidSender { row: 1, .. }));
        assert!(err.to_string().contains("Invalid row 1"));
    }

    #[test]
    fn test_partial_mapping_rejected() {
        let data = rows(&[&["1", "me", "hi"]]);
        let partial = mapping(&[(Field::Sender, 1), (Field::Text, 2)], 3);
        let err = build_row_per_message(&data, &partial).unwrap_err();
        assert!(matches!(err, CompileError::MissingMapping(Field::ConversationId)));
    }

    #[test]
    fn test_missing_conversation_id_cell() {
        let data = rows(&[&["1", "me", "hi"], &[]]);
        let err = build_row_per_message(&data, &three_column()).unwrap_err();
        assert!(matches!(err, CompileError::MissingConversationId { row: 1 }));
    }

    #[test]
    fn test_short_row_is_lookup_error() {
        let data = rows(&[&["1", "me", "hi"], &["1", "bot"]]);
        let err = build_row_per_message(&data, &three_column()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::MissingCell { row: 1, field: Field::Text, index: 2 }
        ));
    }

    #[test]
    fn test_ragged_wide_rows_ignored() {
        let data = rows(&[&["1", "me", "hi", "extra"], &["1", "bot", "hello", "x", "y"]]);
        let convos = build_row_per_message(&data, &three_column()).unwrap();
        assert_eq!(convos.len(), 1);
        assert_eq!(convos[0].conversation.len(), 2);
    }

    #[test]
    fn test_empty_rows_is_invariant_violation() {
        let err = build_row_per_message(&[], &three_column()).unwrap_err();
        assert!(matches!(err, CompileError::EmptyConversation));
    }

    #[test]
    fn test_question_answer() {
        let data = rows(&[&["Hi", "Hello"], &["Bye", "See you"]]);
        let qa = mapping(&[(Field::Question, 0), (Field::Answer, 1)], 2);
        let convos = build_conversations(Mode::QuestionAnswer, &data, &qa).unwrap();

        assert_eq!(convos.len(), 2);
        assert_eq!(convos[1].name, "1");
        assert_eq!(
            convos[1].conversation,
            vec![ConvoStep::me("Bye", "Question 1"), ConvoStep::bot("See you", "Answer 1")]
        );
    }

    #[test]
    fn test_question_answer_requires_both() {
        let data = rows(&[&["Hi", "Hello"]]);
        let qa = mapping(&[(Field::Answer, 1)], 2);
        let err = build_question_answer(&data, &qa).unwrap_err();
        assert!(matches!(err, CompileError::MissingMapping(Field::Question)));
    }

    #[test]
    fn test_step_serialization() {
        let step = ConvoStep::bot("hello", "Row 1");
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"sender": "bot", "messageText": "hello", "stepTag": "Row 1"})
        );
    }
}
