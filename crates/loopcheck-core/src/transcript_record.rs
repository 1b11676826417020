use serde::Deserialize;

pub const RECORD_TYPE_MESSAGE: &str = "message";
pub const ROLE_ASSISTANT: &str = "assistant";
pub const CONTENT_PART_TEXT: &str = "text";

/// One newline-delimited JSON record of a per-session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranscriptRecord {
    #[serde(default, rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub message: Option<TranscriptMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranscriptMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentPart {
    #[serde(default, rename = "type")]
    pub part_type: String,
    #[serde(default)]
    pub text: String,
}

impl TranscriptRecord {
    /// Whether this record is a complete assistant answer entry.
    pub fn is_assistant_answer(&self) -> bool {
        self.record_type == RECORD_TYPE_MESSAGE
            && self
                .message
                .as_ref()
                .is_some_and(|message| message.role == ROLE_ASSISTANT)
    }

    /// Concatenation of the `text`-typed content parts, in order.
    pub fn answer_text(&self) -> String {
        let Some(message) = &self.message else {
            return String::new();
        };
        message
            .content
            .iter()
            .filter(|part| part.part_type == CONTENT_PART_TEXT)
            .map(|part| part.text.as_str())
            .collect()
    }
}

/// Parses newline-delimited transcript records, silently skipping blank and
/// malformed lines.
pub fn parse_transcript_records(raw: &str) -> Vec<TranscriptRecord> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<TranscriptRecord>(line) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::debug!("skipping malformed transcript line: {error}");
                None
            }
        })
        .collect()
}

pub fn count_assistant_answers(records: &[TranscriptRecord]) -> usize {
    records.iter().filter(|r| r.is_assistant_answer()).count()
}

/// Scans all entries in order and keeps the text of the last assistant
/// answer. The record format does not allow a cheap delta read, so the
/// newest-overall answer is accepted under single-probe-in-flight discipline.
pub fn newest_assistant_answer(records: &[TranscriptRecord]) -> Option<String> {
    records
        .iter()
        .rev()
        .find(|record| record.is_assistant_answer())
        .map(TranscriptRecord::answer_text)
}

#[cfg(test)]
mod tests {
    use super::{
        count_assistant_answers, newest_assistant_answer, parse_transcript_records,
    };

    const SESSION_RAW: &str = concat!(
        r#"{"type":"message","message":{"role":"user","content":[{"type":"text","text":"2+2?"}]}}"#,
        "\n",
        r#"{"type":"message","message":{"role":"assistant","content":[{"type":"text","text":"The answer "},{"type":"tool_use","text":"ignored"},{"type":"text","text":"is 4."}]}}"#,
        "\n",
        r#"{"type":"summary","summary":"compacted"}"#,
        "\n",
        "garbled{\n",
        "\n",
    );

    #[test]
    fn unit_parse_skips_blank_and_malformed_lines() {
        let records = parse_transcript_records(SESSION_RAW);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn unit_count_assistant_answers_counts_only_assistant_message_records() {
        let records = parse_transcript_records(SESSION_RAW);
        assert_eq!(count_assistant_answers(&records), 1);
    }

    #[test]
    fn functional_newest_answer_concatenates_text_parts_only() {
        let records = parse_transcript_records(SESSION_RAW);
        assert_eq!(
            newest_assistant_answer(&records),
            Some("The answer is 4.".to_string())
        );
    }

    #[test]
    fn functional_newest_answer_takes_the_last_assistant_entry() {
        let raw = concat!(
            r#"{"type":"message","message":{"role":"assistant","content":[{"type":"text","text":"old"}]}}"#,
            "\n",
            r#"{"type":"message","message":{"role":"user","content":[{"type":"text","text":"again?"}]}}"#,
            "\n",
            r#"{"type":"message","message":{"role":"assistant","content":[{"type":"text","text":"new"}]}}"#,
            "\n",
        );
        let records = parse_transcript_records(raw);
        assert_eq!(newest_assistant_answer(&records), Some("new".to_string()));
    }

    #[test]
    fn unit_newest_answer_is_none_without_assistant_entries() {
        let raw = r#"{"type":"message","message":{"role":"user","content":[]}}"#;
        let records = parse_transcript_records(raw);
        assert_eq!(newest_assistant_answer(&records), None);
    }
}
