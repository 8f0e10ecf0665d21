//! Decoding of borg output into records.
//!
//! borg prints either one JSON document on stdout (`--json`), one JSON object
//! per line (`--json-lines`, `--log-json` on stderr), or plain text. Every
//! line or document that does not decode falls back to its raw text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decoded unit of output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    /// A decoded JSON object or array.
    Json(Value),
    /// Text that is not structured JSON.
    Raw(String),
}

impl Record {
    /// Returns the decoded value, if structured.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// Returns the raw text, if unstructured.
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Raw(text) => Some(text),
        }
    }
}

/// Decodes `text` as JSON, keeping the raw text when it is not an object or
/// an array.
///
/// # Examples
///
/// ```
/// use borg_command_exec::decode::{Record, decode_line};
///
/// assert!(decode_line(r#"{"type": "log_message"}"#).as_json().is_some());
/// assert_eq!(decode_line("Enter passphrase"), Record::Raw("Enter passphrase".into()));
/// ```
pub fn decode_line(text: &str) -> Record {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Record::Json(value),
        _ => Record::Raw(text.to_string()),
    }
}

/// Decodes a whole stdout buffer as a single document.
///
/// Blank output produces no record.
pub fn decode_document(text: &str) -> Vec<Record> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => vec![Record::Json(value)],
        _ => vec![Record::Raw(text.to_string())],
    }
}

/// Decodes newline-delimited output, one record per non-blank line.
pub fn decode_lines(text: &str) -> Vec<Record> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(decode_line)
        .collect()
}

/// Incremental line decoder for one output stream.
///
/// Bytes are buffered until a line terminator arrives, so a line split
/// across chunks is decoded once, whole.
///
/// # Examples
///
/// ```
/// use borg_command_exec::decode::LineDecoder;
///
/// let mut decoder = LineDecoder::default();
/// let mut records = Vec::new();
/// decoder.feed(b"{\"a\":1}\n{\"b\"", &mut records);
/// assert_eq!(records.len(), 1);
/// decoder.feed(b":2}\n", &mut records);
/// assert_eq!(records.len(), 2);
/// decoder.finish(&mut records);
/// assert_eq!(records.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    /// Consumes `chunk`, pushing one record per completed non-blank line.
    pub fn feed(&mut self, chunk: &[u8], out: &mut Vec<Record>) {
        self.pending.extend_from_slice(chunk);
        let Some(last_newline) = self.pending.iter().rposition(|byte| *byte == b'\n') else {
            return;
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        for line in complete.split(|byte| *byte == b'\n') {
            push_line(line, out);
        }
    }

    /// Flushes a trailing line left without terminator.
    pub fn finish(&mut self, out: &mut Vec<Record>) {
        let line = std::mem::take(&mut self.pending);
        push_line(&line, out);
    }
}

fn push_line(line: &[u8], out: &mut Vec<Record>) {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(decode_line(trimmed));
    }
}
