//! Normalization of Gemini response bodies into plain text fragments.
//!
//! The same endpoint can answer in two shapes:
//! 1. A single JSON document (an object, or an array of objects) that has
//!    to be read to the end before it parses.
//! 2. Line-delimited records (server-sent events or NDJSON), each line one
//!    JSON object, optionally prefixed with `data:`.
//!
//! The shape is taken from the content type when it is conclusive and
//! sniffed from the first non-whitespace byte otherwise. Each shape has its
//! own [`FragmentParser`]; both yield only the text found under
//! `candidates[].content.parts[].text` (or a top-level `text`).
//! Lines are split on raw bytes, so a read boundary inside a multi-byte
//! character cannot corrupt the output.

use std::fmt::Display;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;

use squidai_core::llm::provider::TextStream;
use squidai_types::llm::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// One JSON value spanning the whole body.
    Document,
    /// One record per line.
    Lines,
}

/// Shape implied by a content type, or `None` if it has to be sniffed.
pub fn shape_from_content_type(content_type: Option<&str>) -> Option<ResponseShape> {
    let content_type = content_type?.to_ascii_lowercase();
    if content_type.contains("event-stream")
        || content_type.contains("ndjson")
        || content_type.contains("jsonl")
    {
        Some(ResponseShape::Lines)
    } else if content_type.contains("application/json") {
        Some(ResponseShape::Document)
    } else {
        None
    }
}

/// Shape implied by the first non-whitespace byte, or `None` if there is none yet.
pub fn sniff_shape(head: &[u8]) -> Option<ResponseShape> {
    let first = head.iter().find(|b| !b.is_ascii_whitespace())?;
    Some(if *first == b'[' {
        ResponseShape::Document
    } else {
        ResponseShape::Lines
    })
}

/// Incremental body parser producing text fragments.
pub trait FragmentParser: Send {
    /// Consume a chunk; return fragments completed by it.
    fn feed(&mut self, chunk: &[u8]) -> Vec<String>;

    /// The body ended; return whatever is left.
    fn finish(&mut self) -> Vec<String>;
}

/// Buffers the whole body, then parses it once.
#[derive(Debug, Default)]
pub struct DocumentParser {
    body: Vec<u8>,
}

impl FragmentParser for DocumentParser {
    fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.body.extend_from_slice(chunk);
        Vec::new()
    }

    fn finish(&mut self) -> Vec<String> {
        let body = std::mem::take(&mut self.body);
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => extract_text(&value),
            Err(_) => {
                // Not JSON after all: pass the body through untouched.
                let raw = String::from_utf8_lossy(&body).into_owned();
                if raw.trim().is_empty() { Vec::new() } else { vec![raw] }
            }
        }
    }
}

/// Splits on newlines, carrying an incomplete trailing line across reads.
#[derive(Debug, Default)]
pub struct LineParser {
    pending: Vec<u8>,
}

impl LineParser {
    fn parse_line(line: &[u8]) -> Vec<String> {
        let line = String::from_utf8_lossy(line);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        let payload = trimmed
            .strip_prefix("data:")
            .map(str::trim_start)
            .unwrap_or(trimmed);
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => extract_text(&value),
            // Unparseable lines are forwarded as-is.
            Err(_) => vec![trimmed.to_string()],
        }
    }
}

impl FragmentParser for LineParser {
    fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            out.extend(Self::parse_line(&line));
        }
        out
    }

    fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.pending);
        Self::parse_line(&rest)
    }
}

pub fn parser_for(shape: ResponseShape) -> Box<dyn FragmentParser> {
    match shape {
        ResponseShape::Document => Box::new(DocumentParser::default()),
        ResponseShape::Lines => Box::new(LineParser::default()),
    }
}

/// Collect the text fragments of one parsed response value, in order.
pub fn extract_text(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_text(value, &mut out);
    out
}

fn collect_text(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        Value::Object(object) => {
            if let Some(Value::Array(candidates)) = object.get("candidates") {
                for candidate in candidates {
                    let content = candidate
                        .get("content")
                        .filter(|v| !v.is_null())
                        .or_else(|| candidate.get("output").filter(|v| !v.is_null()))
                        .unwrap_or(candidate);
                    if let Some(Value::Array(parts)) = content.get("parts") {
                        for part in parts {
                            if let Some(Value::String(text)) = part.get("text") {
                                out.push(text.clone());
                            }
                        }
                    }
                }
            }
            if let Some(Value::String(text)) = object.get("text") {
                out.push(text.clone());
            }
        }
        _ => {}
    }
}

/// Turn a raw response body into a stream of text fragments.
///
/// `declared` is the shape implied by the content type; when `None` the
/// body is sniffed. Read errors end the stream with `LlmError::Stream`.
pub fn normalize_body<S, E>(body: S, declared: Option<ResponseShape>) -> TextStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut body = Box::pin(body);

        let mut head: Vec<u8> = Vec::new();
        let shape = match declared {
            Some(shape) => shape,
            None => loop {
                match body.next().await {
                    Some(chunk) => {
                        let chunk = chunk.map_err(|e| LlmError::Stream(e.to_string()))?;
                        head.extend_from_slice(&chunk);
                        if let Some(shape) = sniff_shape(&head) {
                            break shape;
                        }
                    }
                    None => break ResponseShape::Lines,
                }
            },
        };
        tracing::debug!(?shape, "Normalizing Gemini response");

        let mut parser = parser_for(shape);
        for fragment in parser.feed(&head) {
            if !fragment.is_empty() {
                yield fragment;
            }
        }

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| LlmError::Stream(e.to_string()))?;
            for fragment in parser.feed(&chunk) {
                if !fragment.is_empty() {
                    yield fragment;
                }
            }
        }

        for fragment in parser.finish() {
            if !fragment.is_empty() {
                yield fragment;
            }
        }
    })
}
