//! Reply normalization
//!
//! Providers answer in several shapes: the canonical object itself, a
//! chat-completions envelope whose message content is JSON text, prose with a
//! fenced ```json block, streaming `delta` fragments, a bare `text` field, or a
//! root-level `content`. Rather than nesting "try this, then that" checks,
//! normalization walks two ordered strategy lists:
//!
//! 1. [`LOCATORS`] find a candidate inside the reply body.
//! 2. [`TEXT_PARSERS`] turn a textual candidate into JSON.
//!
//! The first candidate that yields an object with canonical content wins.
//! Nothing here panics or propagates a parse error; failure is reported as
//! [`ParseFailure`].

use super::schema::StructuredAnalysis;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error, PartialEq)]
#[error("no structured analysis found in reply: {reason}")]
pub struct ParseFailure {
    pub reason: String,
    /// First characters of the reply, for logs
    pub excerpt: String,
}

impl ParseFailure {
    fn new(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            reason: reason.into(),
            excerpt: raw.chars().take(200).collect(),
        }
    }
}

/// Something inside a reply that may hold the analysis
#[derive(Debug, Clone, Copy)]
enum Candidate<'a> {
    Structured(&'a Value),
    Text(&'a str),
}

type Locator = for<'a> fn(&'a Value) -> Option<Candidate<'a>>;
type TextParser = fn(&str) -> Option<Value>;

/// Where to look in a reply body, in order
const LOCATORS: &[(&str, Locator)] = &[
    ("canonical body", canonical_body),
    ("message content", message_content),
    ("delta content", delta_content),
    ("choice text", choice_text),
    ("root content", root_content),
];

/// How to read JSON out of text, in order
const TEXT_PARSERS: &[(&str, TextParser)] = &[
    ("direct", parse_direct),
    ("fenced block", parse_fenced_block),
    ("embedded object", parse_embedded_object),
];

/// Normalizes a raw reply body into a [`StructuredAnalysis`]
pub fn normalize(raw: &str) -> Result<StructuredAnalysis, ParseFailure> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseFailure::new("empty reply", raw));
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(body) => normalize_value(&body).map_err(|mut failure| {
            failure.excerpt = trimmed.chars().take(200).collect();
            failure
        }),
        // Not JSON at all: treat the whole reply as prose
        Err(_) => interpret_text(trimmed)
            .ok_or_else(|| ParseFailure::new("reply is neither JSON nor prose with JSON", raw)),
    }
}

/// Normalizes an already-decoded reply body
pub fn normalize_value(body: &Value) -> Result<StructuredAnalysis, ParseFailure> {
    for (name, locate) in LOCATORS {
        let Some(candidate) = locate(body) else {
            continue;
        };

        match interpret(candidate) {
            Some(analysis) => {
                debug!("Normalized reply via {}", name);
                return Ok(analysis);
            }
            None => debug!("Found {} but it holds no analysis", name),
        }
    }

    warn!("No strategy produced a structured analysis");
    Err(ParseFailure::new(
        "no strategy produced a structured analysis",
        &body.to_string(),
    ))
}

/// Reply text for conversational callers: the first non-blank textual
/// content found by the locators (structured content is rendered as JSON)
pub fn reply_text(raw: &str) -> Option<String> {
    let body: Value = serde_json::from_str(raw.trim()).ok()?;

    LOCATORS
        .iter()
        .skip(1)
        .filter_map(|(_, locate)| locate(&body))
        .map(|candidate| match candidate {
            Candidate::Text(text) => text.trim().to_string(),
            Candidate::Structured(value) => value.to_string(),
        })
        .find(|text| !text.is_empty())
}

/// `error.message` from an API error envelope
pub fn api_error(raw: &str) -> Option<String> {
    let body: Value = serde_json::from_str(raw.trim()).ok()?;
    match body.get("error")? {
        Value::Object(obj) => Some(
            obj.get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown API error")
                .to_string(),
        ),
        Value::String(message) => Some(message.clone()),
        _ => None,
    }
}

fn interpret(candidate: Candidate<'_>) -> Option<StructuredAnalysis> {
    match candidate {
        Candidate::Structured(value) => StructuredAnalysis::from_value(value),
        Candidate::Text(text) => interpret_text(text),
    }
}

fn interpret_text(text: &str) -> Option<StructuredAnalysis> {
    TEXT_PARSERS.iter().find_map(|(name, parse)| {
        let value = parse(text)?;
        let analysis = StructuredAnalysis::from_value(&value);
        if analysis.is_some() {
            debug!("Parsed text candidate via {}", name);
        }
        analysis
    })
}

// Locators

fn canonical_body(body: &Value) -> Option<Candidate<'_>> {
    body.is_object().then_some(Candidate::Structured(body))
}

fn first_choice(body: &Value) -> Option<&Value> {
    body.get("choices")?.as_array()?.first()
}

fn content_candidate(content: &Value) -> Option<Candidate<'_>> {
    match content {
        Value::String(text) => Some(Candidate::Text(text)),
        Value::Object(_) => Some(Candidate::Structured(content)),
        // Content-part arrays: [{"type": "text", "text": "..."}]
        Value::Array(parts) => parts
            .iter()
            .find_map(|part| part.get("text").and_then(Value::as_str))
            .map(Candidate::Text),
        _ => None,
    }
}

fn message_content(body: &Value) -> Option<Candidate<'_>> {
    content_candidate(first_choice(body)?.get("message")?.get("content")?)
}

fn delta_content(body: &Value) -> Option<Candidate<'_>> {
    content_candidate(first_choice(body)?.get("delta")?.get("content")?)
}

fn choice_text(body: &Value) -> Option<Candidate<'_>> {
    first_choice(body)?
        .get("text")
        .and_then(Value::as_str)
        .map(Candidate::Text)
}

fn root_content(body: &Value) -> Option<Candidate<'_>> {
    content_candidate(body.get("content")?)
}

// Text parsers

fn parse_direct(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

fn fenced_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_-]*)[ \t]*\r?\n(.*?)\r?\n?[ \t]*```")
            .expect("fenced block pattern is valid")
    })
}

/// Inner contents of ```json (or untagged) fences, json-tagged first
fn parse_fenced_block(text: &str) -> Option<Value> {
    let mut tagged = Vec::new();
    let mut untagged = Vec::new();

    for captures in fenced_block_regex().captures_iter(text) {
        let tag = captures.get(1).map_or("", |m| m.as_str());
        let Some(inner) = captures.get(2) else {
            continue;
        };
        if tag.eq_ignore_ascii_case("json") {
            tagged.push(inner.as_str());
        } else if tag.is_empty() {
            untagged.push(inner.as_str());
        }
    }

    tagged
        .into_iter()
        .chain(untagged)
        .find_map(|inner| serde_json::from_str::<Value>(inner.trim()).ok())
        .filter(Value::is_object)
}

/// Outermost `{ ... }` span in free text
fn parse_embedded_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start >= end {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}
