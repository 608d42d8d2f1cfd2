//! JSON recovery from model replies.
//!
//! Structured output keeps most replies clean, but models still wrap JSON in
//! markdown fences or surrounding prose from time to time, and long batches
//! can truncate mid-object. `extract_json` pulls the first parseable object
//! or array out of a reply; the pipelines feed the result straight into
//! schema coercion.

use regex::Regex;
use serde_json::Value;

use crate::error::LlmError;

/// Extracts a parseable JSON object or array from a model reply.
///
/// Strategies, in order:
/// 1. Content of a ```json (or generic) code fence
/// 2. The whole reply as-is
/// 3. A reply that opens with `{` or `[` but carries trailing prose
/// 4. The largest parseable object anywhere in the reply (reasoning prose
///    may contain small example objects before the real payload)
/// 5. The first balanced span anywhere (covers arrays inside prose)
///
/// Fails with `LlmError::ParseError`; the message distinguishes truncated
/// JSON from a reply with no JSON at all.
pub fn extract_json(content: &str) -> Result<Value, LlmError> {
    let trimmed = content.trim();

    if let Some(candidate) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(&candidate) {
            return Ok(value);
        }
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    for opener in ['{', '['] {
        if trimmed.starts_with(opener) {
            if let Some(candidate) = balanced_span(trimmed, opener) {
                if let Ok(value) = serde_json::from_str(candidate) {
                    return Ok(value);
                }
            }
        }
    }

    if let Some(candidate) = largest_object(trimmed) {
        if let Ok(value) = serde_json::from_str(&candidate) {
            return Ok(value);
        }
    }

    for opener in ['{', '['] {
        if let Some(candidate) = balanced_span(trimmed, opener) {
            if let Ok(value) = serde_json::from_str(candidate) {
                return Ok(value);
            }
        }
    }

    Err(parse_failure(trimmed))
}

/// Returns the content of the first fenced code block, if any.
fn fenced_block(content: &str) -> Option<String> {
    let re = Regex::new(r"```(?:\w+)?\s*\n?([\s\S]*?)\n?```").ok()?;
    re.captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Returns the first balanced `{...}` or `[...]` span, scanning from the
/// first occurrence of `opener`. String literals and escapes are honored;
/// only the opener's own delimiter pair is counted, which is enough since
/// any nested mismatch makes the candidate unparseable anyway.
fn balanced_span(content: &str, opener: char) -> Option<&str> {
    let closer = match opener {
        '{' => '}',
        _ => ']',
    };
    let start = content.find(opener)?;
    let span = &content[start..];

    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in span.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == opener && !in_string => depth += 1,
            c if c == closer && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&span[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Finds every balanced, parseable object in the reply and returns the
/// largest (later occurrences win ties). Covers replies where reasoning
/// prose contains small example objects before the real payload.
fn largest_object(content: &str) -> Option<String> {
    let mut candidates: Vec<(usize, &str)> = Vec::new();

    for (start, c) in content.char_indices() {
        if c != '{' {
            continue;
        }
        if let Some(candidate) = balanced_span(&content[start..], '{') {
            if serde_json::from_str::<Value>(candidate).is_ok() {
                candidates.push((start, candidate));
            }
        }
    }

    candidates
        .into_iter()
        .max_by(|(pos_a, json_a), (pos_b, json_b)| {
            match json_a.len().cmp(&json_b.len()) {
                std::cmp::Ordering::Equal => pos_a.cmp(pos_b),
                other => other,
            }
        })
        .map(|(_, json)| json.to_string())
}

/// Counts unclosed delimiters to tell a truncated reply from one with no
/// JSON at all.
fn unclosed_delimiters(content: &str) -> (usize, usize, bool) {
    let mut braces: isize = 0;
    let mut brackets: isize = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for c in content.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => braces += 1,
            '}' if !in_string => braces -= 1,
            '[' if !in_string => brackets += 1,
            ']' if !in_string => brackets -= 1,
            _ => {}
        }
    }

    (braces.max(0) as usize, brackets.max(0) as usize, in_string)
}

fn parse_failure(content: &str) -> LlmError {
    let (braces, brackets, in_string) = unclosed_delimiters(content);
    if braces > 0 || brackets > 0 || in_string {
        return LlmError::ParseError(format!(
            "reply looks truncated: {braces} unclosed braces, {brackets} unclosed brackets"
        ));
    }

    let preview: String = content.chars().take(60).collect();
    LlmError::ParseError(format!("no JSON found in reply starting with '{preview}'"))
}
