//! Tolerant JSON extraction from model output.
//!
//! Models wrap JSON in prose or code fences. Extraction tries, in order:
//! a direct parse of the whole text, the contents of each fenced code block,
//! and finally the first balanced `{...}` or `[...]` span that parses.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").ok())
        .as_ref()
}

/// Locates a JSON value in `text`.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(fence) = fence_regex() {
        let fenced = fence
            .captures_iter(trimmed)
            .filter_map(|c| c.get(1))
            .find_map(|body| serde_json::from_str::<Value>(body.as_str().trim()).ok());
        if fenced.is_some() {
            return fenced;
        }
    }

    scan_balanced(trimmed)
}

fn scan_balanced(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .find_map(|(start, _)| {
            let rest = &text[start..];
            let end = balanced_end(rest)?;
            serde_json::from_str::<Value>(&rest[..end]).ok()
        })
}

/// Byte length of the balanced span starting at the first char of `text`.
///
/// Brackets inside string literals are ignored and escapes are honored.
fn balanced_end(text: &str) -> Option<usize> {
    let mut closers = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                if closers.pop() != Some(c) {
                    return None;
                }
                if closers.is_empty() {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}
