//! Resilient JSON extraction from model text
//!
//! The text generator is not bound to emit valid JSON. Extraction strips code
//! fences, tries a strict parse, then a structural repair pass, and finally
//! returns the caller's fallback. It never fails.

use serde::de::DeserializeOwned;
use tracing::debug;

/// Remove a surrounding Markdown code fence (with or without language tag)
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Language tag only counts when followed by whitespace
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        let after_tag = &rest[tag_len..];
        text = if tag_len > 0 && after_tag.starts_with(char::is_whitespace) {
            after_tag
        } else {
            rest
        };
    }

    let text = text.trim();
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Parse model text into `T`, returning `fallback` if nothing usable is found
pub fn extract<T: DeserializeOwned>(raw: &str, fallback: T) -> T {
    let text = strip_code_fences(raw);

    match serde_json::from_str::<T>(text) {
        Ok(value) => value,
        Err(strict_err) => {
            // Prose may itself contain brackets; try each later opening bracket as the root
            let mut last_err = None;
            for (start, _) in text.match_indices(['{', '[']) {
                match serde_json::from_str::<T>(&repair_json(&text[start..])) {
                    Ok(value) => {
                        debug!(
                            error = %strict_err,
                            offset = start,
                            "Model output parsed after structural repair"
                        );
                        return value;
                    }
                    Err(err) => last_err = Some(err),
                }
            }

            debug!(
                strict_error = %strict_err,
                repair_error = ?last_err.map(|e| e.to_string()),
                "Model output unparsable, using fallback"
            );
            fallback
        }
    }
}

/// Best-effort structural repair of almost-JSON
///
/// Handles leading prose, trailing commas, bare keys, single-quoted strings,
/// Python-style literals, an unterminated string, a dangling `:`, unbalanced
/// or mismatched brackets, and trailing text after the root value.
pub fn repair_json(text: &str) -> String {
    let Some(start) = text.find(['{', '[']) else {
        return text.trim().to_string();
    };

    let mut out = String::with_capacity(text.len() + 8);
    let mut closers: Vec<char> = Vec::new();
    let mut chars = text[start..].chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => copy_string(&mut chars, c, &mut out),
            '{' => {
                closers.push('}');
                out.push(c);
            }
            '[' => {
                closers.push(']');
                out.push(c);
            }
            '}' | ']' => {
                if !closers.contains(&c) {
                    continue;
                }
                while let Some(expected) = closers.pop() {
                    finish_value(&mut out);
                    out.push(expected);
                    if expected == c {
                        break;
                    }
                }
                if closers.is_empty() {
                    break;
                }
            }
            c if c.is_ascii_digit() || c == '-' => {
                out.push(c);
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_digit() || matches!(n, '.' | 'e' | 'E' | '+' | '-') {
                        out.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&n) = chars.peek() {
                    if n.is_alphanumeric() || n == '_' {
                        word.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "true" | "True" | "TRUE" => out.push_str("true"),
                    "false" | "False" | "FALSE" => out.push_str("false"),
                    "null" | "None" | "NULL" | "undefined" => out.push_str("null"),
                    _ => {
                        out.push('"');
                        out.push_str(&word);
                        out.push('"');
                    }
                }
            }
            _ => out.push(c),
        }
    }

    while let Some(closer) = closers.pop() {
        finish_value(&mut out);
        out.push(closer);
    }

    out
}

/// Copy a string literal, normalizing it to a double-quoted JSON string
fn copy_string<I>(chars: &mut std::iter::Peekable<I>, quote: char, out: &mut String)
where
    I: Iterator<Item = char>,
{
    out.push('"');
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                match chars.next() {
                    // `\'` is not a JSON escape
                    Some('\'') => out.push('\''),
                    Some(escaped) => {
                        out.push('\\');
                        out.push(escaped);
                    }
                    None => {}
                }
            }
            c if c == quote => {
                out.push('"');
                return;
            }
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    // Unterminated literal
    out.push('"');
}

/// Prepare `out` for a closing bracket: drop a trailing comma, fill a dangling `:`
fn finish_value(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    if out.ends_with(',') {
        out.pop();
    } else if out.ends_with(':') {
        out.push_str("null");
    }
}
