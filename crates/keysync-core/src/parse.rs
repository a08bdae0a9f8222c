//! Safe parsing helpers for raw stored strings.
//!
//! Parse failures here are never surfaced to callers: they are logged and
//! collapse to `None`, and the manager substitutes its initial value.

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::types::ParseMode;

/// Parse a raw stored string according to `mode`.
///
/// JSON mode is strict. Relaxed mode tries strict JSON first, then
/// rewrites a JavaScript-style literal (single-quoted strings, unquoted
/// identifier keys, trailing commas, `undefined`) into JSON and parses
/// that. Relaxed mode exists for data written by legacy producers; stored
/// data is never evaluated as code, and every fallback into the rewrite is
/// logged.
pub fn parse_str<T: DeserializeOwned>(raw: &str, mode: ParseMode) -> Option<T> {
    match mode {
        ParseMode::Json => match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(error = %err, "failed to parse stored data as JSON");
                None
            }
        },
        ParseMode::Relaxed => {
            if let Ok(value) = serde_json::from_str(raw) {
                return Some(value);
            }
            warn!("stored data is not strict JSON, falling back to relaxed literal parsing");
            let normalized = match normalize_literal(raw) {
                Some(normalized) => normalized,
                None => {
                    warn!("relaxed literal parsing failed: unterminated string");
                    return None;
                }
            };
            match serde_json::from_str(&normalized) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(error = %err, "relaxed literal parsing failed");
                    None
                }
            }
        }
    }
}

/// Strict JSON validity check.
///
/// Agrees with [`parse_str`] in JSON mode for untyped targets:
/// `is_valid_json(s)` holds exactly when `parse_str::<serde_json::Value>`
/// returns `Some`.
pub fn is_valid_json(raw: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(raw).is_ok()
}

/// Rewrite a JavaScript-style object/array/primitive literal into JSON
/// text.
///
/// Handles single-quoted strings, unquoted identifier keys, trailing
/// commas and `undefined`. Bare identifiers outside of keyword positions
/// become strings, which is as permissive as the legacy producers need.
/// Returns `None` only for input that cannot be tokenized (an unterminated
/// string); anything else is left for the JSON parser to accept or reject.
fn normalize_literal(raw: &str) -> Option<String> {
    let chars: Vec<char> = raw.chars().collect();
    let len = chars.len();
    let mut out = String::with_capacity(raw.len() + 8);
    let mut i = 0;

    while i < len {
        let c = chars[i];
        if c == '\'' || c == '"' {
            let quote = c;
            out.push('"');
            i += 1;
            loop {
                let c = *chars.get(i)?;
                i += 1;
                if c == quote {
                    out.push('"');
                    break;
                }
                if c == '\\' {
                    let escaped = *chars.get(i)?;
                    i += 1;
                    if escaped == '\'' {
                        // \' is not a JSON escape; emit the quote itself.
                        out.push('\'');
                    } else {
                        out.push('\\');
                        out.push(escaped);
                    }
                } else if c == '"' {
                    out.push('\\');
                    out.push('"');
                } else {
                    out.push(c);
                }
            }
        } else if c == ',' {
            // Drop trailing commas before a closing bracket.
            let mut j = i + 1;
            while j < len && chars[j].is_whitespace() {
                j += 1;
            }
            if !(j < len && (chars[j] == '}' || chars[j] == ']')) {
                out.push(',');
            }
            i += 1;
        } else if c.is_ascii_digit()
            || (c == '-' && chars.get(i + 1).is_some_and(|next| next.is_ascii_digit()))
        {
            // Pass number-ish tokens (including exponents) through
            // verbatim; the JSON parser decides whether they are valid.
            out.push(c);
            i += 1;
            while i < len
                && (chars[i].is_ascii_alphanumeric()
                    || chars[i] == '.'
                    || chars[i] == '+'
                    || chars[i] == '-')
            {
                out.push(chars[i]);
                i += 1;
            }
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < len && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            match word.as_str() {
                "true" | "false" | "null" => out.push_str(&word),
                "undefined" => out.push_str("null"),
                _ => {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                }
            }
        } else {
            out.push(c);
            i += 1;
        }
    }

    Some(out)
}
