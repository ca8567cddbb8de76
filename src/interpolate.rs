//! Client-side parameter substitution.
//!
//! Statements carry `{}` placeholders; [`interpolate`] replaces each with
//! the SQL literal form of the matching parameter, skipping placeholder
//! lookalikes inside string literals, quoted identifiers, comments, and
//! dollar-quoted bodies. The substituted text is what goes to the server,
//! so every value passes through [`sql_literal`] and nothing else.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::NadoError;
use crate::types::SqlValue;

lazy_static! {
    static ref DECIMAL_LITERAL: Regex = Regex::new(r"^[+-]?\d+(\.\d+)?$").unwrap();
}

/// Render one value as a SQL literal.
///
/// NULL and numeric values render unquoted; timestamps and dates render as
/// quoted `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DD`; booleans as `1`/`0`; blobs
/// as `X'<hex>'`; everything else is stringified with single quotes doubled
/// and wrapped in single quotes.
///
/// # Errors
///
/// `ParameterError` for non-finite floats and for decimal text that is not
/// a plain numeric literal (both would otherwise leak unquoted into the
/// statement).
pub fn sql_literal(value: &SqlValue) -> Result<String, NadoError> {
    match value {
        SqlValue::Null => Ok("NULL".to_string()),
        SqlValue::Int(i) => Ok(i.to_string()),
        SqlValue::Float(f) => {
            if !f.is_finite() {
                return Err(NadoError::ParameterError(format!(
                    "non-finite float {f} cannot be rendered into SQL"
                )));
            }
            Ok(format!("{f}"))
        }
        SqlValue::Decimal(d) => {
            if !DECIMAL_LITERAL.is_match(d) {
                return Err(NadoError::ParameterError(format!(
                    "decimal value {d:?} is not a numeric literal"
                )));
            }
            Ok(d.clone())
        }
        SqlValue::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        SqlValue::Timestamp(ts) => Ok(format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S"))),
        SqlValue::Date(d) => Ok(format!("'{}'", d.format("%Y-%m-%d"))),
        SqlValue::Blob(bytes) => {
            let mut hex = String::with_capacity(bytes.len() * 2);
            for b in bytes {
                hex.push_str(&format!("{b:02X}"));
            }
            Ok(format!("X'{hex}'"))
        }
        SqlValue::Text(s) => Ok(quote_text(s)),
        SqlValue::Json(j) => Ok(quote_text(&j.to_string())),
    }
}

fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Scanner state while walking statement text.
enum ScanState {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
}

/// Substitute `{}` placeholders in `sql` with the literals for `params`.
///
/// An empty parameter list returns the statement unchanged without
/// scanning, so raw SQL containing braces stays untouched when no
/// substitution was asked for.
///
/// # Errors
///
/// `ParameterError` when the placeholder count and the parameter count
/// differ, or when a value fails [`sql_literal`].
pub fn interpolate(sql: &str, params: &[SqlValue]) -> Result<String, NadoError> {
    if params.is_empty() {
        return Ok(sql.to_string());
    }

    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + params.len() * 8);
    let mut state = ScanState::Normal;
    let mut last = 0;
    let mut used = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match state {
            ScanState::Normal => match b {
                b'\'' => {
                    state = ScanState::SingleQuoted;
                    i += 1;
                }
                b'"' => {
                    state = ScanState::DoubleQuoted;
                    i += 1;
                }
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    state = ScanState::LineComment;
                    i += 2;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    state = ScanState::BlockComment(1);
                    i += 2;
                }
                b'$' => {
                    // Dollar-quoted body ($tag$ ... $tag$); skipped whole.
                    i = dollar_quote_end(sql, i).unwrap_or(i + 1);
                }
                b'{' if bytes.get(i + 1) == Some(&b'}') => {
                    let Some(value) = params.get(used) else {
                        return Err(NadoError::ParameterError(format!(
                            "SQL has more placeholders than the {} parameters provided",
                            params.len()
                        )));
                    };
                    out.push_str(&sql[last..i]);
                    out.push_str(&sql_literal(value)?);
                    used += 1;
                    i += 2;
                    last = i;
                }
                _ => i += 1,
            },
            ScanState::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        // Doubled quote stays inside the literal.
                        i += 2;
                    } else {
                        state = ScanState::Normal;
                        i += 1;
                    }
                } else {
                    i += 1;
                }
            }
            ScanState::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(i + 1) == Some(&b'"') {
                        i += 2;
                    } else {
                        state = ScanState::Normal;
                        i += 1;
                    }
                } else {
                    i += 1;
                }
            }
            ScanState::LineComment => {
                if b == b'\n' {
                    state = ScanState::Normal;
                }
                i += 1;
            }
            ScanState::BlockComment(depth) => {
                if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        ScanState::Normal
                    } else {
                        ScanState::BlockComment(depth - 1)
                    };
                    i += 2;
                } else if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
                    state = ScanState::BlockComment(depth + 1);
                    i += 2;
                } else {
                    i += 1;
                }
            }
        }
    }

    out.push_str(&sql[last..]);
    if used != params.len() {
        return Err(NadoError::ParameterError(format!(
            "SQL has {used} placeholders but {} parameters were provided",
            params.len()
        )));
    }
    Ok(out)
}

/// If `start` opens a dollar-quoted body, return the index just past its
/// closing delimiter (or the end of the text when unterminated).
fn dollar_quote_end(sql: &str, start: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut j = start + 1;
    while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
        j += 1;
    }
    if j >= bytes.len() || bytes[j] != b'$' {
        return None;
    }
    // Tags cannot start with a digit; $1 is a positional parameter.
    if bytes[start + 1].is_ascii_digit() {
        return None;
    }
    let delim = &sql[start..=j];
    match sql[j + 1..].find(delim) {
        Some(k) => Some(j + 1 + k + delim.len()),
        None => Some(sql.len()),
    }
}
