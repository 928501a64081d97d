//! Lenient readers for user-authored content files.
//!
//! Chapter metadata and workflow files come from tutorial authors on
//! arbitrary platforms, so they frequently carry a UTF-8 BOM or stray bytes
//! from a legacy editor encoding. Reads are an ordered list of decode
//! attempts returning the first success: strict UTF-8 (BOM-tolerant) first,
//! then a lossy pass that substitutes invalid sequences. A decode attempt
//! never aborts the caller; only I/O errors and JSON syntax errors surface.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::CommonError;

/// Read a text file, tolerating a UTF-8 BOM and invalid byte sequences.
///
/// Fails only on I/O errors; undecodable bytes degrade via lossy conversion
/// rather than failing the read.
pub fn read_text_lenient(path: &Path) -> Result<String, CommonError> {
    let bytes = std::fs::read(path)?;
    Ok(decode_lenient(&bytes))
}

/// Read a JSON file as a top-level object, tolerating BOM/encoding damage.
///
/// Returns the object's key/value map. Non-object top-level values are
/// reported as JSON errors so callers can degrade uniformly.
pub fn read_json_object(path: &Path) -> Result<Map<String, Value>, CommonError> {
    let text = read_text_lenient(path)?;
    let value: Value = serde_json::from_str(&text)?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CommonError::Json(serde::de::Error::custom(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        )))),
    }
}

fn decode_lenient(bytes: &[u8]) -> String {
    let bytes = strip_bom(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
