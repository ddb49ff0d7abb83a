//! Listing response parser
//!
//! Stateless functions that turn the listing endpoint's JSON envelope into a
//! [`ListingPage`]. The server is loose with types (identifiers arrive as
//! numbers or strings, flags as `0/1`, numeric strings or booleans), so every
//! field goes through a tolerant accessor rather than a strict serde model.

use crate::fetcher::{FetcherError, FetcherResult, ListingPage};
use crate::Record;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Stateless parser for listing endpoint responses
pub struct ShareParser;

impl ShareParser {
    /// Parse a raw response body
    ///
    /// # Errors
    /// `ParseError` if the body is not a valid envelope,
    /// `ProtocolError` if the envelope's `errno` is non-zero
    pub fn parse_body(body: &str) -> FetcherResult<ListingPage> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| FetcherError::ParseError(format!("Invalid JSON body: {e}")))?;
        Self::parse_envelope(&value)
    }

    /// Parse a decoded envelope `{errno, has_more, records}`
    pub fn parse_envelope(value: &Value) -> FetcherResult<ListingPage> {
        let envelope = value
            .as_object()
            .ok_or_else(|| FetcherError::ParseError("Envelope is not an object".to_string()))?;

        let errno = envelope
            .get("errno")
            .and_then(as_i64_lenient)
            .ok_or_else(|| FetcherError::ParseError("Missing or invalid errno".to_string()))?;

        if errno != 0 {
            return Err(FetcherError::ProtocolError { errno });
        }

        let has_more = envelope.get("has_more").map(as_flag).unwrap_or(false);

        let records = match envelope.get("records") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(Self::parse_record)
                .collect::<FetcherResult<Vec<_>>>()?,
            Some(_) => {
                return Err(FetcherError::ParseError(
                    "records is not an array".to_string(),
                ))
            }
        };

        Ok(ListingPage { records, has_more })
    }

    /// Parse a single record
    ///
    /// # Format
    /// `{fs_id, server_filename, isdir, size, path}`; only `fs_id` and
    /// `server_filename` are required.
    pub fn parse_record(value: &Value) -> FetcherResult<Record> {
        let record = value
            .as_object()
            .ok_or_else(|| FetcherError::ParseError("Record is not an object".to_string()))?;

        let external_id = record
            .get("fs_id")
            .and_then(id_to_string)
            .ok_or_else(|| FetcherError::ParseError("Record missing fs_id".to_string()))?;

        let display_name = record
            .get("server_filename")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                FetcherError::ParseError(format!("Record {external_id} missing server_filename"))
            })?
            .to_string();

        let is_container = record.get("isdir").map(as_flag).unwrap_or(false);

        let size_bytes = if is_container {
            0
        } else {
            record
                .get("size")
                .and_then(as_i64_lenient)
                .map(|size| size.max(0) as u64)
                .unwrap_or(0)
        };

        let path = record
            .get("path")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Record {
            external_id,
            display_name,
            is_container,
            size_bytes,
            path,
        })
    }
}

/// Identifier as string; accepts JSON numbers and non-empty strings.
fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_i64_lenient(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `1`, `"1"` and `true` are set; everything else is clear.
fn as_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        other => as_i64_lenient(other) == Some(1),
    }
}

/// Serde helper accepting identifiers written as numbers or strings.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected identifier string or number, got {other}"
        ))),
    }
}
