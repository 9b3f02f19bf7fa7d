//! Access log line parsing.
//!
//! Expected shape:
//! `96.7.4.14 - - [24/Apr/2011:04:20:11 -0400] "GET /cat.jpg HTTP/1.1" 200 12433`
//!
//! Real inputs are ragged: truncated lines, missing request sections,
//! stray whitespace. Parsing never fails; a field that cannot be located
//! is left empty and downstream stages treat empty as unavailable.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Positional fields extracted from one raw line. Any field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFields {
    pub client_addr: String,
    /// `24/Apr/2011:04:20:11`, the leading `[` already stripped.
    pub timestamp: String,
    pub method: String,
    pub request_target: String,
    pub status_code: String,
    pub byte_count: String,
}

// Whitespace-token offsets of the log format.
const ADDR_FIELD: usize = 0;
const TIMESTAMP_FIELD: usize = 3;
const STATUS_FIELD: usize = 8;
const BYTES_FIELD: usize = 9;

/// Extract fields from one line using two tokenizations: whitespace for the
/// positional fields, quotes for the HTTP request line.
pub fn parse_line(line: &str) -> ParsedFields {
    let fields: Vec<&str> = line.split_whitespace().collect();

    let client_addr = fields
        .get(ADDR_FIELD)
        .map(|f| f.to_string())
        .unwrap_or_default();

    // Some records are truncated mid-timestamp; a bare "[" is as good as
    // nothing.
    let timestamp = fields
        .get(TIMESTAMP_FIELD)
        .copied()
        .filter(|f| f.len() > 2)
        .map(|f| f.strip_prefix('[').unwrap_or(f).to_string())
        .unwrap_or_default();

    let mut request = line
        .split('"')
        .nth(1)
        .unwrap_or_default()
        .split_whitespace();
    let method = request.next().unwrap_or_default().to_string();
    let request_target = request.next().unwrap_or_default().to_string();

    let status_code = fields
        .get(STATUS_FIELD)
        .map(|f| f.to_string())
        .unwrap_or_default();
    let byte_count = fields
        .get(BYTES_FIELD)
        .map(|f| f.to_string())
        .unwrap_or_default();

    ParsedFields {
        client_addr,
        timestamp,
        method,
        request_target,
        status_code,
        byte_count,
    }
}

/// The structured record persisted by the store pipelines. Field names on
/// the wire match the stored document schema; empty fields are omitted
/// entirely and come back empty on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(default, skip_serializing_if = "String::is_empty", rename = "reqTime")]
    pub req_time: String,
    #[serde(default, skip_serializing_if = "String::is_empty", rename = "reqMethod")]
    pub req_method: String,
    #[serde(default, skip_serializing_if = "String::is_empty", rename = "reqURI")]
    pub req_uri: String,
}

impl AccessLogRecord {
    pub fn from_fields(fields: &ParsedFields) -> Self {
        AccessLogRecord {
            ip: fields.client_addr.clone(),
            req_time: fields.timestamp.clone(),
            req_method: fields.method.clone(),
            req_uri: fields.request_target.clone(),
        }
    }

    pub fn to_wire(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_wire(wire: &str) -> Result<Self> {
        Ok(serde_json::from_str(wire)?)
    }
}
