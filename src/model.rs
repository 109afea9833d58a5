//! Caller-facing data model
//!
//! Everything that crosses the boundary to the request layer: access modes,
//! operations, result payloads and the response envelope. All of it is
//! serde-serializable with camelCase field names.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ConsoleError;

// =============================================================================
// Access Mode
// =============================================================================

/// Which client a request goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Non-transactional access: every operation is visible immediately
    #[serde(rename = "rawkv", alias = "direct")]
    Direct,

    /// begin/commit/rollback units with multi-key atomicity
    #[serde(rename = "txn", alias = "transactional")]
    Transactional,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Direct, Mode::Transactional];

    /// Wire name used in request parameters
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Direct => "rawkv",
            Mode::Transactional => "txn",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Direct => f.write_str("direct"),
            Mode::Transactional => f.write_str("transactional"),
        }
    }
}

impl FromStr for Mode {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rawkv" | "raw" | "direct" => Ok(Mode::Direct),
            "txn" | "txnkv" | "transactional" => Ok(Mode::Transactional),
            other => Err(ConsoleError::Validation(format!(
                "invalid mode '{}': must be 'rawkv' or 'txn'",
                other
            ))),
        }
    }
}

// =============================================================================
// Operations
// =============================================================================

/// Kind of a single mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Put,
    Delete,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Put => f.write_str("put"),
            OpKind::Delete => f.write_str("delete"),
        }
    }
}

/// One entry of a batch request.
///
/// The kind is always explicit. Inferring "delete" from an empty value would
/// make "put an empty value" inexpressible, so this model never does it.
///
/// Request bodies are JSON, so `key` and `value` are UTF-8 text. The namespace
/// and client layers take arbitrary bytes; keys that are not valid UTF-8 are
/// reachable only through [`KeyOps`](crate::ops::KeyOps) and the scan paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub mode: Mode,
    #[serde(rename = "op")]
    pub kind: OpKind,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Operation {
    pub fn put(mode: Mode, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            mode,
            kind: OpKind::Put,
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn delete(mode: Mode, key: impl Into<String>) -> Self {
        Self {
            mode,
            kind: OpKind::Delete,
            key: key.into(),
            value: None,
        }
    }
}

/// One entry of an all-or-nothing transaction request.
///
/// Like [`Operation`], keys and values are UTF-8 text at this boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicOperation {
    #[serde(rename = "type")]
    pub kind: OpKind,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl AtomicOperation {
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: OpKind::Put,
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            kind: OpKind::Delete,
            key: key.into(),
            value: None,
        }
    }
}

// =============================================================================
// Key-Value Pairs
// =============================================================================

/// An ordered key-value pair as read from the backend
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KvPair {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl KvPair {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Rendered as text; bytes that are not UTF-8 are replaced.
impl Serialize for KvPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("KvPair", 2)?;
        state.serialize_field("key", &String::from_utf8_lossy(&self.key))?;
        state.serialize_field("value", &String::from_utf8_lossy(&self.value))?;
        state.end()
    }
}

// =============================================================================
// Result Payloads
// =============================================================================

/// One page of a prefix scan.
///
/// `total` counts the pairs seen by the single bounded scan that produced
/// this page, not the size of the keyspace. When the scan filled its window
/// `total_is_estimate` is set and more keys may exist past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(rename = "data")]
    pub items: Vec<KvPair>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub total_is_estimate: bool,
}

/// Outcome of one batch entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub key: String,
    pub operation: OpKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-entry outcomes of a batch, in submission order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub results: Vec<BatchItem>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl BatchResult {
    pub fn push(&mut self, item: BatchItem) {
        if item.success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.results.push(item);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxnSummary {
    pub operation_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllReport {
    pub deleted_count: usize,
    #[serde(rename = "type")]
    pub mode: Mode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteKeysReport {
    pub deleted_count: usize,
    pub not_found_count: usize,
    pub total_requested: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    pub connected: bool,
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconfigureReport {
    pub status: String,
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeStats {
    pub connected: bool,
    /// Managed keys counted by a bounded scan; capped at the scan cap
    pub sample_keys: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(rename = "rawkv")]
    pub direct: ModeStats,
    #[serde(rename = "txn")]
    pub transactional: ModeStats,
    pub connected: bool,
}

// =============================================================================
// Response Envelope
// =============================================================================

/// What every console operation hands back to the request layer.
///
/// On failure `data` is always `None`; there are no partial payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>, err: &ConsoleError) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: Some(err.to_string()),
        }
    }
}
