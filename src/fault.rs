//! Remote fault classification.
//! Odoo reports every server-side failure as an untyped fault string, so the kind of
//! failure is recovered from well-known phrases in that text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static FAULT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)Fault (-?\d+): '(.*)'").expect("fault pattern"));

const FAULT_PREFIX: &str = "XML-RPC fault: ";

const INVALID_MODEL_PHRASES: &[&str] = &[
    "The model does not exist",
    "No model named",
    "not found in registry",
];

const INVALID_METHOD_PHRASES: &[&str] = &[
    "Object has no method",
    "method does not exist",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The target model is unknown to the server.
    InvalidModel,
    /// The model exists but the method does not.
    InvalidMethod,
    /// Anything else.
    Remote,
}

/// A classified remote failure. `raw` keeps the full text as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFault {
    pub raw: String,
    pub code: Option<i64>,
    pub message: String,
    pub kind: FaultKind,
}

impl RemoteFault {
    pub fn is_invalid_model(&self) -> bool { self.kind == FaultKind::InvalidModel }
    pub fn is_invalid_method(&self) -> bool { self.kind == FaultKind::InvalidMethod }
}

/// Split raw fault text into (code, message).
fn split_fault(raw: &str) -> (Option<i64>, String) {
    if let Some(caps) = FAULT_RE.captures(raw) {
        let code = caps.get(1).and_then(|m| m.as_str().parse::<i64>().ok());
        let message = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
        return (code, message);
    }
    if let Some(idx) = raw.find(FAULT_PREFIX) {
        return (None, raw[idx + FAULT_PREFIX.len()..].to_string());
    }
    (None, raw.to_string())
}

fn kind_of(message: &str) -> FaultKind {
    if INVALID_MODEL_PHRASES.iter().any(|p| message.contains(p))
        || (message.contains("'object' object has no attribute") && message.contains("model"))
    {
        return FaultKind::InvalidModel;
    }
    if INVALID_METHOD_PHRASES.iter().any(|p| message.contains(p))
        || (message.contains("missing 1 required positional argument") && message.contains("self"))
    {
        return FaultKind::InvalidMethod;
    }
    FaultKind::Remote
}

/// Classify raw remote error text. Model phrases are checked before method phrases.
pub fn classify(raw: &str) -> RemoteFault {
    let (code, message) = split_fault(raw);
    let kind = kind_of(&message);
    RemoteFault { raw: raw.to_string(), code, message, kind }
}
