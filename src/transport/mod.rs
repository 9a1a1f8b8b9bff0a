//! Transport seam: one blocking remote procedure call against one Odoo service.
//! The orchestration layer only sees these traits; `xmlrpc` is the shipped implementation.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub mod xmlrpc;

pub use xmlrpc::{XmlRpcConnector, XmlRpcTransport};

/// Odoo's two XML-RPC services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Login and version probing.
    Common,
    /// Model method dispatch (`execute_kw`).
    Object,
}

impl Service {
    pub fn path(&self) -> &'static str {
        match self {
            Service::Common => "/xmlrpc/2/common",
            Service::Object => "/xmlrpc/2/object",
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Remote fault as reported by the server.
    #[error("Fault {code}: '{message}'")]
    Fault { code: i64, message: String },
    #[error("connect: {0}")]
    Connect(String),
    #[error("http: {0}")]
    Http(String),
    /// A parameter has no XML-RPC representation.
    #[error("encode: {0}")]
    Encode(String),
    #[error("decode: {0}")]
    Decode(String),
}

/// A handle to one service endpoint. `call` blocks until the server replies.
pub trait Transport: Send + Sync {
    fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError>;

    /// Endpoint description for logs.
    fn ident(&self) -> String;
}

/// Opens transport handles for a service. Opening must not block on the network.
pub trait Connector: Send + Sync {
    fn open(&self, service: Service) -> Result<Arc<dyn Transport>, TransportError>;
}
