//! Client error model.
//! Every public operation returns [`OdooResult`]; remote faults arrive already classified.

use thiserror::Error;

use crate::fault::{FaultKind, RemoteFault};

#[derive(Debug, Clone, Error)]
pub enum OdooError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("no record found for the given criteria: {0}")]
    RecordNotFound(String),
    #[error("invalid Odoo model: {}", .0.message)]
    InvalidModel(RemoteFault),
    #[error("invalid Odoo method for the model: {}", .0.message)]
    InvalidMethod(RemoteFault),
    #[error("Odoo XML-RPC call failed: {}", .0.message)]
    Rpc(RemoteFault),
    #[error("invalid Odoo RPC response: {0}")]
    InvalidResponse(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("call cancelled")]
    Cancelled,
    #[error("call deadline exceeded")]
    DeadlineExceeded,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type OdooResult<T> = Result<T, OdooError>;

impl OdooError {
    pub fn code_str(&self) -> &'static str {
        match self {
            OdooError::Authentication(_) => "auth_failed",
            OdooError::RecordNotFound(_) => "not_found",
            OdooError::InvalidModel(_) => "invalid_model",
            OdooError::InvalidMethod(_) => "invalid_method",
            OdooError::Rpc(_) => "rpc_error",
            OdooError::InvalidResponse(_) => "invalid_response",
            OdooError::InvalidInput(_) => "invalid_input",
            OdooError::Cancelled => "cancelled",
            OdooError::DeadlineExceeded => "deadline_exceeded",
            OdooError::Transport(_) => "transport_error",
            OdooError::Config(_) => "config_error",
            OdooError::Internal(_) => "internal",
        }
    }

    /// The classified fault behind a remote failure, if any.
    pub fn fault(&self) -> Option<&RemoteFault> {
        match self {
            OdooError::InvalidModel(f) | OdooError::InvalidMethod(f) | OdooError::Rpc(f) => Some(f),
            _ => None,
        }
    }

    /// True when the caller's context fired, not the remote side.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, OdooError::Cancelled | OdooError::DeadlineExceeded)
    }

    pub fn from_fault(fault: RemoteFault) -> Self {
        match fault.kind {
            FaultKind::InvalidModel => OdooError::InvalidModel(fault),
            FaultKind::InvalidMethod => OdooError::InvalidMethod(fault),
            FaultKind::Remote => OdooError::Rpc(fault),
        }
    }
}

impl From<serde_json::Error> for OdooError {
    fn from(err: serde_json::Error) -> Self {
        OdooError::InvalidResponse(err.to_string())
    }
}
