//! Odoo XML-RPC client.
//!
//! The client keeps one authenticated session per [`OdooClient`], renews it lazily once
//! the configured expiry elapses, runs every blocking remote call on a worker thread raced
//! against the caller's [`CallContext`], and classifies remote fault text into
//! [`OdooError`] variants.

pub mod config;
pub mod error;
pub mod fault;
pub mod logging;
pub mod types;
pub mod transport;
pub mod executor;
pub mod session;
pub mod client;
pub mod crud;
pub mod cli;

pub use client::OdooClient;
pub use config::ClientConfig;
pub use error::{OdooError, OdooResult};
pub use executor::{CallContext, CallRequest, CancelHandle};
pub use fault::{FaultKind, RemoteFault};
pub use session::{Connection, Credentials, SessionInfo, SessionManager};
pub use types::{Data, Domain, DomainTerm, Fields, Model, OdooContext, Options, Record};

// Test-only printing helper: expands to eprintln! during tests and debug builds.
// Usage in tests: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In release builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
