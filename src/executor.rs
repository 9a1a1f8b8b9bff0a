//! Call executor: runs one blocking transport call on a worker thread and races it
//! against the caller's [`CallContext`]. When the context fires first the caller gets
//! `Cancelled`/`DeadlineExceeded` right away; the remote call keeps running and its
//! result is dropped.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::error::{OdooError, OdooResult};
use crate::fault::classify;
use crate::transport::Transport;

/// Caller-side cancellation watch: an optional cancel signal and an optional deadline.
/// The default context never fires.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Fires the paired [`CallContext`]. Dropping the handle without calling `cancel` leaves
/// the context live.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) { let _ = self.tx.send(true); }
}

impl CallContext {
    pub fn background() -> Self { Self::default() }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { cancel: None, deadline: Some(Instant::now() + timeout) }
    }

    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { cancel: Some(rx), deadline: None }, CancelHandle { tx })
    }

    /// Keep the earlier of the existing deadline and `at`.
    pub fn with_deadline(mut self, at: Instant) -> Self {
        self.deadline = Some(match self.deadline { Some(d) if d < at => d, _ => at });
        self
    }

    pub fn deadline(&self) -> Option<Instant> { self.deadline }

    /// Non-blocking check: the error the context would report if it has already fired.
    pub fn err(&self) -> Option<OdooError> {
        if let Some(rx) = &self.cancel {
            if *rx.borrow() { return Some(OdooError::Cancelled); }
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Some(OdooError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve once the context fires. Pending forever for a background context.
    pub async fn done(&self) -> OdooError {
        let cancelled = async {
            match &self.cancel {
                Some(rx) => {
                    let mut rx = rx.clone();
                    loop {
                        if *rx.borrow_and_update() { break; }
                        if rx.changed().await.is_err() {
                            // handle dropped without cancelling
                            std::future::pending::<()>().await;
                        }
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = cancelled => OdooError::Cancelled,
            _ = expired => OdooError::DeadlineExceeded,
        }
    }
}

/// Run `work` on a blocking worker; whichever of it and `ctx` finishes first wins.
pub async fn race<T, F>(ctx: &CallContext, work: F) -> OdooResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    if let Some(e) = ctx.err() { return Err(e); }
    let handle = tokio::task::spawn_blocking(work);
    tokio::select! {
        e = ctx.done() => Err(e),
        joined = handle => joined.map_err(|e| OdooError::Internal(format!("remote call worker failed: {}", e))),
    }
}

/// One `execute_kw` invocation: model, method, positional args and keyword options.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub model: String,
    pub method: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl CallRequest {
    pub fn new(model: impl Into<String>, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self { model: model.into(), method: method.into(), args, kwargs: Map::new() }
    }

    pub fn with_kwargs(mut self, kwargs: Map<String, Value>) -> Self { self.kwargs = kwargs; self }

    /// `execute_kw(db, uid, password, model, method, args, kwargs)`; kwargs always sent.
    pub fn to_params(&self, db: &str, uid: i64, password: &str) -> Vec<Value> {
        vec![
            Value::String(db.to_string()),
            Value::from(uid),
            Value::String(password.to_string()),
            Value::String(self.model.clone()),
            Value::String(self.method.clone()),
            Value::Array(self.args.clone()),
            Value::Object(self.kwargs.clone()),
        ]
    }
}

/// Execute `request` over `object` and normalize any remote failure into a classified error.
pub async fn execute(
    ctx: &CallContext,
    object: Arc<dyn Transport>,
    db: &str,
    uid: i64,
    password: &str,
    request: &CallRequest,
) -> OdooResult<Value> {
    let params = request.to_params(db, uid, password);
    debug!(target: "odoo::exec", model = %request.model, method = %request.method, endpoint = %object.ident(), "execute_kw dispatch");
    let outcome = race(ctx, move || object.call("execute_kw", params)).await;
    match outcome {
        Err(e) => {
            error!(target: "odoo::exec", model = %request.model, method = %request.method, error = %e, "Odoo RPC call abandoned");
            Err(e)
        }
        Ok(Err(remote)) => {
            error!(target: "odoo::exec", model = %request.model, method = %request.method, error = %remote, "Failed to execute Odoo RPC call");
            let raw = format!("failed to call Odoo method '{}' on model '{}': {}", request.method, request.model, remote);
            Err(OdooError::from_fault(classify(&raw)))
        }
        Ok(Ok(v)) => Ok(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_layout() {
        let req = CallRequest::new("res.partner", "search", vec![json!([])]);
        let p = req.to_params("db", 2, "pw");
        assert_eq!(p, vec![json!("db"), json!(2), json!("pw"), json!("res.partner"), json!("search"), json!([[]]), json!({})]);
    }

    #[tokio::test]
    async fn background_context_never_fires() {
        let ctx = CallContext::background();
        assert!(ctx.err().is_none());
        let r = tokio::time::timeout(Duration::from_millis(20), ctx.done()).await;
        assert!(r.is_err());
    }

    #[tokio::test]
    async fn cancel_handle_fires_context() {
        let (ctx, handle) = CallContext::cancellable();
        assert!(ctx.err().is_none());
        handle.cancel();
        assert!(matches!(ctx.err(), Some(OdooError::Cancelled)));
        assert!(matches!(ctx.done().await, OdooError::Cancelled));
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel() {
        let (ctx, handle) = CallContext::cancellable();
        drop(handle);
        assert!(ctx.err().is_none());
        assert!(tokio::time::timeout(Duration::from_millis(20), ctx.done()).await.is_err());
    }

    #[tokio::test]
    async fn earlier_deadline_is_kept() {
        let ctx = CallContext::with_timeout(Duration::from_millis(10));
        let first = ctx.deadline().unwrap();
        let ctx = ctx.with_deadline(first + Duration::from_secs(5));
        assert_eq!(ctx.deadline(), Some(first));
    }

    #[tokio::test]
    async fn race_returns_work_result() {
        let out = race(&CallContext::background(), || 41 + 1).await.unwrap();
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn race_loses_to_deadline() {
        let ctx = CallContext::with_timeout(Duration::from_millis(20));
        let r = race(&ctx, || { std::thread::sleep(Duration::from_millis(300)); 1 }).await;
        assert!(matches!(r, Err(OdooError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn race_refuses_fired_context() {
        let (ctx, h) = CallContext::cancellable();
        h.cancel();
        let r = race(&ctx, || 1).await;
        assert!(matches!(r, Err(OdooError::Cancelled)));
    }
}
