use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::error::{OdooError, OdooResult};
use crate::executor::{race, CallContext};
use crate::tprintln;
use crate::transport::{Connector, Service, Transport};

#[derive(Clone)]
pub struct Credentials {
    pub db: String,
    pub username: String,
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("db", &self.db).field("username", &self.username).finish_non_exhaustive()
    }
}

/// Authenticated identity plus the `object` handle it was issued with.
#[derive(Clone)]
pub struct Connection {
    pub uid: i64,
    pub object: Arc<dyn Transport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub uid: i64,
    pub authenticated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

struct SessionState {
    uid: i64,
    object: Arc<dyn Transport>,
    authenticated_at: Instant,
    authenticated_wall: DateTime<Utc>,
}

/// Owns credentials and the current session; re-authenticates lazily once the session
/// is missing or older than `ttl`.
///
/// The slot is only locked for a read or a swap. Two callers that both find the session
/// expired will both authenticate and the last one to finish wins.
pub struct SessionManager {
    credentials: Credentials,
    connector: Arc<dyn Connector>,
    ttl: Duration,
    state: RwLock<Option<SessionState>>,
}

impl SessionManager {
    pub fn new(credentials: Credentials, connector: Arc<dyn Connector>, ttl: Duration) -> Self {
        Self { credentials, connector, ttl, state: RwLock::new(None) }
    }

    pub fn credentials(&self) -> &Credentials { &self.credentials }
    pub fn ttl(&self) -> Duration { self.ttl }

    fn state_valid(&self, s: &SessionState) -> bool {
        s.uid != 0 && s.authenticated_at.elapsed() < self.ttl
    }

    pub fn is_valid(&self) -> bool {
        self.state.read().as_ref().map(|s| self.state_valid(s)).unwrap_or(false)
    }

    pub fn info(&self) -> Option<SessionInfo> {
        self.state.read().as_ref().map(|s| SessionInfo {
            uid: s.uid,
            authenticated_at: s.authenticated_wall,
            expires_at: chrono::Duration::from_std(self.ttl)
                .ok()
                .and_then(|d| s.authenticated_wall.checked_add_signed(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        })
    }

    /// Forget the session; the next call authenticates again.
    pub fn invalidate(&self) {
        if self.state.write().take().is_some() {
            debug!(target: "odoo::session", "session invalidated");
        }
    }

    /// Current connection, authenticating first when needed.
    pub async fn connection(&self, ctx: &CallContext) -> OdooResult<Connection> {
        if let Some(e) = ctx.err() {
            debug!(target: "odoo::session", error = %e, "context done before getting Odoo connection");
            return Err(e);
        }
        {
            let guard = self.state.read();
            if let Some(s) = guard.as_ref().filter(|s| self.state_valid(s)) {
                return Ok(Connection { uid: s.uid, object: s.object.clone() });
            }
        }
        self.authenticate(ctx).await
    }

    async fn authenticate(&self, ctx: &CallContext) -> OdooResult<Connection> {
        // stale handle goes first
        self.state.write().take();

        let common = self.connector.open(Service::Common).map_err(|e| {
            error!(target: "odoo::session", error = %e, "failed to connect to Odoo common endpoint");
            OdooError::Transport(format!("failed to connect to Odoo common endpoint: {}", e))
        })?;
        let Credentials { db, username, password } = self.credentials.clone();
        let params = vec![json!(db), json!(username), json!(password), json!({})];
        let reply = race(ctx, move || common.call("authenticate", params)).await?;
        let uid = match reply {
            Ok(v) => uid_from_reply(&v).inspect_err(|e| {
                error!(target: "odoo::session", db = %self.credentials.db, username = %self.credentials.username, error = %e, "Odoo authentication rejected");
            })?,
            Err(e) => {
                error!(target: "odoo::session", db = %self.credentials.db, username = %self.credentials.username, error = %e, "Odoo authentication failed");
                return Err(OdooError::Authentication(e.to_string()));
            }
        };

        if let Some(e) = ctx.err() {
            debug!(target: "odoo::session", error = %e, "context done after credential check");
            return Err(e);
        }

        let object = self.connector.open(Service::Object).map_err(|e| {
            error!(target: "odoo::session", error = %e, "failed to connect to Odoo object endpoint");
            OdooError::Transport(format!("failed to connect to Odoo object endpoint: {}", e))
        })?;

        *self.state.write() = Some(SessionState {
            uid,
            object: object.clone(),
            authenticated_at: Instant::now(),
            authenticated_wall: Utc::now(),
        });
        info!(target: "odoo::session", uid, db = %self.credentials.db, "Successfully authenticated with Odoo");
        tprintln!("session.authenticate uid={} ttl_secs={}", uid, self.ttl.as_secs());
        Ok(Connection { uid, object })
    }
}

/// Odoo answers `false` for bad credentials rather than faulting.
fn uid_from_reply(v: &Value) -> OdooResult<i64> {
    match v {
        Value::Number(n) => match n.as_i64() {
            Some(uid) if uid > 0 => Ok(uid),
            _ => Err(OdooError::Authentication(format!("server returned invalid uid {}", n))),
        },
        Value::Bool(false) => Err(OdooError::Authentication("invalid credentials".into())),
        other => Err(OdooError::Authentication(format!("unexpected authenticate reply: {}", other))),
    }
}
