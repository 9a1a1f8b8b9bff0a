use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::error::OdooResult;
use crate::executor::{self, CallContext, CallRequest};
use crate::session::{Credentials, SessionManager};
use crate::transport::{Connector, XmlRpcConnector};
use crate::types::Model;

struct ClientInner {
    config: ClientConfig,
    session: SessionManager,
}

/// Shared Odoo client. Cloning is cheap; clones share one session.
#[derive(Clone)]
pub struct OdooClient {
    inner: Arc<ClientInner>,
}

impl OdooClient {
    /// Client over the default XML-RPC transport.
    pub fn new(config: ClientConfig) -> OdooResult<Self> {
        let connector = XmlRpcConnector::new(&config)?;
        Ok(Self::with_connector(config, Arc::new(connector)))
    }

    /// Client over any [`Connector`]; used for alternative transports and test doubles.
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let credentials = Credentials {
            db: config.db.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        };
        let session = SessionManager::new(credentials, connector, config.auth_timeout);
        Self { inner: Arc::new(ClientInner { config, session }) }
    }

    pub fn config(&self) -> &ClientConfig { &self.inner.config }
    pub fn session(&self) -> &SessionManager { &self.inner.session }

    /// Authenticate now instead of on the first call.
    pub async fn login(&self, ctx: &CallContext) -> OdooResult<i64> {
        Ok(self.inner.session.connection(ctx).await?.uid)
    }

    /// Run one `execute_kw` request, authenticating first if the session is absent or expired.
    pub async fn execute(&self, ctx: &CallContext, request: &CallRequest) -> OdooResult<Value> {
        let conn = self.inner.session.connection(ctx).await.inspect_err(|e| {
            error!(target: "odoo::exec", model = %request.model, method = %request.method, error = %e, "Failed to get Odoo connection for RPC call");
        })?;
        let cfg = &self.inner.config;
        executor::execute(ctx, conn.object, &cfg.db, conn.uid, &cfg.password, request).await
    }

    /// Raw `execute_kw` escape hatch. The caller interprets the returned value.
    pub async fn call_odoo(
        &self,
        ctx: &CallContext,
        model: &Model,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> OdooResult<Value> {
        debug!(target: "odoo::exec", model = %model, method, op = "call_odoo", "Performing custom Odoo RPC call");
        let req = CallRequest::new(model.as_str(), method, args).with_kwargs(kwargs);
        let result = self.execute(ctx, &req).await?;
        info!(target: "odoo::exec", model = %model, method, op = "call_odoo", "Custom Odoo RPC call completed");
        Ok(result)
    }

    /// Call a model method with positional arguments only.
    pub async fn call_method(&self, ctx: &CallContext, model: &Model, method: &str, args: Vec<Value>) -> OdooResult<Value> {
        self.call_odoo(ctx, model, method, args, Map::new()).await
    }
}
