//! Scripted in-memory Odoo server for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use odoo_client::transport::{Connector, Service, Transport, TransportError};
use odoo_client::{ClientConfig, OdooClient};

/// One observed `execute_kw` call.
#[derive(Debug, Clone)]
pub struct Seen {
    pub db: String,
    pub uid: i64,
    pub password: String,
    pub model: String,
    pub method: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

type Handler = dyn Fn(&Seen) -> Result<Value, TransportError> + Send + Sync;
type AuthHook = Box<dyn Fn() + Send + Sync>;

pub struct FakeOdoo {
    pub auth_reply: Mutex<Result<Value, TransportError>>,
    pub auth_calls: AtomicUsize,
    pub opened: Mutex<Vec<Service>>,
    pub seen: Mutex<Vec<Seen>>,
    pub delay: Mutex<Duration>,
    pub auth_delay: Mutex<Duration>,
    on_auth: Mutex<Option<AuthHook>>,
    handler: Box<Handler>,
}

impl FakeOdoo {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&Seen) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            auth_reply: Mutex::new(Ok(json!(2))),
            auth_calls: AtomicUsize::new(0),
            opened: Mutex::new(Vec::new()),
            seen: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
            auth_delay: Mutex::new(Duration::ZERO),
            on_auth: Mutex::new(None),
            handler: Box::new(handler),
        })
    }

    pub fn auth_count(&self) -> usize { self.auth_calls.load(Ordering::SeqCst) }
    pub fn calls(&self) -> Vec<Seen> { self.seen.lock().clone() }
    pub fn set_delay(&self, d: Duration) { *self.delay.lock() = d; }
    pub fn set_auth_reply(&self, r: Result<Value, TransportError>) { *self.auth_reply.lock() = r; }
    pub fn set_auth_delay(&self, d: Duration) { *self.auth_delay.lock() = d; }
    /// Runs inside `authenticate`, just before the reply is returned.
    pub fn on_auth(&self, f: impl Fn() + Send + Sync + 'static) { *self.on_auth.lock() = Some(Box::new(f)); }
}

struct FakeTransport {
    service: Service,
    odoo: Arc<FakeOdoo>,
}

impl Transport for FakeTransport {
    fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        match (self.service, method) {
            (Service::Common, "authenticate") => {
                self.odoo.auth_calls.fetch_add(1, Ordering::SeqCst);
                let delay = *self.odoo.auth_delay.lock();
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                if let Some(hook) = self.odoo.on_auth.lock().as_ref() {
                    hook();
                }
                self.odoo.auth_reply.lock().clone()
            }
            (Service::Object, "execute_kw") => {
                let seen = Seen {
                    db: params[0].as_str().unwrap_or_default().to_string(),
                    uid: params[1].as_i64().unwrap_or_default(),
                    password: params[2].as_str().unwrap_or_default().to_string(),
                    model: params[3].as_str().unwrap_or_default().to_string(),
                    method: params[4].as_str().unwrap_or_default().to_string(),
                    args: params[5].as_array().cloned().unwrap_or_default(),
                    kwargs: params[6].as_object().cloned().unwrap_or_default(),
                };
                self.odoo.seen.lock().push(seen.clone());
                let delay = *self.odoo.delay.lock();
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                (self.odoo.handler)(&seen)
            }
            (svc, m) => Err(TransportError::Fault { code: 1, message: format!("unexpected {} on {:?}", m, svc) }),
        }
    }

    fn ident(&self) -> String { format!("fake:{:?}", self.service) }
}

pub struct FakeConnector(pub Arc<FakeOdoo>);

impl Connector for FakeConnector {
    fn open(&self, service: Service) -> Result<Arc<dyn Transport>, TransportError> {
        self.0.opened.lock().push(service);
        Ok(Arc::new(FakeTransport { service, odoo: self.0.clone() }))
    }
}

pub fn config() -> ClientConfig {
    ClientConfig::new("http://odoo.test:8069", "testdb", "admin", "secret").expect("config")
}

pub fn client_with(odoo: &Arc<FakeOdoo>, config: ClientConfig) -> OdooClient {
    OdooClient::with_connector(config, Arc::new(FakeConnector(odoo.clone())))
}

pub fn client(odoo: &Arc<FakeOdoo>) -> OdooClient {
    client_with(odoo, config())
}
