//! Typed building blocks for `execute_kw` arguments: model names, domain filters,
//! field lists, record data and keyword options.

use std::borrow::Cow;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{OdooError, OdooResult};

/// A record as returned by `read`: field name to value.
pub type Record = Map<String, Value>;

/// Odoo `context` dictionary (lang, tz, active_test, ...).
pub type OdooContext = Map<String, Value>;

/// Odoo model name, e.g. `res.partner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Model(Cow<'static, str>);

impl Model {
    pub const fn from_static(name: &'static str) -> Self { Model(Cow::Borrowed(name)) }
    pub fn as_str(&self) -> &str { &self.0 }

    // Product & inventory
    pub const PRODUCT_PRODUCT: Model = Model::from_static("product.product");
    pub const PRODUCT_TEMPLATE: Model = Model::from_static("product.template");
    pub const PRODUCT_CATEGORY: Model = Model::from_static("product.category");
    pub const STOCK_PICKING: Model = Model::from_static("stock.picking");
    pub const STOCK_MOVE: Model = Model::from_static("stock.move");
    pub const STOCK_QUANT: Model = Model::from_static("stock.quant");
    pub const STOCK_LOCATION: Model = Model::from_static("stock.location");

    // Sales & CRM
    pub const SALE_ORDER: Model = Model::from_static("sale.order");
    pub const SALE_ORDER_LINE: Model = Model::from_static("sale.order.line");
    pub const CRM_LEAD: Model = Model::from_static("crm.lead");
    pub const CRM_STAGE: Model = Model::from_static("crm.stage");
    pub const RES_PARTNER: Model = Model::from_static("res.partner");

    // Accounting
    pub const ACCOUNT_MOVE: Model = Model::from_static("account.move");
    pub const ACCOUNT_MOVE_LINE: Model = Model::from_static("account.move.line");
    pub const ACCOUNT_PAYMENT: Model = Model::from_static("account.payment");
    pub const ACCOUNT_JOURNAL: Model = Model::from_static("account.journal");
    pub const ACCOUNT_TAX: Model = Model::from_static("account.tax");

    // Purchase
    pub const PURCHASE_ORDER: Model = Model::from_static("purchase.order");
    pub const PURCHASE_ORDER_LINE: Model = Model::from_static("purchase.order.line");

    // HR
    pub const HR_EMPLOYEE: Model = Model::from_static("hr.employee");
    pub const HR_DEPARTMENT: Model = Model::from_static("hr.department");
    pub const HR_JOB: Model = Model::from_static("hr.job");
    pub const HR_EXPENSE: Model = Model::from_static("hr.expense");

    // Project & timesheets
    pub const PROJECT_PROJECT: Model = Model::from_static("project.project");
    pub const PROJECT_TASK: Model = Model::from_static("project.task");
    pub const ACCOUNT_ANALYTIC_LINE: Model = Model::from_static("account.analytic.line");

    // Users & system
    pub const RES_USERS: Model = Model::from_static("res.users");
    pub const RES_COMPANY: Model = Model::from_static("res.company");
    pub const RES_CURRENCY: Model = Model::from_static("res.currency");
    pub const RES_COUNTRY: Model = Model::from_static("res.country");
    pub const IR_MODEL: Model = Model::from_static("ir.model");
    pub const IR_ATTACHMENT: Model = Model::from_static("ir.attachment");
    pub const IR_ACTIONS_ACT_WINDOW: Model = Model::from_static("ir.actions.act_window");
    pub const IR_SEQUENCE: Model = Model::from_static("ir.sequence");

    // Messaging
    pub const MAIL_ACTIVITY: Model = Model::from_static("mail.activity");
    pub const MAIL_MESSAGE: Model = Model::from_static("mail.message");
    pub const MAIL_THREAD: Model = Model::from_static("mail.thread");
}

impl Display for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for Model {
    fn from(s: &str) -> Self { Model(Cow::Owned(s.to_string())) }
}

impl From<String> for Model {
    fn from(s: String) -> Self { Model(Cow::Owned(s)) }
}

/// One element of a domain filter.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainTerm {
    /// Prefix logical operator: `|`, `&` or `!`.
    Operator(String),
    Condition { field: String, operator: String, value: Value },
}

impl DomainTerm {
    fn to_rpc(&self) -> Value {
        match self {
            DomainTerm::Operator(op) => Value::String(op.clone()),
            DomainTerm::Condition { field, operator, value } => {
                Value::Array(vec![Value::String(field.clone()), Value::String(operator.clone()), value.clone()])
            }
        }
    }
}

/// Domain filter in Odoo's prefix notation. Operators apply to the terms that follow
/// them; adjacent terms without an operator are implicitly ANDed by the server.
///
/// `is_company AND (email OR NOT active)`:
///
/// ```
/// use odoo_client::Domain;
/// let d = Domain::new()
///     .and()
///     .filter("is_company", "=", true)
///     .or()
///     .filter("email", "ilike", "%example.com")
///     .filter("active", "=", false);
/// assert_eq!(d.len(), 5);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Domain(Vec<DomainTerm>);

impl Domain {
    pub fn new() -> Self { Self(Vec::new()) }

    pub fn filter(mut self, field: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push(DomainTerm::Condition { field: field.into(), operator: operator.into(), value: value.into() });
        self
    }

    pub fn or(mut self) -> Self { self.0.push(DomainTerm::Operator("|".into())); self }
    pub fn and(mut self) -> Self { self.0.push(DomainTerm::Operator("&".into())); self }
    pub fn not(mut self) -> Self { self.0.push(DomainTerm::Operator("!".into())); self }

    pub fn push(&mut self, term: DomainTerm) { self.0.push(term); }
    pub fn terms(&self) -> &[DomainTerm] { &self.0 }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Operators become bare strings, conditions become 3-element lists.
    pub fn to_rpc(&self) -> Value {
        Value::Array(self.0.iter().map(DomainTerm::to_rpc).collect())
    }

    /// Parse the JSON form Odoo itself uses, e.g. `["|", ["a","=",1], ["b","=",2]]`.
    /// A single-element list holding a string is accepted as an operator.
    pub fn from_json(v: &Value) -> OdooResult<Self> {
        let items = match v {
            Value::Array(items) => items,
            Value::Null => return Ok(Domain::new()),
            other => return Err(OdooError::InvalidInput(format!("domain must be a list, got {}", other))),
        };
        let mut out = Domain::new();
        for item in items {
            match item {
                Value::String(op) => out.push(DomainTerm::Operator(op.clone())),
                Value::Array(parts) if parts.len() == 1 && parts[0].is_string() => {
                    out.push(DomainTerm::Operator(parts[0].as_str().unwrap_or_default().to_string()));
                }
                Value::Array(parts) if parts.len() == 3 => {
                    let field = parts[0].as_str();
                    let op = parts[1].as_str();
                    match (field, op) {
                        (Some(f), Some(o)) => out.push(DomainTerm::Condition { field: f.to_string(), operator: o.to_string(), value: parts[2].clone() }),
                        _ => return Err(OdooError::InvalidInput(format!("domain condition needs string field and operator: {}", item))),
                    }
                }
                other => return Err(OdooError::InvalidInput(format!("unsupported domain element: {}", other))),
            }
        }
        Ok(out)
    }
}

impl FromIterator<DomainTerm> for Domain {
    fn from_iter<I: IntoIterator<Item = DomainTerm>>(iter: I) -> Self { Domain(iter.into_iter().collect()) }
}

/// Field names to fetch. Empty means the server's default set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(Vec<String>);

impl Fields {
    pub fn all() -> Self { Fields(Vec::new()) }
    pub fn as_slice(&self) -> &[String] { &self.0 }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn to_rpc(&self) -> Value { Value::Array(self.0.iter().cloned().map(Value::String).collect()) }
}

impl<S: Into<String>> FromIterator<S> for Fields {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self { Fields(iter.into_iter().map(Into::into).collect()) }
}

impl From<Vec<&str>> for Fields {
    fn from(v: Vec<&str>) -> Self { v.into_iter().collect() }
}

impl From<Vec<String>> for Fields {
    fn from(v: Vec<String>) -> Self { Fields(v) }
}

/// Field values for `create` / `write`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Data(Map<String, Value>);

impl Data {
    pub fn new() -> Self { Data(Map::new()) }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) { self.0.insert(field.into(), value.into()); }
    pub fn get(&self, field: &str) -> Option<&Value> { self.0.get(field) }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn to_rpc(&self) -> Value { Value::Object(self.0.clone()) }

    pub fn from_json(v: Value) -> OdooResult<Self> {
        match v {
            Value::Object(m) => Ok(Data(m)),
            other => Err(OdooError::InvalidInput(format!("record data must be an object, got {}", other))),
        }
    }
}

impl From<Map<String, Value>> for Data {
    fn from(m: Map<String, Value>) -> Self { Data(m) }
}

/// Common keyword options for `execute_kw`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Options {
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: OdooContext,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub order: String,
    /// Less common kwargs, merged last.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Options {
    pub fn new() -> Self { Self::default() }
    pub fn limit(mut self, n: i64) -> Self { self.limit = n; self }
    pub fn offset(mut self, n: i64) -> Self { self.offset = n; self }
    pub fn order(mut self, o: impl Into<String>) -> Self { self.order = o.into(); self }
    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Non-positive limit/offset and empty order/context are left out; the server ignores them.
    pub fn to_kwargs(&self) -> Map<String, Value> {
        let mut kw = Map::new();
        if !self.context.is_empty() { kw.insert("context".into(), Value::Object(self.context.clone())); }
        if self.limit > 0 { kw.insert("limit".into(), Value::from(self.limit)); }
        if self.offset > 0 { kw.insert("offset".into(), Value::from(self.offset)); }
        if !self.order.is_empty() { kw.insert("order".into(), Value::String(self.order.clone())); }
        for (k, v) in &self.extra {
            kw.insert(k.clone(), v.clone());
        }
        kw
    }
}

pub(crate) fn kwargs_of(options: Option<&Options>) -> Map<String, Value> {
    options.map(Options::to_kwargs).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn domain_operators_are_bare_strings() {
        let d = Domain::new().or().filter("name", "=", "John").filter("active", "=", true);
        assert_eq!(d.to_rpc(), json!(["|", ["name", "=", "John"], ["active", "=", true]]));
    }

    #[test]
    fn empty_domain_is_empty_list() {
        assert_eq!(Domain::new().to_rpc(), json!([]));
        assert!(Domain::from_json(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn domain_from_json_accepts_wrapped_operator() {
        let d = Domain::from_json(&json!([["|"], ["a", "=", 1], "&", ["b", "in", [1, 2]]])).unwrap();
        assert_eq!(d.to_rpc(), json!(["|", ["a", "=", 1], "&", ["b", "in", [1, 2]]]));
    }

    #[test]
    fn domain_from_json_rejects_garbage() {
        assert!(Domain::from_json(&json!({"a": 1})).is_err());
        assert!(Domain::from_json(&json!([[1, "=", 2]])).is_err());
        assert!(Domain::from_json(&json!([42])).is_err());
    }

    #[test]
    fn options_skip_defaults() {
        assert!(Options::new().to_kwargs().is_empty());
        let kw = Options::new().limit(0).offset(-1).to_kwargs();
        assert!(kw.is_empty());
    }

    #[test]
    fn options_extra_overrides() {
        let kw = Options::new()
            .limit(10)
            .offset(5)
            .order("name asc")
            .context("lang", "es_ES")
            .extra("limit", 3)
            .to_kwargs();
        assert_eq!(kw.get("limit"), Some(&json!(3)));
        assert_eq!(kw.get("offset"), Some(&json!(5)));
        assert_eq!(kw.get("order"), Some(&json!("name asc")));
        assert_eq!(kw.get("context"), Some(&json!({"lang": "es_ES"})));
    }

    #[test]
    fn model_constants_and_conversions() {
        assert_eq!(Model::RES_PARTNER.as_str(), "res.partner");
        assert_eq!(Model::from("x.y"), Model::from("x.y".to_string()));
        assert_eq!(Model::SALE_ORDER.to_string(), "sale.order");
    }

    #[test]
    fn data_builder() {
        let d = Data::new().set("name", "Widget").set("list_price", 12.5);
        assert_eq!(d.to_rpc(), json!({"name": "Widget", "list_price": 12.5}));
        assert!(Data::from_json(json!([1])).is_err());
    }
}
