//! Typed CRUD helpers over `execute_kw`.
//! Each helper shapes arguments for one ORM method and checks the reply shape.

use std::collections::BTreeMap;

use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::client::OdooClient;
use crate::error::{OdooError, OdooResult};
use crate::executor::{CallContext, CallRequest};
use crate::types::{kwargs_of, Data, Domain, Fields, Model, Options, Record};

fn ids_from(v: Value, op: &str) -> OdooResult<Vec<i64>> {
    match v {
        Value::Array(items) => items
            .into_iter()
            .map(|it| it.as_i64().ok_or_else(|| OdooError::InvalidResponse(format!("{}: expected integer id, got {}", op, it))))
            .collect(),
        other => Err(OdooError::InvalidResponse(format!("{}: expected list of ids, got {}", op, other))),
    }
}

fn bool_from(v: Value, op: &str) -> OdooResult<bool> {
    match v {
        Value::Bool(b) => Ok(b),
        other => Err(OdooError::InvalidResponse(format!("{}: expected boolean, got {}", op, other))),
    }
}

fn records_from(v: Value, op: &str) -> OdooResult<Vec<Record>> {
    match v {
        Value::Array(items) => items
            .into_iter()
            .map(|it| match it {
                Value::Object(m) => Ok(m),
                other => Err(OdooError::InvalidResponse(format!("{}: expected record, got {}", op, other))),
            })
            .collect(),
        other => Err(OdooError::InvalidResponse(format!("{}: expected list of records, got {}", op, other))),
    }
}

fn ids_value(ids: &[i64]) -> Value {
    Value::Array(ids.iter().copied().map(Value::from).collect())
}

impl OdooClient {
    async fn run(&self, ctx: &CallContext, model: &Model, method: &str, args: Vec<Value>, options: Option<&Options>) -> OdooResult<Value> {
        let req = CallRequest::new(model.as_str(), method, args).with_kwargs(kwargs_of(options));
        self.execute(ctx, &req).await
    }

    /// Ids of records matching `domain`.
    pub async fn search(&self, ctx: &CallContext, model: &Model, domain: &Domain, options: Option<&Options>) -> OdooResult<Vec<i64>> {
        debug!(target: "odoo::crud", model = %model, op = "search", domain = ?domain, "Performing Odoo search");
        let v = self.run(ctx, model, "search", vec![domain.to_rpc()], options).await?;
        let ids = ids_from(v, "search")?;
        info!(target: "odoo::crud", model = %model, op = "search", results = ids.len(), "Odoo search completed");
        Ok(ids)
    }

    /// First matching id. Limit is forced to 1; other options are kept.
    pub async fn search_one(&self, ctx: &CallContext, model: &Model, domain: &Domain, options: Option<&Options>) -> OdooResult<i64> {
        debug!(target: "odoo::crud", model = %model, op = "search_one", domain = ?domain, "Performing Odoo searchOne");
        let mut opts = options.cloned().unwrap_or_default();
        opts.limit = 1;
        opts.extra.remove("limit");
        let v = self.run(ctx, model, "search", vec![domain.to_rpc()], Some(&opts)).await?;
        let ids = ids_from(v, "search_one")?;
        match ids.as_slice() {
            [] => {
                info!(target: "odoo::crud", model = %model, op = "search_one", "No records found for Odoo searchOne");
                Err(OdooError::RecordNotFound(format!("for model '{}' with domain {}", model, domain.to_rpc())))
            }
            [first, rest @ ..] => {
                if !rest.is_empty() {
                    warn!(target: "odoo::crud", model = %model, found_count = ids.len(), "searchOne found more than one record despite limit=1, returning the first");
                }
                Ok(*first)
            }
        }
    }

    /// Number of records matching `domain`.
    pub async fn search_count(&self, ctx: &CallContext, model: &Model, domain: &Domain, options: Option<&Options>) -> OdooResult<i64> {
        debug!(target: "odoo::crud", model = %model, op = "search_count", "Performing Odoo search_count");
        let v = self.run(ctx, model, "search_count", vec![domain.to_rpc()], options).await?;
        v.as_i64().ok_or_else(|| OdooError::InvalidResponse(format!("search_count: expected integer, got {}", v)))
    }

    /// `search` and `read` in one round trip.
    pub async fn search_read(&self, ctx: &CallContext, model: &Model, domain: &Domain, fields: &Fields, options: Option<&Options>) -> OdooResult<Vec<Record>> {
        debug!(target: "odoo::crud", model = %model, op = "search_read", "Performing Odoo search_read");
        let mut opts = options.cloned().unwrap_or_default();
        if !fields.is_empty() {
            opts.extra.insert("fields".into(), fields.to_rpc());
        }
        let v = self.run(ctx, model, "search_read", vec![domain.to_rpc()], Some(&opts)).await?;
        let records = records_from(v, "search_read")?;
        info!(target: "odoo::crud", model = %model, op = "search_read", records_count = records.len(), "Odoo search_read completed");
        Ok(records)
    }

    /// Read `fields` of the given records. No ids means no remote call.
    pub async fn read(&self, ctx: &CallContext, model: &Model, ids: &[i64], fields: &Fields, options: Option<&Options>) -> OdooResult<Vec<Record>> {
        debug!(target: "odoo::crud", model = %model, op = "read", ids = ?ids, "Performing Odoo read");
        if ids.is_empty() {
            info!(target: "odoo::crud", model = %model, op = "read", "No IDs provided for Odoo read, returning empty list");
            return Ok(Vec::new());
        }
        let v = self.run(ctx, model, "read", vec![ids_value(ids), fields.to_rpc()], options).await?;
        let records = records_from(v, "read")?;
        info!(target: "odoo::crud", model = %model, op = "read", records_count = records.len(), "Odoo read completed");
        Ok(records)
    }

    pub async fn read_one(&self, ctx: &CallContext, model: &Model, id: i64, fields: &Fields, options: Option<&Options>) -> OdooResult<Record> {
        let mut records = self.read(ctx, model, &[id], fields, options).await?;
        if records.is_empty() {
            info!(target: "odoo::crud", model = %model, op = "read_one", id, "No record found for Odoo readOne");
            return Err(OdooError::RecordNotFound(format!("for model '{}' with ID {}", model, id)));
        }
        Ok(records.swap_remove(0))
    }

    /// `read` with explicit paging/ordering options. Does not search first.
    pub async fn read_with_limit(&self, ctx: &CallContext, model: &Model, ids: &[i64], fields: &Fields, options: &Options) -> OdooResult<Vec<Record>> {
        debug!(target: "odoo::crud", model = %model, op = "read_with_limit", options = ?options, "Performing Odoo readWithLimit");
        self.read(ctx, model, ids, fields, Some(options)).await
    }

    /// Create one record and return its id.
    pub async fn create_one(&self, ctx: &CallContext, model: &Model, data: &Data, options: Option<&Options>) -> OdooResult<i64> {
        debug!(target: "odoo::crud", model = %model, op = "create_one", fields = data.len(), "Performing Odoo createOne");
        let v = self.run(ctx, model, "create", vec![Value::Array(vec![data.to_rpc()])], options).await?;
        // older servers answer a bare id for a single create
        let ids = match v {
            Value::Number(ref n) => vec![n.as_i64().ok_or_else(|| OdooError::InvalidResponse(format!("create: bad id {}", n)))?],
            other => ids_from(other, "create")?,
        };
        match ids.as_slice() {
            [] => Err(OdooError::InvalidResponse("Odoo did not return an ID for single record creation".into())),
            [first, rest @ ..] => {
                if !rest.is_empty() {
                    warn!(target: "odoo::crud", model = %model, ids = ?ids, "createOne returned multiple IDs, returning the first one");
                }
                info!(target: "odoo::crud", model = %model, op = "create_one", new_id = *first, "Odoo createOne completed");
                Ok(*first)
            }
        }
    }

    /// Create several records in one call. Empty input means no remote call.
    pub async fn create(&self, ctx: &CallContext, model: &Model, data: &[Data], options: Option<&Options>) -> OdooResult<Vec<i64>> {
        debug!(target: "odoo::crud", model = %model, op = "create", data_entries = data.len(), "Performing Odoo create");
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let rows = Value::Array(data.iter().map(Data::to_rpc).collect());
        let v = self.run(ctx, model, "create", vec![rows], options).await?;
        let ids = match v {
            Value::Number(ref n) => vec![n.as_i64().ok_or_else(|| OdooError::InvalidResponse(format!("create: bad id {}", n)))?],
            other => ids_from(other, "create")?,
        };
        info!(target: "odoo::crud", model = %model, op = "create", new_ids = ?ids, "Odoo create completed");
        Ok(ids)
    }

    /// Apply the same `data` to every record in `ids`.
    pub async fn update(&self, ctx: &CallContext, model: &Model, ids: &[i64], data: &Data, options: Option<&Options>) -> OdooResult<bool> {
        debug!(target: "odoo::crud", model = %model, op = "update", ids = ?ids, "Performing Odoo update");
        if ids.is_empty() {
            return Err(OdooError::InvalidInput("no record IDs provided for update".into()));
        }
        let v = self.run(ctx, model, "write", vec![ids_value(ids), data.to_rpc()], options).await?;
        let ok = bool_from(v, "write")?;
        info!(target: "odoo::crud", model = %model, op = "update", success = ok, "Odoo update completed");
        Ok(ok)
    }

    /// Write different data to each record, one concurrent call per record.
    ///
    /// Returns only the failures, keyed by id. If `ctx` has fired by the time every call
    /// has returned, the whole batch reports the context error instead.
    pub async fn update_multiple(
        &self,
        ctx: &CallContext,
        model: &Model,
        updates: BTreeMap<i64, Data>,
        options: Option<&Options>,
    ) -> OdooResult<BTreeMap<i64, OdooError>> {
        debug!(target: "odoo::crud", model = %model, op = "update_multiple", records_to_update = updates.len(), "Performing Odoo updateMultiple");
        if updates.is_empty() {
            return Ok(BTreeMap::new());
        }
        let kwargs = kwargs_of(options);
        let mut ids = Vec::with_capacity(updates.len());
        let mut tasks = Vec::with_capacity(updates.len());
        for (id, data) in updates {
            let client = self.clone();
            let ctx = ctx.clone();
            let req = CallRequest::new(model.as_str(), "write", vec![ids_value(&[id]), data.to_rpc()]).with_kwargs(kwargs.clone());
            ids.push(id);
            tasks.push(tokio::spawn(async move {
                let v = client.execute(&ctx, &req).await?;
                bool_from(v, "write")
            }));
        }

        let mut failed = BTreeMap::new();
        for (id, joined) in ids.into_iter().zip(join_all(tasks).await) {
            let outcome = joined.unwrap_or_else(|e| Err(OdooError::Internal(format!("update task failed: {}", e))));
            if let Err(e) = outcome {
                error!(target: "odoo::crud", model = %model, record_id = id, error = %e, op = "update_multiple", "Failed to update single record in Odoo updateMultiple");
                failed.insert(id, e);
            }
        }

        if let Some(e) = ctx.err() {
            return Err(e);
        }
        Ok(failed)
    }

    /// Delete records. Empty `ids` is rejected.
    pub async fn delete(&self, ctx: &CallContext, model: &Model, ids: &[i64], options: Option<&Options>) -> OdooResult<bool> {
        debug!(target: "odoo::crud", model = %model, op = "delete", ids = ?ids, "Performing Odoo delete");
        if ids.is_empty() {
            return Err(OdooError::InvalidInput("no record IDs provided for deletion".into()));
        }
        let v = self.run(ctx, model, "unlink", vec![ids_value(ids)], options).await?;
        let ok = bool_from(v, "unlink")?;
        info!(target: "odoo::crud", model = %model, op = "delete", success = ok, "Odoo delete completed");
        Ok(ok)
    }
}
