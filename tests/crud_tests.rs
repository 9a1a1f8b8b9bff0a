//! Typed helpers: argument shaping, reply checks and batched per-record updates.

mod support;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};

use odoo_client::transport::TransportError;
use odoo_client::{CallContext, Data, Domain, Fields, Model, OdooError, Options};
use support::{client, FakeOdoo};

fn bg() -> CallContext { CallContext::background() }

#[tokio::test]
async fn search_passes_options_as_kwargs() {
    let odoo = FakeOdoo::new(|_| Ok(json!([4])));
    let c = client(&odoo);
    let opts = Options::new().limit(5).order("name desc").context("lang", "es_ES");
    c.search(&bg(), &Model::PRODUCT_PRODUCT, &Domain::new().or().filter("a", "=", 1).filter("b", "=", 2), Some(&opts))
        .await
        .unwrap();
    let seen = &odoo.calls()[0];
    assert_eq!(seen.args, vec![json!(["|", ["a", "=", 1], ["b", "=", 2]])]);
    assert_eq!(Value::Object(seen.kwargs.clone()), json!({"limit": 5, "order": "name desc", "context": {"lang": "es_ES"}}));
}

#[tokio::test]
async fn search_one_forces_limit_and_reports_missing() {
    let odoo = FakeOdoo::new(|seen| if seen.args[0] == json!([]) { Ok(json!([9, 10])) } else { Ok(json!([])) });
    let c = client(&odoo);
    let opts = Options::new().limit(50).order("id").extra("limit", 20);

    let id = c.search_one(&bg(), &Model::RES_PARTNER, &Domain::new(), Some(&opts)).await.unwrap();
    assert_eq!(id, 9);
    let kw = &odoo.calls()[0].kwargs;
    assert_eq!(kw.get("limit"), Some(&json!(1)));
    assert_eq!(kw.get("order"), Some(&json!("id")));

    let err = c.search_one(&bg(), &Model::RES_PARTNER, &Domain::new().filter("name", "=", "nobody"), None).await.unwrap_err();
    assert!(matches!(err, OdooError::RecordNotFound(_)), "{err:?}");
}

#[tokio::test]
async fn search_count_and_search_read() {
    let odoo = FakeOdoo::new(|seen| match seen.method.as_str() {
        "search_count" => Ok(json!(17)),
        "search_read" => Ok(json!([{"id": 1, "name": "A"}])),
        _ => Ok(Value::Null),
    });
    let c = client(&odoo);
    assert_eq!(c.search_count(&bg(), &Model::SALE_ORDER, &Domain::new(), None).await.unwrap(), 17);
    let rows = c.search_read(&bg(), &Model::SALE_ORDER, &Domain::new(), &Fields::from(vec!["name"]), Some(&Options::new().limit(3))).await.unwrap();
    assert_eq!(rows[0].get("name"), Some(&json!("A")));
    let kw = &odoo.calls()[1].kwargs;
    assert_eq!(kw.get("fields"), Some(&json!(["name"])));
    assert_eq!(kw.get("limit"), Some(&json!(3)));
}

#[tokio::test]
async fn read_skips_remote_call_without_ids() {
    let odoo = FakeOdoo::new(|_| Ok(json!([])));
    let c = client(&odoo);
    let rows = c.read(&bg(), &Model::RES_PARTNER, &[], &Fields::all(), None).await.unwrap();
    assert!(rows.is_empty());
    let rows = c.read_with_limit(&bg(), &Model::RES_PARTNER, &[], &Fields::all(), &Options::new()).await.unwrap();
    assert!(rows.is_empty());
    assert!(odoo.calls().is_empty());
    assert_eq!(odoo.auth_count(), 0);
}

#[tokio::test]
async fn read_one_returns_record_or_not_found() {
    let odoo = FakeOdoo::new(|seen| {
        if seen.args[0] == json!([7]) { Ok(json!([{"id": 7, "name": "Azure"}])) } else { Ok(json!([])) }
    });
    let c = client(&odoo);
    let rec = c.read_one(&bg(), &Model::RES_PARTNER, 7, &Fields::from(vec!["name"]), None).await.unwrap();
    assert_eq!(rec.get("name"), Some(&json!("Azure")));
    assert_eq!(odoo.calls()[0].args, vec![json!([7]), json!(["name"])]);

    let err = c.read_one(&bg(), &Model::RES_PARTNER, 8, &Fields::all(), None).await.unwrap_err();
    assert!(matches!(err, OdooError::RecordNotFound(_)));
}

#[tokio::test]
async fn read_rejects_malformed_reply() {
    let odoo = FakeOdoo::new(|_| Ok(json!({"not": "a list"})));
    let c = client(&odoo);
    let err = c.read(&bg(), &Model::RES_PARTNER, &[1], &Fields::all(), None).await.unwrap_err();
    assert_eq!(err.code_str(), "invalid_response");
}

#[tokio::test]
async fn create_one_accepts_list_or_bare_id() {
    let odoo = FakeOdoo::new(|seen| match seen.model.as_str() {
        "res.partner" => Ok(json!([42])),
        "res.country" => Ok(json!(5)),
        _ => Ok(json!([])),
    });
    let c = client(&odoo);
    let data = Data::new().set("name", "Widget");
    assert_eq!(c.create_one(&bg(), &Model::RES_PARTNER, &data, None).await.unwrap(), 42);
    assert_eq!(odoo.calls()[0].args, vec![json!([{"name": "Widget"}])]);
    assert_eq!(c.create_one(&bg(), &Model::RES_COUNTRY, &data, None).await.unwrap(), 5);
    let err = c.create_one(&bg(), &Model::RES_COMPANY, &data, None).await.unwrap_err();
    assert_eq!(err.code_str(), "invalid_response");
}

#[tokio::test]
async fn create_many() {
    let odoo = FakeOdoo::new(|seen| {
        let n = seen.args[0].as_array().map(Vec::len).unwrap_or(0) as i64;
        Ok(Value::Array((1..=n).map(Value::from).collect()))
    });
    let c = client(&odoo);
    assert!(c.create(&bg(), &Model::PRODUCT_TEMPLATE, &[], None).await.unwrap().is_empty());
    let ids = c
        .create(&bg(), &Model::PRODUCT_TEMPLATE, &[Data::new().set("name", "P1"), Data::new().set("name", "P2")], None)
        .await
        .unwrap();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(odoo.calls().len(), 1);
}

#[tokio::test]
async fn update_and_delete() {
    let odoo = FakeOdoo::new(|_| Ok(json!(true)));
    let c = client(&odoo);
    let data = Data::new().set("active", false);

    assert!(c.update(&bg(), &Model::RES_PARTNER, &[1, 2], &data, None).await.unwrap());
    let seen = &odoo.calls()[0];
    assert_eq!(seen.method, "write");
    assert_eq!(seen.args, vec![json!([1, 2]), json!({"active": false})]);

    assert!(c.delete(&bg(), &Model::RES_PARTNER, &[3], None).await.unwrap());
    assert_eq!(odoo.calls()[1].method, "unlink");
    assert_eq!(odoo.calls()[1].args, vec![json!([3])]);

    let err = c.update(&bg(), &Model::RES_PARTNER, &[], &data, None).await.unwrap_err();
    assert_eq!(err.code_str(), "invalid_input");
    let err = c.delete(&bg(), &Model::RES_PARTNER, &[], None).await.unwrap_err();
    assert_eq!(err.code_str(), "invalid_input");
}

#[tokio::test]
async fn update_multiple_collects_per_record_failures() {
    let odoo = FakeOdoo::new(|seen| {
        if seen.args[0] == json!([2]) {
            Err(TransportError::Fault { code: 2, message: "ValidationError: name required".into() })
        } else {
            Ok(json!(true))
        }
    });
    let c = client(&odoo);
    c.login(&bg()).await.unwrap();
    odoo.set_delay(Duration::from_millis(100));

    let mut updates = BTreeMap::new();
    for id in 1..=5 {
        updates.insert(id, Data::new().set("name", format!("n{}", id)));
    }
    let started = Instant::now();
    let failed = c.update_multiple(&bg(), &Model::RES_PARTNER, updates, Some(&Options::new().context("tracking_disable", true))).await.unwrap();

    // one task per record, run concurrently
    assert!(started.elapsed() < Duration::from_millis(450), "took {:?}", started.elapsed());
    assert_eq!(failed.keys().copied().collect::<Vec<_>>(), vec![2]);
    assert!(failed[&2].to_string().contains("name required"));

    let calls = odoo.calls();
    assert_eq!(calls.len(), 5);
    assert!(calls.iter().all(|s| s.method == "write" && s.kwargs.get("context") == Some(&json!({"tracking_disable": true}))));
}

#[tokio::test]
async fn update_multiple_empty_and_cancelled() {
    let odoo = FakeOdoo::new(|_| Ok(json!(true)));
    let c = client(&odoo);
    assert!(c.update_multiple(&bg(), &Model::RES_PARTNER, BTreeMap::new(), None).await.unwrap().is_empty());

    c.login(&bg()).await.unwrap();
    odoo.set_delay(Duration::from_millis(300));
    let (ctx, handle) = CallContext::cancellable();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.cancel();
    });
    let updates: BTreeMap<i64, Data> = [(1, Data::new().set("x", 1)), (2, Data::new().set("x", 2))].into_iter().collect();
    let err = c.update_multiple(&ctx, &Model::RES_PARTNER, updates, None).await.unwrap_err();
    assert!(matches!(err, OdooError::Cancelled), "{err:?}");
}

#[tokio::test]
async fn call_odoo_passes_raw_arguments() {
    let odoo = FakeOdoo::new(|seen| Ok(json!({"method": seen.method, "kw": seen.kwargs})));
    let c = client(&odoo);
    let mut kwargs = Map::new();
    kwargs.insert("attributes".into(), json!(["string", "type"]));
    let v = c.call_odoo(&bg(), &Model::RES_PARTNER, "fields_get", vec![], kwargs).await.unwrap();
    assert_eq!(v, json!({"method": "fields_get", "kw": {"attributes": ["string", "type"]}}));

    let v = c.call_method(&bg(), &Model::SALE_ORDER, "action_confirm", vec![json!([5])]).await.unwrap();
    assert_eq!(v["kw"], json!({}));
    assert_eq!(odoo.calls()[1].args, vec![json!([5])]);
}
