/// Protocol mapping tests for JsonTableApi against scripted responses
///
/// Each test queues the exact body the service would send and checks both
/// the envelope that went out and the typed result that came back.

use jsontable_client::{ClientError, HttpMethod, Lookup, TableApi};
use jsontable_core::{DisplayValue, EncodedQuery, KeySet, Parameters};
use jsontable_test_utils::{key, record, records_response, session, ScriptedTransport};
use serde_json::json;

#[tokio::test]
async fn test_construction_resolves_endpoint() {
    let transport = ScriptedTransport::new();
    let api = session(transport.clone()).table_api("incident");

    assert_eq!(
        api.endpoint().unwrap().as_str(),
        "https://test.example.com/incident.do?JSONv2"
    );
    assert_eq!(api.table().name(), "incident");
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_bad_table_name_fails_on_first_use() {
    let transport = ScriptedTransport::new();
    let api = session(transport.clone()).table_api("");

    let err = api.get_keys(None).await.unwrap_err();
    assert!(matches!(err, ClientError::Configuration(_)));

    let api = session(transport.clone()).table_api("no/such?table");
    let err = api.delete_record(&key("a")).await.unwrap_err();
    assert!(matches!(err, ClientError::Configuration(_)));

    // nothing reached the wire
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_get_keys_empty_and_absent_query_match() {
    let transport = ScriptedTransport::new();
    transport
        .respond(json!({"records": ["a", "b"]}))
        .respond(json!({"records": ["a", "b"]}));
    let api = session(transport.clone()).table_api("incident");

    let absent = api.get_keys(None).await.unwrap();
    let empty = api.get_keys(Some(&EncodedQuery::new())).await.unwrap();
    assert_eq!(absent, empty);

    let requests = transport.requests();
    assert_eq!(requests[0].envelope, requests[1].envelope);
    assert_eq!(requests[0].envelope.len(), 1);
    assert_eq!(requests[0].action(), Some("getKeys"));
    assert_eq!(requests[0].param("sysparm_query"), None);
    assert_eq!(requests[0].method, HttpMethod::Post);
}

#[tokio::test]
async fn test_get_keys_with_query() {
    let transport = ScriptedTransport::new();
    transport.respond(json!({"records": [{"sys_id": "k1"}, "k2", "k1"]}));
    let api = session(transport.clone()).table_api("incident");

    let query = EncodedQuery::new().eq("active", "true").order_by("number");
    let keys = api.get_keys(Some(&query)).await.unwrap();

    let ids: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
    assert_eq!(ids, vec!["k1", "k2"]);
    assert_eq!(
        transport.last_request().unwrap().param("sysparm_query"),
        Some("active=true^ORDERBYnumber")
    );
}

#[tokio::test]
async fn test_get_keys_zero_results_vs_missing_field() {
    let transport = ScriptedTransport::new();
    transport
        .respond(json!({"records": []}))
        .respond(json!({"count": 0}));
    let api = session(transport).table_api("incident");

    assert!(api.get_keys_all().await.unwrap().is_empty());

    let err = api.get_keys_all().await.unwrap_err();
    match err {
        ClientError::Protocol { request, .. } => assert_eq!(request, "getKeys on incident"),
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_record_scenarios() {
    let transport = ScriptedTransport::new();
    transport
        .respond(records_response(vec![]))
        .respond(records_response(vec![record("abc123", &[("short_description", "x")])]))
        .respond(records_response(vec![
            record("abc123", &[("short_description", "x")]),
            record("abc123", &[("short_description", "y")]),
        ]));
    let api = session(transport.clone()).table_api("incident");
    let k = key("abc123");

    assert_eq!(api.get_record(&k).await.unwrap(), Lookup::NotFound);

    let found = api.get_record(&k).await.unwrap();
    let rec = found.record().expect("record present");
    assert_eq!(rec.key(), &k);
    assert_eq!(rec.value("short_description"), Some("x"));
    assert_eq!(rec.table().name(), "incident");

    let err = api.get_record(&k).await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol { .. }));
    assert!(err.to_string().contains("get on incident sys_id=abc123"));

    let sent = transport.requests();
    assert_eq!(sent[0].action(), Some("get"));
    assert_eq!(sent[0].param("sysparm_sys_id"), Some("abc123"));
}

#[tokio::test]
async fn test_get_record_with_foreign_key_is_rejected() {
    let transport = ScriptedTransport::new();
    transport.respond(records_response(vec![record("zzz", &[])]));
    let api = session(transport).table_api("incident");

    let err = api.get_record(&key("abc123")).await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol { .. }));
}

#[tokio::test]
async fn test_get_records_by_keys() {
    let transport = ScriptedTransport::new();
    // one of three keys has vanished
    transport.respond(records_response(vec![record("b", &[]), record("a", &[])]));
    let api = session(transport.clone()).table_api("incident");

    let keys: KeySet = vec![key("a"), key("b"), key("c")].into_iter().collect();
    let list = api.get_records_by_keys(&keys, DisplayValue::Raw).await.unwrap();
    assert_eq!(list.len(), 2);
    assert!(list.len() <= keys.len());
    assert!(list.iter().all(|r| keys.contains(r.key())));

    let sent = transport.last_request().unwrap();
    assert_eq!(sent.action(), Some("getRecords"));
    assert_eq!(sent.param("sysparm_query"), Some("sys_idINa,b,c"));
    assert_eq!(sent.param("displayvalue"), Some("false"));
}

#[tokio::test]
async fn test_get_records_by_empty_keyset_sends_nothing() {
    let transport = ScriptedTransport::new();
    let api = session(transport.clone()).table_api("incident");

    let list = api.get_records_by_keys(&KeySet::new(), DisplayValue::All).await.unwrap();
    assert!(list.is_empty());
    assert_eq!(list.table().name(), "incident");
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_get_records_display_values() {
    let transport = ScriptedTransport::new();
    transport.respond(json!({
        "records": [{"sys_id": "a", "caller_id": "681ccaf9", "dv_caller_id": "Abel Tuter"}]
    }));
    let api = session(transport.clone()).table_api("incident");

    let list = api.get_records(None, DisplayValue::All).await.unwrap();
    let rec = list.get(0).unwrap();
    assert_eq!(rec.value("caller_id"), Some("681ccaf9"));
    assert_eq!(rec.display_value("caller_id"), Some("Abel Tuter"));

    let sent = transport.last_request().unwrap();
    assert_eq!(sent.param("displayvalue"), Some("all"));
    assert_eq!(sent.param("sysparm_query"), None);
}

#[tokio::test]
async fn test_get_records_with_custom_parameters() {
    let transport = ScriptedTransport::new();
    transport.respond(records_response(vec![record("a", &[("number", "INC0001")])]));
    let api = session(transport.clone()).table_api("incident");

    let params = Parameters::new()
        .with("sysparm_view", "ess")
        .with("displayvalue", "all");
    let list = api.get_records_with(params).await.unwrap();
    assert_eq!(list.len(), 1);

    let sent = transport.last_request().unwrap();
    assert_eq!(sent.action(), Some("getRecords"));
    assert_eq!(sent.param("sysparm_view"), Some("ess"));
}

#[tokio::test]
async fn test_malformed_record_fails_whole_list() {
    let transport = ScriptedTransport::new();
    transport.respond(json!({"records": [{"sys_id": "a"}, {"number": "no key"}]}));
    let api = session(transport).table_api("incident");

    let err = api.get_records(None, DisplayValue::Raw).await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol { .. }));
}

#[tokio::test]
async fn test_insert_contract() {
    let transport = ScriptedTransport::new();
    transport
        .respond(records_response(vec![record("new1", &[("short_description", "disk full")])]))
        .respond(records_response(vec![]))
        .respond(records_response(vec![record("n1", &[]), record("n2", &[])]));
    let api = session(transport.clone()).table_api("incident");
    let fields = Parameters::new().with("short_description", "disk full").with("urgency", "1");

    let inserted = api.insert_record(&fields).await.unwrap();
    assert_eq!(inserted.key().as_str(), "new1");
    assert!(!inserted.key().as_str().is_empty());

    let sent = transport.last_request().unwrap();
    assert_eq!(sent.action(), Some("insert"));
    assert_eq!(sent.param("short_description"), Some("disk full"));
    assert_eq!(sent.param("urgency"), Some("1"));

    for _ in 0..2 {
        let err = api.insert_record(&fields).await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol { .. }), "got {:?}", err);
    }
}

#[tokio::test]
async fn test_insert_rejects_reserved_field() {
    let transport = ScriptedTransport::new();
    let api = session(transport.clone()).table_api("incident");

    let fields = Parameters::new().with("sysparm_action", "deleteRecord");
    let err = api.insert_record(&fields).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_update_contract() {
    let transport = ScriptedTransport::new();
    transport
        .respond(records_response(vec![record("k1", &[("state", "6")])]))
        .respond(records_response(vec![]))
        .respond(json!({"error": "ACL"}));
    let api = session(transport.clone()).table_api("incident");
    let fields = Parameters::new().with("state", "6");

    api.update_record(&key("k1"), &fields).await.unwrap();
    let sent = transport.last_request().unwrap();
    assert_eq!(sent.action(), Some("update"));
    assert_eq!(sent.param("sysparm_sys_id"), Some("k1"));
    assert_eq!(sent.param("state"), Some("6"));

    let err = api.update_record(&key("missing"), &fields).await.unwrap_err();
    match err {
        ClientError::Protocol { request, reason } => {
            assert_eq!(request, "update on incident sys_id=missing");
            assert!(reason.contains("got 0"));
        }
        other => panic!("expected protocol error, got {:?}", other),
    }

    let err = api.update_record(&key("k1"), &fields).await.unwrap_err();
    assert!(err.to_string().contains("ACL"));
}

#[tokio::test]
async fn test_delete_policy() {
    let transport = ScriptedTransport::new();
    transport
        .respond(records_response(vec![record("k1", &[])]))
        .respond(records_response(vec![]))
        .respond(records_response(vec![record("other", &[])]))
        .respond(records_response(vec![record("k1", &[]), record("k1", &[])]));
    let api = session(transport.clone()).table_api("incident");
    let k = key("k1");

    assert!(api.delete_record(&k).await.unwrap());
    assert!(!api.delete_record(&k).await.unwrap());
    assert!(matches!(api.delete_record(&k).await, Err(ClientError::Protocol { .. })));
    assert!(matches!(api.delete_record(&k).await, Err(ClientError::Protocol { .. })));

    let sent = transport.requests();
    assert!(sent.iter().all(|r| r.action() == Some("deleteRecord")));
    assert!(sent.iter().all(|r| r.param("sysparm_sys_id") == Some("k1")));
}

#[tokio::test]
async fn test_transport_errors_propagate_unchanged() {
    let transport = ScriptedTransport::new();
    transport
        .fail(ClientError::Timeout("deadline".into()))
        .fail(ClientError::Http { status: 503, body: "down".into() });
    let api = session(transport.clone()).table_api("incident");

    assert!(matches!(api.get_keys(None).await, Err(ClientError::Timeout(ref m)) if m == "deadline"));
    assert!(matches!(
        api.insert_record(&Parameters::new().with("a", "b")).await,
        Err(ClientError::Http { status: 503, .. })
    ));
    // no retries at this layer
    assert_eq!(transport.request_count(), 2);
}
