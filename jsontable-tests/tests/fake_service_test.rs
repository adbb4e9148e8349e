/// End-to-end flows against the in-memory table service

use jsontable_client::{KeySetTableReader, Lookup, TableApi, TableReader};
use jsontable_core::{DisplayValue, EncodedQuery, KeySet, Operator, Parameters};
use jsontable_test_utils::{key, session, FakeTableService};
use serde_json::json;
use std::sync::Arc;

fn seeded(rows: usize) -> Arc<FakeTableService> {
    let service = FakeTableService::new();
    for i in 0..rows {
        service.seed(
            "incident",
            json!({
                "sys_id": format!("inc{:03}", i),
                "number": format!("INC{:07}", i),
                "active": if i % 2 == 0 { "true" } else { "false" },
            }),
        );
    }
    service
}

#[tokio::test]
async fn test_crud_round_trip() {
    let service = FakeTableService::new();
    let api = session(service.clone()).table_api("incident");

    let fields = Parameters::new()
        .with("short_description", "Printer on fire")
        .with("urgency", "1");
    let inserted = api.insert_record(&fields).await.unwrap();
    let k = inserted.key().clone();
    assert_eq!(inserted.value("urgency"), Some("1"));
    assert_eq!(service.row_count("incident"), 1);

    let fetched = api.get_record(&k).await.unwrap();
    assert_eq!(fetched.record().unwrap().value("short_description"), Some("Printer on fire"));

    api.update_record(&k, &Parameters::new().with("urgency", "3")).await.unwrap();
    let fetched = api.get_record(&k).await.unwrap().into_option().unwrap();
    assert_eq!(fetched.value("urgency"), Some("3"));
    assert_eq!(fetched.value("short_description"), Some("Printer on fire"));

    assert!(api.delete_record(&k).await.unwrap());
    assert!(!api.delete_record(&k).await.unwrap());
    assert_eq!(api.get_record(&k).await.unwrap(), Lookup::NotFound);
    assert_eq!(service.row_count("incident"), 0);
}

#[tokio::test]
async fn test_update_of_missing_row_is_protocol_error() {
    let service = FakeTableService::new();
    let api = session(service).table_api("incident");

    let err = api
        .update_record(&key("gone"), &Parameters::new().with("state", "7"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PROTOCOL_VIOLATION");
}

#[tokio::test]
async fn test_query_filters_keys_and_records() {
    let service = seeded(6);
    let api = session(service).table_api("incident");

    let active = EncodedQuery::new().eq("active", "true");
    let keys = api.get_keys(Some(&active)).await.unwrap();
    assert_eq!(keys.len(), 3);

    let records = api.get_records(Some(&active), DisplayValue::Raw).await.unwrap();
    assert_eq!(records.keys(), keys);

    assert_eq!(api.get_keys_all().await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_get_records_by_keys_skips_vanished_rows() {
    let service = seeded(3);
    let api = session(service).table_api("incident");

    let keys: KeySet = vec![key("inc000"), key("inc002"), key("inc999")].into_iter().collect();
    let list = api.get_records_by_keys(&keys, DisplayValue::Raw).await.unwrap();

    assert_eq!(list.len(), 2);
    assert!(list.iter().all(|r| keys.contains(r.key())));
}

#[tokio::test]
async fn test_default_reader_pages_by_key_chunks() {
    let service = seeded(7);
    let api = session(service.clone()).with_page_size(3).table_api("incident");

    let mut reader = api.default_reader();
    let mut sizes = Vec::new();
    while let Some(page) = reader.next_page().await.unwrap() {
        sizes.push(page.len());
    }
    assert_eq!(sizes, vec![3, 3, 1]);
    assert!(reader.next_page().await.unwrap().is_none());

    // one getKeys plus one getRecords per page
    let actions: Vec<String> = service
        .requests()
        .iter()
        .filter_map(|r| r.action().map(str::to_string))
        .collect();
    assert_eq!(actions, vec!["getKeys", "getRecords", "getRecords", "getRecords"]);
}

#[tokio::test]
async fn test_keyset_reader_with_query_reads_all() {
    let service = seeded(10);
    let api = session(service).table_api("incident");

    let mut reader = KeySetTableReader::new(&api)
        .with_query(EncodedQuery::new().ne("active", "true"))
        .with_display_value(DisplayValue::All)
        .with_page_size(2);
    let all = reader.read_all().await.unwrap();

    assert_eq!(all.len(), 5);
    assert_eq!(reader.keys_total(), 5);
    assert_eq!(reader.records_read(), 5);
    assert!(all.iter().all(|r| r.value("active") == Some("false")));
}

#[tokio::test]
async fn test_reader_over_empty_table() {
    let service = FakeTableService::new();
    let api = session(service.clone()).table_api("problem");

    let all = api.default_reader().read_all().await.unwrap();
    assert!(all.is_empty());
    assert_eq!(all.table().name(), "problem");
    // the empty key set never turns into a getRecords call
    assert_eq!(service.requests().len(), 1);
}

#[tokio::test]
async fn test_concurrent_operations_share_one_api() {
    let service = seeded(4);
    let api = Arc::new(session(service.clone()).table_api("incident"));

    let mut handles = Vec::new();
    for i in 0..8 {
        let api = Arc::clone(&api);
        handles.push(tokio::spawn(async move {
            let fields = Parameters::new().with("short_description", format!("task {}", i));
            api.insert_record(&fields).await.map(|r| r.key().clone())
        }));
    }

    let seeded_key = key("inc001");
    let (keys, lookup) = tokio::join!(
        async {
            let mut keys = KeySet::new();
            for handle in handles {
                keys.insert(handle.await.unwrap().unwrap());
            }
            keys
        },
        api.get_record(&seeded_key)
    );

    assert_eq!(keys.len(), 8);
    assert!(lookup.unwrap().is_found());
    assert_eq!(service.row_count("incident"), 12);
}

#[tokio::test]
async fn test_tables_are_isolated() {
    let service = seeded(2);
    let session = session(service.clone());
    let incidents = session.table_api("incident");
    let problems = session.table_api("problem");

    problems
        .insert_record(&Parameters::new().with("short_description", "root cause"))
        .await
        .unwrap();

    assert_eq!(incidents.get_keys_all().await.unwrap().len(), 2);
    assert_eq!(problems.get_keys_all().await.unwrap().len(), 1);
    assert!(service
        .requests()
        .iter()
        .any(|r| r.endpoint.as_str() == "https://test.example.com/problem.do?JSONv2"));
}

#[tokio::test]
async fn test_uninterpreted_joins_fail_instead_of_matching_nothing() {
    let service = seeded(4);
    let api = session(service).table_api("incident");

    let either = EncodedQuery::new().eq("active", "true").or("active", Operator::Eq, "false");
    let err = api.get_keys(Some(&either)).await.unwrap_err();
    assert_eq!(err.code(), "PROTOCOL_VIOLATION");
    assert!(err.to_string().contains("unsupported query term"));
}
