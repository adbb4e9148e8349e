/// Test utilities and helpers for jsontable testing
///
/// Provides two transports that stand in for a live instance:
/// [`ScriptedTransport`] replays canned responses and records what was sent,
/// [`FakeTableService`] interprets envelopes against in-memory tables.

use async_trait::async_trait;
use jsontable_client::{ClientError, HttpMethod, JsonObject, Result, Session, Transport, Url};
use jsontable_core::Key;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Base URL every test session points at
pub const TEST_INSTANCE: &str = "https://test.example.com/";

/// A request as observed by a test transport
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub endpoint: Url,
    pub method: HttpMethod,
    pub envelope: JsonObject,
}

impl RecordedRequest {
    pub fn action(&self) -> Option<&str> {
        self.param("sysparm_action")
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.envelope.get(name).and_then(Value::as_str)
    }
}

/// Session over `transport` rooted at [`TEST_INSTANCE`]
pub fn session(transport: Arc<dyn Transport>) -> Session {
    let base = Url::parse(TEST_INSTANCE).expect("valid test instance URL");
    Session::new(base, transport)
}

/// `{"records": [...]}`
pub fn records_response(records: Vec<Value>) -> Value {
    json!({ "records": records })
}

/// A flat record with `sys_id` plus the given string fields
pub fn record(sys_id: &str, fields: &[(&str, &str)]) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("sys_id".to_string(), json!(sys_id));
    for (name, value) in fields {
        obj.insert(name.to_string(), json!(value));
    }
    Value::Object(obj)
}

pub fn key(id: &str) -> Key {
    Key::new(id).expect("valid test key")
}

/// Replays queued responses in order and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<JsonObject>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response body; it must be a JSON object
    pub fn respond(&self, body: Value) -> &Self {
        let obj = body
            .as_object()
            .cloned()
            .expect("scripted response must be a JSON object");
        self.responses.lock().push_back(Ok(obj));
        self
    }

    /// Queue a transport failure
    pub fn fail(&self, error: ClientError) -> &Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, endpoint: &Url, method: HttpMethod, envelope: &JsonObject) -> Result<JsonObject> {
        self.requests.lock().push(RecordedRequest {
            endpoint: endpoint.clone(),
            method,
            envelope: envelope.clone(),
        });
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Transport("no scripted response left".to_string())))
    }
}

type Rows = BTreeMap<String, JsonObject>;

/// In-memory service speaking the JSONv2 envelope protocol.
///
/// Supports the six actions with `field=value`, `field!=value` and
/// `fieldINa,b` query terms joined by `^`; `ORDERBY` terms are ignored.
/// `^OR`, `^NQ` and escaped carets are answered with a service error.
#[derive(Default)]
pub struct FakeTableService {
    tables: Mutex<BTreeMap<String, Rows>>,
    next_id: Mutex<u64>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTableService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store a row directly; it must carry a `sys_id`
    pub fn seed(&self, table: &str, row: Value) {
        let obj = row.as_object().cloned().expect("seed row must be a JSON object");
        let id = obj
            .get("sys_id")
            .and_then(Value::as_str)
            .expect("seed row needs a sys_id")
            .to_string();
        self.tables.lock().entry(table.to_string()).or_default().insert(id, obj);
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.lock().get(table).map_or(0, BTreeMap::len)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    fn allocate_id(&self) -> String {
        let mut next = self.next_id.lock();
        *next += 1;
        format!("{:032x}", *next)
    }

    fn handle(&self, table: &str, envelope: &JsonObject) -> Value {
        let param = |name: &str| envelope.get(name).and_then(Value::as_str);
        let fields: JsonObject = envelope
            .iter()
            .filter(|(k, _)| !k.starts_with("sysparm_") && k.as_str() != "displayvalue")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut tables = self.tables.lock();
        let rows = tables.entry(table.to_string()).or_default();

        match param("sysparm_action") {
            Some("getKeys") => match select(rows, param("sysparm_query")) {
                Ok(hits) => records_response(hits.into_iter().map(|r| r["sys_id"].clone()).collect()),
                Err(e) => json!({ "error": e }),
            },
            Some("getRecords") => match select(rows, param("sysparm_query")) {
                Ok(hits) => records_response(hits.into_iter().map(Value::Object).collect()),
                Err(e) => json!({ "error": e }),
            },
            Some("get") => {
                let hit = param("sysparm_sys_id").and_then(|id| rows.get(id)).cloned();
                records_response(hit.into_iter().map(Value::Object).collect())
            }
            Some("insert") => {
                let id = self.allocate_id();
                let mut row = fields;
                row.insert("sys_id".to_string(), json!(id));
                rows.insert(id, row.clone());
                records_response(vec![Value::Object(row)])
            }
            Some("update") => {
                let hit = param("sysparm_sys_id").and_then(|id| rows.get_mut(id));
                match hit {
                    Some(row) => {
                        row.extend(fields);
                        records_response(vec![Value::Object(row.clone())])
                    }
                    None => records_response(vec![]),
                }
            }
            Some("deleteRecord") => {
                let removed = param("sysparm_sys_id").and_then(|id| rows.remove(id));
                records_response(removed.into_iter().map(Value::Object).collect())
            }
            other => json!({ "error": format!("unsupported action {:?}", other) }),
        }
    }
}

fn select(rows: &Rows, query: Option<&str>) -> std::result::Result<Vec<JsonObject>, String> {
    let query = query.unwrap_or("");
    if query.contains("^^") {
        return Err(format!("escaped '^' is not supported: '{}'", query));
    }

    let mut terms = Vec::new();
    for term in query.split('^').filter(|t| !t.is_empty()) {
        if term.starts_with("ORDERBY") {
            continue;
        }
        // only AND joins are interpreted
        if term.starts_with("OR") || term.starts_with("NQ") {
            return Err(format!("unsupported query term '{}'", term));
        }
        terms.push(term);
    }

    let mut hits = Vec::new();
    for row in rows.values() {
        let mut matched = true;
        for term in &terms {
            if !term_matches(row, term)? {
                matched = false;
                break;
            }
        }
        if matched {
            hits.push(row.clone());
        }
    }
    Ok(hits)
}

fn term_matches(row: &JsonObject, term: &str) -> std::result::Result<bool, String> {
    let field_value = |field: &str| row.get(field).and_then(Value::as_str).unwrap_or("").to_string();

    if let Some((field, value)) = term.split_once("!=") {
        return Ok(field_value(field) != value);
    }
    if let Some((field, value)) = term.split_once('=') {
        return Ok(field_value(field) == value);
    }
    if let Some((field, list)) = term.split_once("IN") {
        let actual = field_value(field);
        return Ok(list.split(',').any(|v| !v.is_empty() && v == actual));
    }
    Err(format!("unsupported query term '{}'", term))
}

#[async_trait]
impl Transport for FakeTableService {
    async fn execute(&self, endpoint: &Url, method: HttpMethod, envelope: &JsonObject) -> Result<JsonObject> {
        self.requests.lock().push(RecordedRequest {
            endpoint: endpoint.clone(),
            method,
            envelope: envelope.clone(),
        });

        let table = endpoint
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(|last| last.strip_suffix(".do"))
            .ok_or_else(|| ClientError::Http {
                status: 404,
                body: format!("no table at {}", endpoint),
            })?
            .to_string();

        match self.handle(&table, envelope) {
            Value::Object(obj) => Ok(obj),
            other => Err(ClientError::MalformedResponse(other.to_string())),
        }
    }
}
