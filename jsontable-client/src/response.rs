/// Response validation
///
/// Every typed decode goes through [`records`], which insists on the
/// `records` array the service echoes for every successful action.

use crate::error::{ClientError, Result};
use crate::transport::JsonObject;
use jsontable_core::{DisplayValue, KeySet, RecordList, Table};
use serde_json::Value;

pub const RECORDS: &str = "records";

/// Borrow the `records` array of a response.
///
/// A missing or non-array field is a protocol violation; an empty array is a
/// valid zero-row answer. `request` names the request in the error.
pub fn records<'a>(response: &'a JsonObject, request: &str) -> Result<&'a [Value]> {
    match response.get(RECORDS) {
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(ClientError::protocol(
            request,
            format!("'{}' is not an array: {}", RECORDS, type_name(other)),
        )),
        None => {
            let reason = match response.get("error") {
                Some(Value::String(msg)) => format!("no '{}' in response, service error: {}", RECORDS, msg),
                _ => format!("no '{}' in response", RECORDS),
            };
            Err(ClientError::protocol(request, reason))
        }
    }
}

/// Validate and decode a key list
pub fn decode_keys(response: &JsonObject, request: &str) -> Result<KeySet> {
    let items = records(response, request)?;
    KeySet::from_json_array(items).map_err(|e| ClientError::protocol(request, e.to_string()))
}

/// Validate and decode a record list
pub fn decode_records(
    response: &JsonObject,
    table: &Table,
    mode: DisplayValue,
    request: &str,
) -> Result<RecordList> {
    let items = records(response, request)?;
    RecordList::from_json_array(table, items, mode)
        .map_err(|e| ClientError::protocol(request, e.to_string()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_records_present() {
        let response = obj(json!({"records": [{"sys_id": "a"}]}));
        assert_eq!(records(&response, "get on incident").unwrap().len(), 1);

        let empty = obj(json!({"records": []}));
        assert!(records(&empty, "get on incident").unwrap().is_empty());
    }

    #[test]
    fn test_missing_records_is_protocol_error() {
        let response = obj(json!({"count": 0}));
        match records(&response, "getKeys on incident") {
            Err(ClientError::Protocol { request, reason }) => {
                assert_eq!(request, "getKeys on incident");
                assert!(reason.contains("no 'records'"));
            }
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn test_service_error_is_reported() {
        let response = obj(json!({"error": "Insufficient rights"}));
        let err = records(&response, "insert on incident").unwrap_err();
        assert!(err.to_string().contains("Insufficient rights"));
    }

    #[test]
    fn test_records_wrong_type() {
        let response = obj(json!({"records": "nope"}));
        let err = records(&response, "get on incident").unwrap_err();
        assert!(err.to_string().contains("not an array: string"));
    }

    #[test]
    fn test_decode_failure_names_request() {
        let response = obj(json!({"records": [{"number": "INC1"}]}));
        let err = decode_records(&response, &Table::new("incident"), DisplayValue::Raw, "get on incident")
            .unwrap_err();
        assert!(matches!(err, ClientError::Protocol { ref request, .. } if request == "get on incident"));
    }

    #[test]
    fn test_decode_keys() {
        let response = obj(json!({"records": ["a", "b"]}));
        let keys = decode_keys(&response, "getKeys on incident").unwrap();
        assert_eq!(keys.len(), 2);
    }
}
