/// Request envelopes of the JSONv2 protocol
///
/// Every logical operation is one variant; `to_json` is the only place the
/// wire parameter names are written.

use crate::error::Result;
use jsontable_core::{DisplayValue, EncodedQuery, Error, Key, Parameters, Table};
use serde_json::{Map, Value};
use std::fmt;

pub const ACTION: &str = "sysparm_action";
pub const QUERY: &str = "sysparm_query";
pub const SYS_ID: &str = "sysparm_sys_id";
pub const DISPLAY_VALUE: &str = "displayvalue";

/// Names a caller may not use as record fields on writes
const RESERVED: [&str; 2] = [ACTION, SYS_ID];

/// Value of `sysparm_action`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    GetKeys,
    Get,
    GetRecords,
    Insert,
    Update,
    DeleteRecord,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::GetKeys => "getKeys",
            Action::Get => "get",
            Action::GetRecords => "getRecords",
            Action::Insert => "insert",
            Action::Update => "update",
            Action::DeleteRecord => "deleteRecord",
        }
    }

    /// Inverse of [`Action::as_str`]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "getKeys" => Some(Action::GetKeys),
            "get" => Some(Action::Get),
            "getRecords" => Some(Action::GetRecords),
            "insert" => Some(Action::Insert),
            "update" => Some(Action::Update),
            "deleteRecord" => Some(Action::DeleteRecord),
            _ => None,
        }
    }

    /// Reads may be re-sent freely. A repeated write can change the outcome:
    /// a second insert adds a row and a second delete reports "not found".
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Action::GetKeys | Action::Get | Action::GetRecords)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request body
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    GetKeys { query: Option<EncodedQuery> },
    Get { key: Key },
    GetRecords { params: Parameters },
    Insert { fields: Parameters },
    Update { key: Key, fields: Parameters },
    DeleteRecord { key: Key },
}

impl Envelope {
    /// An absent query and an empty query both mean "all rows" and build the same envelope
    pub fn get_keys(query: Option<&EncodedQuery>) -> Self {
        Envelope::GetKeys {
            query: restriction(query).cloned(),
        }
    }

    pub fn get(key: &Key) -> Self {
        Envelope::Get { key: key.clone() }
    }

    pub fn get_records(query: Option<&EncodedQuery>, display: DisplayValue) -> Self {
        let mut params = Parameters::new();
        params.add(DISPLAY_VALUE, display.as_param());
        if let Some(q) = restriction(query) {
            params.add(QUERY, q.to_string());
        }
        Envelope::GetRecords { params }
    }

    /// Free-form read; `sysparm_action` is always forced to `getRecords`
    pub fn get_records_with(params: Parameters) -> Self {
        Envelope::GetRecords { params }
    }

    pub fn insert(fields: &Parameters) -> Result<Self> {
        check_fields(fields)?;
        Ok(Envelope::Insert {
            fields: fields.clone(),
        })
    }

    pub fn update(key: &Key, fields: &Parameters) -> Result<Self> {
        check_fields(fields)?;
        Ok(Envelope::Update {
            key: key.clone(),
            fields: fields.clone(),
        })
    }

    pub fn delete_record(key: &Key) -> Self {
        Envelope::DeleteRecord { key: key.clone() }
    }

    pub fn action(&self) -> Action {
        match self {
            Envelope::GetKeys { .. } => Action::GetKeys,
            Envelope::Get { .. } => Action::Get,
            Envelope::GetRecords { .. } => Action::GetRecords,
            Envelope::Insert { .. } => Action::Insert,
            Envelope::Update { .. } => Action::Update,
            Envelope::DeleteRecord { .. } => Action::DeleteRecord,
        }
    }

    /// The addressed record, for by-key actions
    pub fn key(&self) -> Option<&Key> {
        match self {
            Envelope::Get { key } | Envelope::Update { key, .. } | Envelope::DeleteRecord { key } => {
                Some(key)
            }
            _ => None,
        }
    }

    /// Display mode the response will be decoded with
    pub fn display_value(&self) -> DisplayValue {
        match self {
            Envelope::GetRecords { params } => DisplayValue::from_param(params.get(DISPLAY_VALUE)),
            _ => DisplayValue::Raw,
        }
    }

    /// Wire form of the envelope. Caller fields are merged at the top level.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut obj = Map::new();
        match self {
            Envelope::GetKeys { query } => {
                if let Some(q) = query {
                    obj.insert(QUERY.to_string(), Value::String(q.to_string()));
                }
            }
            Envelope::Get { key } | Envelope::DeleteRecord { key } => {
                obj.insert(SYS_ID.to_string(), Value::String(key.to_string()));
            }
            Envelope::GetRecords { params } => {
                params.append_to(&mut obj);
            }
            Envelope::Insert { fields } => {
                fields.append_to(&mut obj);
            }
            Envelope::Update { key, fields } => {
                fields.append_to(&mut obj);
                obj.insert(SYS_ID.to_string(), Value::String(key.to_string()));
            }
        }
        obj.insert(ACTION.to_string(), Value::String(self.action().as_str().to_string()));
        obj
    }

    /// Short description naming the request, used in errors and logs
    pub fn describe(&self, table: &Table) -> String {
        match self.key() {
            Some(key) => format!("{} on {} sys_id={}", self.action(), table, key),
            None => format!("{} on {}", self.action(), table),
        }
    }
}

/// The query to put on the wire, if it restricts anything
fn restriction(query: Option<&EncodedQuery>) -> Option<&EncodedQuery> {
    if EncodedQuery::is_unrestricted(query) {
        None
    } else {
        query
    }
}

fn check_fields(fields: &Parameters) -> Result<()> {
    for name in RESERVED {
        if fields.contains(name) {
            return Err(Error::InvalidArgument(format!(
                "'{}' is a protocol parameter, not a record field",
                name
            ))
            .into());
        }
    }
    Ok(())
}
