/// Typed views over the `records` array of a response.

use crate::{Error, Key, KeySet, Result, Table, KEY_FIELD};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Prefix the service uses for companion display-value fields
const DISPLAY_PREFIX: &str = "dv_";

/// Which field representations a read asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayValue {
    /// Raw stored values only
    #[default]
    Raw,
    /// Raw values plus human-readable display values
    All,
}

impl DisplayValue {
    /// Value of the `displayvalue` request parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            DisplayValue::Raw => "false",
            DisplayValue::All => "all",
        }
    }

    pub fn from_flag(display: bool) -> Self {
        if display {
            DisplayValue::All
        } else {
            DisplayValue::Raw
        }
    }

    /// Interpret a `displayvalue` parameter; anything but `all` is raw
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some(p) if p.eq_ignore_ascii_case("all") => DisplayValue::All,
            _ => DisplayValue::Raw,
        }
    }
}

/// One field of a record: the stored value and, when requested, its display form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_value: Option<String>,
}

impl FieldValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display_value: None,
        }
    }

    pub fn with_display(value: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display_value: Some(display.into()),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn display_value(&self) -> Option<&str> {
        self.display_value.as_deref()
    }

    /// Display value when present, raw value otherwise
    pub fn display_or_value(&self) -> &str {
        self.display_value.as_deref().unwrap_or(&self.value)
    }

    fn from_json(name: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Object(pair) => {
                let raw = pair.get("value").ok_or_else(|| {
                    Error::Decode(format!("field '{}' is an object without 'value'", name))
                })?;
                let mut field = FieldValue::new(scalar(name, raw)?);
                if let Some(display) = pair.get("display_value") {
                    field.display_value = Some(scalar(name, display)?);
                }
                Ok(field)
            }
            other => Ok(FieldValue::new(scalar(name, other)?)),
        }
    }
}

fn scalar(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(Error::Decode(format!(
            "field '{}' has a nested value",
            name
        ))),
    }
}

/// A decoded row of a table, identified by exactly one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    table: Table,
    key: Key,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Decode one response element.
    ///
    /// Decoding is all-or-nothing: any malformed field or a missing key fails
    /// the whole record. With [`DisplayValue::All`], `dv_<name>` companions are
    /// folded into the display value of `<name>`.
    pub fn from_json(table: &Table, value: &Value, mode: DisplayValue) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::Decode(format!("record is not a JSON object: {}", value)))?;

        let mut fields = BTreeMap::new();
        let mut companions = Vec::new();
        for (name, v) in obj {
            if mode == DisplayValue::All {
                if let Some(base) = name.strip_prefix(DISPLAY_PREFIX) {
                    if obj.contains_key(base) {
                        companions.push((base, v));
                        continue;
                    }
                }
            }
            fields.insert(name.clone(), FieldValue::from_json(name, v)?);
        }
        for (base, v) in companions {
            let display = scalar(base, v)?;
            if let Some(field) = fields.get_mut(base) {
                field.display_value = Some(display);
            }
        }

        let key = match fields.get(KEY_FIELD) {
            Some(field) => Key::new(field.value())
                .map_err(|_| Error::Decode(format!("record has an empty {}", KEY_FIELD)))?,
            None => return Err(Error::Decode(format!("record has no {} field", KEY_FIELD))),
        };

        Ok(Self {
            table: table.clone(),
            key,
            fields,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Raw value of a field
    pub fn value(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(FieldValue::value)
    }

    pub fn display_value(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(FieldValue::display_value)
    }

    /// Fields in name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON rendering: plain strings, or `{value, display_value}` pairs
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        for (name, field) in &self.fields {
            let v = match field.display_value() {
                Some(display) => serde_json::json!({
                    "value": field.value(),
                    "display_value": display,
                }),
                None => Value::String(field.value().to_string()),
            };
            obj.insert(name.clone(), v);
        }
        Value::Object(obj)
    }
}

/// The record returned by an insert, carrying its server-assigned key
pub type InsertResponse = Record;

/// Ordered records of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordList {
    table: Table,
    records: Vec<Record>,
}

impl RecordList {
    pub fn new(table: Table, records: Vec<Record>) -> Self {
        Self { table, records }
    }

    pub fn empty(table: Table) -> Self {
        Self::new(table, Vec::new())
    }

    /// Decode every element of a validated `records` array
    pub fn from_json_array(table: &Table, values: &[Value], mode: DisplayValue) -> Result<Self> {
        let records = values
            .iter()
            .map(|v| Record::from_json(table, v, mode))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(table.clone(), records))
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Keys of all records, in record order
    pub fn keys(&self) -> KeySet {
        self.records.iter().map(|r| r.key().clone()).collect()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl IntoIterator for RecordList {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordList {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
