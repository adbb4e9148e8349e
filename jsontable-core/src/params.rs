use crate::{Error, Result};
use serde_json::{Map, Value};

/// Ordered request parameters (name -> string value).
///
/// Setting a name that is already present replaces its value in place, so
/// the original position is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: Vec<(String, String)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder form of [`Parameters::add`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Convert to a JSON object with one string member per parameter
    pub fn to_json(&self) -> Map<String, Value> {
        let mut obj = Map::new();
        self.append_to(&mut obj);
        obj
    }

    /// Merge every parameter into `obj` at the top level
    pub fn append_to(&self, obj: &mut Map<String, Value>) {
        for (name, value) in &self.entries {
            obj.insert(name.clone(), Value::String(value.clone()));
        }
    }

    /// Build parameters from a flat JSON object.
    ///
    /// Numbers and booleans are rendered as text and `null` becomes the empty
    /// string (which clears a field on write). Nested values are rejected.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidArgument("fields must be a JSON object".to_string()))?;

        let mut params = Parameters::new();
        for (name, v) in obj {
            let text = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(Error::InvalidArgument(format!(
                        "field '{}' must be a scalar value",
                        name
                    )))
                }
            };
            params.add(name.clone(), text);
        }
        Ok(params)
    }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (name, value) in iter {
            params.add(name, value);
        }
        params
    }
}
