/// Record identity: a single key and ordered sets of keys.

use crate::{query::EncodedQuery, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Name of the field every record carries its key in.
pub const KEY_FIELD: &str = "sys_id";

/// Opaque identifier of one remote record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key(String);

impl Key {
    /// Create a key, rejecting empty or blank identifiers
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidKey("key must not be empty".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode a key from a response element.
    ///
    /// `getKeys` answers with bare strings while record-bearing actions answer
    /// with objects that carry the key in [`KEY_FIELD`]; both are accepted.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Key::new(s.as_str()),
            Value::Object(obj) => match obj.get(KEY_FIELD) {
                Some(Value::String(s)) => Key::new(s.as_str()),
                Some(other) => Err(Error::Decode(format!(
                    "{} must be a string, got {}",
                    KEY_FIELD, other
                ))),
                None => Err(Error::Decode(format!("entry has no {} field", KEY_FIELD))),
            },
            other => Err(Error::Decode(format!("not a key: {}", other))),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Key::new(s)
    }
}

impl TryFrom<String> for Key {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Key::new(s)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered collection of unique keys.
///
/// Iteration follows insertion order. Inserting a key that is already
/// present leaves the set unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: Vec<Key>,
    seen: HashSet<Key>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key, returning false if it was already present
    pub fn insert(&mut self, key: Key) -> bool {
        if self.seen.contains(&key) {
            return false;
        }
        self.seen.insert(key.clone());
        self.keys.push(key);
        true
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Key> {
        self.keys.iter()
    }

    pub fn as_slice(&self) -> &[Key] {
        &self.keys
    }

    /// Decode the elements of a validated response array
    pub fn from_json_array(values: &[Value]) -> Result<Self> {
        let mut keys = KeySet::new();
        for value in values {
            keys.insert(Key::from_json(value)?);
        }
        Ok(keys)
    }

    /// Predicate selecting exactly the rows whose key is in this set.
    ///
    /// An empty set yields a query that matches nothing, which is not the
    /// same thing as the empty (unrestricted) query.
    pub fn encoded_query(&self) -> EncodedQuery {
        EncodedQuery::new().is_in(KEY_FIELD, self.keys.iter().map(Key::as_str))
    }

    /// Split into consecutive sets of at most `size` keys
    pub fn chunks(&self, size: usize) -> Vec<KeySet> {
        let size = size.max(1);
        self.keys
            .chunks(size)
            .map(|chunk| chunk.iter().cloned().collect())
            .collect()
    }
}

impl FromIterator<Key> for KeySet {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        let mut keys = KeySet::new();
        keys.extend(iter);
        keys
    }
}

impl Extend<Key> for KeySet {
    fn extend<I: IntoIterator<Item = Key>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl IntoIterator for KeySet {
    type Item = Key;
    type IntoIter = std::vec::IntoIter<Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

impl<'a> IntoIterator for &'a KeySet {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}
