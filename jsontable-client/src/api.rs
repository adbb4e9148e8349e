/// The table API capability set
///
/// [`TableApi`] is what callers program against. [`crate::JsonTableApi`]
/// implements it over the JSONv2 protocol; another wire format would be a
/// sibling implementation.

use crate::error::Result;
use crate::reader::TableReader;
use async_trait::async_trait;
use jsontable_core::{
    DisplayValue, EncodedQuery, InsertResponse, Key, KeySet, Parameters, Record, RecordList, Table,
};

/// Outcome of a lookup by exact key. `NotFound` is a result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(Record),
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn record(&self) -> Option<&Record> {
        match self {
            Lookup::Found(record) => Some(record),
            Lookup::NotFound => None,
        }
    }

    pub fn into_option(self) -> Option<Record> {
        match self {
            Lookup::Found(record) => Some(record),
            Lookup::NotFound => None,
        }
    }
}

impl From<Lookup> for Option<Record> {
    fn from(lookup: Lookup) -> Self {
        lookup.into_option()
    }
}

/// Operations on one remote table
#[async_trait]
pub trait TableApi: Send + Sync {
    /// The table this API is bound to
    fn table(&self) -> &Table;

    /// Keys of all rows matching `query`; `None` or an empty query means all rows
    async fn get_keys(&self, query: Option<&EncodedQuery>) -> Result<KeySet>;

    /// Keys of every row in the table
    async fn get_keys_all(&self) -> Result<KeySet> {
        self.get_keys(None).await
    }

    /// Fetch one record by exact key
    async fn get_record(&self, key: &Key) -> Result<Lookup>;

    /// Rows matching `query`, subject to the service's own row limit
    async fn get_records(&self, query: Option<&EncodedQuery>, display: DisplayValue) -> Result<RecordList>;

    /// Rows whose key is in `keys`. An empty set returns an empty list without a request.
    async fn get_records_by_keys(&self, keys: &KeySet, display: DisplayValue) -> Result<RecordList> {
        if keys.is_empty() {
            return Ok(RecordList::empty(self.table().clone()));
        }
        self.get_records(Some(&keys.encoded_query()), display).await
    }

    /// Read with caller-assembled request parameters
    async fn get_records_with(&self, params: Parameters) -> Result<RecordList>;

    /// Create exactly one row and return it with its assigned key
    async fn insert_record(&self, fields: &Parameters) -> Result<InsertResponse>;

    /// Update exactly the row addressed by `key`
    async fn update_record(&self, key: &Key, fields: &Parameters) -> Result<()>;

    /// Delete the row addressed by `key`; false if it did not exist
    async fn delete_record(&self, key: &Key) -> Result<bool>;

    /// Default bulk iteration strategy over this table
    fn default_reader(&self) -> Box<dyn TableReader + '_>;
}
