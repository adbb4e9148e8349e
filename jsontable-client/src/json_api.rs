/// JSONv2 implementation of the table API
///
/// Each operation builds one [`Envelope`], posts it to `<table>.do?JSONv2`,
/// validates the `records` array and enforces the operation's cardinality.

use crate::api::{Lookup, TableApi};
use crate::envelope::{Action, Envelope};
use crate::error::{ClientError, Result};
use crate::reader::{KeySetTableReader, TableReader};
use crate::response;
use crate::session::Session;
use crate::transport::{HttpMethod, JsonObject, Transport};
use async_trait::async_trait;
use jsontable_core::{
    DisplayValue, EncodedQuery, InsertResponse, Key, KeySet, Parameters, Record, RecordList, Table,
};
use reqwest::Url;
use std::sync::Arc;
use tracing::{debug, debug_span, trace, warn, Instrument, Span};

/// Table API bound to one table and one resolved endpoint
pub struct JsonTableApi {
    table: Table,
    /// Resolution failures are kept and reported by every operation
    endpoint: std::result::Result<Url, String>,
    transport: Arc<dyn Transport>,
    page_size: usize,
}

impl JsonTableApi {
    /// Bind to `table` on the session's instance. Never fails; an unusable
    /// table name surfaces as [`ClientError::Configuration`] on first use.
    pub fn new(session: &Session, table: impl Into<Table>) -> Self {
        let table = table.into();
        let endpoint = table
            .validate()
            .map_err(|e| e.to_string())
            .and_then(|_| {
                session
                    .resolve(&format!("{}.do?JSONv2", table.name()))
                    .map_err(|e| e.to_string())
            });

        match &endpoint {
            Ok(url) => debug!(table = %table, endpoint = %url, "init"),
            Err(reason) => warn!(table = %table, %reason, "table endpoint could not be resolved"),
        }

        Self {
            table,
            endpoint,
            transport: session.transport(),
            page_size: session.page_size(),
        }
    }

    /// The resolved endpoint
    pub fn endpoint(&self) -> Result<&Url> {
        self.endpoint
            .as_ref()
            .map_err(|reason| ClientError::Configuration(reason.clone()))
    }

    fn span(&self, action: Action) -> Span {
        debug_span!("table_api", table = %self.table, op = action.as_str())
    }

    async fn execute(&self, envelope: &Envelope) -> Result<JsonObject> {
        let endpoint = self.endpoint()?;
        let body = envelope.to_json();
        trace!(?body, "sending envelope");
        self.transport.execute(endpoint, HttpMethod::Post, &body).await
    }

    async fn fetch_records(&self, envelope: &Envelope) -> Result<RecordList> {
        let response = self.execute(envelope).await?;
        let request = envelope.describe(&self.table);
        let records = response::decode_records(&response, &self.table, envelope.display_value(), &request)?;
        debug!(records = records.len(), "response decoded");
        Ok(records)
    }

    /// Require exactly one record in a write response
    fn single(&self, envelope: &Envelope, records: RecordList) -> Result<Record> {
        let count = records.len();
        if count != 1 {
            return Err(ClientError::protocol(
                envelope.describe(&self.table),
                format!("expected exactly 1 record, got {}", count),
            ));
        }
        records
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::protocol(envelope.describe(&self.table), "record list emptied"))
    }
}

#[async_trait]
impl TableApi for JsonTableApi {
    fn table(&self) -> &Table {
        &self.table
    }

    async fn get_keys(&self, query: Option<&EncodedQuery>) -> Result<KeySet> {
        let envelope = Envelope::get_keys(query);
        async {
            let response = self.execute(&envelope).await?;
            let keys = response::decode_keys(&response, &envelope.describe(&self.table))?;
            debug!(keys = keys.len(), "response decoded");
            Ok(keys)
        }
        .instrument(self.span(Action::GetKeys))
        .await
    }

    async fn get_record(&self, key: &Key) -> Result<Lookup> {
        let envelope = Envelope::get(key);
        async {
            let records = self.fetch_records(&envelope).await?;
            match records.len() {
                0 => Ok(Lookup::NotFound),
                1 => {
                    let record = self.single(&envelope, records)?;
                    if record.key() != key {
                        return Err(ClientError::protocol(
                            envelope.describe(&self.table),
                            format!("response carries key {}", record.key()),
                        ));
                    }
                    Ok(Lookup::Found(record))
                }
                n => Err(ClientError::protocol(
                    envelope.describe(&self.table),
                    format!("exact key lookup returned {} records", n),
                )),
            }
        }
        .instrument(self.span(Action::Get))
        .await
    }

    async fn get_records(&self, query: Option<&EncodedQuery>, display: DisplayValue) -> Result<RecordList> {
        let envelope = Envelope::get_records(query, display);
        self.fetch_records(&envelope)
            .instrument(self.span(Action::GetRecords))
            .await
    }

    async fn get_records_with(&self, params: Parameters) -> Result<RecordList> {
        let envelope = Envelope::get_records_with(params);
        self.fetch_records(&envelope)
            .instrument(self.span(Action::GetRecords))
            .await
    }

    async fn insert_record(&self, fields: &Parameters) -> Result<InsertResponse> {
        let envelope = Envelope::insert(fields)?;
        async {
            let records = self.fetch_records(&envelope).await?;
            let record = self.single(&envelope, records)?;
            debug!(key = %record.key(), "inserted");
            Ok(record)
        }
        .instrument(self.span(Action::Insert))
        .await
    }

    async fn update_record(&self, key: &Key, fields: &Parameters) -> Result<()> {
        let envelope = Envelope::update(key, fields)?;
        async {
            let records = self.fetch_records(&envelope).await?;
            self.single(&envelope, records)?;
            Ok(())
        }
        .instrument(self.span(Action::Update))
        .await
    }

    async fn delete_record(&self, key: &Key) -> Result<bool> {
        let envelope = Envelope::delete_record(key);
        async {
            let records = self.fetch_records(&envelope).await?;
            if records.is_empty() {
                return Ok(false);
            }
            let record = self.single(&envelope, records)?;
            if record.key() != key {
                return Err(ClientError::protocol(
                    envelope.describe(&self.table),
                    format!("service deleted {} instead", record.key()),
                ));
            }
            Ok(true)
        }
        .instrument(self.span(Action::DeleteRecord))
        .await
    }

    fn default_reader(&self) -> Box<dyn TableReader + '_> {
        Box::new(KeySetTableReader::new(self).with_page_size(self.page_size))
    }
}
