/// Bulk reading strategies

use crate::api::TableApi;
use crate::error::Result;
use async_trait::async_trait;
use jsontable_core::{config::DEFAULT_PAGE_SIZE, DisplayValue, EncodedQuery, KeySet, RecordList, Table};
use tracing::debug;

/// Reads a table page by page
#[async_trait]
pub trait TableReader: Send {
    fn table(&self) -> &Table;

    /// Next page of records, or `None` once the table is exhausted
    async fn next_page(&mut self) -> Result<Option<RecordList>>;

    /// Drain every remaining page into one list
    async fn read_all(&mut self) -> Result<RecordList> {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await? {
            records.extend(page);
        }
        Ok(RecordList::new(self.table().clone(), records))
    }
}

/// Fetches the key set once, then reads the records in key chunks.
///
/// Each page is one `getRecords` call with a `sys_idIN` query, so pages are
/// never truncated by the service's row limit.
pub struct KeySetTableReader<'a> {
    api: &'a dyn TableApi,
    query: Option<EncodedQuery>,
    display: DisplayValue,
    page_size: usize,
    pending: Option<std::vec::IntoIter<KeySet>>,
    keys_total: usize,
    records_read: usize,
}

impl<'a> KeySetTableReader<'a> {
    pub fn new(api: &'a dyn TableApi) -> Self {
        Self {
            api,
            query: None,
            display: DisplayValue::Raw,
            page_size: DEFAULT_PAGE_SIZE,
            pending: None,
            keys_total: 0,
            records_read: 0,
        }
    }

    /// Restrict the read to rows matching `query`
    pub fn with_query(mut self, query: EncodedQuery) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_display_value(mut self, display: DisplayValue) -> Self {
        self.display = display;
        self
    }

    /// Keys per page (at least 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Number of keys found; zero until the first page is requested
    pub fn keys_total(&self) -> usize {
        self.keys_total
    }

    pub fn records_read(&self) -> usize {
        self.records_read
    }
}

#[async_trait]
impl<'a> TableReader for KeySetTableReader<'a> {
    fn table(&self) -> &Table {
        self.api.table()
    }

    async fn next_page(&mut self) -> Result<Option<RecordList>> {
        if self.pending.is_none() {
            let keys = self.api.get_keys(self.query.as_ref()).await?;
            self.keys_total = keys.len();
            debug!(table = %self.api.table(), keys = self.keys_total, page_size = self.page_size, "key set fetched");
            self.pending = Some(keys.chunks(self.page_size).into_iter());
        }

        let chunk = match self.pending.as_mut().and_then(Iterator::next) {
            Some(chunk) => chunk,
            None => return Ok(None),
        };

        let page = self.api.get_records_by_keys(&chunk, self.display).await?;
        self.records_read += page.len();
        debug!(
            table = %self.api.table(),
            page = page.len(),
            read = self.records_read,
            total = self.keys_total,
            "page read"
        );
        Ok(Some(page))
    }
}
