use crate::error::{ClientError, Result};
use crate::json_api::JsonTableApi;
use crate::transport::{HttpTransport, Transport};
use jsontable_core::{config::DEFAULT_PAGE_SIZE, ClientConfig, Table};
use reqwest::Url;
use std::fmt;
use std::sync::Arc;

/// A connection to one instance: its base URL plus a shared transport.
///
/// Cheap to clone; every table API created from a session shares the same
/// transport (and therefore the same HTTP connection pool).
#[derive(Clone)]
pub struct Session {
    base: Url,
    transport: Arc<dyn Transport>,
    page_size: usize,
}

impl Session {
    /// Create a session over an arbitrary transport
    pub fn new(base: Url, transport: Arc<dyn Transport>) -> Self {
        let mut base = base;
        // join() replaces the last path segment unless the base ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            base,
            transport,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Validate `config` and connect through an [`HttpTransport`]
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let base = Url::parse(&config.instance_url).map_err(|e| {
            ClientError::Configuration(format!("Invalid instance URL '{}': {}", config.instance_url, e))
        })?;
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(base, Arc::new(transport)).with_page_size(config.page_size))
    }

    /// Set the page size handed to default table readers
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Resolve a path relative to the instance base URL
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| ClientError::Configuration(format!("Cannot resolve '{}': {}", path, e)))
    }

    /// JSON table API bound to `table`
    pub fn table_api(&self, table: impl Into<Table>) -> JsonTableApi {
        JsonTableApi::new(self, table)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base", &self.base.as_str())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}
