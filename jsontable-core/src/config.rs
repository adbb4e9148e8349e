use crate::{retry::RetryPolicy, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of keys requested per page by the key-set reader
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Upper bound on the reader page size; longer `sys_idIN` lists are refused by the service
pub const MAX_PAGE_SIZE: usize = 10_000;

/// Client configuration: where the instance lives and how to talk to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the instance, e.g. `https://dev12345.service-now.com/`
    pub instance_url: String,

    /// Basic-auth user (None = anonymous)
    pub username: Option<String>,

    pub password: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Keys fetched per page by the default table reader
    pub page_size: usize,

    /// Backoff policy of the HTTP transport
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            instance_url: String::new(),
            username: None,
            password: None,
            timeout_secs: 60,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration for an instance with default values
    pub fn new(instance_url: impl Into<String>) -> Self {
        Self {
            instance_url: instance_url.into(),
            ..Self::default()
        }
    }

    /// Set basic-auth credentials
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set reader page size
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Load from a JSON file; missing members take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Load from `JSONTABLE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an explicit variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = ClientConfig::default();

        if let Some(url) = lookup("JSONTABLE_INSTANCE") {
            config.instance_url = url;
        }
        config.username = lookup("JSONTABLE_USERNAME");
        config.password = lookup("JSONTABLE_PASSWORD");

        if let Some(secs) = lookup("JSONTABLE_TIMEOUT_SECS") {
            config.timeout_secs = secs
                .parse()
                .map_err(|_| Error::Config(format!("JSONTABLE_TIMEOUT_SECS is not a number: {}", secs)))?;
        }
        if let Some(size) = lookup("JSONTABLE_PAGE_SIZE") {
            config.page_size = size
                .parse()
                .map_err(|_| Error::Config(format!("JSONTABLE_PAGE_SIZE is not a number: {}", size)))?;
        }

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.instance_url.is_empty() {
            return Err(Error::Config("instance_url must be set".to_string()));
        }

        if !(self.instance_url.starts_with("http://") || self.instance_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "instance_url must be an http(s) URL: {}",
                self.instance_url
            )));
        }

        if self.password.is_some() && self.username.is_none() {
            return Err(Error::Config("password given without username".to_string()));
        }

        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than 0".to_string()));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(())
    }
}
