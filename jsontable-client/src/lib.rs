//! jsontable client library
//!
//! Typed access to remote tables served over the JSONv2 RPC-style endpoint
//! (`<table>.do?JSONv2`).
//!
//! ```no_run
//! # use jsontable_client::{Session, TableApi, Lookup};
//! # use jsontable_core::{ClientConfig, EncodedQuery, Key};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("https://dev12345.service-now.com/").with_credentials("admin", "secret");
//! let session = Session::from_config(&config)?;
//! let incidents = session.table_api("incident");
//!
//! let keys = incidents.get_keys(Some(&EncodedQuery::new().eq("active", "true"))).await?;
//! if let Lookup::Found(record) = incidents.get_record(&Key::new("abc123")?).await? {
//!     println!("{:?} / {} open", record.value("short_description"), keys.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod envelope;
pub mod response;
pub mod transport;
pub mod session;
pub mod api;
pub mod json_api;
pub mod reader;

// Re-export key types
pub use api::{Lookup, TableApi};
pub use envelope::{Action, Envelope};
pub use error::{ClientError, Result};
pub use json_api::JsonTableApi;
pub use reader::{KeySetTableReader, TableReader};
pub use session::Session;
pub use transport::{HttpMethod, HttpTransport, JsonObject, Transport};
pub use reqwest::Url;
