pub mod error;
pub mod key;
pub mod query;
pub mod params;
pub mod table;
pub mod record;
pub mod config;
pub mod retry;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use key::{Key, KeySet, KEY_FIELD};
pub use params::Parameters;
pub use query::{EncodedQuery, Operator};
pub use record::{DisplayValue, FieldValue, InsertResponse, Record, RecordList};
pub use retry::RetryPolicy;
pub use table::Table;
