pub mod error;
pub mod ra;

pub use error::{ConfigError, ExportError, FetchError, ListingsError, SchemaError};
