use std::{io, path::PathBuf};

use jiff::civil::Date;
use reqwest::StatusCode;
use thiserror::Error;

/// Fatal problems detected before any request is sent.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("query template {path:?} could not be read: {source}")]
    TemplateMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("query template is not valid JSON: {0}")]
    TemplateMalformed(#[from] serde_json::Error),

    #[error("query template is missing key `{0}`")]
    MissingKey(&'static str),

    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: Date, end: Date },

    #[error("invalid value {value:?} for {name}")]
    InvalidSetting { name: &'static str, value: String },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Why a single page could not be retrieved.  Ends the current sweep.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("server answered with HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("unexpected response payload: {payload}")]
    Api { payload: String },
}

impl FetchError {
    /// Connection problems and non-2xx answers, as opposed to a bad payload.
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Status { .. })
    }
}

/// A listing that can't be flattened into an export row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has an unusable value {value:?}")]
    InvalidField { field: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("can't write export file: {0}")]
    Io(#[from] io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum ListingsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        let status = FetchError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        assert!(status.is_transport());
        assert!(status.to_string().contains("500"));

        let api = FetchError::Api {
            payload: r#"{"errors":[]}"#.to_string(),
        };
        assert!(!api.is_transport());
    }
}
