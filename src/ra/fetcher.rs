use log::{debug, info};
use reqwest::{
    blocking::Client,
    header::{CONTENT_TYPE, REFERER, USER_AGENT},
};
use serde_json::Value;

use super::{config::ApiConfig, listing::RawListingItem, query::QueryFilter};
use crate::error::{ConfigError, FetchError};

/// Longest slice of a response body kept in a diagnostic.
const MAX_DIAGNOSTIC_LEN: usize = 1000;

/// Outcome of asking for one page.
#[derive(Debug)]
pub enum FetchResult {
    /// At least one listing, keep paginating.
    Page(Vec<RawListingItem>),
    /// An empty page, the sweep is over.
    Exhausted,
    /// Transport or API failure, the sweep stops here.
    Failed(FetchError),
}

/// Anything that can serve pages of listings for a filter.
pub trait PageSource {
    /// Set the filter's page to `page` and retrieve it.
    fn fetch_page(&self, filter: &mut QueryFilter, page: u32) -> FetchResult;
}

/// Posts the GraphQL query to the configured endpoint, one page at a time.
/// No retries.
pub struct PageFetcher {
    client: Client,
    config: ApiConfig,
}

impl PageFetcher {
    pub fn new(config: ApiConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ConfigError::Client)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

impl PageSource for PageFetcher {
    fn fetch_page(&self, filter: &mut QueryFilter, page: u32) -> FetchResult {
        filter.set_page(page);
        debug!("POST {} page {}", self.config.endpoint, page);
        let response = match self
            .client
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(REFERER, &self.config.referer)
            .header(USER_AGENT, &self.config.user_agent)
            .json(filter.payload())
            .send()
        {
            Ok(response) => response,
            Err(e) => return FetchResult::Failed(FetchError::Transport(e)),
        };

        let status = response.status();
        let body = match response.text() {
            Ok(body) => body,
            Err(e) => return FetchResult::Failed(FetchError::Transport(e)),
        };
        if !status.is_success() {
            return FetchResult::Failed(FetchError::Status {
                status,
                body: truncate(&body),
            });
        }

        match parse_listings(&body) {
            Ok((items, total)) if items.is_empty() => {
                debug!("page {} is empty (totalResults {:?})", page, total);
                FetchResult::Exhausted
            }
            Ok((items, total)) => {
                info!(
                    "page {}: {} listings (totalResults {})",
                    page,
                    items.len(),
                    total.map_or("?".to_string(), |n| n.to_string())
                );
                FetchResult::Page(items)
            }
            Err(e) => FetchResult::Failed(e),
        }
    }
}

/// Extract the listings of a successful response body, with the server's
/// `totalResults` when it is given.
///
/// A body that isn't JSON, has no `data`, or whose `data.eventListings.data` is
/// not an array is an [`FetchError::Api`] carrying the raw payload (or the
/// GraphQL `errors` when there are some).
pub fn parse_listings(body: &str) -> Result<(Vec<RawListingItem>, Option<u64>), FetchError> {
    let api_error = |payload: &str| FetchError::Api {
        payload: truncate(payload),
    };
    let value: Value = serde_json::from_str(body).map_err(|_| api_error(body))?;
    let data = match value.get("data") {
        Some(data) if !data.is_null() => data,
        _ => {
            return Err(match value.get("errors") {
                Some(errors) => api_error(&errors.to_string()),
                None => api_error(body),
            })
        }
    };
    let listings = data
        .pointer("/eventListings/data")
        .and_then(Value::as_array)
        .ok_or_else(|| api_error(body))?;
    let total = data
        .pointer("/eventListings/totalResults")
        .and_then(Value::as_u64);
    let items = listings.iter().cloned().map(RawListingItem).collect();
    Ok((items, total))
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_DIAGNOSTIC_LEN) {
        Some((i, _)) => format!("{}...", &text[..i]),
        None => text.to_string(),
    }
}
