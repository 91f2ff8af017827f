use std::{fs, path::Path, str::FromStr};

use jiff::civil::Date;
use serde_json::{json, Value};

use crate::error::ConfigError;

/// Keys the template must carry so the area, the listing dates and the page
/// can be overlaid.
const REQUIRED_OBJECTS: [(&str, &str); 4] = [
    ("/variables", "variables"),
    ("/variables/filters", "variables.filters"),
    ("/variables/filters/areas", "variables.filters.areas"),
    ("/variables/filters/listingDate", "variables.filters.listingDate"),
];

/// The GraphQL document and its variables skeleton, as loaded from disk.
/// Validated once, then cloned into a [`QueryFilter`] for every sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTemplate {
    payload: Value,
}

impl QueryTemplate {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::TemplateMissing {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    pub fn from_json(payload: Value) -> Result<Self, ConfigError> {
        for key in ["operationName", "query"] {
            if !payload.get(key).is_some_and(Value::is_string) {
                return Err(ConfigError::MissingKey(key));
            }
        }
        for (pointer, name) in REQUIRED_OBJECTS {
            if !payload.pointer(pointer).is_some_and(Value::is_object) {
                return Err(ConfigError::MissingKey(name));
            }
        }
        Ok(Self { payload })
    }

    pub fn operation_name(&self) -> &str {
        self.payload["operationName"].as_str().unwrap_or_default()
    }

    /// Replace the `pageSize` variable of the template.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.payload["variables"]["pageSize"] = json!(page_size);
        self
    }

    /// Overlay the area and the listing window on a copy of the template.
    /// The page is set to 1; callers move it forward with [`QueryFilter::set_page`].
    pub fn build(&self, area: i64, from: Date, to: Date) -> QueryFilter {
        let mut payload = self.payload.clone();
        let filters = &mut payload["variables"]["filters"];
        filters["areas"]["eq"] = json!(area);
        filters["listingDate"]["gte"] = json!(listing_date_gte(from));
        filters["listingDate"]["lte"] = json!(listing_date_lte(to));
        payload["variables"]["page"] = json!(1);
        QueryFilter {
            area,
            from,
            to,
            payload,
        }
    }
}

impl FromStr for QueryTemplate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload: Value = serde_json::from_str(s)?;
        Self::from_json(payload)
    }
}

/// Start of the listing window, midnight UTC.
pub fn listing_date_gte(date: Date) -> String {
    format!("{}T00:00:00.000Z", date)
}

/// End of the listing window, last millisecond of the day UTC.
pub fn listing_date_lte(date: Date) -> String {
    format!("{}T23:59:59.999Z", date)
}

/// Request payload for one sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    area: i64,
    from: Date,
    to: Date,
    payload: Value,
}

impl QueryFilter {
    pub fn area(&self) -> i64 {
        self.area
    }

    /// The `[from, to]` dates of this filter.
    pub fn window(&self) -> (Date, Date) {
        (self.from, self.to)
    }

    pub fn page(&self) -> u32 {
        self.payload["variables"]["page"]
            .as_u64()
            .and_then(|page| u32::try_from(page).ok())
            .unwrap_or(1)
    }

    pub fn set_page(&mut self, page: u32) {
        self.payload["variables"]["page"] = json!(page);
    }

    pub fn page_size(&self) -> Option<u64> {
        self.payload["variables"]["pageSize"].as_u64()
    }

    /// The JSON body posted to the endpoint.
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}
