use jiff::civil::{Date, DateTime};
use log::warn;
use serde::Deserialize;
use serde_json::Value;

use crate::error::SchemaError;

/// One element of `data.eventListings.data`, kept as the server sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawListingItem(pub Value);

impl RawListingItem {
    /// The listing id, if any.  Only used in diagnostics.
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub(crate) fn event_fields(&self) -> Result<EventFields, SchemaError> {
        let event = match self.0.get("event") {
            Some(event) if !event.is_null() => event,
            _ => return Err(SchemaError::MissingField("event")),
        };
        serde_json::from_value(event.clone()).map_err(|e| SchemaError::InvalidField {
            field: "event",
            value: e.to_string(),
        })
    }
}

/// The subset of an upstream event that ends up in an export row.  Every
/// field is optional here; [`normalize`] decides what is required.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventFields {
    pub title: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub artists: Option<Vec<NamedFields>>,
    pub venue: Option<NamedFields>,
    pub content_url: Option<String>,
    pub attending: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NamedFields {
    pub name: Option<String>,
}

impl EventFields {
    pub fn artist_names(&self) -> Vec<String> {
        self.artists
            .iter()
            .flatten()
            .filter_map(|artist| artist.name.clone())
            .collect()
    }

    pub fn venue_name(&self) -> Option<&str> {
        self.venue.as_ref().and_then(|venue| venue.name.as_deref())
    }
}

/// Flat, export-ready projection of one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub title: String,
    /// Wire timestamp, e.g. `2023-04-23T00:00:00.000`
    pub date: String,
    pub day: Date,
    pub start_time: String,
    pub end_time: String,
    pub artists: Vec<String>,
    pub venue: String,
    pub url: String,
    pub attending: Option<u64>,
}

impl ExportRecord {
    /// Date as shown in the display export, e.g. `April 23, 2023`.
    pub fn display_date(&self) -> String {
        self.day.strftime("%B %d, %Y").to_string()
    }
}

/// Flatten one listing.  Title, date and venue name are required, the other
/// fields default to empty.
pub fn normalize(item: &RawListingItem) -> Result<ExportRecord, SchemaError> {
    let event = item.event_fields()?;
    let title = event.title.clone().ok_or(SchemaError::MissingField("title"))?;
    let date = event.date.clone().ok_or(SchemaError::MissingField("date"))?;
    let day = parse_day(&date).ok_or_else(|| SchemaError::InvalidField {
        field: "date",
        value: date.clone(),
    })?;
    let venue = event
        .venue_name()
        .ok_or(SchemaError::MissingField("venue.name"))?
        .to_string();
    Ok(ExportRecord {
        title,
        date,
        day,
        start_time: event.start_time.clone().unwrap_or_default(),
        end_time: event.end_time.clone().unwrap_or_default(),
        artists: event.artist_names(),
        venue,
        url: event.content_url.clone().unwrap_or_default(),
        attending: event.attending,
    })
}

/// Normalize a batch, dropping (and logging) the listings that don't fit.
/// Returns the records in input order and the number of dropped listings.
pub fn normalize_items(items: &[RawListingItem]) -> (Vec<ExportRecord>, usize) {
    let mut records = Vec::with_capacity(items.len());
    let mut dropped = 0;
    for (i, item) in items.iter().enumerate() {
        match normalize(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                dropped += 1;
                warn!(
                    "Skipping listing #{} (id {}): {}",
                    i,
                    item.id().unwrap_or("?"),
                    e
                );
            }
        }
    }
    (records, dropped)
}

/// Upstream dates come as `2023-04-23T00:00:00.000`, sometimes with a `Z`.
fn parse_day(value: &str) -> Option<Date> {
    let value = value.trim_end_matches('Z');
    value
        .parse::<DateTime>()
        .map(|dt| dt.date())
        .or_else(|_| value.parse::<Date>())
        .ok()
}
